//! Transport capability.
//!
//! crmql never talks to the network itself. Executors hand requests to a
//! [`Transport`], which owns authentication, retries and the actual I/O.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::QueryResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
}

/// Caller-supplied request labels, forwarded to the transport and logs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportMetadata {
    pub request_name: Option<String>,
    pub user_id: Option<String>,
    pub organization_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub provider_name: String,
    pub method: Method,
    /// Path only; the transport resolves the provider base URL.
    pub url: String,
    pub headers: HashMap<String, String>,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub metadata: Option<TransportMetadata>,
}

impl TransportRequest {
    pub fn get(provider_name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            provider_name: provider_name.into(),
            method: Method::Get,
            url: url.into(),
            headers: HashMap::new(),
            query: Vec::new(),
            body: None,
            metadata: None,
        }
    }

    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn metadata(mut self, metadata: Option<TransportMetadata>) -> Self {
        self.metadata = metadata;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub data: serde_json::Value,
}

impl TransportResponse {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one request. Non-2xx statuses are returned, not raised.
    async fn request(&self, req: TransportRequest) -> QueryResult<TransportResponse>;
}
