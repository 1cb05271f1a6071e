//! Salesforce REST query executor.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::ast::SelectAst;
use crate::error::{QueryResult, map_http_status};
use crate::executor::{QueryContext, QueryExecutor};
use crate::transpiler::{Dialect, ToQuery};
use crate::transport::{Transport, TransportRequest, TransportResponse};

pub const DEFAULT_API_VERSION: &str = "59.0";
pub const DEFAULT_PROVIDER_NAME: &str = "salesforce";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SalesforceConfig {
    /// REST API version, without the leading `v`.
    pub version: String,
    /// Name the transport knows this connection by.
    pub provider_name: String,
}

impl Default for SalesforceConfig {
    fn default() -> Self {
        Self {
            version: DEFAULT_API_VERSION.to_string(),
            provider_name: DEFAULT_PROVIDER_NAME.to_string(),
        }
    }
}

pub struct SalesforceExecutor {
    transport: Arc<dyn Transport>,
    config: SalesforceConfig,
}

impl SalesforceExecutor {
    pub fn new(transport: Arc<dyn Transport>, config: SalesforceConfig) -> Self {
        Self { transport, config }
    }

    fn query_path(&self) -> String {
        format!("/services/data/v{}/query", self.config.version)
    }
}

#[async_trait]
impl QueryExecutor for SalesforceExecutor {
    async fn execute_select(
        &self,
        ast: &SelectAst,
        ctx: Option<&QueryContext>,
    ) -> QueryResult<Vec<Json>> {
        let soql = ast.to_query_with_dialect(Dialect::Salesforce)?;
        let request_name = ctx
            .and_then(|c| c.metadata.as_ref())
            .and_then(|m| m.request_name.clone())
            .unwrap_or_default();
        let request = TransportRequest::get(&self.config.provider_name, self.query_path())
            .query_param("q", soql)
            .metadata(ctx.and_then(|c| c.metadata.clone()));

        let response = self.transport.request(request).await?;
        if !response.is_success() {
            let err = map_http_status(
                response.status,
                error_message(&response),
                retry_after_ms(&response),
            );
            tracing::warn!(
                provider = %self.config.provider_name,
                request = %request_name,
                status = response.status,
                error = %err,
                "query failed"
            );
            return Err(err.into());
        }

        let records = match response.data.get("records") {
            Some(Json::Array(rows)) => rows.clone(),
            _ => Vec::new(),
        };
        tracing::debug!(
            provider = %self.config.provider_name,
            request = %request_name,
            records = records.len(),
            "query ok"
        );
        Ok(records)
    }
}

/// Salesforce reports errors as `[{"message": ..., "errorCode": ...}]`.
fn error_message(response: &TransportResponse) -> String {
    let detail = response
        .data
        .get(0)
        .and_then(|e| e.get("message"))
        .and_then(Json::as_str);
    match detail {
        Some(detail) => format!("Salesforce query error: {detail}"),
        None => "Salesforce query error".to_string(),
    }
}

/// `Retry-After` in whole seconds, converted to milliseconds. 429 only.
fn retry_after_ms(response: &TransportResponse) -> Option<u64> {
    if response.status != 429 {
        return None;
    }
    response
        .header("retry-after")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .and_then(|secs| secs.checked_mul(1000))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn response(status: u16, headers: &[(&str, &str)], data: Json) -> TransportResponse {
        TransportResponse {
            status,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
            data,
        }
    }

    #[test]
    fn test_config_defaults() {
        let cfg: SalesforceConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, SalesforceConfig::default());
        assert_eq!(cfg.version, "59.0");

        let cfg: SalesforceConfig = toml::from_str("version = \"60.0\"").unwrap();
        assert_eq!(cfg.provider_name, "salesforce");
    }

    #[test]
    fn test_retry_after_only_for_rate_limits() {
        let res = response(429, &[("Retry-After", "2")], Json::Null);
        assert_eq!(retry_after_ms(&res), Some(2000));

        let res = response(503, &[("Retry-After", "2")], Json::Null);
        assert_eq!(retry_after_ms(&res), None);

        let res = response(429, &[("Retry-After", "soon")], Json::Null);
        assert_eq!(retry_after_ms(&res), None);
    }

    #[test]
    fn test_retry_after_overflow_is_dropped() {
        let res = response(429, &[("Retry-After", "18446744073709551615")], Json::Null);
        assert_eq!(retry_after_ms(&res), None);

        let res = response(429, &[("Retry-After", "18446744073709551")], Json::Null);
        assert_eq!(retry_after_ms(&res), Some(18_446_744_073_709_551_000));
    }

    #[test]
    fn test_error_message_uses_provider_detail() {
        let detail = serde_json::json!([
            {"message": "unexpected token: FROM", "errorCode": "MALFORMED_QUERY"}
        ]);
        let res = response(400, &[], detail);
        assert_eq!(error_message(&res), "Salesforce query error: unexpected token: FROM");
        assert_eq!(error_message(&response(500, &[], Json::Null)), "Salesforce query error");
    }
}
