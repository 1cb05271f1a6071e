//! Executor capability and the provider → executor registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::ast::SelectAst;
use crate::error::{QueryError, QueryResult};
use crate::model::Provider;
use crate::transport::TransportMetadata;

/// Per-call options passed through to the executor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryContext {
    pub metadata: Option<TransportMetadata>,
}

impl QueryContext {
    pub fn named(request_name: impl Into<String>) -> Self {
        Self {
            metadata: Some(TransportMetadata {
                request_name: Some(request_name.into()),
                ..Default::default()
            }),
        }
    }
}

/// Runs a select descriptor against one provider and returns raw records.
///
/// Implementations map non-success provider responses to
/// [`QueryError::Provider`].
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute_select(
        &self,
        ast: &SelectAst,
        ctx: Option<&QueryContext>,
    ) -> QueryResult<Vec<serde_json::Value>>;
}

/// Executors keyed by provider, filled once at configuration time.
#[derive(Clone, Default)]
pub struct ExecutorRegistry {
    executors: HashMap<Provider, Arc<dyn QueryExecutor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Provider, executor: Arc<dyn QueryExecutor>) {
        self.executors.insert(provider, executor);
    }

    pub fn get(&self, provider: Provider) -> QueryResult<Arc<dyn QueryExecutor>> {
        self.executors
            .get(&provider)
            .cloned()
            .ok_or_else(|| QueryError::ExecutorNotConfigured(provider.to_string()))
    }
}

impl std::fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorRegistry")
            .field("providers", &self.executors.keys().collect::<Vec<_>>())
            .finish()
    }
}
