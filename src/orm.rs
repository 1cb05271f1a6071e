//! ORM entry point: binds models to the executor of their provider.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dialects::{HubspotConfig, SalesforceConfig, SalesforceExecutor};
use crate::error::QueryResult;
use crate::executor::{ExecutorRegistry, QueryExecutor};
use crate::model::{ModelDef, ModelFactory, Provider};
use crate::query::QueryApi;
use crate::transport::Transport;

/// Which providers are enabled, and how.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrmConfig {
    pub salesforce: Option<SalesforceConfig>,
    pub hubspot: Option<HubspotConfig>,
}

pub struct Orm {
    executors: ExecutorRegistry,
}

impl Orm {
    /// Register one executor per configured provider.
    pub fn new(transport: Arc<dyn Transport>, config: OrmConfig) -> Self {
        let mut executors = ExecutorRegistry::new();
        if let Some(sf) = config.salesforce {
            tracing::info!(
                version = %sf.version,
                provider = %sf.provider_name,
                "salesforce executor enabled"
            );
            executors.register(
                Provider::Salesforce,
                Arc::new(SalesforceExecutor::new(Arc::clone(&transport), sf)),
            );
        }
        if config.hubspot.is_some() {
            tracing::warn!(
                "hubspot is configured but has no executor; its models cannot be queried"
            );
        }
        Self { executors }
    }

    /// Replace or add the executor for a provider.
    pub fn with_executor(mut self, provider: Provider, executor: Arc<dyn QueryExecutor>) -> Self {
        self.executors.register(provider, executor);
        self
    }

    pub fn sf(&self) -> ModelFactory {
        ModelFactory::new(Provider::Salesforce)
    }

    pub fn hs(&self) -> ModelFactory {
        ModelFactory::new(Provider::Hubspot)
    }

    /// Start querying a model. Fails immediately when its provider has no executor.
    pub fn from(&self, model: &Arc<ModelDef>) -> QueryResult<QueryApi> {
        let executor = self.executors.get(model.provider)?;
        Ok(QueryApi::new(Arc::clone(model), executor))
    }

    pub fn executors(&self) -> &ExecutorRegistry {
        &self.executors
    }
}

impl std::fmt::Debug for Orm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orm").field("executors", &self.executors).finish()
    }
}
