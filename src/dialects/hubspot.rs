//! HubSpot connection settings.
//!
//! Accepted in configuration, but no executor exists yet. Models on this
//! provider fail at `Orm::from` with `ExecutorNotConfigured`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubspotConfig {
    pub provider_name: String,
}

impl Default for HubspotConfig {
    fn default() -> Self {
        Self { provider_name: "hubspot".to_string() }
    }
}
