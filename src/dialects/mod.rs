//! Provider executors.

pub mod hubspot;
pub mod salesforce;

pub use hubspot::HubspotConfig;
pub use salesforce::{SalesforceConfig, SalesforceExecutor};
