use crate::model::Provider;

/// Supported query dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    Salesforce,
    Hubspot,
}

impl Dialect {
    pub fn for_provider(provider: Provider) -> Self {
        match provider {
            Provider::Salesforce => Dialect::Salesforce,
            Provider::Hubspot => Dialect::Hubspot,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Salesforce => "salesforce",
            Dialect::Hubspot => "hubspot",
        }
    }
}
