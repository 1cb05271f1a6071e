//! Query transpiler.
//!
//! Converts select descriptors into provider query text.

pub mod conditions;
pub mod dialect;
pub mod hubspot;
pub mod soql;

#[cfg(test)]
mod tests;

use crate::ast::SelectAst;
use crate::error::QueryResult;

pub use conditions::{ConditionToSoql, escape_string, escape_value};
pub use dialect::Dialect;

/// Trait for converting descriptors to provider query text.
pub trait ToQuery {
    /// Render using the dialect of the model's provider.
    fn to_query(&self) -> QueryResult<String>;
    /// Render with a specific dialect.
    fn to_query_with_dialect(&self, dialect: Dialect) -> QueryResult<String>;
}

impl ToQuery for SelectAst {
    fn to_query(&self) -> QueryResult<String> {
        self.to_query_with_dialect(Dialect::for_provider(self.model.provider))
    }

    fn to_query_with_dialect(&self, dialect: Dialect) -> QueryResult<String> {
        let query = match dialect {
            Dialect::Salesforce => soql::build_soql(self),
            Dialect::Hubspot => hubspot::build_hubspot(self)?,
        };
        tracing::debug!(
            model = %self.model.name,
            dialect = dialect.name(),
            %query,
            "compiled query"
        );
        Ok(query)
    }
}

impl SelectAst {
    /// SOQL text for this descriptor. Never fails.
    pub fn to_soql(&self) -> String {
        soql::build_soql(self)
    }
}
