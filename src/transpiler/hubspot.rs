//! HubSpot search dialect.
//!
//! Not implemented yet: HubSpot has no textual query language, so this will
//! need to emit a search request body rather than a string.

use crate::ast::SelectAst;
use crate::error::{QueryError, QueryResult};

pub fn build_hubspot(_ast: &SelectAst) -> QueryResult<String> {
    Err(QueryError::Unsupported {
        dialect: "hubspot",
        feature: "select queries",
    })
}
