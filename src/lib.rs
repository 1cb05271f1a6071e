//! # crmql: typed filters in, provider queries out
//!
//! crmql compiles a typed, operator-keyed filter DSL into provider query
//! text (SOQL today), runs it through a pluggable executor and validates
//! the returned records against the model schema.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use crmql::prelude::*;
//!
//! let opportunity = Arc::new(
//!     ModelDef::builder("Opportunity", "Opportunity", Provider::Salesforce)
//!         .field("id", "Id")
//!         .field("name", "Name")
//!         .field("amount", "Amount")
//!         .build()?,
//! );
//!
//! let ast = SelectBuilder::new(opportunity)
//!     .select_fields(["id", "name"])
//!     .filter(Filter::new().field("amount", FieldOps::new().gte(25000)))
//!     .limit(10)
//!     .build()?;
//!
//! assert_eq!(
//!     ast.to_soql(),
//!     "SELECT Id, Name FROM Opportunity WHERE Amount >= 25000 LIMIT 10"
//! );
//! ```
//!
//! ## Filter operators
//!
//! | Operator       | Meaning                          |
//! |----------------|----------------------------------|
//! | `$eq` `$ne`    | Equality; `null` tests for null  |
//! | `$gt` `$gte` `$lt` `$lte` | Comparison            |
//! | `$like`        | Raw pattern                      |
//! | `$startsWith` `$endsWith` | Prefix / suffix match |
//! | `$in` `$nin`   | Membership, optional `$chunk`    |
//! | `$between`     | Inclusive range                  |
//! | `$exists`      | Null / not-null                  |
//! | `$and` `$or` `$not` `$raw` | Combinators          |

pub mod ast;
pub mod config;
pub mod dialects;
pub mod error;
pub mod executor;
pub mod filter;
pub mod model;
pub mod normalizer;
pub mod orm;
pub mod query;
pub mod schema;
pub mod transpiler;
pub mod transport;

pub mod prelude {
    pub use std::sync::Arc;

    pub use crate::ast::*;
    pub use crate::error::*;
    pub use crate::executor::{QueryContext, QueryExecutor};
    pub use crate::filter::{ChunkConfig, FieldFilter, FieldOps, Filter};
    pub use crate::model::{ModelDef, ModelRegistry, Provider};
    pub use crate::normalizer::{UnknownFieldPolicy, normalize};
    pub use crate::orm::{Orm, OrmConfig};
    pub use crate::query::{QueryApi, QueryBuilder, SelectBuilder};
    pub use crate::schema::{FieldSchema, Record, Schema};
    pub use crate::transpiler::{Dialect, ToQuery};
    pub use crate::transport::{Transport, TransportRequest, TransportResponse};
}
