//! Condition tree and select descriptor.

pub mod builders;
pub mod conditions;
pub mod operators;
pub mod select;
pub mod values;

pub use builders::{and, not, or, raw};
pub use conditions::{Condition, Operand, WhereAst};
pub use operators::{LogicalOp, Operator, SortOrder};
pub use select::{
    OrderBy, PaginationConfig, PaginationStrategy, SelectAst, Selection, order_pairs_to_list,
};
pub use values::Value;
