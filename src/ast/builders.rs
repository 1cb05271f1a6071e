//! Combinator constructors for condition trees.
//!
//! Subtrees are taken by value; no validation beyond arity is performed.

use crate::ast::WhereAst;

pub fn and(nodes: impl IntoIterator<Item = WhereAst>) -> WhereAst {
    WhereAst::And(nodes.into_iter().collect())
}

pub fn or(nodes: impl IntoIterator<Item = WhereAst>) -> WhereAst {
    WhereAst::Or(nodes.into_iter().collect())
}

pub fn not(node: WhereAst) -> WhereAst {
    WhereAst::Not(Box::new(node))
}

pub fn raw(fragment: impl Into<String>) -> WhereAst {
    WhereAst::Raw(fragment.into())
}
