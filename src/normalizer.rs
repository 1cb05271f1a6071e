//! Filter normalizer.
//!
//! Turns a [`Filter`] into a provider-agnostic [`WhereAst`], resolving logical
//! field keys to provider paths through the model's field map. Membership
//! filters carrying a chunk directive are reported on the side; the tree
//! itself always contains the unbatched condition.

use crate::ast::{Condition, Operator, Value, WhereAst, not, raw};
use crate::error::{QueryError, QueryResult};
use crate::filter::{ChunkConfig, FieldFilter, FieldOp, Filter, FilterEntry, ValueList};
use crate::model::ModelDef;

/// What to do with filter keys the model does not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownFieldPolicy {
    /// Fail with [`QueryError::UnknownField`].
    #[default]
    Reject,
    /// Drop the entry.
    Ignore,
}

/// A membership filter the caller asked to run in batches.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkDirective {
    pub field_path: String,
    /// `In` or `NotIn`.
    pub op: Operator,
    pub values: Vec<Value>,
    pub config: ChunkConfig,
}

impl ChunkDirective {
    /// Values split into `size`-sized batches. No size means a single batch.
    pub fn batches(&self) -> Vec<&[Value]> {
        match self.config.size {
            Some(size) if size > 0 => self.values.chunks(size).collect(),
            _ => vec![self.values.as_slice()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedWhere {
    pub ast: Option<WhereAst>,
    pub chunks: Vec<ChunkDirective>,
}

/// Normalize with the default [`UnknownFieldPolicy::Reject`].
pub fn normalize(model: &ModelDef, filter: Option<&Filter>) -> QueryResult<NormalizedWhere> {
    normalize_with(model, filter, UnknownFieldPolicy::default())
}

pub fn normalize_with(
    model: &ModelDef,
    filter: Option<&Filter>,
    policy: UnknownFieldPolicy,
) -> QueryResult<NormalizedWhere> {
    let Some(filter) = filter else {
        return Ok(NormalizedWhere::default());
    };

    let mut normalizer = Normalizer { model, policy, chunks: Vec::new() };
    let ast = normalizer.filter(filter)?;
    tracing::debug!(
        model = %model.name,
        conditions = ast.as_ref().map(|a| a.conditions().len()).unwrap_or(0),
        chunks = normalizer.chunks.len(),
        "normalized filter"
    );
    Ok(NormalizedWhere { ast, chunks: normalizer.chunks })
}

struct Normalizer<'a> {
    model: &'a ModelDef,
    policy: UnknownFieldPolicy,
    chunks: Vec<ChunkDirective>,
}

impl Normalizer<'_> {
    fn filter(&mut self, filter: &Filter) -> QueryResult<Option<WhereAst>> {
        let mut nodes = Vec::new();
        for entry in filter.entries() {
            if let Some(node) = self.entry(entry)? {
                nodes.push(node);
            }
        }
        Ok(combine(nodes, WhereAst::And))
    }

    fn entry(&mut self, entry: &FilterEntry) -> QueryResult<Option<WhereAst>> {
        match entry {
            FilterEntry::And(filters) => {
                let nodes = self.each(filters)?;
                Ok(wrap_non_empty(nodes, WhereAst::And))
            }
            FilterEntry::Or(filters) => {
                let nodes = self.each(filters)?;
                Ok(wrap_non_empty(nodes, WhereAst::Or))
            }
            FilterEntry::Not(inner) => Ok(self.filter(inner)?.map(not)),
            FilterEntry::Raw(fragment) => Ok(Some(raw(fragment.clone()))),
            FilterEntry::Field { key, filter } => {
                let model = self.model;
                let Some(field) = model.field(key) else {
                    return match self.policy {
                        UnknownFieldPolicy::Reject => {
                            Err(QueryError::unknown_field(&model.name, key))
                        }
                        UnknownFieldPolicy::Ignore => {
                            tracing::trace!(
                                model = %model.name,
                                field = %key,
                                "dropping unknown filter field"
                            );
                            Ok(None)
                        }
                    };
                };
                Ok(self.field(key, &field.path, filter))
            }
        }
    }

    fn each(&mut self, filters: &[Filter]) -> QueryResult<Vec<WhereAst>> {
        let mut nodes = Vec::new();
        for f in filters {
            if let Some(node) = self.filter(f)? {
                nodes.push(node);
            }
        }
        Ok(nodes)
    }

    fn field(&mut self, key: &str, path: &str, filter: &FieldFilter) -> Option<WhereAst> {
        match filter {
            FieldFilter::Null => Some(Condition::is_null(key, path).into()),
            FieldFilter::Value(v) => {
                Some(Condition::compare(key, path, Operator::Eq, v.clone()).into())
            }
            FieldFilter::Ops(ops) => {
                let nodes: Vec<WhereAst> =
                    ops.ops().iter().map(|op| self.op(key, path, op)).collect();
                combine(nodes, WhereAst::And)
            }
        }
    }

    fn op(&mut self, key: &str, path: &str, op: &FieldOp) -> WhereAst {
        let cond = match op {
            FieldOp::Eq(v) => Condition::compare(key, path, Operator::Eq, v.clone()),
            FieldOp::Ne(Value::Null) => Condition::is_not_null(key, path),
            FieldOp::Ne(v) => Condition::compare(key, path, Operator::Ne, v.clone()),
            FieldOp::Gt(v) => Condition::compare(key, path, Operator::Gt, v.clone()),
            FieldOp::Gte(v) => Condition::compare(key, path, Operator::Gte, v.clone()),
            FieldOp::Lt(v) => Condition::compare(key, path, Operator::Lt, v.clone()),
            FieldOp::Lte(v) => Condition::compare(key, path, Operator::Lte, v.clone()),
            FieldOp::Like(p) => Condition::compare(key, path, Operator::Like, p.as_str()),
            FieldOp::StartsWith(p) => {
                Condition::compare(key, path, Operator::StartsWith, p.as_str())
            }
            FieldOp::EndsWith(p) => Condition::compare(key, path, Operator::EndsWith, p.as_str()),
            FieldOp::In(list) => self.membership(key, path, false, list),
            FieldOp::NotIn(list) => self.membership(key, path, true, list),
            FieldOp::Between(low, high) => Condition::between(key, path, low.clone(), high.clone()),
            FieldOp::Exists(true) => Condition::is_not_null(key, path),
            FieldOp::Exists(false) => Condition::is_null(key, path),
        };
        cond.into()
    }

    fn membership(&mut self, key: &str, path: &str, negated: bool, list: &ValueList) -> Condition {
        let cond = Condition::membership(key, path, negated, list.values.clone());
        if let Some(config) = list.chunk {
            if !list.values.is_empty() {
                self.chunks.push(ChunkDirective {
                    field_path: path.to_string(),
                    op: cond.op,
                    values: list.values.clone(),
                    config,
                });
            }
        }
        cond
    }
}

/// Zero nodes → none, one → itself, more → wrapped.
fn combine(mut nodes: Vec<WhereAst>, wrap: fn(Vec<WhereAst>) -> WhereAst) -> Option<WhereAst> {
    match nodes.len() {
        0 => None,
        1 => nodes.pop(),
        _ => Some(wrap(nodes)),
    }
}

/// Explicit `$and`/`$or` keep their combinator even around a single child.
fn wrap_non_empty(nodes: Vec<WhereAst>, wrap: fn(Vec<WhereAst>) -> WhereAst) -> Option<WhereAst> {
    if nodes.is_empty() { None } else { Some(wrap(nodes)) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{and, or};
    use crate::filter::FieldOps;
    use crate::model::Provider;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn opportunity() -> ModelDef {
        ModelDef::builder("Opportunity", "Opportunity", Provider::Salesforce)
            .field("id", "Id")
            .field("name", "Name")
            .field("amount", "Amount")
            .field("ownerId", "OwnerId")
            .field("accountName", "Account.Name")
            .build()
            .unwrap()
    }

    fn norm(filter: &Filter) -> NormalizedWhere {
        normalize(&opportunity(), Some(filter)).unwrap()
    }

    fn cond(c: Condition) -> WhereAst {
        WhereAst::Cond(c)
    }

    #[test]
    fn test_absent_filter() {
        assert_eq!(normalize(&opportunity(), None).unwrap(), NormalizedWhere::default());
        assert_eq!(norm(&Filter::new()).ast, None);
    }

    #[test]
    fn test_bare_value_is_eq() {
        let out = norm(&Filter::new().eq("name", "Acme"));
        assert_eq!(out.ast, Some(cond(Condition::compare("name", "Name", Operator::Eq, "Acme"))));
    }

    #[test]
    fn test_bare_array_is_eq() {
        let out = norm(&Filter::new().field("id", vec!["1", "2"]));
        assert_eq!(
            out.ast,
            Some(cond(Condition::compare("id", "Id", Operator::Eq, vec!["1", "2"])))
        );
    }

    #[test]
    fn test_null_is_is_null() {
        let out = norm(&Filter::new().is_null("ownerId"));
        assert_eq!(out.ast, Some(cond(Condition::is_null("ownerId", "OwnerId"))));
    }

    #[test]
    fn test_ne_null_is_not_null() {
        let out = norm(&Filter::new().field("amount", FieldOps::new().ne(Value::Null)));
        assert_eq!(out.ast, Some(cond(Condition::is_not_null("amount", "Amount"))));
    }

    #[test]
    fn test_exists() {
        let out = norm(&Filter::new().field("amount", FieldOps::new().exists(true)));
        assert_eq!(out.ast, Some(cond(Condition::is_not_null("amount", "Amount"))));
        let out = norm(&Filter::new().field("amount", FieldOps::new().exists(false)));
        assert_eq!(out.ast, Some(cond(Condition::is_null("amount", "Amount"))));
    }

    #[test]
    fn test_multiple_ops_are_anded() {
        let out = norm(&Filter::new().field("amount", FieldOps::new().gte(10).lt(20)));
        assert_eq!(
            out.ast,
            Some(and([
                cond(Condition::compare("amount", "Amount", Operator::Gte, 10)),
                cond(Condition::compare("amount", "Amount", Operator::Lt, 20)),
            ]))
        );
    }

    #[test]
    fn test_relationship_path_is_resolved() {
        let out = norm(&Filter::new().field("accountName", FieldOps::new().starts_with("Ac")));
        assert_eq!(
            out.ast,
            Some(cond(Condition::compare(
                "accountName",
                "Account.Name",
                Operator::StartsWith,
                "Ac"
            )))
        );
    }

    #[test]
    fn test_unknown_field_is_rejected_by_default() {
        let err = normalize(&opportunity(), Some(&Filter::new().eq("nmae", "x"))).unwrap_err();
        assert!(matches!(err, QueryError::UnknownField { ref field, .. } if field == "nmae"));
    }

    fn lenient(filter: &Filter) -> NormalizedWhere {
        normalize_with(&opportunity(), Some(filter), UnknownFieldPolicy::Ignore).unwrap()
    }

    #[test]
    fn test_unknown_field_ignored_when_lenient() {
        let filter = Filter::new().eq("bogus", 1).eq("other", 2);
        let out = lenient(&filter);
        assert_eq!(out.ast, None);

        let filter = Filter::new().eq("bogus", 1).eq("name", "x");
        let out = lenient(&filter);
        assert_eq!(out.ast, Some(cond(Condition::compare("name", "Name", Operator::Eq, "x"))));
    }

    #[test]
    fn test_unrecognized_operator_ignored_when_lenient() {
        let doc = json!({"id": {"$regex": "x"}});
        let filter = Filter::from_json_with(&doc, UnknownFieldPolicy::Ignore).unwrap();
        let out = lenient(&filter);
        assert_eq!(out.ast, None);
        assert!(out.chunks.is_empty());
    }

    #[test]
    fn test_empty_combinators_vanish() {
        let filter = Filter::new().and([]).or([Filter::new()]).not(Filter::new());
        assert_eq!(norm(&filter).ast, None);
    }

    #[test]
    fn test_combinators() {
        let filter = Filter::new()
            .or([Filter::new().eq("name", "A"), Filter::new().eq("name", "B")])
            .not(Filter::new().is_null("ownerId"))
            .raw("IsDeleted = false");
        assert_eq!(
            norm(&filter).ast,
            Some(and([
                or([
                    cond(Condition::compare("name", "Name", Operator::Eq, "A")),
                    cond(Condition::compare("name", "Name", Operator::Eq, "B")),
                ]),
                not(cond(Condition::is_null("ownerId", "OwnerId"))),
                raw("IsDeleted = false"),
            ]))
        );
    }

    #[test]
    fn test_chunk_directive_is_extracted() {
        let doc = json!({"id": {"$in": ["1", "2", "3"], "$chunk": {"size": 2}}});
        let filter = Filter::from_json(&doc).unwrap();
        let out = norm(&filter);
        let values: Vec<Value> = vec!["1".into(), "2".into(), "3".into()];
        assert_eq!(
            out.ast,
            Some(cond(Condition::membership("id", "Id", false, values.clone())))
        );
        assert_eq!(
            out.chunks,
            vec![ChunkDirective {
                field_path: "Id".into(),
                op: Operator::In,
                values,
                config: ChunkConfig::size(2),
            }]
        );
        let batches = out.chunks[0].batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1], &[Value::from("3")]);
    }

    #[test]
    fn test_empty_chunked_list_adds_no_directive() {
        let ops = FieldOps::new()
            .not_in(Vec::<String>::new())
            .chunk(ChunkConfig::size(5));
        let filter = Filter::new().field("id", ops);
        assert!(norm(&filter).chunks.is_empty());
    }

    #[test]
    fn test_normalize_is_idempotent_on_its_output() {
        let filter = Filter::from_json(&json!({
            "name": {"$like": "Acme%"},
            "amount": {"$gte": 25000, "$between": [1, 2]},
            "ownerId": null,
            "id": {"$nin": ["x"], "$ne": null},
            "$or": [{"accountName": {"$endsWith": "Inc"}}, {"$raw": "IsWon = true"}],
            "$not": {"amount": {"$ne": 5}}
        }))
        .unwrap();
        let first = norm(&filter).ast.unwrap();
        let second = norm(&Filter::from_ast(&first)).ast.unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let filter = Filter::new().eq("name", "x").field("amount", FieldOps::new().gt(1));
        assert_eq!(norm(&filter), norm(&filter));
    }
}
