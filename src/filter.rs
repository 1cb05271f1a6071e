//! Caller-facing filter DSL.
//!
//! Filters are built either through the fluent API or from a JSON document
//! using the `$`-operator syntax:
//!
//! ```text
//! { "name": { "$like": "Acme%" },
//!   "amount": { "$gte": 25000 },
//!   "ownerId": null,
//!   "$or": [ { "stage": "Won" }, { "stage": "Lost" } ] }
//! ```
//!
//! Field values are a closed set of variants ([`FieldFilter`]), so the
//! normalizer never has to guess whether a value is a literal or an
//! operator object.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

use crate::ast::{Operand, Operator, Value, WhereAst};
use crate::error::{QueryError, QueryResult};
use crate::normalizer::UnknownFieldPolicy;

/// Request to split a membership list into sub-batches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkConfig {
    pub size: Option<usize>,
    pub parallel: Option<usize>,
}

impl ChunkConfig {
    pub fn size(size: usize) -> Self {
        Self { size: Some(size), parallel: None }
    }

    pub fn parallel(mut self, parallel: usize) -> Self {
        self.parallel = Some(parallel);
        self
    }
}

/// Values for `$in` / `$nin`, optionally annotated with a chunk directive.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueList {
    pub values: Vec<Value>,
    pub chunk: Option<ChunkConfig>,
}

impl ValueList {
    pub fn new<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Self {
            values: values.into_iter().map(Into::into).collect(),
            chunk: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    Eq(Value),
    /// `Ne(Value::Null)` means "is not null".
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    Like(String),
    StartsWith(String),
    EndsWith(String),
    In(ValueList),
    NotIn(ValueList),
    Between(Value, Value),
    Exists(bool),
}

/// Operator object for one field. Operators are applied in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldOps {
    ops: Vec<FieldOp>,
}

impl FieldOps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, op: FieldOp) -> Self {
        self.ops.push(op);
        self
    }

    pub fn eq(self, v: impl Into<Value>) -> Self {
        self.push(FieldOp::Eq(v.into()))
    }

    pub fn ne(self, v: impl Into<Value>) -> Self {
        self.push(FieldOp::Ne(v.into()))
    }

    pub fn gt(self, v: impl Into<Value>) -> Self {
        self.push(FieldOp::Gt(v.into()))
    }

    pub fn gte(self, v: impl Into<Value>) -> Self {
        self.push(FieldOp::Gte(v.into()))
    }

    pub fn lt(self, v: impl Into<Value>) -> Self {
        self.push(FieldOp::Lt(v.into()))
    }

    pub fn lte(self, v: impl Into<Value>) -> Self {
        self.push(FieldOp::Lte(v.into()))
    }

    pub fn like(self, pattern: impl Into<String>) -> Self {
        self.push(FieldOp::Like(pattern.into()))
    }

    pub fn starts_with(self, prefix: impl Into<String>) -> Self {
        self.push(FieldOp::StartsWith(prefix.into()))
    }

    pub fn ends_with(self, suffix: impl Into<String>) -> Self {
        self.push(FieldOp::EndsWith(suffix.into()))
    }

    pub fn is_in<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Self {
        self.push(FieldOp::In(ValueList::new(values)))
    }

    pub fn not_in<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Self {
        self.push(FieldOp::NotIn(ValueList::new(values)))
    }

    pub fn between(self, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        self.push(FieldOp::Between(low.into(), high.into()))
    }

    pub fn exists(self, exists: bool) -> Self {
        self.push(FieldOp::Exists(exists))
    }

    /// Attach a chunk directive to every `$in`/`$nin` already added.
    pub fn chunk(mut self, cfg: ChunkConfig) -> Self {
        for op in &mut self.ops {
            if let FieldOp::In(list) | FieldOp::NotIn(list) = op {
                list.chunk = Some(cfg);
            }
        }
        self
    }

    pub fn ops(&self) -> &[FieldOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// What a logical field key is matched against.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldFilter {
    /// Shorthand for "is null".
    Null,
    /// Shorthand for equality. Arrays are compared as a whole.
    Value(Value),
    Ops(FieldOps),
}

impl From<FieldOps> for FieldFilter {
    fn from(ops: FieldOps) -> Self {
        FieldFilter::Ops(ops)
    }
}

impl From<Value> for FieldFilter {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => FieldFilter::Null,
            v => FieldFilter::Value(v),
        }
    }
}

macro_rules! field_filter_from_value {
    ($($t:ty),*) => {
        $(
            impl From<$t> for FieldFilter {
                fn from(v: $t) -> Self {
                    FieldFilter::from(Value::from(v))
                }
            }
        )*
    };
}

field_filter_from_value!(bool, i32, i64, u32, f64, &str, String, NaiveDate, DateTime<Utc>);

impl<T: Into<Value>> From<Option<T>> for FieldFilter {
    fn from(v: Option<T>) -> Self {
        FieldFilter::from(Value::from(v))
    }
}

impl<T: Into<Value>> From<Vec<T>> for FieldFilter {
    fn from(v: Vec<T>) -> Self {
        FieldFilter::Value(Value::from(v))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterEntry {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    /// Trusted provider fragment, emitted without escaping.
    Raw(String),
    Field { key: String, filter: FieldFilter },
}

/// A filter expression: entries combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "serde_json::Value")]
pub struct Filter {
    entries: Vec<FilterEntry>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[FilterEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(mut self, entry: FilterEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Match `key` against a literal, `None`/null, or an operator object.
    pub fn field(self, key: impl Into<String>, filter: impl Into<FieldFilter>) -> Self {
        self.push(FilterEntry::Field { key: key.into(), filter: filter.into() })
    }

    pub fn eq(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let value: Value = value.into();
        self.field(key, FieldFilter::from(value))
    }

    pub fn is_null(self, key: impl Into<String>) -> Self {
        self.field(key, FieldFilter::Null)
    }

    pub fn is_not_null(self, key: impl Into<String>) -> Self {
        self.field(key, FieldOps::new().ne(Value::Null))
    }

    pub fn and(self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.push(FilterEntry::And(filters.into_iter().collect()))
    }

    pub fn or(self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.push(FilterEntry::Or(filters.into_iter().collect()))
    }

    pub fn not(self, filter: Filter) -> Self {
        self.push(FilterEntry::Not(Box::new(filter)))
    }

    pub fn raw(self, fragment: impl Into<String>) -> Self {
        self.push(FilterEntry::Raw(fragment.into()))
    }

    /// Parse the `$`-operator JSON syntax, rejecting anything unrecognized.
    pub fn from_json(value: &Json) -> QueryResult<Self> {
        Self::from_json_with(value, UnknownFieldPolicy::Reject)
    }

    /// Parse with an explicit policy. `Ignore` drops unknown operators and
    /// malformed operands; the document itself must still be an object or
    /// `null`.
    pub fn from_json_with(value: &Json, policy: UnknownFieldPolicy) -> QueryResult<Self> {
        JsonParser { policy }.filter(value)
    }

    /// Rebuild a filter that normalizes back to `ast`.
    pub fn from_ast(ast: &WhereAst) -> Self {
        Filter::new().push(entry_from_ast(ast))
    }
}

impl TryFrom<Json> for Filter {
    type Error = QueryError;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        Filter::from_json(&value)
    }
}

fn entry_from_ast(ast: &WhereAst) -> FilterEntry {
    match ast {
        WhereAst::And(nodes) => FilterEntry::And(nodes.iter().map(Filter::from_ast).collect()),
        WhereAst::Or(nodes) => FilterEntry::Or(nodes.iter().map(Filter::from_ast).collect()),
        WhereAst::Not(node) => FilterEntry::Not(Box::new(Filter::from_ast(node))),
        WhereAst::Raw(fragment) => FilterEntry::Raw(fragment.clone()),
        WhereAst::Cond(cond) => {
            let filter = match (cond.op, &cond.operand) {
                (Operator::IsNull, _) => FieldFilter::Null,
                (Operator::IsNotNull, _) => FieldOps::new().ne(Value::Null).into(),
                (Operator::In, Operand::List(values)) => {
                    FieldOps::new().is_in(values.clone()).into()
                }
                (Operator::NotIn, Operand::List(values)) => {
                    FieldOps::new().not_in(values.clone()).into()
                }
                (Operator::Between, Operand::Range(low, high)) => {
                    FieldOps::new().between(low.clone(), high.clone()).into()
                }
                (op, Operand::Value(v)) => {
                    FieldOps::new().push(op_with_value(op, v.clone())).into()
                }
                // Operator/operand mismatch; only reachable for hand-built trees.
                (_, _) => FieldOps::new().into(),
            };
            FilterEntry::Field { key: cond.field_key.clone(), filter }
        }
    }
}

fn op_with_value(op: Operator, v: Value) -> FieldOp {
    match op {
        Operator::Ne => FieldOp::Ne(v),
        Operator::Gt => FieldOp::Gt(v),
        Operator::Gte => FieldOp::Gte(v),
        Operator::Lt => FieldOp::Lt(v),
        Operator::Lte => FieldOp::Lte(v),
        Operator::Like => FieldOp::Like(v.to_string()),
        Operator::StartsWith => FieldOp::StartsWith(v.to_string()),
        Operator::EndsWith => FieldOp::EndsWith(v.to_string()),
        _ => FieldOp::Eq(v),
    }
}

/// JSON → [`Filter`] decoding.
///
/// Under [`UnknownFieldPolicy::Ignore`] a malformed or unrecognized part
/// (unknown `$` keys, wrong operand shapes) is dropped instead of failing
/// the whole document.
struct JsonParser {
    policy: UnknownFieldPolicy,
}

impl JsonParser {
    fn lenient<T>(&self, result: QueryResult<T>) -> QueryResult<Option<T>> {
        match (result, self.policy) {
            (Ok(v), _) => Ok(Some(v)),
            (Err(e), UnknownFieldPolicy::Ignore) => {
                tracing::trace!(error = %e, "dropping filter part");
                Ok(None)
            }
            (Err(e), UnknownFieldPolicy::Reject) => Err(e),
        }
    }

    fn filter(&self, value: &Json) -> QueryResult<Filter> {
        match value {
            Json::Null => Ok(Filter::new()),
            Json::Object(map) => self.object(map),
            other => Err(QueryError::invalid_filter(format!(
                "filter must be an object, got {}",
                other
            ))),
        }
    }

    fn object(&self, map: &Map<String, Json>) -> QueryResult<Filter> {
        let mut filter = Filter::new();
        for (key, value) in map {
            let entry = match key.as_str() {
                "$and" | "$or" => self.combinator(key, value),
                "$not" => self.filter(value).map(|f| FilterEntry::Not(Box::new(f))),
                "$raw" => match value {
                    Json::String(fragment) => Ok(FilterEntry::Raw(fragment.clone())),
                    _ => Err(QueryError::invalid_filter("$raw expects a string")),
                },
                k if k.starts_with('$') => {
                    Err(QueryError::invalid_filter(format!("unknown combinator '{}'", k)))
                }
                field => self.field(field, value).map(|filter| FilterEntry::Field {
                    key: field.to_string(),
                    filter,
                }),
            };
            if let Some(entry) = self.lenient(entry)? {
                filter.entries.push(entry);
            }
        }
        Ok(filter)
    }

    fn combinator(&self, key: &str, value: &Json) -> QueryResult<FilterEntry> {
        let items = value.as_array().ok_or_else(|| {
            QueryError::invalid_filter(format!("{} expects an array of filters", key))
        })?;
        let mut filters = Vec::with_capacity(items.len());
        for item in items {
            if let Some(f) = self.lenient(self.filter(item))? {
                filters.push(f);
            }
        }
        Ok(if key == "$and" {
            FilterEntry::And(filters)
        } else {
            FilterEntry::Or(filters)
        })
    }

    fn field(&self, field: &str, value: &Json) -> QueryResult<FieldFilter> {
        match value {
            Json::Null => Ok(FieldFilter::Null),
            Json::Object(ops) => self.ops(field, ops).map(FieldFilter::Ops),
            scalar => json_to_value(scalar).map(FieldFilter::Value),
        }
    }

    fn ops(&self, field: &str, map: &Map<String, Json>) -> QueryResult<FieldOps> {
        let mut ops = FieldOps::new();
        let mut chunk = None;

        for (op, v) in map {
            let parsed = match op.as_str() {
                "$eq" => json_to_value(v).map(FieldOp::Eq),
                "$ne" => json_to_value(v).map(FieldOp::Ne),
                "$gt" => json_to_value(v).map(FieldOp::Gt),
                "$gte" => json_to_value(v).map(FieldOp::Gte),
                "$lt" => json_to_value(v).map(FieldOp::Lt),
                "$lte" => json_to_value(v).map(FieldOp::Lte),
                "$like" => json_to_value(v).map(|p| FieldOp::Like(p.to_string())),
                "$startsWith" => json_to_value(v).map(|p| FieldOp::StartsWith(p.to_string())),
                "$endsWith" => json_to_value(v).map(|p| FieldOp::EndsWith(p.to_string())),
                "$in" => json_to_list(field, op, v).map(FieldOp::In),
                "$nin" => json_to_list(field, op, v).map(FieldOp::NotIn),
                "$between" => match v.as_array().map(Vec::as_slice) {
                    Some([low, high]) => {
                        Ok(FieldOp::Between(json_to_value(low)?, json_to_value(high)?))
                    }
                    _ => Err(QueryError::invalid_filter(format!(
                        "{}: $between expects a two-element array",
                        field
                    ))),
                },
                "$exists" => match v {
                    Json::Bool(b) => Ok(FieldOp::Exists(*b)),
                    _ => Err(QueryError::invalid_filter(format!(
                        "{}: $exists expects a boolean",
                        field
                    ))),
                },
                "$chunk" => {
                    let cfg = serde_json::from_value::<ChunkConfig>(v.clone()).map_err(|e| {
                        QueryError::invalid_filter(format!("{}: invalid $chunk: {}", field, e))
                    });
                    chunk = self.lenient(cfg)?;
                    continue;
                }
                other => Err(QueryError::invalid_filter(format!(
                    "{}: unknown operator '{}'",
                    field, other
                ))),
            };
            if let Some(parsed) = self.lenient(parsed)? {
                ops = ops.push(parsed);
            }
        }

        if let Some(cfg) = chunk {
            let has_membership = ops
                .ops
                .iter()
                .any(|op| matches!(op, FieldOp::In(_) | FieldOp::NotIn(_)));
            let cfg = if has_membership {
                Ok(cfg)
            } else {
                Err(QueryError::invalid_filter(format!(
                    "{}: $chunk requires $in or $nin",
                    field
                )))
            };
            if let Some(cfg) = self.lenient(cfg)? {
                ops = ops.chunk(cfg);
            }
        }
        Ok(ops)
    }
}

fn json_to_list(field: &str, op: &str, v: &Json) -> QueryResult<ValueList> {
    match v {
        Json::Array(items) => Ok(ValueList {
            values: items.iter().map(json_to_value).collect::<QueryResult<_>>()?,
            chunk: None,
        }),
        _ => Err(QueryError::invalid_filter(format!("{}: {} expects an array", field, op))),
    }
}

/// Convert a JSON literal. Strings are never sniffed for dates.
pub fn json_to_value(v: &Json) -> QueryResult<Value> {
    match v {
        Json::Null => Ok(Value::Null),
        Json::Bool(b) => Ok(Value::Bool(*b)),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Ok(Value::Int(i)),
            None => n
                .as_f64()
                .map(Value::Float)
                .ok_or_else(|| QueryError::invalid_filter(format!("unrepresentable number {}", n))),
        },
        Json::String(s) => Ok(Value::String(s.clone())),
        Json::Array(items) => Ok(Value::Array(
            items.iter().map(json_to_value).collect::<QueryResult<_>>()?,
        )),
        Json::Object(_) => Err(QueryError::invalid_filter(
            "objects are not allowed in value position",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_json_shorthands() {
        let doc = json!({"ownerId": null, "stage": "Won", "tags": ["a", "b"]});
        let f = Filter::from_json(&doc).unwrap();
        assert_eq!(
            f.entries(),
            &[
                FilterEntry::Field { key: "ownerId".into(), filter: FieldFilter::Null },
                FilterEntry::Field {
                    key: "stage".into(),
                    filter: FieldFilter::Value("Won".into()),
                },
                FilterEntry::Field {
                    key: "tags".into(),
                    filter: FieldFilter::Value(Value::from(vec!["a", "b"])),
                },
            ]
        );
    }

    #[test]
    fn test_json_operator_object_matches_builder() {
        let parsed = Filter::from_json(&json!({"amount": {"$gte": 25000, "$lt": 1.5}})).unwrap();
        let built = Filter::new().field("amount", FieldOps::new().gte(25000).lt(1.5));
        assert_eq!(parsed, built);
    }

    #[test]
    fn test_json_chunk_attaches_to_membership() {
        let doc = json!({"id": {"$in": ["1", "2"], "$chunk": {"size": 200}}});
        let f = Filter::from_json(&doc).unwrap();
        let expected = Filter::new().field(
            "id",
            FieldOps::new().is_in(["1", "2"]).chunk(ChunkConfig::size(200)),
        );
        assert_eq!(f, expected);
    }

    #[test]
    fn test_json_rejects_unknown_operator() {
        let err = Filter::from_json(&json!({"amount": {"$gtee": 1}})).unwrap_err();
        assert!(err.to_string().contains("unknown operator '$gtee'"));
    }

    #[test]
    fn test_json_rejects_bad_shapes() {
        assert!(Filter::from_json(&json!([1])).is_err());
        assert!(Filter::from_json(&json!({"$and": {"a": 1}})).is_err());
        assert!(Filter::from_json(&json!({"$raw": 5})).is_err());
        assert!(Filter::from_json(&json!({"$xor": []})).is_err());
        assert!(Filter::from_json(&json!({"a": {"$between": [1]}})).is_err());
        assert!(Filter::from_json(&json!({"a": {"$chunk": {"size": 2}}})).is_err());
        assert!(Filter::from_json(&json!({"a": {"$eq": {"nested": true}}})).is_err());
    }

    #[test]
    fn test_lenient_parse_drops_unrecognized_parts() {
        let doc = json!({
            "id": {"$regex": "x"},
            "amount": {"$gte": 10, "$between": [1], "$in": "nope"},
            "$xor": [],
            "$or": [{"stage": "Won"}, 5]
        });
        let f = Filter::from_json_with(&doc, UnknownFieldPolicy::Ignore).unwrap();
        let expected = Filter::new()
            .field("id", FieldOps::new())
            .field("amount", FieldOps::new().gte(10))
            .or([Filter::new().eq("stage", "Won")]);
        assert_eq!(f, expected);

        assert!(Filter::from_json_with(&doc, UnknownFieldPolicy::Reject).is_err());
        assert!(Filter::from_json_with(&json!([1]), UnknownFieldPolicy::Ignore).is_err());
    }

    #[test]
    fn test_lenient_parse_drops_orphan_chunk() {
        let doc = json!({"id": {"$eq": "a", "$chunk": {"size": 2}}});
        let f = Filter::from_json_with(&doc, UnknownFieldPolicy::Ignore).unwrap();
        assert_eq!(f, Filter::new().field("id", FieldOps::new().eq("a")));
    }

    #[test]
    fn test_json_null_is_empty_filter() {
        assert!(Filter::from_json(&Json::Null).unwrap().is_empty());
    }

    #[test]
    fn test_deserialize_via_serde() {
        let text = r#"{"$not": {"name": {"$startsWith": "Ac"}}}"#;
        let f: Filter = serde_json::from_str(text).unwrap();
        let inner = Filter::new().field("name", FieldOps::new().starts_with("Ac"));
        let expected = Filter::new().not(inner);
        assert_eq!(f, expected);
    }

    #[test]
    fn test_option_shorthand() {
        let f = Filter::new().field("ownerId", Option::<String>::None);
        assert_eq!(
            f.entries()[0],
            FilterEntry::Field { key: "ownerId".into(), filter: FieldFilter::Null }
        );
    }
}
