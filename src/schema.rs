//! Result schemas.
//!
//! A [`Schema`] describes the public shape of a model's records. Queries
//! validate against a projection of it that contains exactly the selected
//! fields, so fields that were not fetched are never required.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

use crate::error::{FieldIssue, ValidationError};

/// A JSON object record.
pub type Record = Map<String, Json>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    /// `YYYY-MM-DD`
    Date,
    /// Any RFC 3339 timestamp, or the `+0000` offset form providers emit.
    /// Normalized to UTC with milliseconds.
    DateTime,
    /// Anything, passed through untouched.
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    #[serde(rename = "type")]
    pub ty: FieldType,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub nullable: bool,
}

fn default_required() -> bool {
    true
}

impl FieldSchema {
    pub fn new(ty: FieldType) -> Self {
        Self { ty, required: true, nullable: false }
    }

    pub fn string() -> Self {
        Self::new(FieldType::String)
    }

    pub fn integer() -> Self {
        Self::new(FieldType::Integer)
    }

    pub fn number() -> Self {
        Self::new(FieldType::Number)
    }

    pub fn boolean() -> Self {
        Self::new(FieldType::Boolean)
    }

    pub fn date() -> Self {
        Self::new(FieldType::Date)
    }

    pub fn datetime() -> Self {
        Self::new(FieldType::DateTime)
    }

    pub fn json() -> Self {
        Self::new(FieldType::Json)
    }

    /// Allow the field to be absent.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Allow an explicit `null`.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    fn coerce(&self, value: &Json) -> Result<Json, String> {
        if value.is_null() {
            return if self.nullable || self.ty == FieldType::Json {
                Ok(Json::Null)
            } else {
                Err("must not be null".to_string())
            };
        }
        match self.ty {
            FieldType::Json => Ok(value.clone()),
            FieldType::String => match value {
                Json::String(_) => Ok(value.clone()),
                other => Err(format!("expected string, got {}", kind(other))),
            },
            FieldType::Boolean => match value {
                Json::Bool(_) => Ok(value.clone()),
                other => Err(format!("expected boolean, got {}", kind(other))),
            },
            FieldType::Number => match value {
                Json::Number(_) => Ok(value.clone()),
                other => Err(format!("expected number, got {}", kind(other))),
            },
            FieldType::Integer => match value {
                Json::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
                // Providers commonly send whole numbers as 42.0
                Json::Number(n) => match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                        Ok(Json::from(f as i64))
                    }
                    _ => Err(format!("expected integer, got {}", n)),
                },
                other => Err(format!("expected integer, got {}", kind(other))),
            },
            FieldType::Date => match value {
                Json::String(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map(|d| Json::String(d.format("%Y-%m-%d").to_string()))
                    .map_err(|_| format!("invalid date '{}'", s)),
                other => Err(format!("expected date string, got {}", kind(other))),
            },
            FieldType::DateTime => match value {
                Json::String(s) => parse_datetime(s)
                    .map(|dt| Json::String(dt.to_rfc3339_opts(SecondsFormat::Millis, true)))
                    .ok_or_else(|| format!("invalid datetime '{}'", s)),
                other => Err(format!("expected datetime string, got {}", kind(other))),
            },
        }
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z")
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn kind(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

/// Ordered field schemas for one model.
///
/// Record keys without a declared schema pass through validation untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<(String, FieldSchema)>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, key: impl Into<String>, schema: FieldSchema) -> Self {
        let key = key.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = schema,
            None => self.fields.push((key, schema)),
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, s)| s)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Schema containing exactly the declared fields named in `keys`.
    pub fn project<'a>(&self, keys: impl IntoIterator<Item = &'a str>) -> Schema {
        let keys: Vec<&str> = keys.into_iter().collect();
        Schema {
            fields: self
                .fields
                .iter()
                .filter(|(k, _)| keys.contains(&k.as_str()))
                .cloned()
                .collect(),
        }
    }

    /// Check and coerce one record.
    ///
    /// `index` is the record's position in the response and only used for
    /// error reporting. All issues of the record are collected before failing.
    pub fn validate(&self, mut record: Record, index: usize) -> Result<Record, ValidationError> {
        let mut issues = Vec::new();

        for (key, schema) in &self.fields {
            match record.get(key) {
                None => {
                    if schema.required {
                        issues.push(FieldIssue {
                            field: key.clone(),
                            reason: "required".to_string(),
                        });
                    }
                }
                Some(value) => match schema.coerce(value) {
                    Ok(coerced) => {
                        record.insert(key.clone(), coerced);
                    }
                    Err(reason) => issues.push(FieldIssue { field: key.clone(), reason }),
                },
            }
        }

        if issues.is_empty() {
            Ok(record)
        } else {
            Err(ValidationError { record: index, issues })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(value: Json) -> Record {
        match value {
            Json::Object(map) => map,
            _ => unreachable!("test records are objects"),
        }
    }

    fn opportunity() -> Schema {
        Schema::new()
            .field("id", FieldSchema::string())
            .field("name", FieldSchema::string())
            .field("amount", FieldSchema::number().nullable())
            .field("closeDate", FieldSchema::date().optional())
    }

    #[test]
    fn test_project_keeps_only_selected() {
        let projected = opportunity().project(["id", "amount", "nope"]);
        assert_eq!(projected.len(), 2);
        assert!(projected.get("name").is_none());
    }

    #[test]
    fn test_unselected_required_field_is_not_enforced() {
        let projected = opportunity().project(["id"]);
        let out = projected.validate(record(json!({"id": "006"})), 0).unwrap();
        assert_eq!(Json::Object(out), json!({"id": "006"}));
    }

    #[test]
    fn test_missing_required_field_fails() {
        let err = opportunity()
            .validate(record(json!({"id": "006", "amount": null})), 3)
            .unwrap_err();
        assert_eq!(err.record, 3);
        assert_eq!(
            err.issues,
            vec![FieldIssue { field: "name".into(), reason: "required".into() }]
        );
    }

    #[test]
    fn test_missing_optional_field_passes() {
        let out = opportunity()
            .validate(record(json!({"id": "1", "name": "Acme", "amount": 5})), 0)
            .unwrap();
        assert!(!out.contains_key("closeDate"));
    }

    #[test]
    fn test_type_mismatch_reports_every_field() {
        let err = opportunity()
            .validate(record(json!({"id": 1, "name": "Acme", "amount": "lots"})), 0)
            .unwrap_err();
        let fields: Vec<&str> = err.issues.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(fields, vec!["id", "amount"]);
    }

    #[test]
    fn test_null_needs_nullable() {
        let schema = Schema::new().field("name", FieldSchema::string());
        assert!(schema.validate(record(json!({"name": null})), 0).is_err());
        let schema = Schema::new().field("name", FieldSchema::string().nullable());
        assert!(schema.validate(record(json!({"name": null})), 0).is_ok());
    }

    #[test]
    fn test_datetime_is_normalized() {
        let schema = Schema::new().field("createdDate", FieldSchema::datetime());
        let out = schema
            .validate(record(json!({"createdDate": "2024-03-01T10:00:00.000+0000"})), 0)
            .unwrap();
        assert_eq!(out["createdDate"], json!("2024-03-01T10:00:00.000Z"));
    }

    #[test]
    fn test_whole_float_coerces_to_integer() {
        let schema = Schema::new().field("count", FieldSchema::integer());
        let out = schema.validate(record(json!({"count": 42.0})), 0).unwrap();
        assert_eq!(out["count"], json!(42));
        assert!(schema.validate(record(json!({"count": 4.5})), 0).is_err());
    }

    #[test]
    fn test_undeclared_keys_pass_through() {
        let out = Schema::new().validate(record(json!({"anything": [1, 2]})), 0).unwrap();
        assert_eq!(out["anything"], json!([1, 2]));
    }
}
