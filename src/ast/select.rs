use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ast::{SortOrder, WhereAst};
use crate::model::ModelDef;

/// Requested projection: logical key → included flag.
///
/// Flag order is kept as given, but projection order always follows the
/// model's field map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    entries: Vec<(String, bool)>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selection including exactly `keys`.
    pub fn fields<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: keys.into_iter().map(|k| (k.into(), true)).collect(),
        }
    }

    /// Set the flag for `key`, replacing an earlier flag for the same key.
    pub fn set(mut self, key: impl Into<String>, included: bool) -> Self {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = included,
            None => self.entries.push((key, included)),
        }
        self
    }

    pub fn includes(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, v)| k == key && *v)
    }

    /// Keys flagged `true`, in the order they were given.
    pub fn included_keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter(|(_, v)| *v).map(|(k, _)| k.as_str())
    }

    /// Every key mentioned, including ones flagged `false`.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortOrder,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: SortOrder::Asc }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: SortOrder::Desc }
    }
}

/// Convert `(key, "asc"|"desc")` pairs into an ordered list.
pub fn order_pairs_to_list<K, D>(pairs: impl IntoIterator<Item = (K, D)>) -> Vec<OrderBy>
where
    K: Into<String>,
    D: AsRef<str>,
{
    pairs
        .into_iter()
        .map(|(field, dir)| OrderBy {
            field: field.into(),
            direction: SortOrder::parse_lenient(dir.as_ref()),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaginationStrategy {
    #[default]
    Cursor,
}

/// Declarative pagination intent. Carried to the executor, never interpreted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub strategy: PaginationStrategy,
    pub field: String,
    pub page_size: Option<u32>,
}

impl PaginationConfig {
    pub fn cursor(field: impl Into<String>) -> Self {
        Self {
            strategy: PaginationStrategy::Cursor,
            field: field.into(),
            page_size: None,
        }
    }

    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }
}

/// Complete description of one read query, prior to dialect rendering.
#[derive(Debug, Clone)]
pub struct SelectAst {
    pub model: Arc<ModelDef>,
    /// `None` means every field in the model's field map.
    pub selection: Option<Selection>,
    pub filter: Option<WhereAst>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub pagination: Option<PaginationConfig>,
}

impl SelectAst {
    pub fn new(model: Arc<ModelDef>) -> Self {
        Self {
            model,
            selection: None,
            filter: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
            pagination: None,
        }
    }

    /// Logical keys this query projects.
    ///
    /// Follows field-map declaration order; selected keys the model does not
    /// declare are appended in selection order.
    pub fn projected_keys(&self) -> Vec<&str> {
        match &self.selection {
            None => self.model.field_keys().collect(),
            Some(sel) => {
                let mut keys: Vec<&str> =
                    self.model.field_keys().filter(|k| sel.includes(k)).collect();
                keys.extend(sel.included_keys().filter(|k| self.model.field(k).is_none()));
                keys
            }
        }
    }
}
