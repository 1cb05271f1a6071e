//! Model descriptors.
//!
//! A model maps logical field keys onto provider field paths for one remote
//! object. Descriptors are built once and shared read-only behind `Arc`.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, QueryResult};
use crate::schema::Schema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Salesforce,
    Hubspot,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Salesforce => "salesforce",
            Provider::Hubspot => "hubspot",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "salesforce" => Ok(Provider::Salesforce),
            "hubspot" => Ok(Provider::Hubspot),
            _ => Err(QueryError::UnknownProvider(s.to_string())),
        }
    }
}

/// One logical field and where the provider keeps it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub key: String,
    /// Provider path, e.g. `Owner.Name`. Dots traverse to-one relationships.
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDef {
    pub key: String,
    /// Name of the related model in the registry.
    pub model: String,
    pub local_key: String,
    pub foreign_key: String,
}

#[derive(Debug, Clone)]
pub struct ModelDef {
    pub name: String,
    /// Provider object name, e.g. `Opportunity`.
    pub object: String,
    pub provider: Provider,
    pub schema: Schema,
    fields: Vec<FieldDef>,
    relations: Vec<RelationDef>,
}

impl ModelDef {
    pub fn builder(
        name: impl Into<String>,
        object: impl Into<String>,
        provider: Provider,
    ) -> ModelBuilder {
        ModelBuilder {
            name: name.into(),
            object: object.into(),
            provider,
            schema: Schema::new(),
            fields: Vec::new(),
            relations: Vec::new(),
        }
    }

    pub fn field(&self, key: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn path_for(&self, key: &str) -> Option<&str> {
        self.field(key).map(|f| f.path.as_str())
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field_keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.key.as_str())
    }

    pub fn relations(&self) -> &[RelationDef] {
        &self.relations
    }

    pub fn relation(&self, key: &str) -> Option<&RelationDef> {
        self.relations.iter().find(|r| r.key == key)
    }
}

pub struct ModelBuilder {
    name: String,
    object: String,
    provider: Provider,
    schema: Schema,
    fields: Vec<FieldDef>,
    relations: Vec<RelationDef>,
}

impl ModelBuilder {
    pub fn field(mut self, key: impl Into<String>, path: impl Into<String>) -> Self {
        self.fields.push(FieldDef { key: key.into(), path: path.into() });
        self
    }

    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    pub fn relation(
        mut self,
        key: impl Into<String>,
        model: impl Into<String>,
        local_key: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        self.relations.push(RelationDef {
            key: key.into(),
            model: model.into(),
            local_key: local_key.into(),
            foreign_key: foreign_key.into(),
        });
        self
    }

    /// Fails if a field key is declared twice.
    pub fn build(self) -> QueryResult<ModelDef> {
        for (i, field) in self.fields.iter().enumerate() {
            if self.fields[..i].iter().any(|f| f.key == field.key) {
                return Err(QueryError::Config(format!(
                    "model '{}' declares field '{}' more than once",
                    self.name, field.key
                )));
            }
        }
        Ok(ModelDef {
            name: self.name,
            object: self.object,
            provider: self.provider,
            schema: self.schema,
            fields: self.fields,
            relations: self.relations,
        })
    }
}

/// Stamps the provider tag onto every model it creates.
#[derive(Debug, Clone, Copy)]
pub struct ModelFactory {
    provider: Provider,
}

impl ModelFactory {
    pub fn new(provider: Provider) -> Self {
        Self { provider }
    }

    pub fn model(&self, name: impl Into<String>, object: impl Into<String>) -> ModelBuilder {
        ModelDef::builder(name, object, self.provider)
    }
}

/// Name → model lookup. Registering an existing name replaces it.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    by_name: HashMap<String, Arc<ModelDef>>,
    order: Vec<String>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, model: ModelDef) -> Arc<ModelDef> {
        let model = Arc::new(model);
        if !self.by_name.contains_key(&model.name) {
            self.order.push(model.name.clone());
        }
        self.by_name.insert(model.name.clone(), Arc::clone(&model));
        model
    }

    pub fn get(&self, name: &str) -> Option<Arc<ModelDef>> {
        self.by_name.get(name).cloned()
    }

    /// Models in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ModelDef>> {
        self.order.iter().filter_map(|name| self.by_name.get(name))
    }

    /// Resolve a relation of `model` to the related descriptor.
    pub fn related(&self, model: &ModelDef, relation: &str) -> Option<Arc<ModelDef>> {
        model.relation(relation).and_then(|r| self.get(&r.model))
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
