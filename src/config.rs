//! TOML configuration: provider settings and model declarations.
//!
//! ```toml
//! [salesforce]
//! version = "59.0"
//!
//! [[models]]
//! name = "Opportunity"
//! object = "Opportunity"
//! provider = "salesforce"
//!
//! [[models.fields]]
//! key = "id"
//! path = "Id"
//! type = "string"
//!
//! [[models.fields]]
//! key = "accountName"
//! path = "Account.Name"
//! type = "string"
//! required = false
//! nullable = true
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dialects::{HubspotConfig, SalesforceConfig};
use crate::error::{QueryError, QueryResult};
use crate::model::{ModelDef, ModelRegistry, Provider};
use crate::orm::OrmConfig;
use crate::schema::{FieldSchema, FieldType, Schema};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub salesforce: Option<SalesforceConfig>,
    pub hubspot: Option<HubspotConfig>,
    #[serde(default)]
    pub models: Vec<ModelSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub name: String,
    pub object: String,
    pub provider: Provider,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub relations: Vec<RelationSpec>,
}

/// A field mapping. Giving a `type` also adds the field to the model schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub key: String,
    pub path: String,
    #[serde(rename = "type")]
    pub ty: Option<FieldType>,
    pub required: Option<bool>,
    pub nullable: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationSpec {
    pub key: String,
    pub model: String,
    pub local_key: String,
    pub foreign_key: String,
}

impl ConfigFile {
    /// `<config dir>/crmql/models.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("crmql").join("models.toml"))
    }

    pub fn load(path: impl AsRef<Path>) -> QueryResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| QueryError::Config(format!("{}: {e}", path.display())))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| QueryError::Config(format!("{}: {e}", path.display())))?;
        tracing::info!(path = %path.display(), models = config.models.len(), "loaded config");
        Ok(config)
    }

    /// Load from `path`, or from [`ConfigFile::default_path`] when `None`.
    pub fn load_or_default(path: Option<&Path>) -> QueryResult<Self> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let p = Self::default_path().ok_or_else(|| {
                    QueryError::Config("no config directory on this platform".to_string())
                })?;
                Self::load(p)
            }
        }
    }

    pub fn parse(content: &str) -> QueryResult<Self> {
        toml::from_str(content).map_err(|e| QueryError::Config(e.to_string()))
    }

    /// Split into ORM settings and a populated model registry.
    pub fn into_parts(self) -> QueryResult<(OrmConfig, ModelRegistry)> {
        let mut registry = ModelRegistry::new();
        for spec in self.models {
            registry.register(spec.into_model()?);
        }
        let orm = OrmConfig { salesforce: self.salesforce, hubspot: self.hubspot };
        Ok((orm, registry))
    }
}

impl ModelSpec {
    pub fn into_model(self) -> QueryResult<ModelDef> {
        let mut builder = ModelDef::builder(&self.name, self.object, self.provider);
        let mut schema = Schema::new();

        for field in self.fields {
            if let Some(ty) = field.ty {
                let mut fs = FieldSchema::new(ty);
                fs.required = field.required.unwrap_or(true);
                fs.nullable = field.nullable.unwrap_or(false);
                schema = schema.field(&field.key, fs);
            }
            builder = builder.field(field.key, field.path);
        }
        for rel in self.relations {
            builder = builder.relation(rel.key, rel.model, rel.local_key, rel.foreign_key);
        }

        tracing::trace!(model = %self.name, fields = schema.len(), "model declared");
        builder.schema(schema).build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"
[salesforce]
version = "60.0"

[[models]]
name = "Opportunity"
object = "Opportunity"
provider = "salesforce"

[[models.fields]]
key = "id"
path = "Id"
type = "string"

[[models.fields]]
key = "accountName"
path = "Account.Name"
type = "string"
required = false
nullable = true

[[models.fields]]
key = "raw"
path = "Raw__c"

[[models.relations]]
key = "account"
model = "Account"
local_key = "accountId"
foreign_key = "id"

[[models]]
name = "Contact"
object = "contacts"
provider = "hubspot"
"#;

    #[test]
    fn test_parse_models_and_providers() {
        let (orm, registry) = ConfigFile::parse(SAMPLE).unwrap().into_parts().unwrap();
        assert_eq!(orm.salesforce.unwrap().version, "60.0");
        assert!(orm.hubspot.is_none());
        assert_eq!(registry.len(), 2);

        let opp = registry.get("Opportunity").unwrap();
        assert_eq!(opp.path_for("accountName"), Some("Account.Name"));
        assert_eq!(opp.field_keys().collect::<Vec<_>>(), vec!["id", "accountName", "raw"]);
        assert_eq!(opp.schema.len(), 2);
        assert_eq!(
            opp.schema.get("accountName"),
            Some(&FieldSchema::string().optional().nullable())
        );
        assert_eq!(opp.relation("account").unwrap().model, "Account");

        let contact = registry.get("Contact").unwrap();
        assert_eq!(contact.provider, Provider::Hubspot);
    }

    #[test]
    fn test_duplicate_field_is_config_error() {
        let toml = r#"
[[models]]
name = "Lead"
object = "Lead"
provider = "salesforce"
fields = [{ key = "id", path = "Id" }, { key = "id", path = "Other" }]
"#;
        let err = ConfigFile::parse(toml).unwrap().into_parts().unwrap_err();
        assert!(matches!(err, QueryError::Config(_)));
    }

    #[test]
    fn test_bad_provider_is_rejected() {
        let toml = r#"
[[models]]
name = "Deal"
object = "deals"
provider = "pipedrive"
"#;
        assert!(matches!(ConfigFile::parse(toml), Err(QueryError::Config(_))));
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = ConfigFile::load("/definitely/not/here/models.toml").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here/models.toml"));
    }
}
