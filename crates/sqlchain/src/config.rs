//! Engine configuration.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlchain_callbacks::Settings;
use sqlchain_core::dialect::by_name;
use sqlchain_core::{Dialect, Error, Result};

/// Serializable engine settings.
///
/// ```
/// use sqlchain::EngineConfig;
///
/// let config = EngineConfig::from_json(r#"{ "dialect": "postgres", "save_associations": false }"#)?;
/// assert_eq!(config.dialect, "postgres");
/// assert_eq!(config.created_at_field, "created_at");
/// # Ok::<(), sqlchain::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Built-in dialect name: `sqlite3`, `postgres`, `mysql` or `mssql`.
    pub dialect: String,
    /// Use `RETURNING` instead of the rowid on SQLite.
    pub sqlite_returning: bool,
    /// Field stamped with the creation time when blank.
    pub created_at_field: String,
    /// Field stamped with the update time when blank.
    pub updated_at_field: String,
    /// Save related entities along with their owner.
    pub save_associations: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let settings = Settings::default();
        Self {
            dialect: "sqlite3".to_string(),
            sqlite_returning: false,
            created_at_field: settings.created_at_field,
            updated_at_field: settings.updated_at_field,
            save_associations: settings.save_associations,
        }
    }
}

impl EngineConfig {
    /// Parse a JSON document. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.created_at_field.trim().is_empty() || self.updated_at_field.trim().is_empty() {
            return Err(Error::Config("timestamp field names must not be empty".into()));
        }
        self.resolve_dialect().map(|_| ())
    }

    /// The configured dialect.
    pub fn resolve_dialect(&self) -> Result<Arc<dyn Dialect>> {
        if self.sqlite_returning && matches!(self.dialect.as_str(), "sqlite" | "sqlite3") {
            return Ok(Arc::new(sqlchain_core::Sqlite::with_returning()));
        }
        by_name(&self.dialect)
            .ok_or_else(|| Error::Config(format!("unknown dialect '{}'", self.dialect)))
    }

    pub fn settings(&self) -> Settings {
        Settings {
            created_at_field: self.created_at_field.clone(),
            updated_at_field: self.updated_at_field.clone(),
            save_associations: self.save_associations,
        }
    }
}
