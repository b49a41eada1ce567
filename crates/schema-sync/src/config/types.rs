//! Configuration types.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::schema::PropertyMap;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database connection.
    pub connection: ConnectionConfig,

    /// Sync behavior.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Custom types: name to datastore SQL type.
    #[serde(default)]
    pub types: IndexMap<String, String>,

    /// Collections to sync, in order.
    #[serde(default)]
    pub collections: Vec<CollectionConfig>,
}

/// Database connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Dialect: mysql, postgres, sqlite or redshift.
    pub dialect: String,

    /// Connection URL handed to the driver.
    #[serde(default)]
    pub url: String,
}

/// Sync behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Alter existing tables to match their declaration (default: false).
    #[serde(default)]
    pub alter_existing: bool,

    /// Keep undeclared live columns when altering (default: true).
    #[serde(default = "default_true")]
    pub suppress_column_drop: bool,

    /// Timezone for temporal default literals: "local", "Z" or "+HH:MM".
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            alter_existing: false,
            suppress_column_drop: true,
            timezone: default_timezone(),
        }
    }
}

/// One declared collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Table name.
    pub name: String,

    /// Properties in declaration order.
    #[serde(default)]
    pub properties: PropertyMap,

    /// Many-to-many join tables dropped with this collection.
    #[serde(default, alias = "manyToMany", skip_serializing_if = "Vec::is_empty")]
    pub many_to_many: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_timezone() -> String {
    "local".to_string()
}
