//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use std::path::Path;
use std::sync::Arc;

use crate::core::identifier::Timezone;
use crate::core::traits::{Driver, FixedType};
use crate::error::Result;
use crate::orchestrator::{SyncOptions, Synchronizer};

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Build a synchronizer for `driver` with every configured type and
    /// collection registered.
    pub fn synchronizer(&self, driver: Arc<dyn Driver>) -> Result<Synchronizer> {
        let mut sync = Synchronizer::new(driver, self.sync.options())?;
        for (name, sql) in &self.types {
            sync.define_type(name.clone(), FixedType(sql.clone()));
        }
        for collection in &self.collections {
            sync.define_collection(collection.name.clone(), collection.properties.clone())?;
            if !collection.many_to_many.is_empty() {
                sync.define_join_tables(&collection.name, collection.many_to_many.iter().cloned())?;
            }
        }
        Ok(sync)
    }
}

impl SyncConfig {
    /// Orchestrator options.
    pub fn options(&self) -> SyncOptions {
        SyncOptions {
            alter_existing: self.alter_existing,
            suppress_column_drop: self.suppress_column_drop,
        }
    }

    /// Parsed timezone.
    pub fn timezone(&self) -> Result<Timezone> {
        Timezone::parse(&self.timezone)
    }
}
