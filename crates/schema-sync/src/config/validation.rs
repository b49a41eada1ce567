//! Configuration validation.

use std::collections::HashSet;

use super::Config;
use crate::core::identifier::{validate_identifier, Timezone};
use crate::drivers::DialectImpl;
use crate::error::{Result, SyncError};
use crate::orchestrator::builder::validate_property;

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    // Connection validation
    if config.connection.dialect.is_empty() {
        return Err(SyncError::Config("connection.dialect is required".into()));
    }
    if config.connection.url.is_empty() {
        return Err(SyncError::Config("connection.url is required".into()));
    }
    DialectImpl::from_dialect(&config.connection.dialect)?;

    // Sync validation
    Timezone::parse(&config.sync.timezone)?;

    for (name, sql) in &config.types {
        if name.is_empty() {
            return Err(SyncError::Config("types: type name is required".into()));
        }
        if sql.trim().is_empty() {
            return Err(SyncError::Config(format!(
                "types.{}: datastore type is required",
                name
            )));
        }
    }

    // Collection validation
    let mut seen = HashSet::new();
    for (i, collection) in config.collections.iter().enumerate() {
        if collection.name.is_empty() {
            return Err(SyncError::Config(format!(
                "collections[{}].name is required",
                i
            )));
        }
        validate_identifier(&collection.name)?;
        if !seen.insert(collection.name.as_str()) {
            return Err(SyncError::Config(format!(
                "Duplicate collection '{}'",
                collection.name
            )));
        }
        if collection.properties.is_empty() {
            return Err(SyncError::Config(format!(
                "collections[{}] ({}) has no properties",
                i, collection.name
            )));
        }
        for (name, property) in &collection.properties {
            validate_property(&collection.name, name, property)?;
        }
        for table in &collection.many_to_many {
            validate_identifier(table)?;
        }
    }

    Ok(())
}
