//! Database driver implementations.
//!
//! This module provides database-specific implementations of the core traits:
//!
//! - [`mysql`]: MySQL/MariaDB
//! - [`postgres`]: PostgreSQL
//! - [`sqlite`]: SQLite
//! - [`redshift`]: Amazon Redshift (PostgreSQL wire protocol)
//! - [`recording`]: Dry-run driver that records statements
//! - [`common`]: Shared catalog parsing helpers
//!
//! # Architecture
//!
//! Each driver module provides:
//! - A `DialectAdapter`: DDL and introspection strategy for the database
//! - A `Driver` connection handle, behind the cargo feature of the same name
//!
//! # Static dispatch
//!
//! [`DialectImpl`] is an enum over the adapters that implements
//! `DialectAdapter` by matching on the variant, so the synchronizer holds a
//! concrete value instead of a `Box<dyn DialectAdapter>`.
//!
//! # Adding New Databases
//!
//! To add support for a new database:
//!
//! 1. Create a new module under `drivers/` (e.g., `drivers/mssql/`)
//! 2. Implement `DialectAdapter` (and `Driver` for the connection handle)
//! 3. Add an enum variant to `DialectImpl` and a dialect string to
//!    `DialectImpl::from_dialect`
//! 4. Gate the connection handle with a feature flag in `Cargo.toml`

pub mod common;
pub mod mysql;
pub mod postgres;
pub mod recording;
pub mod redshift;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;

// Re-export driver types
pub use mysql::MysqlDialect;
pub use postgres::PostgresDialect;
pub use recording::RecordingDriver;
pub use redshift::RedshiftDialect;
pub use sqlite::SqliteDialect;

#[cfg(feature = "mysql")]
pub use mysql::MysqlDriver;
#[cfg(feature = "postgres")]
pub use postgres::PostgresDriver;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDriver;

use crate::config::ConnectionConfig;
use crate::core::identifier::Timezone;
use crate::core::property::{PropertyDescriptor, PropertyType};
use crate::core::schema::{
    CollectionDefinition, ColumnMap, ColumnPlan, IndexMapByName, IndexSpec, KeyColumn, Prerequisite,
};
use crate::core::traits::{DialectAdapter, Driver};
use crate::error::{Result, SyncError};

/// Enum-based static dispatch for dialect adapters.
///
/// Exactly one adapter is bound per synchronizer; it is picked once from the
/// driver's dialect string.
#[derive(Debug, Clone)]
pub enum DialectImpl {
    Mysql(MysqlDialect),
    Postgres(PostgresDialect),
    Sqlite(SqliteDialect),
    Redshift(RedshiftDialect),
}

macro_rules! dispatch {
    ($self:ident, $d:ident => $call:expr) => {
        match $self {
            DialectImpl::Mysql($d) => $call,
            DialectImpl::Postgres($d) => $call,
            DialectImpl::Sqlite($d) => $call,
            DialectImpl::Redshift($d) => $call,
        }
    };
}

impl DialectImpl {
    /// Create a dialect adapter from a dialect string.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::DialectNotFound`] if the dialect is not recognized.
    pub fn from_dialect(dialect: &str) -> Result<Self> {
        match dialect.to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(DialectImpl::Mysql(MysqlDialect::new())),
            "postgres" | "postgresql" | "pg" => Ok(DialectImpl::Postgres(PostgresDialect::new())),
            "sqlite" | "sqlite3" => Ok(DialectImpl::Sqlite(SqliteDialect::new())),
            "redshift" => Ok(DialectImpl::Redshift(RedshiftDialect::new())),
            _ => Err(SyncError::DialectNotFound(dialect.to_string())),
        }
    }
}

#[async_trait]
impl DialectAdapter for DialectImpl {
    fn name(&self) -> &'static str {
        dispatch!(self, d => d.name())
    }

    async fn has_collection(&self, driver: &dyn Driver, collection: &str) -> Result<bool> {
        dispatch!(self, d => d.has_collection(driver, collection).await)
    }

    async fn get_collection_properties(
        &self,
        driver: &dyn Driver,
        collection: &str,
    ) -> Result<ColumnMap> {
        dispatch!(self, d => d.get_collection_properties(driver, collection).await)
    }

    async fn get_collection_indexes(
        &self,
        driver: &dyn Driver,
        collection: &str,
    ) -> Result<IndexMapByName> {
        dispatch!(self, d => d.get_collection_indexes(driver, collection).await)
    }

    async fn create_collection(
        &self,
        driver: &dyn Driver,
        collection: &str,
        columns: &[String],
        keys: &[String],
    ) -> Result<()> {
        dispatch!(self, d => d.create_collection(driver, collection, columns, keys).await)
    }

    async fn drop_collection(&self, driver: &dyn Driver, collection: &str) -> Result<()> {
        dispatch!(self, d => d.drop_collection(driver, collection).await)
    }

    async fn add_collection_column(
        &self,
        driver: &dyn Driver,
        collection: &str,
        column: &str,
        after: Option<&str>,
    ) -> Result<()> {
        dispatch!(self, d => d.add_collection_column(driver, collection, column, after).await)
    }

    async fn modify_collection_column(
        &self,
        driver: &dyn Driver,
        collection: &str,
        name: &str,
        column: &str,
        property: &PropertyDescriptor,
    ) -> Result<()> {
        dispatch!(self, d => d.modify_collection_column(driver, collection, name, column, property).await)
    }

    async fn drop_collection_column(
        &self,
        driver: &dyn Driver,
        collection: &str,
        column: &str,
    ) -> Result<()> {
        dispatch!(self, d => d.drop_collection_column(driver, collection, column).await)
    }

    async fn rename_collection_column(
        &self,
        driver: &dyn Driver,
        collection: &str,
        old_name: &str,
        new_name: &str,
    ) -> Result<()> {
        dispatch!(self, d => d.rename_collection_column(driver, collection, old_name, new_name).await)
    }

    async fn add_index(&self, driver: &dyn Driver, collection: &str, index: &IndexSpec) -> Result<()> {
        dispatch!(self, d => d.add_index(driver, collection, index).await)
    }

    async fn remove_index(&self, driver: &dyn Driver, collection: &str, name: &str) -> Result<()> {
        dispatch!(self, d => d.remove_index(driver, collection, name).await)
    }

    async fn run_prerequisite(&self, driver: &dyn Driver, step: &Prerequisite) -> Result<usize> {
        dispatch!(self, d => d.run_prerequisite(driver, step).await)
    }

    fn get_type(
        &self,
        collection: &str,
        column: &str,
        property: &PropertyDescriptor,
        driver: &dyn Driver,
    ) -> Option<ColumnPlan> {
        dispatch!(self, d => d.get_type(collection, column, property, driver))
    }

    fn supports_type(&self, ty: &PropertyType) -> PropertyType {
        dispatch!(self, d => d.supports_type(ty))
    }

    fn convert_indexes(&self, collection: &str, indexes: Vec<IndexSpec>) -> Vec<IndexSpec> {
        dispatch!(self, d => d.convert_indexes(collection, indexes))
    }

    fn process_keys(&self, keys: Vec<KeyColumn>) -> Vec<String> {
        dispatch!(self, d => d.process_keys(keys))
    }

    fn supports_indexes(&self) -> bool {
        dispatch!(self, d => d.supports_indexes())
    }

    fn validate_collection(&self, collection: &CollectionDefinition) -> Result<()> {
        dispatch!(self, d => d.validate_collection(collection))
    }
}

/// Open a driver for the configured connection.
///
/// # Errors
///
/// Returns [`SyncError::DialectNotFound`] for an unknown dialect, a config
/// error when the dialect's driver feature is not compiled in, and a driver
/// error when the connection fails.
pub async fn connect(config: &ConnectionConfig, timezone: Timezone) -> Result<Arc<dyn Driver>> {
    let dialect = DialectImpl::from_dialect(&config.dialect)?;
    let url = config.url.as_str();

    match dialect {
        #[cfg(feature = "mysql")]
        DialectImpl::Mysql(_) => Ok(Arc::new(MysqlDriver::connect(url, timezone).await?)),
        #[cfg(feature = "postgres")]
        DialectImpl::Postgres(_) | DialectImpl::Redshift(_) => {
            let driver = PostgresDriver::connect(url, dialect.name(), timezone).await?;
            Ok(Arc::new(driver))
        }
        #[cfg(feature = "sqlite")]
        DialectImpl::Sqlite(_) => Ok(Arc::new(SqliteDriver::connect(url, timezone).await?)),
        #[allow(unreachable_patterns)]
        other => Err(SyncError::Config(format!(
            "Dialect '{}' requires the '{}' feature",
            other.name(),
            match other {
                DialectImpl::Redshift(_) => "postgres",
                _ => other.name(),
            }
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_dialect() {
        assert_eq!(DialectImpl::from_dialect("MySQL").unwrap().name(), "mysql");
        assert_eq!(DialectImpl::from_dialect("postgresql").unwrap().name(), "postgres");
        assert_eq!(DialectImpl::from_dialect("sqlite").unwrap().name(), "sqlite");
        assert_eq!(DialectImpl::from_dialect("redshift").unwrap().name(), "redshift");
    }

    #[test]
    fn test_unknown_dialect() {
        let err = DialectImpl::from_dialect("oracle").unwrap_err();
        assert!(matches!(err, SyncError::DialectNotFound(ref d) if d == "oracle"));
        assert_eq!(err.exit_code(), crate::error::EXIT_CONFIG_ERROR);
    }

    #[test]
    fn test_dispatch_reaches_the_bound_adapter() {
        let driver = RecordingDriver::new("sqlite");
        let dialect = DialectImpl::from_dialect("sqlite").unwrap();
        let plan = dialect.get_type("t", "b", &PropertyDescriptor::boolean(), &driver);
        assert_eq!(plan.map(|p| p.sql().to_string()).as_deref(), Some("INTEGER UNSIGNED"));
    }
}
