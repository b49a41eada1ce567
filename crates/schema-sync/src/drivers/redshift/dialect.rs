//! Redshift dialect adapter.
//!
//! Redshift speaks the PostgreSQL wire protocol and exposes the same catalog,
//! so table and column introspection are delegated to [`PostgresDialect`].
//! The type mapping differs (no native enums, no `SERIAL`, no
//! `BYTEA`/`JSON`/`UUID`), there are no secondary indexes, and the only
//! in-place column change is widening or narrowing a `VARCHAR`.

use async_trait::async_trait;
use tracing::warn;

use crate::core::property::{PropertyDescriptor, PropertyType};
use crate::core::schema::{ColumnMap, ColumnPlan, IndexMapByName, IndexSpec};
use crate::core::traits::{exec, finish_column_type, DialectAdapter, Driver};
use crate::drivers::postgres::PostgresDialect;
use crate::error::{Result, SyncError};
use crate::sql;

/// Widest VARCHAR Redshift accepts.
const MAX_VARCHAR: u32 = 65535;

/// Redshift dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct RedshiftDialect {
    postgres: PostgresDialect,
}

impl RedshiftDialect {
    /// Create a new Redshift dialect instance.
    pub fn new() -> Self {
        Self {
            postgres: PostgresDialect::new(),
        }
    }

    fn base_type(&self, collection: &str, column: &str, property: &PropertyDescriptor) -> Option<String> {
        let sql = match &property.r#type {
            PropertyType::Text => {
                if property.big {
                    format!("VARCHAR({})", MAX_VARCHAR)
                } else {
                    format!("VARCHAR({})", property.size.unwrap_or(255).min(MAX_VARCHAR))
                }
            }
            PropertyType::Integer => match property.size {
                Some(2) => "SMALLINT",
                Some(8) => "BIGINT",
                _ => "INTEGER",
            }
            .to_string(),
            PropertyType::Number => {
                if property.size == Some(4) {
                    "REAL".to_string()
                } else {
                    "DOUBLE PRECISION".to_string()
                }
            }
            // IDENTITY is a column attribute that must precede NOT NULL
            PropertyType::Serial => {
                if property.size == Some(8) {
                    "BIGINT IDENTITY(1,1)".to_string()
                } else {
                    "INTEGER IDENTITY(1,1)".to_string()
                }
            }
            PropertyType::Boolean => "BOOLEAN".to_string(),
            PropertyType::Date => {
                if property.time {
                    "TIMESTAMP WITHOUT TIME ZONE".to_string()
                } else {
                    "DATE".to_string()
                }
            }
            PropertyType::Binary | PropertyType::Object => format!("VARCHAR({})", MAX_VARCHAR),
            PropertyType::Uuid => "CHAR(36)".to_string(),
            PropertyType::Enum => {
                let width = property
                    .values
                    .iter()
                    .map(|v| v.len())
                    .max()
                    .unwrap_or(1)
                    .max(1);
                warn!(
                    "{}.{}: redshift has no enum types, stored as VARCHAR({})",
                    collection, column, width
                );
                format!("VARCHAR({})", width)
            }
            PropertyType::Point | PropertyType::Custom(_) => return None,
        };
        Some(sql)
    }
}

#[async_trait]
impl DialectAdapter for RedshiftDialect {
    fn name(&self) -> &'static str {
        "redshift"
    }

    async fn has_collection(&self, driver: &dyn Driver, collection: &str) -> Result<bool> {
        self.postgres.has_collection(driver, collection).await
    }

    async fn get_collection_properties(
        &self,
        driver: &dyn Driver,
        collection: &str,
    ) -> Result<ColumnMap> {
        self.postgres.get_collection_properties(driver, collection).await
    }

    async fn get_collection_indexes(
        &self,
        _driver: &dyn Driver,
        _collection: &str,
    ) -> Result<IndexMapByName> {
        Ok(IndexMapByName::new())
    }

    async fn modify_collection_column(
        &self,
        driver: &dyn Driver,
        collection: &str,
        name: &str,
        _column: &str,
        property: &PropertyDescriptor,
    ) -> Result<()> {
        if property.r#type != PropertyType::Text {
            return Err(SyncError::unsupported(
                self.name(),
                format!("changing the type of column '{}'", name),
            ));
        }
        let base = self
            .base_type(collection, name, property)
            .ok_or_else(|| SyncError::unknown_type(collection, name))?;
        exec(
            driver,
            &sql::alter_table_alter_column(driver, collection, name, &format!("TYPE {}", base)),
        )
        .await?;
        Ok(())
    }

    async fn add_index(&self, _driver: &dyn Driver, _collection: &str, index: &IndexSpec) -> Result<()> {
        Err(SyncError::unsupported(self.name(), format!("index '{}'", index.name)))
    }

    async fn remove_index(&self, _driver: &dyn Driver, _collection: &str, name: &str) -> Result<()> {
        Err(SyncError::unsupported(self.name(), format!("index '{}'", name)))
    }

    fn get_type(
        &self,
        collection: &str,
        column: &str,
        property: &PropertyDescriptor,
        driver: &dyn Driver,
    ) -> Option<ColumnPlan> {
        let base = self.base_type(collection, column, property)?;
        Some(ColumnPlan::Immediate(finish_column_type(base, property, None, driver)))
    }

    fn supports_type(&self, ty: &PropertyType) -> PropertyType {
        match ty {
            PropertyType::Enum | PropertyType::Uuid | PropertyType::Binary | PropertyType::Object => {
                PropertyType::Text
            }
            other => other.clone(),
        }
    }

    fn convert_indexes(&self, collection: &str, indexes: Vec<IndexSpec>) -> Vec<IndexSpec> {
        self.postgres.convert_indexes(collection, indexes)
    }

    fn supports_indexes(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::RecordingDriver;

    fn type_of(prop: &PropertyDescriptor) -> Option<String> {
        let driver = RecordingDriver::new("redshift");
        RedshiftDialect::new()
            .get_type("events", "col", prop, &driver)
            .map(|plan| plan.sql().to_string())
    }

    #[test]
    fn test_identity_precedes_not_null() {
        let prop = PropertyDescriptor::serial().key().required();
        assert_eq!(
            type_of(&prop).as_deref(),
            Some("INTEGER IDENTITY(1,1) NOT NULL")
        );
    }

    #[test]
    fn test_type_overrides() {
        assert_eq!(
            type_of(&PropertyDescriptor::enumeration(["open", "closed"])).as_deref(),
            Some("VARCHAR(6)")
        );
        assert_eq!(
            type_of(&PropertyDescriptor::new(PropertyType::Object)).as_deref(),
            Some("VARCHAR(65535)")
        );
        assert_eq!(
            type_of(&PropertyDescriptor::new(PropertyType::Uuid)).as_deref(),
            Some("CHAR(36)")
        );
        assert_eq!(type_of(&PropertyDescriptor::new(PropertyType::Point)), None);
    }

    #[test]
    fn test_enum_needs_no_prerequisite() {
        let driver = RecordingDriver::new("redshift");
        let plan = RedshiftDialect::new()
            .get_type("events", "state", &PropertyDescriptor::enumeration(["a"]), &driver);
        assert!(matches!(plan, Some(ColumnPlan::Immediate(_))));
    }

    #[test]
    fn test_indexes_named_like_postgres() {
        let indexes = RedshiftDialect::new().convert_indexes(
            "events",
            vec![IndexSpec::new("kind_index", false, vec!["kind".into()])],
        );
        assert_eq!(indexes[0].name, "events_kind_index");
    }

    #[tokio::test]
    async fn test_no_secondary_indexes() {
        let driver = RecordingDriver::new("redshift");
        let dialect = RedshiftDialect::new();
        assert!(!dialect.supports_indexes());
        assert!(dialect
            .get_collection_indexes(&driver, "events")
            .await
            .unwrap()
            .is_empty());

        let index = IndexSpec::new("events_kind_index", false, vec!["kind".into()]);
        let err = dialect.add_index(&driver, "events", &index).await.unwrap_err();
        assert!(matches!(err, SyncError::Unsupported { dialect: "redshift", .. }));
        assert!(dialect.remove_index(&driver, "events", "events_kind_index").await.is_err());
        assert!(driver.statements().is_empty());
    }

    #[tokio::test]
    async fn test_modify_only_resizes_varchar() {
        let driver = RecordingDriver::new("redshift");
        let dialect = RedshiftDialect::new();
        dialect
            .modify_collection_column(&driver, "events", "kind", "", &PropertyDescriptor::text().size(64))
            .await
            .unwrap();
        assert_eq!(
            driver.statements(),
            vec!["ALTER TABLE \"events\" ALTER COLUMN \"kind\" TYPE VARCHAR(64)".to_string()]
        );

        let err = dialect
            .modify_collection_column(&driver, "events", "n", "", &PropertyDescriptor::integer().size(8))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Unsupported { .. }));
    }
}
