//! Core traits for dialect-agnostic schema synchronization.
//!
//! - [`Driver`]: the injected database handle (query execution and escaping)
//! - [`DialectAdapter`]: DDL and introspection strategy for one SQL dialect
//! - [`CustomType`]: user-registered property types
//!
//! # Design Patterns
//!
//! - **Strategy**: each dialect is an interchangeable [`DialectAdapter`]
//! - **Template Method**: DDL that reads the same in most dialects is a
//!   default method; dialects override only what differs

use async_trait::async_trait;
use tracing::debug;

use crate::error::{DriverError, Result, SyncError};
use crate::sql;

use super::property::{PropertyDescriptor, PropertyType};
use super::schema::{
    CollectionDefinition, ColumnMap, ColumnPlan, IndexMapByName, IndexSpec, KeyColumn,
    Prerequisite,
};
use super::value::{Row, SqlValue};

/// Database handle injected by the ORM layer.
///
/// The engine never opens connections itself; it only escapes identifiers and
/// values through the driver and hands it finished statements.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Dialect identifier used to pick the adapter (e.g. "mysql", "postgres").
    fn dialect(&self) -> &str;

    /// Quote an identifier (table, column, index or type name).
    fn escape_id(&self, name: &str) -> String;

    /// Render a value as a SQL literal.
    fn escape_value(&self, value: &SqlValue) -> String;

    /// Execute one statement and return its rows (empty for DDL).
    async fn execute(&self, sql: &str) -> std::result::Result<Vec<Row>, DriverError>;
}

/// Run a statement through the driver, logging it first.
pub(crate) async fn exec(driver: &dyn Driver, sql: &str) -> Result<Vec<Row>> {
    debug!(target: "schema_sync::sql", "{}", sql);
    Ok(driver.execute(sql).await?)
}

/// A property type registered by the ORM layer.
///
/// Checked before the dialect mapping, so a custom type may also shadow a
/// built-in tag. The returned fragment is used verbatim after the column
/// name; nullability and defaults are up to the implementation.
pub trait CustomType: Send + Sync {
    /// SQL type for a property of this custom type in the given dialect.
    fn datastore_type(&self, property: &PropertyDescriptor, dialect: &str) -> ColumnPlan;
}

/// A custom type with a fixed SQL type in every dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedType(pub String);

impl CustomType for FixedType {
    fn datastore_type(&self, property: &PropertyDescriptor, _dialect: &str) -> ColumnPlan {
        let mut sql = self.0.clone();
        if property.required {
            sql.push_str(" NOT NULL");
        }
        ColumnPlan::Immediate(sql)
    }
}

impl<F> CustomType for F
where
    F: Fn(&PropertyDescriptor, &str) -> ColumnPlan + Send + Sync,
{
    fn datastore_type(&self, property: &PropertyDescriptor, dialect: &str) -> ColumnPlan {
        self(property, dialect)
    }
}

/// DDL and introspection strategy for one SQL dialect.
///
/// Adapters are stateless; every database access goes through the driver
/// passed in.
#[async_trait]
pub trait DialectAdapter: Send + Sync {
    /// Dialect identifier.
    fn name(&self) -> &'static str;

    // ===== Introspection =====

    /// Check if a table exists.
    async fn has_collection(&self, driver: &dyn Driver, collection: &str) -> Result<bool>;

    /// Reverse-map the live columns of a table into property descriptors.
    async fn get_collection_properties(
        &self,
        driver: &dyn Driver,
        collection: &str,
    ) -> Result<ColumnMap>;

    /// Live non-primary indexes of a table.
    async fn get_collection_indexes(
        &self,
        driver: &dyn Driver,
        collection: &str,
    ) -> Result<IndexMapByName>;

    // ===== Table DDL =====

    /// Create a table from finished column fragments and primary-key columns.
    async fn create_collection(
        &self,
        driver: &dyn Driver,
        collection: &str,
        columns: &[String],
        keys: &[String],
    ) -> Result<()> {
        exec(driver, &sql::create_table(driver, collection, columns, keys)).await?;
        Ok(())
    }

    /// Drop a table if it exists.
    async fn drop_collection(&self, driver: &dyn Driver, collection: &str) -> Result<()> {
        exec(driver, &sql::drop_table(driver, collection)).await?;
        Ok(())
    }

    // ===== Column DDL =====

    /// Add a column, positioned after `after` where the dialect allows it.
    async fn add_collection_column(
        &self,
        driver: &dyn Driver,
        collection: &str,
        column: &str,
        _after: Option<&str>,
    ) -> Result<()> {
        exec(
            driver,
            &sql::alter_table_add_column(driver, collection, column, sql::ColumnPosition::End),
        )
        .await?;
        Ok(())
    }

    /// Change a column's definition. `name` is the storage column name,
    /// `column` its full fragment.
    async fn modify_collection_column(
        &self,
        driver: &dyn Driver,
        collection: &str,
        name: &str,
        column: &str,
        property: &PropertyDescriptor,
    ) -> Result<()>;

    /// Drop a column.
    async fn drop_collection_column(
        &self,
        driver: &dyn Driver,
        collection: &str,
        column: &str,
    ) -> Result<()> {
        exec(driver, &sql::alter_table_drop_column(driver, collection, column)).await?;
        Ok(())
    }

    /// Rename a column.
    async fn rename_collection_column(
        &self,
        driver: &dyn Driver,
        collection: &str,
        old_name: &str,
        new_name: &str,
    ) -> Result<()> {
        exec(
            driver,
            &sql::alter_table_rename_column(driver, collection, old_name, new_name),
        )
        .await?;
        Ok(())
    }

    // ===== Index DDL =====

    /// Create an index.
    async fn add_index(&self, driver: &dyn Driver, collection: &str, index: &IndexSpec) -> Result<()> {
        exec(driver, &sql::create_index(driver, collection, index)).await?;
        Ok(())
    }

    /// Drop an index.
    async fn remove_index(&self, driver: &dyn Driver, collection: &str, name: &str) -> Result<()>;

    // ===== Type mapping =====

    /// Run a column prerequisite returned by [`DialectAdapter::get_type`] or a
    /// custom type. Returns the number of statements issued, which is zero
    /// when the prerequisite was already satisfied.
    async fn run_prerequisite(&self, driver: &dyn Driver, step: &Prerequisite) -> Result<usize> {
        match step {
            Prerequisite::Execute { sql } => {
                exec(driver, sql).await?;
                Ok(1)
            }
            Prerequisite::CreateEnumType { name, .. } => Err(SyncError::unsupported(
                self.name(),
                format!("enum type '{}'", name),
            )),
        }
    }

    /// Map a property to its column type fragment.
    ///
    /// Returns `None` when the property's type has no mapping in this
    /// dialect. The fragment is built in a fixed order: base type, `NOT NULL`,
    /// autoincrement syntax, then `DEFAULT`.
    fn get_type(
        &self,
        collection: &str,
        column: &str,
        property: &PropertyDescriptor,
        driver: &dyn Driver,
    ) -> Option<ColumnPlan>;

    /// The type a column of `ty` reports when read back by introspection.
    fn supports_type(&self, ty: &PropertyType) -> PropertyType {
        ty.clone()
    }

    /// Rename derived indexes to satisfy the dialect's naming scope.
    fn convert_indexes(&self, _collection: &str, indexes: Vec<IndexSpec>) -> Vec<IndexSpec> {
        indexes
    }

    /// Reshape the primary-key clause.
    fn process_keys(&self, keys: Vec<KeyColumn>) -> Vec<String> {
        keys.into_iter().map(|k| k.name).collect()
    }

    /// Whether the dialect has secondary indexes at all.
    fn supports_indexes(&self) -> bool {
        true
    }

    /// Reject a collection whose properties this dialect cannot express
    /// together. Called when the collection is defined.
    fn validate_collection(&self, _collection: &CollectionDefinition) -> Result<()> {
        Ok(())
    }
}

/// Append `NOT NULL`, autoincrement and `DEFAULT` clauses in the fixed order.
pub(crate) fn finish_column_type(
    mut sql: String,
    property: &PropertyDescriptor,
    autoincrement: Option<&str>,
    driver: &dyn Driver,
) -> String {
    if property.required {
        sql.push_str(" NOT NULL");
    }
    if property.is_serial() {
        if let Some(syntax) = autoincrement {
            sql.push(' ');
            sql.push_str(syntax);
        }
    }
    if let Some(expr) = &property.default_expression {
        sql.push_str(&format!(" DEFAULT ({})", expr));
    } else if let Some(value) = &property.default_value {
        sql.push_str(&format!(" DEFAULT {}", driver.escape_value(value)));
    }
    sql
}
