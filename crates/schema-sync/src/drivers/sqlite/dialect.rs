//! SQLite dialect adapter (Strategy pattern).
//!
//! SQLite has a loose type system: every declared type collapses to one of a
//! few storage classes, enums are stored as integers, and a serial key is
//! declared `INTEGER PRIMARY KEY AUTOINCREMENT` inline. `AUTOINCREMENT` is
//! only valid on a table's sole `INTEGER PRIMARY KEY`, so a serial column
//! outside the key is a plain integer and a serial key cannot be part of a
//! composite key. Column definitions cannot be altered in place.

use async_trait::async_trait;
use tracing::warn;

use crate::core::property::{PropertyDescriptor, PropertyType};
use crate::core::schema::{
    CollectionDefinition, ColumnMap, ColumnPlan, IndexMapByName, IndexSpec, KeyColumn, LiveIndex,
};
use crate::core::traits::{exec, finish_column_type, DialectAdapter, Driver};
use crate::drivers::common::{LiveDefault, RawColumnType};
use crate::error::{Result, SyncError};
use crate::sql;

/// SQLite dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Create a new SQLite dialect instance.
    pub fn new() -> Self {
        Self
    }

    fn base_type(&self, collection: &str, column: &str, property: &PropertyDescriptor) -> Option<&'static str> {
        let sql = match &property.r#type {
            PropertyType::Text | PropertyType::Uuid => "TEXT",
            PropertyType::Integer | PropertyType::Serial => "INTEGER",
            PropertyType::Number => "REAL",
            PropertyType::Boolean => "INTEGER UNSIGNED",
            PropertyType::Date => {
                if property.time {
                    "DATETIME"
                } else {
                    "DATE"
                }
            }
            PropertyType::Binary | PropertyType::Object => "BLOB",
            PropertyType::Point => "POINT",
            PropertyType::Enum => {
                warn!(
                    "{}.{}: sqlite enum stored as INTEGER; member values are not enforced",
                    collection, column
                );
                "INTEGER"
            }
            PropertyType::Custom(_) => return None,
        };
        Some(sql)
    }

    /// Reverse-map a `PRAGMA table_info` declared type.
    fn property_from_declared_type(raw: &str) -> PropertyDescriptor {
        let ty = RawColumnType::parse(raw);
        match ty.name.as_str() {
            "integer" | "int" if ty.unsigned => PropertyDescriptor::boolean(),
            "integer" | "int" | "bigint" | "smallint" => PropertyDescriptor::integer(),
            "real" | "double" | "float" | "numeric" => PropertyDescriptor::new(PropertyType::Number),
            "text" | "varchar" | "char" | "clob" => {
                let mut p = PropertyDescriptor::text();
                p.size = ty.size();
                p
            }
            "datetime" | "timestamp" => PropertyDescriptor::date(),
            "date" => {
                let mut p = PropertyDescriptor::date();
                p.time = false;
                p
            }
            "blob" => PropertyDescriptor::new(PropertyType::Binary),
            "point" => PropertyDescriptor::new(PropertyType::Point),
            other => PropertyDescriptor::new(PropertyType::Custom(other.to_string())),
        }
    }
}

#[async_trait]
impl DialectAdapter for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn has_collection(&self, driver: &dyn Driver, collection: &str) -> Result<bool> {
        let rows = exec(
            driver,
            &format!(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = {}",
                driver.escape_value(&collection.into())
            ),
        )
        .await?;
        Ok(!rows.is_empty())
    }

    async fn get_collection_properties(
        &self,
        driver: &dyn Driver,
        collection: &str,
    ) -> Result<ColumnMap> {
        let table_sql = exec(
            driver,
            &format!(
                "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = {}",
                driver.escape_value(&collection.into())
            ),
        )
        .await?
        .first()
        .and_then(|r| r.get_str("sql"))
        .unwrap_or_default();
        let autoincrement = table_sql.to_ascii_uppercase().contains("AUTOINCREMENT");

        let rows = exec(
            driver,
            &format!("PRAGMA table_info({})", driver.escape_id(collection)),
        )
        .await?;

        let mut columns = ColumnMap::new();
        for row in rows {
            let Some(name) = row.get_str("name") else {
                continue;
            };
            let declared = row.get_str("type").unwrap_or_default();
            let mut prop = Self::property_from_declared_type(&declared);
            let pk = row.get_i64("pk").unwrap_or(0) > 0;

            prop.maps_to = Some(name.clone());
            prop.required = row.get_bool("notnull").unwrap_or(false);
            prop.key = pk;
            if pk && autoincrement && prop.r#type == PropertyType::Integer {
                prop.r#type = PropertyType::Serial;
                prop.serial = true;
            }

            match LiveDefault::parse(row.get_str("dflt_value").as_deref(), false) {
                LiveDefault::Value(v) => prop.default_value = Some(v),
                LiveDefault::Expression(e) => prop.default_expression = Some(e),
                LiveDefault::None => {}
            }

            columns.insert(name, prop);
        }
        Ok(columns)
    }

    async fn get_collection_indexes(
        &self,
        driver: &dyn Driver,
        collection: &str,
    ) -> Result<IndexMapByName> {
        let list = exec(
            driver,
            &format!("PRAGMA index_list({})", driver.escape_id(collection)),
        )
        .await?;

        let mut indexes = IndexMapByName::new();
        for row in list {
            let Some(name) = row.get_str("name") else {
                continue;
            };
            if name.starts_with("sqlite_autoindex") || row.get_str("origin").as_deref() == Some("pk") {
                continue;
            }
            let unique = row.get_bool("unique").unwrap_or(false);

            let info = exec(driver, &format!("PRAGMA index_info({})", driver.escape_id(&name))).await?;
            let mut ordered: Vec<(i64, String)> = info
                .iter()
                .filter_map(|r| Some((r.get_i64("seqno").unwrap_or(0), r.get_str("name")?)))
                .collect();
            ordered.sort_by_key(|(seq, _)| *seq);

            indexes.insert(
                name,
                LiveIndex {
                    columns: ordered.into_iter().map(|(_, c)| c).collect(),
                    unique,
                },
            );
        }
        Ok(indexes)
    }

    async fn modify_collection_column(
        &self,
        _driver: &dyn Driver,
        _collection: &str,
        _name: &str,
        _column: &str,
        _property: &PropertyDescriptor,
    ) -> Result<()> {
        Err(SyncError::unsupported(self.name(), "column modification"))
    }

    async fn remove_index(&self, driver: &dyn Driver, _collection: &str, name: &str) -> Result<()> {
        exec(driver, &sql::drop_index(driver, name, None)).await?;
        Ok(())
    }

    fn get_type(
        &self,
        collection: &str,
        column: &str,
        property: &PropertyDescriptor,
        driver: &dyn Driver,
    ) -> Option<ColumnPlan> {
        let base = self.base_type(collection, column, property)?;
        let autoincrement = if property.key {
            Some("PRIMARY KEY AUTOINCREMENT")
        } else {
            if property.is_serial() {
                warn!(
                    "{}.{}: sqlite only autoincrements the primary key, stored as INTEGER",
                    collection, column
                );
            }
            None
        };
        Some(ColumnPlan::Immediate(finish_column_type(
            base.to_string(),
            property,
            autoincrement,
            driver,
        )))
    }

    fn supports_type(&self, ty: &PropertyType) -> PropertyType {
        match ty {
            PropertyType::Enum => PropertyType::Integer,
            PropertyType::Uuid => PropertyType::Text,
            PropertyType::Object => PropertyType::Binary,
            other => other.clone(),
        }
    }

    fn convert_indexes(&self, collection: &str, indexes: Vec<IndexSpec>) -> Vec<IndexSpec> {
        indexes
            .into_iter()
            .map(|mut index| {
                index.name = format!("{}_{}", collection, index.name);
                index
            })
            .collect()
    }

    fn validate_collection(&self, collection: &CollectionDefinition) -> Result<()> {
        let keys: Vec<(&String, &PropertyDescriptor)> =
            collection.properties.iter().filter(|(_, p)| p.key).collect();
        if keys.len() > 1 {
            if let Some((name, _)) = keys.iter().find(|(_, p)| p.is_serial()) {
                return Err(SyncError::unsupported(
                    self.name(),
                    format!(
                        "serial key '{}' in a composite primary key on '{}'",
                        name, collection.name
                    ),
                ));
            }
        }
        Ok(())
    }

    /// A lone serial key is already declared inline by its column, so the
    /// table-level clause is dropped.
    fn process_keys(&self, keys: Vec<KeyColumn>) -> Vec<String> {
        if keys.len() == 1 && keys[0].serial {
            return Vec::new();
        }
        keys.into_iter().map(|k| k.name).collect()
    }
}
