//! MySQL/MariaDB dialect adapter (Strategy pattern).
//!
//! Index names are table-scoped, columns can be positioned with
//! `FIRST`/`AFTER`, and enums degrade to a `VARCHAR` wide enough for the
//! longest member.

use async_trait::async_trait;
use tracing::warn;

use crate::core::property::{PropertyDescriptor, PropertyType};
use crate::core::schema::{ColumnMap, ColumnPlan, IndexMapByName, LiveIndex};
use crate::core::traits::{exec, finish_column_type, DialectAdapter, Driver};
use crate::drivers::common::{parse_enum_values, LiveDefault, RawColumnType};
use crate::error::{Result, SyncError};
use crate::sql::{self, ColumnPosition};

/// MySQL/MariaDB dialect implementation.
///
/// Compatible with MySQL 5.7+, 8.0+, and MariaDB 10.2+.
#[derive(Debug, Clone, Default)]
pub struct MysqlDialect;

impl MysqlDialect {
    /// Create a new MySQL dialect instance.
    pub fn new() -> Self {
        Self
    }

    /// Base column type, before nullability and defaults.
    fn base_type(&self, collection: &str, column: &str, property: &PropertyDescriptor) -> Option<String> {
        let unsigned = if property.unsigned { " UNSIGNED" } else { "" };
        let sql = match &property.r#type {
            PropertyType::Text => {
                if property.big {
                    "LONGTEXT".to_string()
                } else {
                    format!("VARCHAR({})", property.size.unwrap_or(255))
                }
            }
            PropertyType::Integer => {
                let base = match property.size {
                    Some(2) => "SMALLINT",
                    Some(8) => "BIGINT",
                    _ => "INTEGER",
                };
                format!("{}{}", base, unsigned)
            }
            PropertyType::Number => {
                let base = if property.size == Some(4) { "FLOAT" } else { "DOUBLE" };
                format!("{}{}", base, unsigned)
            }
            PropertyType::Serial => {
                if property.size == Some(8) {
                    format!("BIGINT{}", unsigned)
                } else {
                    format!("INT(11){}", unsigned)
                }
            }
            PropertyType::Boolean => "TINYINT(1)".to_string(),
            PropertyType::Date => {
                if property.time {
                    "DATETIME".to_string()
                } else {
                    "DATE".to_string()
                }
            }
            PropertyType::Binary | PropertyType::Object => {
                if property.big {
                    "LONGBLOB".to_string()
                } else {
                    "BLOB".to_string()
                }
            }
            PropertyType::Enum => {
                let width = property
                    .values
                    .iter()
                    .map(|v| v.chars().count())
                    .max()
                    .unwrap_or(1)
                    .max(1);
                warn!(
                    "{}.{}: mysql enum stored as VARCHAR({}); member values are not enforced",
                    collection, column, width
                );
                format!("VARCHAR({})", width)
            }
            PropertyType::Point => "POINT".to_string(),
            PropertyType::Uuid => "CHAR(36)".to_string(),
            PropertyType::Custom(_) => return None,
        };
        Some(sql)
    }

    /// Reverse-map an `information_schema.columns` type.
    fn property_from_column_type(raw: &str) -> PropertyDescriptor {
        let ty = RawColumnType::parse(raw);
        let mut prop = match ty.name.as_str() {
            "varchar" | "char" => {
                let mut p = PropertyDescriptor::text();
                p.size = ty.size();
                p
            }
            "text" | "tinytext" | "mediumtext" => PropertyDescriptor::text(),
            "longtext" => PropertyDescriptor::text().big(),
            "tinyint" if ty.size() == Some(1) => PropertyDescriptor::boolean(),
            "tinyint" | "smallint" => PropertyDescriptor::integer().size(2),
            "mediumint" | "int" | "integer" => PropertyDescriptor::integer().size(4),
            "bigint" => PropertyDescriptor::integer().size(8),
            "float" => PropertyDescriptor::new(PropertyType::Number).size(4),
            "double" | "real" | "decimal" | "numeric" => {
                PropertyDescriptor::new(PropertyType::Number).size(8)
            }
            "datetime" | "timestamp" => PropertyDescriptor::date(),
            "date" => {
                let mut p = PropertyDescriptor::date();
                p.time = false;
                p
            }
            "blob" | "tinyblob" | "mediumblob" | "binary" | "varbinary" => {
                PropertyDescriptor::new(PropertyType::Binary)
            }
            "longblob" => PropertyDescriptor::new(PropertyType::Binary).big(),
            "enum" => PropertyDescriptor::enumeration(parse_enum_values(
                ty.args.as_deref().unwrap_or_default(),
            )),
            "point" => PropertyDescriptor::new(PropertyType::Point),
            other => PropertyDescriptor::new(PropertyType::Custom(other.to_string())),
        };
        prop.unsigned = ty.unsigned;
        prop
    }
}

#[async_trait]
impl DialectAdapter for MysqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    async fn has_collection(&self, driver: &dyn Driver, collection: &str) -> Result<bool> {
        let rows = exec(
            driver,
            &format!(
                "SELECT TABLE_NAME FROM information_schema.tables \
                 WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = {}",
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
        let rows = exec(
            driver,
            &format!(
                "SELECT COLUMN_NAME, COLUMN_TYPE, IS_NULLABLE, COLUMN_DEFAULT, COLUMN_KEY, EXTRA \
                 FROM information_schema.columns \
                 WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = {} \
                 ORDER BY ORDINAL_POSITION",
                driver.escape_value(&collection.into())
            ),
        )
        .await?;

        let mut columns = ColumnMap::new();
        for row in rows {
            let Some(name) = row.get_str("column_name") else {
                continue;
            };
            let mut prop =
                Self::property_from_column_type(&row.get_str("column_type").unwrap_or_default());
            let extra = row.get_str("extra").unwrap_or_default().to_ascii_lowercase();

            prop.maps_to = Some(name.clone());
            prop.required = row.get_str("is_nullable").as_deref() == Some("NO");
            prop.key = row.get_str("column_key").as_deref() == Some("PRI");
            if extra.contains("auto_increment") {
                let size = prop.size;
                prop = PropertyDescriptor {
                    maps_to: prop.maps_to,
                    required: prop.required,
                    key: prop.key,
                    unsigned: prop.unsigned,
                    serial: true,
                    ..PropertyDescriptor::serial()
                };
                if size == Some(8) {
                    prop.size = size;
                }
            }

            let raw_default = row.get_str("column_default");
            if extra.contains("default_generated") {
                prop.default_expression = raw_default;
            } else {
                match LiveDefault::parse(raw_default.as_deref(), true) {
                    LiveDefault::Value(v) => prop.default_value = Some(v),
                    LiveDefault::Expression(e) => prop.default_expression = Some(e),
                    LiveDefault::None => {}
                }
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
        let rows = exec(
            driver,
            &format!(
                "SELECT INDEX_NAME, NON_UNIQUE, COLUMN_NAME FROM information_schema.statistics \
                 WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = {} \
                 ORDER BY INDEX_NAME, SEQ_IN_INDEX",
                driver.escape_value(&collection.into())
            ),
        )
        .await?;

        let mut indexes = IndexMapByName::new();
        for row in rows {
            let (Some(name), Some(column)) = (row.get_str("index_name"), row.get_str("column_name"))
            else {
                continue;
            };
            if name == "PRIMARY" {
                continue;
            }
            let unique = row.get_i64("non_unique") == Some(0);
            let entry = indexes.entry(name).or_insert_with(|| LiveIndex {
                columns: Vec::new(),
                unique,
            });
            entry.columns.push(column);
        }
        Ok(indexes)
    }

    async fn add_collection_column(
        &self,
        driver: &dyn Driver,
        collection: &str,
        column: &str,
        after: Option<&str>,
    ) -> Result<()> {
        let position = match after {
            Some(prev) => ColumnPosition::After(prev),
            None => ColumnPosition::First,
        };
        exec(
            driver,
            &sql::alter_table_add_column(driver, collection, column, position),
        )
        .await?;
        Ok(())
    }

    async fn modify_collection_column(
        &self,
        driver: &dyn Driver,
        collection: &str,
        _name: &str,
        column: &str,
        _property: &PropertyDescriptor,
    ) -> Result<()> {
        exec(driver, &sql::alter_table_modify_column(driver, collection, column)).await?;
        Ok(())
    }

    async fn rename_collection_column(
        &self,
        _driver: &dyn Driver,
        _collection: &str,
        _old_name: &str,
        _new_name: &str,
    ) -> Result<()> {
        Err(SyncError::unsupported(self.name(), "column rename"))
    }

    async fn remove_index(&self, driver: &dyn Driver, collection: &str, name: &str) -> Result<()> {
        exec(driver, &sql::drop_index(driver, name, Some(collection))).await?;
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
        Some(ColumnPlan::Immediate(finish_column_type(
            base,
            property,
            Some("AUTO_INCREMENT"),
            driver,
        )))
    }

    fn supports_type(&self, ty: &PropertyType) -> PropertyType {
        match ty {
            PropertyType::Enum | PropertyType::Uuid => PropertyType::Text,
            PropertyType::Object => PropertyType::Binary,
            other => other.clone(),
        }
    }
}
