//! PostgreSQL dialect adapter (Strategy pattern).
//!
//! Index names live in one namespace per schema, so every derived index is
//! prefixed with its table name. Enums become native enum types, created
//! once by a deferred prerequisite before the first column that uses them.
//! Catalog reads are scoped to `current_schema()`, the schema unqualified
//! DDL lands in.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::core::property::{PropertyDescriptor, PropertyType};
use crate::core::schema::{ColumnMap, ColumnPlan, IndexMapByName, IndexSpec, LiveIndex, Prerequisite};
use crate::core::traits::{exec, finish_column_type, DialectAdapter, Driver};
use crate::drivers::common::LiveDefault;
use crate::error::{Result, SyncError};
use crate::sql::{self, EnumPosition};

/// PostgreSQL dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Create a new PostgreSQL dialect instance.
    pub fn new() -> Self {
        Self
    }

    /// Name of the enum type backing `collection.column`.
    pub fn enum_type_name(collection: &str, column: &str) -> String {
        format!("{}_enum_{}", collection, column)
    }

    /// Base column type, before nullability and defaults.
    fn base_type(
        &self,
        collection: &str,
        column: &str,
        property: &PropertyDescriptor,
        driver: &dyn Driver,
    ) -> Option<ColumnPlan> {
        let sql = match &property.r#type {
            PropertyType::Text => {
                if property.big {
                    "TEXT".to_string()
                } else {
                    format!("VARCHAR({})", property.size.unwrap_or(255))
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
            PropertyType::Serial => {
                if property.size == Some(8) {
                    "BIGSERIAL".to_string()
                } else {
                    "SERIAL".to_string()
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
            PropertyType::Binary => "BYTEA".to_string(),
            PropertyType::Object => "JSON".to_string(),
            PropertyType::Point => "POINT".to_string(),
            PropertyType::Uuid => "UUID".to_string(),
            PropertyType::Enum => {
                let name = Self::enum_type_name(collection, column);
                return Some(ColumnPlan::Deferred(
                    Prerequisite::CreateEnumType {
                        name: name.clone(),
                        values: property.values.clone(),
                    },
                    driver.escape_id(&name),
                ));
            }
            PropertyType::Custom(_) => return None,
        };
        Some(ColumnPlan::Immediate(sql))
    }

    /// Reverse-map an `information_schema.columns` row's type.
    fn property_from_data_type(data_type: &str, char_length: Option<i64>) -> PropertyDescriptor {
        match data_type {
            "character varying" | "character" => {
                let mut p = PropertyDescriptor::text();
                p.size = char_length.and_then(|n| u32::try_from(n).ok());
                p
            }
            "text" => PropertyDescriptor::text().big(),
            "smallint" => PropertyDescriptor::integer().size(2),
            "integer" => PropertyDescriptor::integer().size(4),
            "bigint" => PropertyDescriptor::integer().size(8),
            "real" => PropertyDescriptor::new(PropertyType::Number).size(4),
            "double precision" | "numeric" => PropertyDescriptor::new(PropertyType::Number).size(8),
            "boolean" => PropertyDescriptor::boolean(),
            "date" => {
                let mut p = PropertyDescriptor::date();
                p.time = false;
                p
            }
            "timestamp without time zone" | "timestamp with time zone" => PropertyDescriptor::date(),
            "bytea" => PropertyDescriptor::new(PropertyType::Binary),
            "json" | "jsonb" => PropertyDescriptor::new(PropertyType::Object),
            "point" => PropertyDescriptor::new(PropertyType::Point),
            "uuid" => PropertyDescriptor::new(PropertyType::Uuid),
            "USER-DEFINED" => PropertyDescriptor::new(PropertyType::Enum),
            other => PropertyDescriptor::new(PropertyType::Custom(other.to_string())),
        }
    }

    /// Primary-key column names of a table.
    async fn primary_key_columns(&self, driver: &dyn Driver, collection: &str) -> Result<Vec<String>> {
        let rows = exec(
            driver,
            &format!(
                "SELECT a.attname AS column_name FROM pg_index i \
                 JOIN pg_class c ON c.oid = i.indrelid \
                 JOIN pg_namespace n ON n.oid = c.relnamespace \
                 JOIN pg_attribute a ON a.attrelid = c.oid AND a.attnum = ANY(i.indkey) \
                 WHERE n.nspname = current_schema() AND c.relname = {} AND i.indisprimary",
                driver.escape_value(&collection.into())
            ),
        )
        .await?;
        Ok(rows.iter().filter_map(|r| r.get_str("column_name")).collect())
    }

    /// Members of a native enum type, in declaration order.
    async fn enum_values(&self, driver: &dyn Driver, type_name: &str) -> Result<Vec<String>> {
        let rows = exec(
            driver,
            &format!(
                "SELECT e.enumlabel FROM pg_enum e \
                 JOIN pg_type t ON t.oid = e.enumtypid \
                 JOIN pg_namespace n ON n.oid = t.typnamespace \
                 WHERE n.nspname = current_schema() AND t.typname = {} \
                 ORDER BY e.enumsortorder",
                driver.escape_value(&type_name.into())
            ),
        )
        .await?;
        Ok(rows.iter().filter_map(|r| r.get_str("enumlabel")).collect())
    }

    /// Whether a type of this name exists in the current schema.
    async fn type_exists(&self, driver: &dyn Driver, type_name: &str) -> Result<bool> {
        let rows = exec(
            driver,
            &format!(
                "SELECT t.typname FROM pg_catalog.pg_type t \
                 JOIN pg_catalog.pg_namespace n ON n.oid = t.typnamespace \
                 WHERE n.nspname = current_schema() AND t.typname = {}",
                driver.escape_value(&type_name.into())
            ),
        )
        .await?;
        Ok(!rows.is_empty())
    }

    /// Create an enum type, or add the members an existing one lacks.
    ///
    /// New members are placed after their predecessor in `values`. Members
    /// cannot be removed from a PostgreSQL enum, so a live member that is no
    /// longer declared is an error.
    async fn ensure_enum_type(&self, driver: &dyn Driver, name: &str, values: &[String]) -> Result<usize> {
        if !self.type_exists(driver, name).await? {
            exec(driver, &sql::create_enum_type(driver, name, values)).await?;
            return Ok(1);
        }

        let live = self.enum_values(driver, name).await?;
        if let Some(stale) = live.iter().find(|v| !values.contains(v)) {
            return Err(SyncError::unsupported(
                self.name(),
                format!("removing value '{}' from enum type '{}'", stale, name),
            ));
        }

        let mut issued = 0;
        for (i, value) in values.iter().enumerate() {
            if live.contains(value) {
                continue;
            }
            let position = match i.checked_sub(1) {
                Some(prev) => EnumPosition::After(values[prev].as_str()),
                None => live.first().map_or(EnumPosition::End, |first| EnumPosition::Before(first.as_str())),
            };
            exec(driver, &sql::alter_enum_add_value(driver, name, value, position)).await?;
            issued += 1;
        }

        if issued == 0 {
            debug!("Enum type {} already exists", name);
        } else {
            info!("Enum type {}: added {} values", name, issued);
        }
        Ok(issued)
    }
}

#[async_trait]
impl DialectAdapter for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn has_collection(&self, driver: &dyn Driver, collection: &str) -> Result<bool> {
        let rows = exec(
            driver,
            &format!(
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_schema = current_schema() AND table_name = {}",
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
                "SELECT column_name, data_type, udt_name, is_nullable, column_default, \
                 character_maximum_length FROM information_schema.columns \
                 WHERE table_schema = current_schema() AND table_name = {} \
                 ORDER BY ordinal_position",
                driver.escape_value(&collection.into())
            ),
        )
        .await?;
        let keys = self.primary_key_columns(driver, collection).await?;

        let mut columns = ColumnMap::new();
        for row in rows {
            let Some(name) = row.get_str("column_name") else {
                continue;
            };
            let data_type = row.get_str("data_type").unwrap_or_default();
            let mut prop =
                Self::property_from_data_type(&data_type, row.get_i64("character_maximum_length"));

            if prop.r#type == PropertyType::Enum {
                if let Some(udt) = row.get_str("udt_name") {
                    prop.values = self.enum_values(driver, &udt).await?;
                }
            }

            prop.maps_to = Some(name.clone());
            prop.required = row.get_str("is_nullable").as_deref() == Some("NO");
            prop.key = keys.contains(&name);

            match LiveDefault::parse(row.get_str("column_default").as_deref(), false) {
                LiveDefault::Expression(e) if e.starts_with("nextval(") => {
                    let size = if prop.size == Some(8) { Some(8) } else { None };
                    prop.r#type = PropertyType::Serial;
                    prop.size = size;
                    prop.serial = true;
                }
                LiveDefault::Expression(e) => prop.default_expression = Some(e),
                LiveDefault::Value(v) => prop.default_value = Some(v),
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
        let rows = exec(
            driver,
            &format!(
                "SELECT ic.relname AS index_name, a.attname AS column_name, \
                 ix.indisunique AS is_unique \
                 FROM pg_class t \
                 JOIN pg_namespace n ON n.oid = t.relnamespace \
                 JOIN pg_index ix ON ix.indrelid = t.oid \
                 JOIN pg_class ic ON ic.oid = ix.indexrelid \
                 JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey) \
                 WHERE t.relkind = 'r' AND n.nspname = current_schema() \
                 AND t.relname = {} AND NOT ix.indisprimary \
                 ORDER BY ic.relname, array_position(ix.indkey::int2[], a.attnum)",
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
            let unique = row.get_bool("is_unique").unwrap_or(false);
            indexes
                .entry(name)
                .or_insert_with(|| LiveIndex {
                    columns: Vec::new(),
                    unique,
                })
                .columns
                .push(column);
        }
        Ok(indexes)
    }

    async fn modify_collection_column(
        &self,
        driver: &dyn Driver,
        collection: &str,
        name: &str,
        _column: &str,
        property: &PropertyDescriptor,
    ) -> Result<()> {
        let base = self
            .base_type(collection, name, property, driver)
            .ok_or_else(|| SyncError::unknown_type(collection, name))?;

        let alter = |action: String| sql::alter_table_alter_column(driver, collection, name, &action);

        let retype = if property.r#type == PropertyType::Enum {
            // no implicit cast from text or another enum
            format!(
                "TYPE {ty} USING {}::text::{ty}",
                driver.escape_id(name),
                ty = base.sql()
            )
        } else {
            format!("TYPE {}", base.sql())
        };
        exec(driver, &alter(retype)).await?;

        // key columns stay NOT NULL
        let nullability = if property.required || property.key {
            "SET NOT NULL"
        } else {
            "DROP NOT NULL"
        };
        exec(driver, &alter(nullability.to_string())).await?;

        let default = if let Some(expr) = &property.default_expression {
            format!("SET DEFAULT ({})", expr)
        } else if let Some(value) = &property.default_value {
            format!("SET DEFAULT {}", driver.escape_value(value))
        } else {
            "DROP DEFAULT".to_string()
        };
        exec(driver, &alter(default)).await?;
        Ok(())
    }

    async fn remove_index(&self, driver: &dyn Driver, _collection: &str, name: &str) -> Result<()> {
        exec(driver, &sql::drop_index(driver, name, None)).await?;
        Ok(())
    }

    async fn run_prerequisite(&self, driver: &dyn Driver, step: &Prerequisite) -> Result<usize> {
        match step {
            Prerequisite::CreateEnumType { name, values } => {
                self.ensure_enum_type(driver, name, values).await
            }
            Prerequisite::Execute { sql } => {
                exec(driver, sql).await?;
                Ok(1)
            }
        }
    }

    fn get_type(
        &self,
        collection: &str,
        column: &str,
        property: &PropertyDescriptor,
        driver: &dyn Driver,
    ) -> Option<ColumnPlan> {
        self.base_type(collection, column, property, driver)
            .map(|plan| plan.map_sql(|sql| finish_column_type(sql, property, None, driver)))
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::{Row, SqlValue};
    use crate::drivers::RecordingDriver;

    fn plan_of(prop: &PropertyDescriptor) -> ColumnPlan {
        let driver = RecordingDriver::new("postgres");
        PostgresDialect::new()
            .get_type("users", "col", prop, &driver)
            .unwrap_or(ColumnPlan::Immediate(String::new()))
    }

    #[test]
    fn test_serial_and_sizes() {
        assert_eq!(plan_of(&PropertyDescriptor::serial().key().required()).sql(), "SERIAL NOT NULL");
        assert_eq!(plan_of(&PropertyDescriptor::serial().size(8)).sql(), "BIGSERIAL");
        assert_eq!(plan_of(&PropertyDescriptor::integer().size(2)).sql(), "SMALLINT");
        assert_eq!(plan_of(&PropertyDescriptor::text().big()).sql(), "TEXT");
        assert_eq!(
            plan_of(&PropertyDescriptor::date().required()).sql(),
            "TIMESTAMP WITHOUT TIME ZONE NOT NULL"
        );
    }

    #[test]
    fn test_boolean_default_literal() {
        let prop = PropertyDescriptor::boolean().default_value(false);
        assert_eq!(plan_of(&prop).sql(), "BOOLEAN DEFAULT false");
    }

    #[test]
    fn test_enum_is_deferred_on_type_creation() {
        let prop = PropertyDescriptor::enumeration(["admin", "user"])
            .required()
            .default_value("user");
        match plan_of(&prop) {
            ColumnPlan::Deferred(Prerequisite::CreateEnumType { name, values }, sql) => {
                assert_eq!(name, "users_enum_col");
                assert_eq!(values, vec!["admin", "user"]);
                assert_eq!(sql, "\"users_enum_col\" NOT NULL DEFAULT 'user'");
            }
            other => panic!("expected deferred enum plan, got {:?}", other),
        }
    }

    #[test]
    fn test_indexes_prefixed_with_table() {
        let indexes = PostgresDialect::new().convert_indexes(
            "users",
            vec![IndexSpec::new("email_unique", true, vec!["email".into()])],
        );
        assert_eq!(indexes[0].name, "users_email_unique");
    }

    fn enum_step(values: &[&str]) -> Prerequisite {
        Prerequisite::CreateEnumType {
            name: "users_enum_role".into(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    fn existing_enum(labels: &[&str]) -> RecordingDriver {
        RecordingDriver::new("postgres")
            .with_rows(
                "pg_catalog.pg_type",
                vec![Row::new().with("typname", "users_enum_role")],
            )
            .with_rows(
                "pg_enum",
                labels.iter().map(|l| Row::new().with("enumlabel", *l)).collect(),
            )
    }

    #[tokio::test]
    async fn test_enum_prerequisite_checks_pg_type_first() {
        let step = enum_step(&["admin"]);

        let fresh = RecordingDriver::new("postgres");
        let issued = PostgresDialect::new().run_prerequisite(&fresh, &step).await.unwrap();
        assert_eq!(issued, 1);
        let statements = fresh.statements();
        assert_eq!(statements.len(), 2);
        assert!(statements[0].contains("pg_type"));
        assert!(statements[0].contains("n.nspname = current_schema()"));
        assert_eq!(
            statements[1],
            "CREATE TYPE \"users_enum_role\" AS ENUM ('admin')"
        );

        let existing = existing_enum(&["admin"]);
        let issued = PostgresDialect::new().run_prerequisite(&existing, &step).await.unwrap();
        assert_eq!(issued, 0);
        assert!(existing.ddl().is_empty());
    }

    #[tokio::test]
    async fn test_existing_enum_gains_missing_values_in_place() {
        let driver = existing_enum(&["user"]);
        let issued = PostgresDialect::new()
            .run_prerequisite(&driver, &enum_step(&["admin", "user", "guest"]))
            .await
            .unwrap();
        assert_eq!(issued, 2);
        assert_eq!(
            driver.ddl(),
            vec![
                "ALTER TYPE \"users_enum_role\" ADD VALUE 'admin' BEFORE 'user'".to_string(),
                "ALTER TYPE \"users_enum_role\" ADD VALUE 'guest' AFTER 'user'".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_removing_enum_value_is_unsupported() {
        let driver = existing_enum(&["admin", "user"]);
        let err = PostgresDialect::new()
            .run_prerequisite(&driver, &enum_step(&["admin"]))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Unsupported { dialect: "postgres", .. }));
        assert!(err.to_string().contains("removing value 'user'"));
        assert!(driver.ddl().is_empty());
    }

    #[tokio::test]
    async fn test_modify_key_column_keeps_not_null() {
        let driver = RecordingDriver::new("postgres");
        let prop = PropertyDescriptor::integer().key().size(8);
        PostgresDialect::new()
            .modify_collection_column(&driver, "items", "id", "", &prop)
            .await
            .unwrap();
        let ddl = driver.ddl();
        assert_eq!(ddl[0], "ALTER TABLE \"items\" ALTER COLUMN \"id\" TYPE BIGINT");
        assert_eq!(ddl[1], "ALTER TABLE \"items\" ALTER COLUMN \"id\" SET NOT NULL");
        assert!(ddl.iter().all(|s| !s.contains("DROP NOT NULL")));
    }

    #[tokio::test]
    async fn test_modify_enum_column_casts_through_text() {
        let driver = RecordingDriver::new("postgres");
        let prop = PropertyDescriptor::enumeration(["admin", "user"]);
        PostgresDialect::new()
            .modify_collection_column(&driver, "users", "role", "", &prop)
            .await
            .unwrap();
        assert_eq!(
            driver.ddl()[0],
            "ALTER TABLE \"users\" ALTER COLUMN \"role\" TYPE \"users_enum_role\" \
             USING \"role\"::text::\"users_enum_role\""
        );
    }

    #[tokio::test]
    async fn test_catalog_reads_scoped_to_current_schema() {
        let driver = RecordingDriver::new("postgres");
        let dialect = PostgresDialect::new();
        dialect.get_collection_indexes(&driver, "users").await.unwrap();
        dialect.get_collection_properties(&driver, "users").await.unwrap();

        let statements = driver.statements();
        let index_query = statements
            .iter()
            .find(|s| s.contains("NOT ix.indisprimary"))
            .unwrap();
        assert!(index_query.contains("JOIN pg_namespace n ON n.oid = t.relnamespace"));
        assert!(index_query.contains("n.nspname = current_schema()"));
        let key_query = statements
            .iter()
            .find(|s| s.contains("AND i.indisprimary"))
            .unwrap();
        assert!(key_query.contains("n.nspname = current_schema()"));
    }

    #[tokio::test]
    async fn test_modify_column_emits_alter_column_statements() {
        let driver = RecordingDriver::new("postgres");
        let prop = PropertyDescriptor::text().size(64).required();
        PostgresDialect::new()
            .modify_collection_column(&driver, "users", "name", "", &prop)
            .await
            .unwrap();
        assert_eq!(
            driver.statements(),
            vec![
                "ALTER TABLE \"users\" ALTER COLUMN \"name\" TYPE VARCHAR(64)".to_string(),
                "ALTER TABLE \"users\" ALTER COLUMN \"name\" SET NOT NULL".to_string(),
                "ALTER TABLE \"users\" ALTER COLUMN \"name\" DROP DEFAULT".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_introspection_detects_serial_and_enum() {
        let driver = RecordingDriver::new("postgres")
            .with_rows(
                "information_schema.columns",
                vec![
                    Row::new()
                        .with("column_name", "id")
                        .with("data_type", "integer")
                        .with("udt_name", "int4")
                        .with("is_nullable", "NO")
                        .with("column_default", "nextval('users_id_seq'::regclass)")
                        .with("character_maximum_length", SqlValue::Null),
                    Row::new()
                        .with("column_name", "role")
                        .with("data_type", "USER-DEFINED")
                        .with("udt_name", "users_enum_role")
                        .with("is_nullable", "YES")
                        .with("column_default", "'user'::users_enum_role")
                        .with("character_maximum_length", SqlValue::Null),
                ],
            )
            .with_rows("indisprimary", vec![Row::new().with("column_name", "id")])
            .with_rows(
                "pg_enum",
                vec![
                    Row::new().with("enumlabel", "admin"),
                    Row::new().with("enumlabel", "user"),
                ],
            );

        let cols = PostgresDialect::new()
            .get_collection_properties(&driver, "users")
            .await
            .unwrap();
        assert_eq!(cols["id"].r#type, PropertyType::Serial);
        assert!(cols["id"].key);
        assert!(cols["id"].default_expression.is_none());
        assert_eq!(cols["role"].r#type, PropertyType::Enum);
        assert_eq!(cols["role"].values, vec!["admin", "user"]);
        assert_eq!(cols["role"].default_value, Some(SqlValue::Text("user".into())));
    }
}
