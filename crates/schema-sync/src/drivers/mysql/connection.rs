//! MySQL/MariaDB connection handle.
//!
//! Uses SQLx for connection pooling and async query execution.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column as _, Row as _, ValueRef as _};
use tracing::info;

use crate::core::identifier::{escape_value, quote_backtick, LiteralStyle, Timezone};
use crate::core::traits::Driver;
use crate::core::value::{Row, SqlValue};
use crate::error::{DriverError, Result};

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// DDL runs one statement at a time.
const MAX_CONNECTIONS: u32 = 1;

/// MySQL/MariaDB driver handle.
pub struct MysqlDriver {
    pool: MySqlPool,
    timezone: Timezone,
}

impl MysqlDriver {
    /// Connect to the database at `url`.
    pub async fn connect(url: &str, timezone: Timezone) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(POOL_CONNECTION_TIMEOUT)
            .connect(url)
            .await
            .map_err(DriverError::wrap)?;

        // Test connection
        sqlx::query("SELECT 1")
            .fetch_one(&pool)
            .await
            .map_err(DriverError::wrap)?;

        info!("Connected to MySQL");
        Ok(Self { pool, timezone })
    }

    /// Convert a MySQL row, trying the decodings catalog columns use.
    fn convert_row(row: &MySqlRow) -> Row {
        let mut out = Row::new();
        for (i, column) in row.columns().iter().enumerate() {
            let is_null = row.try_get_raw(i).map(|r| r.is_null()).unwrap_or(true);
            let value = if is_null {
                SqlValue::Null
            } else if let Ok(v) = row.try_get::<i64, _>(i) {
                SqlValue::Int(v)
            } else if let Ok(v) = row.try_get::<u64, _>(i) {
                i64::try_from(v).map(SqlValue::Int).unwrap_or(SqlValue::Text(v.to_string()))
            } else if let Ok(v) = row.try_get::<f64, _>(i) {
                SqlValue::Float(v)
            } else if let Ok(v) = row.try_get::<String, _>(i) {
                SqlValue::Text(v)
            } else if let Ok(v) = row.try_get::<Vec<u8>, _>(i) {
                // information_schema reports some text columns with a binary collation
                SqlValue::Text(String::from_utf8_lossy(&v).into_owned())
            } else {
                SqlValue::Null
            };
            out.push(column.name(), value);
        }
        out
    }
}

#[async_trait]
impl Driver for MysqlDriver {
    fn dialect(&self) -> &str {
        "mysql"
    }

    fn escape_id(&self, name: &str) -> String {
        quote_backtick(name)
    }

    fn escape_value(&self, value: &SqlValue) -> String {
        escape_value(value, LiteralStyle::Mysql, self.timezone)
    }

    async fn execute(&self, sql: &str) -> std::result::Result<Vec<Row>, DriverError> {
        let rows: Vec<MySqlRow> = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(DriverError::wrap)?;
        Ok(rows.iter().map(Self::convert_row).collect())
    }
}
