//! SQLite connection handle.
//!
//! Uses SQLx with a single pooled connection, which keeps a
//! `sqlite::memory:` database alive for the lifetime of the handle.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column as _, Row as _, ValueRef as _};
use tracing::info;

use crate::core::identifier::{escape_value, quote_double, LiteralStyle, Timezone};
use crate::core::traits::Driver;
use crate::core::value::{Row, SqlValue};
use crate::error::{DriverError, Result, SyncError};

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// SQLite driver handle.
pub struct SqliteDriver {
    pool: SqlitePool,
    timezone: Timezone,
}

impl SqliteDriver {
    /// Open the database at `url`, creating the file if it does not exist.
    pub async fn connect(url: &str, timezone: Timezone) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| SyncError::Config(format!("Invalid SQLite URL: {}", e)))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(POOL_CONNECTION_TIMEOUT)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(DriverError::wrap)?;

        info!("Opened SQLite database {}", url);
        Ok(Self { pool, timezone })
    }

    /// Convert a SQLite row. Values are decoded by their storage class.
    fn convert_row(row: &SqliteRow) -> Row {
        let mut out = Row::new();
        for (i, column) in row.columns().iter().enumerate() {
            let is_null = row.try_get_raw(i).map(|r| r.is_null()).unwrap_or(true);
            let value = if is_null {
                SqlValue::Null
            } else if let Ok(v) = row.try_get::<i64, _>(i) {
                SqlValue::Int(v)
            } else if let Ok(v) = row.try_get::<f64, _>(i) {
                SqlValue::Float(v)
            } else if let Ok(v) = row.try_get::<String, _>(i) {
                SqlValue::Text(v)
            } else if let Ok(v) = row.try_get::<Vec<u8>, _>(i) {
                SqlValue::Bytes(v)
            } else {
                SqlValue::Null
            };
            out.push(column.name(), value);
        }
        out
    }
}

#[async_trait]
impl Driver for SqliteDriver {
    fn dialect(&self) -> &str {
        "sqlite"
    }

    fn escape_id(&self, name: &str) -> String {
        quote_double(name)
    }

    fn escape_value(&self, value: &SqlValue) -> String {
        escape_value(value, LiteralStyle::Sqlite, self.timezone)
    }

    async fn execute(&self, sql: &str) -> std::result::Result<Vec<Row>, DriverError> {
        let rows: Vec<SqliteRow> = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(DriverError::wrap)?;
        Ok(rows.iter().map(Self::convert_row).collect())
    }
}
