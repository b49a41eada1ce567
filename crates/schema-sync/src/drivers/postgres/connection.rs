//! PostgreSQL connection handle.
//!
//! Uses deadpool-postgres for connection pooling. Statements go through the
//! simple query protocol, so DDL needs no preparation and every value comes
//! back as text.

use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::{Config as PgConfig, NoTls, SimpleQueryMessage};
use tracing::{info, warn};

use crate::core::identifier::{escape_value, quote_double, LiteralStyle, Timezone};
use crate::core::traits::Driver;
use crate::core::value::{Row, SqlValue};
use crate::error::{DriverError, Result, SyncError};

/// DDL runs one statement at a time.
const MAX_CONNECTIONS: usize = 1;

/// PostgreSQL (or Redshift) driver handle.
pub struct PostgresDriver {
    pool: Pool,
    dialect: &'static str,
    timezone: Timezone,
}

impl PostgresDriver {
    /// Connect to the database at `url`.
    ///
    /// `dialect` is reported back through [`Driver::dialect`], so the same
    /// handle serves `postgres` and `redshift`.
    pub async fn connect(url: &str, dialect: &'static str, timezone: Timezone) -> Result<Self> {
        let pg_config: PgConfig = url
            .parse()
            .map_err(|e| SyncError::Config(format!("Invalid PostgreSQL URL: {}", e)))?;

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        warn!("PostgreSQL TLS is disabled. Credentials will be transmitted in plaintext.");
        let mgr = Manager::from_config(pg_config, NoTls, mgr_config);
        let pool = Pool::builder(mgr)
            .max_size(MAX_CONNECTIONS)
            .build()
            .map_err(DriverError::wrap)?;

        // Test connection
        let client = pool.get().await.map_err(DriverError::wrap)?;
        client.simple_query("SELECT 1").await.map_err(DriverError::wrap)?;

        info!("Connected to {}", dialect);
        Ok(Self {
            pool,
            dialect,
            timezone,
        })
    }
}

#[async_trait]
impl Driver for PostgresDriver {
    fn dialect(&self) -> &str {
        self.dialect
    }

    fn escape_id(&self, name: &str) -> String {
        quote_double(name)
    }

    fn escape_value(&self, value: &SqlValue) -> String {
        escape_value(value, LiteralStyle::Postgres, self.timezone)
    }

    async fn execute(&self, sql: &str) -> std::result::Result<Vec<Row>, DriverError> {
        let client = self.pool.get().await.map_err(DriverError::wrap)?;
        let messages = client.simple_query(sql).await.map_err(DriverError::wrap)?;

        let mut rows = Vec::new();
        for message in messages {
            if let SimpleQueryMessage::Row(row) = message {
                let mut out = Row::new();
                for (i, column) in row.columns().iter().enumerate() {
                    let value = row
                        .try_get(i)
                        .map_err(DriverError::wrap)?
                        .map(|s| SqlValue::Text(s.to_string()))
                        .unwrap_or(SqlValue::Null);
                    out.push(column.name(), value);
                }
                rows.push(out);
            }
        }
        Ok(rows)
    }
}
