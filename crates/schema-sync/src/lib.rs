//! # schema-sync
//!
//! Schema synchronization engine for ORM-declared collections.
//!
//! Collections are declared as ordered maps of dialect-independent property
//! descriptors. The engine inspects the live database, emits the DDL needed
//! to create missing tables, columns and indexes, and runs it in dependency
//! order with fail-fast semantics. Supported dialects:
//!
//! - **MySQL / MariaDB**
//! - **PostgreSQL** (native enum types)
//! - **SQLite**
//! - **Redshift** (PostgreSQL catalog, restricted type set)
//!
//! ## Example
//!
//! ```rust,no_run
//! use schema_sync::{connect, Config};
//!
//! #[tokio::main]
//! async fn main() -> schema_sync::Result<()> {
//!     let config = Config::load("schema.yaml")?;
//!     let driver = connect(&config.connection, config.sync.timezone()?).await?;
//!     let report = config.synchronizer(driver)?.sync().await?;
//!     println!("{} changes", report.changes);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod orchestrator;
pub mod queue;
pub mod sql;

// Re-exports for convenient access
pub use crate::core::{
    CollectionDefinition, ColumnPlan, CustomType, DialectAdapter, Driver, FixedType, IndexGroup,
    IndexSpec, Prerequisite, PropertyDescriptor, PropertyMap, PropertyType, Row, SqlValue,
    Timezone,
};
pub use config::{CollectionConfig, Config, ConnectionConfig, SyncConfig};
pub use drivers::{connect, DialectImpl, RecordingDriver};
pub use error::{DriverError, Result, SyncError};
pub use orchestrator::{
    CollectionOutcome, CollectionReport, DropOptions, DropReport, SyncOptions, SyncReport,
    Synchronizer,
};
pub use queue::Queue;
