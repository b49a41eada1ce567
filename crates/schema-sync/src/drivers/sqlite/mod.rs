//! SQLite driver.
//!
//! - [`SqliteDialect`]: DDL and introspection strategy for SQLite
//! - [`SqliteDriver`]: Connection handle (requires the `sqlite` feature)
//!
//! # Connection String
//!
//! ```text
//! sqlite://path/to/file.db
//! sqlite::memory:
//! ```

#[cfg(feature = "sqlite")]
mod connection;
mod dialect;

#[cfg(feature = "sqlite")]
pub use connection::SqliteDriver;
pub use dialect::SqliteDialect;
