//! PostgreSQL driver.
//!
//! This module provides PostgreSQL-specific implementations:
//!
//! - [`PostgresDialect`]: DDL and introspection strategy for PostgreSQL
//! - [`PostgresDriver`]: Connection handle (requires the `postgres` feature),
//!   also used for Redshift

#[cfg(feature = "postgres")]
mod connection;
mod dialect;

#[cfg(feature = "postgres")]
pub use connection::PostgresDriver;
pub use dialect::PostgresDialect;
