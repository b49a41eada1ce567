//! Amazon Redshift driver.
//!
//! Redshift connections use [`PostgresDriver`](crate::drivers::postgres)
//! reporting the `redshift` dialect; only the adapter differs.

mod dialect;

pub use dialect::RedshiftDialect;
