//! Core abstractions for dialect-agnostic schema synchronization.
//!
//! This module provides the foundational types and traits used throughout
//! the engine:
//!
//! - [`property`]: Property descriptors (the per-column model)
//! - [`schema`]: Collection, index and column-plan types
//! - [`value`]: SQL value representation and result rows
//! - [`identifier`]: Identifier validation, quoting and literal escaping
//! - [`traits`]: Driver, dialect adapter and custom type traits
//!
//! # Architecture
//!
//! The core module defines database-agnostic abstractions that are implemented
//! by driver modules (`drivers/mysql`, `drivers/postgres`, etc.). The
//! orchestrator only ever talks to these traits, so it can be tested against
//! a scripted driver.

pub mod identifier;
pub mod property;
pub mod schema;
pub mod traits;
pub mod value;

// Re-export commonly used types for convenience
pub use identifier::Timezone;
pub use property::{IndexGroup, PropertyDescriptor, PropertyType};
pub use schema::{
    CollectionDefinition, ColumnMap, ColumnPlan, IndexMapByName, IndexSpec, KeyColumn,
    LiveIndex, Prerequisite, PropertyMap,
};
pub use traits::{CustomType, DialectAdapter, Driver, FixedType};
pub use value::{Row, SqlValue};
