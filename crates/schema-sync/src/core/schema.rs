//! Collection, index and column-plan types shared by the orchestrator and
//! the dialect adapters.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::property::PropertyDescriptor;

/// Ordered map of property name to descriptor.
pub type PropertyMap = IndexMap<String, PropertyDescriptor>;

/// A table as declared by the ORM layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionDefinition {
    /// Table name.
    pub name: String,

    /// Properties in declaration order.
    pub properties: PropertyMap,
}

impl CollectionDefinition {
    /// Create a definition, filling in every `maps_to` that was left unset.
    pub fn new(name: impl Into<String>, mut properties: PropertyMap) -> Self {
        for (prop_name, prop) in properties.iter_mut() {
            if prop.maps_to.is_none() {
                prop.maps_to = Some(prop_name.clone());
            }
        }
        Self {
            name: name.into(),
            properties,
        }
    }

    /// Iterate `(storage column, descriptor)` pairs in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &PropertyDescriptor)> {
        self.properties
            .iter()
            .map(|(name, prop)| (prop.column_name(name), prop))
    }

    /// Find the property stored under a column name.
    pub fn property_for_column(&self, column: &str) -> Option<(&str, &PropertyDescriptor)> {
        self.properties
            .iter()
            .find(|(name, prop)| prop.column_name(name) == column)
            .map(|(name, prop)| (name.as_str(), prop))
    }
}

/// An index the collection should have.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Index name (after dialect renaming).
    pub name: String,

    /// Whether the index is unique.
    pub unique: bool,

    /// Indexed columns in declaration order.
    pub columns: Vec<String>,
}

impl IndexSpec {
    pub fn new(name: impl Into<String>, unique: bool, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            unique,
            columns,
        }
    }
}

/// An index found in the live database.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LiveIndex {
    /// Indexed columns in index order.
    pub columns: Vec<String>,

    /// Whether the index is unique.
    pub unique: bool,
}

/// Live indexes keyed by name, in catalog order.
pub type IndexMapByName = IndexMap<String, LiveIndex>;

/// Live columns keyed by column name, reverse-mapped into descriptors.
pub type ColumnMap = IndexMap<String, PropertyDescriptor>;

/// A primary-key column handed to `process_keys`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyColumn {
    /// Storage column name.
    pub name: String,

    /// Column is an auto-incrementing identity.
    pub serial: bool,
}

/// A step that must complete before a column statement can run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prerequisite {
    /// Create a named enum type unless it already exists.
    CreateEnumType { name: String, values: Vec<String> },

    /// Run an arbitrary statement.
    Execute { sql: String },
}

/// The DDL fragment for one column, with any step it depends on.
///
/// A `Deferred` plan cannot be turned into its SQL without handing over the
/// prerequisite as well, so a caller cannot forget to run it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnPlan {
    /// The fragment can be used right away.
    Immediate(String),

    /// The prerequisite must succeed before the fragment is used.
    Deferred(Prerequisite, String),
}

impl ColumnPlan {
    /// Borrow the SQL fragment.
    pub fn sql(&self) -> &str {
        match self {
            ColumnPlan::Immediate(sql) | ColumnPlan::Deferred(_, sql) => sql,
        }
    }

    /// Rewrite the SQL fragment, keeping any prerequisite.
    pub fn map_sql(self, f: impl FnOnce(String) -> String) -> Self {
        match self {
            ColumnPlan::Immediate(sql) => ColumnPlan::Immediate(f(sql)),
            ColumnPlan::Deferred(pre, sql) => ColumnPlan::Deferred(pre, f(sql)),
        }
    }

    /// Split into the prerequisite (if any) and the fragment.
    pub fn into_parts(self) -> (Option<Prerequisite>, String) {
        match self {
            ColumnPlan::Immediate(sql) => (None, sql),
            ColumnPlan::Deferred(pre, sql) => (Some(pre), sql),
        }
    }
}
