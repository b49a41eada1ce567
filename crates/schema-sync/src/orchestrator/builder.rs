//! Column and index builders.
//!
//! Stateless helpers that turn property descriptors into column plans and
//! derive the named indexes a collection should have.

use std::collections::HashMap;

use crate::core::identifier::{validate_default_expression, validate_identifier};
use crate::core::property::{IndexGroup, PropertyDescriptor, PropertyType};
use crate::core::schema::{CollectionDefinition, ColumnPlan, IndexSpec};
use crate::core::traits::{CustomType, DialectAdapter, Driver};
use crate::core::value::SqlValue;
use crate::error::{Result, SyncError};

/// Custom types registered by name.
pub type CustomTypes = HashMap<String, Box<dyn CustomType>>;

/// Plan the full column definition for one property.
///
/// A registered custom type wins over the dialect mapping. The returned
/// fragment is prefixed with the escaped storage column name. `None` means
/// neither a custom type nor the dialect knows the property's type.
pub fn create_column(
    dialect: &dyn DialectAdapter,
    driver: &dyn Driver,
    types: &CustomTypes,
    collection: &str,
    name: &str,
    property: &PropertyDescriptor,
) -> Option<ColumnPlan> {
    let column = property.column_name(name);
    let plan = match types.get(property.r#type.as_str()) {
        Some(custom) => custom.datastore_type(property, driver.dialect()),
        None => dialect.get_type(collection, column, property, driver)?,
    };
    Some(plan.map_sql(|sql| format!("{} {}", driver.escape_id(column), sql)))
}

/// Derive the indexes declared by a collection's properties.
///
/// `unique: true` / `index: true` produce a single-column index named
/// `{property}_unique` / `{property}_index`. Group names merge every property
/// naming the same group into one composite index, columns in declaration
/// order; the first property to name a group decides its uniqueness. The
/// dialect then renames the result.
pub fn collection_indexes(
    dialect: &dyn DialectAdapter,
    collection: &CollectionDefinition,
) -> Vec<IndexSpec> {
    let mut indexes: Vec<IndexSpec> = Vec::new();

    for (name, property) in &collection.properties {
        let column = property.column_name(name);
        for (group, unique) in [(&property.unique, true), (&property.index, false)] {
            if let IndexGroup::Flag(true) = group {
                let suffix = if unique { "unique" } else { "index" };
                indexes.push(IndexSpec::new(
                    format!("{}_{}", name, suffix),
                    unique,
                    vec![column.to_string()],
                ));
                continue;
            }
            for group_name in group.names() {
                match indexes.iter_mut().find(|i| i.name == group_name) {
                    Some(existing) => existing.columns.push(column.to_string()),
                    None => indexes.push(IndexSpec::new(
                        group_name,
                        unique,
                        vec![column.to_string()],
                    )),
                }
            }
        }
    }

    dialect.convert_indexes(&collection.name, indexes)
}

/// Reject property descriptors no dialect could turn into a column.
pub fn validate_property(collection: &str, name: &str, property: &PropertyDescriptor) -> Result<()> {
    let invalid = |message: &str| SyncError::invalid_property(collection, name, message);

    validate_identifier(property.column_name(name))?;

    if property.default_value.is_some() && property.default_expression.is_some() {
        return Err(invalid(
            "default_value and default_expression are mutually exclusive",
        ));
    }
    if let Some(expr) = &property.default_expression {
        validate_default_expression(expr).map_err(|e| invalid(&e.to_string()))?;
    }
    if let Some(SqlValue::Float(f)) = &property.default_value {
        if !f.is_finite() {
            return Err(invalid("default_value must be a finite number"));
        }
    }
    if property.r#type == PropertyType::Enum && property.values.is_empty() {
        return Err(invalid("enum properties require at least one value"));
    }
    if property.size == Some(0) {
        return Err(invalid("size must be greater than 0"));
    }
    for group in [&property.unique, &property.index] {
        if let Some(empty) = group.names().into_iter().find(|g| g.is_empty()) {
            return Err(invalid(&format!("index group name {:?} is empty", empty)));
        }
    }

    Ok(())
}
