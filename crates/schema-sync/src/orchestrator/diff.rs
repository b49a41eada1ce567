//! Column comparator for the alter path.

use std::collections::HashSet;

use crate::core::property::{PropertyDescriptor, PropertyType};
use crate::core::traits::DialectAdapter;
use crate::core::value::SqlValue;

/// Decide whether a live column must be modified to match its declaration.
///
/// Serial columns are never modified. The declared type is compared after the
/// dialect's own degradation (an enum stored as VARCHAR on MySQL is not a
/// change), custom types are not compared at all, and nullability of key
/// columns is left alone.
pub fn need_to_sync(
    dialect: &dyn DialectAdapter,
    declared: &PropertyDescriptor,
    live: &PropertyDescriptor,
) -> bool {
    if declared.is_serial() {
        return false;
    }

    if !matches!(declared.r#type, PropertyType::Custom(_))
        && declared.r#type != live.r#type
        && dialect.supports_type(&declared.r#type) != live.r#type
    {
        return true;
    }

    if !declared.key && declared.required != live.required {
        return true;
    }

    if let Some(default) = &declared.default_value {
        if !same_default(default, live.default_value.as_ref()) {
            return true;
        }
    }

    if let (Some(size), Some(live_size)) = (effective_size(declared), live.size) {
        if matches!(declared.r#type, PropertyType::Integer | PropertyType::Number)
            && size != live_size
        {
            return true;
        }
    }

    if declared.r#type == PropertyType::Enum && live.r#type == PropertyType::Enum {
        let want: HashSet<&str> = declared.values.iter().map(String::as_str).collect();
        let have: HashSet<&str> = live.values.iter().map(String::as_str).collect();
        if want.symmetric_difference(&have).next().is_some() {
            return true;
        }
    }

    false
}

/// Byte width a numeric property maps to when no size is given.
fn effective_size(property: &PropertyDescriptor) -> Option<u32> {
    match property.r#type {
        PropertyType::Integer => Some(property.size.unwrap_or(4)),
        PropertyType::Number => Some(property.size.unwrap_or(8)),
        _ => None,
    }
}

/// Compare a declared default against what the catalog reports.
///
/// Catalogs hand defaults back as text, so the live value is coerced to the
/// declared value's kind before comparing.
fn same_default(declared: &SqlValue, live: Option<&SqlValue>) -> bool {
    let Some(live) = live else {
        return declared.is_null();
    };
    match declared {
        SqlValue::Null => live.is_null(),
        SqlValue::Bool(b) => live.as_bool() == Some(*b),
        SqlValue::Int(v) => live.as_i64() == Some(*v),
        SqlValue::Float(f) => live
            .to_text()
            .and_then(|t| t.trim().parse::<f64>().ok())
            .is_some_and(|v| v == *f),
        other => other.to_text() == live.to_text(),
    }
}
