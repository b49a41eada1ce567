//! SQL statement builder for schema DDL.
//!
//! Pure string construction; identifiers and literals are escaped through the
//! driver so the same builder serves every dialect. Dialects that need a
//! different statement shape (e.g. MySQL's `DROP INDEX ... ON`) pick the
//! matching variant here rather than formatting their own.

use crate::core::schema::IndexSpec;
use crate::core::traits::Driver;

/// Where `ALTER TABLE ... ADD` places the new column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnPosition<'a> {
    /// Append at the end (the only option outside MySQL).
    End,
    /// Place first.
    First,
    /// Place after the named column.
    After(&'a str),
}

fn join_ids(driver: &dyn Driver, names: &[String]) -> String {
    names
        .iter()
        .map(|n| driver.escape_id(n))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `CREATE TABLE name (col, ..., PRIMARY KEY (keys))`.
///
/// The key clause is omitted when `keys` is empty.
pub fn create_table(driver: &dyn Driver, name: &str, columns: &[String], keys: &[String]) -> String {
    let mut sql = format!(
        "CREATE TABLE {} ({}",
        driver.escape_id(name),
        columns.join(", ")
    );
    if !keys.is_empty() {
        sql.push_str(&format!(", PRIMARY KEY ({})", join_ids(driver, keys)));
    }
    sql.push(')');
    sql
}

/// `DROP TABLE IF EXISTS name`.
pub fn drop_table(driver: &dyn Driver, name: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", driver.escape_id(name))
}

/// `ALTER TABLE name ADD column [FIRST | AFTER col]`.
pub fn alter_table_add_column(
    driver: &dyn Driver,
    name: &str,
    column: &str,
    position: ColumnPosition<'_>,
) -> String {
    let mut sql = format!("ALTER TABLE {} ADD {}", driver.escape_id(name), column);
    match position {
        ColumnPosition::End => {}
        ColumnPosition::First => sql.push_str(" FIRST"),
        ColumnPosition::After(prev) => {
            sql.push_str(" AFTER ");
            sql.push_str(&driver.escape_id(prev));
        }
    }
    sql
}

/// `ALTER TABLE name MODIFY column` (MySQL).
pub fn alter_table_modify_column(driver: &dyn Driver, name: &str, column: &str) -> String {
    format!("ALTER TABLE {} MODIFY {}", driver.escape_id(name), column)
}

/// `ALTER TABLE name ALTER COLUMN col <action>` (PostgreSQL).
pub fn alter_table_alter_column(driver: &dyn Driver, name: &str, col: &str, action: &str) -> String {
    format!(
        "ALTER TABLE {} ALTER COLUMN {} {}",
        driver.escape_id(name),
        driver.escape_id(col),
        action
    )
}

/// `ALTER TABLE name RENAME COLUMN old TO new`.
pub fn alter_table_rename_column(driver: &dyn Driver, name: &str, old: &str, new: &str) -> String {
    format!(
        "ALTER TABLE {} RENAME COLUMN {} TO {}",
        driver.escape_id(name),
        driver.escape_id(old),
        driver.escape_id(new)
    )
}

/// `ALTER TABLE name DROP COLUMN col`.
pub fn alter_table_drop_column(driver: &dyn Driver, name: &str, col: &str) -> String {
    format!(
        "ALTER TABLE {} DROP COLUMN {}",
        driver.escape_id(name),
        driver.escape_id(col)
    )
}

/// `CREATE [UNIQUE] INDEX idx ON name (cols)`.
pub fn create_index(driver: &dyn Driver, collection: &str, index: &IndexSpec) -> String {
    format!(
        "CREATE {}INDEX {} ON {} ({})",
        if index.unique { "UNIQUE " } else { "" },
        driver.escape_id(&index.name),
        driver.escape_id(collection),
        join_ids(driver, &index.columns)
    )
}

/// `DROP INDEX idx`, or `DROP INDEX idx ON name` when the index is
/// table-scoped (MySQL).
pub fn drop_index(driver: &dyn Driver, index: &str, on: Option<&str>) -> String {
    match on {
        Some(collection) => format!(
            "DROP INDEX {} ON {}",
            driver.escape_id(index),
            driver.escape_id(collection)
        ),
        None => format!("DROP INDEX {}", driver.escape_id(index)),
    }
}

/// `CREATE TYPE name AS ENUM (values)` (PostgreSQL).
pub fn create_enum_type(driver: &dyn Driver, name: &str, values: &[String]) -> String {
    let values = values
        .iter()
        .map(|v| driver.escape_value(&v.as_str().into()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TYPE {} AS ENUM ({})", driver.escape_id(name), values)
}

/// Where `ALTER TYPE ... ADD VALUE` places the new member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumPosition<'a> {
    End,
    Before(&'a str),
    After(&'a str),
}

/// `ALTER TYPE name ADD VALUE 'value' [BEFORE | AFTER 'other']` (PostgreSQL).
pub fn alter_enum_add_value(
    driver: &dyn Driver,
    name: &str,
    value: &str,
    position: EnumPosition<'_>,
) -> String {
    let literal = |v: &str| driver.escape_value(&v.into());
    let mut sql = format!(
        "ALTER TYPE {} ADD VALUE {}",
        driver.escape_id(name),
        literal(value)
    );
    match position {
        EnumPosition::End => {}
        EnumPosition::Before(other) => sql.push_str(&format!(" BEFORE {}", literal(other))),
        EnumPosition::After(other) => sql.push_str(&format!(" AFTER {}", literal(other))),
    }
    sql
}
