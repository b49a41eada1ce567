//! Identifier validation, quoting and literal escaping.
//!
//! Drivers expose `escape_id`/`escape_value`; the built-in drivers delegate
//! to the functions here so every dialect quotes the same way whether the
//! statement ends up on a live connection or in a dry-run transcript.
//!
//! # Security
//!
//! Table, column, index and enum type names are spliced into DDL, because
//! identifiers cannot be bound as parameters. They are validated and then
//! quoted with the dialect's quoting rules. Default expressions are
//! unescaped SQL by contract and are only screened for statement chaining.

use chrono::{FixedOffset, Local, NaiveDateTime, Offset, TimeZone, Utc};

use crate::core::value::SqlValue;
use crate::error::{Result, SyncError};

/// Maximum identifier length (conservative limit across databases).
/// - PostgreSQL: 63 bytes
/// - MySQL: 64 characters
/// - SQLite: unlimited
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validate an identifier for security issues.
///
/// Rejects empty identifiers, identifiers containing null bytes, and
/// identifiers exceeding the maximum length.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(SyncError::Config("Identifier cannot be empty".to_string()));
    }

    if name.contains('\0') {
        return Err(SyncError::Config(format!(
            "SECURITY: Identifier contains null byte (possible injection attempt): {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(SyncError::Config(format!(
            "SECURITY: Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// Quote a PostgreSQL/SQLite identifier with double quotes.
pub fn quote_double(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a MySQL identifier with backticks.
pub fn quote_backtick(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Escape a string literal with standard SQL quote doubling.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Escape a string literal for MySQL, which also treats backslash as an
/// escape character.
pub fn quote_literal_mysql(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\'' => out.push_str("''"),
            '\\' => out.push_str("\\\\"),
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\x1a' => out.push_str("\\Z"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}

/// Timezone applied to temporal values before they are rendered as literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timezone {
    /// The process's local timezone.
    #[default]
    Local,
    /// A fixed offset (`Z` is UTC).
    Fixed(FixedOffset),
}

impl Timezone {
    /// Parse `local`, `Z`, or a `+HH:MM`/`-HH:MM` offset.
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("local") || trimmed.is_empty() {
            return Ok(Timezone::Local);
        }
        if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
            return Ok(Timezone::Fixed(Utc.fix()));
        }

        let invalid = || SyncError::Config(format!("Invalid timezone '{}'", s));
        let (sign, rest) = match trimmed.as_bytes().first() {
            Some(b'+') => (1, &trimmed[1..]),
            Some(b'-') => (-1, &trimmed[1..]),
            _ => return Err(invalid()),
        };
        let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
        let hours: i32 = hours.parse().map_err(|_| invalid())?;
        let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
        if hours > 23 || minutes > 59 {
            return Err(invalid());
        }
        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
            .map(Timezone::Fixed)
            .ok_or_else(invalid)
    }

    /// Render a naive timestamp (taken as UTC) in this timezone.
    fn render(&self, dt: &NaiveDateTime) -> String {
        let utc = Utc.from_utc_datetime(dt);
        match self {
            Timezone::Local => utc.with_timezone(&Local).format(TIMESTAMP_FORMAT).to_string(),
            Timezone::Fixed(offset) => utc.with_timezone(offset).format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Literal rendering rules that differ between dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralStyle {
    /// Quote doubling, `true`/`false` booleans, `'\x..'` bytea.
    Postgres,
    /// Backslash escaping, `1`/`0` booleans, `X'..'` blobs.
    Mysql,
    /// Quote doubling, `1`/`0` booleans, `X'..'` blobs.
    Sqlite,
}

/// Render a value as a SQL literal.
///
/// Non-finite floats have no numeric literal. PostgreSQL takes them as
/// quoted strings, SQLite spells infinity as an overflowing `9e999`, and
/// anything else becomes `NULL`, which is what SQLite stores for NaN and the
/// closest MySQL has.
pub fn escape_value(value: &SqlValue, style: LiteralStyle, tz: Timezone) -> String {
    let text = |s: &str| match style {
        LiteralStyle::Mysql => quote_literal_mysql(s),
        LiteralStyle::Postgres | LiteralStyle::Sqlite => quote_literal(s),
    };

    match value {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Bool(b) => match style {
            LiteralStyle::Postgres => (if *b { "true" } else { "false" }).to_string(),
            LiteralStyle::Mysql | LiteralStyle::Sqlite => (if *b { "1" } else { "0" }).to_string(),
        },
        SqlValue::Int(v) => v.to_string(),
        SqlValue::Float(f) if f.is_finite() => f.to_string(),
        SqlValue::Float(f) => match (style, f.is_nan()) {
            (LiteralStyle::Postgres, true) => "'NaN'".to_string(),
            (LiteralStyle::Postgres, false) if *f > 0.0 => "'Infinity'".to_string(),
            (LiteralStyle::Postgres, false) => "'-Infinity'".to_string(),
            (LiteralStyle::Sqlite, false) if *f > 0.0 => "9e999".to_string(),
            (LiteralStyle::Sqlite, false) => "-9e999".to_string(),
            _ => "NULL".to_string(),
        },
        SqlValue::Text(s) => text(s),
        SqlValue::Bytes(bytes) => {
            let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
            match style {
                LiteralStyle::Postgres => format!("'\\x{}'", hex),
                LiteralStyle::Mysql | LiteralStyle::Sqlite => format!("X'{}'", hex),
            }
        }
        SqlValue::Uuid(u) => text(&u.to_string()),
        SqlValue::Date(d) => text(&d.format("%Y-%m-%d").to_string()),
        SqlValue::DateTime(dt) => text(&tz.render(dt)),
        SqlValue::DateTimeOffset(dt) => text(&tz.render(&dt.naive_utc())),
    }
}

/// Screen an unescaped default expression for statement chaining.
///
/// Default expressions are spliced verbatim inside `DEFAULT (...)`, so they
/// must be a single expression: no semicolons, no comments.
pub fn validate_default_expression(expr: &str) -> Result<()> {
    if expr.trim().is_empty() {
        return Err(SyncError::Config(
            "Default expression cannot be empty".to_string(),
        ));
    }

    if expr.contains(';') {
        return Err(SyncError::Config(format!(
            "SECURITY: Default expression contains semicolon (possible injection): {:?}",
            expr
        )));
    }

    if expr.contains("--") || expr.contains("/*") || expr.contains("*/") {
        return Err(SyncError::Config(format!(
            "SECURITY: Default expression contains SQL comment markers (possible injection): {:?}",
            expr
        )));
    }

    Ok(())
}
