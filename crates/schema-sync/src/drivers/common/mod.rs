//! Common utilities shared across dialect adapters.
//!
//! Catalog queries hand back column types and defaults as text
//! (`int(11) unsigned`, `'abc'::character varying`, `enum('a','b')`). The
//! helpers here turn that text back into the pieces a
//! [`PropertyDescriptor`](crate::core::PropertyDescriptor) is made of.

use crate::core::value::SqlValue;

/// A raw catalog column type split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawColumnType {
    /// Base type name, lowercased (`varchar`, `int`, `enum`).
    pub name: String,

    /// Text between the parentheses, if any.
    pub args: Option<String>,

    /// Trailing `unsigned` modifier.
    pub unsigned: bool,
}

impl RawColumnType {
    /// Split `int(11) unsigned` into `int`, `11`, unsigned.
    pub fn parse(raw: &str) -> Self {
        let lower = raw.trim().to_ascii_lowercase();
        let (head, args, tail) = match (lower.find('('), lower.rfind(')')) {
            (Some(open), Some(close)) if close > open => (
                lower[..open].trim().to_string(),
                Some(raw.trim()[open + 1..close].to_string()),
                lower[close + 1..].to_string(),
            ),
            _ => {
                let mut words = lower.splitn(2, ' ');
                let head = words.next().unwrap_or_default().to_string();
                let tail = words.next().unwrap_or_default().to_string();
                (head, None, tail)
            }
        };
        Self {
            name: head,
            args,
            unsigned: tail.split_whitespace().any(|w| w == "unsigned"),
        }
    }

    /// Leading numeric argument (`varchar(64)` → 64, `decimal(10,2)` → 10).
    pub fn size(&self) -> Option<u32> {
        self.args
            .as_deref()
            .and_then(|a| a.split(',').next())
            .and_then(|n| n.trim().parse().ok())
    }
}

/// Parse a quoted, comma-separated enum member list: `'a','it''s'`.
pub fn parse_enum_values(args: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut chars = args.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quote) {
            ('\'', false) => in_quote = true,
            ('\'', true) => {
                if chars.peek() == Some(&'\'') {
                    chars.next();
                    current.push('\'');
                } else {
                    in_quote = false;
                    values.push(std::mem::take(&mut current));
                }
            }
            (c, true) => current.push(c),
            (_, false) => {}
        }
    }
    values
}

/// Strip SQL quoting from a literal: `'it''s'` → `it's`.
pub fn unquote_literal(raw: &str) -> Option<String> {
    let inner = raw.strip_prefix('\'')?.strip_suffix('\'')?;
    Some(inner.replace("''", "'"))
}

/// Drop a trailing `::type` cast from a quoted or numeric literal.
///
/// For a quoted literal only a cast after the closing quote counts, so
/// `'a::b'::text` keeps `'a::b'`. Anything after the cast other than a type
/// name (an operator, another literal) leaves the input untouched.
fn strip_literal_cast(raw: &str) -> &str {
    let end = if raw.starts_with('\'') {
        let bytes = raw.as_bytes();
        let mut i = 1;
        loop {
            match bytes.get(i) {
                Some(b'\'') if bytes.get(i + 1) == Some(&b'\'') => i += 2,
                Some(b'\'') => break i + 1,
                Some(_) => i += 1,
                None => return raw,
            }
        }
    } else {
        match raw.find("::") {
            Some(pos) if raw[..pos].parse::<f64>().is_ok() => pos,
            _ => return raw,
        }
    };

    match raw[end..].strip_prefix("::") {
        Some(ty)
            if !ty.is_empty()
                && ty
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || " _.\"()[],".contains(c)) =>
        {
            &raw[..end]
        }
        _ => raw,
    }
}

/// A column default as reported by the catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveDefault {
    None,
    Value(SqlValue),
    Expression(String),
}

impl LiveDefault {
    /// Classify a catalog default.
    ///
    /// PostgreSQL reports literals with a cast (`'abc'::character varying`);
    /// the cast is dropped. Anything that is not a plain literal is kept as an
    /// expression. With `bare_text`, unquoted words are literals (MySQL
    /// reports string defaults without quotes).
    pub fn parse(raw: Option<&str>, bare_text: bool) -> Self {
        let Some(raw) = raw.map(str::trim) else {
            return LiveDefault::None;
        };
        if raw.eq_ignore_ascii_case("null") {
            return LiveDefault::None;
        }

        let without_cast = strip_literal_cast(raw);

        if let Some(text) = unquote_literal(without_cast) {
            return LiveDefault::Value(SqlValue::Text(text));
        }
        if let Ok(v) = without_cast.parse::<i64>() {
            return LiveDefault::Value(SqlValue::Int(v));
        }
        if let Ok(v) = without_cast.parse::<f64>() {
            return LiveDefault::Value(SqlValue::Float(v));
        }
        match without_cast.to_ascii_lowercase().as_str() {
            "true" => LiveDefault::Value(SqlValue::Bool(true)),
            "false" => LiveDefault::Value(SqlValue::Bool(false)),
            _ if bare_text => LiveDefault::Value(SqlValue::Text(raw.to_string())),
            _ => LiveDefault::Expression(raw.to_string()),
        }
    }
}
