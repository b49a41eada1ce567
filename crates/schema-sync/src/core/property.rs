//! Property descriptors: the dialect-independent description of one column.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::value::SqlValue;

/// Semantic type tag of a property.
///
/// Any name that is not one of the built-in tags is kept as `Custom` and
/// resolved against the custom types registered on the synchronizer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyType {
    Text,
    Integer,
    Number,
    Serial,
    Boolean,
    Date,
    Binary,
    Object,
    Enum,
    Point,
    Uuid,
    Custom(String),
}

impl PropertyType {
    /// Parse a type tag. Unknown names become `Custom`.
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "text" => PropertyType::Text,
            "integer" => PropertyType::Integer,
            "number" => PropertyType::Number,
            "serial" => PropertyType::Serial,
            "boolean" => PropertyType::Boolean,
            "date" => PropertyType::Date,
            "binary" => PropertyType::Binary,
            "object" => PropertyType::Object,
            "enum" => PropertyType::Enum,
            "point" => PropertyType::Point,
            "uuid" => PropertyType::Uuid,
            _ => PropertyType::Custom(name.to_string()),
        }
    }

    /// The tag as written in a definition.
    pub fn as_str(&self) -> &str {
        match self {
            PropertyType::Text => "text",
            PropertyType::Integer => "integer",
            PropertyType::Number => "number",
            PropertyType::Serial => "serial",
            PropertyType::Boolean => "boolean",
            PropertyType::Date => "date",
            PropertyType::Binary => "binary",
            PropertyType::Object => "object",
            PropertyType::Enum => "enum",
            PropertyType::Point => "point",
            PropertyType::Uuid => "uuid",
            PropertyType::Custom(name) => name,
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PropertyType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PropertyType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(PropertyType::parse(&name))
    }
}

/// Unique/index membership of a property.
///
/// `true` puts the property in its own single-column index. A name (or a
/// list of names) puts it in named groups; properties sharing a group name
/// end up in one composite index.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndexGroup {
    Flag(bool),
    Named(String),
    Groups(Vec<String>),
    #[default]
    #[serde(skip)]
    None,
}

impl IndexGroup {
    /// Check if the property takes part in any index.
    pub fn is_set(&self) -> bool {
        match self {
            IndexGroup::Flag(flag) => *flag,
            IndexGroup::Named(_) => true,
            IndexGroup::Groups(names) => !names.is_empty(),
            IndexGroup::None => false,
        }
    }

    /// Group names, or an empty list for a plain flag.
    pub fn names(&self) -> Vec<&str> {
        match self {
            IndexGroup::Named(name) => vec![name.as_str()],
            IndexGroup::Groups(names) => names.iter().map(String::as_str).collect(),
            IndexGroup::Flag(_) | IndexGroup::None => Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Dialect-independent description of one column.
///
/// Treated as read-only input by the engine. The same type is used for
/// columns reverse-mapped from a live database, so the diff comparator can
/// compare like with like.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    /// Semantic type tag.
    #[serde(rename = "type")]
    pub r#type: PropertyType,

    /// Storage column name. Filled with the property name when the
    /// collection is defined.
    #[serde(default, alias = "mapsTo", skip_serializing_if = "Option::is_none")]
    pub maps_to: Option<String>,

    /// Column rejects NULL.
    #[serde(default)]
    pub required: bool,

    /// Column is part of the primary key.
    #[serde(default)]
    pub key: bool,

    /// Unique index membership.
    #[serde(default, skip_serializing_if = "is_unset")]
    pub unique: IndexGroup,

    /// Non-unique index membership.
    #[serde(default, skip_serializing_if = "is_unset")]
    pub index: IndexGroup,

    /// Numeric width in bytes (2, 4, 8) or text length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,

    /// Large text/binary storage.
    #[serde(default)]
    pub big: bool,

    /// Unsigned integer storage (MySQL).
    #[serde(default)]
    pub unsigned: bool,

    /// Date columns carry a time component.
    #[serde(default = "default_true")]
    pub time: bool,

    /// Enum members.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,

    /// Escaped default value.
    #[serde(default, alias = "defaultValue", skip_serializing_if = "Option::is_none")]
    pub default_value: Option<SqlValue>,

    /// Unescaped SQL default expression.
    #[serde(
        default,
        alias = "defaultExpression",
        skip_serializing_if = "Option::is_none"
    )]
    pub default_expression: Option<String>,

    /// Column is auto-incrementing. Set by introspection; definitions use the
    /// `serial` type instead.
    #[serde(skip)]
    pub serial: bool,
}

fn is_unset(group: &IndexGroup) -> bool {
    !group.is_set()
}

impl PropertyDescriptor {
    /// Create a descriptor of the given type with every qualifier unset.
    pub fn new(r#type: PropertyType) -> Self {
        Self {
            r#type,
            maps_to: None,
            required: false,
            key: false,
            unique: IndexGroup::None,
            index: IndexGroup::None,
            size: None,
            big: false,
            unsigned: false,
            time: true,
            values: Vec::new(),
            default_value: None,
            default_expression: None,
            serial: false,
        }
    }

    pub fn text() -> Self {
        Self::new(PropertyType::Text)
    }

    pub fn integer() -> Self {
        Self::new(PropertyType::Integer)
    }

    pub fn serial() -> Self {
        Self::new(PropertyType::Serial)
    }

    pub fn boolean() -> Self {
        Self::new(PropertyType::Boolean)
    }

    pub fn date() -> Self {
        Self::new(PropertyType::Date)
    }

    /// Enum property with the given members.
    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut prop = Self::new(PropertyType::Enum);
        prop.values = values.into_iter().map(Into::into).collect();
        prop
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn key(mut self) -> Self {
        self.key = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = IndexGroup::Flag(true);
        self
    }

    pub fn unique_in(mut self, group: impl Into<String>) -> Self {
        self.unique = IndexGroup::Named(group.into());
        self
    }

    pub fn indexed(mut self) -> Self {
        self.index = IndexGroup::Flag(true);
        self
    }

    pub fn index_in(mut self, group: impl Into<String>) -> Self {
        self.index = IndexGroup::Named(group.into());
        self
    }

    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn big(mut self) -> Self {
        self.big = true;
        self
    }

    pub fn maps_to(mut self, column: impl Into<String>) -> Self {
        self.maps_to = Some(column.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<SqlValue>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn default_expression(mut self, expr: impl Into<String>) -> Self {
        self.default_expression = Some(expr.into());
        self
    }

    /// Storage column name, falling back to `fallback` when unmapped.
    pub fn column_name<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.maps_to.as_deref().unwrap_or(fallback)
    }

    /// Check if the property is an auto-incrementing identity.
    pub fn is_serial(&self) -> bool {
        self.serial || self.r#type == PropertyType::Serial
    }
}
