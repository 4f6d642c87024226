//! Field descriptors and the fluent field builder.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::backend::Backend;

/// Backend-independent column type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// 16-bit integer.
    SmallInt,
    /// 32-bit integer.
    Integer,
    /// 64-bit integer.
    BigInt,
    /// Single precision float.
    Real,
    /// Double precision float.
    Float,
    /// Exact decimal.
    Numeric,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Date and time.
    Timestamp,
    /// Fixed-length string.
    Char,
    /// Variable-length string.
    Varchar,
    /// Unbounded text.
    Text,
    /// A native type with no universal counterpart, passed through as is.
    Native(String),
}

impl FieldType {
    /// Universal type name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::SmallInt => "smallint",
            Self::Integer => "integer",
            Self::BigInt => "bigint",
            Self::Real => "real",
            Self::Float => "float",
            Self::Numeric => "numeric",
            Self::Date => "date",
            Self::Time => "time",
            Self::Timestamp => "timestamp",
            Self::Char => "char",
            Self::Varchar => "varchar",
            Self::Text => "text",
            Self::Native(name) => name,
        }
    }

    /// Whether a declared length is always part of the type.
    #[must_use]
    pub const fn is_sized(&self) -> bool {
        matches!(self, Self::Char | Self::Varchar)
    }

    /// Whether DDL renders a length and scale for this type.
    ///
    /// Lengths declared on other types are dropped on the way to the
    /// database and never read back.
    #[must_use]
    pub const fn takes_length(&self) -> bool {
        matches!(
            self,
            Self::Char | Self::Varchar | Self::Numeric | Self::Native(_)
        )
    }

    /// Structural equality, ignoring case of native names.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Native(a), Self::Native(b)) => a.eq_ignore_ascii_case(b),
            (a, b) => a == b,
        }
    }
}

impl FromStr for FieldType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "smallint" => Self::SmallInt,
            "integer" => Self::Integer,
            "bigint" => Self::BigInt,
            "real" => Self::Real,
            "float" => Self::Float,
            "numeric" => Self::Numeric,
            "date" => Self::Date,
            "time" => Self::Time,
            "timestamp" => Self::Timestamp,
            "char" => Self::Char,
            "varchar" => Self::Varchar,
            "text" => Self::Text,
            _ => Self::Native(s.to_string()),
        })
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Default value for a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultValue {
    /// NULL default.
    Null,
    /// Integer default.
    Integer(i64),
    /// Float default.
    Float(f64),
    /// String default.
    String(String),
    /// Raw SQL expression (e.g. `CURRENT_TIMESTAMP`).
    Expression(String),
}

impl DefaultValue {
    /// Parses a catalog default as most backends report it: quoted strings,
    /// numbers, `NULL`, or an expression.
    #[must_use]
    pub fn parse_literal(text: &str) -> Self {
        let text = text.trim();
        if text.eq_ignore_ascii_case("null") {
            return Self::Null;
        }
        if text.len() >= 2 && text.starts_with('\'') && text.ends_with('\'') {
            return Self::String(text[1..text.len() - 1].replace("''", "'"));
        }
        if let Ok(n) = text.parse::<i64>() {
            return Self::Integer(n);
        }
        if let Ok(f) = text.parse::<f64>() {
            return Self::Float(f);
        }
        Self::Expression(text.to_string())
    }

    /// Renders the default for DDL.
    #[must_use]
    pub fn to_sql(&self, backend: Backend) -> String {
        match self {
            Self::Null => String::from("NULL"),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::String(s) => backend.escape_literal(s),
            Self::Expression(expr) => {
                let expr = canonical_expression(expr);
                if backend == Backend::Sqlite && !expr.starts_with("CURRENT_") {
                    format!("({expr})")
                } else {
                    expr
                }
            }
        }
    }

    /// Canonical text used to compare defaults across backends.
    fn canonical(&self) -> String {
        match self {
            Self::Null => String::from("NULL"),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::String(s) => s.clone(),
            Self::Expression(e) => canonical_expression(e),
        }
    }
}

/// Folds the spellings of the current timestamp into one and strips
/// redundant outer parentheses.
fn canonical_expression(expr: &str) -> String {
    let mut expr = expr.trim();
    while expr.len() >= 2 && expr.starts_with('(') && expr.ends_with(')') {
        expr = expr[1..expr.len() - 1].trim();
    }
    let upper = expr.to_ascii_uppercase();
    match upper.as_str() {
        "NOW()" | "CURRENT_TIMESTAMP()" | "CURRENT_TIMESTAMP" | "LOCALTIMESTAMP" => {
            String::from("CURRENT_TIMESTAMP")
        }
        "CURRENT_DATE()" | "CURRENT_DATE" => String::from("CURRENT_DATE"),
        "CURRENT_TIME()" | "CURRENT_TIME" => String::from("CURRENT_TIME"),
        _ => expr.to_string(),
    }
}

/// Drops explicit NULL defaults, which every backend treats as no default.
#[must_use]
pub fn normalize_default(default: Option<DefaultValue>) -> Option<DefaultValue> {
    match default {
        Some(DefaultValue::Null) | None => None,
        Some(other) => Some(other),
    }
}

/// Compares two defaults after normalization; numeric texts compare by value.
#[must_use]
pub fn defaults_match(a: Option<&DefaultValue>, b: Option<&DefaultValue>) -> bool {
    let a = a.filter(|d| **d != DefaultValue::Null);
    let b = b.filter(|d| **d != DefaultValue::Null);
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => {
            let (a, b) = (a.canonical(), b.canonical());
            match (a.parse::<f64>(), b.parse::<f64>()) {
                (Ok(x), Ok(y)) => (x - y).abs() < f64::EPSILON,
                _ => a == b,
            }
        }
        _ => false,
    }
}

/// A field (column) descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Field name.
    pub name: String,
    /// Universal type.
    #[serde(rename = "type")]
    pub kind: FieldType,
    /// Length (or numeric precision).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub len: Option<u32>,
    /// Numeric scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    /// Whether NULL is allowed.
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    /// Default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
}

const fn default_nullable() -> bool {
    true
}

impl Field {
    /// Creates a nullable field with no length and no default.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FieldType) -> Self {
        Self {
            name: name.into(),
            kind,
            len: None,
            scale: None,
            nullable: true,
            default: None,
        }
    }

    /// Structural equality as used by the diff engine.
    ///
    /// `self` is the declared side: its length is compared for sized types
    /// or when it was set explicitly, and its scale only when set. Neither
    /// counts for types that do not take a length.
    #[must_use]
    pub fn matches(&self, live: &Self) -> bool {
        if !self.kind.same_as(&live.kind) || self.nullable != live.nullable {
            return false;
        }
        if self.kind.takes_length() {
            if (self.kind.is_sized() || self.len.is_some()) && self.len != live.len {
                return false;
            }
            if self.scale.is_some() && self.scale != live.scale {
                return false;
            }
        }
        defaults_match(self.default.as_ref(), live.default.as_ref())
    }
}

/// Fluent field builder.
#[derive(Debug, Clone)]
pub struct FieldBuilder {
    field: Field,
}

impl FieldBuilder {
    /// Creates a builder for a nullable field.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FieldType) -> Self {
        Self {
            field: Field::new(name, kind),
        }
    }

    /// Sets the length.
    #[must_use]
    pub const fn len(mut self, len: u32) -> Self {
        self.field.len = Some(len);
        self
    }

    /// Sets the numeric scale.
    #[must_use]
    pub const fn scale(mut self, scale: u32) -> Self {
        self.field.scale = Some(scale);
        self
    }

    /// Marks the field as NOT NULL.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.field.nullable = false;
        self
    }

    /// Marks the field as nullable (default).
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.field.nullable = true;
        self
    }

    /// Sets an integer default value.
    #[must_use]
    pub fn default_int(mut self, value: i64) -> Self {
        self.field.default = Some(DefaultValue::Integer(value));
        self
    }

    /// Sets a float default value.
    #[must_use]
    pub fn default_float(mut self, value: f64) -> Self {
        self.field.default = Some(DefaultValue::Float(value));
        self
    }

    /// Sets a string default value.
    #[must_use]
    pub fn default_str(mut self, value: impl Into<String>) -> Self {
        self.field.default = Some(DefaultValue::String(value.into()));
        self
    }

    /// Sets a NULL default value.
    #[must_use]
    pub fn default_null(mut self) -> Self {
        self.field.default = Some(DefaultValue::Null);
        self
    }

    /// Sets a raw SQL expression as default (e.g. `CURRENT_TIMESTAMP`).
    #[must_use]
    pub fn default_expr(mut self, expr: impl Into<String>) -> Self {
        self.field.default = Some(DefaultValue::Expression(expr.into()));
        self
    }

    /// Builds the field descriptor.
    #[must_use]
    pub fn build(self) -> Field {
        self.field
    }
}

impl From<FieldBuilder> for Field {
    fn from(builder: FieldBuilder) -> Self {
        builder.build()
    }
}

// =============================================================================
// Shorthand Functions for Common Types
// =============================================================================

/// Creates a SMALLINT field builder.
#[must_use]
pub fn smallint(name: impl Into<String>) -> FieldBuilder {
    FieldBuilder::new(name, FieldType::SmallInt)
}

/// Creates an INTEGER field builder.
#[must_use]
pub fn integer(name: impl Into<String>) -> FieldBuilder {
    FieldBuilder::new(name, FieldType::Integer)
}

/// Creates a BIGINT field builder.
#[must_use]
pub fn bigint(name: impl Into<String>) -> FieldBuilder {
    FieldBuilder::new(name, FieldType::BigInt)
}

/// Creates a REAL field builder.
#[must_use]
pub fn real(name: impl Into<String>) -> FieldBuilder {
    FieldBuilder::new(name, FieldType::Real)
}

/// Creates a FLOAT (double precision) field builder.
#[must_use]
pub fn float(name: impl Into<String>) -> FieldBuilder {
    FieldBuilder::new(name, FieldType::Float)
}

/// Creates a NUMERIC field builder with precision and scale.
#[must_use]
pub fn numeric(name: impl Into<String>, precision: u32, scale: u32) -> FieldBuilder {
    FieldBuilder::new(name, FieldType::Numeric)
        .len(precision)
        .scale(scale)
}

/// Creates a DATE field builder.
#[must_use]
pub fn date(name: impl Into<String>) -> FieldBuilder {
    FieldBuilder::new(name, FieldType::Date)
}

/// Creates a TIME field builder.
#[must_use]
pub fn time(name: impl Into<String>) -> FieldBuilder {
    FieldBuilder::new(name, FieldType::Time)
}

/// Creates a TIMESTAMP field builder.
#[must_use]
pub fn timestamp(name: impl Into<String>) -> FieldBuilder {
    FieldBuilder::new(name, FieldType::Timestamp)
}

/// Creates a CHAR field builder.
#[must_use]
pub fn char(name: impl Into<String>, len: u32) -> FieldBuilder {
    FieldBuilder::new(name, FieldType::Char).len(len)
}

/// Creates a VARCHAR field builder.
#[must_use]
pub fn varchar(name: impl Into<String>, len: u32) -> FieldBuilder {
    FieldBuilder::new(name, FieldType::Varchar).len(len)
}

/// Creates a TEXT field builder.
#[must_use]
pub fn text(name: impl Into<String>) -> FieldBuilder {
    FieldBuilder::new(name, FieldType::Text)
}
