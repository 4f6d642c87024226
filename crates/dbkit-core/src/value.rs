//! SQL values and parameter handling.
//!
//! Values are either bound as positional parameters or rendered inline,
//! escaped for the target backend. [`RawSql`] is the one explicit way to
//! put verbatim SQL where a value is expected.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::backend::Backend;
use crate::error::ValueError;

/// A verbatim SQL fragment used where a value is expected (`NOW()`).
///
/// Never escaped and never bound: it is always inlined as written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawSql(String);

impl RawSql {
    /// Wraps a SQL fragment.
    #[must_use]
    pub fn new(sql: impl Into<String>) -> Self {
        Self(sql.into())
    }

    /// Returns the fragment text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Shorthand for a raw SQL value.
#[must_use]
pub fn raw(sql: impl Into<String>) -> Value {
    Value::Raw(RawSql::new(sql))
}

/// A SQL value that can be used as a parameter or inlined literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// NULL value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Binary blob value.
    Blob(Vec<u8>),
    /// Verbatim SQL fragment.
    Raw(RawSql),
}

impl Value {
    /// Returns `true` if this value is always inlined, never bound.
    ///
    /// NULL, booleans and raw fragments keep their SQL spelling in
    /// placeholder mode so the statement shape stays readable.
    #[must_use]
    pub const fn is_inlined(&self) -> bool {
        matches!(self, Self::Null | Self::Bool(_) | Self::Raw(_))
    }

    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the SQL representation for inline use, escaped for `backend`.
    #[must_use]
    pub fn to_sql_inline(&self, backend: Backend) -> String {
        match self {
            Self::Null => String::from("NULL"),
            Self::Bool(true) => String::from("TRUE"),
            Self::Bool(false) => String::from("FALSE"),
            Self::Int(n) => n.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => backend.escape_literal(s),
            Self::Blob(b) => backend.blob_literal(b),
            Self::Raw(r) => r.as_str().to_string(),
        }
    }

    /// Name of the variant, used in conversion errors.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Bool(_) => "bool",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Blob(_) => "blob",
            Self::Raw(_) => "raw SQL",
        }
    }

    /// Returns the text content if this is a text value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
            Self::Blob(b) => {
                for byte in b {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            Self::Raw(r) => f.write_str(r.as_str()),
        }
    }
}

/// Trait for types that can be converted to SQL values.
pub trait ToValue {
    /// Converts the value to a [`Value`].
    fn to_value(self) -> Value;
}

impl ToValue for Value {
    fn to_value(self) -> Value {
        self
    }
}

impl ToValue for RawSql {
    fn to_value(self) -> Value {
        Value::Raw(self)
    }
}

impl ToValue for bool {
    fn to_value(self) -> Value {
        Value::Bool(self)
    }
}

impl ToValue for i64 {
    fn to_value(self) -> Value {
        Value::Int(self)
    }
}

impl ToValue for i32 {
    fn to_value(self) -> Value {
        Value::Int(i64::from(self))
    }
}

impl ToValue for i16 {
    fn to_value(self) -> Value {
        Value::Int(i64::from(self))
    }
}

impl ToValue for i8 {
    fn to_value(self) -> Value {
        Value::Int(i64::from(self))
    }
}

impl ToValue for u32 {
    fn to_value(self) -> Value {
        Value::Int(i64::from(self))
    }
}

impl ToValue for u16 {
    fn to_value(self) -> Value {
        Value::Int(i64::from(self))
    }
}

impl ToValue for u8 {
    fn to_value(self) -> Value {
        Value::Int(i64::from(self))
    }
}

impl ToValue for f64 {
    fn to_value(self) -> Value {
        Value::Float(self)
    }
}

impl ToValue for f32 {
    fn to_value(self) -> Value {
        Value::Float(f64::from(self))
    }
}

impl ToValue for String {
    fn to_value(self) -> Value {
        Value::Text(self)
    }
}

impl ToValue for &String {
    fn to_value(self) -> Value {
        Value::Text(self.clone())
    }
}

impl ToValue for &str {
    fn to_value(self) -> Value {
        Value::Text(String::from(self))
    }
}

impl ToValue for Vec<u8> {
    fn to_value(self) -> Value {
        Value::Blob(self)
    }
}

impl ToValue for &[u8] {
    fn to_value(self) -> Value {
        Value::Blob(self.to_vec())
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }
}

/// A list of positional parameters.
///
/// Implemented for `()`, any single [`ToValue`], tuples and `Vec<Value>`,
/// so `cond("id = ?", 5)` and `cond("a = ? AND b = ?", (1, "x"))` both read
/// naturally.
pub trait IntoParams {
    /// Converts into an ordered parameter list.
    fn into_params(self) -> Vec<Value>;
}

impl IntoParams for () {
    fn into_params(self) -> Vec<Value> {
        Vec::new()
    }
}

impl<T: ToValue> IntoParams for T {
    fn into_params(self) -> Vec<Value> {
        vec![self.to_value()]
    }
}

impl IntoParams for Vec<Value> {
    fn into_params(self) -> Vec<Value> {
        self
    }
}

macro_rules! tuple_params {
    ($($name:ident),+) => {
        impl<$($name: ToValue),+> IntoParams for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_params(self) -> Vec<Value> {
                let ($($name,)+) = self;
                vec![$($name.to_value()),+]
            }
        }
    };
}

tuple_params!(A);
tuple_params!(A, B);
tuple_params!(A, B, C);
tuple_params!(A, B, C, D);
tuple_params!(A, B, C, D, E);
tuple_params!(A, B, C, D, E, F);

/// Trait for Rust types that can be read back from a [`Value`].
///
/// Conversions are lenient where the backends disagree on wire types:
/// integers parse from text and text decodes from UTF-8 blobs.
pub trait FromValue: Sized {
    /// Converts a value, failing on incompatible variants.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError`] when the variant cannot represent `Self`.
    fn from_value(value: &Value) -> Result<Self, ValueError>;
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        Ok(value.clone())
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::Int(n) => Ok(*n),
            Value::Bool(b) => Ok(Self::from(*b)),
            Value::Text(s) => s.trim().parse().map_err(|_| ValueError::Conversion {
                expected: "i64",
                found: "text",
            }),
            Value::Null => Err(ValueError::Null("i64")),
            other => Err(ValueError::Conversion {
                expected: "i64",
                found: other.kind(),
            }),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        let wide = i64::from_value(value).map_err(|e| match e {
            ValueError::Null(_) => ValueError::Null("i32"),
            ValueError::Conversion { found, .. } => ValueError::Conversion {
                expected: "i32",
                found,
            },
        })?;
        Self::try_from(wide).map_err(|_| ValueError::Conversion {
            expected: "i32",
            found: "integer",
        })
    }
}

impl FromValue for u32 {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        let wide = i64::from_value(value)?;
        Self::try_from(wide).map_err(|_| ValueError::Conversion {
            expected: "u32",
            found: "integer",
        })
    }
}

impl FromValue for f64 {
    #[allow(clippy::cast_precision_loss)]
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Int(n) => Ok(*n as Self),
            Value::Text(s) => s.trim().parse().map_err(|_| ValueError::Conversion {
                expected: "f64",
                found: "text",
            }),
            Value::Null => Err(ValueError::Null("f64")),
            other => Err(ValueError::Conversion {
                expected: "f64",
                found: other.kind(),
            }),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Int(n) => Ok(*n != 0),
            Value::Text(s) => match s.as_str() {
                "t" | "true" | "TRUE" | "1" | "YES" | "yes" => Ok(true),
                "f" | "false" | "FALSE" | "0" | "NO" | "no" => Ok(false),
                _ => Err(ValueError::Conversion {
                    expected: "bool",
                    found: "text",
                }),
            },
            Value::Null => Err(ValueError::Null("bool")),
            other => Err(ValueError::Conversion {
                expected: "bool",
                found: other.kind(),
            }),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::Text(s) => Ok(s.clone()),
            Value::Blob(b) => Self::from_utf8(b.clone()).map_err(|_| ValueError::Conversion {
                expected: "String",
                found: "blob",
            }),
            Value::Int(n) => Ok(n.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Raw(r) => Ok(r.as_str().to_string()),
            Value::Null => Err(ValueError::Null("String")),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::Blob(b) => Ok(b.clone()),
            Value::Text(s) => Ok(s.as_bytes().to_vec()),
            Value::Null => Err(ValueError::Null("Vec<u8>")),
            other => Err(ValueError::Conversion {
                expected: "Vec<u8>",
                found: other.kind(),
            }),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_text_is_escaped_per_backend() {
        let value = Value::Text(String::from("it's a \\ test"));
        assert_eq!(
            value.to_sql_inline(Backend::Postgres),
            "'it''s a \\ test'"
        );
        assert_eq!(
            value.to_sql_inline(Backend::MySql),
            "'it\\'s a \\\\ test'"
        );
    }

    #[test]
    fn test_inline_scalars() {
        assert_eq!(Value::Null.to_sql_inline(Backend::Sqlite), "NULL");
        assert_eq!(Value::Bool(true).to_sql_inline(Backend::Sqlite), "TRUE");
        assert_eq!(Value::Int(-4).to_sql_inline(Backend::Sqlite), "-4");
        assert_eq!(raw("NOW()").to_sql_inline(Backend::MySql), "NOW()");
        assert_eq!(
            Value::Blob(vec![0xde, 0xad]).to_sql_inline(Backend::Sqlite),
            "X'DEAD'"
        );
    }

    #[test]
    fn test_params_from_tuples() {
        assert!(().into_params().is_empty());
        assert_eq!(5.into_params(), vec![Value::Int(5)]);
        assert_eq!(
            (1, "x", None::<i32>).into_params(),
            vec![Value::Int(1), Value::Text(String::from("x")), Value::Null]
        );
    }

    #[test]
    fn test_from_value_is_lenient_across_wire_types() {
        assert_eq!(i64::from_value(&Value::Text(String::from(" 42"))), Ok(42));
        assert_eq!(
            String::from_value(&Value::Blob(b"abc".to_vec())),
            Ok(String::from("abc"))
        );
        assert_eq!(Option::<i64>::from_value(&Value::Null), Ok(None));
        assert_eq!(i64::from_value(&Value::Null), Err(ValueError::Null("i64")));
        assert!(bool::from_value(&Value::Text(String::from("t"))).unwrap());
    }

    #[test]
    fn test_i32_range_is_checked() {
        assert!(i32::from_value(&Value::Int(i64::MAX)).is_err());
        assert_eq!(i32::from_value(&Value::Int(7)), Ok(7));
    }
}
