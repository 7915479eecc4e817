//! Dynamic SQL values.

use serde::{Deserialize, Serialize};

use crate::error::{ConversionError, Error};
use crate::types::SqlType;

/// A dynamically-typed SQL value.
///
/// This enum represents every value that flows between entities, outbound
/// rows, bind targets and driver rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// NULL value
    Null,

    /// Boolean value
    Bool(bool),

    /// 8-bit signed integer
    TinyInt(i8),

    /// 16-bit signed integer
    SmallInt(i16),

    /// 32-bit signed integer
    Int(i32),

    /// 64-bit signed integer
    BigInt(i64),

    /// 32-bit floating point
    Float(f32),

    /// 64-bit floating point
    Double(f64),

    /// Arbitrary precision decimal (stored as string)
    Decimal(String),

    /// Text string
    Text(String),

    /// Binary data
    Bytes(Vec<u8>),

    /// Date (days since epoch)
    Date(i32),

    /// Time (microseconds since midnight)
    Time(i64),

    /// Timestamp (microseconds since epoch)
    Timestamp(i64),

    /// Timestamp with timezone (microseconds since epoch, UTC)
    TimestampTz(i64),

    /// UUID (as 16 bytes)
    Uuid([u8; 16]),

    /// JSON value
    Json(serde_json::Value),

    /// Array of values, possibly nested
    Array(Vec<Value>),

    /// Enum variant that has not been converted to a store value yet
    Enum {
        /// Rust type name of the enum
        type_name: String,
        /// Variant name
        name: String,
    },
}

impl Value {
    /// Check if this value is NULL.
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is an array.
    pub const fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Get the type name of this value.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOLEAN",
            Value::TinyInt(_) => "TINYINT",
            Value::SmallInt(_) => "SMALLINT",
            Value::Int(_) => "INTEGER",
            Value::BigInt(_) => "BIGINT",
            Value::Float(_) => "REAL",
            Value::Double(_) => "DOUBLE",
            Value::Decimal(_) => "DECIMAL",
            Value::Text(_) => "TEXT",
            Value::Bytes(_) => "BLOB",
            Value::Date(_) => "DATE",
            Value::Time(_) => "TIME",
            Value::Timestamp(_) => "TIMESTAMP",
            Value::TimestampTz(_) => "TIMESTAMPTZ",
            Value::Uuid(_) => "UUID",
            Value::Json(_) => "JSON",
            Value::Array(_) => "ARRAY",
            Value::Enum { .. } => "ENUM",
        }
    }

    /// The SQL type this value naturally binds as.
    ///
    /// Returns `None` for NULL, enums, and arrays whose element type cannot
    /// be inferred (empty or mixed).
    pub fn sql_type(&self) -> Option<SqlType> {
        let ty = match self {
            Value::Null | Value::Enum { .. } => return None,
            Value::Bool(_) => SqlType::Boolean,
            Value::TinyInt(_) => SqlType::TinyInt,
            Value::SmallInt(_) => SqlType::SmallInt,
            Value::Int(_) => SqlType::Integer,
            Value::BigInt(_) => SqlType::BigInt,
            Value::Float(_) => SqlType::Real,
            Value::Double(_) => SqlType::Double,
            Value::Decimal(_) => SqlType::Decimal,
            Value::Text(_) => SqlType::Text,
            Value::Bytes(_) => SqlType::Blob,
            Value::Date(_) => SqlType::Date,
            Value::Time(_) => SqlType::Time,
            Value::Timestamp(_) => SqlType::Timestamp,
            Value::TimestampTz(_) => SqlType::TimestampTz,
            Value::Uuid(_) => SqlType::Uuid,
            Value::Json(_) => SqlType::Json,
            Value::Array(_) => {
                let element = self.element_type()?;
                let mut ty = element;
                for _ in 0..self.array_depth() {
                    ty = SqlType::Array(Box::new(ty));
                }
                ty
            }
        };
        Some(ty)
    }

    /// Number of array dimensions of this value (0 for scalars).
    ///
    /// Depth follows the first element of each level, so `[[], [1]]` counts
    /// as one dimension deep on the empty first element.
    pub fn array_depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self;
        while let Value::Array(items) = current {
            depth += 1;
            match items.first() {
                Some(first) => current = first,
                None => break,
            }
        }
        depth
    }

    /// Common element type of a (possibly nested) array.
    ///
    /// NULL elements are ignored. Returns `None` when there is no non-null
    /// leaf or when leaves disagree on their type.
    pub fn element_type(&self) -> Option<SqlType> {
        fn visit(value: &Value, found: &mut Option<SqlType>, mixed: &mut bool) {
            match value {
                Value::Array(items) => {
                    for item in items {
                        visit(item, found, mixed);
                    }
                }
                Value::Null => {}
                leaf => {
                    let Some(ty) = leaf.sql_type() else {
                        *mixed = true;
                        return;
                    };
                    if let Some(existing) = found.as_ref() {
                        if *existing != ty {
                            *mixed = true;
                        }
                    } else {
                        *found = Some(ty);
                    }
                }
            }
        }

        let Value::Array(_) = self else {
            return self.sql_type();
        };
        let mut found = None;
        let mut mixed = false;
        visit(self, &mut found, &mut mixed);
        if mixed { None } else { found }
    }

    /// Whether this value is an array with no leaf values at any depth.
    pub fn is_empty_array(&self) -> bool {
        match self {
            Value::Array(items) => items.iter().all(Value::is_empty_array),
            _ => false,
        }
    }

    /// Try to convert this value to a bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            Value::TinyInt(v) => Some(*v != 0),
            Value::SmallInt(v) => Some(*v != 0),
            Value::Int(v) => Some(*v != 0),
            Value::BigInt(v) => Some(*v != 0),
            _ => None,
        }
    }

    /// Try to convert this value to an i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::TinyInt(v) => Some(i64::from(*v)),
            Value::SmallInt(v) => Some(i64::from(*v)),
            Value::Int(v) => Some(i64::from(*v)),
            Value::BigInt(v) => Some(*v),
            Value::Bool(v) => Some(if *v { 1 } else { 0 }),
            _ => None,
        }
    }

    /// Try to convert this value to an f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            Value::TinyInt(v) => Some(f64::from(*v)),
            Value::SmallInt(v) => Some(f64::from(*v)),
            Value::Int(v) => Some(f64::from(*v)),
            Value::BigInt(v) => Some(*v as f64),
            Value::Decimal(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Try to get this value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Decimal(s) => Some(s),
            Value::Enum { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Try to get this value as a byte slice.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            Value::Text(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Build an enum value for the variant `name` of enum type `E`.
    pub fn enumeration<E: ?Sized>(name: impl Into<String>) -> Self {
        Value::Enum {
            type_name: short_type_name(std::any::type_name::<E>()).to_string(),
            name: name.into(),
        }
    }
}

/// Strip the module path from a fully qualified type name.
pub(crate) fn short_type_name(full: &str) -> &str {
    let head = full.split('<').next().unwrap_or(full);
    head.rsplit("::").next().unwrap_or(head)
}

// Conversion implementations
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Value::TinyInt(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::SmallInt(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl From<[u8; 16]> for Value {
    fn from(v: [u8; 16]) -> Self {
        Value::Uuid(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::Array(v.into_iter().map(Value::Text).collect())
    }
}

impl From<Vec<i16>> for Value {
    fn from(v: Vec<i16>) -> Self {
        Value::Array(v.into_iter().map(Value::SmallInt).collect())
    }
}

impl From<Vec<i32>> for Value {
    fn from(v: Vec<i32>) -> Self {
        Value::Array(v.into_iter().map(Value::Int).collect())
    }
}

impl From<Vec<i64>> for Value {
    fn from(v: Vec<i64>) -> Self {
        Value::Array(v.into_iter().map(Value::BigInt).collect())
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::Array(v.into_iter().map(Value::Double).collect())
    }
}

impl From<Vec<bool>> for Value {
    fn from(v: Vec<bool>) -> Self {
        Value::Array(v.into_iter().map(Value::Bool).collect())
    }
}

impl From<Vec<Vec<i32>>> for Value {
    fn from(v: Vec<Vec<i32>>) -> Self {
        Value::Array(v.into_iter().map(Value::from).collect())
    }
}

impl From<Vec<Vec<String>>> for Value {
    fn from(v: Vec<Vec<String>>) -> Self {
        Value::Array(v.into_iter().map(Value::from).collect())
    }
}

/// Trait for converting from a `Value` to a typed value.
pub trait FromValue: Sized {
    /// Convert from a Value, returning an error if the conversion fails.
    fn from_value(value: &Value) -> crate::Result<Self>;
}

fn mismatch(expected: &str, value: &Value) -> Error {
    Error::Conversion(ConversionError {
        expected: expected.to_string(),
        actual: value.type_name().to_string(),
        column: None,
    })
}

impl FromValue for Value {
    fn from_value(value: &Value) -> crate::Result<Self> {
        Ok(value.clone())
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> crate::Result<Self> {
        value.as_bool().ok_or_else(|| mismatch("bool", value))
    }
}

impl FromValue for i8 {
    fn from_value(value: &Value) -> crate::Result<Self> {
        match value {
            Value::TinyInt(v) => Ok(*v),
            Value::Bool(v) => Ok(i8::from(*v)),
            _ => Err(mismatch("i8", value)),
        }
    }
}

impl FromValue for i16 {
    fn from_value(value: &Value) -> crate::Result<Self> {
        match value {
            Value::TinyInt(v) => Ok(i16::from(*v)),
            Value::SmallInt(v) => Ok(*v),
            Value::Bool(v) => Ok(i16::from(*v)),
            _ => Err(mismatch("i16", value)),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> crate::Result<Self> {
        match value {
            Value::TinyInt(v) => Ok(i32::from(*v)),
            Value::SmallInt(v) => Ok(i32::from(*v)),
            Value::Int(v) => Ok(*v),
            Value::BigInt(v) => i32::try_from(*v).map_err(|_| mismatch("i32", value)),
            Value::Bool(v) => Ok(i32::from(*v)),
            _ => Err(mismatch("i32", value)),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> crate::Result<Self> {
        value.as_i64().ok_or_else(|| mismatch("i64", value))
    }
}

impl FromValue for f32 {
    #[allow(clippy::cast_possible_truncation)]
    fn from_value(value: &Value) -> crate::Result<Self> {
        match value {
            Value::Float(v) => Ok(*v),
            Value::Double(v) => Ok(*v as f32),
            _ => Err(mismatch("f32", value)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> crate::Result<Self> {
        value.as_f64().ok_or_else(|| mismatch("f64", value))
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> crate::Result<Self> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| mismatch("String", value))
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> crate::Result<Self> {
        value
            .as_bytes()
            .map(<[u8]>::to_vec)
            .ok_or_else(|| mismatch("Vec<u8>", value))
    }
}

impl FromValue for [u8; 16] {
    fn from_value(value: &Value) -> crate::Result<Self> {
        match value {
            Value::Uuid(v) => Ok(*v),
            Value::Bytes(b) if b.len() == 16 => {
                let mut out = [0u8; 16];
                out.copy_from_slice(b);
                Ok(out)
            }
            _ => Err(mismatch("UUID", value)),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: &Value) -> crate::Result<Self> {
        match value {
            Value::Json(v) => Ok(v.clone()),
            Value::Text(s) => serde_json::from_str(s).map_err(|e| {
                Error::Conversion(ConversionError {
                    expected: "JSON".to_string(),
                    actual: format!("unparseable text: {}", e),
                    column: None,
                })
            }),
            _ => Err(mismatch("JSON", value)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> crate::Result<Self> {
        match value {
            Value::Null => Ok(None),
            v => T::from_value(v).map(Some),
        }
    }
}

fn array_items<'a>(value: &'a Value, expected: &str) -> crate::Result<&'a [Value]> {
    match value {
        Value::Array(items) => Ok(items),
        _ => Err(mismatch(expected, value)),
    }
}

impl FromValue for Vec<String> {
    fn from_value(value: &Value) -> crate::Result<Self> {
        array_items(value, "TEXT[]")?
            .iter()
            .map(String::from_value)
            .collect()
    }
}

impl FromValue for Vec<i16> {
    fn from_value(value: &Value) -> crate::Result<Self> {
        array_items(value, "SMALLINT[]")?
            .iter()
            .map(i16::from_value)
            .collect()
    }
}

impl FromValue for Vec<i32> {
    fn from_value(value: &Value) -> crate::Result<Self> {
        array_items(value, "INTEGER[]")?
            .iter()
            .map(i32::from_value)
            .collect()
    }
}

impl FromValue for Vec<i64> {
    fn from_value(value: &Value) -> crate::Result<Self> {
        array_items(value, "BIGINT[]")?
            .iter()
            .map(i64::from_value)
            .collect()
    }
}

impl FromValue for Vec<f64> {
    fn from_value(value: &Value) -> crate::Result<Self> {
        array_items(value, "DOUBLE[]")?
            .iter()
            .map(f64::from_value)
            .collect()
    }
}

impl FromValue for Vec<bool> {
    fn from_value(value: &Value) -> crate::Result<Self> {
        array_items(value, "BOOLEAN[]")?
            .iter()
            .map(bool::from_value)
            .collect()
    }
}

impl FromValue for Vec<Vec<i32>> {
    fn from_value(value: &Value) -> crate::Result<Self> {
        array_items(value, "INTEGER[][]")?
            .iter()
            .map(Vec::<i32>::from_value)
            .collect()
    }
}

impl FromValue for Vec<Vec<String>> {
    fn from_value(value: &Value) -> crate::Result<Self> {
        array_items(value, "TEXT[][]")?
            .iter()
            .map(Vec::<String>::from_value)
            .collect()
    }
}
