//! SQL type definitions and mapping.

use serde::{Deserialize, Serialize};

/// SQL data types understood by the mapping layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    // Integer types
    TinyInt,
    SmallInt,
    Integer,
    BigInt,

    // Floating point
    Real,
    Double,

    // Fixed precision
    Decimal,

    // Boolean
    Boolean,

    // String types
    VarChar(u32),
    Text,

    // Binary
    Blob,

    // Date/time types
    Date,
    Time,
    Timestamp,
    TimestampTz,

    // UUID
    Uuid,

    // JSON
    Json,

    /// Array of the inner type; nesting encodes dimension depth
    Array(Box<SqlType>),

    /// Store-specific or user-defined type name
    Custom(String),
}

impl SqlType {
    /// Shorthand for a one-dimensional array of `element`.
    pub fn array_of(element: SqlType) -> Self {
        SqlType::Array(Box::new(element))
    }

    /// Get the SQL type name for this type.
    pub fn sql_name(&self) -> String {
        match self {
            SqlType::TinyInt => "TINYINT".to_string(),
            SqlType::SmallInt => "SMALLINT".to_string(),
            SqlType::Integer => "INTEGER".to_string(),
            SqlType::BigInt => "BIGINT".to_string(),
            SqlType::Real => "REAL".to_string(),
            SqlType::Double => "DOUBLE PRECISION".to_string(),
            SqlType::Decimal => "DECIMAL".to_string(),
            SqlType::Boolean => "BOOLEAN".to_string(),
            SqlType::VarChar(len) => format!("VARCHAR({})", len),
            SqlType::Text => "TEXT".to_string(),
            SqlType::Blob => "BLOB".to_string(),
            SqlType::Date => "DATE".to_string(),
            SqlType::Time => "TIME".to_string(),
            SqlType::Timestamp => "TIMESTAMP".to_string(),
            SqlType::TimestampTz => "TIMESTAMPTZ".to_string(),
            SqlType::Uuid => "UUID".to_string(),
            SqlType::Json => "JSON".to_string(),
            SqlType::Array(inner) => format!("{}[]", inner.sql_name()),
            SqlType::Custom(name) => name.clone(),
        }
    }

    /// Check if this is an array type.
    pub const fn is_array(&self) -> bool {
        matches!(self, SqlType::Array(_))
    }

    /// Check if this is a binary type. Binary values are never treated as
    /// collections.
    pub const fn is_binary(&self) -> bool {
        matches!(self, SqlType::Blob)
    }

    /// Innermost element type (the type itself for scalars).
    pub fn element_type(&self) -> &SqlType {
        let mut current = self;
        while let SqlType::Array(inner) = current {
            current = inner;
        }
        current
    }

    /// Number of array dimensions (0 for scalars).
    pub fn dimensions(&self) -> usize {
        let mut depth = 0;
        let mut current = self;
        while let SqlType::Array(inner) = current {
            depth += 1;
            current = inner;
        }
        depth
    }

    /// Check if this type is numeric.
    pub const fn is_numeric(&self) -> bool {
        matches!(
            self,
            SqlType::TinyInt
                | SqlType::SmallInt
                | SqlType::Integer
                | SqlType::BigInt
                | SqlType::Real
                | SqlType::Double
                | SqlType::Decimal
        )
    }

    /// Check if this type is text-based.
    pub const fn is_text(&self) -> bool {
        matches!(self, SqlType::VarChar(_) | SqlType::Text)
    }
}

/// Trait for Rust types that map onto a SQL type.
///
/// Implemented for the scalar types the value model supports, for the
/// array shapes it supports, and for `Option<T>` (which is nullable).
pub trait TypeInfo {
    /// The declared SQL type for this Rust type.
    fn sql_type() -> SqlType;

    /// Whether this type is nullable by default.
    const NULLABLE: bool = false;
}

macro_rules! type_info {
    ($($ty:ty => $sql:expr),* $(,)?) => {
        $(
            impl TypeInfo for $ty {
                fn sql_type() -> SqlType {
                    $sql
                }
            }
        )*
    };
}

type_info! {
    i8 => SqlType::TinyInt,
    i16 => SqlType::SmallInt,
    i32 => SqlType::Integer,
    i64 => SqlType::BigInt,
    f32 => SqlType::Real,
    f64 => SqlType::Double,
    bool => SqlType::Boolean,
    String => SqlType::Text,
    Vec<u8> => SqlType::Blob,
    [u8; 16] => SqlType::Uuid,
    serde_json::Value => SqlType::Json,
    Vec<String> => SqlType::array_of(SqlType::Text),
    Vec<i16> => SqlType::array_of(SqlType::SmallInt),
    Vec<i32> => SqlType::array_of(SqlType::Integer),
    Vec<i64> => SqlType::array_of(SqlType::BigInt),
    Vec<f64> => SqlType::array_of(SqlType::Double),
    Vec<bool> => SqlType::array_of(SqlType::Boolean),
    Vec<Vec<i32>> => SqlType::array_of(SqlType::array_of(SqlType::Integer)),
    Vec<Vec<String>> => SqlType::array_of(SqlType::array_of(SqlType::Text)),
}

impl<T: TypeInfo> TypeInfo for Option<T> {
    fn sql_type() -> SqlType {
        T::sql_type()
    }

    const NULLABLE: bool = true;
}
