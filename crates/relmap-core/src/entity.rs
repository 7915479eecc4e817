//! Entity trait for object/row mapping.
//!
//! The `Entity` trait describes how a Rust struct maps onto a table: its
//! table name, its persistent fields, and how to read and write field values
//! as dynamic [`Value`]s. It is typically derived with `#[derive(Entity)]`
//! from `relmap-macros`.

use std::collections::HashMap;

use crate::Result;
use crate::error::{Error, MappingErrorKind};
use crate::types::{SqlType, TypeInfo};
use crate::value::{FromValue, Value};

/// Metadata about one persistent field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    /// Rust field name
    pub name: &'static str,
    /// Column name (may differ from field name)
    pub column_name: &'static str,
    /// Declared SQL type
    pub sql_type: SqlType,
    /// Whether this field is nullable
    pub nullable: bool,
    /// Whether this field is (part of) the identifier
    pub primary_key: bool,
    /// Whether the column name is quoted when rendered
    pub quoted: bool,
}

impl FieldInfo {
    /// Create a field whose type, nullability and column follow the Rust type.
    pub fn of<T: TypeInfo>(name: &'static str) -> Self {
        Self::new(name, name, T::sql_type()).nullable(T::NULLABLE)
    }

    /// Create a new field info with minimal required data.
    pub fn new(name: &'static str, column_name: &'static str, sql_type: SqlType) -> Self {
        Self {
            name,
            column_name,
            sql_type,
            nullable: false,
            primary_key: false,
            quoted: false,
        }
    }

    /// Set the column name.
    #[must_use]
    pub fn column(mut self, name: &'static str) -> Self {
        self.column_name = name;
        self
    }

    /// Set the declared SQL type.
    #[must_use]
    pub fn sql_type(mut self, sql_type: SqlType) -> Self {
        self.sql_type = sql_type;
        self
    }

    /// Set nullable flag.
    #[must_use]
    pub fn nullable(mut self, value: bool) -> Self {
        self.nullable = value;
        self
    }

    /// Set primary key flag.
    #[must_use]
    pub fn primary_key(mut self, value: bool) -> Self {
        self.primary_key = value;
        self
    }

    /// Set quoted flag.
    #[must_use]
    pub fn quoted(mut self, value: bool) -> Self {
        self.quoted = value;
        self
    }
}

/// Property values read from a row, keyed by Rust field name.
///
/// Properties that were not read (for example a nullable column missing from
/// the result set) are reported as NULL.
#[derive(Debug, Clone, Default)]
pub struct PropertyValues {
    values: HashMap<&'static str, Value>,
}

impl PropertyValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &'static str, value: Value) {
        self.values.insert(name, value);
    }

    /// Raw value of a property, NULL when absent.
    pub fn get(&self, name: &str) -> &Value {
        self.values.get(name).unwrap_or(&Value::Null)
    }

    /// Typed value of a property.
    pub fn get_as<T: FromValue>(&self, name: &str) -> Result<T> {
        T::from_value(self.get(name)).map_err(|e| e.with_column(name))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Trait for types that map onto a table.
///
/// # Example
///
/// ```ignore
/// use relmap::Entity;
///
/// #[derive(Entity)]
/// #[relmap(table = "person")]
/// struct Person {
///     #[relmap(id)]
///     id: Option<i64>,
///     #[relmap(column = "first_name")]
///     name: String,
///     tags: Vec<String>,
/// }
/// ```
pub trait Entity: Sized + Send + Sync + 'static {
    /// The name of the table.
    const TABLE_NAME: &'static str;

    /// Whether the table name is quoted when rendered.
    const QUOTED: bool = false;

    /// Metadata for all persistent fields, in declaration order.
    fn fields() -> Vec<FieldInfo>;

    /// Current values of all persistent fields, keyed by Rust field name.
    fn to_properties(&self) -> Vec<(&'static str, Value)>;

    /// Construct an instance from property values.
    fn from_properties(values: &PropertyValues) -> Result<Self>;

    /// Current value of one persistent field.
    fn get_property(&self, name: &str) -> Option<Value>;

    /// Overwrite one persistent field.
    fn set_property(&mut self, name: &str, value: Value) -> Result<()>;
}

/// Error for a property name the entity does not declare.
pub fn unknown_property<T: Entity>(name: &str) -> Error {
    Error::mapping(
        MappingErrorKind::UnknownProperty,
        Some(std::any::type_name::<T>()),
        format!("no persistent property named '{}'", name),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_info_follows_rust_type() {
        let f = FieldInfo::of::<Option<Vec<String>>>("tags");
        assert_eq!(f.column_name, "tags");
        assert!(f.nullable);
        assert_eq!(f.sql_type, SqlType::array_of(SqlType::Text));

        let id = FieldInfo::of::<i64>("id").primary_key(true).column("person_id");
        assert!(id.primary_key);
        assert!(!id.nullable);
        assert_eq!(id.column_name, "person_id");
    }

    #[test]
    fn property_values_default_to_null() {
        let mut props = PropertyValues::new();
        props.insert("age", Value::Int(42));
        assert_eq!(props.get_as::<i32>("age").unwrap(), 42);
        assert_eq!(props.get_as::<Option<String>>("name").unwrap(), None);
        assert!(props.get_as::<String>("name").is_err());
    }
}
