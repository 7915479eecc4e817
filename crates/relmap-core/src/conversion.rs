//! Value conversions between entity properties and store values.
//!
//! [`CustomConversions`] holds the user's converters followed by the
//! dialect's store converters; the first converter that accepts a value
//! wins. Enum values without a converter are written as their variant name.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::Result;
use crate::error::Error;
use crate::types::SqlType;
use crate::value::Value;

/// A bidirectional value converter.
///
/// Both directions are opt-in: a converter that only writes leaves the read
/// methods at their defaults.
pub trait Converter: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Whether this converter handles an outbound value.
    fn can_write(&self, value: &Value) -> bool {
        let _ = value;
        false
    }

    /// Convert an outbound value.
    fn write(&self, value: Value) -> Result<Value> {
        Ok(value)
    }

    /// Whether this converter handles an inbound value for the target type.
    fn can_read(&self, value: &Value, target: &SqlType) -> bool {
        let _ = (value, target);
        false
    }

    /// Convert an inbound value.
    fn read(&self, value: Value, target: &SqlType) -> Result<Value> {
        let _ = target;
        Ok(value)
    }
}

impl fmt::Debug for dyn Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter").field("name", &self.name()).finish()
    }
}

type EnumWriteFn = dyn Fn(&str) -> Result<Value> + Send + Sync;

/// Writes the variants of one enum type through a function.
pub struct EnumConverter {
    type_name: String,
    write: Box<EnumWriteFn>,
}

impl EnumConverter {
    pub fn new<F>(type_name: impl Into<String>, write: F) -> Self
    where
        F: Fn(&str) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            type_name: type_name.into(),
            write: Box::new(write),
        }
    }
}

impl Converter for EnumConverter {
    fn name(&self) -> &str {
        &self.type_name
    }

    fn can_write(&self, value: &Value) -> bool {
        matches!(value, Value::Enum { type_name, .. } if *type_name == self.type_name)
    }

    fn write(&self, value: Value) -> Result<Value> {
        match value {
            Value::Enum { name, .. } => (self.write)(&name),
            other => Ok(other),
        }
    }
}

/// Stores booleans as TINYINT (0/1), for stores without a boolean type.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanAsTinyInt;

impl Converter for BooleanAsTinyInt {
    fn name(&self) -> &str {
        "boolean-as-tinyint"
    }

    fn can_write(&self, value: &Value) -> bool {
        matches!(value, Value::Bool(_))
    }

    fn write(&self, value: Value) -> Result<Value> {
        match value {
            Value::Bool(b) => Ok(Value::TinyInt(i8::from(b))),
            other => Ok(other),
        }
    }

    fn can_read(&self, value: &Value, target: &SqlType) -> bool {
        *target == SqlType::Boolean
            && matches!(value, Value::TinyInt(_) | Value::SmallInt(_) | Value::Int(_))
    }

    fn read(&self, value: Value, _target: &SqlType) -> Result<Value> {
        value
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| Error::conversion("BOOLEAN", value.type_name()))
    }
}

/// Types that map directly to a store column without entity nesting.
///
/// Every built-in [`SqlType`] is simple; `Custom` types are simple only
/// when registered. Arrays are simple when their element type is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimpleTypeHolder {
    custom: HashSet<String>,
}

impl SimpleTypeHolder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register additional store-specific type names.
    #[must_use]
    pub fn with_custom_types<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.custom.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn is_simple_type(&self, sql_type: &SqlType) -> bool {
        match sql_type.element_type() {
            SqlType::Custom(name) => self.custom.contains(name),
            _ => true,
        }
    }
}

/// Ordered converter registry plus the simple-type holder.
#[derive(Debug, Clone, Default)]
pub struct CustomConversions {
    converters: Vec<Arc<dyn Converter>>,
    simple_types: SimpleTypeHolder,
}

impl CustomConversions {
    /// User converters take precedence over store converters.
    pub fn new(
        user: Vec<Arc<dyn Converter>>,
        store: Vec<Arc<dyn Converter>>,
        simple_types: SimpleTypeHolder,
    ) -> Self {
        let mut converters = user;
        converters.extend(store);
        Self {
            converters,
            simple_types,
        }
    }

    pub fn simple_type_holder(&self) -> &SimpleTypeHolder {
        &self.simple_types
    }

    pub fn is_simple_type(&self, sql_type: &SqlType) -> bool {
        self.simple_types.is_simple_type(sql_type)
    }

    pub fn has_write_converter(&self, value: &Value) -> bool {
        self.converters.iter().any(|c| c.can_write(value))
    }

    /// Convert an outbound value. Arrays are converted element-wise.
    pub fn write_value(&self, value: Value) -> Result<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Array(items) => items
                .into_iter()
                .map(|item| self.write_value(item))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            value => {
                if let Some(converter) = self.converters.iter().find(|c| c.can_write(&value)) {
                    tracing::trace!(converter = converter.name(), "Applying write converter");
                    return converter.write(value);
                }
                match value {
                    Value::Enum { name, .. } => Ok(Value::Text(name)),
                    other => Ok(other),
                }
            }
        }
    }

    /// Convert an inbound value towards `target`. Arrays are converted
    /// element-wise towards the element type.
    pub fn read_value(&self, value: Value, target: &SqlType) -> Result<Value> {
        match (value, target) {
            (Value::Null, _) => Ok(Value::Null),
            (Value::Array(items), SqlType::Array(element)) => items
                .into_iter()
                .map(|item| self.read_value(item, element))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            (value, target) => {
                if let Some(converter) = self.converters.iter().find(|c| c.can_read(&value, target)) {
                    tracing::trace!(converter = converter.name(), "Applying read converter");
                    return converter.read(value, target);
                }
                Ok(value)
            }
        }
    }
}
