//! Values headed for a bind target, and rows of them.

use crate::identifier::SqlIdentifier;
use crate::types::SqlType;
use crate::value::Value;

/// A value paired with its declared type.
///
/// The declared type is always present so that a driver can bind a typed
/// NULL for an empty value.
#[derive(Debug, Clone, PartialEq)]
pub struct SettableValue {
    value: Option<Value>,
    sql_type: SqlType,
}

impl SettableValue {
    /// A present value. `Value::Null` is normalised to an empty value.
    pub fn from_value(value: Value, sql_type: SqlType) -> Self {
        Self::from_or_empty(Some(value), sql_type)
    }

    /// A present value, or an empty one when `value` is `None` or NULL.
    pub fn from_or_empty(value: Option<Value>, sql_type: SqlType) -> Self {
        Self {
            value: value.filter(|v| !v.is_null()),
            sql_type,
        }
    }

    /// An empty value of the given type.
    pub fn empty(sql_type: SqlType) -> Self {
        Self {
            value: None,
            sql_type,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn into_value(self) -> Option<Value> {
        self.value
    }

    pub fn sql_type(&self) -> &SqlType {
        &self.sql_type
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }
}

/// Insertion-ordered mapping from column identifier to settable value.
///
/// `put` on an existing key replaces the value in place, keeping the
/// original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutboundRow {
    entries: Vec<(SqlIdentifier, SettableValue)>,
}

impl OutboundRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the value for `column`.
    pub fn put(&mut self, column: impl Into<SqlIdentifier>, value: SettableValue) {
        let column = column.into();
        if let Some(slot) = self.entries.iter_mut().find(|(c, _)| *c == column) {
            slot.1 = value;
        } else {
            self.entries.push((column, value));
        }
    }

    /// Builder-style `put`.
    #[must_use]
    pub fn append(mut self, column: impl Into<SqlIdentifier>, value: SettableValue) -> Self {
        self.put(column, value);
        self
    }

    pub fn get(&self, column: &SqlIdentifier) -> Option<&SettableValue> {
        self.entries
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, column: &SqlIdentifier) -> Option<&mut SettableValue> {
        self.entries
            .iter_mut()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, column: &SqlIdentifier) -> bool {
        self.get(column).is_some()
    }

    pub fn remove(&mut self, column: &SqlIdentifier) -> Option<SettableValue> {
        let pos = self.entries.iter().position(|(c, _)| c == column)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &SqlIdentifier> {
        self.entries.iter().map(|(c, _)| c)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SqlIdentifier, &SettableValue)> {
        self.entries.iter().map(|(c, v)| (c, v))
    }
}

impl IntoIterator for OutboundRow {
    type Item = (SqlIdentifier, SettableValue);
    type IntoIter = std::vec::IntoIter<(SqlIdentifier, SettableValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
