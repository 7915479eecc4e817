//! Inbound driver rows and their metadata.

use crate::Result;
use crate::error::{ConversionError, Error};
use crate::types::SqlType;
use crate::value::{FromValue, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Metadata for a single result column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMetadata {
    /// Column label as reported by the driver
    pub name: String,
    /// Driver-reported type, when known
    pub sql_type: Option<SqlType>,
    /// Driver-reported nullability, when known
    pub nullable: Option<bool>,
}

impl ColumnMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: None,
            nullable: None,
        }
    }

    #[must_use]
    pub fn with_type(mut self, sql_type: SqlType) -> Self {
        self.sql_type = Some(sql_type);
        self
    }

    #[must_use]
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }
}

/// Column metadata shared across all rows in a result set.
///
/// Wrapped in `Arc` so all rows from the same query share it. Name lookups
/// are ASCII case-insensitive; the first column wins when two labels differ
/// only by case.
#[derive(Debug, Clone)]
pub struct RowMetadata {
    columns: Vec<ColumnMetadata>,
    /// Lower-cased name -> index
    name_to_index: HashMap<String, usize>,
}

impl RowMetadata {
    pub fn new(columns: Vec<ColumnMetadata>) -> Self {
        let mut name_to_index = HashMap::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            name_to_index
                .entry(column.name.to_ascii_lowercase())
                .or_insert(i);
        }
        Self {
            columns,
            name_to_index,
        }
    }

    /// Build metadata from bare column names.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(ColumnMetadata::new).collect())
    }

    /// Get the number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if there are no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column metadata in driver order.
    pub fn column_metadatas(&self) -> &[ColumnMetadata] {
        &self.columns
    }

    /// Get the index of a column by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(&name.to_ascii_lowercase()).copied()
    }

    /// Check if a column exists.
    pub fn contains_column(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Get the metadata of a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnMetadata> {
        self.index_of(name).map(|i| &self.columns[i])
    }

    /// Column labels in driver order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

/// A single row returned by a driver.
#[derive(Debug, Clone)]
pub struct Row {
    /// Column values in order
    values: Vec<Value>,
    /// Shared column metadata
    metadata: Arc<RowMetadata>,
}

impl Row {
    /// Create a row with its own metadata.
    ///
    /// For multiple rows from the same result set, prefer `with_metadata`
    /// to share the metadata.
    pub fn new(column_names: Vec<String>, values: Vec<Value>) -> Self {
        let metadata = Arc::new(RowMetadata::from_names(column_names));
        Self { values, metadata }
    }

    /// Create a row with shared metadata.
    pub fn with_metadata(metadata: Arc<RowMetadata>, values: Vec<Value>) -> Self {
        Self { values, metadata }
    }

    /// Get the shared metadata.
    pub fn metadata(&self) -> &Arc<RowMetadata> {
        &self.metadata
    }

    /// Get the number of columns in this row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if this row is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get a value by column index.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Get a value by column label, case-insensitively.
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.metadata.index_of(name).and_then(|i| self.values.get(i))
    }

    /// Get a typed value by column label.
    pub fn get_named<T: FromValue>(&self, name: &str) -> Result<T> {
        let value = self.get_by_name(name).ok_or_else(|| {
            Error::Conversion(ConversionError {
                expected: std::any::type_name::<T>().to_string(),
                actual: format!("column '{}' not found", name),
                column: Some(name.to_string()),
            })
        })?;
        T::from_value(value).map_err(|e| e.with_column(name))
    }

    /// Iterate over all values.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    /// Iterate over (column_label, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.metadata.names().zip(self.values.iter())
    }
}
