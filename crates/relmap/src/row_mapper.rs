//! Row mappers: turn one driver row into one result value.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use relmap_core::{Entity, Result, Row, RowMetadata, Value};

use crate::convert::EntityConverter;

/// Maps a driver row to a value.
///
/// Mappers are stateless and may be shared across threads and rows.
pub trait RowMapper<T>: Send + Sync {
    fn map_row(&self, row: &Row, metadata: &RowMetadata) -> Result<T>;
}

impl<T, F> RowMapper<T> for F
where
    F: Fn(&Row, &RowMetadata) -> Result<T> + Send + Sync,
{
    fn map_row(&self, row: &Row, metadata: &RowMetadata) -> Result<T> {
        self(row, metadata)
    }
}

/// Reads rows into entities of type `T`.
pub struct EntityRowMapper<T> {
    converter: Arc<EntityConverter>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Entity> EntityRowMapper<T> {
    pub fn new(converter: Arc<EntityConverter>) -> Self {
        Self {
            converter,
            _marker: PhantomData,
        }
    }
}

impl<T> Clone for EntityRowMapper<T> {
    fn clone(&self) -> Self {
        Self {
            converter: Arc::clone(&self.converter),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for EntityRowMapper<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRowMapper")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: Entity> RowMapper<T> for EntityRowMapper<T> {
    fn map_row(&self, row: &Row, metadata: &RowMetadata) -> Result<T> {
        self.converter.read(row, metadata)
    }
}

/// Column label to value map for rows read without an entity type.
///
/// Iteration follows driver order with the original label casing. Lookups
/// are ASCII case-insensitive; when two labels differ only by case the first
/// one is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMap {
    entries: Vec<(String, Value)>,
    index: HashMap<String, usize>,
}

impl ColumnMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a column unless a label equal ignoring case is already present.
    /// Returns whether the value was stored.
    pub fn insert(&mut self, label: impl Into<String>, value: Value) -> bool {
        let label = label.into();
        let key = label.to_ascii_lowercase();
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key, self.entries.len());
        self.entries.push((label, value));
        true
    }

    pub fn get(&self, label: &str) -> Option<&Value> {
        self.index
            .get(&label.to_ascii_lowercase())
            .map(|&i| &self.entries[i].1)
    }

    pub fn contains_key(&self, label: &str) -> bool {
        self.index.contains_key(&label.to_ascii_lowercase())
    }

    /// Labels in driver order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(label, _)| label.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(label, value)| (label.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for ColumnMap {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Reads every column of a row into a [`ColumnMap`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnMapRowMapper;

impl RowMapper<ColumnMap> for ColumnMapRowMapper {
    fn map_row(&self, row: &Row, metadata: &RowMetadata) -> Result<ColumnMap> {
        let mut map = ColumnMap::new();
        for (index, column) in metadata.column_metadatas().iter().enumerate() {
            let value = row.get(index).cloned().unwrap_or(Value::Null);
            map.insert(column.name.clone(), value);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(names: &[&str], values: Vec<Value>) -> (Row, RowMetadata) {
        let meta = RowMetadata::from_names(names.iter().copied());
        (Row::with_metadata(Arc::new(meta.clone()), values), meta)
    }

    #[test]
    fn column_map_keeps_driver_order_and_casing() {
        let (row, meta) = row(
            &["ID", "First_Name", "age"],
            vec![Value::BigInt(1), Value::Text("Walter".into()), Value::Null],
        );
        let map = ColumnMapRowMapper.map_row(&row, &meta).unwrap();

        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["ID", "First_Name", "age"]);
        assert_eq!(map.get("id"), Some(&Value::BigInt(1)));
        assert_eq!(map.get("FIRST_NAME"), Some(&Value::Text("Walter".into())));
        assert_eq!(map.get("age"), Some(&Value::Null));
        assert!(!map.contains_key("last_name"));
    }

    #[test]
    fn column_map_first_occurrence_wins() {
        let (row, meta) = row(&["name", "NAME"], vec![Value::from("a"), Value::from("b")]);
        let map = ColumnMapRowMapper.map_row(&row, &meta).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("Name"), Some(&Value::Text("a".into())));
        assert_eq!(
            map.into_iter().collect::<Vec<_>>(),
            vec![("name".to_string(), Value::Text("a".into()))]
        );
    }

    #[test]
    fn closures_are_row_mappers() {
        let mapper = |row: &Row, _: &RowMetadata| -> Result<i64> { row.get_named("n") };
        let (row, meta) = row(&["n"], vec![Value::BigInt(5)]);
        assert_eq!(mapper.map_row(&row, &meta).unwrap(), 5);
    }
}
