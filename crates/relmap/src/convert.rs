//! Entity conversion: entities to outbound rows and driver rows to entities.
//!
//! The [`EntityConverter`] combines the mapping context, the conversion
//! registry and the dialect. Writing goes property by property through the
//! registry, then collection-like properties are coerced to the dialect's
//! array representation. Reading walks the row metadata in driver order and
//! converts each matched column towards its property type.

use std::any::type_name;
use std::sync::Arc;

use relmap_core::{
    CustomConversions, Dialect, Entity, Error, MappingContext, MappingErrorKind, OutboundRow,
    PersistentEntity, PersistentProperty, PropertyValues, Result, Row, RowMetadata, SettableValue,
    SqlType, Value, unknown_property,
};

/// Converts entities to and from the store representation.
#[derive(Debug, Clone)]
pub struct EntityConverter {
    mapping_context: Arc<MappingContext>,
    conversions: Arc<CustomConversions>,
    dialect: Dialect,
}

impl EntityConverter {
    pub fn new(
        mapping_context: Arc<MappingContext>,
        conversions: Arc<CustomConversions>,
        dialect: Dialect,
    ) -> Self {
        Self {
            mapping_context,
            conversions,
            dialect,
        }
    }

    pub fn mapping_context(&self) -> &Arc<MappingContext> {
        &self.mapping_context
    }

    pub fn conversions(&self) -> &Arc<CustomConversions> {
        &self.conversions
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// Write every persistent property of `entity` into `sink`.
    ///
    /// Values go through the registry's write converters. The declared type
    /// is the property type, or the converted value's type when a write
    /// converter changed the representation.
    pub fn write<T: Entity>(&self, entity: &T, sink: &mut OutboundRow) -> Result<()> {
        let persistent = self.mapping_context.required_persistent_entity::<T>()?;

        for (name, value) in entity.to_properties() {
            let property = persistent
                .property(name)
                .ok_or_else(|| unknown_property::<T>(name))?;
            let column = property.column();

            let converted_type = self.conversions.has_write_converter(&value);
            let value = self
                .conversions
                .write_value(value)
                .map_err(|e| e.with_column(column.reference()))?;
            let sql_type = match value.sql_type() {
                Some(ty) if converted_type && !value.is_array() => ty,
                _ => property.sql_type().clone(),
            };
            sink.put(column.clone(), SettableValue::from_value(value, sql_type));
        }
        Ok(())
    }

    /// Build the outbound row for `entity`.
    ///
    /// Collection-like properties are coerced to the dialect's array
    /// representation. On failure no partial row is returned.
    #[tracing::instrument(level = "trace", skip(self, entity), fields(entity = type_name::<T>()))]
    pub fn write_outbound_row<T: Entity>(&self, entity: &T) -> Result<OutboundRow> {
        let persistent = self.mapping_context.required_persistent_entity::<T>()?;
        let mut row = OutboundRow::new();
        self.write(entity, &mut row)?;

        for property in persistent.properties() {
            if !property.is_collection_like() {
                continue;
            }
            let Some(current) = row.get(property.column()) else {
                continue;
            };
            if current.value().is_some_and(Value::is_array) || property.sql_type().is_array() {
                let coerced = self.array_value(current.clone(), property)?;
                row.put(property.column().clone(), coerced);
            }
        }

        tracing::trace!(columns = row.len(), "Built outbound row");
        Ok(row)
    }

    /// Coerce a value bound to an array property into the dialect's array
    /// representation. Absent and empty collections become a typed NULL.
    pub fn array_value(
        &self,
        value: SettableValue,
        property: &PersistentProperty,
    ) -> Result<SettableValue> {
        if value.sql_type().is_binary() || matches!(value.value(), Some(Value::Bytes(_))) {
            return Ok(value);
        }

        let arrays = self.dialect.array_support();
        if !arrays.is_supported() {
            return Err(Error::unsupported("array columns", self.dialect.name()));
        }

        let element = value
            .value()
            .and_then(Value::element_type)
            .unwrap_or_else(|| property.actual_type().clone());
        let store_element = self.dialect.array_type(&element)?;
        let depth = value
            .value()
            .map_or(0, Value::array_depth)
            .max(property.sql_type().dimensions())
            .max(1);

        match value.into_value().filter(|v| !v.is_empty_array()) {
            None => Ok(SettableValue::empty(wrap_array(store_element, depth))),
            Some(v) => Ok(SettableValue::from_value(
                coerce_elements(v, &store_element),
                store_element,
            )),
        }
    }

    /// Coerce a standalone bind value.
    ///
    /// Empty values pass through. Present values go through the write
    /// converters; arrays bound to an array-typed slot are widened to the
    /// dialect's store element type, anything else keeps its slot type.
    pub fn bind_value(&self, value: SettableValue) -> Result<SettableValue> {
        let slot = value.sql_type().clone();
        let Some(raw) = value.into_value() else {
            return Ok(SettableValue::empty(slot));
        };
        let converter_applied = self.conversions.has_write_converter(&raw);
        let converted = self.conversions.write_value(raw)?;

        if converted.is_array() && slot.is_array() {
            if !self.dialect.array_support().is_supported() {
                return Err(Error::unsupported("array columns", self.dialect.name()));
            }
            let element = converted
                .element_type()
                .unwrap_or_else(|| slot.element_type().clone());
            let store_element = self.dialect.array_type(&element)?;
            let depth = converted.array_depth().max(slot.dimensions());
            return Ok(SettableValue::from_value(
                coerce_elements(converted, &store_element),
                wrap_array(store_element, depth),
            ));
        }

        let sql_type = match converted.sql_type() {
            Some(ty) if converter_applied && !converted.is_array() => ty,
            _ => slot,
        };
        Ok(SettableValue::from_value(converted, sql_type))
    }

    /// Read an entity from a driver row.
    ///
    /// Metadata columns are visited in driver order and matched
    /// case-insensitively against property columns; the first matching
    /// column wins. A non-nullable property without a column is an error.
    pub fn read<T: Entity>(&self, row: &Row, metadata: &RowMetadata) -> Result<T> {
        let persistent = self.mapping_context.required_persistent_entity::<T>()?;
        let values = self.read_properties(&persistent, row, metadata)?;
        T::from_properties(&values).map_err(|e| driver_label(e, &persistent, metadata))
    }

    fn read_properties(
        &self,
        persistent: &PersistentEntity,
        row: &Row,
        metadata: &RowMetadata,
    ) -> Result<PropertyValues> {
        let mut values = PropertyValues::new();
        let mut seen = vec![false; persistent.properties().len()];

        for (index, column) in metadata.column_metadatas().iter().enumerate() {
            let Some(slot) = persistent
                .properties()
                .iter()
                .position(|p| p.column().matches_label(&column.name))
            else {
                continue;
            };
            if seen[slot] {
                continue;
            }
            seen[slot] = true;

            let property = &persistent.properties()[slot];
            let raw = row.get(index).cloned().unwrap_or(Value::Null);
            let value = self
                .conversions
                .read_value(raw, property.sql_type())
                .map_err(|e| e.with_column(&column.name))?;
            values.insert(property.name(), value);
        }

        for (property, found) in persistent.properties().iter().zip(&seen) {
            if !found && !property.is_nullable() {
                return Err(Error::mapping(
                    MappingErrorKind::MissingColumn,
                    Some(persistent.type_name()),
                    format!(
                        "row has no column '{}' for non-nullable property '{}'",
                        property.column().reference(),
                        property.name()
                    ),
                ));
            }
        }
        Ok(values)
    }

    /// A function that fills in the identifier of `instance` from a row
    /// returned by an insert.
    ///
    /// The id is only written while it is still NULL. When the metadata
    /// carries none of the id columns the instance is returned unchanged.
    pub fn populate_id_if_necessary<T>(
        &self,
        instance: T,
    ) -> impl Fn(&Row, &RowMetadata) -> Result<T> + Send + Sync + 'static
    where
        T: Entity + Clone,
    {
        let mapping_context = Arc::clone(&self.mapping_context);
        let conversions = Arc::clone(&self.conversions);

        move |row: &Row, metadata: &RowMetadata| {
            let persistent = mapping_context.required_persistent_entity::<T>()?;
            let mut populated = instance.clone();

            for property in persistent.id_properties() {
                let unset = populated
                    .get_property(property.name())
                    .is_none_or(|v| v.is_null());
                if !unset {
                    continue;
                }
                let Some(index) = metadata
                    .column_metadatas()
                    .iter()
                    .position(|c| property.column().matches_label(&c.name))
                else {
                    tracing::warn!(
                        entity = persistent.type_name(),
                        column = property.column().reference(),
                        "Row metadata has no identifier column; id left unset"
                    );
                    continue;
                };
                let raw = row.get(index).cloned().unwrap_or(Value::Null);
                let value = conversions
                    .read_value(raw, property.sql_type())
                    .map_err(|e| e.with_column(property.column().reference()))?;
                populated.set_property(property.name(), value)?;
            }
            Ok(populated)
        }
    }
}

/// Point a conversion error raised for a property at the driver column it
/// was read from.
fn driver_label(error: Error, persistent: &PersistentEntity, metadata: &RowMetadata) -> Error {
    let Error::Conversion(mut e) = error else {
        return error;
    };
    let label = e
        .column
        .as_deref()
        .and_then(|name| persistent.property(name))
        .and_then(|property| {
            metadata
                .column_metadatas()
                .iter()
                .find(|c| property.column().matches_label(&c.name))
        })
        .map(|c| c.name.clone());
    if label.is_some() {
        e.column = label;
    }
    Error::Conversion(e)
}

/// Nest `element` in `depth` array levels.
fn wrap_array(element: SqlType, depth: usize) -> SqlType {
    (0..depth).fold(element, |ty, _| SqlType::array_of(ty))
}

/// Widen array leaves to the store element type.
fn coerce_elements(value: Value, store_element: &SqlType) -> Value {
    match (value, store_element) {
        (Value::Array(items), _) => Value::Array(
            items
                .into_iter()
                .map(|item| coerce_elements(item, store_element))
                .collect(),
        ),
        (Value::TinyInt(v), SqlType::SmallInt) => Value::SmallInt(i16::from(v)),
        (Value::TinyInt(v), SqlType::Integer) => Value::Int(i32::from(v)),
        (Value::SmallInt(v), SqlType::Integer) => Value::Int(i32::from(v)),
        (Value::Int(v), SqlType::BigInt) => Value::BigInt(i64::from(v)),
        (other, _) => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relmap_core::{Converter, EnumConverter, FieldInfo, FromValue, SqlIdentifier};

    #[derive(Debug, Clone, PartialEq, relmap_macros::Entity)]
    #[relmap(table = "legoset")]
    struct LegoSet {
        #[relmap(id)]
        id: Option<i64>,
        name: String,
        #[relmap(column = "manual_id")]
        manual: Option<i32>,
        tags: Option<Vec<String>>,
        #[relmap(transient)]
        dirty: bool,
    }

    /// Hand-written to carry a TINYINT array.
    #[derive(Debug, Clone, PartialEq)]
    struct Sensor {
        id: i64,
        readings: Vec<i8>,
    }

    impl Entity for Sensor {
        const TABLE_NAME: &'static str = "sensor";

        fn fields() -> Vec<FieldInfo> {
            vec![
                FieldInfo::of::<i64>("id").primary_key(true),
                FieldInfo::new("readings", "readings", SqlType::array_of(SqlType::TinyInt)),
            ]
        }

        fn to_properties(&self) -> Vec<(&'static str, Value)> {
            vec![
                ("id", Value::BigInt(self.id)),
                (
                    "readings",
                    Value::Array(self.readings.iter().copied().map(Value::TinyInt).collect()),
                ),
            ]
        }

        fn from_properties(values: &PropertyValues) -> Result<Self> {
            let readings = match values.get("readings") {
                Value::Array(items) => items
                    .iter()
                    .map(|v| {
                        v.as_i64()
                            .and_then(|n| i8::try_from(n).ok())
                            .ok_or_else(|| Error::conversion("TINYINT", v.type_name()))
                    })
                    .collect::<Result<Vec<_>>>()?,
                _ => Vec::new(),
            };
            Ok(Self {
                id: values.get_as("id")?,
                readings,
            })
        }

        fn get_property(&self, name: &str) -> Option<Value> {
            self.to_properties()
                .into_iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| v)
        }

        fn set_property(&mut self, name: &str, value: Value) -> Result<()> {
            match name {
                "id" => self.id = i64::from_value(&value)?,
                _ => return Err(unknown_property::<Self>(name)),
            }
            Ok(())
        }
    }

    fn converter(dialect: Dialect) -> EntityConverter {
        converter_with(dialect, Vec::new())
    }

    fn converter_with(dialect: Dialect, user: Vec<Arc<dyn Converter>>) -> EntityConverter {
        let conversions = CustomConversions::new(
            user,
            dialect.converters().to_vec(),
            dialect.simple_type_holder().clone(),
        );
        EntityConverter::new(
            Arc::new(MappingContext::new()),
            Arc::new(conversions),
            dialect,
        )
    }

    fn lego() -> LegoSet {
        LegoSet {
            id: Some(42),
            name: "Star Destroyer".to_string(),
            manual: None,
            tags: Some(vec!["space".to_string(), "ship".to_string()]),
            dirty: true,
        }
    }

    #[test]
    fn outbound_row_follows_declaration_order() {
        let row = converter(Dialect::postgres())
            .write_outbound_row(&lego())
            .unwrap();

        let columns: Vec<_> = row.columns().map(ToString::to_string).collect();
        assert_eq!(columns, vec!["id", "name", "manual_id", "tags"]);

        let manual = row.get(&SqlIdentifier::unquoted("manual_id")).unwrap();
        assert!(manual.is_empty());
        assert_eq!(manual.sql_type(), &SqlType::Integer);

        let tags = row.get(&SqlIdentifier::unquoted("tags")).unwrap();
        assert_eq!(
            tags.value(),
            Some(&Value::Array(vec![
                Value::Text("space".into()),
                Value::Text("ship".into())
            ]))
        );
        assert_eq!(tags.sql_type(), &SqlType::Text);
    }

    #[test]
    fn empty_array_property_keeps_array_type() {
        let mut set = lego();
        set.tags = None;
        let row = converter(Dialect::postgres()).write_outbound_row(&set).unwrap();

        let tags = row.get(&SqlIdentifier::unquoted("tags")).unwrap();
        assert!(tags.is_empty());
        assert_eq!(tags.sql_type(), &SqlType::array_of(SqlType::Text));
    }

    #[test]
    fn empty_collection_is_written_as_typed_null() {
        let mut set = lego();
        set.tags = Some(Vec::new());
        let row = converter(Dialect::postgres()).write_outbound_row(&set).unwrap();

        let tags = row.get(&SqlIdentifier::unquoted("tags")).unwrap();
        assert!(!tags.has_value());
        assert_eq!(tags.sql_type(), &SqlType::array_of(SqlType::Text));
    }

    #[test]
    fn arrays_fail_without_dialect_support() {
        let err = converter(Dialect::mysql())
            .write_outbound_row(&lego())
            .unwrap_err();
        assert!(err.is_unsupported());
        assert_eq!(
            err.to_string(),
            "Unsupported feature: dialect mysql does not support array columns"
        );
    }

    #[test]
    fn tiny_int_arrays_are_widened_on_postgres() {
        let sensor = Sensor {
            id: 1,
            readings: vec![1, -2],
        };
        let row = converter(Dialect::postgres())
            .write_outbound_row(&sensor)
            .unwrap();

        let readings = row.get(&SqlIdentifier::unquoted("readings")).unwrap();
        assert_eq!(
            readings.value(),
            Some(&Value::Array(vec![Value::SmallInt(1), Value::SmallInt(-2)]))
        );
        assert_eq!(readings.sql_type(), &SqlType::SmallInt);
    }

    #[test]
    fn binary_values_are_not_array_coerced() {
        let conv = converter(Dialect::mysql());
        let entity = PersistentEntity::of::<Sensor>().unwrap();
        let readings = entity.property("readings").unwrap();
        let blob = SettableValue::from_value(Value::Bytes(vec![1, 2]), SqlType::Blob);
        assert_eq!(conv.array_value(blob.clone(), readings).unwrap(), blob);
    }

    #[test]
    fn read_matches_columns_case_insensitively() {
        let meta = RowMetadata::from_names(["ID", "Name", "MANUAL_ID", "tags", "extra"]);
        let row = Row::with_metadata(
            Arc::new(meta.clone()),
            vec![
                Value::BigInt(7),
                Value::Text("Falcon".into()),
                Value::Int(3),
                Value::Null,
                Value::Bool(true),
            ],
        );

        let set: LegoSet = converter(Dialect::postgres()).read(&row, &meta).unwrap();
        assert_eq!(
            set,
            LegoSet {
                id: Some(7),
                name: "Falcon".to_string(),
                manual: Some(3),
                tags: None,
                dirty: false,
            }
        );
    }

    #[test]
    fn read_missing_nullable_column_is_null() {
        let meta = RowMetadata::from_names(["id", "name"]);
        let row = Row::with_metadata(
            Arc::new(meta.clone()),
            vec![Value::BigInt(1), Value::Text("X-Wing".into())],
        );
        let set: LegoSet = converter(Dialect::postgres()).read(&row, &meta).unwrap();
        assert_eq!(set.manual, None);
        assert_eq!(set.tags, None);
    }

    #[test]
    fn read_missing_required_column_fails() {
        let meta = RowMetadata::from_names(["id"]);
        let row = Row::with_metadata(Arc::new(meta.clone()), vec![Value::BigInt(1)]);
        let err = converter(Dialect::postgres())
            .read::<LegoSet>(&row, &meta)
            .unwrap_err();
        assert!(err.is_mapping(MappingErrorKind::MissingColumn), "{err}");
        assert!(err.to_string().contains("'name'"), "{err}");
    }

    #[test]
    fn read_conversion_errors_name_the_driver_column() {
        let meta = RowMetadata::from_names(["ID", "name"]);
        let row = Row::with_metadata(
            Arc::new(meta.clone()),
            vec![Value::Text("forty-two".into()), Value::Text("Falcon".into())],
        );
        let err = converter(Dialect::postgres())
            .read::<LegoSet>(&row, &meta)
            .unwrap_err();
        match err {
            Error::Conversion(e) => {
                assert_eq!(e.expected, "i64");
                assert_eq!(e.column.as_deref(), Some("ID"));
            }
            other => panic!("expected conversion error, got {other:?}"),
        }

        let meta = RowMetadata::from_names(["id", "name", "Manual_Id"]);
        let row = Row::with_metadata(
            Arc::new(meta.clone()),
            vec![
                Value::BigInt(1),
                Value::Text("Falcon".into()),
                Value::Text("three".into()),
            ],
        );
        let err = converter(Dialect::postgres())
            .read::<LegoSet>(&row, &meta)
            .unwrap_err();
        assert!(
            matches!(&err, Error::Conversion(e) if e.column.as_deref() == Some("Manual_Id")),
            "{err:?}"
        );
    }

    #[test]
    fn first_matching_column_wins() {
        let meta = RowMetadata::from_names(["name", "NAME"]);
        let row = Row::with_metadata(
            Arc::new(meta.clone()),
            vec![Value::Text("first".into()), Value::Text("second".into())],
        );
        let set: LegoSet = converter(Dialect::postgres()).read(&row, &meta).unwrap();
        assert_eq!(set.name, "first");
    }

    #[test]
    fn store_converters_apply_in_both_directions() {
        #[derive(Debug, Clone, PartialEq, relmap_macros::Entity)]
        struct Flag {
            #[relmap(id)]
            id: i64,
            enabled: bool,
        }

        let conv = converter(Dialect::mysql());
        let row = conv
            .write_outbound_row(&Flag {
                id: 1,
                enabled: true,
            })
            .unwrap();
        let enabled = row.get(&SqlIdentifier::unquoted("enabled")).unwrap();
        assert_eq!(enabled.value(), Some(&Value::TinyInt(1)));
        assert_eq!(enabled.sql_type(), &SqlType::TinyInt);

        let meta = RowMetadata::from_names(["id", "enabled"]);
        let inbound = Row::with_metadata(
            Arc::new(meta.clone()),
            vec![Value::BigInt(1), Value::TinyInt(0)],
        );
        let flag: Flag = conv.read(&inbound, &meta).unwrap();
        assert!(!flag.enabled);
    }

    #[test]
    fn bind_value_unwraps_enums() {
        enum Status {}
        let status = Arc::new(EnumConverter::new("Status", |name| match name {
            "Active" => Ok(Value::Int(1)),
            _ => Ok(Value::Int(0)),
        })) as Arc<dyn Converter>;
        let conv = converter_with(Dialect::postgres(), vec![status]);

        let bound = conv
            .bind_value(SettableValue::from_value(
                Value::enumeration::<Status>("Active"),
                SqlType::Integer,
            ))
            .unwrap();
        assert_eq!(bound.value(), Some(&Value::Int(1)));
        assert_eq!(bound.sql_type(), &SqlType::Integer);

        enum Color {}
        let bound = conv
            .bind_value(SettableValue::from_value(
                Value::enumeration::<Color>("Red"),
                SqlType::Text,
            ))
            .unwrap();
        assert_eq!(bound.value(), Some(&Value::Text("Red".into())));
    }

    #[test]
    fn bind_value_passes_nulls_and_scalar_slots_through() {
        let conv = converter(Dialect::postgres());
        let empty = SettableValue::empty(SqlType::BigInt);
        assert_eq!(conv.bind_value(empty.clone()).unwrap(), empty);

        let list = SettableValue::from_value(
            Value::Array(vec![Value::Int(1), Value::Int(2)]),
            SqlType::Integer,
        );
        assert_eq!(conv.bind_value(list.clone()).unwrap(), list);
    }

    #[test]
    fn bind_value_widens_array_slots() {
        let conv = converter(Dialect::postgres());
        let bound = conv
            .bind_value(SettableValue::from_value(
                Value::Array(vec![Value::TinyInt(4)]),
                SqlType::array_of(SqlType::TinyInt),
            ))
            .unwrap();
        assert_eq!(bound.value(), Some(&Value::Array(vec![Value::SmallInt(4)])));
        assert_eq!(bound.sql_type(), &SqlType::array_of(SqlType::SmallInt));

        let err = converter(Dialect::sqlite())
            .bind_value(SettableValue::from_value(
                Value::Array(vec![Value::Int(1)]),
                SqlType::array_of(SqlType::Integer),
            ))
            .unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn populate_id_only_when_null() {
        let conv = converter(Dialect::postgres());
        let meta = RowMetadata::from_names(["id"]);
        let row = Row::with_metadata(Arc::new(meta.clone()), vec![Value::BigInt(99)]);

        let mut fresh = lego();
        fresh.id = None;
        let populated = conv.populate_id_if_necessary(fresh)(&row, &meta).unwrap();
        assert_eq!(populated.id, Some(99));

        let existing = conv.populate_id_if_necessary(lego())(&row, &meta).unwrap();
        assert_eq!(existing.id, Some(42));
    }

    #[test]
    fn populate_id_without_id_column_is_a_no_op() {
        let conv = converter(Dialect::postgres());
        let meta = RowMetadata::from_names(["name"]);
        let row = Row::with_metadata(Arc::new(meta.clone()), vec![Value::Text("x".into())]);

        let mut fresh = lego();
        fresh.id = None;
        let populated = conv.populate_id_if_necessary(fresh.clone())(&row, &meta).unwrap();
        assert_eq!(populated, fresh);
    }
}
