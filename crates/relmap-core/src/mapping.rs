//! Persistent entity model resolved from [`Entity`] descriptions.
//!
//! The [`MappingContext`] owns one [`PersistentEntity`] per Rust type and
//! resolves it lazily the first time the type is used.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::Result;
use crate::entity::{Entity, FieldInfo};
use crate::error::{Error, MappingErrorKind};
use crate::identifier::SqlIdentifier;
use crate::types::SqlType;

/// One persistent field of an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistentProperty {
    name: &'static str,
    column: SqlIdentifier,
    sql_type: SqlType,
    is_id: bool,
    nullable: bool,
}

impl PersistentProperty {
    fn from_field(field: &FieldInfo) -> Self {
        let column = if field.quoted {
            SqlIdentifier::quoted(field.column_name)
        } else {
            SqlIdentifier::unquoted(field.column_name)
        };
        Self {
            name: field.name,
            column,
            sql_type: field.sql_type.clone(),
            is_id: field.primary_key,
            nullable: field.nullable,
        }
    }

    /// Rust field name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn column(&self) -> &SqlIdentifier {
        &self.column
    }

    /// Declared type.
    pub fn sql_type(&self) -> &SqlType {
        &self.sql_type
    }

    /// Element type for collections, the declared type otherwise.
    pub fn actual_type(&self) -> &SqlType {
        self.sql_type.element_type()
    }

    pub fn is_id(&self) -> bool {
        self.is_id
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Whether values of this property are arrays. Binary columns never are.
    pub fn is_collection_like(&self) -> bool {
        self.sql_type.is_array()
    }
}

/// Resolved mapping metadata for one entity type.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistentEntity {
    type_name: &'static str,
    table: SqlIdentifier,
    properties: Vec<PersistentProperty>,
}

impl PersistentEntity {
    /// Resolve and validate the description of `T`.
    pub fn of<T: Entity>() -> Result<Self> {
        let type_name = std::any::type_name::<T>();
        let table = if T::QUOTED {
            SqlIdentifier::quoted(T::TABLE_NAME)
        } else {
            SqlIdentifier::unquoted(T::TABLE_NAME)
        };
        let properties = T::fields()
            .iter()
            .map(PersistentProperty::from_field)
            .collect();
        let entity = Self {
            type_name,
            table,
            properties,
        };
        entity.validate()?;
        Ok(entity)
    }

    fn validate(&self) -> Result<()> {
        let invalid = |message: String| {
            Err(Error::mapping(
                MappingErrorKind::InvalidEntity,
                Some(self.type_name),
                message,
            ))
        };

        if self.table.reference().is_empty() {
            return invalid("table name must not be empty".to_string());
        }
        let mut seen = HashSet::new();
        for property in &self.properties {
            if property.column.reference().is_empty() {
                return invalid(format!("property '{}' has an empty column name", property.name));
            }
            if !seen.insert(property.column.clone()) {
                return invalid(format!(
                    "column '{}' is mapped by more than one property",
                    property.column
                ));
            }
        }
        Ok(())
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn table_name(&self) -> &SqlIdentifier {
        &self.table
    }

    /// Properties in declaration order.
    pub fn properties(&self) -> &[PersistentProperty] {
        &self.properties
    }

    /// First identifier property, if any.
    pub fn id_property(&self) -> Option<&PersistentProperty> {
        self.properties.iter().find(|p| p.is_id)
    }

    pub fn id_properties(&self) -> impl Iterator<Item = &PersistentProperty> {
        self.properties.iter().filter(|p| p.is_id)
    }

    pub fn property(&self, name: &str) -> Option<&PersistentProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn property_for_column(&self, column: &SqlIdentifier) -> Option<&PersistentProperty> {
        self.properties.iter().find(|p| &p.column == column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &SqlIdentifier> {
        self.properties.iter().map(|p| &p.column)
    }
}

/// Cache of persistent entities keyed by Rust type.
///
/// Resolution is compute-if-absent: concurrent first uses of the same type
/// may both build a description, but only one is stored and every caller
/// observes the stored one.
#[derive(Debug, Default)]
pub struct MappingContext {
    entities: RwLock<HashMap<TypeId, Arc<PersistentEntity>>>,
}

impl MappingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entity for `type_id` if it was resolved before.
    pub fn persistent_entity_for(&self, type_id: TypeId) -> Option<Arc<PersistentEntity>> {
        self.entities
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&type_id)
            .cloned()
    }

    /// Entity for `type_id`, failing when it was never resolved.
    pub fn required_persistent_entity_for(&self, type_id: TypeId) -> Result<Arc<PersistentEntity>> {
        self.persistent_entity_for(type_id).ok_or_else(|| {
            Error::mapping(
                MappingErrorKind::UnknownEntity,
                None,
                format!("no persistent entity registered for {:?}", type_id),
            )
        })
    }

    /// Entity for `T`, resolving and caching it on first use.
    pub fn required_persistent_entity<T: Entity>(&self) -> Result<Arc<PersistentEntity>> {
        let type_id = TypeId::of::<T>();
        if let Some(entity) = self.persistent_entity_for(type_id) {
            return Ok(entity);
        }

        let resolved = Arc::new(PersistentEntity::of::<T>()?);
        tracing::debug!(
            entity = resolved.type_name(),
            table = %resolved.table_name(),
            properties = resolved.properties().len(),
            "Resolved persistent entity"
        );

        let mut entities = self
            .entities
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(Arc::clone(entities.entry(type_id).or_insert(resolved)))
    }

    /// Resolve `T` eagerly.
    pub fn register<T: Entity>(&self) -> Result<()> {
        self.required_persistent_entity::<T>().map(|_| ())
    }

    pub fn len(&self) -> usize {
        self.entities
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
