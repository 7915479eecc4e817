//! Core types and traits for relmap.
//!
//! This crate provides the foundational abstractions for object/row mapping:
//!
//! - `Value`, `SqlType` and `SqlIdentifier` for dynamically-typed SQL data
//! - `Entity` trait and the `MappingContext` of resolved persistent entities
//! - `CustomConversions` for store and user value converters
//! - `Dialect` descriptors with bind-marker, array and paging support
//! - `Row`/`RowMetadata` for inbound rows and `OutboundRow` for outbound ones
//! - `Outcome` re-export from asupersync for cancel-correct driver boundaries

// Re-export asupersync primitives for structured concurrency
pub use asupersync::{Cx, Outcome};

pub mod bind;
pub mod conversion;
pub mod dialect;
pub mod entity;
pub mod error;
pub mod identifier;
pub mod mapping;
pub mod row;
pub mod settable;
pub mod types;
pub mod value;

pub use bind::{BindId, BindMarker, BindMarkers, BindMarkersFactory, BindRecorder, BindTarget, Binding};
pub use conversion::{BooleanAsTinyInt, Converter, CustomConversions, EnumConverter, SimpleTypeHolder};
pub use dialect::{ArrayColumns, Dialect, DialectBuilder, LimitStyle};
pub use entity::{Entity, FieldInfo, PropertyValues, unknown_property};
pub use error::{
    ConversionError, Error, MappingError, MappingErrorKind, ParameterError, RenderError, Result,
    UnsupportedFeatureError,
};
pub use identifier::{IdentifierProcessing, LetterCasing, Quoting, SqlIdentifier};
pub use mapping::{MappingContext, PersistentEntity, PersistentProperty};
pub use row::{ColumnMetadata, Row, RowMetadata};
pub use settable::{OutboundRow, SettableValue};
pub use types::{SqlType, TypeInfo};
pub use value::{FromValue, Value};
