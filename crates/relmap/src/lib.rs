//! relmap - dialect-aware object/row mapping for reactive relational access.
//!
//! relmap turns entity structs into parameterised SQL and bound values, and
//! driver rows back into entities:
//!
//! - Dialect-correct SELECT/INSERT/UPDATE/DELETE with bind plans
//! - Outbound rows from entities, with array coercion per dialect
//! - Row mappers from driver rows to entities or column maps
//! - Named-parameter templates expanded to dialect bind markers
//! - Expression bindings and method-argument binding for repository queries
//!
//! # Quick Start
//!
//! ```ignore
//! use relmap::prelude::*;
//!
//! #[derive(Entity, Debug, Clone)]
//! #[relmap(table = "person")]
//! struct Person {
//!     #[relmap(id)]
//!     id: Option<i64>,
//!     name: String,
//!     age: i32,
//! }
//!
//! async fn adults(cx: &Cx, source: &mut impl RowSource) -> Outcome<Vec<Person>, Error> {
//!     let strategy = DataAccessStrategy::new(Dialect::postgres());
//!
//!     let op = strategy
//!         .get_statement_mapper()
//!         .map_select(
//!             &SelectSpec::new(strategy.get_table_name::<Person>().unwrap())
//!                 .with_projection(strategy.get_all_columns::<Person>().unwrap())
//!                 .with_criteria(Criteria::where_("age").greater_than_or_equals(18)),
//!         )
//!         .unwrap();
//!     // SELECT person.id, person.name, person.age FROM person WHERE person.age >= $1
//!     // hand `op.sql()` and `op.bind_to(..)` to the driver, then:
//!     map_rows(cx, source, &strategy.get_row_mapper::<Person>()).await
//! }
//! ```
//!
//! # Crates
//!
//! - `relmap-core`: values, types, identifiers, rows, entity model,
//!   conversions, dialects and bind markers
//! - `relmap-query`: criteria, statement specs and mapping, named-parameter
//!   expansion, expression queries
//! - `relmap-macros`: `#[derive(Entity)]`

pub mod binder;
pub mod config;
pub mod convert;
pub mod row_mapper;
pub mod stream;
pub mod strategy;

pub use binder::{
    BindableParameter, ExpressionEvaluatingParameterBinder, ExpressionEvaluator, ParameterAccessor,
    ParameterValues,
};
pub use config::{DialectName, StrategyConfig};
pub use convert::EntityConverter;
pub use row_mapper::{ColumnMap, ColumnMapRowMapper, EntityRowMapper, RowMapper};
pub use stream::{RowSource, VecRowSource, map_rows};
pub use strategy::{DataAccessStrategy, DataAccessStrategyBuilder};

pub use relmap_core::{
    ArrayColumns, BindId, BindMarker, BindMarkers, BindMarkersFactory, BindRecorder, BindTarget,
    Binding, BooleanAsTinyInt, ColumnMetadata, Converter, CustomConversions, Cx, Dialect, Entity,
    EnumConverter, Error, FieldInfo, FromValue, IdentifierProcessing, LetterCasing, LimitStyle,
    MappingContext, MappingErrorKind, OutboundRow, Outcome, PersistentEntity, PersistentProperty,
    PropertyValues, Quoting, Result, Row, RowMetadata, SettableValue, SimpleTypeHolder,
    SqlIdentifier, SqlType, TypeInfo, Value,
};
pub use relmap_macros::Entity;
pub use relmap_query::{
    Assignment, BindingKind, ColumnRef, Comparator, Criteria, DeleteSpec, ExpressionQuery,
    InsertSpec, NamedParameterExpander, NullsOrder, Order, OrderDirection, ParameterBinding,
    ParameterProvider, ParsedSql, ParsedSqlCache, PreparedOperation, SelectSpec, Sort,
    StatementMapper, Update, UpdateSpec,
};

/// Prelude for glob imports.
pub mod prelude {
    pub use crate::{
        Criteria, Cx, DataAccessStrategy, DeleteSpec, Dialect, Entity, Error, InsertSpec, Order,
        Outcome, PreparedOperation, Result, Row, RowMapper, RowMetadata, RowSource, SelectSpec,
        SettableValue, Sort, SqlIdentifier, SqlType, Update, UpdateSpec, Value, map_rows,
    };
}
