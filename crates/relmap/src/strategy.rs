//! The data-access strategy.
//!
//! A [`DataAccessStrategy`] is built once per dialect and shared by every
//! caller. It owns the mapping context, the conversion registry, the
//! statement mapper and the parsed-template cache, and exposes the
//! operations a repository layer needs: column lists, outbound rows, row
//! mappers, statement mapping and named-parameter expansion.

use std::any::TypeId;
use std::sync::{Arc, Mutex, PoisonError};

use relmap_core::{
    Converter, CustomConversions, Dialect, Entity, MappingContext, OutboundRow, Result, Row,
    RowMetadata, SettableValue, SqlIdentifier,
};
use relmap_query::cache::DEFAULT_CAPACITY;
use relmap_query::{
    ExpressionQuery, ExpressionQueryCache, NamedParameterExpander, ParameterProvider,
    ParsedSqlCache, PreparedOperation, StatementMapper,
};

use crate::config::StrategyConfig;
use crate::convert::EntityConverter;
use crate::row_mapper::{ColumnMapRowMapper, EntityRowMapper};

type Registration = fn(&MappingContext) -> Result<()>;

/// Builder for [`DataAccessStrategy`].
#[derive(Debug)]
pub struct DataAccessStrategyBuilder {
    dialect: Dialect,
    converters: Vec<Arc<dyn Converter>>,
    mapping_context: Option<Arc<MappingContext>>,
    registrations: Vec<Registration>,
    parsed_sql_cache_capacity: usize,
}

impl DataAccessStrategyBuilder {
    fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            converters: Vec::new(),
            mapping_context: None,
            registrations: Vec::new(),
            parsed_sql_cache_capacity: DEFAULT_CAPACITY,
        }
    }

    /// Add a user converter. User converters run before the dialect's
    /// store converters, in registration order.
    #[must_use]
    pub fn with_converter(mut self, converter: Arc<dyn Converter>) -> Self {
        self.converters.push(converter);
        self
    }

    /// Share an existing mapping context.
    #[must_use]
    pub fn with_mapping_context(mut self, context: Arc<MappingContext>) -> Self {
        self.mapping_context = Some(context);
        self
    }

    /// Resolve the entity `T` when the strategy is built.
    #[must_use]
    pub fn register<T: Entity>(mut self) -> Self {
        self.registrations.push(MappingContext::register::<T>);
        self
    }

    /// Number of parsed named-parameter templates to keep (0 disables).
    #[must_use]
    pub fn parsed_sql_cache_capacity(mut self, capacity: usize) -> Self {
        self.parsed_sql_cache_capacity = capacity;
        self
    }

    /// Build the strategy, resolving registered entities.
    pub fn build(self) -> Result<DataAccessStrategy> {
        let mapping_context = self.mapping_context.unwrap_or_default();
        for register in &self.registrations {
            register(&mapping_context)?;
        }

        let strategy = DataAccessStrategy::assemble(
            self.dialect,
            self.converters,
            mapping_context,
            self.parsed_sql_cache_capacity,
        );
        tracing::debug!(
            dialect = strategy.dialect.name(),
            entities = strategy.mapping_context.len(),
            parsed_sql_cache_capacity = self.parsed_sql_cache_capacity,
            "Built data access strategy"
        );
        Ok(strategy)
    }
}

/// Dialect-aware entry point for mapping entities to statements and rows.
///
/// The strategy is `Send + Sync`; share it behind an `Arc`.
///
/// # Example
///
/// ```
/// use relmap::{DataAccessStrategy, Dialect, SettableValue, SqlType, Value};
/// use std::collections::HashMap;
///
/// let strategy = DataAccessStrategy::new(Dialect::postgres());
/// let mut params = HashMap::new();
/// params.insert(
///     "id".to_string(),
///     SettableValue::from_value(Value::BigInt(1), SqlType::BigInt),
/// );
/// let op = strategy
///     .process_named_parameters("SELECT * FROM person WHERE id = :id", &params)
///     .unwrap();
/// assert_eq!(op.sql(), "SELECT * FROM person WHERE id = $1");
/// ```
#[derive(Debug)]
pub struct DataAccessStrategy {
    dialect: Dialect,
    mapping_context: Arc<MappingContext>,
    converter: Arc<EntityConverter>,
    statement_mapper: StatementMapper,
    expander: NamedParameterExpander,
    parsed_sql: Mutex<ParsedSqlCache>,
    expression_queries: Mutex<ExpressionQueryCache>,
}

impl DataAccessStrategy {
    /// A strategy with no user converters and default settings.
    pub fn new(dialect: Dialect) -> Self {
        Self::assemble(
            dialect,
            Vec::new(),
            Arc::new(MappingContext::new()),
            DEFAULT_CAPACITY,
        )
    }

    fn assemble(
        dialect: Dialect,
        converters: Vec<Arc<dyn Converter>>,
        mapping_context: Arc<MappingContext>,
        parsed_sql_cache_capacity: usize,
    ) -> Self {
        let conversions = Arc::new(CustomConversions::new(
            converters,
            dialect.converters().to_vec(),
            dialect.simple_type_holder().clone(),
        ));
        Self {
            converter: Arc::new(EntityConverter::new(
                Arc::clone(&mapping_context),
                Arc::clone(&conversions),
                dialect.clone(),
            )),
            statement_mapper: StatementMapper::new(dialect.clone()).with_conversions(conversions),
            expander: NamedParameterExpander::new(dialect.bind_markers_factory().clone()),
            parsed_sql: Mutex::new(ParsedSqlCache::new(parsed_sql_cache_capacity)),
            expression_queries: Mutex::new(ExpressionQueryCache::new(parsed_sql_cache_capacity)),
            mapping_context,
            dialect,
        }
    }

    pub fn builder(dialect: Dialect) -> DataAccessStrategyBuilder {
        DataAccessStrategyBuilder::new(dialect)
    }

    /// A builder preloaded from configuration.
    pub fn from_config(config: &StrategyConfig) -> DataAccessStrategyBuilder {
        Self::builder(config.dialect.dialect())
            .parsed_sql_cache_capacity(config.parsed_sql_cache_capacity)
    }

    /// Columns to select for `T`, in declaration order.
    ///
    /// The entity is resolved on first use, so the result does not depend
    /// on whether `T` was registered up front.
    pub fn get_all_columns<T: Entity>(&self) -> Result<Vec<SqlIdentifier>> {
        let entity = self.mapping_context.required_persistent_entity::<T>()?;
        Ok(entity.columns().cloned().collect())
    }

    /// Columns for a type known only by id: the entity's columns when the
    /// context has resolved it, `*` otherwise.
    pub fn get_all_columns_for(&self, type_id: TypeId) -> Vec<SqlIdentifier> {
        match self.mapping_context.persistent_entity_for(type_id) {
            Some(entity) => entity.columns().cloned().collect(),
            None => vec![SqlIdentifier::unquoted("*")],
        }
    }

    /// Identifier columns of `T` in declaration order. May be empty.
    pub fn get_identifier_columns<T: Entity>(&self) -> Result<Vec<SqlIdentifier>> {
        let entity = self.mapping_context.required_persistent_entity::<T>()?;
        Ok(entity.id_properties().map(|p| p.column().clone()).collect())
    }

    /// Outbound row for `entity`, with collection-like properties coerced
    /// to the dialect's array representation.
    pub fn get_outbound_row<T: Entity>(&self, entity: &T) -> Result<OutboundRow> {
        self.converter.write_outbound_row(entity)
    }

    pub fn get_row_mapper<T: Entity>(&self) -> EntityRowMapper<T> {
        EntityRowMapper::new(Arc::clone(&self.converter))
    }

    pub fn column_map_row_mapper(&self) -> ColumnMapRowMapper {
        ColumnMapRowMapper
    }

    pub fn get_table_name<T: Entity>(&self) -> Result<SqlIdentifier> {
        let entity = self.mapping_context.required_persistent_entity::<T>()?;
        Ok(entity.table_name().clone())
    }

    pub fn get_statement_mapper(&self) -> &StatementMapper {
        &self.statement_mapper
    }

    /// Expand the named placeholders of `sql` into dialect bind markers.
    ///
    /// The provider is asked once per distinct name, in order of first
    /// appearance. A name without a value fails the whole expansion.
    pub fn process_named_parameters(
        &self,
        sql: &str,
        provider: &dyn ParameterProvider,
    ) -> Result<PreparedOperation> {
        let parsed = self
            .parsed_sql
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_or_parse(sql);
        self.expander.expand(&parsed, provider)
    }

    /// The expression rewrite of `query`, cached by source text.
    pub fn get_expression_query(&self, query: &str) -> Arc<ExpressionQuery> {
        self.expression_queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_or_create(query)
    }

    /// Render an identifier with the dialect's quoting rules.
    pub fn to_sql(&self, identifier: &SqlIdentifier) -> String {
        self.dialect.to_sql(identifier)
    }

    /// Coerce a value for binding: converters are applied and arrays bound
    /// to array slots take the dialect's array representation.
    pub fn get_bind_value(&self, value: SettableValue) -> Result<SettableValue> {
        self.converter.bind_value(value)
    }

    /// See [`EntityConverter::populate_id_if_necessary`].
    pub fn populate_id_if_necessary<T: Entity + Clone>(
        &self,
        instance: T,
    ) -> impl Fn(&Row, &RowMetadata) -> Result<T> + Send + Sync + 'static {
        self.converter.populate_id_if_necessary(instance)
    }

    pub fn converter(&self) -> &Arc<EntityConverter> {
        &self.converter
    }

    pub fn mapping_context(&self) -> &Arc<MappingContext> {
        &self.mapping_context
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// Number of cached parsed templates.
    pub fn parsed_sql_cache_len(&self) -> usize {
        self.parsed_sql
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DialectName;
    use crate::row_mapper::RowMapper;
    use relmap_core::{SqlType, Value};

    #[derive(Debug, Clone, PartialEq, relmap_macros::Entity)]
    #[relmap(table = "person")]
    struct Person {
        #[relmap(id)]
        id: Option<i64>,
        #[relmap(column = "firstname")]
        first_name: String,
    }

    #[test]
    fn unknown_type_ids_select_star() {
        let strategy = DataAccessStrategy::new(Dialect::postgres());
        assert_eq!(
            strategy.get_all_columns_for(TypeId::of::<String>()),
            vec![SqlIdentifier::unquoted("*")]
        );
    }

    #[test]
    fn entity_columns_do_not_depend_on_call_order() {
        let strategy = DataAccessStrategy::new(Dialect::postgres());
        let before = strategy.get_all_columns::<Person>().unwrap();
        strategy.get_table_name::<Person>().unwrap();
        let after = strategy.get_all_columns::<Person>().unwrap();

        assert_eq!(
            before,
            vec![SqlIdentifier::unquoted("id"), SqlIdentifier::unquoted("firstname")]
        );
        assert_eq!(before, after);
        assert_eq!(strategy.get_all_columns_for(TypeId::of::<Person>()), after);
    }

    #[test]
    fn registered_entities_list_their_columns() {
        let strategy = DataAccessStrategy::builder(Dialect::postgres())
            .register::<Person>()
            .build()
            .unwrap();
        let columns: Vec<_> = strategy
            .get_all_columns::<Person>()
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(columns, vec!["id", "firstname"]);
        assert_eq!(
            strategy.get_identifier_columns::<Person>().unwrap(),
            vec![SqlIdentifier::unquoted("id")]
        );
        assert_eq!(
            strategy.get_table_name::<Person>().unwrap(),
            SqlIdentifier::unquoted("person")
        );
    }

    #[test]
    fn first_use_makes_an_entity_known() {
        let strategy = DataAccessStrategy::new(Dialect::postgres());
        strategy
            .get_outbound_row(&Person {
                id: None,
                first_name: "Walter".into(),
            })
            .unwrap();
        assert_eq!(strategy.get_all_columns_for(TypeId::of::<Person>()).len(), 2);
    }

    #[test]
    fn parsed_templates_are_cached() {
        let strategy = DataAccessStrategy::new(Dialect::postgres());
        let provider = |_: usize, _: &str| -> Option<SettableValue> {
            Some(SettableValue::from_value(Value::BigInt(1), SqlType::BigInt))
        };
        strategy
            .process_named_parameters("SELECT * FROM person WHERE id = :id", &provider)
            .unwrap();
        strategy
            .process_named_parameters("SELECT * FROM person WHERE id = :id", &provider)
            .unwrap();
        assert_eq!(strategy.parsed_sql_cache_len(), 1);
    }

    #[test]
    fn expression_queries_are_rewritten_once_per_source() {
        let strategy = DataAccessStrategy::new(Dialect::postgres());
        let sql = "SELECT * FROM person WHERE firstname = :#{name}";
        let first = strategy.get_expression_query(sql);
        let second = strategy.get_expression_query(sql);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.bindings().len(), 1);
    }

    #[test]
    fn from_config_applies_settings() {
        let config = StrategyConfig::new(DialectName::Sqlite).parsed_sql_cache_capacity(0);
        let strategy = DataAccessStrategy::from_config(&config).build().unwrap();
        assert_eq!(strategy.dialect().name(), "sqlite");

        let provider = |_: usize, _: &str| -> Option<SettableValue> {
            Some(SettableValue::from_value(Value::Int(1), SqlType::Integer))
        };
        let op = strategy
            .process_named_parameters("SELECT :a", &provider)
            .unwrap();
        assert_eq!(op.sql(), "SELECT ?1");
        assert_eq!(strategy.parsed_sql_cache_len(), 0);
    }

    #[test]
    fn row_mapper_reads_entities() {
        let strategy = DataAccessStrategy::new(Dialect::postgres());
        let meta = RowMetadata::from_names(["ID", "FIRSTNAME"]);
        let row = Row::with_metadata(
            Arc::new(meta.clone()),
            vec![Value::BigInt(3), Value::Text("Jesse".into())],
        );
        let person = strategy
            .get_row_mapper::<Person>()
            .map_row(&row, &meta)
            .unwrap();
        assert_eq!(
            person,
            Person {
                id: Some(3),
                first_name: "Jesse".into()
            }
        );
    }

    #[test]
    fn strategy_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DataAccessStrategy>();
        assert_send_sync::<EntityRowMapper<Person>>();
    }
}
