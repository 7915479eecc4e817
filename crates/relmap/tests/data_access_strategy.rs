use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;

use relmap::prelude::*;
use relmap::{
    BindId, BindRecorder, Binding, ColumnMap, ColumnMapRowMapper, Error, MappingErrorKind,
    OutboundRow, StrategyConfig,
};

#[derive(Entity, Debug, Clone, PartialEq)]
#[relmap(table = "legoset")]
struct LegoSet {
    #[relmap(id)]
    id: Option<i64>,
    name: String,
    #[relmap(column = "manual_id")]
    manual: Option<i32>,
    tags: Vec<String>,
}

#[derive(Entity, Debug, Clone, PartialEq)]
#[relmap(table = "probe")]
struct Probe {
    #[relmap(id)]
    id: i64,
    readings: Vec<i32>,
}

fn falcon() -> LegoSet {
    LegoSet {
        id: Some(75192),
        name: "Millennium Falcon".into(),
        manual: Some(3),
        tags: vec!["star".into(), "wars".into()],
    }
}

fn postgres() -> DataAccessStrategy {
    DataAccessStrategy::builder(Dialect::postgres())
        .register::<LegoSet>()
        .build()
        .expect("build postgres strategy")
}

/// What a driver would hand back after storing `row`.
fn driver_row(row: &OutboundRow) -> (Row, RowMetadata) {
    let names: Vec<&str> = row.columns().map(SqlIdentifier::reference).collect();
    let metadata = RowMetadata::from_names(names);
    let values = row
        .iter()
        .map(|(_, v)| v.value().cloned().unwrap_or(Value::Null))
        .collect();
    (
        Row::with_metadata(Arc::new(metadata.clone()), values),
        metadata,
    )
}

fn recorded(op: &PreparedOperation) -> Vec<Binding> {
    let mut target = BindRecorder::new();
    op.bind_to(&mut target);
    target.bindings().to_vec()
}

fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

fn marker_count(sql: &str) -> usize {
    Regex::new(r"\$\d+")
        .expect("marker pattern")
        .find_iter(sql)
        .count()
}

#[test]
fn simple_update_binds_one_value() {
    let strategy = postgres();
    let mapper = strategy.get_statement_mapper();
    let op = mapper
        .map_update(&mapper.create_update("foo", Update::update("column", "value")))
        .unwrap();

    assert_eq!(op.sql(), "UPDATE foo SET column = $1");
    assert_eq!(
        recorded(&op),
        vec![Binding::Value(BindId::Index(0), text("value"))]
    );
}

#[test]
fn update_with_criterion_binds_in_marker_order() {
    let strategy = postgres();
    let mapper = strategy.get_statement_mapper();
    let spec = mapper
        .create_update("foo", Update::update("column", "value"))
        .with_criteria(Criteria::where_("foo").is("bar"));
    let op = mapper.map_update(&spec).unwrap();

    assert_eq!(op.sql(), "UPDATE foo SET column = $1 WHERE foo.foo = $2");
    assert_eq!(
        recorded(&op),
        vec![
            Binding::Value(BindId::Index(0), text("value")),
            Binding::Value(BindId::Index(1), text("bar")),
        ]
    );
}

#[test]
fn array_columns_fail_on_dialects_without_arrays() {
    let strategy = DataAccessStrategy::new(Dialect::mysql());
    let err = strategy
        .get_outbound_row(&Probe {
            id: 1,
            readings: vec![1, 2, 3],
        })
        .unwrap_err();

    match err {
        Error::Unsupported(e) => {
            assert_eq!(e.feature, "array columns");
            assert_eq!(e.dialect, "mysql");
        }
        other => panic!("expected unsupported feature, got {other:?}"),
    }
}

#[test]
fn empty_collection_is_an_empty_typed_array_value() {
    let strategy = postgres();
    let mut set = falcon();
    set.tags.clear();
    let row = strategy.get_outbound_row(&set).unwrap();

    let tags = row.get(&SqlIdentifier::unquoted("tags")).unwrap();
    assert!(!tags.has_value());
    assert_eq!(tags.sql_type(), &SqlType::array_of(SqlType::Text));
    assert_eq!(tags.sql_type().dimensions(), 1);
}

#[test]
fn repeated_names_get_one_positional_marker_each() {
    let strategy = postgres();
    let provider: HashMap<String, SettableValue> = HashMap::from([(
        "name".to_string(),
        SettableValue::from_value(text("x"), SqlType::Text),
    )]);
    let op = strategy
        .process_named_parameters("SELECT * FROM t WHERE a = :name AND b = :name", &provider)
        .unwrap();

    assert_eq!(op.sql(), "SELECT * FROM t WHERE a = $1 AND b = $2");
    assert_eq!(
        recorded(&op),
        vec![
            Binding::Value(BindId::Index(0), text("x")),
            Binding::Value(BindId::Index(1), text("x")),
        ]
    );
}

#[test]
fn missing_named_parameter_names_the_parameter_and_query() {
    let strategy = postgres();
    let query = "SELECT * FROM t WHERE a = :name AND b = :name";
    let nothing = |_: usize, _: &str| -> Option<SettableValue> { None };
    let err = strategy.process_named_parameters(query, &nothing).unwrap_err();

    match &err {
        Error::InvalidParameter(e) => {
            assert_eq!(e.name, "name");
            assert_eq!(e.query.as_deref(), Some(query));
        }
        other => panic!("expected invalid parameter, got {other:?}"),
    }
    assert!(err.to_string().contains(
        "No parameter specified for [name] in query [SELECT * FROM t WHERE a = :name AND b = :name]"
    ));
}

#[test]
fn entities_survive_a_trip_through_the_driver() {
    let strategy = postgres();
    let set = falcon();
    let outbound = strategy.get_outbound_row(&set).unwrap();
    let (row, metadata) = driver_row(&outbound);

    let read = strategy
        .get_row_mapper::<LegoSet>()
        .map_row(&row, &metadata)
        .unwrap();
    assert_eq!(read, set);
}

#[test]
fn rendered_markers_match_the_bind_plan() {
    let strategy = postgres();
    let mapper = strategy.get_statement_mapper();
    let table = strategy.get_table_name::<LegoSet>().unwrap();

    let select = mapper
        .map_select(
            &mapper
                .create_select(table.clone())
                .with_projection(strategy.get_all_columns::<LegoSet>().unwrap())
                .with_criteria(
                    Criteria::where_("name")
                        .like("Millennium%")
                        .and("manual_id")
                        .in_list([1, 2, 3])
                        .or("id")
                        .between(1i64, 10i64),
                )
                .limit(5),
        )
        .unwrap();

    let mut without_id = falcon();
    without_id.id = None;
    let insert = mapper
        .map_insert(&InsertSpec::from_row(
            table.clone(),
            strategy.get_outbound_row(&without_id).unwrap(),
        ))
        .unwrap();

    let update = mapper
        .map_update(
            &mapper
                .create_update(
                    table.clone(),
                    Update::update("name", "Slave I").set_null("manual_id", SqlType::Integer),
                )
                .with_criteria(Criteria::where_("id").is(75192i64)),
        )
        .unwrap();

    let delete = mapper
        .map_delete(
            &mapper
                .create_delete(table)
                .with_criteria(Criteria::where_("id").not(0i64).and("name").is_not_null()),
        )
        .unwrap();

    for op in [&select, &insert, &update, &delete] {
        assert_eq!(marker_count(op.sql()), op.bindings().len(), "{}", op.sql());
        assert_eq!(recorded(op).len(), op.bindings().len());
    }
}

#[test]
fn rendering_is_deterministic_across_mappers() {
    let render = || {
        let strategy = postgres();
        let mapper = strategy.get_statement_mapper();
        let spec = mapper
            .create_select("legoset")
            .with_projection(["id", "name"])
            .with_criteria(Criteria::where_("name").is("x").or("id").greater_than(3i64))
            .with_sort(Order::desc("name"))
            .limit(10)
            .offset(20);
        mapper.map_select(&spec).unwrap().sql().to_string()
    };
    assert_eq!(render(), render());
}

#[test]
fn named_markers_are_shared_per_distinct_name() {
    let strategy = DataAccessStrategy::new(Dialect::sql_server());
    let provider = |_: usize, name: &str| -> Option<SettableValue> {
        (name == "name").then(|| SettableValue::from_value(text("x"), SqlType::Text))
    };
    let op = strategy
        .process_named_parameters("SELECT * FROM t WHERE a = :name AND b = :name", &provider)
        .unwrap();

    assert_eq!(op.sql(), "SELECT * FROM t WHERE a = @P0_name AND b = @P0_name");
    assert_eq!(
        recorded(&op),
        vec![Binding::Value(BindId::Name("P0_name".into()), text("x"))]
    );
}

#[test]
fn column_maps_ignore_case_and_keep_order() {
    let strategy = postgres();
    let metadata = RowMetadata::from_names(["Id", "NAME", "manual_id"]);
    let row = Row::with_metadata(
        Arc::new(metadata.clone()),
        vec![Value::BigInt(1), text("Falcon"), Value::Null],
    );

    let map = strategy
        .column_map_row_mapper()
        .map_row(&row, &metadata)
        .unwrap();
    assert_eq!(map.keys().collect::<Vec<_>>(), vec!["Id", "NAME", "manual_id"]);
    assert_eq!(map.get("id"), Some(&Value::BigInt(1)));
    assert_eq!(map.get("name"), Some(&text("Falcon")));
    assert_eq!(map.get("MANUAL_ID"), Some(&Value::Null));

    let shared: &dyn RowMapper<ColumnMap> = &ColumnMapRowMapper;
    assert_eq!(shared.map_row(&row, &metadata).unwrap(), map);
}

#[test]
fn populate_id_fills_generated_keys_only_once() {
    let strategy = postgres();
    let mut set = falcon();
    set.id = None;

    let generated = RowMetadata::from_names(["ID"]);
    let row = Row::with_metadata(Arc::new(generated.clone()), vec![Value::BigInt(42)]);
    let populated = strategy.populate_id_if_necessary(set.clone())(&row, &generated).unwrap();
    assert_eq!(populated.id, Some(42));

    let again = strategy.populate_id_if_necessary(populated.clone())(&row, &generated).unwrap();
    assert_eq!(again, populated);
}

#[test]
fn populate_id_without_id_columns_returns_the_instance() {
    let strategy = postgres();
    let mut set = falcon();
    set.id = None;

    let metadata = RowMetadata::from_names(["name", "manual_id"]);
    let row = Row::with_metadata(
        Arc::new(metadata.clone()),
        vec![text("other"), Value::Int(9)],
    );
    let unchanged = strategy.populate_id_if_necessary(set.clone())(&row, &metadata).unwrap();
    assert_eq!(unchanged, set);
}

#[test]
fn reading_requires_non_nullable_columns() {
    let strategy = postgres();
    let metadata = RowMetadata::from_names(["id", "manual_id"]);
    let row = Row::with_metadata(
        Arc::new(metadata.clone()),
        vec![Value::BigInt(1), Value::Null],
    );

    let err = strategy
        .get_row_mapper::<LegoSet>()
        .map_row(&row, &metadata)
        .unwrap_err();
    assert!(err.is_mapping(MappingErrorKind::MissingColumn));
}

#[test]
fn configured_strategies_use_the_configured_dialect() {
    let config = StrategyConfig::from_json(r#"{"dialect":"sql_server"}"#).unwrap();
    let strategy = DataAccessStrategy::from_config(&config)
        .register::<LegoSet>()
        .build()
        .unwrap();

    assert_eq!(strategy.dialect().name(), "sql_server");
    assert_eq!(
        strategy.to_sql(&SqlIdentifier::quoted("Name")),
        "[Name]"
    );
    assert_eq!(
        strategy
            .get_all_columns::<LegoSet>()
            .unwrap()
            .iter()
            .map(SqlIdentifier::reference)
            .collect::<Vec<_>>(),
        vec!["id", "name", "manual_id", "tags"]
    );
}
