//! Statement specs and the statement mapper.
//!
//! Specs are small immutable builders describing a SELECT, INSERT, UPDATE
//! or DELETE. [`StatementMapper`] turns a spec into a [`PreparedOperation`]:
//! it allocates fresh bind markers, lowers the criteria into a condition
//! tree (replacing every value with a marker and recording it in the bind
//! plan), then renders the tree for the dialect.

use std::sync::Arc;

use relmap_core::{
    BindMarker, BindMarkers, CustomConversions, Dialect, Error, OutboundRow, Result,
    SettableValue, SqlIdentifier, SqlType, Value,
};

use crate::clause::Sort;
use crate::criteria::{ColumnRef, Combinator, Comparator, Condition as Criterion, Criteria, CriteriaKind, Operand};
use crate::operation::PreparedOperation;
use crate::render::{
    AssignedValue, Column, Condition, DeleteStatement, InsertStatement, OrderByTerm,
    SelectStatement, SqlRenderer, Statement, UpdateStatement,
};

/// SELECT spec.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectSpec {
    table: SqlIdentifier,
    projection: Vec<SqlIdentifier>,
    criteria: Criteria,
    sort: Sort,
    limit: Option<u64>,
    offset: Option<u64>,
    distinct: bool,
}

impl SelectSpec {
    pub fn new(table: impl Into<SqlIdentifier>) -> Self {
        Self {
            table: table.into(),
            projection: Vec::new(),
            criteria: Criteria::empty(),
            sort: Sort::unsorted(),
            limit: None,
            offset: None,
            distinct: false,
        }
    }

    /// Columns to select; an empty projection selects `table.*`.
    #[must_use]
    pub fn with_projection<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<SqlIdentifier>,
    {
        self.projection.extend(columns.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_criteria(mut self, criteria: Criteria) -> Self {
        self.criteria = criteria;
        self
    }

    #[must_use]
    pub fn with_sort(mut self, sort: impl Into<Sort>) -> Self {
        self.sort = sort.into();
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn table(&self) -> &SqlIdentifier {
        &self.table
    }

    pub fn projection(&self) -> &[SqlIdentifier] {
        &self.projection
    }

    pub fn criteria(&self) -> &Criteria {
        &self.criteria
    }
}

/// INSERT spec.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertSpec {
    table: SqlIdentifier,
    assignments: OutboundRow,
}

impl InsertSpec {
    pub fn new(table: impl Into<SqlIdentifier>) -> Self {
        Self {
            table: table.into(),
            assignments: OutboundRow::new(),
        }
    }

    /// Insert every column of an outbound row.
    pub fn from_row(table: impl Into<SqlIdentifier>, row: OutboundRow) -> Self {
        Self {
            table: table.into(),
            assignments: row,
        }
    }

    #[must_use]
    pub fn with_column(mut self, column: impl Into<SqlIdentifier>, value: SettableValue) -> Self {
        self.assignments.put(column, value);
        self
    }

    pub fn table(&self) -> &SqlIdentifier {
        &self.table
    }

    pub fn assignments(&self) -> &OutboundRow {
        &self.assignments
    }
}

/// Value assigned by an UPDATE.
#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    /// Bound through a marker; empty values bind as typed NULL
    Value(SettableValue),
    /// Rendered as a literal `NULL`
    Null,
}

/// SET clause assignments, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    assignments: Vec<(SqlIdentifier, Assignment)>,
}

impl Update {
    /// Start with a single assignment.
    pub fn update(column: impl Into<SqlIdentifier>, value: impl Into<Value>) -> Self {
        Update::default().set(column, value)
    }

    /// Assign a value; a NULL value renders as a literal `NULL`.
    #[must_use]
    pub fn set(self, column: impl Into<SqlIdentifier>, value: impl Into<Value>) -> Self {
        let assignment = match value.into() {
            Value::Null => Assignment::Null,
            value => {
                let sql_type = value.sql_type().unwrap_or(SqlType::Text);
                Assignment::Value(SettableValue::from_value(value, sql_type))
            }
        };
        self.assign(column.into(), assignment)
    }

    /// Assign a typed value; an empty value binds as a typed NULL.
    #[must_use]
    pub fn set_value(self, column: impl Into<SqlIdentifier>, value: SettableValue) -> Self {
        self.assign(column.into(), Assignment::Value(value))
    }

    /// Assign a typed NULL.
    #[must_use]
    pub fn set_null(self, column: impl Into<SqlIdentifier>, sql_type: SqlType) -> Self {
        self.set_value(column, SettableValue::empty(sql_type))
    }

    fn assign(mut self, column: SqlIdentifier, assignment: Assignment) -> Self {
        if let Some(slot) = self.assignments.iter_mut().find(|(c, _)| *c == column) {
            slot.1 = assignment;
        } else {
            self.assignments.push((column, assignment));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn assignments(&self) -> &[(SqlIdentifier, Assignment)] {
        &self.assignments
    }
}

impl From<OutboundRow> for Update {
    fn from(row: OutboundRow) -> Self {
        row.into_iter()
            .fold(Update::default(), |update, (column, value)| {
                update.set_value(column, value)
            })
    }
}

/// UPDATE spec.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateSpec {
    table: SqlIdentifier,
    update: Update,
    criteria: Criteria,
}

impl UpdateSpec {
    pub fn new(table: impl Into<SqlIdentifier>, update: Update) -> Self {
        Self {
            table: table.into(),
            update,
            criteria: Criteria::empty(),
        }
    }

    #[must_use]
    pub fn with_criteria(mut self, criteria: Criteria) -> Self {
        self.criteria = criteria;
        self
    }

    pub fn table(&self) -> &SqlIdentifier {
        &self.table
    }

    pub fn update(&self) -> &Update {
        &self.update
    }
}

/// DELETE spec.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteSpec {
    table: SqlIdentifier,
    criteria: Criteria,
}

impl DeleteSpec {
    pub fn new(table: impl Into<SqlIdentifier>) -> Self {
        Self {
            table: table.into(),
            criteria: Criteria::empty(),
        }
    }

    #[must_use]
    pub fn with_criteria(mut self, criteria: Criteria) -> Self {
        self.criteria = criteria;
        self
    }

    pub fn table(&self) -> &SqlIdentifier {
        &self.table
    }
}

/// Lowers specs into prepared operations for one dialect.
#[derive(Debug, Clone)]
pub struct StatementMapper {
    dialect: Dialect,
    conversions: Arc<CustomConversions>,
}

/// Per-statement state: the marker sequence and the bind plan so far.
struct BindContext<'a> {
    markers: BindMarkers,
    plan: Vec<(BindMarker, SettableValue)>,
    conversions: &'a CustomConversions,
}

impl BindContext<'_> {
    /// Bind a typed value, keeping its declared type.
    fn bind(&mut self, hint: &SqlIdentifier, value: SettableValue) -> Result<BindMarker> {
        let sql_type = value.sql_type().clone();
        let value = match value.into_value() {
            Some(v) => SettableValue::from_value(self.conversions.write_value(v)?, sql_type),
            None => SettableValue::empty(sql_type),
        };
        Ok(self.push(hint, value))
    }

    /// Bind a criteria value; the type follows the converted value.
    fn bind_value(&mut self, hint: &SqlIdentifier, value: Value) -> Result<BindMarker> {
        let value = self.conversions.write_value(value)?;
        let sql_type = value.sql_type().unwrap_or(SqlType::Text);
        Ok(self.push(hint, SettableValue::from_value(value, sql_type)))
    }

    fn push(&mut self, hint: &SqlIdentifier, value: SettableValue) -> BindMarker {
        let marker = self.markers.next_named(hint.reference());
        self.plan.push((marker.clone(), value));
        marker
    }
}

impl StatementMapper {
    /// A mapper that applies only the dialect's store converters.
    pub fn new(dialect: Dialect) -> Self {
        let conversions = CustomConversions::new(
            Vec::new(),
            dialect.converters().to_vec(),
            dialect.simple_type_holder().clone(),
        );
        Self {
            dialect,
            conversions: Arc::new(conversions),
        }
    }

    /// Use a specific converter registry for bound values.
    #[must_use]
    pub fn with_conversions(mut self, conversions: Arc<CustomConversions>) -> Self {
        self.conversions = conversions;
        self
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    pub fn create_select(&self, table: impl Into<SqlIdentifier>) -> SelectSpec {
        SelectSpec::new(table)
    }

    pub fn create_insert(&self, table: impl Into<SqlIdentifier>) -> InsertSpec {
        InsertSpec::new(table)
    }

    pub fn create_update(&self, table: impl Into<SqlIdentifier>, update: Update) -> UpdateSpec {
        UpdateSpec::new(table, update)
    }

    pub fn create_delete(&self, table: impl Into<SqlIdentifier>) -> DeleteSpec {
        DeleteSpec::new(table)
    }

    fn context(&self) -> BindContext<'_> {
        BindContext {
            markers: self.dialect.bind_markers_factory().create(),
            plan: Vec::new(),
            conversions: &self.conversions,
        }
    }

    fn finish(&self, statement: &Statement, ctx: BindContext<'_>) -> Result<PreparedOperation> {
        let sql = SqlRenderer::new(&self.dialect).render(statement)?;
        tracing::trace!(sql = %sql, bindings = ctx.plan.len(), "Mapped statement");
        Ok(PreparedOperation::new(sql, ctx.plan))
    }

    #[tracing::instrument(level = "debug", skip(self, spec), fields(table = %spec.table))]
    pub fn map_select(&self, spec: &SelectSpec) -> Result<PreparedOperation> {
        let mut ctx = self.context();
        let table = &spec.table;
        let projection = spec
            .projection
            .iter()
            .map(|column| Column::qualified(table.clone(), column.clone()))
            .collect();
        let condition = map_criteria(&spec.criteria, table, &mut ctx)?;
        let order_by = spec
            .sort
            .orders()
            .iter()
            .map(|order| OrderByTerm {
                column: qualify(&order.column, table),
                suffix: order.suffix_sql(),
            })
            .collect();

        let statement = Statement::Select(SelectStatement {
            distinct: spec.distinct,
            projection,
            from: table.clone(),
            condition,
            order_by,
            limit: spec.limit,
            offset: spec.offset,
        });
        self.finish(&statement, ctx)
    }

    #[tracing::instrument(level = "debug", skip(self, spec), fields(table = %spec.table))]
    pub fn map_insert(&self, spec: &InsertSpec) -> Result<PreparedOperation> {
        let mut ctx = self.context();
        let mut columns = Vec::with_capacity(spec.assignments.len());
        let mut values = Vec::with_capacity(spec.assignments.len());
        for (column, value) in spec.assignments.iter() {
            values.push(ctx.bind(column, value.clone())?);
            columns.push(column.clone());
        }

        let statement = Statement::Insert(InsertStatement {
            table: spec.table.clone(),
            columns,
            values,
        });
        self.finish(&statement, ctx)
    }

    #[tracing::instrument(level = "debug", skip(self, spec), fields(table = %spec.table))]
    pub fn map_update(&self, spec: &UpdateSpec) -> Result<PreparedOperation> {
        let mut ctx = self.context();
        let mut assignments = Vec::with_capacity(spec.update.assignments.len());
        for (column, assignment) in &spec.update.assignments {
            let value = match assignment {
                Assignment::Value(value) => AssignedValue::Marker(ctx.bind(column, value.clone())?),
                Assignment::Null => AssignedValue::Null,
            };
            assignments.push((column.clone(), value));
        }
        let condition = map_criteria(&spec.criteria, &spec.table, &mut ctx)?;

        let statement = Statement::Update(UpdateStatement {
            table: spec.table.clone(),
            assignments,
            condition,
        });
        self.finish(&statement, ctx)
    }

    #[tracing::instrument(level = "debug", skip(self, spec), fields(table = %spec.table))]
    pub fn map_delete(&self, spec: &DeleteSpec) -> Result<PreparedOperation> {
        let mut ctx = self.context();
        let condition = map_criteria(&spec.criteria, &spec.table, &mut ctx)?;

        let statement = Statement::Delete(DeleteStatement {
            table: spec.table.clone(),
            condition,
        });
        self.finish(&statement, ctx)
    }
}

/// Criteria columns are qualified with the statement table unless the
/// reference names its own table.
fn qualify(column: &ColumnRef, table: &SqlIdentifier) -> Column {
    let table = column.table.clone().unwrap_or_else(|| table.clone());
    Column::qualified(table, column.column.clone())
}

fn map_criteria(
    criteria: &Criteria,
    table: &SqlIdentifier,
    ctx: &mut BindContext<'_>,
) -> Result<Option<Condition>> {
    let mut result: Option<Condition> = None;
    for part in criteria.parts() {
        let condition = match &part.kind {
            CriteriaKind::Condition(criterion) => map_condition(criterion, table, ctx)?,
            CriteriaKind::Group(group) => match map_criteria(group, table, ctx)? {
                Some(inner) => inner.nest(),
                None => continue,
            },
        };
        result = Some(match (result, part.combinator) {
            (None, _) => condition,
            (Some(left), Combinator::Or) => left.or(condition),
            (Some(left), Combinator::And | Combinator::Initial) => left.and(condition),
        });
    }
    Ok(result)
}

fn map_condition(
    criterion: &Criterion,
    table: &SqlIdentifier,
    ctx: &mut BindContext<'_>,
) -> Result<Condition> {
    let column = qualify(&criterion.column, table);
    let hint = &criterion.column.column;
    let comparator = criterion.comparator;

    let condition = match (comparator, &criterion.operand) {
        (
            Comparator::IsNull | Comparator::IsNotNull | Comparator::IsTrue | Comparator::IsFalse,
            _,
        ) => Condition::Unary {
            column,
            op: comparator.as_str(),
        },
        (Comparator::In, Operand::List(values)) if values.is_empty() => Condition::Constant("1 = 0"),
        (Comparator::NotIn, Operand::List(values)) if values.is_empty() => {
            Condition::Constant("1 = 1")
        }
        (Comparator::In | Comparator::NotIn, Operand::List(values)) => {
            let markers = values
                .iter()
                .map(|v| ctx.bind_value(hint, v.clone()))
                .collect::<Result<Vec<_>>>()?;
            Condition::In {
                column,
                markers,
                negated: comparator == Comparator::NotIn,
            }
        }
        (Comparator::Between, Operand::Range(low, high)) => {
            if low.is_null() || high.is_null() {
                return Err(null_operand(&criterion.column, comparator));
            }
            let low = ctx.bind_value(hint, low.clone())?;
            let high = ctx.bind_value(hint, high.clone())?;
            Condition::Between { column, low, high }
        }
        (_, Operand::Single(value)) => {
            if value.is_null() {
                return Err(null_operand(&criterion.column, comparator));
            }
            Condition::Comparison {
                column,
                op: comparator.as_str(),
                marker: ctx.bind_value(hint, value.clone())?,
            }
        }
        (comparator, operand) => {
            return Err(Error::render(format!(
                "comparator {} cannot take operand {:?} for column {}",
                comparator.as_str(),
                operand,
                criterion.column
            )));
        }
    };
    Ok(condition)
}

fn null_operand(column: &ColumnRef, comparator: Comparator) -> Error {
    Error::render(format!(
        "cannot compare column {} using {} with NULL",
        column,
        comparator.as_str()
    ))
}
