//! SQL statement AST and renderer.
//!
//! The statement mapper lowers specs and criteria into these nodes, with
//! every value already replaced by a bind marker; the renderer only turns
//! nodes into text and never sees values.

use relmap_core::{BindMarker, Dialect, Error, RenderError, Result, SqlIdentifier};

/// A column, optionally table-qualified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub table: Option<SqlIdentifier>,
    pub name: SqlIdentifier,
}

impl Column {
    pub fn new(name: SqlIdentifier) -> Self {
        Self { table: None, name }
    }

    pub fn qualified(table: SqlIdentifier, name: SqlIdentifier) -> Self {
        Self {
            table: Some(table),
            name,
        }
    }
}

/// A boolean condition tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `column <op> marker`
    Comparison {
        column: Column,
        op: &'static str,
        marker: BindMarker,
    },
    /// `column IS NULL`, `column IS TRUE`, ...
    Unary { column: Column, op: &'static str },
    /// `column [NOT] IN (m1, m2, ...)`
    In {
        column: Column,
        markers: Vec<BindMarker>,
        negated: bool,
    },
    /// `column BETWEEN low AND high`
    Between {
        column: Column,
        low: BindMarker,
        high: BindMarker,
    },
    /// A constant predicate such as `1 = 0`
    Constant(&'static str),
    /// `(condition)`
    Nested(Box<Condition>),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
}

impl Condition {
    #[must_use]
    pub fn and(self, other: Condition) -> Condition {
        Condition::And(Box::new(self), Box::new(other))
    }

    #[must_use]
    pub fn or(self, other: Condition) -> Condition {
        Condition::Or(Box::new(self), Box::new(other))
    }

    #[must_use]
    pub fn nest(self) -> Condition {
        Condition::Nested(Box::new(self))
    }
}

/// One ORDER BY term; `suffix` carries direction and null handling.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByTerm {
    pub column: Column,
    pub suffix: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub distinct: bool,
    pub projection: Vec<Column>,
    pub from: SqlIdentifier,
    pub condition: Option<Condition>,
    pub order_by: Vec<OrderByTerm>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table: SqlIdentifier,
    pub columns: Vec<SqlIdentifier>,
    pub values: Vec<BindMarker>,
}

/// Right-hand side of a SET assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum AssignedValue {
    Marker(BindMarker),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub table: SqlIdentifier,
    pub assignments: Vec<(SqlIdentifier, AssignedValue)>,
    pub condition: Option<Condition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub table: SqlIdentifier,
    pub condition: Option<Condition>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStatement),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
}

/// Renders statements for one dialect.
#[derive(Debug, Clone, Copy)]
pub struct SqlRenderer<'a> {
    dialect: &'a Dialect,
}

impl<'a> SqlRenderer<'a> {
    pub fn new(dialect: &'a Dialect) -> Self {
        Self { dialect }
    }

    pub fn render(&self, statement: &Statement) -> Result<String> {
        match statement {
            Statement::Select(select) => Ok(self.render_select(select)),
            Statement::Insert(insert) => self.render_insert(insert),
            Statement::Update(update) => self.render_update(update),
            Statement::Delete(delete) => Ok(self.render_delete(delete)),
        }
    }

    fn identifier(&self, identifier: &SqlIdentifier) -> String {
        self.dialect.to_sql(identifier)
    }

    fn column(&self, column: &Column) -> String {
        match &column.table {
            Some(table) => format!("{}.{}", self.identifier(table), self.identifier(&column.name)),
            None => self.identifier(&column.name),
        }
    }

    fn render_select(&self, select: &SelectStatement) -> String {
        let mut sql = String::from("SELECT ");
        if select.distinct {
            sql.push_str("DISTINCT ");
        }
        if select.projection.is_empty() {
            sql.push_str(&format!("{}.*", self.identifier(&select.from)));
        } else {
            let columns: Vec<_> = select.projection.iter().map(|c| self.column(c)).collect();
            sql.push_str(&columns.join(", "));
        }
        sql.push_str(" FROM ");
        sql.push_str(&self.identifier(&select.from));

        if let Some(condition) = &select.condition {
            sql.push_str(" WHERE ");
            sql.push_str(&self.condition(condition));
        }

        let limit_style = self.dialect.limit_style();
        let paging = limit_style.render(select.limit, select.offset);
        if !select.order_by.is_empty() {
            let terms: Vec<_> = select
                .order_by
                .iter()
                .map(|term| format!("{}{}", self.column(&term.column), term.suffix))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms.join(", "));
        } else if paging.is_some() && limit_style.requires_order_by() {
            sql.push_str(" ORDER BY (SELECT 1)");
        }
        if let Some(paging) = paging {
            sql.push(' ');
            sql.push_str(&paging);
        }
        sql
    }

    fn render_insert(&self, insert: &InsertStatement) -> Result<String> {
        if insert.columns.is_empty() {
            return Err(render_error("INSERT requires at least one column", None));
        }
        if insert.columns.len() != insert.values.len() {
            return Err(render_error(
                format!(
                    "INSERT has {} columns but {} values",
                    insert.columns.len(),
                    insert.values.len()
                ),
                None,
            ));
        }
        let columns: Vec<_> = insert.columns.iter().map(|c| self.identifier(c)).collect();
        let values: Vec<_> = insert.values.iter().map(BindMarker::placeholder).collect();
        Ok(format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.identifier(&insert.table),
            columns.join(", "),
            values.join(", ")
        ))
    }

    fn render_update(&self, update: &UpdateStatement) -> Result<String> {
        if update.assignments.is_empty() {
            return Err(render_error(
                "UPDATE requires at least one assignment",
                Some(format!("UPDATE {} SET", self.identifier(&update.table))),
            ));
        }
        let assignments: Vec<_> = update
            .assignments
            .iter()
            .map(|(column, value)| {
                let value = match value {
                    AssignedValue::Marker(marker) => marker.placeholder(),
                    AssignedValue::Null => "NULL",
                };
                format!("{} = {}", self.identifier(column), value)
            })
            .collect();
        let mut sql = format!(
            "UPDATE {} SET {}",
            self.identifier(&update.table),
            assignments.join(", ")
        );
        if let Some(condition) = &update.condition {
            sql.push_str(" WHERE ");
            sql.push_str(&self.condition(condition));
        }
        Ok(sql)
    }

    fn render_delete(&self, delete: &DeleteStatement) -> String {
        let mut sql = format!("DELETE FROM {}", self.identifier(&delete.table));
        if let Some(condition) = &delete.condition {
            sql.push_str(" WHERE ");
            sql.push_str(&self.condition(condition));
        }
        sql
    }

    /// Render a condition tree, children left to right.
    pub fn condition(&self, condition: &Condition) -> String {
        match condition {
            Condition::Comparison { column, op, marker } => {
                format!("{} {} {}", self.column(column), op, marker.placeholder())
            }
            Condition::Unary { column, op } => format!("{} {}", self.column(column), op),
            Condition::In {
                column,
                markers,
                negated,
            } => {
                let placeholders: Vec<_> = markers.iter().map(BindMarker::placeholder).collect();
                format!(
                    "{} {} ({})",
                    self.column(column),
                    if *negated { "NOT IN" } else { "IN" },
                    placeholders.join(", ")
                )
            }
            Condition::Between { column, low, high } => format!(
                "{} BETWEEN {} AND {}",
                self.column(column),
                low.placeholder(),
                high.placeholder()
            ),
            Condition::Constant(sql) => (*sql).to_string(),
            Condition::Nested(inner) => format!("({})", self.condition(inner)),
            Condition::And(left, right) => {
                format!("{} AND {}", self.condition(left), self.condition(right))
            }
            Condition::Or(left, right) => {
                format!("{} OR {}", self.condition(left), self.condition(right))
            }
        }
    }
}

fn render_error(message: impl Into<String>, sql: Option<String>) -> Error {
    Error::Render(RenderError {
        message: message.into(),
        sql,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use relmap_core::BindMarkersFactory;

    fn ident(name: &str) -> SqlIdentifier {
        SqlIdentifier::unquoted(name)
    }

    #[test]
    fn renders_select_with_paging_and_order() {
        let dialect = Dialect::postgres();
        let mut markers = dialect.bind_markers_factory().create();
        let select = Statement::Select(SelectStatement {
            distinct: true,
            projection: vec![
                Column::qualified(ident("foo"), ident("a")),
                Column::qualified(ident("foo"), ident("b")),
            ],
            from: ident("foo"),
            condition: Some(Condition::Comparison {
                column: Column::qualified(ident("foo"), ident("a")),
                op: "=",
                marker: markers.next(),
            }),
            order_by: vec![OrderByTerm {
                column: Column::qualified(ident("foo"), ident("b")),
                suffix: " DESC".to_string(),
            }],
            limit: Some(10),
            offset: Some(20),
        });
        assert_eq!(
            SqlRenderer::new(&dialect).render(&select).unwrap(),
            "SELECT DISTINCT foo.a, foo.b FROM foo WHERE foo.a = $1 ORDER BY foo.b DESC LIMIT 10 OFFSET 20"
        );
    }

    #[test]
    fn offset_fetch_paging_gets_a_default_order() {
        let dialect = Dialect::sql_server();
        let select = Statement::Select(SelectStatement {
            distinct: false,
            projection: Vec::new(),
            from: ident("foo"),
            condition: None,
            order_by: Vec::new(),
            limit: Some(5),
            offset: None,
        });
        assert_eq!(
            SqlRenderer::new(&dialect).render(&select).unwrap(),
            "SELECT foo.* FROM foo ORDER BY (SELECT 1) OFFSET 0 ROWS FETCH NEXT 5 ROWS ONLY"
        );
    }

    #[test]
    fn nested_conditions_are_parenthesised() {
        let dialect = Dialect::postgres();
        let mut markers = BindMarkersFactory::indexed("$", 1).create();
        let column = |name: &str| Column::qualified(ident("t"), ident(name));
        let condition = Condition::Comparison {
            column: column("a"),
            op: "=",
            marker: markers.next(),
        }
        .and(
            Condition::Unary {
                column: column("b"),
                op: "IS NULL",
            }
            .or(Condition::In {
                column: column("c"),
                markers: vec![markers.next(), markers.next()],
                negated: true,
            })
            .nest(),
        );
        assert_eq!(
            SqlRenderer::new(&dialect).condition(&condition),
            "t.a = $1 AND (t.b IS NULL OR t.c NOT IN ($2, $3))"
        );
    }

    #[test]
    fn empty_update_is_a_render_error() {
        let dialect = Dialect::postgres();
        let update = Statement::Update(UpdateStatement {
            table: ident("foo"),
            assignments: Vec::new(),
            condition: None,
        });
        let err = SqlRenderer::new(&dialect).render(&update).unwrap_err();
        assert!(matches!(err, Error::Render(_)));
    }

    #[test]
    fn quoted_identifiers_follow_dialect() {
        let dialect = Dialect::mysql();
        let mut markers = dialect.bind_markers_factory().create();
        let insert = Statement::Insert(InsertStatement {
            table: SqlIdentifier::quoted("Person"),
            columns: vec![SqlIdentifier::quoted("first name"), ident("age")],
            values: vec![markers.next(), markers.next()],
        });
        assert_eq!(
            SqlRenderer::new(&dialect).render(&insert).unwrap(),
            "INSERT INTO `Person` (`first name`, age) VALUES (?, ?)"
        );
    }
}
