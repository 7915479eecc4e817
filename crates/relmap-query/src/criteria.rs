//! Criteria DSL for WHERE clauses.
//!
//! Criteria form a left-to-right chain of conditions joined by AND/OR, where
//! any element may itself be a parenthesised group:
//!
//! ```
//! use relmap_query::Criteria;
//!
//! let criteria = Criteria::where_("name")
//!     .is("Walter")
//!     .and("age")
//!     .greater_than(18)
//!     .or_group(Criteria::where_("vip").is_true().and("age").is_null());
//! assert_eq!(criteria.len(), 3);
//! ```

use relmap_core::{SqlIdentifier, Value};
use std::fmt;

/// A column reference, optionally qualified with an explicit table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub table: Option<SqlIdentifier>,
    pub column: SqlIdentifier,
}

impl ColumnRef {
    pub fn new(column: impl Into<SqlIdentifier>) -> Self {
        Self {
            table: None,
            column: column.into(),
        }
    }

    pub fn qualified(table: impl Into<SqlIdentifier>, column: impl Into<SqlIdentifier>) -> Self {
        Self {
            table: Some(table.into()),
            column: column.into(),
        }
    }
}

/// `"table.column"` is split into an explicit table and column.
impl From<&str> for ColumnRef {
    fn from(reference: &str) -> Self {
        match reference.split_once('.') {
            Some((table, column)) if !table.is_empty() && !column.is_empty() => {
                ColumnRef::qualified(table, column)
            }
            _ => ColumnRef::new(reference),
        }
    }
}

impl From<String> for ColumnRef {
    fn from(reference: String) -> Self {
        ColumnRef::from(reference.as_str())
    }
}

impl From<SqlIdentifier> for ColumnRef {
    fn from(column: SqlIdentifier) -> Self {
        ColumnRef::new(column)
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{}.{}", table, self.column),
            None => write!(f, "{}", self.column),
        }
    }
}

/// Comparison operator of a single condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
    NotLike,
    In,
    NotIn,
    IsNull,
    IsNotNull,
    IsTrue,
    IsFalse,
    Between,
}

impl Comparator {
    /// SQL operator text.
    pub const fn as_str(self) -> &'static str {
        match self {
            Comparator::Eq => "=",
            Comparator::NotEq => "<>",
            Comparator::Lt => "<",
            Comparator::Lte => "<=",
            Comparator::Gt => ">",
            Comparator::Gte => ">=",
            Comparator::Like => "LIKE",
            Comparator::NotLike => "NOT LIKE",
            Comparator::In => "IN",
            Comparator::NotIn => "NOT IN",
            Comparator::IsNull => "IS NULL",
            Comparator::IsNotNull => "IS NOT NULL",
            Comparator::IsTrue => "IS TRUE",
            Comparator::IsFalse => "IS FALSE",
            Comparator::Between => "BETWEEN",
        }
    }
}

/// Right-hand side of a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    None,
    Single(Value),
    List(Vec<Value>),
    Range(Value, Value),
}

/// One `column <op> operand` condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: ColumnRef,
    pub comparator: Comparator,
    pub operand: Operand,
}

/// How a part joins the parts before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// First part of a chain
    Initial,
    And,
    Or,
}

impl Combinator {
    pub const fn as_str(self) -> &'static str {
        match self {
            Combinator::Initial => "",
            Combinator::And => "AND",
            Combinator::Or => "OR",
        }
    }
}

/// A condition or a nested group.
#[derive(Debug, Clone, PartialEq)]
pub enum CriteriaKind {
    Condition(Condition),
    Group(Criteria),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CriteriaPart {
    pub combinator: Combinator,
    pub kind: CriteriaKind,
}

/// A chain of conditions and groups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    parts: Vec<CriteriaPart>,
}

impl Criteria {
    /// Criteria that match everything.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Start a chain with a condition on `column`.
    pub fn where_(column: impl Into<ColumnRef>) -> CriteriaStep {
        CriteriaStep {
            base: Criteria::empty(),
            combinator: Combinator::Initial,
            column: column.into(),
        }
    }

    /// Continue with an AND condition on `column`.
    pub fn and(self, column: impl Into<ColumnRef>) -> CriteriaStep {
        CriteriaStep {
            base: self,
            combinator: Combinator::And,
            column: column.into(),
        }
    }

    /// Continue with an OR condition on `column`.
    pub fn or(self, column: impl Into<ColumnRef>) -> CriteriaStep {
        CriteriaStep {
            base: self,
            combinator: Combinator::Or,
            column: column.into(),
        }
    }

    /// Append a parenthesised group joined with AND. Empty groups are ignored.
    #[must_use]
    pub fn and_group(self, group: Criteria) -> Criteria {
        self.push_group(Combinator::And, group)
    }

    /// Append a parenthesised group joined with OR. Empty groups are ignored.
    #[must_use]
    pub fn or_group(self, group: Criteria) -> Criteria {
        self.push_group(Combinator::Or, group)
    }

    fn push_group(self, combinator: Combinator, group: Criteria) -> Criteria {
        if group.is_empty() {
            return self;
        }
        self.push(combinator, CriteriaKind::Group(group))
    }

    fn push(mut self, combinator: Combinator, kind: CriteriaKind) -> Criteria {
        let combinator = if self.parts.is_empty() {
            Combinator::Initial
        } else {
            combinator
        };
        self.parts.push(CriteriaPart { combinator, kind });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Number of top-level parts.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn parts(&self) -> &[CriteriaPart] {
        &self.parts
    }
}

/// A pending condition: the column is known, the comparator is not yet.
#[derive(Debug, Clone)]
#[must_use = "a criteria step does nothing until a comparator is applied"]
pub struct CriteriaStep {
    base: Criteria,
    combinator: Combinator,
    column: ColumnRef,
}

impl CriteriaStep {
    fn finish(self, comparator: Comparator, operand: Operand) -> Criteria {
        let condition = Condition {
            column: self.column,
            comparator,
            operand,
        };
        self.base
            .push(self.combinator, CriteriaKind::Condition(condition))
    }

    /// `column = value`, or `column IS NULL` for a NULL value.
    pub fn is(self, value: impl Into<Value>) -> Criteria {
        match value.into() {
            Value::Null => self.finish(Comparator::IsNull, Operand::None),
            value => self.finish(Comparator::Eq, Operand::Single(value)),
        }
    }

    /// `column <> value`, or `column IS NOT NULL` for a NULL value.
    pub fn not(self, value: impl Into<Value>) -> Criteria {
        match value.into() {
            Value::Null => self.finish(Comparator::IsNotNull, Operand::None),
            value => self.finish(Comparator::NotEq, Operand::Single(value)),
        }
    }

    pub fn less_than(self, value: impl Into<Value>) -> Criteria {
        self.finish(Comparator::Lt, Operand::Single(value.into()))
    }

    pub fn less_than_or_equals(self, value: impl Into<Value>) -> Criteria {
        self.finish(Comparator::Lte, Operand::Single(value.into()))
    }

    pub fn greater_than(self, value: impl Into<Value>) -> Criteria {
        self.finish(Comparator::Gt, Operand::Single(value.into()))
    }

    pub fn greater_than_or_equals(self, value: impl Into<Value>) -> Criteria {
        self.finish(Comparator::Gte, Operand::Single(value.into()))
    }

    pub fn like(self, pattern: impl Into<Value>) -> Criteria {
        self.finish(Comparator::Like, Operand::Single(pattern.into()))
    }

    pub fn not_like(self, pattern: impl Into<Value>) -> Criteria {
        self.finish(Comparator::NotLike, Operand::Single(pattern.into()))
    }

    pub fn in_list<I, V>(self, values: I) -> Criteria
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.finish(Comparator::In, Operand::List(values))
    }

    pub fn not_in<I, V>(self, values: I) -> Criteria
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.finish(Comparator::NotIn, Operand::List(values))
    }

    pub fn between(self, low: impl Into<Value>, high: impl Into<Value>) -> Criteria {
        self.finish(Comparator::Between, Operand::Range(low.into(), high.into()))
    }

    pub fn is_null(self) -> Criteria {
        self.finish(Comparator::IsNull, Operand::None)
    }

    pub fn is_not_null(self) -> Criteria {
        self.finish(Comparator::IsNotNull, Operand::None)
    }

    pub fn is_true(self) -> Criteria {
        self.finish(Comparator::IsTrue, Operand::None)
    }

    pub fn is_false(self) -> Criteria {
        self.finish(Comparator::IsFalse, Operand::None)
    }
}
