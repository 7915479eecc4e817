//! ORDER BY clause types.

use crate::criteria::ColumnRef;

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

/// NULLS FIRST/LAST ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrder {
    First,
    Last,
}

/// One ORDER BY term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: ColumnRef,
    pub direction: OrderDirection,
    pub nulls: Option<NullsOrder>,
}

impl Order {
    /// Create an ascending order term.
    pub fn asc(column: impl Into<ColumnRef>) -> Self {
        Self {
            column: column.into(),
            direction: OrderDirection::Asc,
            nulls: None,
        }
    }

    /// Create a descending order term.
    pub fn desc(column: impl Into<ColumnRef>) -> Self {
        Self {
            column: column.into(),
            direction: OrderDirection::Desc,
            nulls: None,
        }
    }

    /// Set NULLS FIRST.
    #[must_use]
    pub fn nulls_first(mut self) -> Self {
        self.nulls = Some(NullsOrder::First);
        self
    }

    /// Set NULLS LAST.
    #[must_use]
    pub fn nulls_last(mut self) -> Self {
        self.nulls = Some(NullsOrder::Last);
        self
    }

    /// Direction and null handling suffix, e.g. ` DESC NULLS LAST`.
    pub fn suffix_sql(&self) -> String {
        let mut sql = String::from(match self.direction {
            OrderDirection::Asc => " ASC",
            OrderDirection::Desc => " DESC",
        });
        if let Some(nulls) = self.nulls {
            sql.push_str(match nulls {
                NullsOrder::First => " NULLS FIRST",
                NullsOrder::Last => " NULLS LAST",
            });
        }
        sql
    }
}

/// An ordered list of sort terms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sort {
    orders: Vec<Order>,
}

impl Sort {
    pub fn unsorted() -> Self {
        Self::default()
    }

    pub fn by(order: Order) -> Self {
        Self {
            orders: vec![order],
        }
    }

    #[must_use]
    pub fn and(mut self, order: Order) -> Self {
        self.orders.push(order);
        self
    }

    pub fn is_unsorted(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }
}

impl From<Order> for Sort {
    fn from(order: Order) -> Self {
        Sort::by(order)
    }
}
