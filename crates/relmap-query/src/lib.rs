//! Statement rendering and parameter expansion for relmap.
//!
//! `relmap-query` is the **SQL layer**. It turns criteria, statement specs
//! and named-parameter templates into [`PreparedOperation`]s: dialect-correct
//! SQL text plus an ordered bind plan.
//!
//! # Role In The Architecture
//!
//! - **Criteria DSL**: [`Criteria`] builds WHERE clauses without raw SQL.
//! - **Statement mapper**: [`StatementMapper`] lowers SELECT/INSERT/UPDATE/DELETE
//!   specs into a statement tree, replacing every value with a bind marker.
//! - **Named parameters**: [`NamedParameterExpander`] rewrites `:name` style
//!   templates into the dialect's bind markers; [`ParsedSqlCache`] keeps
//!   parsed templates around.
//! - **Expression queries**: [`ExpressionQuery`] rewrites `:#{…}` expressions
//!   into synthetic named parameters.
//!
//! Rendering is deterministic: the same spec and dialect always produce the
//! same SQL text and bind plan. Most users reach these types through the
//! `relmap` facade crate.

pub mod cache;
pub mod clause;
pub mod criteria;
pub mod expression;
pub mod named;
pub mod operation;
pub mod render;
pub mod statement;

pub use cache::{ExpressionQueryCache, ParsedSqlCache};
pub use clause::{NullsOrder, Order, OrderDirection, Sort};
pub use criteria::{
    ColumnRef, Combinator, Comparator, Condition, Criteria, CriteriaKind, CriteriaPart,
    CriteriaStep, Operand,
};
pub use expression::{BindingKind, ExpressionQuery, ParameterBinding};
pub use named::{NamedParameterExpander, ParameterProvider, ParsedSql, Segment};
pub use operation::PreparedOperation;
pub use render::SqlRenderer;
pub use statement::{
    Assignment, DeleteSpec, InsertSpec, SelectSpec, StatementMapper, Update, UpdateSpec,
};
