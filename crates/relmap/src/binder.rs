//! Binding repository-method arguments and query expressions.
//!
//! An [`ExpressionEvaluatingParameterBinder`] binds the values of one
//! [`ExpressionQuery`]: first every `:#{…}` expression under its synthetic
//! name, then the declared method parameters, by name when the query
//! references them and by position otherwise.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use regex::Regex;

use relmap_core::{BindId, BindTarget, Result, SettableValue, SqlType, Value};
use relmap_query::ExpressionQuery;

use crate::strategy::DataAccessStrategy;

/// A declared method parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindableParameter {
    index: usize,
    name: Option<String>,
    sql_type: SqlType,
}

impl BindableParameter {
    /// `index` is the position of the argument in
    /// [`ParameterAccessor::values`].
    pub fn new(index: usize, name: Option<&str>, sql_type: SqlType) -> Self {
        Self {
            index,
            name: name.map(str::to_string),
            sql_type,
        }
    }

    pub fn named(index: usize, name: &str, sql_type: SqlType) -> Self {
        Self::new(index, Some(name), sql_type)
    }

    pub fn positional(index: usize, sql_type: SqlType) -> Self {
        Self::new(index, None, sql_type)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn sql_type(&self) -> &SqlType {
        &self.sql_type
    }
}

/// Argument values of one invocation plus the declared parameters.
pub trait ParameterAccessor {
    fn values(&self) -> &[Value];

    fn bindable_parameters(&self) -> &[BindableParameter];

    /// Whether NULL arguments are bound as typed NULLs instead of skipped.
    fn has_bindable_null_value(&self) -> bool;
}

/// A [`ParameterAccessor`] over owned values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterValues {
    values: Vec<Value>,
    parameters: Vec<BindableParameter>,
    bind_nulls: bool,
}

impl ParameterValues {
    pub fn new(parameters: Vec<BindableParameter>, values: Vec<Value>) -> Self {
        Self {
            values,
            parameters,
            bind_nulls: false,
        }
    }

    #[must_use]
    pub fn bind_nulls(mut self, bind_nulls: bool) -> Self {
        self.bind_nulls = bind_nulls;
        self
    }
}

impl ParameterAccessor for ParameterValues {
    fn values(&self) -> &[Value] {
        &self.values
    }

    fn bindable_parameters(&self) -> &[BindableParameter] {
        &self.parameters
    }

    fn has_bindable_null_value(&self) -> bool {
        self.bind_nulls
    }
}

/// Evaluates the expression of a `:#{…}` binding.
pub trait ExpressionEvaluator {
    fn evaluate(&self, expression: &str) -> Result<SettableValue>;
}

impl<F> ExpressionEvaluator for F
where
    F: Fn(&str) -> Result<SettableValue>,
{
    fn evaluate(&self, expression: &str) -> Result<SettableValue> {
        self(expression)
    }
}

/// Binds expression values and method arguments for one query.
#[derive(Debug)]
pub struct ExpressionEvaluatingParameterBinder {
    query: Arc<ExpressionQuery>,
    strategy: Arc<DataAccessStrategy>,
    referenced: RwLock<HashMap<String, bool>>,
}

impl ExpressionEvaluatingParameterBinder {
    pub fn new(query: impl Into<Arc<ExpressionQuery>>, strategy: Arc<DataAccessStrategy>) -> Self {
        Self {
            query: query.into(),
            strategy,
            referenced: RwLock::new(HashMap::new()),
        }
    }

    /// A binder for `query`, reusing the strategy's cached rewrite.
    pub fn for_query(query: &str, strategy: Arc<DataAccessStrategy>) -> Self {
        let rewritten = strategy.get_expression_query(query);
        Self::new(rewritten, strategy)
    }

    pub fn query(&self) -> &ExpressionQuery {
        &self.query
    }

    /// Bind expressions, then arguments.
    ///
    /// A named parameter the query references is bound by name. When the
    /// query carries expression bindings, parameters it does not reference
    /// are skipped; otherwise they are bound by position, counting only the
    /// positions actually bound. NULL arguments are bound only when the
    /// accessor allows bindable nulls.
    #[tracing::instrument(level = "trace", skip_all, fields(sql = %self.query.query()))]
    pub fn bind(
        &self,
        target: &mut dyn BindTarget,
        accessor: &dyn ParameterAccessor,
        evaluator: &dyn ExpressionEvaluator,
    ) -> Result<()> {
        for binding in self.query.bindings() {
            let value = evaluator.evaluate(binding.expression())?;
            let value = self.strategy.get_bind_value(value)?;
            bind(target, BindId::Name(binding.name().to_string()), value);
        }

        let has_expressions = self.query.has_bindings();
        let bind_nulls = accessor.has_bindable_null_value();
        let mut position = 0;

        for parameter in accessor.bindable_parameters() {
            let referenced = parameter.name().is_some_and(|n| self.is_referenced(n));

            if referenced || has_expressions {
                let Some(name) = parameter.name().filter(|_| referenced) else {
                    continue;
                };
                let value = self.argument(accessor, parameter)?;
                if value.has_value() || bind_nulls {
                    bind(target, BindId::Name(name.to_string()), value);
                }
            } else {
                let value = self.argument(accessor, parameter)?;
                if value.has_value() || bind_nulls {
                    bind(target, BindId::Index(position), value);
                    position += 1;
                }
            }
        }
        Ok(())
    }

    fn argument(
        &self,
        accessor: &dyn ParameterAccessor,
        parameter: &BindableParameter,
    ) -> Result<SettableValue> {
        let value = SettableValue::from_or_empty(
            accessor.values().get(parameter.index()).cloned(),
            parameter.sql_type().clone(),
        );
        self.strategy.get_bind_value(value)
    }

    /// Whether the query text references `:name` (or `#`, `$`, `@`).
    /// Memoised per name.
    pub fn is_referenced(&self, name: &str) -> bool {
        if let Some(&known) = self
            .referenced
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return known;
        }

        let pattern = format!(r"(\W|^)[:#$@]{}(\W|$)", regex::escape(name));
        let found = Regex::new(&pattern).is_ok_and(|re| re.is_match(self.query.query()));
        self.referenced
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), found);
        found
    }
}

fn bind(target: &mut dyn BindTarget, id: BindId, value: SettableValue) {
    let sql_type = value.sql_type().clone();
    match value.into_value() {
        Some(v) => target.bind(&id, v),
        None => target.bind_null(&id, &sql_type),
    }
}
