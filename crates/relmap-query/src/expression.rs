//! Queries with embedded `:#{…}` / `?#{…}` expressions.
//!
//! Each expression is replaced by a synthetic named parameter
//! (`:__synthetic_0__`, `:__synthetic_1__`, ...) so the rewritten text can
//! go through the named-parameter expander. The expressions themselves are
//! kept as [`ParameterBinding`]s and evaluated at bind time.

use std::sync::OnceLock;

use regex::{Captures, Regex};

/// `:#{expr}` or `?#{expr}`.
fn expression_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"([:?])#\{([^}]*)\}").unwrap_or_else(|e| panic!("invalid expression pattern: {e}"))
    })
}

/// How an expression was introduced in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// `:#{…}`
    Named,
    /// `?#{…}`
    Positional,
}

/// A synthetic parameter and the expression that produces its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterBinding {
    name: String,
    expression: String,
    kind: BindingKind,
}

impl ParameterBinding {
    pub fn new(name: impl Into<String>, expression: impl Into<String>, kind: BindingKind) -> Self {
        Self {
            name: name.into(),
            expression: expression.into(),
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn kind(&self) -> BindingKind {
        self.kind
    }
}

/// Rewritten query text plus its expression bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionQuery {
    query: String,
    bindings: Vec<ParameterBinding>,
}

impl ExpressionQuery {
    /// Rewrite every expression into a synthetic named parameter.
    pub fn create(query: &str) -> Self {
        let mut bindings = Vec::new();
        let rewritten = expression_pattern().replace_all(query, |caps: &Captures<'_>| {
            let name = synthetic_name(bindings.len());
            let kind = if &caps[1] == "?" {
                BindingKind::Positional
            } else {
                BindingKind::Named
            };
            let replacement = format!(":{name}");
            bindings.push(ParameterBinding::new(name, &caps[2], kind));
            replacement
        });

        Self {
            query: rewritten.into_owned(),
            bindings,
        }
    }

    /// The rewritten text.
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn bindings(&self) -> &[ParameterBinding] {
        &self.bindings
    }

    pub fn has_bindings(&self) -> bool {
        !self.bindings.is_empty()
    }
}

fn synthetic_name(index: usize) -> String {
    format!("__synthetic_{index}__")
}
