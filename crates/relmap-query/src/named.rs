//! Named-parameter expansion.
//!
//! A query template such as `SELECT * FROM t WHERE a = :name` is parsed once
//! into text and parameter segments ([`ParsedSql`]). Expansion then replaces
//! every parameter occurrence with a marker from the dialect's factory and
//! records the value to bind.
//!
//! Placeholders are `:name`, `#name`, `$name` or `@name` where the name is
//! `[A-Za-z_][A-Za-z0-9_]*` and the prefix is not preceded by a word
//! character. String literals, quoted identifiers and comments are opaque,
//! and `::` (a Postgres cast) never starts a placeholder.

use std::collections::HashMap;

use relmap_core::{BindMarker, BindMarkersFactory, Error, Result, SettableValue};

use crate::operation::PreparedOperation;

const PREFIXES: &[u8] = b":#$@";

/// One piece of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Parameter(String),
}

/// A template split into text and parameter segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSql {
    original: String,
    segments: Vec<Segment>,
    names: Vec<String>,
}

impl ParsedSql {
    /// Lex `sql` and record its placeholders.
    pub fn parse(sql: &str) -> Self {
        let bytes = sql.as_bytes();
        let mut segments = Vec::new();
        let mut names: Vec<String> = Vec::new();
        let mut text_start = 0;
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                quote @ (b'\'' | b'"') => {
                    i = skip_past(bytes, i + 1, |b, j| b[j] == quote, 1);
                }
                b'-' if bytes.get(i + 1) == Some(&b'-') => {
                    i = skip_past(bytes, i + 2, |b, j| b[j] == b'\n', 1);
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    i = skip_past(bytes, i + 2, |b, j| b[j] == b'*' && b.get(j + 1) == Some(&b'/'), 2);
                }
                b':' if bytes.get(i + 1) == Some(&b':') => i += 2,
                prefix if PREFIXES.contains(&prefix) && starts_placeholder(bytes, i) => {
                    let end = identifier_end(bytes, i + 1);
                    if text_start < i {
                        segments.push(Segment::Text(sql[text_start..i].to_string()));
                    }
                    let name = &sql[i + 1..end];
                    if !names.iter().any(|n| n == name) {
                        names.push(name.to_string());
                    }
                    segments.push(Segment::Parameter(name.to_string()));
                    text_start = end;
                    i = end;
                }
                _ => i += 1,
            }
        }
        if text_start < bytes.len() {
            segments.push(Segment::Text(sql[text_start..].to_string()));
        }

        Self {
            original: sql.to_string(),
            segments,
            names,
        }
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Distinct parameter names in order of first appearance.
    pub fn parameter_names(&self) -> &[String] {
        &self.names
    }

    /// Total number of placeholder occurrences.
    pub fn occurrences(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Parameter(_)))
            .count()
    }

    pub fn has_parameters(&self) -> bool {
        !self.names.is_empty()
    }
}

fn is_word(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Advance from `from` until `closes` matches, returning the index just
/// past the closing token, or the end of input when it never closes.
fn skip_past(bytes: &[u8], from: usize, closes: impl Fn(&[u8], usize) -> bool, width: usize) -> usize {
    let mut j = from;
    while j < bytes.len() {
        if closes(bytes, j) {
            return j + width;
        }
        j += 1;
    }
    bytes.len()
}

fn starts_placeholder(bytes: &[u8], i: usize) -> bool {
    let preceded_ok = i == 0 || {
        let prev = bytes[i - 1];
        !is_word(prev) && !PREFIXES.contains(&prev)
    };
    let first = bytes.get(i + 1).copied();
    preceded_ok && first.is_some_and(|b| b.is_ascii_alphabetic() || b == b'_')
}

fn identifier_end(bytes: &[u8], start: usize) -> usize {
    let mut j = start;
    while j < bytes.len() && is_word(bytes[j]) {
        j += 1;
    }
    j
}

/// Supplies values for named parameters.
///
/// `index` is the position of `name` among the distinct names of the
/// template, in order of first appearance.
pub trait ParameterProvider {
    fn value(&self, index: usize, name: &str) -> Option<SettableValue>;
}

impl<F> ParameterProvider for F
where
    F: Fn(usize, &str) -> Option<SettableValue>,
{
    fn value(&self, index: usize, name: &str) -> Option<SettableValue> {
        self(index, name)
    }
}

impl ParameterProvider for HashMap<String, SettableValue> {
    fn value(&self, _index: usize, name: &str) -> Option<SettableValue> {
        self.get(name).cloned()
    }
}

/// Expands parsed templates into prepared operations.
#[derive(Debug, Clone)]
pub struct NamedParameterExpander {
    factory: BindMarkersFactory,
}

impl NamedParameterExpander {
    pub fn new(factory: BindMarkersFactory) -> Self {
        Self { factory }
    }

    pub fn factory(&self) -> &BindMarkersFactory {
        &self.factory
    }

    /// Parse and expand in one step.
    pub fn expand_sql(&self, sql: &str, provider: &dyn ParameterProvider) -> Result<PreparedOperation> {
        self.expand(&ParsedSql::parse(sql), provider)
    }

    /// Replace every placeholder with a marker and build the bind plan.
    ///
    /// A named factory reuses one marker (and one plan entry) per distinct
    /// name; other factories allocate a marker per occurrence.
    #[tracing::instrument(level = "trace", skip(self, parsed, provider), fields(sql = %parsed.original))]
    pub fn expand(&self, parsed: &ParsedSql, provider: &dyn ParameterProvider) -> Result<PreparedOperation> {
        let mut values: HashMap<&str, SettableValue> = HashMap::with_capacity(parsed.names.len());
        for (index, name) in parsed.names.iter().enumerate() {
            let value = provider
                .value(index, name)
                .ok_or_else(|| Error::missing_parameter(name, &parsed.original))?;
            values.insert(name.as_str(), value);
        }

        let reuse = self.factory.is_named();
        let mut markers = self.factory.create();
        let mut assigned: HashMap<&str, BindMarker> = HashMap::new();
        let mut sql = String::with_capacity(parsed.original.len());
        let mut plan = Vec::with_capacity(parsed.occurrences());

        for segment in &parsed.segments {
            match segment {
                Segment::Text(text) => sql.push_str(text),
                Segment::Parameter(name) => {
                    if reuse {
                        if let Some(marker) = assigned.get(name.as_str()) {
                            sql.push_str(marker.placeholder());
                            continue;
                        }
                    }
                    let marker = markers.next_named(name);
                    sql.push_str(marker.placeholder());
                    let value = values
                        .get(name.as_str())
                        .cloned()
                        .ok_or_else(|| Error::missing_parameter(name, &parsed.original))?;
                    plan.push((marker.clone(), value));
                    if reuse {
                        assigned.insert(name.as_str(), marker);
                    }
                }
            }
        }

        tracing::trace!(sql = %sql, bindings = plan.len(), "Expanded named parameters");
        Ok(PreparedOperation::new(sql, plan))
    }
}
