//! Bind markers and bind targets.
//!
//! A [`BindMarkersFactory`] describes a dialect's placeholder syntax. Each
//! statement allocates a fresh [`BindMarkers`] sequence from it, and each
//! [`BindMarker`] knows both the placeholder text that goes into the SQL and
//! the [`BindId`] under which its value is handed to a [`BindTarget`].

use std::fmt;

use crate::types::SqlType;
use crate::value::Value;

/// How a value is addressed when binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BindId {
    /// Zero-based parameter index
    Index(usize),
    /// Parameter name, without the placeholder prefix
    Name(String),
}

impl fmt::Display for BindId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindId::Index(i) => write!(f, "{}", i),
            BindId::Name(name) => f.write_str(name),
        }
    }
}

/// The driver-side statement that receives bound values.
pub trait BindTarget {
    fn bind(&mut self, id: &BindId, value: Value);

    fn bind_null(&mut self, id: &BindId, sql_type: &SqlType);
}

/// One placeholder in a rendered statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindMarker {
    placeholder: String,
    id: BindId,
}

impl BindMarker {
    pub fn new(placeholder: impl Into<String>, id: BindId) -> Self {
        Self {
            placeholder: placeholder.into(),
            id,
        }
    }

    /// Placeholder text as it appears in SQL.
    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    pub fn id(&self) -> &BindId {
        &self.id
    }

    pub fn bind(&self, target: &mut dyn BindTarget, value: Value) {
        target.bind(&self.id, value);
    }

    pub fn bind_null(&self, target: &mut dyn BindTarget, sql_type: &SqlType) {
        target.bind_null(&self.id, sql_type);
    }
}

impl fmt::Display for BindMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.placeholder)
    }
}

/// Placeholder syntax of a dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindMarkersFactory {
    /// `$1`, `?1`, `@p1`: prefix followed by a counter starting at `offset`
    Indexed { prefix: String, offset: usize },
    /// `?`: the same placeholder everywhere, bound by position
    Anonymous { placeholder: String },
    /// `@P0_name`: prefix, name prefix, counter and an optional filtered hint
    Named {
        prefix: String,
        name_prefix: String,
        max_length: usize,
    },
}

impl BindMarkersFactory {
    pub fn indexed(prefix: impl Into<String>, offset: usize) -> Self {
        BindMarkersFactory::Indexed {
            prefix: prefix.into(),
            offset,
        }
    }

    pub fn anonymous(placeholder: impl Into<String>) -> Self {
        BindMarkersFactory::Anonymous {
            placeholder: placeholder.into(),
        }
    }

    pub fn named(prefix: impl Into<String>, name_prefix: impl Into<String>, max_length: usize) -> Self {
        BindMarkersFactory::Named {
            prefix: prefix.into(),
            name_prefix: name_prefix.into(),
            max_length,
        }
    }

    /// Start a new marker sequence for one statement.
    pub fn create(&self) -> BindMarkers {
        BindMarkers {
            factory: self.clone(),
            counter: 0,
        }
    }

    /// Whether markers are addressable individually, so that one marker can
    /// be reused for several occurrences of the same parameter.
    pub fn identifiable_placeholders(&self) -> bool {
        !matches!(self, BindMarkersFactory::Anonymous { .. })
    }

    pub fn is_named(&self) -> bool {
        matches!(self, BindMarkersFactory::Named { .. })
    }
}

/// A stateful marker sequence for one statement.
#[derive(Debug, Clone)]
pub struct BindMarkers {
    factory: BindMarkersFactory,
    counter: usize,
}

impl BindMarkers {
    /// Next marker without a name hint.
    pub fn next(&mut self) -> BindMarker {
        self.next_with_hint(None)
    }

    /// Next marker, using `hint` where the dialect supports named markers.
    pub fn next_named(&mut self, hint: &str) -> BindMarker {
        self.next_with_hint(Some(hint))
    }

    fn next_with_hint(&mut self, hint: Option<&str>) -> BindMarker {
        let index = self.counter;
        self.counter += 1;
        match &self.factory {
            BindMarkersFactory::Indexed { prefix, offset } => {
                BindMarker::new(format!("{}{}", prefix, index + offset), BindId::Index(index))
            }
            BindMarkersFactory::Anonymous { placeholder } => {
                BindMarker::new(placeholder.clone(), BindId::Index(index))
            }
            BindMarkersFactory::Named {
                prefix,
                name_prefix,
                max_length,
            } => {
                let mut name = format!("{}{}", name_prefix, index);
                if let Some(hint) = hint {
                    let filtered: String =
                        hint.chars().filter(char::is_ascii_alphanumeric).collect();
                    if !filtered.is_empty() {
                        name.push('_');
                        name.push_str(&filtered);
                    }
                }
                name.truncate(*max_length);
                BindMarker::new(format!("{}{}", prefix, name), BindId::Name(name))
            }
        }
    }

    /// Number of markers handed out so far.
    pub fn count(&self) -> usize {
        self.counter
    }
}

/// One call recorded by [`BindRecorder`].
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Value(BindId, Value),
    Null(BindId, SqlType),
}

impl Binding {
    pub fn id(&self) -> &BindId {
        match self {
            Binding::Value(id, _) | Binding::Null(id, _) => id,
        }
    }
}

/// A [`BindTarget`] that records every call in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindRecorder {
    bindings: Vec<Binding>,
}

impl BindRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl BindTarget for BindRecorder {
    fn bind(&mut self, id: &BindId, value: Value) {
        self.bindings.push(Binding::Value(id.clone(), value));
    }

    fn bind_null(&mut self, id: &BindId, sql_type: &SqlType) {
        self.bindings.push(Binding::Null(id.clone(), sql_type.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexed_markers_count_from_offset() {
        let mut markers = BindMarkersFactory::indexed("$", 1).create();
        let a = markers.next();
        let b = markers.next_named("ignored");
        assert_eq!(a.placeholder(), "$1");
        assert_eq!(a.id(), &BindId::Index(0));
        assert_eq!(b.placeholder(), "$2");
        assert_eq!(b.id(), &BindId::Index(1));
        assert_eq!(markers.count(), 2);
    }

    #[test]
    fn anonymous_markers_bind_by_position() {
        let mut markers = BindMarkersFactory::anonymous("?").create();
        assert_eq!(markers.next().placeholder(), "?");
        let second = markers.next();
        assert_eq!(second.placeholder(), "?");
        assert_eq!(second.id(), &BindId::Index(1));
        assert!(!BindMarkersFactory::anonymous("?").identifiable_placeholders());
    }

    #[test]
    fn named_markers_filter_and_truncate_hints() {
        let mut markers = BindMarkersFactory::named("@", "P", 10).create();
        let a = markers.next_named("first_name");
        assert_eq!(a.placeholder(), "@P0_firstna");
        assert_eq!(a.id(), &BindId::Name("P0_firstna".to_string()));
        assert_eq!(markers.next().placeholder(), "@P1");
        assert_eq!(markers.next_named("--").placeholder(), "@P2");
    }

    #[test]
    fn markers_bind_through_target() {
        let mut markers = BindMarkersFactory::indexed("$", 1).create();
        let mut target = BindRecorder::new();
        markers.next().bind(&mut target, Value::Int(1));
        markers.next().bind_null(&mut target, &SqlType::Text);
        assert_eq!(
            target.bindings(),
            &[
                Binding::Value(BindId::Index(0), Value::Int(1)),
                Binding::Null(BindId::Index(1), SqlType::Text),
            ]
        );
    }
}
