//! Rendered statements with their bind plans.

use std::fmt;

use relmap_core::{BindMarker, BindTarget, SettableValue};

/// SQL text plus the ordered list of values to bind.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedOperation {
    sql: String,
    bindings: Vec<(BindMarker, SettableValue)>,
}

impl PreparedOperation {
    pub fn new(sql: String, bindings: Vec<(BindMarker, SettableValue)>) -> Self {
        Self { sql, bindings }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Bind plan in the order it is replayed.
    pub fn bindings(&self) -> &[(BindMarker, SettableValue)] {
        &self.bindings
    }

    /// Replay the bind plan: present values are bound, empty values are
    /// bound as typed NULLs.
    pub fn bind_to(&self, target: &mut dyn BindTarget) {
        for (marker, value) in &self.bindings {
            match value.value() {
                Some(v) => marker.bind(target, v.clone()),
                None => marker.bind_null(target, value.sql_type()),
            }
        }
    }

    pub fn into_parts(self) -> (String, Vec<(BindMarker, SettableValue)>) {
        (self.sql, self.bindings)
    }
}

impl fmt::Display for PreparedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}
