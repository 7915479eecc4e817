//! Error types for relmap operations.

use std::fmt;

/// The primary error type for all mapping, rendering and binding operations.
#[derive(Debug)]
pub enum Error {
    /// An entity, property or mandatory column could not be resolved
    Mapping(MappingError),
    /// The dialect lacks a capability the caller asked for
    Unsupported(UnsupportedFeatureError),
    /// A query placeholder has no value, or a parameter was used incorrectly
    InvalidParameter(ParameterError),
    /// A value could not be converted to or from its target type
    Conversion(ConversionError),
    /// A statement could not be rendered to SQL text
    Render(RenderError),
    /// Operation was cancelled at the driver boundary
    Cancelled,
    /// Custom error with message
    Custom(String),
}

#[derive(Debug)]
pub struct MappingError {
    pub kind: MappingErrorKind,
    /// Rust type name of the entity involved, when known
    pub entity: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingErrorKind {
    /// No persistent entity is known for the requested type
    UnknownEntity,
    /// The entity description violates a mapping invariant
    InvalidEntity,
    /// A non-nullable property has no column in the row metadata
    MissingColumn,
    /// The entity has no property with the requested name
    UnknownProperty,
}

#[derive(Debug)]
pub struct UnsupportedFeatureError {
    pub feature: String,
    pub dialect: String,
}

#[derive(Debug)]
pub struct ParameterError {
    /// Placeholder or parameter name
    pub name: String,
    /// Query text in which the parameter was used
    pub query: Option<String>,
    pub message: String,
}

#[derive(Debug)]
pub struct ConversionError {
    pub expected: String,
    pub actual: String,
    pub column: Option<String>,
}

#[derive(Debug)]
pub struct RenderError {
    pub message: String,
    /// SQL rendered so far, if any
    pub sql: Option<String>,
}

impl Error {
    /// Build a mapping error.
    pub fn mapping(
        kind: MappingErrorKind,
        entity: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Error::Mapping(MappingError {
            kind,
            entity: entity.map(str::to_string),
            message: message.into(),
        })
    }

    /// Build an unsupported-feature error for the named dialect.
    pub fn unsupported(feature: impl Into<String>, dialect: impl Into<String>) -> Self {
        Error::Unsupported(UnsupportedFeatureError {
            feature: feature.into(),
            dialect: dialect.into(),
        })
    }

    /// A named placeholder in `query` has no supplied value.
    pub fn missing_parameter(name: impl Into<String>, query: impl Into<String>) -> Self {
        let name = name.into();
        let query = query.into();
        Error::InvalidParameter(ParameterError {
            message: format!("No parameter specified for [{}] in query [{}]", name, query),
            name,
            query: Some(query),
        })
    }

    /// Build a conversion error.
    pub fn conversion(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Error::Conversion(ConversionError {
            expected: expected.into(),
            actual: actual.into(),
            column: None,
        })
    }

    /// Build a render error.
    pub fn render(message: impl Into<String>) -> Self {
        Error::Render(RenderError {
            message: message.into(),
            sql: None,
        })
    }

    /// Is this a mapping error of the given kind?
    pub fn is_mapping(&self, kind: MappingErrorKind) -> bool {
        matches!(self, Error::Mapping(e) if e.kind == kind)
    }

    /// Is this an unsupported-feature error?
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::Unsupported(_))
    }

    /// Attach a column name to a conversion error.
    #[must_use]
    pub fn with_column(self, column: &str) -> Self {
        match self {
            Error::Conversion(mut e) => {
                e.column.get_or_insert_with(|| column.to_string());
                Error::Conversion(e)
            }
            other => other,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Mapping(e) => write!(f, "Mapping error: {}", e),
            Error::Unsupported(e) => write!(f, "Unsupported feature: {}", e),
            Error::InvalidParameter(e) => write!(f, "Invalid parameter usage: {}", e),
            Error::Conversion(e) => write!(f, "Conversion error: {}", e),
            Error::Render(e) => write!(f, "Render error: {}", e),
            Error::Cancelled => write!(f, "Operation cancelled"),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(entity) = &self.entity {
            write!(f, "{} ({})", self.message, entity)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl fmt::Display for UnsupportedFeatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dialect {} does not support {}",
            self.dialect, self.feature
        )
    }
}

impl fmt::Display for ParameterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(col) = &self.column {
            write!(
                f,
                "expected {} for column '{}', found {}",
                self.expected, col, self.actual
            )
        } else {
            write!(f, "expected {}, found {}", self.expected, self.actual)
        }
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sql) = &self.sql {
            write!(f, "{} (near `{}`)", self.message, sql)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl From<MappingError> for Error {
    fn from(err: MappingError) -> Self {
        Error::Mapping(err)
    }
}

impl From<UnsupportedFeatureError> for Error {
    fn from(err: UnsupportedFeatureError) -> Self {
        Error::Unsupported(err)
    }
}

impl From<ParameterError> for Error {
    fn from(err: ParameterError) -> Self {
        Error::InvalidParameter(err)
    }
}

impl From<ConversionError> for Error {
    fn from(err: ConversionError) -> Self {
        Error::Conversion(err)
    }
}

impl From<RenderError> for Error {
    fn from(err: RenderError) -> Self {
        Error::Render(err)
    }
}

/// Result type alias for relmap operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_parameter_message_names_query() {
        let err = Error::missing_parameter("name", "SELECT * FROM t WHERE a = :name");
        match &err {
            Error::InvalidParameter(p) => {
                assert_eq!(p.name, "name");
                assert_eq!(p.query.as_deref(), Some("SELECT * FROM t WHERE a = :name"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(
            err.to_string(),
            "Invalid parameter usage: No parameter specified for [name] in query [SELECT * FROM t WHERE a = :name]"
        );
    }

    #[test]
    fn conversion_error_picks_up_column_once() {
        let err = Error::conversion("INTEGER", "TEXT")
            .with_column("age")
            .with_column("other");
        assert_eq!(
            err.to_string(),
            "Conversion error: expected INTEGER for column 'age', found TEXT"
        );
    }

    #[test]
    fn kind_helpers() {
        let err = Error::mapping(MappingErrorKind::MissingColumn, Some("Person"), "no column");
        assert!(err.is_mapping(MappingErrorKind::MissingColumn));
        assert!(!err.is_mapping(MappingErrorKind::UnknownEntity));
        assert!(Error::unsupported("array columns", "mysql").is_unsupported());
        assert_eq!(
            Error::unsupported("array columns", "mysql").to_string(),
            "Unsupported feature: dialect mysql does not support array columns"
        );
    }
}
