//! Dialect descriptors.
//!
//! A [`Dialect`] bundles everything that differs between stores: bind
//! marker syntax, array column support, identifier quoting, paging syntax,
//! simple types and store converters.

use std::sync::Arc;

use crate::Result;
use crate::bind::BindMarkersFactory;
use crate::conversion::{BooleanAsTinyInt, Converter, SimpleTypeHolder};
use crate::error::Error;
use crate::identifier::{IdentifierProcessing, LetterCasing, Quoting, SqlIdentifier};
use crate::types::SqlType;

/// Array column capability of a dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayColumns {
    supported: bool,
    widen_tiny_int: bool,
    simple_types: SimpleTypeHolder,
}

impl ArrayColumns {
    /// Arrays are not supported at all.
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            widen_tiny_int: false,
            simple_types: SimpleTypeHolder::new(),
        }
    }

    /// Arrays of any simple element type.
    pub fn supported(simple_types: SimpleTypeHolder) -> Self {
        Self {
            supported: true,
            widen_tiny_int: false,
            simple_types,
        }
    }

    /// Store TINYINT elements as SMALLINT.
    #[must_use]
    pub fn widening_tiny_int(mut self) -> Self {
        self.widen_tiny_int = true;
        self
    }

    pub fn is_supported(&self) -> bool {
        self.supported
    }

    /// Store element type for arrays whose elements have type `element`.
    pub fn array_type(&self, element: &SqlType, dialect: &str) -> Result<SqlType> {
        if !self.supported {
            return Err(Error::unsupported("array columns", dialect));
        }
        if !self.simple_types.is_simple_type(element) {
            return Err(Error::unsupported(
                format!("arrays of {}", element.sql_name()),
                dialect,
            ));
        }
        if self.widen_tiny_int && *element == SqlType::TinyInt {
            return Ok(SqlType::SmallInt);
        }
        Ok(element.clone())
    }
}

/// Paging syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitStyle {
    /// `LIMIT n OFFSET m`; `max_rows` stands in for the limit when only an
    /// offset is given and the store requires a LIMIT
    LimitOffset { max_rows: Option<&'static str> },
    /// `OFFSET m ROWS FETCH NEXT n ROWS ONLY`
    OffsetFetch,
}

impl LimitStyle {
    /// Render the paging clause, or `None` when neither bound is set.
    pub fn render(self, limit: Option<u64>, offset: Option<u64>) -> Option<String> {
        match (self, limit, offset) {
            (_, None, None) => None,
            (LimitStyle::LimitOffset { .. }, Some(limit), None) => Some(format!("LIMIT {}", limit)),
            (LimitStyle::LimitOffset { .. }, Some(limit), Some(offset)) => {
                Some(format!("LIMIT {} OFFSET {}", limit, offset))
            }
            (LimitStyle::LimitOffset { max_rows }, None, Some(offset)) => Some(match max_rows {
                Some(max) => format!("LIMIT {} OFFSET {}", max, offset),
                None => format!("OFFSET {}", offset),
            }),
            (LimitStyle::OffsetFetch, limit, offset) => {
                let mut clause = format!("OFFSET {} ROWS", offset.unwrap_or(0));
                if let Some(limit) = limit {
                    clause.push_str(&format!(" FETCH NEXT {} ROWS ONLY", limit));
                }
                Some(clause)
            }
        }
    }

    /// Whether paging needs an ORDER BY clause to be valid.
    pub fn requires_order_by(self) -> bool {
        matches!(self, LimitStyle::OffsetFetch)
    }
}

/// The store dialect a strategy renders for.
#[derive(Debug, Clone)]
pub struct Dialect {
    name: &'static str,
    bind_markers: BindMarkersFactory,
    arrays: ArrayColumns,
    identifier_processing: IdentifierProcessing,
    limit_style: LimitStyle,
    simple_types: SimpleTypeHolder,
    converters: Vec<Arc<dyn Converter>>,
}

impl Dialect {
    pub fn builder(name: &'static str, bind_markers: BindMarkersFactory) -> DialectBuilder {
        DialectBuilder {
            dialect: Dialect {
                name,
                bind_markers,
                arrays: ArrayColumns::unsupported(),
                identifier_processing: IdentifierProcessing::ANSI,
                limit_style: LimitStyle::LimitOffset { max_rows: None },
                simple_types: SimpleTypeHolder::new(),
                converters: Vec::new(),
            },
        }
    }

    /// PostgreSQL: `$1` markers, arrays, lower-case folding.
    pub fn postgres() -> Self {
        let simple_types = SimpleTypeHolder::new();
        Dialect::builder("postgres", BindMarkersFactory::indexed("$", 1))
            .arrays(ArrayColumns::supported(simple_types.clone()).widening_tiny_int())
            .identifier_processing(IdentifierProcessing::new(
                Quoting::ANSI,
                LetterCasing::LowerCase,
            ))
            .simple_types(simple_types)
            .build()
    }

    /// H2: `$1` markers, arrays, upper-case folding.
    pub fn h2() -> Self {
        let simple_types = SimpleTypeHolder::new();
        Dialect::builder("h2", BindMarkersFactory::indexed("$", 1))
            .arrays(ArrayColumns::supported(simple_types.clone()))
            .identifier_processing(IdentifierProcessing::ANSI)
            .simple_types(simple_types)
            .build()
    }

    /// MySQL: anonymous `?` markers, backtick quoting, booleans as TINYINT.
    pub fn mysql() -> Self {
        Dialect::builder("mysql", BindMarkersFactory::anonymous("?"))
            .identifier_processing(IdentifierProcessing::new(
                Quoting::BACKTICK,
                LetterCasing::AsIs,
            ))
            .limit_style(LimitStyle::LimitOffset {
                max_rows: Some("18446744073709551615"),
            })
            .converter(Arc::new(BooleanAsTinyInt))
            .build()
    }

    /// SQLite: `?1` markers, no arrays.
    pub fn sqlite() -> Self {
        Dialect::builder("sqlite", BindMarkersFactory::indexed("?", 1))
            .identifier_processing(IdentifierProcessing::new(Quoting::ANSI, LetterCasing::AsIs))
            .limit_style(LimitStyle::LimitOffset {
                max_rows: Some("-1"),
            })
            .build()
    }

    /// SQL Server: `@P0_name` markers, bracket quoting, OFFSET/FETCH paging.
    pub fn sql_server() -> Self {
        Dialect::builder("sql_server", BindMarkersFactory::named("@", "P", 32))
            .identifier_processing(IdentifierProcessing::new(
                Quoting::BRACKETS,
                LetterCasing::AsIs,
            ))
            .limit_style(LimitStyle::OffsetFetch)
            .build()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn bind_markers_factory(&self) -> &BindMarkersFactory {
        &self.bind_markers
    }

    pub fn array_support(&self) -> &ArrayColumns {
        &self.arrays
    }

    pub fn identifier_processing(&self) -> &IdentifierProcessing {
        &self.identifier_processing
    }

    pub fn limit_style(&self) -> LimitStyle {
        self.limit_style
    }

    pub fn simple_type_holder(&self) -> &SimpleTypeHolder {
        &self.simple_types
    }

    /// Store converters, applied after any user converters.
    pub fn converters(&self) -> &[Arc<dyn Converter>] {
        &self.converters
    }

    /// Render an identifier with this dialect's quoting rules.
    pub fn to_sql(&self, identifier: &SqlIdentifier) -> String {
        identifier.to_sql(&self.identifier_processing)
    }

    /// Store array type for arrays whose elements have type `element`.
    pub fn array_type(&self, element: &SqlType) -> Result<SqlType> {
        self.arrays.array_type(element, self.name)
    }
}

/// Builder for custom dialects.
#[derive(Debug)]
pub struct DialectBuilder {
    dialect: Dialect,
}

impl DialectBuilder {
    #[must_use]
    pub fn arrays(mut self, arrays: ArrayColumns) -> Self {
        self.dialect.arrays = arrays;
        self
    }

    #[must_use]
    pub fn identifier_processing(mut self, processing: IdentifierProcessing) -> Self {
        self.dialect.identifier_processing = processing;
        self
    }

    #[must_use]
    pub fn limit_style(mut self, style: LimitStyle) -> Self {
        self.dialect.limit_style = style;
        self
    }

    #[must_use]
    pub fn simple_types(mut self, simple_types: SimpleTypeHolder) -> Self {
        self.dialect.simple_types = simple_types;
        self
    }

    #[must_use]
    pub fn converter(mut self, converter: Arc<dyn Converter>) -> Self {
        self.dialect.converters.push(converter);
        self
    }

    pub fn build(self) -> Dialect {
        self.dialect
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postgres_widens_tiny_int_and_rejects_custom_elements() {
        let pg = Dialect::postgres();
        assert!(pg.array_support().is_supported());
        assert_eq!(pg.array_type(&SqlType::TinyInt).unwrap(), SqlType::SmallInt);
        assert_eq!(pg.array_type(&SqlType::Text).unwrap(), SqlType::Text);
        assert!(
            pg.array_type(&SqlType::Custom("POINT".into()))
                .unwrap_err()
                .is_unsupported()
        );
    }

    #[test]
    fn dialects_without_arrays_reject_array_types() {
        for dialect in [Dialect::mysql(), Dialect::sqlite(), Dialect::sql_server()] {
            assert!(!dialect.array_support().is_supported());
            let err = dialect.array_type(&SqlType::Integer).unwrap_err();
            assert!(err.is_unsupported(), "{}", dialect.name());
        }
        assert_eq!(Dialect::h2().array_type(&SqlType::TinyInt).unwrap(), SqlType::TinyInt);
    }

    #[test]
    fn identifier_rendering_per_dialect() {
        let id = SqlIdentifier::quoted("MyTable");
        assert_eq!(Dialect::postgres().to_sql(&id), "\"mytable\"");
        assert_eq!(Dialect::h2().to_sql(&id), "\"MYTABLE\"");
        assert_eq!(Dialect::mysql().to_sql(&id), "`MyTable`");
        assert_eq!(Dialect::sql_server().to_sql(&id), "[MyTable]");
        assert_eq!(
            Dialect::postgres().to_sql(&SqlIdentifier::unquoted("MyTable")),
            "MyTable"
        );
    }

    #[test]
    fn paging_clauses() {
        let pg = Dialect::postgres().limit_style();
        assert_eq!(pg.render(None, None), None);
        assert_eq!(pg.render(Some(10), None).as_deref(), Some("LIMIT 10"));
        assert_eq!(pg.render(Some(10), Some(20)).as_deref(), Some("LIMIT 10 OFFSET 20"));
        assert_eq!(pg.render(None, Some(5)).as_deref(), Some("OFFSET 5"));
        assert_eq!(
            Dialect::sqlite().limit_style().render(None, Some(5)).as_deref(),
            Some("LIMIT -1 OFFSET 5")
        );

        let mssql = Dialect::sql_server().limit_style();
        assert!(mssql.requires_order_by());
        assert_eq!(
            mssql.render(Some(10), None).as_deref(),
            Some("OFFSET 0 ROWS FETCH NEXT 10 ROWS ONLY")
        );
        assert_eq!(mssql.render(None, Some(3)).as_deref(), Some("OFFSET 3 ROWS"));
    }

    #[test]
    fn mysql_carries_boolean_store_converter() {
        let mysql = Dialect::mysql();
        assert_eq!(mysql.converters().len(), 1);
        assert!(!mysql.bind_markers_factory().identifiable_placeholders());
        assert!(Dialect::postgres().converters().is_empty());
    }
}
