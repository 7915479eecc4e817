//! Strategy configuration.
//!
//! Configuration is plain data: callers deserialize it from wherever they
//! keep settings and hand it to [`DataAccessStrategy::from_config`].
//!
//! [`DataAccessStrategy::from_config`]: crate::DataAccessStrategy::from_config

use serde::{Deserialize, Serialize};

use relmap_core::{Dialect, Error, Result};
use relmap_query::cache::DEFAULT_CAPACITY;

/// Built-in dialects selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialectName {
    /// `$1` markers, arrays, lower-case folding
    #[default]
    Postgres,
    /// `$1` markers, arrays, upper-case folding
    H2,
    /// `?` markers, booleans stored as TINYINT
    Mysql,
    /// `?1` markers
    Sqlite,
    /// `@P0_name` markers, OFFSET/FETCH paging
    SqlServer,
}

impl DialectName {
    /// Build the dialect descriptor.
    pub fn dialect(self) -> Dialect {
        match self {
            DialectName::Postgres => Dialect::postgres(),
            DialectName::H2 => Dialect::h2(),
            DialectName::Mysql => Dialect::mysql(),
            DialectName::Sqlite => Dialect::sqlite(),
            DialectName::SqlServer => Dialect::sql_server(),
        }
    }
}

/// Settings for a [`DataAccessStrategy`](crate::DataAccessStrategy).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Target dialect (default: postgres)
    pub dialect: DialectName,
    /// Number of parsed named-parameter templates to keep (default: 256, 0 disables)
    pub parsed_sql_cache_capacity: usize,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            dialect: DialectName::default(),
            parsed_sql_cache_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl StrategyConfig {
    /// Create a configuration for the given dialect with default settings.
    pub fn new(dialect: DialectName) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }

    /// Set the parsed-template cache capacity.
    pub fn parsed_sql_cache_capacity(mut self, capacity: usize) -> Self {
        self.parsed_sql_cache_capacity = capacity;
        self
    }

    /// Parse a JSON document. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::Custom(format!("invalid strategy configuration: {}", e)))
    }
}
