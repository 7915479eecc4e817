//! Caches of parsed query templates.
//!
//! Repository queries run the same template many times; parsing is keyed by
//! the template text so each one is lexed once. [`ParsedSqlCache`] holds
//! named-parameter templates, [`ExpressionQueryCache`] holds rewritten
//! expression queries.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::expression::ExpressionQuery;
use crate::named::ParsedSql;

/// Default number of cached templates.
pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug)]
struct CachedTemplate<V> {
    value: Arc<V>,
    last_used: Instant,
    hit_count: u64,
}

/// LRU map from template text to its parsed form.
#[derive(Debug)]
struct TemplateCache<V> {
    cache: HashMap<String, CachedTemplate<V>>,
    capacity: usize,
}

impl<V> TemplateCache<V> {
    fn new(capacity: usize) -> Self {
        Self {
            cache: HashMap::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity,
        }
    }

    fn get_or_insert_with(&mut self, sql: &str, parse: impl FnOnce(&str) -> V) -> Arc<V> {
        if self.capacity == 0 {
            return Arc::new(parse(sql));
        }
        if let Some(entry) = self.cache.get_mut(sql) {
            entry.last_used = Instant::now();
            entry.hit_count += 1;
            return Arc::clone(&entry.value);
        }

        tracing::debug!(sql = %sql, "Template cache miss");
        if self.cache.len() >= self.capacity {
            self.evict_lru();
        }
        let value = Arc::new(parse(sql));
        self.cache.insert(
            sql.to_string(),
            CachedTemplate {
                value: Arc::clone(&value),
                last_used: Instant::now(),
                hit_count: 1,
            },
        );
        value
    }

    fn evict_lru(&mut self) {
        let lru = self
            .cache
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(sql, _)| sql.clone());
        if let Some(sql) = lru {
            self.cache.remove(&sql);
        }
    }
}

/// LRU cache of [`ParsedSql`] keyed by template text.
///
/// When the cache is full the least-recently-used entry is evicted.
///
/// # Example
///
/// ```
/// use relmap_query::ParsedSqlCache;
///
/// let mut cache = ParsedSqlCache::new(16);
/// let first = cache.get_or_parse("SELECT * FROM t WHERE id = :id");
/// let second = cache.get_or_parse("SELECT * FROM t WHERE id = :id");
/// assert!(std::sync::Arc::ptr_eq(&first, &second));
/// assert_eq!(cache.hit_count("SELECT * FROM t WHERE id = :id"), Some(2));
/// ```
#[derive(Debug)]
pub struct ParsedSqlCache {
    inner: TemplateCache<ParsedSql>,
}

impl ParsedSqlCache {
    /// Create a cache holding at most `capacity` templates. A capacity of
    /// zero disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: TemplateCache::new(capacity),
        }
    }

    /// Get the parsed template, parsing it on a miss.
    pub fn get_or_parse(&mut self, sql: &str) -> Arc<ParsedSql> {
        self.inner.get_or_insert_with(sql, ParsedSql::parse)
    }

    pub fn contains(&self, sql: &str) -> bool {
        self.inner.cache.contains_key(sql)
    }

    /// Number of lookups served for `sql`, including the first parse.
    pub fn hit_count(&self, sql: &str) -> Option<u64> {
        self.inner.cache.get(sql).map(|entry| entry.hit_count)
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn len(&self) -> usize {
        self.inner.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.cache.is_empty()
    }

    pub fn clear(&mut self) {
        self.inner.cache.clear();
    }
}

impl Default for ParsedSqlCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// LRU cache of [`ExpressionQuery`] rewrites keyed by source text.
#[derive(Debug)]
pub struct ExpressionQueryCache {
    inner: TemplateCache<ExpressionQuery>,
}

impl ExpressionQueryCache {
    /// A capacity of zero disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: TemplateCache::new(capacity),
        }
    }

    /// Get the rewritten query, rewriting it on a miss.
    pub fn get_or_create(&mut self, query: &str) -> Arc<ExpressionQuery> {
        self.inner.get_or_insert_with(query, ExpressionQuery::create)
    }

    pub fn len(&self) -> usize {
        self.inner.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.cache.is_empty()
    }
}

impl Default for ExpressionQueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
