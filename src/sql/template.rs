//! Memoized SQL statement templates
//!
//! Templates are a pure function of (statement kind, table name) for a given
//! mapping table, so entries are never invalidated.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

/// Kind of generated CRUD statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Select,
    SelectAll,
    SelectAllUnsorted,
    Insert,
    Update,
    UpdateChecked,
    Delete,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatementKind::Select => "SELECT",
            StatementKind::SelectAll => "SELECT-ALL",
            StatementKind::SelectAllUnsorted => "SELECT-ALL-UNSORTED",
            StatementKind::Insert => "INSERT",
            StatementKind::Update => "UPDATE",
            StatementKind::UpdateChecked => "UPDATE-CHECKED",
            StatementKind::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// Cache key: statement kind plus target table
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateKey {
    pub kind: StatementKind,
    pub table: String,
}

impl TemplateKey {
    pub fn new(kind: StatementKind, table: impl Into<String>) -> Self {
        Self {
            kind,
            table: table.into(),
        }
    }
}

/// Concurrent, unbounded statement cache
///
/// Concurrent misses on the same key may each run the generator, but only
/// one result is stored and every caller receives that stored value.
#[derive(Debug, Default)]
pub struct TemplateCache {
    inner: DashMap<TemplateKey, Arc<str>>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached template for `key`, generating it on first use
    pub fn get_or_generate<F>(&self, key: TemplateKey, generator: F) -> Arc<str>
    where
        F: FnOnce() -> String,
    {
        if let Some(sql) = self.inner.get(&key) {
            return Arc::clone(sql.value());
        }

        let entry = self
            .inner
            .entry(key)
            .or_insert_with(|| Arc::from(generator()));
        Arc::clone(entry.value())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_generator_runs_once_per_key() {
        let cache = TemplateCache::new();
        let calls = AtomicUsize::new(0);
        let generate = || {
            calls.fetch_add(1, Ordering::SeqCst);
            "SELECT 1".to_string()
        };

        let first = cache.get_or_generate(TemplateKey::new(StatementKind::Select, "t"), generate);
        let second = cache.get_or_generate(TemplateKey::new(StatementKind::Select, "t"), generate);

        assert_eq!(&*first, "SELECT 1");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_keys_are_distinct_by_kind_and_table() {
        let cache = TemplateCache::new();
        cache.get_or_generate(TemplateKey::new(StatementKind::Select, "a"), || "s-a".into());
        cache.get_or_generate(TemplateKey::new(StatementKind::Select, "b"), || "s-b".into());
        cache.get_or_generate(TemplateKey::new(StatementKind::Delete, "a"), || "d-a".into());

        assert_eq!(cache.len(), 3);
        let sql = cache.get_or_generate(TemplateKey::new(StatementKind::Select, "b"), || {
            panic!("must not regenerate")
        });
        assert_eq!(&*sql, "s-b");
    }

    #[test]
    fn test_concurrent_access_converges() {
        let cache = Arc::new(TemplateCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                std::thread::spawn(move || {
                    cache.get_or_generate(TemplateKey::new(StatementKind::Insert, "t"), || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        "INSERT INTO t (a) VALUES (?)".to_string()
                    })
                })
            })
            .collect();

        let results: Vec<Arc<str>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
        assert_eq!(cache.len(), 1);
        assert!(calls.load(Ordering::SeqCst) >= 1);
    }
}
