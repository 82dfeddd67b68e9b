//! Runner cache — memoized harness sources
//!
//! Generated harnesses are pure functions of `(problem, ir_version,
//! generator_version, language)`, so the cache is a plain keyed map. A hit
//! requires all four key components to match; a stale entry is never
//! served, it simply misses. Entries for superseded IR versions can be
//! dropped with [`RunnerCache::prune`].

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

/// Cache key: every component participates in the match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub problem_id: String,
    pub ir_version: u32,
    pub generator_version: String,
    pub language: String,
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub content: String,
    pub generated_at: DateTime<Utc>,
}

/// In-process harness cache. Concurrent reads are cheap; writes of the same
/// content are idempotent.
#[derive(Default)]
pub struct RunnerCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl RunnerCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<String> {
        let entries = self.entries.read().expect("runner cache lock poisoned");
        entries.get(key).map(|e| e.content.clone())
    }

    pub fn put(&self, key: CacheKey, content: String) {
        let mut entries = self.entries.write().expect("runner cache lock poisoned");
        entries.entry(key).or_insert_with(|| CacheEntry {
            content,
            generated_at: Utc::now(),
        });
    }

    /// Drop entries for `problem_id` older than `newest_ir_version`.
    pub fn prune(&self, problem_id: &str, newest_ir_version: u32) {
        let mut entries = self.entries.write().expect("runner cache lock poisoned");
        entries.retain(|k, _| k.problem_id != problem_id || k.ir_version >= newest_ir_version);
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("runner cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(problem: &str, version: u32) -> CacheKey {
        CacheKey {
            problem_id: problem.into(),
            ir_version: version,
            generator_version: "1".into(),
            language: "python".into(),
        }
    }

    #[test]
    fn test_hit_requires_all_components() {
        let cache = RunnerCache::new();
        cache.put(key("p1", 1), "harness".into());

        assert_eq!(cache.get(&key("p1", 1)).as_deref(), Some("harness"));
        assert_eq!(cache.get(&key("p1", 2)), None);
        assert_eq!(cache.get(&key("p2", 1)), None);

        let mut other_gen = key("p1", 1);
        other_gen.generator_version = "2".into();
        assert_eq!(cache.get(&other_gen), None);

        let mut other_lang = key("p1", 1);
        other_lang.language = "ruby".into();
        assert_eq!(cache.get(&other_lang), None);
    }

    #[test]
    fn test_put_is_idempotent() {
        let cache = RunnerCache::new();
        cache.put(key("p1", 1), "first".into());
        cache.put(key("p1", 1), "second".into());
        // first write wins; duplicate writes of identical keys do not churn
        assert_eq!(cache.get(&key("p1", 1)).as_deref(), Some("first"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_prune_drops_stale_versions() {
        let cache = RunnerCache::new();
        cache.put(key("p1", 1), "old".into());
        cache.put(key("p1", 2), "new".into());
        cache.put(key("p2", 1), "other".into());

        cache.prune("p1", 2);

        assert_eq!(cache.get(&key("p1", 1)), None);
        assert_eq!(cache.get(&key("p1", 2)).as_deref(), Some("new"));
        assert_eq!(cache.get(&key("p2", 1)).as_deref(), Some("other"));
    }
}
