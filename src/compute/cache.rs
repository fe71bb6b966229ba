//! Execution cache memoizing (fingerprint, goal) evaluations.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use super::chromosome::Fingerprint;
use super::execution::Execution;
use super::goal::Goal;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    fingerprint: Fingerprint,
    goal: Goal,
}

/// Append-only memo of execution results for one run.
///
/// Shared by reference across evaluation workers; reads and inserts are
/// serialized through an internal lock. Entries are never evicted.
#[derive(Debug, Default)]
pub struct ExecutionCache {
    entries: RwLock<HashMap<CacheKey, Execution>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Cache usage counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Stored (fingerprint, goal) results.
    pub entries: usize,
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that required execution.
    pub misses: u64,
}

impl ExecutionCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the stored result for a (fingerprint, goal) pair.
    pub fn lookup(&self, fingerprint: &Fingerprint, goal: &Goal) -> Option<Execution> {
        let key = CacheKey {
            fingerprint: fingerprint.clone(),
            goal: goal.clone(),
        };
        let found = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned();

        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Store a result. An existing entry for the same key is kept.
    pub fn insert(&self, fingerprint: Fingerprint, goal: Goal, execution: Execution) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(CacheKey { fingerprint, goal })
            .or_insert(execution);
    }

    /// Check for a stored result without touching the counters.
    pub fn contains(&self, fingerprint: &Fingerprint, goal: &Goal) -> bool {
        let key = CacheKey {
            fingerprint: fingerprint.clone(),
            goal: goal.clone(),
        };
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&key)
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of usage counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::ObservationVector;

    fn fp(code: &str) -> Fingerprint {
        Fingerprint::new(code)
    }

    #[test]
    fn test_lookup_and_insert() {
        let cache = ExecutionCache::new();
        let goal = Goal::at("g", "U", "f", 1);

        assert!(cache.lookup(&fp("a"), &goal).is_none());

        cache.insert(
            fp("a"),
            goal.clone(),
            Execution::covered(Some(ObservationVector::from_ints(&[1, 2]))),
        );

        let hit = cache.lookup(&fp("a"), &goal).unwrap();
        assert!(hit.is_covered());
        assert_eq!(cache.len(), 1);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_keys_are_per_goal() {
        let cache = ExecutionCache::new();
        let g1 = Goal::at("g1", "U", "f", 1);
        let g2 = Goal::at("g2", "U", "f", 2);

        cache.insert(fp("a"), g1.clone(), Execution::uncovered(0.5));

        assert!(cache.contains(&fp("a"), &g1));
        assert!(!cache.contains(&fp("a"), &g2));
        assert!(!cache.contains(&fp("b"), &g1));
    }

    #[test]
    fn test_insert_is_append_only() {
        let cache = ExecutionCache::new();
        let g = Goal::at("g", "U", "f", 1);

        cache.insert(fp("a"), g.clone(), Execution::uncovered(0.5));
        cache.insert(fp("a"), g.clone(), Execution::uncovered(0.9));

        assert_eq!(cache.lookup(&fp("a"), &g).unwrap().fitness, 0.5);
        assert_eq!(cache.len(), 1);
    }
}
