//! Process-wide cache of compiled rule sets.
//!
//! Entries are keyed by [`RuleSetHash`], so any change to a rule's content or
//! owner produces a fresh compilation and stale entries simply age out.
//! Each slot holds a `OnceLock`: concurrent callers asking for the same hash
//! wait on one compilation instead of racing to build their own.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, instrument};

use crate::compiler::{CompiledRuleSet, RuleCompiler};
use crate::hash::RuleSetHash;
use crate::model::RuleDefinition;

/// Sizing and eviction pacing
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Evict once the cache grows past this many entries
    pub max_entries: usize,
    /// Minimum time between two eviction sweeps
    pub min_eviction_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 256,
            min_eviction_interval: Duration::from_secs(30),
        }
    }
}

/// Point-in-time counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub compilations: u64,
    pub evictions: u64,
}

#[derive(Debug)]
struct Slot {
    compiled: Arc<OnceLock<Arc<CompiledRuleSet>>>,
    /// Clock tick at insertion; hits leave it alone
    inserted: u64,
}

#[derive(Debug, Default)]
pub struct RuleCache {
    compiler: RuleCompiler,
    config: CacheConfig,
    entries: RwLock<HashMap<RuleSetHash, Slot>>,
    clock: AtomicU64,
    last_eviction: Mutex<Option<Instant>>,
    hits: AtomicU64,
    misses: AtomicU64,
    compilations: AtomicU64,
    evictions: AtomicU64,
}

impl RuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    pub fn compiler(&self) -> &RuleCompiler {
        &self.compiler
    }

    /// Compiled form of `definition` for `owner_key`, compiling at most once
    #[instrument(skip(self, definition), fields(rule = %definition.id))]
    pub fn get_or_compile(&self, definition: &RuleDefinition, owner_key: &str) -> Arc<CompiledRuleSet> {
        let hash = RuleSetHash::compute(definition, owner_key);
        let existing = self.entries.read().get(&hash).map(|slot| Arc::clone(&slot.compiled));

        let cell = match existing {
            Some(cell) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                cell
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                let tick = self.clock.fetch_add(1, Ordering::Relaxed);
                let mut entries = self.entries.write();
                let slot = entries.entry(hash.clone()).or_insert_with(|| Slot {
                    compiled: Arc::new(OnceLock::new()),
                    inserted: tick,
                });
                Arc::clone(&slot.compiled)
            }
        };

        // Compile outside the map lock; other callers of this hash block here
        let compiled = cell
            .get_or_init(|| {
                self.compilations.fetch_add(1, Ordering::Relaxed);
                debug!(hash = %hash, "Compiling rule set");
                Arc::new(self.compiler.compile_with_hash(definition, owner_key, hash.clone()))
            })
            .clone();

        self.maybe_evict();
        compiled
    }

    /// Drop the entry for one rule/owner pair
    pub fn invalidate(&self, definition: &RuleDefinition, owner_key: &str) -> bool {
        self.invalidate_hash(&RuleSetHash::compute(definition, owner_key))
    }

    /// Drop the entry for a hash, e.g. one taken from `CompiledRuleSet::hash`
    pub fn invalidate_hash(&self, hash: &RuleSetHash) -> bool {
        self.entries.write().remove(hash).is_some()
    }

    pub fn clear(&self) {
        let removed = {
            let mut entries = self.entries.write();
            let n = entries.len();
            entries.clear();
            n
        };
        self.compiler.regex_cache().clear();
        info!("Cleared rule cache ({} entries)", removed);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            compilations: self.compilations.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Remove the oldest inserted half once over capacity, at most once per
    /// `min_eviction_interval`. Hits do not extend an entry's life.
    fn maybe_evict(&self) {
        if self.entries.read().len() <= self.config.max_entries {
            return;
        }

        {
            let mut last = self.last_eviction.lock();
            let now = Instant::now();
            if let Some(at) = *last {
                if now.duration_since(at) < self.config.min_eviction_interval {
                    return;
                }
            }
            *last = Some(now);
        }

        let mut entries = self.entries.write();
        if entries.len() <= self.config.max_entries {
            return;
        }

        let mut by_age: Vec<(u64, RuleSetHash)> = entries
            .iter()
            .map(|(hash, slot)| (slot.inserted, hash.clone()))
            .collect();
        by_age.sort_unstable_by_key(|(inserted, _)| *inserted);

        let victims = entries.len() / 2;
        for (_, hash) in by_age.into_iter().take(victims) {
            entries.remove(&hash);
        }
        self.evictions.fetch_add(victims as u64, Ordering::Relaxed);
        debug!(evicted = victims, remaining = entries.len(), "Evicted compiled rule sets");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Condition, ConditionGroup};
    use std::sync::Barrier;
    use std::thread;

    fn rule(id: &str, genre: &str) -> RuleDefinition {
        RuleDefinition::new(
            id,
            vec![ConditionGroup::new(vec![Condition::new("Genres", "Contains", genre)])],
        )
    }

    #[test]
    fn test_same_rule_returns_same_instance() {
        let cache = RuleCache::new();
        let a = cache.get_or_compile(&rule("r", "Drama"), "owner");
        let b = cache.get_or_compile(&rule("r", "Drama"), "owner");
        assert!(Arc::ptr_eq(&a, &b));

        let stats = cache.stats();
        assert_eq!(stats.compilations, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_changed_rule_or_owner_recompiles() {
        let cache = RuleCache::new();
        let a = cache.get_or_compile(&rule("r", "Drama"), "owner");
        let b = cache.get_or_compile(&rule("r", "Comedy"), "owner");
        let c = cache.get_or_compile(&rule("r", "Drama"), "someone-else");
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(cache.stats().compilations, 3);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_concurrent_callers_share_one_compilation() {
        let cache = RuleCache::new();
        let definition = rule("shared", "Horror");
        let barrier = Barrier::new(8);

        let results: Vec<Arc<CompiledRuleSet>> = thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        cache.get_or_compile(&definition, "owner")
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(cache.stats().compilations, 1);
        assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
    }

    #[test]
    fn test_eviction_removes_oldest_half() {
        let cache = RuleCache::new().with_config(CacheConfig {
            max_entries: 4,
            min_eviction_interval: Duration::ZERO,
        });
        for i in 0..4 {
            cache.get_or_compile(&rule(&format!("r{i}"), "Drama"), "owner");
        }
        // A hit on r0 does not save it: r0 and r1 were inserted first
        cache.get_or_compile(&rule("r0", "Drama"), "owner");
        cache.get_or_compile(&rule("r4", "Drama"), "owner");

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.stats().evictions, 2);

        let before = cache.stats().compilations;
        for kept in ["r2", "r3", "r4"] {
            cache.get_or_compile(&rule(kept, "Drama"), "owner");
        }
        assert_eq!(cache.stats().compilations, before);

        cache.get_or_compile(&rule("r0", "Drama"), "owner");
        assert_eq!(cache.stats().compilations, before + 1);
    }

    #[test]
    fn test_modifier_change_recompiles() {
        let cache = RuleCache::new();
        let plain = RuleDefinition::new(
            "r",
            vec![ConditionGroup::new(vec![Condition::new("Collections", "Contains", "Marvel")])],
        );
        let expanding = RuleDefinition::new(
            "r",
            vec![ConditionGroup::new(vec![
                Condition::new("Collections", "Contains", "Marvel").with_episodes_within_series(true),
            ])],
        );

        let a = cache.get_or_compile(&plain, "owner");
        let b = cache.get_or_compile(&expanding, "owner");
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.stats().compilations, 2);
        assert!(!a.expands_series());
        assert!(b.expands_series());
    }

    #[test]
    fn test_eviction_is_rate_limited() {
        let cache = RuleCache::new().with_config(CacheConfig {
            max_entries: 2,
            min_eviction_interval: Duration::from_secs(3600),
        });
        for i in 0..3 {
            cache.get_or_compile(&rule(&format!("r{i}"), "Drama"), "owner");
        }
        assert_eq!(cache.len(), 2);
        for i in 3..6 {
            cache.get_or_compile(&rule(&format!("r{i}"), "Drama"), "owner");
        }
        // Second sweep suppressed until the interval passes
        assert_eq!(cache.len(), 5);
    }

    #[test]
    fn test_invalidate_and_clear() {
        let cache = RuleCache::new();
        let definition = rule("r", "Drama");
        cache.get_or_compile(&definition, "owner");
        assert!(cache.invalidate(&definition, "owner"));
        assert!(!cache.invalidate(&definition, "owner"));

        let compiled = cache.get_or_compile(&definition, "owner");
        assert!(cache.invalidate_hash(&compiled.hash));

        cache.get_or_compile(&definition, "owner");
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().compilations, 3);
    }
}
