//! Plan interning.
//!
//! Structurally equal plans have equal fingerprints. [`PlanCache`] keeps the
//! first plan it saw for each fingerprint and hands that same `Arc` back for
//! every later equal plan, so repeated compiles of one query share one tree.

use indexmap::IndexMap;
use parking_lot::Mutex;
use polyplan_core::algebra::PlanRef;
use serde::Serialize;
use std::sync::Arc;

/// Hit and miss counters of a [`PlanCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups that returned a stored plan.
    pub hits: u64,
    /// Lookups that stored a new plan.
    pub misses: u64,
    /// Plans currently stored.
    pub entries: usize,
}

impl CacheStats {
    /// Fraction of lookups that were hits, or zero before any lookup.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct CacheInner {
    plans: IndexMap<String, PlanRef>,
    hits: u64,
    misses: u64,
}

/// A bounded, fingerprint-keyed plan interner.
///
/// When full, the oldest stored plan is evicted first.
pub struct PlanCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

impl PlanCache {
    /// Creates a cache holding at most `capacity` plans.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(CacheInner {
                plans: IndexMap::with_capacity(capacity.min(1024)),
                hits: 0,
                misses: 0,
            }),
        }
    }

    /// Returns the stored plan equal to `plan`, storing `plan` if there is
    /// none.
    ///
    /// With zero capacity nothing is stored and `plan` is returned as is.
    pub fn intern(&self, plan: PlanRef) -> PlanRef {
        if self.capacity == 0 {
            return plan;
        }
        let mut inner = self.inner.lock();
        if let Some(stored) = inner.plans.get(plan.fingerprint()) {
            let stored = Arc::clone(stored);
            inner.hits += 1;
            return stored;
        }
        inner.misses += 1;
        if inner.plans.len() >= self.capacity {
            inner.plans.shift_remove_index(0);
        }
        inner
            .plans
            .insert(plan.fingerprint().to_string(), Arc::clone(&plan));
        plan
    }

    /// Returns the stored plan with fingerprint `fingerprint`, if any.
    #[must_use]
    pub fn get(&self, fingerprint: &str) -> Option<PlanRef> {
        self.inner.lock().plans.get(fingerprint).cloned()
    }

    /// Returns the current counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            entries: inner.plans.len(),
        }
    }

    /// Returns the maximum number of stored plans.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drops all stored plans and resets the counters.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.plans.clear();
        inner.hits = 0;
        inner.misses = 0;
    }
}

impl std::fmt::Debug for PlanCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanCache")
            .field("capacity", &self.capacity)
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyplan_common::types::{EntityId, NamespaceId};
    use polyplan_core::algebra::PlanNode;
    use polyplan_core::catalog::EntityRef;

    fn scan(id: u64) -> PlanRef {
        PlanNode::scan(EntityRef::graph(
            EntityId::new(id),
            format!("g{id}"),
            NamespaceId::new(0),
        ))
        .unwrap()
    }

    #[test]
    fn test_intern_returns_first_plan() {
        let cache = PlanCache::new(8);
        let first = scan(1);
        let second = scan(1);
        assert!(!Arc::ptr_eq(&first, &second));

        let a = cache.intern(Arc::clone(&first));
        let b = cache.intern(second);
        assert!(Arc::ptr_eq(&a, &first));
        assert!(Arc::ptr_eq(&b, &first));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_fifo_eviction() {
        let cache = PlanCache::new(2);
        let one = scan(1);
        cache.intern(Arc::clone(&one));
        cache.intern(scan(2));
        cache.intern(scan(3));

        assert_eq!(cache.stats().entries, 2);
        assert!(cache.get(one.fingerprint()).is_none());
        assert!(cache.get(scan(3).fingerprint()).is_some());
    }

    #[test]
    fn test_zero_capacity_disables() {
        let cache = PlanCache::new(0);
        let plan = scan(1);
        let out = cache.intern(Arc::clone(&plan));
        assert!(Arc::ptr_eq(&out, &plan));
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn test_clear() {
        let cache = PlanCache::new(4);
        cache.intern(scan(1));
        cache.intern(scan(1));
        cache.clear();
        assert_eq!(cache.stats(), CacheStats::default());
    }
}
