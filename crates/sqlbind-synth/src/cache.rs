//! Binding cache
//!
//! Read-through cache keyed by (statement text hash, schema version). The
//! cached value is the name-independent part of a descriptor - bindings plus
//! recorded problems - so identical statement texts at different ordinals
//! share one entry but keep distinct names, and a cache hit replays the same
//! diagnostics the original computation produced.
//!
//! Concurrent misses for one key collapse to a single computation: the first
//! caller marks the key pending and computes; racing callers wait on the
//! condvar and reuse the result. A computation that panics or is cancelled
//! removes its pending mark, so an entry is either fully committed or not
//! recorded at all.

use fxhash::hash64;
use hashbrown::HashMap;
use parking_lot::{Condvar, Mutex};
use sqlbind_binder::BindOutcome;
use std::sync::Arc;

/// Cache key: (statement text hash, schema version).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    text_hash: u64,
    schema_version: u64,
}

impl CacheKey {
    pub fn new(statement_text: &str, schema_version: u64) -> Self {
        CacheKey {
            text_hash: hash64(statement_text.as_bytes()),
            schema_version,
        }
    }
}

enum Slot {
    /// A computation is in flight; wait for it
    Pending,
    Ready(Arc<BindOutcome>),
}

#[derive(Default)]
pub struct BindingCache {
    state: Mutex<HashMap<CacheKey, Slot>>,
    ready: Condvar,
}

/// Removes the pending mark if the computation never committed.
struct PendingGuard<'a> {
    cache: &'a BindingCache,
    key: CacheKey,
    armed: bool,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.cache.state.lock().remove(&self.key);
            self.cache.ready.notify_all();
        }
    }
}

impl BindingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-through lookup with at-most-one inference per key.
    pub fn get_or_compute<F>(&self, key: CacheKey, compute: F) -> Arc<BindOutcome>
    where
        F: FnOnce() -> BindOutcome,
    {
        {
            let mut state = self.state.lock();
            loop {
                match state.get(&key) {
                    Some(Slot::Ready(outcome)) => return outcome.clone(),
                    Some(Slot::Pending) => {
                        self.ready.wait(&mut state);
                    }
                    None => {
                        state.insert(key, Slot::Pending);
                        break;
                    }
                }
            }
        }

        let mut guard = PendingGuard {
            cache: self,
            key,
            armed: true,
        };
        let outcome = Arc::new(compute());
        guard.armed = false;

        let mut state = self.state.lock();
        state.insert(key, Slot::Ready(outcome.clone()));
        drop(state);
        self.ready.notify_all();
        outcome
    }

    pub fn len(&self) -> usize {
        self.state.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlbind_binder::BoundQuery;
    use sqlbind_common::ResultShape;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn outcome() -> BindOutcome {
        BindOutcome {
            query: BoundQuery {
                params: Vec::new(),
                result: ResultShape::NoResult,
            },
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_same_text_same_key() {
        assert_eq!(CacheKey::new("SELECT 1", 7), CacheKey::new("SELECT 1", 7));
        assert_ne!(CacheKey::new("SELECT 1", 7), CacheKey::new("SELECT 2", 7));
        assert_ne!(CacheKey::new("SELECT 1", 7), CacheKey::new("SELECT 1", 8));
    }

    #[test]
    fn test_read_through() {
        let cache = BindingCache::new();
        let key = CacheKey::new("SELECT 1", 1);
        let calls = AtomicUsize::new(0);

        let first = cache.get_or_compute(key, || {
            calls.fetch_add(1, Ordering::SeqCst);
            outcome()
        });
        let second = cache.get_or_compute(key, || {
            calls.fetch_add(1, Ordering::SeqCst);
            outcome()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_concurrent_misses_collapse() {
        let cache = Arc::new(BindingCache::new());
        let key = CacheKey::new("SELECT 1", 1);
        let calls = Arc::new(AtomicUsize::new(0));

        std::thread::scope(|s| {
            for _ in 0..8 {
                let cache = cache.clone();
                let calls = calls.clone();
                s.spawn(move || {
                    cache.get_or_compute(key, || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        // widen the race window
                        std::thread::sleep(Duration::from_millis(50));
                        outcome()
                    })
                });
            }
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_panicked_computation_leaves_no_entry() {
        let cache = BindingCache::new();
        let key = CacheKey::new("SELECT 1", 1);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            cache.get_or_compute(key, || panic!("cancelled"));
        }));
        assert!(result.is_err());
        assert!(cache.is_empty());

        // the key is computable again afterwards
        let recovered = cache.get_or_compute(key, outcome);
        assert_eq!(recovered.query.result, ResultShape::NoResult);
    }
}
