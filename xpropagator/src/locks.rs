//! Per-satellite lock table.
//!
//! Maps an engine key to a reader-writer lock. The write lock is held
//! around native create/initialize/destroy of that key's state; the
//! read lock is held for the duration of any propagation using the key.
//! Concurrent reads are permitted by the lock but serialized in practice
//! by the engine gate - the read lock exists to block eviction while a
//! propagation is in flight.
//!
//! The table is lazily populated and never shrunk; a lock outliving its
//! satellite costs a few words and avoids teardown races.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::RwLock;

use crate::engine::SatKey;

/// Concurrency-safe satellite key to reader-writer lock table.
#[derive(Default)]
pub struct KeyLockTable {
    locks: DashMap<SatKey, Arc<RwLock<()>>>,
}

impl KeyLockTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the lock for a key, creating it on first use.
    ///
    /// Lookup and insert are a single atomic operation on the underlying
    /// map, so concurrent callers always observe the same lock.
    pub fn lock_for(&self, key: SatKey) -> Arc<RwLock<()>> {
        self.locks
            .entry(key)
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }

    /// Number of keys with a materialized lock.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether the table has no materialized locks.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
