//! Single-shot release capability handed out by `acquire`.

use tokio::sync::OwnedRwLockReadGuard;

use crate::engine::SatKey;

use super::SatRegistry;

/// A borrowed satellite.
///
/// Holds the per-satellite read lock (blocking eviction of the key) and
/// one reference count in the registry. Dropping the lease releases
/// both, on every exit path; the reference-count decrement is a no-op
/// if the entry is already at zero, so the release cannot underflow.
///
/// Leases must not outlive the request that acquired them.
pub struct SatLease {
    key: SatKey,
    registry: SatRegistry,
    // Field drop runs after `Drop::drop`, so the read lock is released
    // only after the refcount decrement.
    _read_guard: OwnedRwLockReadGuard<()>,
}

impl SatLease {
    pub(super) fn new(
        key: SatKey,
        registry: SatRegistry,
        read_guard: OwnedRwLockReadGuard<()>,
    ) -> Self {
        Self {
            key,
            registry,
            _read_guard: read_guard,
        }
    }

    /// The engine key this lease covers.
    pub fn key(&self) -> SatKey {
        self.key
    }

    /// Release explicitly. Equivalent to dropping the lease.
    pub fn release(self) {}
}

impl std::fmt::Debug for SatLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SatLease").field("key", &self.key).finish()
    }
}

impl Drop for SatLease {
    fn drop(&mut self) {
        self.registry.note_released(self.key);
    }
}
