//! Registry implementation: acquire/release protocol, LRU eviction,
//! TTL sweeper.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::{EngineAdapter, SatKey};
use crate::gate::{EngineGate, GateError};
use crate::locks::KeyLockTable;
use crate::tle::{self, TleError};

use super::SatLease;

/// Default ceiling on concurrently loaded satellites.
pub const DEFAULT_MAX_LOADED_SATS: usize = 500;

/// Default minimum idle time before TTL eviction.
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(10 * 60);

/// Default period of the background sweep.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Poll period of [`SatRegistry::wait_all_released`].
const RELEASE_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Registry tuning knobs.
///
/// Zero values fall back to the documented defaults at construction.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Satellites allowed loaded concurrently.
    pub max_loaded: usize,
    /// Minimum idle time before the sweeper may evict an entry.
    pub idle_ttl: Duration,
    /// Period of the background sweep.
    pub sweep_interval: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_loaded: DEFAULT_MAX_LOADED_SATS,
            idle_ttl: DEFAULT_IDLE_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

/// Errors surfaced by registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The catalog number on TLE line 1 is malformed or out of range.
    #[error("failed to parse catalog number from TLE first line: {0}")]
    Parse(#[from] TleError),

    /// An engine call failed or was cancelled at the gate.
    #[error(transparent)]
    Gate(#[from] GateError),

    /// A registry-level wait observed the caller's cancellation.
    #[error("registry operation cancelled")]
    Cancelled,
}

impl RegistryError {
    /// Whether the error is a cancellation (either flavor).
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            RegistryError::Cancelled | RegistryError::Gate(GateError::Cancelled)
        )
    }
}

/// One loaded satellite, the registry's unit of accounting.
struct SatEntry {
    sat_num: i32,
    last_used: Instant,
    refs: usize,
}

struct RegistryInner {
    /// key -> entry; micro critical sections only, never held across
    /// an await.
    loaded: Mutex<HashMap<SatKey, SatEntry>>,
    /// Catalog-wide lock, held across engine existence checks and
    /// create/destroy sequences.
    catalog_mu: tokio::sync::Mutex<()>,
    locks: KeyLockTable,
    adapter: EngineAdapter,
    gate: Arc<EngineGate>,
    max_loaded: usize,
    idle_ttl: Duration,
    sweep_interval: Duration,
    shutdown: CancellationToken,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

/// Reference-counted LRU+TTL cache over loaded satellites.
///
/// Cheap to clone; all clones share one registry.
#[derive(Clone)]
pub struct SatRegistry {
    inner: Arc<RegistryInner>,
}

impl SatRegistry {
    /// Create the registry and start its background sweeper.
    ///
    /// Zero config values are replaced with the defaults.
    pub fn start(adapter: EngineAdapter, gate: Arc<EngineGate>, config: RegistryConfig) -> Self {
        let max_loaded = if config.max_loaded == 0 {
            DEFAULT_MAX_LOADED_SATS
        } else {
            config.max_loaded
        };
        let idle_ttl = if config.idle_ttl.is_zero() {
            DEFAULT_IDLE_TTL
        } else {
            config.idle_ttl
        };
        let sweep_interval = if config.sweep_interval.is_zero() {
            DEFAULT_SWEEP_INTERVAL
        } else {
            config.sweep_interval
        };

        let registry = Self {
            inner: Arc::new(RegistryInner {
                loaded: Mutex::new(HashMap::new()),
                catalog_mu: tokio::sync::Mutex::new(()),
                locks: KeyLockTable::new(),
                adapter,
                gate,
                max_loaded,
                idle_ttl,
                sweep_interval,
                shutdown: CancellationToken::new(),
                sweeper: Mutex::new(None),
            }),
        };

        info!(
            max_loaded,
            idle_ttl_secs = idle_ttl.as_secs(),
            sweep_interval_secs = sweep_interval.as_secs(),
            "satellite registry started"
        );

        let handle = tokio::spawn(registry.clone().run_sweeper());
        *registry.inner.sweeper.lock().unwrap() = Some(handle);

        registry
    }

    /// Stop the sweeper and wait for it to exit.
    pub async fn close(&self) {
        self.inner.shutdown.cancel();
        let handle = self.inner.sweeper.lock().unwrap().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("registry sweeper task failed: {e}");
            }
        }
        debug!("satellite registry closed");
    }

    /// Resolve or load the satellite described by a TLE pair.
    ///
    /// On a hit the existing entry is pinned; on a miss the satellite is
    /// added and initialized in the engine, evicting the least recently
    /// used idle entry first if the registry is at its ceiling. Either
    /// way the returned lease holds the per-satellite read lock and one
    /// reference count.
    pub async fn acquire(
        &self,
        cancel: &CancellationToken,
        line1: &str,
        line2: &str,
    ) -> Result<SatLease, RegistryError> {
        let sat_num = tle::parse_sat_num(line1)?;
        let inner = &self.inner;

        let catalog = inner.catalog_mu.lock().await;
        let mut existing: SatKey = -1;
        {
            let adapter = inner.adapter.clone();
            inner
                .gate
                .with_call(cancel, || {
                    existing = adapter.get_sat_key(sat_num);
                    0
                })
                .await?;
        }

        if existing == -1 {
            drop(catalog);

            let victims = self.evict_lru_if_needed(1);
            self.remove_victims(&CancellationToken::new(), &victims)
                .await;

            let key = self.add_or_init_sat(cancel, line1, line2).await?;
            let guard = inner.locks.lock_for(key).read_owned().await;

            self.note_acquired(key, sat_num);
            debug!(sat_num, key, "satellite loaded into registry");
            return Ok(SatLease::new(key, self.clone(), guard));
        }

        let key = existing;
        let guard = inner.locks.lock_for(key).read_owned().await;
        drop(catalog);

        self.note_acquired(key, sat_num);
        Ok(SatLease::new(key, self.clone(), guard))
    }

    /// Poll until every entry is unreferenced or the cancellation fires.
    pub async fn wait_all_released(&self, cancel: &CancellationToken) -> Result<(), RegistryError> {
        let mut ticker = tokio::time::interval(RELEASE_POLL_INTERVAL);
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RegistryError::Cancelled),
                _ = ticker.tick() => {
                    if self.all_released() {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Drain every reference, remove all satellites from both engine
    /// layers, and clear the registry.
    pub async fn remove_all(&self, cancel: &CancellationToken) -> Result<(), RegistryError> {
        let inner = &self.inner;
        let _catalog = inner.catalog_mu.lock().await;

        self.wait_all_released(cancel).await?;

        let adapter = inner.adapter.clone();
        inner
            .gate
            .with_call(cancel, || adapter.remove_all_propagator())
            .await?;
        let adapter = inner.adapter.clone();
        inner
            .gate
            .with_call(cancel, || adapter.remove_all_tle())
            .await?;

        inner.loaded.lock().unwrap().clear();
        info!("all satellites removed from registry");
        Ok(())
    }

    /// Whether no entry is currently referenced.
    pub fn all_released(&self) -> bool {
        self.inner
            .loaded
            .lock()
            .unwrap()
            .values()
            .all(|entry| entry.refs == 0)
    }

    /// Number of loaded satellites.
    pub fn loaded_count(&self) -> usize {
        self.inner.loaded.lock().unwrap().len()
    }

    /// Reference count of a loaded satellite, `None` when not loaded.
    pub fn refs_for(&self, key: SatKey) -> Option<usize> {
        self.inner
            .loaded
            .lock()
            .unwrap()
            .get(&key)
            .map(|entry| entry.refs)
    }

    /// Effective ceiling on loaded satellites.
    pub fn max_loaded(&self) -> usize {
        self.inner.max_loaded
    }

    /// Effective idle TTL.
    pub fn idle_ttl(&self) -> Duration {
        self.inner.idle_ttl
    }

    /// Effective sweep interval.
    pub fn sweep_interval(&self) -> Duration {
        self.inner.sweep_interval
    }

    /// Decrement an entry's reference count and bump its recency.
    ///
    /// Called from lease drop. A decrement at zero is a no-op.
    pub(super) fn note_released(&self, key: SatKey) {
        let now = Instant::now();
        let mut loaded = self.inner.loaded.lock().unwrap();
        if let Some(entry) = loaded.get_mut(&key) {
            if entry.refs > 0 {
                entry.refs -= 1;
                entry.last_used = now;
            }
        }
    }

    /// Record an acquisition: bump an existing entry or insert a fresh
    /// one.
    ///
    /// Inserting on the hit path re-seeds an entry whose registry record
    /// was lost while the engine still held the satellite; the engine
    /// catalog is the source of truth for presence.
    fn note_acquired(&self, key: SatKey, sat_num: i32) {
        let now = Instant::now();
        let mut loaded = self.inner.loaded.lock().unwrap();
        match loaded.get_mut(&key) {
            Some(entry) => {
                entry.refs += 1;
                entry.last_used = now;
            }
            None => {
                loaded.insert(
                    key,
                    SatEntry {
                        sat_num,
                        last_used: now,
                        refs: 1,
                    },
                );
            }
        }
    }

    /// Add the TLE to the engine and initialize it into the propagator
    /// layer, under the catalog lock and the per-key write lock.
    async fn add_or_init_sat(
        &self,
        cancel: &CancellationToken,
        line1: &str,
        line2: &str,
    ) -> Result<SatKey, RegistryError> {
        let inner = &self.inner;
        let catalog = inner.catalog_mu.lock().await;
        let key = match self.add_tle(cancel, line1, line2).await {
            Ok(key) => key,
            Err(e) => {
                drop(catalog);
                return Err(e);
            }
        };

        let write = inner.locks.lock_for(key).write_owned().await;
        drop(catalog);

        let adapter = inner.adapter.clone();
        let result = inner.gate.with_call(cancel, || adapter.init_sat(key)).await;
        drop(write);
        result?;

        Ok(key)
    }

    /// Add a TLE at the engine's TLE layer, reusing the existing key if
    /// the catalog number is already loaded.
    async fn add_tle(
        &self,
        cancel: &CancellationToken,
        line1: &str,
        line2: &str,
    ) -> Result<SatKey, RegistryError> {
        let sat_num = tle::parse_sat_num(line1)?;
        let inner = &self.inner;

        let mut existing: SatKey = -1;
        {
            let adapter = inner.adapter.clone();
            inner
                .gate
                .with_call(cancel, || {
                    existing = adapter.get_sat_key(sat_num);
                    0
                })
                .await?;
        }
        if existing != -1 {
            return Ok(existing);
        }

        let mut key: SatKey = 0;
        let adapter = inner.adapter.clone();
        inner
            .gate
            .with_call(cancel, || {
                key = adapter.add_sat_from_lines(line1, line2);
                if key <= 0 {
                    1
                } else {
                    0
                }
            })
            .await?;
        Ok(key)
    }

    /// Select LRU victims so that `need` more entries fit under the
    /// ceiling.
    ///
    /// Only unreferenced entries are candidates. When fewer candidates
    /// exist than needed, the selection is partial and the registry
    /// temporarily exceeds its ceiling rather than blocking the caller.
    fn evict_lru_if_needed(&self, need: usize) -> Vec<SatKey> {
        let loaded = self.inner.loaded.lock().unwrap();

        let excess = (loaded.len() + need).saturating_sub(self.inner.max_loaded);
        if excess == 0 {
            return Vec::new();
        }

        let mut candidates: Vec<(SatKey, Instant)> = loaded
            .iter()
            .filter(|(_, entry)| entry.refs == 0)
            .map(|(&key, entry)| (key, entry.last_used))
            .collect();
        if candidates.is_empty() {
            return Vec::new();
        }

        candidates.sort_by_key(|&(_, last_used)| last_used);
        candidates.truncate(excess);
        candidates.into_iter().map(|(key, _)| key).collect()
    }

    /// Remove victims from the engine (both layers) and the registry.
    ///
    /// Each removal re-checks under the per-key write lock and catalog
    /// lock that the entry is still unreferenced; a victim that was
    /// re-acquired in the meantime is skipped silently. Engine removal
    /// failures are logged and swallowed - the entry is dropped either
    /// way so a failing handle cannot wedge a registry slot.
    async fn remove_victims(&self, cancel: &CancellationToken, victims: &[SatKey]) {
        let inner = &self.inner;
        for &key in victims {
            let rw = inner.locks.lock_for(key);
            let _write = rw.write().await;
            let _catalog = inner.catalog_mu.lock().await;

            let should_remove = inner
                .loaded
                .lock()
                .unwrap()
                .get(&key)
                .is_some_and(|entry| entry.refs == 0);
            if !should_remove {
                continue;
            }

            let adapter = inner.adapter.clone();
            if let Err(e) = inner
                .gate
                .with_call(cancel, || adapter.remove_sat_propagator(key))
                .await
            {
                warn!(key, "propagator-layer removal failed during eviction: {e}");
            }
            let adapter = inner.adapter.clone();
            if let Err(e) = inner
                .gate
                .with_call(cancel, || adapter.remove_sat_tle(key))
                .await
            {
                warn!(key, "TLE-layer removal failed during eviction: {e}");
            }

            inner.loaded.lock().unwrap().remove(&key);
            debug!(key, "satellite evicted");
        }
    }

    /// Background sweep loop: every `sweep_interval`, evict entries idle
    /// past the TTL. Exits promptly on close.
    async fn run_sweeper(self) {
        let inner = Arc::clone(&self.inner);
        let mut interval = tokio::time::interval(inner.sweep_interval);
        // Skip the first immediate tick.
        interval.tick().await;

        loop {
            tokio::select! {
                biased;

                _ = inner.shutdown.cancelled() => {
                    debug!("registry sweeper shutting down");
                    break;
                }

                _ = interval.tick() => {
                    let now = Instant::now();
                    let victims: Vec<SatKey> = {
                        let loaded = inner.loaded.lock().unwrap();
                        loaded
                            .iter()
                            .filter(|(_, entry)| {
                                entry.refs == 0
                                    && now.duration_since(entry.last_used) > inner.idle_ttl
                            })
                            .map(|(&key, _)| key)
                            .collect()
                    };
                    if !victims.is_empty() {
                        info!(count = victims.len(), "sweeping idle satellites");
                        self.remove_victims(&CancellationToken::new(), &victims).await;
                    }
                }
            }
        }
    }

    #[cfg(test)]
    fn insert_test_entry(&self, key: SatKey, sat_num: i32, last_used: Instant, refs: usize) {
        self.inner.loaded.lock().unwrap().insert(
            key,
            SatEntry {
                sat_num,
                last_used,
                refs,
            },
        );
    }

    #[cfg(test)]
    fn set_refs(&self, key: SatKey, refs: usize) {
        if let Some(entry) = self.inner.loaded.lock().unwrap().get_mut(&key) {
            entry.refs = refs;
        }
    }

    #[cfg(test)]
    fn sat_num_for(&self, key: SatKey) -> Option<i32> {
        self.inner
            .loaded
            .lock()
            .unwrap()
            .get(&key)
            .map(|e| e.sat_num)
    }
}
