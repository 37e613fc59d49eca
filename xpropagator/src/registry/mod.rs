//! Satellite registry: a reference-counted LRU+TTL cache over engine
//! handles.
//!
//! Loading a satellite into the propagation engine is expensive (a TLE
//! add plus an initialization pass), so loaded satellites are kept and
//! recycled. The registry owns every loaded handle, bounds how many may
//! be loaded at once, and evicts idle ones - on demand before a new
//! load (LRU) and in the background once they have sat unused past the
//! idle TTL.
//!
//! Handlers never own satellites: [`SatRegistry::acquire`] hands out a
//! [`SatLease`] that pins the entry (eviction skips entries with a
//! non-zero reference count) and must be released on every exit path,
//! which the lease does on drop.

mod lease;
#[allow(clippy::module_inception)]
mod registry;

pub use lease::SatLease;
pub use registry::{
    RegistryConfig, RegistryError, SatRegistry, DEFAULT_IDLE_TTL, DEFAULT_MAX_LOADED_SATS,
    DEFAULT_SWEEP_INTERVAL,
};
