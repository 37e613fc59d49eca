//! XPropagator - satellite orbit propagation service core
//!
//! This library implements the stateful core of an orbit propagation
//! service: clients submit two-line element sets (TLEs) and receive
//! propagated position/velocity state vectors, either as a single point
//! in time or as a streaming ephemeris over a time grid.
//!
//! Propagation is delegated to a process-wide, non-reentrant propagation
//! engine behind [`engine::PropagationLibrary`]. The value of this crate
//! is everything wrapped around that engine:
//!
//! - [`registry`] - a reference-counted LRU+TTL cache that owns per-satellite
//!   engine handles, bounds their number, and recycles idle ones
//! - [`gate`] - a bounded semaphore serializing every engine call
//! - [`service`] - the `Info` / `Prop` / `Ephem` / `LoadFile` operations
//!   consumed by an external transport
//!
//! # High-Level API
//!
//! ```ignore
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use xpropagator::config::ConfigFile;
//! use xpropagator::engine::AnalyticEngine;
//! use xpropagator::service::PropagationService;
//!
//! let config = ConfigFile::load().unwrap_or_default();
//! let service = PropagationService::new(Arc::new(AnalyticEngine::new()), &config);
//!
//! let response = service.prop(&CancellationToken::new(), request).await?;
//! ```

pub mod api;
pub mod config;
pub mod engine;
pub mod gate;
pub mod locks;
pub mod logging;
pub mod registry;
pub mod service;
pub mod time;
pub mod tle;

/// Version of the XPropagator library and CLI.
///
/// Synchronized across all workspace members; injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Commit hash baked in by the build pipeline, `unknown` for local builds.
pub const COMMIT_HASH: &str = match option_env!("XPROP_COMMIT_HASH") {
    Some(hash) => hash,
    None => "unknown",
};

/// Build date baked in by the build pipeline, `unknown` for local builds.
pub const BUILD_DATE: &str = match option_env!("XPROP_BUILD_DATE") {
    Some(date) => date,
    None => "unknown",
};

/// Service name reported by the `Info` operation.
pub const SERVICE_NAME: &str = "XPropagator Server";
