//! Propagation engine boundary.
//!
//! The real propagation library is process-global, stateful, and not
//! reentrant. This module keeps all of that behind two layers:
//!
//! - [`PropagationLibrary`] - the raw operation surface (integer return
//!   codes, a global last-error slot, two catalog layers);
//! - [`EngineAdapter`] - typed operations with value semantics, including
//!   the chunked ephemeris contract used by the streaming pipeline.
//!
//! [`AnalyticEngine`] is the in-process implementation: a two-body Kepler
//! propagator over TLE mean elements. It backs the CLI and the test
//! suite, and is driven through the same gate discipline as a native
//! library would be.

mod adapter;
mod analytic;
mod library;
mod types;

pub use adapter::{EngineAdapter, GenEphems, NEXT_START_EPSILON_DAYS};
pub use analytic::AnalyticEngine;
pub use library::PropagationLibrary;
pub use types::{EngineInfo, Frame, SatKey, TimeKind, RC_ALLOC_FAILED, RC_OK};
