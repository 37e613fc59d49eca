//! Typed adapter over the raw propagation library.
//!
//! Everything the rest of the crate needs from the engine goes through
//! this adapter. It owns the chunked-ephemeris contract: fixed-capacity
//! output buffers, the strict-progress `next_start` advance, and the
//! distinguished allocation-failure code.

use std::sync::Arc;

use super::library::PropagationLibrary;
use super::types::{EngineInfo, Frame, SatKey, TimeKind, RC_ALLOC_FAILED, RC_OK};

/// Advance applied to the last emitted time to obtain the next chunk's
/// start: one nanosecond, expressed in days.
///
/// Guarantees strict progress between chunks without re-emitting the
/// last point.
pub const NEXT_START_EPSILON_DAYS: f64 = 1e-9 / 86_400.0;

/// Result of one chunked ephemeris generation call.
#[derive(Debug, Clone)]
pub struct GenEphems {
    /// Flat point buffer, 7 doubles per point:
    /// `(t_ds50, x, y, z, vx, vy, vz)`.
    pub flat: Vec<f64>,
    /// Number of points in `flat`.
    pub count: usize,
    /// Start time for the next chunk (last emitted time plus epsilon).
    pub next_start: f64,
    /// Whether the generator reached the end of the span.
    pub done: bool,
    /// Engine return code. Non-zero with `count > 0` is a partial result.
    pub rc: i32,
}

/// Typed operations over a [`PropagationLibrary`].
///
/// The adapter is cheap to clone and carries no state of its own; all
/// mutable state lives in the library behind it. Callers remain
/// responsible for gate discipline.
#[derive(Clone)]
pub struct EngineAdapter {
    lib: Arc<dyn PropagationLibrary>,
}

impl EngineAdapter {
    /// Wrap a raw library.
    pub fn new(lib: Arc<dyn PropagationLibrary>) -> Self {
        Self { lib }
    }

    /// Library identification strings.
    pub fn info(&self) -> EngineInfo {
        EngineInfo {
            astro: self.lib.lib_info(),
            sgp4: self.lib.sgp4_info(),
        }
    }

    /// Add a satellite to the TLE layer. Returns the key, `<= 0` on failure.
    pub fn add_sat_from_lines(&self, line1: &str, line2: &str) -> SatKey {
        self.lib.add_sat_from_lines(line1, line2)
    }

    /// Key for a loaded catalog number, `-1` when absent.
    pub fn get_sat_key(&self, sat_num: i32) -> SatKey {
        self.lib.get_sat_key(sat_num)
    }

    /// Initialize a satellite into the propagator layer.
    pub fn init_sat(&self, key: SatKey) -> i32 {
        self.lib.init_sat(key)
    }

    /// Remove a satellite from the propagator layer.
    pub fn remove_sat_propagator(&self, key: SatKey) -> i32 {
        self.lib.remove_sat_propagator(key)
    }

    /// Remove a satellite from the TLE layer.
    pub fn remove_sat_tle(&self, key: SatKey) -> i32 {
        self.lib.remove_sat_tle(key)
    }

    /// Remove every satellite from the propagator layer.
    pub fn remove_all_propagator(&self) -> i32 {
        self.lib.remove_all_propagator()
    }

    /// Remove every satellite from the TLE layer.
    pub fn remove_all_tle(&self) -> i32 {
        self.lib.remove_all_tle()
    }

    /// Load a TLE file at both layers.
    pub fn load_file_all(&self, path: &str) -> i32 {
        self.lib.load_file_all(path)
    }

    /// Read the global last-error slot.
    pub fn last_err_msg(&self) -> String {
        self.lib.last_err_msg()
    }

    /// Propagate to a single point in time.
    ///
    /// On success returns the 8-tuple
    /// `(t_ds50, t_mse, x, y, z, vx, vy, vz)`.
    pub fn prop_all(&self, key: SatKey, time_kind: TimeKind, t: f64) -> (Option<[f64; 8]>, i32) {
        let (buf, rc) = self.lib.prop_all(key, time_kind, t);
        if rc != RC_OK || buf.len() < 8 {
            return (None, rc);
        }
        let mut out = [0.0; 8];
        out.copy_from_slice(&buf[..8]);
        (Some(out), rc)
    }

    /// Generate one chunk of ephemeris points.
    ///
    /// Reserves an output buffer of `chunk_cap * 7` doubles; a capacity
    /// that cannot be allocated yields [`RC_ALLOC_FAILED`]. `step_minutes`
    /// of `-1` requests the engine's dynamic step. `next_start` is the
    /// last emitted time plus [`NEXT_START_EPSILON_DAYS`]; `done` is set
    /// when the chunk came back short or the next start passes the end
    /// of the span.
    pub fn gen_ephems(
        &self,
        key: SatKey,
        start_ds50: f64,
        end_ds50: f64,
        step_minutes: f64,
        frame: Frame,
        chunk_cap: usize,
    ) -> GenEphems {
        if chunk_cap == 0 || chunk_cap.checked_mul(7).is_none() {
            return GenEphems {
                flat: Vec::new(),
                count: 0,
                next_start: 0.0,
                done: false,
                rc: RC_ALLOC_FAILED,
            };
        }

        let (flat, count, rc) =
            self.lib
                .gen_ephems_fill(key, start_ds50, end_ds50, step_minutes, frame, chunk_cap);

        if rc != RC_OK && count == 0 {
            return GenEphems {
                flat: Vec::new(),
                count: 0,
                next_start: 0.0,
                done: false,
                rc,
            };
        }

        if count == 0 {
            // Empty span: nothing to emit, nothing left to do.
            return GenEphems {
                flat,
                count: 0,
                next_start: start_ds50,
                done: true,
                rc: RC_OK,
            };
        }

        let last_t = flat[(count - 1) * 7];
        let next_start = last_t + NEXT_START_EPSILON_DAYS;
        let done = count < chunk_cap || next_start >= end_ds50;

        GenEphems {
            flat,
            count,
            next_start,
            done,
            rc,
        }
    }
}
