//! Raw propagation library surface.

use super::types::{Frame, SatKey, TimeKind};

/// The raw operation surface of the propagation library.
///
/// This trait mirrors the native calling convention: integer return
/// codes, a process-global last-error slot, and two catalog layers (a
/// TLE layer holding raw element sets, and a propagator layer holding
/// initialized per-satellite state).
///
/// Implementations are `Send + Sync` so they can be shared, but are NOT
/// assumed reentrant: all calls must be serialized through the
/// [`EngineGate`](crate::gate::EngineGate). Inputs are copied across the
/// boundary and outputs come back as owned buffers.
pub trait PropagationLibrary: Send + Sync {
    /// Identification string of the main astrodynamics library.
    fn lib_info(&self) -> String;

    /// Identification string of the propagator.
    fn sgp4_info(&self) -> String;

    /// Add a satellite to the TLE layer from its two element lines.
    ///
    /// Returns the new key, or a value `<= 0` on failure (details in the
    /// last-error slot).
    fn add_sat_from_lines(&self, line1: &str, line2: &str) -> SatKey;

    /// Look up the key for a catalog number, `-1` when not loaded.
    fn get_sat_key(&self, sat_num: i32) -> SatKey;

    /// Initialize a TLE-layer satellite into the propagator layer.
    fn init_sat(&self, key: SatKey) -> i32;

    /// Remove a satellite from the propagator layer.
    fn remove_sat_propagator(&self, key: SatKey) -> i32;

    /// Remove a satellite from the TLE layer.
    fn remove_sat_tle(&self, key: SatKey) -> i32;

    /// Remove every satellite from the propagator layer.
    fn remove_all_propagator(&self) -> i32;

    /// Remove every satellite from the TLE layer.
    fn remove_all_tle(&self) -> i32;

    /// Load a TLE file, adding and initializing every satellite in it.
    fn load_file_all(&self, path: &str) -> i32;

    /// Propagate one satellite to a single point in time.
    ///
    /// On success the buffer holds at least 8 doubles:
    /// `(t_ds50, t_mse, x, y, z, vx, vy, vz)`.
    fn prop_all(&self, key: SatKey, time_kind: TimeKind, t: f64) -> (Vec<f64>, i32);

    /// Generate up to `cap` ephemeris points from `start_ds50`, stepping
    /// by `step_minutes` (`-1` selects an engine-chosen dynamic step).
    ///
    /// Returns the flat buffer (7 doubles per point), the point count,
    /// and a return code. A non-zero code with a non-zero count means a
    /// partial result; the points are valid.
    fn gen_ephems_fill(
        &self,
        key: SatKey,
        start_ds50: f64,
        end_ds50: f64,
        step_minutes: f64,
        frame: Frame,
        cap: usize,
    ) -> (Vec<f64>, usize, i32);

    /// Read the global last-error slot.
    fn last_err_msg(&self) -> String;
}
