//! In-process analytic propagation engine.
//!
//! A two-body Kepler propagator over TLE mean elements, implementing the
//! full [`PropagationLibrary`] surface: a TLE layer keyed by catalog
//! number, a propagator layer of initialized element sets, and a global
//! last-error slot. State vectors come out in kilometers and km/s in an
//! Earth-centered inertial frame.
//!
//! This engine backs the CLI and the test suite. It is serialized by an
//! internal mutex but is still treated as non-reentrant by the rest of
//! the crate: every call goes through the
//! [`EngineGate`](crate::gate::EngineGate), exactly as a native library
//! would.

use std::collections::HashMap;
use std::sync::Mutex;

use super::library::PropagationLibrary;
use super::types::{Frame, SatKey, TimeKind};
use crate::tle::{self, TleElements};

/// Earth gravitational parameter, km^3/s^2.
const MU_EARTH: f64 = 398_600.4418;

const MINUTES_PER_DAY: f64 = 1_440.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Return code for an unknown satellite key.
const RC_UNKNOWN_KEY: i32 = 1;
/// Return code for a satellite present in the TLE layer but never
/// initialized into the propagator layer.
const RC_NOT_INITIALIZED: i32 = 2;
/// Return code for unusable inputs (bad lines, bad step, bad elements).
const RC_BAD_INPUT: i32 = 3;
/// Return code for file-loading failures.
const RC_FILE: i32 = 4;

/// A satellite registered at the TLE layer.
struct TleRecord {
    sat_num: i32,
    line1: String,
    line2: String,
}

#[derive(Default)]
struct CatalogState {
    next_key: SatKey,
    tle: HashMap<SatKey, TleRecord>,
    by_num: HashMap<i32, SatKey>,
    propagator: HashMap<SatKey, TleElements>,
    last_err: String,
}

/// The in-process two-body engine.
pub struct AnalyticEngine {
    state: Mutex<CatalogState>,
}

impl AnalyticEngine {
    /// Create an empty engine.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CatalogState {
                next_key: 1,
                ..CatalogState::default()
            }),
        }
    }
}

impl Default for AnalyticEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PropagationLibrary for AnalyticEngine {
    fn lib_info(&self) -> String {
        format!("XPropagator analytic astro core v{}", crate::VERSION)
    }

    fn sgp4_info(&self) -> String {
        format!("Two-body Kepler propagator v{}", crate::VERSION)
    }

    fn add_sat_from_lines(&self, line1: &str, line2: &str) -> SatKey {
        let mut state = self.state.lock().unwrap();
        let sat_num = match tle::parse_sat_num(line1) {
            Ok(n) => n,
            Err(e) => {
                state.last_err = format!("cannot add satellite: {e}");
                return 0;
            }
        };
        if let Some(&key) = state.by_num.get(&sat_num) {
            // Re-adding a loaded satellite hands back the existing key.
            return key;
        }
        let key = state.next_key;
        state.next_key += 1;
        state.tle.insert(
            key,
            TleRecord {
                sat_num,
                line1: line1.to_string(),
                line2: line2.to_string(),
            },
        );
        state.by_num.insert(sat_num, key);
        key
    }

    fn get_sat_key(&self, sat_num: i32) -> SatKey {
        let state = self.state.lock().unwrap();
        state.by_num.get(&sat_num).copied().unwrap_or(-1)
    }

    fn init_sat(&self, key: SatKey) -> i32 {
        let mut state = self.state.lock().unwrap();
        let record = match state.tle.get(&key) {
            Some(r) => r,
            None => {
                state.last_err = format!("init: unknown satellite key {key}");
                return RC_UNKNOWN_KEY;
            }
        };
        let elements = match tle::parse_elements(&record.line1, &record.line2) {
            Ok(e) => e,
            Err(e) => {
                state.last_err = format!("init: unusable element set for key {key}: {e}");
                return RC_BAD_INPUT;
            }
        };
        if elements.mean_motion_rev_day <= 0.0 || elements.eccentricity >= 1.0 {
            state.last_err = format!("init: non-orbital element set for key {key}");
            return RC_BAD_INPUT;
        }
        state.propagator.insert(key, elements);
        0
    }

    fn remove_sat_propagator(&self, key: SatKey) -> i32 {
        let mut state = self.state.lock().unwrap();
        if state.propagator.remove(&key).is_none() {
            state.last_err = format!("remove: key {key} not in propagator layer");
            return RC_UNKNOWN_KEY;
        }
        0
    }

    fn remove_sat_tle(&self, key: SatKey) -> i32 {
        let mut state = self.state.lock().unwrap();
        match state.tle.remove(&key) {
            Some(record) => {
                state.by_num.remove(&record.sat_num);
                0
            }
            None => {
                state.last_err = format!("remove: key {key} not in TLE layer");
                RC_UNKNOWN_KEY
            }
        }
    }

    fn remove_all_propagator(&self) -> i32 {
        self.state.lock().unwrap().propagator.clear();
        0
    }

    fn remove_all_tle(&self) -> i32 {
        let mut state = self.state.lock().unwrap();
        state.tle.clear();
        state.by_num.clear();
        0
    }

    fn load_file_all(&self, path: &str) -> i32 {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                self.state.lock().unwrap().last_err = format!("load {path}: {e}");
                return RC_FILE;
            }
        };

        // Accept 2-line and 3-line (named) element files.
        let mut line1: Option<String> = None;
        let mut loaded = 0usize;
        for line in content.lines() {
            let line = line.trim_end();
            if line.starts_with("1 ") {
                line1 = Some(line.to_string());
            } else if line.starts_with("2 ") {
                if let Some(l1) = line1.take() {
                    let key = self.add_sat_from_lines(&l1, line);
                    if key <= 0 {
                        return RC_BAD_INPUT;
                    }
                    let rc = self.init_sat(key);
                    if rc != 0 {
                        return rc;
                    }
                    loaded += 1;
                }
            }
        }

        if loaded == 0 {
            self.state.lock().unwrap().last_err = format!("load {path}: no element sets found");
            return RC_FILE;
        }
        0
    }

    fn prop_all(&self, key: SatKey, time_kind: TimeKind, t: f64) -> (Vec<f64>, i32) {
        let mut state = self.state.lock().unwrap();
        let elements = match state.propagator.get(&key) {
            Some(e) => e.clone(),
            None => {
                state.last_err = format!("prop: satellite key {key} is not initialized");
                return (Vec::new(), RC_NOT_INITIALIZED);
            }
        };
        drop(state);

        let (t_ds50, t_mse) = match time_kind {
            TimeKind::Mse => (elements.epoch_ds50 + t / MINUTES_PER_DAY, t),
            TimeKind::Ds50 => (t, (t - elements.epoch_ds50) * MINUTES_PER_DAY),
        };

        let sv = kepler_state(&elements, t_ds50);
        let mut out = Vec::with_capacity(8);
        out.push(t_ds50);
        out.push(t_mse);
        out.extend_from_slice(&sv);
        (out, 0)
    }

    fn gen_ephems_fill(
        &self,
        key: SatKey,
        start_ds50: f64,
        end_ds50: f64,
        step_minutes: f64,
        _frame: Frame,
        cap: usize,
    ) -> (Vec<f64>, usize, i32) {
        let mut state = self.state.lock().unwrap();
        let elements = match state.propagator.get(&key) {
            Some(e) => e.clone(),
            None => {
                state.last_err = format!("ephem: satellite key {key} is not initialized");
                return (Vec::new(), 0, RC_NOT_INITIALIZED);
            }
        };

        // The dynamic-step sentinel resolves to 1/120 of the orbital
        // period; any other non-positive step is unusable.
        let step = if step_minutes == -1.0 {
            (MINUTES_PER_DAY / elements.mean_motion_rev_day) / 120.0
        } else {
            step_minutes
        };
        if step <= 0.0 || !step.is_finite() {
            state.last_err = format!("ephem: unusable time step {step_minutes} minutes");
            return (Vec::new(), 0, RC_BAD_INPUT);
        }
        drop(state);
        let step_days = step / MINUTES_PER_DAY;

        // Tolerate floating-point dust at the end of the span so a grid
        // that lands exactly on the end emits its final point.
        let end_slack = end_ds50 + (end_ds50.abs() * f64::EPSILON * 4.0).max(1e-12);

        let mut flat = Vec::with_capacity(cap * 7);
        let mut n = 0usize;
        let mut t = start_ds50;
        while n < cap && t <= end_slack {
            let sv = kepler_state(&elements, t);
            flat.push(t);
            flat.extend_from_slice(&sv);
            n += 1;
            t = start_ds50 + (n as f64) * step_days;
        }

        (flat, n, 0)
    }

    fn last_err_msg(&self) -> String {
        self.state.lock().unwrap().last_err.clone()
    }
}

/// Two-body state vector at `t_ds50`: `(x, y, z, vx, vy, vz)` in km and
/// km/s, Earth-centered inertial.
fn kepler_state(elements: &TleElements, t_ds50: f64) -> [f64; 6] {
    let n_rad_s = elements.mean_motion_rev_day * 2.0 * std::f64::consts::PI / SECONDS_PER_DAY;
    let a = (MU_EARTH / (n_rad_s * n_rad_s)).cbrt();
    let e = elements.eccentricity;

    let dt_s = (t_ds50 - elements.epoch_ds50) * SECONDS_PER_DAY;
    let m0 = elements.mean_anomaly_deg.to_radians();
    let m = (m0 + n_rad_s * dt_s).rem_euclid(2.0 * std::f64::consts::PI);

    let ecc_anom = solve_kepler(m, e);
    let (sin_e, cos_e) = ecc_anom.sin_cos();
    let r = a * (1.0 - e * cos_e);

    // Perifocal position and velocity.
    let x_pf = a * (cos_e - e);
    let y_pf = a * (1.0 - e * e).sqrt() * sin_e;
    let v_scale = (MU_EARTH * a).sqrt() / r;
    let vx_pf = -v_scale * sin_e;
    let vy_pf = v_scale * (1.0 - e * e).sqrt() * cos_e;

    // Rotate perifocal -> inertial: Rz(RAAN) * Rx(incl) * Rz(argp).
    let (sin_o, cos_o) = elements.raan_deg.to_radians().sin_cos();
    let (sin_i, cos_i) = elements.inclination_deg.to_radians().sin_cos();
    let (sin_w, cos_w) = elements.arg_perigee_deg.to_radians().sin_cos();

    let r11 = cos_o * cos_w - sin_o * sin_w * cos_i;
    let r12 = -cos_o * sin_w - sin_o * cos_w * cos_i;
    let r21 = sin_o * cos_w + cos_o * sin_w * cos_i;
    let r22 = -sin_o * sin_w + cos_o * cos_w * cos_i;
    let r31 = sin_w * sin_i;
    let r32 = cos_w * sin_i;

    [
        r11 * x_pf + r12 * y_pf,
        r21 * x_pf + r22 * y_pf,
        r31 * x_pf + r32 * y_pf,
        r11 * vx_pf + r12 * vy_pf,
        r21 * vx_pf + r22 * vy_pf,
        r31 * vx_pf + r32 * vy_pf,
    ]
}

/// Solve Kepler's equation `E - e sin E = M` by Newton iteration.
fn solve_kepler(mean_anomaly: f64, eccentricity: f64) -> f64 {
    let mut ecc_anom = if eccentricity < 0.8 {
        mean_anomaly
    } else {
        std::f64::consts::PI
    };
    for _ in 0..12 {
        let f = ecc_anom - eccentricity * ecc_anom.sin() - mean_anomaly;
        let f_prime = 1.0 - eccentricity * ecc_anom.cos();
        let delta = f / f_prime;
        ecc_anom -= delta;
        if delta.abs() < 1e-12 {
            break;
        }
    }
    ecc_anom
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISS_LINE1: &str = "1 25544U 98067A   21275.52543210  .00016717  00000-0  10270-3 0  9042";
    const ISS_LINE2: &str = "2 25544  51.6442 208.5453 0003439  47.4501  63.9527 15.48881544315506";

    fn loaded_engine() -> (AnalyticEngine, SatKey) {
        let engine = AnalyticEngine::new();
        let key = engine.add_sat_from_lines(ISS_LINE1, ISS_LINE2);
        assert!(key > 0);
        assert_eq!(engine.init_sat(key), 0);
        (engine, key)
    }

    #[test]
    fn add_and_lookup() {
        let (engine, key) = loaded_engine();
        assert_eq!(engine.get_sat_key(25_544), key);
        assert_eq!(engine.get_sat_key(99_999), -1);
    }

    #[test]
    fn re_adding_returns_same_key() {
        let (engine, key) = loaded_engine();
        assert_eq!(engine.add_sat_from_lines(ISS_LINE1, ISS_LINE2), key);
    }

    #[test]
    fn add_bad_line_fails_with_message() {
        let engine = AnalyticEngine::new();
        assert!(engine.add_sat_from_lines("garbage", "2 x") <= 0);
        assert!(!engine.last_err_msg().is_empty());
    }

    #[test]
    fn init_unknown_key_fails() {
        let engine = AnalyticEngine::new();
        assert_ne!(engine.init_sat(42), 0);
    }

    #[test]
    fn prop_requires_initialization() {
        let engine = AnalyticEngine::new();
        let key = engine.add_sat_from_lines(ISS_LINE1, ISS_LINE2);
        let (_, rc) = engine.prop_all(key, TimeKind::Ds50, 26_000.0);
        assert_eq!(rc, RC_NOT_INITIALIZED);
    }

    #[test]
    fn prop_all_produces_leo_orbit() {
        let (engine, key) = loaded_engine();
        let (out, rc) = engine.prop_all(key, TimeKind::Mse, 30.0);
        assert_eq!(rc, 0);
        assert_eq!(out.len(), 8);

        let r = (out[2] * out[2] + out[3] * out[3] + out[4] * out[4]).sqrt();
        // ISS semi-major axis is ~6,795 km; two-body radius stays close.
        assert!((6_600.0..7_000.0).contains(&r), "radius {r} km");

        let v = (out[5] * out[5] + out[6] * out[6] + out[7] * out[7]).sqrt();
        assert!((7.0..8.2).contains(&v), "speed {v} km/s");
    }

    #[test]
    fn prop_all_mse_ds50_consistency() {
        let (engine, key) = loaded_engine();
        let (mse_out, _) = engine.prop_all(key, TimeKind::Mse, 15.0);
        let (ds50_out, _) = engine.prop_all(key, TimeKind::Ds50, mse_out[0]);
        for i in 0..8 {
            assert!(
                (mse_out[i] - ds50_out[i]).abs() < 1e-6,
                "component {i} differs"
            );
        }
    }

    #[test]
    fn orbit_repeats_after_one_period() {
        let (engine, key) = loaded_engine();
        let period_min = MINUTES_PER_DAY / 15.48881544;
        let (a, _) = engine.prop_all(key, TimeKind::Mse, 10.0);
        let (b, _) = engine.prop_all(key, TimeKind::Mse, 10.0 + period_min);
        for i in 2..5 {
            assert!((a[i] - b[i]).abs() < 1.0, "position drifted {}", a[i] - b[i]);
        }
    }

    #[test]
    fn gen_ephems_fill_respects_cap_and_span() {
        let (engine, key) = loaded_engine();
        let start = 26_200.0;
        let (flat, n, rc) = engine.gen_ephems_fill(key, start, start + 1.0, 10.0, Frame::Eci, 50);
        assert_eq!(rc, 0);
        assert_eq!(n, 50);
        assert_eq!(flat.len(), 50 * 7);
        assert_eq!(flat[0], start);

        // Shorter span than cap: 1440/10 = 144 points fit in a day, plus
        // both endpoints.
        let (_, n, rc) = engine.gen_ephems_fill(key, start, start + 1.0, 10.0, Frame::Eci, 1_000);
        assert_eq!(rc, 0);
        assert_eq!(n, 145);
    }

    #[test]
    fn gen_ephems_fill_dynamic_step() {
        let (engine, key) = loaded_engine();
        let (flat, n, rc) =
            engine.gen_ephems_fill(key, 26_200.0, 26_200.5, -1.0, Frame::J2k, 10_000);
        assert_eq!(rc, 0);
        assert!(n > 100, "dynamic step should be fine-grained, got {n}");
        // Strictly increasing times.
        for i in 1..n {
            assert!(flat[i * 7] > flat[(i - 1) * 7]);
        }
    }

    #[test]
    fn gen_ephems_fill_rejects_zero_step() {
        let (engine, key) = loaded_engine();
        let (_, n, rc) = engine.gen_ephems_fill(key, 26_200.0, 26_201.0, 0.0, Frame::Eci, 10);
        assert_eq!(n, 0);
        assert_ne!(rc, 0);
    }

    #[test]
    fn remove_layers_independently() {
        let (engine, key) = loaded_engine();
        assert_eq!(engine.remove_sat_propagator(key), 0);
        // Still present at the TLE layer.
        assert_eq!(engine.get_sat_key(25_544), key);
        assert_eq!(engine.remove_sat_tle(key), 0);
        assert_eq!(engine.get_sat_key(25_544), -1);
        // Double remove reports an error code.
        assert_ne!(engine.remove_sat_tle(key), 0);
    }

    #[test]
    fn remove_all_clears_both_layers() {
        let (engine, key) = loaded_engine();
        assert_eq!(engine.remove_all_propagator(), 0);
        assert_eq!(engine.remove_all_tle(), 0);
        assert_eq!(engine.get_sat_key(25_544), -1);
        let (_, rc) = engine.prop_all(key, TimeKind::Mse, 0.0);
        assert_ne!(rc, 0);
    }

    #[test]
    fn load_file_all_reads_three_line_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.tle");
        std::fs::write(
            &path,
            format!("ISS (ZARYA)\n{ISS_LINE1}\n{ISS_LINE2}\n"),
        )
        .unwrap();
        let engine = AnalyticEngine::new();
        assert_eq!(engine.load_file_all(path.to_str().unwrap()), 0);
        assert!(engine.get_sat_key(25_544) > 0);
    }

    #[test]
    fn load_file_all_missing_file_fails() {
        let engine = AnalyticEngine::new();
        assert_ne!(engine.load_file_all("/nonexistent/catalog.tle"), 0);
        assert!(engine.last_err_msg().contains("catalog.tle"));
    }
}
