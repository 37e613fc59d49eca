//! Data types for the three service operations.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::engine::{Frame, TimeKind};

/// A satellite as submitted by a client: two TLE lines plus metadata
/// the core carries through untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Satellite {
    /// NORAD catalog number as claimed by the client; informational.
    /// Identity comes from parsing TLE line 1.
    pub norad_id: i64,
    /// Display name, informational.
    pub name: String,
    /// TLE line 1 (69-character ASCII, consumed opaquely).
    pub tle_line1: String,
    /// TLE line 2.
    pub tle_line2: String,
}

impl Satellite {
    /// Build a satellite from its two element lines.
    pub fn from_lines(line1: impl Into<String>, line2: impl Into<String>) -> Self {
        Self {
            tle_line1: line1.into(),
            tle_line2: line2.into(),
            ..Self::default()
        }
    }
}

/// Single-point propagation task.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropTask {
    /// The satellite to propagate.
    pub sat: Option<Satellite>,
    /// Propagation time, interpreted per the request's time kind.
    /// Mutually exclusive with `time_utc`.
    pub time: Option<f64>,
    /// Propagation time as UTC; converted to DS50 by the handler.
    pub time_utc: Option<DateTime<Utc>>,
}

/// Single-point propagation request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropRequest {
    /// Opaque request id, echoed in the response.
    pub req_id: i64,
    /// How to interpret `task.time`. Required unless `task.time_utc` is
    /// supplied.
    pub time_kind: Option<TimeKind>,
    /// The propagation task.
    pub task: Option<PropTask>,
}

/// The eight-tuple produced by a single-point propagation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PropPoint {
    /// Time of the state vector, DS50.
    pub ds50_time: f64,
    /// Time of the state vector, minutes since element set epoch.
    pub mse_time: f64,
    /// Position, km.
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Velocity, km/s.
    pub vx: f64,
    pub vy: f64,
    pub vz: f64,
}

impl PropPoint {
    /// Map the engine's raw eight-double buffer.
    pub fn from_raw(raw: &[f64; 8]) -> Self {
        Self {
            ds50_time: raw[0],
            mse_time: raw[1],
            x: raw[2],
            y: raw[3],
            z: raw[4],
            vx: raw[5],
            vy: raw[6],
            vz: raw[7],
        }
    }
}

/// Single-point propagation response.
#[derive(Debug, Clone, PartialEq)]
pub struct PropResponse {
    /// Request id echoed from the request.
    pub req_id: i64,
    /// The propagated state vector.
    pub result: PropPoint,
}

/// Time-grid step policy: exactly one per grid.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeStep {
    /// Engine-chosen step (passed to the adapter as the sentinel -1).
    Dynamic,
    /// ISO-8601 duration string, e.g. `PT8.5M`.
    Period(String),
    /// Step in fractional days, resolved to minutes by x1440.
    Ds50Days(f64),
}

/// A propagation span plus step policy.
///
/// Start and end may each be given as UTC or DS50, but not both; the
/// validator enforces the conflict rules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeGrid {
    /// Span start, UTC.
    pub start_utc: Option<DateTime<Utc>>,
    /// Span start, DS50.
    pub start_ds50: Option<f64>,
    /// Span end, UTC.
    pub end_utc: Option<DateTime<Utc>>,
    /// Span end, DS50.
    pub end_ds50: Option<f64>,
    /// Step policy.
    pub step: Option<TimeStep>,
}

/// One satellite's slice of a streaming ephemeris request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EphemTask {
    /// Client-chosen task id, echoed in every chunk for this task.
    pub task_id: i64,
    /// Per-task grid; supersedes the request's common grid.
    pub time_grid: Option<TimeGrid>,
    /// The satellite to generate for.
    pub sat: Option<Satellite>,
}

/// Streaming ephemeris request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EphemRequest {
    /// Opaque request id, echoed in every chunk.
    pub req_id: i64,
    /// Output reference frame.
    pub frame: Option<Frame>,
    /// Grid applied to tasks without their own.
    pub common_time_grid: Option<TimeGrid>,
    /// Tasks, processed in order; a task's stream id is its index.
    pub tasks: Vec<EphemTask>,
}

/// One propagated state vector on an ephemeris grid.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EphemerisPoint {
    /// Time of the state vector, DS50.
    pub ds50_time: f64,
    /// Position, km.
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Velocity, km/s.
    pub vx: f64,
    pub vy: f64,
    pub vz: f64,
}

/// Payload of one response chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct EphemResult {
    /// Task id echoed from the originating task.
    pub task_id: i64,
    /// Points in this chunk.
    pub points: Vec<EphemerisPoint>,
    /// Declared point count; always equals `points.len()`.
    pub count: i64,
}

/// One streamed response chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct EphemResponse {
    /// Request id echoed from the request.
    pub req_id: i64,
    /// Index of the originating task.
    pub stream_id: i64,
    /// Chunk counter within the stream: 0, 1, 2, ... with no gaps.
    pub stream_chunk_id: i64,
    /// Chunk payload.
    pub result: EphemResult,
}

/// Service identification returned by the `Info` operation.
#[derive(Debug, Clone, PartialEq)]
pub struct InfoResponse {
    /// Service name.
    pub name: String,
    /// Library version.
    pub version: String,
    /// Commit hash of the build.
    pub commit: String,
    /// Build date.
    pub build_date: String,
    /// Identification of the astrodynamics library.
    pub astro_lib_info: String,
    /// Identification of the propagator.
    pub sgp4_lib_info: String,
    /// Server time at the moment of the call.
    pub timestamp: DateTime<Utc>,
}

/// Error for flat buffers that do not describe whole points.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlatPointsError {
    /// Fewer than 7 values: not even one point.
    #[error("flat ephemeris buffer must hold at least 7 values, got {0}")]
    TooShort(usize),
    /// Length is not a multiple of 7.
    #[error("flat ephemeris buffer length {0} is not a multiple of 7")]
    NotAMultiple(usize),
}

/// Convert a flat engine buffer (7 doubles per point) into points.
pub fn flat_to_points(flat: &[f64]) -> Result<Vec<EphemerisPoint>, FlatPointsError> {
    if flat.len() < 7 {
        return Err(FlatPointsError::TooShort(flat.len()));
    }
    if flat.len() % 7 != 0 {
        return Err(FlatPointsError::NotAMultiple(flat.len()));
    }

    Ok(flat
        .chunks_exact(7)
        .map(|chunk| EphemerisPoint {
            ds50_time: chunk[0],
            x: chunk[1],
            y: chunk[2],
            z: chunk[3],
            vx: chunk[4],
            vy: chunk[5],
            vz: chunk[6],
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_to_points_maps_in_order() {
        let flat: Vec<f64> = (0..14).map(f64::from).collect();
        let points = flat_to_points(&flat).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].ds50_time, 0.0);
        assert_eq!(points[0].vz, 6.0);
        assert_eq!(points[1].ds50_time, 7.0);
        assert_eq!(points[1].vz, 13.0);
    }

    #[test]
    fn flat_to_points_rejects_short_buffers() {
        assert_eq!(flat_to_points(&[]).unwrap_err(), FlatPointsError::TooShort(0));
        assert_eq!(
            flat_to_points(&[1.0; 6]).unwrap_err(),
            FlatPointsError::TooShort(6)
        );
    }

    #[test]
    fn flat_to_points_rejects_ragged_buffers() {
        assert_eq!(
            flat_to_points(&[1.0; 10]).unwrap_err(),
            FlatPointsError::NotAMultiple(10)
        );
        assert_eq!(
            flat_to_points(&[1.0; 20]).unwrap_err(),
            FlatPointsError::NotAMultiple(20)
        );
    }

    #[test]
    fn flat_to_points_accepts_exact_multiples() {
        for n in [1usize, 3, 100] {
            let flat = vec![0.5; n * 7];
            assert_eq!(flat_to_points(&flat).unwrap().len(), n);
        }
    }

    #[test]
    fn prop_point_from_raw() {
        let raw = [27_744.5, 12.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let point = PropPoint::from_raw(&raw);
        assert_eq!(point.ds50_time, 27_744.5);
        assert_eq!(point.mse_time, 12.0);
        assert_eq!(point.vz, 6.0);
    }
}
