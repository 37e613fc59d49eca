//! Shared engine types.

use std::fmt;

/// Opaque handle identifying a satellite loaded into the engine.
///
/// Stable for the lifetime of the catalog entry; never reused while the
/// entry is loaded.
pub type SatKey = i64;

/// Return code for a successful engine call.
pub const RC_OK: i32 = 0;

/// Return code signalling that the ephemeris output buffer could not be
/// allocated.
pub const RC_ALLOC_FAILED: i32 = -10;

/// Interpretation of the scalar time argument to a point propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeKind {
    /// Minutes since the element set epoch.
    Mse,
    /// Days since 1950-01-01 12:00 UTC.
    Ds50,
}

impl fmt::Display for TimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeKind::Mse => write!(f, "MSE"),
            TimeKind::Ds50 => write!(f, "DS50"),
        }
    }
}

/// Output reference frame for generated ephemerides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// True-equator mean-equinox Earth-centered inertial.
    Eci,
    /// J2000 Earth-centered inertial.
    J2k,
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Eci => write!(f, "ECI"),
            Frame::J2k => write!(f, "J2K"),
        }
    }
}

/// Identification strings reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineInfo {
    /// Main astrodynamics library identification.
    pub astro: String,
    /// SGP4 propagator identification.
    pub sgp4: String,
}
