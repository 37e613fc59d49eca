//! Time scales and duration parsing.
//!
//! The propagation engine works in DS50 (days since 1950-01-01 12:00 UTC);
//! clients may speak UTC or ISO-8601 durations. Conversions happen at the
//! boundary, in this module.

mod ds50;
mod duration;

pub use ds50::{ds50_to_utc, utc_to_ds50, DS50_EPOCH};
pub use duration::{parse_iso8601_minutes, DurationParseError};
