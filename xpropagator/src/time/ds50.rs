//! UTC <-> DS50 conversions.
//!
//! DS50 is the engine's internal time scale: days (including fraction)
//! since 1950-01-01 12:00:00 UTC.

use chrono::{DateTime, Duration, TimeZone, Utc};

/// Seconds per day, the only constant in the conversion.
const SECONDS_PER_DAY: f64 = 86_400.0;

/// The DS50 epoch: 1950-01-01 12:00:00 UTC.
pub fn ds50_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1950, 1, 1, 12, 0, 0).unwrap()
}

/// RFC 3339 rendering of the DS50 epoch, for messages and docs.
pub const DS50_EPOCH: &str = "1950-01-01T12:00:00Z";

/// Convert a UTC timestamp to DS50.
pub fn utc_to_ds50(t: DateTime<Utc>) -> f64 {
    let delta = t - ds50_epoch();
    // Microsecond resolution is ample: the service promises millisecond
    // round-trip accuracy over 1950..2100.
    delta.num_microseconds().map_or_else(
        || delta.num_seconds() as f64 / SECONDS_PER_DAY,
        |us| us as f64 / 1_000_000.0 / SECONDS_PER_DAY,
    )
}

/// Convert a DS50 value back to a UTC timestamp.
pub fn ds50_to_utc(ds50: f64) -> DateTime<Utc> {
    let micros = (ds50 * SECONDS_PER_DAY * 1_000_000.0).round() as i64;
    ds50_epoch() + Duration::microseconds(micros)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_maps_to_zero() {
        assert_eq!(utc_to_ds50(ds50_epoch()), 0.0);
    }

    #[test]
    fn one_day_after_epoch() {
        let t = Utc.with_ymd_and_hms(1950, 1, 2, 12, 0, 0).unwrap();
        assert!((utc_to_ds50(t) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn known_millennium_value() {
        // 1950-01-01 to 2000-01-01 is 18,262 days (12 leap years);
        // midnight is half a day before the 12:00 epoch time-of-day.
        let t = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        assert!((utc_to_ds50(t) - 18_261.5).abs() < 1e-9);
    }

    #[test]
    fn half_day_fraction() {
        let t = Utc.with_ymd_and_hms(1950, 1, 2, 0, 0, 0).unwrap();
        assert!((utc_to_ds50(t) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn round_trip_within_millisecond_across_range() {
        // Sample the full supported range [1950, 2100] at awkward offsets.
        for year in (1950..=2100).step_by(7) {
            let t = Utc.with_ymd_and_hms(year, 3, 17, 4, 31, 7).unwrap()
                + Duration::milliseconds(123);
            let back = ds50_to_utc(utc_to_ds50(t));
            let err = (back - t).num_milliseconds().abs();
            assert!(err <= 1, "round trip error {err}ms at year {year}");
        }
    }

    #[test]
    fn pre_epoch_times_are_negative() {
        let t = Utc.with_ymd_and_hms(1949, 12, 31, 12, 0, 0).unwrap();
        assert!((utc_to_ds50(t) + 1.0).abs() < 1e-9);
    }
}
