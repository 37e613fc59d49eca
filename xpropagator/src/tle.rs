//! Two-line element set parsing.
//!
//! Two entry points with different appetites:
//!
//! - [`parse_sat_num`] reads only columns 3-7 of line 1 - the catalog
//!   number in legacy numeric or Alpha-5 form. This is all the satellite
//!   registry needs for identity lookup.
//! - [`parse_elements`] extracts the full mean element set from both
//!   lines for the in-process analytic engine.

use chrono::{Duration, TimeZone, Utc};
use thiserror::Error;

use crate::time::utc_to_ds50;

/// Errors raised while parsing TLE lines.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TleError {
    /// Line 1 is too short to contain a catalog number.
    #[error("invalid TLE first line length")]
    LineTooShort,

    /// The catalog number field is not 5 characters after trimming.
    #[error("invalid catalog number length: {0:?}")]
    SatNumLength(String),

    /// The catalog number is neither legacy numeric nor Alpha-5.
    #[error("invalid catalog number format {0:?}")]
    SatNumFormat(String),

    /// A numeric element field failed to parse.
    #[error("unparseable TLE field {field} in line {line}: {value:?}")]
    BadField {
        /// Field name, e.g. "mean motion".
        field: &'static str,
        /// 1 or 2.
        line: u8,
        /// Raw text that failed to parse.
        value: String,
    },
}

/// Parse the catalog number from TLE line 1, columns 3-7.
///
/// Two formats are accepted:
///
/// - legacy numeric: 5 digits, value 1-99999;
/// - Alpha-5: one letter (A-Z excluding I and O) followed by 4 digits,
///   decoding to 100000-359999 (A=10 .. Z=35 as the leading two digits).
pub fn parse_sat_num(line1: &str) -> Result<i32, TleError> {
    // `get` rather than indexing: malformed (non-ASCII) lines must fail,
    // not panic on a char boundary.
    let field = line1.get(2..7).ok_or(TleError::LineTooShort)?.trim();
    if field.len() != 5 {
        return Err(TleError::SatNumLength(field.to_string()));
    }

    // Legacy 5-digit numeric first.
    if let Ok(n) = field.parse::<i32>() {
        if (1..=99_999).contains(&n) {
            return Ok(n);
        }
    }

    // Alpha-5: letter (A-Z except I, O) + 4 digits.
    let bytes = field.as_bytes();
    let letter = bytes[0];
    if letter.is_ascii_uppercase() && letter != b'I' && letter != b'O' {
        if let Ok(digits) = field[1..].parse::<i32>() {
            if (0..=9_999).contains(&digits) {
                let prefix = (i32::from(letter - b'A') + 10) * 10_000;
                let sat_num = prefix + digits;
                if (100_000..=359_999).contains(&sat_num) {
                    return Ok(sat_num);
                }
            }
        }
    }

    Err(TleError::SatNumFormat(field.to_string()))
}

/// Mean elements extracted from a TLE pair, in the units the analytic
/// engine wants.
#[derive(Debug, Clone, PartialEq)]
pub struct TleElements {
    /// Decoded catalog number.
    pub sat_num: i32,
    /// Element set epoch in DS50.
    pub epoch_ds50: f64,
    /// Inclination, degrees.
    pub inclination_deg: f64,
    /// Right ascension of the ascending node, degrees.
    pub raan_deg: f64,
    /// Eccentricity (dimensionless; the field has an implied decimal point).
    pub eccentricity: f64,
    /// Argument of perigee, degrees.
    pub arg_perigee_deg: f64,
    /// Mean anomaly at epoch, degrees.
    pub mean_anomaly_deg: f64,
    /// Mean motion, revolutions per day.
    pub mean_motion_rev_day: f64,
}

/// Parse the mean element set from a TLE line pair.
pub fn parse_elements(line1: &str, line2: &str) -> Result<TleElements, TleError> {
    let sat_num = parse_sat_num(line1)?;

    let epoch_field = line1.get(18..32).ok_or(TleError::LineTooShort)?;
    let epoch_ds50 = parse_epoch(epoch_field)?;

    fn column<'a>(
        line2: &'a str,
        field: &'static str,
        range: std::ops::Range<usize>,
    ) -> Result<&'a str, TleError> {
        line2.get(range).ok_or(TleError::BadField {
            field,
            line: 2,
            value: line2.to_string(),
        })
    }
    fn f64_field(field: &'static str, text: &str) -> Result<f64, TleError> {
        text.trim().parse::<f64>().map_err(|_| TleError::BadField {
            field,
            line: 2,
            value: text.to_string(),
        })
    }

    // Eccentricity carries an implied leading "0.".
    let ecc_text = column(line2, "eccentricity", 26..33)?.trim();
    let eccentricity = format!("0.{ecc_text}")
        .parse::<f64>()
        .map_err(|_| TleError::BadField {
            field: "eccentricity",
            line: 2,
            value: ecc_text.to_string(),
        })?;

    Ok(TleElements {
        sat_num,
        epoch_ds50,
        inclination_deg: f64_field("inclination", column(line2, "inclination", 8..16)?)?,
        raan_deg: f64_field("RAAN", column(line2, "RAAN", 17..25)?)?,
        eccentricity,
        arg_perigee_deg: f64_field(
            "argument of perigee",
            column(line2, "argument of perigee", 34..42)?,
        )?,
        mean_anomaly_deg: f64_field("mean anomaly", column(line2, "mean anomaly", 43..51)?)?,
        mean_motion_rev_day: f64_field("mean motion", column(line2, "mean motion", 52..63)?)?,
    })
}

/// Parse the TLE epoch field (YYDDD.DDDDDDDD) into DS50.
///
/// Years 57-99 map to 1957-1999, 00-56 to 2000-2056, per convention.
fn parse_epoch(field: &str) -> Result<f64, TleError> {
    let bad = |value: &str| TleError::BadField {
        field: "epoch",
        line: 1,
        value: value.to_string(),
    };

    let text = field.trim();
    if text.len() < 5 {
        return Err(bad(text));
    }
    let yy: i32 = text[..2].parse().map_err(|_| bad(text))?;
    let day_of_year: f64 = text[2..].parse().map_err(|_| bad(text))?;
    if !(1.0..367.0).contains(&day_of_year) {
        return Err(bad(text));
    }

    let year = if yy < 57 { 2000 + yy } else { 1900 + yy };
    let jan1 = Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap();
    let micros = ((day_of_year - 1.0) * 86_400.0 * 1_000_000.0).round() as i64;
    Ok(utc_to_ds50(jan1 + Duration::microseconds(micros)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISS_LINE1: &str = "1 25544U 98067A   21275.52543210  .00016717  00000-0  10270-3 0  9042";
    const ISS_LINE2: &str = "2 25544  51.6442 208.5453 0003439  47.4501  63.9527 15.48881544315506";

    #[test]
    fn sat_num_iss() {
        assert_eq!(parse_sat_num(ISS_LINE1).unwrap(), 25_544);
    }

    #[test]
    fn sat_num_alpha5() {
        assert_eq!(parse_sat_num("1 A0001U 25001A   25001.00000000").unwrap(), 100_001);
        assert_eq!(parse_sat_num("1 Z9999U 25001A   25001.00000000").unwrap(), 359_999);
        // H=17, so H4312 -> 174312.
        assert_eq!(parse_sat_num("1 H4312U 25001A   25001.00000000").unwrap(), 174_312);
    }

    #[test]
    fn sat_num_rejects_excluded_letters() {
        assert!(matches!(
            parse_sat_num("1 I1234U 25001A   25001.00000000"),
            Err(TleError::SatNumFormat(_))
        ));
        assert!(matches!(
            parse_sat_num("1 O1234U 25001A   25001.00000000"),
            Err(TleError::SatNumFormat(_))
        ));
    }

    #[test]
    fn sat_num_rejects_out_of_range_and_garbage() {
        assert!(parse_sat_num("1 00000U").is_err());
        assert!(parse_sat_num("1 a0001U").is_err());
        assert!(parse_sat_num("1 2554").is_err());
        assert!(parse_sat_num("1").is_err());
    }

    #[test]
    fn alpha5_round_trip_identity() {
        // Rebuild the string from the decoded value and decode again.
        for &(s, n) in &[("A0000", 100_000), ("B1234", 111_234), ("W9999", 329_999)] {
            let line = format!("1 {s}U 25001A   25001.00000000");
            assert_eq!(parse_sat_num(&line).unwrap(), n);
        }
    }

    #[test]
    fn elements_iss() {
        let e = parse_elements(ISS_LINE1, ISS_LINE2).unwrap();
        assert_eq!(e.sat_num, 25_544);
        assert!((e.inclination_deg - 51.6442).abs() < 1e-9);
        assert!((e.raan_deg - 208.5453).abs() < 1e-9);
        assert!((e.eccentricity - 0.0003439).abs() < 1e-12);
        assert!((e.arg_perigee_deg - 47.4501).abs() < 1e-9);
        assert!((e.mean_anomaly_deg - 63.9527).abs() < 1e-9);
        assert!((e.mean_motion_rev_day - 15.48881544).abs() < 1e-8);
    }

    #[test]
    fn elements_epoch_is_in_2021() {
        let e = parse_elements(ISS_LINE1, ISS_LINE2).unwrap();
        let utc = crate::time::ds50_to_utc(e.epoch_ds50);
        assert_eq!(utc.format("%Y").to_string(), "2021");
        // Day 275.52543210 of 2021 is October 2nd.
        assert_eq!(utc.format("%m-%d").to_string(), "10-02");
    }

    #[test]
    fn elements_reject_short_lines() {
        assert!(parse_elements("1 25544U", ISS_LINE2).is_err());
        assert!(parse_elements(ISS_LINE1, "2 25544").is_err());
    }
}
