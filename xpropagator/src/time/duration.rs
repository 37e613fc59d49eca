//! ISO-8601 duration parsing.
//!
//! Time-grid steps arrive as ISO-8601 duration strings such as `PT8.5M`
//! or `P1DT30M`. The engine wants a step in minutes, so that is the only
//! output format here. Fractional values are accepted on any component.
//!
//! Calendar components use fixed factors: a year is 365.25 days and a
//! month is 30.4375 days.

use thiserror::Error;

/// Error raised for malformed ISO-8601 duration strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid ISO-8601 duration {input:?}: {reason}")]
pub struct DurationParseError {
    /// Offending input, echoed back for diagnostics.
    pub input: String,
    /// What went wrong, human-readable.
    pub reason: String,
}

impl DurationParseError {
    fn new(input: &str, reason: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

const MINUTES_PER_HOUR: f64 = 60.0;
const MINUTES_PER_DAY: f64 = 1_440.0;
const DAYS_PER_WEEK: f64 = 7.0;
const DAYS_PER_MONTH: f64 = 30.4375;
const DAYS_PER_YEAR: f64 = 365.25;

/// Parse an ISO-8601 duration (`P[nY][nM][nW][nD][T[nH][nM][nS]]`) into
/// minutes.
///
/// Components must appear in order and at most once; at least one
/// component is required. A decimal comma is accepted alongside the
/// decimal point.
pub fn parse_iso8601_minutes(input: &str) -> Result<f64, DurationParseError> {
    let body = input
        .strip_prefix('P')
        .ok_or_else(|| DurationParseError::new(input, "must start with 'P'"))?;
    if body.is_empty() {
        return Err(DurationParseError::new(input, "no components"));
    }

    let (date_part, time_part) = match body.split_once('T') {
        Some((_, t)) if t.is_empty() => {
            return Err(DurationParseError::new(input, "'T' with no time components"));
        }
        Some((d, t)) => (d, Some(t)),
        None => (body, None),
    };

    let mut minutes = 0.0;
    let mut saw_component = false;

    let date_designators: [(char, f64); 4] = [
        ('Y', DAYS_PER_YEAR * MINUTES_PER_DAY),
        ('M', DAYS_PER_MONTH * MINUTES_PER_DAY),
        ('W', DAYS_PER_WEEK * MINUTES_PER_DAY),
        ('D', MINUTES_PER_DAY),
    ];
    minutes += parse_part(input, date_part, &date_designators, &mut saw_component)?;

    if let Some(time_part) = time_part {
        let time_designators: [(char, f64); 3] = [
            ('H', MINUTES_PER_HOUR),
            ('M', 1.0),
            ('S', 1.0 / MINUTES_PER_HOUR),
        ];
        minutes += parse_part(input, time_part, &time_designators, &mut saw_component)?;
    }

    if !saw_component {
        return Err(DurationParseError::new(input, "no components"));
    }
    Ok(minutes)
}

/// Parse one side of the 'T' separator against an ordered designator table.
fn parse_part(
    input: &str,
    part: &str,
    designators: &[(char, f64)],
    saw_component: &mut bool,
) -> Result<f64, DurationParseError> {
    let mut total = 0.0;
    let mut next_designator = 0;
    let mut chars = part.chars().peekable();

    while chars.peek().is_some() {
        let mut number = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_ascii_digit() || c == '.' || c == ',' {
                number.push(if c == ',' { '.' } else { c });
                chars.next();
            } else {
                break;
            }
        }
        if number.is_empty() {
            return Err(DurationParseError::new(input, "designator without a value"));
        }
        let value: f64 = number
            .parse()
            .map_err(|_| DurationParseError::new(input, format!("bad number {number:?}")))?;

        let designator = chars
            .next()
            .ok_or_else(|| DurationParseError::new(input, "value without a designator"))?;

        // Designators must appear in order, each at most once.
        let position = designators[next_designator..]
            .iter()
            .position(|&(d, _)| d == designator)
            .ok_or_else(|| {
                DurationParseError::new(
                    input,
                    format!("unexpected or out-of-order designator {designator:?}"),
                )
            })?;
        let (_, factor) = designators[next_designator + position];
        next_designator += position + 1;

        total += value * factor;
        *saw_component = true;
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minutes(s: &str) -> f64 {
        parse_iso8601_minutes(s).unwrap()
    }

    #[test]
    fn fractional_minutes() {
        assert!((minutes("PT8.5M") - 8.5).abs() < 1e-12);
    }

    #[test]
    fn hours_and_seconds() {
        assert!((minutes("PT1H") - 60.0).abs() < 1e-12);
        assert!((minutes("PT30S") - 0.5).abs() < 1e-12);
        assert!((minutes("PT1H30M15S") - 90.25).abs() < 1e-12);
    }

    #[test]
    fn date_components() {
        assert!((minutes("P1D") - 1_440.0).abs() < 1e-9);
        assert!((minutes("P1DT30M") - 1_470.0).abs() < 1e-9);
        assert!((minutes("P2W") - 2.0 * 7.0 * 1_440.0).abs() < 1e-9);
        assert!((minutes("P1Y") - 365.25 * 1_440.0).abs() < 1e-6);
        assert!((minutes("P1M") - 30.4375 * 1_440.0).abs() < 1e-6);
    }

    #[test]
    fn decimal_comma() {
        assert!((minutes("PT8,5M") - 8.5).abs() < 1e-12);
    }

    #[test]
    fn month_and_minute_disambiguated_by_t() {
        // 'M' before the T is months, after it is minutes.
        assert!((minutes("P1MT1M") - (30.4375 * 1_440.0 + 1.0)).abs() < 1e-6);
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "P", "PT", "8.5M", "PTM", "PT8.5", "PT8.5X", "P1D2H", "PT1M1H"] {
            assert!(
                parse_iso8601_minutes(bad).is_err(),
                "expected {bad:?} to fail"
            );
        }
    }

    #[test]
    fn rejects_duplicate_designator() {
        assert!(parse_iso8601_minutes("PT1M1M").is_err());
    }
}
