//! Request validation.
//!
//! Pure functions returning the first violation as a human-readable
//! message; handlers surface these as `InvalidArgument`. Nothing here
//! touches the engine or the registry.

use crate::api::{EphemRequest, PropRequest, Satellite, TimeGrid, TimeStep};
use crate::time::parse_iso8601_minutes;

/// Check that a task carries a usable satellite.
pub fn validate_satellite(sat: Option<&Satellite>) -> Result<(), String> {
    let sat = sat.ok_or_else(|| "task must include a satellite".to_string())?;
    if sat.tle_line1.is_empty() {
        return Err("satellite is missing TLE line 1".to_string());
    }
    if sat.tle_line2.is_empty() {
        return Err("satellite is missing TLE line 2".to_string());
    }
    Ok(())
}

/// Check a time grid's one-of rules and that its step is parseable.
pub fn validate_grid(grid: &TimeGrid) -> Result<(), String> {
    if grid.start_utc.is_some() && grid.start_ds50.is_some() {
        return Err(
            "invalid grid: start time given in both UTC and DS50; use only one format".to_string(),
        );
    }
    if grid.end_utc.is_some() && grid.end_ds50.is_some() {
        return Err(
            "invalid grid: end time given in both UTC and DS50; use only one format".to_string(),
        );
    }
    if let Some(TimeStep::Period(period)) = &grid.step {
        parse_iso8601_minutes(period).map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// Validate a single-point propagation request.
pub fn validate_prop_request(req: &PropRequest) -> Result<(), String> {
    let task = req.task.as_ref().ok_or_else(|| "task is required".to_string())?;
    validate_satellite(task.sat.as_ref())?;

    if task.time_utc.is_some() && task.time.is_some() {
        return Err(
            "time cannot be given in DS50 or MSE, a UTC time is already specified".to_string(),
        );
    }
    if task.time_utc.is_none() && req.time_kind.is_none() {
        return Err("time must be specified as DS50/MSE or UTC".to_string());
    }
    Ok(())
}

/// Validate a streaming ephemeris request.
pub fn validate_ephem_request(req: &EphemRequest) -> Result<(), String> {
    if req.tasks.is_empty() {
        return Err("request must have at least one task".to_string());
    }
    if req.frame.is_none() {
        return Err("invalid ephemerides type (valid types: ECI, J2K)".to_string());
    }

    if let Some(grid) = &req.common_time_grid {
        validate_grid(grid)?;
    }

    for (i, task) in req.tasks.iter().enumerate() {
        validate_satellite(task.sat.as_ref()).map_err(|e| format!("task {i}: {e}"))?;
        if req.common_time_grid.is_none() && task.time_grid.is_none() {
            return Err(format!(
                "task {i} must have its own time grid since no common time grid is specified"
            ));
        }
        if let Some(grid) = &task.time_grid {
            validate_grid(grid).map_err(|e| format!("task {i}: {e}"))?;
        }
    }

    Ok(())
}
