//! Cron schedule parsing
//!
//! Pontoon accepts standard five-field cron expressions as well as the
//! six/seven-field forms (with seconds and optional year) understood by
//! the `cron` crate. Five-field expressions are normalised by pinning
//! the seconds column to zero. All schedules are evaluated in UTC.

use std::str::FromStr;

use cron::Schedule;

use crate::error::{Error, Result};

/// Parse a cron expression into a [`Schedule`].
///
/// A five-field expression (`min hour dom month dow`) is widened to the
/// six-field form the parser expects by prepending a `0` seconds column,
/// so `"0 3 * * *"` fires at 03:00:00 UTC daily.
pub fn parse_schedule(expression: &str) -> Result<Schedule> {
    let trimmed = expression.trim();
    let fields = trimmed.split_whitespace().count();

    let normalized = match fields {
        5 => format!("0 {trimmed}"),
        6 | 7 => trimmed.to_string(),
        n => {
            return Err(Error::invalid_schedule(
                expression,
                format!("expected 5, 6, or 7 fields, found {n}"),
            ))
        }
    };

    Schedule::from_str(&normalized)
        .map_err(|e| Error::invalid_schedule(expression, e.to_string()))
}
