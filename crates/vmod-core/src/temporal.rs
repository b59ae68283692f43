//! # Temporal Parsing — ISO-8601 and Unix Timestamps
//!
//! Parses dates, times and datetimes from ISO-8601 text and converts unix
//! timestamps. Everything is normalized to naive UTC values.
//!
//! ## Accepted Forms
//!
//! - Dates: `YYYY-MM-DD`.
//! - Times: `HH:MM`, `HH:MM:SS`, `HH:MM:SS.ffffff`, optionally followed by
//!   `Z` or a `+HH:MM` offset, which is folded into the wall-clock value.
//! - Datetimes: a date and a time separated by `T`, `t` or a space, optional
//!   fraction, optional `Z` or offset. Offsets are converted to UTC. A bare
//!   date means midnight.
//! - Timestamps: seconds since the epoch, or milliseconds when the magnitude
//!   exceeds `2e10`.
//!
//! Formatting emits `YYYY-MM-DDTHH:MM:SS` with a fraction only when non-zero.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use thiserror::Error;

/// Timestamps with a larger magnitude are read as milliseconds.
pub const MILLISECOND_THRESHOLD: f64 = 2e10;

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Error parsing or converting a temporal value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemporalError {
    /// The text is not in any accepted form.
    #[error("invalid {kind} format: {input:?}")]
    InvalidFormat {
        /// `date`, `time` or `datetime`.
        kind: &'static str,
        input: String,
    },

    /// The timestamp is outside the representable range.
    #[error("timestamp out of range: {0}")]
    OutOfRange(f64),
}

/// Parse an ISO-8601 calendar date.
pub fn parse_date(input: &str) -> Result<NaiveDate, TemporalError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| TemporalError::InvalidFormat {
        kind: "date",
        input: input.to_string(),
    })
}

/// Parse an ISO-8601 time of day.
pub fn parse_time(input: &str) -> Result<NaiveTime, TemporalError> {
    let invalid = || TemporalError::InvalidFormat {
        kind: "time",
        input: input.to_string(),
    };
    let (clock, offset_secs) = split_offset(input.trim()).ok_or_else(invalid)?;
    let time = TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(clock, fmt).ok())
        .ok_or_else(invalid)?;
    let (utc, _) = time.overflowing_sub_signed(chrono::Duration::seconds(i64::from(offset_secs)));
    Ok(utc)
}

/// Parse an ISO-8601 datetime, normalizing any offset to UTC.
pub fn parse_datetime(input: &str) -> Result<NaiveDateTime, TemporalError> {
    let trimmed = input.trim();
    let normalized = normalize_separator(trimmed);

    if let Ok(dt) = DateTime::<FixedOffset>::parse_from_rfc3339(&normalized) {
        return Ok(dt.naive_utc());
    }
    if let Some((clock, offset_secs)) = split_offset(&normalized) {
        for fmt in DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(clock, fmt) {
                return naive
                    .checked_sub_signed(chrono::Duration::seconds(i64::from(offset_secs)))
                    .ok_or_else(|| TemporalError::InvalidFormat {
                        kind: "datetime",
                        input: input.to_string(),
                    });
            }
        }
    }
    if let Ok(date) = parse_date(trimmed) {
        return Ok(midnight(date));
    }
    Err(TemporalError::InvalidFormat {
        kind: "datetime",
        input: input.to_string(),
    })
}

/// Convert a unix timestamp in seconds (or milliseconds above the threshold).
pub fn from_unix_timestamp(ts: f64) -> Result<NaiveDateTime, TemporalError> {
    if !ts.is_finite() {
        return Err(TemporalError::OutOfRange(ts));
    }
    let seconds = if ts.abs() > MILLISECOND_THRESHOLD {
        ts / 1000.0
    } else {
        ts
    };
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round() as u32;
    if whole < i64::MIN as f64 || whole > i64::MAX as f64 {
        return Err(TemporalError::OutOfRange(ts));
    }
    DateTime::from_timestamp(whole as i64, nanos.min(999_999_999))
        .map(|dt| dt.naive_utc())
        .ok_or(TemporalError::OutOfRange(ts))
}

pub fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

pub fn is_midnight(dt: &NaiveDateTime) -> bool {
    dt.time() == NaiveTime::MIN
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn format_time(time: &NaiveTime) -> String {
    if time.nanosecond() == 0 {
        time.format("%H:%M:%S").to_string()
    } else {
        time.format("%H:%M:%S%.f").to_string()
    }
}

pub fn format_datetime(dt: &NaiveDateTime) -> String {
    format!("{}T{}", format_date(&dt.date()), format_time(&dt.time()))
}

// A space or lowercase `t` between date and time is accepted.
fn normalize_separator(input: &str) -> String {
    let bytes = input.as_bytes();
    if bytes.len() > 10 && (bytes[10] == b' ' || bytes[10] == b't') {
        format!("{}T{}", &input[..10], &input[11..])
    } else {
        input.to_string()
    }
}

/// Split a trailing `Z` or `±HH:MM` offset off a clock string.
///
/// Returns the remaining text and the offset in seconds east of UTC.
fn split_offset(input: &str) -> Option<(&str, i32)> {
    if let Some(rest) = input.strip_suffix('Z').or_else(|| input.strip_suffix('z')) {
        return Some((rest, 0));
    }
    let bytes = input.as_bytes();
    if bytes.len() > 6 {
        let sign_at = bytes.len() - 6;
        let sign = bytes[sign_at];
        if (sign == b'+' || sign == b'-') && bytes[sign_at + 3] == b':' {
            let hours: i32 = input[sign_at + 1..sign_at + 3].parse().ok()?;
            let minutes: i32 = input[sign_at + 4..].parse().ok()?;
            if hours > 23 || minutes > 59 {
                return None;
            }
            let secs = hours * 3600 + minutes * 60;
            let secs = if sign == b'-' { -secs } else { secs };
            return Some((&input[..sign_at], secs));
        }
    }
    Some((input, 0))
}
