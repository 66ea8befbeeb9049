//! Time Range Resolver
//!
//! Converts relative (`-1h`, `-7d`) and absolute (RFC 3339, `YYYY-MM-DD`,
//! Unix milliseconds) time expressions into a half-open `[start, end)`
//! interval. The caller always supplies `now`; nothing here reads the clock.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;
use thiserror::Error;

use crate::model::parse_timestamp;

const MINUTE_MS: i64 = 60 * 1000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;
const WEEK_MS: i64 = 7 * DAY_MS;

/// Errors from time expression resolution
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimeError {
    /// Not a recognizable time expression
    #[error("Invalid time expression '{0}': expected -<N><m|h|d|w>, 'now' or an ISO 8601 timestamp")]
    Malformed(String),

    /// Relative offsets must point into the past
    #[error("Relative time '{0}' must be negative (e.g. -1h)")]
    PositiveOffset(String),

    /// Offset does not fit the timestamp range
    #[error("Time offset '{0}' is out of range")]
    OutOfRange(String),

    /// Start after end
    #[error("Invalid time range: start {start} is after end {end}")]
    Inverted { start: String, end: String },
}

/// Result type for time resolution
pub type TimeResult<T> = Result<T, TimeError>;

/// Absolute half-open time interval in Unix milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    /// Start timestamp (inclusive)
    pub start: i64,
    /// End timestamp (exclusive)
    pub end: i64,
}

impl TimeRange {
    /// Create a new time range
    pub fn new(start: i64, end: i64) -> TimeResult<Self> {
        if start > end {
            return Err(TimeError::Inverted {
                start: crate::model::format_timestamp(start),
                end: crate::model::format_timestamp(end),
            });
        }
        Ok(Self { start, end })
    }

    /// Check if a timestamp is within this range
    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.start && timestamp < self.end
    }
}

fn relative_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([+-]?)(\d+)([mhdw])$").ok())
        .as_ref()
}

/// Milliseconds in one unit (`m`, `h`, `d`, `w`)
pub fn unit_ms(unit: char) -> Option<i64> {
    match unit {
        'm' => Some(MINUTE_MS),
        'h' => Some(HOUR_MS),
        'd' => Some(DAY_MS),
        'w' => Some(WEEK_MS),
        _ => None,
    }
}

/// Parse an unsigned duration such as `1h` or `15m`
pub fn parse_duration(text: &str) -> Option<i64> {
    let caps = relative_regex()?.captures(text.trim())?;
    if !caps[1].is_empty() {
        return None;
    }
    let amount: i64 = caps[2].parse().ok()?;
    let unit = caps[3].chars().next().and_then(unit_ms)?;
    amount.checked_mul(unit)
}

/// Parse a relative offset such as `-1d` into signed milliseconds
///
/// Returns `Ok(None)` when the text is not shaped like an offset at all.
pub fn relative_offset(text: &str) -> TimeResult<Option<i64>> {
    let text = text.trim();
    let Some(caps) = relative_regex().and_then(|re| re.captures(text)) else {
        return Ok(None);
    };

    if &caps[1] != "-" {
        return Err(TimeError::PositiveOffset(text.to_string()));
    }

    let amount: i64 = caps[2]
        .parse()
        .map_err(|_| TimeError::OutOfRange(text.to_string()))?;
    let unit = caps[3]
        .chars()
        .next()
        .and_then(unit_ms)
        .ok_or_else(|| TimeError::Malformed(text.to_string()))?;

    amount
        .checked_mul(unit)
        .map(|ms| Some(-ms))
        .ok_or_else(|| TimeError::OutOfRange(text.to_string()))
}

/// Resolve a single time expression against `now`
pub fn resolve_instant(now: i64, expr: &str) -> TimeResult<i64> {
    let expr = expr.trim();

    if expr.eq_ignore_ascii_case("now") {
        return Ok(now);
    }

    if let Some(offset) = relative_offset(expr)? {
        return now
            .checked_add(offset)
            .ok_or_else(|| TimeError::OutOfRange(expr.to_string()));
    }

    parse_timestamp(expr).ok_or_else(|| TimeError::Malformed(expr.to_string()))
}

/// Resolve optional start/end expressions into a time range
///
/// A missing end is `now`. A missing start is `default_lookback_ms` before
/// the resolved end. Blank expressions count as missing.
pub fn resolve(
    now: i64,
    start: Option<&str>,
    end: Option<&str>,
    default_lookback_ms: i64,
) -> TimeResult<TimeRange> {
    let start = start.map(str::trim).filter(|s| !s.is_empty());
    let end = end.map(str::trim).filter(|s| !s.is_empty());

    let end_ms = match end {
        Some(expr) => resolve_instant(now, expr)?,
        None => now,
    };

    let start_ms = match start {
        Some(expr) => resolve_instant(now, expr)?,
        None => end_ms.saturating_sub(default_lookback_ms),
    };

    let range = TimeRange::new(start_ms, end_ms)?;
    tracing::trace!(start = range.start, end = range.end, "Resolved time range");
    Ok(range)
}
