//! Minimal parser for the interval-string grammar the store is allowed to
//! understand (`startAfter`/`expireIn` accept "a non-negative number of
//! seconds, or an interval string parseable by the store"). The core treats
//! these strings as opaque; only the concrete executor (the store) needs
//! to parse them, so the parser lives next to [`crate::sqlite::SqliteExecutor`]
//! rather than in the core's `Plans`/`Manager` modules.

use crate::error::QueueError;
use crate::job::Interval;

/// Resolve an [`Interval`] to a plain second count.
pub fn to_seconds(interval: &Interval) -> Result<i64, QueueError> {
    match interval {
        Interval::Seconds(s) => Ok(*s),
        Interval::Literal(s) => parse_literal(s),
    }
}

/// Parse phrases like `"15 minutes"`, `"1 second"`, `"2 hours"`,
/// `"3 days"`, or a bare integer (already-seconds).
fn parse_literal(s: &str) -> Result<i64, QueueError> {
    let s = s.trim();
    if let Ok(n) = s.parse::<i64>() {
        return Ok(n);
    }

    let mut parts = s.split_whitespace();
    let (count, unit) = match (parts.next(), parts.next(), parts.next()) {
        (Some(count), Some(unit), None) => (count, unit),
        _ => {
            return Err(QueueError::InvalidArgument(format!(
                "unparseable interval string: {s:?}"
            )))
        }
    };

    let count: i64 = count.parse().map_err(|_| {
        QueueError::InvalidArgument(format!("unparseable interval string: {s:?}"))
    })?;

    let multiplier = match unit.trim_end_matches('s') {
        "second" => 1,
        "minute" => 60,
        "hour" => 3600,
        "day" => 86_400,
        other => {
            return Err(QueueError::InvalidArgument(format!(
                "unknown interval unit: {other:?}"
            )))
        }
    };

    Ok(count * multiplier)
}
