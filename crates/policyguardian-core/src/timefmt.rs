//! Second-precision UTC timestamp format (`spec.md` §6) and round-trip
//! validator.
//!
//! Grounded on `internal/shared/timefmt/timefmt.go`: the wire format is
//! `YYYY-MM-DDTHH:MM:SSZ`, and a string is only accepted if re-formatting
//! the value it parses to reproduces the exact same string — this rejects
//! sub-second precision and any offset other than literal `Z`.

use crate::error::BuildError;
use chrono::{DateTime, SecondsFormat, Utc};

/// Truncate `now()` to second precision and format it per `spec.md` §6.
pub fn now_utc_formatted() -> String {
    format(Utc::now())
}

/// Format a `DateTime<Utc>` as `YYYY-MM-DDTHH:MM:SSZ`, truncating to second
/// precision.
pub fn format(t: DateTime<Utc>) -> String {
    let truncated = t - chrono::Duration::nanoseconds(t.timestamp_subsec_nanos() as i64);
    truncated.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a `YYYY-MM-DDTHH:MM:SSZ` string, rejecting anything whose
/// canonical re-format does not equal the input.
pub fn parse(s: &str) -> Result<DateTime<Utc>, BuildError> {
    let parsed = DateTime::parse_from_rfc3339(s)
        .map_err(|_| BuildError::InvalidTimestamp(s.to_string()))?
        .with_timezone(&Utc);
    if format(parsed) != s {
        return Err(BuildError::InvalidTimestamp(s.to_string()));
    }
    Ok(parsed)
}
