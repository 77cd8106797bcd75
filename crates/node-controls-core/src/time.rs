//! Rendering and parsing of wire timestamps.
//!
//! The string form is RFC 3339 in UTC with nanosecond precision. Other
//! observers parse what this module renders, so the format must not change on
//! its own. Only years 0000 through 9999 have an RFC 3339 form; instants
//! outside that range are refused rather than written in a form the parser
//! cannot read back.

use chrono::{DateTime, Datelike, SecondsFormat, Utc};

use crate::error::TimeError;

const MAX_YEAR: i32 = 9999;

/// Render `time` in the wire format.
///
/// # Errors
///
/// Returns `TimeError::OutOfRange` if the year is outside 0000-9999.
pub fn render_time(time: DateTime<Utc>) -> Result<String, TimeError> {
    let year = time.year();
    if !(0..=MAX_YEAR).contains(&year) {
        return Err(TimeError::OutOfRange { year });
    }
    Ok(time.to_rfc3339_opts(SecondsFormat::Nanos, true))
}

/// Parse a wire timestamp.
///
/// An empty string is the unset time and yields `None`. Any RFC 3339 offset
/// is accepted and normalized to UTC.
///
/// # Errors
///
/// Returns `TimeError::Invalid` if the string is not an RFC 3339 timestamp.
pub fn parse_time(value: &str) -> Result<Option<DateTime<Utc>>, TimeError> {
    if value.is_empty() {
        return Ok(None);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|time| Some(time.with_timezone(&Utc)))
        .map_err(|e| TimeError::Invalid {
            value: value.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_uses_utc_and_nanoseconds() {
        let time = DateTime::from_timestamp(1_700_000_000, 123_456_789).unwrap();
        assert_eq!(render_time(time).unwrap(), "2023-11-14T22:13:20.123456789Z");
    }

    #[test]
    fn render_parse_roundtrip() {
        let time = DateTime::from_timestamp(1_700_000_000, 1).unwrap();
        assert_eq!(parse_time(&render_time(time).unwrap()).unwrap(), Some(time));
    }

    #[test]
    fn render_parse_roundtrip_at_year_bounds() {
        let first = DateTime::parse_from_rfc3339("0000-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let last = DateTime::parse_from_rfc3339("9999-12-31T23:59:59.999999999Z")
            .unwrap()
            .with_timezone(&Utc);

        for time in [first, last] {
            assert_eq!(parse_time(&render_time(time).unwrap()).unwrap(), Some(time));
        }
    }

    #[test]
    fn render_refuses_years_without_rfc3339_form() {
        let last = DateTime::parse_from_rfc3339("9999-12-31T23:59:59.999999999Z")
            .unwrap()
            .with_timezone(&Utc);
        let past_end = last + chrono::Duration::nanoseconds(1);
        assert_eq!(
            render_time(past_end).unwrap_err(),
            TimeError::OutOfRange { year: 10000 }
        );

        let before_start = DateTime::parse_from_rfc3339("0000-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
            - chrono::Duration::nanoseconds(1);
        assert_eq!(
            render_time(before_start).unwrap_err(),
            TimeError::OutOfRange { year: -1 }
        );
    }

    #[test]
    fn parse_normalizes_offsets() {
        let parsed = parse_time("2023-11-14T23:13:20+01:00").unwrap();
        let expected = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(parsed, Some(expected));
    }

    #[test]
    fn parse_empty_is_unset() {
        assert_eq!(parse_time("").unwrap(), None);
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = parse_time("yesterday").unwrap_err();
        assert!(matches!(err, TimeError::Invalid { ref value, .. } if value == "yesterday"));
    }
}
