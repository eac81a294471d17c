//! EXT-X-PROGRAM-DATE-TIME and DATERANGE date parsing.
//!
//! The protocol specifies ISO/IEC 8601:2004 timestamps. Two parsers are
//! provided: [`strict_time_parse`] accepts only RFC 3339 with optional
//! fractional seconds, while [`full_time_parse`] additionally accepts the
//! `±HH`, `±HHMM` and `±HH:MM` zone-offset spellings. The decoder uses
//! whichever parser was selected with [`set_time_parse`]; the default is
//! the full parser.

use std::sync::atomic::{AtomicU8, Ordering};

use chrono::{DateTime, FixedOffset};

use crate::error::{PlaylistError, Result};

/// Which date-time parser the decoder applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TimeParseMode {
    /// Full ISO/IEC 8601:2004 offsets (`Z`, `±HH`, `±HHMM`, `±HH:MM`).
    Full = 0,
    /// RFC 3339 with nanosecond precision only.
    Strict = 1,
}

static TIME_PARSE_MODE: AtomicU8 = AtomicU8::new(TimeParseMode::Full as u8);

/// Selects the date-time parser used by all subsequent decodes.
///
/// The setting is process-global, matching the library-wide default it
/// replaces.
pub fn set_time_parse(mode: TimeParseMode) {
    TIME_PARSE_MODE.store(mode as u8, Ordering::Relaxed);
}

/// Parses a timestamp with the globally selected parser.
pub fn parse_date_time(value: &str) -> Result<DateTime<FixedOffset>> {
    match TIME_PARSE_MODE.load(Ordering::Relaxed) {
        x if x == TimeParseMode::Strict as u8 => strict_time_parse(value),
        _ => full_time_parse(value),
    }
}

/// Parses an RFC 3339 timestamp with up to nanosecond precision.
pub fn strict_time_parse(value: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value).map_err(|_| invalid(value))
}

/// Parses a full ISO/IEC 8601:2004 timestamp.
///
/// Accepts everything [`strict_time_parse`] does, plus offsets without a
/// colon (`+0200`) and hour-only offsets (`+02`).
pub fn full_time_parse(value: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%#z"))
        .map_err(|_| invalid(value))
}

fn invalid(value: &str) -> PlaylistError {
    PlaylistError::InvalidValue {
        field: "date-time",
        raw: value.to_string(),
    }
}

/// Formats a timestamp as RFC 3339 with nanoseconds, trailing zeros
/// trimmed, and `Z` for a zero offset.
pub(crate) fn format_date_time(t: &DateTime<FixedOffset>) -> String {
    if t.offset().local_minus_utc() == 0 {
        t.format("%Y-%m-%dT%H:%M:%S%.fZ").to_string()
    } else {
        t.format("%Y-%m-%dT%H:%M:%S%.f%:z").to_string()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("2006-01-02T15:04:05.999999999Z")]
    #[case("2006-01-02T15:04:05.999999999+07:00")]
    #[case("2006-01-02T15:04:05.999999999+0700")]
    #[case("2006-01-02T15:04:05.999999999+07")]
    #[case("2018-02-01T01:02:03+0100")]
    #[case("2018-12-31T09:47:22+08:00")]
    fn full_parse_accepts_iso8601_offsets(#[case] value: &str) {
        full_time_parse(value).unwrap();
    }

    #[rstest]
    #[case("2006-01-02T15:04:05.999999999Z", true)]
    #[case("2006-01-02T15:04:05+07:00", true)]
    #[case("2006-01-02T15:04:05+0700", false)]
    #[case("2006-01-02T15:04:05+07", false)]
    #[case("2014/03/05T11:15:00Z", false)]
    fn strict_parse_is_rfc3339_only(#[case] value: &str, #[case] ok: bool) {
        assert_eq!(strict_time_parse(value).is_ok(), ok, "{value}");
    }

    #[rstest]
    #[case("2014-03-05T11:15:00Z", "2014-03-05T11:15:00Z")]
    #[case("2020-01-02T21:55:44.12Z", "2020-01-02T21:55:44.12Z")]
    #[case("2018-12-31T09:47:22+08:00", "2018-12-31T09:47:22+08:00")]
    #[case("2025-02-10T14:42:30.134Z", "2025-02-10T14:42:30.134Z")]
    fn formatting_round_trips(#[case] input: &str, #[case] expected: &str) {
        let t = strict_time_parse(input).unwrap();
        assert_eq!(format_date_time(&t), expected);
    }

    #[test]
    fn offsets_compare_equal_across_spellings() {
        let a = full_time_parse("2018-02-01T01:02:03+0100").unwrap();
        let b = full_time_parse("2018-02-01T01:02:03+01:00").unwrap();
        assert_eq!(a, b);
    }
}
