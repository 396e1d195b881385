//! Compact duration strings
//!
//! Task periods are written as `<count><unit>`, e.g. `30m`, `2d`, `030mo`.
//! Weeks are 7 days and months are a flat 30 days.

use std::time::Duration;

use thiserror::Error;

const SECOND: u64 = 1;
const MINUTE: u64 = 60 * SECOND;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;
const MONTH: u64 = 30 * DAY;

/// Recognized units, longest suffix first so `mo` wins over `m`
const UNITS: &[(&str, u64)] = &[
    ("mo", MONTH),
    ("s", SECOND),
    ("m", MINUTE),
    ("h", HOUR),
    ("d", DAY),
    ("w", WEEK),
];

/// Errors from parsing a duration string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    #[error("empty duration string")]
    Empty,

    #[error("invalid time unit in {0:?}")]
    InvalidUnit(String),

    #[error("invalid count {0:?}")]
    InvalidCount(String),

    #[error("duration {0:?} is too large")]
    Overflow(String),
}

/// Parse a duration string such as `10m` or `2d`
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(DurationError::Empty);
    }

    let (count, unit_secs) = UNITS
        .iter()
        .find_map(|(suffix, secs)| s.strip_suffix(suffix).map(|count| (count, *secs)))
        .ok_or_else(|| DurationError::InvalidUnit(s.to_string()))?;

    if count.is_empty() || !count.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DurationError::InvalidCount(count.to_string()));
    }

    let count: u64 = count
        .parse()
        .map_err(|_| DurationError::Overflow(s.to_string()))?;

    count
        .checked_mul(unit_secs)
        .map(Duration::from_secs)
        .ok_or_else(|| DurationError::Overflow(s.to_string()))
}

/// Render a duration using the largest unit that divides it exactly
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs == 0 {
        return format!("{}ms", duration.as_millis());
    }
    for (suffix, unit_secs) in [("mo", MONTH), ("w", WEEK), ("d", DAY), ("h", HOUR), ("m", MINUTE)] {
        if secs % unit_secs == 0 {
            return format!("{}{}", secs / unit_secs, suffix);
        }
    }
    format!("{}s", secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_base_units() {
        assert_eq!(parse_duration("1s").unwrap(), Duration::from_secs(1));
        assert_eq!(parse_duration("10m").unwrap(), Duration::from_secs(600));
        assert_eq!(parse_duration("01h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("2d").unwrap(), Duration::from_secs(48 * 3600));
    }

    #[test]
    fn test_parse_week_and_month() {
        assert_eq!(parse_duration("3w").unwrap(), Duration::from_secs(21 * DAY));
        assert_eq!(parse_duration("030mo").unwrap(), Duration::from_secs(900 * DAY));
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(parse_duration(" 5m ").unwrap(), Duration::from_secs(300));
    }

    #[test]
    fn test_invalid_unit() {
        assert_eq!(
            parse_duration("5x"),
            Err(DurationError::InvalidUnit("5x".to_string()))
        );
        assert!(matches!(parse_duration("12"), Err(DurationError::InvalidUnit(_))));
    }

    #[test]
    fn test_invalid_count() {
        assert!(matches!(parse_duration("h"), Err(DurationError::InvalidCount(_))));
        assert!(matches!(parse_duration("-1h"), Err(DurationError::InvalidCount(_))));
        assert!(matches!(parse_duration("1.5h"), Err(DurationError::InvalidCount(_))));
    }

    #[test]
    fn test_empty() {
        assert_eq!(parse_duration(""), Err(DurationError::Empty));
        assert_eq!(parse_duration("   "), Err(DurationError::Empty));
    }

    #[test]
    fn test_overflow() {
        assert!(matches!(
            parse_duration("99999999999999999999mo"),
            Err(DurationError::Overflow(_))
        ));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(90)), "90s");
        assert_eq!(format_duration(Duration::from_secs(600)), "10m");
        assert_eq!(format_duration(Duration::from_secs(2 * DAY)), "2d");
        assert_eq!(format_duration(Duration::from_secs(14 * DAY)), "2w");
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
    }

    proptest! {
        #[test]
        fn prop_count_times_unit(count in 0u64..100_000, idx in 0usize..UNITS.len()) {
            let (suffix, secs) = UNITS[idx];
            let parsed = parse_duration(&format!("{}{}", count, suffix)).unwrap();
            prop_assert_eq!(parsed, Duration::from_secs(count * secs));
        }

        #[test]
        fn prop_format_round_trips(secs in 1u64..10_000_000) {
            let d = Duration::from_secs(secs);
            prop_assert_eq!(parse_duration(&format_duration(d)).unwrap(), d);
        }
    }
}
