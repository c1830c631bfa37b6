//! Date and datetime text recognition
//!
//! Formats are tried in order; the first that parses wins. Slash dates are
//! read month-first, so "05/06/2024" is May 6th.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// A recognised calendar-date pattern.
#[derive(Debug, Clone, Copy)]
pub struct DateFormatSpec {
    pub pattern: &'static str,
    pub example: &'static str,
}

/// Date-only formats (ordered by popularity).
pub const DATE_FORMATS: &[DateFormatSpec] = &[
    DateFormatSpec {
        pattern: "%Y-%m-%d",
        example: "2024-05-31",
    },
    DateFormatSpec {
        pattern: "%Y/%m/%d",
        example: "2024/05/31",
    },
    DateFormatSpec {
        pattern: "%m/%d/%Y",
        example: "05/31/2024",
    },
];

/// Datetime formats without an offset. RFC 3339 is handled separately.
pub const DATETIME_FORMATS: &[DateFormatSpec] = &[
    DateFormatSpec {
        pattern: "%Y-%m-%d %H:%M:%S",
        example: "2024-05-31 13:45:00",
    },
    DateFormatSpec {
        pattern: "%Y-%m-%dT%H:%M:%S",
        example: "2024-05-31T13:45:00",
    },
    DateFormatSpec {
        pattern: "%Y-%m-%d %H:%M:%S%.f",
        example: "2024-05-31 13:45:00.250",
    },
    DateFormatSpec {
        pattern: "%Y-%m-%dT%H:%M:%S%.f",
        example: "2024-05-31T13:45:00.250",
    },
];

/// Parse a date-only string.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format.pattern).ok())
}

/// Parse a datetime string. RFC 3339 values are converted to UTC wall time.
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format.pattern).ok())
}

/// Calendar date of a date or datetime string.
pub fn parse_calendar_date(value: &str) -> Option<NaiveDate> {
    parse_date(value).or_else(|| parse_datetime(value).map(|dt| dt.date()))
}
