//! Calendar-day parsing
//!
//! Closing periods and gated records compare on whole days. Clients send
//! either `YYYY-MM-DD` or a full timestamp; timestamps are truncated to the
//! calendar day in the offset they were written with.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DAY_FORMAT: &str = "%Y-%m-%d";

/// Parse a calendar day from a date or timestamp string
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(day) = NaiveDate::parse_from_str(raw, DAY_FORMAT) {
        return Some(day);
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.date_naive());
    }

    // Naive timestamps like "2025-01-15T08:30:00" from HTML datetime inputs
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .ok()
        .map(|ts| ts.date())
}

/// Format a day as `YYYY-MM-DD`
pub fn format_day(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_plain_date() {
        assert_eq!(parse_day("2025-01-15"), Some(day(2025, 1, 15)));
        assert_eq!(parse_day(" 2025-01-15 "), Some(day(2025, 1, 15)));
    }

    #[test]
    fn test_parse_timestamps() {
        assert_eq!(parse_day("2025-01-31T23:59:59Z"), Some(day(2025, 1, 31)));
        assert_eq!(parse_day("2025-02-01T06:00:00+07:00"), Some(day(2025, 2, 1)));
        assert_eq!(parse_day("2025-01-15T08:30"), Some(day(2025, 1, 15)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_day(""), None);
        assert_eq!(parse_day("15/01/2025"), None);
        assert_eq!(parse_day("2025-13-01"), None);
    }

    #[test]
    fn test_format_day() {
        assert_eq!(format_day(day(2025, 3, 7)), "2025-03-07");
    }
}
