//! Issue time parsing and display.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Local date-time layouts accepted for `IssueTime`.
const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse an issue time as written in the source document.
///
/// Offsets are dropped: the wall-clock time printed on the invoice is the one
/// recorded by the issuer.
pub fn parse_issue_time(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }

    for format in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Format the issue date as `YYYY年MM月DD日`.
pub fn format_issue_date(issue_time: &NaiveDateTime) -> String {
    issue_time.format("%Y年%m月%d日").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_iso_local() {
        let dt = parse_issue_time("2024-03-05T09:30:15").unwrap();
        assert_eq!(dt.date(), date(2024, 3, 5));
        assert_eq!(dt.hour(), 9);
    }

    #[test]
    fn test_parse_with_offset_keeps_wall_clock() {
        let dt = parse_issue_time("2024-03-05T23:30:00+08:00").unwrap();
        assert_eq!(dt.date(), date(2024, 3, 5));
        assert_eq!(dt.hour(), 23);
    }

    #[test]
    fn test_parse_space_separated() {
        let dt = parse_issue_time("2023-12-31 18:00:00").unwrap();
        assert_eq!(dt.date(), date(2023, 12, 31));
    }

    #[test]
    fn test_parse_date_only() {
        let dt = parse_issue_time(" 2023-01-02 ").unwrap();
        assert_eq!(dt.date(), date(2023, 1, 2));
        assert_eq!(dt.hour(), 0);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_issue_time("").is_none());
        assert!(parse_issue_time("yesterday").is_none());
        assert!(parse_issue_time("2024-13-01").is_none());
    }

    #[test]
    fn test_format_issue_date_pads() {
        let dt = parse_issue_time("2024-03-05T09:30:15").unwrap();
        assert_eq!(format_issue_date(&dt), "2024年03月05日");
    }
}
