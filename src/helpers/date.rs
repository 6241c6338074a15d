//! Date helper functions

use anyhow::{anyhow, Result};
use chrono::{Local, NaiveDate, NaiveDateTime};

/// Date format used in filenames and the `date` field
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Today's date on the local wall clock
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Format a date as `YYYY-MM-DD`
pub fn format_ymd(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a command-line date: `YYYY-MM-DD`, `today` or `yesterday`
///
/// # Examples
/// ```ignore
/// parse_date_arg("2026-01-01") // -> 2026-01-01
/// parse_date_arg("yesterday")  // -> today - 1
/// ```
pub fn parse_date_arg(s: &str) -> Result<NaiveDate> {
    resolve_date_arg(s, today())
}

/// Same as [`parse_date_arg`] with an explicit "today"
pub fn resolve_date_arg(s: &str, today: NaiveDate) -> Result<NaiveDate> {
    match s.trim() {
        "today" => Ok(today),
        "yesterday" => today
            .pred_opt()
            .ok_or_else(|| anyhow!("date out of range")),
        other => NaiveDate::parse_from_str(other, DATE_FORMAT)
            .map_err(|e| anyhow!("invalid date '{}' (expected YYYY-MM-DD): {}", other, e)),
    }
}

/// Parse a front-matter date in various formats, keeping only the day
pub fn parse_loose_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();

    let date_formats = ["%Y-%m-%d", "%Y/%m/%d"];
    for fmt in date_formats {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }

    let datetime_formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];
    for fmt in datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }

    chrono::DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.date_naive())
}
