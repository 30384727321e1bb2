//! Date strings for the meter-installation schema.
//!
//! Every date-like column of the field record table is a plain string in the
//! form `YYYY-MM-DD HH:mm:ss.mmm` (local time). The downstream database that
//! consumes these rows compares them lexically, so the format must never
//! drift.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// `strftime` pattern of the external date format.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Naive layouts accepted from clients, interpreted as local time.
const NAIVE_LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// Format any timestamp in the external format, converted to local time.
pub fn format_date<Tz: TimeZone>(dt: &DateTime<Tz>) -> String {
    dt.with_timezone(&Local).format(DATE_FORMAT).to_string()
}

/// The current local time in the external format.
pub fn now_formatted() -> String {
    format_date(&Local::now())
}

/// The `YYYY-MM-DD` prefix of today's local date.
pub fn today_prefix() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Parse a client-supplied date.
///
/// Accepts RFC 3339 timestamps, the external format itself (with or without
/// milliseconds, `T` or space separated) and bare `YYYY-MM-DD` dates, which
/// are taken as UTC midnight.
pub fn parse_date(input: &str) -> Option<DateTime<Local>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Local));
    }

    for layout in NAIVE_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, layout) {
            return Local.from_local_datetime(&naive).earliest();
        }
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive).with_timezone(&Local))
}

/// Normalize an optional client date to the external format.
///
/// Missing or unparseable input yields the current time rather than an
/// error. Field clients routinely send junk here and the record must still
/// be accepted.
pub fn normalize_date(input: Option<&str>) -> String {
    let dt = input.and_then(parse_date).unwrap_or_else(Local::now);
    format_date(&dt)
}
