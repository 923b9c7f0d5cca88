//! Time helpers
//!
//! The store keeps every timestamp as `i64` Unix millis; conversion to the
//! business time zone happens only for display.

use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Millis → UTC datetime, `None` when out of range
pub fn millis_to_datetime(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}

/// Start of the current day (00:00:00) in `tz` as Unix millis
///
/// DST gap fallback: if local midnight does not exist, use UTC midnight.
pub fn start_of_day_millis(now: DateTime<Utc>, tz: Tz) -> i64 {
    let local_midnight = now.with_timezone(&tz).date_naive().and_time(NaiveTime::MIN);
    local_midnight
        .and_local_timezone(tz)
        .earliest()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| local_midnight.and_utc().timestamp_millis())
}

/// `3725` → `"1h 2m 5s"`; zero components are left out
pub fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let secs = seconds % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{}d", days));
    }
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    if secs > 0 || parts.is_empty() {
        parts.push(format!("{}s", secs));
    }
    parts.join(" ")
}
