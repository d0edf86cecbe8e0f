//! Display formatting for timestamps and excerpts.
//!
//! Timestamps are stored as Unix seconds. The caller passes the site's
//! timezone offset in whole hours; nothing here reads configuration.

use chrono::{DateTime, FixedOffset, Offset, SecondsFormat, Utc};

/// Layout used by article and comment lists.
pub const LIST_TIME_LAYOUT: &str = "%Y-%m-%d %H:%M";

/// Number of characters kept in a feed description.
pub const FEED_EXCERPT_CHARS: usize = 150;

fn offset(tz_hours: i32) -> FixedOffset {
    tz_hours
        .checked_mul(3600)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix())
}

fn local_time(ts_secs: u64, tz_hours: i32) -> Option<DateTime<FixedOffset>> {
    let secs = i64::try_from(ts_secs).ok()?;
    DateTime::<Utc>::from_timestamp(secs, 0).map(|dt| dt.with_timezone(&offset(tz_hours)))
}

/// Formats `ts_secs` with a `strftime` layout in the given timezone.
///
/// Out-of-range timestamps and offsets outside ±23 hours fall back to an
/// empty string and UTC respectively.
pub fn format_time(ts_secs: u64, layout: &str, tz_hours: i32) -> String {
    local_time(ts_secs, tz_hours)
        .map(|dt| dt.format(layout).to_string())
        .unwrap_or_default()
}

/// Formats `ts_secs` as an RFC 3339 timestamp (feeds).
pub fn format_rfc3339(ts_secs: u64, tz_hours: i32) -> String {
    local_time(ts_secs, tz_hours)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

/// Formats `ts_secs` for list pages.
pub fn format_list_time(ts_secs: u64, tz_hours: i32) -> String {
    format_time(ts_secs, LIST_TIME_LAYOUT, tz_hours)
}

/// Returns the first `max_chars` characters of `text`.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}
