//! Playback duration helpers
//!
//! Parses the short duration strings users type for scheduled playback
//! (`30s`, `5m`, `6h`, `1d`, `1w`) and renders the playback service's
//! "time left" answers for humans.

use regex::Regex;
use std::sync::LazyLock;

static RE_DURATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)([smhdw])").expect("valid duration pattern"));

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;

/// Parses a duration such as `"90m"` into seconds
///
/// Only the leading `<digits><unit>` is read, so `"5m30s"` is 300 seconds.
/// Returns `None` for anything else, or if the value overflows.
///
/// # Examples
///
/// ```
/// use streamer_catalog::parse_duration;
///
/// assert_eq!(parse_duration("6h"), Some(21_600));
/// assert_eq!(parse_duration("soon"), None);
/// ```
pub fn parse_duration(input: &str) -> Option<u64> {
    let caps = RE_DURATION.captures(input)?;
    let value: u64 = caps[1].parse().ok()?;

    let unit = match &caps[2] {
        "s" => 1,
        "m" => MINUTE,
        "h" => HOUR,
        "d" => DAY,
        "w" => WEEK,
        _ => return None,
    };

    value.checked_mul(unit)
}

/// Formats a number of seconds as e.g. `"2 hours, 5 minutes, and 0 seconds"`
///
/// Leading zero units are left out; seconds are always present.
pub fn format_time_left(seconds: u64) -> String {
    let days = seconds / DAY;
    let hours = (seconds % DAY) / HOUR;
    let minutes = (seconds % HOUR) / MINUTE;
    let secs = seconds % MINUTE;

    if days > 0 {
        format!("{days} days, {hours} hours, {minutes} minutes, and {secs} seconds")
    } else if hours > 0 {
        format!("{hours} hours, {minutes} minutes, and {secs} seconds")
    } else if minutes > 0 {
        format!("{minutes} minutes and {secs} seconds")
    } else {
        format!("{secs} seconds")
    }
}

/// Reads the seconds out of a time-left message like `"Time left: 93.5"`
///
/// The last space-separated token is parsed as a float and truncated.
/// Negative or non-numeric values yield `None`.
pub fn parse_time_left_message(message: &str) -> Option<u64> {
    let value: f64 = message.split(' ').next_back()?.parse().ok()?;
    if value.is_finite() && value >= 0.0 {
        Some(value as u64)
    } else {
        None
    }
}
