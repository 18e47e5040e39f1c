//! Common utility functions

use chrono::{DateTime, NaiveDateTime, Utc};

/// Display format for timestamps
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const SECONDS_PER_DAY: i64 = 86_400;

/// Separator between group path components
pub const GROUP_SEPARATOR: char = '.';

/// Current time in seconds since the epoch
pub fn now_time() -> i64 {
    Utc::now().timestamp()
}

/// Format an epoch timestamp for display
pub fn format_time(t: i64) -> String {
    DateTime::<Utc>::from_timestamp(t, 0)
        .map(|dt| dt.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}

/// Parse a display timestamp back to epoch seconds
pub fn parse_time(s: &str) -> Option<i64> {
    NaiveDateTime::parse_from_str(s, DATE_FORMAT)
        .ok()
        .map(|ndt| ndt.and_utc().timestamp())
}

/// Start of the UTC day containing `t`
pub fn start_of_day(t: i64) -> i64 {
    t - t.rem_euclid(SECONDS_PER_DAY)
}

/// A group path and all of its ancestors, deepest first
///
/// `"a.b.c"` yields `["a.b.c", "a.b", "a"]`. An empty path yields nothing.
pub fn group_with_ancestors(path: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = path;
    while !current.is_empty() {
        out.push(current.to_string());
        current = match current.rfind(GROUP_SEPARATOR) {
            Some(pos) => &current[..pos],
            None => "",
        };
    }
    out
}

/// True if `group` equals `prefix` or lies beneath it
pub fn is_in_group(group: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return true;
    }
    group == prefix
        || (group.starts_with(prefix) && group[prefix.len()..].starts_with(GROUP_SEPARATOR))
}

/// Replace the leading `old` component chain of `group` with `new`
///
/// Returns `None` if `group` is not `old` or a descendant of it.
pub fn rebase_group(group: &str, old: &str, new: &str) -> Option<String> {
    if old.is_empty() || !is_in_group(group, old) {
        return None;
    }
    Some(format!("{}{}", new, &group[old.len()..]))
}
