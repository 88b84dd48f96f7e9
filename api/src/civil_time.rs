//! Regional civil time used for every attendance timestamp.
//!
//! Attendance is reported against one region's wall clock, so instants are
//! shifted by a fixed offset before they are written. The stored value
//! carries no zone information.

use chrono::{DateTime, NaiveDateTime, SubsecRound, TimeDelta, Utc};

/// Hours east of UTC for the reporting region.
pub const REGIONAL_OFFSET_HOURS: i64 = 8;

/// Converts an instant to the regional wall-clock time stored on attendance rows.
///
/// Sub-second precision is dropped so the value round-trips through the store
/// unchanged.
pub fn to_regional(instant: DateTime<Utc>) -> NaiveDateTime {
    instant.trunc_subsecs(0).naive_utc() + TimeDelta::hours(REGIONAL_OFFSET_HOURS)
}

/// The current regional wall-clock time.
pub fn regional_now() -> NaiveDateTime {
    to_regional(Utc::now())
}

/// Formats a stored timestamp for operators, e.g. "Mar 4, 2025 8:05 AM".
pub fn format_regional(time: &NaiveDateTime) -> String {
    time.format("%b %-d, %Y %-I:%M %p").to_string()
}
