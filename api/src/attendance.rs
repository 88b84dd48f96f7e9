//! Attendance rows, events and the verdict returned for a recorded scan.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::student::StudentProfile;

/// Which of the two attendance timestamps a scan records.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIs,
    strum::EnumIter,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ScanType {
    #[default]
    TimeIn,
    TimeOut,
}

impl ScanType {
    /// Human readable name, e.g. "Time in".
    pub fn label(&self) -> &'static str {
        match self {
            Self::TimeIn => "Time in",
            Self::TimeOut => "Time out",
        }
    }

    /// Name of the attendance column this scan type writes.
    pub fn column(&self) -> &'static str {
        self.into()
    }
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One attendance row per (event, student) pair.
///
/// Name, course and year are copied from the student's profile when the row is
/// created so historical records do not change when the profile does.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: i64,
    pub event_id: i64,
    pub student_id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub middle_initial: Option<String>,
    #[serde(default)]
    pub course: String,
    #[serde(default)]
    pub year_level: String,
    pub time_in: Option<NaiveDateTime>,
    pub time_out: Option<NaiveDateTime>,
}

impl AttendanceRecord {
    /// The timestamp stored for `scan_type`, if any.
    pub fn time_for(&self, scan_type: ScanType) -> Option<NaiveDateTime> {
        match scan_type {
            ScanType::TimeIn => self.time_in,
            ScanType::TimeOut => self.time_out,
        }
    }

    pub fn full_name(&self) -> String {
        full_name(&self.first_name, self.middle_initial.as_deref(), &self.last_name)
    }
}

/// An attendance row that has not been written yet. The store assigns `id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NewAttendance {
    pub event_id: i64,
    pub student_id: String,
    pub first_name: String,
    pub last_name: String,
    pub middle_initial: Option<String>,
    pub course: String,
    pub year_level: String,
    pub time_in: Option<NaiveDateTime>,
    pub time_out: Option<NaiveDateTime>,
}

impl NewAttendance {
    /// Builds the row for a student's first scan at an event. Only the column
    /// matching `scan_type` is set.
    pub fn first_scan(
        event_id: i64,
        profile: &StudentProfile,
        scan_type: ScanType,
        at: NaiveDateTime,
    ) -> Self {
        Self {
            event_id,
            student_id: profile.student_id.clone(),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            middle_initial: profile.middle_initial.clone(),
            course: profile.course.clone(),
            year_level: profile.year_level.clone(),
            time_in: scan_type.is_time_in().then_some(at),
            time_out: scan_type.is_time_out().then_some(at),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::EnumIs)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Active,
    Inactive,
}

/// An event attendance can be recorded against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub status: EventStatus,
    #[serde(default)]
    pub starts_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub ends_at: Option<NaiveDateTime>,
}

/// The outcome of recording one approved scan, as seen by the scanning client.
///
/// Duplicates and unknown students are expected outcomes and travel as values.
/// Only store failures are returned as errors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanVerdict {
    /// A timestamp was written. `created` is true when the row was new.
    Recorded {
        record: AttendanceRecord,
        created: bool,
    },
    /// The requested timestamp was already set. Nothing was written.
    Duplicate { record: AttendanceRecord },
    /// No profile exists for the scanned student number.
    StudentNotFound { student_number: String },
}

pub(crate) fn full_name(first: &str, middle_initial: Option<&str>, last: &str) -> String {
    let mut parts = Vec::with_capacity(3);
    for part in [Some(first), middle_initial, Some(last)].into_iter().flatten() {
        let part = part.trim();
        if !part.is_empty() {
            parts.push(part);
        }
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn profile() -> StudentProfile {
        StudentProfile {
            id: "u-1".to_string(),
            student_id: "2021-0001".to_string(),
            first_name: "Ana".to_string(),
            last_name: "Reyes".to_string(),
            middle_initial: Some("B".to_string()),
            year_level: "3".to_string(),
            course: "BSIT".to_string(),
            avatar_url: None,
        }
    }

    #[test]
    fn first_scan_sets_only_the_matching_column() {
        let at = NaiveDateTime::from_str("2025-03-04T08:00:00").unwrap();

        let row = NewAttendance::first_scan(7, &profile(), ScanType::TimeOut, at);
        assert_eq!(row.time_in, None);
        assert_eq!(row.time_out, Some(at));
        assert_eq!(row.course, "BSIT");
    }

    #[test]
    fn scan_type_maps_to_columns() {
        assert_eq!(ScanType::TimeIn.column(), "time_in");
        assert_eq!(ScanType::TimeOut.column(), "time_out");
        assert_eq!(ScanType::from_str("TIME_OUT").unwrap(), ScanType::TimeOut);
    }

    #[test]
    fn full_name_skips_blank_parts() {
        assert_eq!(full_name("Ana", Some(" "), "Reyes"), "Ana Reyes");
        assert_eq!(full_name("Ana", Some("B."), "Reyes"), "Ana B. Reyes");
    }
}
