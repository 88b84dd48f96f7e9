use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDateTime;

use super::{AttendanceStore, StoreError};
use crate::attendance::{AttendanceRecord, Event, EventStatus, NewAttendance, ScanType};
use crate::civil_time;
use crate::student::StudentProfile;

#[derive(Default)]
struct Tables {
    profiles: Vec<StudentProfile>,
    events: Vec<Event>,
    attendance: Vec<AttendanceRecord>,
    next_id: i64,
}

/// An in-process store with the same uniqueness and conditional-update rules
/// as the hosted one.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// One open event and one student, so a server without a configured store
    /// can still walk through a whole scan.
    pub fn demo() -> Self {
        Self::new()
            .with_event(Event {
                id: 1,
                title: "Walk-in attendance".to_string(),
                status: EventStatus::Active,
                starts_at: Some(civil_time::regional_now()),
                ends_at: None,
            })
            .with_profile(StudentProfile {
                id: "demo".to_string(),
                student_id: "0000-0001".to_string(),
                first_name: "Demo".to_string(),
                last_name: "Student".to_string(),
                middle_initial: None,
                year_level: "1".to_string(),
                course: "Undeclared".to_string(),
                avatar_url: None,
            })
    }

    pub fn with_profile(mut self, profile: StudentProfile) -> Self {
        self.tables_mut().profiles.push(profile);
        self
    }

    pub fn with_event(mut self, event: Event) -> Self {
        self.tables_mut().events.push(event);
        self
    }

    /// A snapshot of every attendance row.
    pub fn attendance_rows(&self) -> Result<Vec<AttendanceRecord>, StoreError> {
        Ok(self.tables()?.attendance.clone())
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn tables_mut(&mut self) -> &mut Tables {
        self.tables.get_mut().unwrap_or_else(|e| e.into_inner())
    }
}

impl AttendanceStore for MemoryStore {
    async fn profile_by_student_number(
        &self,
        student_number: &str,
    ) -> Result<Option<StudentProfile>, StoreError> {
        Ok(self
            .tables()?
            .profiles
            .iter()
            .find(|p| p.student_id == student_number)
            .cloned())
    }

    async fn attendance_for(
        &self,
        event_id: i64,
        student_number: &str,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        Ok(self
            .tables()?
            .attendance
            .iter()
            .find(|r| r.event_id == event_id && r.student_id == student_number)
            .cloned())
    }

    async fn insert_attendance(&self, row: &NewAttendance) -> Result<AttendanceRecord, StoreError> {
        let mut tables = self.tables()?;
        if tables
            .attendance
            .iter()
            .any(|r| r.event_id == row.event_id && r.student_id == row.student_id)
        {
            return Err(StoreError::Conflict);
        }

        tables.next_id += 1;
        let record = AttendanceRecord {
            id: tables.next_id,
            event_id: row.event_id,
            student_id: row.student_id.clone(),
            first_name: row.first_name.clone(),
            last_name: row.last_name.clone(),
            middle_initial: row.middle_initial.clone(),
            course: row.course.clone(),
            year_level: row.year_level.clone(),
            time_in: row.time_in,
            time_out: row.time_out,
        };
        tables.attendance.push(record.clone());
        Ok(record)
    }

    async fn set_time_if_unset(
        &self,
        record_id: i64,
        scan_type: ScanType,
        at: NaiveDateTime,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let mut tables = self.tables()?;
        let Some(record) = tables.attendance.iter_mut().find(|r| r.id == record_id) else {
            return Ok(None);
        };

        let slot = match scan_type {
            ScanType::TimeIn => &mut record.time_in,
            ScanType::TimeOut => &mut record.time_out,
        };
        if slot.is_some() {
            return Ok(None);
        }
        *slot = Some(at);
        Ok(Some(record.clone()))
    }

    async fn active_events(&self) -> Result<Vec<Event>, StoreError> {
        let mut events: Vec<Event> = self
            .tables()?
            .events
            .iter()
            .filter(|e| e.status.is_active())
            .cloned()
            .collect();
        events.sort_by(|a, b| b.starts_at.cmp(&a.starts_at));
        Ok(events)
    }
}
