//! Decides whether an approved scan inserts a row, fills in a timestamp or is
//! rejected as a duplicate.
//!
//! Each timestamp on an attendance row is written at most once. The pre-check
//! alone cannot guarantee that when two scanners see the same student, so
//! writes are conditional: inserts rely on the (event, student) uniqueness
//! constraint and updates only apply while the column is still null. Losing
//! either race is reported as a duplicate.

use chrono::{DateTime, NaiveDateTime, Utc};
use dioxus_logger::tracing::{debug, info};
use thiserror::Error;

use crate::attendance::{AttendanceRecord, NewAttendance, ScanType, ScanVerdict};
use crate::civil_time;
use crate::identity::ScannedIdentity;
use crate::store::{AttendanceStore, StoreError};

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("no student profile found for student number {0:?}")]
    StudentProfileNotFound(String),
    #[error("{scan_type} is already recorded for student {}", existing.student_id)]
    DuplicateScan {
        scan_type: ScanType,
        existing: Box<AttendanceRecord>,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A successful write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Recorded {
    Created(AttendanceRecord),
    Updated(AttendanceRecord),
}

impl Recorded {
    pub fn record(&self) -> &AttendanceRecord {
        match self {
            Self::Created(r) | Self::Updated(r) => r,
        }
    }

    pub fn into_record(self) -> AttendanceRecord {
        match self {
            Self::Created(r) | Self::Updated(r) => r,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

pub struct Reconciler<'a, S> {
    store: &'a S,
    clock: fn() -> DateTime<Utc>,
}

impl<'a, S: AttendanceStore> Reconciler<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            clock: Utc::now,
        }
    }

    /// Replaces the wall clock, for deterministic timestamps.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Records `scan_type` for the scanned student at `event_id`.
    ///
    /// Performs at most one insert or one single-column update.
    pub async fn reconcile(
        &self,
        identity: &ScannedIdentity,
        event_id: i64,
        scan_type: ScanType,
    ) -> Result<Recorded, ReconcileError> {
        let student_number = identity.student_number().trim();
        if student_number.is_empty() {
            return Err(ReconcileError::StudentProfileNotFound(String::new()));
        }

        // Stored name and course always come from the profile, never the code.
        let profile = self
            .store
            .profile_by_student_number(student_number)
            .await?
            .ok_or_else(|| ReconcileError::StudentProfileNotFound(student_number.to_string()))?;

        let at = civil_time::to_regional((self.clock)());

        let record = match self.store.attendance_for(event_id, student_number).await? {
            Some(record) => record,
            None => {
                let row = NewAttendance::first_scan(event_id, &profile, scan_type, at);
                match self.store.insert_attendance(&row).await {
                    Ok(record) => {
                        info!(event_id, student_number, %scan_type, "attendance created");
                        return Ok(Recorded::Created(record));
                    }
                    Err(StoreError::Conflict) => {
                        debug!(event_id, student_number, "row inserted concurrently; retrying as update");
                        self.store
                            .attendance_for(event_id, student_number)
                            .await?
                            .ok_or(StoreError::Conflict)?
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };

        self.fill(record, scan_type, at).await
    }

    /// Like [`Self::reconcile`], with expected outcomes folded into a
    /// [`ScanVerdict`]. Only store failures remain errors.
    pub async fn verdict(
        &self,
        identity: &ScannedIdentity,
        event_id: i64,
        scan_type: ScanType,
    ) -> Result<ScanVerdict, StoreError> {
        match self.reconcile(identity, event_id, scan_type).await {
            Ok(recorded) => Ok(ScanVerdict::Recorded {
                created: recorded.is_created(),
                record: recorded.into_record(),
            }),
            Err(ReconcileError::DuplicateScan { existing, .. }) => {
                Ok(ScanVerdict::Duplicate { record: *existing })
            }
            Err(ReconcileError::StudentProfileNotFound(student_number)) => {
                Ok(ScanVerdict::StudentNotFound { student_number })
            }
            Err(ReconcileError::Store(e)) => Err(e),
        }
    }

    async fn fill(
        &self,
        record: AttendanceRecord,
        scan_type: ScanType,
        at: NaiveDateTime,
    ) -> Result<Recorded, ReconcileError> {
        if record.time_for(scan_type).is_some() {
            return Err(duplicate(scan_type, record));
        }

        match self.store.set_time_if_unset(record.id, scan_type, at).await? {
            Some(updated) => {
                info!(event_id = updated.event_id, student_id = %updated.student_id, %scan_type, "attendance updated");
                Ok(Recorded::Updated(updated))
            }
            None => {
                // Another scanner filled the column between our read and write.
                let current = self
                    .store
                    .attendance_for(record.event_id, &record.student_id)
                    .await?
                    .unwrap_or(record);
                Err(duplicate(scan_type, current))
            }
        }
    }
}

fn duplicate(scan_type: ScanType, existing: AttendanceRecord) -> ReconcileError {
    ReconcileError::DuplicateScan {
        scan_type,
        existing: Box::new(existing),
    }
}
