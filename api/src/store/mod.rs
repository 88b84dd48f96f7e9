//! Access to the hosted relational store.
//!
//! [`AttendanceStore`] is the only surface the scanning workflow needs. The
//! server talks to the hosted Postgres REST endpoint through
//! [`PostgrestStore`]. [`MemoryStore`] enforces the same row rules in process
//! and stands in when no store is configured.

mod memory;
mod postgrest;

pub use memory::MemoryStore;
pub use postgrest::PostgrestStore;

use chrono::NaiveDateTime;
use dioxus_logger::tracing::{info, warn};
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::attendance::{AttendanceRecord, Event, NewAttendance, ScanType};
use crate::prefs::store_config::StoreConfig;
use crate::student::StudentProfile;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("store rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("a conflicting row already exists")]
    Conflict,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// The queries and writes the scanning workflow performs.
#[allow(async_fn_in_trait)]
pub trait AttendanceStore {
    /// Looks up a profile by student number.
    async fn profile_by_student_number(
        &self,
        student_number: &str,
    ) -> Result<Option<StudentProfile>, StoreError>;

    /// Looks up the attendance row for an (event, student number) pair.
    async fn attendance_for(
        &self,
        event_id: i64,
        student_number: &str,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    /// Inserts a row. Fails with [`StoreError::Conflict`] if the pair already
    /// has one.
    async fn insert_attendance(&self, row: &NewAttendance) -> Result<AttendanceRecord, StoreError>;

    /// Sets one timestamp column, but only while it is still null.
    ///
    /// Returns `None` when the column was already set and nothing was written.
    async fn set_time_if_unset(
        &self,
        record_id: i64,
        scan_type: ScanType,
        at: NaiveDateTime,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    /// Active events, newest first.
    async fn active_events(&self) -> Result<Vec<Event>, StoreError>;
}

/// The store a server process talks to.
pub enum Backend {
    Remote(PostgrestStore),
    Memory(MemoryStore),
}

impl Backend {
    pub fn from_config(config: Option<StoreConfig>) -> Self {
        match config {
            Some(config) => {
                info!(url = %config.url, "using hosted store");
                Self::Remote(PostgrestStore::new(config))
            }
            None => {
                warn!("ACETRACK_STORE_URL/ACETRACK_STORE_KEY not set; using an in-memory demo store");
                Self::Memory(MemoryStore::demo())
            }
        }
    }

    /// The process-wide backend, configured from the environment on first use.
    pub async fn shared() -> &'static Backend {
        static BACKEND: OnceCell<Backend> = OnceCell::const_new();
        BACKEND
            .get_or_init(|| async { Self::from_config(StoreConfig::from_env()) })
            .await
    }

    /// Asks the auth provider to email a password reset link.
    pub async fn send_password_reset(&self, email: &str) -> Result<(), StoreError> {
        match self {
            Self::Remote(store) => store.send_password_reset(email).await,
            Self::Memory(_) => {
                info!("no auth provider configured; skipping reset email");
                Ok(())
            }
        }
    }
}

impl AttendanceStore for Backend {
    async fn profile_by_student_number(
        &self,
        student_number: &str,
    ) -> Result<Option<StudentProfile>, StoreError> {
        match self {
            Self::Remote(s) => s.profile_by_student_number(student_number).await,
            Self::Memory(s) => s.profile_by_student_number(student_number).await,
        }
    }

    async fn attendance_for(
        &self,
        event_id: i64,
        student_number: &str,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        match self {
            Self::Remote(s) => s.attendance_for(event_id, student_number).await,
            Self::Memory(s) => s.attendance_for(event_id, student_number).await,
        }
    }

    async fn insert_attendance(&self, row: &NewAttendance) -> Result<AttendanceRecord, StoreError> {
        match self {
            Self::Remote(s) => s.insert_attendance(row).await,
            Self::Memory(s) => s.insert_attendance(row).await,
        }
    }

    async fn set_time_if_unset(
        &self,
        record_id: i64,
        scan_type: ScanType,
        at: NaiveDateTime,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        match self {
            Self::Remote(s) => s.set_time_if_unset(record_id, scan_type, at).await,
            Self::Memory(s) => s.set_time_if_unset(record_id, scan_type, at).await,
        }
    }

    async fn active_events(&self) -> Result<Vec<Event>, StoreError> {
        match self {
            Self::Remote(s) => s.active_events().await,
            Self::Memory(s) => s.active_events().await,
        }
    }
}
