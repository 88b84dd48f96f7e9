//! The scan session state machine.
//!
//! [`ScanSession`] performs no I/O. Every transition returns the [`Effect`]s
//! the driver must carry out, which keeps the whole
//! detect → confirm → record → restart cycle testable without a camera.

use api::attendance::{AttendanceRecord, ScanType, ScanVerdict};
use api::civil_time;
use api::identity::ScannedIdentity;
use chrono::{DateTime, Utc};
use thiserror::Error;

use super::capture::CameraError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::EnumIs)]
pub enum Phase {
    #[default]
    Idle,
    /// Camera running and frames being decoded.
    Capturing,
    /// A code was read and capture has stopped. Transient.
    Detected,
    /// Waiting for the operator to approve the identity.
    Confirming,
    /// The attendance write is in flight.
    Recording,
    /// Waiting for a manual restart.
    Error,
}

/// The single message shown to the operator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    Status(String),
    Error(String),
    Success(String),
    Duplicate {
        record: AttendanceRecord,
        scan_type: ScanType,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    StartCapture,
    StopCapture,
    PlayCue,
    Record {
        identity: ScannedIdentity,
        event_id: i64,
        scan_type: ScanType,
    },
    /// Call [`ScanSession::restart_due`] with this token after the restart
    /// delay.
    RestartAfterDelay(u64),
}

#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionError {
    #[error("Please select an event before scanning.")]
    NoEventSelected,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScanSession {
    event_id: Option<i64>,
    scan_type: ScanType,
    phase: Phase,
    pending: Option<ScannedIdentity>,
    recording: Option<ScanType>,
    notice: Option<Notice>,
    restart_token: u64,
}

impl ScanSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// The identity awaiting approval.
    pub fn pending(&self) -> Option<&ScannedIdentity> {
        self.pending.as_ref()
    }

    pub fn event_id(&self) -> Option<i64> {
        self.event_id
    }

    pub fn scan_type(&self) -> ScanType {
        self.scan_type
    }

    pub fn select_event(&mut self, event_id: Option<i64>) -> Vec<Effect> {
        if self.event_id == event_id {
            return Vec::new();
        }
        self.event_id = event_id;
        self.abandon_scan()
    }

    pub fn set_scan_type(&mut self, scan_type: ScanType) -> Vec<Effect> {
        if self.scan_type == scan_type {
            return Vec::new();
        }
        self.scan_type = scan_type;
        self.abandon_scan()
    }

    /// A selection changed. Capture, any unapproved identity and the last
    /// outcome belong to the old selection. A write already in flight is left
    /// alone.
    fn abandon_scan(&mut self) -> Vec<Effect> {
        match self.phase {
            Phase::Capturing | Phase::Detected | Phase::Confirming => {
                self.phase = Phase::Idle;
                self.pending = None;
                self.notice = Some(Notice::Status(
                    "Selection changed. Start scanning again.".to_string(),
                ));
                vec![Effect::StopCapture]
            }
            Phase::Idle | Phase::Error => {
                self.phase = Phase::Idle;
                self.notice = None;
                Vec::new()
            }
            Phase::Recording => Vec::new(),
        }
    }

    pub fn start(&mut self) -> Result<Vec<Effect>, SessionError> {
        if self.event_id.is_none() {
            self.notice = Some(Notice::Error(SessionError::NoEventSelected.to_string()));
            return Err(SessionError::NoEventSelected);
        }
        if self.phase.is_recording() {
            return Ok(Vec::new());
        }
        self.phase = Phase::Capturing;
        self.pending = None;
        self.notice = Some(Notice::Status("Starting camera…".to_string()));
        Ok(vec![Effect::StartCapture])
    }

    pub fn capture_started(&mut self) -> Vec<Effect> {
        if !self.phase.is_capturing() {
            // Stopped while the camera was still opening.
            return vec![Effect::StopCapture];
        }
        self.notice = Some(Notice::Status("Scanning…".to_string()));
        Vec::new()
    }

    pub fn capture_failed(&mut self, err: &CameraError) -> Vec<Effect> {
        if self.phase.is_capturing() {
            self.phase = Phase::Error;
            self.notice = Some(Notice::Error(err.to_string()));
        }
        Vec::new()
    }

    /// A code was decoded. Capture stops before the payload is looked at.
    pub fn qr_detected(&mut self, raw: &str, captured_at: DateTime<Utc>) -> Vec<Effect> {
        if !self.phase.is_capturing() {
            return Vec::new();
        }
        self.phase = Phase::Detected;
        let effects = vec![Effect::StopCapture, Effect::PlayCue];

        match ScannedIdentity::from_payload(raw, captured_at) {
            Ok(identity) => {
                self.phase = Phase::Confirming;
                self.pending = Some(identity);
                self.notice = Some(Notice::Status("QR Detected!".to_string()));
            }
            Err(e) => {
                self.phase = Phase::Error;
                self.notice = Some(Notice::Error(e.to_string()));
            }
        }
        effects
    }

    pub fn approve(&mut self) -> Vec<Effect> {
        let (Phase::Confirming, Some(event_id)) = (self.phase, self.event_id) else {
            return Vec::new();
        };
        let Some(identity) = self.pending.take() else {
            return Vec::new();
        };
        self.phase = Phase::Recording;
        self.recording = Some(self.scan_type);
        self.notice = Some(Notice::Status("Recording attendance…".to_string()));
        vec![Effect::Record {
            identity,
            event_id,
            scan_type: self.scan_type,
        }]
    }

    /// Drops the pending identity or clears an error. No restart follows.
    pub fn cancel(&mut self) -> Vec<Effect> {
        if matches!(self.phase, Phase::Confirming | Phase::Error) {
            self.phase = Phase::Idle;
            self.pending = None;
            self.notice = None;
        }
        Vec::new()
    }

    /// Applies the outcome of a [`Effect::Record`].
    ///
    /// `Err` carries a failure description for logging only; the operator sees
    /// a generic message.
    pub fn record_finished(&mut self, outcome: Result<ScanVerdict, String>) -> Vec<Effect> {
        if !self.phase.is_recording() {
            return Vec::new();
        }
        let scan_type = self.recording.take().unwrap_or(self.scan_type);
        self.phase = Phase::Idle;

        match outcome {
            Ok(ScanVerdict::Recorded { record, .. }) => {
                self.notice = Some(Notice::Success(success_message(&record, scan_type)));
                self.restart_token += 1;
                vec![Effect::RestartAfterDelay(self.restart_token)]
            }
            Ok(ScanVerdict::Duplicate { record }) => {
                self.notice = Some(Notice::Duplicate { record, scan_type });
                Vec::new()
            }
            Ok(ScanVerdict::StudentNotFound { student_number }) => {
                self.notice = Some(Notice::Error(format!(
                    "No student profile found for student number {student_number}."
                )));
                Vec::new()
            }
            Err(_) => {
                self.notice = Some(Notice::Error(
                    "Failed to record attendance. Please try again.".to_string(),
                ));
                Vec::new()
            }
        }
    }

    /// The "scan another" action on the duplicate notice.
    pub fn scan_another(&mut self) -> Result<Vec<Effect>, SessionError> {
        self.start()
    }

    /// Resumes scanning after a success, unless anything happened since.
    pub fn restart_due(&mut self, token: u64) -> Vec<Effect> {
        let untouched = token == self.restart_token
            && self.phase.is_idle()
            && matches!(self.notice, Some(Notice::Success(_)));
        if !untouched {
            return Vec::new();
        }
        self.start().unwrap_or_default()
    }

    /// Stops capture. A write in flight still completes.
    pub fn stop(&mut self) -> Vec<Effect> {
        if !self.phase.is_recording() {
            self.phase = Phase::Idle;
            self.pending = None;
            self.notice = None;
        }
        vec![Effect::StopCapture]
    }
}

fn success_message(record: &AttendanceRecord, scan_type: ScanType) -> String {
    match record.time_for(scan_type) {
        Some(at) => format!(
            "{scan_type} recorded for {} ({}).",
            record.full_name(),
            civil_time::format_regional(&at)
        ),
        None => format!("{scan_type} recorded for {}.", record.full_name()),
    }
}
