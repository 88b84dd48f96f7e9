//! This crate contains the shared attendance types and all fullstack server
//! functions.

pub mod attendance;
pub mod civil_time;
pub mod identity;
pub mod prefs;
#[cfg(not(target_arch = "wasm32"))]
pub mod reconciler;
#[cfg(not(target_arch = "wasm32"))]
mod reset_throttle;
#[cfg(not(target_arch = "wasm32"))]
pub mod store;
pub mod student;

use attendance::{Event, ScanType, ScanVerdict};
use dioxus::prelude::*;
use identity::ScannedIdentity;
use prefs::scanner_prefs::ScannerPrefs;
use student::StudentProfile;

pub type ApiError = anyhow::Error;

/// Scanner tuning, read from the server's environment.
#[post("/api/get_scanner_prefs")]
pub async fn get_scanner_prefs() -> Result<ScannerPrefs, ApiError> {
    Ok(ScannerPrefs::default())
}

/// Events a scanner may record attendance for, newest first.
#[post("/api/active_events")]
pub async fn active_events() -> Result<Vec<Event>, ApiError> {
    use store::AttendanceStore;

    let backend = store::Backend::shared().await;
    let events = backend.active_events().await.inspect_err(|e| {
        dioxus_logger::tracing::warn!("listing active events failed: {e}");
    })?;
    Ok(events)
}

/// Records an approved scan for `event_id`.
///
/// Duplicates and unknown students come back as a [`ScanVerdict`]; only store
/// failures are errors.
#[post("/api/record_scan")]
pub async fn record_scan(
    identity: ScannedIdentity,
    event_id: i64,
    scan_type: ScanType,
) -> Result<ScanVerdict, ApiError> {
    let backend = store::Backend::shared().await;
    let verdict = reconciler::Reconciler::new(backend)
        .verdict(&identity, event_id, scan_type)
        .await
        .inspect_err(|e| {
            dioxus_logger::tracing::warn!(
                event_id,
                student_number = identity.student_number(),
                "recording {scan_type} failed: {e}"
            );
        })?;

    if let ScanVerdict::StudentNotFound { student_number } = &verdict {
        dioxus_logger::tracing::info!(event_id, %student_number, "scanned student has no profile");
    }
    Ok(verdict)
}

/// Looks up the profile whose identity code a student displays.
#[post("/api/student_profile")]
pub async fn student_profile(student_number: String) -> Result<Option<StudentProfile>, ApiError> {
    use store::AttendanceStore;

    let student_number = student_number.trim();
    if student_number.is_empty() {
        return Ok(None);
    }
    let backend = store::Backend::shared().await;
    Ok(backend.profile_by_student_number(student_number).await?)
}

/// Emails a password reset link, at most once per address per cooldown.
#[post("/api/request_password_reset")]
pub async fn request_password_reset(email: String) -> Result<(), ApiError> {
    let email = email.trim();
    if !email.contains('@') {
        anyhow::bail!("enter a valid email address");
    }

    if let Err(wait) = reset_throttle::acquire(email).await {
        anyhow::bail!(
            "a reset link was sent recently; try again in {} seconds",
            wait.as_secs().max(1)
        );
    }

    let backend = store::Backend::shared().await;
    if let Err(e) = backend.send_password_reset(email).await {
        // Nothing was sent, so the address may retry right away.
        reset_throttle::release(email).await;
        dioxus_logger::tracing::warn!("password reset failed: {e}");
        return Err(e.into());
    }
    dioxus_logger::tracing::info!("password reset requested");
    Ok(())
}
