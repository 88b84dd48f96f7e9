//! Runs a [`ScanSession`] against a real capture loop and recorder.

use std::collections::VecDeque;
use std::pin::pin;

use api::attendance::{ScanType, ScanVerdict};
use api::identity::ScannedIdentity;
use chrono::Utc;
use dioxus_logger::tracing::{debug, warn};
use futures::channel::mpsc::UnboundedReceiver;
use futures::future::{self, Either};
use futures::{FutureExt, StreamExt};

use super::capture::{Camera, CaptureLoop, Facing, Tick};
use super::decoder::FrameDecoder;
use super::session::{Effect, ScanSession};
use crate::compat;

/// Operator input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScanAction {
    Start,
    Stop,
    Approve,
    Cancel,
    ScanAnother,
    SelectEvent(Option<i64>),
    SetScanType(ScanType),
}

/// Persists an approved scan.
#[allow(async_fn_in_trait)]
pub trait Recorder {
    async fn record(
        &self,
        identity: &ScannedIdentity,
        event_id: i64,
        scan_type: ScanType,
    ) -> Result<ScanVerdict, String>;
}

/// Records through the `record_scan` server function.
pub struct ApiRecorder;

impl Recorder for ApiRecorder {
    async fn record(
        &self,
        identity: &ScannedIdentity,
        event_id: i64,
        scan_type: ScanType,
    ) -> Result<ScanVerdict, String> {
        api::record_scan(identity.clone(), event_id, scan_type)
            .await
            .map_err(|e| e.to_string())
    }
}

pub struct ScanDriver<C, D, R> {
    session: ScanSession,
    capture: CaptureLoop<C, D>,
    recorder: R,
    facing: Facing,
    restart: Option<u64>,
}

impl<C: Camera, D: FrameDecoder, R: Recorder> ScanDriver<C, D, R> {
    pub fn new(capture: CaptureLoop<C, D>, recorder: R) -> Self {
        Self {
            session: ScanSession::new(),
            capture,
            recorder,
            facing: Facing::Environment,
            restart: None,
        }
    }

    pub fn session(&self) -> &ScanSession {
        &self.session
    }

    pub fn capture(&self) -> &CaptureLoop<C, D> {
        &self.capture
    }

    /// Processes actions until the sender side is dropped, calling `publish`
    /// whenever the session changes. Capture is stopped on exit.
    ///
    /// Transitions are published before their effects run, so the operator
    /// sees states like `Recording` while the write is in flight.
    pub async fn run(
        mut self,
        mut actions: UnboundedReceiver<ScanAction>,
        mut publish: impl FnMut(&ScanSession),
    ) {
        let mut shown: Option<ScanSession> = None;
        let mut notify = |session: &ScanSession| {
            if shown.as_ref() != Some(session) {
                shown = Some(session.clone());
                publish(session);
            }
        };
        notify(&self.session);
        while self.step(&mut actions, &mut notify).await {}
        self.capture.stop();
    }

    /// Does one unit of work: an action, a capture tick or a due restart.
    ///
    /// Returns false once `actions` is closed.
    pub async fn step(
        &mut self,
        actions: &mut UnboundedReceiver<ScanAction>,
        notify: &mut impl FnMut(&ScanSession),
    ) -> bool {
        if self.capture.is_running() {
            match actions.next().now_or_never() {
                Some(Some(action)) => self.handle(action, notify).await,
                Some(None) => return false,
                None => self.pump(notify).await,
            }
            return true;
        }

        if self.restart.is_some() {
            let delay = pin!(compat::sleep(self.capture.prefs().restart_delay()));
            match future::select(delay, actions.next()).await {
                Either::Left(((), _)) => self.fire_restart(notify).await,
                Either::Right((Some(action), _)) => self.handle(action, notify).await,
                Either::Right((None, _)) => return false,
            }
            return true;
        }

        match actions.next().await {
            Some(action) => {
                self.handle(action, notify).await;
                true
            }
            None => false,
        }
    }

    /// Applies one operator action. An action that changes the session
    /// cancels a pending restart; a no-op click does not.
    pub async fn handle(&mut self, action: ScanAction, notify: &mut impl FnMut(&ScanSession)) {
        let before = self.session.clone();
        let effects = match action {
            ScanAction::Start => self.session.start().unwrap_or_else(|e| {
                debug!("scan not started: {e}");
                Vec::new()
            }),
            ScanAction::ScanAnother => self.session.scan_another().unwrap_or_else(|e| {
                debug!("scan not started: {e}");
                Vec::new()
            }),
            ScanAction::Stop => self.session.stop(),
            ScanAction::Approve => self.session.approve(),
            ScanAction::Cancel => self.session.cancel(),
            ScanAction::SelectEvent(event_id) => self.session.select_event(event_id),
            ScanAction::SetScanType(scan_type) => self.session.set_scan_type(scan_type),
        };
        if self.session != before {
            self.restart = None;
        }
        self.apply(effects, notify).await;
    }

    /// Runs one capture tick and waits until the next one is due.
    async fn pump(&mut self, notify: &mut impl FnMut(&ScanSession)) {
        match self.capture.tick() {
            Tick::Stopped => {}
            Tick::NotReady => compat::sleep(self.capture.prefs().warmup_retry()).await,
            Tick::Skipped | Tick::Nothing => compat::next_animation_frame().await,
            Tick::Hit(text) => {
                let effects = self.session.qr_detected(&text, Utc::now());
                self.apply(effects, notify).await;
            }
        }
    }

    async fn fire_restart(&mut self, notify: &mut impl FnMut(&ScanSession)) {
        if let Some(token) = self.restart.take() {
            let effects = self.session.restart_due(token);
            self.apply(effects, notify).await;
        }
    }

    /// Carries out `effects`, notifying before each one so slow effects never
    /// hide the transition that caused them.
    async fn apply(&mut self, effects: Vec<Effect>, notify: &mut impl FnMut(&ScanSession)) {
        let mut queue = VecDeque::from(effects);
        notify(&self.session);
        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::StartCapture => match self.capture.start(self.facing).await {
                    Ok(()) => queue.extend(self.session.capture_started()),
                    Err(e) => queue.extend(self.session.capture_failed(&e)),
                },
                Effect::StopCapture => self.capture.stop(),
                Effect::PlayCue => compat::play_cue(&self.capture.prefs().cue_url),
                Effect::Record {
                    identity,
                    event_id,
                    scan_type,
                } => {
                    let outcome = self.recorder.record(&identity, event_id, scan_type).await;
                    if let Err(e) = &outcome {
                        warn!(event_id, student_number = identity.student_number(), "recording scan failed: {e}");
                    }
                    queue.extend(self.session.record_finished(outcome));
                }
                Effect::RestartAfterDelay(token) => self.restart = Some(token),
            }
            notify(&self.session);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use api::prefs::scanner_prefs::ScannerPrefs;
    use api::reconciler::Reconciler;
    use api::store::MemoryStore;
    use api::student::StudentProfile;
    use futures::channel::mpsc;

    use super::*;
    use crate::scanner::capture::tests::{blank_frame, AlwaysFinds, FakeCamera};
    use crate::scanner::capture::CameraError;
    use crate::scanner::decoder::tests::qr_frame;
    use crate::scanner::decoder::QrDecoder;
    use crate::scanner::session::{Notice, Phase};

    const PAYLOAD: &str = r#"{"student_id":"2021-0001","first_name":"Ana","last_name":"Reyes"}"#;

    /// Records through a [`Reconciler`] over an in-memory store.
    struct StoreRecorder {
        store: MemoryStore,
    }

    impl StoreRecorder {
        fn new() -> Self {
            Self {
                store: MemoryStore::new().with_profile(StudentProfile {
                    id: "uuid-1".to_string(),
                    student_id: "2021-0001".to_string(),
                    first_name: "Ana".to_string(),
                    last_name: "Reyes".to_string(),
                    middle_initial: None,
                    year_level: "3".to_string(),
                    course: "BSIT".to_string(),
                    avatar_url: None,
                }),
            }
        }
    }

    impl Recorder for StoreRecorder {
        async fn record(
            &self,
            identity: &ScannedIdentity,
            event_id: i64,
            scan_type: ScanType,
        ) -> Result<ScanVerdict, String> {
            Reconciler::new(&self.store)
                .verdict(identity, event_id, scan_type)
                .await
                .map_err(|e| e.to_string())
        }
    }

    /// Replays canned outcomes.
    struct ScriptedRecorder(RefCell<VecDeque<Result<ScanVerdict, String>>>);

    impl Recorder for ScriptedRecorder {
        async fn record(&self, _: &ScannedIdentity, _: i64, _: ScanType) -> Result<ScanVerdict, String> {
            self.0
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err("no scripted outcome".to_string()))
        }
    }

    fn quiet(_: &ScanSession) {}

    fn fast_prefs() -> ScannerPrefs {
        ScannerPrefs {
            restart_delay_ms: 10,
            warmup_retry_ms: 1,
            ..ScannerPrefs::builtin()
        }
    }

    fn qr_camera() -> FakeCamera {
        FakeCamera {
            frame: Some(qr_frame(PAYLOAD)),
            ..Default::default()
        }
    }

    async fn pump_until_phase<C: Camera, D: FrameDecoder, R: Recorder>(
        driver: &mut ScanDriver<C, D, R>,
        actions: &mut UnboundedReceiver<ScanAction>,
        phase: Phase,
    ) {
        for _ in 0..100 {
            if driver.session().phase() == phase {
                return;
            }
            assert!(driver.step(actions, &mut quiet).await);
        }
        panic!("never reached {phase:?}, stuck in {:?}", driver.session().phase());
    }

    #[tokio::test]
    async fn scan_approve_record_and_restart() {
        let (tx, mut rx) = mpsc::unbounded();
        let capture = CaptureLoop::new(qr_camera(), QrDecoder, fast_prefs());
        let mut driver = ScanDriver::new(capture, StoreRecorder::new());

        driver.handle(ScanAction::SelectEvent(Some(3)), &mut quiet).await;
        driver.handle(ScanAction::Start, &mut quiet).await;
        assert!(driver.capture().is_running());

        pump_until_phase(&mut driver, &mut rx, Phase::Confirming).await;
        assert!(!driver.capture().camera().is_open());

        tx.unbounded_send(ScanAction::Approve).unwrap();
        assert!(driver.step(&mut rx, &mut quiet).await);
        assert!(driver.session().phase().is_idle());
        assert!(matches!(driver.session().notice(), Some(Notice::Success(_))));
        assert_eq!(driver.recorder.store.attendance_rows().unwrap().len(), 1);

        // No action arrives, so the delayed restart fires.
        assert!(driver.step(&mut rx, &mut quiet).await);
        assert!(driver.capture().is_running());
        assert!(driver.session().phase().is_capturing());
    }

    #[tokio::test]
    async fn second_time_in_shows_duplicate() {
        let (tx, mut rx) = mpsc::unbounded();
        let capture = CaptureLoop::new(qr_camera(), QrDecoder, fast_prefs());
        let mut driver = ScanDriver::new(capture, StoreRecorder::new());
        driver.handle(ScanAction::SelectEvent(Some(3)), &mut quiet).await;

        for _ in 0..2 {
            driver.handle(ScanAction::Start, &mut quiet).await;
            pump_until_phase(&mut driver, &mut rx, Phase::Confirming).await;
            tx.unbounded_send(ScanAction::Approve).unwrap();
            assert!(driver.step(&mut rx, &mut quiet).await);
        }

        match driver.session().notice() {
            Some(Notice::Duplicate { record, scan_type }) => {
                assert_eq!(*scan_type, ScanType::TimeIn);
                assert!(record.time_in.is_some());
            }
            other => panic!("expected duplicate notice, got {other:?}"),
        }
        assert!(!driver.capture().is_running());
        assert_eq!(driver.recorder.store.attendance_rows().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stop_during_restart_delay_wins() {
        let (tx, mut rx) = mpsc::unbounded();
        let capture = CaptureLoop::new(
            FakeCamera {
                frame: Some(blank_frame()),
                ..Default::default()
            },
            AlwaysFinds(PAYLOAD.to_string()),
            ScannerPrefs {
                restart_delay_ms: 60_000,
                ..fast_prefs()
            },
        );
        let recorder = ScriptedRecorder(RefCell::new(VecDeque::from([Err("boom".to_string())])));
        let mut driver = ScanDriver::new(capture, recorder);
        driver.handle(ScanAction::SelectEvent(Some(3)), &mut quiet).await;
        driver.handle(ScanAction::Start, &mut quiet).await;
        pump_until_phase(&mut driver, &mut rx, Phase::Confirming).await;

        tx.unbounded_send(ScanAction::Approve).unwrap();
        assert!(driver.step(&mut rx, &mut quiet).await);

        // A write failure never restarts on its own.
        assert!(driver.restart.is_none());
        assert!(matches!(driver.session().notice(), Some(Notice::Error(_))));

        driver.restart = Some(1);
        tx.unbounded_send(ScanAction::Stop).unwrap();
        assert!(driver.step(&mut rx, &mut quiet).await);
        assert!(driver.restart.is_none());
        assert!(!driver.capture().is_running());
    }

    #[tokio::test]
    async fn camera_failure_is_reported() {
        let (_tx, _rx) = mpsc::unbounded::<ScanAction>();
        let camera = FakeCamera {
            open_results: VecDeque::from([
                Err(CameraError::NoCamera),
                Err(CameraError::PermissionDenied),
            ]),
            ..Default::default()
        };
        let capture = CaptureLoop::new(camera, QrDecoder, fast_prefs());
        let mut driver = ScanDriver::new(capture, StoreRecorder::new());
        driver.handle(ScanAction::SelectEvent(Some(3)), &mut quiet).await;

        driver.handle(ScanAction::Start, &mut quiet).await;

        assert!(driver.session().phase().is_error());
        assert_eq!(
            driver.session().notice(),
            Some(&Notice::Error(CameraError::PermissionDenied.to_string()))
        );
        assert!(!driver.capture().is_running());
    }

    #[tokio::test]
    async fn run_publishes_changes_and_stops_on_close() {
        let (tx, rx) = mpsc::unbounded();
        let capture = CaptureLoop::new(qr_camera(), QrDecoder, fast_prefs());
        let driver = ScanDriver::new(capture, StoreRecorder::new());

        tx.unbounded_send(ScanAction::SelectEvent(Some(3))).unwrap();
        tx.unbounded_send(ScanAction::Start).unwrap();
        tx.unbounded_send(ScanAction::Stop).unwrap();
        drop(tx);

        let mut seen = Vec::new();
        driver.run(rx, |s| seen.push(s.phase())).await;

        assert_eq!(seen.first(), Some(&Phase::Idle));
        assert!(seen.contains(&Phase::Capturing));
        assert_eq!(seen.last(), Some(&Phase::Idle));
    }

    #[tokio::test]
    async fn run_publishes_recording_while_the_write_is_in_flight() {
        let (tx, rx) = mpsc::unbounded();
        let capture = CaptureLoop::new(qr_camera(), QrDecoder, fast_prefs());
        let driver = ScanDriver::new(capture, StoreRecorder::new());

        tx.unbounded_send(ScanAction::SelectEvent(Some(3))).unwrap();
        tx.unbounded_send(ScanAction::Start).unwrap();

        let mut seen: Vec<ScanSession> = Vec::new();
        let mut tx = Some(tx);
        let mut approved = false;
        driver
            .run(rx, |session| {
                seen.push(session.clone());
                let Some(sender) = &tx else { return };
                if session.phase().is_confirming() && !approved {
                    approved = true;
                    sender.unbounded_send(ScanAction::Approve).unwrap();
                }
                if matches!(session.notice(), Some(Notice::Success(_))) {
                    sender.unbounded_send(ScanAction::Stop).unwrap();
                    tx = None;
                }
            })
            .await;

        let starting = Notice::Status("Starting camera…".to_string());
        assert!(seen.iter().any(|s| s.phase().is_capturing() && s.notice() == Some(&starting)));

        let recording = seen
            .iter()
            .position(|s| s.phase().is_recording())
            .expect("recording state was published");
        assert_eq!(
            seen[recording].notice(),
            Some(&Notice::Status("Recording attendance…".to_string()))
        );
        let recorded = seen
            .iter()
            .position(|s| matches!(s.notice(), Some(Notice::Success(_))))
            .expect("success was published");
        assert!(recording < recorded);
        assert!(seen.last().is_some_and(|s| s.phase().is_idle()));
    }

    #[tokio::test]
    async fn stray_click_after_success_keeps_the_restart() {
        let (tx, mut rx) = mpsc::unbounded();
        let capture = CaptureLoop::new(qr_camera(), QrDecoder, fast_prefs());
        let mut driver = ScanDriver::new(capture, StoreRecorder::new());
        driver.handle(ScanAction::SelectEvent(Some(3)), &mut quiet).await;
        driver.handle(ScanAction::Start, &mut quiet).await;
        pump_until_phase(&mut driver, &mut rx, Phase::Confirming).await;

        // A second approve queued behind the first, as a double click would.
        tx.unbounded_send(ScanAction::Approve).unwrap();
        tx.unbounded_send(ScanAction::Approve).unwrap();
        tx.unbounded_send(ScanAction::Cancel).unwrap();
        assert!(driver.step(&mut rx, &mut quiet).await);
        assert!(driver.restart.is_some());

        assert!(driver.step(&mut rx, &mut quiet).await);
        assert!(driver.step(&mut rx, &mut quiet).await);
        assert!(driver.restart.is_some());
        assert!(matches!(driver.session().notice(), Some(Notice::Success(_))));

        assert!(driver.step(&mut rx, &mut quiet).await);
        assert!(driver.capture().is_running());
    }
}
