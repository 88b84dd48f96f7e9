//! Camera lifecycle and throttled frame sampling.

use api::prefs::scanner_prefs::ScannerPrefs;
use dioxus_logger::tracing::{debug, info, warn};
use thiserror::Error;

use super::decoder::{Decoded, FrameDecoder};
use super::frame::Frame;
use super::throttle::DecodeThrottle;

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum CameraError {
    #[error("Camera permission was denied. Allow camera access and try again.")]
    PermissionDenied,
    #[error("No camera was found on this device.")]
    NoCamera,
    #[error("The camera stream could not be played: {0}")]
    Playback(String),
    #[error("Camera scanning is not supported on this platform.")]
    Unsupported,
    #[error("The camera could not be started: {0}")]
    Other(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Facing {
    Environment,
    User,
}

impl Facing {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Environment => "environment",
            Self::User => "user",
        }
    }
}

/// One entry of the constraint fallback chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoConstraints {
    pub facing: Facing,
    /// `exact` rather than `ideal` facing.
    pub exact_facing: bool,
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub max_width: u32,
    pub max_height: u32,
    pub ideal_fps: u32,
    pub max_fps: u32,
}

/// Constraint sets to try in order: the preferred camera with an exact facing
/// constraint, then the other camera with an ideal one.
pub fn constraint_chain(preferred: Facing, prefs: &ScannerPrefs) -> Vec<VideoConstraints> {
    let fallback = match preferred {
        Facing::Environment => Facing::User,
        Facing::User => Facing::Environment,
    };
    [(preferred, true), (fallback, false)]
        .into_iter()
        .map(|(facing, exact_facing)| VideoConstraints {
            facing,
            exact_facing,
            ideal_width: prefs.ideal_width,
            ideal_height: prefs.ideal_height,
            max_width: prefs.max_width,
            max_height: prefs.max_height,
            ideal_fps: prefs.ideal_fps,
            max_fps: prefs.max_fps,
        })
        .collect()
}

/// A video source the capture loop can sample.
#[allow(async_fn_in_trait)]
pub trait Camera {
    /// Acquires a stream and attaches it to the sink.
    async fn open(&mut self, constraints: &VideoConstraints) -> Result<(), CameraError>;

    /// Stops every track and detaches the sink. Safe to call repeatedly.
    fn release(&mut self);

    fn is_open(&self) -> bool;

    /// True once the source has current frame data and valid dimensions.
    fn frame_ready(&self) -> bool;

    /// Samples the current frame, scaled down by `divisor`.
    fn grab_frame(&mut self, divisor: u32) -> Option<Frame>;
}

/// Outcome of one animation-frame tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Tick {
    /// The loop is not running.
    Stopped,
    /// The source is still warming up.
    NotReady,
    /// Throttled, no decode attempted.
    Skipped,
    /// A frame was decoded and held no symbol.
    Nothing,
    /// A symbol was decoded. The loop has already stopped.
    Hit(String),
}

pub struct CaptureLoop<C, D> {
    camera: C,
    decoder: D,
    throttle: DecodeThrottle,
    prefs: ScannerPrefs,
    running: bool,
}

impl<C: Camera, D: FrameDecoder> CaptureLoop<C, D> {
    pub fn new(camera: C, decoder: D, prefs: ScannerPrefs) -> Self {
        Self {
            camera,
            decoder,
            throttle: DecodeThrottle::new(prefs.decode_every),
            prefs,
            running: false,
        }
    }

    pub fn prefs(&self) -> &ScannerPrefs {
        &self.prefs
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn camera(&self) -> &C {
        &self.camera
    }

    /// Starts capture, stopping any previous stream first.
    ///
    /// Tries each entry of the constraint chain in turn. When every entry
    /// fails the last error is returned.
    pub async fn start(&mut self, preferred: Facing) -> Result<(), CameraError> {
        self.stop();

        let mut last_err = CameraError::NoCamera;
        for constraints in constraint_chain(preferred, &self.prefs) {
            match self.camera.open(&constraints).await {
                Ok(()) => {
                    info!(facing = constraints.facing.as_str(), "camera started");
                    self.throttle.reset();
                    self.running = true;
                    return Ok(());
                }
                Err(e) => {
                    debug!(facing = constraints.facing.as_str(), "camera constraints failed: {e}");
                    self.camera.release();
                    last_err = e;
                }
            }
        }
        warn!("no camera could be started: {last_err}");
        Err(last_err)
    }

    /// Stops sampling and releases the camera.
    pub fn stop(&mut self) {
        self.running = false;
        self.camera.release();
    }

    /// Runs one animation-frame tick.
    pub fn tick(&mut self) -> Tick {
        if !self.running {
            return Tick::Stopped;
        }
        if !self.camera.frame_ready() {
            return Tick::NotReady;
        }
        if !self.throttle.tick() {
            return Tick::Skipped;
        }
        let Some(frame) = self.camera.grab_frame(self.prefs.downscale) else {
            return Tick::NotReady;
        };
        match self.decoder.decode(&frame) {
            Decoded::Found(text) => {
                // Halt before anything asynchronous happens with the result.
                self.stop();
                Tick::Hit(text)
            }
            Decoded::NotFound => Tick::Nothing,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::Cell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    use super::*;

    /// Scripted camera.
    #[derive(Default)]
    pub(crate) struct FakeCamera {
        pub open_results: VecDeque<Result<(), CameraError>>,
        pub attempts: Vec<VideoConstraints>,
        /// Ticks that report the source as not ready yet.
        pub warmup_ticks: Cell<u32>,
        pub frame: Option<Frame>,
        pub open: bool,
        pub releases: u32,
        pub grabs: Rc<Cell<u32>>,
        pub divisors: Vec<u32>,
    }

    impl Camera for FakeCamera {
        async fn open(&mut self, constraints: &VideoConstraints) -> Result<(), CameraError> {
            self.attempts.push(constraints.clone());
            let result = self.open_results.pop_front().unwrap_or(Ok(()));
            self.open = result.is_ok();
            result
        }

        fn release(&mut self) {
            self.open = false;
            self.releases += 1;
        }

        fn is_open(&self) -> bool {
            self.open
        }

        fn frame_ready(&self) -> bool {
            if !self.open {
                return false;
            }
            let left = self.warmup_ticks.get();
            if left > 0 {
                self.warmup_ticks.set(left - 1);
                return false;
            }
            true
        }

        fn grab_frame(&mut self, divisor: u32) -> Option<Frame> {
            self.grabs.set(self.grabs.get() + 1);
            self.divisors.push(divisor);
            self.frame.clone()
        }
    }

    /// Counts calls and never finds anything.
    #[derive(Default)]
    pub(crate) struct CountingDecoder {
        pub calls: Cell<u32>,
    }

    impl FrameDecoder for CountingDecoder {
        fn decode(&self, _frame: &Frame) -> Decoded {
            self.calls.set(self.calls.get() + 1);
            Decoded::NotFound
        }
    }

    /// Finds `text` in every frame.
    pub(crate) struct AlwaysFinds(pub String);

    impl FrameDecoder for AlwaysFinds {
        fn decode(&self, _frame: &Frame) -> Decoded {
            Decoded::Found(self.0.clone())
        }
    }

    pub(crate) fn blank_frame() -> Frame {
        Frame::from_rgba(4, 4, vec![255; 64]).unwrap()
    }

    fn camera() -> FakeCamera {
        FakeCamera {
            frame: Some(blank_frame()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn thirty_ready_ticks_decode_at_most_ten_frames() {
        let mut capture = CaptureLoop::new(camera(), CountingDecoder::default(), ScannerPrefs::builtin());
        capture.start(Facing::Environment).await.unwrap();

        for _ in 0..30 {
            capture.tick();
        }

        assert!(capture.decoder.calls.get() <= 10);
        assert_eq!(capture.decoder.calls.get(), 10);
        assert!(capture.camera.divisors.iter().all(|d| *d == 2));
    }

    #[tokio::test]
    async fn stopping_twice_is_harmless() {
        let mut capture = CaptureLoop::new(camera(), CountingDecoder::default(), ScannerPrefs::builtin());
        capture.start(Facing::Environment).await.unwrap();

        capture.stop();
        capture.stop();

        assert!(!capture.is_running());
        assert!(!capture.camera().is_open());
        assert_eq!(capture.tick(), Tick::Stopped);
    }

    #[tokio::test]
    async fn falls_back_to_the_user_camera() {
        let mut cam = camera();
        cam.open_results = VecDeque::from([Err(CameraError::NoCamera), Ok(())]);
        let mut capture = CaptureLoop::new(cam, CountingDecoder::default(), ScannerPrefs::builtin());

        capture.start(Facing::Environment).await.unwrap();

        let attempts = &capture.camera().attempts;
        assert_eq!(attempts.len(), 2);
        assert_eq!((attempts[0].facing, attempts[0].exact_facing), (Facing::Environment, true));
        assert_eq!((attempts[1].facing, attempts[1].exact_facing), (Facing::User, false));
        assert!(capture.is_running());
    }

    #[tokio::test]
    async fn surfaces_the_last_failure() {
        let mut cam = camera();
        cam.open_results = VecDeque::from([
            Err(CameraError::NoCamera),
            Err(CameraError::PermissionDenied),
        ]);
        let mut capture = CaptureLoop::new(cam, CountingDecoder::default(), ScannerPrefs::builtin());

        let err = capture.start(Facing::Environment).await.unwrap_err();

        assert_eq!(err, CameraError::PermissionDenied);
        assert!(!capture.is_running());
        assert!(!capture.camera().is_open());
    }

    #[tokio::test]
    async fn warming_source_is_not_sampled_until_ready() {
        let cam = camera();
        cam.warmup_ticks.set(6);
        let mut capture = CaptureLoop::new(cam, CountingDecoder::default(), ScannerPrefs::builtin());
        capture.start(Facing::Environment).await.unwrap();

        for _ in 0..6 {
            assert_eq!(capture.tick(), Tick::NotReady);
        }
        assert_eq!(capture.camera().grabs.get(), 0);
        assert!(capture.is_running());

        let ticks: Vec<Tick> = (0..3).map(|_| capture.tick()).collect();
        assert_eq!(ticks, vec![Tick::Skipped, Tick::Skipped, Tick::Nothing]);
        assert_eq!(capture.camera().grabs.get(), 1);
        assert_eq!(capture.decoder.calls.get(), 1);
    }

    #[tokio::test]
    async fn hit_stops_capture() {
        let mut capture = CaptureLoop::new(camera(), AlwaysFinds("x".to_string()), ScannerPrefs::builtin());
        capture.start(Facing::Environment).await.unwrap();

        let ticks: Vec<Tick> = (0..3).map(|_| capture.tick()).collect();

        assert_eq!(ticks, vec![Tick::Skipped, Tick::Skipped, Tick::Hit("x".to_string())]);
        assert!(!capture.is_running());
        assert!(!capture.camera().is_open());
    }

    #[tokio::test]
    async fn restarting_releases_the_previous_stream() {
        let mut capture = CaptureLoop::new(camera(), CountingDecoder::default(), ScannerPrefs::builtin());
        capture.start(Facing::Environment).await.unwrap();
        let releases = capture.camera().releases;

        capture.start(Facing::Environment).await.unwrap();

        assert_eq!(capture.camera().releases, releases + 1);
        assert_eq!(capture.camera().attempts.len(), 2);
    }
}
