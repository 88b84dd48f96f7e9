use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use super::env_or;

/// Tuning for the camera capture loop and the scan session.
///
/// Served to the client by `get_scanner_prefs` so a deployment can be tuned
/// for slow devices without a rebuild.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ScannerPrefs {
    /// Decode only every Nth animation-frame tick.
    pub decode_every: u32,
    /// Frames are scaled down by this divisor before decoding.
    pub downscale: u32,
    /// Pause after a successful recording before scanning resumes.
    pub restart_delay_ms: u64,
    /// Retry delay while the video source is still warming up.
    pub warmup_retry_ms: u64,
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub max_width: u32,
    pub max_height: u32,
    pub ideal_fps: u32,
    pub max_fps: u32,
    /// Sound played when a code is detected.
    pub cue_url: String,
}

impl ScannerPrefs {
    /// The in-code defaults, ignoring the environment.
    pub fn builtin() -> Self {
        Self {
            decode_every: 3,
            downscale: 2,
            restart_delay_ms: 1000,
            warmup_retry_ms: 100,
            ideal_width: 640,
            ideal_height: 480,
            max_width: 1280,
            max_height: 720,
            ideal_fps: 15,
            max_fps: 30,
            cue_url: "/assets/scan-cue.mp3".to_string(),
        }
    }

    /// Creates prefs from environment variables, with the built-in values as
    /// fallback.
    ///
    /// # Environment Variables
    /// - `SCAN_DECODE_EVERY`, `SCAN_DOWNSCALE`: at least 1.
    /// - `SCAN_RESTART_DELAY_MS`, `SCAN_WARMUP_RETRY_MS`
    /// - `SCAN_IDEAL_WIDTH`, `SCAN_IDEAL_HEIGHT`, `SCAN_MAX_WIDTH`, `SCAN_MAX_HEIGHT`
    /// - `SCAN_IDEAL_FPS`, `SCAN_MAX_FPS`
    /// - `SCAN_CUE_URL`
    pub fn from_env() -> Self {
        let d = Self::builtin();
        Self {
            decode_every: env_or("SCAN_DECODE_EVERY", d.decode_every).max(1),
            downscale: env_or("SCAN_DOWNSCALE", d.downscale).max(1),
            restart_delay_ms: env_or("SCAN_RESTART_DELAY_MS", d.restart_delay_ms),
            warmup_retry_ms: env_or("SCAN_WARMUP_RETRY_MS", d.warmup_retry_ms),
            ideal_width: env_or("SCAN_IDEAL_WIDTH", d.ideal_width),
            ideal_height: env_or("SCAN_IDEAL_HEIGHT", d.ideal_height),
            max_width: env_or("SCAN_MAX_WIDTH", d.max_width),
            max_height: env_or("SCAN_MAX_HEIGHT", d.max_height),
            ideal_fps: env_or("SCAN_IDEAL_FPS", d.ideal_fps),
            max_fps: env_or("SCAN_MAX_FPS", d.max_fps),
            cue_url: env_or("SCAN_CUE_URL", d.cue_url),
        }
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    pub fn warmup_retry(&self) -> Duration {
        Duration::from_millis(self.warmup_retry_ms)
    }
}

impl Default for ScannerPrefs {
    fn default() -> Self {
        Self::from_env()
    }
}
