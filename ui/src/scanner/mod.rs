//! Camera-driven QR scanning.
//!
//! [`capture::CaptureLoop`] samples a [`capture::Camera`] and feeds every Nth
//! frame to a [`decoder::FrameDecoder`]. [`session::ScanSession`] decides what
//! happens next and [`driver::ScanDriver`] carries that out.

pub mod capture;
pub mod decoder;
pub mod driver;
pub mod frame;
pub mod platform_camera;
pub mod session;
pub mod throttle;
