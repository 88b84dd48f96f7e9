//! Shared components used by the screens.
pub mod identity_qr;
pub mod pico;
pub mod scanner_panel;
