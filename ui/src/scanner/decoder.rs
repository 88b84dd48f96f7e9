//! Locating and decoding a QR symbol in a single frame.

use super::frame::Frame;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Decoded {
    Found(String),
    NotFound,
}

/// Decodes one frame. Implementations are stateless and synchronous.
pub trait FrameDecoder {
    fn decode(&self, frame: &Frame) -> Decoded;
}

/// [`FrameDecoder`] backed by `rqrr`.
///
/// Only dark-on-light symbols are recognised.
#[derive(Clone, Copy, Default, Debug)]
pub struct QrDecoder;

impl FrameDecoder for QrDecoder {
    fn decode(&self, frame: &Frame) -> Decoded {
        let Some(luma) = frame.to_luma() else {
            return Decoded::NotFound;
        };
        let mut prepared = rqrr::PreparedImage::prepare(luma);

        prepared
            .detect_grids()
            .first()
            .and_then(|grid| grid.decode().ok())
            .map(|(_meta, content)| content)
            .filter(|content| !content.is_empty())
            .map(Decoded::Found)
            .unwrap_or(Decoded::NotFound)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use qrcode::{Color, QrCode};

    use super::*;

    /// Renders `text` as a black-on-white frame with a quiet zone.
    pub(crate) fn qr_frame(text: &str) -> Frame {
        const SCALE: u32 = 6;
        const QUIET: u32 = 4;

        let code = QrCode::new(text.as_bytes()).unwrap();
        let modules = code.width() as u32;
        let colors = code.to_colors();
        let side = (modules + 2 * QUIET) * SCALE;

        let mut rgba = Vec::with_capacity((side * side * 4) as usize);
        for y in 0..side {
            for x in 0..side {
                let (mx, my) = (x / SCALE, y / SCALE);
                let dark = mx >= QUIET
                    && my >= QUIET
                    && mx < modules + QUIET
                    && my < modules + QUIET
                    && colors[((my - QUIET) * modules + (mx - QUIET)) as usize] == Color::Dark;
                let v = if dark { 0 } else { 255 };
                rgba.extend_from_slice(&[v, v, v, 255]);
            }
        }
        Frame::from_rgba(side, side, rgba).unwrap()
    }

    #[test]
    fn decodes_a_rendered_symbol() {
        let payload = r#"{"student_id":"2021-0001","first_name":"Ana"}"#;
        assert_eq!(
            QrDecoder.decode(&qr_frame(payload)),
            Decoded::Found(payload.to_string())
        );
    }

    #[test]
    fn decodes_after_downscaling() {
        let frame = qr_frame("2021-0001").downscaled(2);
        assert_eq!(QrDecoder.decode(&frame), Decoded::Found("2021-0001".to_string()));
    }

    #[test]
    fn blank_frame_is_not_found() {
        let frame = Frame::from_rgba(64, 64, [255, 255, 255, 255].repeat(64 * 64)).unwrap();
        assert_eq!(QrDecoder.decode(&frame), Decoded::NotFound);
    }
}
