use image::GrayImage;

/// One sampled video frame as tightly packed RGBA.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Frame {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl Frame {
    /// Returns `None` unless `rgba` holds exactly `width * height` pixels.
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;
        if width == 0 || height == 0 || rgba.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Nearest-neighbour downscale by an integer divisor, the reduction the
    /// browser canvas applies while drawing a video frame.
    #[cfg(test)]
    pub fn downscaled(&self, divisor: u32) -> Frame {
        let divisor = divisor.max(1);
        if divisor == 1 {
            return self.clone();
        }
        let width = (self.width / divisor).max(1);
        let height = (self.height / divisor).max(1);
        let mut rgba = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            let src_y = (y * divisor).min(self.height - 1);
            for x in 0..width {
                let src_x = (x * divisor).min(self.width - 1);
                let at = ((src_y * self.width + src_x) * 4) as usize;
                rgba.extend_from_slice(&self.rgba[at..at + 4]);
            }
        }
        Frame {
            width,
            height,
            rgba,
        }
    }

    /// Converts to grayscale, stretching low-contrast frames to the full range.
    pub fn to_luma(&self) -> Option<GrayImage> {
        let mut luma: Vec<u8> = self
            .rgba
            .chunks_exact(4)
            .map(|px| (px[0] as f32 * 0.299 + px[1] as f32 * 0.587 + px[2] as f32 * 0.114) as u8)
            .collect();

        let (min, max) = luma
            .iter()
            .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let range = max.saturating_sub(min);
        if range > 0 && range < 200 {
            let scale = 255.0 / range as f32;
            for v in &mut luma {
                *v = ((*v - min) as f32 * scale).round() as u8;
            }
        }

        GrayImage::from_raw(self.width, self.height, luma)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, value: u8) -> Frame {
        Frame::from_rgba(width, height, [value, value, value, 255].repeat((width * height) as usize))
            .unwrap()
    }

    #[test]
    fn rejects_mismatched_buffers() {
        assert!(Frame::from_rgba(2, 2, vec![0; 15]).is_none());
        assert!(Frame::from_rgba(0, 2, vec![]).is_none());
    }

    #[test]
    fn downscale_halves_each_dimension() {
        let frame = solid(640, 480, 10).downscaled(2);
        assert_eq!((frame.width(), frame.height()), (320, 240));
    }

    #[test]
    fn low_contrast_is_stretched() {
        let mut rgba = [100, 100, 100, 255].repeat(2);
        rgba.extend_from_slice(&[150, 150, 150, 255].repeat(2));
        let luma = Frame::from_rgba(2, 2, rgba).unwrap().to_luma().unwrap();

        assert_eq!(luma.get_pixel(0, 0).0[0], 0);
        assert_eq!(luma.get_pixel(1, 1).0[0], 255);
    }
}
