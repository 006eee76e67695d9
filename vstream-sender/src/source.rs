//! Synthetic frame source.
//!
//! Stands in for a camera or screen grabber: every call to
//! [`TestPattern::next_frame`] renders a diagonal gradient that scrolls
//! one pixel per frame, so a receiver can tell frames apart visually.

use bytes::BytesMut;
use vstream_core::{Frame, FrameFormat, PixelFormat};

/// Moving gradient generator.
pub struct TestPattern {
    format: FrameFormat,
    frame_number: u64,
}

impl TestPattern {
    pub fn new(format: FrameFormat) -> Self {
        Self {
            format,
            frame_number: 0,
        }
    }

    /// Frames rendered so far.
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Render the next frame into a freshly allocated buffer.
    pub fn next_frame(&mut self) -> Frame {
        let fmt = self.format;
        let bpp = fmt.pixel_format.bytes_per_pixel();
        let shift = self.frame_number as u32;
        let mut buf = BytesMut::with_capacity(fmt.frame_size());

        for y in 0..fmt.height {
            for x in 0..fmt.width {
                let r = (x.wrapping_add(shift) & 0xFF) as u8;
                let g = (y & 0xFF) as u8;
                let b = (x.wrapping_add(y).wrapping_add(shift) & 0xFF) as u8;
                match fmt.pixel_format {
                    PixelFormat::Rgb8 => buf.extend_from_slice(&[r, g, b]),
                    PixelFormat::Rgba8 => buf.extend_from_slice(&[r, g, b, 0xFF]),
                    PixelFormat::Bgra8 => buf.extend_from_slice(&[b, g, r, 0xFF]),
                    PixelFormat::Gray8 => buf.extend_from_slice(&[b]),
                }
            }
        }
        debug_assert_eq!(buf.len(), fmt.height as usize * fmt.width as usize * bpp);

        self.frame_number += 1;
        Frame::new(buf.freeze())
    }
}

// ── Tests ────────────────────────────────────────────────────────
