//! Frame types shared by the sender and receiver.
//!
//! A [`Frame`] is an opaque, immutable byte buffer. Both peers agree on
//! its length out of band, usually by deriving it from a
//! [`FrameFormat`]; nothing on the wire describes it.

use std::time::Instant;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::VstreamError;

// ── PixelFormat ──────────────────────────────────────────────────

/// Pixel layout of a raw frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// 3 bytes per pixel: Red, Green, Blue.
    #[default]
    Rgb8,
    /// 4 bytes per pixel: Red, Green, Blue, Alpha.
    Rgba8,
    /// 4 bytes per pixel: Blue, Green, Red, Alpha.
    Bgra8,
    /// 1 byte per pixel luminance.
    Gray8,
}

impl PixelFormat {
    /// Bytes consumed by a single pixel in this format.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Bgra8 | PixelFormat::Rgba8 => 4,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Gray8 => 1,
        }
    }
}

// ── FrameFormat ──────────────────────────────────────────────────

/// Dimensions and pixel layout from which both peers derive the frame
/// size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameFormat {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Pixel layout.
    pub pixel_format: PixelFormat,
}

impl FrameFormat {
    pub const fn new(width: u32, height: u32, pixel_format: PixelFormat) -> Self {
        Self {
            width,
            height,
            pixel_format,
        }
    }

    /// Byte length of one tightly packed frame (no row padding).
    pub const fn frame_size(&self) -> usize {
        self.width as usize * self.height as usize * self.pixel_format.bytes_per_pixel()
    }
}

impl Default for FrameFormat {
    fn default() -> Self {
        Self::new(1280, 720, PixelFormat::Rgb8)
    }
}

/// Reject a zero frame size, which would make every transfer ambiguous.
pub fn validate_frame_size(frame_size: usize) -> Result<usize, VstreamError> {
    if frame_size == 0 {
        return Err(VstreamError::InvalidConfig(
            "frame size must be non-zero".into(),
        ));
    }
    Ok(frame_size)
}

// ── Frame ────────────────────────────────────────────────────────

/// One raw frame travelling through the relay.
///
/// The payload is reference-counted and immutable, so handing a frame to
/// a queue moves ownership without copying and nobody can overwrite it
/// while a consumer still reads it.
#[derive(Debug, Clone)]
pub struct Frame {
    data: Bytes,
    timestamp: Instant,
}

impl Frame {
    /// Wrap a buffer as a frame stamped with the current instant.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            timestamp: Instant::now(),
        }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw payload bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the frame and return its payload.
    pub fn into_bytes(self) -> Bytes {
        self.data
    }

    /// When the frame was produced (sender side) or completed (receiver side).
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for Frame {}

// ── Tests ────────────────────────────────────────────────────────
