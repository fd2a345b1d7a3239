//! RGBA8 bitmaps
//!
//! The renderer-facing output of every decode path: tightly packed RGBA8
//! with stride `width * 4`.

use crate::error::{DecodeError, DecodeResult};
use image::imageops::FilterType;
use image::RgbaImage;

/// Largest bitmap this crate will allocate, in pixels.
///
/// Covers the biggest frame any H.264 level allows (8192x4352).
pub const MAX_PIXELS: usize = 1 << 26;

/// Byte length of a `width x height` RGBA8 buffer within [`MAX_PIXELS`].
pub(crate) fn rgba_len(width: u32, height: u32) -> DecodeResult<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .filter(|px| *px <= MAX_PIXELS)
        .map(|px| px * 4)
        .ok_or(DecodeError::InvalidDimensions { width, height })
}

/// A decoded RGBA8 image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Bitmap {
    /// Wrap an RGBA8 buffer of exactly `width * height * 4` bytes.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> DecodeResult<Self> {
        let expected = rgba_len(width, height)?;
        if data.len() != expected {
            return Err(DecodeError::BufferTooSmall {
                expected,
                actual: data.len(),
            });
        }
        Ok(Bitmap {
            width,
            height,
            data,
        })
    }

    /// Fully transparent bitmap.
    pub fn blank(width: u32, height: u32) -> DecodeResult<Self> {
        Ok(Bitmap {
            width,
            height,
            data: vec![0; rgba_len(width, height)?],
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// RGBA8 pixels.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Take the pixel buffer.
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Scale to `resize_width`, keeping the aspect ratio.
    ///
    /// `None`, zero, or the current width leave the bitmap untouched.
    pub fn resized(self, resize_width: Option<u32>) -> DecodeResult<Bitmap> {
        let Some(target_width) = resize_width.filter(|w| *w > 0 && *w != self.width) else {
            return Ok(self);
        };
        let (width, height) = scaled_size(self.width, self.height, Some(target_width));
        rgba_len(width, height)?;
        let (src_width, src_height) = (self.width, self.height);
        let source = RgbaImage::from_raw(src_width, src_height, self.data).ok_or(
            DecodeError::InvalidDimensions {
                width: src_width,
                height: src_height,
            },
        )?;
        let resized = image::imageops::resize(&source, width, height, FilterType::Triangle);
        Ok(Bitmap::from(resized))
    }
}

impl From<RgbaImage> for Bitmap {
    fn from(image: RgbaImage) -> Self {
        Bitmap {
            width: image.width(),
            height: image.height(),
            data: image.into_raw(),
        }
    }
}

/// Output size when scaling `width x height` to `resize_width`.
///
/// Height follows the aspect ratio, rounded, and never drops below 1.
pub fn scaled_size(width: u32, height: u32, resize_width: Option<u32>) -> (u32, u32) {
    match resize_width.filter(|w| *w > 0) {
        Some(target) if width > 0 => {
            let scaled = (u64::from(height) * u64::from(target) + u64::from(width) / 2)
                / u64::from(width);
            (target, u32::try_from(scaled).unwrap_or(u32::MAX).max(1))
        }
        Some(target) => (target, target),
        None => (width, height),
    }
}
