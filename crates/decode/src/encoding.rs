//! Raw pixel encodings
//!
//! The set is closed: parsing an encoding string either yields a variant or
//! [`DecodeError::UnsupportedEncoding`].

use crate::error::DecodeError;
use std::fmt;
use std::str::FromStr;

/// Supported raw image encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawEncoding {
    /// Packed U Y0 V Y1 (`yuv422`, `uyvy`)
    Uyvy,
    /// Packed Y0 U Y1 V (`yuv422_yuy2`, `yuyv`)
    Yuyv,
    /// 8-bit RGB
    Rgb8,
    /// 8-bit RGBA
    Rgba8,
    /// 8-bit BGRA
    Bgra8,
    /// 8-bit BGR (`bgr8`, `8UC3`)
    Bgr8,
    /// Single-channel 32-bit float (`32FC1`)
    Float1c,
    /// Bayer RGGB
    BayerRggb8,
    /// Bayer BGGR
    BayerBggr8,
    /// Bayer GBRG
    BayerGbrg8,
    /// Bayer GRBG
    BayerGrbg8,
    /// 8-bit grayscale (`mono8`, `8UC1`)
    Mono8,
    /// 16-bit grayscale (`mono16`, `16UC1`)
    Mono16,
}

impl RawEncoding {
    /// Canonical encoding name.
    pub fn as_str(&self) -> &'static str {
        match self {
            RawEncoding::Uyvy => "uyvy",
            RawEncoding::Yuyv => "yuyv",
            RawEncoding::Rgb8 => "rgb8",
            RawEncoding::Rgba8 => "rgba8",
            RawEncoding::Bgra8 => "bgra8",
            RawEncoding::Bgr8 => "bgr8",
            RawEncoding::Float1c => "32FC1",
            RawEncoding::BayerRggb8 => "bayer_rggb8",
            RawEncoding::BayerBggr8 => "bayer_bggr8",
            RawEncoding::BayerGbrg8 => "bayer_gbrg8",
            RawEncoding::BayerGrbg8 => "bayer_grbg8",
            RawEncoding::Mono8 => "mono8",
            RawEncoding::Mono16 => "mono16",
        }
    }

    /// Minimum bytes for one row of `width` pixels.
    ///
    /// Packed YUV stores pixels in pairs, so odd widths round up.
    pub fn row_bytes(&self, width: usize) -> usize {
        match self {
            RawEncoding::Uyvy | RawEncoding::Yuyv => width.div_ceil(2) * 4,
            RawEncoding::Rgb8 | RawEncoding::Bgr8 => width * 3,
            RawEncoding::Rgba8 | RawEncoding::Bgra8 | RawEncoding::Float1c => width * 4,
            RawEncoding::Mono16 => width * 2,
            RawEncoding::BayerRggb8
            | RawEncoding::BayerBggr8
            | RawEncoding::BayerGbrg8
            | RawEncoding::BayerGrbg8
            | RawEncoding::Mono8 => width,
        }
    }

    /// Whether `min_value`/`max_value` options affect this encoding.
    pub fn is_normalized(&self) -> bool {
        matches!(self, RawEncoding::Float1c | RawEncoding::Mono16)
    }
}

impl FromStr for RawEncoding {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "yuv422" | "uyvy" => RawEncoding::Uyvy,
            "yuv422_yuy2" | "yuyv" => RawEncoding::Yuyv,
            "rgb8" => RawEncoding::Rgb8,
            "rgba8" => RawEncoding::Rgba8,
            "bgra8" => RawEncoding::Bgra8,
            "bgr8" | "8UC3" => RawEncoding::Bgr8,
            "32FC1" => RawEncoding::Float1c,
            "bayer_rggb8" => RawEncoding::BayerRggb8,
            "bayer_bggr8" => RawEncoding::BayerBggr8,
            "bayer_gbrg8" => RawEncoding::BayerGbrg8,
            "bayer_grbg8" => RawEncoding::BayerGrbg8,
            "mono8" | "8UC1" => RawEncoding::Mono8,
            "mono16" | "16UC1" => RawEncoding::Mono16,
            other => return Err(DecodeError::UnsupportedEncoding(other.to_string())),
        })
    }
}

impl fmt::Display for RawEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases() {
        let pairs = [
            ("yuv422", RawEncoding::Uyvy),
            ("uyvy", RawEncoding::Uyvy),
            ("yuv422_yuy2", RawEncoding::Yuyv),
            ("yuyv", RawEncoding::Yuyv),
            ("8UC3", RawEncoding::Bgr8),
            ("8UC1", RawEncoding::Mono8),
            ("16UC1", RawEncoding::Mono16),
            ("32FC1", RawEncoding::Float1c),
        ];
        for (name, expected) in pairs {
            assert_eq!(name.parse::<RawEncoding>().unwrap(), expected, "{}", name);
        }
    }

    #[test]
    fn test_canonical_names_round_trip() {
        for encoding in [
            RawEncoding::Rgb8,
            RawEncoding::BayerGrbg8,
            RawEncoding::Mono16,
            RawEncoding::Float1c,
        ] {
            assert_eq!(encoding.as_str().parse::<RawEncoding>().unwrap(), encoding);
        }
    }

    #[test]
    fn test_unknown_encoding() {
        assert!(matches!(
            "rgb16".parse::<RawEncoding>(),
            Err(DecodeError::UnsupportedEncoding(name)) if name == "rgb16"
        ));
    }

    #[test]
    fn test_row_bytes() {
        assert_eq!(RawEncoding::Yuyv.row_bytes(3), 8);
        assert_eq!(RawEncoding::Rgb8.row_bytes(3), 9);
        assert_eq!(RawEncoding::Mono16.row_bytes(3), 6);
        assert_eq!(RawEncoding::BayerRggb8.row_bytes(3), 3);
    }
}
