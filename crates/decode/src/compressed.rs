//! Compressed image decoding
//!
//! The payload and its declared format are wrapped into an [`EncodedImage`]
//! carrying an `image/<format>` MIME type, then decoded by the `image`
//! crate. Recorders are loose with format strings (`jpg`, `jpeg`, or
//! `rgb8; jpeg compressed bgr8`), so resolution falls back from MIME type to
//! extension to a keyword search.

use crate::bitmap::Bitmap;
use crate::error::{DecodeError, DecodeResult};
use image::ImageFormat;

/// A self-describing compressed image blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    mime: String,
    data: Vec<u8>,
}

impl EncodedImage {
    /// Wrap a payload with its declared format (`png`, `jpeg`, ...).
    pub fn new(format: &str, data: impl Into<Vec<u8>>) -> Self {
        EncodedImage {
            mime: format!("image/{}", format.trim()),
            data: data.into(),
        }
    }

    /// `image/<format>` MIME type.
    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// Encoded bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Container format understood by the decoder.
    pub fn image_format(&self) -> DecodeResult<ImageFormat> {
        let declared = self.mime.trim_start_matches("image/");
        if let Some(format) = ImageFormat::from_mime_type(&self.mime) {
            return Ok(format);
        }
        if let Some(format) = ImageFormat::from_extension(declared) {
            return Ok(format);
        }
        let lower = declared.to_ascii_lowercase();
        [
            ("jpeg", ImageFormat::Jpeg),
            ("jpg", ImageFormat::Jpeg),
            ("png", ImageFormat::Png),
            ("bmp", ImageFormat::Bmp),
        ]
        .into_iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map(|(_, format)| format)
        .ok_or_else(|| DecodeError::UnsupportedFormat(declared.to_string()))
    }

    /// Decode to RGBA8, optionally scaled to `resize_width`.
    pub fn decode(&self, resize_width: Option<u32>) -> DecodeResult<Bitmap> {
        let format = self.image_format()?;
        let decoded = image::load_from_memory_with_format(&self.data, format)?;
        Bitmap::from(decoded.into_rgba8()).resized(resize_width)
    }
}

/// Decode a compressed image payload on the current thread.
pub fn decode_compressed_image(
    format: &str,
    data: &[u8],
    resize_width: Option<u32>,
) -> DecodeResult<Bitmap> {
    EncodedImage::new(format, data).decode(resize_width)
}

/// Decode a compressed image on tokio's blocking pool.
pub async fn decode_compressed_image_async(
    image: EncodedImage,
    resize_width: Option<u32>,
) -> DecodeResult<Bitmap> {
    tokio::task::spawn_blocking(move || image.decode(resize_width))
        .await
        .map_err(|e| DecodeError::Worker(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32, pixel: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba(pixel));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn test_mime_and_format_resolution() {
        let image = EncodedImage::new("png", Vec::new());
        assert_eq!(image.mime(), "image/png");
        assert_eq!(image.image_format().unwrap(), ImageFormat::Png);
        assert_eq!(
            EncodedImage::new("jpg", Vec::new()).image_format().unwrap(),
            ImageFormat::Jpeg
        );
        assert_eq!(
            EncodedImage::new("rgb8; jpeg compressed bgr8", Vec::new())
                .image_format()
                .unwrap(),
            ImageFormat::Jpeg
        );
        assert!(matches!(
            EncodedImage::new("h265", Vec::new()).image_format(),
            Err(DecodeError::UnsupportedFormat(f)) if f == "h265"
        ));
    }

    #[test]
    fn test_decode_png() {
        let data = png_bytes(4, 2, [1, 2, 3, 255]);
        let bitmap = decode_compressed_image("png", &data, None).unwrap();
        assert_eq!((bitmap.width(), bitmap.height()), (4, 2));
        assert_eq!(&bitmap.data()[..4], &[1, 2, 3, 255]);
    }

    #[test]
    fn test_decode_with_resize() {
        let data = png_bytes(8, 4, [9, 9, 9, 255]);
        let bitmap = decode_compressed_image("png", &data, Some(4)).unwrap();
        assert_eq!((bitmap.width(), bitmap.height()), (4, 2));
    }

    #[test]
    fn test_corrupt_payload_is_error() {
        assert!(matches!(
            decode_compressed_image("png", b"not a png", None),
            Err(DecodeError::Image(_))
        ));
    }

    #[tokio::test]
    async fn test_async_decode() {
        let data = png_bytes(2, 2, [0, 0, 255, 255]);
        let bitmap = decode_compressed_image_async(EncodedImage::new("png", data), Some(1))
            .await
            .unwrap();
        assert_eq!((bitmap.width(), bitmap.height()), (1, 1));
    }
}
