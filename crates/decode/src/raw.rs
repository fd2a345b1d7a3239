//! Raw pixel decoders
//!
//! Every decoder writes RGBA8 with a fixed stride of `width * 4`. Input rows
//! may be padded: `step` is the distance between row starts in the input,
//! and `0` means rows are tightly packed.
//!
//! Only mono16 and 32FC1 read [`RawImageOptions`]; both map
//! `[min_value, max_value]` linearly onto `0..=255`.

use crate::bitmap::{rgba_len, Bitmap};
use crate::encoding::RawEncoding;
use crate::error::{DecodeError, DecodeResult};
use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Default range for mono16 images.
pub const MONO16_DEFAULT_RANGE: (f64, f64) = (0.0, 10_000.0);

/// Default range for 32FC1 images.
pub const FLOAT1C_DEFAULT_RANGE: (f64, f64) = (0.0, 1.0);

/// An uncompressed image as recorded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawImage<'a> {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Encoding string as declared by the message
    pub encoding: &'a str,
    /// Byte order of multi-byte samples
    pub is_bigendian: bool,
    /// Bytes between row starts, `0` for tightly packed rows
    pub step: u32,
    /// Pixel data
    pub data: &'a [u8],
}

impl<'a> RawImage<'a> {
    /// Tightly packed little-endian image.
    pub fn new(width: u32, height: u32, encoding: &'a str, data: &'a [u8]) -> Self {
        RawImage {
            width,
            height,
            encoding,
            is_bigendian: false,
            step: 0,
            data,
        }
    }

    /// Set the row step (builder pattern).
    pub fn with_step(mut self, step: u32) -> Self {
        self.step = step;
        self
    }

    /// Set the sample byte order (builder pattern).
    pub fn with_big_endian(mut self, is_bigendian: bool) -> Self {
        self.is_bigendian = is_bigendian;
        self
    }
}

/// Value range for normalizing decoders.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawImageOptions {
    /// Value mapped to 0
    pub min_value: Option<f64>,
    /// Value mapped to 255
    pub max_value: Option<f64>,
}

impl RawImageOptions {
    /// Explicit range.
    pub fn range(min_value: f64, max_value: f64) -> Self {
        RawImageOptions {
            min_value: Some(min_value),
            max_value: Some(max_value),
        }
    }
}

/// Decode into a freshly allocated [`Bitmap`].
pub fn decode_raw(image: &RawImage<'_>, options: &RawImageOptions) -> DecodeResult<Bitmap> {
    let len = output_len(image.width, image.height)?;
    // Input must cover every row before the output is allocated.
    Rows::new(image, image.encoding.parse()?)?;
    let mut output = vec![0u8; len];
    decode_raw_image(image, options, &mut output)?;
    Bitmap::from_rgba(image.width, image.height, output)
}

/// Decode into `output`, which must hold at least `width * height * 4` bytes.
pub fn decode_raw_image(
    image: &RawImage<'_>,
    options: &RawImageOptions,
    output: &mut [u8],
) -> DecodeResult<()> {
    let encoding: RawEncoding = image.encoding.parse()?;
    let expected = output_len(image.width, image.height)?;
    if output.len() < expected {
        return Err(DecodeError::OutputTooSmall {
            expected,
            actual: output.len(),
        });
    }
    let rows = Rows::new(image, encoding)?;
    let output = &mut output[..expected];

    match encoding {
        RawEncoding::Uyvy => decode_yuv422(&rows, output, YuvOrder::Uyvy),
        RawEncoding::Yuyv => decode_yuv422(&rows, output, YuvOrder::Yuyv),
        RawEncoding::Rgb8 => decode_packed(&rows, output, 3, [0, 1, 2], None),
        RawEncoding::Rgba8 => decode_packed(&rows, output, 4, [0, 1, 2], Some(3)),
        RawEncoding::Bgra8 => decode_packed(&rows, output, 4, [2, 1, 0], Some(3)),
        RawEncoding::Bgr8 => decode_packed(&rows, output, 3, [2, 1, 0], None),
        RawEncoding::Mono8 => decode_packed(&rows, output, 1, [0, 0, 0], None),
        RawEncoding::Mono16 => {
            let (min, max) = resolve_range(options, MONO16_DEFAULT_RANGE);
            let read: fn(&[u8]) -> u16 = if image.is_bigendian {
                BigEndian::read_u16
            } else {
                LittleEndian::read_u16
            };
            decode_normalized(&rows, output, 2, min, max, |b| f64::from(read(b)));
        }
        RawEncoding::Float1c => {
            let (min, max) = resolve_range(options, FLOAT1C_DEFAULT_RANGE);
            let read: fn(&[u8]) -> f32 = if image.is_bigendian {
                BigEndian::read_f32
            } else {
                LittleEndian::read_f32
            };
            decode_normalized(&rows, output, 4, min, max, |b| f64::from(read(b)));
        }
        RawEncoding::BayerRggb8 => decode_bayer(&rows, output, BayerPattern::RGGB),
        RawEncoding::BayerBggr8 => decode_bayer(&rows, output, BayerPattern::BGGR),
        RawEncoding::BayerGbrg8 => decode_bayer(&rows, output, BayerPattern::GBRG),
        RawEncoding::BayerGrbg8 => decode_bayer(&rows, output, BayerPattern::GRBG),
    }
    Ok(())
}

fn output_len(width: u32, height: u32) -> DecodeResult<usize> {
    if width == 0 || height == 0 {
        return Err(DecodeError::InvalidDimensions { width, height });
    }
    rgba_len(width, height)
}

fn resolve_range(options: &RawImageOptions, defaults: (f64, f64)) -> (f64, f64) {
    (
        options.min_value.unwrap_or(defaults.0),
        options.max_value.unwrap_or(defaults.1),
    )
}

/// Validated view of the input rows.
struct Rows<'a> {
    data: &'a [u8],
    width: usize,
    height: usize,
    step: usize,
    row_bytes: usize,
}

impl<'a> Rows<'a> {
    fn new(image: &RawImage<'a>, encoding: RawEncoding) -> DecodeResult<Self> {
        let width = image.width as usize;
        let height = image.height as usize;
        let row_bytes = encoding.row_bytes(width);
        let step = if image.step == 0 {
            row_bytes
        } else {
            image.step as usize
        };
        if step < row_bytes {
            return Err(DecodeError::InvalidStep {
                step: image.step,
                min: row_bytes,
            });
        }
        // The last row does not need trailing padding.
        let expected = step
            .checked_mul(height - 1)
            .and_then(|n| n.checked_add(row_bytes))
            .ok_or(DecodeError::InvalidDimensions {
                width: image.width,
                height: image.height,
            })?;
        if image.data.len() < expected {
            return Err(DecodeError::BufferTooSmall {
                expected,
                actual: image.data.len(),
            });
        }
        Ok(Rows {
            data: image.data,
            width,
            height,
            step,
            row_bytes,
        })
    }

    fn row(&self, y: usize) -> &'a [u8] {
        let start = y * self.step;
        &self.data[start..start + self.row_bytes]
    }
}

fn clamp_u8(value: f64) -> u8 {
    if value.is_nan() {
        0
    } else {
        value.round().clamp(0.0, 255.0) as u8
    }
}

fn decode_packed(
    rows: &Rows<'_>,
    output: &mut [u8],
    channels: usize,
    rgb: [usize; 3],
    alpha: Option<usize>,
) {
    for y in 0..rows.height {
        let src = rows.row(y);
        let dst = &mut output[y * rows.width * 4..(y + 1) * rows.width * 4];
        for (px, out) in src.chunks_exact(channels).zip(dst.chunks_exact_mut(4)) {
            out[0] = px[rgb[0]];
            out[1] = px[rgb[1]];
            out[2] = px[rgb[2]];
            out[3] = alpha.map_or(255, |a| px[a]);
        }
    }
}

fn decode_normalized(
    rows: &Rows<'_>,
    output: &mut [u8],
    sample_bytes: usize,
    min: f64,
    max: f64,
    read: impl Fn(&[u8]) -> f64,
) {
    let range = max - min;
    for y in 0..rows.height {
        let src = rows.row(y);
        let dst = &mut output[y * rows.width * 4..(y + 1) * rows.width * 4];
        for (sample, out) in src.chunks_exact(sample_bytes).zip(dst.chunks_exact_mut(4)) {
            let value = read(sample);
            let scaled = if range != 0.0 {
                (value - min) / range * 255.0
            } else if value > min {
                255.0
            } else {
                0.0
            };
            let v = clamp_u8(scaled);
            out.copy_from_slice(&[v, v, v, 255]);
        }
    }
}

#[derive(Clone, Copy)]
enum YuvOrder {
    Uyvy,
    Yuyv,
}

fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let y = f64::from(y);
    let u = f64::from(u) - 128.0;
    let v = f64::from(v) - 128.0;
    [
        clamp_u8(y + 1.402 * v),
        clamp_u8(y - 0.34414 * u - 0.71414 * v),
        clamp_u8(y + 1.772 * u),
    ]
}

fn decode_yuv422(rows: &Rows<'_>, output: &mut [u8], order: YuvOrder) {
    for y in 0..rows.height {
        let src = rows.row(y);
        let dst = &mut output[y * rows.width * 4..(y + 1) * rows.width * 4];
        for (x, out) in dst.chunks_exact_mut(4).enumerate() {
            let pair = &src[(x / 2) * 4..(x / 2) * 4 + 4];
            let second = x % 2 == 1;
            let (luma, u, v) = match order {
                YuvOrder::Uyvy => (if second { pair[3] } else { pair[1] }, pair[0], pair[2]),
                YuvOrder::Yuyv => (if second { pair[2] } else { pair[0] }, pair[1], pair[3]),
            };
            let [r, g, b] = yuv_to_rgb(luma, u, v);
            out.copy_from_slice(&[r, g, b, 255]);
        }
    }
}

/// Positions within a 2x2 Bayer tile as `(dx, dy)`.
struct BayerPattern {
    red: (usize, usize),
    blue: (usize, usize),
    green_top: (usize, usize),
    green_bottom: (usize, usize),
}

impl BayerPattern {
    const RGGB: BayerPattern = BayerPattern {
        red: (0, 0),
        blue: (1, 1),
        green_top: (1, 0),
        green_bottom: (0, 1),
    };
    const BGGR: BayerPattern = BayerPattern {
        red: (1, 1),
        blue: (0, 0),
        green_top: (1, 0),
        green_bottom: (0, 1),
    };
    const GBRG: BayerPattern = BayerPattern {
        red: (0, 1),
        blue: (1, 0),
        green_top: (0, 0),
        green_bottom: (1, 1),
    };
    const GRBG: BayerPattern = BayerPattern {
        red: (1, 0),
        blue: (0, 1),
        green_top: (0, 0),
        green_bottom: (1, 1),
    };
}

/// Each 2x2 tile becomes four pixels sharing its red and blue samples;
/// each row of the tile takes the green sample from that row. Tiles cut off
/// by an odd width or height reuse the nearest sample.
fn decode_bayer(rows: &Rows<'_>, output: &mut [u8], pattern: BayerPattern) {
    let sample = |tx: usize, ty: usize, (dx, dy): (usize, usize)| {
        let x = (tx + dx).min(rows.width - 1);
        let y = (ty + dy).min(rows.height - 1);
        rows.row(y)[x]
    };
    for y in 0..rows.height {
        let ty = y & !1;
        let green = if y == ty {
            pattern.green_top
        } else {
            pattern.green_bottom
        };
        let dst = &mut output[y * rows.width * 4..(y + 1) * rows.width * 4];
        for (x, out) in dst.chunks_exact_mut(4).enumerate() {
            let tx = x & !1;
            out.copy_from_slice(&[
                sample(tx, ty, pattern.red),
                sample(tx, ty, green),
                sample(tx, ty, pattern.blue),
                255,
            ]);
        }
    }
}
