//! Decode errors
//!
//! Every error here is scoped to the single call that produced it. Callers
//! iterating a stream skip the message and continue.

/// Result alias for decode operations.
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// Errors from raw, compressed and video decoding.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Raw pixel encoding not in the supported set
    #[error("Unsupported encoding {0}")]
    UnsupportedEncoding(String),

    /// Video codec not in the supported set
    #[error("Unsupported video format {0}")]
    UnsupportedCodec(String),

    /// Compressed image format the bitmap decoder does not know
    #[error("Unsupported image format {0}")]
    UnsupportedFormat(String),

    /// Width or height is zero or too large to address
    #[error("Invalid image dimensions {width}x{height}")]
    InvalidDimensions {
        /// Declared width
        width: u32,
        /// Declared height
        height: u32,
    },

    /// Declared row step is shorter than one row of pixels
    #[error("Row step {step} is smaller than the {min} bytes of one row")]
    InvalidStep {
        /// Declared step
        step: u32,
        /// Bytes needed by one row
        min: usize,
    },

    /// Input payload shorter than the declared image
    #[error("Image data too short: need {expected} bytes, got {actual}")]
    BufferTooSmall {
        /// Bytes required
        expected: usize,
        /// Bytes provided
        actual: usize,
    },

    /// Output buffer shorter than `width * height * 4`
    #[error("Output buffer too short: need {expected} bytes, got {actual}")]
    OutputTooSmall {
        /// Bytes required
        expected: usize,
        /// Bytes provided
        actual: usize,
    },

    /// Sequence parameter set could not be parsed
    #[error("Malformed H.264 SPS: {0}")]
    MalformedSps(&'static str),

    /// Compressed image decoding failed
    #[error("Image decode failed: {0}")]
    Image(#[from] image::ImageError),

    /// The platform video decoder rejected a configuration or frame
    #[error("Video decoder error: {0}")]
    Decoder(String),

    /// A blocking decode task panicked or was cancelled
    #[error("Decode worker failed: {0}")]
    Worker(String),
}
