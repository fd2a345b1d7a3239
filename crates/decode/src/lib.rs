//! Media decode pipeline for logstream
//!
//! Turns image and video payloads into RGBA8 [`Bitmap`]s:
//!
//! - Raw: closed set of pixel encodings, one decoder per encoding
//! - Compressed: PNG/JPEG/BMP payloads through the `image` crate
//! - H.264: keyframe detection and SPS parsing without decoding pictures
//! - Video: per-stream decoder session over a pluggable platform decoder
//!
//! Decode errors are scoped to a single call; callers skip the message and
//! keep going.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bitmap;
pub mod compressed;
pub mod encoding;
pub mod error;
pub mod h264;
pub mod raw;
pub mod video;

pub use bitmap::{scaled_size, Bitmap, MAX_PIXELS};
pub use compressed::{decode_compressed_image, decode_compressed_image_async, EncodedImage};
pub use encoding::RawEncoding;
pub use error::{DecodeError, DecodeResult};
pub use h264::{is_keyframe, parse_decoder_config, DecoderConfig, Sps};
pub use raw::{decode_raw, decode_raw_image, RawImage, RawImageOptions};
pub use video::{
    decode_compressed_video, empty_video_frame, is_video_keyframe, video_decoder_config,
    ChunkKind, CompressedVideo, DecodedFrame, SessionState, VideoCodec, VideoDecoder,
    VideoDecoderSession, PLACEHOLDER_SIZE,
};
