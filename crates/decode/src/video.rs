//! Compressed video decoding
//!
//! A [`VideoDecoderSession`] wraps a platform decoder for one stream. Each
//! frame first drives the session's state transition: a keyframe that
//! carries an SPS configures (or reconfigures) the decoder. Until that
//! happens, [`decode_compressed_video`] returns a blank placeholder so
//! playback can continue before the first keyframe.
//!
//! Sessions take `&mut self` for every submission; one stream's frames are
//! decoded strictly in call order.

use crate::bitmap::{scaled_size, Bitmap};
use crate::error::{DecodeError, DecodeResult};
use crate::h264::{self, DecoderConfig};
use logstream_core::Timestamp;
use std::fmt;
use std::str::FromStr;

/// Placeholder edge length when neither a coded size nor a resize width is
/// known.
pub const PLACEHOLDER_SIZE: u32 = 32;

/// Supported video codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoCodec {
    /// H.264 in Annex-B framing
    H264,
}

impl FromStr for VideoCodec {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "h264" => Ok(VideoCodec::H264),
            other => Err(DecodeError::UnsupportedCodec(other.to_string())),
        }
    }
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoCodec::H264 => f.write_str("h264"),
        }
    }
}

/// One compressed video frame as recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedVideo {
    /// Presentation time of the frame
    pub timestamp: Timestamp,
    /// Coordinate frame the video was captured in
    pub frame_id: String,
    /// Encoded bitstream for this frame
    pub data: Vec<u8>,
    /// Codec name (`h264`)
    pub format: String,
}

impl CompressedVideo {
    /// Frame without a coordinate frame id.
    pub fn new(timestamp: Timestamp, format: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        CompressedVideo {
            timestamp,
            frame_id: String::new(),
            data: data.into(),
            format: format.into(),
        }
    }

    /// Parsed codec.
    pub fn codec(&self) -> DecodeResult<VideoCodec> {
        self.format.parse()
    }
}

/// Whether the frame can be decoded without earlier frames.
///
/// Frames of unknown codecs are never keyframes.
pub fn is_video_keyframe(frame: &CompressedVideo) -> bool {
    match frame.codec() {
        Ok(VideoCodec::H264) => h264::is_keyframe(&frame.data),
        Err(_) => false,
    }
}

/// Decoder configuration carried by the frame, if any.
pub fn video_decoder_config(frame: &CompressedVideo) -> Option<DecoderConfig> {
    match frame.codec() {
        Ok(VideoCodec::H264) => h264::parse_decoder_config(&frame.data),
        Err(_) => None,
    }
}

/// How a chunk is submitted to the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    /// Independently decodable
    Key,
    /// Depends on earlier chunks
    Delta,
}

/// A picture produced by a [`VideoDecoder`].
///
/// Frames may pin decoder-owned memory; `close` releases it.
pub trait DecodedFrame {
    /// Copy the picture into an RGBA8 bitmap.
    fn to_bitmap(&self) -> DecodeResult<Bitmap>;

    /// Release the frame's resources.
    fn close(self);
}

/// A platform video decoder.
pub trait VideoDecoder {
    /// Picture type produced by this decoder
    type Frame: DecodedFrame;

    /// Apply a new configuration. Called before the first frame and
    /// whenever a keyframe carries a different configuration.
    fn configure(&mut self, config: &DecoderConfig) -> DecodeResult<()>;

    /// Submit one chunk; `timestamp_micros` is relative to the stream origin.
    ///
    /// `Ok(None)` means the decoder accepted the chunk without producing a
    /// picture yet.
    fn decode(
        &mut self,
        data: &[u8],
        timestamp_micros: i64,
        kind: ChunkKind,
    ) -> DecodeResult<Option<Self::Frame>>;

    /// Coded size of the current configuration.
    fn coded_size(&self) -> Option<(u32, u32)>;

    /// Release decoder resources. The decoder may be configured again later.
    fn close(&mut self) {}
}

/// Decoder readiness.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No usable configuration seen yet
    #[default]
    Uninitialized,
    /// Decoder configured with this configuration
    Initialized(DecoderConfig),
}

/// Per-stream decoding state.
pub struct VideoDecoderSession<D: VideoDecoder> {
    decoder: D,
    state: SessionState,
    first_frame_time: Option<Timestamp>,
}

impl<D: VideoDecoder> VideoDecoderSession<D> {
    /// Uninitialized session around `decoder`.
    pub fn new(decoder: D) -> Self {
        VideoDecoderSession {
            decoder,
            state: SessionState::Uninitialized,
            first_frame_time: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Whether a configuration has been applied.
    pub fn is_initialized(&self) -> bool {
        matches!(self.state, SessionState::Initialized(_))
    }

    /// Timestamp of the first frame this session saw.
    pub fn first_frame_time(&self) -> Option<Timestamp> {
        self.first_frame_time
    }

    /// Last known coded size.
    pub fn coded_size(&self) -> Option<(u32, u32)> {
        self.decoder.coded_size().or(match &self.state {
            SessionState::Initialized(config) => Some((config.coded_width, config.coded_height)),
            SessionState::Uninitialized => None,
        })
    }

    /// The wrapped decoder.
    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Apply the state transition implied by `frame`.
    ///
    /// Records the first frame time and, for keyframes carrying a new
    /// configuration, reconfigures the decoder.
    pub fn advance(&mut self, frame: &CompressedVideo) -> DecodeResult<()> {
        self.first_frame_time.get_or_insert(frame.timestamp);
        if !is_video_keyframe(frame) {
            return Ok(());
        }
        let Some(config) = video_decoder_config(frame) else {
            return Ok(());
        };
        if matches!(&self.state, SessionState::Initialized(current) if *current == config) {
            return Ok(());
        }
        self.decoder.configure(&config)?;
        tracing::debug!(
            codec = %config.codec,
            width = config.coded_width,
            height = config.coded_height,
            "Configured video decoder"
        );
        self.state = SessionState::Initialized(config);
        Ok(())
    }

    /// Submit a chunk; nothing is submitted while uninitialized.
    pub fn decode(
        &mut self,
        data: &[u8],
        timestamp_micros: i64,
        kind: ChunkKind,
    ) -> DecodeResult<Option<D::Frame>> {
        if !self.is_initialized() {
            return Ok(None);
        }
        self.decoder.decode(data, timestamp_micros, kind)
    }

    /// Release the decoder and return to the uninitialized state.
    pub fn close(&mut self) {
        if self.is_initialized() {
            self.decoder.close();
        }
        self.state = SessionState::Uninitialized;
        self.first_frame_time = None;
    }
}

impl<D: VideoDecoder> Drop for VideoDecoderSession<D> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<D: VideoDecoder> fmt::Debug for VideoDecoderSession<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoDecoderSession")
            .field("state", &self.state)
            .field("first_frame_time", &self.first_frame_time)
            .finish()
    }
}

/// Blank bitmap for frames that cannot be shown yet.
///
/// Sized to `coded_size` when known, otherwise a square of `resize_width`
/// (or [`PLACEHOLDER_SIZE`]), then scaled to `resize_width`.
///
/// Sizes beyond [`MAX_PIXELS`](crate::MAX_PIXELS) are an error.
pub fn empty_video_frame(
    coded_size: Option<(u32, u32)>,
    resize_width: Option<u32>,
) -> DecodeResult<Bitmap> {
    let resize_width = resize_width.filter(|w| *w > 0);
    let edge = resize_width.unwrap_or(PLACEHOLDER_SIZE);
    let (width, height) = coded_size.unwrap_or((edge, edge));
    let (width, height) = scaled_size(width, height, resize_width);
    Bitmap::blank(width, height)
}

/// Decode one frame to a bitmap.
///
/// `first_frame_time` is the stream's time origin; the decoder receives
/// whole microseconds since it. The decoded picture is released as soon as
/// it has been copied.
pub fn decode_compressed_video<D: VideoDecoder>(
    session: &mut VideoDecoderSession<D>,
    frame: &CompressedVideo,
    first_frame_time: Timestamp,
    resize_width: Option<u32>,
) -> DecodeResult<Bitmap> {
    frame.codec()?;
    session.advance(frame)?;
    if !session.is_initialized() {
        return empty_video_frame(session.coded_size(), resize_width);
    }

    let timestamp_micros = micros(frame.timestamp) - micros(first_frame_time);
    let kind = if is_video_keyframe(frame) {
        ChunkKind::Key
    } else {
        ChunkKind::Delta
    };

    match session.decode(&frame.data, timestamp_micros, kind)? {
        Some(decoded) => {
            let bitmap = decoded.to_bitmap();
            decoded.close();
            bitmap?.resized(resize_width)
        }
        None => empty_video_frame(session.coded_size(), resize_width),
    }
}

fn micros(time: Timestamp) -> i64 {
    i64::try_from(time.as_micros()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::h264::tests::{annex_b, sps_unit, IDR, NON_IDR};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Log {
        configured: Vec<DecoderConfig>,
        submitted: Vec<(i64, ChunkKind)>,
        frames_closed: usize,
        decoder_closed: usize,
    }

    struct FakeFrame {
        bitmap: Bitmap,
        log: Rc<RefCell<Log>>,
    }

    impl DecodedFrame for FakeFrame {
        fn to_bitmap(&self) -> DecodeResult<Bitmap> {
            Ok(self.bitmap.clone())
        }

        fn close(self) {
            self.log.borrow_mut().frames_closed += 1;
        }
    }

    struct FakeDecoder {
        log: Rc<RefCell<Log>>,
        size: Option<(u32, u32)>,
        produce: bool,
    }

    impl VideoDecoder for FakeDecoder {
        type Frame = FakeFrame;

        fn configure(&mut self, config: &DecoderConfig) -> DecodeResult<()> {
            self.size = Some((config.coded_width, config.coded_height));
            self.log.borrow_mut().configured.push(config.clone());
            Ok(())
        }

        fn decode(
            &mut self,
            _data: &[u8],
            timestamp_micros: i64,
            kind: ChunkKind,
        ) -> DecodeResult<Option<FakeFrame>> {
            self.log.borrow_mut().submitted.push((timestamp_micros, kind));
            if !self.produce {
                return Ok(None);
            }
            let (w, h) = self.size.unwrap_or((1, 1));
            let data = [10, 20, 30, 255].repeat((w * h) as usize);
            Ok(Some(FakeFrame {
                bitmap: Bitmap::from_rgba(w, h, data)?,
                log: Rc::clone(&self.log),
            }))
        }

        fn coded_size(&self) -> Option<(u32, u32)> {
            self.size
        }

        fn close(&mut self) {
            self.size = None;
            self.log.borrow_mut().decoder_closed += 1;
        }
    }

    fn session(produce: bool) -> (VideoDecoderSession<FakeDecoder>, Rc<RefCell<Log>>) {
        let log = Rc::new(RefCell::new(Log::default()));
        let decoder = FakeDecoder {
            log: Rc::clone(&log),
            size: None,
            produce,
        };
        (VideoDecoderSession::new(decoder), log)
    }

    fn keyframe(millis: u64) -> CompressedVideo {
        // 4x2 pixels: one macroblock cropped to 4 wide, 2 high
        let sps = sps_unit(66, 30, 1, 1, Some((0, 6, 0, 7)));
        CompressedVideo::new(Timestamp::from_millis(millis), "h264", annex_b(&[&sps, IDR]))
    }

    fn delta(millis: u64) -> CompressedVideo {
        CompressedVideo::new(Timestamp::from_millis(millis), "h264", annex_b(&[NON_IDR]))
    }

    #[test]
    fn test_placeholder_before_keyframe() {
        let (mut session, log) = session(true);
        let bitmap =
            decode_compressed_video(&mut session, &delta(5), Timestamp::ZERO, Some(32)).unwrap();
        assert_eq!((bitmap.width(), bitmap.height()), (32, 32));
        assert!(bitmap.data().iter().all(|b| *b == 0));
        assert!(log.borrow().submitted.is_empty());
        assert_eq!(session.first_frame_time(), Some(Timestamp::from_millis(5)));
    }

    #[test]
    fn test_placeholder_default_size() {
        let bitmap = empty_video_frame(None, None).unwrap();
        assert_eq!((bitmap.width(), bitmap.height()), (32, 32));
        let scaled = empty_video_frame(Some((1920, 1080)), Some(64)).unwrap();
        assert_eq!((scaled.width(), scaled.height()), (64, 36));
    }

    #[test]
    fn test_keyframe_initializes_and_decodes() {
        let (mut session, log) = session(true);
        let origin = Timestamp::from_millis(1_000);

        let bitmap = decode_compressed_video(&mut session, &keyframe(1_000), origin, None).unwrap();
        assert!(session.is_initialized());
        assert_eq!((bitmap.width(), bitmap.height()), (4, 2));
        assert_eq!(&bitmap.data()[..4], &[10, 20, 30, 255]);

        decode_compressed_video(&mut session, &delta(1_033), origin, None).unwrap();

        let log = log.borrow();
        assert_eq!(log.configured.len(), 1);
        assert_eq!(log.configured[0].codec, "avc1.42001e");
        assert_eq!(
            log.submitted,
            vec![(0, ChunkKind::Key), (33_000, ChunkKind::Delta)]
        );
        assert_eq!(log.frames_closed, 2);
    }

    #[test]
    fn test_same_config_is_not_reapplied() {
        let (mut session, log) = session(true);
        session.advance(&keyframe(0)).unwrap();
        session.advance(&keyframe(10)).unwrap();
        assert_eq!(log.borrow().configured.len(), 1);
    }

    #[test]
    fn test_no_frame_falls_back_to_coded_size() {
        let (mut session, log) = session(false);
        let bitmap =
            decode_compressed_video(&mut session, &keyframe(0), Timestamp::ZERO, None).unwrap();
        assert_eq!((bitmap.width(), bitmap.height()), (4, 2));
        assert_eq!(log.borrow().frames_closed, 0);
    }

    #[test]
    fn test_oversized_sps_keyframe_falls_back_to_placeholder() {
        let (mut session, log) = session(false);
        let sps = sps_unit(66, 30, 1 << 20, 1 << 20, None);
        let frame = CompressedVideo::new(Timestamp::ZERO, "h264", annex_b(&[&sps, IDR]));

        let bitmap = decode_compressed_video(&mut session, &frame, Timestamp::ZERO, None).unwrap();
        assert!(!session.is_initialized());
        assert_eq!((bitmap.width(), bitmap.height()), (32, 32));
        assert!(log.borrow().configured.is_empty());
    }

    #[test]
    fn test_oversized_placeholder_is_error() {
        assert!(matches!(
            empty_video_frame(Some((1 << 24, 1 << 24)), None),
            Err(DecodeError::InvalidDimensions { .. })
        ));
        let (mut session, _log) = session(false);
        assert!(matches!(
            decode_compressed_video(&mut session, &delta(0), Timestamp::ZERO, Some(1 << 20)),
            Err(DecodeError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_resize_applies_to_decoded_frame() {
        let (mut session, _log) = session(true);
        let bitmap =
            decode_compressed_video(&mut session, &keyframe(0), Timestamp::ZERO, Some(2)).unwrap();
        assert_eq!((bitmap.width(), bitmap.height()), (2, 1));
    }

    #[test]
    fn test_unsupported_codec() {
        let (mut session, _log) = session(true);
        let frame = CompressedVideo::new(Timestamp::ZERO, "vp9", vec![0, 0, 1, 0x65]);
        assert!(!is_video_keyframe(&frame));
        assert!(video_decoder_config(&frame).is_none());
        assert!(matches!(
            decode_compressed_video(&mut session, &frame, Timestamp::ZERO, None),
            Err(DecodeError::UnsupportedCodec(_))
        ));
    }

    #[test]
    fn test_close_and_drop_release_decoder() {
        let (mut session, log) = session(true);
        session.advance(&keyframe(0)).unwrap();
        session.close();
        assert!(!session.is_initialized());
        assert_eq!(session.first_frame_time(), None);
        assert_eq!(log.borrow().decoder_closed, 1);

        session.advance(&keyframe(0)).unwrap();
        drop(session);
        assert_eq!(log.borrow().decoder_closed, 2);
    }
}
