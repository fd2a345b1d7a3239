//! H.264 Annex-B bitstream inspection
//!
//! Frames arrive as Annex-B byte streams: NAL units separated by
//! `00 00 01` or `00 00 00 01` start codes. Two questions are answered
//! without decoding pictures:
//!
//! - is this a keyframe (does it carry an IDR slice, NAL type 5)?
//! - what decoder configuration does its SPS (NAL type 7) describe?

use crate::error::{DecodeError, DecodeResult};

/// NAL unit type of an IDR slice.
pub const NAL_IDR_SLICE: u8 = 5;

/// NAL unit type of a sequence parameter set.
pub const NAL_SPS: u8 = 7;

/// Profiles whose SPS carries chroma format and bit depth fields.
const HIGH_PROFILES: [u8; 13] = [100, 110, 122, 244, 44, 83, 86, 118, 128, 138, 139, 134, 135];

/// Largest frame size in macroblocks allowed by any H.264 level (6.2).
pub const MAX_FRAME_MBS: u32 = 139_264;

/// Parameters needed to configure a platform decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Codec string, `avc1.PPCCLL`
    pub codec: String,
    /// Coded width after cropping
    pub coded_width: u32,
    /// Coded height after cropping
    pub coded_height: u32,
}

/// Iterate the NAL units of an Annex-B stream, start codes stripped.
pub fn nal_units(data: &[u8]) -> NalUnits<'_> {
    NalUnits {
        data,
        pos: find_start_code(data, 0).map_or(data.len(), |(_, end)| end),
    }
}

/// Iterator returned by [`nal_units`].
#[derive(Debug, Clone)]
pub struct NalUnits<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for NalUnits<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        while self.pos < self.data.len() {
            let start = self.pos;
            let (end, next) = match find_start_code(self.data, start) {
                Some((code_start, code_end)) => (code_start, code_end),
                None => (self.data.len(), self.data.len()),
            };
            self.pos = next;
            let mut unit = &self.data[start..end];
            // A four-byte start code leaves its leading zero on the previous unit.
            while let [rest @ .., 0] = unit {
                unit = rest;
            }
            if !unit.is_empty() {
                return Some(unit);
            }
        }
        None
    }
}

/// `(start, end)` of the next `00 00 01` at or after `from`.
fn find_start_code(data: &[u8], from: usize) -> Option<(usize, usize)> {
    data.get(from..)?
        .windows(3)
        .position(|w| w == [0, 0, 1])
        .map(|i| (from + i, from + i + 3))
}

/// NAL unit type from the header byte.
pub fn nal_type(unit: &[u8]) -> Option<u8> {
    unit.first().map(|header| header & 0x1F)
}

/// Whether the frame contains an IDR slice.
pub fn is_keyframe(data: &[u8]) -> bool {
    nal_units(data).any(|unit| nal_type(unit) == Some(NAL_IDR_SLICE))
}

/// Decoder configuration from the first SPS in the frame.
///
/// `None` when the frame has no SPS or the SPS cannot be parsed.
pub fn parse_decoder_config(data: &[u8]) -> Option<DecoderConfig> {
    let unit = nal_units(data).find(|unit| nal_type(unit) == Some(NAL_SPS))?;
    match Sps::parse(unit) {
        Ok(sps) => Some(sps.decoder_config()),
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring unparseable SPS");
            None
        }
    }
}

/// Remove emulation prevention bytes (`00 00 03` becomes `00 00`).
pub fn unescape_rbsp(unit: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(unit.len());
    let mut zeros = 0;
    for &byte in unit {
        if zeros >= 2 && byte == 3 {
            zeros = 0;
            continue;
        }
        zeros = if byte == 0 { zeros + 1 } else { 0 };
        out.push(byte);
    }
    out
}

/// Fields of a sequence parameter set needed for decoder setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sps {
    /// `profile_idc`
    pub profile_idc: u8,
    /// Constraint flags byte
    pub constraint_flags: u8,
    /// `level_idc`
    pub level_idc: u8,
    /// `chroma_format_idc`, 1 (4:2:0) when absent
    pub chroma_format_idc: u32,
    /// Width in pixels after cropping
    pub width: u32,
    /// Height in pixels after cropping
    pub height: u32,
}

impl Sps {
    /// Parse an SPS NAL unit, header byte included.
    pub fn parse(unit: &[u8]) -> DecodeResult<Sps> {
        if nal_type(unit) != Some(NAL_SPS) {
            return Err(DecodeError::MalformedSps("not an SPS unit"));
        }
        let rbsp = unescape_rbsp(&unit[1..]);
        let mut r = BitReader::new(&rbsp);

        let profile_idc = r.read_bits(8)? as u8;
        let constraint_flags = r.read_bits(8)? as u8;
        let level_idc = r.read_bits(8)? as u8;
        r.read_ue()?; // seq_parameter_set_id

        let mut chroma_format_idc = 1;
        let mut separate_colour_plane = false;
        if HIGH_PROFILES.contains(&profile_idc) {
            chroma_format_idc = r.read_ue()?;
            if chroma_format_idc == 3 {
                separate_colour_plane = r.read_bit()?;
            }
            r.read_ue()?; // bit_depth_luma_minus8
            r.read_ue()?; // bit_depth_chroma_minus8
            r.read_bit()?; // qpprime_y_zero_transform_bypass_flag
            if r.read_bit()? {
                let lists = if chroma_format_idc == 3 { 12 } else { 8 };
                for i in 0..lists {
                    if r.read_bit()? {
                        skip_scaling_list(&mut r, if i < 6 { 16 } else { 64 })?;
                    }
                }
            }
        }

        r.read_ue()?; // log2_max_frame_num_minus4
        match r.read_ue()? {
            0 => {
                r.read_ue()?; // log2_max_pic_order_cnt_lsb_minus4
            }
            1 => {
                r.read_bit()?; // delta_pic_order_always_zero_flag
                r.read_se()?; // offset_for_non_ref_pic
                r.read_se()?; // offset_for_top_to_bottom_field
                let cycle = r.read_ue()?;
                for _ in 0..cycle {
                    r.read_se()?;
                }
            }
            _ => {}
        }
        r.read_ue()?; // max_num_ref_frames
        r.read_bit()?; // gaps_in_frame_num_value_allowed_flag

        let width_in_mbs = r.read_ue()?.saturating_add(1);
        let height_in_map_units = r.read_ue()?.saturating_add(1);
        let frame_mbs_only = r.read_bit()?;
        if !frame_mbs_only {
            r.read_bit()?; // mb_adaptive_frame_field_flag
        }
        r.read_bit()?; // direct_8x8_inference_flag

        let (mut crop_left, mut crop_right, mut crop_top, mut crop_bottom) = (0, 0, 0, 0);
        if r.read_bit()? {
            crop_left = r.read_ue()?;
            crop_right = r.read_ue()?;
            crop_top = r.read_ue()?;
            crop_bottom = r.read_ue()?;
        }

        let field_factor = if frame_mbs_only { 1 } else { 2 };
        let frame_mbs = u64::from(width_in_mbs)
            * u64::from(height_in_map_units)
            * u64::from(field_factor);
        if frame_mbs > u64::from(MAX_FRAME_MBS) {
            return Err(DecodeError::MalformedSps("frame exceeds level limits"));
        }
        let chroma_array_type = if separate_colour_plane {
            0
        } else {
            chroma_format_idc
        };
        let (crop_unit_x, crop_unit_y) = match chroma_array_type {
            0 => (1, field_factor),
            1 => (2, 2 * field_factor),
            2 => (2, field_factor),
            _ => (1, field_factor),
        };

        let full_width = width_in_mbs
            .checked_mul(16)
            .ok_or(DecodeError::MalformedSps("width overflow"))?;
        let full_height = height_in_map_units
            .checked_mul(16 * field_factor)
            .ok_or(DecodeError::MalformedSps("height overflow"))?;
        let width = crop_left
            .checked_add(crop_right)
            .and_then(|c| c.checked_mul(crop_unit_x))
            .and_then(|c| full_width.checked_sub(c))
            .ok_or(DecodeError::MalformedSps("horizontal crop exceeds width"))?;
        let height = crop_top
            .checked_add(crop_bottom)
            .and_then(|c| c.checked_mul(crop_unit_y))
            .and_then(|c| full_height.checked_sub(c))
            .ok_or(DecodeError::MalformedSps("vertical crop exceeds height"))?;
        if width == 0 || height == 0 {
            return Err(DecodeError::MalformedSps("crop leaves an empty frame"));
        }

        Ok(Sps {
            profile_idc,
            constraint_flags,
            level_idc,
            chroma_format_idc,
            width,
            height,
        })
    }

    /// `avc1.PPCCLL` codec string.
    pub fn codec_string(&self) -> String {
        format!(
            "avc1.{:02x}{:02x}{:02x}",
            self.profile_idc, self.constraint_flags, self.level_idc
        )
    }

    /// Decoder configuration described by this SPS.
    pub fn decoder_config(&self) -> DecoderConfig {
        DecoderConfig {
            codec: self.codec_string(),
            coded_width: self.width,
            coded_height: self.height,
        }
    }
}

fn skip_scaling_list(r: &mut BitReader<'_>, size: usize) -> DecodeResult<()> {
    let mut last = 8i64;
    let mut next = 8i64;
    for _ in 0..size {
        if next != 0 {
            let delta = i64::from(r.read_se()?);
            next = (last + delta).rem_euclid(256);
        }
        if next != 0 {
            last = next;
        }
    }
    Ok(())
}

/// MSB-first bit reader with exp-Golomb decoding.
struct BitReader<'a> {
    data: &'a [u8],
    bit: usize,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        BitReader { data, bit: 0 }
    }

    fn read_bit(&mut self) -> DecodeResult<bool> {
        let byte = self
            .data
            .get(self.bit / 8)
            .ok_or(DecodeError::MalformedSps("unexpected end of data"))?;
        let value = (byte >> (7 - self.bit % 8)) & 1;
        self.bit += 1;
        Ok(value == 1)
    }

    fn read_bits(&mut self, count: u32) -> DecodeResult<u32> {
        let mut value = 0u32;
        for _ in 0..count {
            value = (value << 1) | u32::from(self.read_bit()?);
        }
        Ok(value)
    }

    fn read_ue(&mut self) -> DecodeResult<u32> {
        let mut leading_zeros = 0;
        while !self.read_bit()? {
            leading_zeros += 1;
            if leading_zeros > 31 {
                return Err(DecodeError::MalformedSps("exp-Golomb code too long"));
            }
        }
        let suffix = self.read_bits(leading_zeros)?;
        Ok(((1u64 << leading_zeros) - 1 + u64::from(suffix)) as u32)
    }

    fn read_se(&mut self) -> DecodeResult<i32> {
        let code = i64::from(self.read_ue()?);
        let magnitude = (code + 1) / 2;
        let value = if code % 2 == 1 { magnitude } else { -magnitude };
        Ok(value as i32)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// MSB-first bit writer for building test bitstreams.
    #[derive(Default)]
    pub(crate) struct BitWriter {
        bytes: Vec<u8>,
        bits: usize,
    }

    impl BitWriter {
        pub(crate) fn bit(&mut self, value: bool) -> &mut Self {
            if self.bits % 8 == 0 {
                self.bytes.push(0);
            }
            if value {
                let last = self.bytes.len() - 1;
                self.bytes[last] |= 1 << (7 - self.bits % 8);
            }
            self.bits += 1;
            self
        }

        pub(crate) fn bits(&mut self, value: u32, count: u32) -> &mut Self {
            for i in (0..count).rev() {
                self.bit((value >> i) & 1 == 1);
            }
            self
        }

        pub(crate) fn ue(&mut self, value: u32) -> &mut Self {
            let coded = u64::from(value) + 1;
            let len = 64 - coded.leading_zeros();
            for _ in 0..len - 1 {
                self.bit(false);
            }
            for i in (0..len).rev() {
                self.bit((coded >> i) & 1 == 1);
            }
            self
        }

        pub(crate) fn se(&mut self, value: i32) -> &mut Self {
            let code = if value > 0 {
                (value as u32) * 2 - 1
            } else {
                (-value as u32) * 2
            };
            self.ue(code)
        }

        /// RBSP trailing bits, then emulation prevention.
        pub(crate) fn finish(&mut self) -> Vec<u8> {
            self.bit(true);
            while self.bits % 8 != 0 {
                self.bit(false);
            }
            let mut out = Vec::new();
            let mut zeros = 0;
            for &byte in &self.bytes {
                if zeros >= 2 && byte <= 3 {
                    out.push(3);
                    zeros = 0;
                }
                zeros = if byte == 0 { zeros + 1 } else { 0 };
                out.push(byte);
            }
            out
        }
    }

    /// SPS NAL unit (header included) for a 4:2:0 progressive stream.
    pub(crate) fn sps_unit(
        profile: u8,
        level: u8,
        width_mbs: u32,
        height_mbs: u32,
        crop: Option<(u32, u32, u32, u32)>,
    ) -> Vec<u8> {
        let mut w = BitWriter::default();
        w.bits(u32::from(profile), 8).bits(0, 8).bits(u32::from(level), 8);
        w.ue(0); // seq_parameter_set_id
        if HIGH_PROFILES.contains(&profile) {
            w.ue(1).ue(0).ue(0).bit(false).bit(false);
        }
        w.ue(0); // log2_max_frame_num_minus4
        w.ue(0).ue(2); // pic_order_cnt_type 0, lsb
        w.ue(1).bit(false); // max_num_ref_frames, gaps
        w.ue(width_mbs - 1).ue(height_mbs - 1);
        w.bit(true); // frame_mbs_only
        w.bit(true); // direct_8x8_inference
        match crop {
            Some((l, r, t, b)) => {
                w.bit(true).ue(l).ue(r).ue(t).ue(b);
            }
            None => {
                w.bit(false);
            }
        }
        w.bit(false); // vui_parameters_present_flag
        let mut unit = vec![0x67];
        unit.extend(w.finish());
        unit
    }

    pub(crate) fn annex_b(units: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        for unit in units {
            out.extend_from_slice(&[0, 0, 0, 1]);
            out.extend_from_slice(unit);
        }
        out
    }

    pub(crate) const IDR: &[u8] = &[0x65, 0x88, 0x84, 0x00, 0x33];
    pub(crate) const NON_IDR: &[u8] = &[0x41, 0x9a, 0x02];

    #[test]
    fn test_nal_units_split_on_both_start_codes() {
        let data = [0, 0, 0, 1, 0x67, 1, 2, 0, 0, 1, 0x68, 3, 0, 0, 0, 1, 0x65, 4];
        let units: Vec<&[u8]> = nal_units(&data).collect();
        assert_eq!(units, vec![&[0x67, 1, 2][..], &[0x68, 3], &[0x65, 4]]);
    }

    #[test]
    fn test_nal_units_without_start_code() {
        assert_eq!(nal_units(&[0x65, 1, 2]).count(), 0);
        assert_eq!(nal_units(&[]).count(), 0);
    }

    #[test]
    fn test_is_keyframe() {
        assert!(is_keyframe(&annex_b(&[NON_IDR, IDR])));
        assert!(!is_keyframe(&annex_b(&[NON_IDR])));
        assert!(!is_keyframe(&[]));
    }

    #[test]
    fn test_unescape_rbsp() {
        assert_eq!(unescape_rbsp(&[0, 0, 3, 1, 0, 0, 3]), vec![0, 0, 1, 0, 0]);
        assert_eq!(unescape_rbsp(&[1, 0, 3, 0]), vec![1, 0, 3, 0]);
    }

    #[test]
    fn test_exp_golomb_round_trip() {
        let mut w = BitWriter::default();
        for v in [0u32, 1, 2, 7, 255, 65_535] {
            w.ue(v);
        }
        for v in [0i32, 1, -1, 17, -300] {
            w.se(v);
        }
        let bytes = w.finish();
        let rbsp = unescape_rbsp(&bytes);
        let mut r = BitReader::new(&rbsp);
        for v in [0u32, 1, 2, 7, 255, 65_535] {
            assert_eq!(r.read_ue().unwrap(), v);
        }
        for v in [0i32, 1, -1, 17, -300] {
            assert_eq!(r.read_se().unwrap(), v);
        }
    }

    #[test]
    fn test_parse_baseline_sps() {
        // 1280x720: 80x45 macroblocks
        let unit = sps_unit(66, 31, 80, 45, None);
        let sps = Sps::parse(&unit).unwrap();
        assert_eq!((sps.width, sps.height), (1280, 720));
        assert_eq!(sps.codec_string(), "avc1.42001f");
    }

    #[test]
    fn test_parse_high_profile_sps_with_crop() {
        // 1920x1088 coded, cropped by 8 rows (crop unit 2) to 1080
        let unit = sps_unit(100, 40, 120, 68, Some((0, 0, 0, 4)));
        let config = parse_decoder_config(&annex_b(&[&unit, IDR])).unwrap();
        assert_eq!(config.codec, "avc1.640028");
        assert_eq!((config.coded_width, config.coded_height), (1920, 1080));
    }

    #[test]
    fn test_missing_or_truncated_sps() {
        assert!(parse_decoder_config(&annex_b(&[IDR])).is_none());
        assert!(parse_decoder_config(&annex_b(&[&[0x67, 0x42]])).is_none());
        assert!(matches!(
            Sps::parse(IDR),
            Err(DecodeError::MalformedSps(_))
        ));
    }

    #[test]
    fn test_sps_beyond_level_limits_is_rejected() {
        let huge = sps_unit(66, 30, 1 << 20, 1 << 20, None);
        assert!(matches!(
            Sps::parse(&huge),
            Err(DecodeError::MalformedSps("frame exceeds level limits"))
        ));
        assert!(parse_decoder_config(&annex_b(&[&huge, IDR])).is_none());

        // 8192x4352 is exactly 139264 macroblocks
        let largest = Sps::parse(&sps_unit(66, 62, 512, 272, None)).unwrap();
        assert_eq!((largest.width, largest.height), (8192, 4352));
    }

    #[test]
    fn test_sps_crop_to_empty_frame_is_rejected() {
        let unit = sps_unit(66, 30, 1, 1, Some((4, 4, 0, 0)));
        assert!(matches!(
            Sps::parse(&unit),
            Err(DecodeError::MalformedSps("crop leaves an empty frame"))
        ));
    }
}
