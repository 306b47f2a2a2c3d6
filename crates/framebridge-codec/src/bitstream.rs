//! H.264 Annex B bitstream parsing.
//!
//! Covers what the pipeline needs from the bitstream: NAL unit
//! classification (IDR vs delta), SPS geometry for decode-side
//! reconfiguration, VUI color description, and slice-header QP
//! extraction against the active parameter sets.

use bytes::Bytes;
use tracing::trace;

use framebridge_gpu::Size;

/// NAL unit types relevant to this pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NalUnitType {
    /// Non-IDR slice (delta frame).
    NonIdrSlice,
    /// IDR slice (key frame).
    IdrSlice,
    /// Supplemental enhancement information.
    Sei,
    /// Sequence parameter set.
    Sps,
    /// Picture parameter set.
    Pps,
    /// Access unit delimiter.
    Aud,
    /// Anything else.
    Other,
}

impl From<u8> for NalUnitType {
    fn from(header: u8) -> Self {
        match header & 0x1f {
            1 => NalUnitType::NonIdrSlice,
            5 => NalUnitType::IdrSlice,
            6 => NalUnitType::Sei,
            7 => NalUnitType::Sps,
            8 => NalUnitType::Pps,
            9 => NalUnitType::Aud,
            _ => NalUnitType::Other,
        }
    }
}

/// A NAL unit split out of an Annex B stream (start code stripped,
/// header byte retained).
#[derive(Debug, Clone)]
pub struct NalUnit {
    pub nal_type: NalUnitType,
    /// `nal_ref_idc` from the header; zero means non-reference.
    pub ref_idc: u8,
    pub data: Bytes,
}

/// Split an Annex B stream on its 3- or 4-byte start codes.
pub fn split_annex_b(data: &[u8]) -> Vec<NalUnit> {
    let mut nals = Vec::new();
    let mut offset = 0;

    while let Some(start) = find_start_code(data, offset) {
        let payload_start = start.0 + start.1;
        let payload_end = find_start_code(data, payload_start)
            .map(|next| next.0)
            .unwrap_or(data.len());

        if payload_start < payload_end {
            let header = data[payload_start];
            nals.push(NalUnit {
                nal_type: NalUnitType::from(header),
                ref_idc: (header >> 5) & 0x3,
                data: Bytes::copy_from_slice(&data[payload_start..payload_end]),
            });
        }
        offset = payload_end;
    }

    nals
}

/// Locate the next start code at or after `from`. Returns the start
/// code's offset and length.
fn find_start_code(data: &[u8], from: usize) -> Option<(usize, usize)> {
    let mut i = from;
    while i + 3 <= data.len() {
        if data[i] == 0 && data[i + 1] == 0 {
            if data[i + 2] == 1 {
                return Some((i, 3));
            }
            if i + 4 <= data.len() && data[i + 2] == 0 && data[i + 3] == 1 {
                return Some((i, 4));
            }
        }
        i += 1;
    }
    None
}

/// Strip emulation-prevention bytes (00 00 03 -> 00 00) from a NAL
/// payload, yielding the raw byte sequence payload.
pub fn rbsp_from_payload(payload: &[u8]) -> Vec<u8> {
    let mut rbsp = Vec::with_capacity(payload.len());
    let mut zeros = 0usize;
    for &byte in payload {
        if zeros >= 2 && byte == 3 {
            zeros = 0;
            continue;
        }
        zeros = if byte == 0 { zeros + 1 } else { 0 };
        rbsp.push(byte);
    }
    rbsp
}

/// MSB-first bit reader over an RBSP.
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn read_bit(&mut self) -> Option<u32> {
        let byte = *self.data.get(self.pos / 8)?;
        let bit = (byte >> (7 - self.pos % 8)) & 1;
        self.pos += 1;
        Some(bit as u32)
    }

    pub fn read_bits(&mut self, count: u32) -> Option<u32> {
        debug_assert!(count <= 32);
        let mut value = 0u32;
        for _ in 0..count {
            value = (value << 1) | self.read_bit()?;
        }
        Some(value)
    }

    /// Unsigned exp-Golomb.
    pub fn ue(&mut self) -> Option<u32> {
        let mut zeros = 0u32;
        while self.read_bit()? == 0 {
            zeros += 1;
            if zeros > 31 {
                return None;
            }
        }
        let suffix = self.read_bits(zeros)?;
        Some((1u32 << zeros) - 1 + suffix)
    }

    /// Signed exp-Golomb.
    pub fn se(&mut self) -> Option<i32> {
        let k = self.ue()?;
        if k % 2 == 1 {
            Some((k / 2 + 1) as i32)
        } else {
            Some(-((k / 2) as i32))
        }
    }
}

/// VUI video-signal color description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorDescription {
    pub full_range: bool,
    pub primaries: u8,
    pub transfer: u8,
    pub matrix: u8,
}

/// Fields of a sequence parameter set this pipeline consumes.
#[derive(Debug, Clone)]
pub struct SpsInfo {
    pub profile_idc: u8,
    pub constraint_flags: u8,
    pub level_idc: u8,
    pub id: u32,
    pub chroma_format_idc: u32,
    pub separate_colour_plane: bool,
    pub log2_max_frame_num: u32,
    pub pic_order_cnt_type: u32,
    pub log2_max_pic_order_cnt_lsb: u32,
    pub delta_pic_order_always_zero: bool,
    pub frame_mbs_only: bool,
    pub size: Size,
    pub color: Option<ColorDescription>,
}

const HIGH_PROFILE_IDCS: &[u8] = &[100, 110, 122, 244, 44, 83, 86, 118, 128, 138, 139, 134, 135];

/// Parse an SPS RBSP (header byte already removed).
pub fn parse_sps(rbsp: &[u8]) -> Option<SpsInfo> {
    let mut r = BitReader::new(rbsp);

    let profile_idc = r.read_bits(8)? as u8;
    let constraint_flags = r.read_bits(8)? as u8;
    let level_idc = r.read_bits(8)? as u8;
    let id = r.ue()?;

    let mut chroma_format_idc = 1;
    let mut separate_colour_plane = false;
    if HIGH_PROFILE_IDCS.contains(&profile_idc) {
        chroma_format_idc = r.ue()?;
        if chroma_format_idc == 3 {
            separate_colour_plane = r.read_bit()? == 1;
        }
        r.ue()?; // bit_depth_luma_minus8
        r.ue()?; // bit_depth_chroma_minus8
        r.read_bit()?; // qpprime_y_zero_transform_bypass
        if r.read_bit()? == 1 {
            let lists = if chroma_format_idc == 3 { 12 } else { 8 };
            for i in 0..lists {
                if r.read_bit()? == 1 {
                    skip_scaling_list(&mut r, if i < 6 { 16 } else { 64 })?;
                }
            }
        }
    }

    let log2_max_frame_num = r.ue()? + 4;
    let pic_order_cnt_type = r.ue()?;
    let mut log2_max_pic_order_cnt_lsb = 0;
    let mut delta_pic_order_always_zero = false;
    match pic_order_cnt_type {
        0 => log2_max_pic_order_cnt_lsb = r.ue()? + 4,
        1 => {
            delta_pic_order_always_zero = r.read_bit()? == 1;
            r.se()?; // offset_for_non_ref_pic
            r.se()?; // offset_for_top_to_bottom_field
            let cycle = r.ue()?;
            for _ in 0..cycle {
                r.se()?;
            }
        }
        _ => {}
    }

    r.ue()?; // max_num_ref_frames
    r.read_bit()?; // gaps_in_frame_num_value_allowed

    let pic_width_in_mbs = r.ue()? + 1;
    let pic_height_in_map_units = r.ue()? + 1;
    let frame_mbs_only = r.read_bit()? == 1;
    if !frame_mbs_only {
        r.read_bit()?; // mb_adaptive_frame_field
    }
    r.read_bit()?; // direct_8x8_inference

    let mut crop = (0u32, 0u32, 0u32, 0u32);
    if r.read_bit()? == 1 {
        crop = (r.ue()?, r.ue()?, r.ue()?, r.ue()?);
    }

    let mut color = None;
    if r.read_bit()? == 1 {
        color = parse_vui_color(&mut r)?;
    }

    let frame_height_factor = if frame_mbs_only { 1 } else { 2 };
    let mut width = pic_width_in_mbs * 16;
    let mut height = frame_height_factor * pic_height_in_map_units * 16;

    // Crop offsets are in chroma sample units that depend on the
    // sampling structure.
    let (crop_unit_x, crop_unit_y) = if separate_colour_plane || chroma_format_idc == 0 {
        (1, frame_height_factor)
    } else {
        let sub_width = if chroma_format_idc == 3 { 1 } else { 2 };
        let sub_height = if chroma_format_idc == 1 { 2 } else { 1 };
        (sub_width, sub_height * frame_height_factor)
    };
    width = width.checked_sub((crop.0 + crop.1) * crop_unit_x)?;
    height = height.checked_sub((crop.2 + crop.3) * crop_unit_y)?;

    Some(SpsInfo {
        profile_idc,
        constraint_flags,
        level_idc,
        id,
        chroma_format_idc,
        separate_colour_plane,
        log2_max_frame_num,
        pic_order_cnt_type,
        log2_max_pic_order_cnt_lsb,
        delta_pic_order_always_zero,
        frame_mbs_only,
        size: Size::new(width, height),
        color,
    })
}

fn skip_scaling_list(r: &mut BitReader<'_>, entries: u32) -> Option<()> {
    let mut last_scale = 8i32;
    let mut next_scale = 8i32;
    for _ in 0..entries {
        if next_scale != 0 {
            let delta = r.se()?;
            next_scale = (last_scale + delta + 256) % 256;
        }
        if next_scale != 0 {
            last_scale = next_scale;
        }
    }
    Some(())
}

/// Parse the VUI up through the video-signal description, which is all
/// this pipeline consumes.
fn parse_vui_color(r: &mut BitReader<'_>) -> Option<Option<ColorDescription>> {
    if r.read_bit()? == 1 {
        // aspect_ratio_info
        let idc = r.read_bits(8)?;
        if idc == 255 {
            r.read_bits(16)?;
            r.read_bits(16)?;
        }
    }
    if r.read_bit()? == 1 {
        r.read_bit()?; // overscan_appropriate
    }
    if r.read_bit()? == 0 {
        return Some(None);
    }

    r.read_bits(3)?; // video_format
    let full_range = r.read_bit()? == 1;
    if r.read_bit()? == 1 {
        Some(Some(ColorDescription {
            full_range,
            primaries: r.read_bits(8)? as u8,
            transfer: r.read_bits(8)? as u8,
            matrix: r.read_bits(8)? as u8,
        }))
    } else {
        // Signaled range without explicit primaries: unspecified (2).
        Some(Some(ColorDescription {
            full_range,
            primaries: 2,
            transfer: 2,
            matrix: 2,
        }))
    }
}

/// Fields of a picture parameter set needed for slice parsing.
#[derive(Debug, Clone)]
pub struct PpsInfo {
    pub id: u32,
    pub sps_id: u32,
    pub entropy_coding_mode: bool,
    pub bottom_field_pic_order_in_frame_present: bool,
    pub num_ref_idx_l0_default: u32,
    pub num_ref_idx_l1_default: u32,
    pub weighted_pred: bool,
    pub weighted_bipred_idc: u32,
    pub pic_init_qp_minus26: i32,
    pub redundant_pic_cnt_present: bool,
}

/// Parse a PPS RBSP (header byte already removed). Slice-group streams
/// are not supported and yield `None`.
pub fn parse_pps(rbsp: &[u8]) -> Option<PpsInfo> {
    let mut r = BitReader::new(rbsp);

    let id = r.ue()?;
    let sps_id = r.ue()?;
    let entropy_coding_mode = r.read_bit()? == 1;
    let bottom_field_pic_order_in_frame_present = r.read_bit()? == 1;
    if r.ue()? != 0 {
        // num_slice_groups_minus1 > 0: FMO streams are out of scope.
        return None;
    }
    let num_ref_idx_l0_default = r.ue()? + 1;
    let num_ref_idx_l1_default = r.ue()? + 1;
    let weighted_pred = r.read_bit()? == 1;
    let weighted_bipred_idc = r.read_bits(2)?;
    let pic_init_qp_minus26 = r.se()?;
    r.se()?; // pic_init_qs_minus26
    r.se()?; // chroma_qp_index_offset
    r.read_bit()?; // deblocking_filter_control_present
    r.read_bit()?; // constrained_intra_pred
    let redundant_pic_cnt_present = r.read_bit()? == 1;

    Some(PpsInfo {
        id,
        sps_id,
        entropy_coding_mode,
        bottom_field_pic_order_in_frame_present,
        num_ref_idx_l0_default,
        num_ref_idx_l1_default,
        weighted_pred,
        weighted_bipred_idc,
        pic_init_qp_minus26,
        redundant_pic_cnt_present,
    })
}

/// Key/delta classification of an encoded access unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Key,
    Delta,
}

/// Classify an access unit by its first slice NAL.
pub fn classify_access_unit(annex_b: &[u8]) -> FrameKind {
    for nal in split_annex_b(annex_b) {
        match nal.nal_type {
            NalUnitType::IdrSlice => return FrameKind::Key,
            NalUnitType::NonIdrSlice => return FrameKind::Delta,
            _ => {}
        }
    }
    FrameKind::Delta
}

/// The coded resolution signaled by the access unit's SPS, if present.
pub fn resolution_from_access_unit(annex_b: &[u8]) -> Option<Size> {
    split_annex_b(annex_b)
        .iter()
        .find(|nal| nal.nal_type == NalUnitType::Sps)
        .and_then(|nal| parse_sps(&rbsp_from_payload(&nal.data[1..])))
        .map(|sps| sps.size)
}

/// Tracks active parameter sets across access units and extracts the
/// most recent slice QP.
#[derive(Default)]
pub struct BitstreamTracker {
    sps: Option<SpsInfo>,
    pps: Option<PpsInfo>,
    last_slice_qp: Option<i32>,
}

impl BitstreamTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one access unit through the tracker.
    pub fn process(&mut self, annex_b: &[u8]) {
        for nal in split_annex_b(annex_b) {
            match nal.nal_type {
                NalUnitType::Sps => {
                    self.sps = parse_sps(&rbsp_from_payload(&nal.data[1..]));
                }
                NalUnitType::Pps => {
                    self.pps = parse_pps(&rbsp_from_payload(&nal.data[1..]));
                }
                NalUnitType::NonIdrSlice | NalUnitType::IdrSlice => {
                    match self.parse_slice_qp(&nal) {
                        Some(qp) => self.last_slice_qp = Some(qp),
                        None => trace!(nal_type = ?nal.nal_type, "Slice QP parse failed"),
                    }
                }
                _ => {}
            }
        }
    }

    /// QP of the most recently parsed slice.
    pub fn last_slice_qp(&self) -> Option<i32> {
        self.last_slice_qp
    }

    /// The active SPS.
    pub fn sps(&self) -> Option<&SpsInfo> {
        self.sps.as_ref()
    }

    /// Color description from the active SPS's VUI.
    pub fn color(&self) -> Option<ColorDescription> {
        self.sps.as_ref().and_then(|sps| sps.color)
    }

    /// Walk a slice header far enough to read `slice_qp_delta`.
    fn parse_slice_qp(&self, nal: &NalUnit) -> Option<i32> {
        let sps = self.sps.as_ref()?;
        let pps = self.pps.as_ref()?;
        let is_idr = nal.nal_type == NalUnitType::IdrSlice;
        let rbsp = rbsp_from_payload(&nal.data[1..]);
        let mut r = BitReader::new(&rbsp);

        r.ue()?; // first_mb_in_slice
        let slice_type = r.ue()? % 5; // 0 P, 1 B, 2 I, 3 SP, 4 SI
        r.ue()?; // pic_parameter_set_id
        if sps.separate_colour_plane {
            r.read_bits(2)?; // colour_plane_id
        }
        r.read_bits(sps.log2_max_frame_num)?; // frame_num

        let mut field_pic = false;
        if !sps.frame_mbs_only {
            field_pic = r.read_bit()? == 1;
            if field_pic {
                r.read_bit()?; // bottom_field_flag
            }
        }
        if is_idr {
            r.ue()?; // idr_pic_id
        }

        match sps.pic_order_cnt_type {
            0 => {
                r.read_bits(sps.log2_max_pic_order_cnt_lsb)?;
                if pps.bottom_field_pic_order_in_frame_present && !field_pic {
                    r.se()?; // delta_pic_order_cnt_bottom
                }
            }
            1 if !sps.delta_pic_order_always_zero => {
                r.se()?;
                if pps.bottom_field_pic_order_in_frame_present && !field_pic {
                    r.se()?;
                }
            }
            _ => {}
        }

        if pps.redundant_pic_cnt_present {
            r.ue()?; // redundant_pic_cnt
        }

        let is_p = slice_type == 0 || slice_type == 3;
        let is_b = slice_type == 1;
        let mut num_ref_l0 = pps.num_ref_idx_l0_default;
        let mut num_ref_l1 = pps.num_ref_idx_l1_default;

        if is_b {
            r.read_bit()?; // direct_spatial_mv_pred
        }
        if is_p || is_b {
            if r.read_bit()? == 1 {
                num_ref_l0 = r.ue()? + 1;
                if is_b {
                    num_ref_l1 = r.ue()? + 1;
                }
            }
        }

        if slice_type != 2 && slice_type != 4 {
            skip_ref_pic_list_modification(&mut r)?;
        }
        if is_b {
            skip_ref_pic_list_modification(&mut r)?;
        }

        let chroma_array_type = if sps.separate_colour_plane {
            0
        } else {
            sps.chroma_format_idc
        };
        if (pps.weighted_pred && is_p) || (pps.weighted_bipred_idc == 1 && is_b) {
            skip_pred_weight_table(
                &mut r,
                chroma_array_type,
                num_ref_l0,
                if is_b { num_ref_l1 } else { 0 },
            )?;
        }

        if nal.ref_idc != 0 {
            skip_dec_ref_pic_marking(&mut r, is_idr)?;
        }

        if pps.entropy_coding_mode && slice_type != 2 && slice_type != 4 {
            r.ue()?; // cabac_init_idc
        }

        let slice_qp_delta = r.se()?;
        Some(26 + pps.pic_init_qp_minus26 + slice_qp_delta)
    }
}

fn skip_ref_pic_list_modification(r: &mut BitReader<'_>) -> Option<()> {
    if r.read_bit()? == 0 {
        return Some(());
    }
    loop {
        let idc = r.ue()?;
        match idc {
            0 | 1 => {
                r.ue()?; // abs_diff_pic_num_minus1
            }
            2 => {
                r.ue()?; // long_term_pic_num
            }
            3 => return Some(()),
            _ => return None,
        }
    }
}

fn skip_pred_weight_table(
    r: &mut BitReader<'_>,
    chroma_array_type: u32,
    num_ref_l0: u32,
    num_ref_l1: u32,
) -> Option<()> {
    r.ue()?; // luma_log2_weight_denom
    if chroma_array_type != 0 {
        r.ue()?; // chroma_log2_weight_denom
    }
    for count in [num_ref_l0, num_ref_l1] {
        for _ in 0..count {
            if r.read_bit()? == 1 {
                r.se()?;
                r.se()?;
            }
            if chroma_array_type != 0 && r.read_bit()? == 1 {
                for _ in 0..4 {
                    r.se()?;
                }
            }
        }
    }
    Some(())
}

fn skip_dec_ref_pic_marking(r: &mut BitReader<'_>, is_idr: bool) -> Option<()> {
    if is_idr {
        r.read_bit()?; // no_output_of_prior_pics
        r.read_bit()?; // long_term_reference
        return Some(());
    }
    if r.read_bit()? == 0 {
        return Some(());
    }
    loop {
        let op = r.ue()?;
        if op == 0 {
            return Some(());
        }
        if op == 1 || op == 3 {
            r.ue()?;
        }
        if op == 2 {
            r.ue()?;
        }
        if op == 3 || op == 6 {
            r.ue()?;
        }
        if op == 4 {
            r.ue()?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{annex_b, build_access_unit, build_pps, build_slice, build_sps};

    #[test]
    fn test_split_annex_b_mixed_start_codes() {
        let data = [
            0x00, 0x00, 0x01, 0x67, 0x42, 0x00, 0x1e, // SPS, 3-byte code
            0x00, 0x00, 0x00, 0x01, 0x68, 0xce, 0x3c, 0x80, // PPS, 4-byte code
        ];
        let nals = split_annex_b(&data);
        assert_eq!(nals.len(), 2);
        assert_eq!(nals[0].nal_type, NalUnitType::Sps);
        assert_eq!(nals[0].ref_idc, 3);
        assert_eq!(nals[1].nal_type, NalUnitType::Pps);
    }

    #[test]
    fn test_rbsp_strips_emulation_prevention() {
        assert_eq!(
            rbsp_from_payload(&[0x00, 0x00, 0x03, 0x01, 0x00, 0x00, 0x03, 0x00]),
            vec![0x00, 0x00, 0x01, 0x00, 0x00, 0x00]
        );
        // A lone 0x03 is data, not an escape.
        assert_eq!(rbsp_from_payload(&[0x01, 0x03, 0x02]), vec![0x01, 0x03, 0x02]);
    }

    #[test]
    fn test_exp_golomb_values() {
        // ue bitstrings: 1 -> 0, 010 -> 1, 011 -> 2, 00100 -> 3.
        let data = [0b1_010_011_0, 0b0100_0000];
        let mut r = BitReader::new(&data);
        assert_eq!(r.ue(), Some(0));
        assert_eq!(r.ue(), Some(1));
        assert_eq!(r.ue(), Some(2));
        assert_eq!(r.ue(), Some(3));
    }

    #[test]
    fn test_signed_exp_golomb_alternates() {
        // se mapping: k=1 -> 1, k=2 -> -1, k=3 -> 2, k=4 -> -2.
        let data = [0b010_011_00, 0b100_00101_u8];
        let mut r = BitReader::new(&data);
        assert_eq!(r.se(), Some(1));
        assert_eq!(r.se(), Some(-1));
        assert_eq!(r.se(), Some(2));
        assert_eq!(r.se(), Some(-2));
    }

    #[test]
    fn test_parse_sps_resolution() {
        let sps_nal = build_sps(Size::new(1280, 720), None);
        let sps = parse_sps(&rbsp_from_payload(&sps_nal[1..])).unwrap();
        assert_eq!(sps.size, Size::new(1280, 720));
        assert_eq!(sps.profile_idc, 66);
        assert!(sps.frame_mbs_only);
        assert!(sps.color.is_none());
    }

    #[test]
    fn test_parse_sps_color_description() {
        let sps_nal = build_sps(Size::new(640, 360), Some((true, 1, 1, 1)));
        let sps = parse_sps(&rbsp_from_payload(&sps_nal[1..])).unwrap();
        let color = sps.color.unwrap();
        assert!(color.full_range);
        assert_eq!(color.primaries, 1);
        assert_eq!(color.matrix, 1);
    }

    #[test]
    fn test_parse_pps_qp_seed() {
        let pps_nal = build_pps();
        let pps = parse_pps(&rbsp_from_payload(&pps_nal[1..])).unwrap();
        assert_eq!(pps.pic_init_qp_minus26, 0);
        assert!(!pps.entropy_coding_mode);
    }

    #[test]
    fn test_classify_idr_and_delta() {
        let key = build_access_unit(true, 28, Size::new(640, 360), 0);
        let delta = build_access_unit(false, 30, Size::new(640, 360), 1);
        assert_eq!(classify_access_unit(&key), FrameKind::Key);
        assert_eq!(classify_access_unit(&delta), FrameKind::Delta);
    }

    #[test]
    fn test_tracker_extracts_slice_qp() {
        let mut tracker = BitstreamTracker::new();
        tracker.process(&build_access_unit(true, 28, Size::new(640, 360), 0));
        assert_eq!(tracker.last_slice_qp(), Some(28));

        tracker.process(&build_access_unit(false, 35, Size::new(640, 360), 1));
        assert_eq!(tracker.last_slice_qp(), Some(35));
    }

    #[test]
    fn test_tracker_requires_parameter_sets_before_slices() {
        let mut tracker = BitstreamTracker::new();
        let slice = build_slice(false, 30, 1);
        tracker.process(&annex_b(&[&slice]));
        assert_eq!(tracker.last_slice_qp(), None);
    }

    #[test]
    fn test_resolution_from_access_unit() {
        let au = build_access_unit(true, 28, Size::new(1920, 1080), 0);
        assert_eq!(
            resolution_from_access_unit(&au),
            Some(Size::new(1920, 1080))
        );

        let delta = build_access_unit(false, 28, Size::new(1920, 1080), 1);
        assert_eq!(resolution_from_access_unit(&delta), None);
    }
}
