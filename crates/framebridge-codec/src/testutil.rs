//! Shared test fixtures: a bit writer for synthetic H.264 payloads and
//! in-memory codec/graphics devices.

use std::any::Any;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;

use framebridge_gpu::{
    BufferHandle, GpuResult, GraphicsDevice, I420Buffer, NativeTexture, PixelFormat, Size, Texture,
    VideoFrameAdapter, VideoFramePool,
};

use crate::bitstream::resolution_from_access_unit;
use crate::decoder::{DecodedFrame, DecodedFrameSink};
use crate::encoder::{EncodedAccessUnit, EncodedFrameSink};
use crate::level::{H264Level, H264Profile};
use crate::session::{
    CodecDevice, DecodePoll, DecodeSession, DecodeSessionConfig, DecodedSurface, EncodeSession,
    EncodeSessionConfig, EncodedOutput, SessionError, SessionRateParams,
};
use crate::settings::{VideoCodecKind, VideoEncoderSettings};

// ---------------------------------------------------------------------
// Bit writer and synthetic NAL builders
// ---------------------------------------------------------------------

/// MSB-first bit writer producing emulation-prevented NAL payloads.
pub(crate) struct BitWriter {
    bits: Vec<u8>,
}

impl BitWriter {
    pub fn new() -> Self {
        Self { bits: Vec::new() }
    }

    pub fn put_bit(&mut self, bit: u32) {
        self.bits.push((bit & 1) as u8);
    }

    pub fn put_bits(&mut self, value: u32, count: u32) {
        for shift in (0..count).rev() {
            self.put_bit((value >> shift) & 1);
        }
    }

    pub fn put_ue(&mut self, value: u32) {
        let coded = value + 1;
        let width = 32 - coded.leading_zeros();
        for _ in 0..width - 1 {
            self.put_bit(0);
        }
        self.put_bits(coded, width);
    }

    pub fn put_se(&mut self, value: i32) {
        let coded = if value > 0 {
            (value as u32) * 2 - 1
        } else {
            (-value as u32) * 2
        };
        self.put_ue(coded);
    }

    /// Close the RBSP (stop bit + alignment) and insert emulation
    /// prevention bytes.
    pub fn finish_rbsp(mut self) -> Vec<u8> {
        self.put_bit(1);
        while self.bits.len() % 8 != 0 {
            self.put_bit(0);
        }

        let mut packed = Vec::with_capacity(self.bits.len() / 8);
        for chunk in self.bits.chunks(8) {
            let mut byte = 0u8;
            for &bit in chunk {
                byte = (byte << 1) | bit;
            }
            packed.push(byte);
        }

        let mut escaped = Vec::with_capacity(packed.len());
        let mut zeros = 0usize;
        for byte in packed {
            if zeros >= 2 && byte <= 3 {
                escaped.push(3);
                zeros = 0;
            }
            escaped.push(byte);
            zeros = if byte == 0 { zeros + 1 } else { 0 };
        }
        escaped
    }
}

/// Baseline-profile SPS with optional VUI color description
/// `(full_range, primaries, transfer, matrix)`. Dimensions must be
/// even; non-macroblock-aligned sizes are expressed with crop offsets.
pub(crate) fn build_sps(size: Size, color: Option<(bool, u8, u8, u8)>) -> Vec<u8> {
    assert!(size.width % 2 == 0 && size.height % 2 == 0);
    let width_units = (size.width + 15) / 16;
    let height_units = (size.height + 15) / 16;
    // Crop offsets are in 4:2:0 chroma units (2 luma pixels each).
    let crop_right = (width_units * 16 - size.width) / 2;
    let crop_bottom = (height_units * 16 - size.height) / 2;

    let mut w = BitWriter::new();
    w.put_bits(66, 8); // profile_idc: baseline
    w.put_bits(0xc0, 8); // constraint_set0 + set1
    w.put_bits(31, 8); // level_idc
    w.put_ue(0); // seq_parameter_set_id
    w.put_ue(0); // log2_max_frame_num_minus4
    w.put_ue(2); // pic_order_cnt_type
    w.put_ue(1); // max_num_ref_frames
    w.put_bit(0); // gaps_in_frame_num_value_allowed
    w.put_ue(width_units - 1);
    w.put_ue(height_units - 1);
    w.put_bit(1); // frame_mbs_only
    w.put_bit(1); // direct_8x8_inference
    if crop_right != 0 || crop_bottom != 0 {
        w.put_bit(1); // frame_cropping
        w.put_ue(0);
        w.put_ue(crop_right);
        w.put_ue(0);
        w.put_ue(crop_bottom);
    } else {
        w.put_bit(0); // frame_cropping
    }

    match color {
        Some((full_range, primaries, transfer, matrix)) => {
            w.put_bit(1); // vui_parameters_present
            w.put_bit(0); // aspect_ratio_info_present
            w.put_bit(0); // overscan_info_present
            w.put_bit(1); // video_signal_type_present
            w.put_bits(5, 3); // video_format: unspecified
            w.put_bit(full_range as u32);
            w.put_bit(1); // colour_description_present
            w.put_bits(primaries as u32, 8);
            w.put_bits(transfer as u32, 8);
            w.put_bits(matrix as u32, 8);
            w.put_bit(0); // chroma_loc_info_present
            w.put_bit(0); // timing_info_present
            w.put_bit(0); // nal_hrd_parameters_present
            w.put_bit(0); // vcl_hrd_parameters_present
            w.put_bit(0); // pic_struct_present
            w.put_bit(0); // bitstream_restriction
        }
        None => w.put_bit(0),
    }

    let mut nal = vec![0x67];
    nal.extend(w.finish_rbsp());
    nal
}

/// Minimal CAVLC PPS with `pic_init_qp_minus26 = 0`.
pub(crate) fn build_pps() -> Vec<u8> {
    let mut w = BitWriter::new();
    w.put_ue(0); // pic_parameter_set_id
    w.put_ue(0); // seq_parameter_set_id
    w.put_bit(0); // entropy_coding_mode
    w.put_bit(0); // bottom_field_pic_order_in_frame_present
    w.put_ue(0); // num_slice_groups_minus1
    w.put_ue(0); // num_ref_idx_l0_default_active_minus1
    w.put_ue(0); // num_ref_idx_l1_default_active_minus1
    w.put_bit(0); // weighted_pred
    w.put_bits(0, 2); // weighted_bipred_idc
    w.put_se(0); // pic_init_qp_minus26
    w.put_se(0); // pic_init_qs_minus26
    w.put_se(0); // chroma_qp_index_offset
    w.put_bit(0); // deblocking_filter_control_present
    w.put_bit(0); // constrained_intra_pred
    w.put_bit(0); // redundant_pic_cnt_present

    let mut nal = vec![0x68];
    nal.extend(w.finish_rbsp());
    nal
}

/// A slice header carrying the given QP (against [`build_pps`]).
pub(crate) fn build_slice(idr: bool, qp: i32, frame_num: u32) -> Vec<u8> {
    let mut w = BitWriter::new();
    w.put_ue(0); // first_mb_in_slice
    w.put_ue(if idr { 7 } else { 5 }); // slice_type: I / P
    w.put_ue(0); // pic_parameter_set_id
    w.put_bits(frame_num & 0xf, 4); // frame_num (log2_max_frame_num = 4)
    if idr {
        w.put_ue(0); // idr_pic_id
    } else {
        w.put_bit(0); // num_ref_idx_active_override
        w.put_bit(0); // ref_pic_list_modification_flag_l0
    }
    // dec_ref_pic_marking (both slice headers are reference pictures)
    if idr {
        w.put_bit(0); // no_output_of_prior_pics
        w.put_bit(0); // long_term_reference
    } else {
        w.put_bit(0); // adaptive_ref_pic_marking_mode
    }
    w.put_se(qp - 26); // slice_qp_delta

    let mut nal = vec![if idr { 0x65 } else { 0x41 }];
    nal.extend(w.finish_rbsp());
    nal
}

/// Join NAL units with 4-byte start codes.
pub(crate) fn annex_b(nals: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    for nal in nals {
        out.extend_from_slice(&[0, 0, 0, 1]);
        out.extend_from_slice(nal);
    }
    out
}

/// A complete access unit: SPS+PPS+IDR for key frames, a lone P slice
/// otherwise.
pub(crate) fn build_access_unit(idr: bool, qp: i32, size: Size, frame_num: u32) -> Vec<u8> {
    if idr {
        let sps = build_sps(size, None);
        let pps = build_pps();
        let slice = build_slice(true, qp, frame_num);
        annex_b(&[&sps, &pps, &slice])
    } else {
        let slice = build_slice(false, qp, frame_num);
        annex_b(&[&slice])
    }
}

/// Key-frame access unit whose SPS carries a VUI color description.
pub(crate) fn build_access_unit_with_color(
    idr: bool,
    qp: i32,
    size: Size,
    frame_num: u32,
    color: (bool, u8, u8, u8),
) -> Vec<u8> {
    assert!(idr, "color fixtures always start from a key frame");
    let sps = build_sps(size, Some(color));
    let pps = build_pps();
    let slice = build_slice(true, qp, frame_num);
    annex_b(&[&sps, &pps, &slice])
}

// ---------------------------------------------------------------------
// Mock graphics device
// ---------------------------------------------------------------------

struct MockTexture {
    size: Size,
    format: PixelFormat,
}

impl Texture for MockTexture {
    fn size(&self) -> Size {
        self.size
    }

    fn format(&self) -> PixelFormat {
        self.format
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Deterministic in-memory [`GraphicsDevice`].
pub(crate) struct MockGpuDevice {
    codec_supported: bool,
}

impl MockGpuDevice {
    pub fn new() -> Self {
        Self {
            codec_supported: true,
        }
    }

    /// A device without hardware-codec support (planar fallback).
    pub fn software() -> Self {
        Self {
            codec_supported: false,
        }
    }
}

impl GraphicsDevice for MockGpuDevice {
    fn create_default_texture(
        &self,
        size: Size,
        format: PixelFormat,
    ) -> GpuResult<Arc<dyn Texture>> {
        Ok(Arc::new(MockTexture { size, format }))
    }

    fn create_cpu_readable_texture(
        &self,
        size: Size,
        format: PixelFormat,
    ) -> GpuResult<Arc<dyn Texture>> {
        Ok(Arc::new(MockTexture { size, format }))
    }

    fn copy_resource_from_native(&self, _dst: &dyn Texture, _src: NativeTexture) -> GpuResult<()> {
        Ok(())
    }

    fn copy_texture(&self, _dst: &dyn Texture, _src: &dyn Texture) -> GpuResult<()> {
        Ok(())
    }

    fn scale_texture(&self, _dst: &dyn Texture, _src: &dyn Texture) -> GpuResult<()> {
        Ok(())
    }

    fn map(&self, _texture: &dyn Texture) -> GpuResult<BufferHandle> {
        Ok(BufferHandle::new(NativeTexture::from_raw(0xbeef)))
    }

    fn wait_sync(&self, _texture: &dyn Texture, _timeout: Duration) -> GpuResult<bool> {
        Ok(true)
    }

    fn reset_sync(&self, _texture: &dyn Texture) -> GpuResult<bool> {
        Ok(true)
    }

    fn convert_to_i420(&self, texture: &dyn Texture) -> GpuResult<I420Buffer> {
        Ok(I420Buffer::black(texture.size()))
    }

    fn compute_context(&self) -> Option<u64> {
        Some(1)
    }

    fn is_hardware_codec_supported(&self) -> bool {
        self.codec_supported
    }

    fn preferred_encode_format(&self) -> PixelFormat {
        PixelFormat::Nv12
    }
}

/// A pooled, adapted frame over a mock device.
pub(crate) fn adapted_frame(
    device: Arc<MockGpuDevice>,
    width: u32,
    height: u32,
) -> VideoFrameAdapter {
    let pool = VideoFramePool::new(device);
    let frame = pool
        .create_frame(
            NativeTexture::from_raw(1),
            Size::new(width, height),
            PixelFormat::Bgra8,
        )
        .expect("mock pool never fails");
    VideoFrameAdapter::new(frame)
}

/// Single-layer encoder settings for a resolution/framerate.
pub(crate) fn encoder_settings(width: u32, height: u32, fps: u32) -> VideoEncoderSettings {
    VideoEncoderSettings {
        codec: VideoCodecKind::H264,
        width,
        height,
        max_framerate_fps: fps,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------
// Mock codec device and sessions
// ---------------------------------------------------------------------

/// In-memory [`CodecDevice`] producing parseable synthetic bitstreams.
pub(crate) struct MockCodecDevice {
    max_level: H264Level,
    session_limit: Option<usize>,
    encode_opened: AtomicUsize,
    decode_opened: AtomicUsize,
    active: Arc<AtomicUsize>,
}

impl MockCodecDevice {
    pub fn new() -> Self {
        Self {
            max_level: H264Level::L51,
            session_limit: None,
            encode_opened: AtomicUsize::new(0),
            decode_opened: AtomicUsize::new(0),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_max_level(max_level: H264Level) -> Self {
        Self {
            max_level,
            ..Self::new()
        }
    }

    pub fn with_session_limit(limit: usize) -> Self {
        Self {
            session_limit: Some(limit),
            ..Self::new()
        }
    }

    /// Total encode sessions ever opened (including capability probes).
    pub fn sessions_opened(&self) -> usize {
        self.encode_opened.load(Ordering::SeqCst)
    }

    /// Encode sessions currently alive.
    pub fn sessions_active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn decode_sessions_opened(&self) -> usize {
        self.decode_opened.load(Ordering::SeqCst)
    }
}

impl CodecDevice for MockCodecDevice {
    fn context_id(&self) -> u64 {
        7
    }

    fn implementation_tag(&self) -> &'static str {
        "MockCodec"
    }

    fn max_concurrent_sessions(&self) -> Option<u32> {
        self.session_limit.map(|l| l as u32)
    }

    fn open_encode_session(
        &self,
        config: &EncodeSessionConfig,
    ) -> Result<Box<dyn EncodeSession>, SessionError> {
        if let Some(limit) = self.session_limit {
            if self.active.load(Ordering::SeqCst) >= limit {
                return Err(SessionError::Exhausted(format!(
                    "device allows {limit} concurrent sessions"
                )));
            }
        }
        self.encode_opened.fetch_add(1, Ordering::SeqCst);
        self.active.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockEncodeSession {
            size: config.size,
            max_level: self.max_level,
            frame_num: 0,
            qp: 28,
            active: Arc::clone(&self.active),
        }))
    }

    fn open_decode_session(
        &self,
        config: &DecodeSessionConfig,
    ) -> Result<Box<dyn DecodeSession>, SessionError> {
        self.decode_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockDecodeSession {
            size: config.initial_size,
            pending: VecDeque::new(),
            announced: false,
        }))
    }
}

struct MockEncodeSession {
    size: Size,
    max_level: H264Level,
    frame_num: u32,
    qp: i32,
    active: Arc<AtomicUsize>,
}

impl Drop for MockEncodeSession {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl EncodeSession for MockEncodeSession {
    fn supported_profiles(&self) -> Vec<H264Profile> {
        vec![
            H264Profile::ConstrainedBaseline,
            H264Profile::Baseline,
            H264Profile::Main,
            H264Profile::High,
        ]
    }

    fn max_level(&self) -> H264Level {
        self.max_level
    }

    fn encode(
        &mut self,
        surface: &dyn Texture,
        timestamp_100ns: u64,
        force_keyframe: bool,
    ) -> Result<EncodedOutput, SessionError> {
        if surface.size() != self.size {
            return Err(SessionError::Rejected(format!(
                "surface {} does not match session {}",
                surface.size(),
                self.size
            )));
        }
        let access_unit = build_access_unit(force_keyframe, self.qp, self.size, self.frame_num);
        self.frame_num = (self.frame_num + 1) % 16;
        Ok(EncodedOutput {
            bitstream: Bytes::from(access_unit),
            timestamp_100ns,
        })
    }

    fn reconfigure(&mut self, _rates: &SessionRateParams) -> Result<(), SessionError> {
        Ok(())
    }
}

struct MockDecodeSession {
    size: Size,
    pending: VecDeque<DecodedSurface>,
    announced: bool,
}

impl DecodeSession for MockDecodeSession {
    fn submit(&mut self, access_unit: &[u8], timestamp_100ns: u64) -> Result<(), SessionError> {
        if let Some(size) = resolution_from_access_unit(access_unit) {
            self.size = size;
        }
        let len = I420Buffer::buffer_len(self.size);
        self.pending.push_back(DecodedSurface {
            nv12: Bytes::from(vec![0x80u8; len]),
            size: self.size,
            timestamp_100ns,
        });
        self.announced = false;
        Ok(())
    }

    fn poll(&mut self) -> Result<DecodePoll, SessionError> {
        if self.pending.is_empty() {
            return Ok(DecodePoll::Empty);
        }
        // First poll reports the pipeline still running, exercising the
        // caller's yield loop.
        if !self.announced {
            self.announced = true;
            return Ok(DecodePoll::Pending);
        }
        Ok(self
            .pending
            .pop_front()
            .map(DecodePoll::Ready)
            .unwrap_or(DecodePoll::Empty))
    }

    fn reconfigure(&mut self, size: Size) -> Result<(), SessionError> {
        self.size = size;
        Ok(())
    }
}

// ---------------------------------------------------------------------
// Collecting sinks
// ---------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct CollectingSink {
    frames: Mutex<Vec<EncodedAccessUnit>>,
}

impl CollectingSink {
    pub fn frames(&self) -> Vec<EncodedAccessUnit> {
        self.frames.lock().clone()
    }
}

impl EncodedFrameSink for Arc<CollectingSink> {
    fn on_encoded_frame(&self, access_unit: EncodedAccessUnit) {
        self.frames.lock().push(access_unit);
    }
}

#[derive(Default)]
pub(crate) struct CollectingDecodeSink {
    frames: Mutex<Vec<DecodedFrame>>,
}

impl CollectingDecodeSink {
    pub fn frames(&self) -> Vec<DecodedFrame> {
        self.frames.lock().clone()
    }
}

impl DecodedFrameSink for Arc<CollectingDecodeSink> {
    fn on_decoded_frame(&self, frame: DecodedFrame) {
        self.frames.lock().push(frame);
    }
}
