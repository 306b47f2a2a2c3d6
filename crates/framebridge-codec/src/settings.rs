//! Codec settings handed across the engine boundary.

use serde::{Deserialize, Serialize};

use framebridge_gpu::Size;

use crate::level::{H264Level, H264Profile};
use crate::session::SessionMemoryKind;

/// Hard ceiling on simulcast layers per encoder instance.
pub const MAX_SIMULCAST_LAYERS: usize = 3;

/// Codec selector carried in negotiated settings. Only H.264 has a
/// hardware path here; the rest exist so negotiation can be rejected
/// with a parameter error instead of a panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoCodecKind {
    H264,
    Vp8,
    Vp9,
    Av1,
}

/// Per-layer settings supplied at init time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerSettings {
    pub width: u32,
    pub height: u32,

    /// Bitrate ceiling for this layer in bits/second.
    pub max_bitrate_bps: u32,

    /// Framerate cap for this layer.
    pub max_framerate_fps: u32,

    /// Whether the layer participates at all.
    pub active: bool,
}

/// Encoder bootstrap settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoEncoderSettings {
    pub codec: VideoCodecKind,
    pub width: u32,
    pub height: u32,
    pub max_framerate_fps: u32,

    /// Bitrate the first allocation is seeded from, bits/second.
    pub start_bitrate_bps: u32,

    /// Total bitrate ceiling, bits/second.
    pub max_bitrate_bps: u32,

    pub profile: H264Profile,

    /// Minimum level the caller negotiated; the session uses the max
    /// of this and what the content requires.
    pub min_level: H264Level,

    pub memory: SessionMemoryKind,

    /// Simulcast layers, highest resolution first. Empty means a
    /// single layer at full resolution.
    pub layers: Vec<LayerSettings>,
}

impl Default for VideoEncoderSettings {
    fn default() -> Self {
        Self {
            codec: VideoCodecKind::H264,
            width: 1280,
            height: 720,
            max_framerate_fps: 30,
            start_bitrate_bps: 2_500_000,
            max_bitrate_bps: 4_000_000,
            profile: H264Profile::ConstrainedBaseline,
            min_level: H264Level::L1,
            memory: SessionMemoryKind::TextureArray,
            layers: Vec::new(),
        }
    }
}

/// Decoder bootstrap settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoDecoderSettings {
    pub codec: VideoCodecKind,
    pub width: u32,
    pub height: u32,
}

impl Default for VideoDecoderSettings {
    fn default() -> Self {
        Self {
            codec: VideoCodecKind::H264,
            width: 1280,
            height: 720,
        }
    }
}

/// Live per-layer state owned by the encoder.
#[derive(Debug, Clone)]
pub struct LayerConfig {
    pub width: u32,
    pub height: u32,
    pub target_bitrate_bps: u32,
    pub max_bitrate_bps: u32,
    pub max_framerate_fps: u32,

    /// Configured into the layer set at all (from [`LayerSettings::active`]).
    pub enabled: bool,

    /// Currently transmitting; flips with rate allocation.
    pub sending: bool,

    /// Force a key frame on this layer's next encode.
    pub key_frame_request: bool,

    pub simulcast_index: usize,
}

impl LayerConfig {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Rate update pushed into a running encoder.
#[derive(Debug, Clone, Copy)]
pub struct RateControlParams {
    /// Total bitrate across all layers, bits/second. Zero pauses every
    /// layer.
    pub total_bitrate_bps: u32,

    pub framerate_fps: u32,
}

/// Per-layer frame request accompanying an encode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestedFrameKind {
    /// Skip this layer entirely for the tick.
    Empty,
    Key,
    Delta,
}
