//! Hardware H.264 encode/decode for GPU-resident frames.
//!
//! Owns the session lifecycle around a scarce hardware codec: profile
//! and level negotiation against cached capability, simulcast layer
//! management, live rate reconfiguration, bitstream-driven decode
//! resizing, and the H.264 parsing both paths rely on. Platform session
//! construction sits behind the [`CodecDevice`] trait.

mod bitstream;
mod caps;
mod decoder;
mod encoder;
mod error;
mod fmtp;
mod level;
mod nvcodec;
mod rate;
mod session;
mod settings;
#[cfg(test)]
mod testutil;

pub use bitstream::{
    classify_access_unit, parse_pps, parse_sps, resolution_from_access_unit, rbsp_from_payload,
    split_annex_b, BitReader, BitstreamTracker, ColorDescription, FrameKind, NalUnit, NalUnitType,
    PpsInfo, SpsInfo,
};
pub use caps::{CapabilityCache, CapabilityRecord};
pub use decoder::{DecodedFrame, DecodedFrameSink, HardwareDecoder, MAX_DECODE_SIZE};
pub use encoder::{EncodedAccessUnit, EncodedFrameSink, EncoderInfo, SimulcastEncoder};
pub use error::{CodecError, CodecResult};
pub use fmtp::{
    build_fmtp, format_profile_level_id, parse_fmtp, parse_profile_level_id, ProfileLevelId,
    IMPLEMENTATION_KEY, PROFILE_LEVEL_ID_KEY,
};
pub use level::{max_framerate, required_level, H264Level, H264Profile};
pub use nvcodec::{compiled_with_nvenc, nvenc_available};
pub use rate::{allocate_layer_bitrates, vbv_buffer_size};
pub use session::{
    CodecDevice, DecodePoll, DecodeSession, DecodeSessionConfig, DecodedSurface, EncodeSession,
    EncodeSessionConfig, EncodedOutput, SessionError, SessionMemoryKind, SessionRateParams,
};
pub use settings::{
    LayerConfig, LayerSettings, RateControlParams, RequestedFrameKind, VideoCodecKind,
    VideoDecoderSettings, VideoEncoderSettings, MAX_SIMULCAST_LAYERS,
};
