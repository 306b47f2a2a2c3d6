//! Hardware codec session traits.
//!
//! Sessions are a scarce, per-device resource: some GPUs cap the number
//! of concurrent encodes. Construction returns a `Result` rather than
//! unwinding, and running sessions are reconfigured in place instead of
//! being destroyed and reopened.

use bytes::Bytes;
use thiserror::Error;

use framebridge_gpu::{PixelFormat, Size, Texture};

use crate::level::{H264Level, H264Profile};

/// GPU memory layout a session consumes, chosen from caller context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SessionMemoryKind {
    /// Texture-array-backed input surfaces.
    TextureArray,

    /// Raw device-pointer-backed input surfaces.
    DevicePointer,
}

/// Configuration for opening a hardware encode session.
#[derive(Debug, Clone)]
pub struct EncodeSessionConfig {
    pub size: Size,
    pub framerate_fps: u32,
    pub target_bitrate_bps: u32,
    pub max_bitrate_bps: u32,
    pub profile: H264Profile,
    pub level: H264Level,
    pub memory: SessionMemoryKind,
    pub input_format: PixelFormat,
}

/// Live rate-control update applied to a running encode session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionRateParams {
    pub average_bitrate_bps: u32,
    pub framerate_num: u32,
    pub framerate_den: u32,
    pub vbv_buffer_size: u32,
    pub vbv_initial_delay: u32,
}

/// One encoded access unit as produced by the hardware.
#[derive(Debug, Clone)]
pub struct EncodedOutput {
    pub bitstream: Bytes,
    pub timestamp_100ns: u64,
}

/// Failures reported by hardware sessions.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The device's concurrent-session limit is reached.
    #[error("hardware session limit reached: {0}")]
    Exhausted(String),

    /// The session rejected the requested configuration.
    #[error("session rejected configuration: {0}")]
    Rejected(String),

    /// The hardware call itself failed.
    #[error("hardware fault: {0}")]
    Hardware(String),
}

/// A live hardware encode session for one layer.
pub trait EncodeSession: Send {
    /// Profiles the hardware advertises.
    fn supported_profiles(&self) -> Vec<H264Profile>;

    /// The highest level the hardware sustains.
    fn max_level(&self) -> H264Level;

    /// Encode one input surface into an access unit.
    fn encode(
        &mut self,
        surface: &dyn Texture,
        timestamp_100ns: u64,
        force_keyframe: bool,
    ) -> Result<EncodedOutput, SessionError>;

    /// Apply new rate-control parameters without recreating the session.
    fn reconfigure(&mut self, rates: &SessionRateParams) -> Result<(), SessionError>;
}

/// Configuration for opening a hardware decode session.
#[derive(Debug, Clone)]
pub struct DecodeSessionConfig {
    /// Ceiling the session is opened against; resizes stay within it.
    pub max_size: Size,

    /// Geometry of the first expected bitstream.
    pub initial_size: Size,
}

/// A decoded surface in the hardware's native NV12 layout.
#[derive(Debug, Clone)]
pub struct DecodedSurface {
    pub nv12: Bytes,
    pub size: Size,
    pub timestamp_100ns: u64,
}

/// Outcome of polling a decode session for output.
#[derive(Debug)]
pub enum DecodePoll {
    /// A surface is ready.
    Ready(DecodedSurface),

    /// Output is still in flight; poll again.
    Pending,

    /// The pipeline produced nothing for the submitted input.
    Empty,
}

/// A live hardware decode session.
pub trait DecodeSession: Send {
    /// Submit one access unit.
    fn submit(&mut self, access_unit: &[u8], timestamp_100ns: u64) -> Result<(), SessionError>;

    /// Poll for decoded output. Decoders are pipelined; some inputs
    /// produce no output immediately.
    fn poll(&mut self) -> Result<DecodePoll, SessionError>;

    /// Resize the session in place (within the configured ceiling).
    fn reconfigure(&mut self, size: Size) -> Result<(), SessionError>;
}

/// Factory for hardware codec sessions, one per hardware context.
pub trait CodecDevice: Send + Sync {
    /// Identity of the hardware context, used to key capability caches.
    fn context_id(&self) -> u64;

    /// Stable backend tag carried in negotiated format parameters.
    /// Must be bit-exact across processes.
    fn implementation_tag(&self) -> &'static str;

    /// The device's concurrent encode-session ceiling, when known.
    fn max_concurrent_sessions(&self) -> Option<u32>;

    /// Open an encode session.
    fn open_encode_session(
        &self,
        config: &EncodeSessionConfig,
    ) -> Result<Box<dyn EncodeSession>, SessionError>;

    /// Open a decode session.
    fn open_decode_session(
        &self,
        config: &DecodeSessionConfig,
    ) -> Result<Box<dyn DecodeSession>, SessionError>;
}
