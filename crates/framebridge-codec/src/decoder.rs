//! Hardware H.264 decoder.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use framebridge_gpu::{nv12_to_i420, I420Buffer, Size};

use crate::bitstream::{BitstreamTracker, ColorDescription};
use crate::caps::{CapabilityCache, CapabilityRecord};
use crate::error::{CodecError, CodecResult};
use crate::session::{CodecDevice, DecodePoll, DecodeSession, DecodeSessionConfig};
use crate::settings::{VideoCodecKind, VideoDecoderSettings};

/// Ceiling decode sessions are opened against. Bitstream resolution
/// changes resize the session in place within this bound.
pub const MAX_DECODE_SIZE: Size = Size::new(4096, 4096);

/// One decoded frame delivered to the sink, always planar I420.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub buffer: Arc<I420Buffer>,
    pub size: Size,
    pub timestamp_100ns: u64,

    /// Slice QP parsed from the access unit, when available.
    pub qp: Option<i32>,

    /// Color space from the access unit, else derived from the
    /// bitstream's video-signal description.
    pub color: Option<ColorDescription>,
}

/// Consumer of decoded frames. At most one sink is registered;
/// re-registering replaces it.
pub trait DecodedFrameSink: Send {
    fn on_decoded_frame(&self, frame: DecodedFrame);
}

/// Hardware H.264 decoder over a single decode session.
///
/// Callers serialize `decode`; there is no internal mutual exclusion.
pub struct HardwareDecoder {
    codec: Arc<dyn CodecDevice>,
    caps: Arc<CapabilityRecord>,
    session: Option<Box<dyn DecodeSession>>,
    sink: Option<Box<dyn DecodedFrameSink>>,
    configured_size: Size,
    parser: BitstreamTracker,
}

impl HardwareDecoder {
    /// Create a decoder over a hardware context, warming the
    /// capability cache for that context if needed.
    pub fn new(codec: Arc<dyn CodecDevice>, caps: &CapabilityCache) -> CodecResult<Self> {
        let caps = caps.warm_up(&*codec)?;
        Ok(Self {
            codec,
            caps,
            session: None,
            sink: None,
            configured_size: Size::new(0, 0),
            parser: BitstreamTracker::new(),
        })
    }

    /// Register the decoded-frame sink. Replaces any previous sink.
    pub fn register_sink(&mut self, sink: Box<dyn DecodedFrameSink>) {
        self.sink = Some(sink);
    }

    /// Open the decode session. The session is opened against
    /// [`MAX_DECODE_SIZE`], not the requested resolution, so later
    /// bitstream changes resize in place.
    #[instrument(name = "init_decode", skip_all)]
    pub fn configure(&mut self, settings: &VideoDecoderSettings) -> CodecResult<()> {
        if settings.codec != VideoCodecKind::H264 {
            return Err(CodecError::Parameter(format!(
                "unsupported codec {:?}",
                settings.codec
            )));
        }
        if settings.width == 0 || settings.height == 0 {
            return Err(CodecError::Parameter(format!(
                "invalid resolution {}x{}",
                settings.width, settings.height
            )));
        }
        if settings.width > MAX_DECODE_SIZE.width || settings.height > MAX_DECODE_SIZE.height {
            return Err(CodecError::Parameter(format!(
                "resolution {}x{} exceeds decode ceiling {}",
                settings.width, settings.height, MAX_DECODE_SIZE
            )));
        }

        let initial = Size::new(settings.width, settings.height);
        let session = self
            .codec
            .open_decode_session(&DecodeSessionConfig {
                max_size: MAX_DECODE_SIZE,
                initial_size: initial,
            })
            .map_err(|e| CodecError::DecoderFailure(e.to_string()))?;

        self.session = Some(session);
        self.configured_size = initial;
        self.parser = BitstreamTracker::new();

        info!(size = %initial, tag = self.caps.implementation_tag, "Decoder configured");
        Ok(())
    }

    /// Decode one access unit and deliver the resulting frame to the
    /// sink.
    ///
    /// An SPS resolution change reconfigures the session before the
    /// triggering access unit is submitted, so the emitted frame
    /// already carries the new geometry.
    pub fn decode(
        &mut self,
        access_unit: &[u8],
        timestamp_100ns: u64,
        color: Option<ColorDescription>,
    ) -> CodecResult<()> {
        if self.session.is_none() || self.sink.is_none() {
            return Err(CodecError::Uninitialized);
        }
        if access_unit.is_empty() {
            return Err(CodecError::Parameter("empty access unit".into()));
        }

        self.parser.process(access_unit);

        let session = self
            .session
            .as_mut()
            .ok_or(CodecError::Uninitialized)?;

        if let Some(sps) = self.parser.sps() {
            let coded = sps.size;
            if !coded.is_empty() && coded != self.configured_size {
                debug!(
                    from = %self.configured_size,
                    to = %coded,
                    "Bitstream resolution change, reconfiguring decode session"
                );
                session
                    .reconfigure(coded)
                    .map_err(|e| CodecError::DecoderFailure(e.to_string()))?;
                self.configured_size = coded;
            }
        }

        session
            .submit(access_unit, timestamp_100ns)
            .map_err(|e| CodecError::DecoderFailure(e.to_string()))?;

        // Decoders are pipelined; spin with yield until the session
        // reports output for this submission.
        let surface = loop {
            match session
                .poll()
                .map_err(|e| CodecError::DecoderFailure(e.to_string()))?
            {
                DecodePoll::Ready(surface) => break surface,
                DecodePoll::Pending => std::thread::yield_now(),
                DecodePoll::Empty => return Err(CodecError::NoOutput),
            }
        };

        let planar = nv12_to_i420(&surface.nv12, surface.size)?;
        let color = color.or_else(|| self.parser.color());
        let frame = DecodedFrame {
            buffer: Arc::new(planar),
            size: surface.size,
            timestamp_100ns: surface.timestamp_100ns,
            qp: self.parser.last_slice_qp(),
            color,
        };

        if let Some(sink) = &self.sink {
            sink.on_decoded_frame(frame);
        }
        Ok(())
    }

    /// Tear down the decode session.
    pub fn release(&mut self) {
        self.session = None;
    }

    pub fn is_configured(&self) -> bool {
        self.session.is_some()
    }

    /// The geometry the session currently decodes at.
    pub fn configured_size(&self) -> Size {
        self.configured_size
    }
}
