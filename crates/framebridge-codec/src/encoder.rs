//! Simulcast hardware H.264 encoder.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, error, info, instrument, warn};

use framebridge_gpu::{FrameBufferKind, GraphicsDevice, Size, Texture, VideoFrameAdapter};

use crate::bitstream::{classify_access_unit, BitstreamTracker, FrameKind};
use crate::caps::{CapabilityCache, CapabilityRecord};
use crate::error::{CodecError, CodecResult};
use crate::level::{max_framerate, required_level, H264Level};
use crate::rate::{allocate_layer_bitrates, vbv_buffer_size};
use crate::session::{CodecDevice, EncodeSession, EncodeSessionConfig, SessionRateParams};
use crate::settings::{
    LayerConfig, RateControlParams, RequestedFrameKind, VideoCodecKind, VideoEncoderSettings,
    MAX_SIMULCAST_LAYERS,
};

/// One encoded access unit delivered to the sink.
#[derive(Debug, Clone)]
pub struct EncodedAccessUnit {
    pub data: Bytes,
    pub size: Size,
    pub timestamp_100ns: u64,
    pub kind: FrameKind,

    /// Slice QP extracted from the bitstream, when parseable.
    pub qp: Option<i32>,

    pub simulcast_index: usize,
}

/// Consumer of encoded access units. At most one sink is registered;
/// re-registering replaces it.
pub trait EncodedFrameSink: Send {
    fn on_encoded_frame(&self, access_unit: EncodedAccessUnit);
}

/// Encoder identity reported to the surrounding media engine.
#[derive(Debug, Clone, Copy)]
pub struct EncoderInfo {
    pub implementation: &'static str,
    pub is_hardware_accelerated: bool,
}

/// Per-layer runtime state.
struct LayerRuntime {
    config: LayerConfig,

    /// The layer's configured framerate ceiling from init time.
    framerate_cap: u32,

    session: Box<dyn EncodeSession>,

    /// Cached input surface; reallocated only when the required size
    /// changes. Allocation every tick is not acceptable.
    input_surface: Option<Arc<dyn Texture>>,
    input_size: Size,

    /// The previous reconfigure's buffer size seeds the next initial
    /// delay.
    last_vbv_buffer_size: u32,
}

/// Hardware H.264 encoder driving one session per simulcast layer.
///
/// Callers serialize `encode`/`set_rates`; there is no internal mutual
/// exclusion.
pub struct SimulcastEncoder {
    gpu: Arc<dyn GraphicsDevice>,
    codec: Arc<dyn CodecDevice>,
    caps: Arc<CapabilityRecord>,
    sink: Option<Box<dyn EncodedFrameSink>>,
    layers: Vec<LayerRuntime>,
    configured_size: Size,
    framerate_fps: u32,
    session_level: H264Level,
    initialized: bool,
    parser: BitstreamTracker,
}

impl SimulcastEncoder {
    /// Create an encoder over a hardware context, warming the
    /// capability cache for that context if needed.
    pub fn new(
        gpu: Arc<dyn GraphicsDevice>,
        codec: Arc<dyn CodecDevice>,
        caps: &CapabilityCache,
    ) -> CodecResult<Self> {
        let caps = caps.warm_up(&*codec)?;
        Ok(Self {
            gpu,
            codec,
            caps,
            sink: None,
            layers: Vec::new(),
            configured_size: Size::new(0, 0),
            framerate_fps: 0,
            session_level: H264Level::L1,
            initialized: false,
            parser: BitstreamTracker::new(),
        })
    }

    /// Register the encoded-frame sink. Replaces any previous sink.
    pub fn register_sink(&mut self, sink: Box<dyn EncodedFrameSink>) {
        self.sink = Some(sink);
    }

    /// Open the per-layer hardware sessions and apply the initial rate
    /// allocation.
    #[instrument(name = "init_encode", skip_all)]
    pub fn init_encode(&mut self, settings: &VideoEncoderSettings) -> CodecResult<()> {
        if settings.codec != VideoCodecKind::H264 {
            return Err(CodecError::Parameter(format!(
                "unsupported codec {:?}",
                settings.codec
            )));
        }
        if settings.max_framerate_fps == 0 {
            return Err(CodecError::Parameter("framerate must be positive".into()));
        }
        if settings.width == 0 || settings.height == 0 {
            return Err(CodecError::Parameter(format!(
                "invalid resolution {}x{}",
                settings.width, settings.height
            )));
        }
        if !self.caps.supports_profile(settings.profile) {
            return Err(CodecError::Parameter(format!(
                "profile {:?} not supported by hardware",
                settings.profile
            )));
        }
        if settings.min_level > self.caps.max_level {
            return Err(CodecError::Parameter(format!(
                "requested level {:?} exceeds hardware maximum {:?}",
                settings.min_level, self.caps.max_level
            )));
        }

        let pixels = Size::new(settings.width, settings.height).pixel_count();
        let mut framerate = settings.max_framerate_fps;
        let mut required = required_level(pixels, framerate);

        let fits = |level: Option<H264Level>| matches!(level, Some(l) if l <= self.caps.max_level);
        if !fits(required) {
            // The hardware cannot sustain the requested load; cap the
            // framerate at what its maximum level allows and retry once.
            let downgraded = max_framerate(self.caps.max_level, pixels);
            if downgraded == 0 {
                return Err(CodecError::Parameter(format!(
                    "resolution {}x{} exceeds hardware capability",
                    settings.width, settings.height
                )));
            }
            required = required_level(pixels, downgraded);
            if !fits(required) {
                return Err(CodecError::Parameter(format!(
                    "{}x{} @ {} fps exceeds hardware level {:?}",
                    settings.width, settings.height, framerate, self.caps.max_level
                )));
            }
            warn!(
                requested_fps = framerate,
                downgraded_fps = downgraded,
                "Framerate downgraded to fit hardware level"
            );
            framerate = downgraded;
        }
        let required = required.ok_or_else(|| {
            CodecError::Parameter("no level satisfies the requested load".into())
        })?;

        // Never encode below what the content requires.
        let level = required.max(settings.min_level);

        let layer_configs = resolve_layers(settings)?;

        // Open sessions highest resolution first. A single failure
        // fails the whole init; partially opened sessions are dropped.
        let mut layers = Vec::with_capacity(layer_configs.len());
        for config in layer_configs {
            let session_config = EncodeSessionConfig {
                size: config.size(),
                framerate_fps: framerate,
                target_bitrate_bps: config.target_bitrate_bps,
                max_bitrate_bps: config.max_bitrate_bps,
                profile: settings.profile,
                level,
                memory: settings.memory,
                input_format: self.gpu.preferred_encode_format(),
            };
            let session = self
                .codec
                .open_encode_session(&session_config)
                .map_err(|e| {
                    error!(
                        layer = config.simulcast_index,
                        "Hardware session open failed: {e}"
                    );
                    CodecError::EncoderFailure(e.to_string())
                })?;
            layers.push(LayerRuntime {
                framerate_cap: config.max_framerate_fps,
                config,
                session,
                input_surface: None,
                input_size: Size::new(0, 0),
                last_vbv_buffer_size: 0,
            });
        }

        self.layers = layers;
        self.configured_size = Size::new(settings.width, settings.height);
        self.framerate_fps = framerate;
        self.session_level = level;
        self.initialized = true;
        self.parser = BitstreamTracker::new();

        info!(
            size = %self.configured_size,
            framerate,
            level = ?level,
            layers = self.layers.len(),
            "Encoder initialized"
        );

        // Seed the per-layer allocation from the start bitrate.
        self.set_rates(&RateControlParams {
            total_bitrate_bps: settings.start_bitrate_bps,
            framerate_fps: framerate,
        })
    }

    /// Encode one captured frame across all sending layers.
    pub fn encode(
        &mut self,
        frame: &VideoFrameAdapter,
        frame_types: &[RequestedFrameKind],
    ) -> CodecResult<()> {
        if !self.initialized || self.sink.is_none() {
            return Err(CodecError::Uninitialized);
        }
        if frame.kind() != FrameBufferKind::Native {
            return Err(CodecError::Parameter("frame is not GPU-resident".into()));
        }
        if frame.size() != self.configured_size {
            return Err(CodecError::Parameter(format!(
                "frame size {} does not match configured {}",
                frame.size(),
                self.configured_size
            )));
        }

        // A key-frame request on any sending layer forces a key frame
        // on every layer together.
        let force_key_all = self
            .layers
            .iter()
            .any(|l| l.config.sending && l.config.key_frame_request);

        let source = frame.frame().buffer();
        let timestamp = frame.timestamp().pts_100ns;

        for index in 0..self.layers.len() {
            if !self.layers[index].config.sending {
                continue;
            }
            let requested = frame_types
                .get(index)
                .copied()
                .unwrap_or(RequestedFrameKind::Delta);
            if requested == RequestedFrameKind::Empty {
                continue;
            }
            let force_key = force_key_all || requested == RequestedFrameKind::Key;

            let target = self.layers[index].config.size();
            let input = self.layer_input_surface(index, target)?;
            if target == frame.size() {
                self.gpu.copy_texture(&*input, &**source.texture())?;
            } else {
                self.gpu.scale_texture(&*input, &**source.texture())?;
            }

            let output = self.layers[index]
                .session
                .encode(&*input, timestamp, force_key)
                .map_err(|e| CodecError::EncoderFailure(e.to_string()))?;

            let kind = classify_access_unit(&output.bitstream);
            self.parser.process(&output.bitstream);
            let qp = self.parser.last_slice_qp();

            if kind == FrameKind::Key {
                self.layers[index].config.key_frame_request = false;
            }

            let access_unit = EncodedAccessUnit {
                data: output.bitstream,
                size: target,
                timestamp_100ns: output.timestamp_100ns,
                kind,
                qp,
                simulcast_index: index,
            };
            if let Some(sink) = &self.sink {
                sink.on_encoded_frame(access_unit);
            }
        }

        Ok(())
    }

    /// Apply a live rate update, reconfiguring each layer's session in
    /// place.
    pub fn set_rates(&mut self, params: &RateControlParams) -> CodecResult<()> {
        if !self.initialized {
            return Err(CodecError::Uninitialized);
        }
        if params.framerate_fps == 0 {
            warn!("Ignoring rate update with non-positive framerate");
            return Ok(());
        }
        if params.total_bitrate_bps == 0 {
            debug!("Zero total bitrate, pausing all layers");
            for layer in &mut self.layers {
                layer.config.sending = false;
            }
            return Ok(());
        }

        // Framerate can drift over a session's lifetime; re-check the
        // level budget and pause rather than error when it no longer
        // fits.
        let pixels = self.configured_size.pixel_count();
        let adequate = matches!(
            required_level(pixels, params.framerate_fps),
            Some(l) if l <= self.caps.max_level
        );
        if !adequate {
            warn!(
                framerate = params.framerate_fps,
                "Rate update exceeds hardware level, pausing all layers"
            );
            for layer in &mut self.layers {
                layer.config.sending = false;
            }
            return Ok(());
        }

        self.framerate_fps = params.framerate_fps;

        let configs: Vec<LayerConfig> = self.layers.iter().map(|l| l.config.clone()).collect();
        let shares = allocate_layer_bitrates(params.total_bitrate_bps, &configs);

        for (index, share) in shares.iter().copied().enumerate() {
            let layer = &mut self.layers[index];
            layer.config.target_bitrate_bps = share;
            layer.config.max_framerate_fps = layer.framerate_cap.min(params.framerate_fps);

            if share == 0 {
                if layer.config.sending {
                    debug!(layer = index, "Layer paused by allocation");
                }
                layer.config.sending = false;
                continue;
            }

            let vbv = vbv_buffer_size(share, params.framerate_fps, 1);
            let rates = SessionRateParams {
                average_bitrate_bps: share,
                framerate_num: params.framerate_fps,
                framerate_den: 1,
                vbv_buffer_size: vbv,
                vbv_initial_delay: layer.last_vbv_buffer_size,
            };
            layer
                .session
                .reconfigure(&rates)
                .map_err(|e| CodecError::EncoderFailure(e.to_string()))?;
            layer.last_vbv_buffer_size = vbv;

            if !layer.config.sending {
                layer.config.sending = true;
                layer.config.key_frame_request = true;
                debug!(layer = index, "Layer reactivated, key frame forced");
            }
        }

        Ok(())
    }

    /// Tear down all layer sessions and return to `Uninitialized`.
    pub fn release(&mut self) {
        if !self.layers.is_empty() {
            debug!(layers = self.layers.len(), "Releasing encoder sessions");
        }
        self.layers.clear();
        self.initialized = false;
    }

    /// Encoder identity for the surrounding engine.
    pub fn get_info(&self) -> EncoderInfo {
        EncoderInfo {
            implementation: self.caps.implementation_tag,
            is_hardware_accelerated: true,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// The level the sessions were opened at.
    pub fn session_level(&self) -> H264Level {
        self.session_level
    }

    /// The (possibly downgraded) operating framerate.
    pub fn framerate_fps(&self) -> u32 {
        self.framerate_fps
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    fn layer_input_surface(&mut self, index: usize, target: Size) -> CodecResult<Arc<dyn Texture>> {
        if let Some(surface) = &self.layers[index].input_surface {
            if self.layers[index].input_size == target {
                return Ok(Arc::clone(surface));
            }
        }
        let surface = self
            .gpu
            .create_default_texture(target, self.gpu.preferred_encode_format())?;
        self.layers[index].input_surface = Some(Arc::clone(&surface));
        self.layers[index].input_size = target;
        Ok(surface)
    }
}

impl Drop for SimulcastEncoder {
    fn drop(&mut self) {
        self.release();
    }
}

/// Expand init settings into the runtime layer list and validate the
/// simulcast layout.
fn resolve_layers(settings: &VideoEncoderSettings) -> CodecResult<Vec<LayerConfig>> {
    if settings.layers.is_empty() {
        return Ok(vec![LayerConfig {
            width: settings.width,
            height: settings.height,
            target_bitrate_bps: 0,
            max_bitrate_bps: settings.max_bitrate_bps,
            max_framerate_fps: settings.max_framerate_fps,
            enabled: true,
            sending: true,
            key_frame_request: true,
            simulcast_index: 0,
        }]);
    }

    if settings.layers.len() > MAX_SIMULCAST_LAYERS {
        return Err(CodecError::SimulcastUnsupported(format!(
            "{} layers exceeds the maximum of {}",
            settings.layers.len(),
            MAX_SIMULCAST_LAYERS
        )));
    }

    let top = &settings.layers[0];
    if top.width != settings.width || top.height != settings.height {
        return Err(CodecError::SimulcastUnsupported(format!(
            "top layer {}x{} does not match encoder {}x{}",
            top.width, top.height, settings.width, settings.height
        )));
    }

    let mut layers = Vec::with_capacity(settings.layers.len());
    for (index, layer) in settings.layers.iter().enumerate() {
        if layer.width == 0 || layer.height == 0 {
            return Err(CodecError::SimulcastUnsupported(format!(
                "layer {index} has an empty resolution"
            )));
        }
        // Each lower layer is an exact power-of-two downscale of the
        // top layer, same aspect ratio.
        let factor = 1u32 << index;
        if layer.width * factor != top.width || layer.height * factor != top.height {
            return Err(CodecError::SimulcastUnsupported(format!(
                "layer {index} ({}x{}) is not a power-of-two downscale of {}x{}",
                layer.width, layer.height, top.width, top.height
            )));
        }
        layers.push(LayerConfig {
            width: layer.width,
            height: layer.height,
            target_bitrate_bps: 0,
            max_bitrate_bps: layer.max_bitrate_bps,
            max_framerate_fps: layer.max_framerate_fps,
            enabled: layer.active,
            sending: layer.active,
            key_frame_request: layer.active,
            simulcast_index: index,
        });
    }
    Ok(layers)
}
