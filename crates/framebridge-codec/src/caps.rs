//! Per-context hardware capability cache.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use framebridge_gpu::{PixelFormat, Size};

use crate::error::{CodecError, CodecResult};
use crate::level::{H264Level, H264Profile};
use crate::session::{CodecDevice, EncodeSessionConfig, SessionMemoryKind};

/// Hardware capability snapshot for one context. Immutable once warmed.
#[derive(Debug, Clone)]
pub struct CapabilityRecord {
    /// Profiles the hardware encoder advertises.
    pub profiles: Vec<H264Profile>,

    /// Highest level the hardware sustains.
    pub max_level: H264Level,

    /// Concurrent encode-session ceiling, when the device reports one.
    pub max_sessions: Option<u32>,

    /// Stable backend tag for negotiated format parameters.
    pub implementation_tag: &'static str,
}

impl CapabilityRecord {
    pub fn supports_profile(&self, profile: H264Profile) -> bool {
        self.profiles.contains(&profile)
    }
}

/// Caches capability queries keyed by hardware context.
///
/// Opening a session just to ask what the hardware supports is itself a
/// scarce operation, so each context is probed exactly once: a
/// throwaway encode session is opened, queried, and destroyed, and
/// every later query is served from the cache. Safe for concurrent
/// reads after warm-up.
#[derive(Default)]
pub struct CapabilityCache {
    records: Mutex<HashMap<u64, Arc<CapabilityRecord>>>,
}

impl CapabilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The record for a context, probing the hardware on first use.
    pub fn warm_up(&self, device: &dyn CodecDevice) -> CodecResult<Arc<CapabilityRecord>> {
        let context = device.context_id();
        if let Some(record) = self.records.lock().get(&context) {
            return Ok(Arc::clone(record));
        }

        // Probe outside the lock; session opens can be slow and may be
        // rate limited externally.
        debug!(context, "Probing hardware capability");
        let probe_config = EncodeSessionConfig {
            size: Size::new(640, 360),
            framerate_fps: 30,
            target_bitrate_bps: 1_000_000,
            max_bitrate_bps: 1_000_000,
            profile: H264Profile::ConstrainedBaseline,
            level: H264Level::L31,
            memory: SessionMemoryKind::TextureArray,
            input_format: PixelFormat::Nv12,
        };
        let session = device.open_encode_session(&probe_config).map_err(|e| {
            CodecError::EncoderFailure(format!("capability probe session failed: {e}"))
        })?;

        let record = Arc::new(CapabilityRecord {
            profiles: session.supported_profiles(),
            max_level: session.max_level(),
            max_sessions: device.max_concurrent_sessions(),
            implementation_tag: device.implementation_tag(),
        });
        drop(session);

        info!(
            context,
            max_level = ?record.max_level,
            profiles = record.profiles.len(),
            "Hardware capability cached"
        );

        let mut records = self.records.lock();
        let entry = records.entry(context).or_insert(record);
        Ok(Arc::clone(entry))
    }

    /// The cached record for a context, if it was warmed.
    pub fn get(&self, context_id: u64) -> Option<Arc<CapabilityRecord>> {
        self.records.lock().get(&context_id).map(Arc::clone)
    }
}
