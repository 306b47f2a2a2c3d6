//! Capture controller: the render-tick entry point of the pipeline.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{info, instrument, warn};

use framebridge_codec::nvenc_available;
use framebridge_gpu::{
    GraphicsDevice, NativeTexture, PixelFormat, Size, VideoFrameAdapter, VideoFramePool,
};

use crate::metrics::{PipelineMetrics, PipelineStats};
use crate::scheduler::FrameScheduler;

/// Cadence of the pool's stale-buffer sweep, driven from capture ticks.
const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Receives adapted frames on the scheduler's queue thread.
pub trait FrameConsumer: Send {
    fn on_frame(&mut self, frame: VideoFrameAdapter);
}

impl<F: FnMut(VideoFrameAdapter) + Send> FrameConsumer for F {
    fn on_frame(&mut self, frame: VideoFrameAdapter) {
        self(frame);
    }
}

struct PendingSurface {
    native: NativeTexture,
    size: Size,
    format: PixelFormat,
}

/// Bridges the host engine's render ticks into paced, pooled frames.
///
/// The render thread stashes its latest texture via
/// [`on_render_tick`](Self::on_render_tick) (latest wins; an
/// overwritten surface counts as a capture drop). The scheduler's tick
/// drains the slot, acquires a pooled GPU buffer, and hands the adapted
/// frame to the consumer. The pool's stale sweep rides on the same
/// tick.
pub struct CaptureController {
    pool: Arc<VideoFramePool>,
    scheduler: FrameScheduler,
    pending: Arc<Mutex<Option<PendingSurface>>>,
    metrics: Arc<PipelineMetrics>,
}

impl CaptureController {
    /// Create a controller over a graphics device.
    #[instrument(name = "capture_controller_new", skip(gpu))]
    pub fn new(gpu: Arc<dyn GraphicsDevice>, max_framerate_fps: u32) -> Self {
        info!(
            nvenc = nvenc_available(),
            codec_capable = gpu.is_hardware_codec_supported(),
            "Hardware codec probe"
        );
        Self {
            pool: Arc::new(VideoFramePool::new(gpu)),
            scheduler: FrameScheduler::new(max_framerate_fps),
            pending: Arc::new(Mutex::new(None)),
            metrics: Arc::new(PipelineMetrics::new(max_framerate_fps as f32)),
        }
    }

    /// Render-thread entry point: stash the latest native surface.
    pub fn on_render_tick(&self, native: NativeTexture, size: Size, format: PixelFormat) {
        let mut slot = self.pending.lock();
        if slot
            .replace(PendingSurface {
                native,
                size,
                format,
            })
            .is_some()
        {
            // The previous surface was never captured.
            self.metrics.record_capture_drop();
        }
    }

    /// Begin paced capture into `consumer`.
    pub fn start(&self, mut consumer: impl FrameConsumer + 'static) {
        let pool = Arc::clone(&self.pool);
        let pending = Arc::clone(&self.pending);
        let metrics = Arc::clone(&self.metrics);
        let mut last_sweep = Instant::now();

        self.scheduler.start(move || {
            if let Some(surface) = pending.lock().take() {
                match pool.create_frame(surface.native, surface.size, surface.format) {
                    Ok(frame) => {
                        metrics.record_frame();
                        consumer.on_frame(VideoFrameAdapter::new(frame));
                    }
                    Err(e) => {
                        warn!("Frame acquisition failed: {e}");
                        metrics.record_capture_drop();
                    }
                }
            }

            let now = Instant::now();
            if now.duration_since(last_sweep) >= SWEEP_INTERVAL {
                pool.release_stale_buffers(now);
                last_sweep = now;
            }
        });
    }

    /// Pause or resume capture (cooperative, see [`FrameScheduler`]).
    pub fn pause(&self, paused: bool) {
        self.scheduler.pause(paused);
    }

    /// Adjust the capture target framerate.
    pub fn set_max_framerate_fps(&self, max_framerate_fps: u32) {
        self.scheduler.set_max_framerate_fps(max_framerate_fps);
    }

    /// The underlying buffer pool.
    pub fn pool(&self) -> &Arc<VideoFramePool> {
        &self.pool
    }

    /// Shared metrics collector (encode-side drops are recorded here
    /// by the consumer).
    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }

    /// Current pipeline statistics.
    pub fn stats(&self) -> PipelineStats {
        self.metrics.snapshot()
    }
}
