//! Pipeline metrics collection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::RwLock;
use serde::Serialize;

/// Snapshot of pipeline throughput for host reporting.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineStats {
    /// Captured frames per second since the last report.
    pub fps: f32,

    /// Configured capture target.
    pub target_fps: f32,

    /// Frames handed to the consumer since start.
    pub frames_captured: u64,

    /// Render ticks dropped before capture (slot overwritten or
    /// acquisition failed).
    pub capture_drops: u64,

    /// Frames the encoder rejected or failed on.
    pub encode_drops: u64,

    /// Seconds since the collector was created.
    pub uptime_seconds: u64,
}

/// Collects pipeline counters across threads.
pub struct PipelineMetrics {
    created_at: Instant,
    frames_captured: AtomicU64,
    capture_drops: AtomicU64,
    encode_drops: AtomicU64,
    last_report: RwLock<Instant>,
    last_frame_count: AtomicU64,
    target_fps: f32,
}

impl PipelineMetrics {
    /// Create a collector with a capture target for the fps gauge.
    pub fn new(target_fps: f32) -> Self {
        Self {
            created_at: Instant::now(),
            frames_captured: AtomicU64::new(0),
            capture_drops: AtomicU64::new(0),
            encode_drops: AtomicU64::new(0),
            last_report: RwLock::new(Instant::now()),
            last_frame_count: AtomicU64::new(0),
            target_fps,
        }
    }

    /// Record a frame delivered to the consumer.
    pub fn record_frame(&self) {
        self.frames_captured.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a render tick that never became a frame.
    pub fn record_capture_drop(&self) {
        self.capture_drops.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an encode-side drop.
    pub fn record_encode_drop(&self) {
        self.encode_drops.fetch_add(1, Ordering::Relaxed);
    }

    /// Current counters plus an fps estimate over the window since the
    /// last [`mark_reported`](Self::mark_reported).
    pub fn snapshot(&self) -> PipelineStats {
        let now = Instant::now();
        let elapsed = now.duration_since(*self.last_report.read()).as_secs_f32();
        let captured = self.frames_captured.load(Ordering::Relaxed);
        let since_report = captured - self.last_frame_count.load(Ordering::Relaxed);

        let fps = if elapsed > 0.0 {
            since_report as f32 / elapsed
        } else {
            0.0
        };

        PipelineStats {
            fps,
            target_fps: self.target_fps,
            frames_captured: captured,
            capture_drops: self.capture_drops.load(Ordering::Relaxed),
            encode_drops: self.encode_drops.load(Ordering::Relaxed),
            uptime_seconds: now.duration_since(self.created_at).as_secs(),
        }
    }

    /// Reset the fps window after a report is emitted.
    pub fn mark_reported(&self) {
        *self.last_report.write() = Instant::now();
        self.last_frame_count
            .store(self.frames_captured.load(Ordering::Relaxed), Ordering::Relaxed);
    }
}
