//! Captured video frames and their timestamps.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::buffer::GpuMemoryBuffer;
use crate::Size;

/// Timestamp of a captured frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameTimestamp {
    /// Monotonic instant the frame was captured.
    pub capture_time: Instant,

    /// Presentation timestamp in 100 ns units relative to pipeline start.
    pub pts_100ns: u64,
}

impl FrameTimestamp {
    /// Stamp "now" against the pipeline's start instant.
    pub fn now(start_time: Instant) -> Self {
        let capture_time = Instant::now();
        let pts_100ns = capture_time.duration_since(start_time).as_nanos() as u64 / 100;
        Self {
            capture_time,
            pts_100ns,
        }
    }

    /// Presentation timestamp in milliseconds.
    pub fn pts_ms(&self) -> u64 {
        self.pts_100ns / 10_000
    }
}

type ReturnFn = Box<dyn FnOnce(Arc<GpuMemoryBuffer>) + Send>;

/// An immutable captured frame wrapping a pooled GPU buffer.
///
/// Dropping the frame fires its return callback exactly once, handing
/// the buffer reference back to the pool that produced it.
pub struct VideoFrame {
    size: Size,
    buffer: Arc<GpuMemoryBuffer>,
    timestamp: FrameTimestamp,
    on_return: Option<ReturnFn>,
}

impl VideoFrame {
    /// Wrap a pooled buffer. `on_return` runs when the frame is dropped.
    pub fn new(
        buffer: Arc<GpuMemoryBuffer>,
        timestamp: FrameTimestamp,
        on_return: ReturnFn,
    ) -> Self {
        Self {
            size: buffer.size(),
            buffer,
            timestamp,
            on_return: Some(on_return),
        }
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn timestamp(&self) -> FrameTimestamp {
        self.timestamp
    }

    /// The underlying GPU buffer.
    pub fn buffer(&self) -> &Arc<GpuMemoryBuffer> {
        &self.buffer
    }
}

impl Drop for VideoFrame {
    fn drop(&mut self) {
        if let Some(on_return) = self.on_return.take() {
            on_return(Arc::clone(&self.buffer));
        }
    }
}

impl fmt::Debug for VideoFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoFrame")
            .field("size", &self.size)
            .field("pts_100ns", &self.timestamp.pts_100ns)
            .finish()
    }
}
