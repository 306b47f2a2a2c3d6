//! Recycling pool for GPU frame buffers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, error, trace};

use crate::buffer::GpuMemoryBuffer;
use crate::frame::{FrameTimestamp, VideoFrame};
use crate::{GpuResult, GraphicsDevice, NativeTexture, PixelFormat, Size};

/// Free buffers idle longer than this are destroyed by the stale sweep.
pub const STALE_BUFFER_TIMEOUT: Duration = Duration::from_secs(10);

/// One pooled buffer and its usage bookkeeping.
struct FrameResources {
    buffer: Arc<GpuMemoryBuffer>,
    last_use: Instant,
    in_use: bool,
}

/// Recycles GPU buffers by (size, format) compatibility.
///
/// Acquisition and the frame-return callback share one mutex: a frame
/// may be dropped on a different thread than the one that created it.
/// The pool never shrinks synchronously; the caller drives
/// [`release_stale_buffers`](Self::release_stale_buffers) periodically.
pub struct VideoFramePool {
    device: Arc<dyn GraphicsDevice>,
    entries: Arc<Mutex<Vec<FrameResources>>>,
    start_time: Instant,
}

impl VideoFramePool {
    /// Create an empty pool over a graphics device.
    pub fn new(device: Arc<dyn GraphicsDevice>) -> Self {
        Self {
            device,
            entries: Arc::new(Mutex::new(Vec::new())),
            start_time: Instant::now(),
        }
    }

    /// Produce a frame for a native texture, reusing a free compatible
    /// buffer when one exists.
    pub fn create_frame(
        &self,
        native: NativeTexture,
        size: Size,
        format: PixelFormat,
    ) -> GpuResult<VideoFrame> {
        let timestamp = FrameTimestamp::now(self.start_time);

        let buffer = {
            let mut entries = self.entries.lock();

            let reusable = entries
                .iter_mut()
                .find(|e| !e.in_use && e.buffer.size() == size && e.buffer.format() == format);

            match reusable {
                Some(entry) => {
                    entry.buffer.copy_from_native(native)?;
                    entry.in_use = true;
                    entry.last_use = Instant::now();
                    trace!(%size, "Reusing pooled buffer");
                    Arc::clone(&entry.buffer)
                }
                None => {
                    let buffer = Arc::new(GpuMemoryBuffer::create(
                        Arc::clone(&self.device),
                        native,
                        size,
                        format,
                    )?);
                    debug!(%size, pool_len = entries.len() + 1, "Pool miss, allocated new buffer");
                    entries.push(FrameResources {
                        buffer: Arc::clone(&buffer),
                        last_use: Instant::now(),
                        in_use: true,
                    });
                    buffer
                }
            }
        };

        let entries = Arc::clone(&self.entries);
        Ok(VideoFrame::new(
            buffer,
            timestamp,
            Box::new(move |returned| Self::release(&entries, returned)),
        ))
    }

    /// Frame-return path: flip the owning entry back to free.
    fn release(entries: &Mutex<Vec<FrameResources>>, buffer: Arc<GpuMemoryBuffer>) {
        let mut entries = entries.lock();
        match entries
            .iter_mut()
            .find(|e| Arc::ptr_eq(&e.buffer, &buffer))
        {
            Some(entry) => {
                entry.in_use = false;
                entry.last_use = Instant::now();
            }
            None => {
                // A returned buffer the pool does not know is a dangling
                // reference from a bookkeeping bug upstream.
                debug_assert!(false, "returned buffer does not belong to this pool");
                error!(size = %buffer.size(), "Returned buffer does not belong to this pool");
            }
        }
    }

    /// Destroy free buffers idle longer than [`STALE_BUFFER_TIMEOUT`].
    ///
    /// In-use buffers are never touched. The pool has no background
    /// thread; callers invoke this on their own cadence.
    pub fn release_stale_buffers(&self, now: Instant) {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|e| {
            e.in_use || now.saturating_duration_since(e.last_use) <= STALE_BUFFER_TIMEOUT
        });
        let freed = before - entries.len();
        if freed > 0 {
            debug!(freed, remaining = entries.len(), "Swept stale buffers");
        }
    }

    /// Number of pooled buffers (free and in use).
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True when no buffers are pooled.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
