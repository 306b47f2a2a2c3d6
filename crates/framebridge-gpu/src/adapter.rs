//! Engine-facing adapter over a captured GPU frame.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::frame::{FrameTimestamp, VideoFrame};
use crate::planar::{crop_and_scale_i420, I420Buffer};
use crate::{GpuResult, Size};

/// How a frame crosses the encoder boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameBufferKind {
    /// GPU-resident; the encoder receives the texture directly.
    Native,

    /// CPU planar fallback for platforms without native hand-off.
    Planar,
}

/// A crop window in source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Wraps a captured [`VideoFrame`] as the engine's frame-buffer object.
///
/// Scaled and I420 views are produced on demand. The per-size scaled
/// cache has its own lock, independent of the original-resolution
/// conversion lock inside the buffer, so a slow full-resolution
/// conversion never blocks a differently-sized request.
pub struct VideoFrameAdapter {
    frame: VideoFrame,
    kind: FrameBufferKind,
    scaled: Mutex<Vec<Arc<I420Buffer>>>,
}

impl VideoFrameAdapter {
    /// Wrap a captured frame.
    pub fn new(frame: VideoFrame) -> Self {
        let kind = if frame.buffer().device().is_hardware_codec_supported() {
            FrameBufferKind::Native
        } else {
            FrameBufferKind::Planar
        };
        Self {
            frame,
            kind,
            scaled: Mutex::new(Vec::new()),
        }
    }

    pub fn kind(&self) -> FrameBufferKind {
        self.kind
    }

    pub fn size(&self) -> Size {
        self.frame.size()
    }

    pub fn timestamp(&self) -> FrameTimestamp {
        self.frame.timestamp()
    }

    /// The wrapped frame.
    pub fn frame(&self) -> &VideoFrame {
        &self.frame
    }

    /// The original-resolution planar view (lazy, cached in the buffer).
    pub fn to_i420(&self) -> GpuResult<Arc<I420Buffer>> {
        self.frame.buffer().to_i420()
    }

    /// A lazy cropped/scaled view of this frame. No work happens until
    /// the view is materialized.
    pub fn crop_and_scale(self: &Arc<Self>, crop: CropRect, size: Size) -> ScaledBuffer {
        ScaledBuffer {
            parent: Arc::clone(self),
            crop,
            size,
        }
    }

    /// The materialized planar buffer for an exact target size, scaled
    /// once and cached.
    pub fn buffer_for_size(&self, size: Size) -> GpuResult<Arc<I420Buffer>> {
        if size == self.size() {
            return self.to_i420();
        }

        if let Some(cached) = self.scaled.lock().iter().find(|b| b.size() == size) {
            return Ok(Arc::clone(cached));
        }

        // Convert outside the scaled-cache lock; the two caches must
        // not serialize against each other.
        let source = self.to_i420()?;
        let scaled = Arc::new(crop_and_scale_i420(
            &source,
            0,
            0,
            source.width(),
            source.height(),
            size,
        ));

        let mut cache = self.scaled.lock();
        if let Some(raced) = cache.iter().find(|b| b.size() == size) {
            return Ok(Arc::clone(raced));
        }
        cache.push(Arc::clone(&scaled));
        Ok(scaled)
    }
}

impl fmt::Debug for VideoFrameAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoFrameAdapter")
            .field("size", &self.size())
            .field("kind", &self.kind)
            .finish()
    }
}

/// A lightweight cropped/scaled view of an adapted frame.
pub struct ScaledBuffer {
    parent: Arc<VideoFrameAdapter>,
    crop: CropRect,
    size: Size,
}

impl ScaledBuffer {
    pub fn size(&self) -> Size {
        self.size
    }

    pub fn crop(&self) -> CropRect {
        self.crop
    }

    /// Materialize the view as planar I420.
    ///
    /// Full-frame views go through the parent's per-size cache; real
    /// crops are materialized directly.
    pub fn to_i420(&self) -> GpuResult<Arc<I420Buffer>> {
        let parent_size = self.parent.size();
        let full_frame = self.crop.x == 0
            && self.crop.y == 0
            && self.crop.width == parent_size.width
            && self.crop.height == parent_size.height;

        if full_frame {
            return self.parent.buffer_for_size(self.size);
        }

        let source = self.parent.to_i420()?;
        Ok(Arc::new(crop_and_scale_i420(
            &source,
            self.crop.x,
            self.crop.y,
            self.crop.width,
            self.crop.height,
            self.size,
        )))
    }
}
