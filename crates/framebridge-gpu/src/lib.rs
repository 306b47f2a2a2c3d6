//! GPU-resident video frame buffers and pooling.
//!
//! This crate owns the lifetime of GPU-backed frames: native texture
//! import, fence-gated planar conversion, buffer recycling, and the
//! adapter that presents a captured frame to downstream consumers.
//! Platform texture allocation sits behind the [`GraphicsDevice`] trait;
//! no graphics API is linked directly.

mod adapter;
mod buffer;
mod error;
mod frame;
mod handle;
mod planar;
mod pool;
#[cfg(test)]
mod testdev;

pub use adapter::{CropRect, FrameBufferKind, ScaledBuffer, VideoFrameAdapter};
pub use buffer::GpuMemoryBuffer;
pub use error::GpuError;
pub use frame::{FrameTimestamp, VideoFrame};
pub use handle::BufferHandle;
pub use planar::{crop_and_scale_i420, nv12_to_i420, scale_i420, I420Buffer};
pub use pool::{VideoFramePool, STALE_BUFFER_TIMEOUT};

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

/// Result type for GPU buffer operations.
pub type GpuResult<T> = Result<T, GpuError>;

/// Bound on a fence wait before a CPU-side access gives up.
pub const SYNC_WAIT_TIMEOUT: Duration = Duration::from_millis(30);

/// Width/height pair, compared by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    /// Create a new size.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total pixel count.
    pub const fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// True if either dimension is zero.
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Opaque pixel-format tag for textures and buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 8-bit BGRA, interleaved.
    Bgra8,

    /// 8-bit RGBA, interleaved.
    Rgba8,

    /// Y plane followed by an interleaved UV plane (GPU-native 4:2:0).
    Nv12,

    /// Planar YUV 4:2:0 (CPU-native).
    I420,
}

/// An opaque reference to a texture owned by the host rendering engine.
///
/// The pointer is never dereferenced by this crate; it is only handed
/// back to the [`GraphicsDevice`] that understands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeTexture(usize);

impl NativeTexture {
    /// Wrap a raw native resource pointer.
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// The raw pointer value.
    pub const fn as_raw(&self) -> usize {
        self.0
    }
}

/// A texture allocated through a [`GraphicsDevice`].
///
/// Backends downcast through [`Texture::as_any`] to reach their own
/// concrete resource type.
pub trait Texture: Send + Sync {
    /// Texture dimensions.
    fn size(&self) -> Size;

    /// Texture pixel format.
    fn format(&self) -> PixelFormat;

    /// Downcast hook for the owning backend.
    fn as_any(&self) -> &dyn Any;
}

/// The capability surface implemented by the platform graphics backend.
///
/// Everything platform-specific (D3D, Metal, Vulkan, GL) lives behind
/// this trait; the pipeline only ever sees textures, fences, and planar
/// buffers.
pub trait GraphicsDevice: Send + Sync {
    /// Allocate a GPU-resident texture.
    fn create_default_texture(&self, size: Size, format: PixelFormat)
        -> GpuResult<Arc<dyn Texture>>;

    /// Allocate a CPU-readable shadow texture.
    fn create_cpu_readable_texture(
        &self,
        size: Size,
        format: PixelFormat,
    ) -> GpuResult<Arc<dyn Texture>>;

    /// Copy the contents of a host-engine texture into `dst`.
    fn copy_resource_from_native(&self, dst: &dyn Texture, src: NativeTexture) -> GpuResult<()>;

    /// Copy one texture into another of the same size.
    fn copy_texture(&self, dst: &dyn Texture, src: &dyn Texture) -> GpuResult<()>;

    /// Scale `src` into `dst` on the GPU.
    fn scale_texture(&self, dst: &dyn Texture, src: &dyn Texture) -> GpuResult<()>;

    /// Map a texture for external access, producing an owned handle.
    fn map(&self, texture: &dyn Texture) -> GpuResult<BufferHandle>;

    /// Wait for the texture's fence. Returns `false` on timeout.
    fn wait_sync(&self, texture: &dyn Texture, timeout: Duration) -> GpuResult<bool>;

    /// Reset the texture's fence ahead of a new write.
    fn reset_sync(&self, texture: &dyn Texture) -> GpuResult<bool>;

    /// Read a texture back as planar I420.
    fn convert_to_i420(&self, texture: &dyn Texture) -> GpuResult<I420Buffer>;

    /// Identifier of the device's compute context, if it has one.
    ///
    /// Used to key per-context caches; two devices sharing a context
    /// report the same value.
    fn compute_context(&self) -> Option<u64>;

    /// Whether the device can hand textures directly to a hardware codec.
    fn is_hardware_codec_supported(&self) -> bool;

    /// The pixel format hardware encode sessions prefer as input.
    fn preferred_encode_format(&self) -> PixelFormat;
}
