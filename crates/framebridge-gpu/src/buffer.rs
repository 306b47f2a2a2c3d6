//! GPU memory buffers backing captured frames.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::handle::BufferHandle;
use crate::planar::I420Buffer;
use crate::{GpuError, GpuResult, GraphicsDevice, NativeTexture, PixelFormat, Size, Texture,
    SYNC_WAIT_TIMEOUT};

/// A GPU-resident frame buffer with a lazily converted planar view.
///
/// Construction allocates the GPU texture (and a CPU-readable shadow
/// when the device cannot hand textures to a codec directly), then
/// copies the host engine's native content in. The planar conversion is
/// fence-gated and cached until the buffer is rewritten.
pub struct GpuMemoryBuffer {
    device: Arc<dyn GraphicsDevice>,
    size: Size,
    format: PixelFormat,
    texture: Arc<dyn Texture>,
    staging: Option<Arc<dyn Texture>>,
    codec_registered: bool,
    i420_cache: Mutex<Option<Arc<I420Buffer>>>,
}

impl GpuMemoryBuffer {
    /// Allocate a buffer and fill it from a native texture.
    pub fn create(
        device: Arc<dyn GraphicsDevice>,
        native: NativeTexture,
        size: Size,
        format: PixelFormat,
    ) -> GpuResult<Self> {
        if size.is_empty() {
            return Err(GpuError::TextureCreation(format!(
                "refusing zero-sized buffer ({size})"
            )));
        }

        let texture = device.create_default_texture(size, format)?;

        // Codec-capable devices read the texture directly; everything
        // else needs a CPU-readable shadow for planar conversion.
        let codec_registered = device.is_hardware_codec_supported();
        let staging = if codec_registered {
            None
        } else {
            Some(device.create_cpu_readable_texture(size, format)?)
        };

        device.copy_resource_from_native(&*texture, native)?;

        debug!(%size, ?format, codec_registered, "Allocated GPU buffer");

        Ok(Self {
            device,
            size,
            format,
            texture,
            staging,
            codec_registered,
            i420_cache: Mutex::new(None),
        })
    }

    /// Rewrite the buffer from a new native texture (pool reuse path).
    ///
    /// Resets the fence and drops the cached planar conversion before
    /// the copy.
    pub fn copy_from_native(&self, native: NativeTexture) -> GpuResult<()> {
        if !self.device.reset_sync(&*self.texture)? {
            warn!(size = %self.size, "Fence reset failed before buffer reuse");
        }
        self.i420_cache.lock().take();
        self.device.copy_resource_from_native(&*self.texture, native)
    }

    /// Convert the buffer to planar I420, waiting on the GPU fence
    /// first (bounded by [`SYNC_WAIT_TIMEOUT`]).
    ///
    /// The conversion runs once and is cached until the next
    /// [`copy_from_native`](Self::copy_from_native).
    pub fn to_i420(&self) -> GpuResult<Arc<I420Buffer>> {
        let mut cache = self.i420_cache.lock();
        if let Some(planar) = cache.as_ref() {
            return Ok(Arc::clone(planar));
        }

        if !self.device.wait_sync(&*self.texture, SYNC_WAIT_TIMEOUT)? {
            warn!(size = %self.size, timeout = ?SYNC_WAIT_TIMEOUT, "Fence wait timed out, skipping conversion");
            return Err(GpuError::SyncTimeout(SYNC_WAIT_TIMEOUT));
        }

        // Planar readback goes through the CPU-readable shadow when one
        // exists; codec-capable devices read the texture directly.
        let source = match self.staging.as_ref() {
            Some(staging) => {
                self.device.copy_texture(&**staging, &*self.texture)?;
                staging
            }
            None => &self.texture,
        };
        let planar = Arc::new(self.device.convert_to_i420(&**source)?);
        *cache = Some(Arc::clone(&planar));
        Ok(planar)
    }

    /// Map the buffer for external access (fence-gated).
    pub fn handle(&self) -> GpuResult<BufferHandle> {
        if !self.device.wait_sync(&*self.texture, SYNC_WAIT_TIMEOUT)? {
            warn!(size = %self.size, "Fence wait timed out, refusing to map");
            return Err(GpuError::SyncTimeout(SYNC_WAIT_TIMEOUT));
        }
        self.device.map(&*self.texture)
    }

    /// The GPU-resident texture.
    pub fn texture(&self) -> &Arc<dyn Texture> {
        &self.texture
    }

    /// The owning graphics device.
    pub fn device(&self) -> &Arc<dyn GraphicsDevice> {
        &self.device
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Whether the buffer was registered with the codec interop
    /// subsystem at construction.
    pub fn is_codec_registered(&self) -> bool {
        self.codec_registered
    }
}

impl fmt::Debug for GpuMemoryBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuMemoryBuffer")
            .field("size", &self.size)
            .field("format", &self.format)
            .field("codec_registered", &self.codec_registered)
            .finish()
    }
}
