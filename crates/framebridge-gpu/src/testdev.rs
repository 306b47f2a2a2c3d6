//! In-memory graphics device for tests.

use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::{BufMut, BytesMut};

use crate::handle::BufferHandle;
use crate::planar::I420Buffer;
use crate::{GpuResult, GraphicsDevice, NativeTexture, PixelFormat, Size, Texture};

pub struct MockTexture {
    size: Size,
    format: PixelFormat,
}

impl Texture for MockTexture {
    fn size(&self) -> Size {
        self.size
    }

    fn format(&self) -> PixelFormat {
        self.format
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A deterministic [`GraphicsDevice`] with no real GPU behind it.
pub struct MockDevice {
    codec_supported: bool,
    wait_times_out: AtomicBool,
    native_copies: AtomicUsize,
    luma_fill: u8,
}

impl MockDevice {
    /// A device that reports hardware-codec support.
    pub fn new() -> Self {
        Self {
            codec_supported: true,
            wait_times_out: AtomicBool::new(false),
            native_copies: AtomicUsize::new(0),
            luma_fill: 0x40,
        }
    }

    /// A device without codec support (planar fallback path).
    pub fn software() -> Self {
        Self {
            codec_supported: false,
            ..Self::new()
        }
    }

    /// Make subsequent fence waits time out.
    pub fn set_wait_times_out(&self, times_out: bool) {
        self.wait_times_out.store(times_out, Ordering::SeqCst);
    }

    pub fn native_copies(&self) -> usize {
        self.native_copies.load(Ordering::SeqCst)
    }
}

impl GraphicsDevice for MockDevice {
    fn create_default_texture(
        &self,
        size: Size,
        format: PixelFormat,
    ) -> GpuResult<Arc<dyn Texture>> {
        Ok(Arc::new(MockTexture { size, format }))
    }

    fn create_cpu_readable_texture(
        &self,
        size: Size,
        format: PixelFormat,
    ) -> GpuResult<Arc<dyn Texture>> {
        Ok(Arc::new(MockTexture { size, format }))
    }

    fn copy_resource_from_native(&self, _dst: &dyn Texture, _src: NativeTexture) -> GpuResult<()> {
        self.native_copies.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn copy_texture(&self, _dst: &dyn Texture, _src: &dyn Texture) -> GpuResult<()> {
        Ok(())
    }

    fn scale_texture(&self, _dst: &dyn Texture, _src: &dyn Texture) -> GpuResult<()> {
        Ok(())
    }

    fn map(&self, _texture: &dyn Texture) -> GpuResult<BufferHandle> {
        Ok(BufferHandle::new(NativeTexture::from_raw(0xdead)))
    }

    fn wait_sync(&self, _texture: &dyn Texture, _timeout: Duration) -> GpuResult<bool> {
        Ok(!self.wait_times_out.load(Ordering::SeqCst))
    }

    fn reset_sync(&self, _texture: &dyn Texture) -> GpuResult<bool> {
        Ok(true)
    }

    fn convert_to_i420(&self, texture: &dyn Texture) -> GpuResult<I420Buffer> {
        let size = texture.size();
        let y_len = (size.width as usize) * (size.height as usize);
        let c_len = I420Buffer::buffer_len(size) - y_len;
        let mut data = BytesMut::with_capacity(y_len + c_len);
        data.put_bytes(self.luma_fill, y_len);
        data.put_bytes(128, c_len);
        I420Buffer::from_data(size, data.freeze())
    }

    fn compute_context(&self) -> Option<u64> {
        Some(1)
    }

    fn is_hardware_codec_supported(&self) -> bool {
        self.codec_supported
    }

    fn preferred_encode_format(&self) -> PixelFormat {
        PixelFormat::Nv12
    }
}
