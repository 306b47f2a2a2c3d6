//! Planar YUV buffers and CPU-side conversions.

use bytes::{BufMut, Bytes, BytesMut};

use crate::{GpuError, GpuResult, Size};

/// A planar YUV 4:2:0 buffer (Y, U, V planes stored contiguously).
///
/// Chroma planes are half resolution, rounded up for odd dimensions.
#[derive(Debug, Clone)]
pub struct I420Buffer {
    size: Size,
    data: Bytes,
}

impl I420Buffer {
    /// Bytes required for a buffer of the given size.
    pub fn buffer_len(size: Size) -> usize {
        let y = (size.width as usize) * (size.height as usize);
        let c = chroma_width(size) * chroma_height(size);
        y + 2 * c
    }

    /// Wrap existing planar data. Fails when the length does not match
    /// the dimensions.
    pub fn from_data(size: Size, data: Bytes) -> GpuResult<Self> {
        let expected = Self::buffer_len(size);
        if data.len() != expected {
            return Err(GpuError::Conversion(format!(
                "expected {} bytes for {} I420, got {}",
                expected,
                size,
                data.len()
            )));
        }
        Ok(Self { size, data })
    }

    /// A black (Y=0, U=V=128) buffer of the given size.
    pub fn black(size: Size) -> Self {
        let y_len = (size.width as usize) * (size.height as usize);
        let c_len = chroma_width(size) * chroma_height(size);
        let mut data = BytesMut::with_capacity(y_len + 2 * c_len);
        data.put_bytes(0, y_len);
        data.put_bytes(128, 2 * c_len);
        Self {
            size,
            data: data.freeze(),
        }
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    /// Luma plane stride in bytes.
    pub fn stride_y(&self) -> usize {
        self.size.width as usize
    }

    /// Chroma plane stride in bytes.
    pub fn stride_c(&self) -> usize {
        chroma_width(self.size)
    }

    /// The Y plane.
    pub fn y(&self) -> &[u8] {
        &self.data[..self.y_len()]
    }

    /// The U plane.
    pub fn u(&self) -> &[u8] {
        let y = self.y_len();
        &self.data[y..y + self.c_len()]
    }

    /// The V plane.
    pub fn v(&self) -> &[u8] {
        let start = self.y_len() + self.c_len();
        &self.data[start..start + self.c_len()]
    }

    /// The full contiguous Y+U+V payload.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    fn y_len(&self) -> usize {
        (self.size.width as usize) * (self.size.height as usize)
    }

    fn c_len(&self) -> usize {
        chroma_width(self.size) * chroma_height(self.size)
    }
}

fn chroma_width(size: Size) -> usize {
    (size.width as usize + 1) / 2
}

fn chroma_height(size: Size) -> usize {
    (size.height as usize + 1) / 2
}

/// Deinterleave an NV12 payload into planar I420.
///
/// Hardware decoders emit NV12; downstream consumers only accept
/// planar I420, so this runs once per decoded frame.
pub fn nv12_to_i420(nv12: &[u8], size: Size) -> GpuResult<I420Buffer> {
    let y_len = (size.width as usize) * (size.height as usize);
    let cw = chroma_width(size);
    let ch = chroma_height(size);
    let expected = y_len + 2 * cw * ch;
    if nv12.len() != expected {
        return Err(GpuError::Conversion(format!(
            "expected {} bytes for {} NV12, got {}",
            expected,
            size,
            nv12.len()
        )));
    }

    let mut data = BytesMut::with_capacity(expected);
    data.extend_from_slice(&nv12[..y_len]);

    // Split the interleaved UV plane into U then V.
    let uv = &nv12[y_len..];
    let mut u = Vec::with_capacity(cw * ch);
    let mut v = Vec::with_capacity(cw * ch);
    for pair in uv.chunks_exact(2) {
        u.push(pair[0]);
        v.push(pair[1]);
    }
    data.extend_from_slice(&u);
    data.extend_from_slice(&v);

    I420Buffer::from_data(size, data.freeze())
}

/// Scale an I420 buffer to a new size (nearest-neighbor).
pub fn scale_i420(src: &I420Buffer, dst_size: Size) -> I420Buffer {
    crop_and_scale_i420(src, 0, 0, src.width(), src.height(), dst_size)
}

/// Crop a window out of `src` and scale it to `dst_size`
/// (nearest-neighbor, applied per plane).
pub fn crop_and_scale_i420(
    src: &I420Buffer,
    crop_x: u32,
    crop_y: u32,
    crop_width: u32,
    crop_height: u32,
    dst_size: Size,
) -> I420Buffer {
    let crop_x = crop_x.min(src.width().saturating_sub(1));
    let crop_y = crop_y.min(src.height().saturating_sub(1));
    let crop_width = crop_width.min(src.width() - crop_x).max(1);
    let crop_height = crop_height.min(src.height() - crop_y).max(1);

    let mut data = BytesMut::with_capacity(I420Buffer::buffer_len(dst_size));

    sample_plane(
        src.y(),
        src.stride_y(),
        crop_x,
        crop_y,
        crop_width,
        crop_height,
        dst_size.width,
        dst_size.height,
        &mut data,
    );

    let c_dst_w = (dst_size.width + 1) / 2;
    let c_dst_h = (dst_size.height + 1) / 2;
    for plane in [src.u(), src.v()] {
        sample_plane(
            plane,
            src.stride_c(),
            crop_x / 2,
            crop_y / 2,
            (crop_width + 1) / 2,
            (crop_height + 1) / 2,
            c_dst_w,
            c_dst_h,
            &mut data,
        );
    }

    I420Buffer {
        size: dst_size,
        data: data.freeze(),
    }
}

#[allow(clippy::too_many_arguments)]
fn sample_plane(
    plane: &[u8],
    stride: usize,
    crop_x: u32,
    crop_y: u32,
    crop_w: u32,
    crop_h: u32,
    dst_w: u32,
    dst_h: u32,
    out: &mut BytesMut,
) {
    for dy in 0..dst_h {
        let sy = crop_y as usize + (dy as usize * crop_h as usize) / dst_h.max(1) as usize;
        let row = &plane[sy * stride..];
        for dx in 0..dst_w {
            let sx = crop_x as usize + (dx as usize * crop_w as usize) / dst_w.max(1) as usize;
            out.put_u8(row[sx]);
        }
    }
}
