use ndarray::{ArrayView3, ArrayViewMut3};

use crate::shared::error::RedactError;

/// Bytes per pixel: R, G, B, A.
pub const CHANNELS: usize = 4;

/// Row order of a buffer's storage.
///
/// `TopLeft` stores the top image row first (the `image` crate layout).
/// `BottomLeft` stores the bottom row first, the convention of geometric
/// drawing contexts. Region placement accounts for this in the coordinate
/// mapper, so a region lands on the same visual area either way.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PixelOrigin {
    #[default]
    TopLeft,
    BottomLeft,
}

/// An owned RGBA8 image with premultiplied alpha, stored row-major.
///
/// Decoding and encoding happen outside the core; this type only carries
/// the samples and the row order they were stored in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
    origin: PixelOrigin,
}

impl RasterBuffer {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self, RedactError> {
        Self::with_origin(data, width, height, PixelOrigin::TopLeft)
    }

    pub fn with_origin(
        data: Vec<u8>,
        width: u32,
        height: u32,
        origin: PixelOrigin,
    ) -> Result<Self, RedactError> {
        let expected = (width as usize) * (height as usize) * CHANNELS;
        if data.len() != expected {
            return Err(RedactError::InvalidBuffer(format!(
                "data length {} does not match {width}x{height} RGBA ({expected} bytes)",
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
            origin,
        })
    }

    /// A buffer where every pixel holds the same premultiplied sample.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = (width as usize) * (height as usize);
        Self {
            data: rgba.repeat(pixels),
            width,
            height,
            origin: PixelOrigin::TopLeft,
        }
    }

    /// Builds a premultiplied buffer from straight-alpha RGBA rows stored
    /// top row first, as produced by common decoders.
    pub fn from_straight_rgba(mut data: Vec<u8>, width: u32, height: u32) -> Result<Self, RedactError> {
        for px in data.chunks_exact_mut(CHANNELS) {
            let alpha = px[3] as u32;
            for c in &mut px[..3] {
                *c = ((*c as u32 * alpha + 127) / 255) as u8;
            }
        }
        Self::new(data, width, height)
    }

    /// Straight-alpha RGBA rows, top row first, for handing to an encoder.
    pub fn to_straight_rgba(&self) -> Vec<u8> {
        let mut out = self.to_origin(PixelOrigin::TopLeft).data;
        for px in out.chunks_exact_mut(CHANNELS) {
            let alpha = px[3] as u32;
            if alpha == 0 {
                px[..3].fill(0);
                continue;
            }
            for c in &mut px[..3] {
                *c = ((*c as u32 * 255 + alpha / 2) / alpha).min(255) as u8;
            }
        }
        out
    }

    /// Returns a copy stored in the requested row order.
    pub fn to_origin(&self, origin: PixelOrigin) -> RasterBuffer {
        if origin == self.origin {
            return self.clone();
        }
        let row_len = self.width as usize * CHANNELS;
        let mut data = Vec::with_capacity(self.data.len());
        if row_len > 0 {
            for row in self.data.chunks_exact(row_len).rev() {
                data.extend_from_slice(row);
            }
        }
        RasterBuffer {
            data,
            width: self.width,
            height: self.height,
            origin,
        }
    }

    /// True when there is no pixel to process.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn origin(&self) -> PixelOrigin {
        self.origin
    }

    /// Sample at storage column `x`, storage row `y`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * CHANNELS;
        let px = &self.data[idx..idx + CHANNELS];
        Some([px[0], px[1], px[2], px[3]])
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("RasterBuffer data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        let shape = self.shape();
        ArrayViewMut3::from_shape(shape, &mut self.data)
            .expect("RasterBuffer data length must match dimensions")
    }

    fn shape(&self) -> (usize, usize, usize) {
        (self.height as usize, self.width as usize, CHANNELS)
    }
}
