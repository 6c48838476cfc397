// THEORY:
// A `Frame` is the raw input of one detection call: a W x H raster of RGBA bytes,
// already cropped by the caller to whatever region it cares about. Like the
// other data containers it is "dumb" - it knows how to validate its own shape
// and hand out pixels, nothing more. It is consumed by the call that receives it
// and only survives through the grayscale field derived from it.
//
// The optional `Roi` travels alongside a frame purely for the caller's
// bookkeeping. The detector never reads it; it is echoed back verbatim on any
// shots emitted for that frame.

use crate::core_modules::pixel::pixel::{CHANNELS, Pixel};
use crate::error::DetectError;
use serde::{Deserialize, Serialize};

/// An RGBA raster handed to the detector for exactly one call.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA bytes, `width * height * 4` long for a well-formed frame.
    pub data: Vec<u8>,
}

/// The caller-side rectangle a frame was cropped from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    /// Wraps a raster without checking it. Shape problems surface as
    /// `DetectError::InvalidFrame` when the frame is processed.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
        }
    }

    /// A frame filled with one color.
    pub fn filled(width: u32, height: u32, pixel: Pixel) -> Self {
        let count = width as usize * height as usize;
        let mut data = Vec::with_capacity(count * CHANNELS);
        for _ in 0..count {
            data.extend_from_slice(&[pixel.red, pixel.green, pixel.blue, pixel.alpha]);
        }
        Self::new(width, height, data)
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Confirms the raster is non-empty and its byte length matches its dimensions.
    pub fn validate(&self) -> Result<(), DetectError> {
        let expected = self.pixel_count().checked_mul(CHANNELS);
        if self.width == 0 || self.height == 0 || expected != Some(self.data.len()) {
            return Err(DetectError::InvalidFrame {
                width: self.width,
                height: self.height,
                len: self.data.len(),
            });
        }
        Ok(())
    }

    /// The pixel at (x, y). Panics when out of bounds, like slice indexing.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Pixel {
        let start = (y as usize * self.width as usize + x as usize) * CHANNELS;
        Pixel::from(&self.data[start..start + CHANNELS])
    }

    pub fn pixels(&self) -> impl Iterator<Item = Pixel> + '_ {
        self.data.chunks_exact(CHANNELS).map(Pixel::from)
    }

    /// Paints an axis-aligned rectangle `[x0, x1) x [y0, y1)`, clipped to the frame.
    pub fn fill_rect(&mut self, x0: u32, y0: u32, x1: u32, y1: u32, pixel: Pixel) {
        for y in y0..y1.min(self.height) {
            for x in x0..x1.min(self.width) {
                self.set_pixel(x, y, pixel);
            }
        }
    }

    /// Paints every pixel whose center lies within `radius` of `(cx, cy)`.
    pub fn fill_disk(&mut self, cx: f64, cy: f64, radius: f64, pixel: Pixel) {
        for y in 0..self.height {
            for x in 0..self.width {
                let dx = x as f64 + 0.5 - cx;
                let dy = y as f64 + 0.5 - cy;
                if dx * dx + dy * dy <= radius * radius {
                    self.set_pixel(x, y, pixel);
                }
            }
        }
    }

    /// Copies the `roi` rectangle out into a new frame.
    pub fn crop(&self, roi: &Roi) -> Result<Frame, DetectError> {
        self.validate()?;
        let fits = |start: u32, len: u32, limit: u32| {
            len > 0 && start.checked_add(len).is_some_and(|end| end <= limit)
        };
        if !fits(roi.x, roi.width, self.width) || !fits(roi.y, roi.height, self.height) {
            return Err(DetectError::RoiOutOfBounds {
                roi: *roi,
                width: self.width,
                height: self.height,
            });
        }

        let row_bytes = roi.width as usize * CHANNELS;
        let mut data = Vec::with_capacity(row_bytes * roi.height as usize);
        for y in roi.y..roi.y + roi.height {
            let start = (y as usize * self.width as usize + roi.x as usize) * CHANNELS;
            data.extend_from_slice(&self.data[start..start + row_bytes]);
        }
        Ok(Frame::new(roi.width, roi.height, data))
    }

    #[inline]
    fn set_pixel(&mut self, x: u32, y: u32, pixel: Pixel) {
        let start = (y as usize * self.width as usize + x as usize) * CHANNELS;
        self.data[start..start + CHANNELS]
            .copy_from_slice(&[pixel.red, pixel.green, pixel.blue, pixel.alpha]);
    }
}

impl From<image::RgbaImage> for Frame {
    fn from(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self::new(width, height, img.into_raw())
    }
}
