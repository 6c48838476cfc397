// THEORY:
// The `GrayField` is the working representation of a frame once color no longer
// matters: one floating-point luminance value per pixel. Everything the detector
// compares - baseline versus current, aligned versus raw - is a `GrayField`.
//
// Operations, in the order the pipeline uses them:
// 1.  `from_frame`: luminance extraction (validates the raster first).
// 2.  `translate`: bilinear resampling by a sub-pixel offset, edge-clamped. This
//     is how stabilization re-aligns the current frame onto the baseline.
// 3.  `dark_difference`: one-directional difference, `max(0, baseline - current)`.
//     Only pixels that got darker count; a light target gaining dark holes is the
//     whole point, so brightening is ignored.
// 4.  `stats`: single-pass mean and population standard deviation, from which
//     the adaptive threshold `mean + 2 * std_dev` is derived.
// 5.  `downsample_binarize`: block-average by an integer factor and compare each
//     block against the threshold, producing the mask the morphology and
//     labeling layers work on.

use crate::core_modules::frame::Frame;
use crate::core_modules::morphology::BinaryMask;
use crate::error::DetectError;

/// Number of standard deviations above the mean a downsampled block must reach.
pub const THRESHOLD_STD_DEVS: f64 = 2.0;

/// Sub-pixel offsets closer than this to an integer are sampled as that integer.
const INTEGER_SNAP_EPSILON: f64 = 1e-6;

/// A W x H field of luminance values. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct GrayField {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

/// Summary statistics of a field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldStats {
    pub mean: f64,
    pub std_dev: f64,
}

impl FieldStats {
    /// The adaptive binarization threshold for a difference field.
    pub fn adaptive_threshold(&self) -> f64 {
        self.mean + THRESHOLD_STD_DEVS * self.std_dev
    }
}

impl GrayField {
    pub fn new(width: u32, height: u32, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize);
        Self {
            width,
            height,
            data,
        }
    }

    /// Converts a frame to luminance. Fails on malformed rasters.
    pub fn from_frame(frame: &Frame) -> Result<Self, DetectError> {
        frame.validate()?;
        let data = frame.pixels().map(|p| p.luminance()).collect();
        Ok(Self::new(frame.width, frame.height, data))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn values(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Edge-clamped read: out-of-bounds coordinates use the nearest in-bounds pixel.
    #[inline]
    fn get_clamped(&self, x: i64, y: i64) -> f32 {
        let cx = x.clamp(0, self.width as i64 - 1) as u32;
        let cy = y.clamp(0, self.height as i64 - 1) as u32;
        self.get(cx, cy)
    }

    /// `max(0, self - current)` per pixel, where `self` is the baseline.
    pub fn dark_difference(&self, current: &GrayField) -> Result<GrayField, DetectError> {
        if self.dimensions() != current.dimensions() {
            return Err(DetectError::DimensionMismatch {
                expected: self.dimensions(),
                actual: current.dimensions(),
            });
        }
        let data = self
            .data
            .iter()
            .zip(&current.data)
            .map(|(base, cur)| (base - cur).max(0.0))
            .collect();
        Ok(GrayField::new(self.width, self.height, data))
    }

    /// Single-pass mean and population standard deviation.
    pub fn stats(&self) -> FieldStats {
        let count = self.data.len();
        if count == 0 {
            return FieldStats {
                mean: 0.0,
                std_dev: 0.0,
            };
        }
        let (mut sum, mut sum_sq) = (0.0f64, 0.0f64);
        for &v in &self.data {
            let v = v as f64;
            sum += v;
            sum_sq += v * v;
        }
        let n = count as f64;
        let mean = sum / n;
        // Rounding can push the variance slightly negative on flat fields.
        let variance = (sum_sq / n - mean * mean).max(0.0);
        FieldStats {
            mean,
            std_dev: variance.sqrt(),
        }
    }

    /// Averages `factor x factor` blocks and marks those strictly above `threshold`.
    /// Trailing rows/columns that do not fill a whole block are dropped.
    pub fn downsample_binarize(&self, factor: u32, threshold: f64) -> BinaryMask {
        let factor = factor.max(1);
        let out_width = self.width / factor;
        let out_height = self.height / factor;
        let mut mask = BinaryMask::new(out_width, out_height);

        for y in 0..out_height {
            for x in 0..out_width {
                let mut sum = 0.0f64;
                let mut count = 0u32;
                for yy in 0..factor {
                    for xx in 0..factor {
                        let sx = x * factor + xx;
                        let sy = y * factor + yy;
                        if sx < self.width && sy < self.height {
                            sum += self.get(sx, sy) as f64;
                            count += 1;
                        }
                    }
                }
                if count > 0 && sum / count as f64 > threshold {
                    mask.set(x, y, true);
                }
            }
        }
        mask
    }

    /// Resamples the field so that output `(x, y)` reads input `(x + dx, y + dy)`,
    /// bilinearly interpolated and edge-clamped.
    pub fn translate(&self, dx: f64, dy: f64) -> GrayField {
        let dx = snap_to_integer(dx);
        let dy = snap_to_integer(dy);
        let mut data = Vec::with_capacity(self.data.len());

        for y in 0..self.height {
            let sy = y as f64 + dy;
            let y0 = sy.floor();
            let wy = sy - y0;
            let y0 = y0 as i64;
            for x in 0..self.width {
                let sx = x as f64 + dx;
                let x0 = sx.floor();
                let wx = sx - x0;
                let x0 = x0 as i64;

                let v00 = self.get_clamped(x0, y0) as f64;
                let v10 = self.get_clamped(x0 + 1, y0) as f64;
                let v01 = self.get_clamped(x0, y0 + 1) as f64;
                let v11 = self.get_clamped(x0 + 1, y0 + 1) as f64;

                let top = v00 + wx * (v10 - v00);
                let bottom = v01 + wx * (v11 - v01);
                data.push((top + wy * (bottom - top)) as f32);
            }
        }
        GrayField::new(self.width, self.height, data)
    }
}

#[inline]
fn snap_to_integer(offset: f64) -> f64 {
    let rounded = offset.round();
    if (offset - rounded).abs() < INTEGER_SNAP_EPSILON {
        rounded
    } else {
        offset
    }
}
