// THEORY:
// The `marker` module is the stabilization layer. Four colored fiducials (red,
// green, blue, yellow) sit at fixed physical positions around the target. If the
// camera or the target moves between the baseline capture and a later frame, the
// fiducials move with it, and that movement is what we undo before differencing.
//
// Key principles:
// 1.  **Sparse sampling**: pixels are visited on a regular stride, not all of
//     them. Markers are large relative to the stride, so the centroid survives.
// 2.  **One aggregate centroid**: every sample matching *any* of the color bands
//     contributes to a single centroid. This only models pure translation. It
//     cannot correct rotation or scale, and an asymmetrically occluded marker
//     biases the estimate. That limitation is accepted as-is.
// 3.  **Evidence floor**: fewer than `min_samples` matches means "no markers
//     here" - the caller skips stabilization for that frame, it is not an error.
// 4.  **Alignment**: with `t = reference - current`, the current grayscale field
//     is resampled by `-t`, so output pixel `p` reads current pixel `p - t` and
//     the markers land back where they were at baseline.

use crate::core_modules::frame::Frame;
use crate::core_modules::gray_field::GrayField;
use crate::core_modules::pixel::pixel::Hsv;
use crate::core_modules::smart_blob::Point;
use crate::error::DetectError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerColor {
    Red,
    Green,
    Blue,
    Yellow,
}

/// An HSV acceptance region for one marker color. All comparisons are strict.
///
/// When `hue_min > hue_max` the hue interval wraps through 0 degrees, e.g.
/// `hue_min = 345, hue_max = 15` accepts `h > 345 || h < 15`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorBand {
    pub color: MarkerColor,
    pub hue_min: f64,
    pub hue_max: f64,
    pub min_saturation: f64,
    pub min_value: f64,
}

impl ColorBand {
    pub fn matches(&self, hsv: &Hsv) -> bool {
        let hue_ok = if self.hue_min <= self.hue_max {
            hsv.hue > self.hue_min && hsv.hue < self.hue_max
        } else {
            hsv.hue > self.hue_min || hsv.hue < self.hue_max
        };
        hue_ok && hsv.saturation > self.min_saturation && hsv.value > self.min_value
    }

    pub fn default_bands() -> Vec<ColorBand> {
        vec![
            ColorBand {
                color: MarkerColor::Red,
                hue_min: 345.0,
                hue_max: 15.0,
                min_saturation: 0.5,
                min_value: 0.25,
            },
            ColorBand {
                color: MarkerColor::Green,
                hue_min: 80.0,
                hue_max: 160.0,
                min_saturation: 0.45,
                min_value: 0.25,
            },
            ColorBand {
                color: MarkerColor::Blue,
                hue_min: 190.0,
                hue_max: 260.0,
                min_saturation: 0.45,
                min_value: 0.25,
            },
            ColorBand {
                color: MarkerColor::Yellow,
                hue_min: 35.0,
                hue_max: 70.0,
                min_saturation: 0.45,
                min_value: 0.35,
            },
        ]
    }
}

/// Marker sampling and classification settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    /// Sample every `stride`-th pixel along both axes.
    pub stride: u32,
    /// Minimum number of matching samples for a centroid to count.
    pub min_samples: usize,
    pub bands: Vec<ColorBand>,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            stride: 2,
            min_samples: 50,
            bands: ColorBand::default_bands(),
        }
    }
}

impl MarkerConfig {
    /// The first band matching `hsv`, if any.
    pub fn classify(&self, hsv: &Hsv) -> Option<MarkerColor> {
        self.bands.iter().find(|b| b.matches(hsv)).map(|b| b.color)
    }
}

/// Offset between the baseline marker centroid and the current one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Translation {
    /// `reference.x - current.x`
    pub dx: f64,
    /// `reference.y - current.y`
    pub dy: f64,
}

impl Translation {
    pub fn between(reference: Point, current: Point) -> Self {
        Self {
            dx: reference.x - current.x,
            dy: reference.y - current.y,
        }
    }

    /// How far the scene content moved from baseline to the current frame.
    pub fn content_shift(&self) -> Point {
        Point::new(-self.dx, -self.dy)
    }
}

/// Centroid of all stride-sampled pixels matching any marker band, or `None`
/// when fewer than `min_samples` (and at least one) match.
pub fn detect_markers_centroid(
    frame: &Frame,
    config: &MarkerConfig,
) -> Result<Option<Point>, DetectError> {
    frame.validate()?;
    let stride = config.stride.max(1) as usize;

    let (mut sum_x, mut sum_y, mut count) = (0.0f64, 0.0f64, 0usize);
    for y in (0..frame.height).step_by(stride) {
        for x in (0..frame.width).step_by(stride) {
            let hsv = frame.pixel(x, y).hsv();
            if config.classify(&hsv).is_some() {
                sum_x += x as f64;
                sum_y += y as f64;
                count += 1;
            }
        }
    }

    if count == 0 || count < config.min_samples {
        log::trace!("marker evidence too weak: {count} samples");
        return Ok(None);
    }
    Ok(Some(Point::new(sum_x / count as f64, sum_y / count as f64)))
}

/// Translation from the current marker centroid back to the reference, if the
/// current frame shows enough marker evidence.
pub fn estimate_translation(
    frame: &Frame,
    reference: Point,
    config: &MarkerConfig,
) -> Result<Option<Translation>, DetectError> {
    let current = detect_markers_centroid(frame, config)?;
    Ok(current.map(|current| Translation::between(reference, current)))
}

/// Resamples `current` so the markers realign with the baseline.
pub fn align(current: &GrayField, translation: Translation) -> GrayField {
    current.translate(-translation.dx, -translation.dy)
}
