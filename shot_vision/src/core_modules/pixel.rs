// THEORY (Single-Pixel Color Terms):
// The `Pixel` module is the most fundamental unit of the engine. It is a "dumb"
// data container for one RGBA sample plus the handful of single-pixel heuristics
// the detector actually consumes:
//
// - Luminance: Rec. 709 weighted sum of R, G, B on the raw 0..255 scale. This is
//   the value stored in a `GrayField` and differenced against the baseline.
// - HSV: hue angle in degrees [0, 360), saturation and value in [0, 1], using the
//   standard max/min/delta hexagonal formula. Used only to classify fiducial
//   marker colors during stabilization.
//
// Key principles:
// 1) Single-pixel scope: nothing here reads neighbors or history.
// 2) Pure functions: no error conditions, no state.

pub mod pixel {
    pub type Channel = u8;
    pub type Luminance = f32;
    pub type Hue = f64;
    pub type Saturation = f64;
    pub type Value = f64;

    pub const CHANNELS: usize = 4;

    const LUMA_RED: f64 = 0.2126;
    const LUMA_GREEN: f64 = 0.7152;
    const LUMA_BLUE: f64 = 0.0722;

    /// A "dumb" data container representing a single RGBA pixel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Pixel {
        pub red: Channel,
        pub green: Channel,
        pub blue: Channel,
        pub alpha: Channel,
    }

    /// A color expressed in hue / saturation / value.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct Hsv {
        /// Degrees in [0, 360). Zero for achromatic colors.
        pub hue: Hue,
        pub saturation: Saturation,
        pub value: Value,
    }

    impl Pixel {
        pub fn new(red: Channel, green: Channel, blue: Channel, alpha: Channel) -> Self {
            Self {
                red,
                green,
                blue,
                alpha,
            }
        }

        /// Perceived brightness (Rec. 709 weights) on the 0..255 scale.
        #[inline]
        pub fn luminance(&self) -> Luminance {
            (LUMA_RED * self.red as f64
                + LUMA_GREEN * self.green as f64
                + LUMA_BLUE * self.blue as f64) as Luminance
        }

        #[inline]
        pub fn hsv(&self) -> Hsv {
            rgb_to_hsv(self.red, self.green, self.blue)
        }
    }

    /// Converts an RGB triple (0..255 each) into HSV.
    pub fn rgb_to_hsv(red: Channel, green: Channel, blue: Channel) -> Hsv {
        let r = red as f64 / 255.0;
        let g = green as f64 / 255.0;
        let b = blue as f64 / 255.0;

        let maximum_channel = r.max(g.max(b));
        let minimum_channel = r.min(g.min(b));
        let delta = maximum_channel - minimum_channel;

        let mut hue = 0.0;
        if delta > 0.0 {
            let sector = if maximum_channel == r {
                ((g - b) / delta).rem_euclid(6.0)
            } else if maximum_channel == g {
                (b - r) / delta + 2.0
            } else {
                (r - g) / delta + 4.0
            };
            hue = sector * 60.0;
            if hue >= 360.0 {
                hue -= 360.0;
            }
        }

        let saturation = if maximum_channel == 0.0 {
            0.0
        } else {
            delta / maximum_channel
        };

        Hsv {
            hue,
            saturation,
            value: maximum_channel,
        }
    }

    impl From<&[u8]> for Pixel {
        /// Reads the first four bytes as R, G, B, A. Callers slice exact 4-byte chunks.
        fn from(bytes: &[u8]) -> Self {
            Pixel::new(bytes[0], bytes[1], bytes[2], bytes[3])
        }
    }

    impl From<image::Rgba<u8>> for Pixel {
        fn from(rgba: image::Rgba<u8>) -> Self {
            let [red, green, blue, alpha] = rgba.0;
            Pixel::new(red, green, blue, alpha)
        }
    }
}
