#![allow(dead_code)]

use shot_vision::core_modules::pixel::pixel::Pixel;
use shot_vision::Frame;

pub const WHITE: Pixel = Pixel {
    red: 255,
    green: 255,
    blue: 255,
    alpha: 255,
};
pub const BLACK: Pixel = Pixel {
    red: 0,
    green: 0,
    blue: 0,
    alpha: 255,
};

pub const SIZE: u32 = 100;

pub fn white_target() -> Frame {
    Frame::filled(SIZE, SIZE, WHITE)
}

/// White target with round holes of radius 6 at the given centers.
pub fn target_with_holes(centers: &[(f64, f64)]) -> Frame {
    let mut frame = white_target();
    for &(cx, cy) in centers {
        frame.fill_disk(cx, cy, 6.0, BLACK);
    }
    frame
}

/// White target with the four 12x12 fiducials, all moved by `(dx, dy)`.
pub fn marker_target(dx: i32, dy: i32) -> Frame {
    let mut frame = white_target();
    let markers = [
        (8, 8, Pixel::new(255, 0, 0, 255)),
        (80, 8, Pixel::new(0, 200, 0, 255)),
        (8, 80, Pixel::new(0, 0, 255, 255)),
        (80, 80, Pixel::new(255, 255, 0, 255)),
    ];
    for (x, y, color) in markers {
        let x0 = (x + dx) as u32;
        let y0 = (y + dy) as u32;
        frame.fill_rect(x0, y0, x0 + 12, y0 + 12, color);
    }
    frame
}

pub fn near(actual: (f64, f64), expected: (f64, f64), tolerance: f64) -> bool {
    (actual.0 - expected.0).abs() <= tolerance && (actual.1 - expected.1).abs() <= tolerance
}
