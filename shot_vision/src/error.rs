// THEORY:
// Every failure the engine can report lives in one enum. Insufficient evidence
// (no markers, no baseline yet) is *not* an error and never shows up here; those
// paths degrade silently inside the pipeline. What remains are genuinely bad
// inputs, bad configuration, and a dead worker.

use crate::core_modules::frame::Roi;

/// Errors produced by the shot detection engine.
#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error("invalid frame: {width}x{height} with {len} bytes (expected width*height*4 > 0)")]
    InvalidFrame { width: u32, height: u32, len: usize },
    #[error("frame is {actual:?} but the baseline is {expected:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("roi {roi:?} does not fit in a {width}x{height} frame")]
    RoiOutOfBounds { roi: Roi, width: u32, height: u32 },
    #[error("invalid detector configuration: {0}")]
    InvalidConfig(String),
    #[error("detector worker is no longer running")]
    WorkerClosed,
    #[error(transparent)]
    Image(#[from] image::ImageError),
}
