// THEORY:
// This file is the main entry point for the `shot_vision` library crate.
//
// The high-level interface is the `ShotDetector` state machine (`pipeline`) and
// its message-passing wrapper `DetectorHandle` (`parallel_pipeline`), together
// with the data structures they exchange (`DetectorConfig`, `Command`,
// `DetectorEvent`, `ShotBatch`). The building blocks in `core_modules` stay
// public for callers that want a single stage on its own, e.g. the marker
// stabilizer or the shot-group geometry.

pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;

pub use core_modules::group::{GroupSpacing, ShotGroup};
pub use error::DetectError;
pub use parallel_pipeline::{CommandSender, DetectorHandle};
pub use pipeline::{
    BaselineRequest, Command, DetectorConfig, DetectorEvent, DetectorState, Frame, FrameRequest,
    Roi, Shot, ShotBatch, ShotDetector,
};
