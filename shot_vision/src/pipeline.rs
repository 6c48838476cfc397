// THEORY:
// The `pipeline` module is the top-level, synchronous API of the engine. A
// `ShotDetector` owns everything one detection session needs - the baseline
// grayscale field, the stabilization reference and the debounce gate - and
// exposes it through an explicit lifecycle: create, set a baseline, submit
// frames, reset.
//
// State machine: `NoBaseline` --set_baseline--> `Armed` --reset--> `NoBaseline`.
// `Armed` is also the steady state; setting a new baseline while armed simply
// replaces the old one.
//
// Per-frame stages (1 always runs, the rest only when armed and detection is
// enabled for the call):
// 1.  Frame validation and grayscale conversion.
// 2.  Optional stabilization against the marker reference.
// 3.  Dark-only difference against the baseline.
// 4.  Adaptive threshold from the difference statistics.
// 5.  Block downsample + binarize, then morphological closing.
// 6.  Component labeling and shape filtering.
// 7.  Gating in discovery order; accepted candidates become shots.
// 8.  One batch per frame, never an empty one.
//
// `handle` is the command-level entry point used by the worker: failures are
// turned into `DetectorEvent::Error` and the detector stays ready for the next
// command with its state exactly as before the failing one.

use crate::core_modules::blob_detector::{BlobFilter, blob_detector};
use crate::core_modules::gray_field::GrayField;
use crate::core_modules::marker::{self, MarkerConfig};
use crate::core_modules::morphology;
use crate::core_modules::smart_blob::Point;
use crate::core_modules::tracker::{GateConfig, ShotGate};
use crate::error::DetectError;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

// Re-export key data structures for the public API.
pub use crate::core_modules::frame::{Frame, Roi};
pub use crate::core_modules::smart_blob::Candidate;

/// Tunable behavior of a detector, fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Block size of the downsample step.
    pub downsample: u32,
    pub blob: BlobFilter,
    pub gate: GateConfig,
    pub marker: MarkerConfig,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            downsample: 2,
            blob: BlobFilter::default(),
            gate: GateConfig::default(),
            marker: MarkerConfig::default(),
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), DetectError> {
        let invalid = |msg: &str| -> Result<(), DetectError> {
            Err(DetectError::InvalidConfig(msg.to_string()))
        };

        if self.downsample == 0 {
            return invalid("downsample factor must be at least 1");
        }
        if self.blob.min_area > self.blob.max_area {
            return invalid("blob min_area exceeds max_area");
        }
        let fill_ok = (0.0..=1.0).contains(&self.blob.min_fill)
            && (0.0..=1.0).contains(&self.blob.max_fill)
            && self.blob.min_fill < self.blob.max_fill;
        if !fill_ok {
            return invalid("blob fill bounds must satisfy 0 <= min_fill < max_fill <= 1");
        }
        let radii_ok = [self.gate.repeat_dist_px, self.gate.min_dist_px]
            .iter()
            .all(|r| r.is_finite() && *r >= 0.0);
        if !radii_ok {
            return invalid("gate distances must be finite and non-negative");
        }
        if self.marker.stride == 0 {
            return invalid("marker stride must be at least 1");
        }
        if self.marker.min_samples == 0 {
            return invalid("marker min_samples must be at least 1");
        }
        Ok(())
    }
}

/// Where the detector is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    NoBaseline,
    Armed,
}

/// A frame submitted for detection.
#[derive(Debug, Clone)]
pub struct FrameRequest {
    pub frame: Frame,
    pub detect_enabled: bool,
    pub stabilize: bool,
    /// Echoed back untouched on any shots found in this frame.
    pub roi: Option<Roi>,
}

impl FrameRequest {
    /// Detection on, stabilization off, no ROI.
    pub fn new(frame: Frame) -> Self {
        Self {
            frame,
            detect_enabled: true,
            stabilize: false,
            roi: None,
        }
    }

    pub fn with_stabilize(mut self, stabilize: bool) -> Self {
        self.stabilize = stabilize;
        self
    }

    pub fn with_detect_enabled(mut self, enabled: bool) -> Self {
        self.detect_enabled = enabled;
        self
    }

    pub fn with_roi(mut self, roi: Roi) -> Self {
        self.roi = Some(roi);
        self
    }
}

#[derive(Debug, Clone)]
pub struct BaselineRequest {
    pub frame: Frame,
    pub stabilize: bool,
}

#[derive(Debug, Clone)]
pub enum Command {
    Reset,
    SetBaseline(BaselineRequest),
    SubmitFrame(FrameRequest),
}

/// One accepted hole, in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shot {
    pub x: f64,
    pub y: f64,
}

impl Shot {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// All shots accepted from one frame. Never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotBatch {
    pub shots: Vec<Shot>,
    /// Time since the detector was created.
    pub timestamp: Duration,
    pub roi: Option<Roi>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DetectorEvent {
    Shots(ShotBatch),
    Error { message: String },
}

struct Baseline {
    gray: GrayField,
    /// Marker centroid at baseline time, when stabilization was requested and
    /// the markers were visible.
    reference: Option<Point>,
}

/// The main detection state machine. Exclusively owns its session state.
pub struct ShotDetector {
    config: DetectorConfig,
    baseline: Option<Baseline>,
    gate: ShotGate,
    epoch: Instant,
}

impl ShotDetector {
    pub fn new(config: DetectorConfig) -> Result<Self, DetectError> {
        config.validate()?;
        Ok(Self {
            gate: ShotGate::new(config.gate),
            config,
            baseline: None,
            epoch: Instant::now(),
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn state(&self) -> DetectorState {
        if self.baseline.is_some() {
            DetectorState::Armed
        } else {
            DetectorState::NoBaseline
        }
    }

    /// The marker centroid stored with the current baseline, if any.
    pub fn stabilization_reference(&self) -> Option<Point> {
        self.baseline.as_ref().and_then(|b| b.reference)
    }

    pub fn gate(&self) -> &ShotGate {
        &self.gate
    }

    /// Time since this detector was created; the clock shot timestamps use.
    pub fn elapsed(&self) -> Duration {
        self.epoch.elapsed()
    }

    /// Forgets the baseline, the stabilization reference and the debounce history.
    pub fn reset(&mut self) {
        self.baseline = None;
        self.gate.clear();
        log::info!("detector reset");
    }

    /// Replaces the baseline. On error the previous baseline stays in place.
    pub fn set_baseline(&mut self, frame: &Frame, stabilize: bool) -> Result<(), DetectError> {
        let gray = GrayField::from_frame(frame)?;
        let reference = if stabilize {
            let centroid = marker::detect_markers_centroid(frame, &self.config.marker)?;
            if centroid.is_none() {
                log::debug!("no marker evidence in baseline; stabilization disabled for it");
            }
            centroid
        } else {
            None
        };

        self.baseline = Some(Baseline { gray, reference });
        self.gate.clear();
        log::info!(
            "baseline set: {}x{}, stabilization reference {:?}",
            frame.width,
            frame.height,
            reference
        );
        Ok(())
    }

    pub fn submit_frame(
        &mut self,
        request: &FrameRequest,
    ) -> Result<Option<ShotBatch>, DetectError> {
        let now = self.elapsed();
        self.submit_frame_at(request, now)
    }

    /// Runs one frame through the detection stages with an explicit timestamp.
    /// Returns `None` when detection is disabled, no baseline is set, or nothing
    /// passed the filters and the gate. A malformed frame is an error in every
    /// state.
    pub fn submit_frame_at(
        &mut self,
        request: &FrameRequest,
        now: Duration,
    ) -> Result<Option<ShotBatch>, DetectError> {
        request.frame.validate()?;
        if !request.detect_enabled {
            return Ok(None);
        }
        let Some(baseline) = &self.baseline else {
            return Ok(None);
        };

        let candidates =
            find_frame_candidates(&self.config, baseline, &request.frame, request.stabilize)?;

        let mut shots = Vec::new();
        for candidate in &candidates {
            match self.gate.admit(candidate.centroid, now) {
                Ok(()) => shots.push(Shot {
                    x: candidate.centroid.x,
                    y: candidate.centroid.y,
                }),
                Err(reason) => {
                    log::trace!("suppressed candidate at {:?}: {:?}", candidate.centroid, reason)
                }
            }
        }
        log::debug!("{} candidates, {} accepted", candidates.len(), shots.len());

        if shots.is_empty() {
            return Ok(None);
        }
        Ok(Some(ShotBatch {
            shots,
            timestamp: now,
            roi: request.roi,
        }))
    }

    pub fn handle(&mut self, command: Command) -> Option<DetectorEvent> {
        let now = self.elapsed();
        self.handle_at(command, now)
    }

    /// Applies one command. Errors become `DetectorEvent::Error` and leave the
    /// detector state untouched.
    pub fn handle_at(&mut self, command: Command, now: Duration) -> Option<DetectorEvent> {
        let result = match command {
            Command::Reset => {
                self.reset();
                Ok(None)
            }
            Command::SetBaseline(request) => {
                self.set_baseline(&request.frame, request.stabilize).map(|_| None)
            }
            Command::SubmitFrame(request) => self.submit_frame_at(&request, now),
        };

        match result {
            Ok(batch) => batch.map(DetectorEvent::Shots),
            Err(e) => {
                log::warn!("command failed: {e}");
                Some(DetectorEvent::Error { message: e.to_string() })
            }
        }
    }
}

/// Stages 1-6 for one frame: everything up to, but not including, gating.
fn find_frame_candidates(
    config: &DetectorConfig,
    baseline: &Baseline,
    frame: &Frame,
    stabilize: bool,
) -> Result<Vec<Candidate>, DetectError> {
    let current = GrayField::from_frame(frame)?;
    if current.dimensions() != baseline.gray.dimensions() {
        return Err(DetectError::DimensionMismatch {
            expected: baseline.gray.dimensions(),
            actual: current.dimensions(),
        });
    }

    let aligned = match (stabilize, baseline.reference) {
        (true, Some(reference)) => {
            match marker::estimate_translation(frame, reference, &config.marker)? {
                Some(translation) => {
                    log::debug!("stabilizing by ({:.2}, {:.2})", translation.dx, translation.dy);
                    marker::align(&current, translation)
                }
                None => {
                    log::debug!("no marker evidence in frame; skipping stabilization");
                    current
                }
            }
        }
        _ => current,
    };

    let diff = baseline.gray.dark_difference(&aligned)?;
    let threshold = diff.stats().adaptive_threshold();
    let mask = morphology::close(&diff.downsample_binarize(config.downsample, threshold));
    log::debug!("threshold {threshold:.3}, {} mask cells on", mask.count_ones());

    Ok(blob_detector::find_candidates(&mask, &config.blob, config.downsample))
}
