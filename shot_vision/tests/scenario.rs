mod common;

use common::*;
use shot_vision::core_modules::pixel::pixel::Pixel;
use shot_vision::{
    BaselineRequest, Command, DetectError, DetectorConfig, DetectorEvent, DetectorState, Frame,
    FrameRequest, ShotDetector, ShotGroup,
};
use std::time::Duration;

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

fn armed_detector() -> ShotDetector {
    let mut det = ShotDetector::new(DetectorConfig::default()).unwrap();
    det.set_baseline(&white_target(), false).unwrap();
    det
}

#[test]
fn single_hole_yields_one_shot_at_its_center() {
    let mut det = armed_detector();
    let frame = target_with_holes(&[(45.0, 45.0)]);

    let batch = det.submit_frame_at(&FrameRequest::new(frame), ms(0)).unwrap().unwrap();
    assert_eq!(batch.shots.len(), 1);
    let shot = batch.shots[0];
    assert!(near((shot.x, shot.y), (45.0, 45.0), 2.0), "shot at {shot:?}");
}

#[test]
fn solid_square_is_rejected_by_the_fill_ratio() {
    // A filled square stays a filled square after downsampling, so its fill
    // ratio is 1.0 and it falls outside the (0.20, 0.85) window. The fill-ratio
    // bound wins over the "square hole gives one shot" scenario: a solid block
    // is never reported, and round holes cover that scenario instead.
    let mut det = armed_detector();
    let mut frame = white_target();
    frame.fill_rect(40, 40, 50, 50, BLACK);
    assert_eq!(det.submit_frame_at(&FrameRequest::new(frame), ms(0)).unwrap(), None);
}

#[test]
fn two_separated_holes_are_batched_together() {
    let mut det = armed_detector();
    let frame = target_with_holes(&[(25.0, 25.0), (75.0, 65.0)]);

    let batch = det.submit_frame_at(&FrameRequest::new(frame), ms(0)).unwrap().unwrap();
    let positions: Vec<(f64, f64)> = batch.shots.iter().map(|s| (s.x, s.y)).collect();
    assert_eq!(positions.len(), 2);
    assert!(near(positions[0], (25.0, 25.0), 2.0));
    assert!(near(positions[1], (75.0, 65.0), 2.0));
}

#[test]
fn frames_before_any_baseline_produce_nothing() {
    let mut det = ShotDetector::new(DetectorConfig::default()).unwrap();
    assert_eq!(det.state(), DetectorState::NoBaseline);
    for t in 0..5 {
        let frame = target_with_holes(&[(45.0, 45.0)]);
        assert_eq!(det.submit_frame_at(&FrameRequest::new(frame), ms(t * 1000)).unwrap(), None);
    }
}

#[test]
fn repeated_frame_is_debounced_until_the_horizon_passes() {
    let mut det = armed_detector();
    let request = FrameRequest::new(target_with_holes(&[(45.0, 45.0)]));

    assert!(det.submit_frame_at(&request, ms(0)).unwrap().is_some());
    assert_eq!(det.submit_frame_at(&request, ms(100)).unwrap(), None);
    assert_eq!(det.submit_frame_at(&request, ms(2_000)).unwrap(), None);
    // Past the 3000 ms lookback the same hole counts again.
    let again = det.submit_frame_at(&request, ms(5_000)).unwrap().unwrap();
    assert_eq!(again.shots.len(), 1);
}

#[test]
fn persisting_hole_is_counted_once_by_the_group() {
    let mut det = armed_detector();
    let mut group = ShotGroup::new();
    let request = FrameRequest::new(target_with_holes(&[(45.0, 45.0)]));

    let mut reported = 0;
    for t in [0, 1_000, 2_000, 3_100, 4_000, 6_500] {
        if let Some(batch) = det.submit_frame_at(&request, ms(t)).unwrap() {
            reported += batch.shots.len();
            group.extend(batch.shots.iter().map(|s| s.position()));
        }
    }
    // The gate lets the hole through again each time its 3000 ms lookback
    // expires; the group still sees one hole.
    assert_eq!(reported, 3);
    assert_eq!(group.len(), 1);
    assert_eq!(group.diameter(), 0.0);
}

#[test]
fn only_the_new_hole_is_reported_when_an_old_one_persists() {
    let mut det = armed_detector();
    det.submit_frame_at(&FrameRequest::new(target_with_holes(&[(25.0, 25.0)])), ms(0))
        .unwrap()
        .unwrap();

    let both = FrameRequest::new(target_with_holes(&[(25.0, 25.0), (75.0, 65.0)]));
    let batch = det.submit_frame_at(&both, ms(1_000)).unwrap().unwrap();
    assert_eq!(batch.shots.len(), 1);
    assert!(near((batch.shots[0].x, batch.shots[0].y), (75.0, 65.0), 2.0));
}

#[test]
fn reset_clears_baseline_so_the_same_frame_is_silent() {
    let mut det = armed_detector();
    let request = FrameRequest::new(target_with_holes(&[(45.0, 45.0)]));
    assert!(det.submit_frame_at(&request, ms(0)).unwrap().is_some());

    let event = det.handle_at(Command::Reset, ms(10));
    assert_eq!(event, None);
    assert_eq!(det.state(), DetectorState::NoBaseline);
    assert!(det.gate().recent().is_empty());

    let event = det.handle_at(Command::SubmitFrame(request), ms(5_000));
    assert_eq!(event, None);
}

#[test]
fn new_baseline_forgets_the_debounce_history() {
    let mut det = armed_detector();
    let request = FrameRequest::new(target_with_holes(&[(45.0, 45.0)]));
    assert!(det.submit_frame_at(&request, ms(0)).unwrap().is_some());

    det.set_baseline(&white_target(), false).unwrap();
    assert!(det.gate().recent().is_empty());
    assert!(det.submit_frame_at(&request, ms(50)).unwrap().is_some());
}

#[test]
fn detection_is_deterministic() {
    let frame = target_with_holes(&[(25.0, 25.0), (75.0, 65.0)]);
    let run = || {
        let mut det = armed_detector();
        det.submit_frame_at(&FrameRequest::new(frame.clone()), ms(0)).unwrap()
    };
    let first = run().unwrap();
    for _ in 0..3 {
        let next = run().unwrap();
        assert_eq!(next.shots.len(), first.shots.len());
        for (a, b) in next.shots.iter().zip(&first.shots) {
            assert_eq!(a.x.to_bits(), b.x.to_bits());
            assert_eq!(a.y.to_bits(), b.y.to_bits());
        }
    }
}

#[test]
fn brightening_is_ignored() {
    let mut det = ShotDetector::new(DetectorConfig::default()).unwrap();
    let gray = Pixel::new(100, 100, 100, 255);
    det.set_baseline(&Frame::filled(100, 100, gray), false).unwrap();

    let mut lighter = Frame::filled(100, 100, gray);
    lighter.fill_disk(45.0, 45.0, 6.0, Pixel::new(250, 250, 250, 255));
    assert_eq!(det.submit_frame_at(&FrameRequest::new(lighter), ms(0)).unwrap(), None);
}

#[test]
fn identical_frame_is_silent() {
    let mut det = armed_detector();
    assert_eq!(det.submit_frame_at(&FrameRequest::new(white_target()), ms(0)).unwrap(), None);
}

#[test]
fn malformed_frame_becomes_an_error_event_and_state_survives() {
    let mut det = armed_detector();
    let broken = Frame::new(100, 100, vec![255; 100]);

    let event = det.handle_at(Command::SubmitFrame(FrameRequest::new(broken)), ms(0));
    match event {
        Some(DetectorEvent::Error { message }) => assert!(message.contains("invalid frame")),
        other => panic!("expected an error event, got {other:?}"),
    }
    assert_eq!(det.state(), DetectorState::Armed);

    let holed = FrameRequest::new(target_with_holes(&[(45.0, 45.0)]));
    let event = det.handle_at(Command::SubmitFrame(holed), ms(10));
    assert!(matches!(event, Some(DetectorEvent::Shots(_))));
}

#[test]
fn malformed_baseline_is_an_error_event() {
    let mut det = ShotDetector::new(DetectorConfig::default()).unwrap();
    let event = det.handle_at(
        Command::SetBaseline(BaselineRequest {
            frame: Frame::new(0, 0, Vec::new()),
            stabilize: true,
        }),
        ms(0),
    );
    assert!(matches!(event, Some(DetectorEvent::Error { .. })));
    assert_eq!(det.state(), DetectorState::NoBaseline);
}

#[test]
fn frame_size_must_match_the_baseline() {
    let mut det = armed_detector();
    let smaller = Frame::filled(80, 100, WHITE);
    let err = det.submit_frame_at(&FrameRequest::new(smaller), ms(0)).unwrap_err();
    assert!(matches!(
        err,
        DetectError::DimensionMismatch {
            expected: (100, 100),
            actual: (80, 100)
        }
    ));
}
