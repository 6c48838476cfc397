mod common;

use approx::assert_abs_diff_eq;
use common::*;
use shot_vision::core_modules::marker::{
    MarkerConfig, detect_markers_centroid, estimate_translation,
};
use shot_vision::core_modules::smart_blob::Point;
use shot_vision::{DetectorConfig, FrameRequest, ShotDetector};
use std::time::Duration;

fn stabilized_detector() -> ShotDetector {
    let mut det = ShotDetector::new(DetectorConfig::default()).unwrap();
    det.set_baseline(&marker_target(0, 0), true).unwrap();
    det
}

#[test]
fn baseline_stores_the_marker_reference() {
    let det = stabilized_detector();
    let reference = det.stabilization_reference().unwrap();
    assert_abs_diff_eq!(reference.x, 49.0);
    assert_abs_diff_eq!(reference.y, 49.0);
}

#[test]
fn known_shift_is_recovered() {
    let reference = detect_markers_centroid(&marker_target(0, 0), &MarkerConfig::default())
        .unwrap()
        .unwrap();
    let shifted = marker_target(4, -2);

    let translation = estimate_translation(&shifted, reference, &MarkerConfig::default())
        .unwrap()
        .unwrap();
    assert_eq!(translation.content_shift(), Point::new(4.0, -2.0));
}

#[test]
fn odd_shift_is_recovered_within_a_pixel() {
    let reference = detect_markers_centroid(&marker_target(0, 0), &MarkerConfig::default())
        .unwrap()
        .unwrap();
    let shifted = marker_target(3, 1);
    let translation = estimate_translation(&shifted, reference, &MarkerConfig::default())
        .unwrap()
        .unwrap();
    let shift = translation.content_shift();
    assert!((shift.x - 3.0).abs() <= 1.0, "dx = {}", shift.x);
    assert!((shift.y - 1.0).abs() <= 1.0, "dy = {}", shift.y);
}

#[test]
fn translation_alone_triggers_shots_without_stabilization() {
    let mut det = stabilized_detector();
    let request = FrameRequest::new(marker_target(4, -2));
    assert!(det.submit_frame_at(&request, Duration::ZERO).unwrap().is_some());
}

#[test]
fn stabilized_translation_reports_no_spurious_shots() {
    let mut det = stabilized_detector();
    let request = FrameRequest::new(marker_target(4, -2)).with_stabilize(true);
    assert_eq!(det.submit_frame_at(&request, Duration::ZERO).unwrap(), None);
}

#[test]
fn hole_in_a_shifted_frame_is_reported_in_baseline_coordinates() {
    let mut det = stabilized_detector();
    // Drawn at (49, 47) in the moved frame, i.e. (45, 49) on the baseline.
    let mut frame = marker_target(4, -2);
    frame.fill_disk(49.0, 47.0, 6.0, BLACK);

    let batch = det
        .submit_frame_at(&FrameRequest::new(frame).with_stabilize(true), Duration::ZERO)
        .unwrap()
        .unwrap();
    assert_eq!(batch.shots.len(), 1);
    let shot = batch.shots[0];
    assert!(near((shot.x, shot.y), (45.0, 49.0), 2.0), "shot at {shot:?}");
}

#[test]
fn missing_markers_fall_back_to_unaligned_comparison() {
    let mut det = stabilized_detector();
    // Markers covered up: only the hole differs (and it is darker than white).
    let frame = target_with_holes(&[(45.0, 45.0)]);
    let batch = det
        .submit_frame_at(&FrameRequest::new(frame).with_stabilize(true), Duration::ZERO)
        .unwrap()
        .unwrap();
    assert_eq!(batch.shots.len(), 1);
    assert!(near((batch.shots[0].x, batch.shots[0].y), (45.0, 45.0), 2.0));
}

#[test]
fn baseline_without_markers_has_no_reference() {
    let mut det = ShotDetector::new(DetectorConfig::default()).unwrap();
    det.set_baseline(&white_target(), true).unwrap();
    assert_eq!(det.stabilization_reference(), None);

    let request = FrameRequest::new(target_with_holes(&[(45.0, 45.0)])).with_stabilize(true);
    assert!(det.submit_frame_at(&request, Duration::ZERO).unwrap().is_some());
}
