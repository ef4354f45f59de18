//! Frame pipeline tests with scripted detectors


use gaze_tracking::{
    pupil_tracker::{Freshness, Keypoint},
    region::EyeSide,
    session::{render_report, EyeParams, EyeReport, FrameParams, GazeSession, RenderOptions},
};
use opencv::prelude::*;
use test_helpers::{color_frame, region, registry, untrimmed_tracker, ScriptedBlobs, ScriptedRegions};

fn enabled(threshold: i32) -> EyeParams {
    EyeParams { threshold, enabled: true }
}

fn both_enabled() -> FrameParams {
    FrameParams {
        left: enabled(40),
        right: enabled(40),
    }
}

#[test]
fn test_eye_regions_are_offset_into_frame_coordinates() {
    let face = ScriptedRegions::always(vec![region(100, 50, 200, 200)]);
    let (eyes, eye_log) = ScriptedRegions::new(vec![vec![region(10, 20, 40, 30)], vec![region(15, 25, 40, 30)]], vec![]);
    let (blobs, blob_log) = ScriptedBlobs::new(vec![
        vec![Keypoint::new(20.0, 15.0, 10.0)],
        vec![Keypoint::new(18.0, 14.0, 9.0)],
    ]);
    let registry = registry(face, eyes, blobs);
    let mut session = GazeSession::new(untrimmed_tracker());
    let frame = color_frame(480, 640, 128.0).unwrap();

    let report = session.process_frame(&registry, &frame, &both_enabled()).unwrap();

    assert_eq!(report.face, Some(region(100, 50, 200, 200)));
    // Both coarse windows are the top half of the face, split at the midline
    assert_eq!(eye_log.borrow().sizes, vec![(100, 100), (100, 100)]);
    assert_eq!(report.right.region(), Some(region(110, 70, 40, 30)));
    assert_eq!(report.left.region(), Some(region(215, 75, 40, 30)));
    assert_eq!(blob_log.borrow().sizes, vec![(40, 30), (40, 30)]);

    assert_eq!(report.pupil_in_frame(EyeSide::Right), Some(Keypoint::new(130.0, 85.0, 10.0)));
    assert_eq!(report.pupil_in_frame(EyeSide::Left), Some(Keypoint::new(233.0, 89.0, 9.0)));
    assert_eq!(session.state(EyeSide::Right).last_keypoint(), Some(Keypoint::new(20.0, 15.0, 10.0)));
    assert_eq!(session.state(EyeSide::Left).last_keypoint(), Some(Keypoint::new(18.0, 14.0, 9.0)));
}

#[test]
fn test_largest_face_is_tracked() {
    let face = ScriptedRegions::always(vec![region(0, 0, 80, 80), region(200, 100, 160, 160), region(400, 0, 120, 120)]);
    let registry = registry(face, ScriptedRegions::never(), ScriptedBlobs::new(vec![]).0);
    let mut session = GazeSession::new(untrimmed_tracker());
    let frame = color_frame(480, 640, 128.0).unwrap();

    let report = session.process_frame(&registry, &frame, &both_enabled()).unwrap();
    assert_eq!(report.face, Some(region(200, 100, 160, 160)));
    assert_eq!(report.left, EyeReport::NoEye);
    assert_eq!(report.right, EyeReport::NoEye);
}

#[test]
fn test_face_miss_leaves_states_unchanged() {
    let (face, _) = ScriptedRegions::new(vec![vec![region(100, 50, 200, 200)]], vec![]);
    let eyes = ScriptedRegions::always(vec![region(10, 20, 40, 30)]);
    let (blobs, blob_log) = ScriptedBlobs::new(vec![
        vec![Keypoint::new(20.0, 15.0, 10.0)],
        vec![Keypoint::new(18.0, 14.0, 9.0)],
    ]);
    let registry = registry(face, eyes, blobs);
    let mut session = GazeSession::new(untrimmed_tracker());
    let frame = color_frame(480, 640, 128.0).unwrap();

    session.process_frame(&registry, &frame, &both_enabled()).unwrap();
    let left = *session.state(EyeSide::Left);
    let right = *session.state(EyeSide::Right);

    let report = session.process_frame(&registry, &frame, &both_enabled()).unwrap();
    assert_eq!(report.face, None);
    assert_eq!(report.left, EyeReport::NoFace);
    assert_eq!(report.right, EyeReport::NoFace);
    assert_eq!(*session.state(EyeSide::Left), left);
    assert_eq!(*session.state(EyeSide::Right), right);
    assert_eq!(blob_log.borrow().sizes.len(), 2);
    assert_eq!(session.frames(), 2);
}

#[test]
fn test_disabled_eye_is_never_processed() {
    let face = ScriptedRegions::always(vec![region(100, 50, 200, 200)]);
    let (eyes, eye_log) = ScriptedRegions::new(vec![], vec![region(10, 20, 40, 30)]);
    let (blobs, blob_log) = ScriptedBlobs::new(vec![vec![Keypoint::new(20.0, 15.0, 10.0)]; 3]);
    let registry = registry(face, eyes, blobs);
    let mut session = GazeSession::new(untrimmed_tracker());
    let frame = color_frame(480, 640, 128.0).unwrap();
    let params = both_enabled().with_eye(EyeSide::Right, EyeParams { threshold: 40, enabled: false });

    for _ in 0..3 {
        let report = session.process_frame(&registry, &frame, &params).unwrap();
        assert_eq!(report.right, EyeReport::Disabled);
        assert!(matches!(report.left, EyeReport::Tracked { .. }));
    }

    assert_eq!(eye_log.borrow().sizes.len(), 3);
    assert_eq!(blob_log.borrow().sizes.len(), 3);
    assert!(!session.state(EyeSide::Right).has_detection());
    assert!(session.state(EyeSide::Left).has_detection());
}

#[test]
fn test_disabling_eye_keeps_its_existing_state() {
    let face = ScriptedRegions::always(vec![region(100, 50, 200, 200)]);
    let (eyes, eye_log) = ScriptedRegions::new(vec![], vec![region(10, 20, 40, 30)]);
    let first_right = Keypoint::new(20.0, 15.0, 10.0);
    let (blobs, blob_log) = ScriptedBlobs::new(vec![
        vec![first_right],
        vec![Keypoint::new(18.0, 14.0, 9.0)],
        vec![Keypoint::new(25.0, 12.0, 14.0)],
        vec![Keypoint::new(26.0, 13.0, 15.0)],
    ]);
    let registry = registry(face, eyes, blobs);
    let mut session = GazeSession::new(untrimmed_tracker());
    let frame = color_frame(480, 640, 128.0).unwrap();

    session.process_frame(&registry, &frame, &both_enabled()).unwrap();
    let right = *session.state(EyeSide::Right);
    assert_eq!(right.last_keypoint(), Some(first_right));
    assert_eq!(eye_log.borrow().sizes.len(), 2);
    assert_eq!(blob_log.borrow().sizes.len(), 2);

    let params = both_enabled().with_eye(EyeSide::Right, EyeParams { threshold: 40, enabled: false });
    let report = session.process_frame(&registry, &frame, &params).unwrap();

    assert_eq!(report.right, EyeReport::Disabled);
    assert_eq!(*session.state(EyeSide::Right), right);
    // Only the left eye ran on the second frame
    assert_eq!(eye_log.borrow().sizes.len(), 3);
    assert_eq!(blob_log.borrow().sizes.len(), 3);
    assert_eq!(
        session.state(EyeSide::Left).last_keypoint(),
        Some(Keypoint::new(25.0, 12.0, 14.0))
    );
}

#[test]
fn test_failed_frame_changes_no_state() {
    let face = ScriptedRegions::always(vec![region(100, 50, 200, 200)]);
    let eyes = ScriptedRegions::always(vec![region(10, 20, 40, 30)]);
    let pupil = Keypoint::new(20.0, 15.0, 10.0);
    // Right eye succeeds, then the left eye's blob search fails
    let (blobs, _) = ScriptedBlobs::new(vec![vec![pupil]]);
    let registry = registry(face, eyes, blobs.failing_on(&[2]));
    let mut session = GazeSession::new(untrimmed_tracker());
    let frame = color_frame(480, 640, 128.0).unwrap();

    assert!(session.process_frame(&registry, &frame, &both_enabled()).is_err());
    assert!(!session.state(EyeSide::Right).has_detection());
    assert!(!session.state(EyeSide::Left).has_detection());

    let report = session.process_frame(&registry, &frame, &both_enabled()).unwrap();
    assert_eq!(report.right.reading().map(|r| r.keypoint), Some(pupil));
    assert_eq!(session.state(EyeSide::Right).last_keypoint(), Some(pupil));
}

#[test]
fn test_disabled_eye_reported_when_no_face() {
    let registry = registry(ScriptedRegions::never(), ScriptedRegions::never(), ScriptedBlobs::new(vec![]).0);
    let mut session = GazeSession::new(untrimmed_tracker());
    let frame = color_frame(120, 160, 128.0).unwrap();
    let params = both_enabled().with_eye(EyeSide::Left, EyeParams { threshold: 40, enabled: false });

    let report = session.process_frame(&registry, &frame, &params).unwrap();
    assert_eq!(report.left, EyeReport::Disabled);
    assert_eq!(report.right, EyeReport::NoFace);
}

#[test]
fn test_eye_miss_on_one_side_only() {
    let face = ScriptedRegions::always(vec![region(100, 50, 200, 200)]);
    let (eyes, _) = ScriptedRegions::new(vec![vec![], vec![region(15, 25, 40, 30)]], vec![]);
    let (blobs, _) = ScriptedBlobs::new(vec![vec![Keypoint::new(18.0, 14.0, 9.0)]]);
    let registry = registry(face, eyes, blobs);
    let mut session = GazeSession::new(untrimmed_tracker());
    let frame = color_frame(480, 640, 128.0).unwrap();

    let report = session.process_frame(&registry, &frame, &both_enabled()).unwrap();
    assert_eq!(report.right, EyeReport::NoEye);
    assert_eq!(report.left.reading().map(|r| r.freshness), Some(Freshness::Fresh));
    assert!(!session.state(EyeSide::Right).has_detection());
}

#[test]
fn test_pupil_miss_reports_stale_reading() {
    let face = ScriptedRegions::always(vec![region(100, 50, 200, 200)]);
    let eyes = ScriptedRegions::always(vec![region(10, 20, 40, 30)]);
    let (blobs, _) = ScriptedBlobs::new(vec![vec![Keypoint::new(20.0, 15.0, 10.0)]]);
    let registry = registry(face, eyes, blobs);
    let mut session = GazeSession::new(untrimmed_tracker());
    let frame = color_frame(480, 640, 128.0).unwrap();
    let params = both_enabled().with_eye(EyeSide::Left, EyeParams { threshold: 40, enabled: false });

    session.process_frame(&registry, &frame, &params).unwrap();
    let report = session.process_frame(&registry, &frame, &params).unwrap();
    let reading = report.right.reading().unwrap();
    assert_eq!(reading.freshness, Freshness::Stale);
    assert_eq!(reading.keypoint, Keypoint::new(20.0, 15.0, 10.0));
}

#[test]
fn test_process_frame_does_not_modify_frame() {
    let face = ScriptedRegions::always(vec![region(100, 50, 200, 200)]);
    let eyes = ScriptedRegions::always(vec![region(10, 20, 40, 30)]);
    let (blobs, _) = ScriptedBlobs::new(vec![vec![Keypoint::new(20.0, 15.0, 10.0)]; 2]);
    let registry = registry(face, eyes, blobs);
    let mut session = GazeSession::new(untrimmed_tracker());
    let frame = color_frame(480, 640, 128.0).unwrap();
    let before = frame.try_clone().unwrap();

    session.process_frame(&registry, &frame, &both_enabled()).unwrap();

    let mut diff = opencv::core::Mat::default();
    opencv::core::absdiff(&frame, &before, &mut diff).unwrap();
    let diff = gaze_tracking::utils::image_conversion::to_grayscale(&diff).unwrap();
    assert_eq!(opencv::core::count_non_zero(&diff).unwrap(), 0);
}

#[test]
fn test_render_report_draws_and_crops() {
    let face = ScriptedRegions::always(vec![region(100, 50, 200, 200)]);
    let eyes = ScriptedRegions::always(vec![region(10, 20, 40, 30)]);
    let (blobs, _) = ScriptedBlobs::new(vec![vec![Keypoint::new(20.0, 15.0, 10.0)]; 2]);
    let registry = registry(face, eyes, blobs);
    let mut session = GazeSession::new(untrimmed_tracker());
    let mut frame = color_frame(480, 640, 128.0).unwrap();
    let report = session.process_frame(&registry, &frame, &both_enabled()).unwrap();

    let views = render_report(
        &mut frame,
        &report,
        RenderOptions {
            draw_face_box: true,
            draw_pupils_on_main: true,
        },
    )
    .unwrap();

    let right = views.right.expect("right close-up");
    let left = views.left.expect("left close-up");
    assert_eq!((right.cols(), right.rows()), (40, 30));
    assert_eq!((left.cols(), left.rows()), (40, 30));

    // Pupil marker at the keypoint center in frame coordinates
    let center = frame.at_2d::<opencv::core::Vec3b>(85, 130).unwrap();
    assert_ne!(*center, opencv::core::VecN([128u8, 128, 128]));
    // Face box outline
    let corner = frame.at_2d::<opencv::core::Vec3b>(50, 100).unwrap();
    assert_ne!(*corner, opencv::core::VecN([128u8, 128, 128]));
}

#[test]
fn test_render_report_without_face_has_no_views() {
    let registry = registry(ScriptedRegions::never(), ScriptedRegions::never(), ScriptedBlobs::new(vec![]).0);
    let mut session = GazeSession::new(untrimmed_tracker());
    let mut frame = color_frame(120, 160, 128.0).unwrap();
    let report = session.process_frame(&registry, &frame, &both_enabled()).unwrap();

    let views = render_report(
        &mut frame,
        &report,
        RenderOptions {
            draw_face_box: true,
            draw_pupils_on_main: false,
        },
    )
    .unwrap();
    assert!(views.left.is_none());
    assert!(views.right.is_none());
}
