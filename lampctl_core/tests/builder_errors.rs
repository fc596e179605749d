use lampctl_core::error::{BuildError, CalibrationError};
use lampctl_core::mocks::{BlankFrames, RecordingChannel, ScriptedDetector};
use lampctl_core::{CalibrationProfile, ControlLoop, DetectionFilter, Phase};
use rstest::rstest;

fn profile() -> CalibrationProfile {
    CalibrationProfile::new(150.0, 167.0, 388.0).unwrap()
}

#[rstest]
fn missing_frame_source_yields_typed_error() {
    let err = ControlLoop::builder()
        .with_detector(ScriptedDetector::new())
        .with_channel(RecordingChannel::new())
        .with_calibration(profile())
        .try_build()
        .expect_err("should fail with MissingFrameSource");

    match err.downcast_ref::<BuildError>() {
        Some(BuildError::MissingFrameSource) => {}
        other => panic!("expected MissingFrameSource, got: {other:?}"),
    }
}

#[rstest]
fn missing_channel_yields_typed_error() {
    let err = ControlLoop::builder()
        .with_frames(BlankFrames::endless())
        .with_detector(ScriptedDetector::new())
        .with_calibration(profile())
        .try_build()
        .expect_err("should fail with MissingChannel");
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::MissingChannel)
    ));
}

#[rstest]
fn missing_calibration_yields_typed_error() {
    let err = ControlLoop::builder()
        .with_frames(BlankFrames::endless())
        .with_detector(ScriptedDetector::new())
        .with_channel(RecordingChannel::new())
        .build()
        .expect_err("should fail with MissingCalibration");
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::MissingCalibration)
    ));
}

#[rstest]
fn non_finite_offset_rejected() {
    let err = ControlLoop::builder()
        .with_frames(BlankFrames::endless())
        .with_detector(ScriptedDetector::new())
        .with_channel(RecordingChannel::new())
        .with_calibration(profile())
        .with_offset(f64::INFINITY)
        .build()
        .expect_err("offset must be finite");
    assert!(matches!(
        err.downcast_ref::<CalibrationError>(),
        Some(CalibrationError::NonFiniteOffset(_))
    ));
}

#[rstest]
fn confidence_floor_out_of_range_rejected() {
    let err = ControlLoop::builder()
        .with_frames(BlankFrames::endless())
        .with_detector(ScriptedDetector::new())
        .with_channel(RecordingChannel::new())
        .with_calibration(profile())
        .with_filter(DetectionFilter {
            confidence_floor: 1.5,
            classes: Vec::new(),
        })
        .build()
        .expect_err("floor must be in [0, 1]");
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::InvalidConfig(_))
    ));
}

#[rstest]
fn calibration_rejects_non_positive_values() {
    let err = CalibrationProfile::new(150.0, 0.0, 388.0).unwrap_err();
    assert_eq!(
        err,
        CalibrationError::NonPositive {
            field: "reference_object_height",
            value: 0.0
        }
    );
    assert!(CalibrationProfile::new(-1.0, 167.0, 388.0).is_err());
    assert!(CalibrationProfile::new(150.0, 167.0, f64::NAN).is_err());
}

#[rstest]
fn built_loop_starts_idle_with_defaults() {
    let cl = ControlLoop::builder()
        .with_frames(BlankFrames::endless())
        .with_detector(ScriptedDetector::new())
        .with_channel(RecordingChannel::new())
        .with_calibration(profile())
        .build()
        .expect("build");
    assert_eq!(cl.phase(), Phase::Idle);
    assert_eq!(cl.estimator().offset(), 25.0);
    assert_eq!(cl.policy().bands().len(), 2);
}
