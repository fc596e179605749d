use lampctl_core::{Actuation, CalibrationProfile, DistanceEstimate, DistanceEstimator, decide};
use lampctl_traits::{Command, DeviceId};
use rstest::rstest;

#[rstest]
#[case(0.0)]
#[case(149.9)]
#[case(249.9)]
#[case(250.0)]
#[case(300.0)]
#[case(349.9)]
#[case(449.9)]
#[case(450.0)]
#[case(10_000.0)]
#[case(-5.0)]
fn bounds_and_gaps_are_all_off(#[case] d: f64) {
    assert_eq!(decide(DistanceEstimate::Measured(d)), Actuation::ALL_OFF);
}

#[rstest]
#[case(149.91, DeviceId::Device1)]
#[case(200.0, DeviceId::Device1)]
#[case(249.89, DeviceId::Device1)]
#[case(349.91, DeviceId::Device2)]
#[case(400.0, DeviceId::Device2)]
#[case(449.89, DeviceId::Device2)]
fn interior_turns_one_device_on(#[case] d: f64, #[case] on: DeviceId) {
    let a = decide(DistanceEstimate::Measured(d));
    for device in DeviceId::ALL {
        let expected = if device == on {
            Command::TurnOn
        } else {
            Command::TurnOff
        };
        assert_eq!(a.command_for(device), expected, "d={d} device={device}");
    }
}

#[test]
fn degenerate_is_all_off() {
    assert_eq!(decide(DistanceEstimate::Degenerate), Actuation::ALL_OFF);
}

// Reference calibration: 167 cm object seen 388 px tall at 150 cm; offset 25.
#[rstest]
#[case(300.0, Actuation::only(DeviceId::Device1))]
#[case(160.0, Actuation::only(DeviceId::Device2))]
#[case(200.0, Actuation::ALL_OFF)]
#[case(0.0, Actuation::ALL_OFF)]
fn reference_calibration_end_to_end(#[case] height: f64, #[case] expected: Actuation) {
    let est = DistanceEstimator::new(CalibrationProfile::new(150.0, 167.0, 388.0).unwrap(), 25.0)
        .unwrap();
    assert_eq!(decide(est.estimate(height)), expected);
}
