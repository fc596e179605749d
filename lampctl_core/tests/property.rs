use lampctl_core::{
    Actuation, CalibrationProfile, DEFAULT_BANDS, DistanceEstimate, DistanceEstimator, decide,
    estimate_distance, focal_length,
};
use lampctl_traits::DeviceId;
use proptest::prelude::*;

prop_compose! {
    fn profile_strategy()(
        d in 1.0f64..1000.0,
        h in 1.0f64..1000.0,
        fh in 1.0f64..2000.0,
    ) -> CalibrationProfile {
        CalibrationProfile::new(d, h, fh).unwrap()
    }
}

proptest! {
    #[test]
    fn focal_length_is_positive_and_finite(p in profile_strategy()) {
        let f = focal_length(&p);
        prop_assert!(f.is_finite() && f > 0.0);
    }

    #[test]
    fn focal_length_scales_with_reference_distance(p in profile_strategy(), k in 1.0f64..10.0) {
        let scaled = CalibrationProfile::new(
            p.reference_distance() * k,
            p.reference_object_height(),
            p.reference_frame_height(),
        ).unwrap();
        let ratio = focal_length(&scaled) / focal_length(&p);
        prop_assert!((ratio - k).abs() < 1e-9 * k);
    }

    #[test]
    fn distance_shrinks_as_box_grows(p in profile_strategy(), h in 1.0f64..1000.0, dh in 0.5f64..100.0) {
        let f = focal_length(&p);
        let near = estimate_distance(f, p.reference_object_height(), h + dh).value().unwrap();
        let far = estimate_distance(f, p.reference_object_height(), h).value().unwrap();
        prop_assert!(near > 0.0);
        prop_assert!(near < far);
    }

    #[test]
    fn non_positive_heights_are_degenerate(p in profile_strategy(), h in -1000.0f64..=0.0) {
        let e = DistanceEstimator::new(p, 25.0).unwrap();
        prop_assert_eq!(e.estimate(h), DistanceEstimate::Degenerate);
    }

    #[test]
    fn offset_is_added_once(p in profile_strategy(), h in 1.0f64..1000.0, off in -100.0f64..100.0) {
        let e = DistanceEstimator::new(p, off).unwrap();
        let raw = e.raw(h).value().unwrap();
        let shifted = e.estimate(h).value().unwrap();
        prop_assert!((shifted - raw - off).abs() < 1e-9 * raw.abs().max(1.0));
    }

    #[test]
    fn decision_is_pure(d in -1000.0f64..2000.0) {
        prop_assert_eq!(decide(DistanceEstimate::Measured(d)), decide(DistanceEstimate::Measured(d)));
    }

    #[test]
    fn at_most_one_device_on(d in -1000.0f64..2000.0) {
        let a = decide(DistanceEstimate::Measured(d));
        let on = a.iter().filter(|(_, c)| *c == lampctl_traits::Command::TurnOn).count();
        prop_assert!(on <= 1);
        let expected = DEFAULT_BANDS
            .iter()
            .find(|b| d > b.lower && d < b.upper)
            .map_or(Actuation::ALL_OFF, |b| Actuation::only(b.device));
        prop_assert_eq!(a, expected);
    }

    #[test]
    fn device1_band_interior(d in 150.0f64..249.8) {
        prop_assert_eq!(decide(DistanceEstimate::Measured(d)), Actuation::only(DeviceId::Device1));
    }

    #[test]
    fn device2_band_interior(d in 350.0f64..449.8) {
        prop_assert_eq!(decide(DistanceEstimate::Measured(d)), Actuation::only(DeviceId::Device2));
    }
}
