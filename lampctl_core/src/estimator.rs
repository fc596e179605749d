//! Distance from observed bounding-box height (pinhole model).
//!
//! focal    = frame_h_ref * distance_ref / object_h_ref
//! distance = object_h_ref * focal / frame_h_observed
//!
//! The empirical offset is not part of the formula; `DistanceEstimator`
//! adds it after the pure estimate.

use crate::calibration::CalibrationProfile;
use crate::error::CalibrationError;

/// Default empirical correction added to measured distances.
pub const DEFAULT_OFFSET: f64 = 25.0;

/// Result of one estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DistanceEstimate {
    Measured(f64),
    /// Zero-height (or otherwise unusable) box; no distance can be derived.
    Degenerate,
}

impl DistanceEstimate {
    pub fn value(self) -> Option<f64> {
        match self {
            DistanceEstimate::Measured(d) => Some(d),
            DistanceEstimate::Degenerate => None,
        }
    }

    /// Shift a measured distance; degenerate stays degenerate.
    pub fn offset_by(self, offset: f64) -> Self {
        match self {
            DistanceEstimate::Measured(d) => DistanceEstimate::Measured(d + offset),
            DistanceEstimate::Degenerate => DistanceEstimate::Degenerate,
        }
    }
}

#[inline]
pub fn focal_length(profile: &CalibrationProfile) -> f64 {
    profile.reference_frame_height() * profile.reference_distance()
        / profile.reference_object_height()
}

/// Pure estimate without offset.
///
/// Returns `Degenerate` for a zero height. Negative, NaN and infinite
/// heights, and heights so small the quotient overflows, are degenerate too.
#[inline]
pub fn estimate_distance(
    focal_length: f64,
    reference_object_height: f64,
    observed_frame_height: f64,
) -> DistanceEstimate {
    if !(observed_frame_height.is_finite() && observed_frame_height > 0.0) {
        return DistanceEstimate::Degenerate;
    }
    let d = reference_object_height * focal_length / observed_frame_height;
    if d.is_finite() {
        DistanceEstimate::Measured(d)
    } else {
        DistanceEstimate::Degenerate
    }
}

/// Calibration, its cached focal length, and the empirical offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceEstimator {
    profile: CalibrationProfile,
    focal_length: f64,
    offset: f64,
}

impl DistanceEstimator {
    pub fn new(profile: CalibrationProfile, offset: f64) -> Result<Self, CalibrationError> {
        if !offset.is_finite() {
            return Err(CalibrationError::NonFiniteOffset(offset));
        }
        Ok(Self {
            focal_length: focal_length(&profile),
            profile,
            offset,
        })
    }

    pub fn profile(&self) -> &CalibrationProfile {
        &self.profile
    }

    pub fn focal_length(&self) -> f64 {
        self.focal_length
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Estimate before the offset is applied.
    pub fn raw(&self, observed_frame_height: f64) -> DistanceEstimate {
        estimate_distance(
            self.focal_length,
            self.profile.reference_object_height(),
            observed_frame_height,
        )
    }

    /// Estimate with the empirical offset applied.
    pub fn estimate(&self, observed_frame_height: f64) -> DistanceEstimate {
        self.raw(observed_frame_height).offset_by(self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> CalibrationProfile {
        CalibrationProfile::new(150.0, 167.0, 388.0).unwrap()
    }

    #[test]
    fn focal_length_of_reference_profile() {
        let f = focal_length(&reference());
        assert!((f - 388.0 * 150.0 / 167.0).abs() < 1e-9);
    }

    #[test]
    fn zero_height_is_degenerate() {
        let e = DistanceEstimator::new(reference(), DEFAULT_OFFSET).unwrap();
        assert_eq!(e.raw(0.0), DistanceEstimate::Degenerate);
        assert_eq!(e.estimate(0.0), DistanceEstimate::Degenerate);
        assert_eq!(e.estimate(-3.0), DistanceEstimate::Degenerate);
        assert_eq!(e.estimate(f64::NAN), DistanceEstimate::Degenerate);
    }

    #[test]
    fn tiny_height_overflow_is_degenerate() {
        assert_eq!(
            estimate_distance(f64::MAX, 167.0, f64::MIN_POSITIVE),
            DistanceEstimate::Degenerate
        );
    }

    #[test]
    fn offset_applied_after_formula() {
        let e = DistanceEstimator::new(reference(), DEFAULT_OFFSET).unwrap();
        // 167 * (388 * 150 / 167) / 200 == 291
        let raw = e.raw(200.0).value().unwrap();
        let with_offset = e.estimate(200.0).value().unwrap();
        assert!((raw - 291.0).abs() < 1e-9);
        assert!((with_offset - 316.0).abs() < 1e-9);
    }

    #[test]
    fn non_finite_offset_rejected() {
        assert!(DistanceEstimator::new(reference(), f64::INFINITY).is_err());
    }
}
