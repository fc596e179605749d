//! Validated pinhole-camera calibration.

use crate::error::CalibrationError;

/// Reference measurement the focal length is derived from.
///
/// All three values are finite and strictly positive; the only way to obtain
/// a profile is through `CalibrationProfile::new`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationProfile {
    reference_distance: f64,
    reference_object_height: f64,
    reference_frame_height: f64,
}

fn positive(field: &'static str, value: f64) -> Result<f64, CalibrationError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(CalibrationError::NonPositive { field, value })
    }
}

impl CalibrationProfile {
    /// 167 cm tall reference object observed 388 px tall at 150 cm.
    pub const REFERENCE: CalibrationProfile = CalibrationProfile {
        reference_distance: 150.0,
        reference_object_height: 167.0,
        reference_frame_height: 388.0,
    };

    pub fn new(
        reference_distance: f64,
        reference_object_height: f64,
        reference_frame_height: f64,
    ) -> Result<Self, CalibrationError> {
        Ok(Self {
            reference_distance: positive("reference_distance", reference_distance)?,
            reference_object_height: positive("reference_object_height", reference_object_height)?,
            reference_frame_height: positive("reference_frame_height", reference_frame_height)?,
        })
    }

    pub fn reference_distance(&self) -> f64 {
        self.reference_distance
    }

    pub fn reference_object_height(&self) -> f64 {
        self.reference_object_height
    }

    pub fn reference_frame_height(&self) -> f64 {
        self.reference_frame_height
    }
}

impl TryFrom<&lampctl_config::PersistedCalibration> for CalibrationProfile {
    type Error = CalibrationError;
    fn try_from(p: &lampctl_config::PersistedCalibration) -> Result<Self, Self::Error> {
        Self::new(
            p.reference_distance,
            p.reference_object_height,
            p.reference_frame_height,
        )
    }
}
