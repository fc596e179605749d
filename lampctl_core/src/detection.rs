//! Local acceptance filter applied to detector output.

use lampctl_traits::Detection;

/// Detections are acted on only when their confidence is strictly above
/// `confidence_floor` and their label is in `classes` (empty = any label).
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionFilter {
    pub confidence_floor: f32,
    pub classes: Vec<String>,
}

impl Default for DetectionFilter {
    fn default() -> Self {
        Self {
            confidence_floor: 0.65,
            classes: vec!["person".to_string()],
        }
    }
}

impl DetectionFilter {
    pub fn accepts(&self, d: &Detection) -> bool {
        d.confidence > self.confidence_floor
            && (self.classes.is_empty() || self.classes.iter().any(|c| *c == d.label))
    }

    /// Keep accepted detections, preserving report order.
    pub fn apply(&self, detections: Vec<Detection>) -> Vec<Detection> {
        detections.into_iter().filter(|d| self.accepts(d)).collect()
    }
}

impl From<&lampctl_config::DetectorCfg> for DetectionFilter {
    fn from(c: &lampctl_config::DetectorCfg) -> Self {
        Self {
            confidence_floor: c.confidence_floor,
            classes: c.classes.clone(),
        }
    }
}
