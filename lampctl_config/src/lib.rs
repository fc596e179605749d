#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and calibration parsing for the lamp controller.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Calibration CSV loader enforces headers and averages sample
//!   measurements taken at a single reference distance.
//! - Class-label files map numeric detector class ids to names.
use serde::Deserialize;
use serde::de::Deserializer;

/// Calibration CSV schema.
///
/// Expected headers:
/// distance,object_height,frame_height
///
/// Example:
/// distance,object_height,frame_height
/// 150,167,391
/// 150,167,385
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct CalibrationRow {
    pub distance: f64,
    pub object_height: f64,
    pub frame_height: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct Devices {
    pub device1: Endpoint,
    pub device2: Endpoint,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Network {
    /// Max time to establish the TCP connection to a device
    pub connect_timeout_ms: u64,
    /// Write/read timeout once connected; a reply timeout is not fatal
    pub io_timeout_ms: u64,
    /// Upper bound on reply bytes read per command
    pub reply_max_bytes: usize,
}

impl Default for Network {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 1000,
            io_timeout_ms: 1000,
            reply_max_bytes: 200,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DetectorCfg {
    /// Threshold applied by the detector itself before NMS
    pub confidence_threshold: f32,
    /// IoU above which overlapping boxes are suppressed
    pub nms_threshold: f32,
    /// Local floor: detections must be strictly above this to be acted on
    pub confidence_floor: f32,
    /// Class labels acted on; empty means every label
    pub classes: Vec<String>,
    /// Optional newline-separated label file (1-based class ids)
    pub labels_file: Option<String>,
}

impl Default for DetectorCfg {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.45,
            nms_threshold: 0.2,
            confidence_floor: 0.65,
            classes: vec!["person".to_string()],
            labels_file: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Camera {
    pub width: u32,
    pub height: u32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    /// Dispatch once per detection in report order; the last one wins.
    #[default]
    Each,
    /// Dispatch once per cycle for the nearest measured detection.
    Nearest,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Dispatch {
    #[default]
    Sequential,
    Parallel,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ControlCfg {
    /// Pause after each device pair is addressed (ms)
    pub settle_ms: u64,
    pub aggregation: Aggregation,
    pub dispatch: Dispatch,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self {
            settle_ms: 300,
            aggregation: Aggregation::Each,
            dispatch: Dispatch::Sequential,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Estimator {
    /// Empirical correction added to every measured distance
    pub offset: f64,
}

impl Default for Estimator {
    fn default() -> Self {
        Self { offset: 25.0 }
    }
}

/// One distance band: `lower < d < upper` lights `device` (1-based).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandCfg {
    pub lower: f64,
    pub upper: f64,
    pub device: u8,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct PolicyCfg {
    /// Optional band table. Accepts either:
    /// - array of tables: [{ lower = 149.9, upper = 249.9, device = 1 }, ...]
    /// - array of tuples: [[149.9, 249.9, 1], [349.9, 449.9, 2]]
    ///
    /// Empty means the built-in bands.
    #[serde(deserialize_with = "de_bands")]
    pub bands: Vec<BandCfg>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub devices: Devices,
    /// Optional persisted calibration; a calibration CSV given on the
    /// command line takes precedence.
    #[serde(default)]
    pub calibration: Option<PersistedCalibration>,
    #[serde(default)]
    pub estimator: Estimator,
    #[serde(default)]
    pub network: Network,
    #[serde(default)]
    pub detector: DetectorCfg,
    #[serde(default)]
    pub camera: Camera,
    #[serde(default)]
    pub control: ControlCfg,
    #[serde(default)]
    pub policy: PolicyCfg,
    #[serde(default)]
    pub logging: Logging,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct PersistedCalibration {
    /// distance at which the reference sample was measured
    pub reference_distance: f64,
    /// real-world height of the reference object
    pub reference_object_height: f64,
    /// pixel height of the reference object at `reference_distance`
    pub reference_frame_height: f64,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BandToml {
    Tuple((f64, f64, u8)),
    Table { lower: f64, upper: f64, device: u8 },
}

fn de_bands<'de, D>(deserializer: D) -> Result<Vec<BandCfg>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<Vec<BandToml>> = Option::deserialize(deserializer)?;
    let mut out = Vec::new();
    if let Some(items) = opt {
        for b in items {
            match b {
                BandToml::Tuple((lower, upper, device)) => out.push(BandCfg {
                    lower,
                    upper,
                    device,
                }),
                BandToml::Table {
                    lower,
                    upper,
                    device,
                } => out.push(BandCfg {
                    lower,
                    upper,
                    device,
                }),
            }
        }
    }
    Ok(out)
}

impl PersistedCalibration {
    /// Average calibration samples measured at one reference distance.
    pub fn from_rows(rows: Vec<CalibrationRow>) -> eyre::Result<Self> {
        let Some(first) = rows.first() else {
            eyre::bail!("calibration requires at least one row");
        };
        let distance = first.distance;

        for (i, r) in rows.iter().enumerate() {
            if !(r.distance.is_finite() && r.object_height.is_finite() && r.frame_height.is_finite())
            {
                eyre::bail!("calibration row {} has a non-finite value", i + 2);
            }
            if r.distance <= 0.0 || r.object_height <= 0.0 || r.frame_height <= 0.0 {
                eyre::bail!("calibration row {} must have all values > 0", i + 2);
            }
            if r.distance != distance {
                eyre::bail!(
                    "calibration rows must share one reference distance ({} at row 2, {} at row {})",
                    distance,
                    r.distance,
                    i + 2
                );
            }
        }

        let n = rows.len() as f64;
        let object_height = rows.iter().map(|r| r.object_height).sum::<f64>() / n;
        let frame_height = rows.iter().map(|r| r.frame_height).sum::<f64>() / n;

        Ok(PersistedCalibration {
            reference_distance: distance,
            reference_object_height: object_height,
            reference_frame_height: frame_height,
        })
    }
}

impl TryFrom<Vec<CalibrationRow>> for PersistedCalibration {
    type Error = eyre::Report;
    fn try_from(rows: Vec<CalibrationRow>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

pub fn load_calibration_csv(path: &std::path::Path) -> eyre::Result<PersistedCalibration> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open calibration CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["distance", "object_height", "frame_height"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "calibration CSV must have headers 'distance,object_height,frame_height', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<CalibrationRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }

    PersistedCalibration::try_from(rows)
}

/// Parse a class-label file: one label per line, trailing newlines trimmed.
pub fn parse_labels(s: &str) -> Vec<String> {
    s.trim_end_matches(['\n', '\r'])
        .lines()
        .map(|l| l.trim_end_matches('\r').to_string())
        .collect()
}

pub fn load_labels(path: &std::path::Path) -> eyre::Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read labels file {:?}: {}", path, e))?;
    let labels = parse_labels(&text);
    if labels.is_empty() {
        eyre::bail!("labels file {:?} is empty", path);
    }
    Ok(labels)
}

fn validate_endpoint(name: &str, ep: &Endpoint) -> eyre::Result<()> {
    if ep.host.trim().is_empty() {
        eyre::bail!("devices.{name}.host must not be empty");
    }
    if ep.port == 0 {
        eyre::bail!("devices.{name}.port must be > 0");
    }
    Ok(())
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Devices
        validate_endpoint("device1", &self.devices.device1)?;
        validate_endpoint("device2", &self.devices.device2)?;

        // Calibration
        if let Some(c) = &self.calibration {
            for (name, v) in [
                ("reference_distance", c.reference_distance),
                ("reference_object_height", c.reference_object_height),
                ("reference_frame_height", c.reference_frame_height),
            ] {
                if !(v.is_finite() && v > 0.0) {
                    eyre::bail!("calibration.{name} must be > 0");
                }
            }
        }

        // Estimator
        if !self.estimator.offset.is_finite() {
            eyre::bail!("estimator.offset must be finite");
        }

        // Network
        if self.network.connect_timeout_ms == 0 {
            eyre::bail!("network.connect_timeout_ms must be >= 1");
        }
        if self.network.io_timeout_ms == 0 {
            eyre::bail!("network.io_timeout_ms must be >= 1");
        }
        if self.network.reply_max_bytes == 0 || self.network.reply_max_bytes > 4096 {
            eyre::bail!("network.reply_max_bytes must be in [1, 4096]");
        }

        // Detector
        let d = &self.detector;
        if !(0.0..=1.0).contains(&d.confidence_threshold) {
            eyre::bail!("detector.confidence_threshold must be in [0.0, 1.0]");
        }
        if !(0.0..=1.0).contains(&d.nms_threshold) {
            eyre::bail!("detector.nms_threshold must be in [0.0, 1.0]");
        }
        if !(0.0..=1.0).contains(&d.confidence_floor) {
            eyre::bail!("detector.confidence_floor must be in [0.0, 1.0]");
        }
        if d.classes.iter().any(|c| c.trim().is_empty()) {
            eyre::bail!("detector.classes must not contain empty labels");
        }

        // Camera
        if self.camera.width == 0 || self.camera.height == 0 {
            eyre::bail!("camera.width and camera.height must be > 0");
        }

        // Control
        if self.control.settle_ms > 60 * 1000 {
            eyre::bail!("control.settle_ms is unreasonably large (>60s)");
        }

        // Policy
        for (i, b) in self.policy.bands.iter().enumerate() {
            if !(b.lower.is_finite() && b.upper.is_finite()) {
                eyre::bail!("policy.bands[{i}] bounds must be finite");
            }
            if b.lower >= b.upper {
                eyre::bail!("policy.bands[{i}] lower must be < upper");
            }
            if !(1..=2).contains(&b.device) {
                eyre::bail!("policy.bands[{i}].device must be 1 or 2");
            }
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_trim_trailing_newline() {
        let labels = parse_labels("person\nbicycle\ncar\n");
        assert_eq!(labels, vec!["person", "bicycle", "car"]);
    }

    #[test]
    fn labels_handle_crlf() {
        let labels = parse_labels("person\r\ncar\r\n");
        assert_eq!(labels, vec!["person", "car"]);
    }
}
