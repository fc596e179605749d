use lampctl_traits::DeviceId;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("calibration {field} must be a finite value > 0, got {value}")]
    NonPositive { field: &'static str, value: f64 },
    #[error("estimator offset must be finite, got {0}")]
    NonFiniteOffset(f64),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("connect to {device} failed: {reason}")]
    ConnectFailed { device: DeviceId, reason: String },
    #[error("send to {device} failed: {reason}")]
    SendFailed { device: DeviceId, reason: String },
}

impl ChannelError {
    pub fn device(&self) -> DeviceId {
        match self {
            ChannelError::ConnectFailed { device, .. } | ChannelError::SendFailed { device, .. } => {
                *device
            }
        }
    }
}

/// Operator input (config file, calibration CSV, label file) was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LampError {
    #[error("configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing frame source")]
    MissingFrameSource,
    #[error("missing detector")]
    MissingDetector,
    #[error("missing device channel")]
    MissingChannel,
    #[error("missing calibration")]
    MissingCalibration,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
