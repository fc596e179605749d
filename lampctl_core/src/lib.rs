#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core lamp-control logic (hardware-agnostic).
//!
//! All interaction with the outside world goes through the
//! `lampctl_traits::FrameSource`, `Detector` and `DeviceChannel` traits.
//!
//! ## Architecture
//!
//! - **Calibration**: validated reference measurement (`calibration` module)
//! - **Estimation**: pinhole focal length and distance (`estimator` module)
//! - **Policy**: distance bands to per-device commands (`policy` module)
//! - **Filtering**: local confidence floor and label allow-list (`detection` module)
//! - **Control**: the per-frame loop and its builder (`control`, `builder`)
//! - **Reports**: per-cycle and per-run outcomes (`report` module)

pub mod builder;
pub mod calibration;
pub mod config;
pub mod control;
pub mod detection;
pub mod error;
pub mod estimator;
pub mod link_error;
pub mod mocks;
pub mod policy;
pub mod report;

pub use builder::ControlLoopBuilder;
pub use calibration::CalibrationProfile;
pub use config::{Aggregation, Dispatch, LoopCfg};
pub use control::ControlLoop;
pub use detection::DetectionFilter;
pub use error::{BuildError, CalibrationError, ChannelError, LampError};
pub use estimator::{
    DEFAULT_OFFSET, DistanceEstimate, DistanceEstimator, estimate_distance, focal_length,
};
pub use policy::{Actuation, Band, BandPolicy, DEFAULT_BANDS, decide};
pub use report::{
    CycleReport, CycleStatus, Decision, DispatchOutcome, Phase, RunSummary, StopReason,
};
