//! Type-state builder for `ControlLoop`.
//!
//! The builder enforces at compile time that a frame source, a detector and a
//! device channel are provided before `build()` is available. `try_build()`
//! is always available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use lampctl_traits::clock::{Clock, MonotonicClock};
use lampctl_traits::{Detector, DeviceChannel, FrameSource};

use crate::calibration::CalibrationProfile;
use crate::config::LoopCfg;
use crate::control::ControlLoop;
use crate::detection::DetectionFilter;
use crate::error::{BuildError, Result};
use crate::estimator::{DEFAULT_OFFSET, DistanceEstimator};
use crate::policy::BandPolicy;
use crate::report::Phase;

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `ControlLoop`. All fields are validated on `build()`.
pub struct ControlLoopBuilder<F, D, C> {
    frames: Option<Box<dyn FrameSource>>,
    detector: Option<Box<dyn Detector>>,
    channel: Option<Box<dyn DeviceChannel>>,
    calibration: Option<CalibrationProfile>,
    offset: Option<f64>,
    policy: Option<BandPolicy>,
    filter: Option<DetectionFilter>,
    cfg: Option<LoopCfg>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    _f: PhantomData<F>,
    _d: PhantomData<D>,
    _c: PhantomData<C>,
}

impl Default for ControlLoopBuilder<Missing, Missing, Missing> {
    fn default() -> Self {
        Self {
            frames: None,
            detector: None,
            channel: None,
            calibration: None,
            offset: None,
            policy: None,
            filter: None,
            cfg: None,
            clock: None,
            _f: PhantomData,
            _d: PhantomData,
            _c: PhantomData,
        }
    }
}

impl ControlLoop {
    /// Start building a ControlLoop.
    pub fn builder() -> ControlLoopBuilder<Missing, Missing, Missing> {
        ControlLoopBuilder::default()
    }
}

impl<F, D, C> ControlLoopBuilder<F, D, C> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<ControlLoop> {
        let frames = self
            .frames
            .ok_or_else(|| eyre::Report::new(BuildError::MissingFrameSource))?;
        let detector = self
            .detector
            .ok_or_else(|| eyre::Report::new(BuildError::MissingDetector))?;
        let channel = self
            .channel
            .ok_or_else(|| eyre::Report::new(BuildError::MissingChannel))?;
        let calibration = self
            .calibration
            .ok_or_else(|| eyre::Report::new(BuildError::MissingCalibration))?;

        let estimator = DistanceEstimator::new(calibration, self.offset.unwrap_or(DEFAULT_OFFSET))
            .map_err(eyre::Report::new)?;

        let filter = self.filter.unwrap_or_default();
        if !(0.0..=1.0).contains(&filter.confidence_floor) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "confidence floor must be in [0, 1]",
            )));
        }

        let clock: Arc<dyn Clock + Send + Sync> = match self.clock {
            Some(b) => Arc::from(b),
            None => Arc::new(MonotonicClock::new()),
        };

        Ok(ControlLoop {
            frames,
            detector,
            channel,
            estimator,
            policy: self.policy.unwrap_or_default(),
            filter,
            cfg: self.cfg.unwrap_or_default(),
            clock,
            phase: Phase::Idle,
            seq: 0,
        })
    }
}

/// Chainable setters that do not affect type-state.
impl<F, D, C> ControlLoopBuilder<F, D, C> {
    pub fn with_calibration(mut self, calibration: CalibrationProfile) -> Self {
        self.calibration = Some(calibration);
        self
    }
    /// Empirical correction added to every measured distance.
    pub fn with_offset(mut self, offset: f64) -> Self {
        self.offset = Some(offset);
        self
    }
    pub fn with_policy(mut self, policy: BandPolicy) -> Self {
        self.policy = Some(policy);
        self
    }
    pub fn with_filter(mut self, filter: DetectionFilter) -> Self {
        self.filter = Some(filter);
        self
    }
    pub fn with_loop_cfg(mut self, cfg: LoopCfg) -> Self {
        self.cfg = Some(cfg);
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

// Setters that advance type-state
impl<D, C> ControlLoopBuilder<Missing, D, C> {
    pub fn with_frames(
        self,
        frames: impl FrameSource + 'static,
    ) -> ControlLoopBuilder<Set, D, C> {
        ControlLoopBuilder {
            frames: Some(Box::new(frames)),
            detector: self.detector,
            channel: self.channel,
            calibration: self.calibration,
            offset: self.offset,
            policy: self.policy,
            filter: self.filter,
            cfg: self.cfg,
            clock: self.clock,
            _f: PhantomData,
            _d: PhantomData,
            _c: PhantomData,
        }
    }
}

impl<F, C> ControlLoopBuilder<F, Missing, C> {
    pub fn with_detector(
        self,
        detector: impl Detector + 'static,
    ) -> ControlLoopBuilder<F, Set, C> {
        ControlLoopBuilder {
            frames: self.frames,
            detector: Some(Box::new(detector)),
            channel: self.channel,
            calibration: self.calibration,
            offset: self.offset,
            policy: self.policy,
            filter: self.filter,
            cfg: self.cfg,
            clock: self.clock,
            _f: PhantomData,
            _d: PhantomData,
            _c: PhantomData,
        }
    }
}

impl<F, D> ControlLoopBuilder<F, D, Missing> {
    pub fn with_channel(
        self,
        channel: impl DeviceChannel + 'static,
    ) -> ControlLoopBuilder<F, D, Set> {
        ControlLoopBuilder {
            frames: self.frames,
            detector: self.detector,
            channel: Some(Box::new(channel)),
            calibration: self.calibration,
            offset: self.offset,
            policy: self.policy,
            filter: self.filter,
            cfg: self.cfg,
            clock: self.clock,
            _f: PhantomData,
            _d: PhantomData,
            _c: PhantomData,
        }
    }
}

impl ControlLoopBuilder<Set, Set, Set> {
    /// Validate and build. Only available when frames, detector and channel are set.
    pub fn build(self) -> Result<ControlLoop> {
        self.try_build()
    }
}
