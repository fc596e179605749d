//! What a control cycle and a whole run did.

use lampctl_traits::{Command, DeviceId, Reply};

use crate::error::ChannelError;
use crate::estimator::DistanceEstimate;
use crate::policy::Actuation;

/// Stage of the per-frame state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Detect,
    Estimate,
    Decide,
    Dispatch,
    Throttle,
}

#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub device: DeviceId,
    pub command: Command,
    pub result: Result<Reply, ChannelError>,
}

impl DispatchOutcome {
    pub fn delivered(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// Observed box height the estimate came from; `None` when nobody was seen.
    pub observed_height: Option<f64>,
    pub estimate: DistanceEstimate,
    pub actuation: Actuation,
}

#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub seq: u64,
    /// Detections that passed the local filter.
    pub detections: usize,
    pub decisions: Vec<Decision>,
    pub dispatches: Vec<DispatchOutcome>,
    /// Capture or detection failed and the cycle fell back to all-off.
    pub degraded: bool,
    /// Wall time of the cycle, settle delays included.
    pub elapsed_ms: u64,
}

impl CycleReport {
    /// Command set the devices were last asked to apply this cycle.
    pub fn final_actuation(&self) -> Option<Actuation> {
        self.decisions.last().map(|d| d.actuation)
    }

    pub fn failed_dispatches(&self) -> usize {
        self.dispatches.iter().filter(|o| !o.delivered()).count()
    }
}

#[derive(Debug)]
pub enum CycleStatus {
    Completed(CycleReport),
    /// The frame source has no more frames; nothing was dispatched.
    EndOfStream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Signal,
    EndOfStream,
    CycleLimit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub commands_sent: u64,
    pub commands_failed: u64,
    pub degraded_cycles: u64,
    pub stop_reason: StopReason,
}
