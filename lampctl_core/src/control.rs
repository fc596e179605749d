//! The per-frame control loop (`ControlLoop`).
//!
//! Idle -> Detect -> Estimate -> Decide -> Dispatch -> Throttle -> Idle.
//! Nothing in a cycle is fatal: capture, detector and channel failures are
//! logged and degrade to all-off. The stop flag is checked once per cycle,
//! so an in-flight send always completes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use lampctl_traits::clock::Clock;
use lampctl_traits::{Command, Detection, Detector, DeviceChannel, DeviceId, FrameSource};

use crate::config::{Aggregation, Dispatch, LoopCfg};
use crate::detection::DetectionFilter;
use crate::error::ChannelError;
use crate::estimator::{DistanceEstimate, DistanceEstimator};
use crate::link_error::map_link_error;
use crate::policy::{Actuation, BandPolicy};
use crate::report::{
    CycleReport, CycleStatus, Decision, DispatchOutcome, Phase, RunSummary, StopReason,
};

pub struct ControlLoop {
    pub(crate) frames: Box<dyn FrameSource>,
    pub(crate) detector: Box<dyn Detector>,
    pub(crate) channel: Box<dyn DeviceChannel>,
    pub(crate) estimator: DistanceEstimator,
    pub(crate) policy: BandPolicy,
    pub(crate) filter: DetectionFilter,
    pub(crate) cfg: LoopCfg,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) phase: Phase,
    pub(crate) seq: u64,
}

impl core::fmt::Debug for ControlLoop {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ControlLoop")
            .field("focal_length", &self.estimator.focal_length())
            .field("offset", &self.estimator.offset())
            .field("bands", &self.policy.bands())
            .field("cfg", &self.cfg)
            .field("phase", &self.phase)
            .field("seq", &self.seq)
            .finish()
    }
}

fn send_one(channel: &dyn DeviceChannel, device: DeviceId, command: Command) -> DispatchOutcome {
    let result = match channel.send(device, command) {
        Ok(reply) => {
            tracing::debug!(%device, %command, reply = %reply.text(), "command delivered");
            Ok(reply)
        }
        Err(e) => {
            let err = map_link_error(e.as_ref(), device);
            tracing::warn!(%device, %command, error = %err, "command not delivered");
            Err(err)
        }
    };
    DispatchOutcome {
        device,
        command,
        result,
    }
}

fn send_pair_parallel(channel: &dyn DeviceChannel, actuation: Actuation) -> Vec<DispatchOutcome> {
    std::thread::scope(|s| {
        let handles: Vec<_> = actuation
            .iter()
            .map(|(device, command)| {
                (
                    device,
                    command,
                    s.spawn(move || send_one(channel, device, command)),
                )
            })
            .collect();
        handles
            .into_iter()
            .map(|(device, command, h)| {
                h.join().unwrap_or_else(|_| DispatchOutcome {
                    device,
                    command,
                    result: Err(ChannelError::SendFailed {
                        device,
                        reason: "dispatch thread panicked".to_string(),
                    }),
                })
            })
            .collect()
    })
}

impl ControlLoop {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn estimator(&self) -> &DistanceEstimator {
        &self.estimator
    }

    pub fn policy(&self) -> &BandPolicy {
        &self.policy
    }

    /// Address both devices with `actuation`, then settle.
    fn dispatch_pair(&mut self, actuation: Actuation, report: &mut CycleReport) {
        self.phase = Phase::Dispatch;
        let channel: &dyn DeviceChannel = self.channel.as_ref();
        let outcomes = match self.cfg.dispatch {
            Dispatch::Sequential => actuation
                .iter()
                .map(|(device, command)| send_one(channel, device, command))
                .collect(),
            Dispatch::Parallel => send_pair_parallel(channel, actuation),
        };
        report.dispatches.extend(outcomes);

        self.phase = Phase::Throttle;
        self.clock.sleep(self.cfg.settle);
    }

    fn decide_for(&mut self, height: f64) -> Decision {
        self.phase = Phase::Estimate;
        let estimate = self.estimator.estimate(height);
        self.phase = Phase::Decide;
        let actuation = self.policy.decide(estimate);
        match estimate {
            DistanceEstimate::Measured(d) => {
                tracing::debug!(height, distance = d, ?actuation, "decision");
            }
            DistanceEstimate::Degenerate => {
                tracing::debug!(height, "degenerate measurement; all off");
            }
        }
        Decision {
            observed_height: Some(height),
            estimate,
            actuation,
        }
    }

    /// Detections for this cycle; `None` means the stream has ended.
    fn acquire(&mut self, report: &mut CycleReport) -> Option<Vec<Detection>> {
        self.phase = Phase::Detect;
        let frame = match self.frames.next_frame() {
            Ok(Some(f)) => f,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "frame capture failed; treating as no detection");
                report.degraded = true;
                return Some(Vec::new());
            }
        };
        match self.detector.detect(&frame) {
            Ok(raw) => Some(self.filter.apply(raw)),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    frame = frame.seq,
                    "detector failed; treating as no detection"
                );
                report.degraded = true;
                Some(Vec::new())
            }
        }
    }

    /// One control cycle.
    pub fn step(&mut self) -> CycleStatus {
        let span = tracing::debug_span!("cycle", seq = self.seq);
        let _enter = span.enter();

        let started = self.clock.now();
        let mut report = CycleReport {
            seq: self.seq,
            ..CycleReport::default()
        };

        let Some(detections) = self.acquire(&mut report) else {
            self.phase = Phase::Idle;
            tracing::info!("frame source ended");
            return CycleStatus::EndOfStream;
        };
        report.detections = detections.len();

        if detections.is_empty() {
            tracing::debug!("no person detected; all off");
            report.decisions.push(Decision {
                observed_height: None,
                estimate: DistanceEstimate::Degenerate,
                actuation: Actuation::ALL_OFF,
            });
            self.dispatch_pair(Actuation::ALL_OFF, &mut report);
        } else {
            match self.cfg.aggregation {
                Aggregation::Each => {
                    for d in &detections {
                        let decision = self.decide_for(f64::from(d.bbox.height));
                        let actuation = decision.actuation;
                        report.decisions.push(decision);
                        self.dispatch_pair(actuation, &mut report);
                    }
                }
                Aggregation::Nearest => {
                    let decisions: Vec<Decision> = detections
                        .iter()
                        .map(|d| self.decide_for(f64::from(d.bbox.height)))
                        .collect();
                    let chosen = decisions
                        .iter()
                        .filter_map(|dec| dec.estimate.value().map(|v| (v, dec)))
                        .min_by(|a, b| a.0.total_cmp(&b.0))
                        .map(|(_, dec)| dec.clone())
                        .unwrap_or_else(|| decisions[0].clone());
                    let actuation = chosen.actuation;
                    report.decisions.push(chosen);
                    self.dispatch_pair(actuation, &mut report);
                }
            }
        }

        report.elapsed_ms = self.clock.ms_since(started);
        let failed = report.failed_dispatches();
        if failed > 0 {
            tracing::warn!(failed, "cycle finished with undelivered commands");
        }
        tracing::debug!(
            elapsed_ms = report.elapsed_ms,
            dispatches = report.dispatches.len(),
            "cycle done"
        );
        self.phase = Phase::Idle;
        self.seq += 1;
        CycleStatus::Completed(report)
    }

    /// Run cycles until `stop` is set, the frame source ends, or
    /// `max_cycles` cycles have completed.
    pub fn run(&mut self, stop: &AtomicBool, max_cycles: Option<u64>) -> RunSummary {
        let mut summary = RunSummary {
            cycles: 0,
            commands_sent: 0,
            commands_failed: 0,
            degraded_cycles: 0,
            stop_reason: StopReason::Signal,
        };
        tracing::info!(
            focal_length = self.estimator.focal_length(),
            offset = self.estimator.offset(),
            settle_ms = self.cfg.settle.as_millis() as u64,
            "control loop start"
        );

        loop {
            if stop.load(Ordering::Relaxed) {
                summary.stop_reason = StopReason::Signal;
                break;
            }
            if let Some(max) = max_cycles
                && summary.cycles >= max
            {
                summary.stop_reason = StopReason::CycleLimit;
                break;
            }
            match self.step() {
                CycleStatus::EndOfStream => {
                    summary.stop_reason = StopReason::EndOfStream;
                    break;
                }
                CycleStatus::Completed(report) => {
                    summary.cycles += 1;
                    summary.commands_sent += report.dispatches.len() as u64;
                    summary.commands_failed += report.failed_dispatches() as u64;
                    if report.degraded {
                        summary.degraded_cycles += 1;
                    }
                }
            }
        }

        tracing::info!(
            cycles = summary.cycles,
            sent = summary.commands_sent,
            failed = summary.commands_failed,
            reason = ?summary.stop_reason,
            "control loop stop"
        );
        summary
    }
}
