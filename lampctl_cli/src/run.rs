//! Control loop assembly from config and the `run` command.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use eyre::WrapErr;
use lampctl_config::Config;
use lampctl_core::{BandPolicy, CalibrationProfile, ControlLoop, RunSummary, StopReason};
use lampctl_io::{Endpoint, ReplayCamera, ReplayDetector, ReplayScript, TcpChannel, TcpConnector};

use crate::error_fmt::config_error;

/// TCP channel to both lamp controllers, configured from `[devices]` and `[network]`.
pub fn tcp_channel(cfg: &Config) -> TcpChannel {
    let connector = TcpConnector::new(
        Duration::from_millis(cfg.network.connect_timeout_ms),
        Duration::from_millis(cfg.network.io_timeout_ms),
    );
    TcpChannel::new(
        connector,
        Endpoint::new(&cfg.devices.device1.host, cfg.devices.device1.port),
        Endpoint::new(&cfg.devices.device2.host, cfg.devices.device2.port),
    )
    .with_reply_max_bytes(cfg.network.reply_max_bytes)
}

pub fn labels(cfg: &Config) -> eyre::Result<Vec<String>> {
    match cfg.detector.labels_file.as_deref() {
        Some(path) => lampctl_config::load_labels(Path::new(path)).map_err(config_error),
        None => Ok(Vec::new()),
    }
}

pub fn stop_reason_name(r: StopReason) -> &'static str {
    match r {
        StopReason::Signal => "signal",
        StopReason::EndOfStream => "end_of_stream",
        StopReason::CycleLimit => "cycle_limit",
    }
}

pub fn run_loop(
    cfg: &Config,
    calibration: CalibrationProfile,
    replay: &Path,
    loop_replay: bool,
    max_cycles: Option<u64>,
    shutdown: Arc<AtomicBool>,
) -> eyre::Result<RunSummary> {
    let labels = labels(cfg)?;
    let script = Arc::new(
        ReplayScript::load(replay, &labels)
            .wrap_err_with(|| format!("load replay {}", replay.display()))?,
    );
    if script.is_empty() {
        tracing::warn!(path = %replay.display(), "replay has no frames");
    }

    let frames = ReplayCamera::new(
        Arc::clone(&script),
        cfg.camera.width,
        cfg.camera.height,
        loop_replay,
    );
    let detector = ReplayDetector::new(
        script,
        cfg.detector.confidence_threshold,
        cfg.detector.nms_threshold,
    );
    let policy = BandPolicy::try_from(&cfg.policy).map_err(config_error)?;

    let mut control = ControlLoop::builder()
        .with_frames(frames)
        .with_detector(detector)
        .with_channel(tcp_channel(cfg))
        .with_calibration(calibration)
        .with_offset(cfg.estimator.offset)
        .with_policy(policy)
        .with_filter((&cfg.detector).into())
        .with_loop_cfg((&cfg.control).into())
        .build()?;

    tracing::info!(
        device1 = %format!("{}:{}", cfg.devices.device1.host, cfg.devices.device1.port),
        device2 = %format!("{}:{}", cfg.devices.device2.host, cfg.devices.device2.port),
        replay = %replay.display(),
        "starting control loop"
    );
    Ok(control.run(&shutdown, max_cycles))
}

pub fn print_summary(summary: &RunSummary, json: bool) {
    if json {
        let obj = serde_json::json!({
            "cycles": summary.cycles,
            "commands_sent": summary.commands_sent,
            "commands_failed": summary.commands_failed,
            "degraded_cycles": summary.degraded_cycles,
            "stop_reason": stop_reason_name(summary.stop_reason),
        });
        println!("{obj}");
    } else {
        println!(
            "stopped ({}) after {} cycles: {} commands sent, {} failed, {} degraded cycles",
            stop_reason_name(summary.stop_reason),
            summary.cycles,
            summary.commands_sent,
            summary.commands_failed,
            summary.degraded_cycles
        );
    }
}
