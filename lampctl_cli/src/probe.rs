//! One-shot commands: `estimate`, `send` and `self-check`.

use lampctl_config::Config;
use lampctl_core::link_error::map_link_error;
use lampctl_core::{BandPolicy, CalibrationProfile, DistanceEstimator};
use lampctl_traits::{Command, DeviceId};
use serde_json::json;

use crate::error_fmt::config_error;
use crate::run::tcp_channel;

fn estimator(cfg: &Config, calibration: CalibrationProfile) -> eyre::Result<DistanceEstimator> {
    Ok(DistanceEstimator::new(calibration, cfg.estimator.offset)?)
}

pub fn estimate(
    cfg: &Config,
    calibration: CalibrationProfile,
    height: f64,
    json: bool,
) -> eyre::Result<()> {
    let est = estimator(cfg, calibration)?;
    let policy = BandPolicy::try_from(&cfg.policy).map_err(config_error)?;
    let distance = est.estimate(height);
    let actuation = policy.decide(distance);

    if json {
        let obj = json!({
            "height": height,
            "focal_length": est.focal_length(),
            "offset": est.offset(),
            "distance": distance.value(),
            "device1": actuation.device1.to_string(),
            "device2": actuation.device2.to_string(),
        });
        println!("{obj}");
    } else {
        match distance.value() {
            Some(d) => println!("distance: {d:.2}"),
            None => println!("distance: degenerate"),
        }
        for (device, command) in actuation.iter() {
            println!("{device}: {command}");
        }
    }
    Ok(())
}

pub fn send(cfg: &Config, device: u8, command: Command, json: bool) -> eyre::Result<()> {
    let device = DeviceId::from_number(device)
        .ok_or_else(|| eyre::eyre!("device must be 1 or 2, got {device}"))?;
    let channel = tcp_channel(cfg);
    let endpoint = channel.endpoint(device).to_string();
    let reply = channel
        .send_command(device, command)
        .map_err(|e| eyre::Report::new(map_link_error(&e, device)))?;

    if json {
        let obj = json!({
            "device": device.to_string(),
            "endpoint": endpoint,
            "command": command.to_string(),
            "reply": reply.text(),
        });
        println!("{obj}");
    } else {
        println!("{device} ({endpoint}) <- {command}; reply: {:?}", reply.text());
    }
    Ok(())
}

pub fn self_check(cfg: &Config, calibration: CalibrationProfile, json: bool) -> eyre::Result<()> {
    let est = estimator(cfg, calibration)?;
    let policy = BandPolicy::try_from(&cfg.policy).map_err(config_error)?;
    let bands: Vec<_> = policy
        .bands()
        .iter()
        .map(|b| json!({ "lower": b.lower, "upper": b.upper, "device": b.device.to_string() }))
        .collect();
    let device1 = format!("{}:{}", cfg.devices.device1.host, cfg.devices.device1.port);
    let device2 = format!("{}:{}", cfg.devices.device2.host, cfg.devices.device2.port);

    if json {
        let obj = json!({
            "status": "ok",
            "focal_length": est.focal_length(),
            "offset": est.offset(),
            "device1": device1,
            "device2": device2,
            "bands": bands,
        });
        println!("{obj}");
    } else {
        println!("config ok");
        println!("focal length: {:.4}", est.focal_length());
        println!("offset: {}", est.offset());
        println!("device1: {device1}");
        println!("device2: {device2}");
        for b in policy.bands() {
            println!("band ({}, {}) -> {}", b.lower, b.upper, b.device);
        }
    }
    Ok(())
}
