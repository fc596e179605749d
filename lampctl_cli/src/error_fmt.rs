//! Human-readable error descriptions, exit codes and structured JSON errors.

use lampctl_core::error::{BuildError, CalibrationError, ChannelError, LampError};

/// Configuration or calibration rejected.
pub const EXIT_CONFIG: i32 = 3;
/// A device could not be reached by a one-shot command.
pub const EXIT_UNREACHABLE: i32 = 4;

/// Wrap any configuration problem so it maps to `EXIT_CONFIG`.
pub fn config_error(e: impl std::fmt::Display) -> eyre::Report {
    eyre::Report::new(LampError::Config(e.to_string()))
}

fn channel_help(ce: &ChannelError) -> String {
    match ce {
        ChannelError::ConnectFailed { device, reason } => format!(
            "What happened: Could not connect to {device} ({reason}).\nLikely causes: Lamp controller powered off, wrong host/port, or a firewall in between.\nHow to fix: Check [devices.{device}] in the config and that the controller is listening."
        ),
        ChannelError::SendFailed { device, reason } => format!(
            "What happened: Connected to {device} but the command could not be written ({reason}).\nLikely causes: Controller closed the connection early or the network dropped.\nHow to fix: Retry; if it persists, raise network.io_timeout_ms or check the controller logs."
        ),
    }
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    // Calibration CSV header special-case
    if lower.contains("calibration csv must have headers") {
        return "Invalid headers in calibration CSV. Expected 'distance,object_height,frame_height'."
            .to_string();
    }

    if let Some(ce) = err.downcast_ref::<CalibrationError>() {
        return format!(
            "What happened: Calibration is unusable ({ce}).\nLikely causes: A zero or negative reference measurement.\nHow to fix: Re-measure and fix [calibration] or the --calibration CSV."
        );
    }

    if let Some(ce) = err.downcast_ref::<ChannelError>() {
        return channel_help(ce);
    }

    if let Some(LampError::Config(m)) = err.downcast_ref::<LampError>() {
        return format!(
            "What happened: Invalid configuration ({m}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/lampctl.toml for a sample."
        );
    }

    if let Some(be) = err.downcast_ref::<BuildError>() {
        return format!(
            "What happened: The control loop could not be assembled ({be}).\nLikely causes: A component failed to initialize.\nHow to fix: Re-run with --log-level=debug for details."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable process exit code for an error.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<CalibrationError>().is_some() {
        return EXIT_CONFIG;
    }
    if err.downcast_ref::<ChannelError>().is_some() {
        return EXIT_UNREACHABLE;
    }
    if err.downcast_ref::<LampError>().is_some() {
        return EXIT_CONFIG;
    }
    if let Some(BuildError::InvalidConfig(_)) = err.downcast_ref::<BuildError>() {
        return EXIT_CONFIG;
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<CalibrationError>().is_some() {
        return "Calibration";
    }
    if let Some(ce) = err.downcast_ref::<ChannelError>() {
        return match ce {
            ChannelError::ConnectFailed { .. } => "ConnectFailed",
            ChannelError::SendFailed { .. } => "SendFailed",
        };
    }
    if err.downcast_ref::<LampError>().is_some() {
        return "Config";
    }
    "Error"
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let mut obj = json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    });
    if let Some(ce) = err.downcast_ref::<ChannelError>() {
        obj["details"] = json!({ "device": ce.device().to_string() });
    }
    obj.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lampctl_traits::DeviceId;

    #[test]
    fn config_errors_exit_3() {
        let e = config_error("devices.device1.port must be > 0");
        assert_eq!(exit_code_for_error(&e), EXIT_CONFIG);
        assert!(humanize(&e).contains("devices.device1.port"));
    }

    #[test]
    fn unreachable_device_exits_4_with_details() {
        let e = eyre::Report::new(ChannelError::ConnectFailed {
            device: DeviceId::Device2,
            reason: "refused".into(),
        });
        assert_eq!(exit_code_for_error(&e), EXIT_UNREACHABLE);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&e)).unwrap();
        assert_eq!(v["reason"], "ConnectFailed");
        assert_eq!(v["details"]["device"], "device2");
    }

    #[test]
    fn calibration_errors_exit_3_with_their_own_reason() {
        let e = eyre::Report::new(CalibrationError::NonPositive {
            field: "reference_object_height",
            value: 0.0,
        });
        assert_eq!(exit_code_for_error(&e), EXIT_CONFIG);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&e)).unwrap();
        assert_eq!(v["reason"], "Calibration");
        assert!(humanize(&e).contains("Calibration is unusable"));
    }

    #[test]
    fn config_errors_report_config_reason() {
        let e = config_error("camera.width and camera.height must be > 0");
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&e)).unwrap();
        assert_eq!(v["reason"], "Config");
        assert_eq!(v["exit_code"], EXIT_CONFIG);
    }

    #[test]
    fn unknown_errors_exit_1() {
        let e = eyre::eyre!("boom");
        assert_eq!(exit_code_for_error(&e), 1);
        assert!(humanize(&e).contains("boom"));
    }
}
