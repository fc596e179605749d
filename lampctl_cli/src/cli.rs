//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "lampctl", version, about = "Person-distance lamp controller")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/lampctl.toml")]
    pub config: PathBuf,

    /// Optional calibration samples CSV (strict header); overrides [calibration]
    #[arg(long, value_name = "FILE")]
    pub calibration: Option<PathBuf>,

    /// Log and print as JSON instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); RUST_LOG wins when set
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OnOff {
    On,
    Off,
}

impl From<OnOff> for lampctl_traits::Command {
    fn from(v: OnOff) -> Self {
        match v {
            OnOff::On => lampctl_traits::Command::TurnOn,
            OnOff::Off => lampctl_traits::Command::TurnOff,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the control loop over recorded detections
    Run {
        /// Detections to play back (JSON Lines, one frame per line)
        #[arg(long, value_name = "FILE")]
        replay: PathBuf,
        /// Restart the replay from the first frame when it ends
        #[arg(long = "loop-replay", action = ArgAction::SetTrue)]
        loop_replay: bool,
        /// Stop after this many cycles
        #[arg(long, value_name = "N")]
        max_cycles: Option<u64>,
    },
    /// Estimate distance and lamp decision for one box height (no network)
    Estimate {
        /// Observed bounding-box height in pixels
        #[arg(long, value_name = "PX")]
        height: f64,
    },
    /// Send one command to one device and print its reply
    Send {
        /// Device number
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=2))]
        device: u8,
        /// Command to send
        #[arg(long, value_enum)]
        command: OnOff,
    },
    /// Validate config and calibration, print derived values
    SelfCheck,
}
