use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use lampctl_config::Config;
use lampctl_core::CalibrationProfile;

mod cli;
mod error_fmt;
mod logging;
mod probe;
mod run;

use cli::{Cli, Commands, JSON_MODE};
use error_fmt::{config_error, exit_code_for_error, format_error_json, humanize};

fn load_config(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| config_error(format!("read config {}: {e}", path.display())))?;
    let cfg = lampctl_config::load_toml(&text)
        .map_err(|e| config_error(format!("parse config {}: {e}", path.display())))?;
    cfg.validate().map_err(config_error)?;
    Ok(cfg)
}

/// CSV samples, then the `[calibration]` table, then the reference profile.
fn resolve_calibration(cli: &Cli, cfg: &Config) -> eyre::Result<CalibrationProfile> {
    let from_csv = match &cli.calibration {
        Some(path) => Some(lampctl_config::load_calibration_csv(path).map_err(config_error)?),
        None => None,
    };
    match from_csv.as_ref().or(cfg.calibration.as_ref()) {
        Some(p) => Ok(CalibrationProfile::try_from(p)?),
        None => {
            tracing::info!("no calibration configured; using reference profile");
            Ok(CalibrationProfile::REFERENCE)
        }
    }
}

fn try_main(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(&cli.config)?;
    logging::init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging)?;

    // `send` talks to a device directly and never needs calibration.
    match &cli.cmd {
        Commands::Run {
            replay,
            loop_replay,
            max_cycles,
        } => {
            let calibration = resolve_calibration(&cli, &cfg)?;
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&shutdown);
            ctrlc::set_handler(move || {
                flag.store(true, Ordering::Relaxed);
            })
            .map_err(|e| eyre::eyre!("install Ctrl-C handler: {e}"))?;

            let summary = run::run_loop(
                &cfg,
                calibration,
                replay,
                *loop_replay,
                *max_cycles,
                shutdown,
            )?;
            run::print_summary(&summary, cli.json);
            Ok(())
        }
        Commands::Estimate { height } => {
            let calibration = resolve_calibration(&cli, &cfg)?;
            probe::estimate(&cfg, calibration, *height, cli.json)
        }
        Commands::Send { device, command } => {
            probe::send(&cfg, *device, (*command).into(), cli.json)
        }
        Commands::SelfCheck => {
            let calibration = resolve_calibration(&cli, &cfg)?;
            probe::self_check(&cfg, calibration, cli.json)
        }
    }
}

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    let code = match try_main(cli) {
        Ok(()) => 0,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            if JSON_MODE.get().copied().unwrap_or(false) {
                eprintln!("{}", format_error_json(&e));
            } else {
                eprintln!("{}", humanize(&e));
            }
            exit_code_for_error(&e)
        }
    };
    std::process::exit(code);
}
