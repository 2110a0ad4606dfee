//! `calibrator` — production line test and NVS calibration for TI wl12xx / wl18xx.
//!
//! ```text
//! USAGE:
//!   calibrator [--debug] [--dry-run] [--nvs <file>] [--new-nvs <file>] \
//!              [dev <devname> | phy <phyname>] <section> <command> [args...]
//!
//!   calibrator dev wlan0 plt power_mode on
//!   calibrator phy phy0 plt tune_channel 0 7
//!   calibrator plt autocalibrate wlan0 wl12xx_sdio radio.ini nvs.bin
//!   calibrator get dump_nvs nvs.bin
//!   calibrator help [section]
//! ```
//!
//! Exit status: 0 on success, 1 for usage errors, 2 for internal or
//! firmware failures, `-errno` when the kernel rejected a request.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use wl_calibrator::{
    dispatch, select_backend, BackendSelection, CalError, Config, Context, ModuleControl,
    RecordingModules, SystemModules,
};

#[derive(Parser)]
#[command(
    name = "calibrator",
    about = "wl12xx / wl18xx production line test and calibration",
    version
)]
struct Cli {
    /// Log netlink traffic and every step.
    #[arg(long)]
    debug: bool,

    /// Print testmode requests and module actions instead of performing them.
    #[arg(long)]
    dry_run: bool,

    /// Current NVS file (overrides WLCAL_NVS_PATH).
    #[arg(long, value_name = "FILE")]
    nvs: Option<PathBuf>,

    /// Output for newly generated NVS files (overrides WLCAL_NEW_NVS_PATH).
    #[arg(long, value_name = "FILE")]
    new_nvs: Option<PathBuf>,

    /// [dev <devname> | phy <phyname>] <section> <command> [args...]
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    command: Vec<String>,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = i32::from(e.use_stderr());
            let _ = e.print();
            std::process::exit(code);
        }
    };

    init_tracing(&cli);

    if let Err(e) = run(cli) {
        std::process::exit(report(&e));
    }
}

fn init_tracing(cli: &Cli) {
    let default = if cli.debug {
        "debug"
    } else if cli.dry_run {
        "info"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::from_env();
    if let Some(nvs) = cli.nvs {
        config.nvs_path = nvs;
    }
    if let Some(new_nvs) = cli.new_nvs {
        config.new_nvs_path = new_nvs;
    }
    config.dry_run = cli.dry_run;

    let selection = if config.dry_run {
        BackendSelection::DryRun
    } else {
        BackendSelection::Netlink
    };
    let mut backend = select_backend(selection);
    tracing::debug!("Using {} backend", backend.backend_type());

    let mut modules: Box<dyn ModuleControl> = if config.dry_run {
        Box::new(RecordingModules::new())
    } else {
        Box::new(SystemModules::new())
    };

    let argv: Vec<&str> = if cli.command.is_empty() {
        vec!["help"]
    } else {
        cli.command.iter().map(String::as_str).collect()
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut ctx = Context::new(backend.as_mut(), modules.as_mut(), config, &mut out);

    dispatch(&mut ctx, &argv)?;
    Ok(())
}

/// Print the error and pick the exit status
fn report(e: &anyhow::Error) -> i32 {
    match e.downcast_ref::<CalError>() {
        Some(CalError::Usage {
            reason,
            usage: Some(usage),
        }) => {
            eprintln!("{reason}\n");
            eprintln!("Usage: {usage}");
            1
        }
        Some(err) => {
            eprintln!("Error: {err}");
            err.exit_code()
        }
        None => {
            eprintln!("Error: {e:#}");
            2
        }
    }
}
