use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use swapout_cli::logging::{controller_level, init_logging};
use swapout_cli::{parse_args, report};
use swapout_core::{RunConfiguration, Settings, SwapoutController, VERSION};
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// swapout - push a process's memory into swap
///
/// Constrains the process to a small cgroup memory limit until its RSS drops
/// to the target, then restores the original limit.
#[derive(Parser, Debug)]
#[command(name = "swapout")]
#[command(version = VERSION)]
#[command(about = "Force a process's memory into swap via a temporary cgroup limit", long_about = None)]
#[command(after_help = "Example:\n  swapout 12345 -m 8 -r 16384 -i 1 -n 60")]
struct Cli {
    /// Target process ID
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    pid: u32,

    /// Memory limit during swapout in MB (default: 8)
    #[arg(short = 'm', long, value_name = "MB", env = "SWAPOUT_LIMIT_MB", allow_negative_numbers = true)]
    limit_mb: Option<i64>,

    /// Target RSS to reach before stopping in kB (default: 16384)
    #[arg(short = 'r', long, value_name = "KB", env = "SWAPOUT_TARGET_RSS_KB", allow_negative_numbers = true)]
    target_rss_kb: Option<i64>,

    /// Poll interval in seconds (default: 1.0)
    #[arg(short = 'i', long, value_name = "SECS", env = "SWAPOUT_INTERVAL", allow_negative_numbers = true)]
    interval: Option<f64>,

    /// Maximum iterations before giving up (default: 60)
    #[arg(short = 'n', long, value_name = "N", env = "SWAPOUT_MAX_ITER", allow_negative_numbers = true)]
    max_iter: Option<i64>,

    /// Less verbose output
    #[arg(short, long)]
    quiet: bool,

    /// Path to configuration file
    #[arg(short, long, env = "SWAPOUT_CONFIG", default_value = "/etc/swapout/config.toml")]
    config: PathBuf,
}

impl Cli {
    fn settings(&self) -> Settings {
        Settings {
            limit_mb: self.limit_mb,
            target_rss_kb: self.target_rss_kb,
            interval_secs: self.interval,
            max_iterations: self.max_iter,
            quiet: self.quiet.then_some(true),
            cgroup_root: None,
            proc_root: None,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match parse_args::<Cli>() {
        Ok(cli) => cli,
        Err(code) => return code,
    };

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", format!("Error: {:#}", e).red());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let file_settings = load_settings(&cli.config)?;
    let settings = file_settings
        .clone()
        .unwrap_or_default()
        .merged(cli.settings());
    let config = RunConfiguration::resolve(cli.pid, &settings);

    init_logging(controller_level(config.quiet))?;
    match file_settings {
        Some(_) => info!("Loaded configuration from {}", cli.config.display()),
        None => debug!("No configuration file at {}, using defaults", cli.config.display()),
    }

    let cancel = CancellationToken::new();
    listen_for_shutdown(cancel.clone())?;

    let quiet = config.quiet;
    let mut controller = SwapoutController::for_host(config, cancel)?;
    let report = controller.run().await?;

    if !quiet {
        let line = report::run_summary(&report);
        if report::needs_attention(&report) {
            println!("{}", line.yellow().bold());
        } else {
            println!("{}", line.green().bold());
        }
    }

    Ok(if report.stop.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Read the TOML config if it exists; a missing file is not an error
fn load_settings(path: &Path) -> Result<Option<Settings>> {
    if !path.exists() {
        return Ok(None);
    }

    Ok(Some(Settings::load_from_file(path)?))
}

/// Cancel the run on SIGINT or SIGTERM so the limit still gets restored
///
/// Both handlers are registered before returning, so a signal that lands
/// before the first await still cancels instead of killing the process.
fn listen_for_shutdown(cancel: CancellationToken) -> Result<()> {
    let mut interrupt =
        signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;
    let mut terminate =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

    tokio::spawn(async move {
        tokio::select! {
            _ = interrupt.recv() => {}
            _ = terminate.recv() => {}
        }
        warn!("Shutdown signal received, stopping before the next sample");
        cancel.cancel();
    });

    Ok(())
}
