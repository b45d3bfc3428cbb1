use std::io::Write;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use colored::*;
use swapout_cli::logging::init_logging;
use swapout_cli::{parse_args, report};
use swapout_core::{ProcessScanner, SystemSwap, VERSION};
use tracing::warn;

/// swapmon - list processes that have pages in swap
#[derive(Parser, Debug)]
#[command(name = "swapmon")]
#[command(version = VERSION)]
#[command(about = "List processes that have pages in swap (VmSwap > 0)", long_about = None)]
struct Cli {
    /// Extended table: PID, SWAP, RSS, VSZ, CMD
    #[arg(short, long)]
    full: bool,

    /// JSON output snapshot
    #[arg(short, long, conflicts_with = "top")]
    json: bool,

    /// Continuously refreshing top-like view
    #[arg(short, long)]
    top: bool,

    /// Top mode refresh interval in seconds
    #[arg(short, long, value_name = "SECS", default_value_t = 2.0, allow_negative_numbers = true)]
    delay: f64,

    /// Top mode iterations (0 = infinite)
    #[arg(short = 'n', long, value_name = "N", default_value_t = 0, allow_negative_numbers = true)]
    count: i64,
}

impl Cli {
    fn refresh_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.delay)
            .ok()
            .filter(|d| !d.is_zero())
            .unwrap_or(Duration::from_secs(1))
    }

    fn iterations(&self) -> u64 {
        u64::try_from(self.count).unwrap_or(0)
    }
}

fn main() -> ExitCode {
    let cli = match parse_args::<Cli>() {
        Ok(cli) => cli,
        Err(code) => return code,
    };

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", format!("Error: {:#}", e).red());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    init_logging("warn")?;
    let scanner = ProcessScanner::new();

    if cli.top {
        return top_mode(&scanner, cli);
    }

    let list = scanner.scan_swapped()?;
    if cli.json {
        println!("{}", report::render_json(read_swap(), &list)?);
    } else {
        print!("{}", report::render_table(&list, cli.full));
    }

    Ok(())
}

fn top_mode(scanner: &ProcessScanner, cli: &Cli) -> Result<()> {
    let interval = cli.refresh_interval();
    let max = cli.iterations();
    let mut iteration = 0u64;

    loop {
        let list = scanner.scan_swapped()?;
        let swap = read_swap();
        let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        // Clear screen, cursor home
        print!("\x1B[H\x1B[J");
        println!("{}", report::top_header(&now, &swap).bold());
        print!("{}", report::render_table(&list, cli.full));
        std::io::stdout().flush()?;

        iteration += 1;
        if max > 0 && iteration >= max {
            return Ok(());
        }

        thread::sleep(interval);
    }
}

/// Swap totals are informational; a missing /proc/meminfo shows zeros
fn read_swap() -> SystemSwap {
    SystemSwap::read().unwrap_or_else(|e| {
        warn!("{}", e);
        SystemSwap::default()
    })
}
