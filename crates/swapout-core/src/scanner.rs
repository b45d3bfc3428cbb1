use std::cmp::Ordering;

use procfs::process::{all_processes, Process};
use procfs::{Current, Meminfo};
use serde::Serialize;
use tracing::debug;

use crate::{Error, Result};

/// A process with at least one page in swap
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwappedProcess {
    pub pid: u32,
    pub name: String,
    pub swap_kb: u64,
    pub rss_kb: u64,
    pub vsz_kb: u64,
    /// Command line, or the process name when it has none
    pub cmd: String,
}

/// System-wide swap totals from `/proc/meminfo`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SystemSwap {
    pub swap_total_kb: u64,
    pub swap_free_kb: u64,
}

impl SystemSwap {
    pub fn read() -> Result<Self> {
        let meminfo = Meminfo::current()
            .map_err(|e| Error::Scanner(format!("Failed to read /proc/meminfo: {}", e)))?;

        // procfs reports bytes
        Ok(Self {
            swap_total_kb: meminfo.swap_total / 1024,
            swap_free_kb: meminfo.swap_free / 1024,
        })
    }

    pub fn used_kb(&self) -> u64 {
        self.swap_total_kb.saturating_sub(self.swap_free_kb)
    }
}

/// Join a NUL-split command line; `None` when there is nothing to show
pub fn format_cmdline(args: &[String]) -> Option<String> {
    let joined = args.join(" ");
    let trimmed = joined.trim_end();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Swap descending, then pid ascending
pub fn by_swap_desc(a: &SwappedProcess, b: &SwappedProcess) -> Ordering {
    b.swap_kb.cmp(&a.swap_kb).then(a.pid.cmp(&b.pid))
}

/// Scanner for processes holding swap
pub struct ProcessScanner;

impl ProcessScanner {
    pub fn new() -> Self {
        Self
    }

    /// Every process with `VmSwap > 0`, largest first
    ///
    /// Processes that exit or deny access mid-scan are skipped.
    pub fn scan_swapped(&self) -> Result<Vec<SwappedProcess>> {
        let processes = all_processes()
            .map_err(|e| Error::Scanner(format!("Failed to open /proc: {}", e)))?;

        let mut swapped: Vec<SwappedProcess> = processes
            .filter_map(|process| process.ok())
            .filter_map(|process| Self::inspect(&process))
            .collect();

        swapped.sort_by(by_swap_desc);
        Ok(swapped)
    }

    fn inspect(process: &Process) -> Option<SwappedProcess> {
        let status = match process.status() {
            Ok(status) => status,
            Err(e) => {
                debug!("Skipping pid {}: {}", process.pid, e);
                return None;
            }
        };

        let swap_kb = status.vmswap.unwrap_or(0);
        if swap_kb == 0 {
            return None;
        }

        let cmd = process
            .cmdline()
            .ok()
            .and_then(|args| format_cmdline(&args))
            .unwrap_or_else(|| status.name.clone());

        Some(SwappedProcess {
            pid: u32::try_from(process.pid).ok()?,
            name: status.name,
            swap_kb,
            rss_kb: status.vmrss.unwrap_or(0),
            vsz_kb: status.vmsize.unwrap_or(0),
            cmd,
        })
    }
}

impl Default for ProcessScanner {
    fn default() -> Self {
        Self::new()
    }
}
