//! Per-process memory readings from `/proc/<pid>/status`

use std::path::PathBuf;

use procfs::process::Process;
use procfs::ProcError;
use tracing::debug;

use crate::{Error, Result};

/// Default procfs mount point
pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// Point-in-time memory reading for one process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessMemorySample {
    pub pid: u32,
    pub resident_kb: u64,
    pub swapped_kb: u64,
}

/// Source of memory samples
///
/// The controller only depends on this trait, which lets tests drive the poll
/// loop with a scripted RSS sequence.
pub trait MemorySampler: Send + Sync {
    /// Read the current resident and swapped size of `pid`
    ///
    /// Returns [`Error::ProcessNotFound`] once the process is gone.
    fn sample(&self, pid: u32) -> Result<ProcessMemorySample>;

    /// Whether the process currently exists
    fn is_alive(&self, pid: u32) -> bool;
}

/// Sampler backed by the procfs pseudo-filesystem
#[derive(Debug, Clone)]
pub struct ProcSampler {
    proc_root: PathBuf,
}

impl ProcSampler {
    pub fn new(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
        }
    }

    fn process(&self, pid: u32) -> procfs::ProcResult<Process> {
        Process::new_with_root(self.proc_root.join(pid.to_string()))
    }
}

impl Default for ProcSampler {
    fn default() -> Self {
        Self::new(DEFAULT_PROC_ROOT)
    }
}

impl MemorySampler for ProcSampler {
    fn sample(&self, pid: u32) -> Result<ProcessMemorySample> {
        let status = self
            .process(pid)
            .and_then(|process| process.status())
            .map_err(|e| match e {
                ProcError::Incomplete(_) | ProcError::InternalError(_) | ProcError::Other(_) => {
                    Error::Parse(format!("Malformed status for pid {}: {}", pid, e))
                }
                // Missing or unreadable: the process went away under us
                _ => {
                    debug!("Cannot read status of pid {}: {}", pid, e);
                    Error::ProcessNotFound(pid)
                }
            })?;

        // Kernel threads have no Vm* lines; they read as zero
        Ok(ProcessMemorySample {
            pid,
            resident_kb: status.vmrss.unwrap_or(0),
            swapped_kb: status.vmswap.unwrap_or(0),
        })
    }

    fn is_alive(&self, pid: u32) -> bool {
        self.process(pid).is_ok()
    }
}
