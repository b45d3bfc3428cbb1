use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cgroups::{backend_for, CgroupLease, CgroupVersion, ControlGroupBackend};
use crate::config::RunConfiguration;
use crate::sampler::{MemorySampler, ProcSampler, ProcessMemorySample};
use crate::{Error, Result};

/// Why the poll loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// RSS reached the target
    Converged,
    /// `max_iterations` samples without reaching the target
    TimedOut,
    /// The target exited while being polled
    ProcessVanished,
    /// The operator interrupted the run
    Cancelled,
}

impl StopReason {
    /// Whether the run counts as successful
    ///
    /// A timeout is a soft failure: the ceiling was applied and lifted again,
    /// the target just did not shrink far enough.
    pub fn is_success(&self) -> bool {
        !matches!(self, StopReason::Cancelled)
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StopReason::Converged => "converged",
            StopReason::TimedOut => "timed out",
            StopReason::ProcessVanished => "process vanished",
            StopReason::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Controller progress, in the only order it can happen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Start,
    Detect,
    Provisioned,
    LimitApplied,
    Polling,
    Stopped(StopReason),
    Restored,
    CleanedUp,
    Done,
}

/// Summary of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub pid: u32,
    pub version: CgroupVersion,
    pub stop: StopReason,
    /// Number of samples taken
    pub samples: u32,
    pub last_sample: Option<ProcessMemorySample>,
    /// The ceiling was written back
    pub restored: bool,
    /// The group directory was removed
    pub removed: bool,
}

struct PollOutcome {
    stop: StopReason,
    samples: u32,
    last_sample: Option<ProcessMemorySample>,
}

/// Drives one eviction: provision, cap, poll, restore, clean up
///
/// Once provisioning succeeds the group is held by a [`CgroupLease`], so every
/// later exit path (success, vanished target, timeout, cancellation, a failed
/// limit write, or an unwinding panic) restores the ceiling and removes the
/// group exactly once.
pub struct SwapoutController {
    backend: Arc<dyn ControlGroupBackend>,
    sampler: Box<dyn MemorySampler>,
    config: RunConfiguration,
    cancel: CancellationToken,
    history: Vec<RunState>,
}

impl SwapoutController {
    pub fn new(
        backend: Arc<dyn ControlGroupBackend>,
        sampler: Box<dyn MemorySampler>,
        config: RunConfiguration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            backend,
            sampler,
            config,
            cancel,
            history: vec![RunState::Start],
        }
    }

    /// Check the target and detect the host's cgroup backend
    ///
    /// Nothing on disk is touched when this fails.
    pub fn for_host(config: RunConfiguration, cancel: CancellationToken) -> Result<Self> {
        config.validate()?;

        if !nix::unistd::geteuid().is_root() {
            warn!("Not running as root; moving processes between cgroups will likely fail");
        }

        let sampler = ProcSampler::new(&config.proc_root);
        if !sampler.is_alive(config.pid) {
            return Err(Error::TargetMissing(config.pid));
        }

        let version = CgroupVersion::detect(&config.cgroup_root);
        debug!("Detected cgroup version {}", version);
        let backend = backend_for(version, &config.cgroup_root)
            .ok_or_else(|| Error::NoController(config.cgroup_root.clone()))?;

        let mut controller = Self::new(backend, Box::new(sampler), config, cancel);
        controller.enter(RunState::Detect);
        Ok(controller)
    }

    pub fn config(&self) -> &RunConfiguration {
        &self.config
    }

    /// States visited so far
    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    pub fn state(&self) -> RunState {
        self.history.last().copied().unwrap_or(RunState::Start)
    }

    fn enter(&mut self, state: RunState) {
        debug!("swapout state: {:?} -> {:?}", self.state(), state);
        self.history.push(state);
    }

    /// Run the eviction to completion
    ///
    /// Errors are fatal: [`Error::SetupFailure`] leaves nothing to restore,
    /// [`Error::LimitWriteFailed`] is returned only after restore and cleanup
    /// ran. Every [`StopReason`] yields `Ok`.
    pub async fn run(&mut self) -> Result<RunReport> {
        let pid = self.config.pid;
        info!("swapout: targeting PID {}", pid);
        info!(
            "limit_mb={}, target_rss_kb={}, interval={:.2}, max_iter={}",
            self.config.limit_mb,
            self.config.target_rss_kb,
            self.config.interval_secs,
            self.config.max_iterations
        );

        let ctx = self
            .backend
            .provision(pid)
            .map_err(|source| Error::SetupFailure { pid, source })?;
        let version = ctx.version;
        let lease = CgroupLease::new(Arc::clone(&self.backend), ctx);
        self.enter(RunState::Provisioned);

        let applied = self.backend.apply_limit(lease.context(), self.config.limit_mb);
        if let Err(source) = applied {
            let path = lease.context().limit_path.clone();
            self.finish(lease);
            return Err(Error::LimitWriteFailed { path, source });
        }
        self.enter(RunState::LimitApplied);

        let outcome = self.poll().await;
        self.enter(RunState::Stopped(outcome.stop));

        match outcome.stop {
            StopReason::TimedOut => warn!(
                "max_iter reached without hitting target RSS ({} kB); restoring anyway",
                self.config.target_rss_kb
            ),
            StopReason::Cancelled => warn!("Interrupted; restoring limit before exit"),
            StopReason::Converged | StopReason::ProcessVanished => {}
        }

        let (restored, removed) = self.finish(lease);
        info!("swapout complete");

        Ok(RunReport {
            pid,
            version,
            stop: outcome.stop,
            samples: outcome.samples,
            last_sample: outcome.last_sample,
            restored,
            removed,
        })
    }

    fn finish(&mut self, lease: CgroupLease) -> (bool, bool) {
        let released = lease.release();
        self.enter(RunState::Restored);
        self.enter(RunState::CleanedUp);
        self.enter(RunState::Done);
        (released.restored, released.removed)
    }

    async fn poll(&mut self) -> PollOutcome {
        self.enter(RunState::Polling);
        info!("Forcing swap... polling process memory usage");

        let pid = self.config.pid;
        let target = self.config.target_rss_kb;
        let mut last_sample = None;

        for iteration in 1..=self.config.max_iterations {
            if iteration > 1 && !self.pause().await {
                return PollOutcome {
                    stop: StopReason::Cancelled,
                    samples: iteration - 1,
                    last_sample,
                };
            }

            let sample = match self.sampler.sample(pid) {
                Ok(sample) => sample,
                Err(e) => {
                    if let Error::ProcessNotFound(_) = e {
                        info!("Process {} no longer exists, stopping", pid);
                    } else {
                        warn!("Cannot sample PID {} ({}), treating it as gone", pid, e);
                    }
                    return PollOutcome {
                        stop: StopReason::ProcessVanished,
                        samples: iteration,
                        last_sample,
                    };
                }
            };
            last_sample = Some(sample);

            info!(
                "iter {:>2}: RSS={} kB, SWAP={} kB",
                iteration, sample.resident_kb, sample.swapped_kb
            );

            if sample.resident_kb <= target {
                info!("Target RSS reached (<= {} kB), stopping", target);
                return PollOutcome {
                    stop: StopReason::Converged,
                    samples: iteration,
                    last_sample,
                };
            }
        }

        PollOutcome {
            stop: StopReason::TimedOut,
            samples: self.config.max_iterations,
            last_sample,
        }
    }

    /// Sleep one interval; `false` if cancelled before or during the sleep
    async fn pause(&self) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(self.config.interval()) => true,
        }
    }
}
