//! Scoped ownership of a provisioned cgroup
//!
//! A [`CgroupLease`] is taken as soon as provisioning succeeds. Restoring the
//! ceiling and removing the group happen exactly once, either through
//! [`CgroupLease::release`] on the orderly path or from `Drop` when the
//! controller unwinds early.

use std::sync::Arc;

use tracing::{error, warn};

use super::backend::ControlGroupBackend;
use super::types::ControlGroupContext;

/// What the release step managed to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseOutcome {
    /// The ceiling was written back (original value or sentinel)
    pub restored: bool,
    /// The per-pid group directory was removed
    pub removed: bool,
}

pub struct CgroupLease {
    backend: Arc<dyn ControlGroupBackend>,
    ctx: ControlGroupContext,
    released: bool,
}

impl CgroupLease {
    pub fn new(backend: Arc<dyn ControlGroupBackend>, ctx: ControlGroupContext) -> Self {
        Self {
            backend,
            ctx,
            released: false,
        }
    }

    pub fn context(&self) -> &ControlGroupContext {
        &self.ctx
    }

    /// Restore the ceiling, then remove the group
    ///
    /// Neither failure escalates: a failed restore is logged as an error and
    /// cleanup still runs, a failed cleanup is logged as a warning.
    pub fn release(mut self) -> ReleaseOutcome {
        self.release_once()
    }

    fn release_once(&mut self) -> ReleaseOutcome {
        self.released = true;

        let restored = match self.backend.restore_limit(&self.ctx) {
            Ok(()) => true,
            Err(e) => {
                error!(
                    "Failed to restore limit at {}: {}",
                    self.ctx.limit_path.display(),
                    e
                );
                false
            }
        };

        let removed = match self.backend.cleanup(&self.ctx) {
            Ok(()) => true,
            Err(e) => {
                warn!("Could not remove {}: {}", self.ctx.group_path.display(), e);
                false
            }
        };

        ReleaseOutcome { restored, removed }
    }
}

impl Drop for CgroupLease {
    fn drop(&mut self) {
        if !self.released {
            warn!(
                "Releasing cgroup {} on an abnormal exit path",
                self.ctx.group_path.display()
            );
            self.release_once();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cgroups::backend::CgroupV2;
    use std::fs;
    use tempfile::TempDir;

    fn provisioned() -> (TempDir, Arc<dyn ControlGroupBackend>, ControlGroupContext) {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("cgroup.controllers"), "memory\n").unwrap();
        let backend: Arc<dyn ControlGroupBackend> = Arc::new(CgroupV2::new(tmp.path()));
        let ctx = backend.provision(31).unwrap();
        backend.apply_limit(&ctx, 8).unwrap();
        (tmp, backend, ctx)
    }

    #[test]
    fn test_release_restores_limit() {
        let (_tmp, backend, ctx) = provisioned();
        let limit_path = ctx.limit_path.clone();

        let outcome = CgroupLease::new(backend, ctx).release();

        assert!(outcome.restored);
        // tmpfs keeps the interface files, so rmdir fails as on a busy group
        assert!(!outcome.removed);
        assert_eq!(fs::read_to_string(limit_path).unwrap(), "max\n");
    }

    #[test]
    fn test_drop_restores_limit() {
        let (_tmp, backend, ctx) = provisioned();
        let limit_path = ctx.limit_path.clone();

        {
            let _lease = CgroupLease::new(backend, ctx);
            assert_eq!(fs::read_to_string(&limit_path).unwrap(), "8388608\n");
        }

        assert_eq!(fs::read_to_string(limit_path).unwrap(), "max\n");
    }

    #[test]
    fn test_release_reports_restore_failure() {
        let (_tmp, backend, ctx) = provisioned();
        // Swap the limit file for a directory so the restore write fails
        fs::remove_file(&ctx.limit_path).unwrap();
        fs::create_dir(&ctx.limit_path).unwrap();

        let outcome = CgroupLease::new(backend, ctx).release();
        assert!(!outcome.restored);
    }
}
