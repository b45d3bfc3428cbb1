//! Version-specific cgroup backends
//!
//! Both hierarchies expose the same four operations (create a group, move a
//! pid into it, write a memory ceiling, restore it). They differ only in
//! where the group lives, which file holds the ceiling, and how "unlimited"
//! is spelled. Implementations supply those three facts and inherit the
//! operations.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::error::{CgroupError, Result};
use super::types::{CgroupVersion, ControlGroupContext, GROUP_PARENT};
use super::utils::{ensure_dir, mb_to_bytes, read_trimmed, write_cgroup_file};

/// Memory-controller operations on one cgroup hierarchy
pub trait ControlGroupBackend: Send + Sync {
    fn version(&self) -> CgroupVersion;

    /// Directory the per-tool `swapout` parent is created in
    fn hierarchy_root(&self) -> &Path;

    /// Name of the ceiling file inside a group
    fn limit_file(&self) -> &'static str;

    /// Value that lifts the ceiling when no original was captured
    fn unlimited(&self) -> &'static str;

    /// Create `<hierarchy>/swapout/<pid>`, capture the current ceiling and
    /// move `pid` into the group
    ///
    /// Pre-existing directories are reused. If the pid cannot be migrated
    /// [`CgroupError::MigrationFailed`] is returned; a group created by this
    /// call is removed again (best effort), a stale one is left alone.
    fn provision(&self, pid: u32) -> Result<ControlGroupContext> {
        let hierarchy = self.hierarchy_root();
        ensure_dir(hierarchy)?;

        let parent = hierarchy.join(GROUP_PARENT);
        ensure_dir(&parent)?;

        let group_path = parent.join(pid.to_string());
        let created = ensure_dir(&group_path)?;
        info!(
            "cgroup {} detected, using {}",
            self.version(),
            group_path.display()
        );

        let limit_path = group_path.join(self.limit_file());
        let original_limit = match read_trimmed(&limit_path) {
            Ok(value) => {
                info!("Original limit at {}: '{}'", limit_path.display(), value);
                Some(value)
            }
            Err(e) => {
                warn!(
                    "Could not read original limit at {} ({}), will restore '{}' instead",
                    limit_path.display(),
                    e,
                    self.unlimited()
                );
                None
            }
        };

        let ctx = ControlGroupContext::new(
            self.version(),
            pid,
            group_path,
            self.limit_file(),
            original_limit,
        );

        if let Err(e) = write_cgroup_file(&ctx.membership_path, &pid.to_string()) {
            if created {
                if let Err(rm) = fs::remove_dir(&ctx.group_path) {
                    debug!(
                        "Leaving {} in place after failed migration: {}",
                        ctx.group_path.display(),
                        rm
                    );
                }
            }
            return Err(CgroupError::MigrationFailed {
                pid,
                path: ctx.membership_path,
                source: Box::new(e),
            });
        }

        info!("Moved PID {} into {}", pid, ctx.group_path.display());
        Ok(ctx)
    }

    /// Write the eviction ceiling, in bytes, to the group's limit file
    fn apply_limit(&self, ctx: &ControlGroupContext, limit_mb: u64) -> Result<()> {
        let bytes = mb_to_bytes(limit_mb);
        info!(
            "Applying temporary limit {} bytes ({} MB) to {}",
            bytes,
            limit_mb,
            ctx.limit_path.display()
        );

        write_cgroup_file(&ctx.limit_path, &bytes.to_string())
    }

    /// Put back the captured ceiling, or lift it entirely
    fn restore_limit(&self, ctx: &ControlGroupContext) -> Result<()> {
        let value = ctx.original_limit().unwrap_or_else(|| self.unlimited());
        info!("Restoring limit at {} to '{}'", ctx.limit_path.display(), value);

        write_cgroup_file(&ctx.limit_path, value)
    }

    /// Remove the per-pid group directory
    ///
    /// Fails while the group still has members, e.g. when the target has
    /// exited but not been reaped yet.
    fn cleanup(&self, ctx: &ControlGroupContext) -> Result<()> {
        fs::remove_dir(&ctx.group_path)?;
        info!("Removed cgroup {}", ctx.group_path.display());
        Ok(())
    }
}

/// Unified hierarchy: `<root>/swapout/<pid>/memory.high`
///
/// `memory.high` is a throttling threshold, so the target is pushed into
/// reclaim instead of being OOM-killed.
#[derive(Debug, Clone)]
pub struct CgroupV2 {
    root: PathBuf,
}

impl CgroupV2 {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ControlGroupBackend for CgroupV2 {
    fn version(&self) -> CgroupVersion {
        CgroupVersion::V2
    }

    fn hierarchy_root(&self) -> &Path {
        &self.root
    }

    fn limit_file(&self) -> &'static str {
        "memory.high"
    }

    fn unlimited(&self) -> &'static str {
        "max"
    }
}

/// Legacy memory controller: `<root>/memory/swapout/<pid>/memory.limit_in_bytes`
#[derive(Debug, Clone)]
pub struct CgroupV1 {
    memory_root: PathBuf,
}

impl CgroupV1 {
    /// Largest value v1 accepts (page-aligned `LLONG_MAX`)
    pub const UNLIMITED: &'static str = "9223372036854771712";

    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            memory_root: root.as_ref().join("memory"),
        }
    }
}

impl ControlGroupBackend for CgroupV1 {
    fn version(&self) -> CgroupVersion {
        CgroupVersion::V1
    }

    fn hierarchy_root(&self) -> &Path {
        &self.memory_root
    }

    fn limit_file(&self) -> &'static str {
        "memory.limit_in_bytes"
    }

    fn unlimited(&self) -> &'static str {
        Self::UNLIMITED
    }
}

/// Pick the backend for a detected version
///
/// Returns `None` for [`CgroupVersion::None`].
pub fn backend_for(version: CgroupVersion, root: &Path) -> Option<Arc<dyn ControlGroupBackend>> {
    match version {
        CgroupVersion::V2 => Some(Arc::new(CgroupV2::new(root))),
        CgroupVersion::V1 => Some(Arc::new(CgroupV1::new(root))),
        CgroupVersion::None => None,
    }
}
