//! Data types for cgroup management

use std::fmt;
use std::path::{Path, PathBuf};

/// Default cgroup mount point
pub const DEFAULT_CGROUP_ROOT: &str = "/sys/fs/cgroup";

/// Per-tool parent directory created under the version-specific root
pub const GROUP_PARENT: &str = "swapout";

/// Which cgroup API the host exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CgroupVersion {
    /// No usable memory controller
    None,
    /// Legacy per-controller hierarchy (`memory/`)
    V1,
    /// Unified hierarchy
    V2,
}

impl CgroupVersion {
    /// Inspect the well-known markers under `root`
    ///
    /// `cgroup.controllers` only exists on the unified hierarchy, so it wins
    /// over a `memory/` directory (hybrid hosts mount both).
    pub fn detect(root: &Path) -> Self {
        if root.join("cgroup.controllers").exists() {
            CgroupVersion::V2
        } else if root.join("memory").exists() {
            CgroupVersion::V1
        } else {
            CgroupVersion::None
        }
    }
}

impl fmt::Display for CgroupVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CgroupVersion::None => "none",
            CgroupVersion::V1 => "v1",
            CgroupVersion::V2 => "v2",
        };
        f.write_str(name)
    }
}

/// One provisioned cgroup for one target process
///
/// Built only by a successful provision, so `group_path` is never empty.
/// `original_limit` is captured before the first write to `limit_path` and
/// never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlGroupContext {
    pub version: CgroupVersion,
    pub pid: u32,
    pub group_path: PathBuf,
    pub membership_path: PathBuf,
    pub limit_path: PathBuf,
    original_limit: Option<String>,
}

impl ControlGroupContext {
    pub fn new(
        version: CgroupVersion,
        pid: u32,
        group_path: PathBuf,
        limit_file: &str,
        original_limit: Option<String>,
    ) -> Self {
        Self {
            version,
            pid,
            membership_path: group_path.join("cgroup.procs"),
            limit_path: group_path.join(limit_file),
            group_path,
            original_limit,
        }
    }

    /// Ceiling value read before any modification, if it was readable
    pub fn original_limit(&self) -> Option<&str> {
        self.original_limit
            .as_deref()
            .filter(|value| !value.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_detect_v2() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("cgroup.controllers"), "cpu memory\n").unwrap();
        // Hybrid layout still reports the unified hierarchy
        fs::create_dir(tmp.path().join("memory")).unwrap();

        assert_eq!(CgroupVersion::detect(tmp.path()), CgroupVersion::V2);
    }

    #[test]
    fn test_detect_v1() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("memory")).unwrap();

        assert_eq!(CgroupVersion::detect(tmp.path()), CgroupVersion::V1);
    }

    #[test]
    fn test_detect_none_has_no_side_effects() {
        let tmp = TempDir::new().unwrap();

        assert_eq!(CgroupVersion::detect(tmp.path()), CgroupVersion::None);
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_version_display() {
        assert_eq!(CgroupVersion::None.to_string(), "none");
        assert_eq!(CgroupVersion::V1.to_string(), "v1");
        assert_eq!(CgroupVersion::V2.to_string(), "v2");
    }

    #[test]
    fn test_context_paths() {
        let ctx = ControlGroupContext::new(
            CgroupVersion::V2,
            42,
            PathBuf::from("/sys/fs/cgroup/swapout/42"),
            "memory.high",
            Some("max".to_string()),
        );

        assert_eq!(
            ctx.membership_path,
            PathBuf::from("/sys/fs/cgroup/swapout/42/cgroup.procs")
        );
        assert_eq!(
            ctx.limit_path,
            PathBuf::from("/sys/fs/cgroup/swapout/42/memory.high")
        );
        assert_eq!(ctx.original_limit(), Some("max"));
    }

    #[test]
    fn test_empty_original_limit_counts_as_absent() {
        let ctx = ControlGroupContext::new(
            CgroupVersion::V1,
            42,
            PathBuf::from("/tmp/swapout/42"),
            "memory.limit_in_bytes",
            Some(String::new()),
        );

        assert_eq!(ctx.original_limit(), None);
    }
}
