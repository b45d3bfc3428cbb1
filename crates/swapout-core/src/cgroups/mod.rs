//! Cgroup v1/v2 memory-controller integration
//!
//! Provides the backend abstraction used to park a single process in a
//! temporary `swapout/<pid>` group with a low memory ceiling.
//!
//! # Safety
//! - The group is owned by exactly one run and leased for its lifetime
//! - The ceiling is always written back before the group is removed
//! - There is no locking against other writers of the cgroup tree

pub mod backend;
pub mod error;
pub mod lease;
pub mod types;
mod utils;

pub use backend::{backend_for, CgroupV1, CgroupV2, ControlGroupBackend};
pub use error::{CgroupError, Result};
pub use lease::{CgroupLease, ReleaseOutcome};
pub use types::{CgroupVersion, ControlGroupContext, DEFAULT_CGROUP_ROOT, GROUP_PARENT};
