use std::path::PathBuf;

use thiserror::Error;

use crate::cgroups::CgroupError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No such process: {0}")]
    TargetMissing(u32),

    #[error("No cgroup v1/v2 memory controller detected under {0:?}")]
    NoController(PathBuf),

    #[error("Failed to set up cgroup for pid {pid}")]
    SetupFailure {
        pid: u32,
        #[source]
        source: CgroupError,
    },

    #[error("Failed to set limit at {path:?}")]
    LimitWriteFailed {
        path: PathBuf,
        #[source]
        source: CgroupError,
    },

    #[error("Process {0} no longer exists")]
    ProcessNotFound(u32),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Scanner error: {0}")]
    Scanner(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, Error>;
