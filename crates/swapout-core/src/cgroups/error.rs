//! Error types for cgroup operations

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Cgroup operation errors
#[derive(Debug, Error)]
pub enum CgroupError {
    #[error("Cgroup file not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not a directory: {0:?}")]
    NotADirectory(PathBuf),

    #[error("Failed to create {path:?}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to move pid {pid} into {path:?}")]
    MigrationFailed {
        pid: u32,
        path: PathBuf,
        #[source]
        source: Box<CgroupError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, CgroupError>;
