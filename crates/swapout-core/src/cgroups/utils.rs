//! Utility functions for cgroup operations

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use super::error::{CgroupError, Result};

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Convert a megabyte ceiling into the byte value cgroup files expect
///
/// Saturates instead of wrapping for absurd inputs.
pub fn mb_to_bytes(mb: u64) -> u64 {
    mb.saturating_mul(BYTES_PER_MB)
}

/// Create a directory unless it already exists
///
/// An existing directory (stale from a previous run) is fine; an existing
/// non-directory at `path` is not. Returns `true` only if this call created it.
pub fn ensure_dir(path: &Path) -> Result<bool> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => return Ok(false),
        Ok(_) => return Err(CgroupError::NotADirectory(path.to_path_buf())),
        Err(_) => {}
    }

    match fs::create_dir(path) {
        Ok(()) => Ok(true),
        // Lost a race with another creator
        Err(e) if e.kind() == ErrorKind::AlreadyExists && path.is_dir() => Ok(false),
        Err(source) => Err(CgroupError::CreateDir {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Safe read file to string
pub fn read_cgroup_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            CgroupError::NotFound(format!("{:?}", path))
        } else if e.kind() == ErrorKind::PermissionDenied {
            CgroupError::PermissionDenied(format!("{:?}", path))
        } else {
            CgroupError::Io(e)
        }
    })
}

/// Read a cgroup file with trailing whitespace stripped
pub fn read_trimmed(path: &Path) -> Result<String> {
    let content = read_cgroup_file(path)?;
    Ok(content.trim_end().to_string())
}

/// Safe write file
///
/// cgroupfs parses one value per write, so `content` is written in a single
/// call with a trailing newline.
pub fn write_cgroup_file(path: &Path, content: &str) -> Result<()> {
    let line = if content.ends_with('\n') {
        content.to_string()
    } else {
        format!("{}\n", content)
    };

    fs::write(path, line).map_err(|e| {
        if e.kind() == ErrorKind::PermissionDenied {
            CgroupError::PermissionDenied(format!("{:?}", path))
        } else {
            CgroupError::Io(e)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_mb_to_bytes() {
        assert_eq!(mb_to_bytes(8), 8_388_608);
        assert_eq!(mb_to_bytes(1), 1_048_576);
        assert_eq!(mb_to_bytes(0), 0);
        assert_eq!(mb_to_bytes(u64::MAX), u64::MAX);
    }

    #[test]
    fn test_ensure_dir_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("swapout");

        assert!(ensure_dir(&dir).unwrap());
        assert!(dir.is_dir());

        // Second call on the stale directory is not an error
        assert!(!ensure_dir(&dir).unwrap());
        assert!(dir.is_dir());
    }

    #[test]
    fn test_ensure_dir_rejects_regular_file() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("swapout");
        fs::write(&file, "not a dir").unwrap();

        let err = ensure_dir(&file).unwrap_err();
        assert!(matches!(err, CgroupError::NotADirectory(_)));
    }

    #[test]
    fn test_ensure_dir_missing_parent() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("missing").join("child");

        let err = ensure_dir(&dir).unwrap_err();
        assert!(matches!(err, CgroupError::CreateDir { .. }));
    }

    #[test]
    fn test_write_appends_newline_once() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("memory.high");

        write_cgroup_file(&file, "8388608").unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "8388608\n");

        write_cgroup_file(&file, "max\n").unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "max\n");
    }

    #[test]
    fn test_read_trimmed() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("memory.limit_in_bytes");
        fs::write(&file, "9223372036854771712 \n").unwrap();

        assert_eq!(read_trimmed(&file).unwrap(), "9223372036854771712");
    }

    #[test]
    fn test_read_missing_file_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = read_cgroup_file(&tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, CgroupError::NotFound(_)));
    }
}
