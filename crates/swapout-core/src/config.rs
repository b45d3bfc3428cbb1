use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cgroups::DEFAULT_CGROUP_ROOT;
use crate::sampler::DEFAULT_PROC_ROOT;
use crate::{Error, Result};

/// Default memory ceiling during eviction (MB)
pub const DEFAULT_LIMIT_MB: u64 = 8;
/// Default RSS at which eviction counts as done (kB)
pub const DEFAULT_TARGET_RSS_KB: u64 = 16384;
/// Default seconds between samples
pub const DEFAULT_INTERVAL_SECS: f64 = 1.0;
/// Default number of samples before giving up
pub const DEFAULT_MAX_ITERATIONS: u32 = 60;

/// Partially specified settings from one source (config file or CLI)
///
/// Values are kept signed and unvalidated here; non-positive numbers fall
/// back to the defaults when the layers are resolved into a
/// [`RunConfiguration`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Memory ceiling during eviction (MB)
    pub limit_mb: Option<i64>,

    /// Stop once RSS is at or below this (kB)
    pub target_rss_kb: Option<i64>,

    /// Seconds between samples, fractional
    pub interval_secs: Option<f64>,

    /// Maximum number of samples
    pub max_iterations: Option<i64>,

    /// Only report errors
    pub quiet: Option<bool>,

    /// Cgroup mount point (default: /sys/fs/cgroup)
    pub cgroup_root: Option<PathBuf>,

    /// Procfs mount point (default: /proc)
    pub proc_root: Option<PathBuf>,
}

impl Settings {
    /// Load settings from a TOML file
    ///
    /// # Example
    /// ```no_run
    /// use swapout_core::config::Settings;
    ///
    /// let settings = Settings::load_from_file("/etc/swapout/config.toml").unwrap();
    /// println!("limit: {:?} MB", settings.limit_mb);
    /// ```
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        Self::from_toml(&content)
            .map_err(|e| Error::Config(format!("Invalid config {}: {}", path.display(), e)))
    }

    /// Parse settings from TOML text
    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Layer `over` on top of `self`; fields set in `over` win
    pub fn merged(self, over: Settings) -> Settings {
        Settings {
            limit_mb: over.limit_mb.or(self.limit_mb),
            target_rss_kb: over.target_rss_kb.or(self.target_rss_kb),
            interval_secs: over.interval_secs.or(self.interval_secs),
            max_iterations: over.max_iterations.or(self.max_iterations),
            quiet: over.quiet.or(self.quiet),
            cgroup_root: over.cgroup_root.or(self.cgroup_root),
            proc_root: over.proc_root.or(self.proc_root),
        }
    }
}

/// Validated, immutable input for one controller run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunConfiguration {
    pub pid: u32,
    pub limit_mb: u64,
    pub target_rss_kb: u64,
    pub interval_secs: f64,
    pub max_iterations: u32,
    pub quiet: bool,
    pub cgroup_root: PathBuf,
    pub proc_root: PathBuf,
}

impl RunConfiguration {
    /// Configuration with every tunable at its default
    pub fn new(pid: u32) -> Self {
        Self::resolve(pid, &Settings::default())
    }

    /// Resolve layered settings, replacing omitted or non-positive values
    /// with the defaults
    pub fn resolve(pid: u32, settings: &Settings) -> Self {
        Self {
            pid,
            limit_mb: positive_or(settings.limit_mb, DEFAULT_LIMIT_MB),
            target_rss_kb: positive_or(settings.target_rss_kb, DEFAULT_TARGET_RSS_KB),
            interval_secs: settings
                .interval_secs
                .filter(|secs| secs.is_finite() && *secs > 0.0)
                .filter(|secs| Duration::try_from_secs_f64(*secs).is_ok())
                .unwrap_or(DEFAULT_INTERVAL_SECS),
            max_iterations: settings
                .max_iterations
                .filter(|n| *n > 0)
                .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
                .unwrap_or(DEFAULT_MAX_ITERATIONS),
            quiet: settings.quiet.unwrap_or(false),
            cgroup_root: settings
                .cgroup_root
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CGROUP_ROOT)),
            proc_root: settings
                .proc_root
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PROC_ROOT)),
        }
    }

    /// Sleep between two samples
    pub fn interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.interval_secs)
            .unwrap_or_else(|_| Duration::from_secs_f64(DEFAULT_INTERVAL_SECS))
    }

    /// Check the invariants `resolve` cannot repair
    pub fn validate(&self) -> Result<()> {
        if self.pid == 0 {
            return Err(Error::Config("PID must be > 0".to_string()));
        }

        if self.limit_mb == 0 || self.target_rss_kb == 0 || self.max_iterations == 0 {
            return Err(Error::Config(
                "Limit, target RSS and max iterations must be > 0".to_string(),
            ));
        }

        if !(self.interval_secs.is_finite() && self.interval_secs > 0.0) {
            return Err(Error::Config(format!(
                "Interval must be > 0, got: {}",
                self.interval_secs
            )));
        }

        Ok(())
    }
}

fn positive_or(value: Option<i64>, default: u64) -> u64 {
    match value {
        Some(v) if v > 0 => v as u64,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfiguration::new(42);

        assert_eq!(config.pid, 42);
        assert_eq!(config.limit_mb, 8);
        assert_eq!(config.target_rss_kb, 16384);
        assert_eq!(config.interval_secs, 1.0);
        assert_eq!(config.max_iterations, 60);
        assert!(!config.quiet);
        assert_eq!(config.cgroup_root, PathBuf::from("/sys/fs/cgroup"));
        assert_eq!(config.proc_root, PathBuf::from("/proc"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_non_positive_values_fall_back() {
        let settings = Settings {
            limit_mb: Some(0),
            target_rss_kb: Some(-5),
            interval_secs: Some(-1.5),
            max_iterations: Some(0),
            ..Default::default()
        };

        let config = RunConfiguration::resolve(1, &settings);
        assert_eq!(config.limit_mb, DEFAULT_LIMIT_MB);
        assert_eq!(config.target_rss_kb, DEFAULT_TARGET_RSS_KB);
        assert_eq!(config.interval_secs, DEFAULT_INTERVAL_SECS);
        assert_eq!(config.max_iterations, DEFAULT_MAX_ITERATIONS);
    }

    #[test]
    fn test_unrepresentable_interval_falls_back() {
        for secs in [f64::NAN, f64::INFINITY, 1e30] {
            let settings = Settings {
                interval_secs: Some(secs),
                ..Default::default()
            };
            let config = RunConfiguration::resolve(1, &settings);
            assert_eq!(config.interval(), Duration::from_secs(1));
        }
    }

    #[test]
    fn test_fractional_interval() {
        let settings = Settings {
            interval_secs: Some(0.25),
            ..Default::default()
        };
        let config = RunConfiguration::resolve(1, &settings);
        assert_eq!(config.interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_merge_prefers_overlay() {
        let file = Settings {
            limit_mb: Some(16),
            target_rss_kb: Some(8192),
            quiet: Some(true),
            ..Default::default()
        };
        let cli = Settings {
            limit_mb: Some(4),
            max_iterations: Some(5),
            ..Default::default()
        };

        let config = RunConfiguration::resolve(7, &file.merged(cli));
        assert_eq!(config.limit_mb, 4);
        assert_eq!(config.target_rss_kb, 8192);
        assert_eq!(config.max_iterations, 5);
        assert!(config.quiet);
    }

    #[test]
    fn test_from_toml() {
        let settings = Settings::from_toml(
            r#"
limit_mb = 32
target_rss_kb = 4096
interval_secs = 0.5
max_iterations = 10
cgroup_root = "/tmp/cgroup"
"#,
        )
        .unwrap();

        assert_eq!(settings.limit_mb, Some(32));
        assert_eq!(settings.interval_secs, Some(0.5));
        assert_eq!(settings.cgroup_root, Some(PathBuf::from("/tmp/cgroup")));
        assert_eq!(settings.proc_root, None);
    }

    #[test]
    fn test_from_toml_rejects_unknown_keys() {
        assert!(Settings::from_toml("limit = 8\n").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Settings::load_from_file("/nonexistent/swapout.toml").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_validate_rejects_pid_zero() {
        let config = RunConfiguration::new(0);
        assert!(config.validate().is_err());
    }
}
