//! Orchestrator configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct JobsConfig {
    /// Maximum format conversions running at once, across all requests
    pub max_concurrent_conversions: usize,
    /// Per-attempt transcode time bound
    pub transcode_timeout: Duration,
    /// Per-artifact upload time bound
    pub upload_timeout: Duration,
    /// Directory for saved uploads and transcode outputs
    pub work_dir: PathBuf,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            max_concurrent_conversions: 4,
            transcode_timeout: Duration::from_secs(600),
            upload_timeout: Duration::from_secs(120),
            work_dir: PathBuf::from("/tmp/optivid"),
        }
    }
}

impl JobsConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            max_concurrent_conversions: std::env::var("MAX_CONCURRENT_CONVERSIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(4),
            transcode_timeout: Duration::from_secs(
                std::env::var("TRANSCODE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
            upload_timeout: Duration::from_secs(
                std::env::var("UPLOAD_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
            work_dir: std::env::var("WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/tmp/optivid")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = JobsConfig::default();
        assert_eq!(config.max_concurrent_conversions, 4);
        assert_eq!(config.transcode_timeout, Duration::from_secs(600));
        assert_eq!(config.upload_timeout, Duration::from_secs(120));
    }
}
