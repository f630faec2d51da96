//! Application state.

use std::path::PathBuf;
use std::sync::Arc;

use optivid_jobs::{JobOrchestrator, JobsConfig, RequestRegistry, StatusReporter};
use optivid_media::FfmpegTranscoder;
use optivid_storage::{ArtifactStore, R2ArtifactStore, R2Config};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub orchestrator: Arc<JobOrchestrator>,
    pub reporter: StatusReporter,
    pub store: Arc<R2ArtifactStore>,
    /// Spool directory for uploads awaiting submission
    pub upload_dir: PathBuf,
}

impl AppState {
    /// Create new application state.
    ///
    /// Builds the registry, the R2 artifact store, the FFmpeg transcoder,
    /// and the orchestrator, and stages the working directories.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let jobs_config = JobsConfig::from_env();
        let r2_config = R2Config::from_env()?;

        let upload_dir = jobs_config.work_dir.join("uploads");
        tokio::fs::create_dir_all(&upload_dir).await?;

        let registry = Arc::new(RequestRegistry::new());
        let reporter = StatusReporter::new(Arc::clone(&registry));

        let store = Arc::new(R2ArtifactStore::new(&r2_config));
        let transcoder = Arc::new(FfmpegTranscoder::new(
            jobs_config.transcode_timeout.as_secs(),
        ));

        let orchestrator = JobOrchestrator::spawn(
            jobs_config,
            registry,
            transcoder,
            Arc::clone(&store) as Arc<dyn ArtifactStore>,
        );

        Ok(Self {
            config,
            orchestrator,
            reporter,
            store,
            upload_dir,
        })
    }
}
