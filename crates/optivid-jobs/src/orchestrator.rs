//! The job orchestrator.
//!
//! Turns one validated upload into a tracked request plus one concurrent
//! task per requested format. Tasks run transcode then upload on a
//! bounded worker pool and report back over a completion channel; a
//! single collector task folds completions into the registry and
//! finalizes each request exactly once all its formats are terminal.

use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use optivid_media::{fs_utils, TranscodeRequest, Transcoder};
use optivid_models::{
    ConversionRequest, FormatErrorKind, FormatResult, NewRequest, OptimizeLevel, OutputFormat,
    RequestId, SourceInfo,
};
use optivid_storage::ArtifactStore;

use crate::config::JobsConfig;
use crate::error::{JobsError, JobsResult};
use crate::metrics;
use crate::registry::RequestRegistry;

/// A validated upload handed over by the intake layer.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    /// Path of the saved upload; the orchestrator takes ownership of the file
    pub input_path: PathBuf,
    pub requested_formats: Vec<OutputFormat>,
    pub preserve_audio: bool,
    pub optimize_level: OptimizeLevel,
    pub source: SourceInfo,
}

/// Message sent from a format task back to the registry-update step.
struct FormatCompletion {
    request_id: RequestId,
    result: FormatResult,
}

/// The conversion job orchestrator.
///
/// Constructed once at process start and passed explicitly to the intake
/// layer; `shutdown` drains in-flight work.
pub struct JobOrchestrator {
    config: JobsConfig,
    registry: Arc<RequestRegistry>,
    transcoder: Arc<dyn Transcoder>,
    store: Arc<dyn ArtifactStore>,
    pool: Arc<Semaphore>,
    completion_tx: Mutex<Option<mpsc::UnboundedSender<FormatCompletion>>>,
    collector: Mutex<Option<JoinHandle<()>>>,
}

impl JobOrchestrator {
    /// Create the orchestrator and spawn its completion collector.
    pub fn spawn(
        config: JobsConfig,
        registry: Arc<RequestRegistry>,
        transcoder: Arc<dyn Transcoder>,
        store: Arc<dyn ArtifactStore>,
    ) -> Arc<Self> {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let collector = spawn_collector(
            Arc::clone(&registry),
            config.work_dir.clone(),
            completion_rx,
        );

        Arc::new(Self {
            pool: Arc::new(Semaphore::new(config.max_concurrent_conversions)),
            config,
            registry,
            transcoder,
            store,
            completion_tx: Mutex::new(Some(completion_tx)),
            collector: Mutex::new(Some(collector)),
        })
    }

    /// Accept a validated upload and schedule its format conversions.
    ///
    /// Returns as soon as the registry entry exists and the tasks are
    /// spawned; transcoding happens on the worker pool.
    pub async fn submit(&self, submission: SubmitRequest) -> JobsResult<RequestId> {
        if submission.requested_formats.is_empty() {
            return Err(JobsError::NoFormats);
        }
        let completion_tx = self
            .lock_tx()
            .clone()
            .ok_or(JobsError::ShuttingDown)?;

        let request = ConversionRequest::new(NewRequest {
            requested_formats: submission.requested_formats.clone(),
            preserve_audio: submission.preserve_audio,
            optimize_level: submission.optimize_level,
            source: submission.source.clone(),
        });
        let id = request.id.clone();
        let formats = request.requested_formats.clone();

        // Move the upload under the request's keyed working directory so
        // every artifact for this request lives in one place.
        let extension = submission
            .input_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin")
            .to_string();
        let input = self.request_dir(&id).join(format!("source.{}", extension));
        fs_utils::move_file(&submission.input_path, &input).await?;

        self.registry.create(request);
        self.registry.mark_processing(&id)?;

        for format in &formats {
            self.spawn_format_task(&id, *format, input.clone(), &submission, completion_tx.clone());
        }

        metrics::record_request_submitted();
        info!(
            request_id = %id,
            formats = ?formats,
            level = %submission.optimize_level,
            preserve_audio = submission.preserve_audio,
            "Conversion request accepted"
        );

        Ok(id)
    }

    /// Stop accepting submissions and wait for in-flight work to drain.
    pub async fn shutdown(&self) {
        drop(self.lock_tx().take());
        let collector = self
            .collector
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = collector {
            if let Err(e) = handle.await {
                error!("Completion collector task failed: {}", e);
            }
        }
        info!("Job orchestrator shut down");
    }

    fn spawn_format_task(
        &self,
        request_id: &RequestId,
        format: OutputFormat,
        input: PathBuf,
        submission: &SubmitRequest,
        completion_tx: mpsc::UnboundedSender<FormatCompletion>,
    ) {
        let format_dir = self.request_dir(request_id).join(format.as_str());
        let task = FormatTask {
            request_id: request_id.clone(),
            format,
            input,
            output: format_dir.join(format!("output.{}", format.extension())),
            format_dir,
            preserve_audio: submission.preserve_audio,
            optimize_level: submission.optimize_level,
            transcoder: Arc::clone(&self.transcoder),
            store: Arc::clone(&self.store),
            pool: Arc::clone(&self.pool),
            upload_timeout: self.config.upload_timeout,
        };

        tokio::spawn(async move {
            let request_id = task.request_id.clone();
            let result = task.run().await;
            if completion_tx
                .send(FormatCompletion { request_id, result })
                .is_err()
            {
                warn!("Completion channel closed before result delivery");
            }
        });
    }

    fn request_dir(&self, id: &RequestId) -> PathBuf {
        self.config.work_dir.join(id.as_str())
    }

    fn lock_tx(
        &self,
    ) -> std::sync::MutexGuard<'_, Option<mpsc::UnboundedSender<FormatCompletion>>> {
        self.completion_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// One (request, format) conversion attempt.
struct FormatTask {
    request_id: RequestId,
    format: OutputFormat,
    input: PathBuf,
    output: PathBuf,
    format_dir: PathBuf,
    preserve_audio: bool,
    optimize_level: OptimizeLevel,
    transcoder: Arc<dyn Transcoder>,
    store: Arc<dyn ArtifactStore>,
    pool: Arc<Semaphore>,
    upload_timeout: Duration,
}

impl FormatTask {
    /// Run the attempt to a terminal [`FormatResult`].
    ///
    /// Every failure mode, including a panic inside the attempt, becomes
    /// data; nothing escapes to abort sibling tasks. Temp artifacts for
    /// this (request, format) pair are released on every path.
    async fn run(self) -> FormatResult {
        // Queue behind the shared pool; waiting tasks are never dropped.
        let _permit = match Arc::clone(&self.pool).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                return FormatResult::error(
                    self.format,
                    FormatErrorKind::Internal,
                    "worker pool closed",
                )
            }
        };

        let result = match AssertUnwindSafe(self.attempt()).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                error!(
                    request_id = %self.request_id,
                    format = %self.format,
                    "Format task panicked: {}",
                    panic_message(&panic)
                );
                FormatResult::error(
                    self.format,
                    FormatErrorKind::Internal,
                    format!("task panicked: {}", panic_message(&panic)),
                )
            }
        };

        if let Err(e) = tokio::fs::remove_dir_all(&self.format_dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    request_id = %self.request_id,
                    format = %self.format,
                    "Failed to remove format work dir {}: {}",
                    self.format_dir.display(),
                    e
                );
            }
        }

        result
    }

    async fn attempt(&self) -> FormatResult {
        let transcode_request = TranscodeRequest {
            input: self.input.clone(),
            output: self.output.clone(),
            format: self.format,
            preserve_audio: self.preserve_audio,
            optimize_level: self.optimize_level,
        };

        let transcode_started = Instant::now();
        let output = match self.transcoder.convert(&transcode_request).await {
            Ok(output) => output,
            Err(err) => {
                warn!(
                    request_id = %self.request_id,
                    format = %self.format,
                    kind = %err.kind,
                    "Transcode failed: {}",
                    err.detail
                );
                return FormatResult::error(self.format, err.kind, err.detail);
            }
        };
        metrics::record_transcode_duration(self.format, transcode_started.elapsed().as_secs_f64());

        let upload_started = Instant::now();
        let uploaded = tokio::time::timeout(
            self.upload_timeout,
            self.store
                .upload(&output.output_path, self.format, &self.request_id),
        )
        .await;

        match uploaded {
            Ok(Ok(artifact)) => {
                metrics::record_upload_duration(
                    self.format,
                    upload_started.elapsed().as_secs_f64(),
                );
                FormatResult::success(
                    self.format,
                    output.size_bytes,
                    output.resolution,
                    artifact.public_url,
                )
            }
            Ok(Err(err)) => {
                warn!(
                    request_id = %self.request_id,
                    format = %self.format,
                    "Upload failed: {}",
                    err
                );
                FormatResult::error(self.format, FormatErrorKind::Upload, err.to_string())
            }
            Err(_) => {
                warn!(
                    request_id = %self.request_id,
                    format = %self.format,
                    "Upload timed out after {}s",
                    self.upload_timeout.as_secs()
                );
                FormatResult::error(
                    self.format,
                    FormatErrorKind::Upload,
                    format!("upload timed out after {}s", self.upload_timeout.as_secs()),
                )
            }
        }
    }
}

/// Spawn the registry-update step: a single task draining the completion
/// channel, so registry writes from the pool are applied one at a time.
fn spawn_collector(
    registry: Arc<RequestRegistry>,
    work_dir: PathBuf,
    mut completion_rx: mpsc::UnboundedReceiver<FormatCompletion>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(FormatCompletion { request_id, result }) = completion_rx.recv().await {
            let format = result.format;
            let success = result.is_success();

            let all_terminal = match registry.record_format_result(&request_id, result) {
                Ok(all_terminal) => all_terminal,
                Err(e) => {
                    error!(
                        request_id = %request_id,
                        format = %format,
                        "Failed to record format result: {}",
                        e
                    );
                    continue;
                }
            };
            metrics::record_format_conversion(format, success);

            if !all_terminal {
                continue;
            }

            match registry.finalize(&request_id) {
                Ok(status) => {
                    metrics::record_request_finished(status);
                    info!(request_id = %request_id, status = %status, "Request finished");

                    let request_dir = work_dir.join(request_id.as_str());
                    if let Err(e) = tokio::fs::remove_dir_all(&request_dir).await {
                        if e.kind() != std::io::ErrorKind::NotFound {
                            warn!(
                                request_id = %request_id,
                                "Failed to remove request work dir {}: {}",
                                request_dir.display(),
                                e
                            );
                        }
                    }
                }
                Err(e) => error!(request_id = %request_id, "Finalize failed: {}", e),
            }
        }
    })
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
