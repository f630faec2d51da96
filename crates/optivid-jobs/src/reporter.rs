//! Read-only status projection over the request registry.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use optivid_models::{
    ConversionRequest, FormatOutcome, OutputFormat, RequestId, RequestStatus, Resolution,
};

use crate::registry::RequestRegistry;

/// A successfully produced format, as reported to polling clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletedFormat {
    pub size_bytes: u64,
    pub resolution: Resolution,
    pub url: String,
}

/// Aggregate metadata for a completed request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateMetadata {
    /// Size of the uploaded source in bytes
    pub original_size_bytes: u64,
    /// Sum of output sizes across succeeded formats
    pub total_output_bytes: u64,
    /// `total_output_bytes / original_size_bytes`, over succeeded formats only
    pub compression_ratio: f64,
}

/// Snapshot answer for one status poll.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StatusReport {
    /// The id was never issued
    NotFound,
    /// Work is queued or in flight
    Processing,
    /// Terminal: at least one format succeeded
    Completed {
        formats: BTreeMap<OutputFormat, CompletedFormat>,
        metadata: AggregateMetadata,
    },
    /// Terminal: every format failed
    Failed { summary: String },
}

/// Read-only query surface over the registry for polling clients.
#[derive(Clone)]
pub struct StatusReporter {
    registry: Arc<RequestRegistry>,
}

impl StatusReporter {
    pub fn new(registry: Arc<RequestRegistry>) -> Self {
        Self { registry }
    }

    /// Project a request's current state for a polling client.
    pub fn status(&self, id: &RequestId) -> StatusReport {
        let Some(request) = self.registry.get(id) else {
            return StatusReport::NotFound;
        };

        match request.status {
            RequestStatus::Queued | RequestStatus::Processing => StatusReport::Processing,
            RequestStatus::Completed => project_completed(&request),
            RequestStatus::Failed => StatusReport::Failed {
                summary: request
                    .error_summary
                    .clone()
                    .unwrap_or_else(|| "Conversion failed".to_string()),
            },
        }
    }
}

fn project_completed(request: &ConversionRequest) -> StatusReport {
    let mut formats = BTreeMap::new();
    let mut total_output_bytes = 0u64;

    for result in request.format_results.values() {
        if let FormatOutcome::Success {
            size_bytes,
            resolution,
            public_url,
        } = &result.outcome
        {
            total_output_bytes += size_bytes;
            formats.insert(
                result.format,
                CompletedFormat {
                    size_bytes: *size_bytes,
                    resolution: *resolution,
                    url: public_url.clone(),
                },
            );
        }
    }

    let original_size_bytes = request.source.size_bytes;
    let compression_ratio = if original_size_bytes > 0 {
        total_output_bytes as f64 / original_size_bytes as f64
    } else {
        0.0
    };

    StatusReport::Completed {
        formats,
        metadata: AggregateMetadata {
            original_size_bytes,
            total_output_bytes,
            compression_ratio,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optivid_models::{
        FormatErrorKind, FormatResult, NewRequest, OptimizeLevel, SourceInfo,
    };

    fn reporter_with_request(
        formats: Vec<OutputFormat>,
        results: Vec<FormatResult>,
        finalize: bool,
    ) -> (StatusReporter, RequestId) {
        let registry = Arc::new(RequestRegistry::new());
        let id = registry.create(ConversionRequest::new(NewRequest {
            requested_formats: formats,
            preserve_audio: true,
            optimize_level: OptimizeLevel::Balanced,
            source: SourceInfo {
                filename: "clip.mp4".to_string(),
                size_bytes: 1_000_000,
                resolution: Resolution::new(1920, 1080),
            },
        }));
        registry.mark_processing(&id).unwrap();
        for result in results {
            registry.record_format_result(&id, result).unwrap();
        }
        if finalize {
            registry.finalize(&id).unwrap();
        }
        (StatusReporter::new(registry), id)
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let registry = Arc::new(RequestRegistry::new());
        let reporter = StatusReporter::new(registry);
        assert_eq!(reporter.status(&RequestId::new()), StatusReport::NotFound);
    }

    #[test]
    fn test_in_flight_is_processing() {
        let (reporter, id) = reporter_with_request(
            vec![OutputFormat::Mp4, OutputFormat::Webm],
            vec![FormatResult::success(
                OutputFormat::Mp4,
                400_000,
                Resolution::new(1920, 1080),
                "https://cdn/mp4/a.mp4",
            )],
            false,
        );
        assert_eq!(reporter.status(&id), StatusReport::Processing);
    }

    #[test]
    fn test_completed_aggregates_successes_only() {
        let (reporter, id) = reporter_with_request(
            vec![OutputFormat::Mp4, OutputFormat::Webm],
            vec![
                FormatResult::success(
                    OutputFormat::Mp4,
                    400_000,
                    Resolution::new(1920, 1080),
                    "https://cdn/mp4/a.mp4",
                ),
                FormatResult::error(OutputFormat::Webm, FormatErrorKind::Timeout, "slow"),
            ],
            true,
        );

        match reporter.status(&id) {
            StatusReport::Completed { formats, metadata } => {
                assert_eq!(formats.len(), 1);
                assert_eq!(formats[&OutputFormat::Mp4].size_bytes, 400_000);
                assert_eq!(metadata.original_size_bytes, 1_000_000);
                assert_eq!(metadata.total_output_bytes, 400_000);
                assert!((metadata.compression_ratio - 0.4).abs() < 1e-9);
            }
            other => panic!("expected completed, got {:?}", other),
        }
    }

    #[test]
    fn test_failed_carries_summary() {
        let (reporter, id) = reporter_with_request(
            vec![OutputFormat::Mov],
            vec![FormatResult::error(
                OutputFormat::Mov,
                FormatErrorKind::InvalidInput,
                "no video stream",
            )],
            true,
        );

        match reporter.status(&id) {
            StatusReport::Failed { summary } => assert!(summary.contains("no video stream")),
            other => panic!("expected failed, got {:?}", other),
        }
    }

    #[test]
    fn test_compression_ratio_sums_all_successes() {
        let (reporter, id) = reporter_with_request(
            vec![OutputFormat::Mp4, OutputFormat::Webm],
            vec![
                FormatResult::success(
                    OutputFormat::Mp4,
                    300_000,
                    Resolution::new(1920, 1080),
                    "https://cdn/mp4/a.mp4",
                ),
                FormatResult::success(
                    OutputFormat::Webm,
                    200_000,
                    Resolution::new(1920, 1080),
                    "https://cdn/webm/a.webm",
                ),
            ],
            true,
        );

        match reporter.status(&id) {
            StatusReport::Completed { metadata, .. } => {
                assert_eq!(metadata.total_output_bytes, 500_000);
                assert!((metadata.compression_ratio - 0.5).abs() < 1e-9);
            }
            other => panic!("expected completed, got {:?}", other),
        }
    }
}
