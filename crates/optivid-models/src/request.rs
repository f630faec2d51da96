//! Conversion request state tracked by the registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::format::OutputFormat;
use crate::options::OptimizeLevel;
use crate::outcome::{FormatResult, Resolution};

/// Unique identifier for a conversion request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub String);

impl RequestId {
    /// Generate a new random request ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a conversion request.
///
/// Transitions only move forward: `Queued -> Processing -> {Completed | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Entry exists, no format task has started
    #[default]
    Queued,
    /// At least one format task dispatched, not all terminal
    Processing,
    /// All formats terminal, at least one succeeded
    Completed,
    /// All formats terminal, none succeeded
    Failed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Queued => "queued",
            RequestStatus::Processing => "processing",
            RequestStatus::Completed => "completed",
            RequestStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Failed)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Metadata about the uploaded source file, captured at intake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Original filename as uploaded
    pub filename: String,
    /// Source size in bytes
    pub size_bytes: u64,
    /// Source resolution; conversions never rescale it
    pub resolution: Resolution,
}

/// Parameters for creating a registry entry.
#[derive(Debug, Clone)]
pub struct NewRequest {
    pub requested_formats: Vec<OutputFormat>,
    pub preserve_audio: bool,
    pub optimize_level: OptimizeLevel,
    pub source: SourceInfo,
}

/// A conversion request tracked end-to-end by the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionRequest {
    /// Unique request ID, immutable for the request's lifetime
    pub id: RequestId,

    /// Requested output formats (deduplicated, non-empty)
    pub requested_formats: Vec<OutputFormat>,

    /// Whether audio is carried over into the outputs
    pub preserve_audio: bool,

    /// Speed/compression trade-off profile
    pub optimize_level: OptimizeLevel,

    /// Source file metadata
    pub source: SourceInfo,

    /// Current lifecycle status
    pub status: RequestStatus,

    /// One terminal result per requested format, populated as tasks finish
    pub format_results: HashMap<OutputFormat, FormatResult>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// When a terminal status was reached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal_at: Option<DateTime<Utc>>,

    /// Human-readable explanation, set only when `status` is `Failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_summary: Option<String>,
}

impl ConversionRequest {
    /// Create a new request in the `Queued` state.
    pub fn new(params: NewRequest) -> Self {
        Self {
            id: RequestId::new(),
            requested_formats: params.requested_formats,
            preserve_audio: params.preserve_audio,
            optimize_level: params.optimize_level,
            source: params.source,
            status: RequestStatus::Queued,
            format_results: HashMap::new(),
            created_at: Utc::now(),
            terminal_at: None,
            error_summary: None,
        }
    }

    /// Check whether every requested format has a terminal result.
    pub fn all_formats_terminal(&self) -> bool {
        self.requested_formats
            .iter()
            .all(|fmt| self.format_results.contains_key(fmt))
    }

    /// Count of formats that produced a stored artifact.
    pub fn success_count(&self) -> usize {
        self.format_results.values().filter(|r| r.is_success()).count()
    }

    /// Advance to `Processing`. A no-op once past `Queued`; status never regresses.
    pub fn mark_processing(&mut self) {
        if self.status == RequestStatus::Queued {
            self.status = RequestStatus::Processing;
        }
    }

    /// Advance to a terminal status.
    ///
    /// Terminal status is `Failed` iff every format errored; one success is
    /// enough for `Completed`. A no-op if already terminal.
    pub fn finalize(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        debug_assert!(self.all_formats_terminal());

        if self.success_count() > 0 {
            self.status = RequestStatus::Completed;
        } else {
            self.status = RequestStatus::Failed;
            self.error_summary = Some(self.summarize_errors());
        }
        self.terminal_at = Some(Utc::now());
    }

    /// Concatenate per-format error details into one summary line.
    fn summarize_errors(&self) -> String {
        let mut parts: Vec<String> = self
            .requested_formats
            .iter()
            .filter_map(|fmt| self.format_results.get(fmt))
            .filter_map(|result| match &result.outcome {
                crate::outcome::FormatOutcome::Error {
                    error_kind,
                    error_detail,
                } => Some(format!("{}: {} ({})", result.format, error_detail, error_kind)),
                _ => None,
            })
            .collect();
        if parts.is_empty() {
            parts.push("conversion failed".to_string());
        }
        parts.join("; ")
    }
}
