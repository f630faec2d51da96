//! Per-format conversion outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::format::OutputFormat;

/// Video frame dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Classification of a format-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatErrorKind {
    /// The source file could not be decoded
    InvalidInput,
    /// The target codec is not available in the transcoder build
    UnsupportedCodec,
    /// The transcoding process exited with a failure
    TranscodeFailed,
    /// The attempt exceeded its time bound
    Timeout,
    /// The artifact could not be pushed to object storage
    Upload,
    /// An unexpected defect inside the worker task
    Internal,
}

impl FormatErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatErrorKind::InvalidInput => "invalid_input",
            FormatErrorKind::UnsupportedCodec => "unsupported_codec",
            FormatErrorKind::TranscodeFailed => "transcode_failed",
            FormatErrorKind::Timeout => "timeout",
            FormatErrorKind::Upload => "upload",
            FormatErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for FormatErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Terminal outcome of one format attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FormatOutcome {
    /// The format was transcoded and its artifact stored
    Success {
        /// Output size in bytes
        size_bytes: u64,
        /// Output resolution (always matches the source)
        resolution: Resolution,
        /// Public URL of the stored artifact
        public_url: String,
    },
    /// The attempt failed; the failure is data, not an exception
    Error {
        error_kind: FormatErrorKind,
        error_detail: String,
    },
}

impl FormatOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FormatOutcome::Success { .. })
    }
}

/// Terminal result of one (request, format) attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatResult {
    /// Which output format this describes
    pub format: OutputFormat,
    #[serde(flatten)]
    pub outcome: FormatOutcome,
}

impl FormatResult {
    /// Build a success result.
    pub fn success(
        format: OutputFormat,
        size_bytes: u64,
        resolution: Resolution,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            format,
            outcome: FormatOutcome::Success {
                size_bytes,
                resolution,
                public_url: public_url.into(),
            },
        }
    }

    /// Build an error result.
    pub fn error(
        format: OutputFormat,
        error_kind: FormatErrorKind,
        error_detail: impl Into<String>,
    ) -> Self {
        Self {
            format,
            outcome: FormatOutcome::Error {
                error_kind,
                error_detail: error_detail.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_display() {
        assert_eq!(Resolution::new(1920, 1080).to_string(), "1920x1080");
    }

    #[test]
    fn test_result_constructors() {
        let ok = FormatResult::success(
            OutputFormat::Mp4,
            1024,
            Resolution::new(640, 480),
            "https://cdn.example.com/mp4/abc.mp4",
        );
        assert!(ok.is_success());

        let err = FormatResult::error(
            OutputFormat::Webm,
            FormatErrorKind::Timeout,
            "exceeded 600s",
        );
        assert!(!err.is_success());
    }

    #[test]
    fn test_serialized_shape() {
        let err = FormatResult::error(OutputFormat::Mov, FormatErrorKind::Upload, "network");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["format"], "mov");
        assert_eq!(json["outcome"], "error");
        assert_eq!(json["error_kind"], "upload");
    }
}
