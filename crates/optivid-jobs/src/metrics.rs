//! Prometheus metrics recorded by the orchestrator.

use metrics::{counter, histogram};

use optivid_models::{OutputFormat, RequestStatus};

/// Metric names as constants for consistency.
pub mod names {
    pub const REQUESTS_SUBMITTED_TOTAL: &str = "optivid_requests_submitted_total";
    pub const REQUESTS_FINISHED_TOTAL: &str = "optivid_requests_finished_total";
    pub const FORMAT_CONVERSIONS_TOTAL: &str = "optivid_format_conversions_total";
    pub const TRANSCODE_DURATION_SECONDS: &str = "optivid_transcode_duration_seconds";
    pub const UPLOAD_DURATION_SECONDS: &str = "optivid_upload_duration_seconds";
}

/// Record a request accepted by `submit`.
pub fn record_request_submitted() {
    counter!(names::REQUESTS_SUBMITTED_TOTAL).increment(1);
}

/// Record a request reaching a terminal status.
pub fn record_request_finished(status: RequestStatus) {
    let labels = [("status", status.as_str())];
    counter!(names::REQUESTS_FINISHED_TOTAL, &labels).increment(1);
}

/// Record one format attempt reaching a terminal outcome.
pub fn record_format_conversion(format: OutputFormat, success: bool) {
    let labels = [
        ("format", format.as_str()),
        ("outcome", if success { "success" } else { "error" }),
    ];
    counter!(names::FORMAT_CONVERSIONS_TOTAL, &labels).increment(1);
}

/// Record transcode duration.
pub fn record_transcode_duration(format: OutputFormat, duration_secs: f64) {
    let labels = [("format", format.as_str())];
    histogram!(names::TRANSCODE_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record upload duration.
pub fn record_upload_duration(format: OutputFormat, duration_secs: f64) {
    let labels = [("format", format.as_str())];
    histogram!(names::UPLOAD_DURATION_SECONDS, &labels).record(duration_secs);
}
