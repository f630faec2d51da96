//! The request registry: a concurrent map of request id to request state.
//!
//! All writes funnel through this type and are serialized by the lock;
//! readers get snapshot clones. No operation blocks on external I/O.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::warn;

use optivid_models::{ConversionRequest, FormatResult, RequestId, RequestStatus};

use crate::error::{JobsError, JobsResult};

/// Concurrent store of conversion request state.
#[derive(Default)]
pub struct RequestRegistry {
    inner: RwLock<HashMap<RequestId, ConversionRequest>>,
}

impl RequestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly created request. Returns its id.
    pub fn create(&self, request: ConversionRequest) -> RequestId {
        let id = request.id.clone();
        let mut map = self.write();
        debug_assert!(!map.contains_key(&id));
        map.insert(id.clone(), request);
        id
    }

    /// Snapshot of a request's current state. `None` means the id was
    /// never issued; callers surface that as a not-found result.
    pub fn get(&self, id: &RequestId) -> Option<ConversionRequest> {
        self.read().get(id).cloned()
    }

    /// Transition a request from `Queued` to `Processing`.
    pub fn mark_processing(&self, id: &RequestId) -> JobsResult<()> {
        let mut map = self.write();
        let request = map.get_mut(id).ok_or_else(|| JobsError::NotFound(id.clone()))?;
        request.mark_processing();
        Ok(())
    }

    /// Record the terminal outcome of one format attempt.
    ///
    /// Rejects results for formats the request never asked for. A second
    /// result for the same format is ignored (first write wins). Returns
    /// whether every requested format now has a terminal result.
    pub fn record_format_result(
        &self,
        id: &RequestId,
        result: FormatResult,
    ) -> JobsResult<bool> {
        let mut map = self.write();
        let request = map.get_mut(id).ok_or_else(|| JobsError::NotFound(id.clone()))?;

        if !request.requested_formats.contains(&result.format) {
            return Err(JobsError::UnrequestedFormat {
                request_id: id.clone(),
                format: result.format,
            });
        }

        if request.format_results.contains_key(&result.format) {
            warn!(
                request_id = %id,
                format = %result.format,
                "Duplicate format result ignored"
            );
        } else {
            request.format_results.insert(result.format, result);
        }

        Ok(request.all_formats_terminal())
    }

    /// Compute and write the terminal status once all formats are terminal.
    ///
    /// Idempotent and at-least-once-safe: calling it again after a terminal
    /// status was written, or before all formats are terminal, changes
    /// nothing. Returns the request's status after the call.
    pub fn finalize(&self, id: &RequestId) -> JobsResult<RequestStatus> {
        let mut map = self.write();
        let request = map.get_mut(id).ok_or_else(|| JobsError::NotFound(id.clone()))?;
        if request.all_formats_terminal() {
            request.finalize();
        }
        Ok(request.status)
    }

    /// Number of tracked requests.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<RequestId, ConversionRequest>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<RequestId, ConversionRequest>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optivid_models::{
        FormatErrorKind, NewRequest, OptimizeLevel, OutputFormat, Resolution, SourceInfo,
    };

    fn create_request(registry: &RequestRegistry, formats: Vec<OutputFormat>) -> RequestId {
        registry.create(ConversionRequest::new(NewRequest {
            requested_formats: formats,
            preserve_audio: true,
            optimize_level: OptimizeLevel::Balanced,
            source: SourceInfo {
                filename: "clip.mp4".to_string(),
                size_bytes: 10_000_000,
                resolution: Resolution::new(1280, 720),
            },
        }))
    }

    fn success(format: OutputFormat) -> FormatResult {
        FormatResult::success(
            format,
            1_000_000,
            Resolution::new(1280, 720),
            format!("https://cdn/{}/x.{}", format, format.extension()),
        )
    }

    #[test]
    fn test_create_and_get() {
        let registry = RequestRegistry::new();
        let id = create_request(&registry, vec![OutputFormat::Mp4]);

        let snapshot = registry.get(&id).unwrap();
        assert_eq!(snapshot.status, RequestStatus::Queued);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_get_unknown_id_is_none() {
        let registry = RequestRegistry::new();
        assert!(registry.get(&RequestId::new()).is_none());
    }

    #[test]
    fn test_record_reports_all_terminal() {
        let registry = RequestRegistry::new();
        let id = create_request(&registry, vec![OutputFormat::Mp4, OutputFormat::Webm]);
        registry.mark_processing(&id).unwrap();

        let all = registry
            .record_format_result(&id, success(OutputFormat::Mp4))
            .unwrap();
        assert!(!all);

        let all = registry
            .record_format_result(&id, success(OutputFormat::Webm))
            .unwrap();
        assert!(all);
    }

    #[test]
    fn test_record_rejects_unrequested_format() {
        let registry = RequestRegistry::new();
        let id = create_request(&registry, vec![OutputFormat::Mp4]);

        let err = registry
            .record_format_result(&id, success(OutputFormat::Mov))
            .unwrap_err();
        assert!(matches!(err, JobsError::UnrequestedFormat { .. }));
        assert!(registry.get(&id).unwrap().format_results.is_empty());
    }

    #[test]
    fn test_duplicate_result_first_write_wins() {
        let registry = RequestRegistry::new();
        let id = create_request(&registry, vec![OutputFormat::Mp4]);

        registry
            .record_format_result(&id, success(OutputFormat::Mp4))
            .unwrap();
        registry
            .record_format_result(
                &id,
                FormatResult::error(OutputFormat::Mp4, FormatErrorKind::Internal, "late"),
            )
            .unwrap();

        let snapshot = registry.get(&id).unwrap();
        assert!(snapshot.format_results[&OutputFormat::Mp4].is_success());
        assert_eq!(snapshot.format_results.len(), 1);
    }

    #[test]
    fn test_finalize_before_all_terminal_is_noop() {
        let registry = RequestRegistry::new();
        let id = create_request(&registry, vec![OutputFormat::Mp4, OutputFormat::Webm]);
        registry.mark_processing(&id).unwrap();
        registry
            .record_format_result(&id, success(OutputFormat::Mp4))
            .unwrap();

        let status = registry.finalize(&id).unwrap();
        assert_eq!(status, RequestStatus::Processing);
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let registry = RequestRegistry::new();
        let id = create_request(&registry, vec![OutputFormat::Mp4]);
        registry.mark_processing(&id).unwrap();
        registry
            .record_format_result(&id, success(OutputFormat::Mp4))
            .unwrap();

        assert_eq!(registry.finalize(&id).unwrap(), RequestStatus::Completed);
        let first_terminal_at = registry.get(&id).unwrap().terminal_at;
        assert_eq!(registry.finalize(&id).unwrap(), RequestStatus::Completed);
        assert_eq!(registry.get(&id).unwrap().terminal_at, first_terminal_at);
    }

    #[test]
    fn test_operations_on_unknown_id_error() {
        let registry = RequestRegistry::new();
        let id = RequestId::new();
        assert!(matches!(
            registry.mark_processing(&id),
            Err(JobsError::NotFound(_))
        ));
        assert!(matches!(
            registry.finalize(&id),
            Err(JobsError::NotFound(_))
        ));
    }
}
