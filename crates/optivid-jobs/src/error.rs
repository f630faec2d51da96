//! Orchestration error types.

use optivid_models::{OutputFormat, RequestId};
use thiserror::Error;

pub type JobsResult<T> = Result<T, JobsError>;

#[derive(Debug, Error)]
pub enum JobsError {
    #[error("Request not found: {0}")]
    NotFound(RequestId),

    #[error("Format {format} was not requested by {request_id}")]
    UnrequestedFormat {
        request_id: RequestId,
        format: OutputFormat,
    },

    #[error("A submission must request at least one output format")]
    NoFormats,

    #[error("Orchestrator is shutting down")]
    ShuttingDown,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Media error: {0}")]
    Media(#[from] optivid_media::MediaError),
}
