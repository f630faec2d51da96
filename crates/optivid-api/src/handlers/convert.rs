//! Conversion intake and status handlers.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};
use uuid::Uuid;

use optivid_jobs::{AggregateMetadata, CompletedFormat, StatusReport, SubmitRequest};
use optivid_media::{probe_video, MediaError};
use optivid_models::{OutputFormat, RequestId, SourceInfo};

use crate::error::{ApiError, ApiResult, ErrorBody};
use crate::state::AppState;
use crate::validate;

/// Response for an accepted conversion request.
#[derive(Serialize)]
pub struct ConvertAccepted {
    pub status: &'static str,
    pub request_id: RequestId,
    pub message: String,
}

/// Response while a conversion is still in flight.
#[derive(Serialize)]
pub struct ProcessingBody {
    pub status: &'static str,
    pub message: &'static str,
}

/// Response for a completed conversion.
#[derive(Serialize)]
pub struct CompletedBody {
    pub status: &'static str,
    pub formats: BTreeMap<OutputFormat, CompletedFormat>,
    pub metadata: AggregateMetadata,
}

/// Fields collected from the multipart upload form.
struct UploadForm {
    file_bytes: Vec<u8>,
    filename: String,
    content_type: Option<String>,
    formats: Option<String>,
    preserve_audio: Option<String>,
    optimize_level: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> ApiResult<UploadForm> {
    let mut form = UploadForm {
        file_bytes: Vec::new(),
        filename: String::new(),
        content_type: None,
        formats: None,
        preserve_audio: None,
        optimize_level: None,
    };
    let mut saw_file = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                saw_file = true;
                form.filename = field.file_name().unwrap_or_default().to_string();
                form.content_type = field.content_type().map(|s| s.to_string());
                form.file_bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {}", e)))?
                    .to_vec();
            }
            "formats" => {
                form.formats = Some(read_text(field).await?);
            }
            "preserve_audio" => {
                form.preserve_audio = Some(read_text(field).await?);
            }
            "optimize_level" => {
                form.optimize_level = Some(read_text(field).await?);
            }
            _ => {
                warn!("Ignoring unknown form field '{}'", name);
            }
        }
    }

    if !saw_file {
        return Err(ApiError::validation("Missing 'file' field in upload"));
    }
    Ok(form)
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> ApiResult<String> {
    field
        .text()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed form field: {}", e)))
}

/// `POST /api/convert` — accept an upload and start an asynchronous conversion.
pub async fn start_conversion(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<ConvertAccepted>)> {
    let form = read_form(multipart).await?;

    // Boundary validation: nothing past this point runs for a bad upload,
    // and no request id exists yet.
    let extension = validate::validate_extension(&form.filename)?;
    validate::validate_content_type(form.content_type.as_deref())?;
    validate::validate_size(form.file_bytes.len(), state.config.max_upload_size_mb)?;
    let formats = validate::parse_formats(form.formats.as_deref())?;
    let preserve_audio = validate::parse_preserve_audio(form.preserve_audio.as_deref())?;
    let optimize_level = validate::parse_optimize_level(form.optimize_level.as_deref())?;

    // Spool the upload, then probe it; a file without a video stream is
    // rejected here and the spooled copy removed.
    let spool_path = state
        .upload_dir
        .join(format!("{}.{}", Uuid::new_v4(), extension));
    tokio::fs::write(&spool_path, &form.file_bytes).await?;

    let probed = match probe_video(&spool_path).await {
        Ok(info) => info,
        Err(e) => {
            let _ = tokio::fs::remove_file(&spool_path).await;
            return Err(match e {
                MediaError::InvalidVideo(_) | MediaError::FfprobeFailed { .. } => {
                    ApiError::validation(e.to_string())
                }
                other => ApiError::from(other),
            });
        }
    };

    let request_id = state
        .orchestrator
        .submit(SubmitRequest {
            input_path: spool_path,
            requested_formats: formats,
            preserve_audio,
            optimize_level,
            source: SourceInfo {
                filename: form.filename.clone(),
                size_bytes: form.file_bytes.len() as u64,
                resolution: probed.resolution,
            },
        })
        .await?;

    info!(
        request_id = %request_id,
        filename = %form.filename,
        "Conversion request accepted"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(ConvertAccepted {
            status: "processing",
            request_id: request_id.clone(),
            message: format!("Conversion started. Monitor at /api/convert/{}", request_id),
        }),
    ))
}

/// `GET /api/convert/{request_id}` — poll conversion status.
pub async fn get_conversion_status(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Response {
    let id = RequestId::from_string(request_id);

    match state.reporter.status(&id) {
        StatusReport::NotFound => (
            StatusCode::NOT_FOUND,
            Json(ErrorBody::new("Request ID not found.")),
        )
            .into_response(),
        StatusReport::Processing => Json(ProcessingBody {
            status: "processing",
            message: "Video is being processed.",
        })
        .into_response(),
        StatusReport::Completed { formats, metadata } => Json(CompletedBody {
            status: "completed",
            formats,
            metadata,
        })
        .into_response(),
        StatusReport::Failed { summary } => {
            (StatusCode::OK, Json(ErrorBody::new(summary))).into_response()
        }
    }
}
