//! Boundary validation for upload intake.
//!
//! Everything here runs before a request id is ever allocated; a rejected
//! upload leaves no trace in the registry.

use optivid_models::{OptimizeLevel, OutputFormat};

use crate::error::{ApiError, ApiResult};

/// Upload extensions accepted as conversion sources.
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["mp4", "mov", "avi", "mkv", "webm"];

/// Check the uploaded filename's extension.
pub fn validate_extension(filename: &str) -> ApiResult<String> {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ApiError::validation(format!(
            "Unsupported file type: '{}'. Supported extensions: {}",
            filename,
            ALLOWED_EXTENSIONS.join(", ")
        )));
    }
    Ok(extension)
}

/// Check the declared content type, when the client sent one.
pub fn validate_content_type(content_type: Option<&str>) -> ApiResult<()> {
    if let Some(content_type) = content_type {
        if !content_type.starts_with("video/") {
            return Err(ApiError::validation(format!(
                "Unsupported file type: {}",
                content_type
            )));
        }
    }
    Ok(())
}

/// Enforce the configured upload ceiling.
pub fn validate_size(size_bytes: usize, max_upload_size_mb: u64) -> ApiResult<()> {
    let limit = (max_upload_size_mb as usize) * 1024 * 1024;
    if size_bytes > limit {
        return Err(ApiError::validation(format!(
            "File size exceeds the maximum allowed size of {} MB",
            max_upload_size_mb
        )));
    }
    Ok(())
}

/// Parse the `formats` form field; absent means the mp4 default.
pub fn parse_formats(raw: Option<&str>) -> ApiResult<Vec<OutputFormat>> {
    let raw = raw.filter(|s| !s.trim().is_empty()).unwrap_or("mp4");
    OutputFormat::parse_list(raw).map_err(|e| ApiError::validation(e.to_string()))
}

/// Parse the `optimize_level` form field; absent means balanced.
pub fn parse_optimize_level(raw: Option<&str>) -> ApiResult<OptimizeLevel> {
    match raw.filter(|s| !s.trim().is_empty()) {
        Some(raw) => raw
            .parse::<OptimizeLevel>()
            .map_err(|e| ApiError::validation(e.to_string())),
        None => Ok(OptimizeLevel::default()),
    }
}

/// Parse the `preserve_audio` form field; absent means true.
pub fn parse_preserve_audio(raw: Option<&str>) -> ApiResult<bool> {
    match raw.map(|s| s.trim().to_ascii_lowercase()) {
        None => Ok(true),
        Some(s) if s.is_empty() => Ok(true),
        Some(s) if matches!(s.as_str(), "true" | "1" | "yes") => Ok(true),
        Some(s) if matches!(s.as_str(), "false" | "0" | "no") => Ok(false),
        Some(s) => Err(ApiError::validation(format!(
            "Invalid preserve_audio value: '{}'",
            s
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_accepts_known_videos() {
        assert_eq!(validate_extension("movie.mp4").unwrap(), "mp4");
        assert_eq!(validate_extension("MOVIE.MKV").unwrap(), "mkv");
    }

    #[test]
    fn test_extension_rejects_txt() {
        assert!(validate_extension("notes.txt").is_err());
        assert!(validate_extension("no_extension").is_err());
    }

    #[test]
    fn test_content_type() {
        assert!(validate_content_type(Some("video/mp4")).is_ok());
        assert!(validate_content_type(None).is_ok());
        assert!(validate_content_type(Some("text/plain")).is_err());
    }

    #[test]
    fn test_size_ceiling() {
        assert!(validate_size(10 * 1024 * 1024, 500).is_ok());
        assert!(validate_size(501 * 1024 * 1024, 500).is_err());
    }

    #[test]
    fn test_formats_default_to_mp4() {
        assert_eq!(parse_formats(None).unwrap(), vec![OutputFormat::Mp4]);
        assert_eq!(parse_formats(Some("  ")).unwrap(), vec![OutputFormat::Mp4]);
    }

    #[test]
    fn test_formats_reject_unknown() {
        let err = parse_formats(Some("mp4,gif")).unwrap_err();
        assert!(err.to_string().contains("gif"));
    }

    #[test]
    fn test_optimize_level_parsing() {
        assert_eq!(parse_optimize_level(None).unwrap(), OptimizeLevel::Balanced);
        assert_eq!(
            parse_optimize_level(Some("max")).unwrap(),
            OptimizeLevel::Max
        );
        assert!(parse_optimize_level(Some("turbo")).is_err());
    }

    #[test]
    fn test_preserve_audio_parsing() {
        assert!(parse_preserve_audio(None).unwrap());
        assert!(parse_preserve_audio(Some("TRUE")).unwrap());
        assert!(!parse_preserve_audio(Some("0")).unwrap());
        assert!(parse_preserve_audio(Some("maybe")).is_err());
    }
}
