//! The conversion pipeline: one (input, format) transcode attempt.
//!
//! This is a pure transform. It shells out to FFmpeg with a per-format
//! encode profile, probes the result, and reports size and resolution.
//! Uploading and request bookkeeping happen elsewhere.

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, info};

use optivid_models::{FormatErrorKind, OptimizeLevel, OutputFormat, Resolution};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaError;
use crate::probe::probe_video;

/// One transcode attempt.
#[derive(Debug, Clone)]
pub struct TranscodeRequest {
    /// Source file path
    pub input: PathBuf,
    /// Destination file path
    pub output: PathBuf,
    /// Target container/codec
    pub format: OutputFormat,
    /// Carry audio over, or strip the audio stream entirely
    pub preserve_audio: bool,
    /// Speed/compression trade-off profile
    pub optimize_level: OptimizeLevel,
}

/// Result of a successful transcode.
#[derive(Debug, Clone)]
pub struct TranscodeOutput {
    /// Path of the produced artifact
    pub output_path: PathBuf,
    /// Artifact size in bytes
    pub size_bytes: u64,
    /// Artifact resolution; always equals the source resolution
    pub resolution: Resolution,
}

/// A classified transcode failure.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {detail}")]
pub struct TranscodeError {
    pub kind: FormatErrorKind,
    pub detail: String,
}

impl From<MediaError> for TranscodeError {
    fn from(err: MediaError) -> Self {
        let kind = match &err {
            MediaError::InvalidVideo(_) | MediaError::FileNotFound(_) => {
                FormatErrorKind::InvalidInput
            }
            MediaError::Timeout(_) => FormatErrorKind::Timeout,
            MediaError::FfmpegFailed {
                stderr: Some(stderr),
                ..
            } if stderr.contains("Unknown encoder") || stderr.contains("Encoder not found") => {
                FormatErrorKind::UnsupportedCodec
            }
            _ => FormatErrorKind::TranscodeFailed,
        };
        let detail = match &err {
            MediaError::FfmpegFailed {
                message,
                stderr: Some(stderr),
                ..
            } => format!("{}: {}", message, stderr),
            other => other.to_string(),
        };
        Self { kind, detail }
    }
}

/// The transcoder seam consumed by the job orchestrator.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Perform one transcode attempt.
    async fn convert(&self, request: &TranscodeRequest) -> Result<TranscodeOutput, TranscodeError>;
}

/// Production transcoder backed by the FFmpeg CLI.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    /// Per-attempt time bound in seconds
    timeout_secs: u64,
}

impl FfmpegTranscoder {
    pub fn new(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn convert(&self, request: &TranscodeRequest) -> Result<TranscodeOutput, TranscodeError> {
        if let Some(parent) = request.output.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(MediaError::from)?;
        }

        let cmd = build_command(request);
        debug!(
            format = %request.format,
            level = %request.optimize_level,
            "Starting transcode of {}",
            request.input.display()
        );

        FfmpegRunner::new()
            .with_timeout(self.timeout_secs)
            .run(&cmd)
            .await?;

        // Probe the artifact so the reported size and resolution reflect
        // what was actually produced, not what was asked for.
        let info = probe_video(&request.output).await?;

        info!(
            format = %request.format,
            size_bytes = info.size,
            resolution = %info.resolution,
            "Transcode complete: {}",
            request.output.display()
        );

        Ok(TranscodeOutput {
            output_path: request.output.clone(),
            size_bytes: info.size,
            resolution: info.resolution,
        })
    }
}

/// Build the FFmpeg invocation for a transcode request.
///
/// Profiles follow the usual web-delivery settings: H.264 + AAC for
/// mp4/mov, VP9 + Opus for webm. No scale filter is ever added, so the
/// output keeps the source resolution exactly.
fn build_command(request: &TranscodeRequest) -> FfmpegCommand {
    let mut cmd = FfmpegCommand::new(&request.input, &request.output);

    match request.format {
        OutputFormat::Mp4 | OutputFormat::Mov => {
            let (preset, crf) = match request.optimize_level {
                OptimizeLevel::Fast => ("veryfast", 28),
                OptimizeLevel::Balanced => ("medium", 23),
                OptimizeLevel::Max => ("slow", 18),
            };
            cmd = cmd
                .video_codec("libx264")
                .preset(preset)
                .crf(crf)
                .pixel_format("yuv420p");
            if request.format == OutputFormat::Mp4 {
                // Web streaming needs the moov atom up front
                cmd = cmd.output_args(["-movflags", "+faststart"]);
            }
            if request.preserve_audio {
                cmd = cmd.audio_codec("aac").audio_bitrate("128k");
            } else {
                cmd = cmd.no_audio();
            }
        }
        OutputFormat::Webm => {
            let (deadline, cpu_used, crf) = match request.optimize_level {
                OptimizeLevel::Fast => ("realtime", 8, 35),
                OptimizeLevel::Balanced => ("good", 4, 30),
                OptimizeLevel::Max => ("good", 2, 24),
            };
            cmd = cmd
                .video_codec("libvpx-vp9")
                .crf(crf)
                .output_args(["-b:v", "0"])
                .output_args(["-deadline", deadline])
                .output_arg("-cpu-used")
                .output_arg(cpu_used.to_string())
                .output_args(["-row-mt", "1"]);
            if request.preserve_audio {
                cmd = cmd.audio_codec("libopus").audio_bitrate("128k");
            } else {
                cmd = cmd.no_audio();
            }
        }
    }

    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(
        format: OutputFormat,
        preserve_audio: bool,
        optimize_level: OptimizeLevel,
    ) -> TranscodeRequest {
        TranscodeRequest {
            input: PathBuf::from("/tmp/in.mp4"),
            output: PathBuf::from("/tmp/out.bin"),
            format,
            preserve_audio,
            optimize_level,
        }
    }

    #[test]
    fn test_mp4_balanced_profile() {
        let args = build_command(&request(OutputFormat::Mp4, true, OptimizeLevel::Balanced))
            .build_args();
        assert!(args.contains(&"libx264".to_string()));
        assert!(args.contains(&"medium".to_string()));
        assert!(args.contains(&"23".to_string()));
        assert!(args.contains(&"+faststart".to_string()));
        assert!(args.contains(&"aac".to_string()));
    }

    #[test]
    fn test_mov_skips_faststart() {
        let args =
            build_command(&request(OutputFormat::Mov, true, OptimizeLevel::Max)).build_args();
        assert!(args.contains(&"libx264".to_string()));
        assert!(args.contains(&"slow".to_string()));
        assert!(args.contains(&"18".to_string()));
        assert!(!args.contains(&"-movflags".to_string()));
    }

    #[test]
    fn test_webm_fast_profile() {
        let args =
            build_command(&request(OutputFormat::Webm, true, OptimizeLevel::Fast)).build_args();
        assert!(args.contains(&"libvpx-vp9".to_string()));
        assert!(args.contains(&"realtime".to_string()));
        assert!(args.contains(&"35".to_string()));
        assert!(args.contains(&"libopus".to_string()));
    }

    #[test]
    fn test_strip_audio_uses_an() {
        for format in OutputFormat::ALL {
            let args =
                build_command(&request(format, false, OptimizeLevel::Balanced)).build_args();
            assert!(args.contains(&"-an".to_string()), "{} must strip audio", format);
            assert!(!args.contains(&"-c:a".to_string()));
        }
    }

    #[test]
    fn test_no_rescaling_ever() {
        for format in OutputFormat::ALL {
            for level in [OptimizeLevel::Fast, OptimizeLevel::Balanced, OptimizeLevel::Max] {
                let args = build_command(&request(format, true, level)).build_args();
                assert!(!args.contains(&"-vf".to_string()));
                assert!(!args.iter().any(|a| a.contains("scale")));
            }
        }
    }

    #[test]
    fn test_error_classification() {
        let err: TranscodeError = MediaError::Timeout(600).into();
        assert_eq!(err.kind, FormatErrorKind::Timeout);

        let err: TranscodeError = MediaError::InvalidVideo("no video stream".into()).into();
        assert_eq!(err.kind, FormatErrorKind::InvalidInput);

        let err: TranscodeError = MediaError::ffmpeg_failed(
            "FFmpeg exited with non-zero status",
            Some("Unknown encoder 'libvpx-vp9'".into()),
            Some(1),
        )
        .into();
        assert_eq!(err.kind, FormatErrorKind::UnsupportedCodec);

        let err: TranscodeError =
            MediaError::ffmpeg_failed("FFmpeg exited with non-zero status", None, Some(1)).into();
        assert_eq!(err.kind, FormatErrorKind::TranscodeFailed);
    }
}
