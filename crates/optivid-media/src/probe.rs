//! FFprobe video information.

use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use optivid_models::Resolution;

use crate::error::{MediaError, MediaResult};

/// Video file information.
#[derive(Debug, Clone)]
pub struct VideoInfo {
    /// Duration in seconds
    pub duration: f64,
    /// Frame dimensions
    pub resolution: Resolution,
    /// Video codec
    pub codec: String,
    /// File size in bytes
    pub size: u64,
    /// Whether the file carries at least one audio stream
    pub has_audio: bool,
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

/// Probe a video file for information.
///
/// Fails with [`MediaError::InvalidVideo`] when the file has no video
/// stream, which is how corrupt or non-video uploads are detected.
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<VideoInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    // Check FFprobe exists
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: "FFprobe failed".to_string(),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)?;
    parse_probe(probe)
}

fn parse_probe(probe: FfprobeOutput) -> MediaResult<VideoInfo> {
    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| MediaError::InvalidVideo("No video stream found".to_string()))?;

    let has_audio = probe.streams.iter().any(|s| s.codec_type == "audio");

    let duration = probe
        .format
        .duration
        .as_ref()
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let size = probe
        .format
        .size
        .as_ref()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);

    let width = video_stream.width.unwrap_or(0);
    let height = video_stream.height.unwrap_or(0);
    if width == 0 || height == 0 {
        return Err(MediaError::InvalidVideo(
            "Video stream has no resolution".to_string(),
        ));
    }

    Ok(VideoInfo {
        duration,
        resolution: Resolution::new(width, height),
        codec: video_stream.codec_name.clone().unwrap_or_default(),
        size,
        has_audio,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe_fixture(streams: &str) -> FfprobeOutput {
        let json = format!(
            r#"{{"format": {{"duration": "12.5", "size": "1048576"}}, "streams": [{}]}}"#,
            streams
        );
        serde_json::from_str(&json).unwrap()
    }

    #[test]
    fn test_parse_probe_video_and_audio() {
        let probe = probe_fixture(
            r#"{"codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080},
               {"codec_type": "audio", "codec_name": "aac"}"#,
        );
        let info = parse_probe(probe).unwrap();
        assert_eq!(info.resolution, Resolution::new(1920, 1080));
        assert_eq!(info.codec, "h264");
        assert_eq!(info.size, 1048576);
        assert!(info.has_audio);
    }

    #[test]
    fn test_parse_probe_no_audio() {
        let probe = probe_fixture(
            r#"{"codec_type": "video", "codec_name": "vp9", "width": 640, "height": 480}"#,
        );
        let info = parse_probe(probe).unwrap();
        assert!(!info.has_audio);
    }

    #[test]
    fn test_parse_probe_rejects_audio_only() {
        let probe = probe_fixture(r#"{"codec_type": "audio", "codec_name": "mp3"}"#);
        assert!(matches!(
            parse_probe(probe),
            Err(MediaError::InvalidVideo(_))
        ));
    }

    #[test]
    fn test_parse_probe_rejects_missing_dimensions() {
        let probe = probe_fixture(r#"{"codec_type": "video", "codec_name": "h264"}"#);
        assert!(matches!(
            parse_probe(probe),
            Err(MediaError::InvalidVideo(_))
        ));
    }
}
