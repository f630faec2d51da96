//! Output container formats.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// H.264 in an MP4 container
    Mp4,
    /// VP9 in a WebM container
    Webm,
    /// H.264 in a QuickTime container
    Mov,
}

/// Error returned when parsing an unsupported format name.
#[derive(Debug, Clone, Error)]
#[error("Format '{0}' is not supported. Supported formats: mp4, webm, mov")]
pub struct UnknownFormat(pub String);

impl OutputFormat {
    /// All supported formats, in canonical order.
    pub const ALL: [OutputFormat; 3] = [OutputFormat::Mp4, OutputFormat::Webm, OutputFormat::Mov];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "mp4",
            OutputFormat::Webm => "webm",
            OutputFormat::Mov => "mov",
        }
    }

    /// File extension for this container.
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    /// MIME type served alongside stored artifacts.
    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "video/mp4",
            OutputFormat::Webm => "video/webm",
            OutputFormat::Mov => "video/quicktime",
        }
    }

    /// Parse a comma-separated format list as received from the upload form.
    ///
    /// Names are trimmed and lowercased; duplicates collapse. An empty input
    /// is an error — the caller supplies the default before parsing.
    pub fn parse_list(input: &str) -> Result<Vec<OutputFormat>, UnknownFormat> {
        let mut formats = Vec::new();
        for name in input.split(',') {
            let name = name.trim().to_ascii_lowercase();
            if name.is_empty() {
                continue;
            }
            let format = name.parse::<OutputFormat>()?;
            if !formats.contains(&format) {
                formats.push(format);
            }
        }
        if formats.is_empty() {
            return Err(UnknownFormat(input.trim().to_string()));
        }
        Ok(formats)
    }
}

impl FromStr for OutputFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mp4" => Ok(OutputFormat::Mp4),
            "webm" => Ok(OutputFormat::Webm),
            "mov" => Ok(OutputFormat::Mov),
            other => Err(UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        let formats = OutputFormat::parse_list("mp4,webm").unwrap();
        assert_eq!(formats, vec![OutputFormat::Mp4, OutputFormat::Webm]);
    }

    #[test]
    fn test_parse_list_dedup_and_whitespace() {
        let formats = OutputFormat::parse_list(" MP4 , mp4 ,mov").unwrap();
        assert_eq!(formats, vec![OutputFormat::Mp4, OutputFormat::Mov]);
    }

    #[test]
    fn test_parse_list_rejects_unknown() {
        let err = OutputFormat::parse_list("mp4,avi").unwrap_err();
        assert!(err.to_string().contains("avi"));
    }

    #[test]
    fn test_parse_list_rejects_empty() {
        assert!(OutputFormat::parse_list("").is_err());
        assert!(OutputFormat::parse_list(" , ").is_err());
    }

    #[test]
    fn test_content_types() {
        assert_eq!(OutputFormat::Mp4.content_type(), "video/mp4");
        assert_eq!(OutputFormat::Webm.content_type(), "video/webm");
        assert_eq!(OutputFormat::Mov.content_type(), "video/quicktime");
    }
}
