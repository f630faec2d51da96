//! FFmpeg CLI wrapper for video conversion.
//!
//! This crate shells out to `ffmpeg`/`ffprobe` and exposes the conversion
//! pipeline as a pure transform: input path in, transcoded artifact out.
//! It performs no uploads and touches no shared request state.

pub mod command;
pub mod convert;
pub mod error;
pub mod fs_utils;
pub mod probe;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use convert::{
    FfmpegTranscoder, TranscodeError, TranscodeOutput, TranscodeRequest, Transcoder,
};
pub use error::{MediaError, MediaResult};
pub use probe::{probe_video, VideoInfo};
