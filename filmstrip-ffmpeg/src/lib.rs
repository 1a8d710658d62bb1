//! Filmstrip FFmpeg Backend
//!
//! This library probes video files into strip assets and extracts thumbnail
//! frames on background threads using FFmpeg.

pub mod extractor;
pub mod video_reader;

pub use extractor::FfmpegFrameExtractor;
pub use video_reader::{probe_asset, VideoReader};

use filmstrip_core::RationalTime;
use filmstrip_engine::ExtractError;

/// Result type for filmstrip-ffmpeg operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for filmstrip-ffmpeg operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Filmstrip core error: {0}")]
    Core(#[from] filmstrip_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("FFmpeg error: {0}")]
    Ffmpeg(#[from] ffmpeg_next::Error),

    #[error("No video stream found")]
    NoVideoStream,

    #[error("No frame decoded at or after {0}")]
    NoFrame(RationalTime),

    #[error("Invalid frame data")]
    InvalidFrame,
}

impl Error {
    /// Converts to the per-frame failure reported to the strip
    pub fn into_extract_error(self, time: RationalTime) -> ExtractError {
        match self {
            Error::NoFrame(_) => ExtractError::NoFrame(time),
            Error::NoVideoStream => ExtractError::Open(self.to_string()),
            other => ExtractError::Decode(other.to_string()),
        }
    }
}
