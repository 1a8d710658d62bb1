//! Filmstrip Engine Library
//!
//! This library drives thumbnail generation for a scrollable video strip:
//! it waits for the viewport to get real bounds, lays out tiles, requests
//! frames from an extractor and applies the results, discarding anything that
//! belongs to a superseded session.

pub mod canvas;
pub mod gate;
pub mod ports;
pub mod session;
pub mod sink;
pub mod strip;

pub use canvas::StripCanvas;
pub use gate::ReadinessGate;
pub use ports::{ExtractionRequest, FrameExtractor, LayoutHost, NoLayoutHost, TilePresenter};
pub use session::{GenerationSession, SessionOutcome, SessionState};
pub use sink::{CancellationToken, ExtractedFrame, FrameEvent, FrameSink, SessionId};
pub use strip::ThumbnailStrip;

use filmstrip_core::geometry::DEFAULT_MAX_VISIBLE_DURATION;
use image::RgbaImage;
use std::sync::Arc;

/// A decoded thumbnail, shared between the tile table and presenters
pub type Thumbnail = Arc<RgbaImage>;

/// Per-frame extraction failure. Never surfaced to callers of the strip.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExtractError {
    #[error("Could not open asset: {0}")]
    Open(String),

    #[error("Seek failed at {0}")]
    Seek(filmstrip_core::RationalTime),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("No frame at or after {0}")]
    NoFrame(filmstrip_core::RationalTime),
}

/// Strip configuration
#[derive(Debug, Clone)]
pub struct StripConfig {
    /// Seconds of video that fit in one viewport width
    pub max_visible_duration: f64,
    /// Device pixels per point
    pub scale_factor: f64,
}

impl Default for StripConfig {
    fn default() -> Self {
        Self {
            max_visible_duration: DEFAULT_MAX_VISIBLE_DURATION,
            scale_factor: 1.0,
        }
    }
}
