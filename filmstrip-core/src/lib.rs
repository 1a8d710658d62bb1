//! Filmstrip Core Library
//!
//! This library provides the data model and the pure math behind a scrollable
//! video thumbnail strip: rational time values, tile geometry, tile layout,
//! per-tile sample times and the scroll position <-> time mapping.

pub mod asset;
pub mod geometry;
pub mod layout;
pub mod mapper;
pub mod sampler;
pub mod time;

pub use asset::{AffineTransform, VideoAsset, VideoTrack};
pub use geometry::{Rect, Size, TileSize, ViewportState};
pub use layout::{Tile, TileTable};
pub use mapper::PositionTimeMapper;
pub use time::RationalTime;

/// Result type for filmstrip-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for filmstrip-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Asset has no video track")]
    NoVideoTrack,

    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("Invalid time value: {0}")]
    InvalidTime(RationalTime),
}

/// Geometry of a whole strip, computed once per generation
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StripGeometry {
    /// Size of every tile in points
    pub tile_size: TileSize,
    /// Total scrollable width
    pub strip_width: f64,
    /// Number of tiles laid out across the strip
    pub tile_count: usize,
    /// Number of leading tiles covering the viewport
    pub visible_tile_count: usize,
    /// Pixel size requested from the extractor
    pub target_pixel_size: (u32, u32),
}

impl StripGeometry {
    /// Computes the geometry of `asset` shown in `viewport`.
    ///
    /// Fails when the asset has no video track or its size cannot produce a
    /// usable tile; no extraction may start in that case.
    pub fn compute(asset: &VideoAsset, viewport: &ViewportState) -> Result<Self> {
        let track = asset.first_video_track().ok_or(Error::NoVideoTrack)?;
        let tile_size = geometry::tile_size(
            track.natural_size,
            &track.preferred_transform,
            viewport.height,
        )
        .ok_or_else(|| {
            Error::DegenerateGeometry(format!(
                "natural size {}x{}",
                track.natural_size.width, track.natural_size.height
            ))
        })?;

        if !asset.duration.is_valid() {
            return Err(Error::InvalidTime(asset.duration));
        }

        let mut strip_width = geometry::strip_width(
            asset.duration.seconds(),
            viewport.max_visible_duration,
            viewport.width,
        );

        // No more tiles than distinct millisecond samples; a tiny max visible
        // duration would otherwise ask for billions of them. The strip shrinks
        // to what the capped tiles cover.
        let max_tiles = layout::max_tile_count(sampler::duration_millis(&asset.duration));
        let mut tile_count = layout::tile_count(strip_width, tile_size.width);
        if tile_count > max_tiles {
            tile_count = max_tiles;
            strip_width = strip_width.min(max_tiles as f64 * tile_size.width);
        }
        let visible_tile_count =
            layout::visible_tile_count(viewport.width, tile_size.width).min(tile_count);

        Ok(Self {
            tile_size,
            strip_width,
            tile_count,
            visible_tile_count,
            target_pixel_size: geometry::target_pixel_size(&tile_size, viewport.scale_factor),
        })
    }

    /// Lays out the tiles for this geometry
    pub fn tiles(&self) -> Vec<Tile> {
        layout::layout(self.tile_count, &self.tile_size, self.strip_width)
    }
}
