//! Collaborators the strip drives: extraction, presentation and layout

use crate::{FrameSink, Thumbnail};
use filmstrip_core::{RationalTime, Tile, VideoAsset};
use std::sync::Arc;

/// A bulk frame extraction request for one session
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub asset: Arc<VideoAsset>,
    /// Timestamps in tile order
    pub times: Vec<RationalTime>,
    /// Target frame size in device pixels (width, height)
    pub target_size: (u32, u32),
}

/// Asynchronous frame extraction primitive.
///
/// Implementations report one result per requested timestamp through the
/// sink, in any order and from any thread.
pub trait FrameExtractor {
    /// Starts extracting every timestamp in `request`
    fn begin_extraction(&mut self, request: ExtractionRequest, sink: FrameSink);

    /// Cancels all outstanding work. Work already running may finish, but its
    /// results are discarded.
    fn cancel_all(&mut self);
}

/// Surface the tiles are drawn on
pub trait TilePresenter {
    /// Announces a fresh slot layout; every slot starts as a placeholder
    fn set_tiles(&mut self, tiles: &[Tile]);

    fn set_tile_image(&mut self, index: usize, image: &Thumbnail);

    fn clear_all_tiles(&mut self);

    /// Total scrollable width
    fn set_content_width(&mut self, width: f64);
}

/// The layout system hosting the strip
pub trait LayoutHost {
    /// Asks for a layout pass; the host answers with `layout_pass_completed`
    fn request_layout_pass(&mut self);
}

impl<T: FrameExtractor + ?Sized> FrameExtractor for Box<T> {
    fn begin_extraction(&mut self, request: ExtractionRequest, sink: FrameSink) {
        (**self).begin_extraction(request, sink)
    }

    fn cancel_all(&mut self) {
        (**self).cancel_all()
    }
}

impl<T: TilePresenter + ?Sized> TilePresenter for Box<T> {
    fn set_tiles(&mut self, tiles: &[Tile]) {
        (**self).set_tiles(tiles)
    }

    fn set_tile_image(&mut self, index: usize, image: &Thumbnail) {
        (**self).set_tile_image(index, image)
    }

    fn clear_all_tiles(&mut self) {
        (**self).clear_all_tiles()
    }

    fn set_content_width(&mut self, width: f64) {
        (**self).set_content_width(width)
    }
}

/// Layout host for strips whose bounds are pushed in by the caller
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLayoutHost;

impl LayoutHost for NoLayoutHost {
    fn request_layout_pass(&mut self) {}
}
