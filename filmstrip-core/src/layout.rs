//! Tile slot layout across the strip

use crate::geometry::{Rect, TileSize};

/// One fixed-size slot in the strip, addressed by contiguous index
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tile {
    /// 0-based slot index
    pub index: usize,
    /// Frame in strip coordinates; the trailing tile may be narrower
    pub frame: Rect,
}

/// Upper bound on tiles in one strip
pub const MAX_TILE_COUNT: usize = 100_000;

/// Most tiles worth laying out for a clip of `duration_ms` milliseconds.
///
/// Samples are whole milliseconds, so a clip never yields more distinct
/// timestamps than its length in ms.
pub fn max_tile_count(duration_ms: i64) -> usize {
    usize::try_from(duration_ms.max(1))
        .unwrap_or(usize::MAX)
        .min(MAX_TILE_COUNT)
}

/// Number of tiles needed to cover `strip_width`. At least one.
pub fn tile_count(strip_width: f64, tile_width: f64) -> usize {
    ceil_count(strip_width, tile_width)
}

/// Number of tiles covering the viewport. At least one.
pub fn visible_tile_count(viewport_width: f64, tile_width: f64) -> usize {
    ceil_count(viewport_width, tile_width)
}

fn ceil_count(extent: f64, tile_width: f64) -> usize {
    if tile_width.is_nan() || tile_width <= 0.0 || extent.is_nan() || extent <= 0.0 {
        return 1;
    }
    let count = (extent / tile_width).ceil();
    if !count.is_finite() {
        return 1;
    }
    (count as usize).max(1)
}

/// Lays out exactly `tile_count` tiles left to right.
///
/// Each tile starts at `index * tile_size.width`; its width is clamped into
/// `[0, strip_width - origin]` so the trailing tile never overhangs and never
/// goes negative.
pub fn layout(tile_count: usize, tile_size: &TileSize, strip_width: f64) -> Vec<Tile> {
    (0..tile_count)
        .map(|index| {
            let origin_x = index as f64 * tile_size.width;
            let remaining = (strip_width - origin_x).max(0.0);
            let width = tile_size.width.clamp(0.0, remaining);
            Tile {
                index,
                frame: Rect::new(origin_x, 0.0, width, tile_size.height),
            }
        })
        .collect()
}

/// Index-keyed table of tiles and the image each currently shows
#[derive(Debug, Clone)]
pub struct TileTable<I> {
    tiles: Vec<Tile>,
    images: Vec<Option<I>>,
}

impl<I: Clone> TileTable<I> {
    /// Creates an empty table
    pub fn new() -> Self {
        Self {
            tiles: Vec::new(),
            images: Vec::new(),
        }
    }

    /// Replaces every slot with a fresh layout, dropping all images
    pub fn rebuild(&mut self, tiles: Vec<Tile>) {
        self.images = vec![None; tiles.len()];
        self.tiles = tiles;
    }

    /// Removes all slots
    pub fn clear(&mut self) {
        self.tiles.clear();
        self.images.clear();
    }

    /// Drops every image but keeps the slots
    pub fn clear_images(&mut self) {
        for image in &mut self.images {
            *image = None;
        }
    }

    /// Assigns an image to a slot. Returns false if the index is out of range.
    pub fn set_image(&mut self, index: usize, image: I) -> bool {
        match self.images.get_mut(index) {
            Some(slot) => {
                *slot = Some(image);
                true
            }
            None => false,
        }
    }

    /// Image currently shown in a slot
    pub fn image(&self, index: usize) -> Option<&I> {
        self.images.get(index).and_then(Option::as_ref)
    }

    /// Slot geometry by index
    pub fn get(&self, index: usize) -> Option<&Tile> {
        self.tiles.get(index)
    }

    /// All slots in index order
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Iterates over slots paired with their images
    pub fn iter(&self) -> impl Iterator<Item = (&Tile, Option<&I>)> {
        self.tiles.iter().zip(self.images.iter().map(Option::as_ref))
    }

    /// Number of slots with an image
    pub fn filled(&self) -> usize {
        self.images.iter().filter(|i| i.is_some()).count()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

impl<I: Clone> Default for TileTable<I> {
    fn default() -> Self {
        Self::new()
    }
}
