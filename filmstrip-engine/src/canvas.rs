//! Presenter that composites the strip into a single RGBA image

use crate::ports::TilePresenter;
use crate::Thumbnail;
use filmstrip_core::Tile;
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgba, RgbaImage};

/// Placeholder colour for tiles without a frame
const PLACEHOLDER: Rgba<u8> = Rgba([24, 24, 24, 255]);

/// Largest canvas side in pixels; tiles past the edge are not drawn
pub const MAX_CANVAS_SIDE: u32 = 32_768;

/// Renders tiles side by side onto one canvas of `content width x tile height`
pub struct StripCanvas {
    scale_factor: f64,
    content_width: f64,
    tiles: Vec<Tile>,
    canvas: RgbaImage,
}

impl StripCanvas {
    /// Creates an empty canvas; `scale_factor` converts points to pixels
    pub fn new(scale_factor: f64) -> Self {
        Self {
            scale_factor: if scale_factor > 0.0 { scale_factor } else { 1.0 },
            content_width: 0.0,
            tiles: Vec::new(),
            canvas: RgbaImage::new(0, 0),
        }
    }

    /// The composited strip
    pub fn image(&self) -> &RgbaImage {
        &self.canvas
    }

    pub fn into_image(self) -> RgbaImage {
        self.canvas
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    fn to_pixels(&self, points: f64) -> u32 {
        (points * self.scale_factor).round().max(0.0) as u32
    }

    /// Reallocates the canvas for the current content width and tile height
    fn allocate(&mut self) {
        let height = self.tiles.first().map_or(0.0, |t| t.frame.height);
        let width = self.to_pixels(self.content_width).min(MAX_CANVAS_SIDE);
        let height = self.to_pixels(height).min(MAX_CANVAS_SIDE);
        self.canvas = ImageBuffer::from_pixel(width, height, PLACEHOLDER);
    }
}

impl TilePresenter for StripCanvas {
    fn set_tiles(&mut self, tiles: &[Tile]) {
        self.tiles = tiles.to_vec();
        self.allocate();
    }

    fn set_tile_image(&mut self, index: usize, image: &Thumbnail) {
        let Some(tile) = self.tiles.get(index).copied() else {
            return;
        };
        let x = self.to_pixels(tile.frame.x);
        let slot_width = self.to_pixels(tile.frame.width);
        let slot_height = self.to_pixels(tile.frame.height);
        if slot_width == 0 || slot_height == 0 || image.height() == 0 {
            return;
        }

        // Scale to the slot height keeping aspect; the trailing slot crops.
        let scaled;
        let source: &RgbaImage = if image.height() == slot_height {
            &**image
        } else {
            let width = ((image.width() as f64 * slot_height as f64) / image.height() as f64)
                .round()
                .max(1.0) as u32;
            scaled = imageops::resize(&**image, width, slot_height, FilterType::Triangle);
            &scaled
        };

        overlay_clipped(&mut self.canvas, source, x as i64, slot_width);
    }

    fn clear_all_tiles(&mut self) {
        for pixel in self.canvas.pixels_mut() {
            *pixel = PLACEHOLDER;
        }
    }

    fn set_content_width(&mut self, width: f64) {
        self.content_width = width;
        self.allocate();
    }
}

/// Overlays `overlay` at column `x`, drawing at most `max_width` columns
fn overlay_clipped(base: &mut RgbaImage, overlay: &RgbaImage, x: i64, max_width: u32) {
    let base_width = base.width() as i64;
    let base_height = base.height() as i64;

    let src_x_start = 0.max(-x);
    let src_x_end = (overlay.width().min(max_width) as i64).min(base_width - x);
    let src_y_end = (overlay.height() as i64).min(base_height);
    if src_x_start >= src_x_end || src_y_end <= 0 {
        return;
    }

    for src_y in 0..src_y_end {
        for src_x in src_x_start..src_x_end {
            let dest_x = (x + src_x) as u32;
            let dest_y = src_y as u32;

            let overlay_pixel = overlay.get_pixel(src_x as u32, src_y as u32);
            let base_pixel = base.get_pixel(dest_x, dest_y);

            let alpha = overlay_pixel[3] as f32 / 255.0;
            let inv_alpha = 1.0 - alpha;

            let blended = Rgba([
                (overlay_pixel[0] as f32 * alpha + base_pixel[0] as f32 * inv_alpha) as u8,
                (overlay_pixel[1] as f32 * alpha + base_pixel[1] as f32 * inv_alpha) as u8,
                (overlay_pixel[2] as f32 * alpha + base_pixel[2] as f32 * inv_alpha) as u8,
                255,
            ]);

            base.put_pixel(dest_x, dest_y, blended);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filmstrip_core::layout::layout;
    use filmstrip_core::TileSize;
    use std::sync::Arc;

    fn canvas_with_tiles(scale: f64) -> StripCanvas {
        let size = TileSize {
            width: 10.0,
            height: 5.0,
        };
        let mut canvas = StripCanvas::new(scale);
        canvas.set_content_width(25.0);
        canvas.set_tiles(&layout(3, &size, 25.0));
        canvas
    }

    #[test]
    fn test_canvas_size_follows_content_width() {
        let canvas = canvas_with_tiles(2.0);
        assert_eq!(canvas.image().dimensions(), (50, 10));
        assert_eq!(*canvas.image().get_pixel(0, 0), PLACEHOLDER);
    }

    #[test]
    fn test_trailing_tile_is_cropped() {
        let mut canvas = canvas_with_tiles(1.0);
        let red = Arc::new(RgbaImage::from_pixel(10, 5, Rgba([255, 0, 0, 255])));
        canvas.set_tile_image(2, &red);

        assert_eq!(*canvas.image().get_pixel(20, 0), Rgba([255, 0, 0, 255]));
        assert_eq!(*canvas.image().get_pixel(24, 4), Rgba([255, 0, 0, 255]));
        assert_eq!(*canvas.image().get_pixel(19, 0), PLACEHOLDER);
    }

    #[test]
    fn test_images_are_scaled_to_slot_height() {
        let mut canvas = canvas_with_tiles(1.0);
        let blue = Arc::new(RgbaImage::from_pixel(40, 20, Rgba([0, 0, 255, 255])));
        canvas.set_tile_image(0, &blue);
        assert_eq!(*canvas.image().get_pixel(9, 4), Rgba([0, 0, 255, 255]));
        assert_eq!(*canvas.image().get_pixel(10, 0), PLACEHOLDER);

        canvas.clear_all_tiles();
        assert_eq!(*canvas.image().get_pixel(9, 4), PLACEHOLDER);
    }

    #[test]
    fn test_huge_strip_is_clamped() {
        let mut canvas = StripCanvas::new(1.0);
        canvas.set_content_width(1.0e12);
        canvas.set_tiles(&[
            Tile {
                index: 0,
                frame: filmstrip_core::Rect::new(0.0, 0.0, 10.0, 5.0),
            },
            Tile {
                index: 1,
                frame: filmstrip_core::Rect::new(9.0e11, 0.0, 10.0, 5.0),
            },
        ]);
        assert_eq!(canvas.image().dimensions(), (MAX_CANVAS_SIDE, 5));

        let red = Arc::new(RgbaImage::from_pixel(10, 5, Rgba([255, 0, 0, 255])));
        canvas.set_tile_image(1, &red);
        canvas.set_tile_image(0, &red);
        assert_eq!(*canvas.image().get_pixel(0, 0), Rgba([255, 0, 0, 255]));
        assert_eq!(*canvas.image().get_pixel(MAX_CANVAS_SIDE - 1, 0), PLACEHOLDER);
    }

    #[test]
    fn test_unknown_index_is_ignored() {
        let mut canvas = canvas_with_tiles(1.0);
        let green = Arc::new(RgbaImage::from_pixel(10, 5, Rgba([0, 255, 0, 255])));
        canvas.set_tile_image(7, &green);
        assert!(canvas.image().pixels().all(|p| *p == PLACEHOLDER));
    }
}
