//! Strip geometry: tile size from the video's orientation, strip width from duration

use crate::AffineTransform;

/// Smallest duration (seconds) used when scaling the strip
pub const MIN_DURATION_SECS: f64 = 0.001;

/// Floor for the max visible duration so the scale factor never divides by zero
pub const MIN_VISIBLE_DURATION_SECS: f64 = 1e-6;

/// Default span of video (seconds) that fits in one viewport width
pub const DEFAULT_MAX_VISIBLE_DURATION: f64 = 15.0;

/// Width and height pair
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle in strip coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge
    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }
}

/// Size of one tile in points. Both dimensions are > 0.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TileSize {
    pub width: f64,
    pub height: f64,
}

/// Bounds of the hosting viewport plus the strip's zoom setting
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ViewportState {
    /// Width in points
    pub width: f64,
    /// Height in points
    pub height: f64,
    /// Device pixels per point
    pub scale_factor: f64,
    /// Seconds of video that fit in one viewport width
    pub max_visible_duration: f64,
}

impl ViewportState {
    /// Creates a viewport with default scale factor and max visible duration
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// True once the layout system has reported real bounds
    pub fn has_bounds(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    /// Returns true if width and height match `other`
    pub fn same_bounds(&self, other: &ViewportState) -> bool {
        self.width == other.width && self.height == other.height
    }
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            scale_factor: 1.0,
            max_visible_duration: DEFAULT_MAX_VISIBLE_DURATION,
        }
    }
}

/// Computes the tile size for a track of `native` pixels shown at `viewport_height`.
///
/// Returns `None` for degenerate input; no generation may start in that case.
pub fn tile_size(
    native: Size,
    transform: &AffineTransform,
    viewport_height: f64,
) -> Option<TileSize> {
    let oriented = transform.apply_to_size(native);
    let width = oriented.width.abs();
    let height = oriented.height.abs();
    if !width.is_finite() || !height.is_finite() || width <= 0.0 || height <= 0.0 {
        return None;
    }

    let aspect = width / height;
    if !aspect.is_finite() || aspect <= 0.0 {
        return None;
    }

    // NaN viewport heights fall through to the 1pt floor.
    let target_height = if viewport_height > 1.0 {
        viewport_height
    } else {
        1.0
    };
    let target_width = target_height * aspect;
    if !target_width.is_finite() || target_width <= 0.0 {
        return None;
    }

    Some(TileSize {
        width: target_width,
        height: target_height,
    })
}

/// Total scrollable width of the strip. Never less than `viewport_width`.
pub fn strip_width(duration_secs: f64, max_visible_duration: f64, viewport_width: f64) -> f64 {
    let duration = if duration_secs > MIN_DURATION_SECS {
        duration_secs
    } else {
        MIN_DURATION_SECS
    };
    let max_visible = if max_visible_duration > MIN_VISIBLE_DURATION_SECS {
        max_visible_duration
    } else {
        MIN_VISIBLE_DURATION_SECS
    };

    let scale = (duration / max_visible).max(1.0);
    viewport_width * scale
}

/// Device pixel size requested from the extractor for one tile
pub fn target_pixel_size(tile: &TileSize, scale_factor: f64) -> (u32, u32) {
    let scale = if scale_factor.is_finite() && scale_factor > 0.0 {
        scale_factor
    } else {
        1.0
    };
    let to_pixels = |points: f64| (points * scale).ceil().clamp(1.0, u32::MAX as f64) as u32;
    (to_pixels(tile.width), to_pixels(tile.height))
}
