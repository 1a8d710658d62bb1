//! Video asset data structures

use crate::geometry::Size;
use crate::RationalTime;
use std::path::{Path, PathBuf};

/// 2D affine transform `[a b; c d] + (tx, ty)` describing a track's preferred orientation
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AffineTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub tx: f64,
    pub ty: f64,
}

impl AffineTransform {
    /// The identity transform
    pub const fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            tx: 0.0,
            ty: 0.0,
        }
    }

    /// A rotation by `degrees`; quarter turns produce exact matrices
    pub fn rotation_degrees(degrees: f64) -> Self {
        let normalized = degrees.rem_euclid(360.0);
        let (sin, cos) = if normalized == 0.0 {
            (0.0, 1.0)
        } else if normalized == 90.0 {
            (1.0, 0.0)
        } else if normalized == 180.0 {
            (0.0, -1.0)
        } else if normalized == 270.0 {
            (-1.0, 0.0)
        } else {
            normalized.to_radians().sin_cos()
        };
        Self {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            tx: 0.0,
            ty: 0.0,
        }
    }

    /// Applies the linear part of the transform to a size.
    ///
    /// The result may carry negative components; callers take absolute values.
    pub fn apply_to_size(&self, size: Size) -> Size {
        Size::new(
            self.a * size.width + self.c * size.height,
            self.b * size.width + self.d * size.height,
        )
    }

    /// Clockwise rotation snapped to quarter turns (0..=3)
    pub fn quarter_turns(&self) -> u8 {
        let degrees = self.b.atan2(self.a).to_degrees();
        ((degrees / 90.0).round() as i64).rem_euclid(4) as u8
    }

    /// Returns true for the identity transform
    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// A single video track of an asset
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VideoTrack {
    /// Encoded pixel size before orientation is applied
    pub natural_size: Size,
    /// Orientation transform the track should be displayed with
    pub preferred_transform: AffineTransform,
}

impl VideoTrack {
    /// Creates a new video track
    pub fn new(natural_size: Size, preferred_transform: AffineTransform) -> Self {
        Self {
            natural_size,
            preferred_transform,
        }
    }
}

/// Handle to a video the strip is generated for
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VideoAsset {
    /// Locator handed to frame extractors
    pub source: PathBuf,
    /// Total duration
    pub duration: RationalTime,
    /// Video tracks in container order
    pub video_tracks: Vec<VideoTrack>,
}

impl VideoAsset {
    /// Creates a new asset
    pub fn new(source: impl Into<PathBuf>, duration: RationalTime, video_tracks: Vec<VideoTrack>) -> Self {
        Self {
            source: source.into(),
            duration,
            video_tracks,
        }
    }

    /// Returns the locator of this asset
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Returns the track used for geometry, if any
    pub fn first_video_track(&self) -> Option<&VideoTrack> {
        self.video_tracks.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quarter_turn_swaps_size() {
        let size = Size::new(1920.0, 1080.0);
        let rotated = AffineTransform::rotation_degrees(90.0).apply_to_size(size);
        assert_eq!(rotated.width, -1080.0);
        assert_eq!(rotated.height, 1920.0);

        let upside_down = AffineTransform::rotation_degrees(-180.0).apply_to_size(size);
        assert_eq!(upside_down.width, -1920.0);
        assert_eq!(upside_down.height, -1080.0);
    }

    #[test]
    fn test_quarter_turns() {
        assert_eq!(AffineTransform::identity().quarter_turns(), 0);
        assert_eq!(AffineTransform::rotation_degrees(90.0).quarter_turns(), 1);
        assert_eq!(AffineTransform::rotation_degrees(180.0).quarter_turns(), 2);
        assert_eq!(AffineTransform::rotation_degrees(-90.0).quarter_turns(), 3);
        assert_eq!(AffineTransform::rotation_degrees(85.0).quarter_turns(), 1);
    }

    #[test]
    fn test_identity() {
        let size = Size::new(640.0, 480.0);
        assert_eq!(AffineTransform::identity().apply_to_size(size), size);
        assert!(AffineTransform::rotation_degrees(360.0).is_identity());
    }

    #[test]
    fn test_first_video_track() {
        let asset = VideoAsset::new("clip.mp4", RationalTime::from_millis(1000), Vec::new());
        assert!(asset.first_video_track().is_none());
        assert_eq!(asset.source(), Path::new("clip.mp4"));
    }
}
