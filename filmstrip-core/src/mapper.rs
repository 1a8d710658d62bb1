//! Scroll offset <-> playback time mapping

use crate::RationalTime;

/// Maps between positions along the strip and times in the asset.
///
/// Holds no references into the generation pipeline; build one from the
/// current strip width and asset duration whenever either changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionTimeMapper {
    /// Total scrollable width of the strip
    pub strip_width: f64,
    /// Duration of the current asset, `None` when no asset is set
    pub duration: Option<RationalTime>,
}

impl PositionTimeMapper {
    /// Creates a mapper for the given strip width and asset duration
    pub fn new(strip_width: f64, duration: Option<RationalTime>) -> Self {
        Self {
            strip_width,
            duration,
        }
    }

    /// Time at `position`, expressed in the duration's timescale.
    ///
    /// Positions outside the strip clamp to its ends. Returns `None` without
    /// an asset or when the strip has no width.
    pub fn time_for_position(&self, position: f64) -> Option<RationalTime> {
        let duration = self.duration?;
        if !self.strip_width.is_finite() || self.strip_width <= 0.0 {
            return None;
        }

        let ratio = position / self.strip_width;
        let ratio = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };
        let value = (ratio * duration.value as f64).round() as i64;
        Some(RationalTime::new(value, duration.timescale))
    }

    /// Position of `time` along the strip.
    ///
    /// Returns `None` for a zero-length asset or an unusable timescale.
    pub fn position_for_time(&self, time: RationalTime) -> Option<f64> {
        let duration = self.duration?;
        if duration.value == 0 || !duration.is_valid() || !time.is_valid() {
            return None;
        }

        // Widen before multiplying raw tick counts.
        let numerator = time.value as i128 * duration.timescale as i128;
        let denominator = time.timescale as i128 * duration.value as i128;
        let ratio = numerator as f64 / denominator as f64;
        Some(ratio * self.strip_width)
    }
}
