//! Per-tile sample timestamps

use crate::RationalTime;

/// Converts a duration to whole milliseconds, floored at 1ms
pub fn duration_millis(duration: &RationalTime) -> i64 {
    if !duration.is_valid() {
        return 1;
    }
    let ms = duration.value as i128 * 1000 / duration.timescale as i128;
    ms.clamp(1, i64::MAX as i128) as i64
}

/// Produces one timestamp per tile, sampled at the centre of each slot.
///
/// Samples stay strictly before the asset's end: extraction at or past the
/// last valid timestamp is unreliable. The result has `max(1, tile_count)`
/// entries in increasing tile order, at millisecond timescale.
pub fn sample_times(duration: &RationalTime, tile_count: usize) -> Vec<RationalTime> {
    let count = tile_count.max(1);
    let duration_ms = duration_millis(duration);
    let step = duration_ms as f64 / count as f64;
    let last = duration_ms - 1;

    (0..count)
        .map(|i| {
            let centre = ((i as f64 + 0.5) * step).floor() as i64;
            RationalTime::from_millis(centre.clamp(0, last))
        })
        .collect()
}
