//! Rational time values

use std::fmt;

/// Timescale used for millisecond-resolution time values
pub const MILLIS_TIMESCALE: i32 = 1000;

/// A time expressed as integer ticks over an integer ticks-per-second timescale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RationalTime {
    /// Number of ticks
    pub value: i64,
    /// Ticks per second
    pub timescale: i32,
}

impl RationalTime {
    /// Creates a new time value
    pub const fn new(value: i64, timescale: i32) -> Self {
        Self { value, timescale }
    }

    /// Zero at millisecond timescale
    pub const fn zero() -> Self {
        Self::new(0, MILLIS_TIMESCALE)
    }

    /// Creates a time value at millisecond resolution
    pub const fn from_millis(ms: i64) -> Self {
        Self::new(ms, MILLIS_TIMESCALE)
    }

    /// Creates a time value from seconds, rounded to the nearest tick
    pub fn from_seconds(seconds: f64, timescale: i32) -> Self {
        Self::new((seconds * timescale as f64).round() as i64, timescale)
    }

    /// Returns true if the timescale can be divided by
    pub fn is_valid(&self) -> bool {
        self.timescale > 0
    }

    /// Returns the value in seconds (0.0 for an invalid timescale)
    pub fn seconds(&self) -> f64 {
        if !self.is_valid() {
            return 0.0;
        }
        self.value as f64 / self.timescale as f64
    }

    /// Returns the value in milliseconds (0.0 for an invalid timescale)
    pub fn millis(&self) -> f64 {
        self.seconds() * 1000.0
    }

    /// Compares two values across timescales without rounding.
    ///
    /// Products are taken in `i128` so raw tick counts never overflow.
    pub fn is_equivalent(&self, other: &RationalTime) -> bool {
        if !self.is_valid() || !other.is_valid() {
            return false;
        }
        self.value as i128 * other.timescale as i128 == other.value as i128 * self.timescale as i128
    }
}

impl Default for RationalTime {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for RationalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({:.3}s)", self.value, self.timescale, self.seconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_conversion() {
        let t = RationalTime::new(90_000, 600);
        assert_eq!(t.seconds(), 150.0);
        assert_eq!(RationalTime::from_millis(1500).seconds(), 1.5);
        assert_eq!(RationalTime::from_seconds(2.5, 600), RationalTime::new(1500, 600));
    }

    #[test]
    fn test_invalid_timescale() {
        let t = RationalTime::new(10, 0);
        assert!(!t.is_valid());
        assert_eq!(t.seconds(), 0.0);
        assert!(!t.is_equivalent(&t));
    }

    #[test]
    fn test_equivalence_across_timescales() {
        let a = RationalTime::new(1500, 1000);
        let b = RationalTime::new(900, 600);
        assert!(a.is_equivalent(&b));
        assert_ne!(a, b);

        // Large tick counts must not overflow.
        let big = RationalTime::new(i64::MAX / 2, 1_000_000_000);
        assert!(big.is_equivalent(&big));
    }
}
