//! Hysteresis Acceptance Bands
//!
//! Recomputing the screen correction on every sensor event would mean a
//! capture round-trip per event. Instead, each accepted corrected value
//! selects an acceptance band for the *raw* reading; as long as subsequent
//! raw readings stay inside the band, the last corrected value is reused.
//! Bands widen with lux so that bright scenes tolerate proportionally more
//! sensor noise before triggering a recapture.
//!
//! The table is an ordered list of `{middle, min, max}` ranges, strictly
//! increasing in `middle` and terminated by a `+inf` sentinel so a lookup
//! always hits. Bounds are expressed in raw-sensor units: they are divided
//! by `calib_gain * base_inverse_gain` exactly once at load time, never per
//! event. The first range's `min` is pinned to -1 afterwards, meaning "no
//! lower bound" for the darkest band.

use heapless::Vec;

/// Maximum number of ranges a table can hold.
pub const MAX_HYSTERESIS_RANGES: usize = 16;

/// One acceptance band.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HysteresisRange {
    /// Upper edge of corrected values this band is selected for
    pub middle: f32,
    /// Lower raw-value bound; -1 means "never reject from below"
    pub min: f32,
    /// Upper raw-value bound
    pub max: f32,
}

impl HysteresisRange {
    pub const fn new(middle: f32, min: f32, max: f32) -> Self {
        Self { middle, min, max }
    }
}

/// Ordered band table with a `+inf` sentinel as the final entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HysteresisTable {
    ranges: Vec<HysteresisRange, MAX_HYSTERESIS_RANGES>,
}

/// Errors building a custom table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableError {
    /// More ranges than [`MAX_HYSTERESIS_RANGES`]
    TooManyRanges,
    /// `middle` values not strictly increasing
    NotIncreasing,
    /// Last range's `middle` is not `+inf`
    MissingSentinel,
}

impl HysteresisTable {
    /// Reference band table from panel tuning.
    pub fn reference() -> Self {
        const RANGES: [HysteresisRange; 10] = [
            HysteresisRange::new(0.0, 0.0, 4.0),
            HysteresisRange::new(7.0, 1.0, 12.0),
            HysteresisRange::new(15.0, 5.0, 30.0),
            HysteresisRange::new(30.0, 10.0, 50.0),
            HysteresisRange::new(360.0, 25.0, 700.0),
            HysteresisRange::new(1200.0, 300.0, 1600.0),
            HysteresisRange::new(2250.0, 1000.0, 2940.0),
            HysteresisRange::new(4600.0, 2000.0, 5900.0),
            HysteresisRange::new(10_000.0, 4000.0, 80_000.0),
            HysteresisRange::new(f32::INFINITY, 8000.0, f32::INFINITY),
        ];

        let mut ranges = Vec::new();
        for range in RANGES {
            // Capacity is 16, the reference table has 10 entries
            let _ = ranges.push(range);
        }
        Self { ranges }
    }

    /// Build a table from custom ranges, validating ordering and sentinel.
    pub fn from_ranges(input: &[HysteresisRange]) -> Result<Self, TableError> {
        let mut ranges: Vec<HysteresisRange, MAX_HYSTERESIS_RANGES> = Vec::new();
        let mut prev_middle = f32::NEG_INFINITY;

        for range in input {
            if range.middle <= prev_middle {
                return Err(TableError::NotIncreasing);
            }
            prev_middle = range.middle;
            ranges.push(*range).map_err(|_| TableError::TooManyRanges)?;
        }

        match ranges.last() {
            Some(last) if last.middle == f32::INFINITY => Ok(Self { ranges }),
            _ => Err(TableError::MissingSentinel),
        }
    }

    /// Convert bounds from raw-sensor units into event units.
    ///
    /// Called once at load time with `calib_gain * base_inverse_gain`.
    /// Pins the first range's `min` to -1 so the darkest band never
    /// rejects from below.
    pub fn rescale(&mut self, gain: f32) {
        for range in self.ranges.iter_mut() {
            range.min /= gain;
            range.max /= gain;
        }
        if let Some(first) = self.ranges.first_mut() {
            first.min = -1.0;
        }
    }

    /// Select the band for a corrected value: the first range whose
    /// `middle >= value`. The sentinel guarantees a match for any finite
    /// input.
    pub fn select(&self, corrected: f32) -> HysteresisRange {
        for range in self.ranges.iter() {
            if range.middle >= corrected {
                return *range;
            }
        }
        // Unreachable with a sentinel-terminated table; fall back to the
        // widest band rather than panicking on a malformed one.
        HysteresisRange::new(f32::INFINITY, -1.0, f32::INFINITY)
    }

    /// Number of ranges in the table.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_table_is_ordered() {
        let table = HysteresisTable::reference();
        assert_eq!(table.len(), 10);

        let mut prev = f32::NEG_INFINITY;
        for range in table.ranges.iter() {
            assert!(range.middle > prev);
            prev = range.middle;
        }
        assert_eq!(table.ranges.last().unwrap().middle, f32::INFINITY);
    }

    #[test]
    fn select_takes_first_matching_band() {
        let table = HysteresisTable::reference();

        assert_eq!(table.select(0.0).middle, 0.0);
        assert_eq!(table.select(5.0).middle, 7.0);
        assert_eq!(table.select(30.0).middle, 30.0);
        assert_eq!(table.select(500.0).middle, 1200.0);
        assert_eq!(table.select(50_000.0).middle, f32::INFINITY);
    }

    #[test]
    fn rescale_divides_bounds_and_pins_first_min() {
        let mut table = HysteresisTable::reference();
        table.rescale(0.5);

        // (7, 1, 12) becomes (7, 2, 24) before pinning
        assert_eq!(table.select(5.0).min, 2.0);
        assert_eq!(table.select(5.0).max, 24.0);
        // First band's min is the "never reject" sentinel
        assert_eq!(table.select(0.0).min, -1.0);
    }

    #[test]
    fn custom_table_validation() {
        let ok = [
            HysteresisRange::new(10.0, 0.0, 20.0),
            HysteresisRange::new(f32::INFINITY, 5.0, f32::INFINITY),
        ];
        assert!(HysteresisTable::from_ranges(&ok).is_ok());

        let unordered = [
            HysteresisRange::new(10.0, 0.0, 20.0),
            HysteresisRange::new(10.0, 5.0, 30.0),
        ];
        assert_eq!(
            HysteresisTable::from_ranges(&unordered),
            Err(TableError::NotIncreasing)
        );

        let no_sentinel = [HysteresisRange::new(10.0, 0.0, 20.0)];
        assert_eq!(
            HysteresisTable::from_ranges(&no_sentinel),
            Err(TableError::MissingSentinel)
        );
    }
}
