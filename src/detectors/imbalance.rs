//! Fair value gap (imbalance) detection and test tracking
//!
//! A fair value gap is left by three consecutive bars C1, C2, C3 when the
//! wicks of C1 and C3 never overlap: bullish when `low(C3) > high(C1)`
//! (the zone is the untraded band below C3), bearish when
//! `high(C3) < low(C1)`. Zones are created untested; a later bar whose range
//! reaches back into the band "tests" the zone exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Bar;

/// A 3-bar price gap and its test status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FvgZone {
    /// Upper bound of the gap; always > `bottom`
    pub top: f64,
    /// Lower bound of the gap
    pub bottom: f64,
    /// Absolute index of the pattern's third (newest) bar
    pub formation_index: usize,
    pub formation_time: DateTime<Utc>,
    pub is_bullish: bool,
    pub is_tested: bool,
    /// Absolute index of the bar that first tested the zone
    pub test_index: Option<usize>,
}

impl FvgZone {
    /// Absolute index of the pattern's first (oldest) bar
    pub fn first_bar_index(&self) -> usize {
        self.formation_index.saturating_sub(2)
    }
}

/// Scan 3-bar windows within the last `lookback` bars for fair value gaps.
///
/// Zones come back ordered by formation recency (newest first) and are never
/// marked tested at creation; run [`check_fvg_test`] afterwards. Fewer than
/// 3 bars yields an empty vec.
pub fn find_fvgs(bars: &[Bar], lookback: usize) -> Vec<FvgZone> {
    let mut zones = Vec::new();
    if bars.len() < 3 {
        return zones;
    }

    // i is the pattern's third bar; restrict formations to the last
    // `lookback` bars of the slice
    let start = 2usize.max(bars.len().saturating_sub(lookback));

    for i in (start..bars.len()).rev() {
        let c1 = &bars[i - 2];
        let c3 = &bars[i];

        if c3.low > c1.high {
            zones.push(FvgZone {
                top: c3.low,
                bottom: c1.high,
                formation_index: i,
                formation_time: c3.open_time,
                is_bullish: true,
                is_tested: false,
                test_index: None,
            });
        } else if c3.high < c1.low {
            zones.push(FvgZone {
                top: c1.low,
                bottom: c3.high,
                formation_index: i,
                formation_time: c3.open_time,
                is_bullish: false,
                is_tested: false,
                test_index: None,
            });
        }
    }

    zones
}

/// Mark the zone tested by the most recent bar (within the last
/// `test_window` bars) whose range intersects it.
///
/// The testing bar must be strictly newer than the zone's formation bar.
/// Once a zone is tested it is never re-evaluated, so re-running with the
/// same or a larger window cannot move `test_index`.
pub fn check_fvg_test(zone: &mut FvgZone, bars: &[Bar], test_window: usize) {
    if zone.is_tested {
        return;
    }

    for distance in 1..=test_window.min(bars.len()) {
        let index = bars.len() - distance;
        if index <= zone.formation_index {
            break;
        }

        if bars[index].intersects(zone.bottom, zone.top) {
            zone.is_tested = true;
            zone.test_index = Some(index);
            tracing::debug!(
                top = zone.top,
                bottom = zone.bottom,
                bullish = zone.is_bullish,
                test_index = index,
                "fvg tested"
            );
            return;
        }
    }
}
