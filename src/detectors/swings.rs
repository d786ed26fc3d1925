//! Swing point and fractal detection
//!
//! A swing high of strength `k` is a bar whose high strictly exceeds the
//! highs of the `k` bars on each side (mirrored for swing lows). Fractals
//! are the fixed strength-2 variant used as take-profit candidates; on a
//! fractal pass a bar that qualifies as a high fractal is not also recorded
//! as a low fractal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Bar;

/// Neighbor count on each side for fractal detection
pub const FRACTAL_STRENGTH: usize = 2;

/// A local price extremum stronger than its `k` neighbors on each side
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingPoint {
    /// Absolute index into the scanned bar slice (oldest = 0)
    pub bar_index: usize,
    pub price: f64,
    pub time: DateTime<Utc>,
    pub is_high: bool,
}

/// A strength-2 extremum used exclusively as a take-profit candidate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FractalPoint {
    pub bar_index: usize,
    pub price: f64,
    pub time: DateTime<Utc>,
    pub is_high: bool,
}

/// Find swing points of the given strength within the last `lookback` bars.
///
/// A single bar may be recorded as both a swing high and a swing low in
/// degenerate flat data; callers filter by `is_high`. Results are ordered
/// oldest first. Fewer than `lookback` or `2k+1` bars yields an empty vec.
pub fn find_swing_points(bars: &[Bar], strength: usize, lookback: usize) -> Vec<SwingPoint> {
    let mut swings = Vec::new();
    if strength == 0 || bars.len() < lookback || bars.len() < 2 * strength + 1 {
        return swings;
    }

    let start = strength.max(bars.len().saturating_sub(lookback));
    let end = bars.len() - 1 - strength;

    for i in start..=end {
        let mut is_swing_high = true;
        let mut is_swing_low = true;

        for j in 1..=strength {
            if bars[i].high <= bars[i - j].high || bars[i].high <= bars[i + j].high {
                is_swing_high = false;
            }
            if bars[i].low >= bars[i - j].low || bars[i].low >= bars[i + j].low {
                is_swing_low = false;
            }
        }

        if is_swing_high {
            swings.push(SwingPoint {
                bar_index: i,
                price: bars[i].high,
                time: bars[i].open_time,
                is_high: true,
            });
        }
        if is_swing_low {
            swings.push(SwingPoint {
                bar_index: i,
                price: bars[i].low,
                time: bars[i].open_time,
                is_high: false,
            });
        }
    }

    swings
}

/// Find fractals (strength 2) within the last `lookback` bars, oldest first.
///
/// A bar that qualifies as a high fractal is excluded from also qualifying
/// as a low fractal on the same pass.
pub fn find_fractals(bars: &[Bar], lookback: usize) -> Vec<FractalPoint> {
    let strength = FRACTAL_STRENGTH;
    let mut fractals = Vec::new();
    if bars.len() < lookback || bars.len() < 2 * strength + 1 {
        return fractals;
    }

    let start = strength.max(bars.len().saturating_sub(lookback));
    let end = bars.len() - 1 - strength;

    for i in start..=end {
        let is_high_fractal = (1..=strength)
            .all(|j| bars[i].high > bars[i - j].high && bars[i].high > bars[i + j].high);

        if is_high_fractal {
            fractals.push(FractalPoint {
                bar_index: i,
                price: bars[i].high,
                time: bars[i].open_time,
                is_high: true,
            });
            continue;
        }

        let is_low_fractal = (1..=strength)
            .all(|j| bars[i].low < bars[i - j].low && bars[i].low < bars[i + j].low);

        if is_low_fractal {
            fractals.push(FractalPoint {
                bar_index: i,
                price: bars[i].low,
                time: bars[i].open_time,
                is_high: false,
            });
        }
    }

    fractals
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    /// Bars with the given (high, low) pairs at 15-minute spacing
    fn bars_from_hl(pairs: &[(f64, f64)]) -> Vec<Bar> {
        let start = Utc::now();
        pairs
            .iter()
            .enumerate()
            .map(|(i, &(high, low))| {
                let mid = (high + low) / 2.0;
                Bar::new_unchecked(
                    start + Duration::minutes(15 * i as i64),
                    mid,
                    high,
                    low,
                    mid,
                )
            })
            .collect()
    }

    #[test]
    fn detects_isolated_peak_and_valley() {
        let bars = bars_from_hl(&[
            (10.0, 9.0),
            (11.0, 10.0),
            (15.0, 14.0), // swing high at 2
            (11.0, 10.0),
            (10.0, 9.0),
            (9.0, 5.0), // swing low at 5
            (10.0, 9.0),
            (11.0, 10.0),
        ]);

        let swings = find_swing_points(&bars, 2, bars.len());
        let highs: Vec<_> = swings.iter().filter(|s| s.is_high).collect();
        let lows: Vec<_> = swings.iter().filter(|s| !s.is_high).collect();

        assert_eq!(highs.len(), 1);
        assert_eq!(highs[0].bar_index, 2);
        assert_eq!(highs[0].price, 15.0);
        assert_eq!(lows.len(), 1);
        assert_eq!(lows[0].bar_index, 5);
        assert_eq!(lows[0].price, 5.0);
    }

    #[test]
    fn swing_requires_strict_inequality() {
        // Equal neighboring highs: no swing high anywhere
        let bars = bars_from_hl(&[
            (10.0, 9.0),
            (12.0, 11.0),
            (12.0, 11.0),
            (12.0, 11.0),
            (10.0, 9.0),
        ]);
        let swings = find_swing_points(&bars, 1, bars.len());
        assert!(swings.iter().all(|s| !s.is_high));
    }

    #[test]
    fn shrinking_strength_only_adds_detections() {
        let bars = bars_from_hl(&[
            (10.0, 9.0),
            (12.0, 11.0),
            (11.0, 10.0),
            (13.0, 12.0),
            (11.0, 10.0),
            (10.0, 9.0),
            (14.0, 13.0),
            (11.0, 10.0),
            (10.0, 9.0),
        ]);

        let strong = find_swing_points(&bars, 2, bars.len());
        let weak = find_swing_points(&bars, 1, bars.len());

        for s in &strong {
            assert!(
                weak.iter()
                    .any(|w| w.bar_index == s.bar_index && w.is_high == s.is_high),
                "strength-2 swing at {} lost at strength 1",
                s.bar_index
            );
        }
        assert!(weak.len() >= strong.len());
    }

    #[test]
    fn insufficient_bars_yield_empty() {
        let bars = bars_from_hl(&[(10.0, 9.0), (11.0, 10.0), (10.0, 9.0)]);
        assert!(find_swing_points(&bars, 2, 3).is_empty());
        assert!(find_fractals(&bars, 3).is_empty());
        // shorter than the requested lookback
        assert!(find_swing_points(&bars, 1, 10).is_empty());
    }

    #[test]
    fn lookback_restricts_to_recent_bars() {
        let bars = bars_from_hl(&[
            (15.0, 14.0),
            (10.0, 9.0),
            (9.0, 8.0),
            (10.0, 9.0),
            (12.0, 11.0),
            (10.0, 9.0),
            (9.0, 8.0),
        ]);
        // Full window sees the valley at index 2; a 4-bar window does not
        let full = find_swing_points(&bars, 1, bars.len());
        assert!(full.iter().any(|s| s.bar_index == 2 && !s.is_high));

        let recent = find_swing_points(&bars, 1, 4);
        assert!(recent.iter().all(|s| s.bar_index >= 3));
    }

    #[test]
    fn flat_bar_can_be_both_swing_high_and_low() {
        // Middle bar's high exceeds neighbors' highs AND its low undercuts
        // neighbors' lows (an engulfing bar in flat data)
        let bars = bars_from_hl(&[(10.0, 9.5), (12.0, 8.0), (10.0, 9.5)]);
        let swings = find_swing_points(&bars, 1, bars.len());
        assert_eq!(swings.len(), 2);
        assert!(swings.iter().any(|s| s.is_high && s.price == 12.0));
        assert!(swings.iter().any(|s| !s.is_high && s.price == 8.0));
    }

    #[test]
    fn high_fractal_wins_over_low_on_same_bar() {
        // Engulfing middle bar qualifies both ways; fractal pass keeps the high
        let bars = bars_from_hl(&[
            (10.0, 9.5),
            (10.5, 9.4),
            (12.0, 8.0),
            (10.5, 9.4),
            (10.0, 9.5),
        ]);
        let fractals = find_fractals(&bars, bars.len());
        assert_eq!(fractals.len(), 1);
        assert!(fractals[0].is_high);
        assert_eq!(fractals[0].price, 12.0);
    }

    #[test]
    fn fractals_ordered_oldest_first() {
        let bars = bars_from_hl(&[
            (10.0, 9.0),
            (11.0, 10.0),
            (14.0, 13.0),
            (11.0, 10.0),
            (10.0, 8.0),
            (9.0, 7.0),
            (10.0, 8.5),
            (11.0, 9.0),
            (12.0, 10.0),
        ]);
        let fractals = find_fractals(&bars, bars.len());
        assert!(fractals.len() >= 2);
        assert!(fractals.windows(2).all(|w| w[0].bar_index < w[1].bar_index));
    }
}
