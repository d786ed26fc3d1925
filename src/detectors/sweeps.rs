//! Liquidity sweep (stop-hunt) detection
//!
//! A sweep is a bar whose extreme trades strictly beyond the extreme of a
//! window of preceding bars and whose close ends back on the original side
//! of that level. Sweeping the window high is a bearish signal, sweeping the
//! window low a bullish one. The primary and secondary roles of the strategy
//! are the same scan run with different [`SweepParams`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Bar, Direction};

/// Parameters for one sweep scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepParams {
    /// Bars in the window preceding each detection bar
    pub lookback: usize,
    /// How many of the most recent bars are candidate detection bars
    pub detection_window: usize,
    /// Require the detection bar's close back inside the swept level.
    /// Disabling keeps every breach, rejected or not.
    #[serde(default = "default_require_rejection")]
    pub require_rejection: bool,
}

fn default_require_rejection() -> bool {
    true
}

impl SweepParams {
    pub fn new(lookback: usize, detection_window: usize) -> Self {
        Self {
            lookback,
            detection_window,
            require_rejection: true,
        }
    }
}

/// A detected stop-hunt event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepEvent {
    /// Open time of the bar that confirmed the sweep
    pub time: DateTime<Utc>,
    /// The prior extreme that was swept
    pub swept_level: f64,
    /// Signal direction: a swept low is a bullish signal, a swept high bearish
    pub direction: Direction,
    /// Absolute index of the confirming (detection) bar
    pub confirmation_index: usize,
    pub wick_high: f64,
    pub wick_low: f64,
}

/// Scan the most recent `detection_window` bars for liquidity sweeps.
///
/// Results are ordered newest first. A series shorter than
/// `lookback + detection_window + 1` yields an empty vec.
pub fn find_sweeps(bars: &[Bar], params: &SweepParams) -> Vec<SweepEvent> {
    let mut sweeps = Vec::new();
    if params.lookback == 0 || bars.len() < params.lookback + params.detection_window + 1 {
        return sweeps;
    }

    for distance in 1..=params.detection_window {
        let index = bars.len() - distance;
        let detection = &bars[index];

        let window = &bars[index - params.lookback..index];
        let window_high = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
        let window_low = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);

        if detection.high > window_high
            && (!params.require_rejection || detection.close < window_high)
        {
            tracing::debug!(
                time = %detection.open_time,
                level = window_high,
                "bearish sweep (high swept)"
            );
            sweeps.push(SweepEvent {
                time: detection.open_time,
                swept_level: window_high,
                direction: Direction::Bearish,
                confirmation_index: index,
                wick_high: detection.high,
                wick_low: detection.low,
            });
        }

        if detection.low < window_low
            && (!params.require_rejection || detection.close > window_low)
        {
            tracing::debug!(
                time = %detection.open_time,
                level = window_low,
                "bullish sweep (low swept)"
            );
            sweeps.push(SweepEvent {
                time: detection.open_time,
                swept_level: window_low,
                direction: Direction::Bullish,
                confirmation_index: index,
                wick_high: detection.high,
                wick_low: detection.low,
            });
        }
    }

    sweeps
}
