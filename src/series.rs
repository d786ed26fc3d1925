//! Append-only, time-ordered bar collections
//!
//! One `BarSeries` per (symbol, timeframe) pair. The hosting runtime appends
//! a bar when it closes; the engine only reads. Bars are addressable both by
//! absolute index (oldest = 0) and by distance from the most recent closed
//! bar (`last(1)` = last closed bar), matching how the detectors reason about
//! recency.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Bar, Symbol};

/// Errors appending to a series
#[derive(Debug, Error)]
pub enum SeriesError {
    #[error("bar open time {new} is not later than the last bar's open time {last}")]
    OutOfOrder {
        new: DateTime<Utc>,
        last: DateTime<Utc>,
    },
}

/// Time-ordered collection of completed bars for one symbol and timeframe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarSeries {
    symbol: Symbol,
    /// Free-form timeframe label, e.g. "M15" or "H1"
    timeframe: String,
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(symbol: Symbol, timeframe: impl Into<String>) -> Self {
        Self {
            symbol,
            timeframe: timeframe.into(),
            bars: Vec::new(),
        }
    }

    /// Build a series from already-ordered bars (test fixtures, replays)
    pub fn from_bars(
        symbol: Symbol,
        timeframe: impl Into<String>,
        bars: Vec<Bar>,
    ) -> Result<Self, SeriesError> {
        let mut series = Self::new(symbol, timeframe);
        for bar in bars {
            series.push(bar)?;
        }
        Ok(series)
    }

    /// Append a closed bar. Open times must be strictly increasing.
    pub fn push(&mut self, bar: Bar) -> Result<(), SeriesError> {
        if let Some(last) = self.bars.last() {
            if bar.open_time <= last.open_time {
                return Err(SeriesError::OutOfOrder {
                    new: bar.open_time,
                    last: last.open_time,
                });
            }
        }
        self.bars.push(bar);
        Ok(())
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn timeframe(&self) -> &str {
        &self.timeframe
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// All bars, oldest first
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    /// Bar by absolute index (oldest = 0)
    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    /// Bar by distance from the most recent closed bar; `last(1)` is the
    /// last closed bar. `last(0)` is out of range by convention.
    pub fn last(&self, distance: usize) -> Option<&Bar> {
        if distance == 0 || distance > self.bars.len() {
            return None;
        }
        self.bars.get(self.bars.len() - distance)
    }

    /// Open time of the most recent closed bar
    pub fn last_open_time(&self) -> Option<DateTime<Utc>> {
        self.bars.last().map(|b| b.open_time)
    }

    /// Distance of an absolute index from the series end (1 = last bar)
    pub fn distance_from_end(&self, index: usize) -> Option<usize> {
        if index >= self.bars.len() {
            return None;
        }
        Some(self.bars.len() - index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn bar_at(minutes: i64, price: f64) -> Bar {
        let t = Utc::now() + Duration::minutes(minutes);
        Bar::new_unchecked(t, price, price + 1.0, price - 1.0, price)
    }

    #[test]
    fn push_enforces_time_order() {
        let mut series = BarSeries::new(Symbol::new("EURUSD"), "M15");
        series.push(bar_at(0, 100.0)).unwrap();
        series.push(bar_at(15, 101.0)).unwrap();
        assert!(matches!(
            series.push(bar_at(15, 102.0)),
            Err(SeriesError::OutOfOrder { .. })
        ));
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn last_counts_from_most_recent() {
        let mut series = BarSeries::new(Symbol::new("EURUSD"), "M15");
        for i in 0..5 {
            series.push(bar_at(i * 15, 100.0 + i as f64)).unwrap();
        }
        assert_eq!(series.last(1).unwrap().close, 104.0);
        assert_eq!(series.last(5).unwrap().close, 100.0);
        assert!(series.last(0).is_none());
        assert!(series.last(6).is_none());
    }

    #[test]
    fn distance_from_end_matches_last() {
        let mut series = BarSeries::new(Symbol::new("EURUSD"), "M15");
        for i in 0..4 {
            series.push(bar_at(i * 15, 100.0)).unwrap();
        }
        let d = series.distance_from_end(1).unwrap();
        assert_eq!(d, 3);
        assert_eq!(
            series.last(d).unwrap().open_time,
            series.get(1).unwrap().open_time
        );
        assert!(series.distance_from_end(4).is_none());
    }
}
