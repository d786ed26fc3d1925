//! Higher-timeframe context classification
//!
//! Directional bias from the percentage change between the most recently
//! closed higher-timeframe bar and the close `lookback_bars` earlier.
//! Recomputed whenever a new higher-timeframe bar closes; recomputing more
//! often returns the same verdict.

use serde::{Deserialize, Serialize};

use crate::types::{Bar, Direction};

/// Context classifier parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// How many higher-timeframe bars back the reference close sits
    pub lookback_bars: usize,
    /// Minimum absolute percentage change for a directional verdict
    pub min_change_pct: f64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            lookback_bars: 8,
            min_change_pct: 0.2,
        }
    }
}

/// Directional bias of the higher timeframe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketContext {
    Bullish,
    Bearish,
    /// Change magnitude below the threshold
    Ranging,
    /// Fewer bars than the lookback requires
    InsufficientData,
    /// Reference close was exactly zero (degenerate data); never tradable
    ZeroReference,
}

impl MarketContext {
    /// The trade direction this context permits, if any
    pub fn direction(self) -> Option<Direction> {
        match self {
            MarketContext::Bullish => Some(Direction::Bullish),
            MarketContext::Bearish => Some(Direction::Bearish),
            _ => None,
        }
    }

    pub fn is_directional(self) -> bool {
        self.direction().is_some()
    }
}

impl std::fmt::Display for MarketContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarketContext::Bullish => write!(f, "bullish"),
            MarketContext::Bearish => write!(f, "bearish"),
            MarketContext::Ranging => write!(f, "ranging"),
            MarketContext::InsufficientData => write!(f, "insufficient data"),
            MarketContext::ZeroReference => write!(f, "zero reference price"),
        }
    }
}

/// Classify the higher-timeframe bias.
pub fn classify(bars: &[Bar], config: &ContextConfig) -> MarketContext {
    let n = config.lookback_bars;
    if n == 0 || bars.len() < n + 1 {
        return MarketContext::InsufficientData;
    }

    let recent_close = bars[bars.len() - 1].close;
    let past_close = bars[bars.len() - 1 - n].close;

    if past_close == 0.0 {
        return MarketContext::ZeroReference;
    }

    let change_pct = (recent_close - past_close) / past_close * 100.0;

    let verdict = if change_pct >= config.min_change_pct {
        MarketContext::Bullish
    } else if change_pct <= -config.min_change_pct {
        MarketContext::Bearish
    } else {
        MarketContext::Ranging
    };

    tracing::debug!(%verdict, change_pct, lookback = n, "context classified");
    verdict
}
