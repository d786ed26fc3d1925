//! Core data types used across the engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::arming::ArmingPattern;
use crate::detectors::imbalance::FvgZone;
use crate::detectors::sweeps::SweepEvent;

/// Validation errors for bar data
#[derive(Debug, Error)]
pub enum BarValidationError {
    #[error("high ({high}) must be >= low ({low})")]
    HighLessThanLow { high: f64, low: f64 },

    #[error("open ({open}) must be between low ({low}) and high ({high})")]
    OpenOutOfRange { open: f64, low: f64, high: f64 },

    #[error("close ({close}) must be between low ({low}) and high ({high})")]
    CloseOutOfRange { close: f64, low: f64, high: f64 },

    #[error("prices must be positive: open={open}, high={high}, low={low}, close={close}")]
    NonPositivePrice {
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },
}

/// A single completed price bar. Immutable once closed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Bar {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Bar {
    /// Create a new bar with validation
    pub fn new(
        open_time: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    ) -> Result<Self, BarValidationError> {
        let bar = Self {
            open_time,
            open,
            high,
            low,
            close,
        };
        bar.validate()?;
        Ok(bar)
    }

    /// Create a bar without validation (for trusted feeds or test fixtures)
    pub fn new_unchecked(
        open_time: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    ) -> Self {
        Self {
            open_time,
            open,
            high,
            low,
            close,
        }
    }

    /// Validate the bar data
    pub fn validate(&self) -> Result<(), BarValidationError> {
        if self.open <= 0.0 || self.high <= 0.0 || self.low <= 0.0 || self.close <= 0.0 {
            return Err(BarValidationError::NonPositivePrice {
                open: self.open,
                high: self.high,
                low: self.low,
                close: self.close,
            });
        }

        if self.high < self.low {
            return Err(BarValidationError::HighLessThanLow {
                high: self.high,
                low: self.low,
            });
        }

        if self.open < self.low || self.open > self.high {
            return Err(BarValidationError::OpenOutOfRange {
                open: self.open,
                low: self.low,
                high: self.high,
            });
        }

        if self.close < self.low || self.close > self.high {
            return Err(BarValidationError::CloseOutOfRange {
                close: self.close,
                low: self.low,
                high: self.high,
            });
        }

        Ok(())
    }

    /// Whether the bar's [low, high] range intersects the given price band
    pub fn intersects(&self, bottom: f64, top: f64) -> bool {
        self.low <= top && self.high >= bottom
    }
}

/// Instrument symbol using Arc<str> for cheap cloning
///
/// Symbols are cloned into every emitted intent and log line; Arc<str>
/// keeps that O(1) instead of a heap copy per clone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(#[serde(with = "arc_str_serde")] std::sync::Arc<str>);

/// Custom serde for Arc<str>
mod arc_str_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::sync::Arc;

    pub fn serialize<S>(value: &Arc<str>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Arc<str>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Arc::from(s.as_str()))
    }
}

impl Symbol {
    pub fn new(s: impl AsRef<str>) -> Self {
        Symbol(std::sync::Arc::from(s.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Bullish,
    Bearish,
}

impl Direction {
    /// The opposite direction
    pub fn opposite(self) -> Self {
        match self {
            Direction::Bullish => Direction::Bearish,
            Direction::Bearish => Direction::Bullish,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Bullish => write!(f, "bullish"),
            Direction::Bearish => write!(f, "bearish"),
        }
    }
}

/// Why a trigger candidate was discarded during parameter calculation.
///
/// Candidate-local: a rejection never aborts evaluation of the remaining
/// candidates or of subsequent bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum RejectReason {
    #[error("entry price is zero or degenerate")]
    DegenerateEntry,

    #[error("stop base price is zero, negative, or absurd relative to entry")]
    StopBaseOutOfRange,

    #[error("stop loss is on the wrong side of (or equal to) the entry price")]
    StopOnWrongSide,

    #[error("risk distance is below one tick")]
    RiskBelowTick,

    #[error("risk distance is below the minimum stop distance")]
    StopBelowMinimum,

    #[error("no fractal target satisfies the risk/reward band")]
    NoQualifyingTarget,

    #[error("computed volume is zero or below the instrument minimum")]
    VolumeBelowMinimum,
}

/// Why an armed episode ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisarmReason {
    /// A trade intent was emitted
    IntentEmitted,
    /// Elapsed bars since arming exceeded the configured maximum
    Timeout,
    /// The higher-timeframe context evaluation changed
    ContextChanged,
}

impl std::fmt::Display for DisarmReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisarmReason::IntentEmitted => write!(f, "intent emitted"),
            DisarmReason::Timeout => write!(f, "timeout"),
            DisarmReason::ContextChanged => write!(f, "context changed"),
        }
    }
}

/// A fully parameterized trade idea, emitted at most once per armed episode.
///
/// Emission immediately ends the episode; translating the intent into an
/// actual order (session filters, trade-count ceilings, routing) is the
/// hosting strategy's job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeIntent {
    pub symbol: Symbol,
    pub direction: Direction,
    /// Entry hint derived from the trigger's structural origin; the host
    /// fills at market and may see a slightly different price.
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    /// reward / risk, always in [min_rr, max_rr] of the config
    pub risk_reward: f64,
    /// Tradable volume in instrument units, floored to the volume step
    pub volume: f64,
    pub pattern: ArmingPattern,
    pub signal_time: DateTime<Utc>,
    /// Set when the trigger was an FVG test
    pub origin_fvg: Option<FvgZone>,
    /// Set when the trigger was a liquidity sweep
    pub origin_sweep: Option<SweepEvent>,
}
