//! Engine configuration
//!
//! Values only, never behavior: lookback lengths, thresholds, the
//! risk/reward band and the armed-duration ceiling. Loadable from a JSON
//! file; every field has a default matching the strategy's shipped
//! parameters.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::context::ContextConfig;
use crate::detectors::sweeps::SweepParams;

/// Swing and fractal detection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureConfig {
    /// Neighbor count on each side for swing point detection
    pub swing_strength: usize,
    /// Bars scanned for swing points
    pub swing_lookback: usize,
    /// Bars scanned for take-profit fractals (strength is fixed at 2)
    pub fractal_lookback: usize,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            swing_strength: 2,
            swing_lookback: 30,
            fractal_lookback: 30,
        }
    }
}

/// Fair value gap parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FvgConfig {
    /// Bars scanned for gap formations during arming
    pub lookback: usize,
    /// Recent bars checked when marking a zone tested
    pub test_window: usize,
    /// Bars before a zone's first pattern bar searched for the stop-loss
    /// impulse extreme
    pub impulse_lookback: usize,
}

impl Default for FvgConfig {
    fn default() -> Self {
        Self {
            lookback: 20,
            test_window: 3,
            impulse_lookback: 10,
        }
    }
}

/// Trigger and trade-parameter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeConfig {
    /// Bars scanned for trigger-candidate gaps while armed
    pub entry_fvg_lookback: usize,
    /// A trigger event older than this many bars is stale
    pub max_signal_age_bars: usize,
    /// Stop-loss offset beyond the structural base, in ticks
    pub stop_offset_ticks: u32,
    /// Ticks per strategic unit used for stop validation and sizing
    pub strategic_unit_ticks: u32,
    /// Minimum stop distance in strategic units
    pub min_stop_units: f64,
    pub min_rr: f64,
    pub max_rr: f64,
    /// Armed episodes end after this many bars without a trigger
    pub max_armed_duration_bars: usize,
}

impl Default for TradeConfig {
    fn default() -> Self {
        Self {
            entry_fvg_lookback: 30,
            max_signal_age_bars: 1,
            stop_offset_ticks: 15,
            strategic_unit_ticks: 10,
            min_stop_units: 1.0,
            min_rr: 1.5,
            max_rr: 3.0,
            max_armed_duration_bars: 10,
        }
    }
}

fn default_primary_sweeps() -> SweepParams {
    SweepParams::new(20, 5)
}

fn default_secondary_sweeps() -> SweepParams {
    SweepParams::new(10, 3)
}

/// Full configuration surface of the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub structure: StructureConfig,
    #[serde(default)]
    pub fvg: FvgConfig,
    /// Sweep scan feeding the arming stage's first event
    #[serde(default = "default_primary_sweeps")]
    pub primary_sweeps: SweepParams,
    /// Sweep scan feeding confirmations and entry triggers
    #[serde(default = "default_secondary_sweeps")]
    pub secondary_sweeps: SweepParams,
    #[serde(default)]
    pub trade: TradeConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            context: ContextConfig::default(),
            structure: StructureConfig::default(),
            fvg: FvgConfig::default(),
            primary_sweeps: default_primary_sweeps(),
            secondary_sweeps: default_secondary_sweeps(),
            trade: TradeConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let config: EngineConfig =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;
        Ok(config)
    }
}
