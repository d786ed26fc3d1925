//! Position sizing from account risk
//!
//! Volume is derived from the account risk amount divided by the stop
//! distance expressed in "strategic" units (a configured multiple of the
//! instrument's minimum price increment), then floored to the instrument's
//! tradable volume step. The step floor runs in `Decimal` arithmetic; a
//! binary-float floor of e.g. `2.0 / 0.1` can land one step low.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::RejectReason;

/// Account state at evaluation time, in account currency
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub equity: f64,
    /// Fraction of equity risked per trade (0.01 = 1%)
    pub risk_per_trade: f64,
}

impl AccountSnapshot {
    /// Monetary amount put at risk by one trade
    pub fn risk_amount(&self) -> f64 {
        self.equity * self.risk_per_trade
    }
}

/// Instrument metadata supplied by the hosting runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InstrumentSpec {
    /// Minimum price increment
    pub tick_size: f64,
    /// Monetary value of one tick move per unit of volume
    pub tick_value: f64,
    pub volume_min: f64,
    pub volume_max: f64,
    pub volume_step: f64,
}

impl InstrumentSpec {
    /// Price size of one strategic unit
    pub fn strategic_unit(&self, strategic_unit_ticks: u32) -> f64 {
        let unit = strategic_unit_ticks as f64 * self.tick_size;
        if unit == 0.0 {
            self.tick_size
        } else {
            unit
        }
    }

    /// Monetary value of one strategic-unit move per unit of volume
    pub fn strategic_unit_value(&self, strategic_unit_ticks: u32) -> f64 {
        self.tick_value * strategic_unit_ticks.max(1) as f64
    }
}

/// Floor a raw volume to the instrument's volume step.
pub fn floor_to_step(volume: f64, step: f64) -> f64 {
    if step <= 0.0 {
        return volume.max(0.0);
    }
    let v = Decimal::from_f64(volume).unwrap_or(Decimal::ZERO);
    let s = Decimal::from_f64(step).unwrap_or(Decimal::ZERO);
    if s.is_zero() || v < s {
        return 0.0;
    }
    ((v / s).floor() * s).to_f64().unwrap_or(0.0)
}

/// Compute the tradable volume for a trade risking `|entry - stop|`.
///
/// Rejects when the floored volume is zero or below the instrument minimum;
/// caps at the instrument maximum. The caller has already validated the stop
/// distance itself.
pub fn position_volume(
    account: &AccountSnapshot,
    instrument: &InstrumentSpec,
    entry_price: f64,
    stop_price: f64,
    strategic_unit_ticks: u32,
) -> Result<f64, RejectReason> {
    let stop_distance = (entry_price - stop_price).abs();
    let unit = instrument.strategic_unit(strategic_unit_ticks);
    let unit_value = instrument.strategic_unit_value(strategic_unit_ticks);
    if stop_distance == 0.0 || unit == 0.0 || unit_value <= 0.0 {
        return Err(RejectReason::VolumeBelowMinimum);
    }

    let stop_in_units = stop_distance / unit;
    let raw_volume = account.risk_amount() / (stop_in_units * unit_value);
    if !raw_volume.is_finite() || raw_volume <= 0.0 {
        return Err(RejectReason::VolumeBelowMinimum);
    }

    let mut volume = floor_to_step(raw_volume, instrument.volume_step);
    if volume <= 0.0 || volume < instrument.volume_min {
        tracing::debug!(raw_volume, volume, min = instrument.volume_min, "volume below minimum");
        return Err(RejectReason::VolumeBelowMinimum);
    }
    if volume > instrument.volume_max {
        volume = instrument.volume_max;
    }

    Ok(volume)
}
