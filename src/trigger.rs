//! Trigger scan and trade-parameter calculation
//!
//! Runs once per bar close while armed. Fresh FVG tests and liquidity
//! sweeps in the armed direction become candidates; each candidate gets a
//! stop from its structural origin, a take-profit from the fractal ladder,
//! and a volume from account risk. Candidates failing any check are
//! discarded with a reason code and the episode stays armed; if several
//! pass, the most favorable entry wins.

use chrono::{DateTime, Utc};
use itertools::Itertools;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::config::TradeConfig;
use crate::detectors::imbalance::FvgZone;
use crate::detectors::swings::FractalPoint;
use crate::detectors::sweeps::SweepEvent;
use crate::risk::{position_volume, AccountSnapshot, InstrumentSpec};
use crate::types::{Bar, Direction, RejectReason};

/// A trigger candidate that survived every check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeCandidate {
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub risk_reward: f64,
    pub volume: f64,
    pub signal_time: DateTime<Utc>,
    pub origin_fvg: Option<FvgZone>,
    pub origin_sweep: Option<SweepEvent>,
}

/// Everything the calculator needs besides the trigger events themselves
#[derive(Debug, Clone, Copy)]
pub struct TriggerContext<'a> {
    pub direction: Direction,
    /// Execution-timeframe bars
    pub bars: &'a [Bar],
    pub exec_fractals: &'a [FractalPoint],
    pub higher_fractals: &'a [FractalPoint],
    pub account: AccountSnapshot,
    pub instrument: InstrumentSpec,
    pub trade: &'a TradeConfig,
    /// Bars before an FVG's first pattern bar searched for the impulse extreme
    pub impulse_lookback: usize,
}

impl<'a> TriggerContext<'a> {
    fn is_bullish(&self) -> bool {
        self.direction == Direction::Bullish
    }

    /// Stop base for an FVG trigger: the impulse extreme over the bars
    /// preceding the gap's first pattern bar, or that bar's own extreme when
    /// nothing precedes it.
    fn fvg_stop_base(&self, fvg: &FvgZone) -> f64 {
        let first = fvg.first_bar_index();
        let start = first.saturating_sub(self.impulse_lookback);
        let impulse = &self.bars[start..first];

        if impulse.is_empty() {
            let own = &self.bars[first];
            return if self.is_bullish() { own.low } else { own.high };
        }

        if self.is_bullish() {
            impulse.iter().map(|b| b.low).fold(f64::MAX, f64::min)
        } else {
            impulse.iter().map(|b| b.high).fold(f64::MIN, f64::max)
        }
    }

    /// Offset the stop base outward and validate it against the entry
    fn derive_stop(&self, entry: f64, base: f64) -> Result<f64, RejectReason> {
        if entry <= 0.0 {
            return Err(RejectReason::DegenerateEntry);
        }
        if base <= 0.0 || base < entry * 0.5 || base > entry * 1.5 {
            return Err(RejectReason::StopBaseOutOfRange);
        }

        let offset = self.trade.stop_offset_ticks as f64 * self.instrument.tick_size;
        let stop = if self.is_bullish() {
            base - offset
        } else {
            base + offset
        };

        let wrong_side = if self.is_bullish() {
            stop >= entry
        } else {
            stop <= entry
        };
        if wrong_side {
            return Err(RejectReason::StopOnWrongSide);
        }

        let risk = (entry - stop).abs();
        if risk < self.instrument.tick_size {
            return Err(RejectReason::RiskBelowTick);
        }
        let unit = self.instrument.strategic_unit(self.trade.strategic_unit_ticks);
        if risk / unit < self.trade.min_stop_units {
            return Err(RejectReason::StopBelowMinimum);
        }

        Ok(stop)
    }

    /// Walk the fractal ladder outward from the entry and take the first
    /// target whose reward/risk lands in the configured band.
    fn choose_target(&self, entry: f64, risk: f64) -> Result<(f64, f64), RejectReason> {
        let bullish = self.is_bullish();
        let beyond_entry = |f: &&FractalPoint| {
            if bullish {
                f.is_high && f.price > entry
            } else {
                !f.is_high && f.price < entry
            }
        };

        let ladder = self
            .exec_fractals
            .iter()
            .chain(self.higher_fractals.iter())
            .filter(beyond_entry)
            .sorted_by_key(|f| OrderedFloat((f.price - entry).abs()));

        for fractal in ladder {
            let reward = (fractal.price - entry).abs();
            if reward < self.instrument.tick_size {
                continue;
            }
            let rr = reward / risk;
            if rr >= self.trade.min_rr && rr <= self.trade.max_rr {
                return Ok((fractal.price, rr));
            }
        }

        Err(RejectReason::NoQualifyingTarget)
    }

    fn finish_candidate(
        &self,
        entry: f64,
        base: f64,
        signal_time: DateTime<Utc>,
        origin_fvg: Option<&FvgZone>,
        origin_sweep: Option<&SweepEvent>,
    ) -> Result<TradeCandidate, RejectReason> {
        let stop = self.derive_stop(entry, base)?;
        let risk = (entry - stop).abs();
        let (target, rr) = self.choose_target(entry, risk)?;
        let volume = position_volume(
            &self.account,
            &self.instrument,
            entry,
            stop,
            self.trade.strategic_unit_ticks,
        )?;

        Ok(TradeCandidate {
            entry_price: entry,
            stop_loss: stop,
            take_profit: target,
            risk_reward: rr,
            volume,
            signal_time,
            origin_fvg: origin_fvg.cloned(),
            origin_sweep: origin_sweep.cloned(),
        })
    }

    /// Full parameter calculation for a tested-FVG trigger
    pub fn evaluate_fvg(&self, fvg: &FvgZone) -> Result<TradeCandidate, RejectReason> {
        if fvg.top == fvg.bottom {
            return Err(RejectReason::DegenerateEntry);
        }
        let entry = if self.is_bullish() { fvg.top } else { fvg.bottom };
        let test_index = fvg.test_index.ok_or(RejectReason::DegenerateEntry)?;
        let signal_time = self.bars[test_index].open_time;
        let base = self.fvg_stop_base(fvg);

        self.finish_candidate(entry, base, signal_time, Some(fvg), None)
    }

    /// Full parameter calculation for a liquidity-sweep trigger
    pub fn evaluate_sweep(&self, sweep: &SweepEvent) -> Result<TradeCandidate, RejectReason> {
        let entry = sweep.swept_level;
        let base = if self.is_bullish() {
            sweep.wick_low
        } else {
            sweep.wick_high
        };

        self.finish_candidate(entry, base, sweep.time, None, Some(sweep))
    }

    /// Whether an absolute bar index falls inside the trigger recency window
    fn is_fresh(&self, index: usize) -> bool {
        let distance = self.bars.len() - index;
        distance >= 1 && distance <= self.trade.max_signal_age_bars
    }

    /// Evaluate every fresh trigger in the armed direction and pick the most
    /// favorable survivor: lowest entry for bullish, highest for bearish,
    /// ties broken by higher reward/risk.
    pub fn scan(&self, fvgs: &[FvgZone], sweeps: &[SweepEvent]) -> Option<TradeCandidate> {
        let mut candidates = Vec::new();

        for fvg in fvgs {
            let direction_matches = if self.is_bullish() {
                fvg.is_bullish
            } else {
                !fvg.is_bullish
            };
            let fresh_test = fvg
                .test_index
                .map(|i| fvg.is_tested && self.is_fresh(i))
                .unwrap_or(false);
            if !direction_matches || !fresh_test {
                continue;
            }

            match self.evaluate_fvg(fvg) {
                Ok(candidate) => candidates.push(candidate),
                Err(reason) => {
                    tracing::debug!(%reason, top = fvg.top, bottom = fvg.bottom, "fvg trigger rejected")
                }
            }
        }

        for sweep in sweeps {
            if sweep.direction != self.direction || !self.is_fresh(sweep.confirmation_index) {
                continue;
            }

            match self.evaluate_sweep(sweep) {
                Ok(candidate) => candidates.push(candidate),
                Err(reason) => {
                    tracing::debug!(%reason, level = sweep.swept_level, "sweep trigger rejected")
                }
            }
        }

        if candidates.len() > 1 {
            tracing::debug!(count = candidates.len(), "multiple passing triggers, picking best");
        }

        if self.is_bullish() {
            candidates.into_iter().min_by_key(|c| {
                (
                    OrderedFloat(c.entry_price),
                    std::cmp::Reverse(OrderedFloat(c.risk_reward)),
                )
            })
        } else {
            candidates.into_iter().max_by_key(|c| {
                (
                    OrderedFloat(c.entry_price),
                    OrderedFloat(c.risk_reward),
                )
            })
        }
    }
}
