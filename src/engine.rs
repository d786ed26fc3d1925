//! Engine orchestration
//!
//! One `Engine` per symbol. The hosting runtime calls `on_bar_closed` once
//! per closed execution-timeframe bar; the engine re-reads the bar history,
//! keeps its single piece of run state (armed or idle, last context), and
//! returns at most one trade intent per armed episode. Instances share
//! nothing, so hosts may evaluate symbols in parallel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::arming::{identify_arming, ArmingState};
use crate::config::EngineConfig;
use crate::context::{classify, MarketContext};
use crate::detectors::imbalance::{check_fvg_test, find_fvgs, FvgZone};
use crate::detectors::sweeps::{find_sweeps, SweepEvent};
use crate::detectors::swings::{find_fractals, find_swing_points, FractalPoint, SwingPoint};
use crate::risk::{AccountSnapshot, InstrumentSpec};
use crate::series::BarSeries;
use crate::trigger::TriggerContext;
use crate::types::{DisarmReason, Symbol, TradeIntent};

/// Run state carried across bar-close events
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineState {
    pub arming: ArmingState,
    /// Verdict of the most recent context evaluation
    pub last_context: Option<MarketContext>,
    /// Open time of the higher-timeframe bar behind that verdict
    pub last_context_bar_time: Option<DateTime<Utc>>,
    /// Why the most recent armed episode ended
    pub last_disarm: Option<DisarmReason>,
}

/// The catalogued market-structure events at one point in time, for
/// host-side diagnostics and chart annotation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureSnapshot {
    pub swings: Vec<SwingPoint>,
    pub fractals: Vec<FractalPoint>,
    pub higher_fractals: Vec<FractalPoint>,
    pub fvgs: Vec<FvgZone>,
    pub primary_sweeps: Vec<SweepEvent>,
    pub secondary_sweeps: Vec<SweepEvent>,
}

/// Signal-detection and trade-parameter engine for one symbol
#[derive(Debug, Clone)]
pub struct Engine {
    symbol: Symbol,
    config: EngineConfig,
    instrument: InstrumentSpec,
    state: EngineState,
}

impl Engine {
    pub fn new(symbol: Symbol, config: EngineConfig, instrument: InstrumentSpec) -> Self {
        Self {
            symbol,
            config,
            instrument,
            state: EngineState::default(),
        }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// The most recent context verdict
    pub fn context(&self) -> MarketContext {
        self.state
            .last_context
            .unwrap_or(MarketContext::InsufficientData)
    }

    fn disarm(&mut self, reason: DisarmReason) {
        if self.state.arming.is_armed() {
            tracing::info!(symbol = %self.symbol, %reason, "armed state reset");
        }
        self.state.arming = ArmingState::Idle;
        self.state.last_disarm = Some(reason);
    }

    /// Re-classify the higher-timeframe context when a new bar has closed
    /// there. A changed verdict while armed forces re-arming.
    fn refresh_context(&mut self, higher_tf: &BarSeries) {
        let latest = higher_tf.last_open_time();
        if self.state.last_context.is_some() && latest == self.state.last_context_bar_time {
            return;
        }

        let verdict = classify(higher_tf.bars(), &self.config.context);
        let changed = self
            .state
            .last_context
            .map(|previous| previous != verdict)
            .unwrap_or(false);

        self.state.last_context = Some(verdict);
        self.state.last_context_bar_time = latest;

        if changed && self.state.arming.is_armed() {
            self.disarm(DisarmReason::ContextChanged);
        }
    }

    /// Trigger scan while armed; emits the winning candidate as an intent
    fn evaluate_triggers(
        &self,
        execution: &BarSeries,
        higher_tf: &BarSeries,
        account: &AccountSnapshot,
    ) -> Option<TradeIntent> {
        let setup = self.state.arming.setup()?;
        let bars = execution.bars();

        let mut entry_fvgs = find_fvgs(bars, self.config.trade.entry_fvg_lookback);
        for zone in &mut entry_fvgs {
            check_fvg_test(zone, bars, self.config.trade.max_signal_age_bars);
        }
        let fresh_sweeps = find_sweeps(bars, &self.config.secondary_sweeps);

        let exec_fractals = find_fractals(bars, self.config.structure.fractal_lookback);
        let higher_fractals =
            find_fractals(higher_tf.bars(), self.config.structure.fractal_lookback);

        let ctx = TriggerContext {
            direction: setup.direction,
            bars,
            exec_fractals: &exec_fractals,
            higher_fractals: &higher_fractals,
            account: *account,
            instrument: self.instrument,
            trade: &self.config.trade,
            impulse_lookback: self.config.fvg.impulse_lookback,
        };

        let best = ctx.scan(&entry_fvgs, &fresh_sweeps)?;

        let intent = TradeIntent {
            symbol: self.symbol.clone(),
            direction: setup.direction,
            entry_price: best.entry_price,
            stop_loss: best.stop_loss,
            take_profit: best.take_profit,
            risk_reward: best.risk_reward,
            volume: best.volume,
            pattern: setup.pattern,
            signal_time: best.signal_time,
            origin_fvg: best.origin_fvg,
            origin_sweep: best.origin_sweep,
        };
        tracing::info!(
            symbol = %self.symbol,
            direction = %intent.direction,
            entry = intent.entry_price,
            stop = intent.stop_loss,
            target = intent.take_profit,
            rr = intent.risk_reward,
            volume = intent.volume,
            "trade intent emitted"
        );
        Some(intent)
    }

    /// Detector battery plus arming search while idle
    fn look_for_arming(&mut self, execution: &BarSeries) {
        let context = self.context();
        if !context.is_directional() {
            return;
        }
        let bars = execution.bars();

        let mut fvgs = find_fvgs(bars, self.config.fvg.lookback);
        for zone in &mut fvgs {
            check_fvg_test(zone, bars, self.config.fvg.test_window);
        }
        let primary = find_sweeps(bars, &self.config.primary_sweeps);
        let secondary = find_sweeps(bars, &self.config.secondary_sweeps);

        if let Some(setup) = identify_arming(&primary, &secondary, &fvgs, context, bars) {
            self.state.arming = ArmingState::Armed(setup);
        }
    }

    /// Evaluate one closed execution-timeframe bar.
    ///
    /// Returns a trade intent at most once per armed episode. Arming and
    /// triggering never happen in the same evaluation.
    pub fn on_bar_closed(
        &mut self,
        execution: &BarSeries,
        higher_tf: &BarSeries,
        account: &AccountSnapshot,
    ) -> Option<TradeIntent> {
        if execution.is_empty() {
            return None;
        }

        self.refresh_context(higher_tf);

        if let Some(armed_at_len) = self.state.arming.setup().map(|s| s.armed_at_len) {
            let elapsed = execution.len().saturating_sub(armed_at_len);
            if elapsed > self.config.trade.max_armed_duration_bars {
                self.disarm(DisarmReason::Timeout);
                // fall through to the idle arming search on this bar
            } else {
                let intent = self.evaluate_triggers(execution, higher_tf, account);
                if intent.is_some() {
                    self.disarm(DisarmReason::IntentEmitted);
                }
                return intent;
            }
        }

        self.look_for_arming(execution);
        None
    }

    /// Catalogue the current market-structure events without touching run
    /// state.
    pub fn structure_snapshot(
        &self,
        execution: &BarSeries,
        higher_tf: &BarSeries,
    ) -> StructureSnapshot {
        let bars = execution.bars();

        let mut fvgs = find_fvgs(bars, self.config.fvg.lookback);
        for zone in &mut fvgs {
            check_fvg_test(zone, bars, self.config.fvg.test_window);
        }

        StructureSnapshot {
            swings: find_swing_points(
                bars,
                self.config.structure.swing_strength,
                self.config.structure.swing_lookback,
            ),
            fractals: find_fractals(bars, self.config.structure.fractal_lookback),
            higher_fractals: find_fractals(
                higher_tf.bars(),
                self.config.structure.fractal_lookback,
            ),
            fvgs,
            primary_sweeps: find_sweeps(bars, &self.config.primary_sweeps),
            secondary_sweeps: find_sweeps(bars, &self.config.secondary_sweeps),
        }
    }
}
