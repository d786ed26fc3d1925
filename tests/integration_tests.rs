//! Integration tests for the order-flow engine
//!
//! These drive the engine bar by bar through crafted histories and verify
//! the full arming -> trigger -> intent pipeline.

use approx::assert_relative_eq;
use chrono::{Duration, Utc};

use orderflow_engine::{
    AccountSnapshot, ArmingPattern, Bar, BarSeries, Direction, DisarmReason, Engine, EngineConfig,
    InstrumentSpec, MarketContext, Symbol, TradeIntent,
};

// =============================================================================
// Test Utilities
// =============================================================================

fn instrument() -> InstrumentSpec {
    InstrumentSpec {
        tick_size: 0.01,
        tick_value: 0.01,
        volume_min: 1.0,
        volume_max: 1_000_000.0,
        volume_step: 1.0,
    }
}

fn account() -> AccountSnapshot {
    AccountSnapshot {
        equity: 100_000.0,
        risk_per_trade: 0.01,
    }
}

/// Higher-timeframe series from plain closes, one bar per hour
fn higher_series(closes: &[f64]) -> BarSeries {
    let start = Utc::now() - Duration::days(30);
    let mut series = BarSeries::new(Symbol::new("EURUSD"), "H1");
    for (i, &close) in closes.iter().enumerate() {
        series
            .push(Bar::new_unchecked(
                start + Duration::hours(i as i64),
                close,
                close + 0.5,
                close - 0.5,
                close,
            ))
            .unwrap();
    }
    series
}

fn bullish_higher() -> BarSeries {
    let closes: Vec<f64> = (0..12).map(|i| 100.0 + i as f64).collect();
    higher_series(&closes)
}

fn ranging_higher() -> BarSeries {
    higher_series(&[100.0, 100.05, 99.95, 100.02, 100.0, 100.04, 99.98, 100.01, 100.0, 100.03,
        99.97, 100.0])
}

/// Execution-timeframe history that arms the engine via LS+LS on bar 26 and
/// offers a bullish FVG test trigger on bar 30:
///
/// - bars 0..=23: quiet range, with a take-profit fractal spike at bar 3
/// - bar 24: primary liquidity sweep (undercuts the range low, closes back)
/// - bar 26: secondary sweep (undercuts bar 24's wick, closes back)
/// - bars 27..=29: impulse leaving a bullish gap between bar 27's high
///   (100.0) and bar 29's low (100.4)
/// - bar 30: dips into the gap and closes on its top
fn trigger_scenario_rows() -> Vec<(f64, f64, f64, f64)> {
    let mut rows: Vec<(f64, f64, f64, f64)> = Vec::new();
    for i in 0..24 {
        if i == 3 {
            rows.push((99.5, 107.0, 99.0, 99.8)); // fractal spike
        } else {
            rows.push((99.5, 100.0, 99.0, 99.5));
        }
    }
    rows.push((99.4, 99.9, 98.5, 99.5)); // 24: primary sweep
    rows.push((99.5, 100.0, 99.0, 99.5)); // 25
    rows.push((99.4, 99.9, 98.3, 99.4)); // 26: secondary sweep
    rows.push((99.5, 100.0, 99.2, 99.9)); // 27: gap bar 1
    rows.push((100.0, 100.9, 99.9, 100.8)); // 28: gap bar 2
    rows.push((100.9, 101.3, 100.4, 101.2)); // 29: gap bar 3
    rows.push((101.0, 101.1, 100.3, 100.4)); // 30: gap test
    rows
}

/// Feed rows one bar at a time, collecting any emitted intents
fn drive(
    engine: &mut Engine,
    rows: &[(f64, f64, f64, f64)],
    higher: &BarSeries,
    account: &AccountSnapshot,
) -> Vec<(usize, TradeIntent)> {
    let start = Utc::now();
    let mut execution = BarSeries::new(engine.symbol().clone(), "M15");
    let mut intents = Vec::new();

    for (i, &(open, high, low, close)) in rows.iter().enumerate() {
        execution
            .push(Bar::new_unchecked(
                start + Duration::minutes(15 * i as i64),
                open,
                high,
                low,
                close,
            ))
            .unwrap();
        if let Some(intent) = engine.on_bar_closed(&execution, higher, account) {
            intents.push((i, intent));
        }
    }
    intents
}

fn engine() -> Engine {
    Engine::new(Symbol::new("EURUSD"), EngineConfig::default(), instrument())
}

// =============================================================================
// Scenario: bullish FVG test trigger
// =============================================================================

#[test]
fn bullish_fvg_test_trigger_emits_intent_then_idles() {
    let mut engine = engine();
    let higher = bullish_higher();
    let intents = drive(&mut engine, &trigger_scenario_rows(), &higher, &account());

    assert_eq!(intents.len(), 1, "exactly one intent per armed episode");
    let (bar, intent) = &intents[0];
    assert_eq!(*bar, 30, "intent fires on the gap-test bar");

    assert_eq!(intent.direction, Direction::Bullish);
    assert_eq!(intent.pattern, ArmingPattern::SweepSweep);
    // entry on the gap top, where the test bar closed
    assert_relative_eq!(intent.entry_price, 100.4);
    // stop under the impulse low (98.3) by the 15-tick offset
    assert_relative_eq!(intent.stop_loss, 98.15, epsilon = 1e-9);
    assert_relative_eq!(intent.take_profit, 107.0);
    // roughly 3x the stop distance above entry
    assert_relative_eq!(intent.risk_reward, 6.6 / 2.25, epsilon = 1e-6);
    assert_relative_eq!(intent.volume, 444.0);
    assert!(intent.origin_fvg.is_some());
    assert!(intent.origin_sweep.is_none());

    // the episode is over
    assert!(!engine.state().arming.is_armed());
    assert_eq!(engine.state().last_disarm, Some(DisarmReason::IntentEmitted));
}

#[test]
fn emitted_intent_respects_rr_band() {
    let mut engine = engine();
    let higher = bullish_higher();
    let config = engine.config().clone();
    let intents = drive(&mut engine, &trigger_scenario_rows(), &higher, &account());

    for (_, intent) in &intents {
        assert!(
            intent.risk_reward >= config.trade.min_rr - 1e-9
                && intent.risk_reward <= config.trade.max_rr + 1e-9,
            "risk/reward {} outside [{}, {}]",
            intent.risk_reward,
            config.trade.min_rr,
            config.trade.max_rr
        );
    }
}

// =============================================================================
// Scenario: armed timeout
// =============================================================================

#[test]
fn armed_timeout_expires_without_intent() {
    let mut engine = engine();
    let higher = bullish_higher();

    // arm via the sweeps, then go quiet past the 10-bar ceiling
    let mut rows: Vec<(f64, f64, f64, f64)> = trigger_scenario_rows()[..27].to_vec();
    for _ in 0..11 {
        rows.push((99.5, 100.0, 99.0, 99.5));
    }

    let intents = drive(&mut engine, &rows, &higher, &account());
    assert!(intents.is_empty());
    assert!(!engine.state().arming.is_armed());
    assert_eq!(engine.state().last_disarm, Some(DisarmReason::Timeout));
}

#[test]
fn armed_state_survives_until_the_deadline() {
    let mut engine = engine();
    let higher = bullish_higher();

    // ten quiet bars after arming: the episode is still alive
    let mut rows: Vec<(f64, f64, f64, f64)> = trigger_scenario_rows()[..27].to_vec();
    for _ in 0..10 {
        rows.push((99.5, 100.0, 99.0, 99.5));
    }

    let intents = drive(&mut engine, &rows, &higher, &account());
    assert!(intents.is_empty());
    assert!(engine.state().arming.is_armed());
}

// =============================================================================
// Scenario: non-directional contexts block arming
// =============================================================================

#[test]
fn zero_reference_context_blocks_arming() {
    let mut engine = engine();
    // the reference close 8 bars back is exactly zero
    let mut closes: Vec<f64> = (0..12).map(|i| 100.0 + i as f64).collect();
    closes[3] = 0.0;
    let higher = higher_series(&closes);

    let intents = drive(&mut engine, &trigger_scenario_rows(), &higher, &account());
    assert_eq!(engine.context(), MarketContext::ZeroReference);
    assert!(intents.is_empty());
    assert!(!engine.state().arming.is_armed());
}

#[test]
fn ranging_context_never_arms() {
    let mut engine = engine();
    let higher = ranging_higher();

    let intents = drive(&mut engine, &trigger_scenario_rows(), &higher, &account());
    assert_eq!(engine.context(), MarketContext::Ranging);
    assert!(intents.is_empty());
    assert!(!engine.state().arming.is_armed());
}

#[test]
fn insufficient_higher_data_never_arms() {
    let mut engine = engine();
    let higher = higher_series(&[100.0, 100.5, 101.0]);

    let intents = drive(&mut engine, &trigger_scenario_rows(), &higher, &account());
    assert_eq!(engine.context(), MarketContext::InsufficientData);
    assert!(intents.is_empty());
}

// =============================================================================
// Scenario: volume floor
// =============================================================================

#[test]
fn volume_floor_keeps_episode_armed() {
    let mut engine = engine();
    let higher = bullish_higher();
    // risk amount of 0.10 rounds to zero tradable volume
    let dust = AccountSnapshot {
        equity: 100.0,
        risk_per_trade: 0.001,
    };

    let intents = drive(&mut engine, &trigger_scenario_rows(), &higher, &dust);
    assert!(intents.is_empty(), "no intent may be emitted on dust equity");
    assert!(
        engine.state().arming.is_armed(),
        "a rejected candidate leaves the episode armed"
    );
    assert_eq!(engine.state().last_disarm, None);
}

// =============================================================================
// Multi-symbol isolation
// =============================================================================

#[test]
fn per_symbol_engines_are_isolated() {
    let mut gold = Engine::new(Symbol::new("XAUUSD"), EngineConfig::default(), instrument());
    let mut fiber = Engine::new(Symbol::new("EURUSD"), EngineConfig::default(), instrument());
    let higher = bullish_higher();
    let dust = AccountSnapshot {
        equity: 100.0,
        risk_per_trade: 0.001,
    };

    let rows = trigger_scenario_rows();
    let gold_intents = drive(&mut gold, &rows, &higher, &account());
    let fiber_intents = drive(&mut fiber, &rows, &higher, &dust);

    assert_eq!(gold_intents.len(), 1);
    assert_eq!(gold_intents[0].1.symbol.as_str(), "XAUUSD");
    assert!(!gold.state().arming.is_armed());

    // the dust-funded engine rejected its candidate and is still armed
    assert!(fiber_intents.is_empty());
    assert!(fiber.state().arming.is_armed());
}
