//! Arming state machine
//!
//! The engine is Idle until one of three ordered two-event combinations
//! lines up with the higher-timeframe context, then Armed until a trigger
//! fires, the episode times out, or the context changes. Arming never
//! happens out of a non-directional context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::MarketContext;
use crate::detectors::imbalance::FvgZone;
use crate::detectors::sweeps::SweepEvent;
use crate::types::{Bar, Direction};

/// Which two-event combination armed the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArmingPattern {
    /// A primary sweep strictly older than a secondary sweep
    SweepSweep,
    /// A primary sweep strictly older than an FVG test
    SweepFvgTest,
    /// Two FVG tests in order, with a primary sweep at or before the first
    FvgTestFvgTest,
}

impl std::fmt::Display for ArmingPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArmingPattern::SweepSweep => write!(f, "LS+LS"),
            ArmingPattern::SweepFvgTest => write!(f, "LS+FVGTest"),
            ArmingPattern::FvgTestFvgTest => write!(f, "FVGTest+FVGTest"),
        }
    }
}

/// Everything recorded when the engine arms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmedSetup {
    pub direction: Direction,
    pub pattern: ArmingPattern,
    /// Time of the second (newer) event of the pattern
    pub signal_time: DateTime<Utc>,
    /// Open time of the bar on which the arming condition was found
    pub armed_at_time: DateTime<Utc>,
    /// Series length when armed; drives the bar-count timeout
    pub armed_at_len: usize,
    pub primary_sweep: Option<SweepEvent>,
    pub secondary_sweep: Option<SweepEvent>,
    pub primary_fvg: Option<FvgZone>,
    pub secondary_fvg: Option<FvgZone>,
}

/// Run state carried across bar-close events
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum ArmingState {
    #[default]
    Idle,
    Armed(ArmedSetup),
}

impl ArmingState {
    pub fn is_armed(&self) -> bool {
        matches!(self, ArmingState::Armed(_))
    }

    pub fn setup(&self) -> Option<&ArmedSetup> {
        match self {
            ArmingState::Armed(setup) => Some(setup),
            ArmingState::Idle => None,
        }
    }
}

fn sweep_matches(sweep: &SweepEvent, direction: Direction) -> bool {
    sweep.direction == direction
}

fn fvg_matches(fvg: &FvgZone, direction: Direction) -> bool {
    fvg.is_tested
        && fvg.test_index.is_some()
        && match direction {
            Direction::Bullish => fvg.is_bullish,
            Direction::Bearish => !fvg.is_bullish,
        }
}

/// Blank setup for the given pattern; the pattern search fills in the events
fn base_setup(
    direction: Direction,
    pattern: ArmingPattern,
    signal_time: DateTime<Utc>,
    bars: &[Bar],
) -> ArmedSetup {
    ArmedSetup {
        direction,
        pattern,
        signal_time,
        armed_at_time: bars[bars.len() - 1].open_time,
        armed_at_len: bars.len(),
        primary_sweep: None,
        secondary_sweep: None,
        primary_fvg: None,
        secondary_fvg: None,
    }
}

/// LS + LS: a secondary sweep preceded strictly by a primary sweep
fn sweep_sweep_pattern(
    primary_sweeps: &[SweepEvent],
    secondary_sweeps: &[SweepEvent],
    direction: Direction,
    bars: &[Bar],
) -> Option<ArmedSetup> {
    for e2 in secondary_sweeps.iter().filter(|s| sweep_matches(s, direction)) {
        for e1 in primary_sweeps.iter().filter(|s| sweep_matches(s, direction)) {
            if e1.confirmation_index == e2.confirmation_index && e1.time == e2.time {
                continue;
            }
            if e1.confirmation_index < e2.confirmation_index && e1.time < e2.time {
                return Some(ArmedSetup {
                    primary_sweep: Some(e1.clone()),
                    secondary_sweep: Some(e2.clone()),
                    ..base_setup(direction, ArmingPattern::SweepSweep, e2.time, bars)
                });
            }
        }
    }
    None
}

/// LS + FVG test: a tested zone whose test bar is strictly newer than a
/// primary sweep
fn sweep_fvg_pattern(
    primary_sweeps: &[SweepEvent],
    fvgs: &[FvgZone],
    direction: Direction,
    bars: &[Bar],
) -> Option<ArmedSetup> {
    for fvg in fvgs.iter().filter(|f| fvg_matches(f, direction)) {
        let test_index = fvg.test_index.expect("tested zone carries its test index");
        let test_time = bars.get(test_index)?.open_time;

        for e1 in primary_sweeps.iter().filter(|s| sweep_matches(s, direction)) {
            if e1.confirmation_index < test_index && e1.time < test_time {
                return Some(ArmedSetup {
                    primary_sweep: Some(e1.clone()),
                    primary_fvg: Some(fvg.clone()),
                    ..base_setup(direction, ArmingPattern::SweepFvgTest, test_time, bars)
                });
            }
        }
    }
    None
}

/// FVG test + FVG test, with a primary sweep at or before the first test
fn double_fvg_pattern(
    primary_sweeps: &[SweepEvent],
    fvgs: &[FvgZone],
    direction: Direction,
    bars: &[Bar],
) -> Option<ArmedSetup> {
    for fvg2 in fvgs.iter().filter(|f| fvg_matches(f, direction)) {
        let test2_index = fvg2.test_index.expect("tested zone carries its test index");
        let test2_time = bars.get(test2_index)?.open_time;

        for fvg1 in fvgs.iter().filter(|f| fvg_matches(f, direction)) {
            if fvg1 == fvg2 {
                continue;
            }
            let test1_index = fvg1.test_index.expect("tested zone carries its test index");
            if test1_index >= test2_index {
                continue;
            }
            let test1_time = bars.get(test1_index)?.open_time;

            let preceding_sweep = primary_sweeps
                .iter()
                .filter(|s| sweep_matches(s, direction))
                .find(|s| s.confirmation_index <= test1_index && s.time <= test1_time);

            if let Some(sweep) = preceding_sweep {
                return Some(ArmedSetup {
                    primary_sweep: Some(sweep.clone()),
                    primary_fvg: Some(fvg1.clone()),
                    secondary_fvg: Some(fvg2.clone()),
                    ..base_setup(direction, ArmingPattern::FvgTestFvgTest, test2_time, bars)
                });
            }
        }
    }
    None
}

/// Search for a qualifying two-event combination.
///
/// Patterns are tried in order (LS+LS, LS+FVGTest, FVGTest+FVGTest), each
/// scanning candidate second-events newest first; the first combination
/// satisfying the ordering constraint wins, not the globally best one.
/// Returns `None` for any non-directional context.
pub fn identify_arming(
    primary_sweeps: &[SweepEvent],
    secondary_sweeps: &[SweepEvent],
    fvgs: &[FvgZone],
    context: MarketContext,
    bars: &[Bar],
) -> Option<ArmedSetup> {
    let direction = context.direction()?;
    if bars.is_empty() {
        return None;
    }

    let setup = sweep_sweep_pattern(primary_sweeps, secondary_sweeps, direction, bars)
        .or_else(|| sweep_fvg_pattern(primary_sweeps, fvgs, direction, bars))
        .or_else(|| double_fvg_pattern(primary_sweeps, fvgs, direction, bars));

    if let Some(ref s) = setup {
        tracing::info!(
            direction = %s.direction,
            pattern = %s.pattern,
            signal_time = %s.signal_time,
            "arming condition met"
        );
    }
    setup
}
