//! Order-Flow Signal Engine
//!
//! The signal-detection and trade-parameter core of a 15-minute order-flow
//! strategy: higher-timeframe context classification, market-structure
//! detectors (swing points, fractals, fair value gaps, liquidity sweeps),
//! a two-stage arming → trigger state machine, and stop/target/volume
//! calculation with risk/reward filtering. The hosting strategy runtime
//! feeds closed bars in and turns the emitted trade intents into orders.

pub mod arming;
pub mod config;
pub mod context;
pub mod detectors;
pub mod engine;
pub mod risk;
pub mod series;
pub mod trigger;
pub mod types;

pub use arming::{ArmedSetup, ArmingPattern, ArmingState};
pub use config::EngineConfig;
pub use context::MarketContext;
pub use detectors::imbalance::FvgZone;
pub use detectors::sweeps::{SweepEvent, SweepParams};
pub use detectors::swings::{FractalPoint, SwingPoint};
pub use engine::{Engine, EngineState, StructureSnapshot};
pub use risk::{AccountSnapshot, InstrumentSpec};
pub use series::BarSeries;
pub use types::{Bar, Direction, DisarmReason, RejectReason, Symbol, TradeIntent};
