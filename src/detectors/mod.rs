//! Market-structure detectors
//!
//! Pure functions over a bar slice: swing points and fractals, fair value
//! gaps with test tracking, and liquidity sweeps. Every detector returns an
//! empty result (never an error) when the window is shorter than its
//! structural requirement, and all outputs are recomputed fresh from the
//! bars on each evaluation.

pub mod imbalance;
pub mod sweeps;
pub mod swings;
