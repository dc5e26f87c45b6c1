//! Strategy Layer - Hedge ratio, rolling z-score and signal generation
//!
//! - `HedgeRatioEstimator`: one-off OLS fit of the dependent leg on the independent leg
//! - `ZScoreGate`: expanding-then-rolling spread window statistics
//! - `SignalEngine`: spread series, validity gating and LONG/SHORT/CLOSE/HOLD classification

pub mod params;
pub mod hedge_ratio;
pub mod zscore_gate;
pub mod signal_engine;

pub use params::{ConfigError, StrategyConfig};
pub use hedge_ratio::{EstimationError, HedgeRatio, HedgeRatioEstimator};
pub use zscore_gate::{ZScoreGate, ZScoreResult};
pub use signal_engine::{LiveEvaluation, SignalCounts, SignalEngine, SpreadPoint};
