//! Reporting records returned by the control surface

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::domain::pnl::PnlAccountant;
use crate::domain::position::Position;
use crate::domain::signal::Signal;
use crate::strategy::hedge_ratio::HedgeRatio;
use crate::strategy::params::StrategyConfig;
use crate::strategy::signal_engine::SpreadPoint;

/// Lifecycle phase of the runner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunnerPhase {
    Uninitialized,
    Initialized,
    Running,
}

/// Point-in-time view of the runner
#[derive(Debug, Clone, Serialize)]
pub struct StrategyStatus {
    pub running: bool,
    pub phase: RunnerPhase,
    pub position: Position,
    pub hedge_ratio: Option<HedgeRatio>,
    pub data_loaded: bool,
    pub observation_count: usize,
    pub last_update: Option<DateTime<Utc>>,
    pub config: StrategyConfig,
}

/// Aligned historical sequences with replayed PnL
#[derive(Debug, Clone, Default, Serialize)]
pub struct HistoricalReport {
    /// Serialized as `%Y-%m-%d`
    #[serde(serialize_with = "serialize_dates")]
    pub dates: Vec<DateTime<Utc>>,
    pub spread: Vec<f64>,
    pub z_score: Vec<f64>,
    pub cumulative_pnl: Vec<f64>,
    pub position: Vec<Position>,
    pub trade_count: usize,
}

impl HistoricalReport {
    pub fn from_points(points: &[SpreadPoint]) -> Self {
        let spread: Vec<f64> = points.iter().map(|p| p.spread).collect();
        let signals: Vec<Signal> = points.iter().map(|p| p.signal()).collect();
        let pnl = PnlAccountant.report(&spread, &signals);

        Self {
            dates: points.iter().map(|p| p.timestamp).collect(),
            z_score: points.iter().map(|p| p.z_score).collect(),
            spread,
            cumulative_pnl: pnl.cumulative_pnl,
            position: pnl.positions,
            trade_count: pnl.trade_count,
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn total_pnl(&self) -> f64 {
        self.cumulative_pnl.last().copied().unwrap_or(0.0)
    }
}

fn serialize_dates<S>(dates: &[DateTime<Utc>], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(dates.iter().map(|d| d.format("%Y-%m-%d").to_string()))
}
