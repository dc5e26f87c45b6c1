//! Observer port
//!
//! Receives one snapshot per completed evaluation. Delivery is
//! fire-and-forget: implementations must not block the loop.

use tracing::info;

use crate::domain::snapshot::StrategySnapshot;

pub trait StrategyObserver: Send + Sync {
    fn on_strategy_update(&self, snapshot: &StrategySnapshot);
}

/// Writes each snapshot to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingObserver;

impl StrategyObserver for LoggingObserver {
    fn on_strategy_update(&self, snapshot: &StrategySnapshot) {
        info!(
            spread = snapshot.spread,
            z_score = snapshot.z_score,
            position = %snapshot.position,
            "strategy_update: {} -> {} ({})",
            snapshot.signal,
            snapshot.action,
            snapshot.action_details
        );
    }
}

/// Discards every snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl StrategyObserver for NullObserver {
    fn on_strategy_update(&self, _snapshot: &StrategySnapshot) {}
}
