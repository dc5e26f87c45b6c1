use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::position::{Position, TradeAction};
use super::signal::Signal;

/// Immutable record of one evaluation cycle, handed to observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySnapshot {
    pub timestamp: DateTime<Utc>,
    pub price_a: f64,
    pub price_b: f64,
    pub spread: f64,
    pub spread_mean: f64,
    pub spread_std: f64,
    pub z_score: f64,
    pub signal: Signal,
    /// Position after the action was applied
    pub position: Position,
    pub action: TradeAction,
    pub action_details: String,
}

impl StrategySnapshot {
    pub fn is_trade(&self) -> bool {
        self.action != TradeAction::Hold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_serializes_typed_fields() {
        let snapshot = StrategySnapshot {
            timestamp: DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            price_a: 83.1,
            price_b: 79.4,
            spread: -0.8,
            spread_mean: 0.1,
            spread_std: 0.4,
            z_score: -2.25,
            signal: Signal::Long,
            position: Position::Long,
            action: TradeAction::Buy,
            action_details: TradeAction::Buy.details("BZ=F", "CL=F"),
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["signal"], "LONG");
        assert_eq!(json["position"], 1);
        assert_eq!(json["action"], "BUY");
        assert!(snapshot.is_trade());
    }
}
