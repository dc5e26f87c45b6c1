use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::signal::Signal;

/// Directional exposure to the spread
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Position {
    #[default]
    Flat,
    Long,
    Short,
}

#[derive(Debug, Error)]
pub enum PositionError {
    #[error("Invalid position value: {0} (expected -1, 0 or 1)")]
    InvalidValue(i8),
}

impl Position {
    /// Signed exposure: FLAT=0, LONG=1, SHORT=-1
    pub fn value(self) -> i8 {
        match self {
            Position::Flat => 0,
            Position::Long => 1,
            Position::Short => -1,
        }
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.value())
    }

    pub fn is_flat(self) -> bool {
        self == Position::Flat
    }
}

impl From<Position> for i8 {
    fn from(position: Position) -> Self {
        position.value()
    }
}

impl TryFrom<i8> for Position {
    type Error = PositionError;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Position::Flat),
            1 => Ok(Position::Long),
            -1 => Ok(Position::Short),
            other => Err(PositionError::InvalidValue(other)),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Flat => write!(f, "FLAT"),
            Position::Long => write!(f, "LONG"),
            Position::Short => write!(f, "SHORT"),
        }
    }
}

/// Action emitted by a position transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeAction {
    Buy,
    Sell,
    Close,
    Hold,
}

impl TradeAction {
    /// Human-readable description naming the legs
    pub fn details(self, dependent: &str, independent: &str) -> String {
        match self {
            TradeAction::Buy => format!("Long spread: buy {}, sell {}", dependent, independent),
            TradeAction::Sell => format!("Short spread: sell {}, buy {}", dependent, independent),
            TradeAction::Close => "Close all positions".to_string(),
            TradeAction::Hold => "No action required".to_string(),
        }
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeAction::Buy => write!(f, "BUY"),
            TradeAction::Sell => write!(f, "SELL"),
            TradeAction::Close => write!(f, "CLOSE"),
            TradeAction::Hold => write!(f, "HOLD"),
        }
    }
}

/// Three-state position machine.
///
/// A repeated signal while already in the matching state is a no-op, so a
/// signal that persists across polling cycles produces one order only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PositionStateMachine {
    position: Position,
}

impl PositionStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Apply one classified signal; exactly one action results
    pub fn apply(&mut self, signal: Signal) -> TradeAction {
        match (signal, self.position) {
            (Signal::Long, p) if p != Position::Long => {
                self.position = Position::Long;
                TradeAction::Buy
            }
            (Signal::Short, p) if p != Position::Short => {
                self.position = Position::Short;
                TradeAction::Sell
            }
            (Signal::Close, p) if p != Position::Flat => {
                self.position = Position::Flat;
                TradeAction::Close
            }
            _ => TradeAction::Hold,
        }
    }

    pub fn reset(&mut self) {
        self.position = Position::Flat;
    }
}
