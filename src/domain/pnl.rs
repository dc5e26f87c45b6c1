//! Spread PnL accounting (reporting only).
//!
//! Positions are reconstructed by replaying a fresh state machine over the
//! stored classifications, so reports never touch the live position.
//!
//!   pnl[0] = 0
//!   pnl[t] = position[t-1] * (spread[t] - spread[t-1])
//!   cumulative_pnl[t] = cumulative_pnl[t-1] + pnl[t]

use serde::Serialize;

use super::position::{Position, PositionStateMachine, TradeAction};
use super::signal::Signal;

/// Position in effect after each bar. Bar 0 is flat; transitions are
/// applied from bar 1 onward.
pub fn replay_positions(signals: &[Signal]) -> Vec<Position> {
    let mut machine = PositionStateMachine::new();
    signals
        .iter()
        .enumerate()
        .map(|(i, signal)| {
            if i > 0 {
                machine.apply(*signal);
            }
            machine.position()
        })
        .collect()
}

/// Per-bar PnL from positions held into each bar
pub fn step_pnl(spreads: &[f64], positions: &[Position]) -> Vec<f64> {
    let n = spreads.len().min(positions.len());
    (0..n)
        .map(|t| {
            if t == 0 {
                0.0
            } else {
                positions[t - 1].as_f64() * (spreads[t] - spreads[t - 1])
            }
        })
        .collect()
}

/// Running sum of per-bar PnL
pub fn cumulative(pnl: &[f64]) -> Vec<f64> {
    pnl.iter()
        .scan(0.0, |acc, p| {
            *acc += p;
            Some(*acc)
        })
        .collect()
}

/// Replayed PnL over a window of bars
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PnlReport {
    pub positions: Vec<Position>,
    pub pnl: Vec<f64>,
    pub cumulative_pnl: Vec<f64>,
    /// Non-HOLD actions emitted during the replay
    pub trade_count: usize,
}

impl PnlReport {
    pub fn total(&self) -> f64 {
        self.cumulative_pnl.last().copied().unwrap_or(0.0)
    }
}

/// Stateless replay accountant
#[derive(Debug, Clone, Copy, Default)]
pub struct PnlAccountant;

impl PnlAccountant {
    pub fn report(&self, spreads: &[f64], signals: &[Signal]) -> PnlReport {
        let positions = replay_positions(signals);
        let trade_count = count_trades(signals);
        let pnl = step_pnl(spreads, &positions);
        let cumulative_pnl = cumulative(&pnl);

        PnlReport {
            positions,
            pnl,
            cumulative_pnl,
            trade_count,
        }
    }
}

fn count_trades(signals: &[Signal]) -> usize {
    let mut machine = PositionStateMachine::new();
    signals
        .iter()
        .skip(1)
        .filter(|s| machine.apply(**s) != TradeAction::Hold)
        .count()
}
