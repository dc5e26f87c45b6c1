//! Domain Layer - Core types for the spread strategy
//!
//! Pure domain types and logic with no I/O.
//! All external interactions happen through the ports layer.

pub mod position;
pub mod signal;
pub mod price_series;
pub mod pnl;
pub mod snapshot;

pub use position::{Position, PositionError, PositionStateMachine, TradeAction};
pub use signal::{classify, Signal, SignalFlags, ENTRY_Z_THRESHOLD, EXIT_Z_BAND};
pub use price_series::{JoinedRow, JoinedSeries, PriceObservation, PriceSeries};
pub use pnl::{PnlAccountant, PnlReport};
pub use snapshot::StrategySnapshot;
