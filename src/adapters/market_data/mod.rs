//! Market Data Adapters
//!
//! - `YahooFinanceClient`: Yahoo chart API (daily history, minute bars)
//! - `SimulatedMarketData`: seeded cointegrated pair for offline runs

mod simulated;
mod yahoo;

pub use simulated::{SimulatedMarketData, SimulationConfig};
pub use yahoo::{YahooConfig, YahooFinanceClient};
