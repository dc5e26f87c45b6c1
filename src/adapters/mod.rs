//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits:
//! - Market Data: Yahoo Finance chart API and a seeded simulator
//! - API: axum control endpoints and the WebSocket update stream
//! - CLI: Command-line interface handlers

pub mod api;
pub mod cli;
pub mod market_data;

pub use api::{create_router, AppState, BroadcastObserver};
pub use cli::CliApp;
pub use market_data::{SimulatedMarketData, YahooFinanceClient};
