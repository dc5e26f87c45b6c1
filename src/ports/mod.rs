//! Ports Layer - Trait definitions for external dependencies
//!
//! This module defines the interfaces (ports) that adapters must implement.
//! Following hexagonal architecture, these traits abstract:
//! - Market data feeds (historical and latest prices)
//! - Strategy update observers (log, WebSocket push)

pub mod market_data;
pub mod observer;
pub mod mocks;

pub use market_data::{MarketDataError, MarketDataProvider};
pub use observer::{LoggingObserver, NullObserver, StrategyObserver};
