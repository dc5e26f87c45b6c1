//! spread-arb - Brent/WTI Cointegrated Spread Trader Library
//!
//! Estimates an OLS hedge ratio between two crude benchmarks, tracks the
//! rolling z-score of the resulting spread and drives a three-state
//! position from live prices.
//!
//! # Modules
//!
//! - `domain`: Core types (PriceSeries, Signal, Position, PnL, StrategySnapshot)
//! - `ports`: Trait abstractions (MarketDataProvider, StrategyObserver)
//! - `strategy`: Hedge ratio estimation, ZScoreGate and the SignalEngine
//! - `adapters`: External implementations (Yahoo, simulator, HTTP API, CLI)
//! - `config`: Configuration loading and validation
//! - `application`: StrategyRunner and its reports

pub mod domain;
pub mod ports;
pub mod strategy;
pub mod adapters;
pub mod config;
pub mod application;
