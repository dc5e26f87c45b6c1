//! Configuration Module
//!
//! Loads and validates configuration from TOML files.

pub mod loader;

pub use loader::{
    load_config, Config, ConfigError, InstrumentsSection, LoggingSection, MarketDataSection,
    ProviderKind, ServerSection, StrategySection, PORT_ENV_VAR,
};
