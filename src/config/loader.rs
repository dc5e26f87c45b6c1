//! Configuration Loader
//!
//! Loads and validates configuration from TOML files. Every section is
//! optional and falls back to its defaults.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::adapters::market_data::{SimulationConfig, YahooConfig};
use crate::application::runner::RunnerConfig;
use crate::strategy::params::StrategyConfig;

/// Environment variable overriding `[server] port`
pub const PORT_ENV_VAR: &str = "SPREAD_ARB_PORT";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub strategy: StrategySection,
    pub instruments: InstrumentsSection,
    pub market_data: MarketDataSection,
    pub server: ServerSection,
    pub logging: LoggingSection,
}

/// Spread engine parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategySection {
    /// Rolling window for spread mean/std (bars)
    pub rolling_window: usize,
    /// Minimum spread move for an entry to count
    pub volatility_factor: f64,
    pub transaction_cost: f64,
    pub trailing_stop_loss: f64,
    /// Seconds between live evaluations
    pub update_interval_seconds: u64,
}

impl Default for StrategySection {
    fn default() -> Self {
        let defaults = StrategyConfig::default();
        Self {
            rolling_window: defaults.rolling_window,
            volatility_factor: defaults.volatility_factor,
            transaction_cost: defaults.transaction_cost,
            trailing_stop_loss: defaults.trailing_stop_loss,
            update_interval_seconds: defaults.update_interval_seconds,
        }
    }
}

/// The traded pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentsSection {
    /// Regressand leg (Brent front month)
    pub dependent_symbol: String,
    /// Regressor leg (WTI front month)
    pub independent_symbol: String,
    /// Calendar days of daily history loaded at initialization
    pub history_days: i64,
    /// How far back a live quote may be and still count
    pub live_lookback_minutes: u64,
}

impl Default for InstrumentsSection {
    fn default() -> Self {
        Self {
            dependent_symbol: "BZ=F".to_string(),
            independent_symbol: "CL=F".to_string(),
            history_days: 3650,
            live_lookback_minutes: 1440,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Yahoo,
    Simulated,
}

/// Price source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketDataSection {
    pub provider: ProviderKind,
    /// Yahoo chart API host
    pub base_url: String,
    pub timeout_secs: u64,
    /// Seed for the simulated provider
    pub seed: u64,
}

impl Default for MarketDataSection {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Yahoo,
            base_url: YahooConfig::default().base_url,
            timeout_secs: 15,
            seed: 42,
        }
    }
}

/// HTTP / WebSocket listener
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl ServerSection {
    /// Listen port: an explicit CLI port, then SPREAD_ARB_PORT, then config
    pub fn resolve_port(&self, cli_port: Option<u16>) -> u16 {
        resolve_port(cli_port, std::env::var(PORT_ENV_VAR).ok().as_deref(), self.port)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.socket_addr_for(None)
    }

    pub fn socket_addr_for(&self, cli_port: Option<u16>) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|e| ConfigError::ValidationError(format!("invalid host '{}': {}", self.host, e)))?;
        Ok(SocketAddr::new(ip, self.resolve_port(cli_port)))
    }
}

fn port_override(value: Option<&str>) -> Option<u16> {
    value.and_then(|v| v.trim().parse().ok())
}

fn resolve_port(cli_port: Option<u16>, env_value: Option<&str>, config_port: u16) -> u16 {
    cli_port
        .or_else(|| port_override(env_value))
        .unwrap_or(config_port)
}

/// Logging configuration section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        StrategyConfig::from(self)
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        let instruments = &self.instruments;
        if instruments.dependent_symbol.trim().is_empty()
            || instruments.independent_symbol.trim().is_empty()
        {
            return Err(ConfigError::ValidationError(
                "instrument symbols must not be empty".to_string(),
            ));
        }
        if instruments.dependent_symbol == instruments.independent_symbol {
            return Err(ConfigError::ValidationError(format!(
                "dependent and independent symbols must differ, both are {}",
                instruments.dependent_symbol
            )));
        }
        if instruments.history_days <= 0 {
            return Err(ConfigError::ValidationError(format!(
                "history_days must be > 0, got {}",
                instruments.history_days
            )));
        }
        if instruments.live_lookback_minutes == 0 {
            return Err(ConfigError::ValidationError(
                "live_lookback_minutes must be > 0".to_string(),
            ));
        }

        if self.market_data.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "timeout_secs must be > 0".to_string(),
            ));
        }
        if self.market_data.provider == ProviderKind::Yahoo
            && !self.market_data.base_url.starts_with("http")
        {
            return Err(ConfigError::ValidationError(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.market_data.base_url
            )));
        }

        self.server.socket_addr()?;
        Ok(())
    }

    pub fn yahoo_config(&self) -> YahooConfig {
        YahooConfig {
            base_url: self.market_data.base_url.clone(),
            timeout: Duration::from_secs(self.market_data.timeout_secs),
            ..YahooConfig::default()
        }
    }

    pub fn simulation_config(&self) -> SimulationConfig {
        SimulationConfig {
            dependent_symbol: self.instruments.dependent_symbol.clone(),
            independent_symbol: self.instruments.independent_symbol.clone(),
            seed: self.market_data.seed,
            ..SimulationConfig::default()
        }
    }
}

impl From<&Config> for StrategyConfig {
    fn from(config: &Config) -> Self {
        StrategyConfig {
            rolling_window: config.strategy.rolling_window,
            volatility_factor: config.strategy.volatility_factor,
            transaction_cost: config.strategy.transaction_cost,
            trailing_stop_loss: config.strategy.trailing_stop_loss,
            update_interval_seconds: config.strategy.update_interval_seconds,
        }
    }
}

impl From<&Config> for RunnerConfig {
    fn from(config: &Config) -> Self {
        RunnerConfig {
            strategy: StrategyConfig::from(config),
            dependent_symbol: config.instruments.dependent_symbol.clone(),
            independent_symbol: config.instruments.independent_symbol.clone(),
            history_days: config.instruments.history_days,
            live_lookback: Duration::from_secs(config.instruments.live_lookback_minutes * 60),
        }
    }
}
