//! Strategy Parameters
//!
//! Configuration for the spread engine and the evaluation loop.
//! Fixed at construction; there is no runtime reconfiguration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main strategy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Trailing window for spread mean/std, also the minimum history length
    pub rolling_window: usize,
    /// Minimum absolute spread move for a LONG/SHORT entry to count
    pub volatility_factor: f64,
    /// Per-trade cost. Carried and reported, not applied to PnL or signals.
    pub transaction_cost: f64,
    /// Trailing stop fraction. Carried and reported, not applied.
    pub trailing_stop_loss: f64,
    /// Seconds between live evaluations
    pub update_interval_seconds: u64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            rolling_window: 252,
            volatility_factor: 0.5,
            transaction_cost: 0.01,
            trailing_stop_loss: 0.02,
            update_interval_seconds: 30,
        }
    }
}

impl StrategyConfig {
    pub fn with_rolling_window(mut self, window: usize) -> Self {
        self.rolling_window = window;
        self
    }

    pub fn with_volatility_factor(mut self, factor: f64) -> Self {
        self.volatility_factor = factor;
        self
    }

    pub fn with_update_interval(mut self, seconds: u64) -> Self {
        self.update_interval_seconds = seconds;
        self
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_seconds)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rolling_window < 2 {
            return Err(ConfigError::InvalidRollingWindow(self.rolling_window));
        }
        if !self.volatility_factor.is_finite() || self.volatility_factor < 0.0 {
            return Err(ConfigError::InvalidVolatilityFactor(self.volatility_factor));
        }
        if !self.transaction_cost.is_finite() || self.transaction_cost < 0.0 {
            return Err(ConfigError::InvalidTransactionCost(self.transaction_cost));
        }
        if !self.trailing_stop_loss.is_finite()
            || self.trailing_stop_loss < 0.0
            || self.trailing_stop_loss >= 1.0
        {
            return Err(ConfigError::InvalidTrailingStop(self.trailing_stop_loss));
        }
        if self.update_interval_seconds == 0 {
            return Err(ConfigError::InvalidUpdateInterval);
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid rolling window: {0} (minimum 2)")]
    InvalidRollingWindow(usize),
    #[error("Invalid volatility factor: {0} (must be finite and >= 0)")]
    InvalidVolatilityFactor(f64),
    #[error("Invalid transaction cost: {0} (must be finite and >= 0)")]
    InvalidTransactionCost(f64),
    #[error("Invalid trailing stop loss: {0} (must be 0 <= stop < 1)")]
    InvalidTrailingStop(f64),
    #[error("Invalid update interval: must be at least 1 second")]
    InvalidUpdateInterval,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StrategyConfig::default();
        assert_eq!(config.rolling_window, 252);
        assert_eq!(config.volatility_factor, 0.5);
        assert_eq!(config.transaction_cost, 0.01);
        assert_eq!(config.trailing_stop_loss, 0.02);
        assert_eq!(config.update_interval_seconds, 30);
        assert_eq!(config.update_interval(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = StrategyConfig::default()
            .with_rolling_window(20)
            .with_volatility_factor(1.0)
            .with_update_interval(5);
        assert_eq!(config.rolling_window, 20);
        assert_eq!(config.volatility_factor, 1.0);
        assert_eq!(config.update_interval_seconds, 5);
    }

    #[test]
    fn test_invalid_rolling_window() {
        let config = StrategyConfig::default().with_rolling_window(1);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRollingWindow(1))
        ));
    }

    #[test]
    fn test_invalid_volatility_factor() {
        let config = StrategyConfig::default().with_volatility_factor(-0.1);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidVolatilityFactor(_))
        ));
    }

    #[test]
    fn test_invalid_interval_and_stop() {
        let config = StrategyConfig::default().with_update_interval(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidUpdateInterval)
        ));

        let mut config = StrategyConfig::default();
        config.trailing_stop_loss = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTrailingStop(_))
        ));
    }
}
