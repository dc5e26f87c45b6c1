//! Market data port
//!
//! Historical and latest price observations for a single instrument.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::price_series::{PriceObservation, PriceSeries};

/// Market data error type
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// Provider answered but had no usable rows
    #[error("Data unavailable for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Data parsing error: {0}")]
    ParseError(String),

    #[error("Invalid provider configuration: {0}")]
    Configuration(String),
}

impl MarketDataError {
    pub fn unavailable(symbol: &str, reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            symbol: symbol.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<reqwest::Error> for MarketDataError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::ParseError(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Source of price observations for the two legs
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Ordered daily history over `[start, end]`.
    /// Fails with `DataUnavailable` on an empty or malformed result.
    async fn fetch_historical(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<PriceSeries, MarketDataError>;

    /// Most recent observation within `lookback` of now.
    /// Fails with `DataUnavailable` when nothing recent exists.
    async fn fetch_latest(
        &self,
        symbol: &str,
        lookback: Duration,
    ) -> Result<PriceObservation, MarketDataError>;
}
