//! Yahoo Finance chart API client
//!
//! Daily closes for history, minute bars for the latest observation.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::domain::price_series::{PriceObservation, PriceSeries};
use crate::ports::market_data::{MarketDataError, MarketDataProvider};

/// Yahoo client configuration
#[derive(Debug, Clone)]
pub struct YahooConfig {
    /// Base URL, without the `/v8/finance/chart` suffix
    pub base_url: String,
    pub timeout: Duration,
    /// Attempts per request on 429 / 5xx
    pub max_retries: u32,
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            timeout: Duration::from_secs(15),
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct YahooFinanceClient {
    config: YahooConfig,
    http: Client,
}

impl YahooFinanceClient {
    pub fn new() -> Result<Self, MarketDataError> {
        Self::with_config(YahooConfig::default())
    }

    pub fn with_config(config: YahooConfig) -> Result<Self, MarketDataError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("spread-arb/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MarketDataError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, http })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Raw (timestamp, close) pairs in `[start, end]`, nulls dropped
    async fn chart(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: BarInterval,
    ) -> Result<Vec<PriceObservation>, MarketDataError> {
        let url = format!(
            "{}/v8/finance/chart/{}",
            self.config.base_url.trim_end_matches('/'),
            symbol
        );
        let query = [
            ("period1", start.timestamp().to_string()),
            ("period2", end.timestamp().to_string()),
            ("interval", interval.as_str().to_string()),
            ("includePrePost", "false".to_string()),
        ];

        let response = self.send_with_retry(&url, &query).await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(MarketDataError::unavailable(symbol, "unknown symbol"));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MarketDataError::Transport(format!("HTTP {}: {}", status, body)));
        }

        let body: ChartResponse = response.json().await?;
        body.into_observations(symbol, interval)
    }

    async fn send_with_retry(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<reqwest::Response, MarketDataError> {
        let attempts = self.config.max_retries.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            match self.http.get(url).query(query).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                        tracing::warn!(
                            "Yahoo returned {}, retrying (attempt {}/{})",
                            status,
                            attempt + 1,
                            attempts
                        );
                        last_error = Some(MarketDataError::Transport(format!("HTTP {}", status)));
                    } else {
                        return Ok(response);
                    }
                }
                Err(e) => last_error = Some(e.into()),
            }

            if attempt + 1 < attempts {
                tokio::time::sleep(Duration::from_millis(250 * (attempt as u64 + 1))).await;
            }
        }

        Err(last_error.unwrap_or_else(|| MarketDataError::Transport("Max retries exceeded".into())))
    }
}

#[async_trait]
impl MarketDataProvider for YahooFinanceClient {
    async fn fetch_historical(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<PriceSeries, MarketDataError> {
        let observations = self.chart(symbol, start, end, BarInterval::Daily).await?;
        tracing::debug!(symbol, rows = observations.len(), "Downloaded daily history");
        Ok(PriceSeries::new(symbol, observations))
    }

    async fn fetch_latest(
        &self,
        symbol: &str,
        lookback: Duration,
    ) -> Result<PriceObservation, MarketDataError> {
        let end = Utc::now();
        let lookback = chrono::Duration::from_std(lookback)
            .map_err(|e| MarketDataError::ParseError(format!("Invalid lookback: {}", e)))?;
        let start = end - lookback;

        let observations = self.chart(symbol, start, end, BarInterval::Minute).await?;
        observations
            .into_iter()
            .filter(|o| o.timestamp >= start)
            .max_by_key(|o| o.timestamp)
            .ok_or_else(|| MarketDataError::unavailable(symbol, "no observation in lookback window"))
    }
}

/// Chart API bar size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BarInterval {
    /// Stamped at midnight UTC of the exchange-local trading date
    Daily,
    Minute,
}

impl BarInterval {
    fn as_str(self) -> &'static str {
        match self {
            BarInterval::Daily => "1d",
            BarInterval::Minute => "1m",
        }
    }

    /// Daily bars map to their exchange-local trading date
    fn stamp(self, ts: i64, gmtoffset: i64) -> Option<DateTime<Utc>> {
        match self {
            BarInterval::Minute => Utc.timestamp_opt(ts, 0).single(),
            BarInterval::Daily => {
                let local = Utc.timestamp_opt(ts.checked_add(gmtoffset)?, 0).single()?;
                let midnight = local.date_naive().and_hms_opt(0, 0, 0)?;
                Some(Utc.from_utc_datetime(&midnight))
            }
        }
    }
}

// Chart API payload

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
struct ChartMeta {
    /// Exchange offset from UTC in seconds
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

impl ChartResponse {
    fn into_observations(
        self,
        symbol: &str,
        interval: BarInterval,
    ) -> Result<Vec<PriceObservation>, MarketDataError> {
        if let Some(err) = self.chart.error {
            return Err(MarketDataError::unavailable(
                symbol,
                format!("{}: {}", err.code, err.description),
            ));
        }

        let result = self
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| MarketDataError::unavailable(symbol, "empty chart result"))?;

        let closes = result
            .indicators
            .quote
            .into_iter()
            .next()
            .map(|q| q.close)
            .unwrap_or_default();

        if closes.len() != result.timestamp.len() {
            return Err(MarketDataError::ParseError(format!(
                "{}: {} timestamps but {} closes",
                symbol,
                result.timestamp.len(),
                closes.len()
            )));
        }

        let gmtoffset = result.meta.gmtoffset;
        let observations: Vec<PriceObservation> = result
            .timestamp
            .iter()
            .zip(closes)
            .filter_map(|(ts, close)| {
                let price = close.filter(|p| p.is_finite())?;
                let timestamp = interval.stamp(*ts, gmtoffset)?;
                Some(PriceObservation::new(timestamp, price))
            })
            .collect();

        if observations.is_empty() {
            return Err(MarketDataError::unavailable(symbol, "no closing prices"));
        }
        Ok(observations)
    }
}
