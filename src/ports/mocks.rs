//! Scripted port implementations for tests and demos
//!
//! `ScriptedMarketData` serves canned history and a queue of latest prices;
//! `RecordingObserver` keeps every snapshot it receives.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::price_series::{PriceObservation, PriceSeries};
use crate::domain::snapshot::StrategySnapshot;
use crate::ports::market_data::{MarketDataError, MarketDataProvider};
use crate::ports::observer::StrategyObserver;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Market data double with controlled responses.
///
/// Latest prices are consumed front to back; the final queued entry repeats
/// forever. A `None` entry answers with `DataUnavailable`.
#[derive(Debug, Default)]
pub struct ScriptedMarketData {
    history: Mutex<HashMap<String, PriceSeries>>,
    latest: Mutex<HashMap<String, VecDeque<Option<PriceObservation>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the history for a symbol
    pub fn with_history(self, series: PriceSeries) -> Self {
        lock(&self.history).insert(series.symbol.clone(), series);
        self
    }

    /// Builder method to queue a latest price for a symbol
    pub fn with_latest(self, symbol: &str, observation: PriceObservation) -> Self {
        self.push_latest(symbol, Some(observation));
        self
    }

    /// Queue a latest price (`None` = outage) at runtime
    pub fn push_latest(&self, symbol: &str, observation: Option<PriceObservation>) {
        lock(&self.latest)
            .entry(symbol.to_string())
            .or_default()
            .push_back(observation);
    }

    /// All recorded calls, formatted as `"<method>:<symbol>"`
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    fn record(&self, method: &str, symbol: &str) {
        lock(&self.calls).push(format!("{}:{}", method, symbol));
    }
}

#[async_trait]
impl MarketDataProvider for ScriptedMarketData {
    async fn fetch_historical(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<PriceSeries, MarketDataError> {
        self.record("historical", symbol);

        let history = lock(&self.history);
        let series = history
            .get(symbol)
            .ok_or_else(|| MarketDataError::unavailable(symbol, "no history configured"))?;

        let observations: Vec<PriceObservation> = series
            .observations()
            .iter()
            .filter(|o| o.timestamp >= start && o.timestamp <= end)
            .copied()
            .collect();

        if observations.is_empty() {
            return Err(MarketDataError::unavailable(symbol, "empty history"));
        }
        Ok(PriceSeries::new(symbol, observations))
    }

    async fn fetch_latest(
        &self,
        symbol: &str,
        _lookback: Duration,
    ) -> Result<PriceObservation, MarketDataError> {
        self.record("latest", symbol);

        let mut latest = lock(&self.latest);
        let queue = latest
            .get_mut(symbol)
            .ok_or_else(|| MarketDataError::unavailable(symbol, "no latest price configured"))?;

        let entry = if queue.len() > 1 {
            queue.pop_front().flatten()
        } else {
            queue.front().copied().flatten()
        };

        entry.ok_or_else(|| MarketDataError::unavailable(symbol, "no recent observation"))
    }
}

/// Observer that records every snapshot
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver {
    snapshots: Arc<Mutex<Vec<StrategySnapshot>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> Vec<StrategySnapshot> {
        lock(&self.snapshots).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.snapshots).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.snapshots).is_empty()
    }
}

impl StrategyObserver for RecordingObserver {
    fn on_strategy_update(&self, snapshot: &StrategySnapshot) {
        lock(&self.snapshots).push(snapshot.clone());
    }
}
