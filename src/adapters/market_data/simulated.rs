//! Simulated cointegrated pair
//!
//! The independent leg is a geometric random walk; the dependent leg tracks
//! `intercept + beta * independent` plus mean-reverting (OU) noise. Daily
//! history is a pure function of the seed, so both legs always line up.
//! Live observations advance one step each time both legs have been read.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::SeedableRng;
use statrs::distribution::Normal;

use crate::domain::price_series::{PriceObservation, PriceSeries};
use crate::ports::market_data::{MarketDataError, MarketDataProvider};

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub dependent_symbol: String,
    pub independent_symbol: String,
    pub seed: u64,
    pub beta: f64,
    pub intercept: f64,
    pub initial_price: f64,
    /// Daily log-return standard deviation of the independent leg
    pub daily_volatility: f64,
    /// OU mean-reversion speed per day, in (0, 1]
    pub reversion_speed: f64,
    /// Daily standard deviation of the spread noise
    pub spread_volatility: f64,
    /// Live steps are scaled down from daily moves by this factor
    pub intraday_scale: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dependent_symbol: "BZ=F".to_string(),
            independent_symbol: "CL=F".to_string(),
            seed: 42,
            beta: 1.05,
            intercept: 2.5,
            initial_price: 70.0,
            daily_volatility: 0.015,
            reversion_speed: 0.15,
            spread_volatility: 0.6,
            intraday_scale: 0.1,
        }
    }
}

impl SimulationConfig {
    fn anchor() -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(2010, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| Utc.from_utc_datetime(&dt))
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }
}

#[derive(Debug, Clone, Copy)]
struct PairState {
    independent: f64,
    noise: f64,
}

impl PairState {
    fn dependent(&self, config: &SimulationConfig) -> f64 {
        config.intercept + config.beta * self.independent + self.noise
    }
}

#[derive(Debug)]
struct LiveState {
    rng: StdRng,
    pair: PairState,
    timestamp: DateTime<Utc>,
    step: u64,
    served: HashMap<String, u64>,
}

#[derive(Debug)]
pub struct SimulatedMarketData {
    config: SimulationConfig,
    price_shock: Normal,
    noise_shock: Normal,
    live: Mutex<Option<LiveState>>,
}

impl SimulatedMarketData {
    pub fn new(config: SimulationConfig) -> Result<Self, MarketDataError> {
        if !(config.reversion_speed > 0.0 && config.reversion_speed <= 1.0) {
            return Err(MarketDataError::Configuration(format!(
                "reversion_speed must be in (0, 1], got {}",
                config.reversion_speed
            )));
        }
        if !(config.initial_price.is_finite() && config.initial_price > 0.0) {
            return Err(MarketDataError::Configuration(format!(
                "initial_price must be positive, got {}",
                config.initial_price
            )));
        }

        let price_shock = Normal::new(0.0, config.daily_volatility)
            .map_err(|e| MarketDataError::Configuration(format!("daily_volatility: {}", e)))?;
        let noise_shock = Normal::new(0.0, config.spread_volatility)
            .map_err(|e| MarketDataError::Configuration(format!("spread_volatility: {}", e)))?;

        Ok(Self {
            config,
            price_shock,
            noise_shock,
            live: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    fn step(&self, rng: &mut StdRng, state: PairState, scale: f64) -> PairState {
        let independent = state.independent * (self.price_shock.sample(rng) * scale).exp();
        let noise = state.noise * (1.0 - self.config.reversion_speed * scale)
            + self.noise_shock.sample(rng) * scale;
        PairState { independent, noise }
    }

    /// Daily path from the anchor up to and including `days`
    fn daily_path(&self, days: usize) -> (Vec<PairState>, StdRng) {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut state = PairState {
            independent: self.config.initial_price,
            noise: 0.0,
        };
        let mut path = Vec::with_capacity(days + 1);
        path.push(state);
        for _ in 0..days {
            state = self.step(&mut rng, state, 1.0);
            path.push(state);
        }
        (path, rng)
    }

    fn days_since_anchor(at: DateTime<Utc>) -> Option<usize> {
        usize::try_from((at - SimulationConfig::anchor()).num_days()).ok()
    }

    fn leg(&self, symbol: &str, pair: &PairState) -> Result<f64, MarketDataError> {
        if symbol == self.config.dependent_symbol {
            Ok(pair.dependent(&self.config))
        } else if symbol == self.config.independent_symbol {
            Ok(pair.independent)
        } else {
            Err(MarketDataError::unavailable(symbol, "symbol not simulated"))
        }
    }

    fn lock_live(&self) -> MutexGuard<'_, Option<LiveState>> {
        self.live.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl MarketDataProvider for SimulatedMarketData {
    async fn fetch_historical(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<PriceSeries, MarketDataError> {
        let last_day = Self::days_since_anchor(end)
            .ok_or_else(|| MarketDataError::unavailable(symbol, "range precedes simulation"))?;
        let (path, _) = self.daily_path(last_day);
        let anchor = SimulationConfig::anchor();

        let mut observations = Vec::new();
        for (day, pair) in path.iter().enumerate() {
            let timestamp = anchor + chrono::Duration::days(day as i64);
            if timestamp < start || timestamp > end {
                continue;
            }
            observations.push(PriceObservation::new(timestamp, self.leg(symbol, pair)?));
        }

        if observations.is_empty() {
            return Err(MarketDataError::unavailable(symbol, "empty range"));
        }
        Ok(PriceSeries::new(symbol, observations))
    }

    async fn fetch_latest(
        &self,
        symbol: &str,
        _lookback: Duration,
    ) -> Result<PriceObservation, MarketDataError> {
        let mut guard = self.lock_live();

        if guard.is_none() {
            let now = Utc::now();
            let today = Self::days_since_anchor(now).unwrap_or(0);
            let (path, rng) = self.daily_path(today);
            let pair = path.last().copied().unwrap_or(PairState {
                independent: self.config.initial_price,
                noise: 0.0,
            });
            *guard = Some(LiveState {
                rng,
                pair,
                timestamp: now,
                step: 0,
                served: HashMap::new(),
            });
        }

        let Some(live) = guard.as_mut() else {
            return Err(MarketDataError::unavailable(symbol, "simulation not started"));
        };

        // Validate before advancing so unknown symbols don't move the path
        self.leg(symbol, &live.pair)?;

        if live.served.get(symbol) == Some(&live.step) {
            live.pair = self.step(&mut live.rng, live.pair, self.config.intraday_scale);
            live.step += 1;
            live.timestamp = Utc::now().max(live.timestamp + chrono::Duration::seconds(1));
        }
        live.served.insert(symbol.to_string(), live.step);

        Ok(PriceObservation::new(live.timestamp, self.leg(symbol, &live.pair)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::price_series::JoinedSeries;
    use crate::strategy::hedge_ratio::HedgeRatioEstimator;

    fn provider(seed: u64) -> SimulatedMarketData {
        SimulatedMarketData::new(SimulationConfig {
            seed,
            ..SimulationConfig::default()
        })
        .unwrap()
    }

    fn range() -> (DateTime<Utc>, DateTime<Utc>) {
        let end = Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap();
        (end - chrono::Duration::days(1000), end)
    }

    #[tokio::test]
    async fn test_history_is_deterministic_and_aligned() {
        let (start, end) = range();
        let sim = provider(7);

        let a1 = sim.fetch_historical("BZ=F", start, end).await.unwrap();
        let a2 = provider(7).fetch_historical("BZ=F", start, end).await.unwrap();
        let b = sim.fetch_historical("CL=F", start, end).await.unwrap();

        assert_eq!(a1, a2);
        assert_eq!(a1.len(), b.len());
        assert_eq!(JoinedSeries::inner_join(&a1, &b).len(), a1.len());
    }

    #[tokio::test]
    async fn test_history_recovers_beta() {
        let (start, end) = range();
        let sim = provider(11);
        let a = sim.fetch_historical("BZ=F", start, end).await.unwrap();
        let b = sim.fetch_historical("CL=F", start, end).await.unwrap();
        let joined = JoinedSeries::inner_join(&a, &b);

        let fit = HedgeRatioEstimator::new(30)
            .fit(&joined.dependent_prices(), &joined.independent_prices())
            .unwrap();
        assert!((fit.beta - 1.05).abs() < 0.15, "beta {}", fit.beta);
    }

    #[tokio::test]
    async fn test_unknown_symbol() {
        let (start, end) = range();
        let sim = provider(1);
        assert!(sim.fetch_historical("NG=F", start, end).await.is_err());
        assert!(sim.fetch_latest("NG=F", Duration::from_secs(60)).await.is_err());
    }

    #[tokio::test]
    async fn test_live_legs_share_a_step() {
        let sim = provider(3);
        let lookback = Duration::from_secs(60);

        let a0 = sim.fetch_latest("BZ=F", lookback).await.unwrap();
        let b0 = sim.fetch_latest("CL=F", lookback).await.unwrap();
        assert_eq!(a0.timestamp, b0.timestamp);

        let a1 = sim.fetch_latest("BZ=F", lookback).await.unwrap();
        let b1 = sim.fetch_latest("CL=F", lookback).await.unwrap();
        assert_eq!(a1.timestamp, b1.timestamp);
        assert!(a1.timestamp > a0.timestamp);
        assert!(b1.price > 0.0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let bad = SimulationConfig {
            daily_volatility: -1.0,
            ..SimulationConfig::default()
        };
        assert!(matches!(
            SimulatedMarketData::new(bad),
            Err(MarketDataError::Configuration(_))
        ));

        let bad = SimulationConfig {
            reversion_speed: 0.0,
            ..SimulationConfig::default()
        };
        assert!(SimulatedMarketData::new(bad).is_err());
    }
}
