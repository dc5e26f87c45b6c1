//! Signal Engine
//!
//! Turns aligned price pairs into spread statistics and classified signals.
//!
//! For every stored point t:
//! - spread[t]       = A[t] - (beta * B[t] + intercept)
//! - rolling_mean[t] = mean of the trailing min(t+1, W) spreads
//! - rolling_std[t]  = sample std of the same window (0.0 when undefined)
//! - z_score[t]      = (spread[t] - rolling_mean[t]) / rolling_std[t], or 0.0
//! - valid_signal[t] = |spread[t] - spread[t-1]| > volatility_factor
//!
//! The stored series is only ever extended through the same update path, so
//! an incrementally grown series equals a full recompute over the same rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::price_series::JoinedSeries;
use crate::domain::signal::{Signal, SignalFlags};
use crate::strategy::hedge_ratio::HedgeRatio;
use crate::strategy::params::StrategyConfig;
use crate::strategy::zscore_gate::{ZScoreGate, ZScoreResult};

/// One stored point of the spread series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadPoint {
    pub timestamp: DateTime<Utc>,
    pub price_a: f64,
    pub price_b: f64,
    pub spread: f64,
    pub rolling_mean: f64,
    pub rolling_std: f64,
    pub z_score: f64,
    pub valid_signal: bool,
    pub flags: SignalFlags,
}

impl SpreadPoint {
    pub fn signal(&self) -> Signal {
        self.flags.signal()
    }
}

/// Result of scoring a live price pair against the stored history
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveEvaluation {
    pub spread: f64,
    pub rolling_mean: f64,
    pub rolling_std: f64,
    pub z_score: f64,
    pub valid_signal: bool,
    pub signal: Signal,
}

impl LiveEvaluation {
    pub fn is_finite(&self) -> bool {
        self.spread.is_finite()
            && self.rolling_mean.is_finite()
            && self.rolling_std.is_finite()
            && self.z_score.is_finite()
    }
}

/// Summary counts over the stored series
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SignalCounts {
    pub long: usize,
    pub short: usize,
    pub close: usize,
}

/// Spread/z-score engine bound to one hedge ratio
#[derive(Debug, Clone)]
pub struct SignalEngine {
    hedge_ratio: HedgeRatio,
    volatility_factor: f64,
    gate: ZScoreGate,
    series: Vec<SpreadPoint>,
}

impl SignalEngine {
    pub fn new(hedge_ratio: HedgeRatio, config: &StrategyConfig) -> Self {
        Self {
            hedge_ratio,
            volatility_factor: config.volatility_factor,
            gate: ZScoreGate::new(config.rolling_window),
            series: Vec::new(),
        }
    }

    /// Build an engine and run the full-history pass
    pub fn from_history(hedge_ratio: HedgeRatio, config: &StrategyConfig, history: &JoinedSeries) -> Self {
        let mut engine = Self::new(hedge_ratio, config);
        engine.recompute(history);
        engine
    }

    /// Discard the stored series and recompute it over `history`
    pub fn recompute(&mut self, history: &JoinedSeries) {
        self.gate.reset();
        self.series.clear();
        self.series.reserve(history.len());
        for row in history.rows() {
            self.push(row.timestamp, row.price_a, row.price_b);
        }
    }

    pub fn spread(&self, price_a: f64, price_b: f64) -> f64 {
        self.hedge_ratio.spread(price_a, price_b)
    }

    /// Append one observation to the stored series
    pub fn push(&mut self, timestamp: DateTime<Utc>, price_a: f64, price_b: f64) -> &SpreadPoint {
        let spread = self.spread(price_a, price_b);
        let valid_signal = self.is_valid_move(spread);
        let stats = self.gate.update(spread);

        self.series.push(SpreadPoint {
            timestamp,
            price_a,
            price_b,
            spread,
            rolling_mean: stats.mean,
            rolling_std: stats.std_dev,
            z_score: stats.z_score,
            valid_signal,
            flags: SignalFlags::evaluate(stats.z_score, valid_signal),
        });

        &self.series[self.series.len() - 1]
    }

    /// Append only when the observation is newer than the last stored point.
    /// Returns whether the series grew.
    pub fn append_if_newer(&mut self, timestamp: DateTime<Utc>, price_a: f64, price_b: f64) -> bool {
        match self.series.last() {
            Some(last) if timestamp <= last.timestamp => false,
            _ => {
                self.push(timestamp, price_a, price_b);
                true
            }
        }
    }

    /// Score a live price pair against the most recent stored window.
    /// Does not modify the series.
    pub fn evaluate(&self, price_a: f64, price_b: f64) -> LiveEvaluation {
        let spread = self.spread(price_a, price_b);
        let valid_signal = self.is_valid_move(spread);

        let stats = self.gate.score(spread).unwrap_or(ZScoreResult {
            z_score: 0.0,
            mean: spread,
            std_dev: 0.0,
            spread,
        });

        LiveEvaluation {
            spread,
            rolling_mean: stats.mean,
            rolling_std: stats.std_dev,
            z_score: stats.z_score,
            valid_signal,
            signal: SignalFlags::evaluate(stats.z_score, valid_signal).signal(),
        }
    }

    fn is_valid_move(&self, spread: f64) -> bool {
        self.gate
            .last()
            .map(|prev| (spread - prev).abs() > self.volatility_factor)
            .unwrap_or(false)
    }

    pub fn hedge_ratio(&self) -> HedgeRatio {
        self.hedge_ratio
    }

    pub fn series(&self) -> &[SpreadPoint] {
        &self.series
    }

    /// Last `n` stored points (all of them when fewer exist)
    pub fn tail(&self, n: usize) -> &[SpreadPoint] {
        let start = self.series.len().saturating_sub(n);
        &self.series[start..]
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.series.last().map(|p| p.timestamp)
    }

    pub fn signal_counts(&self) -> SignalCounts {
        self.series.iter().fold(SignalCounts::default(), |mut acc, p| {
            acc.long += usize::from(p.flags.long);
            acc.short += usize::from(p.flags.short);
            acc.close += usize::from(p.flags.close);
            acc
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::price_series::JoinedRow;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};

    fn identity_fit() -> HedgeRatio {
        HedgeRatio {
            beta: 0.0,
            intercept: 0.0,
            r_squared: 0.0,
        }
    }

    fn ts(i: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(i)
    }

    /// With beta = 0 and intercept = 0 the spread equals price A
    fn series_of(spreads: &[f64]) -> JoinedSeries {
        JoinedSeries::from_rows(
            spreads
                .iter()
                .enumerate()
                .map(|(i, s)| JoinedRow {
                    timestamp: ts(i as i64),
                    price_a: *s,
                    price_b: 50.0,
                })
                .collect(),
        )
    }

    fn config(window: usize, volatility_factor: f64) -> StrategyConfig {
        StrategyConfig::default()
            .with_rolling_window(window)
            .with_volatility_factor(volatility_factor)
    }

    #[test]
    fn test_worked_example() {
        let engine = SignalEngine::from_history(
            identity_fit(),
            &config(2, 1.0),
            &series_of(&[0.0, 0.0, 5.0, 5.0, -5.0]),
        );
        let points = engine.series();

        let valid: Vec<bool> = points.iter().map(|p| p.valid_signal).collect();
        assert_eq!(valid, vec![false, false, true, false, true]);

        let expected_mean = [0.0, 0.0, 2.5, 5.0, 0.0];
        let expected_std = [0.0, 0.0, 12.5_f64.sqrt(), 0.0, 50.0_f64.sqrt()];
        let expected_z = [0.0, 0.0, 0.5_f64.sqrt(), 0.0, -(0.5_f64.sqrt())];
        for (i, p) in points.iter().enumerate() {
            assert_relative_eq!(p.rolling_mean, expected_mean[i], epsilon = 1e-12);
            assert_relative_eq!(p.rolling_std, expected_std[i], epsilon = 1e-12);
            assert_relative_eq!(p.z_score, expected_z[i], epsilon = 1e-12);
        }

        let signals: Vec<Signal> = points.iter().map(|p| p.signal()).collect();
        assert_eq!(
            signals,
            vec![Signal::Close, Signal::Close, Signal::Hold, Signal::Close, Signal::Hold]
        );
    }

    #[test]
    fn test_spread_uses_hedge_ratio() {
        let fit = HedgeRatio {
            beta: 1.5,
            intercept: 2.0,
            r_squared: 0.8,
        };
        let engine = SignalEngine::new(fit, &StrategyConfig::default());
        assert_relative_eq!(engine.spread(100.0, 60.0), 100.0 - 92.0);
    }

    #[test]
    fn test_zero_std_window_never_enters() {
        let engine = SignalEngine::from_history(
            identity_fit(),
            &config(5, 0.0),
            &series_of(&[3.3; 12]),
        );

        for p in engine.series() {
            assert_eq!(p.rolling_std, 0.0);
            assert_eq!(p.z_score, 0.0);
            assert!(!p.flags.long && !p.flags.short);
            assert_eq!(p.signal(), Signal::Close);
        }
    }

    #[test]
    fn test_long_signal_on_sharp_drop() {
        let mut spreads = vec![0.0, 0.1, -0.1, 0.05, -0.05, 0.1, -0.1, 0.0, 0.05, -0.05];
        spreads.push(-3.0);
        let engine = SignalEngine::from_history(identity_fit(), &config(10, 0.5), &series_of(&spreads));

        let last = engine.series().last().unwrap();
        assert!(last.valid_signal);
        assert!(last.z_score < -2.0);
        assert_eq!(last.signal(), Signal::Long);
        assert_eq!(engine.signal_counts().long, 1);
    }

    #[test]
    fn test_short_requires_valid_move() {
        // Large z but the move from the previous spread is below the factor
        let spreads = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.4];
        let engine = SignalEngine::from_history(identity_fit(), &config(10, 0.5), &series_of(&spreads));

        let last = engine.series().last().unwrap();
        assert!(last.z_score > 2.0);
        assert!(!last.valid_signal);
        assert_eq!(last.signal(), Signal::Hold);
    }

    #[test]
    fn test_incremental_equals_recompute() {
        let spreads = [1.0, 1.4, 0.7, 2.2, -0.3, 0.9, 1.8, -1.1, 0.2, 0.5];
        let cfg = config(4, 0.5);

        let full = SignalEngine::from_history(identity_fit(), &cfg, &series_of(&spreads));

        let mut incremental = SignalEngine::from_history(identity_fit(), &cfg, &series_of(&spreads[..6]));
        for (i, s) in spreads.iter().enumerate().skip(6) {
            assert!(incremental.append_if_newer(ts(i as i64), *s, 50.0));
        }

        assert_eq!(full.series(), incremental.series());
    }

    #[test]
    fn test_append_rejects_stale_timestamp() {
        let mut engine = SignalEngine::from_history(identity_fit(), &config(3, 0.5), &series_of(&[1.0, 2.0, 3.0]));
        assert!(!engine.append_if_newer(ts(2), 9.0, 50.0));
        assert!(!engine.append_if_newer(ts(0), 9.0, 50.0));
        assert_eq!(engine.len(), 3);
        assert!(engine.append_if_newer(ts(3), 9.0, 50.0));
        assert_eq!(engine.len(), 4);
    }

    #[test]
    fn test_live_evaluation_uses_stored_window() {
        let engine = SignalEngine::from_history(
            identity_fit(),
            &config(4, 0.5),
            &series_of(&[9.0, 1.0, 2.0, 3.0, 4.0]),
        );

        // Stored window is [1, 2, 3, 4]: mean 2.5, std sqrt(5/3)
        let live = engine.evaluate(10.0, 50.0);
        assert_relative_eq!(live.rolling_mean, 2.5);
        assert_relative_eq!(live.rolling_std, (5.0_f64 / 3.0).sqrt(), epsilon = 1e-12);
        assert!(live.valid_signal);
        assert!(live.z_score > 2.0);
        assert_eq!(live.signal, Signal::Short);
        assert_eq!(engine.len(), 5);
    }

    #[test]
    fn test_live_close_near_mean() {
        let engine = SignalEngine::from_history(
            identity_fit(),
            &config(4, 0.5),
            &series_of(&[1.0, 2.0, 3.0, 4.0]),
        );
        let live = engine.evaluate(2.5, 50.0);
        assert_relative_eq!(live.z_score, 0.0);
        assert_eq!(live.signal, Signal::Close);
    }

    #[test]
    fn test_tail() {
        let engine = SignalEngine::from_history(identity_fit(), &config(3, 0.5), &series_of(&[1.0, 2.0, 3.0, 4.0]));
        assert_eq!(engine.tail(2).len(), 2);
        assert_eq!(engine.tail(2)[0].spread, 3.0);
        assert_eq!(engine.tail(100).len(), 4);
    }
}
