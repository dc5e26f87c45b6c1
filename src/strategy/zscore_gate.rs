//! Z-Score Gate
//!
//! Trailing window of spread values and the rolling statistics computed
//! over it.
//!
//! Z-Score Formula: z = (spread - rolling_mean) / rolling_std
//!
//! The window expands from a single sample up to `window` and then slides.
//! The standard deviation is the sample deviation (n - 1 denominator); a
//! one-sample window has no deviation and reports 0.0.

use std::collections::VecDeque;

use statrs::statistics::Statistics;

/// Deviations below this are floating point residue of an all-equal window
pub const MIN_STD_DEV: f64 = 1e-10;

/// Result of a z-score calculation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZScoreResult {
    /// Z-score, exactly 0.0 when the deviation is zero
    pub z_score: f64,
    /// Rolling mean used in calculation
    pub mean: f64,
    /// Rolling standard deviation, snapped to 0.0 when degenerate
    pub std_dev: f64,
    /// Spread value being scored
    pub spread: f64,
}

impl ZScoreResult {
    fn from_window<'a, I>(spread: f64, window: I) -> Self
    where
        I: IntoIterator<Item = &'a f64> + Clone,
    {
        let mean = window.clone().into_iter().mean();
        let std_dev = normalize_std(window.into_iter().std_dev());
        Self {
            z_score: z_score(spread, mean, std_dev),
            mean,
            std_dev,
            spread,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.z_score.is_finite() && self.mean.is_finite() && self.std_dev.is_finite()
    }
}

/// Map an undefined or residual deviation to exactly zero
fn normalize_std(std_dev: f64) -> f64 {
    if std_dev.is_nan() || std_dev < MIN_STD_DEV {
        0.0
    } else {
        std_dev
    }
}

/// z = (spread - mean) / std when std > 0, otherwise 0.0
pub fn z_score(spread: f64, mean: f64, std_dev: f64) -> f64 {
    if std_dev > 0.0 {
        (spread - mean) / std_dev
    } else {
        0.0
    }
}

/// Rolling spread window
#[derive(Debug, Clone)]
pub struct ZScoreGate {
    window: usize,
    buffer: VecDeque<f64>,
}

impl ZScoreGate {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            buffer: VecDeque::with_capacity(window + 1),
        }
    }

    /// Push a spread into the window and score it against the window that
    /// now includes it. Used for every stored point of the series.
    pub fn update(&mut self, spread: f64) -> ZScoreResult {
        self.buffer.push_back(spread);
        while self.buffer.len() > self.window {
            self.buffer.pop_front();
        }
        ZScoreResult::from_window(spread, self.buffer.iter())
    }

    /// Score a spread against the stored window without modifying it.
    /// Used for live single-step evaluation. `None` when nothing is stored.
    pub fn score(&self, spread: f64) -> Option<ZScoreResult> {
        if self.buffer.is_empty() {
            return None;
        }
        Some(ZScoreResult::from_window(spread, self.buffer.iter()))
    }

    /// Most recently pushed spread
    pub fn last(&self) -> Option<f64> {
        self.buffer.back().copied()
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.buffer.len() >= self.window
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn values(&self) -> impl Iterator<Item = &f64> {
        self.buffer.iter()
    }
}
