//! Hedge Ratio Estimation
//!
//! Ordinary least squares fit of the dependent leg on the independent leg:
//!
//!   A ≈ beta * B + intercept
//!
//!   beta      = Σ[(b - b̄)(a - ā)] / Σ(b - b̄)²
//!   intercept = ā - beta * b̄
//!   r²        = 1 - SSR / SST
//!
//! Fitted once per initialization; the result is immutable afterwards.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use thiserror::Error;
use tracing::debug;

/// Below this the regressor is treated as constant
const MIN_REGRESSOR_VARIANCE: f64 = 1e-12;

/// Fitted linear relationship between the two legs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HedgeRatio {
    pub beta: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

impl HedgeRatio {
    /// Spread implied by this fit for one price pair
    pub fn spread(&self, price_a: f64, price_b: f64) -> f64 {
        price_a - (self.beta * price_b + self.intercept)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimationError {
    #[error("Insufficient data: need {required} aligned rows, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("Degenerate fit: independent series has zero variance")]
    DegenerateFit,

    #[error("Series length mismatch: dependent {dependent}, independent {independent}")]
    LengthMismatch { dependent: usize, independent: usize },
}

/// OLS hedge ratio estimator
#[derive(Debug, Clone, Copy)]
pub struct HedgeRatioEstimator {
    min_observations: usize,
}

impl HedgeRatioEstimator {
    /// `min_observations` is normally the rolling window
    pub fn new(min_observations: usize) -> Self {
        Self { min_observations }
    }

    pub fn min_observations(&self) -> usize {
        self.min_observations
    }

    /// Fit `dependent ≈ beta * independent + intercept`
    pub fn fit(&self, dependent: &[f64], independent: &[f64]) -> Result<HedgeRatio, EstimationError> {
        if dependent.len() != independent.len() {
            return Err(EstimationError::LengthMismatch {
                dependent: dependent.len(),
                independent: independent.len(),
            });
        }

        let n = dependent.len();
        if n < self.min_observations || n < 2 {
            return Err(EstimationError::InsufficientData {
                required: self.min_observations.max(2),
                available: n,
            });
        }

        let mean_a = dependent.mean();
        let mean_b = independent.mean();

        let mut s_bb = 0.0;
        let mut s_ab = 0.0;
        let mut s_aa = 0.0;
        for (a, b) in dependent.iter().zip(independent.iter()) {
            let da = a - mean_a;
            let db = b - mean_b;
            s_bb += db * db;
            s_ab += da * db;
            s_aa += da * da;
        }

        if s_bb / n as f64 <= MIN_REGRESSOR_VARIANCE {
            return Err(EstimationError::DegenerateFit);
        }

        let beta = s_ab / s_bb;
        let intercept = mean_a - beta * mean_b;
        if !beta.is_finite() || !intercept.is_finite() {
            return Err(EstimationError::DegenerateFit);
        }

        let ssr: f64 = dependent
            .iter()
            .zip(independent.iter())
            .map(|(a, b)| {
                let residual = a - (beta * b + intercept);
                residual * residual
            })
            .sum();

        let r_squared = if s_aa > 0.0 { 1.0 - ssr / s_aa } else { 0.0 };

        debug!(beta, intercept, r_squared, rows = n, "Hedge ratio fitted");

        Ok(HedgeRatio {
            beta,
            intercept,
            r_squared,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_exact_linear_relationship() {
        let b: Vec<f64> = (0..50).map(|i| 60.0 + i as f64 * 0.5).collect();
        let a: Vec<f64> = b.iter().map(|x| 1.1 * x + 3.0).collect();

        let fit = HedgeRatioEstimator::new(10).fit(&a, &b).unwrap();
        assert_relative_eq!(fit.beta, 1.1, epsilon = 1e-9);
        assert_relative_eq!(fit.intercept, 3.0, epsilon = 1e-7);
        assert_relative_eq!(fit.r_squared, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_noisy_relationship() {
        let b = [10.0, 11.0, 12.0, 13.0, 14.0];
        let a = [21.0, 22.5, 24.5, 26.0, 28.5];
        // b̄ = 12, ā = 24.5; Sbb = 10, Sab = 18.5
        let fit = HedgeRatioEstimator::new(5).fit(&a, &b).unwrap();
        assert_relative_eq!(fit.beta, 1.85, epsilon = 1e-12);
        assert_relative_eq!(fit.intercept, 24.5 - 1.85 * 12.0, epsilon = 1e-9);
        assert!(fit.r_squared > 0.98 && fit.r_squared < 1.0);
    }

    #[test]
    fn test_deterministic() {
        let b: Vec<f64> = (0..30).map(|i| 70.0 + (i as f64 * 0.7).sin() * 4.0).collect();
        let a: Vec<f64> = b.iter().enumerate().map(|(i, x)| 0.95 * x + 5.0 + (i % 3) as f64 * 0.1).collect();

        let estimator = HedgeRatioEstimator::new(30);
        let first = estimator.fit(&a, &b).unwrap();
        let second = estimator.fit(&a, &b).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_insufficient_data() {
        let result = HedgeRatioEstimator::new(10).fit(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert_eq!(
            result,
            Err(EstimationError::InsufficientData {
                required: 10,
                available: 3
            })
        );
    }

    #[test]
    fn test_degenerate_fit() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [5.0, 5.0, 5.0, 5.0];
        assert_eq!(
            HedgeRatioEstimator::new(2).fit(&a, &b),
            Err(EstimationError::DegenerateFit)
        );
    }

    #[test]
    fn test_constant_dependent_leg() {
        let a = [7.0, 7.0, 7.0, 7.0];
        let b = [1.0, 2.0, 3.0, 4.0];
        let fit = HedgeRatioEstimator::new(2).fit(&a, &b).unwrap();
        assert_relative_eq!(fit.beta, 0.0, epsilon = 1e-12);
        assert_relative_eq!(fit.intercept, 7.0, epsilon = 1e-12);
        assert_eq!(fit.r_squared, 0.0);
    }

    #[test]
    fn test_length_mismatch() {
        assert!(matches!(
            HedgeRatioEstimator::new(2).fit(&[1.0, 2.0], &[1.0]),
            Err(EstimationError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_spread_uses_fit() {
        let fit = HedgeRatio {
            beta: 1.2,
            intercept: 2.0,
            r_squared: 0.9,
        };
        assert_relative_eq!(fit.spread(100.0, 80.0), 100.0 - (96.0 + 2.0));
    }
}
