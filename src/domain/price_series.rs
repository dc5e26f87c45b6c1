//! Price Series
//!
//! Per-instrument price history and the timestamp inner join that aligns
//! the dependent and independent legs before estimation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single price observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

impl PriceObservation {
    pub fn new(timestamp: DateTime<Utc>, price: f64) -> Self {
        Self { timestamp, price }
    }
}

/// Ordered price history for one instrument
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: String,
    observations: Vec<PriceObservation>,
}

impl PriceSeries {
    /// Build a series, sorting by timestamp and keeping the last value seen
    /// for a duplicated timestamp so the result is strictly increasing.
    pub fn new(symbol: impl Into<String>, observations: Vec<PriceObservation>) -> Self {
        let mut by_time: BTreeMap<DateTime<Utc>, f64> = BTreeMap::new();
        for obs in observations {
            by_time.insert(obs.timestamp, obs.price);
        }

        Self {
            symbol: symbol.into(),
            observations: by_time
                .into_iter()
                .map(|(timestamp, price)| PriceObservation { timestamp, price })
                .collect(),
        }
    }

    pub fn observations(&self) -> &[PriceObservation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn last(&self) -> Option<&PriceObservation> {
        self.observations.last()
    }
}

/// One aligned row of the two legs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoinedRow {
    pub timestamp: DateTime<Utc>,
    /// Dependent leg (regressand)
    pub price_a: f64,
    /// Independent leg (regressor)
    pub price_b: f64,
}

/// Both legs inner-joined on timestamp
#[derive(Debug, Clone, Default)]
pub struct JoinedSeries {
    rows: Vec<JoinedRow>,
}

impl JoinedSeries {
    /// Inner join on timestamp. Rows where either price is missing or not
    /// finite are dropped.
    pub fn inner_join(dependent: &PriceSeries, independent: &PriceSeries) -> Self {
        let lookup: BTreeMap<DateTime<Utc>, f64> = independent
            .observations()
            .iter()
            .map(|o| (o.timestamp, o.price))
            .collect();

        let rows = dependent
            .observations()
            .iter()
            .filter_map(|a| {
                let price_b = *lookup.get(&a.timestamp)?;
                if a.price.is_finite() && price_b.is_finite() {
                    Some(JoinedRow {
                        timestamp: a.timestamp,
                        price_a: a.price,
                        price_b,
                    })
                } else {
                    None
                }
            })
            .collect();

        Self { rows }
    }

    pub fn from_rows(rows: Vec<JoinedRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[JoinedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dependent_prices(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.price_a).collect()
    }

    pub fn independent_prices(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.price_b).collect()
    }

    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.rows.first().map(|r| r.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.rows.last().map(|r| r.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_series_sorted_and_deduplicated() {
        let series = PriceSeries::new(
            "BZ=F",
            vec![
                PriceObservation::new(day(3), 82.0),
                PriceObservation::new(day(1), 80.0),
                PriceObservation::new(day(3), 83.0),
                PriceObservation::new(day(2), 81.0),
            ],
        );

        let times: Vec<_> = series.observations().iter().map(|o| o.timestamp).collect();
        assert_eq!(times, vec![day(1), day(2), day(3)]);
        assert_eq!(series.last().unwrap().price, 83.0);
    }

    #[test]
    fn test_inner_join_drops_unmatched_rows() {
        let brent = PriceSeries::new(
            "BZ=F",
            vec![
                PriceObservation::new(day(1), 80.0),
                PriceObservation::new(day(2), 81.0),
                PriceObservation::new(day(4), 84.0),
            ],
        );
        let wti = PriceSeries::new(
            "CL=F",
            vec![
                PriceObservation::new(day(1), 76.0),
                PriceObservation::new(day(3), 77.0),
                PriceObservation::new(day(4), 79.0),
            ],
        );

        let joined = JoinedSeries::inner_join(&brent, &wti);
        assert_eq!(joined.len(), 2);
        assert_eq!(joined.dependent_prices(), vec![80.0, 84.0]);
        assert_eq!(joined.independent_prices(), vec![76.0, 79.0]);
        assert_eq!(joined.first_timestamp(), Some(day(1)));
        assert_eq!(joined.last_timestamp(), Some(day(4)));
    }

    #[test]
    fn test_inner_join_drops_non_finite_prices() {
        let brent = PriceSeries::new(
            "BZ=F",
            vec![
                PriceObservation::new(day(1), f64::NAN),
                PriceObservation::new(day(2), 81.0),
            ],
        );
        let wti = PriceSeries::new(
            "CL=F",
            vec![
                PriceObservation::new(day(1), 76.0),
                PriceObservation::new(day(2), 77.0),
            ],
        );

        let joined = JoinedSeries::inner_join(&brent, &wti);
        assert_eq!(joined.len(), 1);
        assert_eq!(joined.rows()[0].timestamp, day(2));
    }
}
