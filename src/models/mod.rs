// src/models/mod.rs

pub mod additive;

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One row of the price table: the date and the price in USD.
///
/// Field names match the `Date,Price` header of the CSV cache.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct PriceObservation {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Price")]
    pub price: f64,
}

/// Ordered list of observations, ascending by date.
pub type Series = Vec<PriceObservation>;

/// A single projected day with its uncertainty band.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct ForecastRow {
    pub date: NaiveDate,
    pub mean: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Identity of a dataset, used to key fitted models.
pub fn fingerprint(series: &[PriceObservation]) -> u64 {
    let mut hasher = DefaultHasher::new();
    series.len().hash(&mut hasher);
    for obs in series {
        obs.date.hash(&mut hasher);
        obs.price.to_bits().hash(&mut hasher);
    }
    hasher.finish()
}

pub use additive::{AdditiveModel, FittedModel, Forecaster, MAX_HORIZON};

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(y: i32, m: u32, d: u32, price: f64) -> PriceObservation {
        PriceObservation {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            price,
        }
    }

    #[test]
    fn fingerprint_tracks_contents() {
        let a = vec![obs(2024, 1, 2, 77.1), obs(2024, 1, 3, 78.0)];
        let b = a.clone();
        let mut c = a.clone();
        c[1].price = 78.01;

        assert_eq!(fingerprint(&a), fingerprint(&b));
        assert_ne!(fingerprint(&a), fingerprint(&c));
        assert_ne!(fingerprint(&a), fingerprint(&a[..1]));
    }
}
