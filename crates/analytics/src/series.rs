use crate::error::AnalyticsError;
use chrono::{DateTime, NaiveDate, Utc};
use core_types::{PricePoint, RangeHint};
use rust_decimal::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;

/// The fewest samples any report can be built from.
pub const MIN_POINTS: usize = 2;

/// An ordered, de-duplicated price history for one coin.
///
/// Timestamps are strictly increasing. Calendar gaps are kept as they are and only
/// show up in [`DataQuality`].
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    coin: String,
    points: Vec<PricePoint>,
}

impl Series {
    /// Normalizes raw samples (in ingestion order) into a `Series`.
    ///
    /// Fails with `NotFound` when there are no samples at all and with
    /// `InsufficientData` when fewer than two remain after the range is applied.
    pub fn new(
        coin: impl Into<String>,
        raw: Vec<PricePoint>,
        range: RangeHint,
    ) -> Result<Self, AnalyticsError> {
        let coin = coin.into();
        if raw.is_empty() {
            return Err(AnalyticsError::NotFound(coin));
        }

        let mut points = normalize(raw);
        if let Some(cutoff) = points.last().and_then(|p| range.cutoff(p.timestamp)) {
            points.retain(|p| p.timestamp >= cutoff);
        }

        if points.len() < MIN_POINTS {
            return Err(AnalyticsError::InsufficientData {
                required: MIN_POINTS,
                available: points.len(),
            });
        }
        Ok(Self { coin, points })
    }

    pub fn coin(&self) -> &str {
        &self.coin
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> &PricePoint {
        &self.points[0]
    }

    pub fn last(&self) -> &PricePoint {
        &self.points[self.points.len() - 1]
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.points.iter().map(|p| p.timestamp).collect()
    }

    /// Prices as `f64` for the statistical computations.
    pub fn prices(&self) -> Vec<f64> {
        self.points
            .iter()
            .map(|p| p.price.to_f64().unwrap_or_default())
            .collect()
    }

    pub fn data_quality(&self) -> DataQuality {
        DataQuality::daily(&self.points)
    }
}

/// Sorts by timestamp and keeps the most recently ingested sample per timestamp.
pub fn normalize(mut raw: Vec<PricePoint>) -> Vec<PricePoint> {
    // Stable sort: equal timestamps keep their ingestion order.
    raw.sort_by_key(|p| p.timestamp);

    let mut points: Vec<PricePoint> = Vec::with_capacity(raw.len());
    for point in raw {
        match points.last_mut() {
            Some(last) if last.timestamp == point.timestamp => *last = point,
            _ => points.push(point),
        }
    }
    points
}

/// Coverage of the expected daily cadence between the first and last sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DataQuality {
    pub expected_days: usize,
    pub observed_days: usize,
    /// Calendar days inside the span with no sample.
    pub missing_values: usize,
    /// `(1 - missing / expected) * 100`.
    pub data_completeness: f64,
}

impl DataQuality {
    fn daily(points: &[PricePoint]) -> Self {
        let days: BTreeSet<NaiveDate> = points.iter().map(|p| p.timestamp.date_naive()).collect();

        let (Some(first), Some(last)) = (days.first(), days.last()) else {
            return Self {
                expected_days: 0,
                observed_days: 0,
                missing_values: 0,
                data_completeness: 0.0,
            };
        };

        let expected_days = (*last - *first).num_days() as usize + 1;
        let observed_days = days.len();
        let missing_values = expected_days.saturating_sub(observed_days);
        let data_completeness = (1.0 - missing_values as f64 / expected_days as f64) * 100.0;

        Self {
            expected_days,
            observed_days,
            missing_values,
            data_completeness,
        }
    }
}
