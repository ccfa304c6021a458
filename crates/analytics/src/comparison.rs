use crate::math::{covariance, finite, negligible_spread, sample_std};
use crate::risk::ReturnSeries;
use crate::series::Series;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexedPoint {
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
    /// Price rebased so the first sample is 100.
    pub indexed: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexedSeries {
    pub percent_change: Option<f64>,
    pub series: Vec<IndexedPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankEntry {
    pub coin: String,
    pub percent_change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexedComparison {
    pub coins: BTreeMap<String, IndexedSeries>,
    /// Best performer first. Coins without a defined change are left out.
    pub ranking: Vec<RankEntry>,
}

pub fn index_series(series: &Series) -> IndexedSeries {
    let prices = series.prices();
    let base = prices[0];

    let points = series
        .points()
        .iter()
        .zip(&prices)
        .map(|(point, price)| IndexedPoint {
            timestamp: point.timestamp,
            price: point.price,
            indexed: if base == 0.0 { None } else { finite(price / base * 100.0) },
        })
        .collect::<Vec<_>>();

    IndexedSeries {
        percent_change: points.last().and_then(|p| p.indexed).map(|i| i - 100.0),
        series: points,
    }
}

pub fn compare(all: &[Series]) -> IndexedComparison {
    let coins: BTreeMap<String, IndexedSeries> = all
        .iter()
        .map(|s| (s.coin().to_string(), index_series(s)))
        .collect();

    let mut ranking: Vec<RankEntry> = coins
        .iter()
        .filter_map(|(coin, indexed)| {
            indexed.percent_change.map(|percent_change| RankEntry {
                coin: coin.clone(),
                percent_change,
            })
        })
        .collect();
    ranking.sort_by(|a, b| {
        b.percent_change
            .partial_cmp(&a.percent_change)
            .unwrap_or(Ordering::Equal)
    });

    IndexedComparison { coins, ranking }
}

/// Pearson correlations of daily returns, aligned on shared timestamps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub coins: Vec<String>,
    /// `matrix[i][j]` correlates `coins[i]` with `coins[j]`.
    pub matrix: Vec<Vec<Option<f64>>>,
}

pub fn correlation(all: &[Series]) -> CorrelationMatrix {
    let returns: Vec<HashMap<DateTime<Utc>, f64>> = all
        .iter()
        .map(|s| {
            let r = ReturnSeries::from_series(s);
            r.timestamps()
                .iter()
                .zip(r.values())
                .filter_map(|(ts, v)| v.map(|v| (*ts, v)))
                .collect()
        })
        .collect();

    let matrix = (0..all.len())
        .map(|i| {
            (0..all.len())
                .map(|j| pearson_aligned(&returns[i], &returns[j]))
                .collect()
        })
        .collect();

    CorrelationMatrix {
        coins: all.iter().map(|s| s.coin().to_string()).collect(),
        matrix,
    }
}

fn pearson_aligned(
    a: &HashMap<DateTime<Utc>, f64>,
    b: &HashMap<DateTime<Utc>, f64>,
) -> Option<f64> {
    let mut shared: Vec<(&DateTime<Utc>, f64)> = a
        .iter()
        .filter_map(|(ts, x)| b.get(ts).map(|_| (ts, *x)))
        .collect();
    shared.sort_by_key(|(ts, _)| **ts);

    let xs: Vec<f64> = shared.iter().map(|(_, x)| *x).collect();
    let ys: Vec<f64> = shared.iter().filter_map(|(ts, _)| b.get(*ts).copied()).collect();

    let sx = sample_std(&xs)?;
    let sy = sample_std(&ys)?;
    if negligible_spread(sx, 1.0) || negligible_spread(sy, 1.0) {
        return None;
    }
    covariance(&xs, &ys)
        .and_then(|c| finite(c / (sx * sy)))
        .map(|r| r.clamp(-1.0, 1.0))
}
