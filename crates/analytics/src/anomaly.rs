use crate::math::{mean, negligible_spread, quantile_sorted, round2, sample_std, sorted};
use crate::risk::ReturnSeries;
use crate::series::Series;
use chrono::{DateTime, Utc};
use configuration::AnalysisConfig;
use core_types::SpikeDirection;
use rust_decimal::Decimal;
use serde::Serialize;

/// Per-sample outcome of the four detectors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyRecord {
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
    /// Deviation from the whole-series mean in standard deviations.
    pub zscore: f64,
    /// Deviation from the trailing window's mean. `None` until the window is full.
    pub rolling_zscore: Option<f64>,
    /// Return into this sample, in percent.
    pub daily_return: Option<f64>,
    pub spike_direction: SpikeDirection,
    pub is_anomaly_zscore: bool,
    pub is_anomaly_iqr: bool,
    pub is_anomaly_rolling: bool,
    pub is_anomaly_spike: bool,
    pub is_anomaly_any: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnomalyCounts {
    pub zscore: usize,
    pub iqr: usize,
    pub rolling: usize,
    pub price_spike: usize,
    pub any_method: usize,
}

/// Static Tukey fences over the whole series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IqrBounds {
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyReport {
    pub total_data_points: usize,
    pub counts: AnomalyCounts,
    /// `any_method / total * 100`, two decimals.
    pub anomaly_percentage: f64,
    pub iqr_bounds: Option<IqrBounds>,
    pub records: Vec<AnomalyRecord>,
}

impl AnomalyReport {
    /// Timestamps of the most recent `limit` flagged samples, oldest first.
    pub fn recent_dates(&self, limit: usize) -> Vec<DateTime<Utc>> {
        let flagged: Vec<DateTime<Utc>> = self
            .records
            .iter()
            .filter(|r| r.is_anomaly_any)
            .map(|r| r.timestamp)
            .collect();
        flagged[flagged.len().saturating_sub(limit)..].to_vec()
    }
}

/// Flags outliers by z-score, IQR fences, rolling z-score and daily-return spikes.
pub struct AnomalyDetector<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> AnomalyDetector<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn detect(&self, series: &Series) -> AnomalyReport {
        let cfg = self.config;
        let prices = series.prices();
        let returns = ReturnSeries::from_series(series);

        let zscores = zscores(&prices);
        let rolling = rolling_zscores(&prices, cfg.rolling_window);
        let bounds = iqr_bounds(&prices, cfg.iqr_multiplier);

        let mut counts = AnomalyCounts::default();
        let records: Vec<AnomalyRecord> = series
            .points()
            .iter()
            .enumerate()
            .map(|(i, point)| {
                let price = prices[i];
                let daily_return = if i == 0 { None } else { returns.values()[i - 1] };

                let zscore = zscores[i];
                let is_anomaly_zscore = zscore.abs() > cfg.zscore_threshold;
                let rolling_zscore = rolling[i];
                let is_anomaly_rolling =
                    rolling_zscore.is_some_and(|z| z.abs() > cfg.rolling_threshold);
                let is_anomaly_iqr =
                    bounds.is_some_and(|b| price < b.lower || price > b.upper);
                let spike_direction = match daily_return {
                    Some(r) if r > cfg.spike_threshold_pct => SpikeDirection::Up,
                    Some(r) if r < -cfg.spike_threshold_pct => SpikeDirection::Down,
                    _ => SpikeDirection::Flat,
                };
                let is_anomaly_spike = spike_direction != SpikeDirection::Flat;
                let is_anomaly_any =
                    is_anomaly_zscore || is_anomaly_iqr || is_anomaly_rolling || is_anomaly_spike;

                counts.zscore += usize::from(is_anomaly_zscore);
                counts.iqr += usize::from(is_anomaly_iqr);
                counts.rolling += usize::from(is_anomaly_rolling);
                counts.price_spike += usize::from(is_anomaly_spike);
                counts.any_method += usize::from(is_anomaly_any);

                AnomalyRecord {
                    timestamp: point.timestamp,
                    price: point.price,
                    zscore,
                    rolling_zscore,
                    daily_return,
                    spike_direction,
                    is_anomaly_zscore,
                    is_anomaly_iqr,
                    is_anomaly_rolling,
                    is_anomaly_spike,
                    is_anomaly_any,
                }
            })
            .collect();

        let total = records.len();
        let anomaly_percentage = if total == 0 {
            0.0
        } else {
            round2(counts.any_method as f64 / total as f64 * 100.0)
        };
        tracing::debug!(coin = series.coin(), ?counts, "Anomaly detection finished.");

        AnomalyReport {
            total_data_points: total,
            counts,
            anomaly_percentage,
            iqr_bounds: bounds,
            records,
        }
    }
}

/// Z-score of each value against the mean and sample std of all values.
///
/// Values without spread all score 0. With `n` values a single outlier reaches at
/// most `(n - 1) / sqrt(n)`, so short series cannot exceed a threshold of 3.
pub fn zscores(values: &[f64]) -> Vec<f64> {
    match (mean(values), sample_std(values)) {
        (Some(m), Some(s)) if !negligible_spread(s, m) => {
            values.iter().map(|v| (v - m) / s).collect()
        }
        _ => vec![0.0; values.len()],
    }
}

/// Z-score of each value against the trailing `window` values (itself included).
///
/// A window without spread scores 0, since every value in it equals the mean.
pub fn rolling_zscores(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window < 2 || values.len() < window {
        return out;
    }
    for (start, slice) in values.windows(window).enumerate() {
        let i = start + window - 1;
        out[i] = match (mean(slice), sample_std(slice)) {
            (Some(m), Some(s)) if negligible_spread(s, m) => Some(0.0),
            (Some(m), Some(s)) => Some((values[i] - m) / s),
            _ => None,
        };
    }
    out
}

pub fn iqr_bounds(values: &[f64], multiplier: f64) -> Option<IqrBounds> {
    let ordered = sorted(values);
    let q1 = quantile_sorted(&ordered, 0.25)?;
    let q3 = quantile_sorted(&ordered, 0.75)?;
    let iqr = q3 - q1;
    Some(IqrBounds {
        lower: q1 - multiplier * iqr,
        upper: q3 + multiplier * iqr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use core_types::{PricePoint, RangeHint};

    fn series(prices: &[f64]) -> Series {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let raw = prices
            .iter()
            .enumerate()
            .map(|(i, p)| PricePoint {
                timestamp: start + Duration::days(i as i64),
                price: Decimal::try_from(*p).unwrap(),
            })
            .collect();
        Series::new("test", raw, RangeHint::Full).unwrap()
    }

    #[test]
    fn injected_spike_is_flagged_by_every_method() {
        let mut prices = vec![100.0; 30];
        prices[25] = 1000.0;
        let cfg = AnalysisConfig::default();
        let report = AnomalyDetector::new(&cfg).detect(&series(&prices));

        let spike = &report.records[25];
        assert!(spike.is_anomaly_zscore);
        assert!(spike.is_anomaly_iqr);
        assert!(spike.is_anomaly_rolling);
        assert!(spike.is_anomaly_spike);
        assert!(spike.is_anomaly_any);
        assert_eq!(spike.spike_direction, SpikeDirection::Up);

        // The drop back to 100 is a spike too, but not a level outlier.
        let after = &report.records[26];
        assert_eq!(after.spike_direction, SpikeDirection::Down);
        assert!(!after.is_anomaly_iqr);
        assert!(!after.is_anomaly_rolling);

        assert_eq!(report.counts.zscore, 1);
        assert_eq!(report.counts.iqr, 1);
        assert_eq!(report.counts.rolling, 1);
        assert_eq!(report.counts.price_spike, 2);
        assert_eq!(report.counts.any_method, 2);
        assert_eq!(report.anomaly_percentage, 6.67);
    }

    #[test]
    fn spike_before_the_rolling_window_fills_is_still_scored() {
        let mut prices = vec![100.0; 30];
        prices[5] = 1000.0;
        let cfg = AnalysisConfig::default();
        let report = AnomalyDetector::new(&cfg).detect(&series(&prices));

        let spike = &report.records[5];
        assert_eq!(spike.rolling_zscore, None);
        assert!(spike.zscore > cfg.zscore_threshold);
        assert!(spike.is_anomaly_zscore);
        assert!(spike.is_anomaly_iqr);
        assert!(spike.is_anomaly_spike);
        assert!(spike.is_anomaly_any);
    }

    #[test]
    fn series_shorter_than_the_rolling_window() {
        let mut prices = vec![100.0; 15];
        prices[10] = 1000.0;
        let cfg = AnalysisConfig::default();
        let report = AnomalyDetector::new(&cfg).detect(&series(&prices));

        assert!(report.records.iter().all(|r| r.rolling_zscore.is_none()));
        let spike = &report.records[10];
        assert!(spike.is_anomaly_zscore);
        assert!(spike.is_anomaly_iqr);
        assert!(spike.is_anomaly_spike);
        assert_eq!(report.counts.zscore, 1);
    }

    #[test]
    fn rolling_detector_catches_local_jumps_the_global_score_misses() {
        // A dip back to the starting price is ordinary for the whole ramp but far
        // below the trailing 20 samples.
        let mut prices: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        prices[30] = 100.0;
        let cfg = AnalysisConfig::default();
        let report = AnomalyDetector::new(&cfg).detect(&series(&prices));

        let dip = &report.records[30];
        assert!(!dip.is_anomaly_zscore);
        assert!(!dip.is_anomaly_iqr);
        assert!(dip.rolling_zscore.is_some_and(|z| z < -cfg.rolling_threshold));
        assert!(dip.is_anomaly_rolling);
        assert!(dip.is_anomaly_any);
        assert_eq!(report.counts.zscore, 0);
        assert_eq!(report.counts.rolling, 1);
    }

    #[test]
    fn flat_series_has_no_anomalies() {
        let cfg = AnalysisConfig::default();
        let report = AnomalyDetector::new(&cfg).detect(&series(&[100.0; 30]));
        assert_eq!(report.counts, AnomalyCounts::default());
        assert!(report.records.iter().all(|r| r.zscore == 0.0));
        assert!(report.records[19..].iter().all(|r| r.rolling_zscore == Some(0.0)));
        assert!(report.records[..19].iter().all(|r| r.rolling_zscore.is_none()));
    }

    #[test]
    fn recent_dates_are_capped() {
        let prices: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 100.0 } else { 150.0 }).collect();
        let cfg = AnalysisConfig::default();
        let report = AnomalyDetector::new(&cfg).detect(&series(&prices));

        // Every sample after the first is a ±50% / -33% move.
        assert_eq!(report.counts.price_spike, 19);
        let dates = report.recent_dates(10);
        assert_eq!(dates.len(), 10);
        assert_eq!(dates.last(), Some(&report.records[19].timestamp));
    }
}
