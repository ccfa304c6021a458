use crate::anomaly::{AnomalyCounts, AnomalyDetector, AnomalyRecord, IqrBounds};
use crate::indicators::{IndicatorEngine, IndicatorFrame};
use crate::levels::Levels;
use crate::risk::{ReturnSeries, RiskEngine, RiskInterpretation, trailing_volatility};
use crate::series::{DataQuality, Series};
use crate::stats::DescriptiveStats;
use crate::trend::{TrendDistribution, summarize};
use chrono::{DateTime, Utc};
use configuration::AnalysisConfig;
use core_types::{BbPosition, MacdTrend, RsiSignal, TrendLabel};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

// ==============================================================================
// Technical analysis payload
// ==============================================================================

/// Latest value of every indicator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSnapshot {
    pub sma_7: Option<f64>,
    pub sma_30: Option<f64>,
    pub ema_7: Option<f64>,
    pub ema_30: Option<f64>,
    pub rsi: Option<f64>,
    pub rsi_signal: Option<RsiSignal>,
    pub macd: Option<f64>,
    pub macd_signal_line: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub macd_trend: Option<MacdTrend>,
    pub bb_upper: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_lower: Option<f64>,
    pub bb_width: Option<f64>,
    pub bb_position: Option<BbPosition>,
}

impl From<&IndicatorFrame> for IndicatorSnapshot {
    fn from(f: &IndicatorFrame) -> Self {
        Self {
            sma_7: f.sma_7,
            sma_30: f.sma_30,
            ema_7: f.ema_7,
            ema_30: f.ema_30,
            rsi: f.rsi,
            rsi_signal: f.rsi_signal,
            macd: f.macd,
            macd_signal_line: f.macd_signal,
            macd_histogram: f.macd_histogram,
            macd_trend: f.macd_trend,
            bb_upper: f.bb_upper,
            bb_middle: f.bb_middle,
            bb_lower: f.bb_lower,
            bb_width: f.bb_width,
            bb_position: f.bb_position,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSnapshot {
    pub direction: TrendLabel,
    pub sma_short: Option<f64>,
    pub sma_long: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskSnapshot {
    /// `volatility_<n>d` for every configured window.
    #[serde(flatten)]
    pub volatility: BTreeMap<String, Option<f64>>,
    pub max_drawdown: Option<f64>,
    pub sharpe_ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisPayload {
    pub coin: String,
    pub current_price: Decimal,
    pub indicators: IndicatorSnapshot,
    pub trend: TrendSnapshot,
    pub risk_metrics: RiskSnapshot,
    pub levels: Levels,
    pub series: Vec<IndicatorFrame>,
}

// ==============================================================================
// Scientific report payload
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub total_days: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyReturnStats {
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub positive_days: usize,
    pub negative_days: usize,
    pub win_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnsAnalysis {
    pub daily_returns: DailyReturnStats,
    pub cumulative_return: Option<f64>,
    pub annualized_return: Option<f64>,
    pub annualized_volatility: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAnalysis {
    pub var_parametric_95: Option<f64>,
    pub var_historic_95: Option<f64>,
    pub cvar_95: Option<f64>,
    pub max_drawdown: Option<f64>,
    pub sharpe_ratio: Option<f64>,
    pub confidence_level: f64,
    pub interpretation: RiskInterpretation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalySummary {
    pub total_anomalies: usize,
    pub anomaly_percentage: f64,
    pub by_method: AnomalyCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendAnalysis {
    pub trend_distribution: TrendDistribution,
    pub current_trend: TrendLabel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportPayload {
    pub coin: String,
    pub analysis_period: AnalysisPeriod,
    pub descriptive_statistics: DescriptiveStats,
    pub returns_analysis: ReturnsAnalysis,
    pub risk_analysis: RiskAnalysis,
    pub anomaly_detection: AnomalySummary,
    pub trend_analysis: TrendAnalysis,
    pub data_quality: DataQuality,
}

// ==============================================================================
// Anomaly and level payloads
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomaliesPayload {
    pub coin: String,
    pub anomaly_counts: AnomalyCounts,
    pub anomaly_percentage: f64,
    pub total_data_points: usize,
    /// Most recent flagged timestamps, oldest first.
    pub anomaly_dates: Vec<DateTime<Utc>>,
    pub iqr_bounds: Option<IqrBounds>,
    pub statistics: DescriptiveStats,
    pub series: Vec<AnomalyRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelsPayload {
    pub coin: String,
    pub current_price: Decimal,
    /// Samples the high and low were taken from.
    pub window: usize,
    #[serde(flatten)]
    pub levels: Levels,
}

/// Composes the engine outputs into the per-view payloads.
///
/// Holds no state besides the configuration; every method is a pure function of
/// the series it is given.
pub struct ReportAssembler<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> ReportAssembler<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn analysis(&self, series: &Series) -> AnalysisPayload {
        let cfg = self.config;
        if series.len() < cfg.longest_window() {
            tracing::debug!(
                coin = series.coin(),
                points = series.len(),
                needed = cfg.longest_window(),
                "Short history, some indicators will be null."
            );
        }
        let frames = IndicatorEngine::new(cfg).compute(series);
        let risk = RiskEngine::new(cfg).compute(series);
        let returns = ReturnSeries::from_series(series).defined();
        let trend = summarize(&frames);

        let volatility = cfg
            .volatility_windows
            .iter()
            .map(|w| (format!("volatility_{w}d"), trailing_volatility(&returns, *w)))
            .collect();

        // A `Series` always holds at least two frames.
        let latest = &frames[frames.len() - 1];

        AnalysisPayload {
            coin: series.coin().to_string(),
            current_price: series.last().price,
            indicators: IndicatorSnapshot::from(latest),
            trend: TrendSnapshot {
                direction: trend.current,
                sma_short: latest.sma_7,
                sma_long: latest.sma_30,
            },
            risk_metrics: RiskSnapshot {
                volatility,
                max_drawdown: risk.max_drawdown,
                sharpe_ratio: risk.sharpe_ratio,
            },
            levels: Levels::from_series(series, cfg.levels_window),
            series: frames,
        }
    }

    pub fn report(&self, series: &Series) -> ReportPayload {
        let cfg = self.config;
        let risk_engine = RiskEngine::new(cfg);
        let risk = risk_engine.compute(series);
        let frames = IndicatorEngine::new(cfg).compute(series);
        let trend = summarize(&frames);
        let anomalies = AnomalyDetector::new(cfg).detect(series);

        ReportPayload {
            coin: series.coin().to_string(),
            analysis_period: AnalysisPeriod {
                start: series.first().timestamp,
                end: series.last().timestamp,
                total_days: series.len(),
            },
            descriptive_statistics: DescriptiveStats::compute(&series.prices()),
            returns_analysis: ReturnsAnalysis {
                daily_returns: DailyReturnStats {
                    mean: risk.mean,
                    std: risk.std,
                    min: risk.min,
                    max: risk.max,
                    positive_days: risk.positive_days,
                    negative_days: risk.negative_days,
                    win_rate: risk.win_rate,
                },
                cumulative_return: risk.cumulative_return,
                annualized_return: risk.annualized_return,
                annualized_volatility: risk.annualized_volatility,
            },
            risk_analysis: RiskAnalysis {
                var_parametric_95: risk.var_parametric_95,
                var_historic_95: risk.var_historic_95,
                cvar_95: risk.cvar_95,
                max_drawdown: risk.max_drawdown,
                sharpe_ratio: risk.sharpe_ratio,
                confidence_level: cfg.confidence_level,
                interpretation: risk_engine.interpret(&risk),
            },
            anomaly_detection: AnomalySummary {
                total_anomalies: anomalies.counts.any_method,
                anomaly_percentage: anomalies.anomaly_percentage,
                by_method: anomalies.counts,
            },
            trend_analysis: TrendAnalysis {
                trend_distribution: trend.distribution,
                current_trend: trend.current,
            },
            data_quality: series.data_quality(),
        }
    }

    pub fn anomalies(&self, series: &Series) -> AnomaliesPayload {
        let report = AnomalyDetector::new(self.config).detect(series);
        AnomaliesPayload {
            coin: series.coin().to_string(),
            anomaly_counts: report.counts,
            anomaly_percentage: report.anomaly_percentage,
            total_data_points: report.total_data_points,
            anomaly_dates: report.recent_dates(self.config.anomaly_dates_limit),
            iqr_bounds: report.iqr_bounds,
            statistics: DescriptiveStats::compute(&series.prices()),
            series: report.records,
        }
    }

    pub fn levels(&self, series: &Series) -> LevelsPayload {
        let window = self.config.levels_window.min(series.len());
        LevelsPayload {
            coin: series.coin().to_string(),
            current_price: series.last().price,
            window,
            levels: Levels::from_series(series, window),
        }
    }
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
        Series::new("btc", raw, RangeHint::Full).unwrap()
    }

    #[test]
    fn analysis_exposes_configured_volatility_windows() {
        let prices: Vec<f64> = (0..40).map(|i| 100.0 + (i % 5) as f64).collect();
        let cfg = AnalysisConfig::default();
        let payload = ReportAssembler::new(&cfg).analysis(&series(&prices));

        let json = serde_json::to_value(&payload).unwrap();
        let risk = &json["risk_metrics"];
        assert!(risk["volatility_7d"].is_number());
        assert!(risk["volatility_30d"].is_number());
        assert_eq!(payload.series.len(), 40);
        assert!(json["levels"]["pivot"].is_number());
    }

    #[test]
    fn short_series_reports_explicit_nulls() {
        let cfg = AnalysisConfig::default();
        let payload = ReportAssembler::new(&cfg).analysis(&series(&[100.0, 101.0]));
        let json = serde_json::to_value(&payload).unwrap();

        assert!(json["indicators"]["sma_30"].is_null());
        assert!(json["indicators"]["rsi"].is_null());
        assert!(json["risk_metrics"]["volatility_7d"].is_null());
        assert_eq!(json["trend"]["direction"], "neutral");
    }

    #[test]
    fn report_period_and_counts() {
        let prices = [100.0, 102.0, 101.0, 105.0, 98.0, 110.0];
        let cfg = AnalysisConfig::default();
        let payload = ReportAssembler::new(&cfg).report(&series(&prices));

        assert_eq!(payload.analysis_period.total_days, 6);
        assert_eq!(payload.returns_analysis.daily_returns.positive_days, 3);
        assert_eq!(payload.returns_analysis.daily_returns.negative_days, 2);
        assert_eq!(payload.risk_analysis.confidence_level, 0.95);
        assert_eq!(payload.data_quality.data_completeness, 100.0);
        assert!(payload.risk_analysis.interpretation.var_meaning.is_some());
    }

    #[test]
    fn levels_window_is_clamped_to_series() {
        let cfg = AnalysisConfig::default();
        let payload = ReportAssembler::new(&cfg).levels(&series(&[90.0, 110.0, 100.0]));
        assert_eq!(payload.window, 3);
        assert!(payload.levels.support < payload.levels.pivot);
        assert!(payload.levels.pivot < payload.levels.resistance);
    }
}
