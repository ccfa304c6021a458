use crate::math::{finite, mean, negligible_spread, quantile_sorted, sample_std, sorted};
use crate::series::Series;
use chrono::{DateTime, Utc};
use configuration::AnalysisConfig;
use serde::Serialize;

/// Daily percentage returns, one fewer than the prices they came from.
///
/// A return is `None` when the previous price is zero.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnSeries {
    timestamps: Vec<DateTime<Utc>>,
    values: Vec<Option<f64>>,
}

impl ReturnSeries {
    pub fn from_series(series: &Series) -> Self {
        let prices = series.prices();
        Self {
            timestamps: series.timestamps().into_iter().skip(1).collect(),
            values: daily_returns(&prices),
        }
    }

    /// Returns aligned to the sample they end on.
    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// Returns with undefined entries skipped.
    pub fn defined(&self) -> Vec<f64> {
        self.values.iter().flatten().copied().collect()
    }
}

/// `(p[i] - p[i-1]) / p[i-1] * 100` for every consecutive pair.
pub fn daily_returns(prices: &[f64]) -> Vec<Option<f64>> {
    prices
        .windows(2)
        .map(|w| {
            if w[0] == 0.0 {
                None
            } else {
                finite((w[1] - w[0]) / w[0] * 100.0)
            }
        })
        .collect()
}

/// Largest peak-to-trough decline in percent, always `<= 0`.
pub fn max_drawdown(prices: &[f64]) -> Option<f64> {
    let mut iter = prices.iter().copied();
    let mut peak = iter.next()?;
    let mut worst = 0.0_f64;
    for price in iter {
        if price > peak {
            peak = price;
        } else if peak > 0.0 {
            worst = worst.min((price - peak) / peak * 100.0);
        }
    }
    Some(worst)
}

/// Sample volatility of the last `window` returns scaled by `sqrt(window)`.
pub fn trailing_volatility(returns: &[f64], window: usize) -> Option<f64> {
    if window < 2 || returns.len() < window {
        return None;
    }
    let recent = &returns[returns.len() - window..];
    sample_std(recent).and_then(|s| finite(s * (window as f64).sqrt()))
}

/// Scalar risk and return figures over a return series. Percent units throughout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskMetrics {
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub cumulative_return: Option<f64>,
    /// Simple scaling: `mean * periods_per_year`.
    pub annualized_return: Option<f64>,
    pub annualized_volatility: Option<f64>,
    /// Risk-free rate assumed zero. `None` when volatility is zero.
    pub sharpe_ratio: Option<f64>,
    pub max_drawdown: Option<f64>,
    pub var_historic_95: Option<f64>,
    pub cvar_95: Option<f64>,
    pub var_parametric_95: Option<f64>,
    pub win_rate: Option<f64>,
    pub positive_days: usize,
    pub negative_days: usize,
    pub total_days: usize,
}

impl RiskMetrics {
    fn empty() -> Self {
        Self {
            mean: None,
            std: None,
            min: None,
            max: None,
            cumulative_return: None,
            annualized_return: None,
            annualized_volatility: None,
            sharpe_ratio: None,
            max_drawdown: None,
            var_historic_95: None,
            cvar_95: None,
            var_parametric_95: None,
            win_rate: None,
            positive_days: 0,
            negative_days: 0,
            total_days: 0,
        }
    }
}

/// A stateless calculator for return and risk metrics.
pub struct RiskEngine<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> RiskEngine<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn compute(&self, series: &Series) -> RiskMetrics {
        self.compute_prices(&series.prices())
    }

    /// Every field is `None` (counts zero) below two prices.
    pub fn compute_prices(&self, prices: &[f64]) -> RiskMetrics {
        if prices.len() < 2 {
            return RiskMetrics::empty();
        }
        let returns: Vec<f64> = daily_returns(prices).into_iter().flatten().collect();
        let mut metrics = RiskMetrics::empty();

        metrics.max_drawdown = max_drawdown(prices);
        metrics.cumulative_return = match (prices.first(), prices.last()) {
            (Some(first), Some(last)) if *first != 0.0 => finite((last / first - 1.0) * 100.0),
            _ => None,
        };

        if returns.is_empty() {
            return metrics;
        }

        let periods = f64::from(self.config.periods_per_year);
        metrics.total_days = returns.len();
        metrics.positive_days = returns.iter().filter(|r| **r > 0.0).count();
        metrics.negative_days = returns.iter().filter(|r| **r < 0.0).count();
        metrics.win_rate = Some(metrics.positive_days as f64 / returns.len() as f64 * 100.0);

        metrics.mean = mean(&returns);
        metrics.std = sample_std(&returns);
        let ordered = sorted(&returns);
        metrics.min = ordered.first().copied();
        metrics.max = ordered.last().copied();

        metrics.annualized_return = metrics.mean.and_then(|m| finite(m * periods));
        metrics.annualized_volatility = metrics.std.and_then(|s| finite(s * periods.sqrt()));
        metrics.sharpe_ratio = match (metrics.annualized_return, metrics.annualized_volatility) {
            (Some(ret), Some(vol)) if !negligible_spread(vol, ret) => finite(ret / vol),
            _ => None,
        };

        let tail = 1.0 - self.config.confidence_level;
        metrics.var_historic_95 = quantile_sorted(&ordered, tail);
        metrics.cvar_95 = metrics.var_historic_95.and_then(|var| {
            let shortfall: Vec<f64> = ordered.iter().copied().filter(|r| *r <= var).collect();
            mean(&shortfall)
        });
        metrics.var_parametric_95 = match (metrics.mean, metrics.std, self.config.confidence_z()) {
            (Some(m), Some(s), Some(z)) => finite(m - z * s),
            _ => None,
        };

        metrics
    }

    /// Plain-language reading of the VaR and drawdown figures.
    pub fn interpret(&self, metrics: &RiskMetrics) -> RiskInterpretation {
        let confidence = self.config.confidence_level * 100.0;
        RiskInterpretation {
            var_meaning: metrics.var_historic_95.map(|var| {
                format!(
                    "With {confidence:.0}% confidence the one-day loss does not exceed {:.2}%",
                    var.min(0.0).abs()
                )
            }),
            max_drawdown_meaning: metrics.max_drawdown.map(|dd| {
                format!("Largest decline from a peak to a later low was {:.2}%", dd.abs())
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskInterpretation {
    pub var_meaning: Option<String>,
    pub max_drawdown_meaning: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::approx_eq;

    #[test]
    fn daily_returns_of_reference_prices() {
        let prices = [100.0, 102.0, 101.0, 105.0, 98.0, 110.0];
        let returns: Vec<f64> = daily_returns(&prices).into_iter().flatten().collect();
        let expected = [2.0, -0.98, 3.96, -6.67, 12.24];

        assert_eq!(returns.len(), 5);
        for (got, want) in returns.iter().zip(expected) {
            assert!(approx_eq(*got, want, 0.01), "{got} vs {want}");
        }

        let cfg = AnalysisConfig::default();
        let metrics = RiskEngine::new(&cfg).compute_prices(&prices);
        assert_eq!(metrics.positive_days, 3);
        assert_eq!(metrics.negative_days, 2);
        assert!(approx_eq(metrics.win_rate.unwrap(), 60.0, 1e-9));
        assert!(approx_eq(metrics.cumulative_return.unwrap(), 10.0, 1e-9));
    }

    #[test]
    fn zero_price_return_is_undefined() {
        let returns = daily_returns(&[0.0, 10.0, 20.0]);
        assert_eq!(returns[0], None);
        assert!(approx_eq(returns[1].unwrap(), 100.0, 1e-12));
    }

    #[test]
    fn drawdown_is_never_positive() {
        assert_eq!(max_drawdown(&[1.0, 2.0, 3.0]), Some(0.0));
        let dd = max_drawdown(&[100.0, 120.0, 60.0, 130.0, 117.0]).unwrap();
        assert!(approx_eq(dd, -50.0, 1e-12));
        assert_eq!(max_drawdown(&[]), None);
    }

    #[test]
    fn flat_prices_have_no_sharpe() {
        let cfg = AnalysisConfig::default();
        let metrics = RiskEngine::new(&cfg).compute_prices(&[100.0; 40]);
        assert_eq!(metrics.std, Some(0.0));
        assert_eq!(metrics.sharpe_ratio, None);
        assert_eq!(metrics.max_drawdown, Some(0.0));
        assert_eq!(metrics.win_rate, Some(0.0));
    }

    #[test]
    fn single_price_yields_nulls() {
        let cfg = AnalysisConfig::default();
        let metrics = RiskEngine::new(&cfg).compute_prices(&[100.0]);
        assert_eq!(metrics, RiskMetrics::empty());
    }

    #[test]
    fn var_and_expected_shortfall() {
        // Returns -10, -5, 0, 5, ..., 85 (20 values)
        let mut prices = vec![100.0];
        let returns: Vec<f64> = (0..20).map(|i| -10.0 + 5.0 * i as f64).collect();
        for r in &returns {
            let last = *prices.last().unwrap();
            prices.push(last * (1.0 + r / 100.0));
        }
        let cfg = AnalysisConfig::default();
        let metrics = RiskEngine::new(&cfg).compute_prices(&prices);

        // 5th percentile over 20 sorted values: position 0.95 between -10 and -5.
        let var = metrics.var_historic_95.unwrap();
        assert!(approx_eq(var, -5.25, 1e-6));
        assert!(approx_eq(metrics.cvar_95.unwrap(), -10.0, 1e-6));

        let m = metrics.mean.unwrap();
        let s = metrics.std.unwrap();
        assert!(approx_eq(metrics.var_parametric_95.unwrap(), m - 1.645 * s, 1e-9));
        assert!(approx_eq(metrics.annualized_return.unwrap(), m * 365.0, 1e-9));
        assert!(approx_eq(
            metrics.sharpe_ratio.unwrap(),
            m / s * 365f64.sqrt(),
            1e-9
        ));
    }

    #[test]
    fn trailing_volatility_needs_full_window() {
        let returns = [1.0, -1.0, 1.0, -1.0];
        assert_eq!(trailing_volatility(&returns, 7), None);
        let vol = trailing_volatility(&returns, 4).unwrap();
        assert!(approx_eq(vol, (4.0f64 / 3.0).sqrt() * 2.0, 1e-12));
    }
}
