use crate::math::{finite, mean, quantile_sorted, sample_std, sorted};
use serde::Serialize;

/// Summary statistics over raw prices.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescriptiveStats {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub variance: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub range: Option<f64>,
    pub q1: Option<f64>,
    pub median: Option<f64>,
    pub q3: Option<f64>,
    pub iqr: Option<f64>,
    /// Bias-adjusted sample skewness; needs 3 values and non-zero spread.
    pub skewness: Option<f64>,
    /// Bias-adjusted excess kurtosis; needs 4 values and non-zero spread.
    pub kurtosis: Option<f64>,
    /// `std / mean * 100`.
    pub coefficient_of_variation: Option<f64>,
}

impl DescriptiveStats {
    pub fn compute(values: &[f64]) -> Self {
        let ordered = sorted(values);
        let mean_value = mean(values);
        let std = sample_std(values);
        let q1 = quantile_sorted(&ordered, 0.25);
        let q3 = quantile_sorted(&ordered, 0.75);
        let min = ordered.first().copied();
        let max = ordered.last().copied();

        Self {
            count: values.len(),
            mean: mean_value,
            std,
            variance: std.map(|s| s * s),
            min,
            max,
            range: min.zip(max).map(|(lo, hi)| hi - lo),
            q1,
            median: quantile_sorted(&ordered, 0.5),
            q3,
            iqr: q1.zip(q3).map(|(a, b)| b - a),
            skewness: mean_value.and_then(|m| skewness(values, m)),
            kurtosis: mean_value.and_then(|m| kurtosis(values, m)),
            coefficient_of_variation: match (std, mean_value) {
                (Some(s), Some(m)) if m != 0.0 => finite(s / m * 100.0),
                _ => None,
            },
        }
    }
}

/// Population central moments m2 and mk.
fn central_moments(values: &[f64], mean: f64, k: i32) -> (f64, f64) {
    let n = values.len() as f64;
    let m2 = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let mk = values.iter().map(|v| (v - mean).powi(k)).sum::<f64>() / n;
    (m2, mk)
}

fn skewness(values: &[f64], mean: f64) -> Option<f64> {
    let n = values.len() as f64;
    if values.len() < 3 {
        return None;
    }
    let (m2, m3) = central_moments(values, mean, 3);
    if m2 <= 0.0 {
        return None;
    }
    let g1 = m3 / m2.powf(1.5);
    finite(g1 * (n * (n - 1.0)).sqrt() / (n - 2.0))
}

fn kurtosis(values: &[f64], mean: f64) -> Option<f64> {
    let n = values.len() as f64;
    if values.len() < 4 {
        return None;
    }
    let (m2, m4) = central_moments(values, mean, 4);
    if m2 <= 0.0 {
        return None;
    }
    let g2 = m4 / (m2 * m2) - 3.0;
    finite(((n + 1.0) * g2 + 6.0) * (n - 1.0) / ((n - 2.0) * (n - 3.0)))
}
