use statrs::statistics::Statistics;

/// Drops NaN and infinities so they never reach a payload.
pub(crate) fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    finite(values.iter().mean())
}

/// Sample (n - 1) standard deviation; `None` below two values.
pub(crate) fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    finite(values.iter().std_dev())
}

/// Sample covariance of two equally long slices.
pub(crate) fn covariance(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    finite(xs.iter().covariance(ys.iter()))
}

/// Quantile `q` in `[0, 1]` of pre-sorted values, linearly interpolated between ranks.
pub(crate) fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let weight = pos - lo as f64;
    finite(sorted[lo] + (sorted[hi] - sorted[lo]) * weight)
}

pub(crate) fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(f64::total_cmp);
    out
}

/// True when a standard deviation is indistinguishable from zero at the data's scale.
pub(crate) fn negligible_spread(std: f64, scale: f64) -> bool {
    std <= 1e-12 * scale.abs().max(1.0)
}

/// Equality up to floating point rounding, relative to the larger magnitude.
pub(crate) fn nearly_equal(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs())
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
pub(crate) fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}
