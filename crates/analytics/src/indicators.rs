use crate::math::{finite, mean, nearly_equal, sample_std};
use crate::series::Series;
use chrono::{DateTime, Utc};
use configuration::AnalysisConfig;
use core_types::{BbPosition, MacdTrend, RsiSignal};
use rust_decimal::Decimal;
use serde::Serialize;

/// Indicator values aligned to one sample of the series.
///
/// Fields are `None` until the series holds enough history for that indicator.
/// The `_7` / `_30` names follow the dashboard contract and carry the configured
/// short and long windows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorFrame {
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
    pub sma_7: Option<f64>,
    pub sma_30: Option<f64>,
    pub ema_7: Option<f64>,
    pub ema_30: Option<f64>,
    pub rsi: Option<f64>,
    pub rsi_signal: Option<RsiSignal>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub macd_trend: Option<MacdTrend>,
    pub bb_upper: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_lower: Option<f64>,
    pub bb_width: Option<f64>,
    pub bb_position: Option<BbPosition>,
}

/// Output of [`macd`], each vector aligned to the input prices.
#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub macd: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl Bands {
    /// Band spread as a percentage of the middle band.
    pub fn width(&self) -> Option<f64> {
        if self.middle == 0.0 {
            return None;
        }
        finite((self.upper - self.lower) / self.middle * 100.0)
    }

    pub fn position(&self, price: f64) -> BbPosition {
        if price > self.upper {
            BbPosition::AboveUpper
        } else if price < self.lower {
            BbPosition::BelowLower
        } else if price > self.middle {
            BbPosition::UpperHalf
        } else {
            BbPosition::LowerHalf
        }
    }
}

/// Computes every rolling indicator over a series.
pub struct IndicatorEngine<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> IndicatorEngine<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn compute(&self, series: &Series) -> Vec<IndicatorFrame> {
        let cfg = self.config;
        let prices = series.prices();

        let sma_short = sma(&prices, cfg.sma_short);
        let sma_long = sma(&prices, cfg.sma_long);
        let ema_short = ema(&prices, cfg.sma_short);
        let ema_long = ema(&prices, cfg.sma_long);
        let rsi_values = rsi(&prices, cfg.rsi_period);
        let macd_values = macd(&prices, cfg.macd_fast, cfg.macd_slow, cfg.macd_signal);
        let bands = bollinger(&prices, cfg.bb_period, cfg.bb_std_dev);

        series
            .points()
            .iter()
            .enumerate()
            .map(|(i, point)| {
                let band = bands[i];
                let macd_trend = macd_trend(macd_values.macd[i], macd_values.signal[i]);

                IndicatorFrame {
                    timestamp: point.timestamp,
                    price: point.price,
                    sma_7: sma_short[i],
                    sma_30: sma_long[i],
                    ema_7: ema_short[i],
                    ema_30: ema_long[i],
                    rsi: rsi_values[i],
                    rsi_signal: rsi_values[i].map(|v| self.rsi_signal(v)),
                    macd: macd_values.macd[i],
                    macd_signal: macd_values.signal[i],
                    macd_histogram: macd_values.histogram[i],
                    macd_trend,
                    bb_upper: band.map(|b| b.upper),
                    bb_middle: band.map(|b| b.middle),
                    bb_lower: band.map(|b| b.lower),
                    bb_width: band.and_then(|b| b.width()),
                    bb_position: band.map(|b| b.position(prices[i])),
                }
            })
            .collect()
    }

    pub fn rsi_signal(&self, value: f64) -> RsiSignal {
        if value > self.config.rsi_overbought {
            RsiSignal::Overbought
        } else if value < self.config.rsi_oversold {
            RsiSignal::Oversold
        } else {
            RsiSignal::Neutral
        }
    }
}

/// Bullish when the MACD line is above its signal.
///
/// Lines equal up to rounding are a tie, resolved by the sign of the MACD line.
pub fn macd_trend(line: Option<f64>, signal: Option<f64>) -> Option<MacdTrend> {
    let (line, signal) = (line?, signal?);
    let bullish = if nearly_equal(line, signal) {
        line > 0.0
    } else {
        line > signal
    };
    Some(if bullish {
        MacdTrend::Bullish
    } else {
        MacdTrend::Bearish
    })
}

/// Simple moving average over the trailing `period` values.
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }
    for (i, window) in values.windows(period).enumerate() {
        out[i + period - 1] = mean(window);
    }
    out
}

/// Exponential moving average seeded with the SMA of the first `period` values.
pub fn ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let wrapped: Vec<Option<f64>> = values.iter().copied().map(Some).collect();
    ema_of(&wrapped, period)
}

/// EMA over a series that may start with undefined values.
///
/// The average is seeded on the first `period` defined values after the leading
/// `None`s; a gap after that restarts the seeding.
pub fn ema_of(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 {
        return out;
    }
    let k = 2.0 / (period as f64 + 1.0);

    let mut seed: Vec<f64> = Vec::with_capacity(period);
    let mut prev: Option<f64> = None;
    for (i, value) in values.iter().enumerate() {
        let Some(v) = *value else {
            seed.clear();
            prev = None;
            continue;
        };
        prev = match prev {
            Some(p) => finite(v * k + p * (1.0 - k)),
            None => {
                seed.push(v);
                if seed.len() == period { mean(&seed) } else { None }
            }
        };
        out[i] = prev;
    }
    out
}

/// Wilder's RSI. The first `period` entries are `None`.
///
/// When the average loss is zero the RSI is 100, which includes a flat input.
pub fn rsi(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() <= period {
        return out;
    }

    let changes: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
    let p = period as f64;

    let (gains, losses) = changes[..period]
        .iter()
        .fold((0.0_f64, 0.0_f64), |(g, l), c| if *c > 0.0 { (g + c, l) } else { (g, l - c) });
    let mut avg_gain = gains / p;
    let mut avg_loss = losses / p;
    out[period] = Some(rsi_value(avg_gain, avg_loss));

    for (offset, change) in changes[period..].iter().enumerate() {
        let (gain, loss) = if *change > 0.0 { (*change, 0.0) } else { (0.0, -change) };
        avg_gain = (avg_gain * (p - 1.0) + gain) / p;
        avg_loss = (avg_loss * (p - 1.0) + loss) / p;
        out[period + offset + 1] = Some(rsi_value(avg_gain, avg_loss));
    }
    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
}

/// MACD line (`EMA(fast) - EMA(slow)`), its `EMA(signal)` line and the histogram.
pub fn macd(values: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let fast_ema = ema(values, fast);
    let slow_ema = ema(values, slow);

    let line: Vec<Option<f64>> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();
    let signal_line = ema_of(&line, signal);
    let histogram = line
        .iter()
        .zip(&signal_line)
        .map(|(m, s)| Some((*m)? - (*s)?))
        .collect();

    MacdSeries {
        macd: line,
        signal: signal_line,
        histogram,
    }
}

/// Bollinger Bands: SMA(`period`) ± `k` sample standard deviations.
pub fn bollinger(values: &[f64], period: usize, k: f64) -> Vec<Option<Bands>> {
    let mut out = vec![None; values.len()];
    if period < 2 || values.len() < period {
        return out;
    }
    for (i, window) in values.windows(period).enumerate() {
        out[i + period - 1] = match (mean(window), sample_std(window)) {
            (Some(middle), Some(std)) => Some(Bands {
                upper: middle + k * std,
                middle,
                lower: middle - k * std,
            }),
            _ => None,
        };
    }
    out
}
