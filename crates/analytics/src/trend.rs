use crate::indicators::IndicatorFrame;
use core_types::{MacdTrend, TrendLabel};
use serde::Serialize;

/// How many frames carry each trend label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrendDistribution {
    pub bullish: usize,
    pub bearish: usize,
    pub neutral: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSummary {
    pub labels: Vec<TrendLabel>,
    pub distribution: TrendDistribution,
    pub current: TrendLabel,
}

/// Bullish when the short SMA is above the long SMA and MACD is above its signal,
/// bearish when both point down, neutral otherwise (including missing history).
pub fn classify(frame: &IndicatorFrame) -> TrendLabel {
    match (frame.sma_7, frame.sma_30, frame.macd_trend) {
        (Some(short), Some(long), Some(MacdTrend::Bullish)) if short > long => {
            TrendLabel::Bullish
        }
        (Some(short), Some(long), Some(MacdTrend::Bearish)) if short < long => {
            TrendLabel::Bearish
        }
        _ => TrendLabel::Neutral,
    }
}

pub fn summarize(frames: &[IndicatorFrame]) -> TrendSummary {
    let labels: Vec<TrendLabel> = frames.iter().map(classify).collect();

    let mut distribution = TrendDistribution::default();
    for label in &labels {
        match label {
            TrendLabel::Bullish => distribution.bullish += 1,
            TrendLabel::Bearish => distribution.bearish += 1,
            TrendLabel::Neutral => distribution.neutral += 1,
        }
    }

    TrendSummary {
        current: labels.last().copied().unwrap_or(TrendLabel::Neutral),
        labels,
        distribution,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn frame(
        sma_7: Option<f64>,
        sma_30: Option<f64>,
        macd_trend: Option<MacdTrend>,
    ) -> IndicatorFrame {
        IndicatorFrame {
            timestamp: Utc::now(),
            price: Decimal::ONE_HUNDRED,
            sma_7,
            sma_30,
            ema_7: None,
            ema_30: None,
            rsi: None,
            rsi_signal: None,
            macd: None,
            macd_signal: None,
            macd_histogram: None,
            macd_trend,
            bb_upper: None,
            bb_middle: None,
            bb_lower: None,
            bb_width: None,
            bb_position: None,
        }
    }

    #[test]
    fn labels_require_agreement() {
        let up = frame(Some(2.0), Some(1.0), Some(MacdTrend::Bullish));
        assert_eq!(classify(&up), TrendLabel::Bullish);
        let down = frame(Some(1.0), Some(2.0), Some(MacdTrend::Bearish));
        assert_eq!(classify(&down), TrendLabel::Bearish);
        let mixed = frame(Some(2.0), Some(1.0), Some(MacdTrend::Bearish));
        assert_eq!(classify(&mixed), TrendLabel::Neutral);
        let short_history = frame(Some(2.0), None, Some(MacdTrend::Bullish));
        assert_eq!(classify(&short_history), TrendLabel::Neutral);
    }

    #[test]
    fn distribution_and_current() {
        let frames = vec![
            frame(None, None, None),
            frame(Some(2.0), Some(1.0), Some(MacdTrend::Bullish)),
            frame(Some(1.0), Some(2.0), Some(MacdTrend::Bearish)),
            frame(Some(1.0), Some(2.0), Some(MacdTrend::Bearish)),
        ];
        let summary = summarize(&frames);
        assert_eq!(
            summary.distribution,
            TrendDistribution {
                bullish: 1,
                bearish: 2,
                neutral: 1
            }
        );
        assert_eq!(summary.current, TrendLabel::Bearish);
        assert_eq!(summary.labels.len(), 4);
    }
}
