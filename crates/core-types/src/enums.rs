use serde::{Deserialize, Serialize};
use std::fmt;

/// Local trend label of a single indicator frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendLabel {
    Bullish,
    Bearish,
    Neutral,
}

impl fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TrendLabel::Bullish => "bullish",
            TrendLabel::Bearish => "bearish",
            TrendLabel::Neutral => "neutral",
        };
        f.write_str(label)
    }
}

/// RSI interpretation: above 70 is overbought, below 30 oversold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsiSignal {
    Overbought,
    Oversold,
    Neutral,
}

/// Whether the MACD line sits above (bullish) or below (bearish) its signal line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacdTrend {
    Bullish,
    Bearish,
}

/// Location of the price relative to the Bollinger Bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BbPosition {
    AboveUpper,
    BelowLower,
    UpperHalf,
    LowerHalf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpikeDirection {
    Up,
    Down,
    #[serde(rename = "none")]
    Flat,
}
