use crate::series::Series;
use rust_decimal::Decimal;
use serde::Serialize;

/// Floor-trader pivot levels.
///
/// For a window with `high > low` these always order as
/// `s1 < support < pivot < resistance < r1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Levels {
    pub pivot: Decimal,
    pub resistance: Decimal,
    pub support: Decimal,
    pub r1: Decimal,
    pub s1: Decimal,
}

impl Levels {
    /// Levels from a high / low / close triple.
    pub fn from_hlc(high: Decimal, low: Decimal, close: Decimal) -> Self {
        let pivot = (high + low + close) / Decimal::from(3);
        let resistance = pivot * Decimal::TWO - low;
        let support = pivot * Decimal::TWO - high;
        let spread = resistance - support;
        Self {
            pivot,
            resistance,
            support,
            r1: pivot + spread,
            s1: pivot - spread,
        }
    }

    /// Reduces the trailing `window` samples to high / low / close.
    pub fn from_series(series: &Series, window: usize) -> Self {
        let points = series.points();
        let recent = &points[points.len().saturating_sub(window.max(1))..];

        let close = series.last().price;
        let (high, low) = recent
            .iter()
            .fold((close, close), |(h, l), p| (h.max(p.price), l.min(p.price)));
        Self::from_hlc(high, low, close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use core_types::{PricePoint, RangeHint};
    use rust_decimal_macros::dec;

    #[test]
    fn classic_pivot_formulas() {
        let levels = Levels::from_hlc(dec!(110), dec!(90), dec!(100));
        assert_eq!(levels.pivot, dec!(100));
        assert_eq!(levels.resistance, dec!(110));
        assert_eq!(levels.support, dec!(90));
        assert_eq!(levels.r1, dec!(120));
        assert_eq!(levels.s1, dec!(80));
    }

    #[test]
    fn ordering_holds_for_any_close_inside_range() {
        for close in [dec!(90), dec!(95.5), dec!(109.99), dec!(110)] {
            let l = Levels::from_hlc(dec!(110), dec!(90), close);
            assert!(l.s1 < l.support);
            assert!(l.support < l.pivot);
            assert!(l.pivot < l.resistance);
            assert!(l.resistance < l.r1);
        }
    }

    #[test]
    fn uses_only_trailing_window() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let prices = [dec!(500), dec!(100), dec!(120), dec!(80), dec!(100)];
        let raw = prices
            .iter()
            .enumerate()
            .map(|(i, p)| PricePoint {
                timestamp: start + Duration::days(i as i64),
                price: *p,
            })
            .collect();
        let series = Series::new("btc", raw, RangeHint::Full).unwrap();

        let levels = Levels::from_series(&series, 4);
        assert_eq!(levels, Levels::from_hlc(dec!(120), dec!(80), dec!(100)));
    }
}
