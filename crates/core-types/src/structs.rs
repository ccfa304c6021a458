use crate::error::CoreError;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single observed price of an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
}

impl PricePoint {
    /// Builds a point, rejecting negative prices.
    pub fn new(timestamp: DateTime<Utc>, price: Decimal) -> Result<Self, CoreError> {
        if price.is_sign_negative() && !price.is_zero() {
            return Err(CoreError::InvalidInput(
                "price".to_string(),
                format!("{price} at {timestamp} is negative"),
            ));
        }
        Ok(Self { timestamp, price })
    }
}

/// How much history a caller wants loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeHint {
    #[default]
    Full,
    /// The last `n` days ending at the newest stored sample.
    LastDays(u32),
}

impl RangeHint {
    pub fn from_days(days: Option<u32>) -> Self {
        match days {
            Some(n) if n > 0 => RangeHint::LastDays(n),
            _ => RangeHint::Full,
        }
    }

    /// The inclusive lower bound on timestamps given the newest sample time.
    /// `LastDays(30)` over daily data keeps 30 samples.
    pub fn cutoff(&self, newest: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            RangeHint::Full => None,
            RangeHint::LastDays(n) => Some(newest - Duration::days(i64::from(n.saturating_sub(1)))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn negative_price_is_rejected() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(PricePoint::new(ts, dec!(-1)).is_err());
        assert!(PricePoint::new(ts, dec!(0)).is_ok());
    }

    #[test]
    fn range_hint_cutoff() {
        let newest = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();
        assert_eq!(RangeHint::from_days(None).cutoff(newest), None);
        assert_eq!(RangeHint::from_days(Some(0)), RangeHint::Full);
        assert_eq!(
            RangeHint::from_days(Some(30)).cutoff(newest),
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap())
        );
    }
}
