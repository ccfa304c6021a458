use crate::error::{AnalyticsError, SourceError};
use crate::series::Series;
use async_trait::async_trait;
use core_types::{PricePoint, RangeHint};
use std::sync::Arc;
use std::time::Duration;

/// Where raw price history comes from.
///
/// Implementations return samples in ingestion order; ordering and
/// de-duplication are the loader's job.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// All stored samples for `coin`. An unknown coin yields an empty vector.
    async fn fetch_prices(&self, coin: &str) -> Result<Vec<PricePoint>, SourceError>;

    /// Identifiers of every coin with stored samples.
    async fn list_coins(&self) -> Result<Vec<String>, SourceError>;
}

/// Turns a `PriceSource` into validated [`Series`] values.
#[derive(Clone)]
pub struct SeriesLoader {
    source: Arc<dyn PriceSource>,
    retry_backoff: Duration,
}

impl SeriesLoader {
    pub fn new(source: Arc<dyn PriceSource>, retry_backoff: Duration) -> Self {
        Self {
            source,
            retry_backoff,
        }
    }

    /// Loads and normalizes the history of `coin`.
    ///
    /// An unavailable source is retried once after the configured backoff.
    pub async fn load(&self, coin: &str, range: RangeHint) -> Result<Series, AnalyticsError> {
        let raw = self.fetch_with_retry(coin).await?;
        let fetched = raw.len();

        let valid: Vec<PricePoint> = raw
            .into_iter()
            .filter_map(|p| match PricePoint::new(p.timestamp, p.price) {
                Ok(point) => Some(point),
                Err(e) => {
                    tracing::warn!(coin, error = %e, "Dropping invalid sample.");
                    None
                }
            })
            .collect();

        // Every sample being invalid is indistinguishable from having no data.
        if fetched > 0 && valid.is_empty() {
            return Err(AnalyticsError::InsufficientData {
                required: crate::series::MIN_POINTS,
                available: 0,
            });
        }

        let series = Series::new(coin, valid, range)?;
        tracing::debug!(coin, fetched, points = series.len(), "Series loaded.");
        Ok(series)
    }

    pub async fn list_coins(&self) -> Result<Vec<String>, AnalyticsError> {
        match self.source.list_coins().await {
            Err(SourceError::Unavailable(msg)) => {
                tracing::warn!(error = %msg, "Price source unavailable, retrying once.");
                tokio::time::sleep(self.retry_backoff).await;
                Ok(self.source.list_coins().await?)
            }
            other => Ok(other?),
        }
    }

    async fn fetch_with_retry(&self, coin: &str) -> Result<Vec<PricePoint>, AnalyticsError> {
        match self.source.fetch_prices(coin).await {
            Err(SourceError::Unavailable(msg)) => {
                tracing::warn!(coin, error = %msg, "Price source unavailable, retrying once.");
                tokio::time::sleep(self.retry_backoff).await;
                Ok(self.source.fetch_prices(coin).await?)
            }
            other => Ok(other?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySource;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use rust_decimal::Decimal;

    fn points(prices: &[i64]) -> Vec<PricePoint> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, p)| PricePoint {
                timestamp: start + ChronoDuration::days(i as i64),
                price: Decimal::from(*p),
            })
            .collect()
    }

    fn loader(source: MemorySource) -> SeriesLoader {
        SeriesLoader::new(Arc::new(source), Duration::from_millis(1))
    }

    #[tokio::test]
    async fn unknown_coin_is_not_found() {
        let err = loader(MemorySource::new())
            .load("nope", RangeHint::Full)
            .await
            .unwrap_err();
        assert_eq!(err, AnalyticsError::NotFound("nope".to_string()));
    }

    #[tokio::test]
    async fn retries_once_after_unavailable() {
        let source = MemorySource::new()
            .with_coin("btc", points(&[1, 2, 3]))
            .failing_first(1);
        let series = loader(source).load("btc", RangeHint::Full).await.unwrap();
        assert_eq!(series.len(), 3);
    }

    #[tokio::test]
    async fn second_failure_surfaces_as_upstream_unavailable() {
        let source = MemorySource::new()
            .with_coin("btc", points(&[1, 2, 3]))
            .failing_first(2);
        let err = loader(source).load("btc", RangeHint::Full).await.unwrap_err();
        assert!(matches!(err, AnalyticsError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn negative_prices_are_dropped() {
        let source = MemorySource::new().with_coin("btc", points(&[1, -5, 3]));
        let series = loader(source).load("btc", RangeHint::Full).await.unwrap();
        assert_eq!(series.len(), 2);
    }
}
