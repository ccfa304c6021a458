use crate::comparison::{CorrelationMatrix, IndexedComparison, compare, correlation};
use crate::error::AnalyticsError;
use crate::loader::{PriceSource, SeriesLoader};
use crate::report::{
    AnalysisPayload, AnomaliesPayload, LevelsPayload, ReportAssembler, ReportPayload,
};
use crate::series::Series;
use configuration::{AnalysisConfig, LoaderSettings};
use core_types::{PricePoint, RangeHint};
use futures::future::try_join_all;
use std::sync::Arc;

/// The entry point the outer layers call: load a series, then assemble a payload.
///
/// Cheap to clone; clones share the price source.
#[derive(Clone)]
pub struct AnalyticsService {
    loader: SeriesLoader,
    config: Arc<AnalysisConfig>,
}

impl AnalyticsService {
    pub fn new(
        source: Arc<dyn PriceSource>,
        loader: &LoaderSettings,
        config: AnalysisConfig,
    ) -> Self {
        Self {
            loader: SeriesLoader::new(source, loader.retry_backoff()),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub async fn market_coins(&self) -> Result<Vec<String>, AnalyticsError> {
        self.loader.list_coins().await
    }

    /// The ordered, de-duplicated raw history.
    pub async fn series(
        &self,
        coin: &str,
        range: RangeHint,
    ) -> Result<Vec<PricePoint>, AnalyticsError> {
        let series = self.loader.load(coin, range).await?;
        Ok(series.points().to_vec())
    }

    pub async fn analysis(
        &self,
        coin: &str,
        range: RangeHint,
    ) -> Result<AnalysisPayload, AnalyticsError> {
        let series = self.loader.load(coin, range).await?;
        tracing::info!(coin, points = series.len(), "Building technical analysis.");
        Ok(self.assembler().analysis(&series))
    }

    pub async fn report(
        &self,
        coin: &str,
        range: RangeHint,
    ) -> Result<ReportPayload, AnalyticsError> {
        let series = self.loader.load(coin, range).await?;
        tracing::info!(coin, points = series.len(), "Building scientific report.");
        Ok(self.assembler().report(&series))
    }

    pub async fn anomalies(
        &self,
        coin: &str,
        range: RangeHint,
    ) -> Result<AnomaliesPayload, AnalyticsError> {
        let series = self.loader.load(coin, range).await?;
        tracing::info!(coin, points = series.len(), "Running anomaly detection.");
        Ok(self.assembler().anomalies(&series))
    }

    pub async fn levels(
        &self,
        coin: &str,
        range: RangeHint,
    ) -> Result<LevelsPayload, AnalyticsError> {
        let series = self.loader.load(coin, range).await?;
        Ok(self.assembler().levels(&series))
    }

    /// Each coin rebased to 100 at its first sample, plus a ranking.
    pub async fn indexed(
        &self,
        coins: &[String],
        range: RangeHint,
    ) -> Result<IndexedComparison, AnalyticsError> {
        let all = self.load_many(coins, range).await?;
        Ok(compare(&all))
    }

    pub async fn correlation(
        &self,
        coins: &[String],
        range: RangeHint,
    ) -> Result<CorrelationMatrix, AnalyticsError> {
        let all = self.load_many(coins, range).await?;
        Ok(correlation(&all))
    }

    fn assembler(&self) -> ReportAssembler<'_> {
        ReportAssembler::new(&self.config)
    }

    async fn load_many(
        &self,
        coins: &[String],
        range: RangeHint,
    ) -> Result<Vec<Series>, AnalyticsError> {
        if coins.is_empty() {
            return Err(AnalyticsError::InvalidParameters(
                "at least one coin is required".to_string(),
            ));
        }
        try_join_all(coins.iter().map(|coin| self.loader.load(coin, range))).await
    }
}

/// Splits a comma-separated coin list, dropping blanks and repeats.
pub fn parse_coin_list(raw: &str) -> Result<Vec<String>, AnalyticsError> {
    let mut coins: Vec<String> = Vec::new();
    for coin in raw.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        if !coins.iter().any(|c| c == coin) {
            coins.push(coin.to_string());
        }
    }
    if coins.is_empty() {
        return Err(AnalyticsError::InvalidParameters(
            "expected a comma-separated list of coin ids".to_string(),
        ));
    }
    Ok(coins)
}
