use crate::{AppState, error::AppError};
use analytics::{
    AnalysisPayload, AnomaliesPayload, CorrelationMatrix, IndexedComparison, LevelsPayload,
    ReportPayload, parse_coin_list,
};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use core_types::{PricePoint, RangeHint};
use serde::Deserialize;
use std::sync::Arc;

/// `?days=N` restricts a view to the last N days of stored history.
#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub days: Option<u32>,
}

impl RangeQuery {
    fn range(&self) -> RangeHint {
        RangeHint::from_days(self.days)
    }
}

/// `?coins=a,b,c&days=N` for the multi-coin views.
#[derive(Debug, Default, Deserialize)]
pub struct CoinsQuery {
    pub coins: Option<String>,
    pub days: Option<u32>,
}

impl CoinsQuery {
    fn coins(&self) -> Result<Vec<String>, AppError> {
        Ok(parse_coin_list(self.coins.as_deref().unwrap_or_default())?)
    }
}

/// # GET /api/market-coins
pub async fn get_market_coins(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(state.analytics.market_coins().await?))
}

/// # GET /api/market/:coin_id
pub async fn get_market_series(
    Path(coin_id): Path<String>,
    Query(query): Query<RangeQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PricePoint>>, AppError> {
    Ok(Json(state.analytics.series(&coin_id, query.range()).await?))
}

/// # GET /api/market/indexed?coins=
pub async fn get_indexed_market(
    Query(query): Query<CoinsQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<IndexedComparison>, AppError> {
    let coins = query.coins()?;
    let range = RangeHint::from_days(query.days);
    Ok(Json(state.analytics.indexed(&coins, range).await?))
}

/// # GET /api/correlation?coins=
pub async fn get_correlation(
    Query(query): Query<CoinsQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<CorrelationMatrix>, AppError> {
    let coins = query.coins()?;
    let range = RangeHint::from_days(query.days);
    Ok(Json(state.analytics.correlation(&coins, range).await?))
}

/// # GET /api/analysis/:coin_id
/// Latest indicators, trend, risk snapshot and levels, plus the per-sample indicator series.
pub async fn get_analysis(
    Path(coin_id): Path<String>,
    Query(query): Query<RangeQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<AnalysisPayload>, AppError> {
    Ok(Json(state.analytics.analysis(&coin_id, query.range()).await?))
}

/// # GET /api/report/:coin_id
pub async fn get_report(
    Path(coin_id): Path<String>,
    Query(query): Query<RangeQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReportPayload>, AppError> {
    Ok(Json(state.analytics.report(&coin_id, query.range()).await?))
}

/// # GET /api/anomalies/:coin_id
pub async fn get_anomalies(
    Path(coin_id): Path<String>,
    Query(query): Query<RangeQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<AnomaliesPayload>, AppError> {
    Ok(Json(state.analytics.anomalies(&coin_id, query.range()).await?))
}

/// # GET /api/levels/:coin_id
pub async fn get_levels(
    Path(coin_id): Path<String>,
    Query(query): Query<RangeQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<LevelsPayload>, AppError> {
    Ok(Json(state.analytics.levels(&coin_id, query.range()).await?))
}
