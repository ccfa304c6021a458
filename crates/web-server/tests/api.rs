use analytics::{AnalyticsService, MemorySource};
use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use chrono::{Duration, TimeZone, Utc};
use configuration::{AnalysisConfig, LoaderSettings};
use core_types::PricePoint;
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use web_server::{AppState, router};

fn points(n: usize) -> Vec<PricePoint> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| PricePoint {
            timestamp: start + Duration::days(i as i64),
            price: Decimal::from(100 + (i % 7) as i64),
        })
        .collect()
}

fn app() -> axum::Router {
    let source = MemorySource::new()
        .with_coin("bitcoin", points(60))
        .with_coin("ethereum", points(60))
        .with_coin("tiny", points(1));
    let analytics = AnalyticsService::new(
        Arc::new(source),
        &LoaderSettings::default(),
        AnalysisConfig::default(),
    );
    router(Arc::new(AppState { analytics }))
}

async fn get(uri: &str) -> (StatusCode, Value) {
    let response = app()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn analysis_endpoint_returns_payload() {
    let (status, body) = get("/api/analysis/bitcoin").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["coin"], "bitcoin");
    assert!(body["indicators"]["rsi"].is_number());
    assert!(body["levels"]["pivot"].is_number());
    assert_eq!(body["series"].as_array().unwrap().len(), 60);
}

#[tokio::test]
async fn days_query_limits_the_series() {
    let (status, body) = get("/api/market/bitcoin?days=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn unknown_coin_is_404_with_error_body() {
    let (status, body) = get("/api/report/dogecoin").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("dogecoin"));
}

#[tokio::test]
async fn single_sample_is_422() {
    let (status, body) = get("/api/anomalies/tiny").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn indexed_route_is_not_shadowed_by_coin_route() {
    let (status, body) = get("/api/market/indexed?coins=bitcoin,ethereum").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ranking"].as_array().unwrap().len(), 2);
    assert_eq!(body["coins"]["bitcoin"]["series"][0]["indexed"], 100.0);
}

#[tokio::test]
async fn comparison_without_coins_is_400() {
    let (status, _) = get("/api/correlation").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn lists_coins() {
    let (status, body) = get("/api/market-coins").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!(["bitcoin", "ethereum", "tiny"]));
}
