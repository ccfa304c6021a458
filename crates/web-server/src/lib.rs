use analytics::AnalyticsService;
use axum::{Router, routing::get};
use configuration::Settings;
use database::DbRepository;
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

pub mod error;
pub mod handlers;

/// The shared application state that all handlers can access.
#[derive(Clone)]
pub struct AppState {
    pub analytics: AnalyticsService,
}

/// All API routes, wired to `state`.
pub fn router(state: Arc<AppState>) -> Router {
    // The dashboard is served from a different origin.
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(Any)
        .allow_headers(AllowHeaders::any());

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/market-coins", get(handlers::get_market_coins))
        .route("/api/market/indexed", get(handlers::get_indexed_market))
        .route("/api/market/:coin_id", get(handlers::get_market_series))
        .route("/api/correlation", get(handlers::get_correlation))
        .route("/api/analysis/:coin_id", get(handlers::get_analysis))
        .route("/api/report/:coin_id", get(handlers::get_report))
        .route("/api/anomalies/:coin_id", get(handlers::get_anomalies))
        .route("/api/levels/:coin_id", get(handlers::get_levels))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Connects to the database, applies migrations and serves the API until shutdown.
///
/// Tracing is initialized by the caller.
pub async fn run_server(settings: Settings) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let db_pool = database::connect(&settings.database).await?;
    database::run_migrations(&db_pool).await?;
    let db_repo = DbRepository::new(db_pool);

    let analytics = AnalyticsService::new(Arc::new(db_repo), &settings.loader, settings.analysis);
    let app = router(Arc::new(AppState { analytics }));

    let addr = (settings.server.host.as_str(), settings.server.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Web server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
