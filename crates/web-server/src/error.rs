use analytics::AnalyticsError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),
    #[error("Database error: {0}")]
    Database(#[from] database::DbError),
    #[error("Configuration error: {0}")]
    Config(#[from] configuration::error::ConfigError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Analytics(AnalyticsError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Analytics(AnalyticsError::InsufficientData { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Analytics(AnalyticsError::InvalidParameters(_)) => StatusCode::BAD_REQUEST,
            AppError::Analytics(AnalyticsError::UpstreamUnavailable(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Database(_) | AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Converts our custom `AppError` into an HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match self {
            AppError::Analytics(AnalyticsError::UpstreamUnavailable(detail)) => {
                tracing::error!(error = %detail, "Price source unavailable.");
                "Market data source is unavailable".to_string()
            }
            AppError::Analytics(err) => err.to_string(),
            AppError::Database(db_err) => {
                tracing::error!(error = ?db_err, "Database error.");
                "An internal database error occurred".to_string()
            }
            AppError::Config(config_err) => {
                tracing::error!(error = ?config_err, "Configuration error.");
                "A server configuration error occurred".to_string()
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analytics_errors_map_to_client_and_upstream_statuses() {
        let cases = [
            (AnalyticsError::NotFound("btc".into()), StatusCode::NOT_FOUND),
            (
                AnalyticsError::InsufficientData {
                    required: 2,
                    available: 1,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (AnalyticsError::InvalidParameters("x".into()), StatusCode::BAD_REQUEST),
            (
                AnalyticsError::UpstreamUnavailable("down".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn internal_faults_are_500() {
        let err = AppError::from(database::DbError::ConnectionConfigError("missing".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
