use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    #[error("No market data found for coin '{0}'")]
    NotFound(String),

    #[error("Not enough data to perform calculation: need {required} points, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("Market data source is unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Invalid analysis parameters: {0}")]
    InvalidParameters(String),
}

/// Failure reported by a `PriceSource` implementation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    /// Transient; the loader retries once.
    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("source rejected the request: {0}")]
    Rejected(String),
}

impl From<SourceError> for AnalyticsError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Unavailable(msg) | SourceError::Rejected(msg) => {
                AnalyticsError::UpstreamUnavailable(msg)
            }
        }
    }
}
