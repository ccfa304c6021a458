use analytics::SourceError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Failed to load environment variables for database connection: {0}")]
    ConnectionConfigError(String),

    #[error("Database query failed: {0}")]
    QueryError(#[from] sqlx::Error),

    #[error("Database migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
}

impl DbError {
    /// Whether the failure is likely to clear up on its own (pool exhaustion, I/O).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DbError::QueryError(
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
            )
        )
    }
}

impl From<DbError> for SourceError {
    fn from(err: DbError) -> Self {
        if err.is_transient() {
            SourceError::Unavailable(err.to_string())
        } else {
            SourceError::Rejected(err.to_string())
        }
    }
}
