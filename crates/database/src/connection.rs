use crate::error::DbError;
use configuration::DatabaseSettings;
use dotenvy::dotenv;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::env;

/// Establishes a connection pool to the PostgreSQL database.
///
/// `DATABASE_URL` is read from the environment, after loading a `.env` file when
/// one exists. Pool size and acquire timeout come from `settings`.
pub async fn connect(settings: &DatabaseSettings) -> Result<PgPool, DbError> {
    // A missing .env file is fine; the variable may be set directly.
    dotenv().ok();

    let database_url = env::var("DATABASE_URL")
        .map_err(|_e| DbError::ConnectionConfigError("DATABASE_URL must be set.".to_string()))?;

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.acquire_timeout())
        .connect(&database_url)
        .await?;

    tracing::info!(max_connections = settings.max_connections, "Database pool ready.");
    Ok(pool)
}

/// Applies the embedded migrations, creating the `market_data` table if needed.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
