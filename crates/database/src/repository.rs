use crate::DbError;
use analytics::{PriceSource, SourceError};
use async_trait::async_trait;
use core_types::PricePoint;
use sqlx::Row;
use sqlx::postgres::PgPool;

/// Read access to the `market_data` table.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: PgPool,
}

impl DbRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Every stored sample for `coin_id`, in ingestion order.
    ///
    /// Rows are returned as stored; ordering by timestamp and dropping duplicate
    /// timestamps happens in the analytics loader.
    pub async fn get_market_data(&self, coin_id: &str) -> Result<Vec<PricePoint>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT timestamp, price
            FROM market_data
            WHERE coin_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(coin_id)
        .fetch_all(&self.pool)
        .await?;

        let points = rows
            .into_iter()
            .map(|row| -> Result<PricePoint, sqlx::Error> {
                Ok(PricePoint {
                    timestamp: row.try_get("timestamp")?,
                    price: row.try_get("price")?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(coin_id, rows = points.len(), "Fetched market data.");
        Ok(points)
    }

    pub async fn get_coin_ids(&self) -> Result<Vec<String>, DbError> {
        let rows = sqlx::query("SELECT DISTINCT coin_id FROM market_data ORDER BY coin_id")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| row.try_get("coin_id").map_err(DbError::from))
            .collect()
    }
}

#[async_trait]
impl PriceSource for DbRepository {
    async fn fetch_prices(&self, coin: &str) -> Result<Vec<PricePoint>, SourceError> {
        Ok(self.get_market_data(coin).await?)
    }

    async fn list_coins(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.get_coin_ids().await?)
    }
}
