use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use common::error::Result;
use sqlx::PgPool;

use super::SnapshotRepository;
use crate::models::PriceSnapshot;

pub struct PostgresSnapshotRepository {
    pool: PgPool,
}

impl PostgresSnapshotRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnapshotRepository for PostgresSnapshotRepository {
    async fn record(&self, snapshots: &[PriceSnapshot]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        for snapshot in snapshots {
            sqlx::query(
                r#"
                INSERT INTO price_snapshots (code, price, recorded_at)
                VALUES ($1, $2::numeric, $3)
                "#,
            )
            .bind(&snapshot.code)
            .bind(snapshot.price.to_string())
            .bind(snapshot.recorded_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(snapshots.len())
    }

    async fn latest(&self, code: &str, limit: usize) -> Result<Vec<PriceSnapshot>> {
        let rows: Vec<(String, String, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT code, price::text, recorded_at
            FROM price_snapshots
            WHERE code = $1
            ORDER BY recorded_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(code)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .rev()
            .map(|(code, price, recorded_at)| -> Result<PriceSnapshot> {
                Ok(PriceSnapshot {
                    code,
                    price: Decimal::from_str(&price)?,
                    recorded_at,
                })
            })
            .collect()
    }
}
