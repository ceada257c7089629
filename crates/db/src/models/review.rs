use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Review {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub author_id: Uuid,
    pub request_id: Option<Uuid>,
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateReview {
    pub rating: i64,
    pub comment: Option<String>,
    pub request_id: Option<Uuid>,
}

const REVIEW_COLUMNS: &str =
    "id, provider_id, author_id, request_id, rating, comment, created_at";

impl Review {
    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        provider_id: Uuid,
        author_id: Uuid,
        data: &CreateReview,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as(&format!(
            "INSERT INTO reviews (id, provider_id, author_id, request_id, rating, comment)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(id)
        .bind(provider_id)
        .bind(author_id)
        .bind(data.request_id)
        .bind(data.rating)
        .bind(&data.comment)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_provider(
        pool: &SqlitePool,
        provider_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews
             WHERE provider_id = $1
             ORDER BY created_at DESC"
        ))
        .bind(provider_id)
        .fetch_all(pool)
        .await
    }

    /// Average rating and review count for one provider. `0.0` with no
    /// reviews, matching the listing projection default.
    pub async fn aggregate_for(
        pool: &SqlitePool,
        provider_id: Uuid,
    ) -> Result<(f64, i64), sqlx::Error> {
        let row: (f64, i64) = sqlx::query_as(
            "SELECT CAST(COALESCE(AVG(rating), 0) AS REAL), COUNT(*)
             FROM reviews WHERE provider_id = $1",
        )
        .bind(provider_id)
        .fetch_one(pool)
        .await?;
        Ok(row)
    }
}
