use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

/// A paid, time-boxed visibility boost applied to a provider's listing.
#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display,
)]
#[sqlx(type_name = "promotion_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PromotionKind {
    Spotlight,
    CategoryBoost,
}

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "promotion_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PromotionStatus {
    #[default]
    Active,
    Expired,
    Cancelled,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Promotion {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub kind: PromotionKind,
    pub status: PromotionStatus,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

const PROMOTION_COLUMNS: &str =
    "id, provider_id, kind, status, starts_at, ends_at, created_at";

impl Promotion {
    pub async fn create<'e, E>(
        executor: E,
        id: Uuid,
        provider_id: Uuid,
        kind: PromotionKind,
        ends_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as(&format!(
            "INSERT INTO promotions (id, provider_id, kind, ends_at)
             VALUES ($1, $2, $3, $4)
             RETURNING {PROMOTION_COLUMNS}"
        ))
        .bind(id)
        .bind(provider_id)
        .bind(kind)
        .bind(ends_at)
        .fetch_one(executor)
        .await
    }

    /// The provider's active promotion with the latest end, if any is still
    /// running at `now`.
    pub async fn find_active_for(
        pool: &SqlitePool,
        provider_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {PROMOTION_COLUMNS} FROM promotions
             WHERE provider_id = $1 AND status = 'active' AND datetime(ends_at) > datetime($2)
             ORDER BY datetime(ends_at) DESC
             LIMIT 1"
        ))
        .bind(provider_id)
        .bind(now)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_provider(
        pool: &SqlitePool,
        provider_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {PROMOTION_COLUMNS} FROM promotions
             WHERE provider_id = $1
             ORDER BY created_at DESC"
        ))
        .bind(provider_id)
        .fetch_all(pool)
        .await
    }

    /// Flip promotions whose end has passed to `expired`, returning the
    /// affected rows so their providers can be notified.
    pub async fn mark_expired_due<'e, E>(
        executor: E,
        now: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as(&format!(
            "UPDATE promotions
             SET status = 'expired'
             WHERE status = 'active' AND datetime(ends_at) <= datetime($1)
             RETURNING {PROMOTION_COLUMNS}"
        ))
        .bind(now)
        .fetch_all(executor)
        .await
    }
}
