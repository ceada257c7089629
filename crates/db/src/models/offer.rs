use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "offer_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OfferStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
    Withdrawn,
}

/// A provider's bid against a request. One per provider per request.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Offer {
    pub id: Uuid,
    pub request_id: Uuid,
    pub provider_id: Uuid,
    pub price_czk: i64,
    pub message: String,
    pub status: OfferStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateOffer {
    pub price_czk: i64,
    pub message: String,
}

const OFFER_COLUMNS: &str =
    "id, request_id, provider_id, price_czk, message, status, created_at, updated_at";

impl Offer {
    pub async fn create<'e, E>(
        executor: E,
        id: Uuid,
        request_id: Uuid,
        provider_id: Uuid,
        data: &CreateOffer,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as(&format!(
            "INSERT INTO offers (id, request_id, provider_id, price_czk, message)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {OFFER_COLUMNS}"
        ))
        .bind(id)
        .bind(request_id)
        .bind(provider_id)
        .bind(data.price_czk)
        .bind(&data.message)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(&format!("SELECT {OFFER_COLUMNS} FROM offers WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_request(
        pool: &SqlitePool,
        request_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {OFFER_COLUMNS} FROM offers
             WHERE request_id = $1
             ORDER BY created_at ASC"
        ))
        .bind(request_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_provider(
        pool: &SqlitePool,
        provider_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {OFFER_COLUMNS} FROM offers
             WHERE provider_id = $1
             ORDER BY created_at DESC"
        ))
        .bind(provider_id)
        .fetch_all(pool)
        .await
    }

    pub async fn exists_for(
        pool: &SqlitePool,
        request_id: Uuid,
        provider_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM offers WHERE request_id = $1 AND provider_id = $2",
        )
        .bind(request_id)
        .bind(provider_id)
        .fetch_optional(pool)
        .await?;
        Ok(row.is_some())
    }

    pub async fn update_status<'e, E>(
        executor: E,
        id: Uuid,
        status: OfferStatus,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "UPDATE offers
             SET status = $2, updated_at = datetime('now', 'subsec')
             WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Reject every other pending offer on a request once one is accepted.
    /// Returns the rejected offers so their providers can be notified.
    pub async fn reject_siblings<'e, E>(
        executor: E,
        request_id: Uuid,
        accepted_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as(&format!(
            "UPDATE offers
             SET status = 'rejected', updated_at = datetime('now', 'subsec')
             WHERE request_id = $1 AND id != $2 AND status = 'pending'
             RETURNING {OFFER_COLUMNS}"
        ))
        .bind(request_id)
        .bind(accepted_id)
        .fetch_all(executor)
        .await
    }
}
