use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "request_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RequestStatus {
    #[default]
    Active,
    Assigned,
    Completed,
    Expired,
    Cancelled,
}

/// A customer's posted job seeking offers.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct ServiceRequest {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub category_id: Uuid,
    pub title: String,
    pub description: String,
    pub city: Option<String>,
    /// JSON-serialized list of image URLs.
    pub images: String,
    pub status: RequestStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceRequest {
    /// Parse the images JSON column into URLs.
    pub fn image_urls(&self) -> Vec<String> {
        serde_json::from_str(&self.images).unwrap_or_default()
    }

    /// Active for listing and offer-eligibility purposes. An expiry
    /// timestamp equal to `now` already counts as expired.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == RequestStatus::Active && self.expires_at > now
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateServiceRequest {
    pub category_id: Uuid,
    pub title: String,
    pub description: String,
    pub city: Option<String>,
    pub images: Option<Vec<String>>,
}

const REQUEST_COLUMNS: &str = "id, customer_id, category_id, title, description, city, images, \
     status, expires_at, created_at, updated_at";

impl ServiceRequest {
    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        customer_id: Uuid,
        data: &CreateServiceRequest,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        let images = serde_json::to_string(data.images.as_deref().unwrap_or_default())
            .map_err(|e| sqlx::Error::Protocol(e.to_string()))?;
        sqlx::query_as(&format!(
            "INSERT INTO requests (id, customer_id, category_id, title, description, city, images, expires_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {REQUEST_COLUMNS}"
        ))
        .bind(id)
        .bind(customer_id)
        .bind(data.category_id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.city)
        .bind(images)
        .bind(expires_at)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(&format!("SELECT {REQUEST_COLUMNS} FROM requests WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Requests that are active right now. The expiry filter is applied in
    /// the query so a row the sweep has not flipped yet is still excluded.
    pub async fn list_active(
        pool: &SqlitePool,
        now: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {REQUEST_COLUMNS} FROM requests
             WHERE status = 'active' AND datetime(expires_at) > datetime($1)
             ORDER BY created_at DESC"
        ))
        .bind(now)
        .fetch_all(pool)
        .await
    }

    pub async fn list_by_customer(
        pool: &SqlitePool,
        customer_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {REQUEST_COLUMNS} FROM requests
             WHERE customer_id = $1
             ORDER BY created_at DESC"
        ))
        .bind(customer_id)
        .fetch_all(pool)
        .await
    }

    pub async fn update_status<'e, E>(
        executor: E,
        id: Uuid,
        status: RequestStatus,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "UPDATE requests
             SET status = $2, updated_at = datetime('now', 'subsec')
             WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Flip every actively-expired request to `expired`, returning the
    /// affected rows so callers can notify their owners.
    pub async fn mark_expired_due<'e, E>(
        executor: E,
        now: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as(&format!(
            "UPDATE requests
             SET status = 'expired', updated_at = datetime('now', 'subsec')
             WHERE status = 'active' AND datetime(expires_at) <= datetime($1)
             RETURNING {REQUEST_COLUMNS}"
        ))
        .bind(now)
        .fetch_all(executor)
        .await
    }
}
