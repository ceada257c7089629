use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;

/// Application-wide knobs read by quota and expiry logic. Single row, id 1,
/// seeded by the initial migration.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct AppSettings {
    pub id: i64,
    pub free_offers_per_month: i64,
    pub request_expiry_days: i64,
    pub max_images_per_request: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdateAppSettings {
    pub free_offers_per_month: i64,
    pub request_expiry_days: i64,
    pub max_images_per_request: i64,
}

const SETTINGS_COLUMNS: &str =
    "id, free_offers_per_month, request_expiry_days, max_images_per_request, updated_at";

impl AppSettings {
    pub async fn get(pool: &SqlitePool) -> Result<Self, sqlx::Error> {
        sqlx::query_as(&format!("SELECT {SETTINGS_COLUMNS} FROM app_settings WHERE id = 1"))
            .fetch_one(pool)
            .await
    }

    pub async fn update(pool: &SqlitePool, data: &UpdateAppSettings) -> Result<Self, sqlx::Error> {
        sqlx::query_as(&format!(
            "UPDATE app_settings
             SET free_offers_per_month = $1,
                 request_expiry_days = $2,
                 max_images_per_request = $3,
                 updated_at = datetime('now', 'subsec')
             WHERE id = 1
             RETURNING {SETTINGS_COLUMNS}"
        ))
        .bind(data.free_offers_per_month)
        .bind(data.request_expiry_days)
        .bind(data.max_images_per_request)
        .fetch_one(pool)
        .await
    }
}
