use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// Social feed entry.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreatePost {
    pub body: String,
    pub image_url: Option<String>,
}

const POST_COLUMNS: &str = "id, author_id, body, image_url, created_at";

impl Post {
    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        author_id: Uuid,
        data: &CreatePost,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as(&format!(
            "INSERT INTO posts (id, author_id, body, image_url)
             VALUES ($1, $2, $3, $4)
             RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .bind(author_id)
        .bind(&data.body)
        .bind(&data.image_url)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Recent posts, newest first. `before` pages backwards through the feed.
    pub async fn list_recent(
        pool: &SqlitePool,
        limit: i64,
        before: Option<DateTime<Utc>>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        match before {
            Some(before) => {
                sqlx::query_as(&format!(
                    "SELECT {POST_COLUMNS} FROM posts
                     WHERE datetime(created_at) < datetime($1)
                     ORDER BY created_at DESC
                     LIMIT $2"
                ))
                .bind(before)
                .bind(limit)
                .fetch_all(pool)
                .await
            }
            None => {
                sqlx::query_as(&format!(
                    "SELECT {POST_COLUMNS} FROM posts
                     ORDER BY created_at DESC
                     LIMIT $1"
                ))
                .bind(limit)
                .fetch_all(pool)
                .await
            }
        }
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
