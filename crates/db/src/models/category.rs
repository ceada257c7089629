use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// A service category providers tag themselves with.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Category {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
}

impl Category {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as("SELECT id, slug, name FROM categories ORDER BY name ASC")
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as("SELECT id, slug, name FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as("SELECT id, slug, name FROM categories WHERE slug = $1")
            .bind(slug)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(pool: &SqlitePool, slug: &str, name: &str) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            "INSERT INTO categories (id, slug, name) VALUES ($1, $2, $3)
             RETURNING id, slug, name",
        )
        .bind(Uuid::new_v4())
        .bind(slug)
        .bind(name)
        .fetch_one(pool)
        .await
    }
}
