use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use super::{
    category::Category,
    promotion::PromotionKind,
    user::SubscriptionTier,
};

/// Extended profile a provider fills in after registration. Seed providers
/// are admin-authored records with `is_seed = true`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct ProviderProfile {
    pub user_id: Uuid,
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub is_seed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpsertProviderProfile {
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
}

const PROFILE_COLUMNS: &str =
    "user_id, headline, bio, city, phone, is_seed, created_at, updated_at";

impl ProviderProfile {
    pub async fn find_by_user_id(
        pool: &SqlitePool,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {PROFILE_COLUMNS} FROM provider_profiles WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn upsert(
        pool: &SqlitePool,
        user_id: Uuid,
        data: &UpsertProviderProfile,
        is_seed: bool,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as(&format!(
            "INSERT INTO provider_profiles (user_id, headline, bio, city, phone, is_seed)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT(user_id) DO UPDATE SET
                 headline = excluded.headline,
                 bio = excluded.bio,
                 city = excluded.city,
                 phone = excluded.phone,
                 updated_at = datetime('now', 'subsec')
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&data.headline)
        .bind(&data.bio)
        .bind(&data.city)
        .bind(&data.phone)
        .bind(is_seed)
        .fetch_one(pool)
        .await
    }

    /// Replace a provider's category tags with the given set.
    pub async fn replace_categories(
        pool: &SqlitePool,
        provider_id: Uuid,
        category_ids: &[Uuid],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM provider_categories WHERE provider_id = $1")
            .bind(provider_id)
            .execute(&mut *tx)
            .await?;
        for category_id in category_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO provider_categories (provider_id, category_id)
                 VALUES ($1, $2)",
            )
            .bind(provider_id)
            .bind(category_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await
    }

    pub async fn categories_for(
        pool: &SqlitePool,
        provider_id: Uuid,
    ) -> Result<Vec<Category>, sqlx::Error> {
        sqlx::query_as(
            "SELECT c.id, c.slug, c.name
             FROM categories c
             JOIN provider_categories pc ON pc.category_id = c.id
             WHERE pc.provider_id = $1
             ORDER BY c.name ASC",
        )
        .bind(provider_id)
        .fetch_all(pool)
        .await
    }
}

/// Filter for the provider listing query.
#[derive(Debug, Clone, Default)]
pub struct ProviderListingFilter {
    pub category_slug: Option<String>,
    pub city: Option<String>,
}

/// Raw listing row composed at read time from users, profiles, reviews and
/// the newest active promotion. Never persisted; the ranking projection in
/// the services crate turns this into the displayed record.
#[derive(Debug, Clone, FromRow)]
pub struct ProviderListingRow {
    pub id: Uuid,
    pub display_name: String,
    pub verified: bool,
    pub subscription_tier: SubscriptionTier,
    pub headline: Option<String>,
    pub city: Option<String>,
    pub is_seed: Option<bool>,
    pub rating: f64,
    pub review_count: i64,
    pub promotion_kind: Option<PromotionKind>,
    pub promotion_ends_at: Option<DateTime<Utc>>,
}

impl ProviderListingRow {
    pub async fn fetch(
        pool: &SqlitePool,
        filter: &ProviderListingFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT u.id, u.display_name, u.verified, u.subscription_tier,
                    pp.headline, pp.city, pp.is_seed,
                    CAST(COALESCE((SELECT AVG(r.rating) FROM reviews r WHERE r.provider_id = u.id), 0) AS REAL) AS rating,
                    (SELECT COUNT(*) FROM reviews r WHERE r.provider_id = u.id) AS review_count,
                    pm.kind AS promotion_kind,
                    pm.ends_at AS promotion_ends_at
             FROM users u
             LEFT JOIN provider_profiles pp ON pp.user_id = u.id
             LEFT JOIN promotions pm ON pm.id = (
                 SELECT id FROM promotions
                 WHERE provider_id = u.id AND status = 'active'
                 ORDER BY datetime(ends_at) DESC
                 LIMIT 1
             )
             WHERE u.role = 'provider'",
        );
        if let Some(slug) = &filter.category_slug {
            qb.push(
                " AND EXISTS (
                     SELECT 1 FROM provider_categories pc
                     JOIN categories c ON c.id = pc.category_id
                     WHERE pc.provider_id = u.id AND c.slug = ",
            );
            qb.push_bind(slug);
            qb.push(")");
        }
        if let Some(city) = &filter.city {
            qb.push(" AND pp.city = ");
            qb.push_bind(city);
        }
        qb.push(" ORDER BY u.created_at ASC");
        qb.build_query_as().fetch_all(pool).await
    }
}
