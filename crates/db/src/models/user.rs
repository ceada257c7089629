use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

/// Base role of an account.
#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UserRole {
    Customer,
    Provider,
    Admin,
}

/// Elevated admin capability. Ordering matters: master_admin implies admin
/// implies sales.
#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display)]
#[sqlx(type_name = "admin_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AdminRole {
    Sales,
    Admin,
    MasterAdmin,
}

impl AdminRole {
    pub fn rank(self) -> u8 {
        match self {
            AdminRole::Sales => 1,
            AdminRole::Admin => 2,
            AdminRole::MasterAdmin => 3,
        }
    }

    pub fn at_least(self, required: AdminRole) -> bool {
        self.rank() >= required.rank()
    }
}

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "subscription_tier", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SubscriptionTier {
    #[default]
    Free,
    Premium,
    Business,
}

impl SubscriptionTier {
    /// Materialized ranking weight used by the provider listing order.
    pub fn weight(self) -> u8 {
        match self {
            SubscriptionTier::Business => 3,
            SubscriptionTier::Premium => 2,
            SubscriptionTier::Free => 1,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    /// `salt$digest`, both base64. NULL for seed providers (no login).
    #[serde(skip_serializing)]
    pub password_digest: Option<String>,
    pub display_name: String,
    pub role: UserRole,
    pub admin_role: Option<AdminRole>,
    pub verified: bool,
    pub subscription_tier: SubscriptionTier,
    pub free_offers_used: i64,
    pub offer_period_start: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateUser {
    pub email: String,
    pub password_digest: Option<String>,
    pub display_name: String,
    pub role: UserRole,
}

const USER_COLUMNS: &str = "id, email, password_digest, display_name, role, admin_role, \
     verified, subscription_tier, free_offers_used, offer_period_start, created_at, updated_at";

impl User {
    pub async fn create(pool: &SqlitePool, id: Uuid, data: &CreateUser) -> Result<Self, sqlx::Error> {
        sqlx::query_as(&format!(
            "INSERT INTO users (id, email, password_digest, display_name, role)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(&data.email)
        .bind(&data.password_digest)
        .bind(&data.display_name)
        .bind(data.role)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &SqlitePool, limit: i64, offset: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    pub async fn set_verified(
        pool: &SqlitePool,
        id: Uuid,
        verified: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(&format!(
            "UPDATE users
             SET verified = $2, updated_at = datetime('now', 'subsec')
             WHERE id = $1 AND role = 'provider'
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(verified)
        .fetch_optional(pool)
        .await
    }

    pub async fn set_subscription_tier<'e, E>(
        executor: E,
        id: Uuid,
        tier: SubscriptionTier,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as(&format!(
            "UPDATE users
             SET subscription_tier = $2, updated_at = datetime('now', 'subsec')
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(tier)
        .fetch_optional(executor)
        .await
    }

    /// Start a fresh quota period if the stored one predates `period_start`.
    /// Returns the number of rows updated (0 when the period is current).
    pub async fn reset_offer_period_if_due<'e, E>(
        executor: E,
        id: Uuid,
        period_start: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "UPDATE users
             SET free_offers_used = 0, offer_period_start = $2,
                 updated_at = datetime('now', 'subsec')
             WHERE id = $1 AND datetime(offer_period_start) < datetime($2)",
        )
        .bind(id)
        .bind(period_start)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Conditional increment of the monthly offer counter. The tier check
    /// lives in the statement so two concurrent submissions cannot both
    /// pass a stale read. Returns 0 rows when the free-tier quota is spent.
    pub async fn try_increment_offer_count<'e, E>(
        executor: E,
        id: Uuid,
        monthly_limit: i64,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "UPDATE users
             SET free_offers_used = free_offers_used + 1,
                 updated_at = datetime('now', 'subsec')
             WHERE id = $1
               AND (subscription_tier != 'free' OR free_offers_used < $2)",
        )
        .bind(id)
        .bind(monthly_limit)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_role_ordering() {
        assert!(AdminRole::MasterAdmin.at_least(AdminRole::Sales));
        assert!(AdminRole::Admin.at_least(AdminRole::Admin));
        assert!(!AdminRole::Sales.at_least(AdminRole::Admin));
    }

    #[test]
    fn tier_weights() {
        assert_eq!(SubscriptionTier::Business.weight(), 3);
        assert_eq!(SubscriptionTier::Premium.weight(), 2);
        assert_eq!(SubscriptionTier::Free.weight(), 1);
    }

    #[test]
    fn roles_round_trip_as_strings() {
        use std::str::FromStr;
        assert_eq!(UserRole::Provider.to_string(), "provider");
        assert_eq!(UserRole::from_str("customer").unwrap(), UserRole::Customer);
        assert_eq!(AdminRole::MasterAdmin.to_string(), "master_admin");
        assert_eq!(AdminRole::from_str("master_admin").unwrap(), AdminRole::MasterAdmin);
    }
}
