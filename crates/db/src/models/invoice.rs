use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "invoice_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InvoiceStatus {
    #[default]
    Issued,
    Paid,
    Cancelled,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Invoice {
    pub id: Uuid,
    /// Sequential per calendar year, e.g. `2026-000123`.
    pub number: String,
    pub user_id: Uuid,
    pub amount_czk: i64,
    pub description: String,
    pub status: InvoiceStatus,
    pub issued_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

const INVOICE_COLUMNS: &str =
    "id, number, user_id, amount_czk, description, status, issued_at, due_at, paid_at";

impl Invoice {
    /// Allocate the next invoice number for the current year. Must run
    /// inside the same transaction as the insert that uses it.
    pub async fn next_number<'e, E>(executor: E, now: DateTime<Utc>) -> Result<String, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let prefix = format!("{}-", now.year());
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM invoices WHERE number LIKE $1 || '%'",
        )
        .bind(&prefix)
        .fetch_one(executor)
        .await?;
        Ok(format!("{}{:06}", prefix, row.0 + 1))
    }

    pub async fn create<'e, E>(
        executor: E,
        id: Uuid,
        number: &str,
        user_id: Uuid,
        amount_czk: i64,
        description: &str,
        due_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as(&format!(
            "INSERT INTO invoices (id, number, user_id, amount_czk, description, due_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {INVOICE_COLUMNS}"
        ))
        .bind(id)
        .bind(number)
        .bind(user_id)
        .bind(amount_czk)
        .bind(description)
        .bind(due_at)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(&format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_user(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices
             WHERE user_id = $1
             ORDER BY issued_at DESC"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn mark_paid(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(&format!(
            "UPDATE invoices
             SET status = 'paid', paid_at = datetime('now', 'subsec')
             WHERE id = $1 AND status = 'issued'
             RETURNING {INVOICE_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}
