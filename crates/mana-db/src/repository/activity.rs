//! # Activity Log Repository
//!
//! Append-only audit trail. The engine writes these AFTER the ledger
//! transaction commits; a failed write is logged and swallowed, never
//! propagated, so a broken audit table cannot undo committed money movement.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::error::DbResult;
use mana_core::{ActivityEntry, BalanceMethod, PaymentDirection};

/// A persisted activity log row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ActivityRecord {
    pub id: String,
    pub user_id: String,
    pub buyer_id: Option<String>,
    pub transaction_id: Option<String>,
    pub worker_id: Option<String>,
    pub description: String,
    pub amount_cents: i64,
    pub payment_method: Option<BalanceMethod>,
    pub payment_direction: Option<PaymentDirection>,
    pub created_at: DateTime<Utc>,
}

/// Repository for the audit trail. Borrows the caller's connection.
pub struct ActivityLogRepo<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> ActivityLogRepo<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        ActivityLogRepo { conn }
    }

    /// Appends one activity entry and returns its id.
    pub async fn insert(&mut self, entry: &ActivityEntry) -> DbResult<String> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO activity_logs (
                id, user_id, buyer_id, transaction_id, worker_id,
                description, amount_cents, payment_method, payment_direction,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&id)
        .bind(&entry.user_id)
        .bind(&entry.buyer_id)
        .bind(&entry.transaction_id)
        .bind(&entry.worker_id)
        .bind(&entry.description)
        .bind(entry.amount_cents)
        .bind(entry.payment_method)
        .bind(entry.payment_direction)
        .bind(Utc::now())
        .execute(&mut *self.conn)
        .await?;

        Ok(id)
    }

    /// Activity for one user, newest first.
    pub async fn for_user(&mut self, user_id: &str, limit: i64) -> DbResult<Vec<ActivityRecord>> {
        let rows = sqlx::query_as::<_, ActivityRecord>(
            r#"
            SELECT id, user_id, buyer_id, transaction_id, worker_id,
                   description, amount_cents, payment_method, payment_direction,
                   created_at
            FROM activity_logs
            WHERE user_id = ?1
            ORDER BY created_at DESC, id DESC
            LIMIT ?2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(rows)
    }
}
