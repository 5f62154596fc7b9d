//! # Sample Repository
//!
//! Provisional sample holds. Rows move through held → accepted/returned and
//! are never deleted.

use chrono::Utc;
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use mana_core::{Sample, SampleStatus};

/// Repository for sample rows. Borrows the caller's connection.
pub struct SampleRepo<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> SampleRepo<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        SampleRepo { conn }
    }

    /// Inserts a sample row and returns the stored id.
    pub async fn insert(&mut self, sample: &Sample) -> DbResult<String> {
        let id = if sample.id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            sample.id.clone()
        };

        sqlx::query(
            r#"
            INSERT INTO samples (
                id, user_id, buyer_id, name, unit, category,
                qty, measurement, price_cents, shipping_cents,
                status, transaction_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&id)
        .bind(&sample.user_id)
        .bind(&sample.buyer_id)
        .bind(&sample.name)
        .bind(&sample.unit)
        .bind(&sample.category)
        .bind(sample.qty)
        .bind(sample.measurement)
        .bind(sample.price_cents)
        .bind(sample.shipping_cents)
        .bind(sample.status)
        .bind(&sample.transaction_id)
        .bind(sample.created_at)
        .bind(sample.updated_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(id)
    }

    /// Gets a sample by id.
    pub async fn get(&mut self, id: &str) -> DbResult<Option<Sample>> {
        let sample = sqlx::query_as::<_, Sample>(
            r#"
            SELECT id, user_id, buyer_id, name, unit, category,
                   qty, measurement, price_cents, shipping_cents,
                   status, transaction_id, created_at, updated_at
            FROM samples
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(sample)
    }

    /// Gets a sample, failing with NotFound when missing.
    pub async fn get_required(&mut self, id: &str) -> DbResult<Sample> {
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Sample", id))
    }

    /// Advances a sample out of `held`, guarding against double resolution:
    /// the WHERE clause only matches rows still held.
    pub async fn resolve(&mut self, id: &str, status: SampleStatus) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE samples
            SET status = ?1, updated_at = ?2
            WHERE id = ?3 AND status = 'held'
            "#,
        )
        .bind(status)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Held sample", id));
        }

        Ok(())
    }

    /// Back-links the intake transaction onto a sample row.
    pub async fn link_transaction(&mut self, id: &str, transaction_id: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE samples
            SET transaction_id = ?1, updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(transaction_id)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sample", id));
        }

        Ok(())
    }

    /// Samples currently held with a buyer.
    pub async fn held_for_buyer(&mut self, buyer_id: &str) -> DbResult<Vec<Sample>> {
        let rows = sqlx::query_as::<_, Sample>(
            r#"
            SELECT id, user_id, buyer_id, name, unit, category,
                   qty, measurement, price_cents, shipping_cents,
                   status, transaction_id, created_at, updated_at
            FROM samples
            WHERE buyer_id = ?1 AND status = 'held'
            ORDER BY created_at
            "#,
        )
        .bind(buyer_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(rows)
    }
}
