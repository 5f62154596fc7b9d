//! # Buyer Repository
//!
//! Buyer accounts and the running signed balance.
//!
//! `adjust_balance` is the only balance mutation in the system: a signed
//! increment applied in SQL, never a recompute from history.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use mana_core::Buyer;

/// Repository for buyer rows. Borrows the caller's connection.
pub struct BuyerRepo<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> BuyerRepo<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        BuyerRepo { conn }
    }

    /// Inserts a buyer row and returns the stored id.
    pub async fn insert(&mut self, buyer: &Buyer) -> DbResult<String> {
        let id = if buyer.id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            buyer.id.clone()
        };

        debug!(id = %id, name = %buyer.display_name(), "Inserting buyer");

        sqlx::query(
            r#"
            INSERT INTO buyers (
                id, user_id, admin_id, first_name, last_name, email, phone,
                starting_balance_cents, current_balance_cents,
                created_at, updated_at, deleted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&id)
        .bind(&buyer.user_id)
        .bind(&buyer.admin_id)
        .bind(&buyer.first_name)
        .bind(&buyer.last_name)
        .bind(&buyer.email)
        .bind(&buyer.phone)
        .bind(buyer.starting_balance_cents)
        .bind(buyer.current_balance_cents)
        .bind(buyer.created_at)
        .bind(buyer.updated_at)
        .bind(buyer.deleted_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(id)
    }

    /// Gets a live buyer by id.
    pub async fn get(&mut self, id: &str) -> DbResult<Option<Buyer>> {
        let buyer = sqlx::query_as::<_, Buyer>(
            r#"
            SELECT id, user_id, admin_id, first_name, last_name, email, phone,
                   starting_balance_cents, current_balance_cents,
                   created_at, updated_at, deleted_at
            FROM buyers
            WHERE id = ?1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(buyer)
    }

    /// Gets a live buyer, failing with NotFound when missing.
    pub async fn get_required(&mut self, id: &str) -> DbResult<Buyer> {
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Buyer", id))
    }

    /// Applies a signed increment to the buyer's running balance and
    /// returns the resulting balance in cents.
    pub async fn adjust_balance(&mut self, id: &str, delta_cents: i64) -> DbResult<i64> {
        let balance: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE buyers
            SET current_balance_cents = current_balance_cents + ?1,
                updated_at = ?2
            WHERE id = ?3 AND deleted_at IS NULL
            RETURNING current_balance_cents
            "#,
        )
        .bind(delta_cents)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        balance.ok_or_else(|| DbError::not_found("Buyer", id))
    }

    /// Soft-deletes a buyer.
    pub async fn soft_delete(&mut self, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE buyers
            SET deleted_at = ?1, updated_at = ?1
            WHERE id = ?2 AND deleted_at IS NULL
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Buyer", id));
        }

        Ok(())
    }
}
