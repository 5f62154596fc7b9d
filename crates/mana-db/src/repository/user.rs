//! # User Repository
//!
//! User accounts plus the two financial ledgers attached to them: the cash
//! balance on the user row and the typed per-method balance map.
//!
//! ## Method Balance UPSERT
//! A user's crypto/EFT balance row may not exist yet. Instead of a
//! read-then-insert two-step, `upsert_method_balance` issues one statement:
//!
//! ```sql
//! INSERT INTO user_method_balances (user_id, method, balance_cents)
//! VALUES (?1, ?2, ?3)
//! ON CONFLICT (user_id, method)
//! DO UPDATE SET balance_cents = balance_cents + excluded.balance_cents
//! ```
//!
//! Missing key behaves as zero; the increment lands either way.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use mana_core::{BalanceMethod, User};

/// Repository for user rows and their balances. Borrows the caller's
/// connection.
pub struct UserRepo<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> UserRepo<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        UserRepo { conn }
    }

    /// Inserts a user row and returns the stored id.
    pub async fn insert(&mut self, user: &User) -> DbResult<String> {
        let id = if user.id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            user.id.clone()
        };

        debug!(id = %id, role = %user.role.as_str(), "Inserting user");

        sqlx::query(
            r#"
            INSERT INTO users (
                id, created_by, role, name, cash_balance_cents,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&id)
        .bind(&user.created_by)
        .bind(user.role)
        .bind(&user.name)
        .bind(user.cash_balance_cents)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(id)
    }

    /// Gets a user by id.
    pub async fn get(&mut self, id: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, created_by, role, name, cash_balance_cents,
                   created_at, updated_at
            FROM users
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(user)
    }

    /// Gets a user, failing with NotFound when missing.
    pub async fn get_required(&mut self, id: &str) -> DbResult<User> {
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))
    }

    /// Applies a signed increment to the user's cash ledger and returns the
    /// resulting balance in cents.
    pub async fn adjust_cash(&mut self, id: &str, delta_cents: i64) -> DbResult<i64> {
        let balance: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE users
            SET cash_balance_cents = cash_balance_cents + ?1,
                updated_at = ?2
            WHERE id = ?3
            RETURNING cash_balance_cents
            "#,
        )
        .bind(delta_cents)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        balance.ok_or_else(|| DbError::not_found("User", id))
    }

    /// Applies a signed increment to a non-cash method balance, creating the
    /// row on first use. Returns the resulting balance in cents.
    pub async fn upsert_method_balance(
        &mut self,
        user_id: &str,
        method: BalanceMethod,
        delta_cents: i64,
    ) -> DbResult<i64> {
        let balance: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO user_method_balances (user_id, method, balance_cents)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (user_id, method)
            DO UPDATE SET balance_cents = balance_cents + excluded.balance_cents
            RETURNING balance_cents
            "#,
        )
        .bind(user_id)
        .bind(method)
        .bind(delta_cents)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(balance)
    }

    /// Reads a method balance; absent row reads as zero.
    pub async fn method_balance(
        &mut self,
        user_id: &str,
        method: BalanceMethod,
    ) -> DbResult<i64> {
        let balance: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT balance_cents FROM user_method_balances
            WHERE user_id = ?1 AND method = ?2
            "#,
        )
        .bind(user_id)
        .bind(method)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(balance.unwrap_or(0))
    }
}
