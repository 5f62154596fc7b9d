//! # Transaction Repository
//!
//! Headers, line items, payment events, and the append-only revision
//! history.
//!
//! ## Sale Reference Assignment
//! The human-readable sale code lives behind a partial unique index.
//! `assign_sale_reference` writes one candidate; a collision surfaces as
//! `DbError::UniqueViolation` and the engine samples a fresh code and
//! retries. The reference is written exactly once per sale and never
//! regenerated by the edit flow.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use mana_core::{
    ItemSnapshot, Revision, Transaction, TransactionItem, TransactionPayment,
};

/// Repository for transaction aggregates. Borrows the caller's connection.
pub struct TransactionRepo<'c> {
    conn: &'c mut SqliteConnection,
}

/// Raw revision row; the item snapshots are stored as JSON text.
#[derive(sqlx::FromRow)]
struct RevisionRow {
    id: String,
    transaction_id: String,
    original_items: String,
    items: String,
    created_at: DateTime<Utc>,
}

impl RevisionRow {
    fn decode(self) -> DbResult<Revision> {
        Ok(Revision {
            id: self.id,
            transaction_id: self.transaction_id,
            original_items: serde_json::from_str(&self.original_items)?,
            items: serde_json::from_str(&self.items)?,
            created_at: self.created_at,
        })
    }
}

impl<'c> TransactionRepo<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        TransactionRepo { conn }
    }

    // =========================================================================
    // Headers
    // =========================================================================

    /// Inserts a transaction header and returns the stored id.
    pub async fn insert_header(&mut self, tx: &Transaction) -> DbResult<String> {
        let id = if tx.id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            tx.id.clone()
        };

        debug!(id = %id, tx_type = %tx.tx_type, "Inserting transaction header");

        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, user_id, buyer_id, worker_id, admin_id, created_by_role,
                tx_type, payment_method, payment_direction,
                price_cents, sale_price_cents, total_shipping_cents, profit_cents,
                sale_reference_id, payment_id, notes, edited,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                      ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
            "#,
        )
        .bind(&id)
        .bind(&tx.user_id)
        .bind(&tx.buyer_id)
        .bind(&tx.worker_id)
        .bind(&tx.admin_id)
        .bind(tx.created_by_role)
        .bind(tx.tx_type)
        .bind(tx.payment_method)
        .bind(tx.payment_direction)
        .bind(tx.price_cents)
        .bind(tx.sale_price_cents)
        .bind(tx.total_shipping_cents)
        .bind(tx.profit_cents)
        .bind(&tx.sale_reference_id)
        .bind(&tx.payment_id)
        .bind(&tx.notes)
        .bind(tx.edited)
        .bind(tx.created_at)
        .bind(tx.updated_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(id)
    }

    /// Gets a transaction header by id.
    pub async fn get(&mut self, id: &str) -> DbResult<Option<Transaction>> {
        let tx = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, user_id, buyer_id, worker_id, admin_id, created_by_role,
                   tx_type, payment_method, payment_direction,
                   price_cents, sale_price_cents, total_shipping_cents, profit_cents,
                   sale_reference_id, payment_id, notes, edited,
                   created_at, updated_at
            FROM transactions
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(tx)
    }

    /// Gets a transaction header, failing with NotFound when missing.
    pub async fn get_required(&mut self, id: &str) -> DbResult<Transaction> {
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Transaction", id))
    }

    /// Writes the sale reference for a header.
    ///
    /// The partial unique index rejects duplicates; the caller treats
    /// `UniqueViolation` as "collision, sample again".
    pub async fn assign_sale_reference(&mut self, id: &str, reference: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET sale_reference_id = ?1, updated_at = ?2
            WHERE id = ?3 AND sale_reference_id IS NULL
            "#,
        )
        .bind(reference)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Transaction", id));
        }

        Ok(())
    }

    /// Overwrites the header totals after an edit and marks it edited.
    pub async fn update_totals(
        &mut self,
        id: &str,
        price_cents: i64,
        sale_price_cents: i64,
        total_shipping_cents: i64,
        profit_cents: i64,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET price_cents = ?1,
                sale_price_cents = ?2,
                total_shipping_cents = ?3,
                profit_cents = ?4,
                edited = 1,
                updated_at = ?5
            WHERE id = ?6
            "#,
        )
        .bind(price_cents)
        .bind(sale_price_cents)
        .bind(total_shipping_cents)
        .bind(profit_cents)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Transaction", id));
        }

        Ok(())
    }

    /// Replaces the free-form notes on a header.
    pub async fn set_notes(&mut self, id: &str, notes: Option<&str>) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET notes = ?1, updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(notes)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Transaction", id));
        }

        Ok(())
    }

    /// Back-links a payment row onto its header.
    pub async fn link_payment(&mut self, id: &str, payment_id: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET payment_id = ?1, updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(payment_id)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Transaction", id));
        }

        Ok(())
    }

    // =========================================================================
    // Line items
    // =========================================================================

    /// Inserts a line item and returns the stored id.
    pub async fn insert_item(&mut self, item: &TransactionItem) -> DbResult<String> {
        let id = if item.id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            item.id.clone()
        };

        sqlx::query(
            r#"
            INSERT INTO transaction_items (
                id, transaction_id, inventory_id, user_id, buyer_id,
                qty, measurement, unit, price_cents, sale_price_cents,
                shipping_cents, item_type, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&id)
        .bind(&item.transaction_id)
        .bind(&item.inventory_id)
        .bind(&item.user_id)
        .bind(&item.buyer_id)
        .bind(item.qty)
        .bind(item.measurement)
        .bind(&item.unit)
        .bind(item.price_cents)
        .bind(item.sale_price_cents)
        .bind(item.shipping_cents)
        .bind(item.item_type)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(id)
    }

    /// All line items of a transaction, in insertion order.
    pub async fn items(&mut self, transaction_id: &str) -> DbResult<Vec<TransactionItem>> {
        let items = sqlx::query_as::<_, TransactionItem>(
            r#"
            SELECT id, transaction_id, inventory_id, user_id, buyer_id,
                   qty, measurement, unit, price_cents, sale_price_cents,
                   shipping_cents, item_type, created_at, updated_at
            FROM transaction_items
            WHERE transaction_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(transaction_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(items)
    }

    /// Patches the mutable fields of a line item from an edit snapshot.
    pub async fn patch_item(&mut self, snapshot: &ItemSnapshot) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE transaction_items
            SET qty = ?1,
                measurement = ?2,
                unit = ?3,
                price_cents = ?4,
                sale_price_cents = ?5,
                shipping_cents = ?6,
                updated_at = ?7
            WHERE id = ?8
            "#,
        )
        .bind(snapshot.qty)
        .bind(snapshot.measurement)
        .bind(&snapshot.unit)
        .bind(snapshot.price_cents)
        .bind(snapshot.sale_price_cents)
        .bind(snapshot.shipping_cents)
        .bind(Utc::now())
        .bind(&snapshot.transaction_item_id)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(
                "Transaction item",
                &snapshot.transaction_item_id,
            ));
        }

        Ok(())
    }

    // =========================================================================
    // Payments
    // =========================================================================

    /// Inserts a payment event and returns the stored id.
    pub async fn insert_payment(&mut self, payment: &TransactionPayment) -> DbResult<String> {
        let id = if payment.id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            payment.id.clone()
        };

        sqlx::query(
            r#"
            INSERT INTO transaction_payments (
                id, transaction_id, buyer_id, user_id,
                amount_cents, payment_method, payment_direction, payment_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&id)
        .bind(&payment.transaction_id)
        .bind(&payment.buyer_id)
        .bind(&payment.user_id)
        .bind(payment.amount_cents)
        .bind(payment.payment_method)
        .bind(payment.payment_direction)
        .bind(payment.payment_date)
        .execute(&mut *self.conn)
        .await?;

        Ok(id)
    }

    /// The payment event linked to a transaction, if any.
    pub async fn payment_for(
        &mut self,
        transaction_id: &str,
    ) -> DbResult<Option<TransactionPayment>> {
        let payment = sqlx::query_as::<_, TransactionPayment>(
            r#"
            SELECT id, transaction_id, buyer_id, user_id,
                   amount_cents, payment_method, payment_direction, payment_date
            FROM transaction_payments
            WHERE transaction_id = ?1
            "#,
        )
        .bind(transaction_id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(payment)
    }

    // =========================================================================
    // Revision history
    // =========================================================================

    /// Appends one before/after pair to the revision history.
    pub async fn append_revision(
        &mut self,
        transaction_id: &str,
        original_items: &[ItemSnapshot],
        items: &[ItemSnapshot],
    ) -> DbResult<String> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO transaction_revisions (
                id, transaction_id, original_items, items, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&id)
        .bind(transaction_id)
        .bind(serde_json::to_string(original_items)?)
        .bind(serde_json::to_string(items)?)
        .bind(Utc::now())
        .execute(&mut *self.conn)
        .await?;

        Ok(id)
    }

    /// Full revision history of a transaction, oldest first.
    pub async fn revisions(&mut self, transaction_id: &str) -> DbResult<Vec<Revision>> {
        let rows = sqlx::query_as::<_, RevisionRow>(
            r#"
            SELECT id, transaction_id, original_items, items, created_at
            FROM transaction_revisions
            WHERE transaction_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(transaction_id)
        .fetch_all(&mut *self.conn)
        .await?;

        rows.into_iter().map(RevisionRow::decode).collect()
    }
}
