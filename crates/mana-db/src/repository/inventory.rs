//! # Inventory Repository
//!
//! Stock rows and their atomic quantity mutations.
//!
//! ## The Oversell Race
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  read-then-write validation:                                        │
//! │                                                                     │
//! │  Request A: read qty=5 ── validate 5≥3 ──────── write qty−3         │
//! │  Request B:      read qty=5 ── validate 5≥3 ── write qty−3          │
//! │                                                 ⇒ qty = −1  ❌      │
//! │                                                                     │
//! │  deduct_checked():                                                  │
//! │                                                                     │
//! │  UPDATE … SET qty = qty − ?1 WHERE id = ?2 AND qty ≥ ?1             │
//! │  Zero rows affected ⇒ insufficient. The check and the decrement     │
//! │  are ONE statement; concurrent sales cannot both pass.              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use mana_core::InventoryItem;

/// Repository for inventory rows. Borrows the caller's connection.
pub struct InventoryRepo<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> InventoryRepo<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        InventoryRepo { conn }
    }

    /// Inserts an inventory row. Generates the id when the caller left it
    /// empty and returns the stored row id.
    pub async fn insert(&mut self, item: &InventoryItem) -> DbResult<String> {
        let id = if item.id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            item.id.clone()
        };

        debug!(id = %id, name = %item.name, qty = item.qty, "Inserting inventory item");

        sqlx::query(
            r#"
            INSERT INTO inventory_items (
                id, user_id, buyer_id, category, name, unit,
                qty, price_cents, shipping_cost_cents,
                product_id, reference_number,
                created_at, updated_at, deleted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&id)
        .bind(&item.user_id)
        .bind(&item.buyer_id)
        .bind(&item.category)
        .bind(&item.name)
        .bind(&item.unit)
        .bind(item.qty)
        .bind(item.price_cents)
        .bind(item.shipping_cost_cents)
        .bind(&item.product_id)
        .bind(&item.reference_number)
        .bind(item.created_at)
        .bind(item.updated_at)
        .bind(item.deleted_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(id)
    }

    /// Gets a live (not soft-deleted) inventory row by id.
    pub async fn get(&mut self, id: &str) -> DbResult<Option<InventoryItem>> {
        let item = sqlx::query_as::<_, InventoryItem>(
            r#"
            SELECT id, user_id, buyer_id, category, name, unit,
                   qty, price_cents, shipping_cost_cents,
                   product_id, reference_number,
                   created_at, updated_at, deleted_at
            FROM inventory_items
            WHERE id = ?1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(item)
    }

    /// Gets a live inventory row, failing with NotFound when missing.
    pub async fn get_required(&mut self, id: &str) -> DbResult<InventoryItem> {
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Inventory item", id))
    }

    /// Applies a signed quantity increment and returns the resulting qty.
    ///
    /// Unconditional: used by returns (adding stock back), restocks, and the
    /// AllowNegative stock policy.
    pub async fn adjust_qty(&mut self, id: &str, delta: f64) -> DbResult<f64> {
        let qty: Option<f64> = sqlx::query_scalar(
            r#"
            UPDATE inventory_items
            SET qty = qty + ?1, updated_at = ?2
            WHERE id = ?3 AND deleted_at IS NULL
            RETURNING qty
            "#,
        )
        .bind(delta)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        qty.ok_or_else(|| DbError::not_found("Inventory item", id))
    }

    /// Conditional atomic decrement: takes `required` effective units only
    /// if stock suffices.
    ///
    /// Returns `Ok(Some(new_qty))` on success, `Ok(None)` when the row
    /// exists but stock is short, `Err(NotFound)` when the row is missing.
    pub async fn deduct_checked(&mut self, id: &str, required: f64) -> DbResult<Option<f64>> {
        let qty: Option<f64> = sqlx::query_scalar(
            r#"
            UPDATE inventory_items
            SET qty = qty - ?1, updated_at = ?2
            WHERE id = ?3 AND deleted_at IS NULL AND qty >= ?1
            RETURNING qty
            "#,
        )
        .bind(required)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        match qty {
            Some(q) => Ok(Some(q)),
            None => {
                // Zero rows: missing row or insufficient stock. Distinguish.
                if self.get(id).await?.is_some() {
                    Ok(None)
                } else {
                    Err(DbError::not_found("Inventory item", id))
                }
            }
        }
    }

    /// Restock: bump qty by the item's quantity and overwrite unit cost and
    /// per-unit shipping with the incoming values. Returns the new qty.
    pub async fn restock(
        &mut self,
        id: &str,
        qty_delta: f64,
        price_cents: i64,
        shipping_cost_cents: i64,
    ) -> DbResult<f64> {
        debug!(id = %id, qty_delta, "Restocking inventory item");

        let qty: Option<f64> = sqlx::query_scalar(
            r#"
            UPDATE inventory_items
            SET qty = qty + ?1,
                price_cents = ?2,
                shipping_cost_cents = ?3,
                updated_at = ?4
            WHERE id = ?5 AND deleted_at IS NULL
            RETURNING qty
            "#,
        )
        .bind(qty_delta)
        .bind(price_cents)
        .bind(shipping_cost_cents)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        qty.ok_or_else(|| DbError::not_found("Inventory item", id))
    }

    /// Edit-flow patch for addition-type lines: apply a quantity DIFFERENCE
    /// (not an absolute) and overwrite cost/shipping/unit.
    pub async fn apply_addition_edit(
        &mut self,
        id: &str,
        qty_diff: f64,
        price_cents: i64,
        shipping_cost_cents: i64,
        unit: &str,
    ) -> DbResult<f64> {
        let qty: Option<f64> = sqlx::query_scalar(
            r#"
            UPDATE inventory_items
            SET qty = qty + ?1,
                price_cents = ?2,
                shipping_cost_cents = ?3,
                unit = ?4,
                updated_at = ?5
            WHERE id = ?6 AND deleted_at IS NULL
            RETURNING qty
            "#,
        )
        .bind(qty_diff)
        .bind(price_cents)
        .bind(shipping_cost_cents)
        .bind(unit)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        qty.ok_or_else(|| DbError::not_found("Inventory item", id))
    }

    /// Soft-deletes an inventory row.
    pub async fn soft_delete(&mut self, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE inventory_items
            SET deleted_at = ?1, updated_at = ?1
            WHERE id = ?2 AND deleted_at IS NULL
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Inventory item", id));
        }

        Ok(())
    }
}
