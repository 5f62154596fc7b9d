//! # Edit Flow
//!
//! Post-hoc correction of a committed transaction, as revert-then-reapply:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  1. snapshot originals            (ItemSnapshot per line)           │
//! │  2. total both snapshots          diff = new_total − original      │
//! │  3. revert originals on stock     sale +q·m   return −q·m          │
//! │  4. reapply new on stock          sale −q·m (checked)  return +q·m │
//! │  5. reconcile buyer by diff       sale +diff  return/addition −diff│
//! │  6. patch item rows               addition: qty-diff to stock too  │
//! │  7. append revision, mark edited, recompute header totals          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All inside one database transaction. The same shared total calculator
//! prices both snapshots, so editing a transaction back to its original
//! values is a no-op on every ledger.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use tracing::{debug, info};

use mana_core::totals::{header_totals, snapshot_total};
use mana_core::{ActivityEntry, ItemSnapshot, Money, TransactionKind};
use mana_db::{BuyerRepo, InventoryRepo, TransactionRepo};
use serde::{Deserialize, Serialize};

use crate::activity;
use crate::error::{LedgerError, LedgerResult};
use crate::processor::{LedgerProcessor, Receipt, StockPolicy};

/// The replacement values for a transaction's line items. Every existing
/// line must appear, keyed by its `transaction_item_id`; lines cannot be
/// added or removed after the fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionEdit {
    pub items: Vec<ItemSnapshot>,

    #[serde(default)]
    pub notes: Option<String>,
}

impl LedgerProcessor {
    /// Applies an edit to a committed transaction atomically.
    pub async fn update_transaction(
        &self,
        transaction_id: &str,
        edit: &TransactionEdit,
    ) -> LedgerResult<Receipt> {
        let mut tx = self.db().begin().await?;

        let header = TransactionRepo::new(&mut tx)
            .get(transaction_id)
            .await?
            .ok_or_else(|| LedgerError::TransactionNotFound {
                id: transaction_id.to_string(),
            })?;
        let kind = header.tx_type;

        if kind == TransactionKind::Payment {
            return Err(LedgerError::EditNotAllowed {
                reason: "payment transactions are corrected with a counter-payment".to_string(),
            });
        }

        debug!(transaction_id, kind = %kind, "Editing transaction");

        // ---- Snapshot originals and pair them with the edit ------------------
        let original_rows = TransactionRepo::new(&mut tx).items(transaction_id).await?;
        let originals: Vec<ItemSnapshot> = original_rows.iter().map(ItemSnapshot::of).collect();

        let originals_by_id: HashMap<&str, &ItemSnapshot> = originals
            .iter()
            .map(|s| (s.transaction_item_id.as_str(), s))
            .collect();

        // The submitted ids must be exactly the original key set: no unknown
        // lines, no duplicates standing in for a line that was left out.
        let mut covered = HashSet::with_capacity(edit.items.len());
        for new in &edit.items {
            if !originals_by_id.contains_key(new.transaction_item_id.as_str()) {
                return Err(LedgerError::EditNotAllowed {
                    reason: format!("unknown line item: {}", new.transaction_item_id),
                });
            }
            if !covered.insert(new.transaction_item_id.as_str()) {
                return Err(LedgerError::EditNotAllowed {
                    reason: format!("duplicate line item: {}", new.transaction_item_id),
                });
            }
        }
        if covered.len() != originals.len() {
            return Err(LedgerError::EditNotAllowed {
                reason: "edit must cover every existing line item".to_string(),
            });
        }

        // ---- Shared totals over both snapshots -------------------------------
        let original_total = snapshot_total(kind, &originals);
        let new_total = snapshot_total(kind, &edit.items);
        let total_difference = new_total - original_total;

        // ---- Revert original stock effects -----------------------------------
        for orig in &originals {
            let effective = orig.qty * orig.measurement;
            match kind {
                TransactionKind::Sale => {
                    InventoryRepo::new(&mut tx)
                        .adjust_qty(&orig.inventory_id, effective)
                        .await?;
                }
                TransactionKind::Return => {
                    InventoryRepo::new(&mut tx)
                        .adjust_qty(&orig.inventory_id, -effective)
                        .await?;
                }
                _ => {}
            }
        }

        // ---- Reapply new stock effects ---------------------------------------
        for new in &edit.items {
            let effective = new.qty * new.measurement;
            match kind {
                TransactionKind::Sale => {
                    self.reapply_sale_line(&mut tx, new, effective).await?;
                }
                TransactionKind::Return => {
                    InventoryRepo::new(&mut tx)
                        .adjust_qty(&new.inventory_id, effective)
                        .await?;
                }
                _ => {}
            }
        }

        // ---- Buyer reconciliation --------------------------------------------
        let diff = total_difference.cents();
        let mut buyer_balance = None;
        if let Some(buyer_id) = &header.buyer_id {
            let delta = match kind {
                TransactionKind::Sale => diff,
                _ => -diff,
            };
            if delta != 0 {
                buyer_balance = Some(
                    BuyerRepo::new(&mut tx).adjust_balance(buyer_id, delta).await?,
                );
            }
        }

        // ---- Patch rows -------------------------------------------------------
        for new in &edit.items {
            TransactionRepo::new(&mut tx).patch_item(new).await?;

            // Addition-type lines mirror their values onto the inventory row.
            if matches!(
                kind,
                TransactionKind::InventoryAddition | TransactionKind::Restock
            ) {
                let orig = originals_by_id[new.transaction_item_id.as_str()];
                let qty_diff = new.qty - orig.qty;
                InventoryRepo::new(&mut tx)
                    .apply_addition_edit(
                        &new.inventory_id,
                        qty_diff,
                        new.price_cents,
                        new.shipping_cents,
                        &new.unit,
                    )
                    .await?;
            }
        }

        // ---- History, totals, notes ------------------------------------------
        TransactionRepo::new(&mut tx)
            .append_revision(transaction_id, &originals, &edit.items)
            .await?;

        let totals = header_totals(kind, &edit.items);
        TransactionRepo::new(&mut tx)
            .update_totals(
                transaction_id,
                totals.price_cents,
                totals.sale_price_cents,
                totals.total_shipping_cents,
                totals.profit_cents,
            )
            .await?;

        if let Some(notes) = &edit.notes {
            TransactionRepo::new(&mut tx)
                .set_notes(transaction_id, Some(notes))
                .await?;
        }

        let transaction = TransactionRepo::new(&mut tx)
            .get_required(transaction_id)
            .await?;
        tx.commit()
            .await
            .map_err(|e| mana_db::DbError::TransactionFailed(e.to_string()))?;

        info!(
            transaction_id,
            total_difference = diff,
            "Transaction edit committed"
        );

        activity::record(
            self.db(),
            &ActivityEntry {
                user_id: transaction.user_id.clone(),
                buyer_id: transaction.buyer_id.clone(),
                transaction_id: Some(transaction.id.clone()),
                worker_id: transaction.worker_id.clone(),
                description: format!(
                    "Edited {} transaction (difference {})",
                    kind,
                    Money::from_cents(diff)
                ),
                amount_cents: diff,
                payment_method: None,
                payment_direction: None,
            },
        )
        .await;

        Ok(Receipt {
            transaction,
            buyer_balance_cents: buyer_balance,
            owner_balance_cents: None,
        })
    }

    async fn reapply_sale_line(
        &self,
        conn: &mut sqlx::SqliteConnection,
        line: &ItemSnapshot,
        effective: f64,
    ) -> LedgerResult<()> {
        match self.stock_policy() {
            StockPolicy::Strict => {
                let taken = InventoryRepo::new(&mut *conn)
                    .deduct_checked(&line.inventory_id, effective)
                    .await?;
                if taken.is_none() {
                    let inv = InventoryRepo::new(&mut *conn).get(&line.inventory_id).await?;
                    let (name, available) = inv
                        .map(|i| (i.name, i.qty))
                        .unwrap_or_else(|| (line.inventory_id.clone(), 0.0));
                    return Err(LedgerError::InsufficientInventory {
                        name,
                        available,
                        requested: effective,
                    });
                }
                Ok(())
            }
            StockPolicy::AllowNegative => {
                InventoryRepo::new(&mut *conn)
                    .adjust_qty(&line.inventory_id, -effective)
                    .await?;
                Ok(())
            }
        }
    }
}
