//! # Sample Desk
//!
//! Provisional holds of goods with a buyer, before the business decides
//! whether to keep them.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  intake     sample row (held) + sample_received transaction         │
//! │             buyer balance −= total                                  │
//! │                                                                     │
//! │  accept     held → accepted; permanent inventory row created;       │
//! │             inventory_addition transaction WITHOUT buyer (the       │
//! │             intake already moved the money)                         │
//! │                                                                     │
//! │  give_back  held → returned; sample_returned transaction            │
//! │             buyer balance += total                                  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All ledger math flows through [`LedgerProcessor`]; this module only
//! sequences the sample lifecycle around it.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use mana_core::{
    InventoryItem, InventoryRequest, LineItem, Sample, SampleMovementRequest, SampleStatus,
    TransactionRequest,
};
use mana_db::{InventoryRepo, SampleRepo};

use crate::error::LedgerResult;
use crate::processor::{LedgerProcessor, Receipt};

/// What a caller hands to `intake`.
#[derive(Debug, Clone)]
pub struct SampleIntake {
    pub user_id: String,
    pub buyer_id: String,
    pub name: String,
    pub unit: String,
    pub category: String,
    pub qty: f64,
    pub measurement: f64,
    pub price_cents: i64,
    pub shipping_cents: i64,
    pub notes: Option<String>,
}

/// Sample lifecycle front-end over the ledger engine.
pub struct SampleDesk<'a> {
    processor: &'a LedgerProcessor,
}

impl<'a> SampleDesk<'a> {
    pub fn new(processor: &'a LedgerProcessor) -> Self {
        SampleDesk { processor }
    }

    /// Records a sample hold and processes its `sample_received`
    /// transaction. Returns the stored sample and the receipt.
    pub async fn intake(&self, intake: SampleIntake) -> LedgerResult<(Sample, Receipt)> {
        let now = Utc::now();
        let sample = Sample {
            id: Uuid::new_v4().to_string(),
            user_id: intake.user_id.clone(),
            buyer_id: intake.buyer_id.clone(),
            name: intake.name,
            unit: intake.unit.clone(),
            category: intake.category,
            qty: intake.qty,
            measurement: intake.measurement,
            price_cents: intake.price_cents,
            shipping_cents: intake.shipping_cents,
            status: SampleStatus::Held,
            transaction_id: None,
            created_at: now,
            updated_at: now,
        };

        {
            let mut tx = self.processor.db().begin().await?;
            SampleRepo::new(&mut tx).insert(&sample).await?;
            tx.commit()
                .await
                .map_err(|e| mana_db::DbError::TransactionFailed(e.to_string()))?;
        }

        // Sample lines carry the sample id where inventory lines carry an
        // inventory id; sample kinds never touch stock.
        let receipt = self
            .processor
            .process(&TransactionRequest::SampleReceived(SampleMovementRequest {
                user_id: intake.user_id,
                buyer_id: intake.buyer_id,
                worker_id: None,
                items: vec![LineItem {
                    inventory_id: sample.id.clone(),
                    qty: sample.qty,
                    measurement: sample.measurement,
                    unit: intake.unit,
                    price_cents: sample.price_cents,
                    sale_price_cents: None,
                    shipping_cents: sample.shipping_cents,
                }],
                notes: intake.notes,
            }))
            .await?;

        {
            let mut tx = self.processor.db().begin().await?;
            SampleRepo::new(&mut tx)
                .link_transaction(&sample.id, &receipt.transaction.id)
                .await?;
            tx.commit()
                .await
                .map_err(|e| mana_db::DbError::TransactionFailed(e.to_string()))?;
        }

        info!(sample_id = %sample.id, "Sample taken in");
        Ok((sample, receipt))
    }

    /// Converts a held sample into permanent inventory: creates the
    /// inventory row and records an `inventory_addition` transaction with
    /// no buyer (the intake already applied the balance effect).
    pub async fn accept(&self, sample_id: &str) -> LedgerResult<(InventoryItem, Receipt)> {
        let now = Utc::now();

        let (sample, item) = {
            let mut tx = self.processor.db().begin().await?;

            let sample = SampleRepo::new(&mut tx).get_required(sample_id).await?;
            // Fails unless the row is still held.
            SampleRepo::new(&mut tx)
                .resolve(sample_id, SampleStatus::Accepted)
                .await?;

            let item = InventoryItem {
                id: Uuid::new_v4().to_string(),
                user_id: sample.user_id.clone(),
                buyer_id: Some(sample.buyer_id.clone()),
                category: sample.category.clone(),
                name: sample.name.clone(),
                unit: sample.unit.clone(),
                // Stock is kept in effective units.
                qty: sample.qty * sample.measurement,
                price_cents: sample.price_cents,
                shipping_cost_cents: sample.shipping_cents,
                product_id: None,
                reference_number: None,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            };
            InventoryRepo::new(&mut tx).insert(&item).await?;

            tx.commit()
                .await
                .map_err(|e| mana_db::DbError::TransactionFailed(e.to_string()))?;
            (sample, item)
        };

        let receipt = self
            .processor
            .process(&TransactionRequest::InventoryAddition(InventoryRequest {
                user_id: sample.user_id.clone(),
                buyer_id: None,
                worker_id: None,
                items: vec![LineItem {
                    inventory_id: item.id.clone(),
                    qty: sample.qty,
                    measurement: sample.measurement,
                    unit: sample.unit.clone(),
                    price_cents: sample.price_cents,
                    sale_price_cents: None,
                    shipping_cents: sample.shipping_cents,
                }],
                notes: Some(format!("Accepted sample {}", sample.id)),
            }))
            .await?;

        info!(sample_id = %sample.id, inventory_id = %item.id, "Sample accepted");
        Ok((item, receipt))
    }

    /// Returns a held sample to the buyer, reversing the intake's balance
    /// effect.
    pub async fn give_back(&self, sample_id: &str) -> LedgerResult<Receipt> {
        let sample = {
            let mut tx = self.processor.db().begin().await?;
            let sample = SampleRepo::new(&mut tx).get_required(sample_id).await?;
            // Guard first: a second give_back finds the row already resolved.
            SampleRepo::new(&mut tx)
                .resolve(sample_id, SampleStatus::Returned)
                .await?;
            tx.commit()
                .await
                .map_err(|e| mana_db::DbError::TransactionFailed(e.to_string()))?;
            sample
        };

        let receipt = self
            .processor
            .process(&TransactionRequest::SampleReturned(SampleMovementRequest {
                user_id: sample.user_id.clone(),
                buyer_id: sample.buyer_id.clone(),
                worker_id: None,
                items: vec![LineItem {
                    inventory_id: sample.id.clone(),
                    qty: sample.qty,
                    measurement: sample.measurement,
                    unit: sample.unit.clone(),
                    price_cents: sample.price_cents,
                    sale_price_cents: None,
                    shipping_cents: sample.shipping_cents,
                }],
                notes: None,
            }))
            .await?;

        info!(sample_id = %sample.id, "Sample given back");
        Ok(receipt)
    }
}
