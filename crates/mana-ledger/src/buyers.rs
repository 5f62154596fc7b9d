//! # Buyer Onboarding
//!
//! Account opening: the one place a buyer balance is SET rather than
//! incremented: the current balance starts equal to the starting balance,
//! and every later movement is a signed increment on top of it.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use mana_core::{ActivityEntry, Buyer, Money, ValidationError};
use mana_db::{BuyerRepo, Database};

use crate::activity;
use crate::error::LedgerResult;

/// What a caller hands to `open_buyer_account`.
#[derive(Debug, Clone)]
pub struct NewBuyer {
    pub user_id: String,
    pub admin_id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Signed: positive = the buyer already owes, negative = the business
    /// owes them.
    pub starting_balance_cents: i64,
}

/// Opens a buyer account with `current = starting` and logs the opening.
pub async fn open_buyer_account(db: &Database, new: NewBuyer) -> LedgerResult<Buyer> {
    if new.user_id.trim().is_empty() {
        return Err(ValidationError::required("user_id").into());
    }
    if new.first_name.trim().is_empty() {
        return Err(ValidationError::required("first_name").into());
    }

    let now = Utc::now();
    let buyer = Buyer {
        id: Uuid::new_v4().to_string(),
        user_id: new.user_id,
        admin_id: new.admin_id,
        first_name: new.first_name,
        last_name: new.last_name,
        email: new.email,
        phone: new.phone,
        starting_balance_cents: new.starting_balance_cents,
        current_balance_cents: new.starting_balance_cents,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };

    {
        let mut tx = db.begin().await?;
        BuyerRepo::new(&mut tx).insert(&buyer).await?;
        tx.commit()
            .await
            .map_err(|e| mana_db::DbError::TransactionFailed(e.to_string()))?;
    }

    info!(buyer_id = %buyer.id, "Buyer account opened");

    activity::record(
        db,
        &ActivityEntry {
            user_id: buyer.user_id.clone(),
            buyer_id: Some(buyer.id.clone()),
            transaction_id: None,
            worker_id: None,
            description: format!(
                "Opened account for {} (starting balance {})",
                buyer.display_name(),
                Money::from_cents(buyer.starting_balance_cents)
            ),
            amount_cents: buyer.starting_balance_cents,
            payment_method: None,
            payment_direction: None,
        },
    )
    .await;

    Ok(buyer)
}
