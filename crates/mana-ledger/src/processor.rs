//! # Transaction Processor
//!
//! The single entry point through which every transaction type mutates the
//! three ledgers.
//!
//! ## One Transaction, Three Ledgers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  process(request)                                                   │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  ┌── BEGIN ────────────────────────────────────────────────────┐   │
//! │  │  validate · load user/buyer · resolve balance owner         │   │
//! │  │  insert header (+ sale reference, rejection-sampled)        │   │
//! │  │  dispatch per kind:                                         │   │
//! │  │    inventory qty   ─ signed increments (checked for sales)  │   │
//! │  │    buyer balance   ─ one signed increment                   │   │
//! │  │    owner cash/method balance ─ one signed increment         │   │
//! │  └── COMMIT ──────────────────────────────────────────────────┘   │
//! │       │                                                             │
//! │       ▼  (after commit, best-effort)                                │
//! │  activity log entry · low-stock notifications                       │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any error before commit rolls the whole state transition back: there is
//! no path where the buyer balance moved but the stock did not.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::{debug, info};
use uuid::Uuid;

use mana_core::reference::generate_sale_reference;
use mana_core::totals::{
    header_totals, line_total, return_buyer_credit, sale_buyer_charge, snapshot_total,
    HeaderTotals,
};
use mana_core::{
    ActivityEntry, BalanceMethod, InventoryItem, LineItem, Money, PaymentDirection, Transaction,
    TransactionItem, TransactionKind, TransactionPayment, TransactionRequest, User,
    LOW_STOCK_THRESHOLD,
};
use mana_db::{BuyerRepo, Database, InventoryRepo, TransactionRepo, UserRepo};

use crate::activity::{self, describe_payment, describe_transaction, DescribedLine};
use crate::error::{LedgerError, LedgerResult};
use crate::notify::{LogNotifier, LowStockAlert, Notifier};
use crate::owner::resolve_balance_owner;

/// Attempts before giving up on a unique sale reference. With a 32^8 code
/// space, hitting this means the index is broken, not unlucky.
const MAX_REFERENCE_ATTEMPTS: u32 = 8;

// =============================================================================
// Policy & Receipt
// =============================================================================

/// What happens when a sale asks for more stock than is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StockPolicy {
    /// Refuse the sale. The decrement is conditional in SQL, so two
    /// concurrent sales cannot both pass the check.
    #[default]
    Strict,
    /// Let the quantity go negative (back-order style bookkeeping).
    AllowNegative,
}

/// What a successful `process` call hands back.
#[derive(Debug, Clone)]
pub struct Receipt {
    /// The persisted header, including any assigned sale reference.
    pub transaction: Transaction,

    /// Buyer balance after the transaction, when a buyer was involved.
    pub buyer_balance_cents: Option<i64>,

    /// Balance-owner cash/method balance after the transaction, when it
    /// moved.
    pub owner_balance_cents: Option<i64>,
}

// =============================================================================
// Processor
// =============================================================================

/// The transaction ledger engine.
pub struct LedgerProcessor {
    db: Database,
    stock_policy: StockPolicy,
    notifier: Arc<dyn Notifier>,
}

impl LedgerProcessor {
    pub fn new(db: Database) -> Self {
        LedgerProcessor {
            db,
            stock_policy: StockPolicy::default(),
            notifier: Arc::new(LogNotifier),
        }
    }

    pub fn with_stock_policy(mut self, policy: StockPolicy) -> Self {
        self.stock_policy = policy;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// The database handle this engine runs against.
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// The configured oversell policy.
    pub fn stock_policy(&self) -> StockPolicy {
        self.stock_policy
    }

    /// Processes one transaction request atomically.
    pub async fn process(&self, request: &TransactionRequest) -> LedgerResult<Receipt> {
        request.validate()?;

        let kind = request.kind();
        debug!(kind = %kind, user_id = %request.user_id(), "Processing transaction");

        let mut tx = self.db.begin().await?;

        // ---- Load the cast ---------------------------------------------------
        let user = UserRepo::new(&mut tx)
            .get(request.user_id())
            .await?
            .ok_or_else(|| LedgerError::UserNotFound {
                id: request.user_id().to_string(),
            })?;

        let buyer = match request.buyer_id() {
            Some(id) => Some(BuyerRepo::new(&mut tx).get(id).await?.ok_or_else(|| {
                LedgerError::BuyerNotFound { id: id.to_string() }
            })?),
            None => None,
        };

        let owner_id = resolve_balance_owner(&mut tx, &user).await?;

        // Sample lines don't reference inventory; everything else does.
        let inventory = if kind_touches_inventory(kind) {
            self.resolve_inventory(&mut tx, kind, request.items()).await?
        } else {
            HashMap::new()
        };

        // ---- Header ----------------------------------------------------------
        let now = Utc::now();
        let totals = match request {
            TransactionRequest::Payment(r) => HeaderTotals {
                price_cents: r.payment.amount_cents,
                ..HeaderTotals::default()
            },
            _ => header_totals(kind, request.items()),
        };

        let header = Transaction {
            id: Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            buyer_id: request.buyer_id().map(str::to_string),
            worker_id: request.worker_id().map(str::to_string),
            admin_id: user.created_by.clone(),
            created_by_role: user.role,
            tx_type: kind,
            payment_method: payment_method_of(request),
            payment_direction: payment_direction_of(request),
            price_cents: totals.price_cents,
            sale_price_cents: totals.sale_price_cents,
            total_shipping_cents: totals.total_shipping_cents,
            profit_cents: totals.profit_cents,
            sale_reference_id: None,
            payment_id: None,
            notes: request.notes().map(str::to_string),
            edited: false,
            created_at: now,
            updated_at: now,
        };

        let tx_id = TransactionRepo::new(&mut tx).insert_header(&header).await?;

        if kind == TransactionKind::Sale {
            self.assign_reference(&mut tx, &tx_id).await?;
        }

        // ---- Dispatch --------------------------------------------------------
        let outcome = match request {
            TransactionRequest::Payment(r) => {
                self.apply_payment(&mut tx, &tx_id, &user, &owner_id, r).await?
            }
            TransactionRequest::Sale(r) | TransactionRequest::Return(r) => {
                self.apply_trade(&mut tx, &tx_id, kind, &user, r.buyer_id.as_str(), &r.items, &inventory)
                    .await?
            }
            TransactionRequest::InventoryAddition(r) | TransactionRequest::Restock(r) => {
                self.apply_inventory(
                    &mut tx,
                    &tx_id,
                    kind,
                    &user,
                    r.buyer_id.as_deref(),
                    &r.items,
                    &inventory,
                )
                .await?
            }
            TransactionRequest::SampleReceived(r) | TransactionRequest::SampleReturned(r) => {
                self.apply_sample_movement(&mut tx, kind, &r.buyer_id, &r.items)
                    .await?
            }
        };

        let transaction = TransactionRepo::new(&mut tx).get_required(&tx_id).await?;
        tx.commit()
            .await
            .map_err(|e| mana_db::DbError::TransactionFailed(e.to_string()))?;

        info!(
            transaction_id = %transaction.id,
            kind = %kind,
            "Transaction committed"
        );

        // ---- Post-commit, best-effort ---------------------------------------
        let buyer_name = buyer.as_ref().map(|b| b.display_name());
        let description = match request {
            TransactionRequest::Payment(r) => describe_payment(
                buyer_name.as_deref().unwrap_or("buyer"),
                r.payment.direction,
                Money::from_cents(r.payment.amount_cents),
            ),
            _ => describe_transaction(
                kind,
                buyer_name.as_deref(),
                &outcome.described,
                Money::from_cents(outcome.activity_amount_cents),
            ),
        };

        activity::record(
            &self.db,
            &ActivityEntry {
                user_id: user.id.clone(),
                buyer_id: transaction.buyer_id.clone(),
                transaction_id: Some(transaction.id.clone()),
                worker_id: transaction.worker_id.clone(),
                description,
                amount_cents: outcome.activity_amount_cents,
                payment_method: transaction.payment_method,
                payment_direction: transaction.payment_direction,
            },
        )
        .await;

        for alert in &outcome.alerts {
            self.notifier.low_stock(alert);
        }

        Ok(Receipt {
            transaction,
            buyer_balance_cents: outcome.buyer_balance_cents,
            owner_balance_cents: outcome.owner_balance_cents,
        })
    }

    // =========================================================================
    // Handlers
    // =========================================================================

    /// Loads and (for strict sales) stock-checks every referenced inventory
    /// row before anything is written.
    async fn resolve_inventory(
        &self,
        conn: &mut SqliteConnection,
        kind: TransactionKind,
        items: &[LineItem],
    ) -> LedgerResult<HashMap<String, InventoryItem>> {
        let mut map = HashMap::new();

        for line in items {
            let inv = InventoryRepo::new(&mut *conn)
                .get(&line.inventory_id)
                .await?
                .ok_or_else(|| LedgerError::InventoryNotFound {
                    id: line.inventory_id.clone(),
                })?;

            if kind == TransactionKind::Sale && self.stock_policy == StockPolicy::Strict {
                let required = line.effective_qty();
                if !inv.has_stock(required) {
                    return Err(LedgerError::InsufficientInventory {
                        name: inv.name,
                        available: inv.qty,
                        requested: required,
                    });
                }
            }

            map.insert(inv.id.clone(), inv);
        }

        Ok(map)
    }

    /// Rejection-samples a sale reference against the unique index.
    async fn assign_reference(
        &self,
        conn: &mut SqliteConnection,
        tx_id: &str,
    ) -> LedgerResult<()> {
        for _ in 0..MAX_REFERENCE_ATTEMPTS {
            let candidate = generate_sale_reference();
            match TransactionRepo::new(&mut *conn)
                .assign_sale_reference(tx_id, &candidate)
                .await
            {
                Ok(()) => return Ok(()),
                Err(e) if e.is_unique_violation() => {
                    debug!(candidate = %candidate, "Sale reference collision, resampling");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(LedgerError::Db(mana_db::DbError::Internal(
            "sale reference space exhausted".to_string(),
        )))
    }

    async fn apply_payment(
        &self,
        conn: &mut SqliteConnection,
        tx_id: &str,
        user: &User,
        owner_id: &str,
        request: &mana_core::PaymentRequest,
    ) -> LedgerResult<DispatchOutcome> {
        let details = &request.payment;
        let amount = details.amount_cents;

        let payment = TransactionPayment {
            id: Uuid::new_v4().to_string(),
            transaction_id: tx_id.to_string(),
            buyer_id: request.buyer_id.clone(),
            user_id: user.id.clone(),
            amount_cents: amount,
            payment_method: details.method,
            payment_direction: details.direction,
            payment_date: details.date.unwrap_or_else(Utc::now),
        };
        let payment_id = TransactionRepo::new(&mut *conn).insert_payment(&payment).await?;
        TransactionRepo::new(&mut *conn)
            .link_payment(tx_id, &payment_id)
            .await?;

        // Buyer: received pays the balance down, given raises it.
        let buyer_delta = match details.direction {
            PaymentDirection::Received => -amount,
            PaymentDirection::Given => amount,
        };
        let buyer_balance = BuyerRepo::new(&mut *conn)
            .adjust_balance(&request.buyer_id, buyer_delta)
            .await?;

        // Owner: the opposite direction, into cash or the method map.
        let owner_balance = if details.skip_cash_user_balance {
            None
        } else {
            let owner_delta = -buyer_delta;
            let balance = match details.method {
                BalanceMethod::Cash => {
                    UserRepo::new(&mut *conn).adjust_cash(owner_id, owner_delta).await?
                }
                method => {
                    UserRepo::new(&mut *conn)
                        .upsert_method_balance(owner_id, method, owner_delta)
                        .await?
                }
            };
            Some(balance)
        };

        // Money in is positive in the activity log.
        let activity_amount = match details.direction {
            PaymentDirection::Received => amount,
            PaymentDirection::Given => -amount,
        };

        Ok(DispatchOutcome {
            buyer_balance_cents: Some(buyer_balance),
            owner_balance_cents: owner_balance,
            activity_amount_cents: activity_amount,
            described: Vec::new(),
            alerts: Vec::new(),
        })
    }

    async fn apply_trade(
        &self,
        conn: &mut SqliteConnection,
        tx_id: &str,
        kind: TransactionKind,
        user: &User,
        buyer_id: &str,
        items: &[LineItem],
        inventory: &HashMap<String, InventoryItem>,
    ) -> LedgerResult<DispatchOutcome> {
        let now = Utc::now();
        let mut alerts = Vec::new();
        let mut described = Vec::new();

        for line in items {
            let inv = &inventory[&line.inventory_id];

            TransactionRepo::new(&mut *conn)
                .insert_item(&TransactionItem {
                    id: Uuid::new_v4().to_string(),
                    transaction_id: tx_id.to_string(),
                    inventory_id: line.inventory_id.clone(),
                    user_id: user.id.clone(),
                    buyer_id: Some(buyer_id.to_string()),
                    qty: line.qty,
                    measurement: line.measurement,
                    unit: line.unit.clone(),
                    price_cents: line.price_cents,
                    sale_price_cents: line.sale_price_cents,
                    shipping_cents: line.shipping_cents,
                    item_type: kind,
                    created_at: now,
                    updated_at: now,
                })
                .await?;

            let effective = line.effective_qty();
            let new_qty = match kind {
                TransactionKind::Sale => {
                    self.deduct(conn, &inv.id, &inv.name, effective).await?
                }
                TransactionKind::Return => {
                    InventoryRepo::new(&mut *conn).adjust_qty(&inv.id, effective).await?
                }
                _ => unreachable!("apply_trade only handles sale and return"),
            };
            if new_qty < LOW_STOCK_THRESHOLD {
                alerts.push(LowStockAlert {
                    inventory_id: inv.id.clone(),
                    name: inv.name.clone(),
                    qty: new_qty,
                });
            }

            described.push(DescribedLine {
                name: inv.name.clone(),
                qty: line.qty,
                unit: line.unit.clone(),
                amount: line_total(kind, line),
            });
        }

        // One buyer increment for the whole snapshot.
        let buyer_delta = match kind {
            TransactionKind::Sale => {
                items.iter().map(sale_buyer_charge).sum::<Money>().cents()
            }
            TransactionKind::Return => {
                -items.iter().map(return_buyer_credit).sum::<Money>().cents()
            }
            _ => unreachable!("apply_trade only handles sale and return"),
        };
        let buyer_balance = BuyerRepo::new(&mut *conn)
            .adjust_balance(buyer_id, buyer_delta)
            .await?;

        Ok(DispatchOutcome {
            buyer_balance_cents: Some(buyer_balance),
            owner_balance_cents: None,
            activity_amount_cents: buyer_delta,
            described,
            alerts,
        })
    }

    async fn apply_inventory(
        &self,
        conn: &mut SqliteConnection,
        tx_id: &str,
        kind: TransactionKind,
        user: &User,
        buyer_id: Option<&str>,
        items: &[LineItem],
        inventory: &HashMap<String, InventoryItem>,
    ) -> LedgerResult<DispatchOutcome> {
        let now = Utc::now();
        let mut described = Vec::new();

        for line in items {
            let inv = &inventory[&line.inventory_id];

            TransactionRepo::new(&mut *conn)
                .insert_item(&TransactionItem {
                    id: Uuid::new_v4().to_string(),
                    transaction_id: tx_id.to_string(),
                    inventory_id: line.inventory_id.clone(),
                    user_id: user.id.clone(),
                    buyer_id: buyer_id.map(str::to_string),
                    qty: line.qty,
                    measurement: line.measurement,
                    unit: line.unit.clone(),
                    price_cents: line.price_cents,
                    sale_price_cents: line.sale_price_cents,
                    shipping_cents: line.shipping_cents,
                    item_type: kind,
                    created_at: now,
                    updated_at: now,
                })
                .await?;

            if kind == TransactionKind::Restock {
                InventoryRepo::new(&mut *conn)
                    .restock(&inv.id, line.qty, line.price_cents, line.shipping_cents)
                    .await?;
            }

            described.push(DescribedLine {
                name: inv.name.clone(),
                qty: line.qty,
                unit: line.unit.clone(),
                amount: line_total(kind, line),
            });
        }

        // round_balance = cost total + shipping total
        let round_balance = snapshot_total(kind, items).cents();

        let (buyer_balance, activity_amount) = match buyer_id {
            Some(buyer_id) => {
                let balance = BuyerRepo::new(&mut *conn)
                    .adjust_balance(buyer_id, -round_balance)
                    .await?;
                (Some(balance), -round_balance)
            }
            // No buyer: pure stock bookkeeping, no money moved.
            None => (None, round_balance),
        };

        Ok(DispatchOutcome {
            buyer_balance_cents: buyer_balance,
            owner_balance_cents: None,
            activity_amount_cents: activity_amount,
            described,
            alerts: Vec::new(),
        })
    }

    /// Sample intake/give-back: the inventory-addition buyer math without
    /// any stock mutation. The goods live in the samples table, not
    /// inventory.
    async fn apply_sample_movement(
        &self,
        conn: &mut SqliteConnection,
        kind: TransactionKind,
        buyer_id: &str,
        items: &[LineItem],
    ) -> LedgerResult<DispatchOutcome> {
        let total = snapshot_total(kind, items).cents();
        let buyer_delta = match kind {
            TransactionKind::SampleReceived => -total,
            TransactionKind::SampleReturned => total,
            _ => unreachable!("apply_sample_movement only handles sample kinds"),
        };

        let buyer_balance = BuyerRepo::new(&mut *conn)
            .adjust_balance(buyer_id, buyer_delta)
            .await?;

        Ok(DispatchOutcome {
            buyer_balance_cents: Some(buyer_balance),
            owner_balance_cents: None,
            activity_amount_cents: buyer_delta,
            described: Vec::new(),
            alerts: Vec::new(),
        })
    }

    /// Takes effective units from stock under the configured policy.
    async fn deduct(
        &self,
        conn: &mut SqliteConnection,
        inventory_id: &str,
        name: &str,
        required: f64,
    ) -> LedgerResult<f64> {
        match self.stock_policy {
            StockPolicy::Strict => {
                match InventoryRepo::new(&mut *conn)
                    .deduct_checked(inventory_id, required)
                    .await?
                {
                    Some(new_qty) => Ok(new_qty),
                    None => {
                        let available = InventoryRepo::new(&mut *conn)
                            .get(inventory_id)
                            .await?
                            .map(|i| i.qty)
                            .unwrap_or(0.0);
                        Err(LedgerError::InsufficientInventory {
                            name: name.to_string(),
                            available,
                            requested: required,
                        })
                    }
                }
            }
            StockPolicy::AllowNegative => Ok(InventoryRepo::new(&mut *conn)
                .adjust_qty(inventory_id, -required)
                .await?),
        }
    }
}

// =============================================================================
// Internals
// =============================================================================

/// What a dispatch handler reports back to `process`.
struct DispatchOutcome {
    buyer_balance_cents: Option<i64>,
    owner_balance_cents: Option<i64>,
    activity_amount_cents: i64,
    described: Vec<DescribedLine>,
    alerts: Vec<LowStockAlert>,
}

const fn kind_touches_inventory(kind: TransactionKind) -> bool {
    !matches!(
        kind,
        TransactionKind::Payment
            | TransactionKind::SampleReceived
            | TransactionKind::SampleReturned
    )
}

fn payment_method_of(request: &TransactionRequest) -> Option<BalanceMethod> {
    match request {
        TransactionRequest::Payment(r) => Some(r.payment.method),
        _ => None,
    }
}

fn payment_direction_of(request: &TransactionRequest) -> Option<PaymentDirection> {
    match request {
        TransactionRequest::Payment(r) => Some(r.payment.direction),
        _ => None,
    }
}
