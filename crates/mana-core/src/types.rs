//! # Ledger Entities
//!
//! Core domain types for the MANA ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        Ledger Entities                              │
//! │                                                                     │
//! │  Long-lived, shared, mutated in place by many transactions:         │
//! │  ┌───────────────┐  ┌───────────────┐  ┌───────────────┐            │
//! │  │     Buyer     │  │ InventoryItem │  │     User      │            │
//! │  │ currentBalance│  │      qty      │  │ cash_balance  │            │
//! │  └───────────────┘  └───────────────┘  └───────────────┘            │
//! │                                                                     │
//! │  Owned by a single transaction, created alongside it:               │
//! │  ┌───────────────┐  ┌─────────────────┐  ┌────────────────────┐     │
//! │  │  Transaction  │──│ TransactionItem │  │ TransactionPayment │     │
//! │  │    header     │  │   line items    │  │  payment events    │     │
//! │  └───────────────┘  └─────────────────┘  └────────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has an immutable UUID `id`; sales additionally carry a
//! human-readable `sale_reference_id` assigned exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Roles
// =============================================================================

/// Role of a user account.
///
/// Sub-users (`User` role with `created_by` set) do not hold their own cash
/// ledger; their financial side-effects land on the owning admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
    Superadmin,
}

impl Role {
    /// Whether this role owns its own cash/method balances.
    #[inline]
    pub const fn owns_balance(&self) -> bool {
        matches!(self, Role::Admin | Role::Superadmin)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::Superadmin => "superadmin",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

// =============================================================================
// Transaction Kind
// =============================================================================

/// The seven ledger-affecting transaction types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Sale,
    Return,
    Payment,
    InventoryAddition,
    Restock,
    SampleReceived,
    SampleReturned,
}

impl TransactionKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Sale => "sale",
            TransactionKind::Return => "return",
            TransactionKind::Payment => "payment",
            TransactionKind::InventoryAddition => "inventory_addition",
            TransactionKind::Restock => "restock",
            TransactionKind::SampleReceived => "sample_received",
            TransactionKind::SampleReturned => "sample_returned",
        }
    }

    /// Types whose line items price against `sale_price` rather than cost.
    #[inline]
    pub const fn uses_sale_price(&self) -> bool {
        matches!(self, TransactionKind::Sale)
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payment Direction & Method
// =============================================================================

/// Direction of a payment event, from the business's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentDirection {
    /// Money came in (buyer paying down their balance).
    Received,
    /// Money went out (business paying the buyer back).
    Given,
}

impl PaymentDirection {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentDirection::Received => "received",
            PaymentDirection::Given => "given",
        }
    }
}

impl std::fmt::Display for PaymentDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Balance method keys. Cash routes to the user's `cash_balance`; every
/// other method routes to the typed per-method balance map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum BalanceMethod {
    Cash,
    Crypto,
    Eft,
}

impl BalanceMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            BalanceMethod::Cash => "cash",
            BalanceMethod::Crypto => "crypto",
            BalanceMethod::Eft => "eft",
        }
    }
}

impl std::fmt::Display for BalanceMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// User
// =============================================================================

/// A user account (admin, superadmin, or sub-user/worker).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: String,

    /// For sub-users: the admin who owns this worker's books.
    pub created_by: Option<String>,

    pub role: Role,

    pub name: String,

    /// Cash ledger in cents. Only meaningful for balance owners.
    pub cash_balance_cents: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Returns the cash balance as Money.
    #[inline]
    pub fn cash_balance(&self) -> Money {
        Money::from_cents(self.cash_balance_cents)
    }
}

// =============================================================================
// Buyer
// =============================================================================

/// A buyer (client) with a running signed balance.
///
/// Positive `current_balance` = buyer owes the business (receivable).
/// Negative = business owes the buyer (payable/credit). Every
/// ledger-affecting transaction moves it by a signed increment; nothing ever
/// recomputes it from scratch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Buyer {
    pub id: String,
    pub user_id: String,
    pub admin_id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub starting_balance_cents: i64,
    pub current_balance_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Buyer {
    /// Returns the current balance as Money.
    #[inline]
    pub fn current_balance(&self) -> Money {
        Money::from_cents(self.current_balance_cents)
    }

    /// Display name for activity descriptions.
    pub fn display_name(&self) -> String {
        if self.last_name.is_empty() {
            self.first_name.clone()
        } else {
            format!("{} {}", self.first_name, self.last_name)
        }
    }
}

// =============================================================================
// Inventory Item
// =============================================================================

/// A product held in stock.
///
/// `qty` is the only field the ledger mutates routinely (signed increments);
/// `price`/`shipping_cost` are overwritten by restocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryItem {
    pub id: String,
    pub user_id: String,
    pub buyer_id: Option<String>,
    pub category: String,
    pub name: String,
    pub unit: String,

    /// Current stock. Fractional because effective quantities are
    /// `qty × measurement`.
    pub qty: f64,

    /// Unit cost in cents.
    pub price_cents: i64,

    /// Per-unit shipping cost in cents.
    pub shipping_cost_cents: i64,

    pub product_id: Option<String>,

    /// Sparse-unique human reference.
    pub reference_number: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl InventoryItem {
    /// Returns the unit cost as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Whether `required` effective units can be taken from stock.
    #[inline]
    pub fn has_stock(&self, required: f64) -> bool {
        self.qty >= required
    }
}

// =============================================================================
// Transaction Header
// =============================================================================

/// A transaction header. Immutable-ish: only the edit flow touches a header
/// after creation, and every edit appends to the revision history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Transaction {
    pub id: String,
    pub user_id: String,
    pub buyer_id: Option<String>,
    pub worker_id: Option<String>,

    /// Denormalized from the acting user's `created_by`: which admin's
    /// ledger owns the financial side-effects.
    pub admin_id: Option<String>,

    pub created_by_role: Role,

    #[serde(rename = "type")]
    pub tx_type: TransactionKind,

    pub payment_method: Option<BalanceMethod>,
    pub payment_direction: Option<PaymentDirection>,

    /// Cost-side total in cents.
    pub price_cents: i64,

    /// Sale-side total in cents (sales only, else 0).
    pub sale_price_cents: i64,

    pub total_shipping_cents: i64,
    pub profit_cents: i64,

    /// Human-readable sale code. Assigned exactly once for sale-type rows,
    /// never regenerated after an edit.
    pub sale_reference_id: Option<String>,

    /// Back-reference to the payment row for payment-type transactions.
    pub payment_id: Option<String>,

    pub notes: Option<String>,

    /// True once the edit flow has touched this transaction.
    pub edited: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn sale_price(&self) -> Money {
        Money::from_cents(self.sale_price_cents)
    }

    #[inline]
    pub fn profit(&self) -> Money {
        Money::from_cents(self.profit_cents)
    }
}

// =============================================================================
// Transaction Item
// =============================================================================

/// One line of a transaction, referencing an inventory row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct TransactionItem {
    pub id: String,
    pub transaction_id: String,
    pub inventory_id: String,
    pub user_id: String,
    pub buyer_id: Option<String>,

    pub qty: f64,

    /// Per-line multiplier applied to qty for ledger-affecting totals
    /// (unit conversion factor).
    pub measurement: f64,

    pub unit: String,

    /// Unit cost in cents.
    pub price_cents: i64,

    /// Unit sale price in cents (sale lines).
    pub sale_price_cents: Option<i64>,

    /// Per-unit shipping in cents.
    pub shipping_cents: i64,

    pub item_type: TransactionKind,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Transaction Payment
// =============================================================================

/// One cash/crypto/EFT payment event linked to a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct TransactionPayment {
    pub id: String,
    pub transaction_id: String,
    pub buyer_id: String,
    pub user_id: String,
    pub amount_cents: i64,
    pub payment_method: BalanceMethod,
    pub payment_direction: PaymentDirection,
    pub payment_date: DateTime<Utc>,
}

impl TransactionPayment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Revision Snapshots
// =============================================================================

/// The mutable slice of a line item captured before/after an edit.
/// Serialized as JSON into the append-only revision history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    /// The `TransactionItem` row this snapshot describes.
    pub transaction_item_id: String,
    pub inventory_id: String,
    pub qty: f64,
    pub measurement: f64,
    pub unit: String,
    pub price_cents: i64,
    pub sale_price_cents: Option<i64>,
    pub shipping_cents: i64,
}

impl ItemSnapshot {
    /// Captures the mutable fields of an existing line item.
    pub fn of(item: &TransactionItem) -> Self {
        ItemSnapshot {
            transaction_item_id: item.id.clone(),
            inventory_id: item.inventory_id.clone(),
            qty: item.qty,
            measurement: item.measurement,
            unit: item.unit.clone(),
            price_cents: item.price_cents,
            sale_price_cents: item.sale_price_cents,
            shipping_cents: item.shipping_cents,
        }
    }
}

/// One before/after pair from the edit history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Revision {
    pub id: String,
    pub transaction_id: String,
    pub original_items: Vec<ItemSnapshot>,
    pub items: Vec<ItemSnapshot>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sample
// =============================================================================

/// Lifecycle state of a provisional sample hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum SampleStatus {
    Held,
    Accepted,
    Returned,
}

/// A provisional, non-inventory hold of goods with a buyer. Converts to a
/// permanent inventory row + `inventory_addition` transaction on acceptance,
/// or reverses the buyer-balance effect on return.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sample {
    pub id: String,
    pub user_id: String,
    pub buyer_id: String,
    pub name: String,
    pub unit: String,
    pub category: String,
    pub qty: f64,
    pub measurement: f64,
    pub price_cents: i64,
    pub shipping_cents: i64,
    pub status: SampleStatus,

    /// The intake (`sample_received`) transaction.
    pub transaction_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Activity Entry
// =============================================================================

/// Contract with the Activity Logger collaborator. The engine constructs
/// these; persistence is best-effort and never fails a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub user_id: String,
    pub buyer_id: Option<String>,
    pub transaction_id: Option<String>,
    pub worker_id: Option<String>,
    pub description: String,

    /// Signed amount in cents: positive for sales/receipts, negative for
    /// returns/outflows.
    pub amount_cents: i64,

    pub payment_method: Option<BalanceMethod>,
    pub payment_direction: Option<PaymentDirection>,
}

// =============================================================================
// Unit Tests
// =============================================================================
