//! # mana-core: Pure Business Logic for the MANA Ledger
//!
//! This crate is the **heart** of the MANA ledger. It contains all business
//! logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       MANA Ledger Architecture                      │
//! │                                                                     │
//! │  ┌─────────────────────────────────────────────────────────────┐   │
//! │  │              External callers (routes, AI tools)            │   │
//! │  │        POST /transaction ──► PUT /transaction/:id           │   │
//! │  └────────────────────────────┬────────────────────────────────┘   │
//! │                               │ TransactionRequest                  │
//! │  ┌────────────────────────────▼────────────────────────────────┐   │
//! │  │                 mana-ledger (engine crate)                  │   │
//! │  │     process, update_transaction, sample desk, buyers       │   │
//! │  └────────────────────────────┬────────────────────────────────┘   │
//! │                               │                                     │
//! │  ┌────────────────────────────▼────────────────────────────────┐   │
//! │  │               ★ mana-core (THIS CRATE) ★                    │   │
//! │  │                                                             │   │
//! │  │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌────────┐ ┌───────┐  │   │
//! │  │  │  types  │ │  money  │ │ payload │ │ totals │ │ refer │  │   │
//! │  │  │ Buyer   │ │  Money  │ │ Request │ │ profit │ │ ence  │  │   │
//! │  │  │ TxItem  │ │  cents  │ │  union  │ │  math  │ │ codes │  │   │
//! │  │  └─────────┘ └─────────┘ └─────────┘ └────────┘ └───────┘  │   │
//! │  │                                                             │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS        │   │
//! │  └────────────────────────────┬────────────────────────────────┘   │
//! │                               │                                     │
//! │  ┌────────────────────────────▼────────────────────────────────┐   │
//! │  │                  mana-db (Database Layer)                   │   │
//! │  │          SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Ledger entities (Buyer, InventoryItem, Transaction, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`payload`] - The tagged transaction-request union and its validation
//! - [`totals`] - Shared total/profit calculators used by every handler
//! - [`reference`] - Sale reference-code generation
//! - [`error`] - Validation error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: deterministic - same input = same output
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: all monetary values are in cents (i64)
//! 4. **Explicit Errors**: all errors are typed, never strings or panics
//! 5. **Unrepresentable invalid states**: one request variant per transaction
//!    type, each with its own required-field set

pub mod error;
pub mod money;
pub mod payload;
pub mod reference;
pub mod totals;
pub mod types;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{ValidationError, ValidationResult};
pub use money::Money;
pub use payload::{
    InventoryRequest, LineItem, PaymentDetails, PaymentRequest, SampleMovementRequest,
    TradeRequest, TransactionRequest,
};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Inventory level at which a low-stock notification fires after a sale
/// mutates a row. Below this (strictly less than), the engine emits a
/// best-effort alert.
pub const LOW_STOCK_THRESHOLD: f64 = 4.0;

/// Default measurement multiplier when a line item does not specify one.
pub const DEFAULT_MEASUREMENT: f64 = 1.0;
