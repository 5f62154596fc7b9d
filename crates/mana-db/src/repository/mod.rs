//! # Repository Implementations
//!
//! One repository per aggregate:
//!
//! - [`inventory`] - stock rows and their atomic quantity increments
//! - [`buyer`] - buyer accounts and the running signed balance
//! - [`user`] - user accounts, cash and per-method balances
//! - [`transaction`] - headers, line items, payments, revision history
//! - [`activity`] - append-only audit trail
//! - [`sample`] - provisional sample holds
//!
//! ## Borrowed-Connection Pattern
//!
//! Every repository wraps a `&mut SqliteConnection` rather than owning the
//! pool. The caller decides the transaction boundary:
//!
//! ```rust,ignore
//! let mut tx = db.begin().await?;
//! InventoryRepo::new(&mut tx).adjust_qty(&id, 3.0).await?;
//! BuyerRepo::new(&mut tx).adjust_balance(&buyer, -1400).await?;
//! tx.commit().await?;   // both increments, or neither
//! ```

pub mod activity;
pub mod buyer;
pub mod inventory;
pub mod sample;
pub mod transaction;
pub mod user;
