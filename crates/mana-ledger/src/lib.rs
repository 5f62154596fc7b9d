//! # mana-ledger: The Transaction Ledger Engine
//!
//! The only code path allowed to mutate the three ledgers of the MANA
//! system.
//!
//! ## The Three Ledgers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                                                                     │
//! │   buyer.current_balance      what the buyer owes (+) or is owed (−) │
//! │   user cash/method balance   the business's cash position           │
//! │   inventory.qty              stock on hand                          │
//! │                                                                     │
//! │   Every transaction type moves some subset of these by SIGNED       │
//! │   INCREMENTS. Nothing ever recomputes a balance from history.       │
//! │                                                                     │
//! │   sale                 inventory −   buyer +                        │
//! │   return               inventory +   buyer −                        │
//! │   payment                            buyer ∓   owner ±              │
//! │   inventory_addition                 buyer −  (when present)        │
//! │   restock              inventory +   buyer −  (when present)        │
//! │   sample_received                    buyer −                        │
//! │   sample_returned                    buyer +                        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Entry Points
//!
//! - [`LedgerProcessor::process`] - create any transaction type
//! - [`LedgerProcessor::update_transaction`] - the revert/reapply edit flow
//! - [`SampleDesk`] - sample intake / accept / give-back lifecycle
//! - [`open_buyer_account`] - buyer onboarding with a starting balance
//!
//! Each entry point wraps its multi-entity state transition in one database
//! transaction; activity logging and low-stock notifications happen after
//! commit and are best-effort.

pub mod activity;
pub mod buyers;
pub mod edit;
pub mod error;
pub mod notify;
pub mod owner;
pub mod processor;
pub mod sample;

pub use buyers::{open_buyer_account, NewBuyer};
pub use edit::TransactionEdit;
pub use error::{ErrorKind, LedgerError, LedgerResult};
pub use notify::{LogNotifier, LowStockAlert, Notifier};
pub use owner::resolve_balance_owner;
pub use processor::{LedgerProcessor, Receipt, StockPolicy};
pub use sample::{SampleDesk, SampleIntake};
