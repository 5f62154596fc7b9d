//! # mana-db: Database Layer for the MANA Ledger
//!
//! SQLite persistence for the three mutable ledgers (buyer balance, user
//! cash/method balances, inventory quantity) and the transaction records
//! hanging off them.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       MANA Ledger Data Flow                         │
//! │                                                                     │
//! │  mana-ledger engine (process / update_transaction)                  │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  ┌─────────────────────────────────────────────────────────────┐   │
//! │  │                    mana-db (THIS CRATE)                     │   │
//! │  │                                                             │   │
//! │  │  ┌─────────────┐   ┌────────────────┐   ┌──────────────┐   │   │
//! │  │  │  Database   │   │  Repositories  │   │  Migrations  │   │   │
//! │  │  │  (pool.rs)  │   │ inventory.rs   │   │  (embedded)  │   │   │
//! │  │  │             │   │ buyer.rs       │   │              │   │   │
//! │  │  │ SqlitePool  │◄──│ user.rs        │   │ 001_init.sql │   │   │
//! │  │  │ + begin()   │   │ transaction.rs │   │              │   │   │
//! │  │  └─────────────┘   └────────────────┘   └──────────────┘   │   │
//! │  └─────────────────────────────────────────────────────────────┘   │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  SQLite database (WAL mode)                                         │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Repository Pattern
//!
//! Repositories here do NOT own the pool. Each one borrows a
//! `&mut SqliteConnection`, so the engine can open one database transaction
//! and thread it through every repository it touches:
//!
//! ```rust,ignore
//! let mut tx = db.begin().await?;
//! let buyer = BuyerRepo::new(&mut tx).get(&buyer_id).await?;
//! InventoryRepo::new(&mut tx).deduct_checked(&inv_id, 3.0).await?;
//! BuyerRepo::new(&mut tx).adjust_balance(&buyer_id, 6000).await?;
//! tx.commit().await?;
//! ```
//!
//! "Create item rows + adjust inventory + adjust buyer balance + adjust user
//! balance" is therefore atomic: it all lands, or none of it does.

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::activity::{ActivityLogRepo, ActivityRecord};
pub use repository::buyer::BuyerRepo;
pub use repository::inventory::InventoryRepo;
pub use repository::sample::SampleRepo;
pub use repository::transaction::TransactionRepo;
pub use repository::user::UserRepo;
