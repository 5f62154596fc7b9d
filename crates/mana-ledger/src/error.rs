//! # Engine Error Types
//!
//! Every failure the engine can produce, as a typed enum. Each error carries
//! an [`ErrorKind`] so the HTTP boundary maps it to a status code exactly
//! once, with no substring matching on error messages anywhere.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  ErrorKind                    HTTP status                           │
//! │  ─────────                    ───────────                          │
//! │  NotFound                     404                                   │
//! │  InsufficientInventory        400                                   │
//! │  Validation                   400                                   │
//! │  Internal                     500                                   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use mana_core::ValidationError;
use mana_db::DbError;

/// Coarse error category, mapped to an HTTP status at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A referenced entity does not exist.
    NotFound,
    /// A sale (or edit reapply) asked for more stock than is available.
    InsufficientInventory,
    /// The request failed shape or business validation.
    Validation,
    /// Infrastructure failure (database, corrupt snapshot).
    Internal,
}

impl ErrorKind {
    /// The HTTP status this kind renders as.
    pub const fn http_status(&self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::InsufficientInventory | ErrorKind::Validation => 400,
            ErrorKind::Internal => 500,
        }
    }
}

/// Typed engine failures.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("User not found: {id}")]
    UserNotFound { id: String },

    #[error("Buyer not found: {id}")]
    BuyerNotFound { id: String },

    #[error("Transaction not found: {id}")]
    TransactionNotFound { id: String },

    #[error("Inventory item not found: {id}")]
    InventoryNotFound { id: String },

    #[error("Insufficient inventory for '{name}': {available} available, {requested} requested")]
    InsufficientInventory {
        name: String,
        available: f64,
        requested: f64,
    },

    #[error("Transaction cannot be edited: {reason}")]
    EditNotAllowed { reason: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl LedgerError {
    /// The coarse category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::UserNotFound { .. }
            | LedgerError::BuyerNotFound { .. }
            | LedgerError::TransactionNotFound { .. }
            | LedgerError::InventoryNotFound { .. } => ErrorKind::NotFound,

            LedgerError::InsufficientInventory { .. } => ErrorKind::InsufficientInventory,

            LedgerError::EditNotAllowed { .. } | LedgerError::Validation(_) => ErrorKind::Validation,

            // Db NotFound surfaces when a repository lookup inside a handler
            // comes up empty; everything else from the db layer is internal.
            LedgerError::Db(DbError::NotFound { .. }) => ErrorKind::NotFound,
            LedgerError::Db(_) => ErrorKind::Internal,
        }
    }

    /// Shorthand for `self.kind().http_status()`.
    pub fn http_status(&self) -> u16 {
        self.kind().http_status()
    }
}

/// Result type for engine operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
