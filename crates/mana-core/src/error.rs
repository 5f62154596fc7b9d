//! # Error Types
//!
//! Validation error types for mana-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          Error Types                                │
//! │                                                                     │
//! │  mana-core errors (this file)                                       │
//! │  └── ValidationError  - Payload shape failures                      │
//! │                                                                     │
//! │  mana-db errors (separate crate)                                    │
//! │  └── DbError          - Database operation failures                 │
//! │                                                                     │
//! │  mana-ledger errors (engine crate)                                  │
//! │  └── LedgerError      - Typed processing failures + ErrorKind       │
//! │                                                                     │
//! │  Flow: ValidationError → LedgerError → ErrorKind → HTTP status      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (field name, value)
//! 3. Errors are enum variants, never String

use thiserror::Error;

/// Payload validation errors.
///
/// These occur when a request's shape doesn't meet the per-variant
/// requirements. Deep business validation (stock sufficiency, entity
/// existence) lives in the engine, not here.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// A collection that must carry at least one element is empty.
    #[error("{field} must contain at least one item")]
    Empty { field: String },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., malformed identifier).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates a Required error for the given field.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Creates an Empty error for the given field.
    pub fn empty(field: impl Into<String>) -> Self {
        ValidationError::Empty {
            field: field.into(),
        }
    }

    /// Creates a MustBePositive error for the given field.
    pub fn must_be_positive(field: impl Into<String>) -> Self {
        ValidationError::MustBePositive {
            field: field.into(),
        }
    }
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;
