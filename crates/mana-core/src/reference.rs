//! # Sale Reference Codes
//!
//! Human-readable codes for sale-type transactions.
//!
//! ## Format
//! 8 characters from a 32-character alphabet that excludes the lookalikes
//! `0/O`, `I/1`: the codes get read over the phone and written on invoices.
//!
//! ## Example
//! `7KFQ2MWX`
//!
//! Candidate generation is pure (this module); the engine rejection-samples
//! against the database's unique index until a collision-free value lands.
//! A code is assigned exactly once per sale and never regenerated, even
//! through edits.

use uuid::Uuid;

/// Code alphabet: A-Z and 2-9 minus 0/O/I/1. 32 symbols, so one random byte
/// maps to one symbol without modulo bias.
pub const SALE_REFERENCE_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Length of a sale reference code.
pub const SALE_REFERENCE_LEN: usize = 8;

/// Generates one candidate sale reference code.
///
/// Entropy comes from a v4 UUID (122 random bits); the first 8 bytes each
/// select one alphabet symbol. 32^8 ≈ 1.1 × 10^12 codes, so collisions are
/// rare and the engine's retry loop almost never spins.
pub fn generate_sale_reference() -> String {
    let bytes = *Uuid::new_v4().as_bytes();
    bytes
        .iter()
        .take(SALE_REFERENCE_LEN)
        .map(|b| SALE_REFERENCE_ALPHABET[(b % 32) as usize] as char)
        .collect()
}

/// Whether a string is a well-formed sale reference code.
pub fn is_valid_sale_reference(code: &str) -> bool {
    code.len() == SALE_REFERENCE_LEN
        && code
            .bytes()
            .all(|b| SALE_REFERENCE_ALPHABET.contains(&b))
}
