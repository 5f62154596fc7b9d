//! # Balance-Owner Resolution
//!
//! Which user's cash/method ledger absorbs a transaction's financial
//! side-effects.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  admin / superadmin           ⇒ self                                │
//! │  sub-user with created_by     ⇒ that parent (ONE hop, not chained)  │
//! │  created_by points nowhere    ⇒ self                                │
//! │  no created_by                ⇒ self                                │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The one-hop rule is deliberate: a worker created by a worker still lands
//! on its direct parent, never on a grandparent.

use sqlx::SqliteConnection;

use mana_core::User;
use mana_db::{DbResult, UserRepo};

/// Resolves the user whose balances a transaction's cash movement lands on.
/// Returns the owner's user id.
pub async fn resolve_balance_owner(conn: &mut SqliteConnection, user: &User) -> DbResult<String> {
    if user.role.owns_balance() {
        return Ok(user.id.clone());
    }

    match &user.created_by {
        Some(parent_id) => {
            let parent = UserRepo::new(conn).get(parent_id).await?;
            match parent {
                Some(p) => Ok(p.id),
                // Dangling created_by: fall back to the acting user.
                None => Ok(user.id.clone()),
            }
        }
        None => Ok(user.id.clone()),
    }
}
