//! # Activity Logging
//!
//! Human-readable audit entries written AFTER the ledger transaction
//! commits. Best-effort by contract: a failed log write is warned and
//! swallowed; the committed money movement stands either way.

use tracing::{debug, warn};

use mana_core::{ActivityEntry, Money, PaymentDirection, TransactionKind};
use mana_db::{ActivityLogRepo, Database};

/// One priced line, pre-resolved to its inventory name, for description
/// building.
#[derive(Debug, Clone)]
pub struct DescribedLine {
    pub name: String,
    pub qty: f64,
    pub unit: String,
    pub amount: Money,
}

/// Renders the per-item description block:
/// `"3 gram of Blue Dream (@ $60.00)"`, one line per item.
pub fn describe_lines(lines: &[DescribedLine]) -> String {
    lines
        .iter()
        .map(|l| format!("{} {} of {} (@ {})", l.qty, l.unit, l.name, l.amount))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders the headline for a transaction's activity entry.
pub fn describe_transaction(
    kind: TransactionKind,
    buyer_name: Option<&str>,
    lines: &[DescribedLine],
    amount: Money,
) -> String {
    let subject = buyer_name.unwrap_or("inventory");
    let headline = match kind {
        TransactionKind::Sale => format!("Sale to {}", subject),
        TransactionKind::Return => format!("Return from {}", subject),
        TransactionKind::Payment => format!("Payment with {}", subject),
        TransactionKind::InventoryAddition => format!("Inventory addition from {}", subject),
        TransactionKind::Restock => format!("Restock from {}", subject),
        TransactionKind::SampleReceived => format!("Sample received from {}", subject),
        TransactionKind::SampleReturned => format!("Sample returned to {}", subject),
    };

    if lines.is_empty() {
        format!("{} ({})", headline, amount)
    } else {
        format!("{} ({})\n{}", headline, amount, describe_lines(lines))
    }
}

/// Renders the headline for a payment entry.
pub fn describe_payment(buyer_name: &str, direction: PaymentDirection, amount: Money) -> String {
    match direction {
        PaymentDirection::Received => format!("Payment received from {} ({})", buyer_name, amount),
        PaymentDirection::Given => format!("Payment given to {} ({})", buyer_name, amount),
    }
}

/// Writes one activity entry on a fresh pool connection. Never fails the
/// caller.
pub async fn record(db: &Database, entry: &ActivityEntry) {
    let mut conn = match db.pool().acquire().await {
        Ok(conn) => conn,
        Err(e) => {
            warn!(error = %e, "Activity log skipped: no connection");
            return;
        }
    };

    match ActivityLogRepo::new(&mut conn).insert(entry).await {
        Ok(id) => debug!(activity_id = %id, "Activity logged"),
        Err(e) => warn!(error = %e, "Activity log write failed"),
    }
}
