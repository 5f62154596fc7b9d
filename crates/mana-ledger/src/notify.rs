//! # Notification Seam
//!
//! The engine detects notification-worthy events (stock sitting below the
//! low-stock threshold after a sale or return); delivery is someone else's
//! problem.
//! [`Notifier`] is the seam: the default [`LogNotifier`] just records the
//! event through `tracing`, and a real deployment plugs in whatever
//! transport it uses.
//!
//! Notifications are best-effort by contract: they fire AFTER the ledger
//! transaction commits and can never fail it.

use tracing::warn;

/// A stock level that crossed below the low-stock threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct LowStockAlert {
    pub inventory_id: String,
    pub name: String,
    /// Quantity remaining after the mutation.
    pub qty: f64,
}

/// Outbound notification seam.
pub trait Notifier: Send + Sync {
    fn low_stock(&self, alert: &LowStockAlert);
}

/// Default notifier: logs the event and nothing else.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn low_stock(&self, alert: &LowStockAlert) {
        warn!(
            inventory_id = %alert.inventory_id,
            name = %alert.name,
            qty = alert.qty,
            "Low stock"
        );
    }
}
