//! # Shared Total Calculators
//!
//! One set of total/profit math used by every code path that prices line
//! items: transaction creation, the edit flow's before/after reconciliation,
//! and the sample desk. The original system inlined copies of this math at
//! several call sites; here it lives in exactly one place.
//!
//! ## The Shared Formula
//! ```text
//! total = Σ round(qty × measurement × unit_price) + Σ round(qty × shipping)
//!
//! where unit_price = sale_price  for sale-type snapshots
//!                  = price       for everything else
//! ```
//!
//! Rounding happens per line (half away from zero, to cents), so the amount
//! a line contributes to a total is always identical to the amount it
//! contributes to a ledger.

use crate::money::Money;
use crate::payload::LineItem;
use crate::types::{ItemSnapshot, TransactionItem, TransactionKind};

// =============================================================================
// The Line Seam
// =============================================================================

/// Anything that can be priced as a ledger line. Implemented for request
/// lines, persisted line items, and revision snapshots so the same math
/// serves creation and edit.
pub trait LedgerLine {
    fn qty(&self) -> f64;
    fn measurement(&self) -> f64;
    fn price_cents(&self) -> i64;
    fn sale_price_cents(&self) -> Option<i64>;
    fn shipping_cents(&self) -> i64;

    /// Effective stock units: `qty × measurement`.
    fn effective_qty(&self) -> f64 {
        self.qty() * self.measurement()
    }
}

impl LedgerLine for LineItem {
    fn qty(&self) -> f64 {
        self.qty
    }
    fn measurement(&self) -> f64 {
        self.measurement
    }
    fn price_cents(&self) -> i64 {
        self.price_cents
    }
    fn sale_price_cents(&self) -> Option<i64> {
        self.sale_price_cents
    }
    fn shipping_cents(&self) -> i64 {
        self.shipping_cents
    }
}

impl LedgerLine for TransactionItem {
    fn qty(&self) -> f64 {
        self.qty
    }
    fn measurement(&self) -> f64 {
        self.measurement
    }
    fn price_cents(&self) -> i64 {
        self.price_cents
    }
    fn sale_price_cents(&self) -> Option<i64> {
        self.sale_price_cents
    }
    fn shipping_cents(&self) -> i64 {
        self.shipping_cents
    }
}

impl LedgerLine for ItemSnapshot {
    fn qty(&self) -> f64 {
        self.qty
    }
    fn measurement(&self) -> f64 {
        self.measurement
    }
    fn price_cents(&self) -> i64 {
        self.price_cents
    }
    fn sale_price_cents(&self) -> Option<i64> {
        self.sale_price_cents
    }
    fn shipping_cents(&self) -> i64 {
        self.shipping_cents
    }
}

// =============================================================================
// Per-Line Amounts
// =============================================================================

/// The unit price a line trades at for the given transaction kind:
/// `sale_price` for sales (falling back to cost when a sale line carries
/// none), `price` otherwise.
pub fn unit_price_cents<L: LedgerLine>(kind: TransactionKind, line: &L) -> i64 {
    if kind.uses_sale_price() {
        line.sale_price_cents().unwrap_or_else(|| line.price_cents())
    } else {
        line.price_cents()
    }
}

/// `round(qty × measurement × unit_price)` for one line.
pub fn line_total<L: LedgerLine>(kind: TransactionKind, line: &L) -> Money {
    Money::from_cents(unit_price_cents(kind, line)).mul_measured(line.qty(), line.measurement())
}

/// `round(qty × shipping)` for one line. Shipping is per unit, NOT per
/// effective unit; measurement does not apply.
pub fn line_shipping<L: LedgerLine>(line: &L) -> Money {
    Money::from_cents(line.shipping_cents()).mul_f64(line.qty())
}

/// What a sale line adds to the buyer's balance.
pub fn sale_buyer_charge<L: LedgerLine>(line: &L) -> Money {
    line_total(TransactionKind::Sale, line)
}

/// What a return line credits back to the buyer: cost price plus shipping
/// (credit uses cost, not sale price).
pub fn return_buyer_credit<L: LedgerLine>(line: &L) -> Money {
    line_total(TransactionKind::Return, line) + line_shipping(line)
}

// =============================================================================
// Snapshot Totals
// =============================================================================

/// The shared total calculator over a whole snapshot:
/// `Σ line_total + Σ line_shipping`.
pub fn snapshot_total<L: LedgerLine>(kind: TransactionKind, lines: &[L]) -> Money {
    let goods: Money = lines.iter().map(|l| line_total(kind, l)).sum();
    let shipping: Money = lines.iter().map(line_shipping).sum();
    goods + shipping
}

/// Cost-side total: `Σ round(qty × measurement × price)`.
pub fn cost_total<L: LedgerLine>(lines: &[L]) -> Money {
    lines
        .iter()
        .map(|l| Money::from_cents(l.price_cents()).mul_measured(l.qty(), l.measurement()))
        .sum()
}

/// Sale-side total: `Σ round(qty × measurement × sale_price)`.
pub fn sale_total<L: LedgerLine>(lines: &[L]) -> Money {
    lines
        .iter()
        .map(|l| line_total(TransactionKind::Sale, l))
        .sum()
}

/// Total shipping across a snapshot: `Σ round(qty × shipping)`.
pub fn shipping_total<L: LedgerLine>(lines: &[L]) -> Money {
    lines.iter().map(line_shipping).sum()
}

// =============================================================================
// Header Totals
// =============================================================================

/// Denormalized totals persisted on the transaction header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeaderTotals {
    pub price_cents: i64,
    pub sale_price_cents: i64,
    pub total_shipping_cents: i64,
    pub profit_cents: i64,
}

/// Computes the header totals for a snapshot.
///
/// Profit only exists on sales: `sale_total − cost_total`, both sides summed
/// over the SAME snapshot. (Summing cost from a different snapshot than the
/// sale side breaks edit round-trip idempotence.)
pub fn header_totals<L: LedgerLine>(kind: TransactionKind, lines: &[L]) -> HeaderTotals {
    let cost = cost_total(lines);
    let shipping = shipping_total(lines);

    if kind.uses_sale_price() {
        let sale = sale_total(lines);
        HeaderTotals {
            price_cents: cost.cents(),
            sale_price_cents: sale.cents(),
            total_shipping_cents: shipping.cents(),
            profit_cents: (sale - cost).cents(),
        }
    } else {
        HeaderTotals {
            price_cents: cost.cents(),
            sale_price_cents: 0,
            total_shipping_cents: shipping.cents(),
            profit_cents: 0,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::LineItem;

    fn line(qty: f64, measurement: f64, price: i64, sale: Option<i64>, ship: i64) -> LineItem {
        LineItem {
            inventory_id: "inv-1".into(),
            qty,
            measurement,
            unit: "unit".into(),
            price_cents: price,
            sale_price_cents: sale,
            shipping_cents: ship,
        }
    }

    #[test]
    fn test_unit_price_by_kind() {
        let l = line(1.0, 1.0, 1200, Some(2000), 0);
        assert_eq!(unit_price_cents(TransactionKind::Sale, &l), 2000);
        assert_eq!(unit_price_cents(TransactionKind::Return, &l), 1200);
        assert_eq!(unit_price_cents(TransactionKind::InventoryAddition, &l), 1200);
    }

    #[test]
    fn test_sale_line_falls_back_to_cost() {
        let l = line(1.0, 1.0, 1200, None, 0);
        assert_eq!(unit_price_cents(TransactionKind::Sale, &l), 1200);
    }

    #[test]
    fn test_sale_buyer_charge() {
        // qty=3, measurement=1, sale_price=$20 → buyer owes $60 more
        let l = line(3.0, 1.0, 1200, Some(2000), 0);
        assert_eq!(sale_buyer_charge(&l).cents(), 6000);
    }

    #[test]
    fn test_return_buyer_credit_uses_cost_plus_shipping() {
        // qty=1, price=$12, shipping=$2 → credit $14
        let l = line(1.0, 1.0, 1200, Some(2000), 200);
        assert_eq!(return_buyer_credit(&l).cents(), 1400);
    }

    #[test]
    fn test_snapshot_total_sale_vs_cost_basis() {
        let lines = vec![
            line(3.0, 1.0, 1200, Some(2000), 0),
            line(2.0, 1.0, 500, Some(800), 100),
        ];
        // sale basis: 3*2000 + 2*800 + shipping 2*100 = 6000+1600+200
        assert_eq!(snapshot_total(TransactionKind::Sale, &lines).cents(), 7800);
        // cost basis: 3*1200 + 2*500 + 200 = 3600+1000+200
        assert_eq!(
            snapshot_total(TransactionKind::InventoryAddition, &lines).cents(),
            4800
        );
    }

    #[test]
    fn test_shipping_ignores_measurement() {
        // 2 units at measurement 3.5: shipping is per unit, so 2 × $1.00
        let l = line(2.0, 3.5, 1000, None, 100);
        assert_eq!(line_shipping(&l).cents(), 200);
    }

    #[test]
    fn test_header_totals_sale_profit() {
        let lines = vec![line(3.0, 1.0, 1200, Some(2000), 0)];
        let totals = header_totals(TransactionKind::Sale, &lines);
        assert_eq!(totals.price_cents, 3600);
        assert_eq!(totals.sale_price_cents, 6000);
        assert_eq!(totals.profit_cents, 2400);
        assert_eq!(totals.total_shipping_cents, 0);
    }

    #[test]
    fn test_header_totals_non_sale_has_no_profit() {
        let lines = vec![line(4.0, 1.0, 250, None, 50)];
        let totals = header_totals(TransactionKind::Restock, &lines);
        assert_eq!(totals.price_cents, 1000);
        assert_eq!(totals.sale_price_cents, 0);
        assert_eq!(totals.profit_cents, 0);
        assert_eq!(totals.total_shipping_cents, 200);
    }

    #[test]
    fn test_fractional_measurement_rounds_per_line() {
        // 1 × 3.5 × $10.99 = $38.465 → $38.47
        let l = line(1.0, 3.5, 1099, None, 0);
        assert_eq!(
            snapshot_total(TransactionKind::Return, &[l]).cents(),
            3847
        );
    }
}
