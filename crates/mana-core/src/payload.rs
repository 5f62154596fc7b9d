//! # Transaction Request Payloads
//!
//! The tagged request union consumed by the ledger engine.
//!
//! ## Why a Sum Type?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  The duck-typed alternative: one struct where every field is        │
//! │  optional and interpreted differently per `type` string. Invalid    │
//! │  combinations (a payment with items, a sale without a buyer) are    │
//! │  representable and must be caught at runtime.                       │
//! │                                                                     │
//! │  Here: one variant per transaction type, each with its own          │
//! │  required-field set. A payment without a `payment` block does not   │
//! │  deserialize. A sale without a buyer does not typecheck.            │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The union is internally tagged on `"type"` so the JSON wire shape stays
//! what external callers already send:
//!
//! ```json
//! { "type": "sale", "user_id": "...", "buyer_id": "...", "items": [ ... ] }
//! ```
//!
//! `validate()` performs shape checks only (presence, positivity). Deep
//! business validation (stock sufficiency, entity existence) is the
//! engine's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};
use crate::types::{BalanceMethod, PaymentDirection, TransactionKind};
use crate::DEFAULT_MEASUREMENT;

// =============================================================================
// Line Item
// =============================================================================

/// One requested line: quantity of an inventory row at given prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// The inventory row this line draws from / adds to.
    pub inventory_id: String,

    pub qty: f64,

    /// Per-line multiplier applied to qty (unit conversion factor).
    #[serde(default = "default_measurement")]
    pub measurement: f64,

    #[serde(default = "default_unit")]
    pub unit: String,

    /// Unit cost in cents.
    pub price_cents: i64,

    /// Unit sale price in cents (sale lines).
    #[serde(default)]
    pub sale_price_cents: Option<i64>,

    /// Per-unit shipping in cents.
    #[serde(default)]
    pub shipping_cents: i64,
}

fn default_measurement() -> f64 {
    DEFAULT_MEASUREMENT
}

fn default_unit() -> String {
    "unit".to_string()
}

impl LineItem {
    /// Effective stock units this line moves: `qty × measurement`.
    #[inline]
    pub fn effective_qty(&self) -> f64 {
        self.qty * self.measurement
    }

    fn validate(&self, index: usize) -> ValidationResult<()> {
        if self.inventory_id.trim().is_empty() {
            return Err(ValidationError::required(format!(
                "items[{index}].inventory_id"
            )));
        }
        if self.qty <= 0.0 {
            return Err(ValidationError::must_be_positive(format!(
                "items[{index}].qty"
            )));
        }
        if self.measurement <= 0.0 {
            return Err(ValidationError::must_be_positive(format!(
                "items[{index}].measurement"
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Per-Variant Payloads
// =============================================================================

/// Sale or return: buyer required, items required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRequest {
    pub user_id: String,
    pub buyer_id: String,

    /// The worker acting on behalf of the admin, if any.
    #[serde(default)]
    pub worker_id: Option<String>,

    pub items: Vec<LineItem>,

    #[serde(default)]
    pub notes: Option<String>,
}

/// Payment event details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub amount_cents: i64,
    pub method: BalanceMethod,
    pub direction: PaymentDirection,

    /// Defaults to "now" when omitted.
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,

    /// When set, the buyer balance still moves but the owning user's
    /// cash/method balance is left untouched.
    #[serde(default)]
    pub skip_cash_user_balance: bool,
}

/// Payment against a buyer's balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub user_id: String,
    pub buyer_id: String,

    #[serde(default)]
    pub worker_id: Option<String>,

    pub payment: PaymentDetails,

    #[serde(default)]
    pub notes: Option<String>,
}

/// Inventory addition or restock: buyer optional (the `...WithoutBuyer`
/// path skips every buyer mutation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryRequest {
    pub user_id: String,

    #[serde(default)]
    pub buyer_id: Option<String>,

    #[serde(default)]
    pub worker_id: Option<String>,

    pub items: Vec<LineItem>,

    #[serde(default)]
    pub notes: Option<String>,
}

/// Sample intake or give-back: buyer required, items required,
/// no stock mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleMovementRequest {
    pub user_id: String,
    pub buyer_id: String,

    #[serde(default)]
    pub worker_id: Option<String>,

    pub items: Vec<LineItem>,

    #[serde(default)]
    pub notes: Option<String>,
}

// =============================================================================
// The Union
// =============================================================================

/// A typed transaction request, one variant per transaction type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransactionRequest {
    Sale(TradeRequest),
    Return(TradeRequest),
    Payment(PaymentRequest),
    InventoryAddition(InventoryRequest),
    Restock(InventoryRequest),
    SampleReceived(SampleMovementRequest),
    SampleReturned(SampleMovementRequest),
}

impl TransactionRequest {
    /// The transaction kind this request produces.
    pub const fn kind(&self) -> TransactionKind {
        match self {
            TransactionRequest::Sale(_) => TransactionKind::Sale,
            TransactionRequest::Return(_) => TransactionKind::Return,
            TransactionRequest::Payment(_) => TransactionKind::Payment,
            TransactionRequest::InventoryAddition(_) => TransactionKind::InventoryAddition,
            TransactionRequest::Restock(_) => TransactionKind::Restock,
            TransactionRequest::SampleReceived(_) => TransactionKind::SampleReceived,
            TransactionRequest::SampleReturned(_) => TransactionKind::SampleReturned,
        }
    }

    /// The acting user.
    pub fn user_id(&self) -> &str {
        match self {
            TransactionRequest::Sale(r) | TransactionRequest::Return(r) => &r.user_id,
            TransactionRequest::Payment(r) => &r.user_id,
            TransactionRequest::InventoryAddition(r) | TransactionRequest::Restock(r) => {
                &r.user_id
            }
            TransactionRequest::SampleReceived(r) | TransactionRequest::SampleReturned(r) => {
                &r.user_id
            }
        }
    }

    /// The buyer, where the variant carries one.
    pub fn buyer_id(&self) -> Option<&str> {
        match self {
            TransactionRequest::Sale(r) | TransactionRequest::Return(r) => Some(&r.buyer_id),
            TransactionRequest::Payment(r) => Some(&r.buyer_id),
            TransactionRequest::InventoryAddition(r) | TransactionRequest::Restock(r) => {
                r.buyer_id.as_deref()
            }
            TransactionRequest::SampleReceived(r) | TransactionRequest::SampleReturned(r) => {
                Some(&r.buyer_id)
            }
        }
    }

    /// The acting worker, if any.
    pub fn worker_id(&self) -> Option<&str> {
        match self {
            TransactionRequest::Sale(r) | TransactionRequest::Return(r) => r.worker_id.as_deref(),
            TransactionRequest::Payment(r) => r.worker_id.as_deref(),
            TransactionRequest::InventoryAddition(r) | TransactionRequest::Restock(r) => {
                r.worker_id.as_deref()
            }
            TransactionRequest::SampleReceived(r) | TransactionRequest::SampleReturned(r) => {
                r.worker_id.as_deref()
            }
        }
    }

    /// Line items, for the variants that carry them.
    pub fn items(&self) -> &[LineItem] {
        match self {
            TransactionRequest::Sale(r) | TransactionRequest::Return(r) => &r.items,
            TransactionRequest::InventoryAddition(r) | TransactionRequest::Restock(r) => &r.items,
            TransactionRequest::SampleReceived(r) | TransactionRequest::SampleReturned(r) => {
                &r.items
            }
            TransactionRequest::Payment(_) => &[],
        }
    }

    /// Free-form notes.
    pub fn notes(&self) -> Option<&str> {
        match self {
            TransactionRequest::Sale(r) | TransactionRequest::Return(r) => r.notes.as_deref(),
            TransactionRequest::Payment(r) => r.notes.as_deref(),
            TransactionRequest::InventoryAddition(r) | TransactionRequest::Restock(r) => {
                r.notes.as_deref()
            }
            TransactionRequest::SampleReceived(r) | TransactionRequest::SampleReturned(r) => {
                r.notes.as_deref()
            }
        }
    }

    /// Shape validation: presence and positivity only.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.user_id().trim().is_empty() {
            return Err(ValidationError::required("user_id"));
        }

        if let Some(buyer_id) = self.buyer_id() {
            if buyer_id.trim().is_empty() {
                return Err(ValidationError::required("buyer_id"));
            }
        }

        match self {
            TransactionRequest::Payment(r) => {
                if r.payment.amount_cents <= 0 {
                    return Err(ValidationError::must_be_positive("payment.amount"));
                }
            }
            _ => {
                let items = self.items();
                if items.is_empty() {
                    return Err(ValidationError::empty("items"));
                }
                for (index, item) in items.iter().enumerate() {
                    item.validate(index)?;
                }
            }
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(qty: f64) -> LineItem {
        LineItem {
            inventory_id: "inv-1".into(),
            qty,
            measurement: 1.0,
            unit: "unit".into(),
            price_cents: 1200,
            sale_price_cents: Some(2000),
            shipping_cents: 0,
        }
    }

    #[test]
    fn test_sale_round_trips_through_json() {
        let request = TransactionRequest::Sale(TradeRequest {
            user_id: "u1".into(),
            buyer_id: "b1".into(),
            worker_id: None,
            items: vec![line(3.0)],
            notes: None,
        });

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"type\":\"sale\""));

        let back: TransactionRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind(), TransactionKind::Sale);
        assert_eq!(back.user_id(), "u1");
        assert_eq!(back.buyer_id(), Some("b1"));
    }

    #[test]
    fn test_wire_shape_matches_route_contract() {
        // What an external caller posts at POST /api/transaction
        let json = r#"{
            "type": "payment",
            "user_id": "u1",
            "buyer_id": "b1",
            "payment": {
                "amount_cents": 4000,
                "method": "cash",
                "direction": "received"
            }
        }"#;

        let request: TransactionRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.kind(), TransactionKind::Payment);
        match &request {
            TransactionRequest::Payment(r) => {
                assert_eq!(r.payment.amount_cents, 4000);
                assert_eq!(r.payment.method, BalanceMethod::Cash);
                assert!(!r.payment.skip_cash_user_balance);
            }
            _ => panic!("expected payment variant"),
        }
    }

    #[test]
    fn test_payment_without_payment_block_is_unrepresentable() {
        let json = r#"{ "type": "payment", "user_id": "u1", "buyer_id": "b1" }"#;
        assert!(serde_json::from_str::<TransactionRequest>(json).is_err());
    }

    #[test]
    fn test_measurement_defaults_to_one() {
        let json = r#"{
            "type": "sale",
            "user_id": "u1",
            "buyer_id": "b1",
            "items": [{ "inventory_id": "inv-1", "qty": 2, "price_cents": 500 }]
        }"#;
        let request: TransactionRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.items()[0].measurement, 1.0);
        assert_eq!(request.items()[0].effective_qty(), 2.0);
    }

    #[test]
    fn test_validate_rejects_empty_user() {
        let request = TransactionRequest::Sale(TradeRequest {
            user_id: "  ".into(),
            buyer_id: "b1".into(),
            worker_id: None,
            items: vec![line(1.0)],
            notes: None,
        });
        assert_eq!(
            request.validate(),
            Err(ValidationError::required("user_id"))
        );
    }

    #[test]
    fn test_validate_rejects_empty_items() {
        let request = TransactionRequest::Restock(InventoryRequest {
            user_id: "u1".into(),
            buyer_id: None,
            worker_id: None,
            items: vec![],
            notes: None,
        });
        assert_eq!(request.validate(), Err(ValidationError::empty("items")));
    }

    #[test]
    fn test_validate_rejects_nonpositive_qty() {
        let request = TransactionRequest::Return(TradeRequest {
            user_id: "u1".into(),
            buyer_id: "b1".into(),
            worker_id: None,
            items: vec![line(0.0)],
            notes: None,
        });
        assert!(matches!(
            request.validate(),
            Err(ValidationError::MustBePositive { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_nonpositive_payment() {
        let request = TransactionRequest::Payment(PaymentRequest {
            user_id: "u1".into(),
            buyer_id: "b1".into(),
            worker_id: None,
            payment: PaymentDetails {
                amount_cents: 0,
                method: BalanceMethod::Cash,
                direction: PaymentDirection::Received,
                date: None,
                skip_cash_user_balance: false,
            },
            notes: None,
        });
        assert!(matches!(
            request.validate(),
            Err(ValidationError::MustBePositive { .. })
        ));
    }
}
