//! # Input Payloads
//!
//! Structured payloads the boundary layer hands to the engine after
//! deserializing a request. They carry no ids or timestamps; those are
//! assigned when a payload is persisted.
//!
//! ```text
//! request JSON ──serde──► NewSale ──validation::validate_new_sale──► workflow
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::quantity::Quantity;
use crate::types::{
    CashCategory, CashMovementType, CreditStatus, CreditType, PaymentMethod, TradeType,
};

// =============================================================================
// Master Data
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewBranch {
    pub name: String,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    /// Base unit label; defaults to "pz" when empty.
    #[serde(default)]
    pub unit: String,
    pub cost_price_cents: i64,
    pub retail_price_cents: i64,
    pub wholesale_price_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProductUnit {
    pub product_id: String,
    pub name: String,
    #[ts(type = "number")]
    pub factor: Quantity,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCustomer {
    pub name: String,
    #[serde(default)]
    pub credit_limit_cents: i64,
    pub credit_days: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSupplier {
    pub name: String,
    pub credit_days: Option<i64>,
}

// =============================================================================
// Stock
// =============================================================================

/// A stock row created explicitly (as opposed to on first incoming movement).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewStock {
    pub product_id: String,
    pub branch_id: String,
    #[ts(type = "number")]
    pub quantity: Quantity,
    #[ts(type = "number")]
    pub min_stock: Quantity,
    #[ts(type = "number")]
    pub max_stock: Quantity,
}

// =============================================================================
// Sale
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSaleItem {
    pub product_id: String,
    /// Quantity in the selling unit (`unit_id`), or base units when absent.
    #[ts(type = "number")]
    pub quantity: Quantity,
    pub unit_price_cents: i64,
    pub unit_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSale {
    pub branch_id: String,
    pub customer_id: Option<String>,
    pub sale_type: TradeType,
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub discount_cents: i64,
    pub notes: Option<String>,
    pub items: Vec<NewSaleItem>,
}

// =============================================================================
// Purchase
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewPurchaseItem {
    pub product_id: String,
    #[ts(type = "number")]
    pub quantity: Quantity,
    pub unit_cost_cents: i64,
    pub unit_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewPurchase {
    pub branch_id: String,
    pub supplier_id: String,
    pub purchase_type: TradeType,
    pub payment_method: Option<PaymentMethod>,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<NewPurchaseItem>,
}

/// Fields of a purchase that stay editable after creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseUpdate {
    pub notes: Option<String>,
    pub invoice_number: Option<String>,
}

// =============================================================================
// Transfer
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewTransferItem {
    pub product_id: String,
    #[ts(type = "number")]
    pub quantity: Quantity,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewTransfer {
    pub from_branch_id: String,
    pub to_branch_id: String,
    pub notes: Option<String>,
    pub items: Vec<NewTransferItem>,
}

// =============================================================================
// Credit
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCreditAccount {
    pub account_type: CreditType,
    pub branch_id: String,
    pub counterparty_id: String,
    pub sale_id: Option<String>,
    pub purchase_id: Option<String>,
    pub total_cents: i64,
    #[ts(as = "String")]
    pub due_date: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Partial update of a credit account. Amounts and status are not editable.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreditAccountUpdate {
    #[ts(as = "Option<String>")]
    pub due_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreditAccountFilter {
    pub account_type: Option<CreditType>,
    pub status: Option<CreditStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentInput {
    pub amount_cents: i64,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

// =============================================================================
// Cash
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCashMovement {
    pub branch_id: String,
    pub movement_type: CashMovementType,
    pub category: CashCategory,
    pub amount_cents: i64,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    pub description: String,
    pub sale_id: Option<String>,
    pub purchase_id: Option<String>,
    pub credit_account_id: Option<String>,
}

impl NewCashMovement {
    /// A movement with no document links.
    pub fn new(
        branch_id: impl Into<String>,
        movement_type: CashMovementType,
        category: CashCategory,
        amount_cents: i64,
        payment_method: PaymentMethod,
        description: impl Into<String>,
    ) -> Self {
        NewCashMovement {
            branch_id: branch_id.into(),
            movement_type,
            category,
            amount_cents,
            payment_method,
            description: description.into(),
            sale_id: None,
            purchase_id: None,
            credit_account_id: None,
        }
    }

    pub fn for_sale(mut self, sale_id: &str) -> Self {
        self.sale_id = Some(sale_id.to_string());
        self
    }

    pub fn for_purchase(mut self, purchase_id: &str) -> Self {
        self.purchase_id = Some(purchase_id.to_string());
        self
    }

    pub fn for_credit_account(mut self, account_id: &str) -> Self {
        self.credit_account_id = Some(account_id.to_string());
        self
    }
}

// =============================================================================
// Date Range
// =============================================================================

/// Half-open time window `[from, to)`. Missing bounds are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DateRange {
    #[ts(as = "Option<String>")]
    pub from: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn all() -> Self {
        DateRange::default()
    }

    pub fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        DateRange {
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| at >= from) && self.to.map_or(true, |to| at < to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_date_range_is_half_open() {
        let from = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let to = from + Duration::days(1);
        let range = DateRange::between(from, to);

        assert!(range.contains(from));
        assert!(range.contains(to - Duration::seconds(1)));
        assert!(!range.contains(to));
        assert!(DateRange::all().contains(to));
    }

    #[test]
    fn test_sale_payload_from_json() {
        let json = r#"{
            "branch_id": "BR-A",
            "customer_id": null,
            "sale_type": "CASH",
            "payment_method": "CARD",
            "notes": null,
            "items": [{"product_id": "PRD-1", "quantity": 2.5, "unit_price_cents": 400, "unit_id": null}]
        }"#;
        let sale: NewSale = serde_json::from_str(json).unwrap();
        assert_eq!(sale.discount_cents, 0);
        assert_eq!(sale.payment_method, Some(PaymentMethod::Card));
        assert_eq!(sale.items[0].quantity, Quantity::from_milli(2_500));
    }
}
