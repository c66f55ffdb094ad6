//! # Domain Types
//!
//! Entities and enums shared by every layer of Almacen.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Master data          Ledgers                 Documents                 │
//! │  ───────────          ───────                 ─────────                 │
//! │  Branch               Stock (product×branch)  Sale + SaleItem           │
//! │  Product              StockAdjustment         Purchase + PurchaseItem   │
//! │  ProductUnit          CashMovement            Transfer + TransferItem   │
//! │  Customer             CreditAccount                                     │
//! │  Supplier             CreditPayment                                     │
//! │                                                                         │
//! │  Actor (id, role, home branch) is supplied by the caller on every call │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Money fields are integer minor units and carry a `_cents` suffix.
//! Quantities are [`Quantity`] values in the product's base unit unless the
//! field says otherwise.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;
use crate::quantity::Quantity;

// =============================================================================
// Actor
// =============================================================================

/// Role of the authenticated user performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Manager,
    Cashier,
}

/// The authenticated caller, as handed over by the boundary layer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Actor {
    pub id: String,
    pub role: Role,
    /// Home branch. Administrators may have none.
    pub branch_id: Option<String>,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role, branch_id: Option<&str>) -> Self {
        Actor {
            id: id.into(),
            role,
            branch_id: branch_id.map(str::to_string),
        }
    }

    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// True when the actor's home branch is `branch_id`.
    pub fn belongs_to(&self, branch_id: &str) -> bool {
        self.branch_id.as_deref() == Some(branch_id)
    }
}

// =============================================================================
// Enums
// =============================================================================

/// How a sale was paid or a payment was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    Transfer,
    Check,
}

/// Whether a sale or purchase is settled immediately or on account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeType {
    Cash,
    Credit,
}

/// Lifecycle of a sale or purchase document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    #[default]
    Active,
    Cancelled,
}

/// Receivable (customer owes us) or payable (we owe a supplier).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreditType {
    /// Cuenta por cobrar.
    Cxc,
    /// Cuenta por pagar.
    Cpp,
}

/// Settlement status of a credit account, derived from its amounts.
///
/// See [`CreditStatus::from_amounts`](crate::credit) for the only way a
/// status is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreditStatus {
    Pendiente,
    PagadoParcial,
    Pagado,
}

/// Direction of a cash movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CashMovementType {
    Income,
    Expense,
}

impl CashMovementType {
    /// The direction a compensating entry must take.
    pub fn opposite(&self) -> Self {
        match self {
            CashMovementType::Income => CashMovementType::Expense,
            CashMovementType::Expense => CashMovementType::Income,
        }
    }
}

/// What caused a cash movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CashCategory {
    Sale,
    Purchase,
    CreditPayment,
    Expense,
    Transfer,
    Adjustment,
}

/// Who initiated a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferType {
    /// Source branch pushes stock to the destination.
    Send,
    /// Destination branch asks the source for stock.
    Request,
}

/// Transfer workflow state.
///
/// ```text
/// REQUEST:  REQUESTED ─accept─► PENDING ─ship─► IN_TRANSIT ─receive─► COMPLETED
/// SEND:                         PENDING ─ship─► IN_TRANSIT ─receive─► COMPLETED
///
/// cancel: REQUESTED | PENDING | IN_TRANSIT ─► CANCELLED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferStatus {
    Requested,
    Pending,
    InTransit,
    Completed,
    Cancelled,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Requested => "REQUESTED",
            TransferStatus::Pending => "PENDING",
            TransferStatus::InTransit => "IN_TRANSIT",
            TransferStatus::Completed => "COMPLETED",
            TransferStatus::Cancelled => "CANCELLED",
        }
    }

    /// True once no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Completed | TransferStatus::Cancelled)
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Master Data
// =============================================================================

/// An independently stocked and cashiered location.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Branch {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Catalog entry shared by every branch.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    /// Stock Keeping Unit - business identifier.
    pub sku: String,
    pub name: String,
    /// Label of the base unit stock is counted in ("pz", "L", "kg").
    pub unit: String,
    pub cost_price_cents: i64,
    pub retail_price_cents: i64,
    pub wholesale_price_cents: i64,
    /// Soft delete flag; inactive products cannot be sold or bought.
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn retail_price(&self) -> Money {
        Money::from_cents(self.retail_price_cents)
    }
}

/// An alternative selling/buying unit for a product.
///
/// `factor` is how many base units one of these holds: a box of 12 has
/// factor 12, a 500 ml bottle of a product counted in litres has factor 0.5.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProductUnit {
    pub id: String,
    pub product_id: String,
    pub name: String,
    #[ts(type = "number")]
    pub factor: Quantity,
}

/// A customer who may buy on credit.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub credit_limit_cents: i64,
    /// Running receivable balance, maintained incrementally.
    pub current_debt_cents: i64,
    /// Days until a receivable falls due. `None` uses the configured default.
    pub credit_days: Option<i64>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// Credit still available before hitting the limit.
    pub fn available_credit(&self) -> Money {
        Money::from_cents(self.credit_limit_cents - self.current_debt_cents)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Supplier {
    pub id: String,
    pub name: String,
    /// Days until a payable falls due. `None` uses the configured default.
    pub credit_days: Option<i64>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Stock
// =============================================================================

/// Quantity of one product held at one branch.
///
/// `quantity >= 0` at all times; the database enforces it with a CHECK.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Stock {
    pub id: String,
    pub product_id: String,
    pub branch_id: String,
    #[ts(type = "number")]
    pub quantity: Quantity,
    #[ts(type = "number")]
    pub min_stock: Quantity,
    #[ts(type = "number")]
    pub max_stock: Quantity,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Stock {
    /// True when the quantity is at or below the reorder threshold.
    pub fn is_low(&self) -> bool {
        self.quantity <= self.min_stock
    }

    pub fn can_supply(&self, requested: Quantity) -> bool {
        self.quantity >= requested
    }
}

/// Audit row written by every manual stock adjustment.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockAdjustment {
    pub id: String,
    pub stock_id: String,
    pub product_id: String,
    pub branch_id: String,
    #[ts(type = "number")]
    pub previous_quantity: Quantity,
    #[ts(type = "number")]
    pub new_quantity: Quantity,
    pub reason: String,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sale
// =============================================================================

/// Sale header. Only `status` (and the cancellation stamp) change after creation.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub branch_id: String,
    pub customer_id: Option<String>,
    pub sale_type: TradeType,
    pub payment_method: Option<PaymentMethod>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub status: DocumentStatus,
    pub notes: Option<String>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    pub cancelled_by: Option<String>,
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A line of a sale.
///
/// `quantity` is in the selling unit; `base_quantity` is what left the shelf.
/// The unit fields are a snapshot so later catalog edits do not rewrite history.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    #[ts(type = "number")]
    pub quantity: Quantity,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
    pub unit_id: Option<String>,
    pub unit_name: Option<String>,
    #[ts(type = "number | null")]
    pub unit_factor: Option<Quantity>,
    #[ts(type = "number")]
    pub base_quantity: Quantity,
}

/// Sale header plus its lines.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleDetail {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

// =============================================================================
// Purchase
// =============================================================================

/// Purchase header. Items and totals are immutable; notes and invoice
/// number can be edited inside the edit window.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Purchase {
    pub id: String,
    pub branch_id: String,
    pub supplier_id: String,
    pub purchase_type: TradeType,
    pub payment_method: Option<PaymentMethod>,
    pub subtotal_cents: i64,
    pub total_cents: i64,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
    pub status: DocumentStatus,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    pub cancelled_by: Option<String>,
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseItem {
    pub id: String,
    pub purchase_id: String,
    pub product_id: String,
    #[ts(type = "number")]
    pub quantity: Quantity,
    pub unit_cost_cents: i64,
    pub subtotal_cents: i64,
    pub unit_id: Option<String>,
    pub unit_name: Option<String>,
    #[ts(type = "number | null")]
    pub unit_factor: Option<Quantity>,
    #[ts(type = "number")]
    pub base_quantity: Quantity,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseDetail {
    pub purchase: Purchase,
    pub items: Vec<PurchaseItem>,
}

// =============================================================================
// Credit
// =============================================================================

/// A receivable or payable.
///
/// `balance_cents == total_cents - paid_cents` and `status` is derived from
/// the two amounts; both are only ever written through
/// [`CreditAccount::apply_payment`](crate::credit).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CreditAccount {
    pub id: String,
    pub account_type: CreditType,
    pub branch_id: String,
    /// Customer id for CXC, supplier id for CPP.
    pub counterparty_id: String,
    pub sale_id: Option<String>,
    pub purchase_id: Option<String>,
    pub total_cents: i64,
    pub paid_cents: i64,
    pub balance_cents: i64,
    pub status: CreditStatus,
    #[ts(as = "String")]
    pub due_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A payment applied to a credit account. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CreditPayment {
    pub id: String,
    pub credit_account_id: String,
    pub amount_cents: i64,
    pub payment_method: PaymentMethod,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Cash
// =============================================================================

/// One entry of the append-only cash journal.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashMovement {
    pub id: String,
    pub branch_id: String,
    pub movement_type: CashMovementType,
    pub category: CashCategory,
    /// Always positive; direction comes from `movement_type`.
    pub amount_cents: i64,
    pub payment_method: PaymentMethod,
    pub description: String,
    pub sale_id: Option<String>,
    pub purchase_id: Option<String>,
    pub credit_account_id: Option<String>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl CashMovement {
    /// Signed effect on the branch balance.
    pub fn signed_amount(&self) -> Money {
        match self.movement_type {
            CashMovementType::Income => Money::from_cents(self.amount_cents),
            CashMovementType::Expense => Money::from_cents(-self.amount_cents),
        }
    }
}

/// Totals of a branch's cash journal over a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashSummary {
    pub income_cents: i64,
    pub expense_cents: i64,
    pub balance_cents: i64,
    pub movement_count: i64,
}

// =============================================================================
// Transfer
// =============================================================================

/// Inter-branch stock transfer header.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Transfer {
    pub id: String,
    pub from_branch_id: String,
    pub to_branch_id: String,
    pub transfer_type: TransferType,
    pub status: TransferStatus,
    pub notes: Option<String>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    pub approved_by: Option<String>,
    #[ts(as = "Option<String>")]
    pub approved_at: Option<DateTime<Utc>>,
    pub shipped_by: Option<String>,
    #[ts(as = "Option<String>")]
    pub shipped_at: Option<DateTime<Utc>>,
    pub completed_by: Option<String>,
    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<String>,
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TransferItem {
    pub id: String,
    pub transfer_id: String,
    pub product_id: String,
    #[ts(type = "number")]
    pub quantity: Quantity,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransferDetail {
    pub transfer: Transfer,
    pub items: Vec<TransferItem>,
}

// =============================================================================
// Unit Tests
// =============================================================================
