//! Entity identifiers.
//!
//! Every id is `{PREFIX}-{unix_millis}-{random8}`, e.g.
//! `SALE-1760000000000-9f3a1c2e`. The millisecond part keeps ids roughly
//! sortable by creation time; the random part comes from a v4 UUID.

use chrono::Utc;
use uuid::Uuid;

pub const BRANCH: &str = "BR";
pub const PRODUCT: &str = "PRD";
pub const PRODUCT_UNIT: &str = "UNIT";
pub const STOCK: &str = "STK";
pub const STOCK_ADJUSTMENT: &str = "ADJ";
pub const CUSTOMER: &str = "CUS";
pub const SUPPLIER: &str = "SUP";
pub const SALE: &str = "SALE";
pub const SALE_ITEM: &str = "SITEM";
pub const PURCHASE: &str = "PUR";
pub const PURCHASE_ITEM: &str = "PITEM";
pub const CREDIT_ACCOUNT: &str = "CRD";
pub const CREDIT_PAYMENT: &str = "PAY";
pub const CASH_MOVEMENT: &str = "CASH";
pub const TRANSFER: &str = "TRF";
pub const TRANSFER_ITEM: &str = "TITEM";

/// Generates a new id with the given prefix.
pub fn generate_id(prefix: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let random = Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}", prefix, millis, &random[..8])
}
