//! # Sale Workflow
//!
//! Creates and cancels sales. Every step of one operation runs inside a
//! single transaction; all checks happen before the first write.
//!
//! ## create_sale
//! ```text
//! validate payload ─► branch ─► resolve lines (product active, unit, base qty)
//!        │
//!        ▼
//! totals ─► stock per product ─► CREDIT: customer + limit
//!        │
//!        ▼  (first write)
//! header + items ─► take stock ─► CREDIT: CXC + debt   │ CASH: INCOME/SALE
//! ```
//!
//! ## cancel_sale
//! Allowed only on the business day the sale was made, in the configured
//! time zone. Restores stock, then compensates cash (CASH) or removes the
//! receivable and its debt (CREDIT).

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use almacen_core::ids::{self, generate_id};
use almacen_core::{
    credit, rules, validation, Actor, CashCategory, CashMovementType, CoreError, CreditType,
    DateRange, DocumentStatus, Money, NewCashMovement, NewCreditAccount, NewSale, Quantity, Sale,
    SaleDetail, SaleItem, TradeType, ValidationError,
};
use almacen_db::{Database, SqliteConnection};

use crate::cash::CashLedger;
use crate::config::LedgerConfig;
use crate::credit::CreditLedger;
use crate::error::{LedgerError, LedgerResult};
use crate::stock::{ensure_branch, StockLedger};

#[derive(Debug, Clone)]
pub struct SaleWorkflow {
    db: Database,
    config: Arc<LedgerConfig>,
    stock: StockLedger,
    cash: CashLedger,
    credit: CreditLedger,
}

impl SaleWorkflow {
    pub fn new(db: Database, config: Arc<LedgerConfig>) -> Self {
        SaleWorkflow {
            stock: StockLedger::new(db.clone(), config.clone()),
            cash: CashLedger::new(db.clone()),
            credit: CreditLedger::new(db.clone(), config.clone()),
            db,
            config,
        }
    }

    /// Records a sale and its stock, credit and cash effects.
    ///
    /// ## Errors
    /// * `ValidationError` - empty items, bad quantities/prices, discount
    ///   above subtotal, inactive product, unit of another product
    /// * `NotFound` - branch, product, unit or customer
    /// * `InsufficientStock` - first product short at the branch
    /// * `CreditCustomerRequired` / `CreditLimitExceeded` - CREDIT sales
    pub async fn create_sale(&self, actor: &Actor, new: NewSale) -> LedgerResult<SaleDetail> {
        debug!(branch_id = %new.branch_id, sale_type = ?new.sale_type, items = new.items.len(), "create_sale");
        validation::validate_new_sale(&new)?;

        let mut tx = self.db.begin().await?;
        ensure_branch(&self.db, &mut tx, &new.branch_id).await?;

        let sale_id = generate_id(ids::SALE);
        let items = self.resolve_items(&mut tx, &sale_id, &new).await?;
        let (subtotal, total) = rules::document_totals(
            items.iter().map(|item| Money::from_cents(item.subtotal_cents)),
            Money::from_cents(new.discount_cents),
        )?;

        let requirements = rules::requirements_by_product(
            items.iter().map(|item| (item.product_id.as_str(), item.base_quantity)),
        )?;
        for (product_id, required) in &requirements {
            self.stock
                .check_in(&mut tx, product_id, &new.branch_id, *required)
                .await?;
        }

        let customer = match (new.sale_type, new.customer_id.as_deref()) {
            (TradeType::Credit, None) => return Err(CoreError::CreditCustomerRequired.into()),
            (_, None) => None,
            (sale_type, Some(customer_id)) => {
                let customer = self
                    .db
                    .customers()
                    .get(&mut tx, customer_id)
                    .await?
                    .ok_or_else(|| LedgerError::not_found("Customer", customer_id))?;
                if sale_type == TradeType::Credit {
                    rules::check_credit_limit(&customer, total)?;
                }
                Some(customer)
            }
        };

        let now = Utc::now();
        let sale = Sale {
            id: sale_id,
            branch_id: new.branch_id,
            customer_id: new.customer_id,
            sale_type: new.sale_type,
            payment_method: new.payment_method,
            subtotal_cents: subtotal.cents(),
            discount_cents: new.discount_cents,
            total_cents: total.cents(),
            status: DocumentStatus::Active,
            notes: new.notes,
            created_by: actor.id.clone(),
            created_at: now,
            cancelled_by: None,
            cancelled_at: None,
        };
        self.db.sales().insert_sale(&mut tx, &sale).await?;
        for item in &items {
            self.db.sales().insert_item(&mut tx, item).await?;
        }

        for item in &items {
            self.stock
                .take_in(&mut tx, &item.product_id, &sale.branch_id, item.base_quantity)
                .await?;
        }

        if total.is_positive() {
            match (sale.sale_type, customer) {
                (TradeType::Credit, Some(customer)) => {
                    let due_date = credit::due_date(
                        now,
                        customer.credit_days,
                        self.credit.default_credit_days(),
                    )?;
                    self.credit
                        .create_in(
                            &mut tx,
                            &actor.id,
                            NewCreditAccount {
                                account_type: CreditType::Cxc,
                                branch_id: sale.branch_id.clone(),
                                counterparty_id: customer.id,
                                sale_id: Some(sale.id.clone()),
                                purchase_id: None,
                                total_cents: total.cents(),
                                due_date,
                                notes: None,
                            },
                        )
                        .await?;
                }
                _ => {
                    let movement = NewCashMovement::new(
                        &sale.branch_id,
                        CashMovementType::Income,
                        CashCategory::Sale,
                        total.cents(),
                        sale.payment_method.unwrap_or_default(),
                        format!("Venta {}", sale.id),
                    )
                    .for_sale(&sale.id);
                    self.cash.record_in(&mut tx, &actor.id, movement).await?;
                }
            }
        }

        self.db.commit(tx).await?;

        info!(
            sale_id = %sale.id,
            branch_id = %sale.branch_id,
            sale_type = ?sale.sale_type,
            total = %total,
            items = items.len(),
            "Sale created"
        );
        Ok(SaleDetail { sale, items })
    }

    /// Cancels a sale made today and reverses its effects.
    ///
    /// ## Errors
    /// * `NotFound`
    /// * `SaleAlreadyCancelled`
    /// * `SaleNotFromToday` - created on an earlier business day
    /// * `AccountHasPayments` - CREDIT sale whose receivable was paid into
    pub async fn cancel_sale(&self, sale_id: &str, actor: &Actor) -> LedgerResult<Sale> {
        debug!(sale_id = %sale_id, actor_id = %actor.id, "cancel_sale");

        let mut tx = self.db.begin().await?;
        let mut sale = self
            .db
            .sales()
            .get(&mut tx, sale_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Sale", sale_id))?;

        if sale.status == DocumentStatus::Cancelled {
            return Err(CoreError::SaleAlreadyCancelled(sale.id).into());
        }
        let now = Utc::now();
        if !rules::is_same_business_day(sale.created_at, now, self.config.timezone()) {
            return Err(CoreError::SaleNotFromToday(sale.id).into());
        }

        let receivable = match sale.sale_type {
            TradeType::Credit => {
                let account = self.credit.find_by_sale_in(&mut tx, &sale.id).await?;
                match &account {
                    Some(account) => account.ensure_no_payments()?,
                    None if sale.total_cents > 0 => {
                        warn!(sale_id = %sale.id, "Credit sale has no receivable to remove");
                    }
                    None => {}
                }
                account
            }
            TradeType::Cash => None,
        };

        if !self
            .db
            .sales()
            .mark_cancelled(&mut tx, &sale.id, &actor.id, now)
            .await?
        {
            return Err(CoreError::SaleAlreadyCancelled(sale.id).into());
        }

        let items = self.db.sales().items(&mut tx, &sale.id).await?;
        for item in &items {
            self.stock
                .receive_in(&mut tx, &item.product_id, &sale.branch_id, item.base_quantity)
                .await?;
        }

        match (sale.sale_type, receivable) {
            (TradeType::Credit, Some(account)) => {
                self.credit.remove_in(&mut tx, &account).await?;
            }
            (TradeType::Cash, _) if sale.total_cents > 0 => {
                let movement = NewCashMovement::new(
                    &sale.branch_id,
                    CashMovementType::Expense,
                    CashCategory::Adjustment,
                    sale.total_cents,
                    sale.payment_method.unwrap_or_default(),
                    format!("Cancelación de venta {}", sale.id),
                )
                .for_sale(&sale.id);
                self.cash.record_in(&mut tx, &actor.id, movement).await?;
            }
            _ => {}
        }

        self.db.commit(tx).await?;

        sale.status = DocumentStatus::Cancelled;
        sale.cancelled_by = Some(actor.id.clone());
        sale.cancelled_at = Some(now);

        info!(sale_id = %sale.id, total_cents = sale.total_cents, "Sale cancelled");
        Ok(sale)
    }

    /// Header and lines of a sale.
    pub async fn get_sale(&self, sale_id: &str) -> LedgerResult<SaleDetail> {
        let mut conn = self.db.acquire().await?;
        let sale = self
            .db
            .sales()
            .get(&mut conn, sale_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Sale", sale_id))?;
        let items = self.db.sales().items(&mut conn, sale_id).await?;

        Ok(SaleDetail { sale, items })
    }

    /// Sales of a branch inside `range`, newest first.
    pub async fn list_by_branch(&self, branch_id: &str, range: DateRange) -> LedgerResult<Vec<Sale>> {
        let mut conn = self.db.acquire().await?;
        Ok(self.db.sales().list_by_branch(&mut conn, branch_id, range).await?)
    }

    /// Turns payload lines into sale items with the unit snapshot and the
    /// base quantity that moves stock.
    async fn resolve_items(
        &self,
        conn: &mut SqliteConnection,
        sale_id: &str,
        new: &NewSale,
    ) -> LedgerResult<Vec<SaleItem>> {
        let mut items = Vec::with_capacity(new.items.len());

        for line in &new.items {
            let product = self
                .db
                .products()
                .get(conn, &line.product_id)
                .await?
                .ok_or_else(|| LedgerError::not_found("Product", &line.product_id))?;
            if !product.is_active {
                return Err(ValidationError::Inconsistent(format!(
                    "product {} is inactive",
                    product.id
                ))
                .into());
            }

            let unit = match line.unit_id.as_deref() {
                Some(unit_id) => Some(
                    self.db
                        .products()
                        .get_unit(conn, unit_id)
                        .await?
                        .ok_or_else(|| LedgerError::not_found("ProductUnit", unit_id))?,
                ),
                None => None,
            };
            let base_quantity = rules::base_quantity(&product.id, line.quantity, unit.as_ref())?;
            let subtotal_cents = rules::line_subtotal(line.unit_price_cents, line.quantity)?.cents();
            if base_quantity <= Quantity::zero() {
                return Err(ValidationError::must_be_positive("quantity").into());
            }

            items.push(SaleItem {
                id: generate_id(ids::SALE_ITEM),
                sale_id: sale_id.to_string(),
                product_id: product.id,
                quantity: line.quantity,
                unit_price_cents: line.unit_price_cents,
                subtotal_cents,
                unit_id: unit.as_ref().map(|u| u.id.clone()),
                unit_name: unit.as_ref().map(|u| u.name.clone()),
                unit_factor: unit.as_ref().map(|u| u.factor),
                base_quantity,
            });
        }

        Ok(items)
    }
}
