//! # Purchase Workflow
//!
//! Goods bought from a supplier into one branch. A CASH purchase is paid on
//! the spot (EXPENSE/PURCHASE); a CREDIT purchase opens a payable (CPP).
//! Cancelling takes the goods back out, so every unit received must still
//! be on the shelf.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use almacen_core::ids::{self, generate_id};
use almacen_core::{
    credit, rules, validation, Actor, CashCategory, CashMovementType, CoreError, CreditType,
    DateRange, DocumentStatus, Money, NewCashMovement, NewCreditAccount, NewPurchase, Purchase,
    PurchaseDetail, PurchaseItem, PurchaseUpdate, TradeType, ValidationError,
};
use almacen_db::{Database, SqliteConnection};

use crate::cash::CashLedger;
use crate::config::LedgerConfig;
use crate::credit::CreditLedger;
use crate::error::{LedgerError, LedgerResult};
use crate::stock::{ensure_branch, StockLedger};

#[derive(Debug, Clone)]
pub struct PurchaseWorkflow {
    db: Database,
    config: Arc<LedgerConfig>,
    stock: StockLedger,
    cash: CashLedger,
    credit: CreditLedger,
}

impl PurchaseWorkflow {
    pub fn new(db: Database, config: Arc<LedgerConfig>) -> Self {
        PurchaseWorkflow {
            stock: StockLedger::new(db.clone(), config.clone()),
            cash: CashLedger::new(db.clone()),
            credit: CreditLedger::new(db.clone(), config.clone()),
            db,
            config,
        }
    }

    /// Receives goods into the branch and books the cost.
    ///
    /// ## Errors
    /// * `ValidationError` - empty items, bad quantities/costs, inactive product
    /// * `NotFound` - branch, supplier, product or unit
    pub async fn create_purchase(
        &self,
        actor: &Actor,
        new: NewPurchase,
    ) -> LedgerResult<PurchaseDetail> {
        debug!(branch_id = %new.branch_id, supplier_id = %new.supplier_id, items = new.items.len(), "create_purchase");
        validation::validate_new_purchase(&new)?;

        let mut tx = self.db.begin().await?;
        ensure_branch(&self.db, &mut tx, &new.branch_id).await?;
        let supplier = self
            .db
            .suppliers()
            .get(&mut tx, &new.supplier_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Supplier", &new.supplier_id))?;

        let purchase_id = generate_id(ids::PURCHASE);
        let items = self.resolve_items(&mut tx, &purchase_id, &new).await?;
        let (_, total) = rules::document_totals(
            items.iter().map(|item| Money::from_cents(item.subtotal_cents)),
            Money::zero(),
        )?;

        let now = Utc::now();
        let purchase = Purchase {
            id: purchase_id,
            branch_id: new.branch_id,
            supplier_id: new.supplier_id,
            purchase_type: new.purchase_type,
            payment_method: new.payment_method,
            subtotal_cents: total.cents(),
            total_cents: total.cents(),
            invoice_number: new.invoice_number,
            notes: new.notes,
            status: DocumentStatus::Active,
            created_by: actor.id.clone(),
            created_at: now,
            updated_at: now,
            cancelled_by: None,
            cancelled_at: None,
        };
        self.db.purchases().insert_purchase(&mut tx, &purchase).await?;
        for item in &items {
            self.db.purchases().insert_item(&mut tx, item).await?;
            self.stock
                .receive_in(&mut tx, &item.product_id, &purchase.branch_id, item.base_quantity)
                .await?;
        }

        if total.is_positive() {
            match purchase.purchase_type {
                TradeType::Credit => {
                    let due_date = credit::due_date(
                        now,
                        supplier.credit_days,
                        self.credit.default_credit_days(),
                    )?;
                    self.credit
                        .create_in(
                            &mut tx,
                            &actor.id,
                            NewCreditAccount {
                                account_type: CreditType::Cpp,
                                branch_id: purchase.branch_id.clone(),
                                counterparty_id: supplier.id,
                                sale_id: None,
                                purchase_id: Some(purchase.id.clone()),
                                total_cents: total.cents(),
                                due_date,
                                notes: purchase.invoice_number.clone(),
                            },
                        )
                        .await?;
                }
                TradeType::Cash => {
                    let movement = NewCashMovement::new(
                        &purchase.branch_id,
                        CashMovementType::Expense,
                        CashCategory::Purchase,
                        total.cents(),
                        purchase.payment_method.unwrap_or_default(),
                        format!("Compra {}", purchase.id),
                    )
                    .for_purchase(&purchase.id);
                    self.cash.record_in(&mut tx, &actor.id, movement).await?;
                }
            }
        }

        self.db.commit(tx).await?;

        info!(
            purchase_id = %purchase.id,
            branch_id = %purchase.branch_id,
            purchase_type = ?purchase.purchase_type,
            total = %total,
            items = items.len(),
            "Purchase created"
        );
        Ok(PurchaseDetail { purchase, items })
    }

    /// Edits notes and invoice number within the configured window.
    ///
    /// Fields left as `None` keep their current value.
    pub async fn update_purchase(
        &self,
        purchase_id: &str,
        update: PurchaseUpdate,
        actor: &Actor,
    ) -> LedgerResult<Purchase> {
        debug!(purchase_id = %purchase_id, actor_id = %actor.id, "update_purchase");
        validation::validate_notes(update.notes.as_deref())?;

        let mut tx = self.db.begin().await?;
        let current = self.get_in(&mut tx, purchase_id).await?;

        if current.status == DocumentStatus::Cancelled {
            return Err(CoreError::PurchaseAlreadyCancelled(current.id).into());
        }
        let window_days = self.config.purchase_edit_window_days();
        if !rules::within_edit_window(current.created_at, Utc::now(), window_days) {
            return Err(CoreError::PurchaseTooOldToEdit {
                purchase_id: current.id,
                window_days,
            }
            .into());
        }

        let notes = update.notes.or(current.notes);
        let invoice_number = update.invoice_number.or(current.invoice_number);
        self.db
            .purchases()
            .update_details(&mut tx, purchase_id, notes.as_deref(), invoice_number.as_deref())
            .await?;
        let updated = self.get_in(&mut tx, purchase_id).await?;
        self.db.commit(tx).await?;

        info!(purchase_id = %purchase_id, "Purchase updated");
        Ok(updated)
    }

    /// Takes the goods back out and reverses the cost.
    ///
    /// ## Errors
    /// * `NotFound`
    /// * `PurchaseAlreadyCancelled`
    /// * `InsufficientStock` - part of the goods already left the branch
    /// * `AccountHasPayments` - the payable was partly paid
    pub async fn cancel_purchase(&self, purchase_id: &str, actor: &Actor) -> LedgerResult<Purchase> {
        debug!(purchase_id = %purchase_id, actor_id = %actor.id, "cancel_purchase");

        let mut tx = self.db.begin().await?;
        let mut purchase = self.get_in(&mut tx, purchase_id).await?;
        if purchase.status == DocumentStatus::Cancelled {
            return Err(CoreError::PurchaseAlreadyCancelled(purchase.id).into());
        }

        let items = self.db.purchases().items(&mut tx, &purchase.id).await?;
        let requirements = rules::requirements_by_product(
            items.iter().map(|item| (item.product_id.as_str(), item.base_quantity)),
        )?;
        for (product_id, required) in &requirements {
            self.stock
                .check_in(&mut tx, product_id, &purchase.branch_id, *required)
                .await?;
        }

        let payable = match purchase.purchase_type {
            TradeType::Credit => {
                let account = self.credit.find_by_purchase_in(&mut tx, &purchase.id).await?;
                if let Some(account) = &account {
                    account.ensure_no_payments()?;
                }
                account
            }
            TradeType::Cash => None,
        };

        for item in &items {
            self.stock
                .take_in(&mut tx, &item.product_id, &purchase.branch_id, item.base_quantity)
                .await?;
        }

        match (purchase.purchase_type, payable) {
            (TradeType::Credit, Some(account)) => {
                self.credit.remove_in(&mut tx, &account).await?;
            }
            (TradeType::Cash, _) if purchase.total_cents > 0 => {
                let movement = NewCashMovement::new(
                    &purchase.branch_id,
                    CashMovementType::Income,
                    CashCategory::Adjustment,
                    purchase.total_cents,
                    purchase.payment_method.unwrap_or_default(),
                    format!("Cancelación de compra {}", purchase.id),
                )
                .for_purchase(&purchase.id);
                self.cash.record_in(&mut tx, &actor.id, movement).await?;
            }
            _ => {}
        }

        let now = Utc::now();
        if !self
            .db
            .purchases()
            .mark_cancelled(&mut tx, &purchase.id, &actor.id, now)
            .await?
        {
            return Err(CoreError::PurchaseAlreadyCancelled(purchase.id).into());
        }
        self.db.commit(tx).await?;

        purchase.status = DocumentStatus::Cancelled;
        purchase.cancelled_by = Some(actor.id.clone());
        purchase.cancelled_at = Some(now);
        purchase.updated_at = now;

        info!(purchase_id = %purchase.id, total_cents = purchase.total_cents, "Purchase cancelled");
        Ok(purchase)
    }

    pub async fn get_purchase(&self, purchase_id: &str) -> LedgerResult<PurchaseDetail> {
        let mut conn = self.db.acquire().await?;
        let purchase = self.get_in(&mut conn, purchase_id).await?;
        let items = self.db.purchases().items(&mut conn, purchase_id).await?;

        Ok(PurchaseDetail { purchase, items })
    }

    pub async fn list_by_branch(
        &self,
        branch_id: &str,
        range: DateRange,
    ) -> LedgerResult<Vec<Purchase>> {
        let mut conn = self.db.acquire().await?;
        Ok(self.db.purchases().list_by_branch(&mut conn, branch_id, range).await?)
    }

    async fn get_in(&self, conn: &mut SqliteConnection, purchase_id: &str) -> LedgerResult<Purchase> {
        self.db
            .purchases()
            .get(conn, purchase_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Purchase", purchase_id))
    }

    async fn resolve_items(
        &self,
        conn: &mut SqliteConnection,
        purchase_id: &str,
        new: &NewPurchase,
    ) -> LedgerResult<Vec<PurchaseItem>> {
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
            let subtotal_cents = rules::line_subtotal(line.unit_cost_cents, line.quantity)?.cents();
            if !base_quantity.is_positive() {
                return Err(ValidationError::must_be_positive("quantity").into());
            }

            items.push(PurchaseItem {
                id: generate_id(ids::PURCHASE_ITEM),
                purchase_id: purchase_id.to_string(),
                product_id: product.id,
                quantity: line.quantity,
                unit_cost_cents: line.unit_cost_cents,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{cashier_a, seed_basics, test_ledger};
    use almacen_core::{
        ErrorKind, NewPurchaseItem, NewSale, NewSaleItem, PaymentInput, PaymentMethod, Quantity,
    };
    use chrono::Duration;

    fn purchase(purchase_type: TradeType, units: i64) -> NewPurchase {
        NewPurchase {
            branch_id: "BR-A".to_string(),
            supplier_id: "SUP-1".to_string(),
            purchase_type,
            payment_method: Some(PaymentMethod::Transfer),
            invoice_number: Some("F-1001".to_string()),
            notes: None,
            items: vec![NewPurchaseItem {
                product_id: "PRD-2".to_string(),
                quantity: Quantity::from_units(units),
                unit_cost_cents: 700,
                unit_id: None,
            }],
        }
    }

    async fn quantity_at(ledger: &crate::Ledger, product_id: &str) -> Quantity {
        ledger
            .stock()
            .find_by_product_and_branch(product_id, "BR-A")
            .await
            .unwrap()
            .map(|s| s.quantity)
            .unwrap_or_else(Quantity::zero)
    }

    #[tokio::test]
    async fn test_cash_purchase_receives_and_cancels() {
        let ledger = test_ledger().await;
        seed_basics(&ledger).await;
        let actor = cashier_a();

        let detail = ledger
            .purchases()
            .create_purchase(&actor, purchase(TradeType::Cash, 20))
            .await
            .unwrap();
        assert_eq!(detail.purchase.total_cents, 14_000);
        assert_eq!(quantity_at(&ledger, "PRD-2").await, Quantity::from_units(20));

        let created_row = ledger
            .stock()
            .find_by_product_and_branch("PRD-2", "BR-A")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(created_row.min_stock, Quantity::from_units(10));
        assert_eq!(created_row.max_stock, Quantity::from_units(1000));
        assert_eq!(
            ledger.cash().balance("BR-A", DateRange::all()).await.unwrap().cents(),
            -14_000
        );

        let cancelled = ledger
            .purchases()
            .cancel_purchase(&detail.purchase.id, &actor)
            .await
            .unwrap();
        assert_eq!(cancelled.status, DocumentStatus::Cancelled);
        assert_eq!(quantity_at(&ledger, "PRD-2").await, Quantity::zero());
        assert_eq!(ledger.cash().balance("BR-A", DateRange::all()).await.unwrap(), Money::zero());

        let err = ledger
            .purchases()
            .cancel_purchase(&detail.purchase.id, &actor)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PurchaseAlreadyCancelled);
    }

    #[tokio::test]
    async fn test_purchase_total_past_i64_is_rejected_without_side_effects() {
        let ledger = test_ledger().await;
        seed_basics(&ledger).await;

        let mut huge = purchase(TradeType::Cash, 10_000_000_000_000);
        huge.items[0].unit_cost_cents = 10_000_000;

        let err = ledger
            .purchases()
            .create_purchase(&cashier_a(), huge)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert_eq!(quantity_at(&ledger, "PRD-2").await, Quantity::zero());
        assert!(ledger
            .cash()
            .find_by_branch("BR-A", DateRange::all())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_cancel_needs_goods_on_the_shelf() {
        let ledger = test_ledger().await;
        seed_basics(&ledger).await;
        let actor = cashier_a();

        let detail = ledger
            .purchases()
            .create_purchase(&actor, purchase(TradeType::Cash, 5))
            .await
            .unwrap();
        ledger
            .sales()
            .create_sale(
                &actor,
                NewSale {
                    branch_id: "BR-A".to_string(),
                    customer_id: None,
                    sale_type: TradeType::Cash,
                    payment_method: None,
                    discount_cents: 0,
                    notes: None,
                    items: vec![NewSaleItem {
                        product_id: "PRD-2".to_string(),
                        quantity: Quantity::from_units(2),
                        unit_price_cents: 1_000,
                        unit_id: None,
                    }],
                },
            )
            .await
            .unwrap();

        let err = ledger
            .purchases()
            .cancel_purchase(&detail.purchase.id, &actor)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
        assert_eq!(quantity_at(&ledger, "PRD-2").await, Quantity::from_units(3));
        let stored = ledger.purchases().get_purchase(&detail.purchase.id).await.unwrap();
        assert_eq!(stored.purchase.status, DocumentStatus::Active);
    }

    #[tokio::test]
    async fn test_credit_purchase_opens_payable() {
        let ledger = test_ledger().await;
        seed_basics(&ledger).await;
        let actor = cashier_a();

        let detail = ledger
            .purchases()
            .create_purchase(&actor, purchase(TradeType::Credit, 10))
            .await
            .unwrap();
        let payable = ledger
            .credit()
            .find_by_purchase(&detail.purchase.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payable.account_type, CreditType::Cpp);
        assert_eq!(payable.total_cents, 7_000);
        assert_eq!(payable.counterparty_id, "SUP-1");
        assert!(ledger.cash().find_by_branch("BR-A", DateRange::all()).await.unwrap().is_empty());

        ledger
            .credit()
            .register_payment(
                &actor,
                &payable.id,
                PaymentInput {
                    amount_cents: 1_000,
                    payment_method: PaymentMethod::Transfer,
                    reference: None,
                    notes: None,
                },
            )
            .await
            .unwrap();
        let err = ledger
            .purchases()
            .cancel_purchase(&detail.purchase.id, &actor)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccountHasPayments);
        assert_eq!(quantity_at(&ledger, "PRD-2").await, Quantity::from_units(10));
    }

    #[tokio::test]
    async fn test_update_window() {
        let ledger = test_ledger().await;
        seed_basics(&ledger).await;
        let actor = cashier_a();

        let detail = ledger
            .purchases()
            .create_purchase(&actor, purchase(TradeType::Cash, 1))
            .await
            .unwrap();
        let updated = ledger
            .purchases()
            .update_purchase(
                &detail.purchase.id,
                PurchaseUpdate {
                    notes: Some("llegó incompleto".to_string()),
                    invoice_number: None,
                },
                &actor,
            )
            .await
            .unwrap();
        assert_eq!(updated.notes.as_deref(), Some("llegó incompleto"));
        assert_eq!(updated.invoice_number.as_deref(), Some("F-1001"));

        let old = Utc::now() - Duration::days(8);
        sqlx::query("UPDATE purchases SET created_at = ?1 WHERE id = ?2")
            .bind(old)
            .bind(&detail.purchase.id)
            .execute(ledger.db().pool())
            .await
            .unwrap();

        let err = ledger
            .purchases()
            .update_purchase(&detail.purchase.id, PurchaseUpdate::default(), &actor)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PurchaseTooOldToEdit);
    }
}
