//! End-to-end business scenarios driven through the public `Ledger` API.

use chrono::{Duration, Utc};

use almacen_core::{
    Actor, CreditStatus, CreditType, DateRange, DocumentStatus, ErrorKind, Money, NewBranch,
    NewCustomer, NewProduct, NewSale, NewSaleItem, NewStock, NewSupplier, NewTransfer,
    NewTransferItem, PaymentInput, PaymentMethod, Quantity, Role, TradeType, TransferStatus,
};
use almacen_db::{Database, DbConfig};
use almacen_ledger::{Ledger, LedgerConfig};

struct World {
    ledger: Ledger,
    branch_a: String,
    branch_b: String,
    product: String,
    customer: String,
}

impl World {
    fn cashier_a(&self) -> Actor {
        Actor::new("cajero-a", Role::Cashier, Some(&self.branch_a))
    }

    fn cashier_b(&self) -> Actor {
        Actor::new("cajero-b", Role::Cashier, Some(&self.branch_b))
    }

    async fn quantity_at(&self, branch_id: &str) -> Quantity {
        self.ledger
            .stock()
            .find_by_product_and_branch(&self.product, branch_id)
            .await
            .unwrap()
            .map(|s| s.quantity)
            .unwrap_or_else(Quantity::zero)
    }

    async fn cash_balance(&self, branch_id: &str) -> Money {
        self.ledger.cash().balance(branch_id, DateRange::all()).await.unwrap()
    }

    fn sale(&self, sale_type: TradeType, units: i64, price_cents: i64) -> NewSale {
        NewSale {
            branch_id: self.branch_a.clone(),
            customer_id: match sale_type {
                TradeType::Credit => Some(self.customer.clone()),
                TradeType::Cash => None,
            },
            sale_type,
            payment_method: Some(PaymentMethod::Cash),
            discount_cents: 0,
            notes: None,
            items: vec![NewSaleItem {
                product_id: self.product.clone(),
                quantity: Quantity::from_units(units),
                unit_price_cents: price_cents,
                unit_id: None,
            }],
        }
    }
}

/// Two branches, one product with 100 units at A, a customer with a 5000
/// credit limit and a supplier.
async fn world() -> World {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let ledger = Ledger::new(db, LedgerConfig::default());
    let catalog = ledger.catalog();

    let branch_a = catalog
        .create_branch(NewBranch {
            name: "Matriz".to_string(),
            address: None,
        })
        .await
        .unwrap();
    let branch_b = catalog
        .create_branch(NewBranch {
            name: "Norte".to_string(),
            address: None,
        })
        .await
        .unwrap();
    let product = catalog
        .create_product(NewProduct {
            sku: "ARR-1KG".to_string(),
            name: "Arroz 1 kg".to_string(),
            unit: String::new(),
            cost_price_cents: 50,
            retail_price_cents: 100,
            wholesale_price_cents: 90,
        })
        .await
        .unwrap();
    ledger
        .stock()
        .create(NewStock {
            product_id: product.id.clone(),
            branch_id: branch_a.id.clone(),
            quantity: Quantity::from_units(100),
            min_stock: Quantity::from_units(10),
            max_stock: Quantity::from_units(1000),
        })
        .await
        .unwrap();
    let customer = catalog
        .create_customer(NewCustomer {
            name: "Abarrotes Lupita".to_string(),
            credit_limit_cents: 5_000,
            credit_days: None,
        })
        .await
        .unwrap();
    catalog
        .create_supplier(NewSupplier {
            name: "Distribuidora del Golfo".to_string(),
            credit_days: Some(30),
        })
        .await
        .unwrap();

    World {
        ledger,
        branch_a: branch_a.id,
        branch_b: branch_b.id,
        product: product.id,
        customer: customer.id,
    }
}

#[tokio::test]
async fn requested_transfer_moves_stock_between_branches() {
    let w = world().await;
    let transfers = w.ledger.transfers();

    let request = NewTransfer {
        from_branch_id: w.branch_a.clone(),
        to_branch_id: w.branch_b.clone(),
        notes: Some("reposición semanal".to_string()),
        items: vec![NewTransferItem {
            product_id: w.product.clone(),
            quantity: Quantity::from_units(20),
        }],
    };
    let created = transfers.create_transfer(&w.cashier_b(), request).await.unwrap();
    let id = created.transfer.id;

    transfers.accept(&id, &w.cashier_a()).await.unwrap();
    transfers.ship(&id, &w.cashier_a()).await.unwrap();
    assert_eq!(w.quantity_at(&w.branch_a).await, Quantity::from_units(80));
    assert_eq!(w.quantity_at(&w.branch_b).await, Quantity::zero());

    let done = transfers.receive(&id, &w.cashier_b()).await.unwrap();
    assert_eq!(done.status, TransferStatus::Completed);
    assert_eq!(w.quantity_at(&w.branch_a).await, Quantity::from_units(80));
    assert_eq!(w.quantity_at(&w.branch_b).await, Quantity::from_units(20));
}

#[tokio::test]
async fn cash_sale_cancelled_same_day_nets_to_zero() {
    let w = world().await;
    assert_eq!(w.cash_balance(&w.branch_a).await, Money::zero());

    let detail = w
        .ledger
        .sales()
        .create_sale(&w.cashier_a(), w.sale(TradeType::Cash, 10, 100))
        .await
        .unwrap();
    assert_eq!(detail.sale.total_cents, 1_000);
    assert_eq!(w.cash_balance(&w.branch_a).await, Money::from_cents(1_000));
    assert_eq!(w.quantity_at(&w.branch_a).await, Quantity::from_units(90));

    let cancelled = w
        .ledger
        .sales()
        .cancel_sale(&detail.sale.id, &w.cashier_a())
        .await
        .unwrap();
    assert_eq!(cancelled.status, DocumentStatus::Cancelled);
    assert_eq!(w.cash_balance(&w.branch_a).await, Money::zero());
    assert_eq!(w.quantity_at(&w.branch_a).await, Quantity::from_units(100));

    let summary = w.ledger.cash().summary(&w.branch_a, DateRange::all()).await.unwrap();
    assert_eq!(summary.income_cents, 1_000);
    assert_eq!(summary.expense_cents, 1_000);
    assert_eq!(summary.movement_count, 2);
}

#[tokio::test]
async fn sale_from_an_earlier_day_cannot_be_cancelled() {
    let w = world().await;
    let detail = w
        .ledger
        .sales()
        .create_sale(&w.cashier_a(), w.sale(TradeType::Cash, 5, 100))
        .await
        .unwrap();

    sqlx::query("UPDATE sales SET created_at = ?1 WHERE id = ?2")
        .bind(Utc::now() - Duration::days(2))
        .bind(&detail.sale.id)
        .execute(w.ledger.db().pool())
        .await
        .unwrap();

    let err = w
        .ledger
        .sales()
        .cancel_sale(&detail.sale.id, &w.cashier_a())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SaleNotFromToday);
    assert_eq!(w.quantity_at(&w.branch_a).await, Quantity::from_units(95));
    assert_eq!(w.cash_balance(&w.branch_a).await, Money::from_cents(500));
}

#[tokio::test]
async fn credit_sale_respects_the_customer_limit() {
    let w = world().await;
    let sales = w.ledger.sales();

    let err = sales
        .create_sale(&w.cashier_a(), w.sale(TradeType::Credit, 60, 100))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CreditLimitExceeded);
    assert_eq!(w.ledger.debt().current(&w.customer).await.unwrap(), Money::zero());
    assert_eq!(w.quantity_at(&w.branch_a).await, Quantity::from_units(100));

    let detail = sales
        .create_sale(&w.cashier_a(), w.sale(TradeType::Credit, 40, 100))
        .await
        .unwrap();
    assert_eq!(
        w.ledger.debt().current(&w.customer).await.unwrap(),
        Money::from_cents(4_000)
    );
    // Credit sales do not touch the cash journal.
    assert_eq!(w.cash_balance(&w.branch_a).await, Money::zero());

    let account = w.ledger.credit().find_by_sale(&detail.sale.id).await.unwrap().unwrap();
    assert_eq!(account.account_type, CreditType::Cxc);
    assert_eq!(account.status, CreditStatus::Pendiente);
    assert_eq!(account.total_cents, 4_000);

    let err = sales
        .create_sale(&w.cashier_a(), w.sale(TradeType::Credit, 11, 100))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CreditLimitExceeded);
}

#[tokio::test]
async fn paid_receivable_blocks_sale_cancellation() {
    let w = world().await;
    let detail = w
        .ledger
        .sales()
        .create_sale(&w.cashier_a(), w.sale(TradeType::Credit, 30, 100))
        .await
        .unwrap();
    let account = w.ledger.credit().find_by_sale(&detail.sale.id).await.unwrap().unwrap();

    let payment = PaymentInput {
        amount_cents: 1_000,
        payment_method: PaymentMethod::Cash,
        reference: None,
        notes: None,
    };
    let registered = w
        .ledger
        .credit()
        .register_payment(&w.cashier_a(), &account.id, payment.clone())
        .await
        .unwrap();
    assert_eq!(registered.account.status, CreditStatus::PagadoParcial);
    assert_eq!(registered.account.balance_cents, 2_000);
    assert_eq!(w.cash_balance(&w.branch_a).await, Money::from_cents(1_000));
    assert_eq!(
        w.ledger.debt().current(&w.customer).await.unwrap(),
        Money::from_cents(2_000)
    );

    let err = w
        .ledger
        .sales()
        .cancel_sale(&detail.sale.id, &w.cashier_a())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AccountHasPayments);
    let sale = w.ledger.sales().get_sale(&detail.sale.id).await.unwrap();
    assert_eq!(sale.sale.status, DocumentStatus::Active);
    assert_eq!(w.quantity_at(&w.branch_a).await, Quantity::from_units(70));
}

#[tokio::test]
async fn rejected_overpayment_can_be_retried_without_drift() {
    let w = world().await;
    let detail = w
        .ledger
        .sales()
        .create_sale(&w.cashier_a(), w.sale(TradeType::Credit, 10, 100))
        .await
        .unwrap();
    let account = w.ledger.credit().find_by_sale(&detail.sale.id).await.unwrap().unwrap();
    let credit = w.ledger.credit();

    let too_much = PaymentInput {
        amount_cents: 1_001,
        payment_method: PaymentMethod::Card,
        reference: Some("AUT-1".to_string()),
        notes: None,
    };
    for _ in 0..2 {
        let err = credit
            .register_payment(&w.cashier_a(), &account.id, too_much.clone())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PaymentExceedsBalance);
    }

    let unchanged = credit.find_by_id(&account.id).await.unwrap();
    assert_eq!(unchanged.paid_cents, 0);
    assert_eq!(unchanged.balance_cents, 1_000);
    assert!(credit.payments(&account.id).await.unwrap().is_empty());
    assert_eq!(w.cash_balance(&w.branch_a).await, Money::zero());
    assert_eq!(
        w.ledger.debt().current(&w.customer).await.unwrap(),
        Money::from_cents(1_000)
    );

    let settle = PaymentInput {
        amount_cents: 1_000,
        ..too_much
    };
    let registered = credit
        .register_payment(&w.cashier_a(), &account.id, settle.clone())
        .await
        .unwrap();
    assert_eq!(registered.account.status, CreditStatus::Pagado);
    assert_eq!(w.ledger.debt().current(&w.customer).await.unwrap(), Money::zero());

    let err = credit
        .register_payment(&w.cashier_a(), &account.id, settle)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AccountAlreadyPaid);
}

/// Cancelling after shipment does not return the goods to the source.
#[tokio::test]
async fn cancelling_in_transit_transfer_loses_the_shipped_stock() {
    let w = world().await;
    let transfers = w.ledger.transfers();

    let send = NewTransfer {
        from_branch_id: w.branch_a.clone(),
        to_branch_id: w.branch_b.clone(),
        notes: None,
        items: vec![NewTransferItem {
            product_id: w.product.clone(),
            quantity: Quantity::from_units(15),
        }],
    };
    let created = transfers.create_transfer(&w.cashier_a(), send).await.unwrap();
    let id = created.transfer.id;
    assert_eq!(created.transfer.status, TransferStatus::Pending);

    transfers.ship(&id, &w.cashier_a()).await.unwrap();
    assert_eq!(w.quantity_at(&w.branch_a).await, Quantity::from_units(85));

    let admin = Actor::new("admin", Role::Admin, None);
    let cancelled = transfers.cancel(&id, &admin).await.unwrap();
    assert_eq!(cancelled.status, TransferStatus::Cancelled);
    assert_eq!(cancelled.cancelled_by.as_deref(), Some("admin"));

    assert_eq!(w.quantity_at(&w.branch_a).await, Quantity::from_units(85));
    assert_eq!(w.quantity_at(&w.branch_b).await, Quantity::zero());

    let err = transfers.receive(&id, &w.cashier_b()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransferState);
}
