//! # Transfer Workflow
//!
//! Moves stock between branches through a persisted state machine. Each
//! call re-reads the transfer, asks `almacen_core::transfer` whether the
//! step is allowed, applies its stock effect and saves the new state only
//! if nobody moved the transfer in between.
//!
//! ## Stock Effects
//! ```text
//! create (SEND)   check source stock, nothing moves
//! accept          re-check source stock, nothing moves
//! ship            source   -= items
//! receive         dest     += items (row created if absent)
//! cancel          nothing; goods shipped before cancelling stay out of
//!                 the source branch
//! ```

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use almacen_core::ids::{self, generate_id};
use almacen_core::transfer::{self as machine, TransferAction};
use almacen_core::{
    rules, validation, Actor, NewTransfer, Transfer, TransferDetail, TransferItem, TransferStatus,
};
use almacen_db::{Database, DbError, SqliteConnection};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::stock::{ensure_branch, ensure_product, StockLedger};

#[derive(Debug, Clone)]
pub struct TransferWorkflow {
    db: Database,
    stock: StockLedger,
}

impl TransferWorkflow {
    pub fn new(db: Database, config: Arc<LedgerConfig>) -> Self {
        TransferWorkflow {
            stock: StockLedger::new(db.clone(), config),
            db,
        }
    }

    /// Opens a transfer. Its type follows from the actor: a member of the
    /// destination branch is requesting, anyone else is sending.
    ///
    /// ## Errors
    /// * `ValidationError` - same branch twice, empty or non-positive items
    /// * `NotFound` - either branch or a product
    /// * `NotAuthorizedForTransfer` - a SEND by someone outside the source
    /// * `InsufficientStock` - a SEND the source cannot cover
    pub async fn create_transfer(&self, actor: &Actor, new: NewTransfer) -> LedgerResult<TransferDetail> {
        debug!(from = %new.from_branch_id, to = %new.to_branch_id, items = new.items.len(), "create_transfer");
        validation::validate_new_transfer(&new)?;

        let transfer_id = generate_id(ids::TRANSFER);
        let transfer_type = machine::transfer_type_for(actor, &new.to_branch_id);
        machine::authorize_create(&transfer_id, actor, &new.from_branch_id, transfer_type)?;

        let mut tx = self.db.begin().await?;
        ensure_branch(&self.db, &mut tx, &new.from_branch_id).await?;
        ensure_branch(&self.db, &mut tx, &new.to_branch_id).await?;
        for item in &new.items {
            ensure_product(&self.db, &mut tx, &item.product_id).await?;
        }

        let items: Vec<TransferItem> = new
            .items
            .iter()
            .map(|item| TransferItem {
                id: generate_id(ids::TRANSFER_ITEM),
                transfer_id: transfer_id.clone(),
                product_id: item.product_id.clone(),
                quantity: item.quantity,
            })
            .collect();

        let status = machine::initial_status(transfer_type);
        if status == TransferStatus::Pending {
            self.check_source_in(&mut tx, &new.from_branch_id, &items).await?;
        }

        let transfer = Transfer {
            id: transfer_id,
            from_branch_id: new.from_branch_id,
            to_branch_id: new.to_branch_id,
            transfer_type,
            status,
            notes: new.notes,
            created_by: actor.id.clone(),
            created_at: Utc::now(),
            approved_by: None,
            approved_at: None,
            shipped_by: None,
            shipped_at: None,
            completed_by: None,
            completed_at: None,
            cancelled_by: None,
            cancelled_at: None,
        };
        self.db.transfers().insert(&mut tx, &transfer).await?;
        for item in &items {
            self.db.transfers().insert_item(&mut tx, item).await?;
        }
        self.db.commit(tx).await?;

        info!(
            transfer_id = %transfer.id,
            transfer_type = ?transfer.transfer_type,
            status = %transfer.status,
            "Transfer created"
        );
        Ok(TransferDetail { transfer, items })
    }

    /// The source branch agrees to a REQUEST.
    pub async fn accept(&self, transfer_id: &str, actor: &Actor) -> LedgerResult<Transfer> {
        self.step(transfer_id, actor, TransferAction::Accept).await
    }

    /// The source branch sends the goods out.
    pub async fn ship(&self, transfer_id: &str, actor: &Actor) -> LedgerResult<Transfer> {
        self.step(transfer_id, actor, TransferAction::Ship).await
    }

    /// The destination branch takes the goods in.
    pub async fn receive(&self, transfer_id: &str, actor: &Actor) -> LedgerResult<Transfer> {
        self.step(transfer_id, actor, TransferAction::Receive).await
    }

    /// Cancels an unfinished transfer without reversing any stock.
    pub async fn cancel(&self, transfer_id: &str, actor: &Actor) -> LedgerResult<Transfer> {
        self.step(transfer_id, actor, TransferAction::Cancel).await
    }

    pub async fn get_transfer(&self, transfer_id: &str) -> LedgerResult<TransferDetail> {
        let mut conn = self.db.acquire().await?;
        let transfer = self.get_in(&mut conn, transfer_id).await?;
        let items = self.db.transfers().items(&mut conn, transfer_id).await?;

        Ok(TransferDetail { transfer, items })
    }

    /// Transfers where the branch is either side, newest first.
    pub async fn list_for_branch(&self, branch_id: &str) -> LedgerResult<Vec<Transfer>> {
        let mut conn = self.db.acquire().await?;
        Ok(self.db.transfers().list_for_branch(&mut conn, branch_id).await?)
    }

    async fn step(
        &self,
        transfer_id: &str,
        actor: &Actor,
        action: TransferAction,
    ) -> LedgerResult<Transfer> {
        debug!(transfer_id = %transfer_id, actor_id = %actor.id, action = %action, "transfer step");

        let mut tx = self.db.begin().await?;
        let mut transfer = self.get_in(&mut tx, transfer_id).await?;
        let expected = transfer.status;
        let next = machine::transition(&transfer, actor, action)?;
        let items = self.db.transfers().items(&mut tx, transfer_id).await?;
        let now = Utc::now();

        match action {
            TransferAction::Accept => {
                self.check_source_in(&mut tx, &transfer.from_branch_id, &items).await?;
                transfer.approved_by = Some(actor.id.clone());
                transfer.approved_at = Some(now);
            }
            TransferAction::Ship => {
                for item in &items {
                    self.stock
                        .take_in(&mut tx, &item.product_id, &transfer.from_branch_id, item.quantity)
                        .await?;
                }
                transfer.shipped_by = Some(actor.id.clone());
                transfer.shipped_at = Some(now);
            }
            TransferAction::Receive => {
                for item in &items {
                    self.stock
                        .receive_in(&mut tx, &item.product_id, &transfer.to_branch_id, item.quantity)
                        .await?;
                }
                transfer.completed_by = Some(actor.id.clone());
                transfer.completed_at = Some(now);
            }
            TransferAction::Cancel => {
                if expected == TransferStatus::InTransit {
                    warn!(transfer_id = %transfer.id, "Cancelling a shipped transfer; goods are not returned to the source");
                }
                transfer.cancelled_by = Some(actor.id.clone());
                transfer.cancelled_at = Some(now);
            }
        }
        transfer.status = next;

        if !self
            .db
            .transfers()
            .save_transition(&mut tx, &transfer, expected)
            .await?
        {
            // Another step moved it first; report against the stored state.
            let current = self.get_in(&mut tx, transfer_id).await?;
            machine::next_status(&current, action)?;
            return Err(DbError::TransactionFailed(format!(
                "transfer {} modified concurrently",
                transfer_id
            ))
            .into());
        }
        self.db.commit(tx).await?;

        info!(
            transfer_id = %transfer.id,
            action = %action,
            from = %expected,
            to = %transfer.status,
            "Transfer moved"
        );
        Ok(transfer)
    }

    async fn check_source_in(
        &self,
        conn: &mut SqliteConnection,
        from_branch_id: &str,
        items: &[TransferItem],
    ) -> LedgerResult<()> {
        let requirements = rules::requirements_by_product(
            items.iter().map(|item| (item.product_id.as_str(), item.quantity)),
        )?;
        for (product_id, required) in &requirements {
            self.stock
                .check_in(conn, product_id, from_branch_id, *required)
                .await?;
        }
        Ok(())
    }

    async fn get_in(&self, conn: &mut SqliteConnection, transfer_id: &str) -> LedgerResult<Transfer> {
        self.db
            .transfers()
            .get(conn, transfer_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Transfer", transfer_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{admin, cashier_a, cashier_b, seed_basics, test_ledger};
    use almacen_core::{ErrorKind, NewTransferItem, Quantity, Role, TransferType};

    fn transfer(units: i64) -> NewTransfer {
        NewTransfer {
            from_branch_id: "BR-A".to_string(),
            to_branch_id: "BR-B".to_string(),
            notes: None,
            items: vec![NewTransferItem {
                product_id: "PRD-1".to_string(),
                quantity: Quantity::from_units(units),
            }],
        }
    }

    async fn quantity_at(ledger: &crate::Ledger, branch_id: &str) -> Quantity {
        ledger
            .stock()
            .find_by_product_and_branch("PRD-1", branch_id)
            .await
            .unwrap()
            .map(|s| s.quantity)
            .unwrap_or_else(Quantity::zero)
    }

    #[tokio::test]
    async fn test_request_goes_through_every_state() {
        let ledger = test_ledger().await;
        seed_basics(&ledger).await;
        let transfers = ledger.transfers();

        let created = transfers.create_transfer(&cashier_b(), transfer(10)).await.unwrap();
        assert_eq!(created.transfer.transfer_type, TransferType::Request);
        assert_eq!(created.transfer.status, TransferStatus::Requested);
        let id = created.transfer.id.clone();

        let err = transfers.ship(&id, &cashier_a()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransferState);

        let err = transfers.accept(&id, &cashier_b()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAuthorizedForTransfer);

        let accepted = transfers.accept(&id, &cashier_a()).await.unwrap();
        assert_eq!(accepted.status, TransferStatus::Pending);
        assert_eq!(accepted.approved_by.as_deref(), Some(cashier_a().id.as_str()));
        assert_eq!(quantity_at(&ledger, "BR-A").await, Quantity::from_units(50));

        transfers.ship(&id, &cashier_a()).await.unwrap();
        assert_eq!(quantity_at(&ledger, "BR-A").await, Quantity::from_units(40));
        assert_eq!(quantity_at(&ledger, "BR-B").await, Quantity::zero());

        let err = transfers.receive(&id, &cashier_a()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAuthorizedForTransfer);

        let done = transfers.receive(&id, &cashier_b()).await.unwrap();
        assert_eq!(done.status, TransferStatus::Completed);
        assert_eq!(quantity_at(&ledger, "BR-B").await, Quantity::from_units(10));

        let err = transfers.cancel(&id, &admin()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransferState);

        let stored = transfers.get_transfer(&id).await.unwrap();
        assert_eq!(stored.transfer.status, TransferStatus::Completed);
        assert_eq!(stored.items.len(), 1);
    }

    #[tokio::test]
    async fn test_send_checks_but_does_not_move_stock() {
        let ledger = test_ledger().await;
        seed_basics(&ledger).await;
        let transfers = ledger.transfers();

        let err = transfers.create_transfer(&cashier_a(), transfer(51)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);

        let created = transfers.create_transfer(&cashier_a(), transfer(20)).await.unwrap();
        assert_eq!(created.transfer.transfer_type, TransferType::Send);
        assert_eq!(created.transfer.status, TransferStatus::Pending);
        assert_eq!(quantity_at(&ledger, "BR-A").await, Quantity::from_units(50));

        let err = transfers.accept(&created.transfer.id, &cashier_a()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransferState);
    }

    #[tokio::test]
    async fn test_send_requires_source_member_or_admin() {
        let ledger = test_ledger().await;
        seed_basics(&ledger).await;
        let outsider = Actor::new("u-c", Role::Cashier, Some("BR-C"));

        let err = ledger
            .transfers()
            .create_transfer(&outsider, transfer(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAuthorizedForTransfer);

        let created = ledger.transfers().create_transfer(&admin(), transfer(1)).await.unwrap();
        assert_eq!(created.transfer.transfer_type, TransferType::Send);
    }

    #[tokio::test]
    async fn test_validation_and_missing_refs() {
        let ledger = test_ledger().await;
        seed_basics(&ledger).await;

        let mut same = transfer(1);
        same.to_branch_id = "BR-A".to_string();
        let err = ledger.transfers().create_transfer(&admin(), same).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);

        let mut unknown = transfer(1);
        unknown.to_branch_id = "BR-404".to_string();
        let err = ledger.transfers().create_transfer(&admin(), unknown).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = ledger.transfers().ship("TRF-404", &admin()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
