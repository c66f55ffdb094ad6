//! # Transfer State Machine
//!
//! Pure transition and authorization rules for inter-branch transfers.
//! The workflow in `almacen-ledger` persists state between calls and asks
//! this module, on every step, whether the step is allowed.
//!
//! ## Transitions
//! ```text
//! ┌──────────┬─────────────────────────┬──────────────┬────────────────────┐
//! │ Action   │ Allowed from            │ Goes to      │ Actor must be      │
//! ├──────────┼─────────────────────────┼──────────────┼────────────────────┤
//! │ accept   │ REQUESTED (REQUEST)     │ PENDING      │ source branch      │
//! │ ship     │ PENDING                 │ IN_TRANSIT   │ source branch      │
//! │ receive  │ IN_TRANSIT              │ COMPLETED    │ destination branch │
//! │ cancel   │ REQUESTED, PENDING,     │ CANCELLED    │ source branch or   │
//! │          │ IN_TRANSIT              │              │ administrator      │
//! └──────────┴─────────────────────────┴──────────────┴────────────────────┘
//! ```
//!
//! State is checked before authorization, so a step on a finished transfer
//! reports `InvalidTransferState` whoever asks.

use std::fmt;

use crate::error::{CoreError, CoreResult};
use crate::types::{Actor, Transfer, TransferStatus, TransferType};

/// A step a user can ask a transfer to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferAction {
    Accept,
    Ship,
    Receive,
    Cancel,
}

impl TransferAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferAction::Accept => "accept",
            TransferAction::Ship => "ship",
            TransferAction::Receive => "receive",
            TransferAction::Cancel => "cancel",
        }
    }
}

impl fmt::Display for TransferAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derives the transfer type from who is creating it.
///
/// Members of the destination branch are asking for stock (`REQUEST`);
/// anyone else is pushing it (`SEND`).
pub fn transfer_type_for(actor: &Actor, to_branch_id: &str) -> TransferType {
    if actor.belongs_to(to_branch_id) {
        TransferType::Request
    } else {
        TransferType::Send
    }
}

pub fn initial_status(transfer_type: TransferType) -> TransferStatus {
    match transfer_type {
        TransferType::Request => TransferStatus::Requested,
        TransferType::Send => TransferStatus::Pending,
    }
}

/// A SEND can only be created by the source branch or an administrator.
pub fn authorize_create(
    transfer_id: &str,
    actor: &Actor,
    from_branch_id: &str,
    transfer_type: TransferType,
) -> CoreResult<()> {
    match transfer_type {
        TransferType::Request => Ok(()),
        TransferType::Send if actor.is_admin() || actor.belongs_to(from_branch_id) => Ok(()),
        TransferType::Send => Err(not_authorized(transfer_id, actor, "create")),
    }
}

/// Validates `action` against the transfer's current state and the actor,
/// returning the state the transfer moves to.
pub fn transition(
    transfer: &Transfer,
    actor: &Actor,
    action: TransferAction,
) -> CoreResult<TransferStatus> {
    let next = next_status(transfer, action)?;
    authorize(transfer, actor, action)?;
    Ok(next)
}

/// State check only.
pub fn next_status(transfer: &Transfer, action: TransferAction) -> CoreResult<TransferStatus> {
    use TransferStatus::*;

    let next = match (action, transfer.status) {
        (TransferAction::Accept, Requested) if transfer.transfer_type == TransferType::Request => {
            Some(Pending)
        }
        (TransferAction::Ship, Pending) => Some(InTransit),
        (TransferAction::Receive, InTransit) => Some(Completed),
        (TransferAction::Cancel, Requested | Pending | InTransit) => Some(Cancelled),
        _ => None,
    };

    next.ok_or_else(|| CoreError::InvalidTransferState {
        transfer_id: transfer.id.clone(),
        current: transfer.status,
        action: action.to_string(),
    })
}

/// Authorization check only.
pub fn authorize(transfer: &Transfer, actor: &Actor, action: TransferAction) -> CoreResult<()> {
    let allowed = match action {
        TransferAction::Accept | TransferAction::Ship => actor.belongs_to(&transfer.from_branch_id),
        TransferAction::Receive => actor.belongs_to(&transfer.to_branch_id),
        TransferAction::Cancel => actor.is_admin() || actor.belongs_to(&transfer.from_branch_id),
    };

    if allowed {
        Ok(())
    } else {
        Err(not_authorized(&transfer.id, actor, action.as_str()))
    }
}

fn not_authorized(transfer_id: &str, actor: &Actor, action: &str) -> CoreError {
    CoreError::NotAuthorizedForTransfer {
        transfer_id: transfer_id.to_string(),
        actor_id: actor.id.clone(),
        action: action.to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;
    use chrono::Utc;

    fn transfer(transfer_type: TransferType, status: TransferStatus) -> Transfer {
        Transfer {
            id: "TRF-1".to_string(),
            from_branch_id: "BR-A".to_string(),
            to_branch_id: "BR-B".to_string(),
            transfer_type,
            status,
            notes: None,
            created_by: "u".to_string(),
            created_at: Utc::now(),
            approved_by: None,
            approved_at: None,
            shipped_by: None,
            shipped_at: None,
            completed_by: None,
            completed_at: None,
            cancelled_by: None,
            cancelled_at: None,
        }
    }

    fn at(branch: &str) -> Actor {
        Actor::new(format!("user-{}", branch), Role::Manager, Some(branch))
    }

    #[test]
    fn test_type_derived_from_actor_branch() {
        assert_eq!(transfer_type_for(&at("BR-B"), "BR-B"), TransferType::Request);
        assert_eq!(transfer_type_for(&at("BR-A"), "BR-B"), TransferType::Send);
        assert_eq!(
            transfer_type_for(&Actor::new("root", Role::Admin, None), "BR-B"),
            TransferType::Send
        );
        assert_eq!(initial_status(TransferType::Request), TransferStatus::Requested);
        assert_eq!(initial_status(TransferType::Send), TransferStatus::Pending);
    }

    #[test]
    fn test_send_must_come_from_source_or_admin() {
        assert!(authorize_create("TRF-1", &at("BR-A"), "BR-A", TransferType::Send).is_ok());
        assert!(authorize_create(
            "TRF-1",
            &Actor::new("root", Role::Admin, None),
            "BR-A",
            TransferType::Send
        )
        .is_ok());
        let err =
            authorize_create("TRF-1", &at("BR-C"), "BR-A", TransferType::Send).unwrap_err();
        assert!(matches!(
            err,
            CoreError::NotAuthorizedForTransfer { ref action, .. } if action == "create"
        ));
    }

    #[test]
    fn test_request_sequence() {
        let mut t = transfer(TransferType::Request, TransferStatus::Requested);
        let source = at("BR-A");
        let dest = at("BR-B");

        t.status = transition(&t, &source, TransferAction::Accept).unwrap();
        assert_eq!(t.status, TransferStatus::Pending);
        t.status = transition(&t, &source, TransferAction::Ship).unwrap();
        assert_eq!(t.status, TransferStatus::InTransit);
        t.status = transition(&t, &dest, TransferAction::Receive).unwrap();
        assert_eq!(t.status, TransferStatus::Completed);
    }

    #[test]
    fn test_send_cannot_be_accepted() {
        let t = transfer(TransferType::Send, TransferStatus::Pending);
        assert!(matches!(
            transition(&t, &at("BR-A"), TransferAction::Accept),
            Err(CoreError::InvalidTransferState { current: TransferStatus::Pending, .. })
        ));
    }

    #[test]
    fn test_out_of_order_steps() {
        let requested = transfer(TransferType::Request, TransferStatus::Requested);
        assert!(matches!(
            transition(&requested, &at("BR-A"), TransferAction::Ship),
            Err(CoreError::InvalidTransferState { .. })
        ));
        assert!(matches!(
            transition(&requested, &at("BR-B"), TransferAction::Receive),
            Err(CoreError::InvalidTransferState { .. })
        ));

        for terminal in [TransferStatus::Completed, TransferStatus::Cancelled] {
            let t = transfer(TransferType::Send, terminal);
            let admin = Actor::new("root", Role::Admin, None);
            assert!(matches!(
                transition(&t, &admin, TransferAction::Cancel),
                Err(CoreError::InvalidTransferState { .. })
            ));
        }
    }

    #[test]
    fn test_state_checked_before_authorization() {
        let t = transfer(TransferType::Send, TransferStatus::Completed);
        // Wrong branch AND wrong state: the state error wins.
        assert!(matches!(
            transition(&t, &at("BR-Z"), TransferAction::Ship),
            Err(CoreError::InvalidTransferState { .. })
        ));
    }

    #[test]
    fn test_branch_authorization() {
        let pending = transfer(TransferType::Send, TransferStatus::Pending);
        assert!(matches!(
            transition(&pending, &at("BR-B"), TransferAction::Ship),
            Err(CoreError::NotAuthorizedForTransfer { .. })
        ));

        let in_transit = transfer(TransferType::Send, TransferStatus::InTransit);
        assert!(matches!(
            transition(&in_transit, &at("BR-A"), TransferAction::Receive),
            Err(CoreError::NotAuthorizedForTransfer { .. })
        ));

        // Only the source branch or an admin can cancel.
        assert!(matches!(
            transition(&pending, &at("BR-B"), TransferAction::Cancel),
            Err(CoreError::NotAuthorizedForTransfer { .. })
        ));
        assert_eq!(
            transition(&pending, &Actor::new("root", Role::Admin, None), TransferAction::Cancel)
                .unwrap(),
            TransferStatus::Cancelled
        );
        assert_eq!(
            transition(&in_transit, &at("BR-A"), TransferAction::Cancel).unwrap(),
            TransferStatus::Cancelled
        );
    }
}
