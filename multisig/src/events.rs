//! Vault notifications
//!
//! Every state change emits an event carrying the acting identity (where
//! applicable) and the transaction id, forming an audit trail external
//! monitors can subscribe to.

use covault_core::{Address, Amount, TxId};
use serde::Serialize;

/// Events emitted by the vault
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum VaultEvent {
    /// Incoming value transfer accepted
    FundsDeposited { from: Address, value: Amount },
    /// New transaction proposed
    Submitted { proposer: Address, id: TxId },
    /// Owner approval recorded
    Approved { owner: Address, id: TxId },
    /// Owner approval withdrawn
    ApprovalRevoked { owner: Address, id: TxId },
    /// Transaction executed under quorum
    Executed { executor: Address, id: TxId },
    /// Transaction declined via the privileged path
    Declined { id: TxId },
    /// Owner set and threshold replaced
    OwnersUpdated { owners: Vec<Address>, threshold: u32 },
}

impl VaultEvent {
    /// Transaction the event refers to, if any
    pub fn tx_id(&self) -> Option<TxId> {
        match self {
            VaultEvent::Submitted { id, .. }
            | VaultEvent::Approved { id, .. }
            | VaultEvent::ApprovalRevoked { id, .. }
            | VaultEvent::Executed { id, .. }
            | VaultEvent::Declined { id } => Some(*id),
            VaultEvent::FundsDeposited { .. } | VaultEvent::OwnersUpdated { .. } => None,
        }
    }
}
