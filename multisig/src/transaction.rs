//! Vault transaction records

use covault_core::{Address, Amount, Timestamp, TxId};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a vault transaction
///
/// `Executed` and `Declined` are terminal: once reached, no further
/// approve, revoke, execute, or decline is permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    Pending,
    Executed,
    Declined,
}

impl TxStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TxStatus::Pending)
    }
}

/// A proposed action tracked by the vault
///
/// Core fields are immutable after creation; only `status` and
/// `execution_date` mutate, through the quorum engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Sequential identifier, equal to the ledger index
    pub id: TxId,
    /// Target identity for the action
    pub destination: Address,
    /// Amount of the underlying asset to transfer
    pub value: Amount,
    /// Opaque bytes forwarded to the execution collaborator
    pub payload: Vec<u8>,
    /// Stamped at execution, `Timestamp::ZERO` while pending
    pub execution_date: Timestamp,
    /// Current lifecycle status
    pub status: TxStatus,
}

impl Transaction {
    pub fn new(id: TxId, destination: Address, value: Amount, payload: Vec<u8>) -> Self {
        Self {
            id,
            destination,
            value,
            payload,
            execution_date: Timestamp::ZERO,
            status: TxStatus::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == TxStatus::Pending
    }
}
