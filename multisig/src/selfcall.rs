//! Privileged self-call payloads
//!
//! Administrative actions are first-class quorum-gated transactions: a
//! proposal whose destination is the vault itself carries one of these
//! operations as its payload. The execute path decodes and dispatches
//! them internally; they are never reachable from outside.

use covault_core::{Address, TxId, VaultError, VaultResult};
use serde::{Deserialize, Serialize};

/// Closed set of operations the vault may perform on itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrivilegedOp {
    /// Replace the owner set and threshold
    UpdateOwners {
        owners: Vec<Address>,
        threshold: u32,
    },
    /// Decline a pending transaction
    Decline { id: TxId },
}

impl PrivilegedOp {
    /// Encode into a transaction payload
    pub fn encode(&self) -> VaultResult<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| VaultError::InvalidPayload(format!("encode failed: {e}")))
    }

    /// Decode from a self-call transaction payload
    pub fn decode(payload: &[u8]) -> VaultResult<Self> {
        bincode::deserialize(payload)
            .map_err(|e| VaultError::InvalidPayload(format!("decode failed: {e}")))
    }
}
