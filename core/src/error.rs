//! Error types for COVAULT

use crate::types::{Address, TxId};
use thiserror::Error;

/// Main error type for COVAULT
///
/// Every failure aborts the whole operation with no partial state
/// change; retry is a caller policy.
#[derive(Error, Debug)]
pub enum VaultError {
    // ============ Authorization Errors ============
    #[error("Caller is not authorized for this operation")]
    UnauthorizedCaller,

    #[error("Caller {0} is not a registered owner")]
    NotAnOwner(Address),

    // ============ Not-Found Errors ============
    #[error("Transaction {0} not found")]
    NotFound(TxId),

    // ============ State-Conflict Errors ============
    #[error("Transaction {id} already approved by {owner}")]
    AlreadyApproved { id: TxId, owner: Address },

    #[error("Transaction {id} was never approved by {owner}")]
    NotPreviouslyApproved { id: TxId, owner: Address },

    #[error("Transaction {0} already executed")]
    AlreadyExecuted(TxId),

    #[error("Transaction {0} already declined")]
    AlreadyDeclined(TxId),

    #[error("Insufficient approvals: required {required}, have {approvals}")]
    InsufficientApprovals { required: u32, approvals: u32 },

    // ============ Validation Errors ============
    #[error("Owner set must not be empty")]
    EmptyOwnerSet,

    #[error("Invalid threshold {threshold} for {owners} owners")]
    InvalidThreshold { threshold: u32, owners: u32 },

    #[error("{0} transactions still pending, owner set is frozen")]
    PendingTransactionsExist(u64),

    #[error("Zero address at owner index {index}")]
    ZeroAddressOwner { index: usize },

    #[error("Duplicate owner {0}")]
    DuplicateOwner(Address),

    #[error("Deposit value must be nonzero")]
    ZeroDepositValue,

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    // ============ Resource Errors ============
    #[error("Transaction identifier space exhausted")]
    Overflow,

    // ============ Downstream Errors ============
    #[error("Execution collaborator reported failure ({} bytes of return data)", .0.len())]
    ExecutionFailed(Vec<u8>),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type for COVAULT operations
pub type VaultResult<T> = Result<T, VaultError>;
