//! Core traits defining COVAULT interfaces
//!
//! The vault never performs value transfers itself; it hands finalized
//! transactions to an [`Executor`] implementation provided by the host.

use crate::error::VaultResult;
use crate::types::{Address, Amount};
use async_trait::async_trait;

/// Outcome of an executor call
///
/// `return_data` carries the collaborator's raw response so a caller can
/// diagnose failures without inspecting collaborator internals.
#[derive(Debug, Clone, Default)]
pub struct CallOutcome {
    pub success: bool,
    pub return_data: Vec<u8>,
}

impl CallOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            return_data: Vec::new(),
        }
    }

    pub fn failed(return_data: impl Into<Vec<u8>>) -> Self {
        Self {
            success: false,
            return_data: return_data.into(),
        }
    }
}

/// Execution collaborator boundary
///
/// Performs the actual value transfer for an executed transaction.
/// Implementations report business failure via `CallOutcome::success`;
/// an `Err` is reserved for transport-level problems.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn invoke(
        &self,
        destination: Address,
        value: Amount,
        payload: &[u8],
    ) -> VaultResult<CallOutcome>;
}
