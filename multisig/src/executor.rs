//! Executor implementations
//!
//! The vault depends on the [`Executor`] boundary abstractly; these are
//! the in-process implementations. `BalanceLedger` is a minimal balance
//! substrate; `RecordingExecutor` is a programmable double for tests.

use async_trait::async_trait;
use covault_core::{Address, Amount, CallOutcome, Executor, VaultResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

/// In-memory balance substrate
///
/// Holds one account per address. `invoke` debits the configured source
/// account and credits the destination; a shortfall is reported as a
/// failed outcome with a diagnostic message, not an error.
pub struct BalanceLedger {
    source: Address,
    balances: RwLock<HashMap<Address, Amount>>,
}

impl BalanceLedger {
    /// Create a ledger that debits `source` on every invoke
    pub fn new(source: Address) -> Self {
        Self {
            source,
            balances: RwLock::new(HashMap::new()),
        }
    }

    /// Credit an account (deposits, genesis funding)
    pub fn credit(&self, account: Address, value: Amount) {
        let mut balances = self.balances.write();
        let balance = balances.entry(account).or_insert(Amount::ZERO);
        *balance = balance.checked_add(value).unwrap_or(Amount::MAX);
    }

    /// Current balance of an account
    pub fn balance(&self, account: &Address) -> Amount {
        self.balances
            .read()
            .get(account)
            .copied()
            .unwrap_or(Amount::ZERO)
    }
}

#[async_trait]
impl Executor for BalanceLedger {
    async fn invoke(
        &self,
        destination: Address,
        value: Amount,
        _payload: &[u8],
    ) -> VaultResult<CallOutcome> {
        let mut balances = self.balances.write();
        let available = balances.get(&self.source).copied().unwrap_or(Amount::ZERO);

        let remaining = match available.checked_sub(value) {
            Some(remaining) => remaining,
            None => {
                let msg = format!(
                    "insufficient balance: required {}, available {}",
                    value, available
                );
                debug!("Transfer to {} rejected: {}", destination, msg);
                return Ok(CallOutcome::failed(msg.into_bytes()));
            }
        };

        balances.insert(self.source, remaining);
        let credited = balances.entry(destination).or_insert(Amount::ZERO);
        *credited = match credited.checked_add(value) {
            Some(total) => total,
            None => {
                return Ok(CallOutcome::failed(
                    b"destination balance overflow".to_vec(),
                ))
            }
        };

        debug!("Transferred {} from {} to {}", value, self.source, destination);
        Ok(CallOutcome::ok())
    }
}

/// Programmable executor for tests
///
/// Records every call and answers with a fixed outcome.
#[derive(Default)]
pub struct RecordingExecutor {
    fail_with: Option<Vec<u8>>,
    calls: RwLock<Vec<(Address, Amount, Vec<u8>)>>,
}

impl RecordingExecutor {
    /// Always reports success
    pub fn accepting() -> Self {
        Self::default()
    }

    /// Always reports failure with the given return data
    pub fn rejecting(return_data: impl Into<Vec<u8>>) -> Self {
        Self {
            fail_with: Some(return_data.into()),
            calls: RwLock::new(Vec::new()),
        }
    }

    /// Calls seen so far
    pub fn calls(&self) -> Vec<(Address, Amount, Vec<u8>)> {
        self.calls.read().clone()
    }
}

#[async_trait]
impl Executor for RecordingExecutor {
    async fn invoke(
        &self,
        destination: Address,
        value: Amount,
        payload: &[u8],
    ) -> VaultResult<CallOutcome> {
        self.calls
            .write()
            .push((destination, value, payload.to_vec()));

        match &self.fail_with {
            Some(data) => Ok(CallOutcome::failed(data.clone())),
            None => Ok(CallOutcome::ok()),
        }
    }
}
