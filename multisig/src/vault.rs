//! Vault - transaction ledger and quorum engine
//!
//! Owns the registry, the append-only transaction ledger, the approval
//! sets, and the pending counter. Every state-changing operation takes
//! the authenticated caller identity as its first argument; the host
//! environment serializes top-level calls, so methods take `&mut self`
//! and no internal locking is needed.

use covault_core::{
    Address, Amount, Executor, Timestamp, TxId, VaultConfig, VaultError, VaultResult,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::events::VaultEvent;
use crate::registry::OwnerRegistry;
use crate::selfcall::PrivilegedOp;
use crate::transaction::{Transaction, TxStatus};

/// Quorum-gated shared account
///
/// Generic over the execution collaborator, the way the host substitutes
/// production or test behavior at the boundary.
pub struct Vault<E: Executor> {
    /// The vault's own identity; self-call destination
    address: Address,
    registry: OwnerRegistry,
    transactions: Vec<Transaction>,
    approvals: HashMap<TxId, HashSet<Address>>,
    pending: u64,
    events: Vec<VaultEvent>,
    event_tx: Option<mpsc::Sender<VaultEvent>>,
    executor: E,
}

/// Assign the next sequential identifier, refusing to exhaust the id space
fn next_tx_id(count: u64) -> VaultResult<TxId> {
    if count == u64::MAX {
        return Err(VaultError::Overflow);
    }
    Ok(TxId::new(count))
}

impl<E: Executor> Vault<E> {
    /// Create a vault from a validated configuration
    pub fn new(address: Address, config: VaultConfig, executor: E) -> VaultResult<Self> {
        let registry = OwnerRegistry::new(config)?;
        info!(
            "Vault {} created: {} owners, threshold {}",
            address,
            registry.owners().len(),
            registry.threshold()
        );
        Ok(Self {
            address,
            registry,
            transactions: Vec::new(),
            approvals: HashMap::new(),
            pending: 0,
            events: Vec::new(),
            event_tx: None,
            executor,
        })
    }

    /// Attach a channel receiving committed events
    pub fn set_event_channel(&mut self, tx: mpsc::Sender<VaultEvent>) {
        self.event_tx = Some(tx);
    }

    // ============ State-changing operations ============

    /// Accept an incoming value transfer with no payload
    ///
    /// Balance accounting belongs to the execution substrate; the vault
    /// only validates and records the deposit.
    pub fn deposit(&mut self, from: Address, value: Amount) -> VaultResult<()> {
        let mark = self.events.len();
        if value.is_zero() {
            return Err(VaultError::ZeroDepositValue);
        }
        self.events.push(VaultEvent::FundsDeposited { from, value });
        info!("Deposit of {} from {}", value, from);
        self.forward_from(mark);
        Ok(())
    }

    /// Propose a new transaction, returning its identifier
    pub fn propose(
        &mut self,
        caller: Address,
        destination: Address,
        value: Amount,
        payload: Vec<u8>,
    ) -> VaultResult<TxId> {
        let mark = self.events.len();
        let id = self.propose_inner(caller, destination, value, payload)?;
        self.forward_from(mark);
        Ok(id)
    }

    /// Propose and immediately approve as the same caller
    pub fn propose_and_approve(
        &mut self,
        caller: Address,
        destination: Address,
        value: Amount,
        payload: Vec<u8>,
    ) -> VaultResult<TxId> {
        let mark = self.events.len();
        let id = self.propose_inner(caller, destination, value, payload)?;
        self.approve_inner(caller, id)?;
        self.forward_from(mark);
        Ok(id)
    }

    /// Record the caller's approval of a pending transaction
    pub fn approve(&mut self, caller: Address, id: TxId) -> VaultResult<()> {
        let mark = self.events.len();
        self.approve_inner(caller, id)?;
        self.forward_from(mark);
        Ok(())
    }

    /// Withdraw a previously recorded approval
    ///
    /// Fails with `NotPreviouslyApproved` when the caller's flag is
    /// unset; the approval count can never go negative or drift from
    /// the flags.
    pub fn revoke(&mut self, caller: Address, id: TxId) -> VaultResult<()> {
        let mark = self.events.len();
        self.require_owner(caller)?;
        self.pending_index(id)?;

        let set = self.approvals.entry(id).or_default();
        if !set.remove(&caller) {
            return Err(VaultError::NotPreviouslyApproved { id, owner: caller });
        }

        self.events.push(VaultEvent::ApprovalRevoked { owner: caller, id });
        debug!("{} revoked approval of {}", caller, id);
        self.forward_from(mark);
        Ok(())
    }

    /// Execute a transaction once approvals meet the threshold
    ///
    /// Status flips to `Executed` and the pending counter drops before
    /// control transfers to the collaborator, so any reentrant observer
    /// sees the transaction as already terminal. A collaborator failure
    /// rolls the whole operation back.
    pub async fn execute(&mut self, caller: Address, id: TxId) -> VaultResult<()> {
        let mark = self.events.len();
        self.execute_inner(caller, id).await?;
        self.forward_from(mark);
        Ok(())
    }

    /// Approve then execute as one atomic caller action
    ///
    /// A failed execute rolls the approval back as well; callers who
    /// want the approval to stick use `approve` and `execute` separately.
    pub async fn approve_and_execute(&mut self, caller: Address, id: TxId) -> VaultResult<()> {
        let mark = self.events.len();
        self.approve_inner(caller, id)?;

        if let Err(err) = self.execute_inner(caller, id).await {
            if let Some(set) = self.approvals.get_mut(&id) {
                set.remove(&caller);
            }
            self.events.truncate(mark);
            return Err(err);
        }

        self.forward_from(mark);
        Ok(())
    }

    /// Decline a pending transaction
    ///
    /// Reachable only through the privileged self-call path; any direct
    /// external invocation fails with `UnauthorizedCaller`.
    pub fn decline(&mut self, caller: Address, id: TxId) -> VaultResult<()> {
        let mark = self.events.len();
        self.decline_inner(caller, id)?;
        self.forward_from(mark);
        Ok(())
    }

    /// Replace the owner set and threshold
    ///
    /// Reachable only through the privileged self-call path, and only
    /// while no transactions are pending - quorum rules never shift
    /// under in-flight proposals.
    pub fn update_owners(
        &mut self,
        caller: Address,
        new_owners: Vec<Address>,
        new_threshold: u32,
    ) -> VaultResult<()> {
        let mark = self.events.len();
        self.update_owners_inner(caller, new_owners, new_threshold)?;
        self.forward_from(mark);
        Ok(())
    }

    // ============ Read accessors ============

    /// The vault's own identity
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn is_owner(&self, identity: &Address) -> bool {
        self.registry.is_owner(identity)
    }

    pub fn owners(&self) -> &[Address] {
        self.registry.owners()
    }

    pub fn threshold(&self) -> u32 {
        self.registry.threshold()
    }

    /// Number of distinct approvals recorded for a transaction
    pub fn approval_count(&self, id: TxId) -> u32 {
        self.approvals.get(&id).map(|s| s.len() as u32).unwrap_or(0)
    }

    pub fn has_approved(&self, id: TxId, owner: &Address) -> bool {
        self.approvals
            .get(&id)
            .map(|s| s.contains(owner))
            .unwrap_or(false)
    }

    /// Look up a transaction by id
    pub fn get(&self, id: TxId) -> VaultResult<&Transaction> {
        usize::try_from(id.as_u64())
            .ok()
            .and_then(|idx| self.transactions.get(idx))
            .ok_or(VaultError::NotFound(id))
    }

    /// Up to `limit` transactions starting at `start`, in ledger order
    ///
    /// Lazy and restartable; empty when `start` is out of range or
    /// `limit` is zero, clamped to the available remainder otherwise.
    pub fn get_range(&self, start: TxId, limit: usize) -> impl Iterator<Item = &Transaction> {
        let skip = usize::try_from(start.as_u64()).unwrap_or(usize::MAX);
        self.transactions.iter().skip(skip).take(limit)
    }

    pub fn status(&self, id: TxId) -> VaultResult<TxStatus> {
        Ok(self.get(id)?.status)
    }

    /// Live count of transactions in `Pending` status
    pub fn pending_count(&self) -> u64 {
        self.pending
    }

    /// Total number of transactions ever proposed
    pub fn count(&self) -> u64 {
        self.transactions.len() as u64
    }

    /// Committed audit trail
    pub fn events(&self) -> &[VaultEvent] {
        &self.events
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    // ============ Internals ============
    //
    // Inner operations uphold one invariant: on `Err`, vault state
    // including the event log is untouched; on `Ok`, state is mutated
    // and events are recorded but not yet forwarded to the channel.

    fn require_owner(&self, caller: Address) -> VaultResult<()> {
        if !self.registry.is_owner(&caller) {
            return Err(VaultError::NotAnOwner(caller));
        }
        Ok(())
    }

    /// Resolve a pending transaction's ledger index
    fn pending_index(&self, id: TxId) -> VaultResult<usize> {
        let idx = usize::try_from(id.as_u64()).map_err(|_| VaultError::NotFound(id))?;
        let tx = self.transactions.get(idx).ok_or(VaultError::NotFound(id))?;
        match tx.status {
            TxStatus::Pending => Ok(idx),
            TxStatus::Executed => Err(VaultError::AlreadyExecuted(id)),
            TxStatus::Declined => Err(VaultError::AlreadyDeclined(id)),
        }
    }

    fn propose_inner(
        &mut self,
        caller: Address,
        destination: Address,
        value: Amount,
        payload: Vec<u8>,
    ) -> VaultResult<TxId> {
        self.require_owner(caller)?;

        let id = next_tx_id(self.transactions.len() as u64)?;
        self.transactions
            .push(Transaction::new(id, destination, value, payload));
        self.approvals.insert(id, HashSet::new());
        self.pending += 1;

        self.events.push(VaultEvent::Submitted { proposer: caller, id });
        debug!("{} proposed {} to {} ({})", caller, id, destination, value);
        Ok(id)
    }

    fn approve_inner(&mut self, caller: Address, id: TxId) -> VaultResult<()> {
        self.require_owner(caller)?;
        self.pending_index(id)?;

        let set = self.approvals.entry(id).or_default();
        if !set.insert(caller) {
            return Err(VaultError::AlreadyApproved { id, owner: caller });
        }

        self.events.push(VaultEvent::Approved { owner: caller, id });
        debug!(
            "{} approved {} ({}/{})",
            caller,
            id,
            self.approval_count(id),
            self.registry.threshold()
        );
        Ok(())
    }

    async fn execute_inner(&mut self, caller: Address, id: TxId) -> VaultResult<()> {
        let mark = self.events.len();
        self.require_owner(caller)?;
        let idx = self.pending_index(id)?;

        let required = self.registry.threshold();
        let approvals = self.approval_count(id);
        if approvals < required {
            return Err(VaultError::InsufficientApprovals {
                required,
                approvals,
            });
        }

        // Finalize before handing control to the collaborator: a
        // reentrant call observes the transaction as already terminal.
        {
            let tx = &mut self.transactions[idx];
            tx.status = TxStatus::Executed;
            tx.execution_date = Timestamp::now();
        }
        self.pending -= 1;
        self.events.push(VaultEvent::Executed { executor: caller, id });

        let (destination, value, payload) = {
            let tx = &self.transactions[idx];
            (tx.destination, tx.value, tx.payload.clone())
        };

        let result = if destination == self.address {
            self.dispatch_self_call(&payload)
        } else {
            match self.executor.invoke(destination, value, &payload).await {
                Ok(outcome) if outcome.success => Ok(()),
                Ok(outcome) => Err(VaultError::ExecutionFailed(outcome.return_data)),
                Err(err) => Err(err),
            }
        };

        if let Err(err) = result {
            // All-or-nothing at the call boundary: undo the status flip,
            // the counter decrement, and the recorded notification.
            let tx = &mut self.transactions[idx];
            tx.status = TxStatus::Pending;
            tx.execution_date = Timestamp::ZERO;
            self.pending += 1;
            self.events.truncate(mark);
            warn!("Execution of {} failed: {}", id, err);
            return Err(err);
        }

        info!("{} executed by {}", id, caller);
        Ok(())
    }

    /// Decode a self-call payload and dispatch the privileged operation
    ///
    /// Any inner failure surfaces as `ExecutionFailed` carrying the
    /// rendered error as return data, so callers can diagnose the cause.
    fn dispatch_self_call(&mut self, payload: &[u8]) -> VaultResult<()> {
        let own = self.address;
        let result = match PrivilegedOp::decode(payload) {
            Ok(PrivilegedOp::UpdateOwners { owners, threshold }) => {
                self.update_owners_inner(own, owners, threshold)
            }
            Ok(PrivilegedOp::Decline { id }) => self.decline_inner(own, id),
            Err(err) => Err(err),
        };

        result.map_err(|err| VaultError::ExecutionFailed(err.to_string().into_bytes()))
    }

    fn decline_inner(&mut self, caller: Address, id: TxId) -> VaultResult<()> {
        if caller != self.address {
            return Err(VaultError::UnauthorizedCaller);
        }

        let idx = self.pending_index(id)?;
        self.transactions[idx].status = TxStatus::Declined;
        self.pending -= 1;

        self.events.push(VaultEvent::Declined { id });
        info!("{} declined", id);
        Ok(())
    }

    fn update_owners_inner(
        &mut self,
        caller: Address,
        new_owners: Vec<Address>,
        new_threshold: u32,
    ) -> VaultResult<()> {
        if caller != self.address {
            return Err(VaultError::UnauthorizedCaller);
        }

        if self.pending > 0 {
            return Err(VaultError::PendingTransactionsExist(self.pending));
        }

        self.registry.replace(new_owners, new_threshold)?;

        self.events.push(VaultEvent::OwnersUpdated {
            owners: self.registry.owners().to_vec(),
            threshold: self.registry.threshold(),
        });
        Ok(())
    }

    /// Forward newly committed events to the attached channel
    fn forward_from(&mut self, mark: usize) {
        if let Some(tx) = &self.event_tx {
            for event in &self.events[mark..] {
                if tx.try_send(event.clone()).is_err() {
                    warn!("Event channel full or closed, monitor update dropped");
                }
            }
        }
    }
}

/// Shared vault handle
///
/// Models the host's strict sequential processing of state-changing
/// calls: one writer at a time, every operation fully applied before
/// the next begins.
pub type SharedVault<E> = Arc<Mutex<Vault<E>>>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::RecordingExecutor;

    fn addr(byte: u8) -> Address {
        Address([byte; 32])
    }

    const VAULT: u8 = 0xAA;

    fn owners() -> (Address, Address, Address) {
        (addr(1), addr(2), addr(3))
    }

    fn setup() -> Vault<RecordingExecutor> {
        setup_with(RecordingExecutor::accepting())
    }

    fn setup_with(executor: RecordingExecutor) -> Vault<RecordingExecutor> {
        let (o1, o2, o3) = owners();
        Vault::new(
            addr(VAULT),
            VaultConfig::new(vec![o1, o2, o3], 2),
            executor,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_transfer_executes_under_quorum() {
        let (o1, o2, _) = owners();
        let mut vault = setup();

        let id = vault
            .propose_and_approve(o1, addr(9), Amount::new(1), vec![])
            .unwrap();
        assert_eq!(vault.pending_count(), 1);

        vault.approve_and_execute(o2, id).await.unwrap();

        let tx = vault.get(id).unwrap();
        assert_eq!(tx.status, TxStatus::Executed);
        assert!(tx.execution_date > Timestamp::ZERO);
        assert_eq!(vault.pending_count(), 0);

        let executions = vault
            .events()
            .iter()
            .filter(|e| matches!(e, VaultEvent::Executed { .. }))
            .count();
        assert_eq!(executions, 1);

        let calls = vault.executor().calls();
        assert_eq!(calls, vec![(addr(9), Amount::new(1), vec![])]);
    }

    #[tokio::test]
    async fn test_decline_via_self_call() {
        let (o1, o2, o3) = owners();
        let mut vault = setup();

        let x = vault.propose(o1, addr(9), Amount::new(5), vec![]).unwrap();

        let payload = PrivilegedOp::Decline { id: x }.encode().unwrap();
        let killer = vault
            .propose_and_approve(o1, vault.address(), Amount::ZERO, payload)
            .unwrap();
        vault.approve_and_execute(o2, killer).await.unwrap();

        assert_eq!(vault.status(x).unwrap(), TxStatus::Declined);
        assert_eq!(vault.pending_count(), 0);
        assert!(matches!(
            vault.approve(o3, x),
            Err(VaultError::AlreadyDeclined(id)) if id == x
        ));
    }

    #[tokio::test]
    async fn test_insufficient_approvals_leaves_pending() {
        let (o1, o2, _) = owners();
        let mut vault = setup();

        let id = vault
            .propose_and_approve(o1, addr(9), Amount::new(1), vec![])
            .unwrap();

        let result = vault.execute(o2, id).await;
        assert!(matches!(
            result,
            Err(VaultError::InsufficientApprovals {
                required: 2,
                approvals: 1
            })
        ));
        assert_eq!(vault.status(id).unwrap(), TxStatus::Pending);
        assert_eq!(vault.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_owner_update_rolls_back() {
        let (o1, o2, o3) = owners();
        let mut vault = setup();

        let payload = PrivilegedOp::UpdateOwners {
            owners: vec![],
            threshold: 1,
        }
        .encode()
        .unwrap();
        let id = vault
            .propose_and_approve(o1, vault.address(), Amount::ZERO, payload)
            .unwrap();
        vault.approve(o2, id).unwrap();

        let result = vault.execute(o1, id).await;
        match result {
            Err(VaultError::ExecutionFailed(data)) => {
                let msg = String::from_utf8(data).unwrap();
                assert!(msg.contains("empty"), "unexpected return data: {msg}");
            }
            other => panic!("expected ExecutionFailed, got {other:?}"),
        }

        // Registry unchanged, transaction rolled back to pending
        assert!(vault.is_owner(&o1) && vault.is_owner(&o2) && vault.is_owner(&o3));
        assert_eq!(vault.threshold(), 2);
        assert_eq!(vault.status(id).unwrap(), TxStatus::Pending);
        assert_eq!(vault.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_collaborator_failure_rolls_back() {
        let (o1, o2, _) = owners();
        let mut vault = setup_with(RecordingExecutor::rejecting(b"out of funds".to_vec()));

        let id = vault
            .propose_and_approve(o1, addr(9), Amount::new(1), vec![])
            .unwrap();
        vault.approve(o2, id).unwrap();

        let result = vault.execute(o1, id).await;
        assert!(matches!(
            result,
            Err(VaultError::ExecutionFailed(ref data)) if data == b"out of funds"
        ));

        assert_eq!(vault.status(id).unwrap(), TxStatus::Pending);
        assert_eq!(vault.pending_count(), 1);
        assert_eq!(vault.get(id).unwrap().execution_date, Timestamp::ZERO);
        assert!(!vault
            .events()
            .iter()
            .any(|e| matches!(e, VaultEvent::Executed { .. })));
    }

    #[test]
    fn test_non_owner_rejected() {
        let (o1, _, _) = owners();
        let mut vault = setup();
        let outsider = addr(9);

        assert!(matches!(
            vault.propose(outsider, addr(8), Amount::new(1), vec![]),
            Err(VaultError::NotAnOwner(a)) if a == outsider
        ));

        let id = vault.propose(o1, addr(8), Amount::new(1), vec![]).unwrap();
        assert!(matches!(
            vault.approve(outsider, id),
            Err(VaultError::NotAnOwner(_))
        ));
    }

    #[test]
    fn test_double_approve_rejected() {
        let (o1, _, _) = owners();
        let mut vault = setup();

        let id = vault
            .propose_and_approve(o1, addr(9), Amount::new(1), vec![])
            .unwrap();
        assert!(matches!(
            vault.approve(o1, id),
            Err(VaultError::AlreadyApproved { owner, .. }) if owner == o1
        ));
        assert_eq!(vault.approval_count(id), 1);
    }

    #[test]
    fn test_revoke_requires_prior_approval() {
        let (o1, o2, _) = owners();
        let mut vault = setup();

        let id = vault
            .propose_and_approve(o1, addr(9), Amount::new(1), vec![])
            .unwrap();

        assert!(matches!(
            vault.revoke(o2, id),
            Err(VaultError::NotPreviouslyApproved { owner, .. }) if owner == o2
        ));
        assert_eq!(vault.approval_count(id), 1);

        vault.revoke(o1, id).unwrap();
        assert_eq!(vault.approval_count(id), 0);
        assert!(!vault.has_approved(id, &o1));
    }

    #[tokio::test]
    async fn test_terminal_status_absorbs_all_operations() {
        let (o1, o2, o3) = owners();
        let mut vault = setup();

        let id = vault
            .propose_and_approve(o1, addr(9), Amount::new(1), vec![])
            .unwrap();
        vault.approve_and_execute(o2, id).await.unwrap();

        assert!(matches!(
            vault.approve(o3, id),
            Err(VaultError::AlreadyExecuted(_))
        ));
        assert!(matches!(
            vault.revoke(o1, id),
            Err(VaultError::AlreadyExecuted(_))
        ));
        assert!(matches!(
            vault.execute(o1, id).await,
            Err(VaultError::AlreadyExecuted(_))
        ));
        assert_eq!(vault.status(id).unwrap(), TxStatus::Executed);
    }

    #[test]
    fn test_direct_privileged_calls_rejected() {
        let (o1, _, _) = owners();
        let mut vault = setup();

        let id = vault.propose(o1, addr(9), Amount::new(1), vec![]).unwrap();

        assert!(matches!(
            vault.decline(o1, id),
            Err(VaultError::UnauthorizedCaller)
        ));
        assert!(matches!(
            vault.update_owners(o1, vec![addr(4)], 1),
            Err(VaultError::UnauthorizedCaller)
        ));
        assert_eq!(vault.status(id).unwrap(), TxStatus::Pending);
    }

    #[tokio::test]
    async fn test_owner_update_via_self_call() {
        let (o1, o2, _) = owners();
        let mut vault = setup();

        let payload = PrivilegedOp::UpdateOwners {
            owners: vec![addr(4), addr(5)],
            threshold: 1,
        }
        .encode()
        .unwrap();
        let id = vault
            .propose_and_approve(o1, vault.address(), Amount::ZERO, payload)
            .unwrap();
        vault.approve_and_execute(o2, id).await.unwrap();

        assert!(vault.is_owner(&addr(4)) && vault.is_owner(&addr(5)));
        assert!(!vault.is_owner(&o1) && !vault.is_owner(&o2));
        assert_eq!(vault.threshold(), 1);
        assert!(vault
            .events()
            .iter()
            .any(|e| matches!(e, VaultEvent::OwnersUpdated { threshold: 1, .. })));

        // Old owners lose proposal rights, new owners gain them
        assert!(matches!(
            vault.propose(o1, addr(9), Amount::new(1), vec![]),
            Err(VaultError::NotAnOwner(_))
        ));
        vault.propose(addr(4), addr(9), Amount::new(1), vec![]).unwrap();
    }

    #[tokio::test]
    async fn test_pending_gate_blocks_owner_update() {
        let (o1, o2, _) = owners();
        let mut vault = setup();

        // An unrelated in-flight proposal freezes the registry
        vault.propose(o1, addr(9), Amount::new(1), vec![]).unwrap();

        let payload = PrivilegedOp::UpdateOwners {
            owners: vec![addr(4), addr(5)],
            threshold: 1,
        }
        .encode()
        .unwrap();
        let id = vault
            .propose_and_approve(o1, vault.address(), Amount::ZERO, payload)
            .unwrap();
        vault.approve(o2, id).unwrap();

        let result = vault.execute(o1, id).await;
        match result {
            Err(VaultError::ExecutionFailed(data)) => {
                let msg = String::from_utf8(data).unwrap();
                assert!(msg.contains("pending"), "unexpected return data: {msg}");
            }
            other => panic!("expected ExecutionFailed, got {other:?}"),
        }

        assert!(vault.is_owner(&o1));
        assert!(!vault.is_owner(&addr(4)));
        assert_eq!(vault.status(id).unwrap(), TxStatus::Pending);
        assert_eq!(vault.pending_count(), 2);
    }

    #[test]
    fn test_get_range_clamps_and_restarts() {
        let (o1, _, _) = owners();
        let mut vault = setup();
        for i in 0..3u8 {
            vault
                .propose(o1, addr(9), Amount::new(i as u64 + 1), vec![])
                .unwrap();
        }

        let ids: Vec<TxId> = vault.get_range(TxId::new(1), 10).map(|tx| tx.id).collect();
        assert_eq!(ids, vec![TxId::new(1), TxId::new(2)]);

        assert_eq!(vault.get_range(TxId::new(9), 1).count(), 0);
        assert_eq!(vault.get_range(TxId::new(0), 0).count(), 0);

        // Restartable: a second pass yields the same sequence
        let again: Vec<TxId> = vault.get_range(TxId::new(1), 10).map(|tx| tx.id).collect();
        assert_eq!(again, ids);
    }

    #[test]
    fn test_approval_count_matches_flags() {
        let (o1, o2, o3) = owners();
        let mut vault = setup();

        let id = vault.propose(o1, addr(9), Amount::new(1), vec![]).unwrap();
        vault.approve(o1, id).unwrap();
        vault.approve(o2, id).unwrap();

        let flagged = [o1, o2, o3]
            .iter()
            .filter(|o| vault.has_approved(id, o))
            .count() as u32;
        assert_eq!(vault.approval_count(id), flagged);
        assert!(vault.approval_count(id) <= vault.owners().len() as u32);

        vault.revoke(o1, id).unwrap();
        assert_eq!(vault.approval_count(id), 1);
        assert!(!vault.has_approved(id, &o1));
        assert!(vault.has_approved(id, &o2));
    }

    #[test]
    fn test_deposit() {
        let mut vault = setup();
        let outsider = addr(9);

        assert!(matches!(
            vault.deposit(outsider, Amount::ZERO),
            Err(VaultError::ZeroDepositValue)
        ));

        // Deposits are open to non-owners
        vault.deposit(outsider, Amount::new(100)).unwrap();
        assert_eq!(
            vault.events().last(),
            Some(&VaultEvent::FundsDeposited {
                from: outsider,
                value: Amount::new(100)
            })
        );
    }

    #[test]
    fn test_id_space_overflow() {
        assert!(matches!(next_tx_id(u64::MAX), Err(VaultError::Overflow)));
        assert_eq!(next_tx_id(5).unwrap(), TxId::new(5));
    }

    #[test]
    fn test_propose_and_approve_is_one_action() {
        let (o1, _, _) = owners();
        let mut vault = setup();

        let id = vault
            .propose_and_approve(o1, addr(9), Amount::new(1), vec![])
            .unwrap();

        assert_eq!(vault.count(), 1);
        assert!(vault.has_approved(id, &o1));
        assert_eq!(
            vault.events(),
            &[
                VaultEvent::Submitted { proposer: o1, id },
                VaultEvent::Approved { owner: o1, id },
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_approve_and_execute_rolls_back_approval() {
        let (o1, o2, _) = owners();
        let mut vault = setup_with(RecordingExecutor::rejecting(b"no".to_vec()));

        let id = vault
            .propose_and_approve(o1, addr(9), Amount::new(1), vec![])
            .unwrap();

        let result = vault.approve_and_execute(o2, id).await;
        assert!(matches!(result, Err(VaultError::ExecutionFailed(_))));

        // The combo is all-or-nothing: the approval is gone too
        assert!(!vault.has_approved(id, &o2));
        assert_eq!(vault.approval_count(id), 1);
        assert!(!vault
            .events()
            .iter()
            .any(|e| matches!(e, VaultEvent::Approved { owner, .. } if *owner == o2)));
    }

    #[tokio::test]
    async fn test_event_channel_sees_committed_events_only() {
        let (o1, o2, _) = owners();
        let mut vault = setup_with(RecordingExecutor::rejecting(b"no".to_vec()));
        let (tx, mut rx) = mpsc::channel(16);
        vault.set_event_channel(tx);

        let id = vault
            .propose_and_approve(o1, addr(9), Amount::new(1), vec![])
            .unwrap();
        let _ = vault.approve_and_execute(o2, id).await;

        assert_eq!(
            rx.try_recv().unwrap(),
            VaultEvent::Submitted { proposer: o1, id }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            VaultEvent::Approved { owner: o1, id }
        );
        // The failed execute forwarded nothing
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_shared_vault_serializes_operations() {
        let (o1, o2, _) = owners();
        let shared: SharedVault<RecordingExecutor> = Arc::new(Mutex::new(setup()));

        let id = {
            let mut vault = shared.lock().await;
            vault
                .propose_and_approve(o1, addr(9), Amount::new(1), vec![])
                .unwrap()
        };

        let handle = {
            let shared = shared.clone();
            tokio::spawn(async move {
                let mut vault = shared.lock().await;
                vault.approve_and_execute(o2, id).await
            })
        };
        handle.await.unwrap().unwrap();

        assert_eq!(shared.lock().await.status(id).unwrap(), TxStatus::Executed);
    }

    #[tokio::test]
    async fn test_balance_ledger_end_to_end() {
        use crate::executor::BalanceLedger;

        let (o1, o2, _) = owners();
        let vault_addr = addr(VAULT);
        let ledger = BalanceLedger::new(vault_addr);
        ledger.credit(vault_addr, Amount::new(100));

        let mut vault = Vault::new(
            vault_addr,
            VaultConfig::new(vec![o1, o2], 2),
            ledger,
        )
        .unwrap();

        let id = vault
            .propose_and_approve(o1, addr(9), Amount::new(40), vec![])
            .unwrap();
        vault.approve_and_execute(o2, id).await.unwrap();

        assert_eq!(vault.executor().balance(&vault_addr), Amount::new(60));
        assert_eq!(vault.executor().balance(&addr(9)), Amount::new(40));

        // A transfer beyond the remaining balance fails and rolls back
        let id = vault
            .propose_and_approve(o1, addr(9), Amount::new(500), vec![])
            .unwrap();
        let result = vault.approve_and_execute(o2, id).await;
        assert!(matches!(result, Err(VaultError::ExecutionFailed(_))));
        assert_eq!(vault.status(id).unwrap(), TxStatus::Pending);
        assert_eq!(vault.executor().balance(&vault_addr), Amount::new(60));
    }

    #[test]
    fn test_get_unknown_id() {
        let vault = setup();
        assert!(matches!(
            vault.get(TxId::new(0)),
            Err(VaultError::NotFound(_))
        ));
        assert_eq!(vault.approval_count(TxId::new(0)), 0);
        assert!(!vault.has_approved(TxId::new(0), &addr(1)));
    }
}
