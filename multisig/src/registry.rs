//! Owner registry
//!
//! Holds the current owner set and approval threshold. Membership lookup
//! is O(1); the ordered list is preserved for read accessors.

use covault_core::{Address, VaultConfig, VaultError, VaultResult};
use std::collections::HashSet;
use tracing::info;

/// The set of authorized identities and the approval threshold
#[derive(Debug, Clone)]
pub struct OwnerRegistry {
    owners: Vec<Address>,
    members: HashSet<Address>,
    threshold: u32,
}

impl OwnerRegistry {
    /// Create from a validated configuration
    pub fn new(config: VaultConfig) -> VaultResult<Self> {
        config.validate()?;
        let members = config.owners.iter().copied().collect();
        Ok(Self {
            owners: config.owners,
            members,
            threshold: config.threshold,
        })
    }

    /// Replace the whole owner set and threshold
    ///
    /// All-or-nothing: every entry is validated before any state moves,
    /// so a partial replacement is never observable. The pending-ledger
    /// gate is the vault's responsibility and is checked before this is
    /// reached.
    pub fn replace(&mut self, new_owners: Vec<Address>, new_threshold: u32) -> VaultResult<()> {
        if new_owners.is_empty() {
            return Err(VaultError::EmptyOwnerSet);
        }

        if new_threshold == 0 || new_threshold as usize > new_owners.len() {
            return Err(VaultError::InvalidThreshold {
                threshold: new_threshold,
                owners: new_owners.len() as u32,
            });
        }

        let mut new_members = HashSet::with_capacity(new_owners.len());
        for (index, owner) in new_owners.iter().enumerate() {
            if owner.is_zero() {
                return Err(VaultError::ZeroAddressOwner { index });
            }
            if !new_members.insert(*owner) {
                return Err(VaultError::DuplicateOwner(*owner));
            }
        }

        self.owners = new_owners;
        self.members = new_members;
        self.threshold = new_threshold;

        info!(
            "Owner set replaced: {} owners, threshold {}",
            self.owners.len(),
            self.threshold
        );

        Ok(())
    }

    /// Check membership
    pub fn is_owner(&self, identity: &Address) -> bool {
        self.members.contains(identity)
    }

    /// Ordered owner list
    pub fn owners(&self) -> &[Address] {
        &self.owners
    }

    /// Required number of distinct approvals
    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}
