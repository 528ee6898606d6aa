//! Configuration types for COVAULT

use crate::error::{VaultError, VaultResult};
use crate::types::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Initial vault configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Initial owner identities (ordered, duplicate-free)
    pub owners: Vec<Address>,

    /// Required number of distinct approvals per transaction
    pub threshold: u32,
}

impl VaultConfig {
    pub fn new(owners: Vec<Address>, threshold: u32) -> Self {
        Self { owners, threshold }
    }

    /// Load from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> VaultResult<Self> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| VaultError::Other(anyhow::anyhow!("config read failed: {e}")))?;
        let config: Self = serde_json::from_str(&data)
            .map_err(|e| VaultError::Other(anyhow::anyhow!("config parse failed: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the owner-set and threshold invariants
    ///
    /// Same validation ladder the registry applies on replacement:
    /// non-empty, threshold in range, no zero address, no duplicates.
    pub fn validate(&self) -> VaultResult<()> {
        if self.owners.is_empty() {
            return Err(VaultError::EmptyOwnerSet);
        }

        if self.threshold == 0 || self.threshold as usize > self.owners.len() {
            return Err(VaultError::InvalidThreshold {
                threshold: self.threshold,
                owners: self.owners.len() as u32,
            });
        }

        let mut seen = HashSet::with_capacity(self.owners.len());
        for (index, owner) in self.owners.iter().enumerate() {
            if owner.is_zero() {
                return Err(VaultError::ZeroAddressOwner { index });
            }
            if !seen.insert(*owner) {
                return Err(VaultError::DuplicateOwner(*owner));
            }
        }

        Ok(())
    }
}
