//! # Recovery Addresses
//!
//! A VASP account can pool the key rotation capabilities of accounts in its
//! own group. Either the recovery address or the account being recovered
//! can then rotate that account's key, e.g. after the account's own key is
//! lost.
//!
//! The recovery address's own capability is always the first entry, which
//! keeps it from ever being delegated to some other recovery address.
//! Capabilities handed over here are held for good; there is no removal.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use meridian_protocol::config::MAX_RECOVERY_CAPABILITIES;
use meridian_protocol::AccountAddress;

use crate::account::KeyRotationCapability;
use crate::error::{ErrorCategory, Rejected};
use crate::vasp::VaspRegistry;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecoveryError {
    #[error("account {0} is not a VASP")]
    NotAVasp(AccountAddress),

    #[error("recovery address already published at {0}")]
    AlreadyPublished(AccountAddress),

    /// The capability offered at publication belongs to another account.
    #[error("capability of {cap_owner} offered as the own capability of {owner}")]
    CapabilityMismatch {
        owner: AccountAddress,
        cap_owner: AccountAddress,
    },

    #[error("no recovery address published at {0}")]
    NotPublished(AccountAddress),

    #[error("{account} is not in the VASP group of recovery address {recovery_address}")]
    NotSameVasp {
        account: AccountAddress,
        recovery_address: AccountAddress,
    },

    #[error("recovery address {0} holds the maximum number of capabilities")]
    TooManyCapabilities(AccountAddress),

    #[error("{caller} may not rotate keys through recovery address {recovery_address}")]
    NotAuthorized {
        caller: AccountAddress,
        recovery_address: AccountAddress,
    },

    #[error("recovery address {recovery_address} holds no capability for {target}")]
    NotRecoverable {
        recovery_address: AccountAddress,
        target: AccountAddress,
    },
}

impl RecoveryError {
    pub fn category(&self) -> ErrorCategory {
        use RecoveryError::*;
        match self {
            NotAVasp(_) | CapabilityMismatch { .. } | NotSameVasp { .. } | NotRecoverable { .. } => {
                ErrorCategory::InvalidArgument
            }
            AlreadyPublished(_) => ErrorCategory::AlreadyPublished,
            NotPublished(_) => ErrorCategory::NotPublished,
            TooManyCapabilities(_) => ErrorCategory::LimitExceeded,
            NotAuthorized { .. } => ErrorCategory::RequiresCapability,
        }
    }
}

/// Delegated key rotation capabilities, oldest first, recorded by the
/// address each one rotates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryAddress {
    rotation_caps: Vec<AccountAddress>,
}

impl RecoveryAddress {
    pub fn key_rotation_accounts(&self) -> &[AccountAddress] {
        &self.rotation_caps
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecoveryAddresses {
    records: HashMap<AccountAddress, RecoveryAddress>,
}

impl RecoveryAddresses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `owner` a recovery address seeded with its own capability.
    /// The capability is handed back if `owner` cannot publish.
    pub fn publish(
        &mut self,
        vasps: &VaspRegistry,
        owner: AccountAddress,
        own_cap: KeyRotationCapability,
    ) -> Result<(), Rejected<KeyRotationCapability, RecoveryError>> {
        if let Err(error) = self.check_publish(vasps, owner, &own_cap) {
            return Err(Rejected::new(error, own_cap));
        }
        self.records.insert(
            owner,
            RecoveryAddress {
                rotation_caps: vec![own_cap.into_account_address()],
            },
        );
        tracing::info!(%owner, "recovery address published");
        Ok(())
    }

    fn check_publish(
        &self,
        vasps: &VaspRegistry,
        owner: AccountAddress,
        own_cap: &KeyRotationCapability,
    ) -> Result<(), RecoveryError> {
        if !vasps.is_vasp(owner) {
            return Err(RecoveryError::NotAVasp(owner));
        }
        if self.records.contains_key(&owner) {
            return Err(RecoveryError::AlreadyPublished(owner));
        }
        if own_cap.account_address() != owner {
            return Err(RecoveryError::CapabilityMismatch {
                owner,
                cap_owner: own_cap.account_address(),
            });
        }
        Ok(())
    }

    /// Hands `cap` over to the recovery address at `recovery_address`, or
    /// back to the caller if the recovery address cannot take it.
    pub fn add_capability(
        &mut self,
        vasps: &VaspRegistry,
        cap: KeyRotationCapability,
        recovery_address: AccountAddress,
    ) -> Result<(), Rejected<KeyRotationCapability, RecoveryError>> {
        let account = cap.account_address();
        let Some(record) = self.records.get_mut(&recovery_address) else {
            return Err(Rejected::new(RecoveryError::NotPublished(recovery_address), cap));
        };
        if !vasps.is_same_vasp(account, recovery_address) {
            let error = RecoveryError::NotSameVasp {
                account,
                recovery_address,
            };
            return Err(Rejected::new(error, cap));
        }
        if record.rotation_caps.len() >= MAX_RECOVERY_CAPABILITIES {
            return Err(Rejected::new(
                RecoveryError::TooManyCapabilities(recovery_address),
                cap,
            ));
        }
        record.rotation_caps.push(cap.into_account_address());
        tracing::debug!(%account, %recovery_address, "key rotation capability delegated");
        Ok(())
    }

    /// Authorizes a rotation of `target`'s key by `caller` and returns the
    /// account whose key may be rotated.
    pub fn authorize_rotation(
        &self,
        caller: AccountAddress,
        recovery_address: AccountAddress,
        target: AccountAddress,
    ) -> Result<AccountAddress, RecoveryError> {
        let record = self
            .records
            .get(&recovery_address)
            .ok_or(RecoveryError::NotPublished(recovery_address))?;
        if caller != recovery_address && caller != target {
            return Err(RecoveryError::NotAuthorized {
                caller,
                recovery_address,
            });
        }
        record
            .rotation_caps
            .iter()
            .find(|owner| **owner == target)
            .copied()
            .ok_or(RecoveryError::NotRecoverable {
                recovery_address,
                target,
            })
    }

    pub fn is_recovery_address(&self, address: AccountAddress) -> bool {
        self.records.contains_key(&address)
    }

    pub fn key_rotation_accounts(
        &self,
        recovery_address: AccountAddress,
    ) -> Result<&[AccountAddress], RecoveryError> {
        self.records
            .get(&recovery_address)
            .map(RecoveryAddress::key_rotation_accounts)
            .ok_or(RecoveryError::NotPublished(recovery_address))
    }
}
