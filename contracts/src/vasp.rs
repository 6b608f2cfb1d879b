//! VASP groups: one parent account plus up to [`MAX_CHILD_ACCOUNTS`]
//! children. Every group-level record (credential, limits window, recovery
//! address scope) is keyed on the parent's address.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use meridian_protocol::config::MAX_CHILD_ACCOUNTS;
use meridian_protocol::AccountAddress;

use crate::error::ErrorCategory;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VaspError {
    #[error("account {0} is already a VASP")]
    AlreadyPublished(AccountAddress),

    #[error("account {0} is not a parent VASP")]
    NotAParent(AccountAddress),

    #[error("parent VASP {parent} already has {max} children")]
    TooManyChildren { parent: AccountAddress, max: u64 },
}

impl VaspError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            VaspError::AlreadyPublished(_) => ErrorCategory::AlreadyPublished,
            VaspError::NotAParent(_) => ErrorCategory::InvalidArgument,
            VaspError::TooManyChildren { .. } => ErrorCategory::LimitExceeded,
        }
    }
}

/// Record at a parent VASP address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentVasp {
    pub num_children: u64,
}

/// Record at a child VASP address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildVasp {
    pub parent_vasp_addr: AccountAddress,
}

#[derive(Debug, Clone, Default)]
pub struct VaspRegistry {
    parents: HashMap<AccountAddress, ParentVasp>,
    children: HashMap<AccountAddress, ChildVasp>,
}

impl VaspRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish_parent_vasp(&mut self, parent: AccountAddress) -> Result<(), VaspError> {
        if self.is_vasp(parent) {
            return Err(VaspError::AlreadyPublished(parent));
        }
        self.parents.insert(parent, ParentVasp { num_children: 0 });
        Ok(())
    }

    pub fn publish_child_vasp(
        &mut self,
        parent: AccountAddress,
        child: AccountAddress,
    ) -> Result<(), VaspError> {
        if self.is_vasp(child) {
            return Err(VaspError::AlreadyPublished(child));
        }
        let record = self
            .parents
            .get_mut(&parent)
            .ok_or(VaspError::NotAParent(parent))?;
        if record.num_children >= MAX_CHILD_ACCOUNTS {
            return Err(VaspError::TooManyChildren {
                parent,
                max: MAX_CHILD_ACCOUNTS,
            });
        }
        record.num_children += 1;
        self.children.insert(
            child,
            ChildVasp {
                parent_vasp_addr: parent,
            },
        );
        Ok(())
    }

    pub fn is_parent(&self, account: AccountAddress) -> bool {
        self.parents.contains_key(&account)
    }

    pub fn is_child(&self, account: AccountAddress) -> bool {
        self.children.contains_key(&account)
    }

    pub fn is_vasp(&self, account: AccountAddress) -> bool {
        self.is_parent(account) || self.is_child(account)
    }

    /// The group's parent address: `account` itself for a parent, the
    /// recorded parent for a child, `None` for non-VASPs.
    pub fn parent_address(&self, account: AccountAddress) -> Option<AccountAddress> {
        if self.is_parent(account) {
            return Some(account);
        }
        self.children.get(&account).map(|c| c.parent_vasp_addr)
    }

    /// `true` if both accounts are VASPs of the same group.
    pub fn is_same_vasp(&self, a: AccountAddress, b: AccountAddress) -> bool {
        match (self.parent_address(a), self.parent_address(b)) {
            (Some(pa), Some(pb)) => pa == pb,
            _ => false,
        }
    }

    pub fn num_children(&self, parent: AccountAddress) -> Result<u64, VaspError> {
        self.parents
            .get(&parent)
            .map(|p| p.num_children)
            .ok_or(VaspError::NotAParent(parent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u64) -> AccountAddress {
        AccountAddress::from_u64(n)
    }

    #[test]
    fn child_resolves_to_parent() {
        let mut vasps = VaspRegistry::new();
        vasps.publish_parent_vasp(addr(1)).unwrap();
        vasps.publish_child_vasp(addr(1), addr(2)).unwrap();

        assert_eq!(vasps.parent_address(addr(2)), Some(addr(1)));
        assert_eq!(vasps.parent_address(addr(1)), Some(addr(1)));
        assert_eq!(vasps.parent_address(addr(3)), None);
        assert!(vasps.is_same_vasp(addr(1), addr(2)));
        assert_eq!(vasps.num_children(addr(1)), Ok(1));
    }

    #[test]
    fn different_groups_are_not_same_vasp() {
        let mut vasps = VaspRegistry::new();
        vasps.publish_parent_vasp(addr(1)).unwrap();
        vasps.publish_parent_vasp(addr(2)).unwrap();
        assert!(!vasps.is_same_vasp(addr(1), addr(2)));
        assert!(!vasps.is_same_vasp(addr(9), addr(9)));
    }

    #[test]
    fn child_of_non_parent_rejected() {
        let mut vasps = VaspRegistry::new();
        assert_eq!(
            vasps.publish_child_vasp(addr(1), addr(2)),
            Err(VaspError::NotAParent(addr(1)))
        );
    }

    #[test]
    fn child_cap_enforced() {
        let mut vasps = VaspRegistry::new();
        vasps.publish_parent_vasp(addr(0)).unwrap();
        for n in 1..=MAX_CHILD_ACCOUNTS {
            vasps.publish_child_vasp(addr(0), addr(n)).unwrap();
        }
        let err = vasps
            .publish_child_vasp(addr(0), addr(MAX_CHILD_ACCOUNTS + 1))
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::LimitExceeded);
    }
}
