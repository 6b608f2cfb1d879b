//! # Roles
//!
//! Every account carries exactly one [`RoleId`], assigned at creation and
//! never changed or removed. Privileged operations assert the caller's role
//! before touching any state.
//!
//! Role checks are flat: an operation either requires one role or accepts
//! any role from a fixed list. There is no hierarchy.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use meridian_protocol::AccountAddress;

use crate::error::ErrorCategory;

/// Errors raised by role checks.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoleError {
    /// The account already has a role. Roles are immutable.
    #[error("account {account} already has role {existing}")]
    AlreadyGranted {
        account: AccountAddress,
        existing: RoleId,
    },

    /// The account has no role at all.
    #[error("account {0} has no role")]
    Missing(AccountAddress),

    /// The account's role is not one of those the operation accepts.
    #[error("account {account} has role {actual}, requires {expected}")]
    Wrong {
        account: AccountAddress,
        actual: RoleId,
        expected: String,
    },
}

impl RoleError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            RoleError::AlreadyGranted { .. } => ErrorCategory::AlreadyPublished,
            RoleError::Missing(_) | RoleError::Wrong { .. } => ErrorCategory::RequiresRole,
        }
    }
}

/// The closed set of account roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u64)]
pub enum RoleId {
    Root = 0,
    TreasuryCompliance = 1,
    DesignatedDealer = 2,
    Validator = 3,
    ValidatorOperator = 4,
    ParentVasp = 5,
    ChildVasp = 6,
}

impl RoleId {
    /// Every role, in id order.
    pub const ALL: [RoleId; 7] = [
        RoleId::Root,
        RoleId::TreasuryCompliance,
        RoleId::DesignatedDealer,
        RoleId::Validator,
        RoleId::ValidatorOperator,
        RoleId::ParentVasp,
        RoleId::ChildVasp,
    ];

    /// Numeric id.
    pub fn id(self) -> u64 {
        self as u64
    }

    /// Inverse of [`RoleId::id`].
    pub fn from_id(id: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.id() == id)
    }

    /// Snake-case name, used as a metrics label.
    pub fn name(self) -> &'static str {
        match self {
            RoleId::Root => "root",
            RoleId::TreasuryCompliance => "treasury_compliance",
            RoleId::DesignatedDealer => "designated_dealer",
            RoleId::Validator => "validator",
            RoleId::ValidatorOperator => "validator_operator",
            RoleId::ParentVasp => "parent_vasp",
            RoleId::ChildVasp => "child_vasp",
        }
    }

    /// Only dealers and VASP accounts may hold balances.
    pub fn can_hold_balance(self) -> bool {
        matches!(
            self,
            RoleId::DesignatedDealer | RoleId::ParentVasp | RoleId::ChildVasp
        )
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Role assignments, keyed by account.
#[derive(Debug, Clone, Default)]
pub struct RoleRegistry {
    roles: HashMap<AccountAddress, RoleId>,
}

impl RoleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `role` to `account`. Fails if the account already has one.
    pub fn grant_role(&mut self, account: AccountAddress, role: RoleId) -> Result<(), RoleError> {
        if let Some(existing) = self.roles.get(&account) {
            return Err(RoleError::AlreadyGranted {
                account,
                existing: *existing,
            });
        }
        self.roles.insert(account, role);
        Ok(())
    }

    pub fn role_of(&self, account: AccountAddress) -> Option<RoleId> {
        self.roles.get(&account).copied()
    }

    /// Numeric role id of `account`.
    pub fn role_id(&self, account: AccountAddress) -> Result<u64, RoleError> {
        self.role_of(account)
            .map(RoleId::id)
            .ok_or(RoleError::Missing(account))
    }

    pub fn has_role(&self, account: AccountAddress, role: RoleId) -> bool {
        self.role_of(account) == Some(role)
    }

    /// `true` if `account` has a role that may hold balances.
    pub fn can_hold_balance(&self, account: AccountAddress) -> bool {
        self.role_of(account).is_some_and(RoleId::can_hold_balance)
    }

    pub fn assert_role(&self, account: AccountAddress, role: RoleId) -> Result<(), RoleError> {
        self.assert_role_in(account, &[role])
    }

    /// Passes if `account`'s role is any of `roles`.
    pub fn assert_role_in(&self, account: AccountAddress, roles: &[RoleId]) -> Result<(), RoleError> {
        let actual = self.role_of(account).ok_or(RoleError::Missing(account))?;
        if roles.contains(&actual) {
            return Ok(());
        }
        let expected = roles
            .iter()
            .map(|r| r.name())
            .collect::<Vec<_>>()
            .join(" | ");
        Err(RoleError::Wrong {
            account,
            actual,
            expected,
        })
    }

    pub fn assert_root(&self, account: AccountAddress) -> Result<(), RoleError> {
        self.assert_role(account, RoleId::Root)
    }

    pub fn assert_treasury_compliance(&self, account: AccountAddress) -> Result<(), RoleError> {
        self.assert_role(account, RoleId::TreasuryCompliance)
    }

    pub fn assert_parent_vasp(&self, account: AccountAddress) -> Result<(), RoleError> {
        self.assert_role(account, RoleId::ParentVasp)
    }

    pub fn assert_designated_dealer(&self, account: AccountAddress) -> Result<(), RoleError> {
        self.assert_role(account, RoleId::DesignatedDealer)
    }

    pub fn assert_parent_vasp_or_designated_dealer(
        &self,
        account: AccountAddress,
    ) -> Result<(), RoleError> {
        self.assert_role_in(account, &[RoleId::ParentVasp, RoleId::DesignatedDealer])
    }

    pub fn assert_root_or_treasury_compliance(
        &self,
        account: AccountAddress,
    ) -> Result<(), RoleError> {
        self.assert_role_in(account, &[RoleId::Root, RoleId::TreasuryCompliance])
    }

    pub fn assert_can_hold_balance(&self, account: AccountAddress) -> Result<(), RoleError> {
        self.assert_role_in(
            account,
            &[RoleId::DesignatedDealer, RoleId::ParentVasp, RoleId::ChildVasp],
        )
    }
}
