//! Account creation, currency opt-in, capabilities and freezing.

use meridian_protocol::{AccountAddress, AuthenticationKey, Signer};

use crate::account::{AccountError, KeyRotationCapability, WithdrawCapability};
use crate::error::LedgerError;
use crate::events::LedgerEvent;
use crate::roles::RoleId;
use crate::token::CurrencyCode;

use super::{AccountOperations, Ledger};

impl Ledger {
    // -----------------------------------------------------------------------
    // Creation
    // -----------------------------------------------------------------------

    /// Creates the root account. Genesis only.
    pub fn create_root_account(
        &mut self,
        address: AccountAddress,
        auth_key: AuthenticationKey,
    ) -> Result<(), LedgerError> {
        self.transact(|l| {
            l.state.clock.assert_genesis()?;
            if let Some(ops) = &l.state.operations {
                return Err(AccountError::AlreadyExists(ops.root).into());
            }
            l.state.operations = Some(AccountOperations::new(address));
            l.make_account(address, auth_key, RoleId::Root)
        })
    }

    /// Creates the treasury compliance account. Genesis only.
    pub fn create_treasury_compliance_account(
        &mut self,
        root: &Signer,
        address: AccountAddress,
        auth_key: AuthenticationKey,
    ) -> Result<(), LedgerError> {
        self.transact(|l| {
            l.state.clock.assert_genesis()?;
            l.state.roles.assert_root(root.address())?;
            l.make_account(address, auth_key, RoleId::TreasuryCompliance)
        })
    }

    /// Creates a dealer holding `currency`, with a credential and an empty
    /// preburn queue.
    pub fn create_designated_dealer(
        &mut self,
        tc: &Signer,
        address: AccountAddress,
        auth_key: AuthenticationKey,
        currency: &CurrencyCode,
        human_name: &str,
    ) -> Result<(), LedgerError> {
        self.transact(|l| {
            l.state.roles.assert_treasury_compliance(tc.address())?;
            l.make_account(address, auth_key, RoleId::DesignatedDealer)?;
            let now = l.now_micros();
            l.state
                .attestation
                .publish_credential(address, human_name, now)?;
            l.open_balance(address, currency)
        })
    }

    /// Creates a parent VASP holding `currency`, or every registered
    /// currency when `add_all_currencies` is set.
    pub fn create_parent_vasp_account(
        &mut self,
        tc: &Signer,
        address: AccountAddress,
        auth_key: AuthenticationKey,
        currency: &CurrencyCode,
        human_name: &str,
        add_all_currencies: bool,
    ) -> Result<(), LedgerError> {
        self.transact(|l| {
            l.state.roles.assert_treasury_compliance(tc.address())?;
            l.make_account(address, auth_key, RoleId::ParentVasp)?;
            l.state.vasps.publish_parent_vasp(address)?;
            let now = l.now_micros();
            l.state
                .attestation
                .publish_credential(address, human_name, now)?;
            l.open_balances(address, currency, add_all_currencies)
        })
    }

    /// Creates a child of the calling parent VASP, optionally funded with
    /// `child_initial_balance` from the parent.
    pub fn create_child_vasp_account(
        &mut self,
        parent: &Signer,
        address: AccountAddress,
        auth_key: AuthenticationKey,
        currency: &CurrencyCode,
        add_all_currencies: bool,
        child_initial_balance: u64,
    ) -> Result<(), LedgerError> {
        self.transact(|l| {
            let parent = parent.address();
            l.state.roles.assert_parent_vasp(parent)?;
            l.make_account(address, auth_key, RoleId::ChildVasp)?;
            l.state.vasps.publish_child_vasp(parent, address)?;
            l.open_balances(address, currency, add_all_currencies)?;
            if child_initial_balance > 0 {
                let cap = l.state.accounts.extract_withdraw_capability(parent)?;
                l.pay_inner(&cap, address, currency, child_initial_balance, &[], &[])?;
                l.state.accounts.restore_withdraw_capability(cap)?;
            }
            Ok(())
        })
    }

    pub fn create_validator_account(
        &mut self,
        root: &Signer,
        address: AccountAddress,
        auth_key: AuthenticationKey,
    ) -> Result<(), LedgerError> {
        self.transact(|l| {
            l.state.roles.assert_root(root.address())?;
            l.make_account(address, auth_key, RoleId::Validator)
        })
    }

    pub fn create_validator_operator_account(
        &mut self,
        root: &Signer,
        address: AccountAddress,
        auth_key: AuthenticationKey,
    ) -> Result<(), LedgerError> {
        self.transact(|l| {
            l.state.roles.assert_root(root.address())?;
            l.make_account(address, auth_key, RoleId::ValidatorOperator)
        })
    }

    fn make_account(
        &mut self,
        address: AccountAddress,
        auth_key: AuthenticationKey,
        role: RoleId,
    ) -> Result<(), LedgerError> {
        self.state.accounts.create(address, auth_key)?;
        self.state.roles.grant_role(address, role)?;
        if let Some(ops) = self.state.operations.as_mut() {
            ops.create_account_events.emit(
                &mut self.events,
                LedgerEvent::AccountCreated {
                    created: address,
                    role,
                },
            );
        }
        self.metrics
            .accounts_created_total
            .with_label_values(&[role.name()])
            .inc();
        tracing::info!(%address, %role, "account created");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Currencies
    // -----------------------------------------------------------------------

    /// Opens an empty `code` balance for the calling account.
    pub fn add_currency(&mut self, account: &Signer, code: &CurrencyCode) -> Result<(), LedgerError> {
        self.transact(|l| l.open_balance(account.address(), code))
    }

    fn open_balances(
        &mut self,
        address: AccountAddress,
        currency: &CurrencyCode,
        add_all_currencies: bool,
    ) -> Result<(), LedgerError> {
        if !add_all_currencies {
            return self.open_balance(address, currency);
        }
        self.state.currencies.info(currency)?;
        for code in self.state.currencies.currency_codes() {
            self.open_balance(address, &code)?;
        }
        Ok(())
    }

    /// Balance plus the per-role records that go with it: a preburn queue
    /// for dealers, a group limits window for VASPs.
    fn open_balance(&mut self, address: AccountAddress, code: &CurrencyCode) -> Result<(), LedgerError> {
        let registrar = self.state.currencies.info(code)?.registrar;
        self.state.roles.assert_can_hold_balance(address)?;
        self.state.accounts.add_currency(address, code)?;

        if self.state.roles.has_role(address, RoleId::DesignatedDealer) {
            self.state.currencies.publish_preburn_queue(address, code)?;
        }
        if let Some(parent) = self.state.vasps.parent_address(address) {
            if !self.state.limits.has_window_published(parent, code) {
                let now = self.now_micros();
                self.state.limits.publish_window(parent, code, registrar, now)?;
            }
        }
        tracing::debug!(%address, %code, "currency added");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Capabilities
    // -----------------------------------------------------------------------

    pub fn extract_withdraw_capability(
        &mut self,
        account: &Signer,
    ) -> Result<WithdrawCapability, LedgerError> {
        self.transact(|l| Ok(l.state.accounts.extract_withdraw_capability(account.address())?))
    }

    pub fn restore_withdraw_capability(&mut self, cap: WithdrawCapability) -> Result<(), LedgerError> {
        self.transact(|l| Ok(l.state.accounts.restore_withdraw_capability(cap)?))
    }

    pub fn extract_key_rotation_capability(
        &mut self,
        account: &Signer,
    ) -> Result<KeyRotationCapability, LedgerError> {
        self.transact(|l| {
            Ok(l.state
                .accounts
                .extract_key_rotation_capability(account.address())?)
        })
    }

    pub fn restore_key_rotation_capability(
        &mut self,
        cap: KeyRotationCapability,
    ) -> Result<(), LedgerError> {
        self.transact(|l| Ok(l.state.accounts.restore_key_rotation_capability(cap)?))
    }

    /// Rotates the key of the capability's account. `new_key` must be
    /// exactly 32 bytes.
    pub fn rotate_authentication_key(
        &mut self,
        cap: &KeyRotationCapability,
        new_key: &[u8],
    ) -> Result<(), LedgerError> {
        self.transact(|l| {
            Ok(l.state
                .accounts
                .rotate_authentication_key(cap, new_key, &mut l.events)?)
        })
    }

    pub fn increment_sequence_number(&mut self, account: AccountAddress) -> Result<u64, LedgerError> {
        self.transact(|l| Ok(l.state.accounts.increment_sequence_number(account)?))
    }

    // -----------------------------------------------------------------------
    // Freezing
    // -----------------------------------------------------------------------

    /// Blocks withdrawals from `account`. Root and treasury compliance
    /// cannot be frozen.
    pub fn freeze_account(&mut self, tc: &Signer, account: AccountAddress) -> Result<(), LedgerError> {
        self.transact(|l| {
            l.state.roles.assert_treasury_compliance(tc.address())?;
            l.assert_freezable(account)?;
            l.state.accounts.set_frozen(account, true)?;
            if let Some(ops) = l.state.operations.as_mut() {
                ops.freeze_account_events.emit(
                    &mut l.events,
                    LedgerEvent::AccountFrozen {
                        initiator: tc.address(),
                        frozen: account,
                    },
                );
            }
            tracing::info!(%account, "account frozen");
            Ok(())
        })
    }

    pub fn unfreeze_account(&mut self, tc: &Signer, account: AccountAddress) -> Result<(), LedgerError> {
        self.transact(|l| {
            l.state.roles.assert_treasury_compliance(tc.address())?;
            l.assert_freezable(account)?;
            l.state.accounts.set_frozen(account, false)?;
            if let Some(ops) = l.state.operations.as_mut() {
                ops.unfreeze_account_events.emit(
                    &mut l.events,
                    LedgerEvent::AccountUnfrozen {
                        initiator: tc.address(),
                        unfrozen: account,
                    },
                );
            }
            tracing::info!(%account, "account unfrozen");
            Ok(())
        })
    }

    fn assert_freezable(&self, account: AccountAddress) -> Result<(), LedgerError> {
        match self.state.roles.role_of(account) {
            Some(RoleId::Root) | Some(RoleId::TreasuryCompliance) => {
                Err(AccountError::CannotFreeze(account).into())
            }
            _ => Ok(()),
        }
    }
}
