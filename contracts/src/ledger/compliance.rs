//! Limits administration, credentials and recovery addresses.

use meridian_protocol::{AccountAddress, Signer};

use crate::account::KeyRotationCapability;
use crate::error::{LedgerError, Rejected};
use crate::limits::{LimitsDefinition, LimitsUpdate};
use crate::token::CurrencyCode;

use super::Ledger;

impl Ledger {
    // -----------------------------------------------------------------------
    // Limits
    // -----------------------------------------------------------------------

    pub fn publish_unrestricted_limits(
        &mut self,
        publisher: &Signer,
        code: &CurrencyCode,
    ) -> Result<(), LedgerError> {
        self.transact(|l| {
            let publisher = publisher.address();
            l.state.roles.assert_root_or_treasury_compliance(publisher)?;
            l.state.currencies.info(code)?;
            Ok(l.state.limits.publish_unrestricted_limits(publisher, code)?)
        })
    }

    /// Publishes a definition at the caller. A zero `time_period` takes the
    /// configured default.
    pub fn publish_limits_definition(
        &mut self,
        publisher: &Signer,
        code: &CurrencyCode,
        max_inflow: u64,
        max_outflow: u64,
        max_holding: u64,
        time_period: u64,
    ) -> Result<(), LedgerError> {
        self.transact(|l| {
            let publisher = publisher.address();
            l.state.roles.assert_root_or_treasury_compliance(publisher)?;
            l.state.currencies.info(code)?;
            let time_period = if time_period == 0 {
                l.config.default_limits_period_micros
            } else {
                time_period
            };
            let definition = LimitsDefinition {
                max_inflow,
                max_outflow,
                max_holding,
                time_period,
            };
            l.state
                .limits
                .publish_limits_definition(publisher, code, definition)?;
            tracing::info!(%publisher, %code, ?definition, "limits definition published");
            Ok(())
        })
    }

    pub fn publish_window(
        &mut self,
        tc: &Signer,
        window_address: AccountAddress,
        code: &CurrencyCode,
        limit_address: AccountAddress,
    ) -> Result<(), LedgerError> {
        self.transact(|l| {
            l.state.roles.assert_treasury_compliance(tc.address())?;
            let now = l.now_micros();
            Ok(l.state
                .limits
                .publish_window(window_address, code, limit_address, now)?)
        })
    }

    /// Zero arguments leave the corresponding field unchanged.
    #[allow(clippy::too_many_arguments)]
    pub fn update_limits_definition(
        &mut self,
        tc: &Signer,
        limit_address: AccountAddress,
        code: &CurrencyCode,
        max_inflow: u64,
        max_outflow: u64,
        max_holding: u64,
        time_period: u64,
    ) -> Result<(), LedgerError> {
        self.transact(|l| {
            l.state.roles.assert_treasury_compliance(tc.address())?;
            Ok(l.state.limits.update_limits_definition(
                limit_address,
                code,
                max_inflow,
                max_outflow,
                max_holding,
                time_period,
            )?)
        })
    }

    pub fn apply_limits_update(
        &mut self,
        tc: &Signer,
        limit_address: AccountAddress,
        code: &CurrencyCode,
        update: LimitsUpdate,
    ) -> Result<(), LedgerError> {
        self.transact(|l| {
            l.state.roles.assert_treasury_compliance(tc.address())?;
            Ok(l.state
                .limits
                .apply_limits_update(limit_address, code, update)?)
        })
    }

    pub fn update_window_info(
        &mut self,
        tc: &Signer,
        window_address: AccountAddress,
        code: &CurrencyCode,
        aggregate_window_period: u64,
        new_limit_address: AccountAddress,
    ) -> Result<(), LedgerError> {
        self.transact(|l| {
            l.state.roles.assert_treasury_compliance(tc.address())?;
            Ok(l.state.limits.update_window_info(
                window_address,
                code,
                aggregate_window_period,
                new_limit_address,
            )?)
        })
    }

    // -----------------------------------------------------------------------
    // Credentials
    // -----------------------------------------------------------------------

    pub fn rotate_base_url(&mut self, account: &Signer, new_url: &str) -> Result<(), LedgerError> {
        self.transact(|l| {
            let account = account.address();
            l.state.roles.assert_parent_vasp_or_designated_dealer(account)?;
            let now = l.now_micros();
            Ok(l.state
                .attestation
                .rotate_base_url(account, new_url, now, &mut l.events)?)
        })
    }

    pub fn rotate_compliance_public_key(
        &mut self,
        account: &Signer,
        new_key: &[u8],
    ) -> Result<(), LedgerError> {
        self.transact(|l| {
            let account = account.address();
            l.state.roles.assert_parent_vasp_or_designated_dealer(account)?;
            let now = l.now_micros();
            Ok(l.state.attestation.rotate_compliance_public_key(
                account,
                new_key,
                now,
                &mut l.events,
            )?)
        })
    }

    // -----------------------------------------------------------------------
    // Recovery addresses
    // -----------------------------------------------------------------------

    /// Makes the caller a recovery address holding its own key rotation
    /// capability.
    pub fn publish_recovery_address(&mut self, owner: &Signer) -> Result<(), LedgerError> {
        self.transact(|l| {
            let cap = l
                .state
                .accounts
                .extract_key_rotation_capability(owner.address())?;
            l.publish_recovery_address_with(owner, cap)
                .map_err(Rejected::into_error)
        })
    }

    /// As [`Ledger::publish_recovery_address`], with a capability the
    /// caller already extracted. It must be the caller's own. On failure
    /// the capability comes back in the [`Rejected`].
    pub fn publish_recovery_address_with(
        &mut self,
        owner: &Signer,
        own_cap: KeyRotationCapability,
    ) -> Result<(), Rejected<KeyRotationCapability>> {
        self.transact_returning(|l| {
            if let Err(e) = l.state.accounts.assert_key_rotation_capability(&own_cap) {
                return Err(Rejected::new(e.into(), own_cap));
            }
            l.state
                .recovery
                .publish(&l.state.vasps, owner.address(), own_cap)
                .map_err(|rejected| rejected.map_error(LedgerError::from))
        })
    }

    /// Hands `cap` to the recovery address at `recovery_address`. On
    /// failure the capability comes back in the [`Rejected`].
    pub fn add_rotation_capability(
        &mut self,
        cap: KeyRotationCapability,
        recovery_address: AccountAddress,
    ) -> Result<(), Rejected<KeyRotationCapability>> {
        self.transact_returning(|l| {
            if let Err(e) = l.state.accounts.assert_key_rotation_capability(&cap) {
                return Err(Rejected::new(e.into(), cap));
            }
            l.state
                .recovery
                .add_capability(&l.state.vasps, cap, recovery_address)
                .map_err(|rejected| rejected.map_error(LedgerError::from))
        })
    }

    /// Extracts the caller's key rotation capability and hands it to
    /// `recovery_address`.
    pub fn delegate_key_rotation(
        &mut self,
        account: &Signer,
        recovery_address: AccountAddress,
    ) -> Result<(), LedgerError> {
        self.transact(|l| {
            let cap = l
                .state
                .accounts
                .extract_key_rotation_capability(account.address())?;
            l.add_rotation_capability(cap, recovery_address)
                .map_err(Rejected::into_error)
        })
    }

    /// Rotates `target`'s key through a capability held at
    /// `recovery_address`. The caller must be the target or the recovery
    /// address.
    pub fn recover_authentication_key(
        &mut self,
        caller: &Signer,
        recovery_address: AccountAddress,
        target: AccountAddress,
        new_key: &[u8],
    ) -> Result<(), LedgerError> {
        self.transact(|l| {
            let account =
                l.state
                    .recovery
                    .authorize_rotation(caller.address(), recovery_address, target)?;
            Ok(l.state
                .accounts
                .rotate_authentication_key_of(account, new_key, &mut l.events)?)
        })
    }
}
