//! Payment pipeline.
//!
//! ```text
//! pay_from ─▶ withdraw (balance, frozen, outflow window)
//!          ─▶ dual attestation gate
//!          ─▶ deposit  (payee balance, inflow/holding window)
//! ```
//!
//! Limits are tracked only for flows that cross a VASP group boundary, and
//! always against the window at the group's parent address.

use meridian_protocol::{AccountAddress, Signer};

use crate::account::{AccountError, WithdrawCapability};
use crate::error::{LedgerError, Rejected};
use crate::token::{CurrencyCode, Token};

use super::Ledger;

impl Ledger {
    /// Credits `token` to `payee`. On failure the token comes back in the
    /// [`Rejected`].
    pub fn deposit(
        &mut self,
        payer: AccountAddress,
        payee: AccountAddress,
        token: Token,
        metadata: &[u8],
    ) -> Result<(), Rejected<Token>> {
        self.transact_returning(|l| l.deposit_inner(payer, payee, token, metadata))
    }

    /// Takes `amount` out of the capability owner's `code` balance.
    /// `payee` is the intended recipient, used for limit tracking and the
    /// sent-payment event.
    pub fn withdraw_from(
        &mut self,
        cap: &WithdrawCapability,
        payee: AccountAddress,
        code: &CurrencyCode,
        amount: u64,
        metadata: &[u8],
    ) -> Result<Token, LedgerError> {
        self.transact(|l| l.withdraw_inner(cap, payee, code, amount, metadata))
    }

    /// Moves `amount` from the capability owner to `payee` as one unit.
    pub fn pay_from(
        &mut self,
        cap: &WithdrawCapability,
        payee: AccountAddress,
        code: &CurrencyCode,
        amount: u64,
        metadata: &[u8],
        metadata_signature: &[u8],
    ) -> Result<(), LedgerError> {
        self.transact(|l| l.pay_inner(cap, payee, code, amount, metadata, metadata_signature))
    }

    /// [`Ledger::pay_from`] using the sender's own withdraw capability,
    /// which is put back afterwards.
    pub fn pay(
        &mut self,
        sender: &Signer,
        payee: AccountAddress,
        code: &CurrencyCode,
        amount: u64,
        metadata: &[u8],
        metadata_signature: &[u8],
    ) -> Result<(), LedgerError> {
        self.transact(|l| {
            let cap = l.state.accounts.extract_withdraw_capability(sender.address())?;
            l.pay_inner(&cap, payee, code, amount, metadata, metadata_signature)?;
            l.state.accounts.restore_withdraw_capability(cap)?;
            Ok(())
        })
    }

    pub(super) fn pay_inner(
        &mut self,
        cap: &WithdrawCapability,
        payee: AccountAddress,
        code: &CurrencyCode,
        amount: u64,
        metadata: &[u8],
        metadata_signature: &[u8],
    ) -> Result<(), LedgerError> {
        let payer = cap.account_address();
        let token = self.withdraw_inner(cap, payee, code, amount, metadata)?;
        self.state.attestation.assert_payment_ok(
            &self.state.vasps,
            payer,
            payee,
            metadata,
            amount,
            metadata_signature,
        )?;
        self.deposit_inner(payer, payee, token, metadata)
            .map_err(Rejected::into_error)?;
        self.metrics.payments_total.inc();
        tracing::debug!(%payer, %payee, %code, amount, "payment");
        Ok(())
    }

    pub(super) fn withdraw_inner(
        &mut self,
        cap: &WithdrawCapability,
        payee: AccountAddress,
        code: &CurrencyCode,
        amount: u64,
        metadata: &[u8],
    ) -> Result<Token, LedgerError> {
        let payer = cap.account_address();
        let token = self
            .state
            .accounts
            .debit(cap, payee, code, amount, metadata, &mut self.events)?;
        if self.tracks_withdrawal(payer, payee) {
            let window = self.limits_window_address(payer);
            let now = self.now_micros();
            self.state
                .limits
                .record_withdrawal(window, code, amount, now)?;
        }
        Ok(token)
    }

    pub(super) fn deposit_inner(
        &mut self,
        payer: AccountAddress,
        payee: AccountAddress,
        token: Token,
        metadata: &[u8],
    ) -> Result<(), Rejected<Token>> {
        if let Err(error) = self.admit_deposit(payer, payee, &token) {
            return Err(Rejected::new(error, token));
        }
        self.state
            .accounts
            .credit(payer, payee, token, metadata, &mut self.events)
            .map_err(|rejected| rejected.map_error(LedgerError::from))
    }

    /// Checks and limit bookkeeping that run before `token` is credited.
    fn admit_deposit(
        &mut self,
        payer: AccountAddress,
        payee: AccountAddress,
        token: &Token,
    ) -> Result<(), LedgerError> {
        if token.value() == 0 {
            return Err(AccountError::ZeroAmount.into());
        }
        // A missing balance takes precedence over limit failures.
        self.state.accounts.balance(payee, token.currency())?;
        if self.tracks_deposit(payer, payee) {
            let window = self.limits_window_address(payee);
            let now = self.now_micros();
            self.state
                .limits
                .record_deposit(window, token.currency(), token.value(), now)?;
        }
        Ok(())
    }

    /// Outflows count against the payer's group unless the payee is in the
    /// same group.
    fn tracks_withdrawal(&self, payer: AccountAddress, payee: AccountAddress) -> bool {
        let vasps = &self.state.vasps;
        vasps.is_vasp(payer) && (!vasps.is_vasp(payee) || !vasps.is_same_vasp(payer, payee))
    }

    /// Inflows count against the payee's group unless the payer is in the
    /// same group.
    fn tracks_deposit(&self, payer: AccountAddress, payee: AccountAddress) -> bool {
        let vasps = &self.state.vasps;
        vasps.is_vasp(payee) && (!vasps.is_vasp(payer) || !vasps.is_same_vasp(payer, payee))
    }
}
