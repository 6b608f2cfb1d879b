//! Currency registration and the mint/preburn/burn cycle.

use meridian_protocol::{AccountAddress, Signer};

use crate::account::WithdrawCapability;
use crate::error::{LedgerError, Rejected};
use crate::token::{BurnCapability, CurrencyCode, MintCapability, Token};

use super::Ledger;

impl Ledger {
    /// Registers a currency and publishes the unrestricted limits
    /// definition at the registrar. Root only, genesis only.
    pub fn register_currency(
        &mut self,
        registrar: &Signer,
        code: &CurrencyCode,
        decimals: u8,
    ) -> Result<(MintCapability, BurnCapability), LedgerError> {
        self.transact(|l| {
            l.state.clock.assert_genesis()?;
            let registrar = registrar.address();
            l.state.roles.assert_root(registrar)?;
            let caps = l
                .state
                .currencies
                .register(registrar, code.clone(), decimals)?;
            l.state.limits.publish_unrestricted_limits(registrar, code)?;
            l.metrics.currencies_registered_total.inc();
            Ok(caps)
        })
    }

    pub fn mint(&mut self, cap: &MintCapability, amount: u64) -> Result<Token, LedgerError> {
        self.transact(|l| {
            let token = l.state.currencies.mint(cap, amount, &mut l.events)?;
            l.metrics
                .minted_value_total
                .with_label_values(&[cap.currency().as_str()])
                .inc_by(amount);
            Ok(token)
        })
    }

    /// Mints `amount` straight into a dealer's balance.
    pub fn mint_to_designated_dealer(
        &mut self,
        tc: &Signer,
        cap: &MintCapability,
        dealer: AccountAddress,
        amount: u64,
    ) -> Result<(), LedgerError> {
        self.transact(|l| {
            l.state.roles.assert_treasury_compliance(tc.address())?;
            l.state.roles.assert_designated_dealer(dealer)?;
            let token = l.state.currencies.mint(cap, amount, &mut l.events)?;
            l.deposit_inner(tc.address(), dealer, token, &[])
                .map_err(Rejected::into_error)?;
            l.metrics
                .minted_value_total
                .with_label_values(&[cap.currency().as_str()])
                .inc_by(amount);
            Ok(())
        })
    }

    pub fn update_minting_ability(
        &mut self,
        tc: &Signer,
        code: &CurrencyCode,
        can_mint: bool,
    ) -> Result<(), LedgerError> {
        self.transact(|l| {
            l.state.roles.assert_treasury_compliance(tc.address())?;
            l.state
                .currencies
                .update_minting_ability(code, can_mint, &mut l.events)?;
            tracing::info!(%code, can_mint, "minting ability updated");
            Ok(())
        })
    }

    /// Queues `token` for burning at the calling dealer. On failure the
    /// token comes back in the [`Rejected`].
    pub fn preburn_to(&mut self, dealer: &Signer, token: Token) -> Result<(), Rejected<Token>> {
        self.transact_returning(|l| {
            let dealer = dealer.address();
            if let Err(e) = l.state.roles.assert_designated_dealer(dealer) {
                return Err(Rejected::new(e.into(), token));
            }
            let now = l.now_micros();
            l.state
                .currencies
                .preburn_to(dealer, token, now, &mut l.events)
                .map_err(|rejected| rejected.map_error(LedgerError::from))
        })
    }

    /// Moves `amount` from a dealer's balance into its preburn queue.
    pub fn preburn(
        &mut self,
        dealer_cap: &WithdrawCapability,
        code: &CurrencyCode,
        amount: u64,
    ) -> Result<(), LedgerError> {
        self.transact(|l| {
            let dealer = dealer_cap.account_address();
            l.state.roles.assert_designated_dealer(dealer)?;
            let token = l.withdraw_inner(dealer_cap, dealer, code, amount, &[])?;
            let now = l.now_micros();
            l.state
                .currencies
                .preburn_to(dealer, token, now, &mut l.events)
                .map_err(Rejected::into_error)?;
            Ok(())
        })
    }

    /// Destroys the oldest preburn of exactly `amount` at `dealer`.
    pub fn burn(
        &mut self,
        cap: &BurnCapability,
        dealer: AccountAddress,
        amount: u64,
    ) -> Result<(), LedgerError> {
        self.transact(|l| {
            l.state
                .currencies
                .burn(cap, dealer, amount, &mut l.events)?;
            l.metrics
                .burned_value_total
                .with_label_values(&[cap.currency().as_str()])
                .inc_by(amount);
            Ok(())
        })
    }

    /// Takes the oldest preburn of exactly `amount` back out of the queue.
    pub fn cancel_burn(
        &mut self,
        cap: &BurnCapability,
        dealer: AccountAddress,
        amount: u64,
    ) -> Result<Token, LedgerError> {
        self.transact(|l| {
            Ok(l.state
                .currencies
                .cancel_burn(cap, dealer, amount, &mut l.events)?)
        })
    }
}
