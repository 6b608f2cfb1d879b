//! # Accounts & Balances
//!
//! An [`Account`] owns its authentication key, a sequence number, one
//! balance per currency it has opted into, and two capability slots.
//!
//! ## Capabilities
//!
//! Each account has exactly one [`WithdrawCapability`] and one
//! [`KeyRotationCapability`]. Extracting one stamps it with a fresh serial
//! and records that serial in the account's slot; restoring consumes the
//! value and clears the slot. Every use checks the presented serial
//! against the slot, so a capability whose extraction was rolled back is
//! dead even though the value still exists. Serials come from a counter
//! that the ledger carries across rollbacks and are never reissued.
//!
//! A balance only ever decreases through [`AccountStore::debit`], which
//! requires the balance owner's withdraw capability.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use thiserror::Error;

use meridian_protocol::config::AUTHENTICATION_KEY_LENGTH;
use meridian_protocol::events::{EventHandle, EventSink};
use meridian_protocol::{AccountAddress, AuthenticationKey};

use crate::error::{ErrorCategory, Rejected};
use crate::events::{streams, LedgerEvent};
use crate::token::{CurrencyCode, Token};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountError {
    #[error("account {0} already exists")]
    AlreadyExists(AccountAddress),

    #[error("account {0} does not exist")]
    NotFound(AccountAddress),

    #[error("account {account} holds no {currency} balance")]
    BalanceMissing {
        account: AccountAddress,
        currency: CurrencyCode,
    },

    #[error("account {account} already holds a {currency} balance")]
    BalanceExists {
        account: AccountAddress,
        currency: CurrencyCode,
    },

    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("insufficient {currency} balance at {account}: have {available}, need {requested}")]
    InsufficientBalance {
        account: AccountAddress,
        currency: CurrencyCode,
        available: u64,
        requested: u64,
    },

    #[error("{currency} balance at {account} would overflow")]
    BalanceOverflow {
        account: AccountAddress,
        currency: CurrencyCode,
    },

    #[error("withdraw capability of {0} is already extracted")]
    WithdrawCapabilityExtracted(AccountAddress),

    #[error("withdraw capability of {0} is not the one currently issued")]
    StaleWithdrawCapability(AccountAddress),

    #[error("key rotation capability of {0} is already extracted")]
    KeyRotationCapabilityExtracted(AccountAddress),

    #[error("key rotation capability of {0} is not the one currently issued")]
    StaleKeyRotationCapability(AccountAddress),

    #[error("authentication keys are {expected} bytes, got {got}")]
    MalformedAuthenticationKey { expected: usize, got: usize },

    #[error("account {0} is frozen")]
    Frozen(AccountAddress),

    #[error("account {0} cannot be frozen")]
    CannotFreeze(AccountAddress),

    #[error("sequence number of {0} would overflow")]
    SequenceNumberOverflow(AccountAddress),
}

impl AccountError {
    pub fn category(&self) -> ErrorCategory {
        use AccountError::*;
        match self {
            AlreadyExists(_) | BalanceExists { .. } => ErrorCategory::AlreadyPublished,
            NotFound(_) | BalanceMissing { .. } => ErrorCategory::NotPublished,
            ZeroAmount | MalformedAuthenticationKey { .. } | CannotFreeze(_) => {
                ErrorCategory::InvalidArgument
            }
            InsufficientBalance { .. } | BalanceOverflow { .. } | SequenceNumberOverflow(_) => {
                ErrorCategory::LimitExceeded
            }
            WithdrawCapabilityExtracted(_) | KeyRotationCapabilityExtracted(_) | Frozen(_) => {
                ErrorCategory::InvalidState
            }
            StaleWithdrawCapability(_) | StaleKeyRotationCapability(_) => {
                ErrorCategory::RequiresCapability
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Authority to withdraw from one account's balances.
#[derive(PartialEq, Eq, Serialize)]
pub struct WithdrawCapability {
    account_address: AccountAddress,
    serial: u64,
}

impl WithdrawCapability {
    /// The account this capability withdraws from.
    pub fn account_address(&self) -> AccountAddress {
        self.account_address
    }
}

impl fmt::Debug for WithdrawCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WithdrawCapability({})", self.account_address)
    }
}

/// Authority to rotate one account's authentication key.
#[derive(PartialEq, Eq, Serialize)]
pub struct KeyRotationCapability {
    account_address: AccountAddress,
    serial: u64,
}

impl KeyRotationCapability {
    /// The account whose key this capability rotates.
    pub fn account_address(&self) -> AccountAddress {
        self.account_address
    }

    /// Consumed when the capability is handed to a recovery address, which
    /// keeps the owning address as its record of the delegation.
    pub(crate) fn into_account_address(self) -> AccountAddress {
        self.account_address
    }
}

impl fmt::Debug for KeyRotationCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyRotationCapability({})", self.account_address)
    }
}

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    address: AccountAddress,
    authentication_key: AuthenticationKey,
    sequence_number: u64,
    /// Serial of the extracted withdraw capability, `None` while in its slot.
    withdraw_capability: Option<u64>,
    key_rotation_capability: Option<u64>,
    balances: BTreeMap<CurrencyCode, u64>,
    frozen: bool,
    sent_events: EventHandle,
    received_events: EventHandle,
    key_rotation_events: EventHandle,
}

impl Account {
    fn new(address: AccountAddress, authentication_key: AuthenticationKey) -> Self {
        Self {
            address,
            authentication_key,
            sequence_number: 0,
            withdraw_capability: None,
            key_rotation_capability: None,
            balances: BTreeMap::new(),
            frozen: false,
            sent_events: EventHandle::new(address, streams::SENT_PAYMENT),
            received_events: EventHandle::new(address, streams::RECEIVED_PAYMENT),
            key_rotation_events: EventHandle::new(address, streams::KEY_ROTATION),
        }
    }

    pub fn address(&self) -> AccountAddress {
        self.address
    }

    pub fn authentication_key(&self) -> &AuthenticationKey {
        &self.authentication_key
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// `true` while the withdraw capability is out of its slot.
    pub fn delegated_withdraw_capability(&self) -> bool {
        self.withdraw_capability.is_some()
    }

    /// `true` while the key rotation capability is out of its slot.
    pub fn delegated_key_rotation_capability(&self) -> bool {
        self.key_rotation_capability.is_some()
    }

    /// Currencies held, with values.
    pub fn balances(&self) -> impl Iterator<Item = (&CurrencyCode, u64)> {
        self.balances.iter().map(|(code, value)| (code, *value))
    }

    pub fn sent_events(&self) -> &EventHandle {
        &self.sent_events
    }

    pub fn received_events(&self) -> &EventHandle {
        &self.received_events
    }

    pub fn key_rotation_events(&self) -> &EventHandle {
        &self.key_rotation_events
    }
}

// ---------------------------------------------------------------------------
// AccountStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct AccountStore {
    accounts: HashMap<AccountAddress, Account>,
    /// Last capability serial handed out.
    capability_serial: u64,
}

impl AccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(
        &mut self,
        address: AccountAddress,
        authentication_key: AuthenticationKey,
    ) -> Result<(), AccountError> {
        if self.exists_at(address) {
            return Err(AccountError::AlreadyExists(address));
        }
        self.accounts
            .insert(address, Account::new(address, authentication_key));
        Ok(())
    }

    pub fn exists_at(&self, address: AccountAddress) -> bool {
        self.accounts.contains_key(&address)
    }

    pub fn get(&self, address: AccountAddress) -> Result<&Account, AccountError> {
        self.accounts
            .get(&address)
            .ok_or(AccountError::NotFound(address))
    }

    fn get_mut(&mut self, address: AccountAddress) -> Result<&mut Account, AccountError> {
        self.accounts
            .get_mut(&address)
            .ok_or(AccountError::NotFound(address))
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn authentication_key(&self, address: AccountAddress) -> Result<AuthenticationKey, AccountError> {
        Ok(*self.get(address)?.authentication_key())
    }

    pub fn sequence_number(&self, address: AccountAddress) -> Result<u64, AccountError> {
        Ok(self.get(address)?.sequence_number)
    }

    pub fn increment_sequence_number(&mut self, address: AccountAddress) -> Result<u64, AccountError> {
        let account = self.get_mut(address)?;
        account.sequence_number = account
            .sequence_number
            .checked_add(1)
            .ok_or(AccountError::SequenceNumberOverflow(address))?;
        Ok(account.sequence_number)
    }

    // -----------------------------------------------------------------------
    // Balances
    // -----------------------------------------------------------------------

    /// Opens an empty `code` balance at `address`.
    pub fn add_currency(&mut self, address: AccountAddress, code: &CurrencyCode) -> Result<(), AccountError> {
        let account = self.get_mut(address)?;
        if account.balances.contains_key(code) {
            return Err(AccountError::BalanceExists {
                account: address,
                currency: code.clone(),
            });
        }
        account.balances.insert(code.clone(), 0);
        Ok(())
    }

    pub fn has_balance(&self, address: AccountAddress, code: &CurrencyCode) -> bool {
        self.accounts
            .get(&address)
            .is_some_and(|a| a.balances.contains_key(code))
    }

    pub fn balance(&self, address: AccountAddress, code: &CurrencyCode) -> Result<u64, AccountError> {
        self.get(address)?
            .balances
            .get(code)
            .copied()
            .ok_or_else(|| AccountError::BalanceMissing {
                account: address,
                currency: code.clone(),
            })
    }

    /// Sum of every `code` balance.
    pub fn total_balance(&self, code: &CurrencyCode) -> u128 {
        self.accounts
            .values()
            .filter_map(|a| a.balances.get(code))
            .map(|v| *v as u128)
            .sum()
    }

    /// Adds `token` to `payee`'s balance and records a received-payment
    /// event. Performs no limit checks. A token that cannot be credited is
    /// handed back.
    pub fn credit<S: EventSink<LedgerEvent>>(
        &mut self,
        payer: AccountAddress,
        payee: AccountAddress,
        token: Token,
        metadata: &[u8],
        sink: &mut S,
    ) -> Result<(), Rejected<Token, AccountError>> {
        if token.value() == 0 {
            return Err(Rejected::new(AccountError::ZeroAmount, token));
        }
        let Some(account) = self.accounts.get_mut(&payee) else {
            return Err(Rejected::new(AccountError::NotFound(payee), token));
        };
        let Some(balance) = account.balances.get_mut(token.currency()) else {
            let error = AccountError::BalanceMissing {
                account: payee,
                currency: token.currency().clone(),
            };
            return Err(Rejected::new(error, token));
        };
        let Some(updated) = balance.checked_add(token.value()) else {
            let error = AccountError::BalanceOverflow {
                account: payee,
                currency: token.currency().clone(),
            };
            return Err(Rejected::new(error, token));
        };
        *balance = updated;
        let (currency, amount) = token.into_parts();
        account.received_events.emit(
            sink,
            LedgerEvent::ReceivedPayment {
                currency,
                amount,
                payer,
                metadata: metadata.to_vec(),
            },
        );
        Ok(())
    }

    /// Takes `amount` out of the capability owner's balance and records a
    /// sent-payment event towards `payee`. Performs no limit checks.
    pub fn debit<S: EventSink<LedgerEvent>>(
        &mut self,
        cap: &WithdrawCapability,
        payee: AccountAddress,
        code: &CurrencyCode,
        amount: u64,
        metadata: &[u8],
        sink: &mut S,
    ) -> Result<Token, AccountError> {
        if amount == 0 {
            return Err(AccountError::ZeroAmount);
        }
        let payer = cap.account_address();
        let account = self.get_mut(payer)?;
        if account.withdraw_capability != Some(cap.serial) {
            return Err(AccountError::StaleWithdrawCapability(payer));
        }
        if account.frozen {
            return Err(AccountError::Frozen(payer));
        }
        let balance = account
            .balances
            .get_mut(code)
            .ok_or_else(|| AccountError::BalanceMissing {
                account: payer,
                currency: code.clone(),
            })?;
        if *balance < amount {
            return Err(AccountError::InsufficientBalance {
                account: payer,
                currency: code.clone(),
                available: *balance,
                requested: amount,
            });
        }
        *balance -= amount;
        account.sent_events.emit(
            sink,
            LedgerEvent::SentPayment {
                currency: code.clone(),
                amount,
                payee,
                metadata: metadata.to_vec(),
            },
        );
        Ok(Token::new(code.clone(), amount))
    }

    // -----------------------------------------------------------------------
    // Capabilities
    // -----------------------------------------------------------------------

    /// Last serial handed out. The ledger reinstates it after a rollback.
    pub(crate) fn capability_serial(&self) -> u64 {
        self.capability_serial
    }

    pub(crate) fn resume_capability_serial(&mut self, serial: u64) {
        self.capability_serial = self.capability_serial.max(serial);
    }

    fn next_capability_serial(&mut self) -> u64 {
        self.capability_serial += 1;
        self.capability_serial
    }

    pub fn extract_withdraw_capability(
        &mut self,
        address: AccountAddress,
    ) -> Result<WithdrawCapability, AccountError> {
        if self.get(address)?.withdraw_capability.is_some() {
            return Err(AccountError::WithdrawCapabilityExtracted(address));
        }
        let serial = self.next_capability_serial();
        self.get_mut(address)?.withdraw_capability = Some(serial);
        Ok(WithdrawCapability {
            account_address: address,
            serial,
        })
    }

    /// Puts `cap` back into its owner's slot.
    pub fn restore_withdraw_capability(&mut self, cap: WithdrawCapability) -> Result<(), AccountError> {
        self.assert_withdraw_capability(&cap)?;
        self.get_mut(cap.account_address)?.withdraw_capability = None;
        Ok(())
    }

    /// Checks that `cap` is the withdraw capability currently issued for
    /// its account.
    pub fn assert_withdraw_capability(&self, cap: &WithdrawCapability) -> Result<(), AccountError> {
        let address = cap.account_address;
        if self.get(address)?.withdraw_capability != Some(cap.serial) {
            return Err(AccountError::StaleWithdrawCapability(address));
        }
        Ok(())
    }

    pub fn extract_key_rotation_capability(
        &mut self,
        address: AccountAddress,
    ) -> Result<KeyRotationCapability, AccountError> {
        if self.get(address)?.key_rotation_capability.is_some() {
            return Err(AccountError::KeyRotationCapabilityExtracted(address));
        }
        let serial = self.next_capability_serial();
        self.get_mut(address)?.key_rotation_capability = Some(serial);
        Ok(KeyRotationCapability {
            account_address: address,
            serial,
        })
    }

    pub fn restore_key_rotation_capability(
        &mut self,
        cap: KeyRotationCapability,
    ) -> Result<(), AccountError> {
        self.assert_key_rotation_capability(&cap)?;
        self.get_mut(cap.account_address)?.key_rotation_capability = None;
        Ok(())
    }

    /// Checks that `cap` is the key rotation capability currently issued
    /// for its account.
    pub fn assert_key_rotation_capability(
        &self,
        cap: &KeyRotationCapability,
    ) -> Result<(), AccountError> {
        let address = cap.account_address;
        if self.get(address)?.key_rotation_capability != Some(cap.serial) {
            return Err(AccountError::StaleKeyRotationCapability(address));
        }
        Ok(())
    }

    pub fn delegated_withdraw_capability(&self, address: AccountAddress) -> Result<bool, AccountError> {
        Ok(self.get(address)?.withdraw_capability.is_some())
    }

    pub fn delegated_key_rotation_capability(&self, address: AccountAddress) -> Result<bool, AccountError> {
        Ok(self.get(address)?.key_rotation_capability.is_some())
    }

    /// Replaces the key of the capability's account.
    pub fn rotate_authentication_key<S: EventSink<LedgerEvent>>(
        &mut self,
        cap: &KeyRotationCapability,
        new_key: &[u8],
        sink: &mut S,
    ) -> Result<(), AccountError> {
        self.assert_key_rotation_capability(cap)?;
        self.rotate_authentication_key_of(cap.account_address(), new_key, sink)
    }

    /// Key rotation on behalf of a delegated capability held elsewhere.
    pub(crate) fn rotate_authentication_key_of<S: EventSink<LedgerEvent>>(
        &mut self,
        address: AccountAddress,
        new_key: &[u8],
        sink: &mut S,
    ) -> Result<(), AccountError> {
        let new_key = AuthenticationKey::try_from_slice(new_key).map_err(|_| {
            AccountError::MalformedAuthenticationKey {
                expected: AUTHENTICATION_KEY_LENGTH,
                got: new_key.len(),
            }
        })?;
        let account = self.get_mut(address)?;
        account.authentication_key = new_key;
        account.key_rotation_events.emit(
            sink,
            LedgerEvent::KeyRotation {
                new_authentication_key: new_key,
            },
        );
        tracing::info!(account = %address, "authentication key rotated");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Freezing
    // -----------------------------------------------------------------------

    pub fn set_frozen(&mut self, address: AccountAddress, frozen: bool) -> Result<(), AccountError> {
        self.get_mut(address)?.frozen = frozen;
        Ok(())
    }

    pub fn is_frozen(&self, address: AccountAddress) -> Result<bool, AccountError> {
        Ok(self.get(address)?.frozen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_protocol::events::EventLog;

    const ALICE: AccountAddress = AccountAddress::from_u64(0xA11CE);
    const BOB: AccountAddress = AccountAddress::from_u64(0xB0B);

    fn xus() -> CurrencyCode {
        CurrencyCode::new("XUS").unwrap()
    }

    fn store() -> AccountStore {
        let mut store = AccountStore::new();
        for addr in [ALICE, BOB] {
            store.create(addr, AuthenticationKey::new([1; 32])).unwrap();
            store.add_currency(addr, &xus()).unwrap();
        }
        store
    }

    #[test]
    fn duplicate_account_rejected() {
        let mut store = store();
        let err = store.create(ALICE, AuthenticationKey::new([0; 32])).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::AlreadyPublished);
    }

    #[test]
    fn credit_then_debit() {
        let mut store = store();
        let mut log = EventLog::new();
        store
            .credit(BOB, ALICE, Token::new(xus(), 100), b"", &mut log)
            .unwrap();

        let cap = store.extract_withdraw_capability(ALICE).unwrap();
        let token = store.debit(&cap, BOB, &xus(), 40, b"memo", &mut log).unwrap();
        assert_eq!(token.value(), 40);
        assert_eq!(store.balance(ALICE, &xus()), Ok(60));
        assert_eq!(store.get(ALICE).unwrap().sent_events().counter(), 1);
        store.restore_withdraw_capability(cap).unwrap();
        drop(token);
    }

    #[test]
    fn overdraw_is_rejected_without_change() {
        let mut store = store();
        let mut log = EventLog::new();
        store
            .credit(BOB, ALICE, Token::new(xus(), 10), b"", &mut log)
            .unwrap();
        let cap = store.extract_withdraw_capability(ALICE).unwrap();
        let err = store.debit(&cap, BOB, &xus(), 11, b"", &mut log).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::LimitExceeded);
        assert_eq!(store.balance(ALICE, &xus()), Ok(10));
    }

    #[test]
    fn zero_deposit_is_invalid() {
        let mut store = store();
        let mut log = EventLog::new();
        let rejected = store
            .credit(BOB, ALICE, Token::zero(xus()), b"", &mut log)
            .unwrap_err();
        assert_eq!(rejected.error, AccountError::ZeroAmount);
        assert!(log.is_empty());
    }

    #[test]
    fn deposit_without_balance_is_not_published() {
        let mut store = store();
        let mut log = EventLog::new();
        let eur = CurrencyCode::new("EUR").unwrap();
        let rejected = store
            .credit(BOB, ALICE, Token::new(eur, 1), b"", &mut log)
            .unwrap_err();
        assert_eq!(rejected.error.category(), ErrorCategory::NotPublished);
        assert_eq!(rejected.value.value(), 1);
    }

    #[test]
    fn withdraw_capability_is_single_holder() {
        let mut store = store();
        let cap = store.extract_withdraw_capability(ALICE).unwrap();
        assert!(store.delegated_withdraw_capability(ALICE).unwrap());

        let err = store.extract_withdraw_capability(ALICE).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::InvalidState);

        store.restore_withdraw_capability(cap).unwrap();
        assert!(!store.delegated_withdraw_capability(ALICE).unwrap());
        let again = store.extract_withdraw_capability(ALICE).unwrap();
        assert_eq!(again.account_address(), ALICE);
    }

    #[test]
    fn superseded_capability_is_stale() {
        let mut store = store();
        let mut log = EventLog::new();
        store
            .credit(BOB, ALICE, Token::new(xus(), 50), b"", &mut log)
            .unwrap();
        let snapshot = store.clone();
        let stale = store.extract_withdraw_capability(ALICE).unwrap();

        // Roll back the extraction the way an aborted transaction does.
        let serial = store.capability_serial();
        store = snapshot;
        store.resume_capability_serial(serial);

        let live = store.extract_withdraw_capability(ALICE).unwrap();
        let err = store.debit(&stale, BOB, &xus(), 10, b"", &mut log).unwrap_err();
        assert_eq!(err, AccountError::StaleWithdrawCapability(ALICE));
        assert_eq!(err.category(), ErrorCategory::RequiresCapability);
        assert_eq!(
            store.restore_withdraw_capability(stale),
            Err(AccountError::StaleWithdrawCapability(ALICE))
        );

        let paid = store.debit(&live, BOB, &xus(), 10, b"", &mut log).unwrap();
        assert_eq!(paid.value(), 10);
        store.restore_withdraw_capability(live).unwrap();
        assert_eq!(store.balance(ALICE, &xus()), Ok(40));
    }

    #[test]
    fn frozen_account_cannot_withdraw() {
        let mut store = store();
        let mut log = EventLog::new();
        store
            .credit(BOB, ALICE, Token::new(xus(), 5), b"", &mut log)
            .unwrap();
        store.set_frozen(ALICE, true).unwrap();
        let cap = store.extract_withdraw_capability(ALICE).unwrap();
        let err = store.debit(&cap, BOB, &xus(), 1, b"", &mut log).unwrap_err();
        assert_eq!(err, AccountError::Frozen(ALICE));
    }

    #[test]
    fn key_rotation_validates_length() {
        let mut store = store();
        let mut log = EventLog::new();
        let cap = store.extract_key_rotation_capability(ALICE).unwrap();

        let err = store
            .rotate_authentication_key(&cap, &[7; 31], &mut log)
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::InvalidArgument);

        store.rotate_authentication_key(&cap, &[7; 32], &mut log).unwrap();
        assert_eq!(
            store.authentication_key(ALICE).unwrap(),
            AuthenticationKey::new([7; 32])
        );
        assert_eq!(store.get(ALICE).unwrap().key_rotation_events().counter(), 1);
    }

    #[test]
    fn sequence_number_increments() {
        let mut store = store();
        assert_eq!(store.sequence_number(ALICE), Ok(0));
        assert_eq!(store.increment_sequence_number(ALICE), Ok(1));
        assert_eq!(store.sequence_number(ALICE), Ok(1));
    }
}
