//! # Currency Registry
//!
//! Registers currencies and is the only place value enters or leaves
//! circulation.
//!
//! ```text
//!            mint(&MintCapability)
//!   ∅ ───────────────────────────────▶ Token ──deposit──▶ balances
//!                                         │
//!                               preburn_to(dealer)
//!                                         ▼
//!                              dealer's PreburnQueue ──burn(&BurnCapability)──▶ ∅
//!                                         │
//!                              cancel_burn ──▶ Token
//! ```
//!
//! ## Conservation
//!
//! For every currency, `total_value` equals the sum of all balances plus
//! the sum of all preburn entries, outside of the tokens in flight inside a
//! running transaction. `preburn_value` equals the preburn sum alone.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use meridian_protocol::config::MAX_CURRENCY_DECIMALS;
use meridian_protocol::events::{EventHandle, EventSink};
use meridian_protocol::AccountAddress;

use crate::error::{ErrorCategory, Rejected};
use crate::events::{streams, LedgerEvent};
use crate::preburn::{PreburnEntry, PreburnQueue};
use crate::token::{BurnCapability, CurrencyCode, MintCapability, Token};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by currency, token, and preburn operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CurrencyError {
    /// Currency codes are 1-8 ASCII alphanumeric characters.
    #[error("invalid currency code: '{0}'")]
    InvalidCode(String),

    #[error("invalid decimals {0}: exceeds the supported maximum")]
    InvalidDecimals(u8),

    #[error("currency {0} is already registered")]
    AlreadyRegistered(CurrencyCode),

    #[error("currency {0} is not registered")]
    NotRegistered(CurrencyCode),

    #[error("minting {0} is currently disabled")]
    MintingDisabled(CurrencyCode),

    #[error("minting {amount} {code} would overflow total value")]
    TotalValueOverflow { code: CurrencyCode, amount: u64 },

    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch {
        expected: CurrencyCode,
        got: CurrencyCode,
    },

    #[error("insufficient value: token holds {available}, requested {requested}")]
    InsufficientValue { available: u64, requested: u64 },

    #[error("cannot destroy a token holding {0}")]
    DestroyNonZero(u64),

    #[error("value overflow")]
    ValueOverflow,

    /// Removing `amount` would take a recorded total below zero.
    #[error("{code} accounting would go below zero removing {amount}")]
    ValueUnderflow { code: CurrencyCode, amount: u64 },

    #[error("{dealer} has no preburn queue for {code}")]
    PreburnQueueMissing {
        dealer: AccountAddress,
        code: CurrencyCode,
    },

    #[error("{dealer} already has a preburn queue for {code}")]
    PreburnQueueExists {
        dealer: AccountAddress,
        code: CurrencyCode,
    },

    #[error("preburn queue of {dealer} for {code} is full")]
    PreburnQueueFull {
        dealer: AccountAddress,
        code: CurrencyCode,
    },

    /// Burns and cancellations match entries by exact value only.
    #[error("no preburn entry of exactly {amount} {code} at {dealer}")]
    NoExactPreburn {
        dealer: AccountAddress,
        code: CurrencyCode,
        amount: u64,
    },
}

impl CurrencyError {
    pub fn category(&self) -> ErrorCategory {
        use CurrencyError::*;
        match self {
            InvalidCode(_)
            | InvalidDecimals(_)
            | ZeroAmount
            | CurrencyMismatch { .. }
            | DestroyNonZero(_) => ErrorCategory::InvalidArgument,
            AlreadyRegistered(_) | PreburnQueueExists { .. } => ErrorCategory::AlreadyPublished,
            NotRegistered(_) | PreburnQueueMissing { .. } | NoExactPreburn { .. } => {
                ErrorCategory::NotPublished
            }
            MintingDisabled(_) | ValueUnderflow { .. } => ErrorCategory::InvalidState,
            TotalValueOverflow { .. }
            | InsufficientValue { .. }
            | ValueOverflow
            | PreburnQueueFull { .. } => ErrorCategory::LimitExceeded,
        }
    }
}

// ---------------------------------------------------------------------------
// CurrencyInfo
// ---------------------------------------------------------------------------

/// Per-currency record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyInfo {
    pub code: CurrencyCode,
    /// Account that registered the currency. Owns its event streams and the
    /// unrestricted limits definition.
    pub registrar: AccountAddress,
    pub decimals: u8,
    /// `10^decimals`.
    pub scaling_factor: u64,
    /// Value in circulation: balances plus preburns.
    pub total_value: u128,
    /// Value sitting in preburn queues.
    pub preburn_value: u64,
    pub can_mint: bool,
    mint_events: EventHandle,
    burn_events: EventHandle,
    preburn_events: EventHandle,
    cancel_burn_events: EventHandle,
    minting_ability_events: EventHandle,
}

impl CurrencyInfo {
    fn new(registrar: AccountAddress, code: CurrencyCode, decimals: u8, scaling_factor: u64) -> Self {
        let handle = |stream: &str| EventHandle::new(registrar, streams::for_currency(stream, &code));
        Self {
            mint_events: handle(streams::MINT),
            burn_events: handle(streams::BURN),
            preburn_events: handle(streams::PREBURN),
            cancel_burn_events: handle(streams::CANCEL_BURN),
            minting_ability_events: handle(streams::MINTING_ABILITY),
            code,
            registrar,
            decimals,
            scaling_factor,
            total_value: 0,
            preburn_value: 0,
            can_mint: true,
        }
    }

    pub fn mint_events(&self) -> &EventHandle {
        &self.mint_events
    }

    pub fn burn_events(&self) -> &EventHandle {
        &self.burn_events
    }

    pub fn preburn_events(&self) -> &EventHandle {
        &self.preburn_events
    }

    pub fn cancel_burn_events(&self) -> &EventHandle {
        &self.cancel_burn_events
    }
}

// ---------------------------------------------------------------------------
// CurrencyRegistry
// ---------------------------------------------------------------------------

/// Registered currencies and every dealer's preburn queues.
#[derive(Debug, Clone, Default)]
pub struct CurrencyRegistry {
    currencies: HashMap<CurrencyCode, CurrencyInfo>,
    preburns: HashMap<(AccountAddress, CurrencyCode), PreburnQueue>,
}

impl CurrencyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `code` and returns its one mint and one burn capability.
    ///
    /// Role and phase checks are the caller's job.
    pub fn register(
        &mut self,
        registrar: AccountAddress,
        code: CurrencyCode,
        decimals: u8,
    ) -> Result<(MintCapability, BurnCapability), CurrencyError> {
        if decimals > MAX_CURRENCY_DECIMALS {
            return Err(CurrencyError::InvalidDecimals(decimals));
        }
        if self.currencies.contains_key(&code) {
            return Err(CurrencyError::AlreadyRegistered(code));
        }
        let scaling_factor = 10u64
            .checked_pow(decimals as u32)
            .ok_or(CurrencyError::InvalidDecimals(decimals))?;

        self.currencies.insert(
            code.clone(),
            CurrencyInfo::new(registrar, code.clone(), decimals, scaling_factor),
        );
        tracing::info!(%code, decimals, %registrar, "currency registered");
        Ok((MintCapability::new(code.clone()), BurnCapability::new(code)))
    }

    pub fn is_currency(&self, code: &CurrencyCode) -> bool {
        self.currencies.contains_key(code)
    }

    pub fn info(&self, code: &CurrencyCode) -> Result<&CurrencyInfo, CurrencyError> {
        self.currencies
            .get(code)
            .ok_or_else(|| CurrencyError::NotRegistered(code.clone()))
    }

    fn info_mut(&mut self, code: &CurrencyCode) -> Result<&mut CurrencyInfo, CurrencyError> {
        self.currencies
            .get_mut(code)
            .ok_or_else(|| CurrencyError::NotRegistered(code.clone()))
    }

    /// Registered codes, sorted.
    pub fn currency_codes(&self) -> Vec<CurrencyCode> {
        let mut codes: Vec<CurrencyCode> = self.currencies.keys().cloned().collect();
        codes.sort();
        codes
    }

    pub fn market_cap(&self, code: &CurrencyCode) -> Result<u128, CurrencyError> {
        Ok(self.info(code)?.total_value)
    }

    pub fn preburn_value(&self, code: &CurrencyCode) -> Result<u64, CurrencyError> {
        Ok(self.info(code)?.preburn_value)
    }

    pub fn decimals(&self, code: &CurrencyCode) -> Result<u8, CurrencyError> {
        Ok(self.info(code)?.decimals)
    }

    pub fn scaling_factor(&self, code: &CurrencyCode) -> Result<u64, CurrencyError> {
        Ok(self.info(code)?.scaling_factor)
    }

    /// Creates new value.
    pub fn mint<S: EventSink<LedgerEvent>>(
        &mut self,
        cap: &MintCapability,
        amount: u64,
        sink: &mut S,
    ) -> Result<Token, CurrencyError> {
        if amount == 0 {
            return Err(CurrencyError::ZeroAmount);
        }
        let code = cap.currency();
        let info = self.info_mut(code)?;
        if !info.can_mint {
            return Err(CurrencyError::MintingDisabled(code.clone()));
        }
        info.total_value = info
            .total_value
            .checked_add(amount as u128)
            .ok_or_else(|| CurrencyError::TotalValueOverflow {
                code: code.clone(),
                amount,
            })?;
        info.mint_events.emit(
            sink,
            LedgerEvent::Mint {
                currency: code.clone(),
                amount,
            },
        );
        tracing::info!(%code, amount, total_value = %info.total_value, "minted");
        Ok(Token::new(code.clone(), amount))
    }

    pub fn update_minting_ability<S: EventSink<LedgerEvent>>(
        &mut self,
        code: &CurrencyCode,
        can_mint: bool,
        sink: &mut S,
    ) -> Result<(), CurrencyError> {
        let info = self.info_mut(code)?;
        info.can_mint = can_mint;
        info.minting_ability_events.emit(
            sink,
            LedgerEvent::MintingAbilityChanged {
                currency: code.clone(),
                can_mint,
            },
        );
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Preburn
    // -----------------------------------------------------------------------

    pub fn publish_preburn_queue(
        &mut self,
        dealer: AccountAddress,
        code: &CurrencyCode,
    ) -> Result<(), CurrencyError> {
        self.info(code)?;
        let key = (dealer, code.clone());
        if self.preburns.contains_key(&key) {
            return Err(CurrencyError::PreburnQueueExists {
                dealer,
                code: code.clone(),
            });
        }
        self.preburns.insert(key, PreburnQueue::new());
        Ok(())
    }

    pub fn has_preburn_queue(&self, dealer: AccountAddress, code: &CurrencyCode) -> bool {
        self.preburns.contains_key(&(dealer, code.clone()))
    }

    pub fn preburn_queue(
        &self,
        dealer: AccountAddress,
        code: &CurrencyCode,
    ) -> Result<&PreburnQueue, CurrencyError> {
        self.preburns
            .get(&(dealer, code.clone()))
            .ok_or_else(|| CurrencyError::PreburnQueueMissing {
                dealer,
                code: code.clone(),
            })
    }

    /// Values queued at `dealer` for `code`, oldest first.
    pub fn preburn_queue_entries(
        &self,
        dealer: AccountAddress,
        code: &CurrencyCode,
    ) -> Result<Vec<u64>, CurrencyError> {
        Ok(self
            .preburn_queue(dealer, code)?
            .entries()
            .map(|e| e.value)
            .collect())
    }

    /// Entries across every queue.
    pub fn total_preburn_entries(&self) -> usize {
        self.preburns.values().map(PreburnQueue::len).sum()
    }

    /// Moves `token` into the tail of `dealer`'s queue. A token that cannot
    /// be queued is handed back.
    pub fn preburn_to<S: EventSink<LedgerEvent>>(
        &mut self,
        dealer: AccountAddress,
        token: Token,
        now_micros: u64,
        sink: &mut S,
    ) -> Result<(), Rejected<Token, CurrencyError>> {
        let code = token.currency().clone();
        let amount = token.value();
        if amount == 0 {
            return Err(Rejected::new(CurrencyError::ZeroAmount, token));
        }
        let Some(info) = self.currencies.get_mut(&code) else {
            return Err(Rejected::new(CurrencyError::NotRegistered(code), token));
        };
        let Some(queue) = self.preburns.get_mut(&(dealer, code.clone())) else {
            let error = CurrencyError::PreburnQueueMissing { dealer, code };
            return Err(Rejected::new(error, token));
        };
        if queue.is_full() {
            let error = CurrencyError::PreburnQueueFull { dealer, code };
            return Err(Rejected::new(error, token));
        }
        let Some(preburn_value) = info.preburn_value.checked_add(amount) else {
            return Err(Rejected::new(CurrencyError::ValueOverflow, token));
        };

        let (_, value) = token.into_parts();
        queue.push(PreburnEntry {
            value,
            queued_at_micros: now_micros,
        });
        info.preburn_value = preburn_value;
        info.preburn_events.emit(
            sink,
            LedgerEvent::Preburn {
                currency: code.clone(),
                amount,
                preburn_address: dealer,
            },
        );
        tracing::debug!(%code, amount, %dealer, "preburn queued");
        Ok(())
    }

    /// Destroys the oldest entry of exactly `amount` at `dealer`.
    pub fn burn<S: EventSink<LedgerEvent>>(
        &mut self,
        cap: &BurnCapability,
        dealer: AccountAddress,
        amount: u64,
        sink: &mut S,
    ) -> Result<(), CurrencyError> {
        let code = cap.currency().clone();
        self.find_preburn(dealer, &code, amount)?;
        let total_value = self
            .info(&code)?
            .total_value
            .checked_sub(amount as u128)
            .ok_or_else(|| CurrencyError::ValueUnderflow {
                code: code.clone(),
                amount,
            })?;
        self.take_preburn(dealer, &code, amount)?;
        let info = self.info_mut(&code)?;
        info.total_value = total_value;
        info.burn_events.emit(
            sink,
            LedgerEvent::Burn {
                currency: code.clone(),
                amount,
                preburn_address: dealer,
            },
        );
        tracing::info!(%code, amount, %dealer, total_value = %info.total_value, "burned");
        Ok(())
    }

    /// Returns the oldest entry of exactly `amount` at `dealer` as a token.
    pub fn cancel_burn<S: EventSink<LedgerEvent>>(
        &mut self,
        cap: &BurnCapability,
        dealer: AccountAddress,
        amount: u64,
        sink: &mut S,
    ) -> Result<Token, CurrencyError> {
        let code = cap.currency().clone();
        let entry = self.take_preburn(dealer, &code, amount)?;
        let info = self.info_mut(&code)?;
        info.cancel_burn_events.emit(
            sink,
            LedgerEvent::CancelBurn {
                currency: code.clone(),
                amount,
                preburn_address: dealer,
            },
        );
        tracing::info!(%code, amount, %dealer, "burn cancelled");
        Ok(Token::new(code, entry.value))
    }

    /// Checks that `dealer` has an entry of exactly `amount` queued.
    fn find_preburn(
        &self,
        dealer: AccountAddress,
        code: &CurrencyCode,
        amount: u64,
    ) -> Result<(), CurrencyError> {
        self.info(code)?;
        if self.preburn_queue(dealer, code)?.position_of(amount).is_none() {
            return Err(CurrencyError::NoExactPreburn {
                dealer,
                code: code.clone(),
                amount,
            });
        }
        Ok(())
    }

    /// Removes a matching entry and takes it out of `preburn_value`.
    fn take_preburn(
        &mut self,
        dealer: AccountAddress,
        code: &CurrencyCode,
        amount: u64,
    ) -> Result<PreburnEntry, CurrencyError> {
        self.find_preburn(dealer, code, amount)?;
        let preburn_value = self.info(code)?.preburn_value;
        let queue = self
            .preburns
            .get_mut(&(dealer, code.clone()))
            .ok_or_else(|| CurrencyError::PreburnQueueMissing {
                dealer,
                code: code.clone(),
            })?;
        let remaining = preburn_value
            .checked_sub(amount)
            .ok_or_else(|| CurrencyError::ValueUnderflow {
                code: code.clone(),
                amount,
            })?;
        let entry = queue.take(amount).ok_or_else(|| CurrencyError::NoExactPreburn {
            dealer,
            code: code.clone(),
            amount,
        })?;
        self.info_mut(code)?.preburn_value = remaining;
        Ok(entry)
    }
}
