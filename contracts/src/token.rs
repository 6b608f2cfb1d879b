//! # Tokens & Mint/Burn Capabilities
//!
//! A [`Token`] is value in motion: produced by minting, withdrawing or
//! cancelling a burn, and consumed by depositing, preburning or joining.
//! Tokens are neither `Clone` nor `Copy`, and only this crate can create
//! non-zero ones, so value cannot be duplicated by callers.
//!
//! [`MintCapability`] and [`BurnCapability`] follow the same pattern: they
//! are created exactly once per currency by registration and authorize
//! mint/burn by being presented. Dropping one discards the authority for
//! good.

use serde::{Deserialize, Serialize};
use std::fmt;

use meridian_protocol::config::MAX_CURRENCY_CODE_LENGTH;

use crate::currency::CurrencyError;
use crate::error::Rejected;

// ---------------------------------------------------------------------------
// CurrencyCode
// ---------------------------------------------------------------------------

/// Ticker of a registered currency, e.g. `XUS`.
///
/// 1 to 8 ASCII alphanumeric characters. Codes are case-sensitive.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Validates and wraps a currency code.
    pub fn new(code: impl Into<String>) -> Result<Self, CurrencyError> {
        let code = code.into();
        let valid = !code.is_empty()
            && code.len() <= MAX_CURRENCY_CODE_LENGTH
            && code.chars().all(|c| c.is_ascii_alphanumeric());
        if !valid {
            return Err(CurrencyError::InvalidCode(code));
        }
        Ok(Self(code))
    }

    /// The code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CurrencyCode({})", self.0)
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = CurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// An amount of one currency, held outside any balance.
#[must_use = "a token must be deposited, preburned, joined, or destroyed"]
#[derive(PartialEq, Eq, Serialize)]
pub struct Token {
    currency: CurrencyCode,
    value: u64,
}

impl Token {
    /// Only the registry (mint, cancel_burn) and balances (withdraw) create
    /// value.
    pub(crate) fn new(currency: CurrencyCode, value: u64) -> Self {
        Self { currency, value }
    }

    /// A token carrying no value. Anyone may create one.
    pub fn zero(currency: CurrencyCode) -> Self {
        Self { currency, value: 0 }
    }

    /// The token's value in base units.
    pub fn value(&self) -> u64 {
        self.value
    }

    /// The token's currency.
    pub fn currency(&self) -> &CurrencyCode {
        &self.currency
    }

    /// Splits off `amount` into a new token, leaving the rest in `self`.
    pub fn withdraw(&mut self, amount: u64) -> Result<Token, CurrencyError> {
        if amount > self.value {
            return Err(CurrencyError::InsufficientValue {
                available: self.value,
                requested: amount,
            });
        }
        self.value -= amount;
        Ok(Token::new(self.currency.clone(), amount))
    }

    /// Consumes the token and returns `(amount, remainder)`. On failure the
    /// token comes back whole.
    pub fn split(mut self, amount: u64) -> Result<(Token, Token), Rejected<Token, CurrencyError>> {
        match self.withdraw(amount) {
            Ok(taken) => Ok((taken, self)),
            Err(error) => Err(Rejected::new(error, self)),
        }
    }

    /// Merges `other` into `self`. A mismatched or overflowing `other` is
    /// handed back.
    pub fn deposit(&mut self, other: Token) -> Result<(), Rejected<Token, CurrencyError>> {
        if other.currency != self.currency {
            let error = CurrencyError::CurrencyMismatch {
                expected: self.currency.clone(),
                got: other.currency.clone(),
            };
            return Err(Rejected::new(error, other));
        }
        match self.value.checked_add(other.value) {
            Some(value) => {
                self.value = value;
                Ok(())
            }
            None => Err(Rejected::new(CurrencyError::ValueOverflow, other)),
        }
    }

    /// Consumes both tokens and returns one holding their sum, or both
    /// tokens unchanged.
    pub fn join(mut self, other: Token) -> Result<Token, Rejected<(Token, Token), CurrencyError>> {
        match self.deposit(other) {
            Ok(()) => Ok(self),
            Err(Rejected { error, value }) => Err(Rejected::new(error, (self, value))),
        }
    }

    /// Destroys an empty token. Non-zero tokens can only leave circulation
    /// through the preburn/burn path.
    pub fn destroy_zero(self) -> Result<(), CurrencyError> {
        if self.value != 0 {
            return Err(CurrencyError::DestroyNonZero(self.value));
        }
        Ok(())
    }

    /// Dissolves the token into its parts once the value has been moved
    /// into storage.
    pub(crate) fn into_parts(self) -> (CurrencyCode, u64) {
        (self.currency, self.value)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({} {})", self.value, self.currency)
    }
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Authority to mint one currency.
#[derive(PartialEq, Eq, Serialize)]
pub struct MintCapability {
    currency: CurrencyCode,
}

/// Authority to burn (or cancel burns of) one currency.
#[derive(PartialEq, Eq, Serialize)]
pub struct BurnCapability {
    currency: CurrencyCode,
}

impl MintCapability {
    pub(crate) fn new(currency: CurrencyCode) -> Self {
        Self { currency }
    }

    /// The currency this capability mints.
    pub fn currency(&self) -> &CurrencyCode {
        &self.currency
    }

    /// Permanently gives up the ability to mint through this capability.
    pub fn destroy(self) {}
}

impl BurnCapability {
    pub(crate) fn new(currency: CurrencyCode) -> Self {
        Self { currency }
    }

    /// The currency this capability burns.
    pub fn currency(&self) -> &CurrencyCode {
        &self.currency
    }

    /// Permanently gives up the ability to burn through this capability.
    pub fn destroy(self) {}
}

impl fmt::Debug for MintCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MintCapability({})", self.currency)
    }
}

impl fmt::Debug for BurnCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BurnCapability({})", self.currency)
    }
}
