//! # Account Addresses & Authentication Keys
//!
//! An account is named by a fixed 16-byte [`AccountAddress`]. The address is
//! cut from the account's initial [`AuthenticationKey`]:
//!
//! ```text
//! ed25519 public key (32 bytes)
//!     -> SHA-256(public_key || 0x00)      = authentication key (32 bytes)
//!     -> last 16 bytes                    = account address
//! ```
//!
//! The authentication key can later be rotated; the address never changes.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::{ADDRESS_LENGTH, AUTHENTICATION_KEY_LENGTH, ED25519_SCHEME};
use crate::crypto::hash::sha256_concat;
use crate::crypto::keys::MeridianPublicKey;

/// Errors from parsing addresses or keys.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid length: expected {expected} bytes, got {got}")]
    InvalidLength {
        /// Required byte length.
        expected: usize,
        /// Length actually supplied.
        got: usize,
    },
}

// ---------------------------------------------------------------------------
// AccountAddress
// ---------------------------------------------------------------------------

/// An opaque, fixed-width account identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountAddress([u8; ADDRESS_LENGTH]);

impl AccountAddress {
    /// Wraps raw address bytes.
    pub const fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Builds an address whose last eight bytes are `value` (big-endian).
    ///
    /// Handy for well-known system addresses and fixtures:
    /// `AccountAddress::from_u64(0xA550C18)`.
    pub const fn from_u64(value: u64) -> Self {
        let tail = value.to_be_bytes();
        let mut bytes = [0u8; ADDRESS_LENGTH];
        let mut i = 0;
        while i < 8 {
            bytes[ADDRESS_LENGTH - 8 + i] = tail[i];
            i += 1;
        }
        Self(bytes)
    }

    /// A random address, for tests and tooling.
    pub fn random() -> Self {
        let mut bytes = [0u8; ADDRESS_LENGTH];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Derives the address an account created for `public_key` would get.
    pub fn from_public_key(public_key: &MeridianPublicKey) -> Self {
        AuthenticationKey::ed25519(public_key).derived_address()
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Lowercase hex, no prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses hex with or without a leading `0x`.
    pub fn from_hex(s: &str) -> Result<Self, AddressError> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(trimmed).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        let arr: [u8; ADDRESS_LENGTH] =
            bytes
                .as_slice()
                .try_into()
                .map_err(|_| AddressError::InvalidLength {
                    expected: ADDRESS_LENGTH,
                    got: bytes.len(),
                })?;
        Ok(Self(arr))
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Debug for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountAddress(0x{})", self.to_hex())
    }
}

impl FromStr for AccountAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

// ---------------------------------------------------------------------------
// AuthenticationKey
// ---------------------------------------------------------------------------

/// The 32-byte key an account's transactions must be authorized against.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthenticationKey([u8; AUTHENTICATION_KEY_LENGTH]);

impl AuthenticationKey {
    /// Wraps raw key bytes.
    pub const fn new(bytes: [u8; AUTHENTICATION_KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Validates the length of an untyped key.
    pub fn try_from_slice(bytes: &[u8]) -> Result<Self, AddressError> {
        let arr: [u8; AUTHENTICATION_KEY_LENGTH] =
            bytes.try_into().map_err(|_| AddressError::InvalidLength {
                expected: AUTHENTICATION_KEY_LENGTH,
                got: bytes.len(),
            })?;
        Ok(Self(arr))
    }

    /// `SHA-256(public_key || ED25519_SCHEME)`.
    pub fn ed25519(public_key: &MeridianPublicKey) -> Self {
        Self(sha256_concat(&[&public_key.as_bytes()[..], &[ED25519_SCHEME]]))
    }

    /// The trailing [`ADDRESS_LENGTH`] bytes, i.e. the address an account
    /// created under this key receives.
    pub fn derived_address(&self) -> AccountAddress {
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes.copy_from_slice(&self.0[AUTHENTICATION_KEY_LENGTH - ADDRESS_LENGTH..]);
        AccountAddress(bytes)
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; AUTHENTICATION_KEY_LENGTH] {
        &self.0
    }
}

impl fmt::Debug for AuthenticationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthenticationKey({})", hex::encode(self.0))
    }
}
