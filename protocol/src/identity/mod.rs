//! # Identity Module
//!
//! Who an account is and how it proves it:
//!
//! 1. **Address** — fixed 16-byte [`AccountAddress`], created once and never
//!    deleted.
//! 2. **Authentication key** — `SHA-256(ed25519_public_key || 0x00)`; the
//!    address is its suffix at creation time, the key itself is rotatable.
//! 3. **Signer** — the engine-issued proof that a transaction speaks for an
//!    address.

pub mod address;
pub mod signer;

pub use address::{AccountAddress, AddressError, AuthenticationKey};
pub use signer::Signer;
