//! # Cryptographic Primitives
//!
//! Thin, typed wrappers around audited implementations:
//!
//! - **Ed25519** (`ed25519-dalek`) for account and compliance signatures.
//! - **SHA-256** (`sha2`) for authentication-key derivation.

pub mod hash;
pub mod keys;
pub mod signatures;

pub use hash::{sha256, sha256_concat};
pub use keys::{KeyError, MeridianKeypair, MeridianPublicKey, MeridianSignature};
pub use signatures::{sign, verify, verify_raw, SignatureError};
