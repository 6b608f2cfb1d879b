//! # Hashing Utilities
//!
//! SHA-256 is the only digest the ledger core needs: authentication keys are
//! `sha256(public_key || scheme)` and addresses are cut from them.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of the input data.
///
/// ```
/// use meridian_protocol::crypto::sha256;
///
/// assert_eq!(sha256(b"meridian").len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash the concatenation of several byte slices without building the
/// preimage first.
pub fn sha256_concat(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}
