//! # Canonical Encoding
//!
//! Deterministic byte encodings for values that end up inside signed
//! messages. Built on `bincode`'s default (fixed-width, little-endian)
//! configuration:
//!
//! - `u64` → 8 bytes little-endian
//! - `AccountAddress` → its 16 raw bytes (fixed-size arrays carry no length
//!   prefix)
//! - tuples → their fields back to back
//!
//! Anything signed off-chain and checked on-chain must be rebuilt with
//! [`to_canonical_bytes`] byte for byte.

use serde::Serialize;
use thiserror::Error;

/// Encoding failure. Only reachable for types whose `Serialize` impl can fail.
#[derive(Debug, Error)]
#[error("canonical encoding failed: {0}")]
pub struct EncodingError(#[from] bincode::Error);

/// Encode any serializable value canonically.
pub fn to_canonical_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, EncodingError> {
    Ok(bincode::serialize(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::AccountAddress;

    #[test]
    fn address_is_raw_bytes() {
        let addr = AccountAddress::from_u64(42);
        assert_eq!(to_canonical_bytes(&addr).unwrap(), addr.as_bytes().to_vec());
    }

    #[test]
    fn u64_is_little_endian() {
        assert_eq!(to_canonical_bytes(&1u64).unwrap(), vec![1, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn tuples_concatenate_without_framing() {
        let addr = AccountAddress::from_u64(7);
        let bytes = to_canonical_bytes(&(addr, 1_000_000u64)).unwrap();
        assert_eq!(bytes.len(), 24);
        assert_eq!(&bytes[..16], addr.as_bytes());
        assert_eq!(&bytes[16..], &1_000_000u64.to_le_bytes());
    }
}
