//! # Key Management
//!
//! Ed25519 keypairs for Meridian accounts and compliance officers.
//!
//! Two kinds of keys show up in the ledger:
//!
//! - **Account keys**: their hash becomes the account's authentication key
//!   (see [`crate::identity::AuthenticationKey`]), and from that the address.
//! - **Compliance keys**: registered on a VASP's credential and used by the
//!   payee side to sign dual-attestation messages off-chain.
//!
//! Both are plain Ed25519 keys. Key bytes are never logged.

use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

use crate::config::{PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};

/// Errors that can occur during key operations.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid public key bytes: not a valid Ed25519 point")]
    InvalidPublicKey,
}

/// An Ed25519 keypair. Not `Serialize`, and the secret half never leaves
/// the value.
///
/// # Examples
///
/// ```
/// use meridian_protocol::crypto::keys::MeridianKeypair;
///
/// let kp = MeridianKeypair::generate();
/// let sig = kp.sign(b"pay 100 XUS");
/// assert!(kp.verify(b"pay 100 XUS", &sig));
/// ```
pub struct MeridianKeypair {
    signing_key: SigningKey,
}

/// The public half of a keypair.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeridianPublicKey {
    bytes: [u8; PUBLIC_KEY_LENGTH],
}

/// An Ed25519 signature.
///
/// Stored as `Vec<u8>` so that malformed input coming off the wire can still
/// be represented; verification of anything but 64 bytes simply fails.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeridianSignature {
    bytes: Vec<u8>,
}

impl MeridianKeypair {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    /// Returns the public key associated with this keypair.
    pub fn public_key(&self) -> MeridianPublicKey {
        MeridianPublicKey {
            bytes: self.signing_key.verifying_key().to_bytes(),
        }
    }

    /// Raw public key bytes.
    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Sign a message. Ed25519 signatures are deterministic.
    pub fn sign(&self, message: &[u8]) -> MeridianSignature {
        let sig = self.signing_key.sign(message);
        MeridianSignature {
            bytes: sig.to_bytes().to_vec(),
        }
    }

    /// Verify a signature against this keypair's public key.
    pub fn verify(&self, message: &[u8], signature: &MeridianSignature) -> bool {
        self.public_key().verify(message, signature)
    }
}

impl Clone for MeridianKeypair {
    fn clone(&self) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&self.signing_key.to_bytes()),
        }
    }
}

impl fmt::Debug for MeridianKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print secret key material.
        write!(f, "MeridianKeypair(pub={})", self.public_key().to_hex())
    }
}

// ---------------------------------------------------------------------------
// MeridianPublicKey
// ---------------------------------------------------------------------------

impl MeridianPublicKey {
    /// Create a public key from raw bytes without point validation.
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_LENGTH]) -> Self {
        Self { bytes }
    }

    /// Try to create a public key from a byte slice.
    ///
    /// Validates both the length and that the bytes decode to an Ed25519
    /// point. Compliance key rotation goes through here.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, KeyError> {
        let bytes: [u8; PUBLIC_KEY_LENGTH] =
            slice.try_into().map_err(|_| KeyError::InvalidPublicKey)?;
        VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self { bytes })
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.bytes
    }

    /// Verify a signature against this public key.
    pub fn verify(&self, message: &[u8], signature: &MeridianSignature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.bytes) else {
            return false;
        };
        let Some(dalek_sig) = signature.to_dalek_signature() else {
            return false;
        };
        verifying_key.verify(message, &dalek_sig).is_ok()
    }

    /// Hex-encoded representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

impl Hash for MeridianPublicKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

impl fmt::Display for MeridianPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for MeridianPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MeridianPublicKey({})", &self.to_hex()[..16])
    }
}

// ---------------------------------------------------------------------------
// MeridianSignature
// ---------------------------------------------------------------------------

impl MeridianSignature {
    /// Wraps bytes as they arrived with a payment. Length is checked at
    /// verification.
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    /// Returns the raw signature bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// `true` when the signature has the canonical Ed25519 length.
    pub fn is_well_formed(&self) -> bool {
        self.bytes.len() == SIGNATURE_LENGTH
    }

    /// Convert to the ed25519-dalek `Signature`, or `None` for the wrong length.
    pub fn to_dalek_signature(&self) -> Option<DalekSignature> {
        let arr: [u8; SIGNATURE_LENGTH] = self.bytes.as_slice().try_into().ok()?;
        Some(DalekSignature::from_bytes(&arr))
    }

    /// Hex-encoded signature.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

impl fmt::Debug for MeridianSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex_str = self.to_hex();
        if hex_str.len() > 16 {
            write!(f, "MeridianSignature({}...)", &hex_str[..16])
        } else {
            write!(f, "MeridianSignature({})", hex_str)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keypair_sign_verify_roundtrip() {
        let kp = MeridianKeypair::generate();
        let sig = kp.sign(b"hello");
        assert!(kp.verify(b"hello", &sig));
        assert!(sig.is_well_formed());
    }

    #[test]
    fn wrong_message_fails_verification() {
        let kp = MeridianKeypair::generate();
        let sig = kp.sign(b"correct");
        assert!(!kp.verify(b"wrong", &sig));
    }

    #[test]
    fn wrong_key_fails_verification() {
        let kp1 = MeridianKeypair::generate();
        let kp2 = MeridianKeypair::generate();
        let sig = kp1.sign(b"msg");
        assert!(!kp2.public_key().verify(b"msg", &sig));
    }

    #[test]
    fn signing_is_deterministic() {
        let kp = MeridianKeypair::generate();
        let copy = kp.clone();
        assert_eq!(copy.public_key(), kp.public_key());
        assert_eq!(copy.sign(b"x").as_bytes(), kp.sign(b"x").as_bytes());
    }

    #[test]
    fn try_from_slice_rejects_wrong_length() {
        assert!(MeridianPublicKey::try_from_slice(&[1u8; 31]).is_err());
        assert!(MeridianPublicKey::try_from_slice(&[]).is_err());
    }

    #[test]
    fn try_from_slice_accepts_real_key() {
        let kp = MeridianKeypair::generate();
        let pk = MeridianPublicKey::try_from_slice(&kp.public_key_bytes()).unwrap();
        assert_eq!(pk, kp.public_key());
    }

    #[test]
    fn short_signature_never_verifies() {
        let kp = MeridianKeypair::generate();
        let sig = MeridianSignature::from_slice(&[0u8; 10]);
        assert!(!sig.is_well_formed());
        assert!(!kp.verify(b"msg", &sig));
    }

    #[test]
    fn debug_shows_only_the_public_key() {
        let kp = MeridianKeypair::generate();
        assert_eq!(
            format!("{:?}", kp),
            format!("MeridianKeypair(pub={})", kp.public_key().to_hex())
        );
    }
}
