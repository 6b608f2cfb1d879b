//! # Digital Signatures
//!
//! Ed25519 verification over raw bytes, the form in which off-chain
//! attestations reach the ledger: a 32-byte compliance key registered on a
//! credential and a signature blob supplied with the payment.

use thiserror::Error;

use super::keys::{MeridianKeypair, MeridianPublicKey, MeridianSignature};
use crate::config::SIGNATURE_LENGTH;

/// Errors during signature operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature verification failed")]
    VerificationFailed,

    #[error("invalid signature bytes: expected {SIGNATURE_LENGTH} bytes, got {0}")]
    InvalidSignatureBytes(usize),

    #[error("invalid public key")]
    InvalidPublicKey,
}

/// Sign a message using a keypair.
pub fn sign(keypair: &MeridianKeypair, message: &[u8]) -> MeridianSignature {
    keypair.sign(message)
}

/// Verify a typed signature.
pub fn verify(public_key: &MeridianPublicKey, message: &[u8], signature: &MeridianSignature) -> bool {
    public_key.verify(message, signature)
}

/// Verify a signature given as untyped byte slices.
///
/// The signature length is checked first so that callers can distinguish a
/// malformed blob from a well-formed but invalid signature.
pub fn verify_raw(
    public_key_bytes: &[u8],
    message: &[u8],
    signature_bytes: &[u8],
) -> Result<(), SignatureError> {
    let signature = MeridianSignature::from_slice(signature_bytes);
    if !signature.is_well_formed() {
        return Err(SignatureError::InvalidSignatureBytes(signature_bytes.len()));
    }
    let public_key = MeridianPublicKey::try_from_slice(public_key_bytes)
        .map_err(|_| SignatureError::InvalidPublicKey)?;

    if public_key.verify(message, &signature) {
        Ok(())
    } else {
        Err(SignatureError::VerificationFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify() {
        let kp = MeridianKeypair::generate();
        let sig = sign(&kp, b"hello, world");
        assert!(verify(&kp.public_key(), b"hello, world", &sig));
    }

    #[test]
    fn verify_raw_accepts_valid_signature() {
        let kp = MeridianKeypair::generate();
        let sig = sign(&kp, b"attest");
        assert_eq!(
            verify_raw(&kp.public_key_bytes(), b"attest", sig.as_bytes()),
            Ok(())
        );
    }

    #[test]
    fn verify_raw_reports_malformed_length_before_key() {
        assert_eq!(
            verify_raw(&[], b"attest", &[]),
            Err(SignatureError::InvalidSignatureBytes(0))
        );
    }

    #[test]
    fn verify_raw_rejects_tampered_message() {
        let kp = MeridianKeypair::generate();
        let sig = sign(&kp, b"attest");
        assert_eq!(
            verify_raw(&kp.public_key_bytes(), b"attest!", sig.as_bytes()),
            Err(SignatureError::VerificationFailed)
        );
    }

    #[test]
    fn verify_raw_rejects_short_key() {
        let kp = MeridianKeypair::generate();
        let sig = sign(&kp, b"m");
        assert_eq!(
            verify_raw(&[1u8; 16], b"m", sig.as_bytes()),
            Err(SignatureError::InvalidPublicKey)
        );
    }
}
