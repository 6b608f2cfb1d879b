//! # Dual Attestation
//!
//! Payments between two different VASP groups must carry a signature by the
//! receiving group's compliance key over
//!
//! ```text
//! metadata ‖ canonical (payer, value) ‖ DOMAIN_SEPARATOR
//! ```
//!
//! The middle part is the canonical encoding of the pair: the 16 address
//! bytes followed by the value as a little-endian `u64`.
//!
//! Compliance keys and base URLs live in a [`Credential`] at each parent
//! VASP and designated dealer. Children use their parent's credential.
//! A payer may also attach a signature when none is required; it is then
//! checked the same way.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use meridian_protocol::config::{
    CREDENTIAL_VALIDITY_MICROS, DUAL_ATTESTATION_DOMAIN_SEPARATOR, SIGNATURE_LENGTH,
};
use meridian_protocol::crypto::{verify_raw, MeridianPublicKey};
use meridian_protocol::encoding::{to_canonical_bytes, EncodingError};
use meridian_protocol::events::{EventHandle, EventSink};
use meridian_protocol::AccountAddress;

use crate::error::ErrorCategory;
use crate::events::{streams, LedgerEvent};
use crate::vasp::VaspRegistry;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AttestationError {
    #[error("credential already published at {0}")]
    CredentialExists(AccountAddress),

    #[error("no credential published at {0}")]
    CredentialMissing(AccountAddress),

    #[error("metadata signature must be 64 bytes, got {0}")]
    MalformedSignature(usize),

    #[error("metadata signature does not verify under the compliance key of {0}")]
    InvalidSignature(AccountAddress),

    #[error("compliance public key is not a valid Ed25519 key")]
    InvalidComplianceKey,

    #[error("credential at {0} has no compliance public key")]
    ComplianceKeyNotSet(AccountAddress),

    #[error("credential at {0} has no base URL")]
    BaseUrlNotSet(AccountAddress),

    #[error("attestation message could not be encoded: {0}")]
    Encoding(String),
}

impl AttestationError {
    pub fn category(&self) -> ErrorCategory {
        use AttestationError::*;
        match self {
            CredentialExists(_) => ErrorCategory::AlreadyPublished,
            CredentialMissing(_) => ErrorCategory::NotPublished,
            MalformedSignature(_) | InvalidSignature(_) | InvalidComplianceKey | Encoding(_) => {
                ErrorCategory::InvalidArgument
            }
            ComplianceKeyNotSet(_) | BaseUrlNotSet(_) => ErrorCategory::InvalidState,
        }
    }
}

/// Off-chain identity of a VASP group or dealer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub human_name: String,
    /// Endpoint counterparties contact for off-chain compliance exchange.
    pub base_url: String,
    /// Raw Ed25519 key, empty until first rotated in.
    pub compliance_public_key: Vec<u8>,
    /// Microseconds. Refreshed whenever the compliance key is rotated.
    pub expiration_date: u64,
    compliance_key_rotation_events: EventHandle,
    base_url_rotation_events: EventHandle,
}

impl Credential {
    pub fn compliance_key_rotation_events(&self) -> &EventHandle {
        &self.compliance_key_rotation_events
    }

    pub fn base_url_rotation_events(&self) -> &EventHandle {
        &self.base_url_rotation_events
    }
}

/// The message a compliance key signs to attest a payment.
pub fn dual_attestation_message(
    payer: AccountAddress,
    metadata: &[u8],
    value: u64,
) -> Result<Vec<u8>, EncodingError> {
    let mut message = metadata.to_vec();
    message.extend(to_canonical_bytes(&(payer, value))?);
    message.extend_from_slice(DUAL_ATTESTATION_DOMAIN_SEPARATOR);
    Ok(message)
}

/// Where `account`'s credential lives: the parent for VASPs, the account
/// itself otherwise.
pub fn credential_address(vasps: &VaspRegistry, account: AccountAddress) -> AccountAddress {
    vasps.parent_address(account).unwrap_or(account)
}

/// `true` for payments between two different VASP groups.
pub fn dual_attestation_required(
    vasps: &VaspRegistry,
    payer: AccountAddress,
    payee: AccountAddress,
) -> bool {
    payer != payee
        && vasps.is_vasp(payer)
        && vasps.is_vasp(payee)
        && !vasps.is_same_vasp(payer, payee)
}

#[derive(Debug, Clone, Default)]
pub struct DualAttestation {
    credentials: HashMap<AccountAddress, Credential>,
}

impl DualAttestation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes an empty credential at `created`.
    pub fn publish_credential(
        &mut self,
        created: AccountAddress,
        human_name: impl Into<String>,
        now_micros: u64,
    ) -> Result<(), AttestationError> {
        if self.credentials.contains_key(&created) {
            return Err(AttestationError::CredentialExists(created));
        }
        self.credentials.insert(
            created,
            Credential {
                human_name: human_name.into(),
                base_url: String::new(),
                compliance_public_key: Vec::new(),
                expiration_date: now_micros.saturating_add(CREDENTIAL_VALIDITY_MICROS),
                compliance_key_rotation_events: EventHandle::new(
                    created,
                    streams::COMPLIANCE_KEY_ROTATION,
                ),
                base_url_rotation_events: EventHandle::new(created, streams::BASE_URL_ROTATION),
            },
        );
        Ok(())
    }

    pub fn credential(&self, address: AccountAddress) -> Result<&Credential, AttestationError> {
        self.credentials
            .get(&address)
            .ok_or(AttestationError::CredentialMissing(address))
    }

    fn credential_mut(&mut self, address: AccountAddress) -> Result<&mut Credential, AttestationError> {
        self.credentials
            .get_mut(&address)
            .ok_or(AttestationError::CredentialMissing(address))
    }

    pub fn has_credential(&self, address: AccountAddress) -> bool {
        self.credentials.contains_key(&address)
    }

    pub fn rotate_base_url<S: EventSink<LedgerEvent>>(
        &mut self,
        address: AccountAddress,
        new_url: impl Into<String>,
        now_micros: u64,
        sink: &mut S,
    ) -> Result<(), AttestationError> {
        let credential = self.credential_mut(address)?;
        credential.base_url = new_url.into();
        credential.base_url_rotation_events.emit(
            sink,
            LedgerEvent::BaseUrlRotation {
                new_base_url: credential.base_url.clone(),
                time_rotated_micros: now_micros,
            },
        );
        Ok(())
    }

    /// Installs a new compliance key. Rejects anything that is not a valid
    /// Ed25519 public key.
    pub fn rotate_compliance_public_key<S: EventSink<LedgerEvent>>(
        &mut self,
        address: AccountAddress,
        new_key: &[u8],
        now_micros: u64,
        sink: &mut S,
    ) -> Result<(), AttestationError> {
        MeridianPublicKey::try_from_slice(new_key)
            .map_err(|_| AttestationError::InvalidComplianceKey)?;
        let credential = self.credential_mut(address)?;
        credential.compliance_public_key = new_key.to_vec();
        credential.expiration_date = now_micros.saturating_add(CREDENTIAL_VALIDITY_MICROS);
        credential.compliance_key_rotation_events.emit(
            sink,
            LedgerEvent::ComplianceKeyRotation {
                new_compliance_public_key: new_key.to_vec(),
                time_rotated_micros: now_micros,
            },
        );
        tracing::info!(%address, "compliance key rotated");
        Ok(())
    }

    pub fn human_name(&self, address: AccountAddress) -> Result<&str, AttestationError> {
        Ok(&self.credential(address)?.human_name)
    }

    pub fn base_url(&self, address: AccountAddress) -> Result<&str, AttestationError> {
        Ok(&self.credential(address)?.base_url)
    }

    pub fn compliance_public_key(&self, address: AccountAddress) -> Result<&[u8], AttestationError> {
        Ok(&self.credential(address)?.compliance_public_key)
    }

    pub fn expiration_date(&self, address: AccountAddress) -> Result<u64, AttestationError> {
        Ok(self.credential(address)?.expiration_date)
    }

    /// Gate run on every payment between withdrawal and deposit.
    pub fn assert_payment_ok(
        &self,
        vasps: &VaspRegistry,
        payer: AccountAddress,
        payee: AccountAddress,
        metadata: &[u8],
        value: u64,
        metadata_signature: &[u8],
    ) -> Result<(), AttestationError> {
        let required = dual_attestation_required(vasps, payer, payee);
        if !required && metadata_signature.is_empty() {
            return Ok(());
        }
        self.assert_signature_is_valid(
            payer,
            credential_address(vasps, payee),
            metadata,
            value,
            metadata_signature,
        )
    }

    fn assert_signature_is_valid(
        &self,
        payer: AccountAddress,
        payee_credential: AccountAddress,
        metadata: &[u8],
        value: u64,
        metadata_signature: &[u8],
    ) -> Result<(), AttestationError> {
        if metadata_signature.len() != SIGNATURE_LENGTH {
            return Err(AttestationError::MalformedSignature(metadata_signature.len()));
        }
        let credential = self.credential(payee_credential)?;
        if credential.compliance_public_key.is_empty() {
            return Err(AttestationError::ComplianceKeyNotSet(payee_credential));
        }
        if credential.base_url.is_empty() {
            return Err(AttestationError::BaseUrlNotSet(payee_credential));
        }
        let message = dual_attestation_message(payer, metadata, value)
            .map_err(|e| AttestationError::Encoding(e.to_string()))?;
        verify_raw(&credential.compliance_public_key, &message, metadata_signature)
            .map_err(|_| AttestationError::InvalidSignature(payee_credential))
    }
}
