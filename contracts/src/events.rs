//! Event payloads emitted by the ledger.
//!
//! Every stream is owned by the record whose activity it reports: currency
//! streams by the registrar, payment and key-rotation streams by the
//! account, credential streams by the credential holder, and account
//! operations by the root account.

use serde::{Deserialize, Serialize};

use meridian_protocol::events::EventLog;
use meridian_protocol::{AccountAddress, AuthenticationKey};

use crate::roles::RoleId;
use crate::token::CurrencyCode;

/// Stream names. Currency streams are suffixed with `/<code>`.
pub mod streams {
    pub const MINT: &str = "mint";
    pub const BURN: &str = "burn";
    pub const PREBURN: &str = "preburn";
    pub const CANCEL_BURN: &str = "cancel_burn";
    pub const MINTING_ABILITY: &str = "minting_ability";
    pub const SENT_PAYMENT: &str = "sent_payment";
    pub const RECEIVED_PAYMENT: &str = "received_payment";
    pub const KEY_ROTATION: &str = "key_rotation";
    pub const COMPLIANCE_KEY_ROTATION: &str = "compliance_key_rotation";
    pub const BASE_URL_ROTATION: &str = "base_url_rotation";
    pub const CREATE_ACCOUNT: &str = "create_account";
    pub const FREEZE_ACCOUNT: &str = "freeze_account";
    pub const UNFREEZE_ACCOUNT: &str = "unfreeze_account";

    /// `"<stream>/<code>"`.
    pub fn for_currency(stream: &str, code: &super::CurrencyCode) -> String {
        format!("{stream}/{code}")
    }
}

/// Payload of every ledger event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    Mint {
        currency: CurrencyCode,
        amount: u64,
    },
    Preburn {
        currency: CurrencyCode,
        amount: u64,
        preburn_address: AccountAddress,
    },
    Burn {
        currency: CurrencyCode,
        amount: u64,
        preburn_address: AccountAddress,
    },
    CancelBurn {
        currency: CurrencyCode,
        amount: u64,
        preburn_address: AccountAddress,
    },
    MintingAbilityChanged {
        currency: CurrencyCode,
        can_mint: bool,
    },
    SentPayment {
        currency: CurrencyCode,
        amount: u64,
        payee: AccountAddress,
        metadata: Vec<u8>,
    },
    ReceivedPayment {
        currency: CurrencyCode,
        amount: u64,
        payer: AccountAddress,
        metadata: Vec<u8>,
    },
    KeyRotation {
        new_authentication_key: AuthenticationKey,
    },
    ComplianceKeyRotation {
        new_compliance_public_key: Vec<u8>,
        time_rotated_micros: u64,
    },
    BaseUrlRotation {
        new_base_url: String,
        time_rotated_micros: u64,
    },
    AccountCreated {
        created: AccountAddress,
        role: RoleId,
    },
    AccountFrozen {
        initiator: AccountAddress,
        frozen: AccountAddress,
    },
    AccountUnfrozen {
        initiator: AccountAddress,
        unfrozen: AccountAddress,
    },
}

/// The in-memory sink the [`Ledger`](crate::ledger::Ledger) writes to.
pub type LedgerEventLog = EventLog<LedgerEvent>;
