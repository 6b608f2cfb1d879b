//! # Protocol Configuration & Constants
//!
//! Every magic number of the ledger core lives here, together with
//! [`LedgerConfig`], the small set of values an embedder may tune.
//!
//! Capacities and key lengths are part of the on-ledger contract and are
//! constants; the config struct only carries values that are legitimately
//! deployment-specific.

use std::path::Path;

use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Ed25519 public key length in bytes.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Ed25519 signature length. Anything else is malformed.
pub const SIGNATURE_LENGTH: usize = 64;

/// Authentication key length in bytes (a SHA-256 digest).
pub const AUTHENTICATION_KEY_LENGTH: usize = 32;

/// Account address length in bytes. The address is the trailing
/// `ADDRESS_LENGTH` bytes of the authentication key.
pub const ADDRESS_LENGTH: usize = 16;

/// Scheme byte appended to an Ed25519 public key before hashing it into an
/// authentication key.
pub const ED25519_SCHEME: u8 = 0x00;

/// Domain separator appended to every dual-attestation message so a
/// compliance signature can never be replayed as some other kind of
/// signature.
pub const DUAL_ATTESTATION_DOMAIN_SEPARATOR: &[u8] = b"@@$$MERIDIAN_ATTEST$$@@";

// ---------------------------------------------------------------------------
// Capacities
// ---------------------------------------------------------------------------

/// Maximum number of outstanding entries in one dealer's preburn queue.
pub const MAX_PREBURN_QUEUE_SIZE: usize = 256;

/// Maximum number of key rotation capabilities pooled in one recovery address.
pub const MAX_RECOVERY_CAPABILITIES: usize = 256;

/// Maximum number of child accounts under one parent VASP.
pub const MAX_CHILD_ACCOUNTS: u64 = 256;

/// Maximum number of decimal places a currency may declare. `10^19` is the
/// largest power of ten that fits in a `u64`.
pub const MAX_CURRENCY_DECIMALS: u8 = 19;

/// Maximum length of a currency code.
pub const MAX_CURRENCY_CODE_LENGTH: usize = 8;

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Microseconds per second.
pub const MICROS_PER_SECOND: u64 = 1_000_000;

/// One day in microseconds: the time period of the unrestricted limits
/// definition.
pub const ONE_DAY_MICROS: u64 = 86_400 * MICROS_PER_SECOND;

/// Credentials expire one year after publication unless refreshed.
pub const CREDENTIAL_VALIDITY_MICROS: u64 = 365 * ONE_DAY_MICROS;

// ---------------------------------------------------------------------------
// LedgerConfig
// ---------------------------------------------------------------------------

/// Deployment-tunable ledger settings.
///
/// Loaded from JSON by embedders; every field has a default so a partial file
/// (or none at all) is fine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Chain identifier surfaced in logs and metrics.
    pub chain_id: u8,
    /// Prefix for the Prometheus registry.
    pub metrics_namespace: String,
    /// Default log directive when `RUST_LOG` is unset.
    pub log_level: String,
    /// Emit JSON log lines instead of pretty output.
    pub json_logs: bool,
    /// Time period, in microseconds, for limits definitions published without
    /// an explicit period.
    pub default_limits_period_micros: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            chain_id: 4,
            metrics_namespace: "meridian".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            default_limits_period_micros: ONE_DAY_MICROS,
        }
    }
}

impl LedgerConfig {
    /// Parse a config from a JSON string and validate it.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(json).context("malformed ledger config")?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading ledger config {}", path.display()))?;
        Self::from_json(&raw)
    }

    /// Reject values the ledger cannot operate with.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.default_limits_period_micros > 0,
            "default_limits_period_micros must be non-zero"
        );
        ensure!(
            !self.metrics_namespace.is_empty()
                && self
                    .metrics_namespace
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_'),
            "metrics_namespace must be a non-empty [A-Za-z0-9_] identifier"
        );
        Ok(())
    }
}
