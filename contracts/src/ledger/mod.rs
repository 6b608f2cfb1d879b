//! # Ledger
//!
//! [`Ledger`] owns every store, the clock, the event log and the metrics,
//! and exposes the operations the execution engine calls. Each public
//! mutating operation runs as one transaction: if it fails, all of its
//! state changes and emitted events are discarded. Transactions are
//! internal to the crate, so a token or capability only leaves the ledger
//! through an operation that committed.
//!
//! Operations that take a token or capability by value hand it back in a
//! [`Rejected`] when they abort. Capability serials survive a rollback, so
//! a capability extracted inside an aborted transaction stays dead.
//!
//! The operations are split across submodules by concern:
//!
//! | Module       | Operations                                            |
//! |--------------|-------------------------------------------------------|
//! | `accounts`   | account creation, currencies, capabilities, freezing |
//! | `treasury`   | registration, mint, preburn, burn                     |
//! | `payments`   | deposit, withdraw, pay                                |
//! | `compliance` | limits, credentials, recovery addresses               |

mod accounts;
mod compliance;
mod payments;
mod treasury;

use meridian_protocol::config::LedgerConfig;
use meridian_protocol::events::EventHandle;
use meridian_protocol::metrics::LedgerMetrics;
use meridian_protocol::time::LedgerClock;
use meridian_protocol::AccountAddress;

use crate::account::AccountStore;
use crate::currency::CurrencyRegistry;
use crate::dual_attestation::{self, DualAttestation};
use crate::error::{LedgerError, Rejected};
use crate::events::{streams, LedgerEventLog};
use crate::limits::LimitsStore;
use crate::recovery_address::RecoveryAddresses;
use crate::roles::RoleRegistry;
use crate::token::CurrencyCode;
use crate::vasp::VaspRegistry;

/// Event streams for account-level administration, owned by root.
#[derive(Debug, Clone)]
struct AccountOperations {
    root: AccountAddress,
    create_account_events: EventHandle,
    freeze_account_events: EventHandle,
    unfreeze_account_events: EventHandle,
}

impl AccountOperations {
    fn new(root: AccountAddress) -> Self {
        Self {
            root,
            create_account_events: EventHandle::new(root, streams::CREATE_ACCOUNT),
            freeze_account_events: EventHandle::new(root, streams::FREEZE_ACCOUNT),
            unfreeze_account_events: EventHandle::new(root, streams::UNFREEZE_ACCOUNT),
        }
    }
}

/// Everything a transaction may change. Cloned as the rollback snapshot.
#[derive(Debug, Clone, Default)]
struct LedgerState {
    clock: LedgerClock,
    roles: RoleRegistry,
    vasps: VaspRegistry,
    currencies: CurrencyRegistry,
    accounts: AccountStore,
    limits: LimitsStore,
    recovery: RecoveryAddresses,
    attestation: DualAttestation,
    operations: Option<AccountOperations>,
}

/// Rollback point taken when a transaction starts.
struct Checkpoint {
    state: LedgerState,
    events_len: usize,
}

/// The ledger core.
pub struct Ledger {
    state: LedgerState,
    events: LedgerEventLog,
    metrics: LedgerMetrics,
    config: LedgerConfig,
    depth: usize,
}

impl Ledger {
    /// A ledger in genesis with default configuration.
    pub fn new() -> Self {
        Self::with_config(LedgerConfig::default())
    }

    /// A ledger in genesis. `config` should have passed
    /// [`LedgerConfig::validate`].
    pub fn with_config(config: LedgerConfig) -> Self {
        let metrics = LedgerMetrics::new(&config.metrics_namespace);
        tracing::info!(chain_id = config.chain_id, "ledger created");
        Self {
            state: LedgerState::default(),
            events: LedgerEventLog::new(),
            metrics,
            config,
            depth: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------------

    /// Runs `f` atomically: on `Err` every state change and event emitted by
    /// `f` is discarded. Calls nest.
    pub(crate) fn transact<T, F>(&mut self, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut Self) -> Result<T, LedgerError>,
    {
        let checkpoint = self.begin();
        let result = f(self);
        self.finish(checkpoint, result.as_ref().err());
        result
    }

    /// [`Ledger::transact`] for operations that hand an owned value back
    /// when they abort.
    pub(crate) fn transact_returning<T, V, F>(&mut self, f: F) -> Result<T, Rejected<V>>
    where
        F: FnOnce(&mut Self) -> Result<T, Rejected<V>>,
    {
        let checkpoint = self.begin();
        let result = f(self);
        self.finish(checkpoint, result.as_ref().err().map(|r| &r.error));
        result
    }

    fn begin(&mut self) -> Checkpoint {
        self.depth += 1;
        Checkpoint {
            state: self.state.clone(),
            events_len: self.events.len(),
        }
    }

    fn finish(&mut self, checkpoint: Checkpoint, error: Option<&LedgerError>) {
        self.depth -= 1;
        if let Some(err) = error {
            let issued = self.state.accounts.capability_serial();
            self.state = checkpoint.state;
            self.state.accounts.resume_capability_serial(issued);
            self.events.truncate(checkpoint.events_len);
            if self.depth == 0 {
                self.metrics
                    .aborted_transactions_total
                    .with_label_values(&[err.category().as_str()])
                    .inc();
                tracing::warn!(category = %err.category(), error = %err, "transaction aborted");
            }
        }
        if self.depth == 0 {
            self.metrics
                .preburn_queue_entries
                .set(self.state.currencies.total_preburn_entries() as i64);
        }
    }

    // -----------------------------------------------------------------------
    // Time
    // -----------------------------------------------------------------------

    /// Ends genesis.
    pub fn start_operating(&mut self) -> Result<(), LedgerError> {
        self.transact(|l| Ok(l.state.clock.start_operating()?))
    }

    /// Advances the clock to the engine's block timestamp.
    pub fn update_time(&mut self, now_micros: u64) -> Result<(), LedgerError> {
        self.transact(|l| Ok(l.state.clock.update(now_micros)?))
    }

    pub fn now_micros(&self) -> u64 {
        self.state.clock.now_micros()
    }

    // -----------------------------------------------------------------------
    // Read access
    // -----------------------------------------------------------------------

    pub fn clock(&self) -> &LedgerClock {
        &self.state.clock
    }

    pub fn roles(&self) -> &RoleRegistry {
        &self.state.roles
    }

    pub fn vasps(&self) -> &VaspRegistry {
        &self.state.vasps
    }

    pub fn currencies(&self) -> &CurrencyRegistry {
        &self.state.currencies
    }

    pub fn accounts(&self) -> &AccountStore {
        &self.state.accounts
    }

    pub fn limits(&self) -> &LimitsStore {
        &self.state.limits
    }

    pub fn recovery_addresses(&self) -> &RecoveryAddresses {
        &self.state.recovery
    }

    pub fn dual_attestation(&self) -> &DualAttestation {
        &self.state.attestation
    }

    pub fn events(&self) -> &LedgerEventLog {
        &self.events
    }

    pub fn metrics(&self) -> &LedgerMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn balance(&self, account: AccountAddress, code: &CurrencyCode) -> Result<u64, LedgerError> {
        Ok(self.state.accounts.balance(account, code)?)
    }

    pub fn is_currency(&self, code: &CurrencyCode) -> bool {
        self.state.currencies.is_currency(code)
    }

    pub fn role_id(&self, account: AccountAddress) -> Result<u64, LedgerError> {
        Ok(self.state.roles.role_id(account)?)
    }

    pub fn sequence_number(&self, account: AccountAddress) -> Result<u64, LedgerError> {
        Ok(self.state.accounts.sequence_number(account)?)
    }

    pub fn market_cap(&self, code: &CurrencyCode) -> Result<u128, LedgerError> {
        Ok(self.state.currencies.market_cap(code)?)
    }

    pub fn preburn_value(&self, code: &CurrencyCode) -> Result<u64, LedgerError> {
        Ok(self.state.currencies.preburn_value(code)?)
    }

    /// Address of the limits definition governing `account`'s group.
    pub fn limits_definition_address(
        &self,
        account: AccountAddress,
        code: &CurrencyCode,
    ) -> Result<AccountAddress, LedgerError> {
        let window = self.limits_window_address(account);
        Ok(self.state.limits.limits_definition_address(window, code)?)
    }

    /// Compliance key attesting payments into `account`'s group.
    pub fn compliance_public_key(&self, account: AccountAddress) -> Result<&[u8], LedgerError> {
        let holder = dual_attestation::credential_address(&self.state.vasps, account);
        Ok(self.state.attestation.compliance_public_key(holder)?)
    }

    /// Balances plus preburns. Equals [`Ledger::market_cap`] between
    /// transactions.
    pub fn circulating_value(&self, code: &CurrencyCode) -> Result<u128, LedgerError> {
        let preburn = self.state.currencies.preburn_value(code)?;
        Ok(self.state.accounts.total_balance(code) + preburn as u128)
    }

    // -----------------------------------------------------------------------
    // Shared helpers
    // -----------------------------------------------------------------------

    /// Limits windows of VASP groups live at the parent address.
    fn limits_window_address(&self, account: AccountAddress) -> AccountAddress {
        self.state.vasps.parent_address(account).unwrap_or(account)
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("phase", &self.state.clock.phase())
            .field("now_micros", &self.state.clock.now_micros())
            .field("accounts", &self.state.accounts.len())
            .field("currencies", &self.state.currencies.currency_codes())
            .field("events", &self.events.len())
            .finish()
    }
}
