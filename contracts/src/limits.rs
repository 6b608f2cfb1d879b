//! # Account Limits
//!
//! A [`LimitsDefinition`] caps inflow, outflow and holdings over a time
//! period. A [`Window`] tracks one account's usage against the definition
//! published at its `limit_address`, so many windows can share one
//! definition.
//!
//! Windows reset lazily: every check first compares the current time
//! against `window_start`, and once more than `time_period` has elapsed the
//! flow counters start over. Nothing runs on a timer.
//!
//! A check that rejects records nothing. The unrestricted definition
//! (all caps at `u64::MAX`, one-day period) accepts everything without
//! touching the window.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use meridian_protocol::config::ONE_DAY_MICROS;
use meridian_protocol::AccountAddress;

use crate::error::ErrorCategory;
use crate::token::CurrencyCode;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LimitsError {
    #[error("no {currency} limits definition at {address}")]
    DefinitionMissing {
        address: AccountAddress,
        currency: CurrencyCode,
    },

    #[error("{currency} limits definition already published at {address}")]
    DefinitionExists {
        address: AccountAddress,
        currency: CurrencyCode,
    },

    #[error("no {currency} limits window at {address}")]
    WindowMissing {
        address: AccountAddress,
        currency: CurrencyCode,
    },

    #[error("{currency} limits window already published at {address}")]
    WindowExists {
        address: AccountAddress,
        currency: CurrencyCode,
    },

    #[error("limits time period must be non-zero")]
    ZeroTimePeriod,

    #[error("inflow of {amount} exceeds limit: {used} of {max} used")]
    InflowExceeded { amount: u64, used: u64, max: u64 },

    #[error("holding {amount} more exceeds limit: {held} of {max} held")]
    HoldingExceeded { amount: u64, held: u64, max: u64 },

    #[error("outflow of {amount} exceeds limit: {used} of {max} used")]
    OutflowExceeded { amount: u64, used: u64, max: u64 },
}

impl LimitsError {
    pub fn category(&self) -> ErrorCategory {
        use LimitsError::*;
        match self {
            DefinitionMissing { .. } | WindowMissing { .. } => ErrorCategory::NotPublished,
            DefinitionExists { .. } | WindowExists { .. } => ErrorCategory::AlreadyPublished,
            ZeroTimePeriod => ErrorCategory::InvalidArgument,
            InflowExceeded { .. } | HoldingExceeded { .. } | OutflowExceeded { .. } => {
                ErrorCategory::LimitExceeded
            }
        }
    }
}

// ---------------------------------------------------------------------------
// LimitsDefinition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsDefinition {
    pub max_inflow: u64,
    pub max_outflow: u64,
    pub max_holding: u64,
    /// Window length in microseconds.
    pub time_period: u64,
}

impl LimitsDefinition {
    /// The sentinel that disables tracking.
    pub const fn unrestricted() -> Self {
        Self {
            max_inflow: u64::MAX,
            max_outflow: u64::MAX,
            max_holding: u64::MAX,
            time_period: ONE_DAY_MICROS,
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        *self == Self::unrestricted()
    }
}

/// Partial update of a definition. `None` leaves a field unchanged, so an
/// explicit zero cap is expressible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsUpdate {
    pub max_inflow: Option<u64>,
    pub max_outflow: Option<u64>,
    pub max_holding: Option<u64>,
    pub time_period: Option<u64>,
}

impl LimitsUpdate {
    /// Legacy encoding where zero means "leave unchanged".
    pub fn from_nonzero(max_inflow: u64, max_outflow: u64, max_holding: u64, time_period: u64) -> Self {
        let nonzero = |v: u64| (v > 0).then_some(v);
        Self {
            max_inflow: nonzero(max_inflow),
            max_outflow: nonzero(max_outflow),
            max_holding: nonzero(max_holding),
            time_period: nonzero(time_period),
        }
    }

    fn apply_to(&self, def: &mut LimitsDefinition) {
        if let Some(v) = self.max_inflow {
            def.max_inflow = v;
        }
        if let Some(v) = self.max_outflow {
            def.max_outflow = v;
        }
        if let Some(v) = self.max_holding {
            def.max_holding = v;
        }
        if let Some(v) = self.time_period {
            def.time_period = v;
        }
    }
}

// ---------------------------------------------------------------------------
// Window
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub window_start: u64,
    pub window_inflow: u64,
    pub window_outflow: u64,
    pub tracked_balance: u64,
    /// Where the governing [`LimitsDefinition`] lives.
    pub limit_address: AccountAddress,
}

impl Window {
    pub fn new(limit_address: AccountAddress, now_micros: u64) -> Self {
        Self {
            window_start: now_micros,
            window_inflow: 0,
            window_outflow: 0,
            tracked_balance: 0,
            limit_address,
        }
    }

    /// Starts a new period if the current one has expired.
    fn reset_if_expired(&mut self, def: &LimitsDefinition, now_micros: u64) -> bool {
        if now_micros.saturating_sub(self.window_start) > def.time_period {
            self.window_start = now_micros;
            self.window_inflow = 0;
            self.window_outflow = 0;
            return true;
        }
        false
    }

    /// Accepts and records an inflow of `amount`, or rejects leaving the
    /// window untouched.
    pub fn can_receive(
        &mut self,
        def: &LimitsDefinition,
        amount: u64,
        now_micros: u64,
    ) -> Result<(), LimitsError> {
        if def.is_unrestricted() {
            return Ok(());
        }
        let mut next = self.clone();
        next.reset_if_expired(def, now_micros);

        if next.window_inflow as u128 + amount as u128 > def.max_inflow as u128 {
            return Err(LimitsError::InflowExceeded {
                amount,
                used: next.window_inflow,
                max: def.max_inflow,
            });
        }
        if next.tracked_balance as u128 + amount as u128 > def.max_holding as u128 {
            return Err(LimitsError::HoldingExceeded {
                amount,
                held: next.tracked_balance,
                max: def.max_holding,
            });
        }
        next.window_inflow += amount;
        next.tracked_balance += amount;
        *self = next;
        Ok(())
    }

    /// Accepts and records an outflow of `amount`, or rejects leaving the
    /// window untouched.
    pub fn can_withdraw(
        &mut self,
        def: &LimitsDefinition,
        amount: u64,
        now_micros: u64,
    ) -> Result<(), LimitsError> {
        if def.is_unrestricted() {
            return Ok(());
        }
        let mut next = self.clone();
        next.reset_if_expired(def, now_micros);

        if next.window_outflow as u128 + amount as u128 > def.max_outflow as u128 {
            return Err(LimitsError::OutflowExceeded {
                amount,
                used: next.window_outflow,
                max: def.max_outflow,
            });
        }
        next.window_outflow += amount;
        next.tracked_balance = next.tracked_balance.saturating_sub(amount);
        *self = next;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// LimitsStore
// ---------------------------------------------------------------------------

type Key = (AccountAddress, CurrencyCode);

/// Definitions and windows, keyed by (address, currency).
#[derive(Debug, Clone, Default)]
pub struct LimitsStore {
    definitions: HashMap<Key, LimitsDefinition>,
    windows: HashMap<Key, Window>,
}

impl LimitsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish_unrestricted_limits(
        &mut self,
        publisher: AccountAddress,
        code: &CurrencyCode,
    ) -> Result<(), LimitsError> {
        self.publish_limits_definition(publisher, code, LimitsDefinition::unrestricted())
    }

    pub fn publish_limits_definition(
        &mut self,
        publisher: AccountAddress,
        code: &CurrencyCode,
        definition: LimitsDefinition,
    ) -> Result<(), LimitsError> {
        if definition.time_period == 0 {
            return Err(LimitsError::ZeroTimePeriod);
        }
        let key = (publisher, code.clone());
        if self.definitions.contains_key(&key) {
            return Err(LimitsError::DefinitionExists {
                address: publisher,
                currency: code.clone(),
            });
        }
        self.definitions.insert(key, definition);
        Ok(())
    }

    /// Opens a window at `window_address` governed by the definition at
    /// `limit_address`.
    pub fn publish_window(
        &mut self,
        window_address: AccountAddress,
        code: &CurrencyCode,
        limit_address: AccountAddress,
        now_micros: u64,
    ) -> Result<(), LimitsError> {
        self.limits_definition(limit_address, code)?;
        let key = (window_address, code.clone());
        if self.windows.contains_key(&key) {
            return Err(LimitsError::WindowExists {
                address: window_address,
                currency: code.clone(),
            });
        }
        self.windows
            .insert(key, Window::new(limit_address, now_micros));
        Ok(())
    }

    /// Updates a definition in place. A zero argument leaves that field
    /// unchanged.
    pub fn update_limits_definition(
        &mut self,
        limit_address: AccountAddress,
        code: &CurrencyCode,
        max_inflow: u64,
        max_outflow: u64,
        max_holding: u64,
        time_period: u64,
    ) -> Result<(), LimitsError> {
        let update = LimitsUpdate::from_nonzero(max_inflow, max_outflow, max_holding, time_period);
        self.apply_limits_update(limit_address, code, update)
    }

    pub fn apply_limits_update(
        &mut self,
        limit_address: AccountAddress,
        code: &CurrencyCode,
        update: LimitsUpdate,
    ) -> Result<(), LimitsError> {
        if update.time_period == Some(0) {
            return Err(LimitsError::ZeroTimePeriod);
        }
        let def = self
            .definitions
            .get_mut(&(limit_address, code.clone()))
            .ok_or_else(|| LimitsError::DefinitionMissing {
                address: limit_address,
                currency: code.clone(),
            })?;
        update.apply_to(def);
        tracing::info!(%limit_address, %code, ?def, "limits definition updated");
        Ok(())
    }

    /// Repoints a window at another definition. A non-zero
    /// `aggregate_window_period` also overrides `window_start`.
    pub fn update_window_info(
        &mut self,
        window_address: AccountAddress,
        code: &CurrencyCode,
        aggregate_window_period: u64,
        new_limit_address: AccountAddress,
    ) -> Result<(), LimitsError> {
        self.limits_definition(new_limit_address, code)?;
        let window = self.window_mut(window_address, code)?;
        if aggregate_window_period > 0 {
            window.window_start = aggregate_window_period;
        }
        window.limit_address = new_limit_address;
        Ok(())
    }

    /// Checks and records an inflow against the window at `window_address`.
    pub fn record_deposit(
        &mut self,
        window_address: AccountAddress,
        code: &CurrencyCode,
        amount: u64,
        now_micros: u64,
    ) -> Result<(), LimitsError> {
        let def = self.governing_definition(window_address, code)?;
        self.window_mut(window_address, code)?
            .can_receive(&def, amount, now_micros)
    }

    /// Checks and records an outflow against the window at `window_address`.
    pub fn record_withdrawal(
        &mut self,
        window_address: AccountAddress,
        code: &CurrencyCode,
        amount: u64,
        now_micros: u64,
    ) -> Result<(), LimitsError> {
        let def = self.governing_definition(window_address, code)?;
        self.window_mut(window_address, code)?
            .can_withdraw(&def, amount, now_micros)
    }

    fn governing_definition(
        &self,
        window_address: AccountAddress,
        code: &CurrencyCode,
    ) -> Result<LimitsDefinition, LimitsError> {
        let limit_address = self.window(window_address, code)?.limit_address;
        self.limits_definition(limit_address, code).copied()
    }

    fn window_mut(
        &mut self,
        address: AccountAddress,
        code: &CurrencyCode,
    ) -> Result<&mut Window, LimitsError> {
        self.windows
            .get_mut(&(address, code.clone()))
            .ok_or_else(|| LimitsError::WindowMissing {
                address,
                currency: code.clone(),
            })
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn has_limits_published(&self, address: AccountAddress, code: &CurrencyCode) -> bool {
        self.definitions.contains_key(&(address, code.clone()))
    }

    pub fn has_window_published(&self, address: AccountAddress, code: &CurrencyCode) -> bool {
        self.windows.contains_key(&(address, code.clone()))
    }

    pub fn limits_definition(
        &self,
        address: AccountAddress,
        code: &CurrencyCode,
    ) -> Result<&LimitsDefinition, LimitsError> {
        self.definitions
            .get(&(address, code.clone()))
            .ok_or_else(|| LimitsError::DefinitionMissing {
                address,
                currency: code.clone(),
            })
    }

    pub fn window(&self, address: AccountAddress, code: &CurrencyCode) -> Result<&Window, LimitsError> {
        self.windows
            .get(&(address, code.clone()))
            .ok_or_else(|| LimitsError::WindowMissing {
                address,
                currency: code.clone(),
            })
    }

    /// The address of the definition governing the window at `address`.
    pub fn limits_definition_address(
        &self,
        address: AccountAddress,
        code: &CurrencyCode,
    ) -> Result<AccountAddress, LimitsError> {
        Ok(self.window(address, code)?.limit_address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: AccountAddress = AccountAddress::from_u64(0x11);
    const VASP: AccountAddress = AccountAddress::from_u64(0x22);

    fn xus() -> CurrencyCode {
        CurrencyCode::new("XUS").unwrap()
    }

    fn capped(max_inflow: u64) -> LimitsDefinition {
        LimitsDefinition {
            max_inflow,
            max_outflow: 1_000,
            max_holding: 1_000,
            time_period: ONE_DAY_MICROS,
        }
    }

    fn store_with(def: LimitsDefinition) -> LimitsStore {
        let mut store = LimitsStore::new();
        store.publish_limits_definition(LIMITS, &xus(), def).unwrap();
        store.publish_window(VASP, &xus(), LIMITS, 0).unwrap();
        store
    }

    #[test]
    fn inflow_window_rejects_then_resets() {
        let mut store = store_with(capped(100));

        store.record_deposit(VASP, &xus(), 60, 1).unwrap();
        let err = store.record_deposit(VASP, &xus(), 50, 2).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::LimitExceeded);
        assert_eq!(store.window(VASP, &xus()).unwrap().window_inflow, 60);

        let later = ONE_DAY_MICROS + 2;
        store.record_deposit(VASP, &xus(), 50, later).unwrap();
        let window = store.window(VASP, &xus()).unwrap();
        assert_eq!(window.window_inflow, 50);
        assert_eq!(window.window_start, later);
    }

    #[test]
    fn window_does_not_reset_at_exact_period() {
        let mut store = store_with(capped(100));
        store.record_deposit(VASP, &xus(), 100, 0).unwrap();
        assert!(store.record_deposit(VASP, &xus(), 1, ONE_DAY_MICROS).is_err());
        assert!(store.record_deposit(VASP, &xus(), 1, ONE_DAY_MICROS + 1).is_ok());
    }

    #[test]
    fn holding_cap_applies_across_periods() {
        let mut def = capped(u64::MAX - 1);
        def.max_holding = 100;
        let mut store = store_with(def);

        store.record_deposit(VASP, &xus(), 80, 0).unwrap();
        let err = store
            .record_deposit(VASP, &xus(), 30, 10 * ONE_DAY_MICROS)
            .unwrap_err();
        assert!(matches!(err, LimitsError::HoldingExceeded { held: 80, .. }));
    }

    #[test]
    fn withdrawal_reduces_tracked_balance_to_floor() {
        let mut store = store_with(capped(1_000));
        store.record_deposit(VASP, &xus(), 30, 0).unwrap();
        store.record_withdrawal(VASP, &xus(), 50, 0).unwrap();
        let window = store.window(VASP, &xus()).unwrap();
        assert_eq!(window.tracked_balance, 0);
        assert_eq!(window.window_outflow, 50);
    }

    #[test]
    fn unrestricted_records_nothing() {
        let mut store = store_with(LimitsDefinition::unrestricted());
        store.record_deposit(VASP, &xus(), u64::MAX, 0).unwrap();
        store.record_withdrawal(VASP, &xus(), u64::MAX, 0).unwrap();
        assert_eq!(store.window(VASP, &xus()).unwrap(), &Window::new(LIMITS, 0));
    }

    #[test]
    fn zero_means_unchanged_in_bulk_update() {
        let mut store = store_with(capped(100));
        store
            .update_limits_definition(LIMITS, &xus(), 0, 5, 0, 0)
            .unwrap();
        let def = store.limits_definition(LIMITS, &xus()).unwrap();
        assert_eq!((def.max_inflow, def.max_outflow), (100, 5));
    }

    #[test]
    fn explicit_zero_through_limits_update() {
        let mut store = store_with(capped(100));
        let update = LimitsUpdate {
            max_inflow: Some(0),
            ..LimitsUpdate::default()
        };
        store.apply_limits_update(LIMITS, &xus(), update).unwrap();
        assert!(store.record_deposit(VASP, &xus(), 1, 0).is_err());
    }

    #[test]
    fn window_needs_existing_definition() {
        let mut store = LimitsStore::new();
        let err = store.publish_window(VASP, &xus(), LIMITS, 0).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::NotPublished);
    }

    #[test]
    fn update_window_info_repoints() {
        let mut store = store_with(capped(100));
        let other = AccountAddress::from_u64(0x33);
        store
            .publish_limits_definition(other, &xus(), capped(5))
            .unwrap();
        store.update_window_info(VASP, &xus(), 42, other).unwrap();
        assert_eq!(store.limits_definition_address(VASP, &xus()), Ok(other));
        assert_eq!(store.window(VASP, &xus()).unwrap().window_start, 42);
        assert!(store.record_deposit(VASP, &xus(), 6, 42).is_err());
    }
}
