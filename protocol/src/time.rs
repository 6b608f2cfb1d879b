//! # Ledger Clock
//!
//! The ledger's only notion of time: a microsecond counter supplied by the
//! execution engine once per block, plus a two-phase lifecycle.
//!
//! ```text
//!   Genesis ──start_operating()──▶ Operating
//!      │                              │
//!   now = 0                    update(now), non-decreasing
//! ```
//!
//! Nothing in the core polls the clock or sleeps on it; windows and
//! expirations compare against [`LedgerClock::now_micros`] lazily.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised by the clock.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClockError {
    /// The operation requires the genesis phase.
    #[error("ledger is not in genesis")]
    NotGenesis,

    /// The operation requires the operating phase.
    #[error("ledger is not operating")]
    NotOperating,

    /// A timestamp update moved time backwards.
    #[error("timestamp must not decrease: current {current}, proposed {proposed}")]
    TimeWentBackwards {
        /// Current clock value in microseconds.
        current: u64,
        /// The rejected value.
        proposed: u64,
    },
}

/// Lifecycle phase of the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Bootstrap: currencies and system accounts are wired up.
    Genesis,
    /// Normal operation: payments flow, time advances.
    Operating,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Genesis => write!(f, "genesis"),
            Phase::Operating => write!(f, "operating"),
        }
    }
}

/// Two-phase monotonic time oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerClock {
    phase: Phase,
    now_micros: u64,
}

impl LedgerClock {
    /// A clock in genesis at time zero.
    pub fn new() -> Self {
        Self {
            phase: Phase::Genesis,
            now_micros: 0,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current time in microseconds.
    pub fn now_micros(&self) -> u64 {
        self.now_micros
    }

    /// `true` while bootstrapping.
    pub fn is_genesis(&self) -> bool {
        self.phase == Phase::Genesis
    }

    /// `true` once operating.
    pub fn is_operating(&self) -> bool {
        self.phase == Phase::Operating
    }

    /// Leave genesis. One-way.
    pub fn start_operating(&mut self) -> Result<(), ClockError> {
        self.assert_genesis()?;
        self.phase = Phase::Operating;
        tracing::info!(now_micros = self.now_micros, "ledger clock started operating");
        Ok(())
    }

    /// Advance to `now_micros`. Equal timestamps are accepted (several
    /// transactions share one block timestamp).
    pub fn update(&mut self, now_micros: u64) -> Result<(), ClockError> {
        self.assert_operating()?;
        if now_micros < self.now_micros {
            return Err(ClockError::TimeWentBackwards {
                current: self.now_micros,
                proposed: now_micros,
            });
        }
        self.now_micros = now_micros;
        Ok(())
    }

    /// Fails unless in genesis.
    pub fn assert_genesis(&self) -> Result<(), ClockError> {
        if self.is_genesis() {
            Ok(())
        } else {
            Err(ClockError::NotGenesis)
        }
    }

    /// Fails unless operating.
    pub fn assert_operating(&self) -> Result<(), ClockError> {
        if self.is_operating() {
            Ok(())
        } else {
            Err(ClockError::NotOperating)
        }
    }
}

impl Default for LedgerClock {
    fn default() -> Self {
        Self::new()
    }
}
