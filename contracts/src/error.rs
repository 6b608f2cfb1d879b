//! Error categories and the aggregate [`LedgerError`].
//!
//! Each module has its own error enum. Every variant maps to one
//! [`ErrorCategory`], which is what callers (and the abort metrics) key on.
//!
//! Operations that take ownership of a [`Token`](crate::Token) or a
//! capability fail with [`Rejected`], which hands the value back.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use meridian_protocol::time::ClockError;

use crate::account::AccountError;
use crate::currency::CurrencyError;
use crate::dual_attestation::AttestationError;
use crate::limits::LimitsError;
use crate::recovery_address::RecoveryError;
use crate::roles::RoleError;
use crate::vasp::VaspError;

/// Coarse classification of every abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// The ledger is in a state where the operation cannot run.
    InvalidState,
    /// The caller lacks the required role.
    RequiresRole,
    /// The caller lacks the required capability.
    RequiresCapability,
    /// A record the operation needs does not exist.
    NotPublished,
    /// A record the operation would create already exists.
    AlreadyPublished,
    /// An argument is malformed or out of range.
    InvalidArgument,
    /// A quantity would exceed its bound.
    LimitExceeded,
}

impl ErrorCategory {
    /// Stable numeric code.
    pub fn code(self) -> u8 {
        match self {
            ErrorCategory::InvalidState => 1,
            ErrorCategory::RequiresRole => 3,
            ErrorCategory::RequiresCapability => 4,
            ErrorCategory::NotPublished => 5,
            ErrorCategory::AlreadyPublished => 6,
            ErrorCategory::InvalidArgument => 7,
            ErrorCategory::LimitExceeded => 8,
        }
    }

    /// Snake-case name, used as a metrics label.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::InvalidState => "invalid_state",
            ErrorCategory::RequiresRole => "requires_role",
            ErrorCategory::RequiresCapability => "requires_capability",
            ErrorCategory::NotPublished => "not_published",
            ErrorCategory::AlreadyPublished => "already_published",
            ErrorCategory::InvalidArgument => "invalid_argument",
            ErrorCategory::LimitExceeded => "limit_exceeded",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any error a ledger operation can abort with.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error(transparent)]
    Role(#[from] RoleError),

    #[error(transparent)]
    Vasp(#[from] VaspError),

    #[error(transparent)]
    Currency(#[from] CurrencyError),

    #[error(transparent)]
    Account(#[from] AccountError),

    #[error(transparent)]
    Limits(#[from] LimitsError),

    #[error(transparent)]
    Recovery(#[from] RecoveryError),

    #[error(transparent)]
    Attestation(#[from] AttestationError),

    #[error(transparent)]
    Clock(#[from] ClockError),
}

impl LedgerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LedgerError::Role(e) => e.category(),
            LedgerError::Vasp(e) => e.category(),
            LedgerError::Currency(e) => e.category(),
            LedgerError::Account(e) => e.category(),
            LedgerError::Limits(e) => e.category(),
            LedgerError::Recovery(e) => e.category(),
            LedgerError::Attestation(e) => e.category(),
            LedgerError::Clock(e) => match e {
                ClockError::NotGenesis | ClockError::NotOperating => ErrorCategory::InvalidState,
                ClockError::TimeWentBackwards { .. } => ErrorCategory::InvalidArgument,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Rejected
// ---------------------------------------------------------------------------

/// Failure of an operation that took ownership of `value`. The value is
/// returned untouched, so a failed deposit or hand-over never destroys it.
#[must_use = "a rejected value must be recovered or explicitly dropped"]
#[derive(Debug, PartialEq, Eq)]
pub struct Rejected<T, E = LedgerError> {
    pub error: E,
    pub value: T,
}

impl<T, E> Rejected<T, E> {
    pub fn new(error: E, value: T) -> Self {
        Self { error, value }
    }

    /// Gives up the value. Only sound where the value was produced inside
    /// the same aborting transaction.
    pub fn into_error(self) -> E {
        self.error
    }

    pub fn into_parts(self) -> (E, T) {
        (self.error, self.value)
    }

    pub fn map_error<F>(self, f: impl FnOnce(E) -> F) -> Rejected<T, F> {
        Rejected {
            error: f(self.error),
            value: self.value,
        }
    }
}

impl<T> Rejected<T> {
    pub fn category(&self) -> ErrorCategory {
        self.error.category()
    }
}

impl<T, E: fmt::Display> fmt::Display for Rejected<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl<T: fmt::Debug, E: std::error::Error> std::error::Error for Rejected<T, E> {}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_protocol::AccountAddress;

    #[test]
    fn categories_flow_through_aggregate() {
        let err: LedgerError = RoleError::Missing(AccountAddress::from_u64(1)).into();
        assert_eq!(err.category(), ErrorCategory::RequiresRole);

        let err: LedgerError = ClockError::NotGenesis.into();
        assert_eq!(err.category(), ErrorCategory::InvalidState);

        let err: LedgerError = CurrencyError::ZeroAmount.into();
        assert_eq!(err.category(), ErrorCategory::InvalidArgument);
    }

    #[test]
    fn codes_are_distinct() {
        let all = [
            ErrorCategory::InvalidState,
            ErrorCategory::RequiresRole,
            ErrorCategory::RequiresCapability,
            ErrorCategory::NotPublished,
            ErrorCategory::AlreadyPublished,
            ErrorCategory::InvalidArgument,
            ErrorCategory::LimitExceeded,
        ];
        let mut codes: Vec<u8> = all.iter().map(|c| c.code()).collect();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
    }

    #[test]
    fn rejected_keeps_value_and_category() {
        let rejected: Rejected<u64> = Rejected::new(CurrencyError::ZeroAmount.into(), 7);
        assert_eq!(rejected.category(), ErrorCategory::InvalidArgument);
        assert_eq!(rejected.to_string(), "amount must be greater than zero");
        let (error, value) = rejected.into_parts();
        assert_eq!((error.category(), value), (ErrorCategory::InvalidArgument, 7));
    }

    #[test]
    fn transparent_display() {
        let err: LedgerError = CurrencyError::ZeroAmount.into();
        assert_eq!(err.to_string(), "amount must be greater than zero");
    }
}
