// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Meridian Ledger Core
//!
//! The accounting rules of a permissioned multi-currency payment network.
//! Execution, consensus and storage live elsewhere; this crate is what the
//! execution engine calls once per transaction.
//!
//! - **Currencies** — registration, mint and burn capabilities, market cap
//!   and the dealer preburn queues that stage value for destruction.
//! - **Accounts** — balances per currency, sequence numbers, authentication
//!   keys and the withdraw / key rotation capabilities that gate them.
//! - **Roles and VASPs** — a single immutable role per account, and the
//!   parent/child grouping of VASP accounts.
//! - **Limits** — rolling inflow, outflow and holding caps on value that
//!   crosses a VASP group boundary.
//! - **Recovery addresses** — pooled key rotation capabilities within one
//!   VASP group.
//! - **Dual attestation** — payee-side compliance signatures over payment
//!   metadata.
//!
//! Everything is driven through [`Ledger`]. Each of its mutating operations
//! is all-or-nothing: a failure leaves state and the event log exactly as
//! they were.
//!
//! ## Design Principles
//!
//! 1. Value is a linear resource. [`Token`] and the capability types are
//!    neither `Clone` nor `Copy`, and are only constructed inside the crate.
//! 2. All monetary arithmetic is checked. Overflow is an error, never a wrap.
//! 3. Every failure carries an [`ErrorCategory`] the engine can map onto an
//!    abort code.

pub mod account;
pub mod currency;
pub mod dual_attestation;
pub mod error;
pub mod events;
pub mod ledger;
pub mod limits;
pub mod preburn;
pub mod recovery_address;
pub mod roles;
pub mod token;
pub mod vasp;

pub use account::{KeyRotationCapability, WithdrawCapability};
pub use error::{ErrorCategory, LedgerError, Rejected};
pub use events::LedgerEvent;
pub use ledger::Ledger;
pub use limits::{LimitsDefinition, LimitsUpdate};
pub use roles::RoleId;
pub use token::{BurnCapability, CurrencyCode, MintCapability, Token};
