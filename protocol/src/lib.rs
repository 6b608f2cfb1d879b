// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Meridian Protocol — Foundation Library
//!
//! The pieces every ledger module leans on but none of them owns:
//!
//! - **config** — protocol constants and the tunable [`config::LedgerConfig`].
//! - **crypto** — Ed25519 keys and signatures, SHA-256.
//! - **identity** — account addresses, authentication keys, signers.
//! - **encoding** — canonical bytes for values that get signed.
//! - **time** — the two-phase ledger clock.
//! - **events** — append-only event streams and sinks.
//! - **logging** — `tracing` subscriber setup for embedders.
//! - **metrics** — Prometheus counters for ledger activity.
//!
//! The accounting logic itself lives in `meridian-contracts`.

pub mod config;
pub mod crypto;
pub mod encoding;
pub mod events;
pub mod identity;
pub mod logging;
pub mod metrics;
pub mod time;

pub use identity::{AccountAddress, AuthenticationKey, Signer};
