//! # Signer
//!
//! A [`Signer`] is the execution engine's proof that the running transaction
//! was authorized by a particular account. The ledger never checks
//! signatures on transactions itself; it trusts whatever `Signer` it is
//! handed and reads the account address off it.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::address::AccountAddress;

/// Authorization witness for one account.
///
/// Deliberately not `Clone`: a transaction gets one signer per authorizing
/// account and passes it by reference.
#[derive(PartialEq, Eq, Serialize, Deserialize)]
pub struct Signer {
    address: AccountAddress,
}

impl Signer {
    /// Constructs the signer for `address`. Called by the execution engine
    /// after it has checked the transaction's authentication key.
    pub fn new(address: AccountAddress) -> Self {
        Self { address }
    }

    /// The address the signer speaks for.
    pub fn address(&self) -> AccountAddress {
        self.address
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signer({})", self.address)
    }
}
