//! Shared fixture: a ledger past genesis with one currency, one dealer and
//! two unrelated VASP groups.

#![allow(dead_code)]

use meridian_contracts::{BurnCapability, CurrencyCode, Ledger, MintCapability};
use meridian_protocol::logging::{init_logging, LogFormat};
use meridian_protocol::{AccountAddress, AuthenticationKey, Signer};

pub const ROOT: AccountAddress = AccountAddress::from_u64(0xA550C18);
pub const TC: AccountAddress = AccountAddress::from_u64(0xB1E55ED);
pub const DEALER: AccountAddress = AccountAddress::from_u64(0xDD);
pub const VASP_A: AccountAddress = AccountAddress::from_u64(0xA0);
pub const CHILD_A: AccountAddress = AccountAddress::from_u64(0xA1);
pub const VASP_B: AccountAddress = AccountAddress::from_u64(0xB0);
pub const VALIDATOR: AccountAddress = AccountAddress::from_u64(0x7A1);

/// Time the fixture leaves the clock at.
pub const START_MICROS: u64 = 1_000_000;

pub fn xus() -> CurrencyCode {
    "XUS".parse().unwrap()
}

pub fn auth_key(seed: u8) -> AuthenticationKey {
    AuthenticationKey::new([seed; 32])
}

pub struct Fixture {
    pub ledger: Ledger,
    pub mint_cap: MintCapability,
    pub burn_cap: BurnCapability,
}

impl Fixture {
    pub fn root(&self) -> Signer {
        Signer::new(ROOT)
    }

    pub fn tc(&self) -> Signer {
        Signer::new(TC)
    }

    /// Mints `amount` into the dealer.
    pub fn fund_dealer(&mut self, amount: u64) {
        let tc = self.tc();
        self.ledger
            .mint_to_designated_dealer(&tc, &self.mint_cap, DEALER, amount)
            .unwrap();
    }

    /// Dealer pays `payee` out of its own balance.
    pub fn dealer_pays(&mut self, payee: AccountAddress, amount: u64) {
        self.ledger
            .pay(&Signer::new(DEALER), payee, &xus(), amount, b"", b"")
            .unwrap();
    }

    pub fn balance(&self, account: AccountAddress) -> u64 {
        self.ledger.balance(account, &xus()).unwrap()
    }

    pub fn advance_to(&mut self, now_micros: u64) {
        self.ledger.update_time(now_micros).unwrap();
    }
}

/// Root, TC and XUS in genesis only.
pub fn genesis() -> (Ledger, MintCapability, BurnCapability) {
    init_logging("warn", LogFormat::Pretty);
    let mut ledger = Ledger::new();
    ledger.create_root_account(ROOT, auth_key(1)).unwrap();
    ledger
        .create_treasury_compliance_account(&Signer::new(ROOT), TC, auth_key(2))
        .unwrap();
    let (mint_cap, burn_cap) = ledger
        .register_currency(&Signer::new(ROOT), &xus(), 6)
        .unwrap();
    (ledger, mint_cap, burn_cap)
}

/// Full fixture: genesis, then operating at [`START_MICROS`] with a dealer,
/// VASP A with one child, and an unrelated VASP B.
pub fn setup() -> Fixture {
    let (mut ledger, mint_cap, burn_cap) = genesis();
    ledger.start_operating().unwrap();
    ledger.update_time(START_MICROS).unwrap();

    let tc = Signer::new(TC);
    ledger
        .create_designated_dealer(&tc, DEALER, auth_key(3), &xus(), "Dealer")
        .unwrap();
    ledger
        .create_parent_vasp_account(&tc, VASP_A, auth_key(4), &xus(), "VASP A", false)
        .unwrap();
    ledger
        .create_child_vasp_account(&Signer::new(VASP_A), CHILD_A, auth_key(5), &xus(), false, 0)
        .unwrap();
    ledger
        .create_parent_vasp_account(&tc, VASP_B, auth_key(6), &xus(), "VASP B", false)
        .unwrap();
    ledger
        .create_validator_account(&Signer::new(ROOT), VALIDATOR, auth_key(7))
        .unwrap();

    Fixture {
        ledger,
        mint_cap,
        burn_cap,
    }
}
