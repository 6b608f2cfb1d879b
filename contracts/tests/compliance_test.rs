//! Integration tests for limits windows, recovery addresses and dual
//! attestation, driven through the ledger.

mod common;

use common::*;
use meridian_contracts::dual_attestation::dual_attestation_message;
use meridian_contracts::{ErrorCategory, LimitsUpdate};
use meridian_protocol::config::ONE_DAY_MICROS;
use meridian_protocol::crypto::MeridianKeypair;
use meridian_protocol::{AuthenticationKey, Signer};

/// Points VASP A's window at a definition published by TC.
fn restrict_vasp_a(f: &mut Fixture, max_inflow: u64, max_outflow: u64, max_holding: u64) {
    let tc = f.tc();
    f.ledger
        .publish_limits_definition(&tc, &xus(), max_inflow, max_outflow, max_holding, ONE_DAY_MICROS)
        .unwrap();
    f.ledger
        .update_window_info(&tc, VASP_A, &xus(), 0, TC)
        .unwrap();
}

/// Gives VASP B a compliance key and base URL.
fn attest_vasp_b(f: &mut Fixture) -> MeridianKeypair {
    let keypair = MeridianKeypair::generate();
    let b = Signer::new(VASP_B);
    f.ledger
        .rotate_compliance_public_key(&b, &keypair.public_key_bytes())
        .unwrap();
    f.ledger
        .rotate_base_url(&b, "https://vasp-b.example/travel-rule")
        .unwrap();
    keypair
}

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

#[test]
fn vasp_windows_default_to_the_registrar_definition() {
    let f = setup();
    assert_eq!(f.ledger.limits_definition_address(VASP_A, &xus()).unwrap(), ROOT);
    // Children share the parent's window.
    assert_eq!(f.ledger.limits_definition_address(CHILD_A, &xus()).unwrap(), ROOT);
    assert!(!f.ledger.limits().has_window_published(CHILD_A, &xus()));
    assert!(f
        .ledger
        .limits()
        .limits_definition(ROOT, &xus())
        .unwrap()
        .is_unrestricted());
}

#[test]
fn inflow_window_rejects_then_resets() {
    let mut f = setup();
    f.fund_dealer(1_000);
    restrict_vasp_a(&mut f, 100, u64::MAX, u64::MAX);

    f.dealer_pays(VASP_A, 60);
    let err = f
        .ledger
        .pay(&Signer::new(DEALER), VASP_A, &xus(), 50, b"", b"")
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::LimitExceeded);
    assert_eq!(f.ledger.limits().window(VASP_A, &xus()).unwrap().window_inflow, 60);
    assert_eq!(f.balance(VASP_A), 60);

    f.advance_to(START_MICROS + ONE_DAY_MICROS + 1);
    f.dealer_pays(VASP_A, 50);
    let window = f.ledger.limits().window(VASP_A, &xus()).unwrap();
    assert_eq!(window.window_inflow, 50);
    assert_eq!(window.window_start, START_MICROS + ONE_DAY_MICROS + 1);
    assert_eq!(f.balance(VASP_A), 110);
}

#[test]
fn window_does_not_reset_exactly_at_the_period() {
    let mut f = setup();
    f.fund_dealer(1_000);
    restrict_vasp_a(&mut f, 100, u64::MAX, u64::MAX);

    f.dealer_pays(VASP_A, 60);
    f.advance_to(START_MICROS + ONE_DAY_MICROS);
    let err = f
        .ledger
        .pay(&Signer::new(DEALER), VASP_A, &xus(), 50, b"", b"")
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::LimitExceeded);
}

#[test]
fn holding_cap_counts_tracked_balance() {
    let mut f = setup();
    f.fund_dealer(1_000);
    restrict_vasp_a(&mut f, u64::MAX, u64::MAX, 100);

    f.dealer_pays(VASP_A, 80);
    let err = f
        .ledger
        .pay(&Signer::new(DEALER), VASP_A, &xus(), 30, b"", b"")
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::LimitExceeded);

    // Paying out lowers the tracked balance and frees room.
    f.ledger
        .pay(&Signer::new(VASP_A), DEALER, &xus(), 40, b"", b"")
        .unwrap();
    assert_eq!(f.ledger.limits().window(VASP_A, &xus()).unwrap().tracked_balance, 40);
    f.dealer_pays(VASP_A, 30);
}

#[test]
fn intra_group_payments_are_untracked() {
    let mut f = setup();
    f.fund_dealer(1_000);
    f.dealer_pays(VASP_A, 500);
    restrict_vasp_a(&mut f, 10, 10, u64::MAX);

    f.ledger
        .pay(&Signer::new(VASP_A), CHILD_A, &xus(), 200, b"", b"")
        .unwrap();
    f.ledger
        .pay(&Signer::new(CHILD_A), VASP_A, &xus(), 150, b"", b"")
        .unwrap();

    let window = f.ledger.limits().window(VASP_A, &xus()).unwrap();
    assert_eq!(window.window_inflow, 0);
    assert_eq!(window.window_outflow, 0);
}

#[test]
fn child_outflow_counts_against_the_parent_window() {
    let mut f = setup();
    f.fund_dealer(1_000);
    f.dealer_pays(VASP_A, 500);
    f.ledger
        .pay(&Signer::new(VASP_A), CHILD_A, &xus(), 200, b"", b"")
        .unwrap();
    restrict_vasp_a(&mut f, u64::MAX, 100, u64::MAX);

    f.ledger
        .pay(&Signer::new(CHILD_A), DEALER, &xus(), 70, b"", b"")
        .unwrap();
    let err = f
        .ledger
        .pay(&Signer::new(VASP_A), DEALER, &xus(), 40, b"", b"")
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::LimitExceeded);
    assert_eq!(f.ledger.limits().window(VASP_A, &xus()).unwrap().window_outflow, 70);
}

#[test]
fn limits_updates_zero_and_explicit() {
    let mut f = setup();
    restrict_vasp_a(&mut f, 100, 200, 300);
    let tc = f.tc();

    // Zero leaves a field unchanged in the bulk form.
    f.ledger
        .update_limits_definition(&tc, TC, &xus(), 0, 250, 0, 0)
        .unwrap();
    let def = *f.ledger.limits().limits_definition(TC, &xus()).unwrap();
    assert_eq!((def.max_inflow, def.max_outflow, def.max_holding), (100, 250, 300));
    assert_eq!(def.time_period, ONE_DAY_MICROS);

    // The explicit form can set a cap to zero.
    f.ledger
        .apply_limits_update(
            &tc,
            TC,
            &xus(),
            LimitsUpdate {
                max_inflow: Some(0),
                ..LimitsUpdate::default()
            },
        )
        .unwrap();
    assert_eq!(f.ledger.limits().limits_definition(TC, &xus()).unwrap().max_inflow, 0);

    let err = f
        .ledger
        .apply_limits_update(
            &tc,
            TC,
            &xus(),
            LimitsUpdate {
                time_period: Some(0),
                ..LimitsUpdate::default()
            },
        )
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::InvalidArgument);

    let err = f
        .ledger
        .update_limits_definition(&Signer::new(VASP_A), TC, &xus(), 1, 1, 1, 1)
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::RequiresRole);
}

#[test]
fn zero_period_definition_takes_the_configured_default() {
    let mut f = setup();
    let tc = f.tc();
    f.ledger
        .publish_limits_definition(&tc, &xus(), 1, 2, 3, 0)
        .unwrap();
    let period = f.ledger.limits().limits_definition(TC, &xus()).unwrap().time_period;
    assert_eq!(period, f.ledger.config().default_limits_period_micros);

    let err = f
        .ledger
        .publish_limits_definition(&tc, &xus(), 1, 2, 3, 0)
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::AlreadyPublished);
}

#[test]
fn window_publication_is_tc_only_and_unique() {
    let mut f = setup();
    let tc = f.tc();
    let err = f
        .ledger
        .publish_window(&tc, VASP_A, &xus(), ROOT)
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::AlreadyPublished);

    let root = f.root();
    let err = f
        .ledger
        .publish_window(&root, DEALER, &xus(), ROOT)
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::RequiresRole);

    f.ledger.publish_window(&tc, DEALER, &xus(), ROOT).unwrap();
    assert!(f.ledger.limits().has_window_published(DEALER, &xus()));
}

// ---------------------------------------------------------------------------
// Recovery Addresses
// ---------------------------------------------------------------------------

#[test]
fn recovery_address_rotates_a_child_key() {
    let mut f = setup();
    let parent = Signer::new(VASP_A);

    f.ledger.publish_recovery_address(&parent).unwrap();
    f.ledger
        .delegate_key_rotation(&Signer::new(CHILD_A), VASP_A)
        .unwrap();
    assert_eq!(
        f.ledger.recovery_addresses().key_rotation_accounts(VASP_A).unwrap(),
        &[VASP_A, CHILD_A]
    );
    assert!(f.ledger.accounts().delegated_key_rotation_capability(CHILD_A).unwrap());

    f.ledger
        .recover_authentication_key(&parent, VASP_A, CHILD_A, &[0x42; 32])
        .unwrap();
    assert_eq!(
        f.ledger.accounts().authentication_key(CHILD_A).unwrap(),
        AuthenticationKey::new([0x42; 32])
    );

    // The target itself may also use the pool.
    f.ledger
        .recover_authentication_key(&Signer::new(CHILD_A), VASP_A, CHILD_A, &[0x43; 32])
        .unwrap();
}

#[test]
fn recovery_requires_target_or_recovery_caller() {
    let mut f = setup();
    f.ledger.publish_recovery_address(&Signer::new(VASP_A)).unwrap();
    f.ledger
        .delegate_key_rotation(&Signer::new(CHILD_A), VASP_A)
        .unwrap();

    let err = f
        .ledger
        .recover_authentication_key(&Signer::new(VASP_B), VASP_A, CHILD_A, &[1; 32])
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::RequiresCapability);

    let err = f
        .ledger
        .recover_authentication_key(&Signer::new(VASP_A), VASP_A, VASP_B, &[1; 32])
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::InvalidArgument);

    let err = f
        .ledger
        .recover_authentication_key(&Signer::new(VASP_B), VASP_B, VASP_B, &[1; 32])
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::NotPublished);
}

#[test]
fn recovery_address_must_hold_its_own_capability() {
    let mut f = setup();
    let child_cap = f
        .ledger
        .extract_key_rotation_capability(&Signer::new(CHILD_A))
        .unwrap();

    let rejected = f
        .ledger
        .publish_recovery_address_with(&Signer::new(VASP_A), child_cap)
        .unwrap_err();
    assert_eq!(rejected.category(), ErrorCategory::InvalidArgument);
    assert!(!f.ledger.recovery_addresses().is_recovery_address(VASP_A));

    // The child's capability comes back and can go home.
    assert_eq!(rejected.value.account_address(), CHILD_A);
    f.ledger
        .restore_key_rotation_capability(rejected.value)
        .unwrap();
    assert!(!f.ledger.accounts().delegated_key_rotation_capability(CHILD_A).unwrap());
    f.ledger
        .extract_key_rotation_capability(&Signer::new(CHILD_A))
        .unwrap();
}

#[test]
fn recovery_is_scoped_to_one_vasp_group() {
    let mut f = setup();
    f.ledger.publish_recovery_address(&Signer::new(VASP_A)).unwrap();

    let err = f
        .ledger
        .delegate_key_rotation(&Signer::new(VASP_B), VASP_A)
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::InvalidArgument);
    // The failed delegation leaves B holding its own capability.
    assert!(!f.ledger.accounts().delegated_key_rotation_capability(VASP_B).unwrap());

    let err = f
        .ledger
        .publish_recovery_address(&Signer::new(DEALER))
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::InvalidArgument);

    let err = f
        .ledger
        .publish_recovery_address(&Signer::new(VASP_A))
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::InvalidState);
}

// ---------------------------------------------------------------------------
// Dual Attestation
// ---------------------------------------------------------------------------

#[test]
fn cross_group_payment_needs_a_signature() {
    let mut f = setup();
    f.fund_dealer(1_000);
    f.dealer_pays(VASP_A, 500);

    let err = f
        .ledger
        .pay(&Signer::new(VASP_A), VASP_B, &xus(), 100, b"ref-1", b"")
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::InvalidArgument);
    assert_eq!(f.balance(VASP_A), 500);
    assert_eq!(f.balance(VASP_B), 0);
}

#[test]
fn valid_attestation_lets_payment_through() {
    let mut f = setup();
    f.fund_dealer(1_000);
    f.dealer_pays(VASP_A, 500);
    let keypair = attest_vasp_b(&mut f);

    let metadata = b"travel-rule-ref-9";
    let message = dual_attestation_message(VASP_A, metadata, 100).unwrap();
    let signature = keypair.sign(&message);

    f.ledger
        .pay(&Signer::new(VASP_A), VASP_B, &xus(), 100, metadata, signature.as_bytes())
        .unwrap();
    assert_eq!(f.balance(VASP_B), 100);

    // Same signature, different amount.
    let err = f
        .ledger
        .pay(&Signer::new(VASP_A), VASP_B, &xus(), 101, metadata, signature.as_bytes())
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::InvalidArgument);
}

#[test]
fn child_payer_is_attested_by_its_own_address() {
    let mut f = setup();
    f.fund_dealer(1_000);
    f.dealer_pays(VASP_A, 500);
    f.ledger
        .pay(&Signer::new(VASP_A), CHILD_A, &xus(), 200, b"", b"")
        .unwrap();
    let keypair = attest_vasp_b(&mut f);

    let signed_for_parent = keypair.sign(&dual_attestation_message(VASP_A, b"m", 50).unwrap());
    let err = f
        .ledger
        .pay(&Signer::new(CHILD_A), VASP_B, &xus(), 50, b"m", signed_for_parent.as_bytes())
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::InvalidArgument);

    let signed = keypair.sign(&dual_attestation_message(CHILD_A, b"m", 50).unwrap());
    f.ledger
        .pay(&Signer::new(CHILD_A), VASP_B, &xus(), 50, b"m", signed.as_bytes())
        .unwrap();
}

#[test]
fn unset_compliance_key_is_invalid_state() {
    let mut f = setup();
    f.fund_dealer(1_000);
    f.dealer_pays(VASP_A, 500);
    let stray = MeridianKeypair::generate();
    let signature = stray.sign(&dual_attestation_message(VASP_A, b"", 10).unwrap());

    let err = f
        .ledger
        .pay(&Signer::new(VASP_A), VASP_B, &xus(), 10, b"", signature.as_bytes())
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::InvalidState);
}

#[test]
fn credential_rotation_updates_queries() {
    let mut f = setup();
    let keypair = attest_vasp_b(&mut f);

    assert_eq!(
        f.ledger.compliance_public_key(VASP_B).unwrap(),
        &keypair.public_key_bytes()[..]
    );
    assert_eq!(
        f.ledger.dual_attestation().base_url(VASP_B).unwrap(),
        "https://vasp-b.example/travel-rule"
    );
    assert_eq!(f.ledger.dual_attestation().human_name(VASP_B).unwrap(), "VASP B");

    let err = f
        .ledger
        .rotate_compliance_public_key(&Signer::new(VASP_B), &[0u8; 31])
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::InvalidArgument);

    let err = f
        .ledger
        .rotate_base_url(&Signer::new(CHILD_A), "https://child.example")
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::RequiresRole);
}
