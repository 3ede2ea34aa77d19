// crates/quota-gate-core/tests/auth_unit.rs
// ============================================================================
// Module: Token Authenticator Unit Tests
// Description: Token issuance, digest lookup, and one-wayness behavior.
// Purpose: Validate fail-closed authentication over the in-memory store.
// ============================================================================

//! ## Overview
//! Exercises the token authenticator:
//! - Issued tokens authenticate; the stored digest does not
//! - Empty and unknown tokens are rejected generically
//! - Refresh invalidates the previous token wholesale

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::sync::Arc;

use quota_gate_core::AuthError;
use quota_gate_core::BillingPeriod;
use quota_gate_core::InMemoryPrincipalStore;
use quota_gate_core::NewPrincipal;
use quota_gate_core::Principal;
use quota_gate_core::PrincipalStore;
use quota_gate_core::Tier;
use quota_gate_core::TokenAuthenticator;
use quota_gate_core::TokenDigest;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn seed(store: &InMemoryPrincipalStore, raw_token: &str) -> Principal {
    let signup = NewPrincipal {
        email: "caller@example.test".to_string(),
        credential_hash: "credential-hash".to_string(),
        tier: Tier::Starter,
        period: BillingPeriod::new(2026, 3).expect("valid period"),
    };
    store.create(&signup, &TokenDigest::from_raw_token(raw_token)).expect("seed principal")
}

// ============================================================================
// SECTION: Authentication
// ============================================================================

#[test]
fn issued_token_authenticates_to_its_principal() {
    let store = Arc::new(InMemoryPrincipalStore::new());
    let seeded = seed(&store, "raw-token-value");
    let authenticator = TokenAuthenticator::new(store);

    let resolved = authenticator.authenticate("raw-token-value").expect("authenticate");
    assert_eq!(resolved.principal_id, seeded.principal_id);
    assert_eq!(resolved.email, seeded.email);
}

#[test]
fn digest_value_does_not_authenticate() {
    let store = Arc::new(InMemoryPrincipalStore::new());
    seed(&store, "raw-token-value");
    let authenticator = TokenAuthenticator::new(store);

    // Presenting the stored digest instead of the raw token must fail:
    // authentication digests the input again and finds no match.
    let digest_text = TokenDigest::from_raw_token("raw-token-value").as_str().to_string();
    match authenticator.authenticate(&digest_text) {
        Err(AuthError::Unauthorized) => {}
        Err(AuthError::Store(error)) => panic!("unexpected store error: {error}"),
        Ok(_) => panic!("digest accepted as a raw token"),
    }
}

#[test]
fn empty_token_is_rejected_before_any_lookup() {
    let store = Arc::new(InMemoryPrincipalStore::new());
    let authenticator = TokenAuthenticator::new(store);
    assert!(matches!(authenticator.authenticate(""), Err(AuthError::Unauthorized)));
}

#[test]
fn unknown_token_is_rejected_generically() {
    let store = Arc::new(InMemoryPrincipalStore::new());
    seed(&store, "raw-token-value");
    let authenticator = TokenAuthenticator::new(store);
    let error = authenticator.authenticate("some-other-token").expect_err("must reject");
    assert_eq!(error.to_string(), "unauthorized");
}

// ============================================================================
// SECTION: Issuance & Refresh
// ============================================================================

#[test]
fn refresh_invalidates_the_previous_token() {
    let store = Arc::new(InMemoryPrincipalStore::new());
    let seeded = seed(&store, "original-token");
    let authenticator = TokenAuthenticator::new(store);

    let fresh = authenticator.issue_token(seeded.principal_id).expect("issue");
    assert_eq!(fresh.expose().len(), 64);
    assert!(fresh.expose().chars().all(|c| c.is_ascii_hexdigit()));

    // New token works; the replaced one no longer resolves.
    authenticator.authenticate(fresh.expose()).expect("fresh token authenticates");
    assert!(matches!(
        authenticator.authenticate("original-token"),
        Err(AuthError::Unauthorized)
    ));
}

#[test]
fn issue_for_unknown_principal_fails_closed() {
    let store = Arc::new(InMemoryPrincipalStore::new());
    let authenticator = TokenAuthenticator::new(store);
    let id = quota_gate_core::PrincipalId::from_raw(42).expect("nonzero id");
    assert!(matches!(authenticator.issue_token(id), Err(AuthError::Unauthorized)));
}

#[test]
fn consecutive_issued_tokens_differ() {
    let first = quota_gate_core::generate_raw_token();
    let second = quota_gate_core::generate_raw_token();
    assert_ne!(first.expose(), second.expose());
}
