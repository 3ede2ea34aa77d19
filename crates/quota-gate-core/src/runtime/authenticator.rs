// crates/quota-gate-core/src/runtime/authenticator.rs
// ============================================================================
// Module: Token Authenticator
// Description: Opaque bearer-token resolution and token issuance.
// Purpose: Map raw tokens to principals by digest equality, fail closed.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The authenticator resolves a raw bearer token to a principal snapshot by
//! computing its one-way digest and asking the store for a digest match.
//! Raw tokens are never compared or persisted. Missing, empty, or unmatched
//! tokens are rejected with a generic unauthorized error before any other
//! side effect; in particular, rate-limit bookkeeping is never charged for
//! an unauthenticated request.
//!
//! Security posture: the unauthorized error carries no detail about why
//! the token failed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::identifiers::PrincipalId;
use crate::core::principal::Principal;
use crate::core::token::RawToken;
use crate::core::token::TokenDigest;
use crate::core::token::generate_raw_token;
use crate::interfaces::SharedPrincipalStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Authentication errors.
///
/// # Invariants
/// - `Unauthorized` is generic by design; it never explains which check
///   failed.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing, malformed, or unmatched bearer token.
    #[error("unauthorized")]
    Unauthorized,
    /// Underlying store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// SECTION: Token Authenticator
// ============================================================================

/// Resolves opaque bearer tokens to principals.
///
/// # Invariants
/// - Lookup is by digest equality only; raw tokens never reach the store.
/// - Authentication performs no mutation.
pub struct TokenAuthenticator {
    /// Shared principal store.
    store: SharedPrincipalStore,
}

impl TokenAuthenticator {
    /// Creates an authenticator over the shared store.
    #[must_use]
    pub fn new(store: SharedPrincipalStore) -> Self {
        Self {
            store,
        }
    }

    /// Authenticates a raw bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unauthorized`] for empty or unmatched tokens
    /// and [`AuthError::Store`] when the lookup itself fails.
    pub fn authenticate(&self, raw_token: &str) -> Result<Principal, AuthError> {
        if raw_token.is_empty() {
            return Err(AuthError::Unauthorized);
        }
        let digest = TokenDigest::from_raw_token(raw_token);
        self.store.find_by_token_digest(&digest)?.ok_or(AuthError::Unauthorized)
    }

    /// Issues a fresh token for the principal, replacing any previous one.
    ///
    /// The raw token is returned exactly once; only its digest is stored,
    /// and the previous token is invalidated wholesale.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unauthorized`] when no such principal exists
    /// and [`AuthError::Store`] when persistence fails.
    pub fn issue_token(&self, id: PrincipalId) -> Result<RawToken, AuthError> {
        let raw = generate_raw_token();
        let digest = TokenDigest::from_raw_token(raw.expose());
        if self.store.replace_token_digest(id, &digest)? {
            Ok(raw)
        } else {
            Err(AuthError::Unauthorized)
        }
    }
}
