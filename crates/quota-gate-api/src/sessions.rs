// crates/quota-gate-api/src/sessions.rs
// ============================================================================
// Module: Session Resolution
// Description: Seam for resolving browser sessions to principals.
// Purpose: Let the activation endpoint authenticate via the login system.
// Dependencies: quota-gate-core
// ============================================================================

//! ## Overview
//! Subscription activation is driven by the browser-facing billing flow,
//! which authenticates with the out-of-scope login system rather than an
//! API bearer token. This module is the seam: the host wires in a
//! resolver backed by its session storage, and the default denies
//! everything so a deployment without a login integration fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use quota_gate_core::PrincipalId;
use quota_gate_core::StoreError;

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Resolves an opaque session token to a principal.
pub trait SessionResolver: Send + Sync {
    /// Returns the principal bound to the session, or `None` when the
    /// session is unknown or expired.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when session storage is unavailable.
    fn resolve(&self, session_token: &str) -> Result<Option<PrincipalId>, StoreError>;
}

/// Shared handle to a session resolver.
pub type SharedSessionResolver = Arc<dyn SessionResolver>;

/// Session resolver that rejects every session.
///
/// # Invariants
/// - Deployments without a login integration fail closed.
pub struct DenyAllSessions;

impl SessionResolver for DenyAllSessions {
    fn resolve(&self, _session_token: &str) -> Result<Option<PrincipalId>, StoreError> {
        Ok(None)
    }
}
