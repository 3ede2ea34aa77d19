// crates/quota-gate-api/src/audit.rs
// ============================================================================
// Module: API Audit
// Description: Audit hooks for security-relevant API events.
// Purpose: Record auth failures, rate denials, and activations durably.
// Dependencies: quota-gate-core
// ============================================================================

//! ## Overview
//! Audit events cover the security-relevant decisions of the API surface:
//! authentication rejections, rate-limit denials, and subscription
//! activations. Events carry principal identifiers where known but never
//! tokens, digests, or emails.

// ============================================================================
// SECTION: Imports
// ============================================================================

use quota_gate_core::PrincipalId;

use crate::telemetry::ApiOutcome;
use crate::telemetry::ApiRoute;

// ============================================================================
// SECTION: Events
// ============================================================================

/// Audit event for one API request decision.
///
/// # Invariants
/// - `principal_id` is `None` when the request never authenticated.
#[derive(Debug, Clone)]
pub struct ApiAuditEvent {
    /// Route the decision was made on.
    pub route: ApiRoute,
    /// Decision outcome.
    pub outcome: ApiOutcome,
    /// Principal involved, when authentication succeeded.
    pub principal_id: Option<PrincipalId>,
    /// Unix timestamp the decision was made at.
    pub at_unix: i64,
    /// Internal failure detail withheld from response bodies.
    pub detail: Option<String>,
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Sink for API audit events.
pub trait ApiAuditSink: Send + Sync {
    /// Records one audit event.
    fn record(&self, event: &ApiAuditEvent);
}

/// No-op audit sink.
///
/// # Invariants
/// - Events are intentionally discarded.
pub struct NoopAuditSink;

impl ApiAuditSink for NoopAuditSink {
    fn record(&self, _event: &ApiAuditEvent) {}
}
