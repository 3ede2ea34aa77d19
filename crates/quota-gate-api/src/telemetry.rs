// crates/quota-gate-api/src/telemetry.rs
// ============================================================================
// Module: API Telemetry
// Description: Observability hooks for HTTP request handling.
// Purpose: Provide metric events and latency hooks without hard deps.
// Dependencies: (none beyond std)
// ============================================================================

//! ## Overview
//! A thin metrics interface for API request counters and latencies,
//! dependency-light so deployments can plug in Prometheus or
//! OpenTelemetry without redesign. Events carry route and outcome labels
//! only; principal identifiers and tokens never enter metric labels.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// SECTION: Metric Labels
// ============================================================================

/// API route classification.
///
/// # Invariants
/// - Variants are stable for telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ApiRoute {
    /// GET /api/status.
    Status,
    /// POST /api/consume-message.
    ConsumeMessage,
    /// POST /api/activate-subscription.
    ActivateSubscription,
    /// CORS preflight for any API route.
    Preflight,
}

impl ApiRoute {
    /// Returns a stable label for the route.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::ConsumeMessage => "consume_message",
            Self::ActivateSubscription => "activate_subscription",
            Self::Preflight => "preflight",
        }
    }
}

/// API request outcome classification.
///
/// # Invariants
/// - Variants are stable for telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ApiOutcome {
    /// Request served with `success: true`.
    Ok,
    /// Request served with `success: false` (quota exhausted).
    QuotaExhausted,
    /// Bearer token missing or unmatched.
    Unauthorized,
    /// Sliding-window cap reached.
    RateLimited,
    /// Request body malformed or semantically invalid.
    BadRequest,
    /// Store or internal failure.
    Error,
}

impl ApiOutcome {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::QuotaExhausted => "quota_exhausted",
            Self::Unauthorized => "unauthorized",
            Self::RateLimited => "rate_limited",
            Self::BadRequest => "bad_request",
            Self::Error => "error",
        }
    }
}

/// API request metric event payload.
#[derive(Debug, Clone, Copy)]
pub struct ApiMetricEvent {
    /// Route classification.
    pub route: ApiRoute,
    /// Outcome classification.
    pub outcome: ApiOutcome,
    /// HTTP status code served.
    pub status: u16,
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Metrics sink for API requests and latencies.
pub trait ApiMetrics: Send + Sync {
    /// Records a request counter event.
    fn record_request(&self, event: ApiMetricEvent);
    /// Records a latency observation for the request.
    fn record_latency(&self, event: ApiMetricEvent, latency: Duration);
}

/// No-op metrics sink.
///
/// # Invariants
/// - Metrics are intentionally discarded.
pub struct NoopMetrics;

impl ApiMetrics for NoopMetrics {
    fn record_request(&self, _event: ApiMetricEvent) {}

    fn record_latency(&self, _event: ApiMetricEvent, _latency: Duration) {}
}
