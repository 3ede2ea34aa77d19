// crates/quota-gate-api/src/server.rs
// ============================================================================
// Module: API Server
// Description: axum handlers, routing, and CORS for the Quota Gate API.
// Purpose: Authenticate, rate limit, and dispatch entitlement operations.
// Dependencies: axum, quota-gate-config, quota-gate-core, quota-gate-store-sqlite
// ============================================================================

//! ## Overview
//! Request processing follows a fixed prologue: resolve the bearer token
//! (Authorization header first, then the `token` body field), authenticate
//! by digest lookup, then charge the shared sliding-window rate limiter.
//! Unauthenticated requests are rejected before any rate-limit
//! bookkeeping, so probing cannot consume a victim's window.
//!
//! Quota exhaustion is not an HTTP error: the widget polls these
//! endpoints, and a `200` with `success: false` keeps the client's error
//! path reserved for genuine failures. Authentication failures are `401`,
//! window exhaustion is `429`, malformed requests are `400`, store
//! failures are `500`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Instant;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::http::header::ACCESS_CONTROL_ALLOW_CREDENTIALS;
use axum::http::header::ACCESS_CONTROL_ALLOW_HEADERS;
use axum::http::header::ACCESS_CONTROL_ALLOW_METHODS;
use axum::http::header::ACCESS_CONTROL_ALLOW_ORIGIN;
use axum::http::header::AUTHORIZATION;
use axum::http::header::COOKIE;
use axum::http::header::ORIGIN;
use axum::http::header::VARY;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use quota_gate_config::QuotaGateConfig;
use quota_gate_core::Activation;
use quota_gate_core::ActivationError;
use quota_gate_core::AuthError;
use quota_gate_core::Consumption;
use quota_gate_core::Entitlement;
use quota_gate_core::Principal;
use quota_gate_core::PrincipalId;
use quota_gate_core::RateDecision;
use quota_gate_core::RateLimiter;
use quota_gate_core::SharedPrincipalStore;
use quota_gate_core::SharedRateLimitStore;
use quota_gate_core::SubscriptionActivator;
use quota_gate_core::Tier;
use quota_gate_core::TierPolicy;
use quota_gate_core::TokenAuthenticator;
use quota_gate_core::UsageMeter;
use quota_gate_store_sqlite::SqlitePrincipalStore;
use quota_gate_store_sqlite::SqliteStoreError;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::audit::ApiAuditEvent;
use crate::audit::ApiAuditSink;
use crate::audit::NoopAuditSink;
use crate::sessions::DenyAllSessions;
use crate::sessions::SharedSessionResolver;
use crate::telemetry::ApiMetricEvent;
use crate::telemetry::ApiMetrics;
use crate::telemetry::ApiOutcome;
use crate::telemetry::ApiRoute;
use crate::telemetry::NoopMetrics;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// API server errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Store backend failed to initialize.
    #[error("store init error: {0}")]
    Store(#[from] SqliteStoreError),
    /// Server socket or transport error.
    #[error("server io error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// SECTION: CORS
// ============================================================================

/// Explicit-allow-list CORS policy.
///
/// # Invariants
/// - When the request origin is not on the list, the first configured
///   origin is served instead of a wildcard; an empty list serves no CORS
///   headers at all.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    /// Configured origin allow-list.
    allowed_origins: Vec<String>,
}

impl CorsPolicy {
    /// Creates a policy over the configured allow-list.
    #[must_use]
    pub const fn new(allowed_origins: Vec<String>) -> Self {
        Self {
            allowed_origins,
        }
    }

    /// Resolves the origin to serve for a request.
    fn resolve<'a>(&'a self, request_origin: Option<&'a str>) -> Option<&'a str> {
        let first = self.allowed_origins.first()?;
        match request_origin {
            Some(origin) if self.allowed_origins.iter().any(|allowed| allowed == origin) => {
                Some(origin)
            }
            _ => Some(first.as_str()),
        }
    }

    /// Applies CORS headers for the given request headers.
    fn apply(&self, request_headers: &HeaderMap, response_headers: &mut HeaderMap) {
        let request_origin =
            request_headers.get(ORIGIN).and_then(|value| value.to_str().ok());
        let Some(origin) = self.resolve(request_origin) else {
            return;
        };
        let Ok(origin_value) = HeaderValue::from_str(origin) else {
            return;
        };
        response_headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin_value);
        response_headers.insert(VARY, HeaderValue::from_static("Origin"));
        response_headers
            .insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("GET, POST, OPTIONS"));
        response_headers.insert(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Authorization, Content-Type"),
        );
        response_headers
            .insert(ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
    }
}

// ============================================================================
// SECTION: App State
// ============================================================================

/// Shared state behind every API handler.
#[derive(Clone)]
pub struct AppState {
    /// Bearer-token authenticator.
    authenticator: Arc<TokenAuthenticator>,
    /// Shared-store sliding-window rate limiter.
    rate_limiter: Arc<RateLimiter>,
    /// Quota-checked usage meter.
    meter: Arc<UsageMeter>,
    /// Idempotent subscription activator.
    activator: Arc<SubscriptionActivator>,
    /// Principal store handle used for readiness probes.
    store: SharedPrincipalStore,
    /// Session resolver for the activation endpoint.
    sessions: SharedSessionResolver,
    /// Entitlement table served back in status responses.
    tiers: TierPolicy,
    /// CORS allow-list policy.
    cors: CorsPolicy,
    /// Metrics sink.
    metrics: Arc<dyn ApiMetrics>,
    /// Audit sink.
    audit: Arc<dyn ApiAuditSink>,
    /// Maximum accepted request body size in bytes.
    max_body_bytes: usize,
}

impl AppState {
    /// Builds application state over explicit store handles.
    #[must_use]
    pub fn new(
        principal_store: SharedPrincipalStore,
        rate_store: SharedRateLimitStore,
        config: &QuotaGateConfig,
    ) -> Self {
        Self {
            authenticator: Arc::new(TokenAuthenticator::new(Arc::clone(&principal_store))),
            rate_limiter: Arc::new(RateLimiter::new(rate_store, config.rate_limit.policy())),
            meter: Arc::new(UsageMeter::new(Arc::clone(&principal_store), config.tiers)),
            activator: Arc::new(SubscriptionActivator::new(Arc::clone(&principal_store))),
            store: principal_store,
            sessions: Arc::new(DenyAllSessions),
            tiers: config.tiers,
            cors: CorsPolicy::new(config.server.allowed_origins.clone()),
            metrics: Arc::new(NoopMetrics),
            audit: Arc::new(NoopAuditSink),
            max_body_bytes: config.server.max_body_bytes,
        }
    }

    /// Builds application state with the `SQLite` backend from config.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Store`] when the database cannot be opened.
    pub fn from_config(config: &QuotaGateConfig) -> Result<Self, ApiError> {
        let backend = Arc::new(SqlitePrincipalStore::new(&config.store)?);
        let principal_store: SharedPrincipalStore = backend.clone();
        let rate_store: SharedRateLimitStore = backend;
        Ok(Self::new(principal_store, rate_store, config))
    }

    /// Replaces the session resolver.
    #[must_use]
    pub fn with_sessions(mut self, sessions: SharedSessionResolver) -> Self {
        self.sessions = sessions;
        self
    }

    /// Replaces the metrics sink.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn ApiMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn ApiAuditSink>) -> Self {
        self.audit = audit;
        self
    }
}

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Consume request body; the `token` field is a fallback for clients that
/// cannot set the Authorization header.
#[derive(Debug, Default, Deserialize)]
struct ConsumeRequest {
    /// Bearer token fallback.
    #[serde(default)]
    token: Option<String>,
}

/// Activation request body from the billing flow.
#[derive(Debug, Deserialize)]
struct ActivateRequest {
    /// Requested paid plan label.
    plan: String,
    /// Subscription identifier assigned by the payment provider.
    subscription_id: String,
}

/// Status response envelope.
#[derive(Debug, Serialize)]
struct StatusResponse {
    /// Always true for a served snapshot.
    success: bool,
    /// Current tier label.
    tier: &'static str,
    /// Subscription status label.
    status: &'static str,
    /// Entitlement table for the current tier.
    limits: Entitlement,
    /// Metered usage block.
    usage: UsageBody,
}

/// Usage block of the status envelope.
#[derive(Debug, Serialize)]
struct UsageBody {
    /// Messages consumed in the current period.
    messages_used: u64,
    /// Configured monthly limit (`-1` when unlimited).
    messages_limit: i64,
    /// Remaining allowance (`-1` when unlimited).
    messages_remaining: i64,
}

/// Consume response envelope.
#[derive(Debug, Serialize)]
struct ConsumeResponse {
    /// True when a message was charged.
    success: bool,
    /// Counter value after the call.
    messages_used: u64,
    /// Remaining allowance (`-1` when unlimited, 0 when exhausted).
    messages_remaining: i64,
    /// Present only on quota exhaustion.
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'static str>,
}

/// Activation response envelope.
#[derive(Debug, Serialize)]
struct ActivateResponse {
    /// Always true for an accepted activation.
    success: bool,
    /// True when this call was a replay of an applied activation.
    already_active: bool,
}

/// Generic failure envelope for 4xx/5xx responses.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Always false.
    success: bool,
    /// Stable error message.
    error: &'static str,
}

// ============================================================================
// SECTION: Handler Plumbing
// ============================================================================

/// Returns the current unix timestamp in seconds.
fn unix_seconds() -> i64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    i64::try_from(now.as_secs()).unwrap_or(i64::MAX)
}

/// Builds the final response: body, status, metrics, and CORS headers.
fn respond<T: Serialize>(
    state: &AppState,
    request_headers: &HeaderMap,
    route: ApiRoute,
    outcome: ApiOutcome,
    status: StatusCode,
    started: Instant,
    body: &T,
) -> Response {
    let event = ApiMetricEvent {
        route,
        outcome,
        status: status.as_u16(),
    };
    state.metrics.record_request(event);
    state.metrics.record_latency(event, started.elapsed());
    let mut response = (status, Json(body)).into_response();
    state.cors.apply(request_headers, response.headers_mut());
    response
}

/// Builds a failure response with the generic envelope.
#[allow(clippy::too_many_arguments, reason = "Plumbing shared by every handler.")]
fn fail(
    state: &AppState,
    request_headers: &HeaderMap,
    route: ApiRoute,
    outcome: ApiOutcome,
    status: StatusCode,
    started: Instant,
    message: &'static str,
    principal: Option<PrincipalId>,
    now: i64,
) -> Response {
    fail_with_detail(
        state,
        request_headers,
        route,
        outcome,
        status,
        started,
        message,
        principal,
        now,
        None,
    )
}

/// Failure response that forwards internal detail to the audit sink only.
///
/// # Invariants
/// - `detail` never reaches the response body; clients see `message`.
#[allow(clippy::too_many_arguments, reason = "Plumbing shared by every handler.")]
fn fail_with_detail(
    state: &AppState,
    request_headers: &HeaderMap,
    route: ApiRoute,
    outcome: ApiOutcome,
    status: StatusCode,
    started: Instant,
    message: &'static str,
    principal: Option<PrincipalId>,
    now: i64,
    detail: Option<String>,
) -> Response {
    state.audit.record(&ApiAuditEvent {
        route,
        outcome,
        principal_id: principal,
        at_unix: now,
        detail,
    });
    respond(state, request_headers, route, outcome, status, started, &ErrorResponse {
        success: false,
        error: message,
    })
}

/// Extracts the bearer token from the Authorization header, falling back
/// to the body `token` field.
fn bearer_token(headers: &HeaderMap, body_token: Option<&str>) -> Option<String> {
    if let Some(value) = headers.get(AUTHORIZATION)
        && let Ok(text) = value.to_str()
        && let Some(token) = text.strip_prefix("Bearer ")
        && !token.trim().is_empty()
    {
        return Some(token.trim().to_string());
    }
    body_token.map(str::trim).filter(|token| !token.is_empty()).map(ToString::to_string)
}

/// Extracts the session token from `X-Session-Token` or the `session`
/// cookie.
fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get("x-session-token")
        && let Ok(text) = value.to_str()
        && !text.trim().is_empty()
    {
        return Some(text.trim().to_string());
    }
    let cookies = headers.get(COOKIE)?.to_str().ok()?;
    cookies
        .split(';')
        .map(str::trim)
        .find_map(|cookie| cookie.strip_prefix("session="))
        .filter(|session| !session.is_empty())
        .map(ToString::to_string)
}

/// Runs a synchronous request body on the blocking thread pool.
///
/// The store stack is synchronous `rusqlite`; keeping it off the async
/// workers stops a slow disk from stalling unrelated connections.
async fn run_blocking<F>(task: F) -> Response
where
    F: FnOnce() -> Response + Send + 'static,
{
    match tokio::task::spawn_blocking(task).await {
        Ok(response) => response,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

/// Authentication-and-admission prologue shared by bearer endpoints.
///
/// Authentication failures never charge the rate limiter; rate-limit
/// bookkeeping only applies to resolved principals.
fn authorize(
    state: &AppState,
    request_headers: &HeaderMap,
    body_token: Option<&str>,
    route: ApiRoute,
    started: Instant,
    now: i64,
) -> Result<Principal, Box<Response>> {
    let Some(token) = bearer_token(request_headers, body_token) else {
        return Err(Box::new(fail(
            state,
            request_headers,
            route,
            ApiOutcome::Unauthorized,
            StatusCode::UNAUTHORIZED,
            started,
            "unauthorized",
            None,
            now,
        )));
    };
    let principal = match state.authenticator.authenticate(&token) {
        Ok(principal) => principal,
        Err(AuthError::Unauthorized) => {
            return Err(Box::new(fail(
                state,
                request_headers,
                route,
                ApiOutcome::Unauthorized,
                StatusCode::UNAUTHORIZED,
                started,
                "unauthorized",
                None,
                now,
            )));
        }
        Err(AuthError::Store(error)) => {
            return Err(Box::new(fail_with_detail(
                state,
                request_headers,
                route,
                ApiOutcome::Error,
                StatusCode::INTERNAL_SERVER_ERROR,
                started,
                "internal error",
                None,
                now,
                Some(error.to_string()),
            )));
        }
    };
    match state.rate_limiter.check(principal.principal_id, now) {
        Ok(RateDecision::Allowed) => Ok(principal),
        Ok(RateDecision::Denied) => Err(Box::new(fail(
            state,
            request_headers,
            route,
            ApiOutcome::RateLimited,
            StatusCode::TOO_MANY_REQUESTS,
            started,
            "Rate limit exceeded",
            Some(principal.principal_id),
            now,
        ))),
        Err(error) => Err(Box::new(fail_with_detail(
            state,
            request_headers,
            route,
            ApiOutcome::Error,
            StatusCode::INTERNAL_SERVER_ERROR,
            started,
            "internal error",
            Some(principal.principal_id),
            now,
            Some(error.to_string()),
        ))),
    }
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// GET /api/status: usage snapshot for the authenticated principal.
pub async fn handle_status(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let started = Instant::now();
    let now = unix_seconds();
    run_blocking(move || status_response(state, headers, started, now)).await
}

/// Synchronous body of the status route.
fn status_response(state: AppState, headers: HeaderMap, started: Instant, now: i64) -> Response {
    let principal = match authorize(&state, &headers, None, ApiRoute::Status, started, now) {
        Ok(principal) => principal,
        Err(response) => return *response,
    };
    match state.meter.status(&principal, now) {
        Ok(snapshot) => respond(
            &state,
            &headers,
            ApiRoute::Status,
            ApiOutcome::Ok,
            StatusCode::OK,
            started,
            &StatusResponse {
                success: true,
                tier: principal.tier.as_str(),
                status: principal.subscription_status.as_str(),
                limits: *state.tiers.limits_for(principal.tier),
                usage: UsageBody {
                    messages_used: snapshot.messages_used,
                    messages_limit: snapshot.messages_limit,
                    messages_remaining: snapshot.messages_remaining,
                },
            },
        ),
        Err(error) => fail_with_detail(
            &state,
            &headers,
            ApiRoute::Status,
            ApiOutcome::Error,
            StatusCode::INTERNAL_SERVER_ERROR,
            started,
            "internal error",
            Some(principal.principal_id),
            now,
            Some(error.to_string()),
        ),
    }
}

/// POST /api/consume-message: charge one message against the quota.
pub async fn handle_consume(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let started = Instant::now();
    let now = unix_seconds();
    run_blocking(move || consume_response(state, headers, &body, started, now)).await
}

/// Synchronous body of the consume route.
fn consume_response(
    state: AppState,
    headers: HeaderMap,
    body: &Bytes,
    started: Instant,
    now: i64,
) -> Response {
    let route = ApiRoute::ConsumeMessage;
    if body.len() > state.max_body_bytes {
        return fail(
            &state,
            &headers,
            route,
            ApiOutcome::BadRequest,
            StatusCode::PAYLOAD_TOO_LARGE,
            started,
            "request body too large",
            None,
            now,
        );
    }
    let request: ConsumeRequest = if body.is_empty() {
        ConsumeRequest::default()
    } else {
        match serde_json::from_slice(body) {
            Ok(request) => request,
            Err(_) => {
                return fail(
                    &state,
                    &headers,
                    route,
                    ApiOutcome::BadRequest,
                    StatusCode::BAD_REQUEST,
                    started,
                    "malformed request body",
                    None,
                    now,
                );
            }
        }
    };
    let principal =
        match authorize(&state, &headers, request.token.as_deref(), route, started, now) {
            Ok(principal) => principal,
            Err(response) => return *response,
        };
    match state.meter.consume(&principal, now) {
        Ok(Consumption::Consumed {
            messages_used,
            messages_remaining,
        }) => respond(&state, &headers, route, ApiOutcome::Ok, StatusCode::OK, started, &ConsumeResponse {
            success: true,
            messages_used,
            messages_remaining,
            error: None,
        }),
        Ok(Consumption::LimitExceeded {
            messages_used,
        }) => {
            state.audit.record(&ApiAuditEvent {
                route,
                outcome: ApiOutcome::QuotaExhausted,
                principal_id: Some(principal.principal_id),
                at_unix: now,
                detail: None,
            });
            // Exhaustion is a well-formed outcome, not a transport error.
            respond(
                &state,
                &headers,
                route,
                ApiOutcome::QuotaExhausted,
                StatusCode::OK,
                started,
                &ConsumeResponse {
                    success: false,
                    messages_used,
                    messages_remaining: 0,
                    error: Some("Message limit exceeded"),
                },
            )
        }
        Err(error) => fail_with_detail(
            &state,
            &headers,
            route,
            ApiOutcome::Error,
            StatusCode::INTERNAL_SERVER_ERROR,
            started,
            "internal error",
            Some(principal.principal_id),
            now,
            Some(error.to_string()),
        ),
    }
}

/// POST /api/activate-subscription: apply a verified paid activation.
pub async fn handle_activate(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let started = Instant::now();
    let now = unix_seconds();
    run_blocking(move || activate_response(state, headers, &body, started, now)).await
}

/// Synchronous body of the activation route.
fn activate_response(
    state: AppState,
    headers: HeaderMap,
    body: &Bytes,
    started: Instant,
    now: i64,
) -> Response {
    let route = ApiRoute::ActivateSubscription;
    if body.len() > state.max_body_bytes {
        return fail(
            &state,
            &headers,
            route,
            ApiOutcome::BadRequest,
            StatusCode::PAYLOAD_TOO_LARGE,
            started,
            "request body too large",
            None,
            now,
        );
    }
    let Ok(request) = serde_json::from_slice::<ActivateRequest>(body) else {
        return fail(
            &state,
            &headers,
            route,
            ApiOutcome::BadRequest,
            StatusCode::BAD_REQUEST,
            started,
            "malformed request body",
            None,
            now,
        );
    };
    let Some(session) = session_token(&headers) else {
        return fail(
            &state,
            &headers,
            route,
            ApiOutcome::Unauthorized,
            StatusCode::UNAUTHORIZED,
            started,
            "unauthorized",
            None,
            now,
        );
    };
    let principal_id = match state.sessions.resolve(&session) {
        Ok(Some(principal_id)) => principal_id,
        Ok(None) => {
            return fail(
                &state,
                &headers,
                route,
                ApiOutcome::Unauthorized,
                StatusCode::UNAUTHORIZED,
                started,
                "unauthorized",
                None,
                now,
            );
        }
        Err(error) => {
            return fail_with_detail(
                &state,
                &headers,
                route,
                ApiOutcome::Error,
                StatusCode::INTERNAL_SERVER_ERROR,
                started,
                "internal error",
                None,
                now,
                Some(error.to_string()),
            );
        }
    };
    // Activation rides the provider's at-least-once callback path, not
    // the metered hot path; it never charges the sliding window.
    let Some(plan) = Tier::from_label(&request.plan) else {
        return fail(
            &state,
            &headers,
            route,
            ApiOutcome::BadRequest,
            StatusCode::BAD_REQUEST,
            started,
            "unknown plan",
            Some(principal_id),
            now,
        );
    };
    match state.activator.activate(principal_id, plan, &request.subscription_id.into(), now) {
        Ok(applied) => {
            state.audit.record(&ApiAuditEvent {
                route,
                outcome: ApiOutcome::Ok,
                principal_id: Some(principal_id),
                at_unix: now,
                detail: None,
            });
            respond(&state, &headers, route, ApiOutcome::Ok, StatusCode::OK, started, &ActivateResponse {
                success: true,
                already_active: applied == Activation::AlreadyActive,
            })
        }
        Err(ActivationError::InvalidPlan(_)) => fail(
            &state,
            &headers,
            route,
            ApiOutcome::BadRequest,
            StatusCode::BAD_REQUEST,
            started,
            "plan is not activatable",
            Some(principal_id),
            now,
        ),
        Err(ActivationError::UnknownPrincipal) => fail(
            &state,
            &headers,
            route,
            ApiOutcome::Unauthorized,
            StatusCode::UNAUTHORIZED,
            started,
            "unauthorized",
            None,
            now,
        ),
        Err(error @ (ActivationError::Period(_) | ActivationError::Store(_))) => {
            fail_with_detail(
                &state,
                &headers,
                route,
                ApiOutcome::Error,
                StatusCode::INTERNAL_SERVER_ERROR,
                started,
                "internal error",
                Some(principal_id),
                now,
                Some(error.to_string()),
            )
        }
    }
}

/// OPTIONS preflight for every API route.
pub async fn handle_preflight(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let started = Instant::now();
    let event = ApiMetricEvent {
        route: ApiRoute::Preflight,
        outcome: ApiOutcome::Ok,
        status: StatusCode::NO_CONTENT.as_u16(),
    };
    state.metrics.record_request(event);
    state.metrics.record_latency(event, started.elapsed());
    let mut response = StatusCode::NO_CONTENT.into_response();
    state.cors.apply(&headers, response.headers_mut());
    response
}

/// GET /healthz: process liveness.
pub async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /readyz: store readiness.
pub async fn handle_ready(State(state): State<AppState>) -> Response {
    run_blocking(move || match state.store.readiness() {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "status": "ready" }))).into_response(),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "status": "unavailable" })),
        )
            .into_response(),
    })
    .await
}

// ============================================================================
// SECTION: Router & Serve
// ============================================================================

/// Builds the API router over the given state.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/status", get(handle_status).options(handle_preflight))
        .route("/api/consume-message", post(handle_consume).options(handle_preflight))
        .route("/api/activate-subscription", post(handle_activate).options(handle_preflight))
        .route("/healthz", get(handle_health))
        .route("/readyz", get(handle_ready))
        .with_state(state)
}

/// Binds the configured address and serves the API until shutdown.
///
/// # Errors
///
/// Returns [`ApiError::Io`] when binding or serving fails.
pub async fn serve(config: &QuotaGateConfig, state: AppState) -> Result<(), ApiError> {
    let listener = tokio::net::TcpListener::bind(config.server.bind.as_str()).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests;
