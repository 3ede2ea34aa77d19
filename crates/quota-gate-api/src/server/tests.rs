// crates/quota-gate-api/src/server/tests.rs
// ============================================================================
// Module: API Server Unit Tests
// Description: Unit tests for handlers, CORS, metrics, and audit behavior.
// Purpose: Validate request processing with in-memory fixtures.
// Dependencies: quota-gate-api
// ============================================================================

//! ## Overview
//! Exercises the API handlers directly with in-memory stores: auth
//! rejection ordering, the quota-exhaustion envelope, rate-limit
//! admission, session-gated activation, and CORS header resolution.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use axum::body::Bytes;
use axum::body::to_bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::http::header::ACCESS_CONTROL_ALLOW_HEADERS;
use axum::http::header::ACCESS_CONTROL_ALLOW_ORIGIN;
use axum::http::header::AUTHORIZATION;
use axum::http::header::COOKIE;
use axum::http::header::ORIGIN;
use axum::http::header::VARY;
use axum::response::IntoResponse;
use axum::response::Response;
use quota_gate_config::QuotaGateConfig;
use quota_gate_core::BillingPeriod;
use quota_gate_core::InMemoryPrincipalStore;
use quota_gate_core::InMemoryRateLimitStore;
use quota_gate_core::NewPrincipal;
use quota_gate_core::Principal;
use quota_gate_core::PrincipalId;
use quota_gate_core::PrincipalStore;
use quota_gate_core::SharedPrincipalStore;
use quota_gate_core::SharedRateLimitStore;
use quota_gate_core::StoreError;
use quota_gate_core::Tier;
use quota_gate_core::TokenDigest;
use serde_json::json;

use super::AppState;
use super::handle_activate;
use super::handle_consume;
use super::handle_health;
use super::handle_preflight;
use super::handle_ready;
use super::handle_status;
use super::unix_seconds;
use crate::audit::ApiAuditEvent;
use crate::audit::ApiAuditSink;
use crate::sessions::SessionResolver;
use crate::telemetry::ApiMetricEvent;
use crate::telemetry::ApiMetrics;
use crate::telemetry::ApiOutcome;
use crate::telemetry::ApiRoute;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Base configuration with two allowed origins and in-test store path.
fn test_config(extra: &str) -> QuotaGateConfig {
    let toml = format!(
        r#"
[server]
allowed_origins = ["https://app.example.com", "https://admin.example.com"]

[store]
path = "unused.db"

{extra}
"#
    );
    QuotaGateConfig::from_toml_str(&toml).expect("test config must parse")
}

/// Builds handler state over fresh in-memory stores.
fn test_state(config: &QuotaGateConfig) -> (AppState, Arc<InMemoryPrincipalStore>) {
    let backend = Arc::new(InMemoryPrincipalStore::new());
    let principal_store: SharedPrincipalStore = backend.clone();
    let rate_store: SharedRateLimitStore = Arc::new(InMemoryRateLimitStore::new());
    (AppState::new(principal_store, rate_store, config), backend)
}

/// Enrolls a principal in the current billing period.
fn enroll(backend: &InMemoryPrincipalStore, email: &str, tier: Tier) -> Principal {
    let period =
        BillingPeriod::from_unix_seconds(unix_seconds()).expect("current period must derive");
    let signup = NewPrincipal {
        email: email.to_string(),
        credential_hash: "stored-credential-hash".to_string(),
        tier,
        period,
    };
    backend.create(&signup, &TokenDigest::from_raw_token("seed")).expect("enrollment")
}

/// Enrolls a principal and issues it a live bearer token.
fn enroll_with_token(state: &AppState, backend: &InMemoryPrincipalStore) -> (Principal, String) {
    let principal = enroll(backend, "owner@example.com", Tier::Free);
    let token =
        state.authenticator.issue_token(principal.principal_id).expect("token issuance");
    (principal, token.expose().to_string())
}

/// Builds request headers carrying the given bearer token.
fn bearer_headers(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}")).expect("header value"),
    );
    headers
}

/// Reads the response body as JSON.
async fn body_json(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body bytes");
    serde_json::from_slice(&bytes).expect("json body")
}

/// Metrics sink capturing every recorded event.
#[derive(Default)]
struct TestMetrics {
    /// Recorded metric events in arrival order.
    events: Mutex<Vec<ApiMetricEvent>>,
}

impl ApiMetrics for TestMetrics {
    fn record_request(&self, event: ApiMetricEvent) {
        self.events.lock().expect("metrics lock").push(event);
    }

    fn record_latency(&self, _event: ApiMetricEvent, _latency: Duration) {}
}

/// Audit sink capturing every recorded event.
#[derive(Default)]
struct TestAudit {
    /// Recorded audit events in arrival order.
    events: Mutex<Vec<ApiAuditEvent>>,
}

impl ApiAuditSink for TestAudit {
    fn record(&self, event: &ApiAuditEvent) {
        self.events.lock().expect("audit lock").push(event.clone());
    }
}

/// Session resolver recognizing exactly one session token.
struct TestSessions {
    /// The only principal any session resolves to.
    principal: PrincipalId,
}

impl SessionResolver for TestSessions {
    fn resolve(&self, session_token: &str) -> Result<Option<PrincipalId>, StoreError> {
        if session_token == "sess-valid" {
            Ok(Some(self.principal))
        } else {
            Ok(None)
        }
    }
}

// ============================================================================
// SECTION: Authentication Tests
// ============================================================================

#[tokio::test]
async fn status_without_token_is_unauthorized() {
    let config = test_config("");
    let (state, _backend) = test_state(&config);
    let response = handle_status(State(state), HeaderMap::new()).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn status_with_unknown_token_is_unauthorized() {
    let config = test_config("");
    let (state, backend) = test_state(&config);
    let (_principal, _token) = enroll_with_token(&state, &backend);
    let headers = bearer_headers("not-a-live-token");
    let response = handle_status(State(state), headers).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn failed_auth_does_not_charge_the_rate_window() {
    let config = test_config("[rate_limit]\nmax_requests = 2\nwindow_seconds = 60");
    let (state, backend) = test_state(&config);
    let (_principal, token) = enroll_with_token(&state, &backend);
    for _ in 0..10 {
        let response =
            handle_status(State(state.clone()), bearer_headers("bogus-token")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
    let response = handle_status(State(state), bearer_headers(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ============================================================================
// SECTION: Status & Consume Tests
// ============================================================================

#[tokio::test]
async fn status_reports_the_usage_snapshot() {
    let config = test_config("");
    let (state, backend) = test_state(&config);
    let (_principal, token) = enroll_with_token(&state, &backend);
    let response = handle_status(State(state), bearer_headers(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["tier"], json!("free"));
    assert_eq!(body["status"], json!("active"));
    assert_eq!(body["limits"]["messages_per_month"], json!(300));
    assert_eq!(body["limits"]["bots"], json!(1));
    assert_eq!(body["usage"]["messages_used"], json!(0));
    assert_eq!(body["usage"]["messages_limit"], json!(300));
    assert_eq!(body["usage"]["messages_remaining"], json!(300));
}

#[tokio::test]
async fn consume_charges_one_message() {
    let config = test_config("");
    let (state, backend) = test_state(&config);
    let (_principal, token) = enroll_with_token(&state, &backend);
    let response =
        handle_consume(State(state), bearer_headers(&token), Bytes::new()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["messages_used"], json!(1));
    assert_eq!(body["messages_remaining"], json!(299));
}

#[tokio::test]
async fn consume_accepts_the_body_token_fallback() {
    let config = test_config("");
    let (state, backend) = test_state(&config);
    let (_principal, token) = enroll_with_token(&state, &backend);
    let body = Bytes::from(serde_json::to_vec(&json!({ "token": token })).expect("body"));
    let response = handle_consume(State(state), HeaderMap::new(), body).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
}

#[tokio::test]
async fn quota_exhaustion_is_a_success_false_envelope() {
    let tiers = r"
[tiers.free]
bots = 1
messages_per_month = 2
faqs = 10
avatars = false
lead_capture = false
export = true
custom_prompt = false
own_api_key = false

[tiers.starter]
bots = 3
messages_per_month = 1000
faqs = 50
avatars = true
lead_capture = true
export = true
custom_prompt = true
own_api_key = false

[tiers.pro]
bots = -1
messages_per_month = 10000
faqs = -1
avatars = true
lead_capture = true
export = true
custom_prompt = true
own_api_key = true
";
    let config = test_config(tiers);
    let (state, backend) = test_state(&config);
    let (_principal, token) = enroll_with_token(&state, &backend);
    for _ in 0..2 {
        let response =
            handle_consume(State(state.clone()), bearer_headers(&token), Bytes::new()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["success"], json!(true));
    }
    let response = handle_consume(State(state), bearer_headers(&token), Bytes::new()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!("Message limit exceeded"));
    assert_eq!(body["messages_used"], json!(2));
    assert_eq!(body["messages_remaining"], json!(0));
}

#[tokio::test]
async fn malformed_consume_body_is_rejected() {
    let config = test_config("");
    let (state, backend) = test_state(&config);
    let (_principal, token) = enroll_with_token(&state, &backend);
    let response =
        handle_consume(State(state), bearer_headers(&token), Bytes::from_static(b"{ nope"))
            .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_consume_body_is_rejected() {
    let toml = "[server]\nmax_body_bytes = 16\n\n[store]\npath = \"unused.db\"\n";
    let config = QuotaGateConfig::from_toml_str(toml).expect("config");
    let (state, backend) = test_state(&config);
    let (_principal, token) = enroll_with_token(&state, &backend);
    let body = Bytes::from(vec![b'x'; 17]);
    let response = handle_consume(State(state), bearer_headers(&token), body).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

// ============================================================================
// SECTION: Rate Limit Tests
// ============================================================================

#[tokio::test]
async fn requests_past_the_window_cap_are_denied() {
    let config = test_config("[rate_limit]\nmax_requests = 2\nwindow_seconds = 60");
    let (state, backend) = test_state(&config);
    let (_principal, token) = enroll_with_token(&state, &backend);
    for _ in 0..2 {
        let response = handle_status(State(state.clone()), bearer_headers(&token)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = handle_status(State(state), bearer_headers(&token)).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = body_json(response).await;
    assert_eq!(body["error"], json!("Rate limit exceeded"));
}

// ============================================================================
// SECTION: Activation Tests
// ============================================================================

#[tokio::test]
async fn activation_requires_a_session() {
    let config = test_config("");
    let (state, _backend) = test_state(&config);
    let body = Bytes::from(
        serde_json::to_vec(&json!({ "plan": "pro", "subscription_id": "sub_1" }))
            .expect("body"),
    );
    let response = handle_activate(State(state), HeaderMap::new(), body).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn activation_applies_once_and_replays_as_already_active() {
    let config = test_config("");
    let (state, backend) = test_state(&config);
    let principal = enroll(&backend, "owner@example.com", Tier::Free);
    let state = state.with_sessions(Arc::new(TestSessions {
        principal: principal.principal_id,
    }));
    let mut headers = HeaderMap::new();
    headers.insert(COOKIE, HeaderValue::from_static("theme=dark; session=sess-valid"));
    let body = Bytes::from(
        serde_json::to_vec(&json!({ "plan": "pro", "subscription_id": "sub_42" }))
            .expect("body"),
    );

    let response =
        handle_activate(State(state.clone()), headers.clone(), body.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let first = body_json(response).await;
    assert_eq!(first["success"], json!(true));
    assert_eq!(first["already_active"], json!(false));

    let response = handle_activate(State(state), headers, body).await;
    assert_eq!(response.status(), StatusCode::OK);
    let replay = body_json(response).await;
    assert_eq!(replay["success"], json!(true));
    assert_eq!(replay["already_active"], json!(true));
}

#[tokio::test]
async fn activation_is_admitted_after_the_rate_window_fills() {
    let config = test_config("[rate_limit]\nmax_requests = 2\nwindow_seconds = 60");
    let (state, backend) = test_state(&config);
    let (principal, token) = enroll_with_token(&state, &backend);
    let state = state.with_sessions(Arc::new(TestSessions {
        principal: principal.principal_id,
    }));
    for _ in 0..2 {
        let response = handle_status(State(state.clone()), bearer_headers(&token)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = handle_status(State(state.clone()), bearer_headers(&token)).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    // Provider callbacks are delivered at least once; the sliding window
    // must never turn one away.
    let mut headers = HeaderMap::new();
    headers.insert("x-session-token", HeaderValue::from_static("sess-valid"));
    let body = Bytes::from(
        serde_json::to_vec(&json!({ "plan": "pro", "subscription_id": "sub_77" }))
            .expect("body"),
    );
    let response = handle_activate(State(state), headers, body).await;
    assert_eq!(response.status(), StatusCode::OK);
    let applied = body_json(response).await;
    assert_eq!(applied["success"], json!(true));
}

#[tokio::test]
async fn activation_rejects_the_free_plan() {
    let config = test_config("");
    let (state, backend) = test_state(&config);
    let principal = enroll(&backend, "owner@example.com", Tier::Free);
    let state = state.with_sessions(Arc::new(TestSessions {
        principal: principal.principal_id,
    }));
    let mut headers = HeaderMap::new();
    headers.insert("x-session-token", HeaderValue::from_static("sess-valid"));
    let body = Bytes::from(
        serde_json::to_vec(&json!({ "plan": "free", "subscription_id": "sub_9" }))
            .expect("body"),
    );
    let response = handle_activate(State(state), headers, body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn activation_with_an_unknown_session_is_unauthorized() {
    let config = test_config("");
    let (state, backend) = test_state(&config);
    let principal = enroll(&backend, "owner@example.com", Tier::Free);
    let state = state.with_sessions(Arc::new(TestSessions {
        principal: principal.principal_id,
    }));
    let mut headers = HeaderMap::new();
    headers.insert("x-session-token", HeaderValue::from_static("sess-stale"));
    let body = Bytes::from(
        serde_json::to_vec(&json!({ "plan": "pro", "subscription_id": "sub_7" }))
            .expect("body"),
    );
    let response = handle_activate(State(state), headers, body).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ============================================================================
// SECTION: CORS Tests
// ============================================================================

#[tokio::test]
async fn preflight_echoes_a_listed_origin() {
    let config = test_config("");
    let (state, _backend) = test_state(&config);
    let mut headers = HeaderMap::new();
    headers.insert(ORIGIN, HeaderValue::from_static("https://admin.example.com"));
    let response = handle_preflight(State(state), headers).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN),
        Some(&HeaderValue::from_static("https://admin.example.com"))
    );
    assert_eq!(response.headers().get(VARY), Some(&HeaderValue::from_static("Origin")));
    assert_eq!(
        response.headers().get(ACCESS_CONTROL_ALLOW_HEADERS),
        Some(&HeaderValue::from_static("Authorization, Content-Type"))
    );
}

#[tokio::test]
async fn preflight_falls_back_to_the_first_listed_origin() {
    let config = test_config("");
    let (state, _backend) = test_state(&config);
    let mut headers = HeaderMap::new();
    headers.insert(ORIGIN, HeaderValue::from_static("https://evil.example.net"));
    let response = handle_preflight(State(state), headers).await;
    assert_eq!(
        response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN),
        Some(&HeaderValue::from_static("https://app.example.com"))
    );
}

#[tokio::test]
async fn empty_allow_list_serves_no_cors_headers() {
    let toml = "[store]\npath = \"unused.db\"\n";
    let config = QuotaGateConfig::from_toml_str(toml).expect("config");
    let (state, _backend) = test_state(&config);
    let mut headers = HeaderMap::new();
    headers.insert(ORIGIN, HeaderValue::from_static("https://app.example.com"));
    let response = handle_preflight(State(state), headers).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

// ============================================================================
// SECTION: Probe Tests
// ============================================================================

#[tokio::test]
async fn health_probe_reports_ok() {
    let response = handle_health().await.into_response();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], json!("ok"));
}

#[tokio::test]
async fn readiness_probe_reports_ready() {
    let config = test_config("");
    let (state, _backend) = test_state(&config);
    let response = handle_ready(State(state)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], json!("ready"));
}

// ============================================================================
// SECTION: Telemetry Tests
// ============================================================================

#[tokio::test]
async fn consume_records_a_request_metric() {
    let config = test_config("");
    let (state, backend) = test_state(&config);
    let metrics = Arc::new(TestMetrics::default());
    let state = state.with_metrics(metrics.clone());
    let (_principal, token) = enroll_with_token(&state, &backend);
    let response =
        handle_consume(State(state), bearer_headers(&token), Bytes::new()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let events = metrics.events.lock().expect("metrics lock");
    let event = events.last().expect("at least one metric event");
    assert_eq!(event.route, ApiRoute::ConsumeMessage);
    assert_eq!(event.outcome, ApiOutcome::Ok);
    assert_eq!(event.status, 200);
}

#[tokio::test]
async fn unauthorized_requests_are_audited() {
    let config = test_config("");
    let (state, _backend) = test_state(&config);
    let audit = Arc::new(TestAudit::default());
    let state = state.with_audit(audit.clone());
    let response = handle_status(State(state), HeaderMap::new()).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let events = audit.events.lock().expect("audit lock");
    let event = events.last().expect("at least one audit event");
    assert_eq!(event.route, ApiRoute::Status);
    assert_eq!(event.outcome, ApiOutcome::Unauthorized);
    assert!(event.principal_id.is_none());
}
