// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Healing Buds

//! On-demand integration diagnostics.
//!
//! Each suite runs to completion: a failing check records its result and
//! the next check still runs, so one report shows the whole picture.
//! Self-probes go through a fresh copy of the public router rather than a
//! network socket, which keeps them honest about middleware (CORS, error
//! shapes) without needing a second listener.

use std::time::Instant;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tower::ServiceExt;
use utoipa::ToSchema;

use crate::events::signature;
use crate::partner::{keys, Environment, PartnerClient, PartnerConfig};
use crate::state::AppState;

const SELF_PROBE_BODY_LIMIT: usize = 1024 * 1024;
const LATENCY_BUDGET_MS: u128 = 1_000;
const SIGNATURE_PROBE_PAYLOAD: &[u8] = br#"{"probe":"diagnostics"}"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Pass,
    Fail,
    Skip,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseResult {
    pub name: String,
    pub status: TestStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<Value>,
    /// Wall-clock milliseconds, emitted as `duration` on the wire.
    #[serde(rename = "duration")]
    pub duration_ms: u64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuiteReport {
    pub suite: String,
    pub environment: Environment,
    pub timestamp: DateTime<Utc>,
    pub total_tests: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Wall-clock milliseconds, emitted as `duration` on the wire.
    #[serde(rename = "duration")]
    pub duration_ms: u64,
    pub results: Vec<TestCaseResult>,
}

impl SuiteReport {
    fn assemble(
        suite: &str,
        environment: Environment,
        started: Instant,
        results: Vec<TestCaseResult>,
    ) -> Self {
        let passed = results.iter().filter(|r| r.status == TestStatus::Pass).count();
        let failed = results.iter().filter(|r| r.status == TestStatus::Fail).count();
        let skipped = results.iter().filter(|r| r.status == TestStatus::Skip).count();
        Self {
            suite: suite.to_string(),
            environment,
            timestamp: Utc::now(),
            total_tests: results.len(),
            passed,
            failed,
            skipped,
            duration_ms: started.elapsed().as_millis() as u64,
            results,
        }
    }
}

/// Outcome of one check before timing is attached.
type Outcome = (TestStatus, String, Option<Value>);

fn pass(message: impl Into<String>) -> Outcome {
    (TestStatus::Pass, message.into(), None)
}

fn pass_with(message: impl Into<String>, details: Value) -> Outcome {
    (TestStatus::Pass, message.into(), Some(details))
}

fn fail(message: impl Into<String>) -> Outcome {
    (TestStatus::Fail, message.into(), None)
}

fn fail_with(message: impl Into<String>, details: Value) -> Outcome {
    (TestStatus::Fail, message.into(), Some(details))
}

fn skip(message: impl Into<String>) -> Outcome {
    (TestStatus::Skip, message.into(), None)
}

async fn timed<F>(name: &str, check: F) -> TestCaseResult
where
    F: std::future::Future<Output = Outcome>,
{
    let started = Instant::now();
    let (status, message, details) = check.await;
    TestCaseResult {
        name: name.to_string(),
        status,
        message,
        details,
        duration_ms: started.elapsed().as_millis() as u64,
    }
}

/// Run the diagnostics suite for the requested environment.
///
/// Credentials come from the state's injected configuration, never from a
/// fresh environment read.
pub async fn run_suite(state: &AppState, environment: Environment) -> SuiteReport {
    let started = Instant::now();
    let config = state.partner_config(environment);

    let results = match environment {
        Environment::Production => production_checks(state, config).await,
        Environment::Staging => staging_checks(state, config).await,
    };

    let suite = match environment {
        Environment::Production => "drgreen-production-diagnostics",
        Environment::Staging => "drgreen-staging-diagnostics",
    };
    SuiteReport::assemble(suite, environment, started, results)
}

async fn production_checks(state: &AppState, config: &PartnerConfig) -> Vec<TestCaseResult> {
    vec![
        timed("Health endpoint", check_health(state)).await,
        timed("Partner credentials", check_credentials(config)).await,
        timed("Signature round-trip", check_signature(config)).await,
        timed("Strains endpoint", check_strains(config)).await,
        timed("Client mirror", check_client_mirror(state)).await,
        timed("Journey log", check_journey_log(state)).await,
        timed("Webhook signature enforcement", check_webhook_security(state)).await,
        timed("Unknown proxy action", check_unknown_action(state)).await,
        timed("CORS preflight", check_cors(state)).await,
        timed("Health latency", check_latency(state)).await,
    ]
}

async fn staging_checks(state: &AppState, config: &PartnerConfig) -> Vec<TestCaseResult> {
    vec![
        timed("Staging configuration", check_credentials(config)).await,
        timed("Staging connectivity", check_connectivity(config)).await,
        timed("Signature round-trip", check_signature(config)).await,
        timed("Strains endpoint", check_strains(config)).await,
        timed("Client mirror", check_client_mirror(state)).await,
        timed("Journey log", check_journey_log(state)).await,
    ]
}

/// Route a request through a fresh copy of the public router.
async fn self_probe(
    state: &AppState,
    request: Request<Body>,
) -> Result<(StatusCode, axum::http::HeaderMap, Value), String> {
    let router = crate::api::router(state.clone());
    let response = router
        .oneshot(request)
        .await
        .map_err(|e| e.to_string())?;
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), SELF_PROBE_BODY_LIMIT)
        .await
        .map_err(|e| e.to_string())?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    Ok((status, headers, body))
}

fn json_post(path: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap_or_default()
}

async fn check_health(state: &AppState) -> Outcome {
    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .body(Body::empty())
        .unwrap_or_default();
    match self_probe(state, request).await {
        Ok((StatusCode::OK, _, body)) if body["status"] == "ok" => {
            pass("Health endpoint reports ok")
        }
        Ok((status, _, body)) => fail_with(
            "Health endpoint did not report ok",
            json!({ "status": status.as_u16(), "body": body }),
        ),
        Err(e) => fail(format!("Health probe failed: {e}")),
    }
}

async fn check_credentials(config: &PartnerConfig) -> Outcome {
    let missing = config.missing_variables();
    if missing.is_empty() {
        pass(format!("All {} credentials configured", config.environment))
    } else {
        fail_with(
            "Partner credentials missing",
            json!({ "missing": missing }),
        )
    }
}

async fn check_signature(config: &PartnerConfig) -> Outcome {
    let Some(key_material) = config.private_key.as_deref() else {
        return skip("Private key not configured");
    };
    let key = match keys::decode_secp256k1_key(key_material) {
        Ok(key) => key,
        Err(e) => return fail(format!("Private key failed to decode: {e}")),
    };
    match keys::sign_payload(&key, SIGNATURE_PROBE_PAYLOAD) {
        Ok(sig) if keys::verify_payload(key.verifying_key(), SIGNATURE_PROBE_PAYLOAD, &sig) => {
            pass("Key decodes, signs, and verifies")
        }
        Ok(_) => fail("Signature did not verify against its own key"),
        Err(e) => fail(format!("Signing failed: {e}")),
    }
}

async fn check_connectivity(config: &PartnerConfig) -> Outcome {
    if !config.is_configured() {
        return skip("Partner credentials not configured");
    }
    let client = match PartnerClient::new(config) {
        Ok(client) => client,
        Err(e) => return fail(format!("Client construction failed: {e}")),
    };
    // Any HTTP answer proves the deployment is reachable.
    match client
        .request(reqwest::Method::GET, "/strains?countryCode=PT", None)
        .await
    {
        Ok(response) => pass_with(
            "Partner API reachable",
            json!({ "status": response.status.as_u16() }),
        ),
        Err(e) => fail(format!("Partner API unreachable: {e}")),
    }
}

async fn check_strains(config: &PartnerConfig) -> Outcome {
    if !config.is_configured() {
        return skip("Partner credentials not configured");
    }
    let client = match PartnerClient::new(config) {
        Ok(client) => client,
        Err(e) => return fail(format!("Client construction failed: {e}")),
    };
    match client
        .request(reqwest::Method::GET, "/strains?countryCode=PT", None)
        .await
    {
        Ok(response) if response.status.is_success() => {
            let count = response.body["data"].as_array().map(Vec::len);
            pass_with("Strains listing succeeded", json!({ "count": count }))
        }
        Ok(response) => fail_with(
            "Strains listing returned an error",
            json!({ "status": response.status.as_u16(), "body": response.body }),
        ),
        Err(e) => fail(format!("Strains request failed: {e}")),
    }
}

async fn check_client_mirror(state: &AppState) -> Outcome {
    match state.db.count_clients() {
        Ok(count) => pass_with("Client mirror readable", json!({ "clients": count })),
        Err(e) => fail(format!("Client mirror unreadable: {e}")),
    }
}

async fn check_journey_log(state: &AppState) -> Outcome {
    match state.db.count_journey_entries() {
        Ok(count) => pass_with("Journey log readable", json!({ "entries": count })),
        Err(e) => fail(format!("Journey log unreadable: {e}")),
    }
}

/// Prove the webhook endpoint rejects a bad signature and accepts a good
/// one. The probe event matches no route, so accepting it changes nothing.
async fn check_webhook_security(state: &AppState) -> Outcome {
    let Some(secret) = state.webhook_secret.as_deref() else {
        return skip("Webhook secret not configured");
    };

    let payload = json!({ "event": "diagnostics.ping", "timestamp": Utc::now() }).to_string();

    let mut bad = json_post("/v1/webhooks/drgreen", Value::Null);
    *bad.body_mut() = Body::from(payload.clone());
    bad.headers_mut().insert(
        "x-webhook-signature",
        header::HeaderValue::from_static("deadbeef"),
    );
    let rejected = match self_probe(state, bad).await {
        Ok((status, _, _)) => status == StatusCode::UNAUTHORIZED,
        Err(e) => return fail(format!("Webhook probe failed: {e}")),
    };

    let signature = signature::sign(payload.as_bytes(), secret);
    let mut good = json_post("/v1/webhooks/drgreen", Value::Null);
    *good.body_mut() = Body::from(payload.clone());
    if let Ok(value) = header::HeaderValue::from_str(&signature) {
        good.headers_mut().insert("x-webhook-signature", value);
    }
    let accepted = match self_probe(state, good).await {
        Ok((status, _, _)) => status == StatusCode::OK,
        Err(e) => return fail(format!("Webhook probe failed: {e}")),
    };

    match (rejected, accepted) {
        (true, true) => pass("Bad signatures rejected, valid signatures accepted"),
        (false, _) => fail("A bad signature was not rejected"),
        (_, false) => fail("A valid signature was not accepted"),
    }
}

async fn check_unknown_action(state: &AppState) -> Outcome {
    let request = json_post("/v1/proxy", json!({ "action": "definitely-not-real" }));
    match self_probe(state, request).await {
        Ok((StatusCode::BAD_REQUEST, _, body)) if body["error"] == "Unknown action" => {
            pass("Unknown actions rejected with the expected shape")
        }
        Ok((status, _, body)) => fail_with(
            "Unknown action was not rejected as expected",
            json!({ "status": status.as_u16(), "body": body }),
        ),
        Err(e) => fail(format!("Proxy probe failed: {e}")),
    }
}

async fn check_cors(state: &AppState) -> Outcome {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/v1/proxy")
        .header(header::ORIGIN, "https://healingbuds.global")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap_or_default();
    match self_probe(state, request).await {
        Ok((_, headers, _)) => {
            let allow_origin = headers
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            match allow_origin {
                Some(origin) => pass_with(
                    "Preflight answered with CORS headers",
                    json!({ "allowOrigin": origin }),
                ),
                None => fail("Preflight response carried no CORS headers"),
            }
        }
        Err(e) => fail(format!("CORS probe failed: {e}")),
    }
}

async fn check_latency(state: &AppState) -> Outcome {
    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .body(Body::empty())
        .unwrap_or_default();
    let started = Instant::now();
    match self_probe(state, request).await {
        Ok((StatusCode::OK, _, _)) => {
            let elapsed = started.elapsed().as_millis();
            if elapsed < LATENCY_BUDGET_MS {
                pass_with("Health responds within budget", json!({ "latencyMs": elapsed }))
            } else {
                fail_with("Health response too slow", json!({ "latencyMs": elapsed }))
            }
        }
        Ok((status, _, _)) => fail(format!("Health returned {status}")),
        Err(e) => fail(format!("Latency probe failed: {e}")),
    }
}
