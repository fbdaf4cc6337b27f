// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Healing Buds

//! Inbound webhook endpoint for Dr. Green platform events.

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use tracing::{debug, error, info, warn};

use crate::{
    error::ApiError,
    events::{self, EventRoute},
    models::{WebhookAck, WebhookPayload},
    state::AppState,
};

pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Receive a partner event delivery.
///
/// The signature is checked over the raw body before any parsing. A
/// configured secret makes verification mandatory; without one, deliveries
/// are accepted unverified and each acceptance is logged.
#[utoipa::path(
    post,
    path = "/v1/webhooks/drgreen",
    request_body = WebhookPayload,
    tag = "Webhooks",
    responses(
        (status = 200, body = WebhookAck),
        (status = 401, description = "Missing or invalid signature"),
        (status = 500, description = "Malformed payload or processing failure")
    )
)]
pub async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    match state.webhook_secret.as_deref() {
        Some(secret) => {
            let signature = headers
                .get(SIGNATURE_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");
            if !events::signature::verify(&body, signature, secret) {
                warn!("webhook delivery rejected: bad or missing signature");
                return Err(ApiError::unauthorized("Invalid signature"));
            }
        }
        None => {
            warn!("webhook secret not configured, accepting unverified delivery");
        }
    }

    let payload: WebhookPayload = serde_json::from_slice(&body).map_err(|e| {
        error!(error = %e, "webhook payload failed to parse");
        ApiError::internal("Webhook processing failed")
    })?;

    info!(
        event = %payload.event,
        order_id = payload.order_id.as_deref(),
        client_id = payload.client_id.as_deref(),
        "webhook event received"
    );

    let email_sent = match events::classify(&payload) {
        EventRoute::Client => {
            events::clients::handle_client_event(&state.db, &state.notifier, &payload).await
        }
        EventRoute::Order => {
            events::orders::handle_order_event(&state.db, &state.notifier, &payload).await
        }
        EventRoute::Unhandled => {
            debug!(event = %payload.event, "event matched no route, acknowledging");
            false
        }
    };

    Ok(Json(WebhookAck {
        success: true,
        event: payload.event,
        email_sent,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegionTable;
    use crate::models::AdminApproval;
    use crate::notify::{Notifier, NotifierConfig};
    use crate::partner::{Environment, PartnerConfig};
    use crate::storage::{GatewayDatabase, StoredClient, StoredUser};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn setup(secret: Option<&str>) -> (TempDir, AppState) {
        let temp = TempDir::new().unwrap();
        let db = GatewayDatabase::open(&temp.path().join("gateway.redb")).unwrap();
        db.upsert_client(&StoredClient {
            drgreen_client_id: "c1".to_string(),
            user_id: "u1".to_string(),
            is_kyc_verified: false,
            admin_approval: AdminApproval::Pending,
            kyc_link: None,
            country_code: Some("ZA".to_string()),
            created_at: Utc::now(),
        })
        .unwrap();
        db.upsert_user(&StoredUser {
            user_id: "u1".to_string(),
            email: "p@example.com".to_string(),
            full_name: Some("Pat".to_string()),
        })
        .unwrap();

        let notifier = Notifier::new(NotifierConfig {
            api_key: None,
            api_base_url: "https://api.resend.test".to_string(),
            regions: RegionTable::default(),
        });
        let partner_for = |environment: Environment| PartnerConfig {
            environment,
            base_url: "https://partner.test/api/v1".to_string(),
            api_key: None,
            private_key: None,
        };
        let state = AppState::new(
            db,
            notifier,
            partner_for(Environment::Production),
            partner_for(Environment::Staging),
            secret.map(str::to_string),
        );
        (temp, state)
    }

    async fn deliver(
        state: &AppState,
        body: &str,
        signature: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/v1/webhooks/drgreen")
            .header("content-type", "application/json");
        if let Some(sig) = signature {
            builder = builder.header(SIGNATURE_HEADER, sig);
        }
        let request = builder.body(Body::from(body.to_string())).unwrap();

        let response = crate::api::router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn signed_delivery_is_processed_end_to_end() {
        let (_temp, state) = setup(Some("secret"));
        let body = json!({
            "event": "kyc.verified",
            "clientId": "c1",
            "timestamp": "2024-01-01T00:00:00Z"
        })
        .to_string();
        let sig = crate::events::signature::sign(body.as_bytes(), "secret");

        let (status, ack) = deliver(&state, &body, Some(&sig)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(ack["success"], true);
        assert_eq!(ack["event"], "kyc.verified");
        assert_eq!(ack["emailSent"], false);
        assert!(state.db.get_client("c1").unwrap().unwrap().is_kyc_verified);
    }

    #[tokio::test]
    async fn bad_signature_is_rejected_before_any_state_change() {
        let (_temp, state) = setup(Some("secret"));
        let body = json!({
            "event": "kyc.verified",
            "clientId": "c1",
            "timestamp": "2024-01-01T00:00:00Z"
        })
        .to_string();

        let (status, response) = deliver(&state, &body, Some("deadbeef")).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(response["error"], "Invalid signature");
        assert!(!state.db.get_client("c1").unwrap().unwrap().is_kyc_verified);
    }

    #[tokio::test]
    async fn missing_signature_is_rejected_when_secret_is_set() {
        let (_temp, state) = setup(Some("secret"));
        let body = json!({ "event": "foo.bar", "timestamp": "t" }).to_string();

        let (status, _) = deliver(&state, &body, None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unverified_delivery_is_accepted_without_a_secret() {
        let (_temp, state) = setup(None);
        let body = json!({ "event": "foo.bar", "timestamp": "t" }).to_string();

        let (status, ack) = deliver(&state, &body, None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(ack["success"], true);
        assert_eq!(ack["emailSent"], false);
    }

    #[tokio::test]
    async fn malformed_json_is_a_processing_failure() {
        let (_temp, state) = setup(Some("secret"));
        let body = "{not json";
        let sig = crate::events::signature::sign(body.as_bytes(), "secret");

        let (status, response) = deliver(&state, body, Some(&sig)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response["error"], "Webhook processing failed");
    }
}
