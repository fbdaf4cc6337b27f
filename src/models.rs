// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Healing Buds

//! # API Data Models
//!
//! Request and response structures shared across the HTTP surface. All wire
//! fields use camelCase to match the partner platform's payloads. Types derive
//! `Serialize`, `Deserialize`, and `ToSchema` for automatic JSON handling and
//! OpenAPI documentation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// =============================================================================
// Admin Approval State
// =============================================================================

/// Staff/medical-review approval gate, distinct from KYC.
///
/// Advanced only by verified webhook events; there is no other writer in
/// this service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdminApproval {
    Pending,
    Verified,
    Rejected,
}

impl std::fmt::Display for AdminApproval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AdminApproval::Pending => "PENDING",
            AdminApproval::Verified => "VERIFIED",
            AdminApproval::Rejected => "REJECTED",
        };
        write!(f, "{s}")
    }
}

// =============================================================================
// Webhook Payload
// =============================================================================

/// Inbound webhook delivery from the partner platform.
///
/// Transient: valid for a single request, never persisted. Only `event` and
/// `timestamp` are mandatory; the rest depend on the event family.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    /// Event name, e.g. `order.shipped` or `kyc.verified`.
    pub event: String,
    /// Partner order identifier (order/payment events).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    /// Partner client identifier (client/KYC events).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// New order status, when the event carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// New payment status, when the event carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<String>,
    /// KYC status string, informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kyc_status: Option<String>,
    /// Admin approval string, informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_approval: Option<String>,
    /// Human-readable rejection reason for rejected outcomes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    /// Hosted KYC flow link (for `kyc.link_generated`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kyc_link: Option<String>,
    /// Event timestamp as supplied by the sender.
    pub timestamp: String,
    /// Free-form event data, passed through to the journey log.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub data: Option<serde_json::Value>,
}

/// Acknowledgement returned for every successfully handled webhook.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    /// Always `true` on the 200 path; failures use the error body instead.
    pub success: bool,
    /// The event name that was processed (or tolerated).
    pub event: String,
    /// Whether a notification email actually went out for this delivery.
    pub email_sent: bool,
}

// =============================================================================
// Diagnostics
// =============================================================================

/// Request body for the diagnostics suite. Absent body defaults to production.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct DiagnosticsRequest {
    #[serde(default)]
    pub environment: Option<crate::partner::Environment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_payload_parses_minimal_body() {
        let payload: WebhookPayload =
            serde_json::from_str(r#"{"event":"foo.bar","timestamp":"2024-01-01T00:00:00Z"}"#)
                .unwrap();
        assert_eq!(payload.event, "foo.bar");
        assert!(payload.order_id.is_none());
        assert!(payload.client_id.is_none());
    }

    #[test]
    fn webhook_payload_reads_camel_case_fields() {
        let payload: WebhookPayload = serde_json::from_str(
            r#"{
                "event": "order.status_updated",
                "orderId": "o1",
                "paymentStatus": "PAID",
                "rejectionReason": "expired document",
                "kycLink": "https://kyc.example/x",
                "timestamp": "2024-01-01T00:00:00Z"
            }"#,
        )
        .unwrap();
        assert_eq!(payload.order_id.as_deref(), Some("o1"));
        assert_eq!(payload.payment_status.as_deref(), Some("PAID"));
        assert_eq!(payload.kyc_link.as_deref(), Some("https://kyc.example/x"));
    }

    #[test]
    fn admin_approval_serializes_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&AdminApproval::Verified).unwrap(),
            r#""VERIFIED""#
        );
        assert_eq!(AdminApproval::Rejected.to_string(), "REJECTED");
    }

    #[test]
    fn webhook_ack_uses_camel_case() {
        let ack = WebhookAck {
            success: true,
            event: "kyc.verified".to_string(),
            email_sent: false,
        };
        let json = serde_json::to_string(&ack).unwrap();
        assert!(json.contains(r#""emailSent":false"#));
    }
}
