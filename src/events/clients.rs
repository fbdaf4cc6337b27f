// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Healing Buds

//! Client/KYC state updater.
//!
//! Applies admin-approval and KYC-verification transitions driven by
//! verified webhook events, appends journey-log entries, and triggers the
//! matching patient notification. Lookup failures are logged and skipped:
//! the webhook still answers success, because the sender redelivering the
//! same event would not make the data any more actionable.

use serde_json::json;
use tracing::{debug, warn};

use crate::models::{AdminApproval, WebhookPayload};
use crate::notify::{ClientEmailKind, Notifier};
use crate::storage::{GatewayDatabase, JourneyLogEntry, StoredClient, StoredUser};

/// Handle a `kyc.*` or `client.*` event. Returns whether an email went out.
pub async fn handle_client_event(
    db: &GatewayDatabase,
    notifier: &Notifier,
    payload: &WebhookPayload,
) -> bool {
    let Some(client_id) = payload.client_id.as_deref() else {
        return false;
    };

    let Some((client, user)) = resolve_recipient(db, client_id) else {
        return false;
    };
    let name = user.full_name.as_deref().unwrap_or("Patient");
    let region = client.country_code.as_deref();

    match payload.event.as_str() {
        "kyc.link_generated" => {
            let Some(link) = payload.kyc_link.as_deref() else {
                debug!(client_id, "kyc.link_generated without a link, ignoring");
                return false;
            };
            apply_update(db, client_id, |c| c.kyc_link = Some(link.to_string()));
            let email_sent = notifier
                .send_client_notice(
                    ClientEmailKind::KycLink,
                    &user.email,
                    name,
                    region,
                    Some(link),
                    None,
                )
                .await;
            log_journey(
                db,
                &client.user_id,
                client_id,
                &payload.event,
                json!({ "emailSent": email_sent, "linkPresent": true }),
            );
            email_sent
        }
        "kyc.verified" | "kyc.approved" => {
            apply_update(db, client_id, |c| c.is_kyc_verified = true);
            let email_sent = notifier
                .send_client_notice(
                    ClientEmailKind::KycApproved,
                    &user.email,
                    name,
                    region,
                    None,
                    None,
                )
                .await;
            log_journey(
                db,
                &client.user_id,
                client_id,
                &payload.event,
                json!({ "emailSent": email_sent, "status": "verified" }),
            );
            email_sent
        }
        "kyc.rejected" | "kyc.failed" => {
            // Informational only: the approval state machine does not move.
            let email_sent = notifier
                .send_client_notice(
                    ClientEmailKind::KycRejected,
                    &user.email,
                    name,
                    region,
                    payload.kyc_link.as_deref(),
                    payload.rejection_reason.as_deref(),
                )
                .await;
            log_journey(
                db,
                &client.user_id,
                client_id,
                &payload.event,
                json!({
                    "emailSent": email_sent,
                    "status": "rejected",
                    "rejectionReason": payload.rejection_reason,
                }),
            );
            email_sent
        }
        "client.approved" => {
            apply_update(db, client_id, |c| {
                c.admin_approval = AdminApproval::Verified
            });
            let email_sent = notifier
                .send_client_notice(
                    ClientEmailKind::EligibilityApproved,
                    &user.email,
                    name,
                    region,
                    None,
                    None,
                )
                .await;
            log_journey(
                db,
                &client.user_id,
                client_id,
                &payload.event,
                json!({ "emailSent": email_sent, "adminApproval": "VERIFIED" }),
            );
            email_sent
        }
        "client.rejected" => {
            apply_update(db, client_id, |c| {
                c.admin_approval = AdminApproval::Rejected
            });
            let email_sent = notifier
                .send_client_notice(
                    ClientEmailKind::EligibilityRejected,
                    &user.email,
                    name,
                    region,
                    None,
                    payload.rejection_reason.as_deref(),
                )
                .await;
            log_journey(
                db,
                &client.user_id,
                client_id,
                &payload.event,
                json!({
                    "emailSent": email_sent,
                    "adminApproval": "REJECTED",
                    "rejectionReason": payload.rejection_reason,
                }),
            );
            email_sent
        }
        other => {
            debug!(event = other, client_id, "unhandled client event");
            false
        }
    }
}

/// Resolve the client record and its owning user with an email address.
fn resolve_recipient(
    db: &GatewayDatabase,
    client_id: &str,
) -> Option<(StoredClient, StoredUser)> {
    let client = match db.get_client(client_id) {
        Ok(Some(client)) => client,
        Ok(None) => {
            warn!(client_id, "client event for unknown client, skipping");
            return None;
        }
        Err(e) => {
            warn!(client_id, error = %e, "client lookup failed, skipping");
            return None;
        }
    };

    match db.get_user(&client.user_id) {
        Ok(Some(user)) if !user.email.is_empty() => Some((client, user)),
        Ok(_) => {
            warn!(
                client_id,
                user_id = %client.user_id,
                "no user email for client event, skipping"
            );
            None
        }
        Err(e) => {
            warn!(client_id, error = %e, "user lookup failed, skipping");
            None
        }
    }
}

fn apply_update(db: &GatewayDatabase, client_id: &str, mutate: impl FnOnce(&mut StoredClient)) {
    if let Err(e) = db.update_client(client_id, mutate) {
        warn!(client_id, error = %e, "client update failed");
    }
}

fn log_journey(
    db: &GatewayDatabase,
    user_id: &str,
    client_id: &str,
    event_type: &str,
    event_data: serde_json::Value,
) {
    let entry = JourneyLogEntry::new(user_id, client_id, event_type, event_data);
    if let Err(e) = db.append_journey(&entry) {
        warn!(client_id, event_type, error = %e, "failed to log journey event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegionTable;
    use crate::notify::NotifierConfig;
    use chrono::Utc;
    use tempfile::TempDir;

    fn setup() -> (TempDir, GatewayDatabase, Notifier) {
        let temp = TempDir::new().unwrap();
        let db = GatewayDatabase::open(&temp.path().join("gateway.redb")).unwrap();
        let notifier = Notifier::new(NotifierConfig {
            api_key: None,
            api_base_url: "https://api.resend.test".to_string(),
            regions: RegionTable::default(),
        });
        (temp, db, notifier)
    }

    fn seed_client(db: &GatewayDatabase, client_id: &str, user_id: &str) {
        db.upsert_client(&StoredClient {
            drgreen_client_id: client_id.to_string(),
            user_id: user_id.to_string(),
            is_kyc_verified: false,
            admin_approval: AdminApproval::Pending,
            kyc_link: None,
            country_code: Some("ZA".to_string()),
            created_at: Utc::now(),
        })
        .unwrap();
        db.upsert_user(&StoredUser {
            user_id: user_id.to_string(),
            email: "p@example.com".to_string(),
            full_name: Some("Pat Example".to_string()),
        })
        .unwrap();
    }

    fn event(name: &str, client_id: &str) -> WebhookPayload {
        WebhookPayload {
            event: name.to_string(),
            order_id: None,
            client_id: Some(client_id.to_string()),
            status: None,
            payment_status: None,
            kyc_status: None,
            admin_approval: None,
            rejection_reason: None,
            kyc_link: None,
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            data: None,
        }
    }

    #[tokio::test]
    async fn kyc_verified_sets_flag_and_logs_journey() {
        let (_temp, db, notifier) = setup();
        seed_client(&db, "c1", "u1");

        handle_client_event(&db, &notifier, &event("kyc.verified", "c1")).await;

        let client = db.get_client("c1").unwrap().unwrap();
        assert!(client.is_kyc_verified);

        let journey = db.journey_for_client("c1").unwrap();
        assert_eq!(journey.len(), 1);
        assert_eq!(journey[0].event_type, "kyc.verified");
        assert_eq!(journey[0].event_source, "drgreen-webhook");
        assert_eq!(journey[0].user_id, "u1");
    }

    #[tokio::test]
    async fn client_approved_reaches_verified_from_any_prior_state() {
        let (_temp, db, notifier) = setup();
        seed_client(&db, "c1", "u1");
        db.update_client("c1", |c| c.admin_approval = AdminApproval::Rejected)
            .unwrap();

        handle_client_event(&db, &notifier, &event("client.approved", "c1")).await;

        let client = db.get_client("c1").unwrap().unwrap();
        assert_eq!(client.admin_approval, AdminApproval::Verified);
    }

    #[tokio::test]
    async fn client_rejected_sets_rejected() {
        let (_temp, db, notifier) = setup();
        seed_client(&db, "c1", "u1");

        let mut payload = event("client.rejected", "c1");
        payload.rejection_reason = Some("Prescription expired.".to_string());
        handle_client_event(&db, &notifier, &payload).await;

        let client = db.get_client("c1").unwrap().unwrap();
        assert_eq!(client.admin_approval, AdminApproval::Rejected);

        let journey = db.journey_for_client("c1").unwrap();
        assert_eq!(
            journey[0].event_data["rejectionReason"],
            "Prescription expired."
        );
    }

    #[tokio::test]
    async fn kyc_link_generated_persists_link() {
        let (_temp, db, notifier) = setup();
        seed_client(&db, "c1", "u1");

        let mut payload = event("kyc.link_generated", "c1");
        payload.kyc_link = Some("https://kyc.example/flow/1".to_string());
        handle_client_event(&db, &notifier, &payload).await;

        let client = db.get_client("c1").unwrap().unwrap();
        assert_eq!(client.kyc_link.as_deref(), Some("https://kyc.example/flow/1"));
        assert_eq!(db.journey_for_client("c1").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn kyc_link_generated_without_link_is_ignored() {
        let (_temp, db, notifier) = setup();
        seed_client(&db, "c1", "u1");

        handle_client_event(&db, &notifier, &event("kyc.link_generated", "c1")).await;

        assert!(db.get_client("c1").unwrap().unwrap().kyc_link.is_none());
        assert!(db.journey_for_client("c1").unwrap().is_empty());
    }

    #[tokio::test]
    async fn kyc_rejected_leaves_approval_untouched() {
        let (_temp, db, notifier) = setup();
        seed_client(&db, "c1", "u1");

        handle_client_event(&db, &notifier, &event("kyc.rejected", "c1")).await;

        let client = db.get_client("c1").unwrap().unwrap();
        assert_eq!(client.admin_approval, AdminApproval::Pending);
        assert!(!client.is_kyc_verified);
        // Informational events still land in the journey log.
        assert_eq!(db.journey_for_client("c1").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_client_is_skipped_silently() {
        let (_temp, db, notifier) = setup();

        let sent = handle_client_event(&db, &notifier, &event("kyc.verified", "ghost")).await;

        assert!(!sent);
        assert_eq!(db.count_journey_entries().unwrap(), 0);
    }

    #[tokio::test]
    async fn missing_user_skips_update_and_notification() {
        let (_temp, db, notifier) = setup();
        db.upsert_client(&StoredClient {
            drgreen_client_id: "c1".to_string(),
            user_id: "orphan".to_string(),
            is_kyc_verified: false,
            admin_approval: AdminApproval::Pending,
            kyc_link: None,
            country_code: None,
            created_at: Utc::now(),
        })
        .unwrap();

        handle_client_event(&db, &notifier, &event("kyc.verified", "c1")).await;

        assert!(!db.get_client("c1").unwrap().unwrap().is_kyc_verified);
        assert_eq!(db.count_journey_entries().unwrap(), 0);
    }

    #[tokio::test]
    async fn redelivery_is_state_idempotent_but_logs_again() {
        let (_temp, db, notifier) = setup();
        seed_client(&db, "c1", "u1");

        let payload = event("kyc.verified", "c1");
        handle_client_event(&db, &notifier, &payload).await;
        handle_client_event(&db, &notifier, &payload).await;

        assert!(db.get_client("c1").unwrap().unwrap().is_kyc_verified);
        // At-least-once delivery: duplicate journey rows are accepted.
        assert_eq!(db.journey_for_client("c1").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unknown_kyc_event_changes_nothing() {
        let (_temp, db, notifier) = setup();
        seed_client(&db, "c1", "u1");

        handle_client_event(&db, &notifier, &event("kyc.started", "c1")).await;

        let client = db.get_client("c1").unwrap().unwrap();
        assert!(!client.is_kyc_verified);
        assert_eq!(client.admin_approval, AdminApproval::Pending);
        assert!(db.journey_for_client("c1").unwrap().is_empty());
    }
}
