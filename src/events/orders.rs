// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Healing Buds

//! Order/payment state updater.
//!
//! Maps order lifecycle and payment events to partial updates of the local
//! order mirror, then notifies the patient. An event touches only the field
//! it is about: shipping events never write `payment_status` and payment
//! events never write `status`.

use tracing::{debug, warn};

use crate::models::WebhookPayload;
use crate::notify::Notifier;
use crate::storage::{GatewayDatabase, StoredOrder};

/// Fields a single event is allowed to write. `None` means leave untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderUpdatePlan {
    pub status: Option<String>,
    pub payment_status: Option<String>,
}

/// Translate an event name into the update it performs.
///
/// `order.status_updated` and `order.updated` carry their values in the
/// payload; the rest have fixed terminal values. Unknown events map to
/// `None` and are ignored by the caller.
pub fn plan_order_update(
    event: &str,
    payload_status: Option<&str>,
    payload_payment_status: Option<&str>,
) -> Option<OrderUpdatePlan> {
    let plan = match event {
        "order.shipped" => OrderUpdatePlan {
            status: Some("SHIPPED".to_string()),
            payment_status: None,
        },
        "order.delivered" => OrderUpdatePlan {
            status: Some("DELIVERED".to_string()),
            payment_status: None,
        },
        "order.cancelled" => OrderUpdatePlan {
            status: Some("CANCELLED".to_string()),
            payment_status: None,
        },
        "payment.completed" => OrderUpdatePlan {
            status: None,
            payment_status: Some("PAID".to_string()),
        },
        "payment.failed" => OrderUpdatePlan {
            status: None,
            payment_status: Some("FAILED".to_string()),
        },
        "order.status_updated" | "order.updated" => OrderUpdatePlan {
            status: payload_status.map(str::to_string),
            payment_status: payload_payment_status.map(str::to_string),
        },
        _ => return None,
    };
    Some(plan)
}

/// Handle an order-routed event. Returns whether an email went out.
pub async fn handle_order_event(
    db: &GatewayDatabase,
    notifier: &Notifier,
    payload: &WebhookPayload,
) -> bool {
    let Some(order_id) = payload.order_id.as_deref() else {
        return false;
    };

    let Some(plan) = plan_order_update(
        &payload.event,
        payload.status.as_deref(),
        payload.payment_status.as_deref(),
    ) else {
        debug!(event = %payload.event, order_id, "unhandled order event");
        return false;
    };

    let mut updated: Option<StoredOrder> = None;
    if plan.status.is_some() || plan.payment_status.is_some() {
        match db.apply_order_update(order_id, plan.status.as_deref(), plan.payment_status.as_deref())
        {
            Ok(Some(order)) => updated = Some(order),
            Ok(None) => warn!(order_id, "order event for unknown order"),
            Err(e) => warn!(order_id, error = %e, "order update failed"),
        }
    }

    let order = match updated {
        Some(order) => order,
        None => match db.get_order(order_id) {
            Ok(Some(order)) => order,
            _ => return false,
        },
    };

    let user = match db.get_user(&order.user_id) {
        Ok(Some(user)) if !user.email.is_empty() => user,
        Ok(_) => {
            warn!(order_id, user_id = %order.user_id, "no user email for order event");
            return false;
        }
        Err(e) => {
            warn!(order_id, error = %e, "user lookup failed, skipping notification");
            return false;
        }
    };

    // Branding follows the client mirror's region when we have one.
    let region = db
        .get_client_by_user(&order.user_id)
        .ok()
        .flatten()
        .and_then(|c| c.country_code);

    let display_status = payload
        .status
        .as_deref()
        .or(plan.status.as_deref())
        .unwrap_or("Updated");

    notifier
        .send_order_status(
            &user.email,
            order_id,
            display_status,
            &payload.event,
            region.as_deref(),
        )
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegionTable;
    use crate::models::AdminApproval;
    use crate::notify::NotifierConfig;
    use crate::storage::{StoredClient, StoredUser};
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

    fn seed_order(db: &GatewayDatabase, order_id: &str, user_id: &str) {
        db.upsert_order(&StoredOrder {
            drgreen_order_id: order_id.to_string(),
            user_id: user_id.to_string(),
            status: "PENDING".to_string(),
            payment_status: "UNPAID".to_string(),
            created_at: Utc::now(),
        })
        .unwrap();
        db.upsert_user(&StoredUser {
            user_id: user_id.to_string(),
            email: "q@example.com".to_string(),
            full_name: None,
        })
        .unwrap();
    }

    fn event(name: &str, order_id: &str) -> WebhookPayload {
        WebhookPayload {
            event: name.to_string(),
            order_id: Some(order_id.to_string()),
            client_id: None,
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

    #[test]
    fn lifecycle_events_touch_only_order_status() {
        for (event, expected) in [
            ("order.shipped", "SHIPPED"),
            ("order.delivered", "DELIVERED"),
            ("order.cancelled", "CANCELLED"),
        ] {
            let plan = plan_order_update(event, None, None).unwrap();
            assert_eq!(plan.status.as_deref(), Some(expected), "{event}");
            assert_eq!(plan.payment_status, None, "{event}");
        }
    }

    #[test]
    fn payment_events_touch_only_payment_status() {
        for (event, expected) in [("payment.completed", "PAID"), ("payment.failed", "FAILED")] {
            let plan = plan_order_update(event, None, None).unwrap();
            assert_eq!(plan.status, None, "{event}");
            assert_eq!(plan.payment_status.as_deref(), Some(expected), "{event}");
        }
    }

    #[test]
    fn status_updated_takes_values_from_the_payload() {
        let plan = plan_order_update("order.status_updated", Some("PACKED"), Some("PAID")).unwrap();
        assert_eq!(plan.status.as_deref(), Some("PACKED"));
        assert_eq!(plan.payment_status.as_deref(), Some("PAID"));

        let partial = plan_order_update("order.updated", Some("PACKED"), None).unwrap();
        assert_eq!(partial.status.as_deref(), Some("PACKED"));
        assert_eq!(partial.payment_status, None);
    }

    #[test]
    fn unknown_events_have_no_plan() {
        assert_eq!(plan_order_update("order.refunded", None, None), None);
        assert_eq!(plan_order_update("payment.pending", None, None), None);
    }

    #[tokio::test]
    async fn shipped_event_updates_the_mirror() {
        let (_temp, db, notifier) = setup();
        seed_order(&db, "o1", "u1");

        handle_order_event(&db, &notifier, &event("order.shipped", "o1")).await;

        let order = db.get_order("o1").unwrap().unwrap();
        assert_eq!(order.status, "SHIPPED");
        assert_eq!(order.payment_status, "UNPAID");
    }

    #[tokio::test]
    async fn payment_completed_leaves_order_status_alone() {
        let (_temp, db, notifier) = setup();
        seed_order(&db, "o1", "u1");

        handle_order_event(&db, &notifier, &event("payment.completed", "o1")).await;

        let order = db.get_order("o1").unwrap().unwrap();
        assert_eq!(order.status, "PENDING");
        assert_eq!(order.payment_status, "PAID");
    }

    #[tokio::test]
    async fn status_updated_applies_payload_fields() {
        let (_temp, db, notifier) = setup();
        seed_order(&db, "o1", "u1");

        let mut payload = event("order.status_updated", "o1");
        payload.status = Some("PROCESSING".to_string());
        handle_order_event(&db, &notifier, &payload).await;

        let order = db.get_order("o1").unwrap().unwrap();
        assert_eq!(order.status, "PROCESSING");
        assert_eq!(order.payment_status, "UNPAID");
    }

    #[tokio::test]
    async fn unknown_order_is_tolerated() {
        let (_temp, db, notifier) = setup();

        let sent = handle_order_event(&db, &notifier, &event("order.shipped", "ghost")).await;

        assert!(!sent);
        assert!(db.get_order("ghost").unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_event_changes_nothing() {
        let (_temp, db, notifier) = setup();
        seed_order(&db, "o1", "u1");

        handle_order_event(&db, &notifier, &event("order.refunded", "o1")).await;

        let order = db.get_order("o1").unwrap().unwrap();
        assert_eq!(order.status, "PENDING");
        assert_eq!(order.payment_status, "UNPAID");
    }

    #[tokio::test]
    async fn missing_user_still_applies_the_update() {
        let (_temp, db, notifier) = setup();
        db.upsert_order(&StoredOrder {
            drgreen_order_id: "o1".to_string(),
            user_id: "orphan".to_string(),
            status: "PENDING".to_string(),
            payment_status: "UNPAID".to_string(),
            created_at: Utc::now(),
        })
        .unwrap();

        let sent = handle_order_event(&db, &notifier, &event("order.shipped", "o1")).await;

        assert!(!sent);
        assert_eq!(db.get_order("o1").unwrap().unwrap().status, "SHIPPED");
    }

    #[tokio::test]
    async fn region_comes_from_the_client_mirror() {
        let (_temp, db, notifier) = setup();
        seed_order(&db, "o1", "u1");
        db.upsert_client(&StoredClient {
            drgreen_client_id: "c1".to_string(),
            user_id: "u1".to_string(),
            is_kyc_verified: true,
            admin_approval: AdminApproval::Verified,
            kyc_link: None,
            country_code: Some("PT".to_string()),
            created_at: Utc::now(),
        })
        .unwrap();

        // With no provider key the send is skipped, but the lookup path runs.
        let sent = handle_order_event(&db, &notifier, &event("order.delivered", "o1")).await;
        assert!(!sent);
        assert_eq!(db.get_order("o1").unwrap().unwrap().status, "DELIVERED");
    }
}
