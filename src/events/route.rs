// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Healing Buds

//! Pure event routing over a decoded webhook payload.

use crate::models::WebhookPayload;

/// Which updater a payload is dispatched to. Exactly one route per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventRoute {
    /// Client/KYC state updater.
    Client,
    /// Order/payment state updater.
    Order,
    /// Tolerated but unhandled: success response, no state change.
    Unhandled,
}

/// Classify a payload.
///
/// A `clientId` with a `kyc.` or `client.` event wins over `orderId`;
/// otherwise any `orderId` routes to the order updater.
pub fn classify(payload: &WebhookPayload) -> EventRoute {
    if payload.client_id.is_some()
        && (payload.event.starts_with("kyc.") || payload.event.starts_with("client."))
    {
        return EventRoute::Client;
    }
    if payload.order_id.is_some() {
        return EventRoute::Order;
    }
    EventRoute::Unhandled
}
