// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Healing Buds

//! Transactional email dispatch via the Resend HTTP API.
//!
//! Email is strictly best-effort: a missing provider key or a provider
//! failure downgrades to `sent = false` and is never escalated to an
//! overall request failure.

pub mod templates;

use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::{env_optional, RegionBrand, RegionTable, EMAIL_API_KEY_ENV};

pub use templates::{client_email, order_status_email, ClientEmailKind, EmailContent};

const DEFAULT_EMAIL_API_BASE_URL: &str = "https://api.resend.com";

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("email provider key not configured")]
    Unconfigured,

    #[error("email request failed: {0}")]
    Request(String),

    #[error("email provider returned {status}: {body}")]
    Provider { status: u16, body: String },
}

/// Immutable notifier configuration, passed into [`Notifier::new`] so tests
/// can substitute fixtures without touching process state.
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// Provider API key; `None` disables sending entirely.
    pub api_key: Option<String>,
    /// Provider base URL (overridable for tests).
    pub api_base_url: String,
    /// Region to branding table used for sender names and email copy.
    pub regions: RegionTable,
}

impl NotifierConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: env_optional(EMAIL_API_KEY_ENV),
            api_base_url: DEFAULT_EMAIL_API_BASE_URL.to_string(),
            regions: RegionTable::default(),
        }
    }
}

/// Composes and submits branded transactional email.
pub struct Notifier {
    http: Client,
    config: NotifierConfig,
}

impl Notifier {
    pub fn new(config: NotifierConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    pub fn from_env() -> Self {
        Self::new(NotifierConfig::from_env())
    }

    /// Resolve branding for a region code.
    pub fn brand_for(&self, region: Option<&str>) -> &RegionBrand {
        self.config.regions.resolve(region)
    }

    /// Send an order status notification. Returns whether the email went out.
    pub async fn send_order_status(
        &self,
        to: &str,
        order_id: &str,
        status: &str,
        event: &str,
        region: Option<&str>,
    ) -> bool {
        let brand = self.brand_for(region).clone();
        let content = order_status_email(order_id, status, event, &brand);
        self.deliver_logged(to, &content, &brand).await
    }

    /// Send a client/KYC outcome notification. Returns whether the email went out.
    pub async fn send_client_notice(
        &self,
        kind: ClientEmailKind,
        to: &str,
        name: &str,
        region: Option<&str>,
        kyc_link: Option<&str>,
        rejection_reason: Option<&str>,
    ) -> bool {
        let brand = self.brand_for(region).clone();
        let content = client_email(kind, name, &brand, kyc_link, rejection_reason);
        self.deliver_logged(to, &content, &brand).await
    }

    async fn deliver_logged(&self, to: &str, content: &EmailContent, brand: &RegionBrand) -> bool {
        match self.deliver(to, content, brand).await {
            Ok(()) => {
                debug!(to, subject = %content.subject, "email sent");
                true
            }
            Err(NotifyError::Unconfigured) => {
                debug!("email provider key not configured, skipping email");
                false
            }
            Err(e) => {
                warn!(to, error = %e, "email delivery failed");
                false
            }
        }
    }

    async fn deliver(
        &self,
        to: &str,
        content: &EmailContent,
        brand: &RegionBrand,
    ) -> Result<(), NotifyError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(NotifyError::Unconfigured)?;

        // Switch to noreply@{brand.domain} once the sending domains are verified
        // with the provider.
        let from_address = format!("{} <onboarding@resend.dev>", brand.brand_name);

        let response = self
            .http
            .post(format!(
                "{}/emails",
                self.config.api_base_url.trim_end_matches('/')
            ))
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&json!({
                "from": from_address,
                "to": [to],
                "subject": content.subject,
                "html": content.html,
            }))
            .send()
            .await
            .map_err(|e| NotifyError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Provider { status, body });
        }

        Ok(())
    }
}
