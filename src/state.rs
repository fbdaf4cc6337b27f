// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Healing Buds

use std::sync::Arc;

use crate::config::{env_optional, WEBHOOK_SECRET_ENV};
use crate::notify::Notifier;
use crate::partner::{Environment, PartnerConfig};
use crate::storage::GatewayDatabase;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<GatewayDatabase>,
    pub notifier: Arc<Notifier>,
    /// Production partner credentials used by the proxy endpoint.
    pub partner: Arc<PartnerConfig>,
    /// Staging partner credentials, used only by diagnostics.
    pub partner_staging: Arc<PartnerConfig>,
    /// Shared secret for inbound webhook signatures. `None` disables
    /// verification (with a startup warning).
    pub webhook_secret: Option<Arc<str>>,
}

impl AppState {
    pub fn new(
        db: GatewayDatabase,
        notifier: Notifier,
        partner: PartnerConfig,
        partner_staging: PartnerConfig,
        webhook_secret: Option<String>,
    ) -> Self {
        Self {
            db: Arc::new(db),
            notifier: Arc::new(notifier),
            partner: Arc::new(partner),
            partner_staging: Arc::new(partner_staging),
            webhook_secret: webhook_secret.map(Arc::from),
        }
    }

    pub fn from_env(db: GatewayDatabase) -> Self {
        Self::new(
            db,
            Notifier::from_env(),
            PartnerConfig::from_env(Environment::Production),
            PartnerConfig::from_env(Environment::Staging),
            env_optional(WEBHOOK_SECRET_ENV),
        )
    }

    /// Resolve the partner configuration for a deployment environment.
    pub fn partner_config(&self, environment: Environment) -> &PartnerConfig {
        match environment {
            Environment::Production => &self.partner,
            Environment::Staging => &self.partner_staging,
        }
    }
}
