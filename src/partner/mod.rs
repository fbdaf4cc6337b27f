// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Healing Buds

//! Outbound Dr. Green partner API integration.
//!
//! Credentials and base URLs are resolved per environment (production or
//! staging) from disjoint environment variables, so a staging probe can
//! never pick up production keys by accident.

pub mod client;
pub mod keys;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::{env_optional, env_or_default};

pub use client::PartnerClient;

const PRODUCTION_API_BASE_URL: &str = "https://api.drgreennft.com/api/v1";
const STAGING_API_BASE_URL: &str =
    "https://budstack-backend-main-development.up.railway.app/api/v1";

#[derive(Debug, thiserror::Error)]
pub enum PartnerError {
    #[error("partner API configuration missing: {0}")]
    MissingConfig(String),

    #[error("partner API private key invalid: {0}")]
    InvalidKey(String),

    #[error("partner API signing failed: {0}")]
    Signing(String),

    #[error("partner API request failed: {0}")]
    Request(String),

    #[error("partner API response was invalid: {0}")]
    InvalidResponse(String),
}

/// Which partner deployment to talk to.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Staging,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Staging => "staging",
        }
    }

    /// Environment variable carrying the API key for this deployment.
    pub fn api_key_var(&self) -> &'static str {
        match self {
            Environment::Production => "DRGREEN_API_KEY",
            Environment::Staging => "DRGREEN_STAGING_API_KEY",
        }
    }

    /// Environment variable carrying the signing private key.
    pub fn private_key_var(&self) -> &'static str {
        match self {
            Environment::Production => "DRGREEN_PRIVATE_KEY",
            Environment::Staging => "DRGREEN_STAGING_PRIVATE_KEY",
        }
    }

    fn base_url_var(&self) -> &'static str {
        match self {
            Environment::Production => "DRGREEN_API_BASE_URL",
            Environment::Staging => "DRGREEN_STAGING_API_BASE_URL",
        }
    }

    fn default_base_url(&self) -> &'static str {
        match self {
            Environment::Production => PRODUCTION_API_BASE_URL,
            Environment::Staging => STAGING_API_BASE_URL,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved partner credentials for one environment.
#[derive(Debug, Clone)]
pub struct PartnerConfig {
    pub environment: Environment,
    pub base_url: String,
    /// Value for the `x-auth-apikey` header.
    pub api_key: Option<String>,
    /// Key material as stored in the environment, decoded lazily by
    /// [`keys::decode_secp256k1_key`].
    pub private_key: Option<String>,
}

impl PartnerConfig {
    pub fn from_env(environment: Environment) -> Self {
        Self {
            environment,
            base_url: env_or_default(environment.base_url_var(), environment.default_base_url()),
            api_key: env_optional(environment.api_key_var()),
            private_key: env_optional(environment.private_key_var()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.private_key.is_some()
    }

    /// Names of the environment variables still unset, for diagnostics.
    pub fn missing_variables(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.api_key.is_none() {
            missing.push(self.environment.api_key_var());
        }
        if self.private_key.is_none() {
            missing.push(self.environment.private_key_var());
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_deserializes_lowercase() {
        let env: Environment = serde_json::from_str("\"staging\"").unwrap();
        assert_eq!(env, Environment::Staging);
        let env: Environment = serde_json::from_str("\"production\"").unwrap();
        assert_eq!(env, Environment::Production);
    }

    #[test]
    fn environments_use_disjoint_variables() {
        assert_ne!(
            Environment::Production.api_key_var(),
            Environment::Staging.api_key_var()
        );
        assert_ne!(
            Environment::Production.private_key_var(),
            Environment::Staging.private_key_var()
        );
    }

    #[test]
    fn missing_variables_names_each_gap() {
        let config = PartnerConfig {
            environment: Environment::Staging,
            base_url: STAGING_API_BASE_URL.to_string(),
            api_key: None,
            private_key: Some("stub".to_string()),
        };
        assert!(!config.is_configured());
        assert_eq!(config.missing_variables(), vec!["DRGREEN_STAGING_PRIVATE_KEY"]);
    }

    #[test]
    fn configured_when_both_credentials_present() {
        let config = PartnerConfig {
            environment: Environment::Production,
            base_url: PRODUCTION_API_BASE_URL.to_string(),
            api_key: Some("key".to_string()),
            private_key: Some("material".to_string()),
        };
        assert!(config.is_configured());
        assert!(config.missing_variables().is_empty());
    }
}
