// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Healing Buds

//! # Runtime Configuration
//!
//! Environment variable names, defaults, and the static region/brand table.
//! Configuration is loaded from the environment at startup and handed to the
//! relevant component as an immutable struct; nothing reads process state
//! after construction.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Root directory for the embedded database | `/data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DRGREEN_WEBHOOK_SECRET` | Shared secret for webhook signature checks | Optional (fail-open) |
//! | `DRGREEN_API_KEY` | Production partner API key | Required for proxying |
//! | `DRGREEN_PRIVATE_KEY` | Production signing key (base64-wrapped PEM) | Required for proxying |
//! | `DRGREEN_STAGING_API_KEY` | Staging partner API key | Optional |
//! | `DRGREEN_STAGING_PRIVATE_KEY` | Staging signing key (base64-wrapped PEM) | Optional |
//! | `RESEND_API_KEY` | Transactional email provider key | Optional (emails skipped) |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::collections::HashMap;

/// Environment variable name for the embedded database directory.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Environment variable name for the webhook shared secret.
///
/// When unset, inbound webhook signatures are not checked. This fail-open
/// behavior mirrors the partner's staging setup and is logged at warn level
/// on every unverified delivery.
pub const WEBHOOK_SECRET_ENV: &str = "DRGREEN_WEBHOOK_SECRET";

/// Environment variable name for the email provider API key.
pub const EMAIL_API_KEY_ENV: &str = "RESEND_API_KEY";

/// Display branding for one sales region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionBrand {
    /// Customer-facing domain used in email links.
    pub domain: String,
    /// Brand name shown in email headers and footers.
    pub brand_name: String,
}

impl RegionBrand {
    fn new(domain: &str, brand_name: &str) -> Self {
        Self {
            domain: domain.to_string(),
            brand_name: brand_name.to_string(),
        }
    }
}

/// Static mapping from ISO country code to display branding.
///
/// Loaded once at startup and passed into the [`Notifier`](crate::notify::Notifier)
/// constructor so tests can substitute fixtures.
#[derive(Debug, Clone)]
pub struct RegionTable {
    regions: HashMap<String, RegionBrand>,
    global: RegionBrand,
}

impl RegionTable {
    /// Build a table from explicit entries plus a fallback brand.
    pub fn new(entries: Vec<(String, RegionBrand)>, global: RegionBrand) -> Self {
        Self {
            regions: entries.into_iter().collect(),
            global,
        }
    }

    /// Resolve a country code to its branding, falling back to the global
    /// brand for unrecognized or absent codes. Matching is case-insensitive.
    pub fn resolve(&self, region: Option<&str>) -> &RegionBrand {
        match region {
            Some(code) => self
                .regions
                .get(&code.to_ascii_uppercase())
                .unwrap_or(&self.global),
            None => &self.global,
        }
    }
}

impl Default for RegionTable {
    fn default() -> Self {
        Self::new(
            vec![
                (
                    "ZA".to_string(),
                    RegionBrand::new("healingbuds.co.za", "Healing Buds South Africa"),
                ),
                (
                    "PT".to_string(),
                    RegionBrand::new("healingbuds.pt", "Healing Buds Portugal"),
                ),
                (
                    "GB".to_string(),
                    RegionBrand::new("healingbuds.co.uk", "Healing Buds UK"),
                ),
            ],
            RegionBrand::new("healingbuds.global", "Healing Buds"),
        )
    }
}

/// Read an environment variable, treating empty values as absent.
pub fn env_optional(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) => {
            let trimmed = value.trim().to_string();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed)
            }
        }
        Err(_) => None,
    }
}

/// Read an environment variable with a fallback default.
pub fn env_or_default(name: &str, default: &str) -> String {
    env_optional(name).unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_table_resolves_known_codes() {
        let table = RegionTable::default();
        let za = table.resolve(Some("ZA"));
        assert_eq!(za.domain, "healingbuds.co.za");
        assert_eq!(za.brand_name, "Healing Buds South Africa");
    }

    #[test]
    fn region_table_is_case_insensitive() {
        let table = RegionTable::default();
        assert_eq!(
            table.resolve(Some("gb")).brand_name,
            table.resolve(Some("GB")).brand_name
        );
    }

    #[test]
    fn region_table_falls_back_to_global() {
        let table = RegionTable::default();
        assert_eq!(table.resolve(Some("XX")).domain, "healingbuds.global");
        assert_eq!(table.resolve(None).brand_name, "Healing Buds");
    }

    #[test]
    fn custom_table_uses_supplied_fixtures() {
        let table = RegionTable::new(
            vec![(
                "DE".to_string(),
                RegionBrand::new("example.de", "Example DE"),
            )],
            RegionBrand::new("example.com", "Example"),
        );
        assert_eq!(table.resolve(Some("DE")).brand_name, "Example DE");
        assert_eq!(table.resolve(Some("ZA")).brand_name, "Example");
    }
}
