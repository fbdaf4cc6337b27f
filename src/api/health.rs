// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Healing Buds

use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use utoipa::ToSchema;

use crate::config::DATA_DIR_ENV;

/// Liveness probe response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub timestamp: DateTime<Utc>,
    /// Data directory availability (only when `DATA_DIR` is configured).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
}

/// Check if the data directory exists and is accessible.
fn check_data_dir() -> Option<String> {
    match std::env::var(DATA_DIR_ENV) {
        Ok(dir) if Path::new(&dir).exists() => Some("ok".to_string()),
        Ok(_) => Some("missing".to_string()),
        Err(_) => None,
    }
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, body = HealthResponse))
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "drgreen-gateway".to_string(),
        timestamp: Utc::now(),
        data_dir: check_data_dir(),
    })
}
