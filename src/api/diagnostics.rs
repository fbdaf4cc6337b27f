// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Healing Buds

use axum::{extract::State, Json};
use tracing::info;

use crate::{
    diagnostics::{self, SuiteReport},
    models::DiagnosticsRequest,
    state::AppState,
};

/// Run the integration diagnostics suite.
///
/// An empty body targets production; `{"environment": "staging"}` targets
/// the staging deployment instead.
#[utoipa::path(
    post,
    path = "/v1/diagnostics",
    request_body = DiagnosticsRequest,
    tag = "Diagnostics",
    responses((status = 200, body = SuiteReport))
)]
pub async fn run(
    State(state): State<AppState>,
    body: Option<Json<DiagnosticsRequest>>,
) -> Json<SuiteReport> {
    let environment = body
        .and_then(|Json(request)| request.environment)
        .unwrap_or_default();
    info!(%environment, "diagnostics suite requested");
    let report = diagnostics::run_suite(&state, environment).await;
    info!(
        %environment,
        passed = report.passed,
        failed = report.failed,
        skipped = report.skipped,
        "diagnostics suite finished"
    );
    Json(report)
}
