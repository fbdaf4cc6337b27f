// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Healing Buds

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    diagnostics::{SuiteReport, TestCaseResult, TestStatus},
    models::{AdminApproval, DiagnosticsRequest, WebhookAck, WebhookPayload},
    partner::Environment,
    state::AppState,
};

pub mod diagnostics;
pub mod health;
pub mod proxy;
pub mod webhooks;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/webhooks/drgreen", post(webhooks::receive))
        .route("/proxy", post(proxy::forward))
        .route("/diagnostics", post(diagnostics::run))
        .with_state(state);

    Router::new()
        .route("/health", get(health::health))
        .nest("/v1", v1_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        webhooks::receive,
        proxy::forward,
        diagnostics::run
    ),
    components(
        schemas(
            AdminApproval,
            WebhookPayload,
            WebhookAck,
            DiagnosticsRequest,
            Environment,
            SuiteReport,
            TestCaseResult,
            TestStatus,
            proxy::ProxyAction,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Health", description = "Liveness probes"),
        (name = "Webhooks", description = "Inbound partner event deliveries"),
        (name = "Proxy", description = "Signed pass-through to the partner API"),
        (name = "Diagnostics", description = "On-demand integration test suites")
    )
)]
struct ApiDoc;
