// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Healing Buds

use std::{env, net::SocketAddr, path::PathBuf};

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use drgreen_gateway::api::router;
use drgreen_gateway::config::{env_or_default, DATA_DIR_ENV, WEBHOOK_SECRET_ENV};
use drgreen_gateway::state::AppState;
use drgreen_gateway::storage::GatewayDatabase;

const DB_FILE_NAME: &str = "gateway.redb";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,drgreen_gateway=debug"));
    let format = env::var("LOG_FORMAT").unwrap_or_default();
    if format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let data_dir = PathBuf::from(env_or_default(DATA_DIR_ENV, "/data"));
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        panic!("failed to create data directory {}: {e}", data_dir.display());
    }
    let db_path = data_dir.join(DB_FILE_NAME);
    let db = match GatewayDatabase::open(&db_path) {
        Ok(db) => db,
        Err(e) => panic!("failed to open database {}: {e}", db_path.display()),
    };
    info!(path = %db_path.display(), "database opened");

    let state = AppState::from_env(db);
    if state.webhook_secret.is_none() {
        warn!(
            "{} not set: inbound webhooks will be accepted without signature verification",
            WEBHOOK_SECRET_ENV
        );
    }
    if !state.partner.is_configured() {
        warn!(
            missing = ?state.partner.missing_variables(),
            "partner API credentials incomplete: proxy requests will fail"
        );
    }

    let app = router(state);

    let host = env_or_default("HOST", "0.0.0.0");
    let port: u16 = env_or_default("PORT", "8080").parse().unwrap_or(8080);
    let addr: SocketAddr = match format!("{host}:{port}").parse() {
        Ok(addr) => addr,
        Err(e) => panic!("invalid bind address {host}:{port}: {e}"),
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => panic!("failed to bind {addr}: {e}"),
    };
    info!(%addr, "drgreen-gateway listening (docs at /docs)");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        panic!("server error: {e}");
    }
}
