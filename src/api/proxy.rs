// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Healing Buds

//! Signed pass-through to the Dr. Green partner API.
//!
//! The browser never sees partner credentials: callers submit an action
//! envelope, the gateway maps it to a partner endpoint, signs it, and
//! relays the partner's status and body verbatim.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;
use utoipa::ToSchema;

use crate::{
    error::ApiError,
    partner::PartnerClient,
    state::AppState,
};

const DEFAULT_STRAINS_COUNTRY: &str = "PT";

/// The closed set of partner operations the proxy will perform.
///
/// Anything outside this enum is rejected before a single byte leaves the
/// gateway, so a compromised frontend cannot steer the signing key at
/// arbitrary partner endpoints.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum ProxyAction {
    CreateClient {
        #[schema(value_type = Object)]
        data: Value,
    },
    GetClient {
        #[serde(rename = "clientId")]
        client_id: String,
    },
    UpdateClient {
        #[serde(rename = "clientId")]
        client_id: String,
        #[schema(value_type = Object)]
        data: Value,
    },
    GetStrains {
        #[serde(rename = "countryCode", default)]
        country_code: Option<String>,
    },
    GetStrain {
        #[serde(rename = "strainId")]
        strain_id: String,
    },
    CreateCart {
        #[schema(value_type = Object)]
        data: Value,
    },
    UpdateCart {
        #[serde(rename = "cartId")]
        cart_id: String,
        #[schema(value_type = Object)]
        data: Value,
    },
    GetCart {
        #[serde(rename = "cartId")]
        cart_id: String,
    },
    CreateOrder {
        #[schema(value_type = Object)]
        data: Value,
    },
    GetOrder {
        #[serde(rename = "orderId")]
        order_id: String,
    },
    GetOrders {
        #[serde(rename = "clientId")]
        client_id: String,
    },
    CreatePayment {
        #[schema(value_type = Object)]
        data: Value,
    },
    GetPayment {
        #[serde(rename = "paymentId")]
        payment_id: String,
    },
}

impl ProxyAction {
    /// Partner endpoint this action maps to: method, path, optional body.
    pub fn endpoint(&self) -> (Method, String, Option<&Value>) {
        match self {
            ProxyAction::CreateClient { data } => {
                (Method::POST, "/clients".to_string(), Some(data))
            }
            ProxyAction::GetClient { client_id } => {
                (Method::GET, format!("/clients/{client_id}"), None)
            }
            ProxyAction::UpdateClient { client_id, data } => {
                (Method::PUT, format!("/clients/{client_id}"), Some(data))
            }
            ProxyAction::GetStrains { country_code } => {
                let country = country_code.as_deref().unwrap_or(DEFAULT_STRAINS_COUNTRY);
                (Method::GET, format!("/strains?countryCode={country}"), None)
            }
            ProxyAction::GetStrain { strain_id } => {
                (Method::GET, format!("/strains/{strain_id}"), None)
            }
            ProxyAction::CreateCart { data } => (Method::POST, "/carts".to_string(), Some(data)),
            ProxyAction::UpdateCart { cart_id, data } => {
                (Method::PUT, format!("/carts/{cart_id}"), Some(data))
            }
            ProxyAction::GetCart { cart_id } => (Method::GET, format!("/carts/{cart_id}"), None),
            ProxyAction::CreateOrder { data } => (Method::POST, "/orders".to_string(), Some(data)),
            ProxyAction::GetOrder { order_id } => {
                (Method::GET, format!("/orders/{order_id}"), None)
            }
            ProxyAction::GetOrders { client_id } => {
                (Method::GET, format!("/orders?clientId={client_id}"), None)
            }
            ProxyAction::CreatePayment { data } => {
                (Method::POST, "/payments".to_string(), Some(data))
            }
            ProxyAction::GetPayment { payment_id } => {
                (Method::GET, format!("/payments/{payment_id}"), None)
            }
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/proxy",
    request_body = ProxyAction,
    tag = "Proxy",
    responses(
        (status = 200, description = "Partner response relayed verbatim"),
        (status = 400, description = "Unknown or malformed action"),
        (status = 500, description = "Credentials missing or partner unreachable")
    )
)]
pub async fn forward(
    State(state): State<AppState>,
    Json(raw): Json<Value>,
) -> Result<Response, ApiError> {
    let action_name = raw
        .get("action")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let action: ProxyAction = match serde_json::from_value(raw) {
        Ok(action) => action,
        Err(e) => {
            warn!(action = %action_name, error = %e, "proxy action rejected");
            return Ok((
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Unknown action", "action": action_name })),
            )
                .into_response());
        }
    };

    let client =
        PartnerClient::new(&state.partner).map_err(|e| ApiError::internal(e.to_string()))?;

    let (method, path, body) = action.endpoint();
    let response = client
        .request(method, &path, body)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let status = StatusCode::from_u16(response.status.as_u16())
        .unwrap_or(StatusCode::BAD_GATEWAY);
    Ok((status, Json(response.body)).into_response())
}
