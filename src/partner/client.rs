// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Healing Buds

//! Signed HTTP client for the Dr. Green partner API.

use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::keys;
use super::{PartnerConfig, PartnerError};
use k256::ecdsa::SigningKey;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Status and decoded body of a partner API call. Non-2xx statuses are
/// data, not errors: the proxy relays them to the caller verbatim.
#[derive(Debug, Clone)]
pub struct PartnerResponse {
    pub status: StatusCode,
    pub body: Value,
}

#[derive(Debug)]
pub struct PartnerClient {
    http: Client,
    base_url: String,
    api_key: String,
    signing_key: SigningKey,
}

impl PartnerClient {
    /// Build a client from resolved configuration. Fails fast when a
    /// credential is missing or the key material does not decode.
    pub fn new(config: &PartnerConfig) -> Result<Self, PartnerError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| PartnerError::MissingConfig(config.environment.api_key_var().to_string()))?;
        let key_material = config.private_key.as_deref().ok_or_else(|| {
            PartnerError::MissingConfig(config.environment.private_key_var().to_string())
        })?;
        let signing_key = keys::decode_secp256k1_key(key_material)?;

        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PartnerError::Request(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            signing_key,
        })
    }

    pub fn verifying_key(&self) -> &k256::ecdsa::VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Sign a payload with this client's key, as attached to requests.
    pub fn sign(&self, payload: &[u8]) -> Result<String, PartnerError> {
        keys::sign_payload(&self.signing_key, payload)
    }

    /// Perform a signed request against the partner API.
    ///
    /// The signature covers the serialized JSON body; bodyless requests
    /// carry only the API key header, matching what the partner verifies.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<PartnerResponse, PartnerError> {
        let url = format!("{}{}", self.base_url, path);
        info!(%method, %url, "partner API request");

        let mut request = self
            .http
            .request(method, &url)
            .header("x-auth-apikey", &self.api_key)
            .header("Content-Type", "application/json");

        if let Some(body) = body {
            let payload =
                serde_json::to_vec(body).map_err(|e| PartnerError::Request(e.to_string()))?;
            let signature = self.sign(&payload)?;
            request = request.header("x-auth-signature", signature).body(payload);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PartnerError::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PartnerError::InvalidResponse(e.to_string()))?;
        let body = decode_body(&text);

        debug!(%status, %url, "partner API response");
        Ok(PartnerResponse { status, body })
    }
}

/// Partner endpoints occasionally answer with plain text on errors.
fn decode_body(text: &str) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| json!({ "raw": text }))
}
