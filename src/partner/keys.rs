// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Healing Buds

//! secp256k1 key decoding and request signing.
//!
//! Operators paste key material in whatever form their tooling produced:
//! PEM text, base64-wrapped PEM, PKCS#8 or SEC1 DER, or a raw 32-byte
//! scalar. All decoding lives here so every caller gets the same sniffing
//! behavior.

use base64ct::{Base64, Encoding};
use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::pkcs8::DecodePrivateKey;
use k256::SecretKey;
use sha2::{Digest, Sha256};

use super::PartnerError;

/// Decode secp256k1 private key material in any supported encoding.
pub fn decode_secp256k1_key(input: &str) -> Result<SigningKey, PartnerError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(PartnerError::InvalidKey("empty key material".to_string()));
    }

    if trimmed.contains("-----BEGIN") {
        return key_from_pem(trimmed);
    }

    // Environment values often arrive with line breaks from copy/paste.
    let compact: String = trimmed.split_whitespace().collect();
    let decoded = Base64::decode_vec(&compact)
        .map_err(|_| PartnerError::InvalidKey("key is neither PEM nor base64".to_string()))?;

    // Base64 may wrap PEM text rather than DER.
    if let Ok(text) = std::str::from_utf8(&decoded) {
        if text.contains("-----BEGIN") {
            return key_from_pem(text);
        }
    }

    key_from_der(&decoded)
}

fn key_from_pem(text: &str) -> Result<SigningKey, PartnerError> {
    let block = pem::parse(text)
        .map_err(|e| PartnerError::InvalidKey(format!("invalid PEM: {e}")))?;
    key_from_der(block.contents())
}

fn key_from_der(der: &[u8]) -> Result<SigningKey, PartnerError> {
    if der.len() == 32 {
        return SigningKey::from_slice(der)
            .map_err(|e| PartnerError::InvalidKey(format!("invalid scalar: {e}")));
    }
    if let Ok(secret) = SecretKey::from_pkcs8_der(der) {
        return Ok(SigningKey::from(secret));
    }
    if let Ok(secret) = SecretKey::from_sec1_der(der) {
        return Ok(SigningKey::from(secret));
    }
    // Unrecognized wrapper: look for an OCTET STRING of length 32 and take
    // its contents as the scalar.
    if let Some(pos) = der.windows(2).position(|w| w == [0x04, 0x20]) {
        let start = pos + 2;
        if der.len() >= start + 32 {
            if let Ok(key) = SigningKey::from_slice(&der[start..start + 32]) {
                return Ok(key);
            }
        }
    }
    if der.len() > 32 {
        if let Ok(key) = SigningKey::from_slice(&der[der.len() - 32..]) {
            return Ok(key);
        }
    }
    Err(PartnerError::InvalidKey(
        "unsupported secp256k1 key encoding".to_string(),
    ))
}

/// Sign a request payload: SHA-256 over the exact bytes, canonical (low-S)
/// ECDSA signature, DER-encoded and base64'd for the `x-auth-signature`
/// header.
pub fn sign_payload(key: &SigningKey, payload: &[u8]) -> Result<String, PartnerError> {
    let digest = Sha256::digest(payload);
    let signature: Signature = key
        .sign_prehash(digest.as_slice())
        .map_err(|e| PartnerError::Signing(e.to_string()))?;
    let signature = signature.normalize_s().unwrap_or(signature);
    Ok(Base64::encode_string(signature.to_der().as_bytes()))
}

/// Check a base64 DER signature against a payload. Used by diagnostics to
/// prove the configured key round-trips before any network call.
pub fn verify_payload(key: &VerifyingKey, payload: &[u8], signature_b64: &str) -> bool {
    let Ok(der) = Base64::decode_vec(signature_b64.trim()) else {
        return false;
    };
    let Ok(signature) = Signature::from_der(&der) else {
        return false;
    };
    let digest = Sha256::digest(payload);
    key.verify_prehash(digest.as_slice(), &signature).is_ok()
}
