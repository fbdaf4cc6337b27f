// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Healing Buds

//! Inbound webhook signature verification.
//!
//! The partner signs deliveries with a SHA-256 digest over the raw request
//! body concatenated with the shared secret. The header value may carry the
//! digest in either hex or base64, so both encodings are accepted.
//!
//! Verification must run over the exact bytes received; re-serializing a
//! parsed payload is not guaranteed to be byte-identical.

use base64ct::{Base64, Encoding};
use sha2::{Digest, Sha256};

/// Compute the expected signature digest for a body and secret.
fn digest(raw_body: &[u8], secret: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(raw_body);
    hasher.update(secret.as_bytes());
    hasher.finalize().into()
}

/// Check a supplied signature against the body and shared secret.
///
/// Accepts the hex or base64 encoding of the digest. Returns `false` for
/// anything else, including empty signatures.
pub fn verify(raw_body: &[u8], signature: &str, secret: &str) -> bool {
    if signature.is_empty() {
        return false;
    }
    let expected = digest(raw_body, secret);
    hex::encode(expected) == signature || Base64::encode_string(&expected) == signature
}

/// Produce the hex form of the signature, as the partner's sender does.
///
/// Used by the diagnostics suite and tests to build valid deliveries.
pub fn sign(raw_body: &[u8], secret: &str) -> String {
    hex::encode(digest(raw_body, secret))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_verifies() {
        let body = br#"{"event":"order.shipped","orderId":"o1"}"#;
        let sig = sign(body, "topsecret");
        assert!(verify(body, &sig, "topsecret"));
    }

    #[test]
    fn wrong_secret_fails() {
        let body = b"payload";
        let sig = sign(body, "secret-one");
        assert!(!verify(body, &sig, "secret-two"));
    }

    #[test]
    fn tampered_body_fails() {
        let sig = sign(b"original", "secret");
        assert!(!verify(b"tampered", &sig, "secret"));
    }

    #[test]
    fn base64_encoding_is_accepted() {
        let body = b"payload";
        let expected = digest(body, "secret");
        let b64 = Base64::encode_string(&expected);
        assert!(verify(body, &b64, "secret"));
    }

    #[test]
    fn empty_signature_is_rejected() {
        assert!(!verify(b"payload", "", "secret"));
    }

    #[test]
    fn garbage_signature_is_rejected() {
        assert!(!verify(b"payload", "not-a-digest", "secret"));
    }
}
