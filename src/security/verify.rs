//! Receiver-side verification of direct-call signatures.
//!
//! # Responsibilities
//! - Reject requests without auth headers (no soft-fail on this side)
//! - Reject timestamps outside the allowed clock skew
//! - Compare signatures in constant time
//! - Reject nonces already seen within the freshness window

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use hmac::Mac;
use reqwest::header::HeaderMap;
use thiserror::Error;

use crate::config::SigningConfig;
use crate::security::headers::{X_NONCE, X_SIGNATURE, X_TIMESTAMP};
use crate::security::signing::{body_hash, canonical_message, now_millis, HmacSigner, SigningError};

/// Inserts between two full prunes of the nonce cache.
const PRUNE_EVERY: usize = 1024;

/// Reasons a signed request is refused.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("missing header {0}")]
    MissingHeader(&'static str),

    #[error("malformed header {0}")]
    MalformedHeader(&'static str),

    #[error("timestamp outside allowed skew ({skew_ms} ms)")]
    Stale { skew_ms: u64 },

    #[error("signature mismatch")]
    Mismatch,

    #[error("nonce already used")]
    Replayed,

    #[error(transparent)]
    Signing(#[from] SigningError),
}

/// Remembers nonces until their freshness window has passed.
#[derive(Debug, Default)]
pub struct NonceCache {
    seen: DashMap<String, u64>,
    inserts: AtomicUsize,
}

impl NonceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `nonce` as used until `expires_at`. Returns false if it is
    /// still held from an earlier request.
    pub fn check_and_insert(&self, nonce: &str, expires_at: u64, now: u64) -> bool {
        let fresh = match self.seen.entry(nonce.to_string()) {
            Entry::Occupied(mut e) => {
                if *e.get() > now {
                    false
                } else {
                    e.insert(expires_at);
                    true
                }
            }
            Entry::Vacant(e) => {
                e.insert(expires_at);
                true
            }
        };

        if fresh && self.inserts.fetch_add(1, Ordering::Relaxed) % PRUNE_EVERY == PRUNE_EVERY - 1 {
            self.prune(now);
        }
        fresh
    }

    /// Drop every expired nonce.
    pub fn prune(&self, now: u64) {
        self.seen.retain(|_, expires_at| *expires_at > now);
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Verifies direct-call signatures for a callee.
#[derive(Debug)]
pub struct SignatureVerifier {
    signer: HmacSigner,
    max_skew: Duration,
    nonces: NonceCache,
}

impl SignatureVerifier {
    pub fn new(secret: impl AsRef<[u8]>, max_skew: Duration) -> Result<Self, SigningError> {
        Ok(Self {
            signer: HmacSigner::new(secret)?,
            max_skew,
            nonces: NonceCache::new(),
        })
    }

    /// A verifier allowing the configured `max_clock_skew_ms`.
    pub fn from_config(config: &SigningConfig, secret: impl AsRef<[u8]>) -> Result<Self, SigningError> {
        Self::new(secret, Duration::from_millis(config.max_clock_skew_ms))
    }

    /// Verify one incoming request against the current clock.
    pub fn verify(
        &self,
        method: &str,
        path: &str,
        body: &str,
        headers: &HeaderMap,
    ) -> Result<(), VerifyError> {
        self.verify_at(method, path, body, headers, now_millis()?)
    }

    /// Verify one incoming request as of `now` (epoch millis).
    pub fn verify_at(
        &self,
        method: &str,
        path: &str,
        body: &str,
        headers: &HeaderMap,
        now: u64,
    ) -> Result<(), VerifyError> {
        let timestamp: u64 = header(headers, X_TIMESTAMP)?
            .parse()
            .map_err(|_| VerifyError::MalformedHeader(X_TIMESTAMP))?;
        let nonce = header(headers, X_NONCE)?;
        let signature = BASE64
            .decode(header(headers, X_SIGNATURE)?)
            .map_err(|_| VerifyError::MalformedHeader(X_SIGNATURE))?;

        let skew_ms = u64::try_from(self.max_skew.as_millis()).unwrap_or(u64::MAX);
        if timestamp.abs_diff(now) > skew_ms {
            return Err(VerifyError::Stale { skew_ms });
        }

        let message = canonical_message(method, path, &body_hash(body), timestamp, nonce);
        let mut mac = self.signer.mac()?;
        mac.update(message.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| VerifyError::Mismatch)?;

        // A nonce must stay blocked for as long as its timestamp is acceptable.
        let expires_at = timestamp.saturating_add(skew_ms);
        if !self.nonces.check_and_insert(nonce, expires_at, now) {
            return Err(VerifyError::Replayed);
        }
        Ok(())
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, VerifyError> {
    headers
        .get(name)
        .ok_or(VerifyError::MissingHeader(name))?
        .to_str()
        .map_err(|_| VerifyError::MalformedHeader(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::tracing::TraceContext;
    use crate::security::headers::build_headers;

    const TS: u64 = 1_700_000_000_000;

    fn signed_headers(body: &str, nonce: &str) -> HeaderMap {
        let auth = HmacSigner::new("k")
            .unwrap()
            .sign_with("POST", "/api/v1/notify", body, TS, nonce)
            .unwrap();
        let trace = TraceContext {
            trace_id: "t".into(),
            source_service: "caller".into(),
        };
        build_headers(&trace, Some(&auth))
    }

    fn verifier() -> SignatureVerifier {
        SignatureVerifier::new("k", Duration::from_secs(60)).unwrap()
    }

    #[test]
    fn test_accepts_valid_request() {
        let headers = signed_headers("{\"x\":1}", "n1");
        verifier()
            .verify_at("POST", "/api/v1/notify", "{\"x\":1}", &headers, TS + 10)
            .unwrap();
    }

    #[test]
    fn test_rejects_tampered_body() {
        let headers = signed_headers("{\"x\":1}", "n1");
        let err = verifier()
            .verify_at("POST", "/api/v1/notify", "{\"x\":2}", &headers, TS)
            .unwrap_err();
        assert!(matches!(err, VerifyError::Mismatch));
    }

    #[test]
    fn test_rejects_stale_timestamp() {
        let headers = signed_headers("", "n1");
        let err = verifier()
            .verify_at("POST", "/api/v1/notify", "", &headers, TS + 61_000)
            .unwrap_err();
        assert!(matches!(err, VerifyError::Stale { skew_ms: 60_000 }));
    }

    #[test]
    fn test_skew_comes_from_config() {
        let config = SigningConfig {
            max_clock_skew_ms: 5_000,
            ..Default::default()
        };
        let v = SignatureVerifier::from_config(&config, "k").unwrap();
        let headers = signed_headers("", "n1");
        let err = v
            .verify_at("POST", "/api/v1/notify", "", &headers, TS + 5_001)
            .unwrap_err();
        assert!(matches!(err, VerifyError::Stale { skew_ms: 5_000 }));
        v.verify_at("POST", "/api/v1/notify", "", &headers, TS + 5_000)
            .unwrap();
    }

    #[test]
    fn test_rejects_replayed_nonce() {
        let v = verifier();
        let headers = signed_headers("", "n1");
        v.verify_at("POST", "/api/v1/notify", "", &headers, TS).unwrap();
        let err = v
            .verify_at("POST", "/api/v1/notify", "", &headers, TS + 1)
            .unwrap_err();
        assert!(matches!(err, VerifyError::Replayed));
    }

    #[test]
    fn test_rejects_unsigned() {
        let err = verifier()
            .verify_at("GET", "/api/v1/x", "", &HeaderMap::new(), TS)
            .unwrap_err();
        assert!(matches!(err, VerifyError::MissingHeader(X_TIMESTAMP)));
    }

    #[test]
    fn test_nonce_cache_expiry() {
        let cache = NonceCache::new();
        assert!(cache.check_and_insert("a", 100, 0));
        assert!(!cache.check_and_insert("a", 150, 50));
        assert!(cache.check_and_insert("a", 300, 200));

        cache.check_and_insert("b", 250, 200);
        cache.prune(260);
        assert_eq!(cache.len(), 1);
    }
}
