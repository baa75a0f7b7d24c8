//! HMAC-SHA256 request signing.
//!
//! Canonical message, one field per line:
//! ```text
//! METHOD
//! PATH
//! hex(sha256(body or ""))
//! timestamp millis
//! nonce
//! ```
//! Signature is `base64(HMAC-SHA256(secret, message))`.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use thiserror::Error;

pub(crate) type HmacSha256 = Hmac<Sha256>;

/// Authentication fields for one physical attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    /// Epoch milliseconds at signing time.
    pub timestamp: u64,
    /// Single-use token.
    pub nonce: String,
    /// Hex SHA-256 of the serialized body.
    pub body_hash: String,
    /// Base64 HMAC-SHA256 of the canonical message.
    pub signature: String,
}

/// Errors raised while producing a signature.
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("shared secret is empty")]
    EmptySecret,

    #[error("invalid signing key: {0}")]
    InvalidKey(#[from] hmac::digest::InvalidLength),

    #[error("system clock is before the unix epoch")]
    Clock(#[from] std::time::SystemTimeError),

    #[error("signer unavailable: {0}")]
    Unavailable(String),
}

/// Produces authentication fields for outgoing requests.
pub trait RequestSigner: Send + Sync + fmt::Debug {
    /// Sign one attempt. `body` is the serialized body, empty when absent.
    fn sign(&self, method: &str, path: &str, body: &str) -> Result<AuthContext, SigningError>;
}

/// HMAC-SHA256 signer over a shared secret.
#[derive(Clone)]
pub struct HmacSigner {
    secret: Vec<u8>,
}

impl HmacSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, SigningError> {
        let secret = secret.as_ref();
        if secret.iter().all(u8::is_ascii_whitespace) {
            return Err(SigningError::EmptySecret);
        }
        Ok(Self {
            secret: secret.to_vec(),
        })
    }

    /// Sign with an explicit timestamp and nonce.
    pub fn sign_with(
        &self,
        method: &str,
        path: &str,
        body: &str,
        timestamp: u64,
        nonce: &str,
    ) -> Result<AuthContext, SigningError> {
        let body_hash = body_hash(body);
        let message = canonical_message(method, path, &body_hash, timestamp, nonce);

        let mut mac = HmacSha256::new_from_slice(&self.secret)?;
        mac.update(message.as_bytes());
        let signature = BASE64.encode(mac.finalize().into_bytes());

        Ok(AuthContext {
            timestamp,
            nonce: nonce.to_string(),
            body_hash,
            signature,
        })
    }

    pub(crate) fn mac(&self) -> Result<HmacSha256, SigningError> {
        Ok(HmacSha256::new_from_slice(&self.secret)?)
    }
}

impl RequestSigner for HmacSigner {
    fn sign(&self, method: &str, path: &str, body: &str) -> Result<AuthContext, SigningError> {
        let timestamp = now_millis()?;
        let nonce = new_nonce();
        self.sign_with(method, path, body, timestamp, &nonce)
    }
}

impl fmt::Debug for HmacSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacSigner")
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Hex SHA-256 of the body text.
pub fn body_hash(body: &str) -> String {
    hex::encode(Sha256::digest(body.as_bytes()))
}

/// The exact bytes that get signed.
pub fn canonical_message(
    method: &str,
    path: &str,
    body_hash: &str,
    timestamp: u64,
    nonce: &str,
) -> String {
    format!(
        "{}\n{}\n{}\n{}\n{}",
        method.to_ascii_uppercase(),
        path,
        body_hash,
        timestamp,
        nonce
    )
}

pub(crate) fn now_millis() -> Result<u64, SigningError> {
    let elapsed = SystemTime::now().duration_since(UNIX_EPOCH)?;
    Ok(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}

fn new_nonce() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
