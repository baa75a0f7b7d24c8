//! Request authentication subsystem.
//!
//! # Data Flow
//! ```text
//! Outgoing attempt (caller side):
//!     → signing.rs (body hash, timestamp, nonce, HMAC-SHA256 signature)
//!     → headers.rs (X-Direct-Call, X-Trace-Id, X-Source-Service, X-Timestamp, X-Nonce, X-Signature)
//!
//! Incoming request (callee side):
//!     → verify.rs (freshness window, constant-time signature check, nonce replay cache)
//! ```
//!
//! # Design Decisions
//! - A fresh timestamp/nonce pair for every physical attempt, retries included
//! - Signing failure policy is configuration, defaulting to soft-fail
//! - The shared secret never appears in logs or Debug output

pub mod headers;
pub mod signing;
pub mod verify;

pub use signing::{AuthContext, HmacSigner, RequestSigner, SigningError};
pub use verify::{NonceCache, SignatureVerifier, VerifyError};
