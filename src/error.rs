//! Error taxonomy shared by the client and its resilience pipeline.

use thiserror::Error;

use crate::security::SigningError;

/// Error codes returned in envelopes produced by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The client is switched off or has no shared secret. Never retried.
    DirectCallDisabled,
    /// Caller misuse: missing service id, path or method. Never retried.
    ParamError,
    /// No address known for the service. Not retried within the call.
    ServiceNotFound,
    /// Transport, decode or status failure. Eligible for retry and circuit breaking.
    ServiceCallError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DirectCallDisabled => "DIRECT_CALL_DISABLED",
            ErrorCode::ParamError => "PARAM_ERROR",
            ErrorCode::ServiceNotFound => "SERVICE_NOT_FOUND",
            ErrorCode::ServiceCallError => "SERVICE_CALL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of one physical attempt that produced no envelope.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("request signing failed: {0}")]
    Signing(#[from] SigningError),

    #[error("circuit breaker open for service {0}")]
    CircuitOpen(String),

    #[error("{0}")]
    Other(String),
}
