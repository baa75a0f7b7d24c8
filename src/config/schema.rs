//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the direct-call client.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Placeholder used when the caller does not name itself.
pub const DEFAULT_SOURCE_SERVICE: &str = "unknown-service";

/// Root configuration for the direct-call client.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DirectCallConfig {
    /// Master switch. When false every call returns `DIRECT_CALL_DISABLED`.
    pub enabled: bool,

    /// Secret shared with callees for request signing. Must be non-blank
    /// for the client to be active.
    pub shared_secret: String,

    /// Name of the calling service, sent as `X-Source-Service`.
    pub source_service_name: String,

    /// Default per-call timeout in milliseconds. `None` keeps the transport default.
    pub request_timeout_ms: Option<u64>,

    /// Request signing settings.
    pub signing: SigningConfig,

    /// Retry configuration.
    pub retry: RetryConfig,

    /// Circuit breaker configuration.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Static service directory: logical name -> addresses.
    pub services: HashMap<String, Vec<String>>,
}

impl Default for DirectCallConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            shared_secret: String::new(),
            source_service_name: DEFAULT_SOURCE_SERVICE.to_string(),
            request_timeout_ms: None,
            signing: SigningConfig::default(),
            retry: RetryConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            observability: ObservabilityConfig::default(),
            services: HashMap::new(),
        }
    }
}

impl DirectCallConfig {
    /// True when the client may issue calls at all.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.shared_secret.trim().is_empty()
    }

    /// The default per-call timeout, if one is configured.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

/// What to do when a request signature cannot be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SigningFailurePolicy {
    /// Log a warning and send the request unsigned.
    ///
    /// WARNING: callees that do not reject unsigned requests on their own
    /// will accept them.
    #[default]
    SoftFail,
    /// Fail the attempt.
    HardFail,
}

/// Signing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Behaviour when signing fails.
    pub failure_policy: SigningFailurePolicy,

    /// Maximum accepted clock skew on the receiving side, in milliseconds.
    pub max_clock_skew_ms: u64,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            failure_policy: SigningFailurePolicy::SoftFail,
            max_clock_skew_ms: 5 * 60 * 1000,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries.
    pub enabled: bool,

    /// Total number of attempts, the first one included.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Enable the per-service circuit breaker.
    pub enabled: bool,

    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,

    /// How long the circuit stays open before admitting a probe, in milliseconds.
    pub open_duration_ms: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: 5,
            open_duration_ms: 30_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Record call metrics.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_inactive() {
        let config = DirectCallConfig::default();
        assert!(!config.is_active());
        assert_eq!(config.source_service_name, DEFAULT_SOURCE_SERVICE);
        assert!(config.request_timeout().is_none());
    }

    #[test]
    fn test_blank_secret_is_inactive() {
        let config = DirectCallConfig {
            enabled: true,
            shared_secret: "   ".into(),
            ..Default::default()
        };
        assert!(!config.is_active());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config: DirectCallConfig = toml::from_str(
            r#"
            enabled = true
            shared_secret = "s3cret"
            source_service_name = "order-service"

            [signing]
            failure_policy = "hard_fail"

            [retry]
            max_attempts = 5

            [services]
            common-service = ["http://10.0.0.1:8080", "http://10.0.0.2:8080"]
            "#,
        )
        .unwrap();

        assert!(config.is_active());
        assert_eq!(config.signing.failure_policy, SigningFailurePolicy::HardFail);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay_ms, 100);
        assert!(config.circuit_breaker.enabled);
        assert_eq!(config.services["common-service"].len(), 2);
    }
}
