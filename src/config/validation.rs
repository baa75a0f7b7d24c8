//! Configuration validation.
//!
//! Serde handles the syntax; this checks value ranges and addresses.
//! Every problem is reported, not just the first one.

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::DirectCallConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("shared_secret must be set when enabled = true")]
    MissingSecret,

    #[error("source_service_name must not be blank")]
    BlankSourceService,

    #[error("request_timeout_ms must be greater than 0")]
    ZeroTimeout,

    #[error("retry.max_attempts must be at least 1")]
    ZeroAttempts,

    #[error("retry.base_delay_ms ({base}) exceeds retry.max_delay_ms ({max})")]
    BackoffRange { base: u64, max: u64 },

    #[error("circuit_breaker.failure_threshold must be at least 1")]
    ZeroFailureThreshold,

    #[error("observability.metrics_address '{0}' is not a socket address")]
    InvalidMetricsAddress(String),

    #[error("invalid address '{address}' for service '{service}'")]
    InvalidAddress { service: String, address: String },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &DirectCallConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.enabled && config.shared_secret.trim().is_empty() {
        errors.push(ValidationError::MissingSecret);
    }
    if config.source_service_name.trim().is_empty() {
        errors.push(ValidationError::BlankSourceService);
    }
    if config.request_timeout_ms == Some(0) {
        errors.push(ValidationError::ZeroTimeout);
    }
    if config.retry.enabled {
        if config.retry.max_attempts == 0 {
            errors.push(ValidationError::ZeroAttempts);
        }
        if config.retry.base_delay_ms > config.retry.max_delay_ms {
            errors.push(ValidationError::BackoffRange {
                base: config.retry.base_delay_ms,
                max: config.retry.max_delay_ms,
            });
        }
    }
    if config.circuit_breaker.enabled && config.circuit_breaker.failure_threshold == 0 {
        errors.push(ValidationError::ZeroFailureThreshold);
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    for (service, addresses) in &config.services {
        for address in addresses {
            if parse_address(address).is_none() {
                errors.push(ValidationError::InvalidAddress {
                    service: service.clone(),
                    address: address.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Parse an address, assuming `http://` when no scheme is given.
pub(crate) fn parse_address(address: &str) -> Option<Url> {
    let address = address.trim();
    if address.is_empty() {
        return None;
    }
    let candidate = if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    };
    Url::parse(&candidate).ok().filter(|u| u.has_host())
}
