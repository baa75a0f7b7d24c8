//! Metrics collection and exposition.
//!
//! # Metrics
//! - `direct_call_requests_total` (counter): logical calls by service, method, endpoint, outcome
//! - `direct_call_duration_seconds` (histogram): call start to final completion, retries included
//!
//! # Design Decisions
//! - Exactly one counter increment and one latency sample per logical call
//! - `endpoint` label is a template, never the raw path

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

pub const REQUESTS_TOTAL: &str = "direct_call_requests_total";
pub const DURATION_SECONDS: &str = "direct_call_duration_seconds";

/// Versioned API prefix recognised by [`endpoint_template`].
const API_PREFIX: &str = "/api/v";

/// How a logical call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    /// Envelope with `success = true`.
    Success,
    /// Envelope reporting a failure (business or pre-flight).
    Failure,
    /// Failure synthesized from an error no envelope carried.
    Error,
}

impl CallOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallOutcome::Success => "success",
            CallOutcome::Failure => "failure",
            CallOutcome::Error => "error",
        }
    }
}

/// Bounded label for a request method: standard methods by name,
/// extension methods as `OTHER`, unparseable input as `INVALID`.
pub fn method_label(method: &str) -> &'static str {
    match reqwest::Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes()) {
        Ok(m) => match m.as_str() {
            "GET" => "GET",
            "POST" => "POST",
            "PUT" => "PUT",
            "DELETE" => "DELETE",
            "PATCH" => "PATCH",
            "HEAD" => "HEAD",
            "OPTIONS" => "OPTIONS",
            "TRACE" => "TRACE",
            "CONNECT" => "CONNECT",
            _ => "OTHER",
        },
        Err(_) => "INVALID",
    }
}

/// Collapse a request path into a bounded label.
///
/// `/api/v1/users/123` → `/api/v1/users/**`, other paths → `custom`,
/// empty → `unknown`.
pub fn endpoint_template(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    if path.is_empty() {
        return "unknown".to_string();
    }
    let Some(rest) = path.strip_prefix(API_PREFIX) else {
        return "custom".to_string();
    };

    let version_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if version_len == 0 {
        return "custom".to_string();
    }
    let (version, tail) = rest.split_at(version_len);
    let Some(tail) = tail.strip_prefix('/') else {
        return "custom".to_string();
    };
    match tail.split('/').next().filter(|s| !s.is_empty()) {
        Some(segment) => format!("{}{}/{}/**", API_PREFIX, version, segment),
        None => "custom".to_string(),
    }
}

/// Emits per-call metrics through the `metrics` facade.
#[derive(Debug, Clone, Copy)]
pub struct CallRecorder {
    enabled: bool,
}

impl CallRecorder {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// A recorder that emits nothing.
    pub fn disabled() -> Self {
        Self::new(false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record one finished logical call.
    pub fn record(
        &self,
        service_id: &str,
        method: &str,
        path: &str,
        outcome: CallOutcome,
        elapsed: Duration,
    ) {
        let endpoint = endpoint_template(path);
        tracing::debug!(
            service_id = %service_id,
            method = %method,
            endpoint = %endpoint,
            outcome = outcome.as_str(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Direct call finished"
        );
        if !self.enabled {
            return;
        }

        let labels = [
            ("service", service_id.to_string()),
            ("method", method.to_string()),
            ("endpoint", endpoint),
            ("outcome", outcome.as_str().to_string()),
        ];
        counter!(REQUESTS_TOTAL, &labels).increment(1);
        histogram!(DURATION_SECONDS, &labels).record(elapsed.as_secs_f64());
    }
}

impl Default for CallRecorder {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Install the Prometheus exporter with an HTTP scrape endpoint.
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Install the Prometheus recorder without a listener and return a handle
/// that renders the current snapshot.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}
