//! Direct service client.
//!
//! # Responsibilities
//! - Gate calls on the master switch and shared secret
//! - Validate caller input before any network activity
//! - Resolve the target address, sign every attempt, send, decode
//! - Always hand back a [`ResponseEnvelope`], never an error
//!
//! # Call Flow
//! ```text
//! call(ctx, request)
//!     → gate (DIRECT_CALL_DISABLED) → validate (PARAM_ERROR)
//!     → AddressResolver (SERVICE_NOT_FOUND)
//!     → TraceContext from ctx
//!     → ResilienceExecutor
//!         → per attempt: sign → headers → send → decode → reshape
//!     → envelope
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::{DirectCallConfig, SigningFailurePolicy};
use crate::discovery::{AddressResolver, ServiceDirectory};
use crate::error::{CallError, ErrorCode};
use crate::http::envelope::{decode_envelope, ResponseEnvelope};
use crate::http::request::DirectRequest;
use crate::observability::metrics::method_label;
use crate::observability::{CallContext, CallOutcome, TraceContext};
use crate::resilience::ResilienceExecutor;
use crate::security::headers::build_headers;
use crate::security::{AuthContext, HmacSigner, RequestSigner, SigningError};

/// Snapshot of the reloadable part of the configuration.
#[derive(Debug)]
struct ClientSettings {
    active: bool,
    source_service: String,
    signer: Option<Arc<dyn RequestSigner>>,
    failure_policy: SigningFailurePolicy,
    default_timeout: Option<Duration>,
}

impl ClientSettings {
    fn build(config: &DirectCallConfig, custom_signer: Option<&Arc<dyn RequestSigner>>) -> Self {
        let signer = match custom_signer {
            Some(signer) => Some(signer.clone()),
            None if config.is_active() => match HmacSigner::new(&config.shared_secret) {
                Ok(signer) => Some(Arc::new(signer) as Arc<dyn RequestSigner>),
                Err(e) => {
                    tracing::warn!(error = %e, "Could not build request signer");
                    None
                }
            },
            None => None,
        };

        Self {
            active: config.is_active(),
            source_service: config.source_service_name.clone(),
            signer,
            failure_policy: config.signing.failure_policy,
            default_timeout: config.request_timeout(),
        }
    }
}

/// Calls other services directly, bypassing the gateway.
#[derive(Debug)]
pub struct DirectServiceClient {
    settings: ArcSwap<ClientSettings>,
    custom_signer: Option<Arc<dyn RequestSigner>>,
    resolver: AddressResolver,
    executor: ResilienceExecutor,
    http: reqwest::Client,
}

impl DirectServiceClient {
    /// Build a client with the resilience policies described by `config`.
    pub fn new(config: &DirectCallConfig, directory: Arc<dyn ServiceDirectory>) -> Self {
        Self {
            settings: ArcSwap::from_pointee(ClientSettings::build(config, None)),
            custom_signer: None,
            resolver: AddressResolver::new(directory),
            executor: ResilienceExecutor::from_config(config),
            http: reqwest::Client::new(),
        }
    }

    /// Replace the resilience executor.
    pub fn with_executor(mut self, executor: ResilienceExecutor) -> Self {
        self.executor = executor;
        self
    }

    /// Replace the HTTP transport.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Use `signer` instead of the HMAC signer derived from the shared secret.
    /// The secret still gates whether the client is active.
    pub fn with_signer(mut self, signer: Arc<dyn RequestSigner>) -> Self {
        let current = self.settings.load();
        self.settings.store(Arc::new(ClientSettings {
            active: current.active,
            source_service: current.source_service.clone(),
            signer: Some(signer.clone()),
            failure_policy: current.failure_policy,
            default_timeout: current.default_timeout,
        }));
        self.custom_signer = Some(signer);
        self
    }

    /// Apply a new configuration to the gate, secret, source name, signing
    /// policy and default timeout. Calls already in flight keep the old values.
    ///
    /// Retry, circuit breaker and `metrics_enabled` settings are fixed at
    /// construction; changing them needs a new client.
    pub fn reload(&self, config: &DirectCallConfig) {
        let settings = ClientSettings::build(config, self.custom_signer.as_ref());
        tracing::info!(
            active = settings.active,
            source_service = %settings.source_service,
            "Direct-call settings reloaded"
        );
        self.settings.store(Arc::new(settings));
    }

    /// True when calls are currently allowed.
    pub fn is_active(&self) -> bool {
        self.settings.load().active
    }

    pub fn executor(&self) -> &ResilienceExecutor {
        &self.executor
    }

    /// Call a service and convert the payload into `T`.
    pub async fn call<T: DeserializeOwned>(
        &self,
        ctx: &mut CallContext,
        request: &DirectRequest,
    ) -> ResponseEnvelope<T> {
        self.dispatch(ctx, request, |envelope| envelope.reshape::<T>())
            .await
    }

    /// Call a service and return the payload as untyped JSON.
    pub async fn call_value(
        &self,
        ctx: &mut CallContext,
        request: &DirectRequest,
    ) -> ResponseEnvelope<Value> {
        self.dispatch(ctx, request, Ok).await
    }

    async fn dispatch<T, S>(
        &self,
        ctx: &mut CallContext,
        request: &DirectRequest,
        shape: S,
    ) -> ResponseEnvelope<T>
    where
        S: Fn(ResponseEnvelope<Value>) -> Result<ResponseEnvelope<T>, serde_json::Error>,
    {
        let start = Instant::now();
        let settings = self.settings.load_full();
        let service_id = request.service_id();
        let wire_path = request.wire_path();
        let path: &str = &wire_path;

        if !settings.active {
            return self.reject(request, ErrorCode::DirectCallDisabled, "direct call is disabled", start);
        }
        let method = match request.validate() {
            Ok(method) => method,
            Err(message) => return self.reject(request, ErrorCode::ParamError, message, start),
        };
        let Some(base_url) = self.resolver.resolve(service_id) else {
            let message = format!("no instance available for service {}", service_id);
            return self.reject(request, ErrorCode::ServiceNotFound, message, start);
        };

        let trace = TraceContext::resolve(ctx, &settings.source_service);
        let body = match request.body_value().map(serde_json::to_string).transpose() {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(service_id = %service_id, path = %path, error = %e, "Failed to serialize request body");
                self.executor.recorder().record(
                    service_id,
                    method_label(method.as_str()),
                    path,
                    CallOutcome::Error,
                    start.elapsed(),
                );
                return ResponseEnvelope::from_code(ErrorCode::ServiceCallError, e.to_string());
            }
        };
        let url = join_url(&base_url, path);
        let timeout = request.timeout_value().or(settings.default_timeout);

        tracing::debug!(
            service_id = %service_id,
            method = %method,
            url = %url,
            trace_id = %trace.trace_id,
            "Direct call"
        );

        let attempt = Attempt {
            settings: &settings,
            method: &method,
            url: &url,
            path,
            body: body.as_deref(),
            trace: &trace,
            timeout,
        };
        let attempt = &attempt;
        let shape = &shape;
        self.executor
            .execute(service_id, method_label(method.as_str()), path, move || {
                self.send(attempt, shape)
            })
            .await
    }

    /// One physical attempt.
    async fn send<T, S>(&self, attempt: &Attempt<'_>, shape: &S) -> Result<ResponseEnvelope<T>, CallError>
    where
        S: Fn(ResponseEnvelope<Value>) -> Result<ResponseEnvelope<T>, serde_json::Error>,
    {
        let auth = self.sign(attempt)?;
        let mut builder = self
            .http
            .request(attempt.method.clone(), attempt.url)
            .headers(build_headers(attempt.trace, auth.as_ref()));
        if let Some(body) = attempt.body {
            builder = builder
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(body.to_string());
        }
        if let Some(timeout) = attempt.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            return Ok(ResponseEnvelope::from_code(
                ErrorCode::ServiceCallError,
                format!("{} responded with status {}", attempt.url, status.as_u16()),
            ));
        }
        if bytes.is_empty() {
            return Ok(ResponseEnvelope::from_code(
                ErrorCode::ServiceCallError,
                format!("{} returned an empty body", attempt.url),
            ));
        }

        let envelope = decode_envelope(&bytes)?;
        Ok(shape(envelope)?)
    }

    /// Sign one attempt, applying the configured failure policy.
    fn sign(&self, attempt: &Attempt<'_>) -> Result<Option<AuthContext>, CallError> {
        let result = match &attempt.settings.signer {
            Some(signer) => signer.sign(
                attempt.method.as_str(),
                attempt.path,
                attempt.body.unwrap_or_default(),
            ),
            None => Err(SigningError::EmptySecret),
        };

        match (result, attempt.settings.failure_policy) {
            (Ok(auth), _) => Ok(Some(auth)),
            (Err(e), SigningFailurePolicy::SoftFail) => {
                tracing::warn!(
                    path = %attempt.path,
                    trace_id = %attempt.trace.trace_id,
                    error = %e,
                    "Request signing failed, sending unsigned"
                );
                Ok(None)
            }
            (Err(e), SigningFailurePolicy::HardFail) => Err(CallError::Signing(e)),
        }
    }

    /// Short-circuit before the resilience pipeline.
    fn reject<T>(
        &self,
        request: &DirectRequest,
        code: ErrorCode,
        message: impl Into<String>,
        start: Instant,
    ) -> ResponseEnvelope<T> {
        let message = message.into();
        tracing::warn!(
            service_id = %request.service_id(),
            path = %request.wire_path(),
            error_code = code.as_str(),
            "{}",
            message
        );
        self.executor.recorder().record(
            request.service_id(),
            method_label(request.method()),
            &request.wire_path(),
            CallOutcome::Failure,
            start.elapsed(),
        );
        ResponseEnvelope::from_code(code, message)
    }
}

/// Everything an attempt needs, fixed for the whole logical call.
struct Attempt<'a> {
    settings: &'a ClientSettings,
    method: &'a Method,
    url: &'a str,
    path: &'a str,
    body: Option<&'a str>,
    trace: &'a TraceContext,
    timeout: Option<Duration>,
}

fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}
