//! Resilient execution of one logical call.
//!
//! ```text
//! retry (outermost, per attempt)
//!     → circuit breaker (per service, may fail fast)
//!         → guard (classifies the supplier result)
//!             → supplier (one physical attempt)
//! ```
//! A failed envelope is carried as [`CallFailure::Rejected`] so that
//! business failures count exactly like transport errors, and the
//! original envelope comes back to the caller untouched.

use std::future::Future;
use std::time::Instant;

use crate::config::DirectCallConfig;
use crate::error::{CallError, ErrorCode};
use crate::http::envelope::ResponseEnvelope;
use crate::observability::{CallOutcome, CallRecorder};
use crate::resilience::circuit_breaker::{BreakerError, BreakerSettings, CircuitBreakerRegistry};
use crate::resilience::retries::RetryPolicy;

/// Why an attempt (or the whole call) did not succeed.
#[derive(Debug)]
pub enum CallFailure<T> {
    /// The callee answered with `success = false`.
    Rejected(ResponseEnvelope<T>),
    /// No envelope: transport, decode, signing or circuit-open failure.
    Error(CallError),
}

/// Wraps supplier invocations in retry and circuit breaking, and records
/// one metric sample per logical call.
#[derive(Debug)]
pub struct ResilienceExecutor {
    breakers: Option<CircuitBreakerRegistry>,
    retry: Option<RetryPolicy>,
    recorder: CallRecorder,
}

impl ResilienceExecutor {
    pub fn new(
        breakers: Option<CircuitBreakerRegistry>,
        retry: Option<RetryPolicy>,
        recorder: CallRecorder,
    ) -> Self {
        Self {
            breakers,
            retry,
            recorder,
        }
    }

    /// No retry, no breaker: the supplier runs once.
    pub fn passthrough(recorder: CallRecorder) -> Self {
        Self::new(None, None, recorder)
    }

    pub fn from_config(config: &DirectCallConfig) -> Self {
        Self::new(
            BreakerSettings::from_config(&config.circuit_breaker).map(CircuitBreakerRegistry::new),
            RetryPolicy::from_config(&config.retry),
            CallRecorder::new(config.observability.metrics_enabled),
        )
    }

    pub fn recorder(&self) -> &CallRecorder {
        &self.recorder
    }

    pub fn breakers(&self) -> Option<&CircuitBreakerRegistry> {
        self.breakers.as_ref()
    }

    /// Execute `supplier` under the configured policies and always return
    /// an envelope.
    pub async fn execute<T, F, Fut>(
        &self,
        service_id: &str,
        method: &str,
        path: &str,
        mut supplier: F,
    ) -> ResponseEnvelope<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<ResponseEnvelope<T>, CallError>>,
    {
        let start = Instant::now();

        let (envelope, outcome) = match self.run(service_id, &mut supplier).await {
            Ok(envelope) => (envelope, CallOutcome::Success),
            Err(CallFailure::Rejected(envelope)) => {
                tracing::warn!(
                    service_id = %service_id,
                    path = %path,
                    error_code = envelope.error_code().unwrap_or_default(),
                    "Direct call failed"
                );
                (envelope, CallOutcome::Failure)
            }
            Err(CallFailure::Error(e)) => {
                tracing::error!(service_id = %service_id, path = %path, error = %e, "Direct call error");
                (
                    ResponseEnvelope::from_code(ErrorCode::ServiceCallError, e.to_string()),
                    CallOutcome::Error,
                )
            }
        };

        self.recorder
            .record(service_id, method, path, outcome, start.elapsed());
        envelope
    }

    async fn run<T, F, Fut>(
        &self,
        service_id: &str,
        supplier: &mut F,
    ) -> Result<ResponseEnvelope<T>, CallFailure<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<ResponseEnvelope<T>, CallError>>,
    {
        let max_attempts = self.retry.map_or(1, |r| r.max_attempts);
        let breaker = self.breakers.as_ref().map(|r| r.get(service_id));
        let mut attempt = 0;

        loop {
            attempt += 1;
            let result = match &breaker {
                Some(breaker) => match breaker.call(guard(supplier)).await {
                    Ok(envelope) => Ok(envelope),
                    Err(BreakerError::Inner(failure)) => Err(failure),
                    Err(BreakerError::Open) => Err(CallFailure::Error(CallError::CircuitOpen(
                        service_id.to_string(),
                    ))),
                },
                None => guard(supplier).await,
            };

            match (result, self.retry) {
                (Ok(envelope), _) => return Ok(envelope),
                (Err(failure), Some(retry)) if attempt < max_attempts => {
                    let delay = retry.delay_after(attempt);
                    tracing::info!(
                        service_id = %service_id,
                        attempt,
                        delay = ?delay,
                        reason = %describe(&failure),
                        "Retrying direct call"
                    );
                    tokio::time::sleep(delay).await;
                }
                (Err(failure), _) => return Err(failure),
            }
        }
    }
}

/// One physical attempt, classified.
async fn guard<T, F, Fut>(supplier: &mut F) -> Result<ResponseEnvelope<T>, CallFailure<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<ResponseEnvelope<T>, CallError>>,
{
    match supplier().await {
        Ok(envelope) if envelope.is_success() => Ok(envelope),
        Ok(envelope) => Err(CallFailure::Rejected(envelope)),
        Err(e) => Err(CallFailure::Error(e)),
    }
}

fn describe<T>(failure: &CallFailure<T>) -> String {
    match failure {
        CallFailure::Rejected(envelope) => envelope.error_code().unwrap_or_default().to_string(),
        CallFailure::Error(e) => e.to_string(),
    }
}
