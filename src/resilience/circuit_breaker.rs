//! Circuit breaker for callee protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: callee assumed down, calls fail fast
//! - Half-Open: one probe call tests whether the callee recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= threshold
//! Open → Half-Open: after open_duration
//! Half-Open → Closed: probe succeeds
//! Half-Open → Open: probe fails
//! ```
//!
//! # Design Decisions
//! - One breaker per service name, shared by every call to that service
//! - A probe that never reports back is superseded after another open_duration
//! - Every transition starts a new generation; a call only reports against the
//!   generation that admitted it, so late results from before a transition
//!   are dropped

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::config::CircuitBreakerConfig;

/// Externally visible breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
enum State {
    Closed,
    OpenUntil(Instant),
    HalfOpen { probe_started: Instant },
}

#[derive(Debug)]
struct Inner {
    state: State,
    consecutive_failures: u32,
    generation: u64,
}

impl Inner {
    fn transition(&mut self, state: State) {
        self.state = state;
        self.generation = self.generation.wrapping_add(1);
    }
}

/// Result of a call made through a breaker.
#[derive(Debug)]
pub enum BreakerError<E> {
    /// The breaker rejected the call without running it.
    Open,
    /// The call ran and failed.
    Inner(E),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSettings {
    pub failure_threshold: u32,
    pub open_duration: Duration,
}

impl BreakerSettings {
    pub fn from_config(config: &CircuitBreakerConfig) -> Option<Self> {
        config.enabled.then(|| Self {
            failure_threshold: config.failure_threshold.max(1),
            open_duration: Duration::from_millis(config.open_duration_ms),
        })
    }
}

#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    settings: BreakerSettings,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, settings: BreakerSettings) -> Self {
        Self {
            name: name.into(),
            settings,
            inner: Mutex::new(Inner {
                state: State::Closed,
                consecutive_failures: 0,
                generation: 0,
            }),
        }
    }

    pub fn state(&self) -> CircuitState {
        match self.lock().state {
            State::Closed => CircuitState::Closed,
            State::OpenUntil(_) => CircuitState::Open,
            State::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }

    /// Run `fut` if the breaker admits it, recording the outcome.
    /// A rejected future is dropped without being polled.
    pub async fn call<T, E, Fut>(&self, fut: Fut) -> Result<T, BreakerError<E>>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        let Some(generation) = self.try_acquire() else {
            tracing::debug!(service_id = %self.name, "Circuit open, failing fast");
            return Err(BreakerError::Open);
        };
        match fut.await {
            Ok(value) => {
                self.on_success(generation);
                Ok(value)
            }
            Err(e) => {
                self.on_failure(generation);
                Err(BreakerError::Inner(e))
            }
        }
    }

    /// Admit a call, returning the generation it belongs to.
    fn try_acquire(&self) -> Option<u64> {
        let mut inner = self.lock();
        let now = Instant::now();
        match inner.state {
            State::Closed => {}
            State::OpenUntil(until) if now < until => return None,
            State::OpenUntil(_) => {
                inner.transition(State::HalfOpen { probe_started: now });
                tracing::info!(service_id = %self.name, "Circuit half-open, sending probe");
            }
            State::HalfOpen { probe_started } => {
                if now.duration_since(probe_started) < self.settings.open_duration {
                    return None;
                }
                inner.transition(State::HalfOpen { probe_started: now });
            }
        }
        Some(inner.generation)
    }

    fn on_success(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.generation != generation {
            tracing::debug!(service_id = %self.name, "Ignoring success from an earlier circuit state");
            return;
        }
        inner.consecutive_failures = 0;
        if matches!(inner.state, State::HalfOpen { .. }) {
            inner.transition(State::Closed);
            tracing::info!(service_id = %self.name, "Circuit closed");
        }
    }

    fn on_failure(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.generation != generation {
            tracing::debug!(service_id = %self.name, "Ignoring failure from an earlier circuit state");
            return;
        }
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        let trip = match inner.state {
            State::HalfOpen { .. } => true,
            State::Closed => inner.consecutive_failures >= self.settings.failure_threshold,
            State::OpenUntil(_) => false,
        };
        if trip {
            inner.transition(State::OpenUntil(Instant::now() + self.settings.open_duration));
            tracing::warn!(
                service_id = %self.name,
                failures = inner.consecutive_failures,
                open_ms = self.settings.open_duration.as_millis() as u64,
                "Circuit opened"
            );
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Hands out one breaker per service name.
#[derive(Debug)]
pub struct CircuitBreakerRegistry {
    settings: BreakerSettings,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl CircuitBreakerRegistry {
    pub fn new(settings: BreakerSettings) -> Self {
        Self {
            settings,
            breakers: DashMap::new(),
        }
    }

    pub fn get(&self, service: &str) -> Arc<CircuitBreaker> {
        if let Some(b) = self.breakers.get(service) {
            return b.value().clone();
        }
        self.breakers
            .entry(service.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(service, self.settings)))
            .value()
            .clone()
    }
}
