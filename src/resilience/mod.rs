//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Logical call:
//!     → retries.rs (outermost; up to max_attempts sequential attempts, jittered backoff between them)
//!     → circuit_breaker.rs (per service; fails fast while open)
//!     → executor.rs guard (success=false envelopes count as failures)
//! ```
//!
//! # Design Decisions
//! - Retry wraps the breaker; attempts made after it opens fail fast
//! - Business failures and transport failures feed the same decision
//! - Both policies are optional; without them the supplier runs exactly once

pub mod circuit_breaker;
pub mod executor;
pub mod retries;

pub use circuit_breaker::{BreakerSettings, CircuitBreaker, CircuitBreakerRegistry, CircuitState};
pub use executor::{CallFailure, ResilienceExecutor};
pub use retries::RetryPolicy;
