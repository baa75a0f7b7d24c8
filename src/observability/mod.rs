//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every logical call produces:
//!     → logging.rs (structured log events with service_id / path / trace_id)
//!     → metrics.rs (one counter increment + one latency sample)
//!     → tracing.rs (trace id carried in an explicit CallContext)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Endpoint labels are templated so business paths cannot explode cardinality
//! - Metrics are optional; disabling them never changes call results
//! - Trace ids are passed explicitly, never through thread-locals

pub mod logging;
pub mod metrics;
pub mod tracing;

pub use self::metrics::{endpoint_template, CallOutcome, CallRecorder};
pub use self::tracing::{CallContext, TraceContext};
