//! Resilient direct service-to-service calls.
//!
//! Lets one internal service call another service's API directly, bypassing
//! the routing gateway, while keeping request signing, retry with circuit
//! breaking, round-robin address resolution and bounded-cardinality metrics.
//!
//! ```text
//! caller → DirectServiceClient
//!            → discovery (round-robin address)
//!            → security (trace + signed auth headers)
//!            → resilience (retry ⊃ circuit breaker ⊃ attempt)
//!            → http::envelope (decode / reshape)
//!            → observability (one latency sample + one outcome counter)
//!        ← ResponseEnvelope<T>
//! ```

pub mod config;
pub mod discovery;
pub mod error;
pub mod http;
pub mod observability;
pub mod resilience;
pub mod security;

pub use config::DirectCallConfig;
pub use discovery::{AddressResolver, ServiceDirectory, StaticDirectory};
pub use error::{CallError, ErrorCode};
pub use http::{DirectRequest, DirectServiceClient, ResponseEnvelope};
pub use observability::{CallContext, CallOutcome};
