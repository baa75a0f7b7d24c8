//! Direct-call HTTP layer.
//!
//! # Data Flow
//! ```text
//! Business code
//!     → request.rs (DirectRequest: service, method, path, body, timeout)
//!     → client.rs (gate, validate, resolve, sign, send under resilience)
//!     → envelope.rs (decode {success, data, errorCode, errorMessage}, reshape)
//!     → ResponseEnvelope<T> back to business code
//! ```

pub mod client;
pub mod envelope;
pub mod request;

pub use client::DirectServiceClient;
pub use envelope::{decode_envelope, ResponseEnvelope};
pub use request::DirectRequest;
