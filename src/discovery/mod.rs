//! Service discovery and load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! call(service_id, ...)
//!     → ServiceDirectory (logical name → current address list)
//!     → round_robin.rs (rotate through addresses, per-service cursor)
//!     → one base address, or None (SERVICE_NOT_FOUND)
//! ```
//!
//! # Design Decisions
//! - The directory is an external collaborator behind a trait; this crate only reads it
//! - Every call re-resolves; there is no health awareness
//! - Cursors live in one resolver instance, never in statics

pub mod directory;
pub mod round_robin;

pub use directory::StaticDirectory;
pub use round_robin::AddressResolver;

/// Source of reachable addresses for a logical service name.
pub trait ServiceDirectory: Send + Sync + std::fmt::Debug {
    /// Current addresses for `service`. Empty when the service is unknown.
    fn addresses(&self, service: &str) -> Vec<String>;
}
