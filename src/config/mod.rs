//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → DirectCallConfig (validated, immutable)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → client settings and static directory swapped atomically
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - A config that fails validation never replaces the running one
//! - Reload covers the directory and the client's gate, secret, source name,
//!   signing policy and timeout; retry, breaker and metrics settings need a restart

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    CircuitBreakerConfig, DirectCallConfig, ObservabilityConfig, RetryConfig, SigningConfig,
    SigningFailurePolicy,
};
