//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (schema.rs)
//!     → optional TOML file (loader.rs, --config)
//!     → PORT environment variable (loader.rs)
//!     → --port CLI flag
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable, cloned into subsystems)
//! ```
//!
//! # Design Decisions
//! - All fields have defaults; running with no file reproduces the original service
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{resolve_config, ConfigError};
pub use schema::{
    CorsConfig, EndpointConfig, ListenerConfig, ObservabilityConfig, ProxyConfig,
    RateLimitConfig, RewriteConfig, UpstreamConfig,
};
