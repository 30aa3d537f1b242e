//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → headers.rs (CORS headers set on the way out, always overriding)
//!     → rate_limit.rs (fixed window per client address)
//!     → proxy handler
//! ```
//!
//! # Design Decisions
//! - CORS layer sits outside the limiter so 429 responses carry CORS headers too
//! - Rejected requests never reach the forwarder

pub mod headers;
pub mod rate_limit;

pub use headers::CorsHeaders;
pub use rate_limit::{RateLimitDecision, RateLimiter};
