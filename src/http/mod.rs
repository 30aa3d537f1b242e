//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, target URL validation, ProxyRequest)
//!     → forwarder.rs (one upstream request, filtered headers, body stream)
//!     → response.rs (stream passthrough or buffer + HTML rewrite)
//!     → Send to client
//! ```

pub mod forwarder;
pub mod request;
pub mod response;
pub mod server;

pub use forwarder::{Forwarder, ProxyResponse};
pub use request::{ProxyRequest, X_REQUEST_ID};
pub use response::BodyStrategy;
pub use server::{HttpServer, ServerError};
