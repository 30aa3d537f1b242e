//! CORS forwarding proxy library.
//!
//! A single endpoint relays a client's request to the URL given in its `url`
//! query parameter. HTML responses have relative links rewritten to absolute
//! URLs against that target; every other response is streamed through as-is.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod rewrite;
pub mod security;

pub use config::ProxyConfig;
pub use error::ProxyError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
