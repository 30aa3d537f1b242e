//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the CORS proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (host, port).
    pub listener: ListenerConfig,

    /// Inbound proxy endpoint.
    pub proxy: EndpointConfig,

    /// Outbound request settings.
    pub upstream: UpstreamConfig,

    /// HTML link rewriting.
    pub rewrite: RewriteConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// CORS headers added to every response.
    pub cors: CorsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub host: String,

    /// TCP port. Overridden by `PORT` and `--port`.
    pub port: u16,
}

impl ListenerConfig {
    /// `host:port` string suitable for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

/// The single inbound route.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Path the proxy handler is mounted on.
    pub route: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            route: "/get".to_string(),
        }
    }
}

/// Outbound HTTP client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Time allowed until upstream response headers arrive.
    pub request_timeout_secs: u64,

    /// TCP/TLS connect timeout.
    pub connect_timeout_secs: u64,

    /// Maximum redirects followed before giving up.
    pub max_redirects: usize,

    /// Honor HTTP_PROXY / HTTPS_PROXY from the environment.
    pub use_system_proxy: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            max_redirects: 5,
            use_system_proxy: true,
        }
    }
}

/// HTML rewriting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Largest HTML body buffered for rewriting. Bigger documents pass through.
    pub max_html_bytes: usize,

    /// Memory the HTML parser may hold for partially read markup. Exceeding
    /// it aborts the rewrite and the original body is sent instead.
    pub max_parser_memory_bytes: usize,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            max_html_bytes: 10 * 1024 * 1024, // 10MB
            max_parser_memory_bytes: 1024 * 1024, // 1MB
        }
    }
}

/// Fixed-window rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Window length in seconds.
    pub window_secs: u64,

    /// Maximum requests per client per window.
    pub max_requests: u32,

    /// Number of reverse proxies in front of this service whose
    /// X-Forwarded-For entries are trusted when identifying the client.
    ///
    /// The default of 1 assumes exactly one reverse proxy sits in front and
    /// appends the real client address. Set it to 0 when clients connect
    /// directly, otherwise a client can pick its own rate-limit key by
    /// sending a forged X-Forwarded-For.
    pub trusted_proxy_hops: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_secs: 60,
            max_requests: 50,
            trusted_proxy_hops: 1,
        }
    }
}

/// CORS response headers.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Value of `Access-Control-Allow-Origin`.
    pub allow_origin: String,

    /// Value of `Access-Control-Allow-Headers`.
    pub allow_headers: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origin: "*".to_string(),
            allow_headers: "Origin, X-Requested-With, Content-Type, Accept".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
