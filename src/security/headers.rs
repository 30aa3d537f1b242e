//! Header manipulation at the proxy boundary.
//!
//! # Responsibilities
//! - Choose which inbound request headers reach the upstream
//! - Strip hop-by-hop and CORS headers from upstream responses
//! - Build the overriding CORS response-header layers

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::CorsConfig;

/// Connection-scoped headers never forwarded in either direction.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Request headers that describe the client hop rather than the target request.
const CLIENT_ONLY: [HeaderName; 4] = [
    header::HOST,
    header::ACCEPT_ENCODING,
    header::ORIGIN,
    header::REFERER,
];

/// Upstream CORS headers; the proxy's own policy replaces them.
const UPSTREAM_CORS: [HeaderName; 2] = [
    header::ACCESS_CONTROL_ALLOW_ORIGIN,
    header::ACCESS_CONTROL_ALLOW_HEADERS,
];

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(name)
}

/// Headers from the inbound request that are sent to the target.
pub fn outbound_request_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound {
        if is_hop_by_hop(name) || CLIENT_ONLY.contains(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}

/// Upstream response headers that are copied onto the client response.
///
/// `HeaderName` is always lowercase, so the CORS comparison is case-insensitive.
pub fn forwarded_response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(upstream.len());
    for (name, value) in upstream {
        if is_hop_by_hop(name) || UPSTREAM_CORS.contains(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}

/// CORS values resolved from configuration.
#[derive(Debug, Clone)]
pub struct CorsHeaders {
    pub allow_origin: HeaderValue,
    pub allow_headers: HeaderValue,
}

impl CorsHeaders {
    pub fn from_config(config: &CorsConfig) -> Result<Self, header::InvalidHeaderValue> {
        Ok(Self {
            allow_origin: HeaderValue::from_str(&config.allow_origin)?,
            allow_headers: HeaderValue::from_str(&config.allow_headers)?,
        })
    }

    /// Layers that set both CORS headers on every response, replacing any
    /// value already present.
    pub fn layers(
        &self,
    ) -> (
        SetResponseHeaderLayer<HeaderValue>,
        SetResponseHeaderLayer<HeaderValue>,
    ) {
        (
            SetResponseHeaderLayer::overriding(
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                self.allow_origin.clone(),
            ),
            SetResponseHeaderLayer::overriding(
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                self.allow_headers.clone(),
            ),
        )
    }
}
