//! Inbound request handling.
//!
//! # Responsibilities
//! - Generate a request ID (UUID v4) when the client sent none
//! - Extract and validate the target URL from the `url` query parameter
//! - Turn the inbound request into a `ProxyRequest` for the forwarder

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, Request},
};
use tower_http::request_id::{MakeRequestId, RequestId};
use url::Url;
use uuid::Uuid;

use crate::error::ProxyError;
use crate::security::headers::outbound_request_headers;

pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Query parameter carrying the target URL.
pub const URL_PARAM: &str = "url";

/// Issues UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let value = HeaderValue::from_str(&Uuid::new_v4().to_string()).ok()?;
        Some(RequestId::new(value))
    }
}

/// Request ID set by the request-id layer, or "unknown".
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// A request to be relayed to `target`.
#[derive(Debug)]
pub struct ProxyRequest {
    pub method: Method,
    pub target: Url,
    pub headers: HeaderMap,
    /// `None` when the inbound request declared no body.
    pub body: Option<Body>,
}

impl ProxyRequest {
    /// Build from an inbound request, validating the `url` query parameter.
    pub fn from_inbound(request: Request<Body>) -> Result<Self, ProxyError> {
        let (parts, body) = request.into_parts();
        let target = target_url(parts.uri.query())?;

        Ok(Self {
            body: declares_body(&parts.headers).then_some(body),
            method: parts.method,
            target,
            headers: outbound_request_headers(&parts.headers),
        })
    }
}

/// Whether inbound headers announce a non-empty body.
fn declares_body(headers: &HeaderMap) -> bool {
    if headers.contains_key(header::TRANSFER_ENCODING) {
        return true;
    }
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .is_some_and(|len| len > 0)
}

/// Parse the target URL out of a raw query string.
///
/// The target must be absolute, carry a host, and use http or https.
pub fn target_url(query: Option<&str>) -> Result<Url, ProxyError> {
    let raw = query
        .and_then(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .find(|(key, _)| key == URL_PARAM)
                .map(|(_, value)| value.into_owned())
        })
        .filter(|value| !value.is_empty())
        .ok_or_else(ProxyError::missing_url)?;

    let url = Url::parse(&raw)
        .map_err(|e| ProxyError::InvalidRequest(format!("Invalid URL parameter: {}", e)))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ProxyError::InvalidRequest(format!(
                "Unsupported URL scheme: {}",
                other
            )))
        }
    }

    if !url.has_host() {
        return Err(ProxyError::InvalidRequest(
            "Invalid URL parameter: missing host".to_string(),
        ));
    }

    Ok(url)
}
