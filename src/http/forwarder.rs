//! Outbound request forwarding.
//!
//! # Responsibilities
//! - Issue exactly one upstream request per inbound request (no retries)
//! - Reproduce the inbound method, filtered headers and streamed body
//! - Turn connection errors, timeouts and non-2xx statuses into `ProxyError`
//! - Hand back the upstream body as an unbuffered stream

use std::time::Duration;

use axum::body::Bytes;
use axum::http::{header, HeaderMap, StatusCode};
use futures_util::stream::{BoxStream, StreamExt};

use crate::config::UpstreamConfig;
use crate::error::ProxyError;
use crate::http::request::ProxyRequest;
use crate::security::headers::forwarded_response_headers;

/// Upstream body as it arrives from the network.
pub type BodyStream = BoxStream<'static, Result<Bytes, reqwest::Error>>;

/// A successful upstream response, headers already filtered for the client.
pub struct ProxyResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub content_type: Option<String>,
    pub body: BodyStream,
}

impl std::fmt::Debug for ProxyResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Relays requests to arbitrary targets.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    request_timeout: Duration,
}

impl Forwarder {
    pub fn new(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects));

        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }

        Ok(Self {
            client: builder.build()?,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    /// Send `request` upstream and wait for the response headers.
    ///
    /// The timeout covers connecting, sending and receiving headers; the body
    /// stream is not time-limited.
    pub async fn forward(&self, request: ProxyRequest) -> Result<ProxyResponse, ProxyError> {
        let ProxyRequest {
            method,
            target,
            headers,
            body,
        } = request;

        let mut outbound = self.client.request(method, target).headers(headers);
        if let Some(body) = body {
            outbound = outbound.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let response = tokio::time::timeout(self.request_timeout, outbound.send())
            .await
            .map_err(|_| {
                ProxyError::upstream_failure(format!(
                    "timeout of {}s exceeded",
                    self.request_timeout.as_secs()
                ))
            })??;

        let status = response.status();
        if !status.is_success() {
            return Err(ProxyError::upstream_status(status));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(ProxyResponse {
            status,
            headers: forwarded_response_headers(response.headers()),
            content_type,
            body: response.bytes_stream().boxed(),
        })
    }
}
