//! Upstream response → client response.
//!
//! Every response takes one of two paths:
//! - `Passthrough`: the upstream byte stream becomes the client body as it
//!   arrives, so backpressure flows end to end and nothing is buffered.
//! - `Rewrite`: `text/html` bodies are collected (up to a bound), their links
//!   made absolute, and the serialized document is sent with a fresh length.

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap},
    response::Response,
};
use futures_util::stream::{self, StreamExt};
use url::Url;

use crate::config::RewriteConfig;
use crate::error::ProxyError;
use crate::http::forwarder::{BodyStream, ProxyResponse};
use crate::observability::metrics;
use crate::rewrite::RewriteContext;

/// How the upstream body reaches the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyStrategy {
    Passthrough,
    Rewrite,
}

impl BodyStrategy {
    pub fn select(content_type: Option<&str>, headers: &HeaderMap) -> Self {
        if is_html(content_type) && !is_content_encoded(headers) {
            BodyStrategy::Rewrite
        } else {
            BodyStrategy::Passthrough
        }
    }
}

/// Case-insensitive `text/html` substring match.
pub fn is_html(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html"))
}

fn is_content_encoded(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::CONTENT_ENCODING)
        .iter()
        .any(|v| !v.as_bytes().eq_ignore_ascii_case(b"identity"))
}

enum Buffered {
    Complete(Bytes),
    /// Limit exceeded: chunks read so far followed by the rest of the body.
    Oversized(BodyStream),
}

async fn buffer_html(mut body: BodyStream, limit: usize) -> Result<Buffered, ProxyError> {
    let mut chunks: Vec<Bytes> = Vec::new();
    let mut total = 0usize;

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| ProxyError::upstream_failure(e.to_string()))?;
        total += chunk.len();
        chunks.push(chunk);

        if total > limit {
            let replay = stream::iter(chunks.into_iter().map(Ok::<Bytes, reqwest::Error>));
            return Ok(Buffered::Oversized(replay.chain(body).boxed()));
        }
    }

    let mut html = Vec::with_capacity(total);
    for chunk in chunks {
        html.extend_from_slice(&chunk);
    }
    Ok(Buffered::Complete(Bytes::from(html)))
}

/// Build the client response for a successful upstream response.
pub async fn into_client_response(
    upstream: ProxyResponse,
    target: &Url,
    config: &RewriteConfig,
) -> Result<Response, ProxyError> {
    let ProxyResponse {
        status,
        mut headers,
        content_type,
        body,
    } = upstream;

    let body = match BodyStrategy::select(content_type.as_deref(), &headers) {
        BodyStrategy::Passthrough => Body::from_stream(body),
        BodyStrategy::Rewrite => match buffer_html(body, config.max_html_bytes).await? {
            Buffered::Complete(html) => {
                headers.remove(header::CONTENT_LENGTH);
                let context = RewriteContext::new(target.clone())
                    .with_memory_limit(config.max_parser_memory_bytes);
                Body::from(context.rewrite_or_passthrough(html))
            }
            Buffered::Oversized(stream) => {
                tracing::warn!(
                    url = %target,
                    limit = config.max_html_bytes,
                    "HTML body exceeds rewrite limit, passing through unmodified"
                );
                metrics::record_rewrite("oversized");
                Body::from_stream(stream)
            }
        },
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}
