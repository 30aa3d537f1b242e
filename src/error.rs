//! Error types surfaced to proxy clients.

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Message returned when the `url` query parameter is absent.
pub const MISSING_URL_MESSAGE: &str = "Missing URL parameter";

/// Message returned to rate-limited clients.
pub const RATE_LIMITED_MESSAGE: &str = "Too many requests, please try again later.";

/// Errors that end a proxied request.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Missing or malformed target URL.
    #[error("{0}")]
    InvalidRequest(String),

    /// Outbound fetch failed or the upstream answered with a non-success status.
    #[error("{message}")]
    Upstream {
        status: Option<StatusCode>,
        message: String,
    },

    /// Client exceeded its request budget for the current window.
    #[error("Too many requests, please try again later.")]
    RateLimited { retry_after: Duration },
}

impl ProxyError {
    pub fn missing_url() -> Self {
        ProxyError::InvalidRequest(MISSING_URL_MESSAGE.to_string())
    }

    /// Upstream answered, but not with a 2xx.
    pub fn upstream_status(status: StatusCode) -> Self {
        ProxyError::Upstream {
            status: Some(status),
            message: format!("Request failed with status code {}", status.as_u16()),
        }
    }

    /// Upstream never produced a usable response.
    pub fn upstream_failure(message: impl Into<String>) -> Self {
        ProxyError::Upstream {
            status: None,
            message: message.into(),
        }
    }

    /// HTTP status reported to the client.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::Upstream { status, .. } => {
                status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            ProxyError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => ProxyError::upstream_status(status),
            None => ProxyError::upstream_failure(err.to_string()),
        }
    }
}

/// JSON body of every error response: `{ "error": <message> }`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let retry_after = match &self {
            ProxyError::RateLimited { retry_after } => Some(retry_after.as_secs().max(1)),
            _ => None,
        };

        let mut response = (status, Json(ErrorBody { error: self.to_string() })).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_missing_url_renders_client_error() {
        let response = ProxyError::missing_url().into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "error": "Missing URL parameter" })
        );
    }

    #[tokio::test]
    async fn test_upstream_status_is_mirrored() {
        let response = ProxyError::upstream_status(StatusCode::NOT_FOUND).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await["error"],
            "Request failed with status code 404"
        );
    }

    #[test]
    fn test_unknown_upstream_status_is_server_error() {
        let err = ProxyError::upstream_failure("connection refused");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "connection refused");
    }

    #[tokio::test]
    async fn test_rate_limited_sets_retry_after() {
        let response = ProxyError::RateLimited {
            retry_after: Duration::from_secs(42),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
        assert_eq!(body_json(response).await["error"], RATE_LIMITED_MESSAGE);
    }
}
