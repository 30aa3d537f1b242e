//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy handler on the configured route
//! - Wire up middleware (tracing, request ID, CORS, rate limiting)
//! - Bind server to listener and shut down gracefully
//! - Forward requests and dispatch responses (stream or rewrite)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header::InvalidHeaderValue, Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{ProxyConfig, RewriteConfig};
use crate::error::{ErrorBody, ProxyError};
use crate::http::forwarder::Forwarder;
use crate::http::request::{request_id, MakeRequestUuid, ProxyRequest, X_REQUEST_ID};
use crate::http::response::into_client_response;
use crate::observability::metrics;
use crate::security::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::security::CorsHeaders;

/// Errors that prevent the server from starting or serving.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid CORS header value: {0}")]
    InvalidHeader(#[from] InvalidHeaderValue),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub forwarder: Forwarder,
    pub rewrite: RewriteConfig,
}

/// HTTP server for the CORS proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    limiter: Option<Arc<RateLimiter>>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        let state = AppState {
            forwarder: Forwarder::new(&config.upstream)?,
            rewrite: config.rewrite.clone(),
        };
        let cors = CorsHeaders::from_config(&config.cors)?;
        let limiter = config
            .rate_limit
            .enabled
            .then(|| Arc::new(RateLimiter::new(&config.rate_limit)));

        let router = Self::build_router(&config, state, &cors, limiter.clone());
        Ok(Self {
            router,
            config,
            limiter,
        })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Outermost first: request ID, trace, request ID propagation, CORS,
    /// rate limiter, handler.
    fn build_router(
        config: &ProxyConfig,
        state: AppState,
        cors: &CorsHeaders,
        limiter: Option<Arc<RateLimiter>>,
    ) -> Router {
        let mut router = Router::new()
            .route(&config.proxy.route, any(proxy_handler))
            .fallback(not_found)
            .with_state(state);

        if let Some(limiter) = limiter {
            router = router.layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
        }

        let (allow_origin, allow_headers) = cors.layers();
        router
            .layer(allow_headers)
            .layer(allow_origin)
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(X_REQUEST_ID.clone(), MakeRequestUuid))
    }

    /// The fully layered router, for serving with a custom connector.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            route = %self.config.proxy.route,
            rate_limit = self.limiter.is_some(),
            "HTTP server starting"
        );

        if let Some(limiter) = &self.limiter {
            limiter.clone().spawn_sweeper(shutdown.resubscribe());
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Main proxy handler: validate, forward, dispatch.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(request.headers());
    let method = request.method().to_string();

    let response = match proxy(&state, request, &request_id).await {
        Ok(response) => response,
        Err(e) => {
            match &e {
                ProxyError::InvalidRequest(message) => {
                    tracing::debug!(request_id = %request_id, error = %message, "Rejected request");
                }
                _ => {
                    tracing::error!(request_id = %request_id, status = %e.status(), error = %e, "Upstream error");
                }
            }
            e.into_response()
        }
    };

    metrics::record_request(&method, response.status().as_u16(), start_time);
    response
}

async fn proxy(
    state: &AppState,
    request: Request<Body>,
    request_id: &str,
) -> Result<Response, ProxyError> {
    let proxied = ProxyRequest::from_inbound(request)?;
    let target = proxied.target.clone();

    tracing::debug!(
        request_id = %request_id,
        method = %proxied.method,
        url = %target,
        "Proxying request"
    );

    let upstream = state.forwarder.forward(proxied).await?;
    tracing::debug!(
        request_id = %request_id,
        status = %upstream.status,
        content_type = ?upstream.content_type,
        "Upstream responded"
    );

    into_client_response(upstream, &target, &state.rewrite).await
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: "Not found".to_string(),
        }),
    )
}
