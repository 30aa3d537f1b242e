//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and values that
//! must be usable as HTTP header values. All errors are collected, not just
//! the first one.

use std::net::SocketAddr;

use axum::http::HeaderValue;

use crate::config::schema::ProxyConfig;

/// Longest accepted rate-limit window (one day).
pub const MAX_WINDOW_SECS: u64 = 24 * 60 * 60;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut fail = |field: &'static str, message: String| {
        errors.push(ValidationError { field, message });
    };

    if !config.proxy.route.starts_with('/') {
        fail("proxy.route", format!("must start with '/', got {:?}", config.proxy.route));
    }

    if config.upstream.request_timeout_secs == 0 {
        fail("upstream.request_timeout_secs", "must be greater than 0".into());
    }
    if config.upstream.connect_timeout_secs == 0 {
        fail("upstream.connect_timeout_secs", "must be greater than 0".into());
    }

    if config.rewrite.max_html_bytes == 0 {
        fail("rewrite.max_html_bytes", "must be greater than 0".into());
    }
    if config.rewrite.max_parser_memory_bytes == 0 {
        fail("rewrite.max_parser_memory_bytes", "must be greater than 0".into());
    }

    if config.rate_limit.enabled {
        if config.rate_limit.window_secs == 0 {
            fail("rate_limit.window_secs", "must be greater than 0".into());
        } else if config.rate_limit.window_secs > MAX_WINDOW_SECS {
            fail(
                "rate_limit.window_secs",
                format!("must be at most {}, got {}", MAX_WINDOW_SECS, config.rate_limit.window_secs),
            );
        }
        if config.rate_limit.max_requests == 0 {
            fail("rate_limit.max_requests", "must be greater than 0".into());
        }
    }

    if HeaderValue::from_str(&config.cors.allow_origin).is_err() {
        fail("cors.allow_origin", "is not a valid header value".into());
    }
    if HeaderValue::from_str(&config.cors.allow_headers).is_err() {
        fail("cors.allow_headers", "is not a valid header value".into());
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        fail(
            "observability.metrics_address",
            format!("invalid socket address {:?}", config.observability.metrics_address),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = ProxyConfig::default();
        config.proxy.route = "get".into();
        config.rate_limit.window_secs = 0;
        config.rate_limit.max_requests = 0;
        config.cors.allow_origin = "bad\nvalue".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "proxy.route",
                "rate_limit.window_secs",
                "rate_limit.max_requests",
                "cors.allow_origin",
            ]
        );
    }

    #[test]
    fn test_window_longer_than_a_day_is_rejected() {
        let mut config = ProxyConfig::default();
        config.rate_limit.window_secs = MAX_WINDOW_SECS;
        assert!(validate_config(&config).is_ok());

        config.rate_limit.window_secs = u64::MAX;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "rate_limit.window_secs");
    }

    #[test]
    fn test_zero_parser_memory_is_rejected() {
        let mut config = ProxyConfig::default();
        config.rewrite.max_parser_memory_bytes = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "rewrite.max_parser_memory_bytes");
    }

    #[test]
    fn test_disabled_rate_limit_skips_window_checks() {
        let mut config = ProxyConfig::default();
        config.rate_limit.enabled = false;
        config.rate_limit.window_secs = 0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = ProxyConfig::default();
        config.observability.metrics_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "observability.metrics_address");
    }
}
