//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable holding the listen port.
pub const PORT_ENV: &str = "PORT";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env { name: &'static str, value: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env { name, value } => {
                write!(f, "Invalid value for {}: {:?}", name, value)
            }
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parse configuration from TOML text. Missing sections fall back to defaults.
pub fn parse_config(content: &str) -> Result<ProxyConfig, ConfigError> {
    toml::from_str(content).map_err(ConfigError::Parse)
}

/// Load configuration from a TOML file, without validating it.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

/// Apply environment overrides on top of file/default values.
///
/// `lookup` is injected so callers (and tests) decide where variables come from.
pub fn apply_env_overrides<F>(config: &mut ProxyConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(PORT_ENV) {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            config.listener.port = trimmed.parse().map_err(|_| ConfigError::Env {
                name: PORT_ENV,
                value: value.clone(),
            })?;
        }
    }
    Ok(())
}

/// Resolve the effective configuration: defaults, optional file, environment,
/// then an explicit port override. The result is validated.
pub fn resolve_config(
    path: Option<&Path>,
    port_override: Option<u16>,
) -> Result<ProxyConfig, ConfigError> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;

    if let Some(port) = port_override {
        config.listener.port = port;
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
