//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::remote::RemoteConfig;
use crate::config::schema::AgentConfig;
use crate::config::validation::IngressError;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {0}")]
    Ingress(#[from] IngressError),
}

/// Load an agent configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AgentConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: AgentConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Load a TOML file and validate its routes.
pub fn load_routes(path: &Path) -> Result<(AgentConfig, RemoteConfig), ConfigError> {
    let config = load_config(path)?;
    let routes = RemoteConfig::from_raw(config.routes.clone())?;
    Ok((config, routes))
}
