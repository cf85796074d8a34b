//! Startup orchestration.
//!
//! # Responsibilities
//! - Pick the configuration source (file, or a single origin from flags)
//! - Build and validate the initial route table
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Single-origin mode is a one-rule catch-all ingress whose global
//!   overrides come from the command line

use std::path::PathBuf;

use thiserror::Error;

use crate::config::loader::{load_routes, ConfigError};
use crate::config::remote::RemoteConfig;
use crate::config::resolver::FlagOverrides;
use crate::config::schema::{AgentConfig, RawRemoteConfig, UnvalidatedIngressRule};
use crate::config::validation::IngressError;

/// Where the initial configuration comes from.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// TOML config file.
    File(PathBuf),
    /// One origin given on the command line.
    SingleOrigin {
        service: Option<String>,
        flags: FlagOverrides,
    },
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid origin: {0}")]
    Ingress(#[from] IngressError),
}

/// Raw configuration for single-origin mode.
pub fn single_origin(service: Option<String>, flags: FlagOverrides) -> RawRemoteConfig {
    RawRemoteConfig {
        origin_request: flags.into_overrides(),
        ingress: vec![UnvalidatedIngressRule {
            service,
            ..Default::default()
        }],
        ..Default::default()
    }
}

/// Build the agent configuration and the initial routes.
pub fn load_initial(source: ConfigSource) -> Result<(AgentConfig, RemoteConfig), StartupError> {
    match source {
        ConfigSource::File(path) => Ok(load_routes(&path)?),
        ConfigSource::SingleOrigin { service, flags } => {
            let agent = AgentConfig {
                routes: single_origin(service, flags),
                ..Default::default()
            };
            let routes = RemoteConfig::from_raw(agent.routes.clone())?;
            Ok((agent, routes))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ProxyType;
    use crate::routing::OriginService;
    use std::time::Duration;

    #[test]
    fn test_single_origin_applies_flags() {
        let flags = FlagOverrides {
            connect_timeout: Some(Duration::from_secs(3)),
            socks5: true,
            ..Default::default()
        };
        let source = ConfigSource::SingleOrigin {
            service: Some("http://localhost:8080".into()),
            flags,
        };

        let (_, routes) = load_initial(source).unwrap();
        assert_eq!(routes.ingress.len(), 1);

        let rule = &routes.ingress.rules[0];
        assert!(rule.is_catch_all());
        assert_eq!(rule.config.connect_timeout, Duration::from_secs(3));
        assert_eq!(rule.config.proxy_type, ProxyType::Socks);
        assert_eq!(rule.config.tls_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_single_origin_bastion_without_service() {
        let flags = FlagOverrides {
            bastion_mode: Some(true),
            ..Default::default()
        };
        let (_, routes) = load_initial(ConfigSource::SingleOrigin { service: None, flags }).unwrap();
        assert_eq!(routes.ingress.rules[0].service, OriginService::Bastion);
    }

    #[test]
    fn test_single_origin_requires_service() {
        let source = ConfigSource::SingleOrigin {
            service: None,
            flags: FlagOverrides::default(),
        };
        assert!(matches!(load_initial(source), Err(StartupError::Ingress(_))));
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let source = ConfigSource::File("/nonexistent/origin-ingress.toml".into());
        assert!(matches!(load_initial(source), Err(StartupError::Config(ConfigError::Io(_)))));
    }
}
