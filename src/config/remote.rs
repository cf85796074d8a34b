//! Remotely managed configuration.
//!
//! A payload carries global origin overrides, the ingress rules and the
//! routing-mode block. Decoding is atomic: either every rule validates and a
//! complete `RemoteConfig` comes back, or the caller gets an error.

use thiserror::Error;

use crate::config::resolver::resolve;
use crate::config::schema::{OriginRequestConfig, RawRemoteConfig, WarpRoutingConfig};
use crate::config::validation::{validate_ingress, IngressError};
use crate::routing::Ingress;

/// Errors raised while decoding a remote payload.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload does not fit the expected schema.
    #[error("malformed remote configuration: {0}")]
    Malformed(#[from] serde_json::Error),

    /// An ingress rule failed validation.
    #[error("invalid ingress rules: {0}")]
    Ingress(#[from] IngressError),
}

/// Validated route table plus routing mode.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub ingress: Ingress,
    pub warp_routing: WarpRoutingConfig,
}

impl RemoteConfig {
    /// Validate an already deserialized payload.
    ///
    /// The global overrides are resolved over the built-in defaults and become
    /// the baseline for every rule.
    pub fn from_raw(raw: RawRemoteConfig) -> Result<Self, IngressError> {
        let defaults = resolve(&OriginRequestConfig::default(), &raw.origin_request, None);
        let ingress = validate_ingress(&raw.ingress, &defaults)?;

        Ok(Self {
            ingress,
            warp_routing: raw.warp_routing,
        })
    }
}

/// Decode a JSON payload into a validated `RemoteConfig`.
pub fn decode(payload: &[u8]) -> Result<RemoteConfig, DecodeError> {
    let raw: RawRemoteConfig = serde_json::from_slice(payload)?;
    Ok(RemoteConfig::from_raw(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_decode_resolves_global_and_route_overrides() {
        let payload = br#"{
            "originRequest": {"connectTimeout": 10, "noTLSVerify": true},
            "ingress": [
                {"hostname": "app.example.com", "service": "https://localhost:8443",
                 "originRequest": {"connectTimeout": "2s"}},
                {"service": "http_status:404"}
            ],
            "warp-routing": {"enabled": true}
        }"#;

        let config = decode(payload).unwrap();
        assert_eq!(config.ingress.len(), 2);
        assert!(config.warp_routing.enabled());

        let specific = &config.ingress.rules[0].config;
        assert_eq!(specific.connect_timeout, Duration::from_secs(2));
        assert!(specific.no_tls_verify);
        assert_eq!(specific.tls_timeout, Duration::from_secs(10));

        let fallback = &config.ingress.rules[1].config;
        assert_eq!(fallback.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.ingress.defaults.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_malformed_payload() {
        assert!(matches!(decode(b"{not json"), Err(DecodeError::Malformed(_))));
        assert!(matches!(
            decode(br#"{"ingress": {"service": "x"}}"#),
            Err(DecodeError::Malformed(_))
        ));
        assert!(matches!(
            decode(br#"{"originRequest": {"proxyPort": 70000}}"#),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn test_missing_service_fails_whole_decode() {
        let payload = br#"{
            "ingress": [
                {"hostname": "app.example.com", "service": "http://localhost:8000"},
                {"hostname": "broken.example.com"},
                {"service": "http_status:404"}
            ]
        }"#;

        match decode(payload) {
            Err(DecodeError::Ingress(IngressError::MissingService { rule })) => assert_eq!(rule, 2),
            other => panic!("expected missing service error, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_ip_rule_does_not_fail_decode() {
        let payload = br#"{
            "originRequest": {"ipRules": [
                {"prefix": "10.0.0.0/8", "ports": [], "allow": true},
                {"prefix": "not-a-cidr", "ports": [80], "allow": false}
            ]},
            "ingress": [{"service": "socks-proxy"}]
        }"#;

        let config = decode(payload).unwrap();
        assert_eq!(config.ingress.defaults.ip_rules.len(), 1);
        assert_eq!(config.ingress.rules[0].config.ip_rules.len(), 1);
    }

    #[test]
    fn test_empty_payload_yields_empty_config() {
        let config = decode(b"{}").unwrap();
        assert!(config.ingress.is_empty());
        assert!(!config.warp_routing.enabled());
        assert_eq!(config.ingress.defaults, OriginRequestConfig::default());
    }
}
