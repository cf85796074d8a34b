//! Ingress rule validation.
//!
//! # Responsibilities
//! - Resolve each rule's origin settings against the global baseline
//! - Parse the target service
//! - Check hostname and path patterns
//! - Enforce catch-all placement (only, and always, the last rule)
//!
//! # Design Decisions
//! - All-or-nothing: the first bad rule rejects the whole batch
//! - Rules are numbered from 1 in error messages
//! - Pure function: rules + baseline → Result<Ingress, IngressError>

use thiserror::Error;
use url::Url;

use crate::config::resolver::resolve;
use crate::config::schema::{OriginRequestConfig, UnvalidatedIngressRule};
use crate::routing::matcher::PathMatcher;
use crate::routing::{Ingress, IngressRule, OriginService};

/// Reasons an ingress rule is rejected.
#[derive(Debug, Clone, Error)]
pub enum IngressError {
    #[error("rule #{rule} has no service; set one or enable bastion mode")]
    MissingService { rule: usize },

    #[error("rule #{rule}: {service:?} is not a valid service: {reason}")]
    InvalidService {
        rule: usize,
        service: String,
        reason: String,
    },

    #[error("rule #{rule}: hostname {hostname:?} must not contain a port")]
    HostnameContainsPort { rule: usize, hostname: String },

    #[error("rule #{rule}: hostname {hostname:?} may only use '*' as its whole first label")]
    BadWildcard { rule: usize, hostname: String },

    #[error("rule #{rule}: path {path:?} is not a valid regex: {source}")]
    InvalidPath {
        rule: usize,
        path: String,
        #[source]
        source: regex::Error,
    },

    #[error("rule #{rule} matches every request, but only the last rule may do that")]
    CatchAllNotLast { rule: usize },

    #[error("the last rule must match every request (no hostname or \"*\", and no path)")]
    LastRuleNotCatchAll,
}

/// Validate rules against `defaults`, which already carry the global overrides.
pub fn validate_ingress(
    rules: &[UnvalidatedIngressRule],
    defaults: &OriginRequestConfig,
) -> Result<Ingress, IngressError> {
    let mut validated = Vec::with_capacity(rules.len());

    for (index, raw) in rules.iter().enumerate() {
        let rule = index + 1;
        let is_last = rule == rules.len();

        // The baseline already holds the global layer, so the rule's own
        // overrides are the only layer left to apply.
        let config = resolve(defaults, &raw.origin_request, None);

        let service = parse_service(rule, raw.service.as_deref(), config.bastion_mode)?;

        let hostname = raw.hostname.clone().unwrap_or_default();
        validate_hostname(rule, &hostname)?;

        let path = match raw.path.as_deref() {
            Some(p) if !p.is_empty() => Some(PathMatcher::new(p).map_err(|source| {
                IngressError::InvalidPath {
                    rule,
                    path: p.to_string(),
                    source,
                }
            })?),
            _ => None,
        };

        let ingress_rule = IngressRule::new(hostname, path, service, config);
        match (ingress_rule.is_catch_all(), is_last) {
            (true, false) => return Err(IngressError::CatchAllNotLast { rule }),
            (false, true) => return Err(IngressError::LastRuleNotCatchAll),
            _ => {}
        }

        validated.push(ingress_rule);
    }

    Ok(Ingress {
        rules: validated,
        defaults: defaults.clone(),
    })
}

fn validate_hostname(rule: usize, hostname: &str) -> Result<(), IngressError> {
    if hostname.contains(':') {
        return Err(IngressError::HostnameContainsPort {
            rule,
            hostname: hostname.to_string(),
        });
    }

    let wildcard_ok = match hostname.rfind('*') {
        None => true,
        Some(0) => hostname == "*" || hostname.starts_with("*."),
        Some(_) => false,
    };
    if !wildcard_ok {
        return Err(IngressError::BadWildcard {
            rule,
            hostname: hostname.to_string(),
        });
    }

    Ok(())
}

fn parse_service(rule: usize, service: Option<&str>, bastion_mode: bool) -> Result<OriginService, IngressError> {
    let raw = match service {
        None | Some("") if bastion_mode => return Ok(OriginService::Bastion),
        None | Some("") => return Err(IngressError::MissingService { rule }),
        Some(raw) => raw,
    };

    let invalid = |reason: &str| IngressError::InvalidService {
        rule,
        service: raw.to_string(),
        reason: reason.to_string(),
    };

    if bastion_mode && raw != "bastion" {
        return Err(invalid("bastion mode is enabled for this rule; remove the service or set it to \"bastion\""));
    }

    if let Some(path) = raw.strip_prefix("unix+tls:") {
        return unix_service(path, true).ok_or_else(|| invalid("missing socket path"));
    }
    if let Some(path) = raw.strip_prefix("unix:") {
        return unix_service(path, false).ok_or_else(|| invalid("missing socket path"));
    }

    if let Some(code) = raw.strip_prefix("http_status:") {
        return match code.parse::<u16>() {
            Ok(code) if (100..=599).contains(&code) => Ok(OriginService::HttpStatus(code)),
            _ => Err(invalid("status code must be a number between 100 and 599")),
        };
    }

    match raw {
        "hello_world" | "hello-world" => return Ok(OriginService::HelloWorld),
        "bastion" => return Ok(OriginService::Bastion),
        "socks-proxy" => return Ok(OriginService::SocksProxy),
        _ => {}
    }

    let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("address needs a scheme and a hostname"));
    }
    if !matches!(url.path(), "" | "/") {
        return Err(invalid(
            "origin addresses cannot carry a path; requests keep the path the client asked for",
        ));
    }

    match url.scheme() {
        "http" | "https" | "ws" | "wss" => Ok(OriginService::Http(url)),
        "tcp" | "ssh" | "rdp" | "smb" => Ok(OriginService::Stream(url)),
        _ => Err(invalid("unsupported scheme")),
    }
}

fn unix_service(path: &str, tls: bool) -> Option<OriginService> {
    if path.is_empty() {
        return None;
    }
    Some(OriginService::Unix {
        path: path.to_string(),
        tls,
    })
}
