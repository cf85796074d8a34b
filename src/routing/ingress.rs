//! Validated ingress rules and rule lookup.
//!
//! # Responsibilities
//! - Store validated rules with their resolved origin settings
//! - Look up the rule serving a request
//!
//! # Design Decisions
//! - Immutable after validation (shared freely between tasks)
//! - First match wins, in configuration order
//! - The last rule is a catch-all, so lookup never misses on a non-empty table

use std::fmt;

use url::Url;

use crate::config::schema::OriginRequestConfig;
use crate::routing::matcher::{HostMatcher, Matcher, PathMatcher, RequestTarget};

/// Where a rule sends matching traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginService {
    /// HTTP(S) or WebSocket origin.
    Http(Url),
    /// Raw stream origin (tcp, ssh, rdp, smb).
    Stream(Url),
    /// Unix socket origin, optionally wrapped in TLS.
    Unix { path: String, tls: bool },
    /// Fixed HTTP status response.
    HttpStatus(u16),
    /// Built-in test origin.
    HelloWorld,
    /// Jump host; the destination comes from the client.
    Bastion,
    /// Local SOCKS proxy.
    SocksProxy,
}

impl fmt::Display for OriginService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OriginService::Http(url) | OriginService::Stream(url) => write!(f, "{}", url),
            OriginService::Unix { path, tls: false } => write!(f, "unix:{}", path),
            OriginService::Unix { path, tls: true } => write!(f, "unix+tls:{}", path),
            OriginService::HttpStatus(code) => write!(f, "http_status:{}", code),
            OriginService::HelloWorld => write!(f, "hello_world"),
            OriginService::Bastion => write!(f, "bastion"),
            OriginService::SocksProxy => write!(f, "socks-proxy"),
        }
    }
}

/// A validated ingress rule.
#[derive(Debug, Clone)]
pub struct IngressRule {
    /// Hostname pattern as configured (empty = any).
    pub hostname: String,
    pub(crate) host: HostMatcher,
    pub(crate) path: Option<PathMatcher>,
    /// Target service.
    pub service: OriginService,
    /// Origin settings resolved for this rule.
    pub config: OriginRequestConfig,
}

impl IngressRule {
    pub(crate) fn new(
        hostname: String,
        path: Option<PathMatcher>,
        service: OriginService,
        config: OriginRequestConfig,
    ) -> Self {
        let host = HostMatcher::new(&hostname);
        Self {
            hostname,
            host,
            path,
            service,
            config,
        }
    }

    /// Path pattern, if any.
    pub fn path(&self) -> Option<&str> {
        self.path.as_ref().map(PathMatcher::as_str)
    }

    /// True if the rule matches every request.
    pub fn is_catch_all(&self) -> bool {
        self.host.is_any() && self.path.is_none()
    }

    /// Returns true if the rule serves `host` + `path`. `host` must not carry a port.
    pub fn matches(&self, host: &str, path: &str) -> bool {
        let target = RequestTarget { host, path };
        self.host.matches(&target) && self.path.as_ref().map_or(true, |p| p.matches(&target))
    }
}

/// Ordered, validated ingress rules.
#[derive(Debug, Clone, Default)]
pub struct Ingress {
    /// Rules in match order; the last is the catch-all.
    pub rules: Vec<IngressRule>,
    /// Global settings every rule was resolved against.
    pub defaults: OriginRequestConfig,
}

impl Ingress {
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Find the rule serving a request.
    ///
    /// `host` may carry a port, which is ignored. Falls back to the last rule;
    /// returns `None` only when there are no rules.
    pub fn find_matching_rule(&self, host: &str, path: &str) -> Option<(usize, &IngressRule)> {
        let host = strip_port(host);

        self.rules
            .iter()
            .enumerate()
            .find(|(_, rule)| rule.matches(host, path))
            .or_else(|| self.rules.iter().enumerate().last())
    }
}

fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        return match rest.find(']') {
            Some(end) => &rest[..end],
            None => host,
        };
    }

    match host.split_once(':') {
        Some((name, port)) if !port.contains(':') => name,
        _ => host,
    }
}
