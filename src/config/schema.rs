//! Configuration schema definitions.
//!
//! Two families of types live here:
//! - raw types (`OriginRequestOverrides`, `RawRemoteConfig`, ...) that derive
//!   Serde traits and model every setting as present-or-absent;
//! - the resolved `OriginRequestConfig`, where every field holds a value.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::access::{IpRule, Policy, RawIpRule};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_TLS_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_TCP_KEEP_ALIVE: Duration = Duration::from_secs(30);
pub const DEFAULT_KEEP_ALIVE_CONNECTIONS: usize = 100;
pub const DEFAULT_KEEP_ALIVE_TIMEOUT: Duration = Duration::from_secs(90);
pub const DEFAULT_PROXY_ADDRESS: &str = "127.0.0.1";

/// Kind of local proxy started for a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyType {
    /// No local proxy.
    #[default]
    #[serde(alias = "")]
    None,
    /// SOCKS5 proxy.
    Socks,
}

impl std::fmt::Display for ProxyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProxyType::None => write!(f, "none"),
            ProxyType::Socks => write!(f, "socks"),
        }
    }
}

/// Settings applied to requests sent to an origin, fully resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct OriginRequestConfig {
    /// Timeout for establishing a new connection.
    pub connect_timeout: Duration,
    /// Timeout for completing a TLS handshake.
    pub tls_timeout: Duration,
    /// TCP keep-alive interval.
    pub tcp_keep_alive: Duration,
    /// Disable happy eyeballs (IPv4/IPv6 racing).
    pub no_happy_eyeballs: bool,
    /// Timeout before an idle keep-alive connection is closed.
    pub keep_alive_timeout: Duration,
    /// Maximum size of the keep-alive pool.
    pub keep_alive_connections: usize,
    /// Host header sent to the origin.
    pub http_host_header: Option<String>,
    /// Hostname expected on the origin certificate.
    pub origin_server_name: Option<String>,
    /// Path to a CA bundle for the origin certificate.
    pub ca_pool: Option<String>,
    /// Accept any certificate presented by the origin.
    pub no_tls_verify: bool,
    /// Disable chunked transfer encoding.
    pub disable_chunked_encoding: bool,
    /// Run as a jump host.
    pub bastion_mode: bool,
    /// Listen address for the local proxy.
    pub proxy_address: String,
    /// Listen port for the local proxy (0 = pick any).
    pub proxy_port: u16,
    /// Which local proxy to start.
    pub proxy_type: ProxyType,
    /// Ordered access rules.
    pub ip_rules: Vec<IpRule>,
}

impl Default for OriginRequestConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            tls_timeout: DEFAULT_TLS_TIMEOUT,
            tcp_keep_alive: DEFAULT_TCP_KEEP_ALIVE,
            no_happy_eyeballs: false,
            keep_alive_timeout: DEFAULT_KEEP_ALIVE_TIMEOUT,
            keep_alive_connections: DEFAULT_KEEP_ALIVE_CONNECTIONS,
            http_host_header: None,
            origin_server_name: None,
            ca_pool: None,
            no_tls_verify: false,
            disable_chunked_encoding: false,
            bastion_mode: false,
            proxy_address: DEFAULT_PROXY_ADDRESS.to_string(),
            proxy_port: 0,
            proxy_type: ProxyType::None,
            ip_rules: Vec::new(),
        }
    }
}

impl OriginRequestConfig {
    /// Access policy for the local SOCKS proxy. Unmatched traffic is denied.
    pub fn access_policy(&self) -> Policy {
        Policy::new(false, self.ip_rules.clone())
    }
}

/// Origin request settings as supplied by an operator or a remote payload.
///
/// Every field is optional: `None` means "not configured here", which is
/// distinct from an explicit `false`, `0` or empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OriginRequestOverrides {
    #[serde(with = "duration_opt", skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<Duration>,

    #[serde(with = "duration_opt", skip_serializing_if = "Option::is_none")]
    pub tls_timeout: Option<Duration>,

    #[serde(with = "duration_opt", skip_serializing_if = "Option::is_none")]
    pub tcp_keep_alive: Option<Duration>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_happy_eyeballs: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive_connections: Option<usize>,

    #[serde(with = "duration_opt", skip_serializing_if = "Option::is_none")]
    pub keep_alive_timeout: Option<Duration>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_host_header: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_server_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_pool: Option<String>,

    #[serde(rename = "noTLSVerify", skip_serializing_if = "Option::is_none")]
    pub no_tls_verify: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_chunked_encoding: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bastion_mode: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_address: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_port: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_type: Option<ProxyType>,

    /// Replaces the inherited list when non-empty.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ip_rules: Vec<RawIpRule>,
}

impl OriginRequestOverrides {
    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// An ingress rule before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UnvalidatedIngressRule {
    /// Hostname to match; empty or "*" matches everything.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    /// Regex matched against the request path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Target service (URL or special service name).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,

    /// Per-route overrides.
    #[serde(skip_serializing_if = "OriginRequestOverrides::is_empty")]
    pub origin_request: OriginRequestOverrides,
}

/// Routing-mode block, kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct WarpRoutingConfig(pub serde_json::Map<String, serde_json::Value>);

impl WarpRoutingConfig {
    /// Value of the `enabled` key, false when absent or not a boolean.
    pub fn enabled(&self) -> bool {
        self.0
            .get("enabled")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }
}

/// Serialized form of a remotely managed configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RawRemoteConfig {
    /// Global overrides applied to every route.
    #[serde(rename = "originRequest", skip_serializing_if = "OriginRequestOverrides::is_empty")]
    pub origin_request: OriginRequestOverrides,

    /// Ordered ingress rules.
    pub ingress: Vec<UnvalidatedIngressRule>,

    /// Routing-mode block.
    #[serde(rename = "warp-routing")]
    pub warp_routing: WarpRoutingConfig,
}

/// Root configuration of the agent's local config file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AgentConfig {
    /// Routes, global overrides and routing mode.
    #[serde(flatten)]
    pub routes: RawRemoteConfig,

    /// Optional control plane to poll for remote configuration.
    #[serde(rename = "control-plane", default, skip_serializing_if = "Option::is_none")]
    pub control_plane: Option<ControlPlaneConfig>,

    /// Logging and metrics.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Control plane polling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ControlPlaneConfig {
    /// URL serving the remote configuration payload.
    pub url: String,

    /// Poll interval in seconds.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_poll_interval_secs() -> u64 {
    30
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Durations as whole seconds or human-readable strings ("30s", "1m 30s").
mod duration_opt {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Seconds(u64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_str(&humantime::format_duration(*d).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        match Option::<Repr>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Repr::Seconds(secs)) => Ok(Some(Duration::from_secs(secs))),
            Some(Repr::Text(text)) => humantime::parse_duration(&text)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}
