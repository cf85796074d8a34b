//! Origin request settings resolution.
//!
//! # Responsibilities
//! - Merge defaults, global overrides and per-route overrides
//! - Translate IP rule overrides into access rules
//! - Report which fields were overridden and which IP rules were skipped
//!
//! # Design Decisions
//! - Priority per field: route > global > defaults
//! - Fields are resolved independently; no cross-field validation
//! - One table drives every scalar field; IP rules replace wholesale
//! - Invalid IP rules are dropped and reported, never fatal

use std::time::Duration;

use crate::access::{translate_rules, SkippedRule};
use crate::config::schema::{OriginRequestConfig, OriginRequestOverrides, ProxyType};
use crate::observability::metrics;

/// Outcome of applying one layer of overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// The resolved settings.
    pub config: OriginRequestConfig,
    /// Names of the fields that an override layer set, in table order.
    pub overridden: Vec<&'static str>,
    /// IP rule entries dropped because they failed to parse.
    pub skipped_ip_rules: Vec<SkippedRule>,
}

/// One row of the override table: field name and how to apply it.
struct FieldOverride {
    name: &'static str,
    apply: fn(&mut OriginRequestConfig, &OriginRequestOverrides) -> bool,
}

/// Builds the override table. `value` fields copy the override as-is,
/// `optional` fields store it as `Some`.
macro_rules! field_overrides {
    ($($kind:ident $field:ident => $name:literal),* $(,)?) => {
        &[$(field_overrides!(@row $kind $field $name)),*]
    };
    (@row value $field:ident $name:literal) => {
        FieldOverride {
            name: $name,
            apply: |cfg, overrides| match &overrides.$field {
                Some(value) => {
                    cfg.$field = value.clone();
                    true
                }
                None => false,
            },
        }
    };
    (@row optional $field:ident $name:literal) => {
        FieldOverride {
            name: $name,
            apply: |cfg, overrides| match &overrides.$field {
                Some(value) => {
                    cfg.$field = Some(value.clone());
                    true
                }
                None => false,
            },
        }
    };
}

static FIELD_OVERRIDES: &[FieldOverride] = field_overrides! {
    value connect_timeout => "connectTimeout",
    value tls_timeout => "tlsTimeout",
    value tcp_keep_alive => "tcpKeepAlive",
    value no_happy_eyeballs => "noHappyEyeballs",
    value keep_alive_connections => "keepAliveConnections",
    value keep_alive_timeout => "keepAliveTimeout",
    optional http_host_header => "httpHostHeader",
    optional origin_server_name => "originServerName",
    optional ca_pool => "caPool",
    value no_tls_verify => "noTLSVerify",
    value disable_chunked_encoding => "disableChunkedEncoding",
    value bastion_mode => "bastionMode",
    value proxy_address => "proxyAddress",
    value proxy_port => "proxyPort",
    value proxy_type => "proxyType",
};

impl OriginRequestConfig {
    /// Apply one layer of overrides on top of these settings.
    pub fn apply_overrides(&self, overrides: &OriginRequestOverrides) -> Resolution {
        let mut config = self.clone();
        let mut overridden = Vec::new();

        for field in FIELD_OVERRIDES {
            if (field.apply)(&mut config, overrides) {
                overridden.push(field.name);
            }
        }

        let mut skipped_ip_rules = Vec::new();
        if !overrides.ip_rules.is_empty() {
            let translated = translate_rules(&overrides.ip_rules);
            config.ip_rules = translated.rules;
            skipped_ip_rules = translated.skipped;
            overridden.push("ipRules");
        }

        Resolution {
            config,
            overridden,
            skipped_ip_rules,
        }
    }
}

/// Resolve settings for a route, reporting overridden fields and skipped rules.
///
/// Layers are applied global first, then route, so a route override wins.
pub fn resolve_detailed(
    defaults: &OriginRequestConfig,
    global: &OriginRequestOverrides,
    route: Option<&OriginRequestOverrides>,
) -> Resolution {
    let mut resolution = defaults.apply_overrides(global);

    if let Some(route) = route {
        let layered = resolution.config.apply_overrides(route);
        resolution.config = layered.config;
        for name in layered.overridden {
            if !resolution.overridden.contains(&name) {
                resolution.overridden.push(name);
            }
        }
        resolution.skipped_ip_rules.extend(layered.skipped_ip_rules);
    }

    resolution
}

/// Resolve settings for a route.
///
/// Skipped IP rules are logged and counted but do not fail resolution.
pub fn resolve(
    defaults: &OriginRequestConfig,
    global: &OriginRequestOverrides,
    route: Option<&OriginRequestOverrides>,
) -> OriginRequestConfig {
    let resolution = resolve_detailed(defaults, global, route);

    for skipped in &resolution.skipped_ip_rules {
        tracing::warn!(
            prefix = %skipped.prefix,
            error = %skipped.error,
            "Skipping invalid IP rule"
        );
    }
    metrics::record_skipped_ip_rules(resolution.skipped_ip_rules.len());

    if !resolution.overridden.is_empty() {
        tracing::debug!(fields = ?resolution.overridden, "Origin request overrides applied");
    }

    resolution.config
}

/// Overrides supplied on the command line.
///
/// Mirrors `OriginRequestOverrides` plus the standalone SOCKS switch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagOverrides {
    pub connect_timeout: Option<Duration>,
    pub tls_timeout: Option<Duration>,
    pub tcp_keep_alive: Option<Duration>,
    pub no_happy_eyeballs: Option<bool>,
    pub keep_alive_connections: Option<usize>,
    pub keep_alive_timeout: Option<Duration>,
    pub http_host_header: Option<String>,
    pub origin_server_name: Option<String>,
    pub ca_pool: Option<String>,
    pub no_tls_verify: Option<bool>,
    pub disable_chunked_encoding: Option<bool>,
    pub bastion_mode: Option<bool>,
    pub proxy_address: Option<String>,
    pub proxy_port: Option<u16>,
    pub proxy_type: Option<ProxyType>,
    /// Start a SOCKS proxy; forces `proxy_type` to `Socks`.
    pub socks5: bool,
}

impl FlagOverrides {
    pub fn into_overrides(self) -> OriginRequestOverrides {
        let proxy_type = if self.socks5 {
            Some(ProxyType::Socks)
        } else {
            self.proxy_type
        };

        OriginRequestOverrides {
            connect_timeout: self.connect_timeout,
            tls_timeout: self.tls_timeout,
            tcp_keep_alive: self.tcp_keep_alive,
            no_happy_eyeballs: self.no_happy_eyeballs,
            keep_alive_connections: self.keep_alive_connections,
            keep_alive_timeout: self.keep_alive_timeout,
            http_host_header: self.http_host_header,
            origin_server_name: self.origin_server_name,
            ca_pool: self.ca_pool,
            no_tls_verify: self.no_tls_verify,
            disable_chunked_encoding: self.disable_chunked_encoding,
            bastion_mode: self.bastion_mode,
            proxy_address: self.proxy_address,
            proxy_port: self.proxy_port,
            proxy_type,
            ip_rules: Vec::new(),
        }
    }
}
