//! Origin ingress agent.
//!
//! Resolves origin request settings for every ingress rule and keeps them
//! current until the process is told to stop.
//!
//! # Architecture Overview
//!
//! ```text
//!   CLI flags ──┐
//!   TOML file ──┼─▶ startup ─▶ resolver + validation ─▶ ConfigStore ─▶ proxy engine
//!               │                                          ▲
//!   control ────┴─▶ poller ────────────────────────────────┘
//!   plane            (decode, swap only on success)
//!
//!   SIGINT/SIGTERM ─▶ signals ─▶ Shutdown gate ◀─ internal triggers
//!                                     │
//!                                     └─▶ poller, watcher, run loop stop
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser};

use origin_ingress::config::poller::RemoteConfigPoller;
use origin_ingress::config::schema::{LogFormat, ProxyType};
use origin_ingress::config::watcher::ConfigWatcher;
use origin_ingress::config::{ConfigStore, FlagOverrides, RemoteConfig};
use origin_ingress::lifecycle::startup::{load_initial, ConfigSource};
use origin_ingress::lifecycle::{wait_for_signal, Shutdown};
use origin_ingress::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "origin-ingress")]
#[command(about = "Resolve origin request settings for ingress rules", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, conflicts_with_all = ["url", "origin-flags"])]
    config: Option<PathBuf>,

    /// Single origin service (e.g., http://localhost:8080).
    #[arg(long)]
    url: Option<String>,

    #[command(flatten)]
    origin: OriginFlags,

    /// Log level, overrides the config file (RUST_LOG wins over both).
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON.
    #[arg(long)]
    log_json: bool,
}

/// Origin request overrides for single-origin mode.
#[derive(Args, Debug, Default)]
#[group(id = "origin-flags", multiple = true)]
struct OriginFlags {
    /// Timeout for establishing a connection to the origin.
    #[arg(long, value_parser = humantime::parse_duration)]
    connect_timeout: Option<Duration>,

    /// Timeout for completing a TLS handshake with the origin.
    #[arg(long, value_parser = humantime::parse_duration)]
    tls_timeout: Option<Duration>,

    /// TCP keep-alive interval.
    #[arg(long = "tcp-keepalive", value_parser = humantime::parse_duration)]
    tcp_keep_alive: Option<Duration>,

    /// Disable happy eyeballs for IPv4/IPv6 fallback.
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    no_happy_eyeballs: Option<bool>,

    /// Maximum idle keep-alive connections to the origin.
    #[arg(long = "keepalive-connections")]
    keep_alive_connections: Option<usize>,

    /// Timeout before an idle keep-alive connection is closed.
    #[arg(long = "keepalive-timeout", value_parser = humantime::parse_duration)]
    keep_alive_timeout: Option<Duration>,

    /// Host header sent to the origin.
    #[arg(long)]
    http_host_header: Option<String>,

    /// Hostname expected on the origin certificate.
    #[arg(long)]
    origin_server_name: Option<String>,

    /// CA bundle used to verify the origin certificate.
    #[arg(long = "origin-ca-pool")]
    ca_pool: Option<String>,

    /// Accept any certificate presented by the origin.
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    no_tls_verify: Option<bool>,

    /// Disable chunked transfer encoding.
    #[arg(long = "no-chunked-encoding", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    disable_chunked_encoding: Option<bool>,

    /// Run as a jump host.
    #[arg(long = "bastion", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    bastion_mode: Option<bool>,

    /// Listen address for the local proxy.
    #[arg(long)]
    proxy_address: Option<String>,

    /// Listen port for the local proxy.
    #[arg(long)]
    proxy_port: Option<u16>,

    /// Local proxy kind (none or socks).
    #[arg(long, value_parser = parse_proxy_type)]
    proxy_type: Option<ProxyType>,

    /// Start a SOCKS5 proxy; overrides --proxy-type.
    #[arg(long)]
    socks5: bool,
}

fn parse_proxy_type(value: &str) -> Result<ProxyType, String> {
    match value {
        "" | "none" => Ok(ProxyType::None),
        "socks" => Ok(ProxyType::Socks),
        other => Err(format!("unknown proxy type {other:?}, expected \"none\" or \"socks\"")),
    }
}

impl From<OriginFlags> for FlagOverrides {
    fn from(flags: OriginFlags) -> Self {
        Self {
            connect_timeout: flags.connect_timeout,
            tls_timeout: flags.tls_timeout,
            tcp_keep_alive: flags.tcp_keep_alive,
            no_happy_eyeballs: flags.no_happy_eyeballs,
            keep_alive_connections: flags.keep_alive_connections,
            keep_alive_timeout: flags.keep_alive_timeout,
            http_host_header: flags.http_host_header,
            origin_server_name: flags.origin_server_name,
            ca_pool: flags.ca_pool,
            no_tls_verify: flags.no_tls_verify,
            disable_chunked_encoding: flags.disable_chunked_encoding,
            bastion_mode: flags.bastion_mode,
            proxy_address: flags.proxy_address,
            proxy_port: flags.proxy_port,
            proxy_type: flags.proxy_type,
            socks5: flags.socks5,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = cli.config.clone();
    let source = match cli.config {
        Some(path) => ConfigSource::File(path),
        None => ConfigSource::SingleOrigin {
            service: cli.url,
            flags: cli.origin.into(),
        },
    };
    let (agent, routes) = load_initial(source)?;

    let level = cli
        .log_level
        .unwrap_or_else(|| agent.observability.log_level.clone());
    let format = if cli.log_json {
        LogFormat::Json
    } else {
        agent.observability.log_format
    };
    logging::init(&level, format)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "origin-ingress starting");

    if agent.observability.metrics_enabled {
        match agent.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %agent.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    log_routes(&routes);
    let store = Arc::new(ConfigStore::new(routes));
    let shutdown = Shutdown::new();
    let mut tasks = Vec::new();

    if let Some(control_plane) = agent.control_plane.clone() {
        let poller = RemoteConfigPoller::new(
            control_plane.url,
            Duration::from_secs(control_plane.poll_interval_secs.max(1)),
            store.clone(),
        );
        tasks.push(tokio::spawn(poller.run(shutdown.clone())));
    }

    // Dropping the watcher stops file notifications, so hold it until exit.
    let _watcher = match config_path {
        Some(path) => {
            let (watcher, mut updates) = ConfigWatcher::new(&path);
            let watcher = watcher.run()?;

            let store = store.clone();
            let shutdown = shutdown.clone();
            tasks.push(tokio::spawn(async move {
                loop {
                    tokio::select! {
                        update = updates.recv() => match update {
                            Some(routes) => {
                                log_routes(&routes);
                                store.replace(routes);
                            }
                            None => break,
                        },
                        _ = shutdown.wait() => break,
                    }
                }
            }));
            Some(watcher)
        }
        None => None,
    };

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = wait_for_signal(Some(&shutdown)).await {
                tracing::error!(error = %e, "Failed to install signal handlers, shutting down");
                shutdown.trigger();
            }
        });
    }

    shutdown.wait().await;
    tracing::info!("Shutdown requested, stopping background tasks");

    for task in tasks {
        let _ = task.await;
    }

    tracing::info!(generation = store.generation(), "Shutdown complete");
    Ok(())
}

fn log_routes(routes: &RemoteConfig) {
    for (index, rule) in routes.ingress.rules.iter().enumerate() {
        tracing::info!(
            rule = index + 1,
            hostname = %rule.hostname,
            path = rule.path().unwrap_or(""),
            service = %rule.service,
            connect_timeout = ?rule.config.connect_timeout,
            no_tls_verify = rule.config.no_tls_verify,
            proxy_type = %rule.config.proxy_type,
            ip_rules = rule.config.ip_rules.len(),
            "Ingress rule"
        );
    }
    tracing::info!(
        rules = routes.ingress.len(),
        warp_routing = routes.warp_routing.enabled(),
        "Configuration loaded"
    );
}
