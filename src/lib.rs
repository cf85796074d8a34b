//! Origin request configuration and shutdown coordination for an ingress agent.

pub mod access;
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use access::{IpRule, Policy};
pub use config::{decode, resolve, ConfigStore, OriginRequestConfig, OriginRequestOverrides, RemoteConfig};
pub use lifecycle::Shutdown;
pub use routing::Ingress;
