//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! CLI flags / TOML file / remote JSON payload
//!     → schema.rs (raw overrides, every field present-or-absent)
//!     → resolver.rs (defaults ← global ← route, per field)
//!     → validation.rs (ingress rules, all-or-nothing)
//!     → remote.rs (RemoteConfig, decoded atomically)
//!     → store.rs (atomic swap of the known-good config)
//!
//! Updates:
//!     poller.rs fetches a payload from the control plane
//!     watcher.rs detects a local file change
//!     → decode + validate
//!     → store.rs swaps only on success
//! ```
//!
//! # Design Decisions
//! - Resolved config is immutable; changes arrive as a whole new RemoteConfig
//! - "Not set" is modelled explicitly, never as a zero value
//! - Invalid IP rules are dropped; invalid ingress rules reject the batch

pub mod loader;
pub mod poller;
pub mod remote;
pub mod resolver;
pub mod schema;
pub mod store;
pub mod validation;
pub mod watcher;

pub use remote::{decode, DecodeError, RemoteConfig};
pub use resolver::{resolve, resolve_detailed, FlagOverrides, Resolution};
pub use schema::{
    AgentConfig, OriginRequestConfig, OriginRequestOverrides, ProxyType, RawRemoteConfig,
    UnvalidatedIngressRule, WarpRoutingConfig,
};
pub use store::ConfigStore;
pub use validation::IngressError;
