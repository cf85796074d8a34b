//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (host, path)
//!     → ingress.rs (rule lookup, first match wins)
//!     → matcher.rs (evaluate host and path conditions)
//!     → Return: matched rule + its resolved OriginRequestConfig
//!
//! Rule compilation (config::validation):
//!     UnvalidatedIngressRule[]
//!     → Resolve per-rule origin settings
//!     → Compile matchers, parse services
//!     → Freeze as immutable Ingress
//! ```
//!
//! # Design Decisions
//! - Rules compiled once per config, immutable at runtime
//! - Deterministic: same input always matches same rule
//! - Last rule is a catch-all, so every request resolves to a rule

pub mod ingress;
pub mod matcher;

pub use ingress::{Ingress, IngressRule, OriginService};
