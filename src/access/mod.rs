//! Access control subsystem.
//!
//! # Data Flow
//! ```text
//! Raw override entries (prefix, ports, allow)
//!     → rule.rs (parse CIDR, validate ports)
//!     → TranslatedRules { rules, skipped }
//!     → resolver stores rules on OriginRequestConfig
//!     → policy.rs (first-match verdict per connection)
//! ```
//!
//! # Design Decisions
//! - Bad entries are dropped and reported, never fatal
//! - Rules are immutable once built
//! - No per-rule merge: an override list replaces the previous one

pub mod policy;
pub mod rule;

pub use policy::Policy;
pub use rule::{translate_rules, IpNetwork, IpRule, RawIpRule, RuleError, SkippedRule, TranslatedRules};
