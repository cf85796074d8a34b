//! Ingress rule matching logic.
//!
//! # Responsibilities
//! - Match request hostname (exact or leading wildcard, case-insensitive)
//! - Match request path against a regex
//! - Combine conditions with AND semantics
//!
//! # Design Decisions
//! - Host matching is case-insensitive (per HTTP spec)
//! - Path matching is case-sensitive and unanchored
//! - Empty condition = always matches (wildcard)

use regex::Regex;

/// The parts of a request that ingress rules look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTarget<'a> {
    /// Hostname without port.
    pub host: &'a str,
    pub path: &'a str,
}

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, target: &RequestTarget<'_>) -> bool;
}

/// Matches the request hostname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostMatcher {
    /// Empty hostname or "*": matches every host.
    Any,
    /// Exact hostname, lowercased.
    Exact(String),
    /// "*.example.com": stores ".example.com", lowercased.
    WildcardSuffix(String),
}

impl HostMatcher {
    /// Create a host matcher from a validated hostname pattern.
    pub fn new(pattern: &str) -> Self {
        let pattern = pattern.to_lowercase();
        match pattern.as_str() {
            "" | "*" => HostMatcher::Any,
            p => match p.strip_prefix('*') {
                Some(suffix) => HostMatcher::WildcardSuffix(suffix.to_string()),
                None => HostMatcher::Exact(pattern),
            },
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, HostMatcher::Any)
    }
}

impl Matcher for HostMatcher {
    fn matches(&self, target: &RequestTarget<'_>) -> bool {
        let host = target.host.to_lowercase();
        match self {
            HostMatcher::Any => true,
            HostMatcher::Exact(expected) => host == *expected,
            HostMatcher::WildcardSuffix(suffix) => host.ends_with(suffix.as_str()),
        }
    }
}

/// Matches the request path against a regex.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    pattern: Regex,
}

impl PathMatcher {
    /// Compile a path pattern.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }
}

impl Matcher for PathMatcher {
    fn matches(&self, target: &RequestTarget<'_>) -> bool {
        self.pattern.is_match(target.path)
    }
}
