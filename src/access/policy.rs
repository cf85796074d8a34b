//! First-match access policy over an ordered rule list.

use std::net::IpAddr;

use crate::access::rule::IpRule;

/// Evaluates `(ip, port)` pairs against ordered rules.
#[derive(Debug, Clone, Default)]
pub struct Policy {
    default_allow: bool,
    rules: Vec<IpRule>,
}

impl Policy {
    /// Create a policy. `default_allow` applies when no rule matches.
    pub fn new(default_allow: bool, rules: Vec<IpRule>) -> Self {
        Self {
            default_allow,
            rules,
        }
    }

    /// Verdict for a connection, plus the rule that decided it (if any).
    pub fn allowed(&self, ip: IpAddr, port: u16) -> (bool, Option<&IpRule>) {
        match self.rules.iter().find(|rule| rule.matches(ip, port)) {
            Some(rule) => (rule.allow(), Some(rule)),
            None => (self.default_allow, None),
        }
    }
}
