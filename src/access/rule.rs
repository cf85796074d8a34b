//! IP access rules.
//!
//! # Responsibilities
//! - Parse CIDR prefixes into normalized networks
//! - Validate and normalize port lists
//! - Translate raw override entries into immutable rules
//!
//! # Design Decisions
//! - A rule can only be built through validated parsing
//! - Invalid entries are skipped, not escalated (see `translate_rules`)
//! - Empty port list means every port

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while building an [`IpRule`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    /// The prefix is not a valid `address/length` network.
    #[error("invalid CIDR {prefix:?}: {reason}")]
    InvalidCidr { prefix: String, reason: String },

    /// Port 0 cannot be matched by a connection.
    #[error("invalid port {port}, needs to be between 1 and 65535")]
    InvalidPort { port: u16 },
}

/// Raw access rule as it appears in configuration payloads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RawIpRule {
    /// Network prefix in CIDR notation (e.g., "10.0.0.0/8").
    pub prefix: String,

    /// Ports the rule applies to. Empty means all ports.
    #[serde(default)]
    pub ports: Vec<u16>,

    /// Allow (true) or deny (false) matching traffic.
    #[serde(default)]
    pub allow: bool,
}

impl RawIpRule {
    pub fn new(prefix: impl Into<String>, ports: Vec<u16>, allow: bool) -> Self {
        Self {
            prefix: prefix.into(),
            ports,
            allow,
        }
    }
}

/// An IP network with its host bits cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IpNetwork {
    network: IpAddr,
    prefix_len: u8,
}

impl IpNetwork {
    /// Network address (host bits zeroed).
    pub fn network(&self) -> IpAddr {
        self.network
    }

    /// Returns true if `ip` falls inside this network.
    ///
    /// IPv4-mapped IPv6 addresses are matched against IPv4 networks.
    pub fn contains(&self, ip: IpAddr) -> bool {
        let ip = match (self.network, ip) {
            (IpAddr::V4(_), IpAddr::V6(v6)) => match v6.to_ipv4_mapped() {
                Some(v4) => IpAddr::V4(v4),
                None => return false,
            },
            _ => ip,
        };

        match (self.network, ip) {
            (IpAddr::V4(_), IpAddr::V4(_)) | (IpAddr::V6(_), IpAddr::V6(_)) => {
                mask(ip, self.prefix_len) == self.network
            }
            _ => false,
        }
    }
}

impl FromStr for IpNetwork {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| RuleError::InvalidCidr {
            prefix: s.to_string(),
            reason: reason.to_string(),
        };

        let (addr, len) = s.split_once('/').ok_or_else(|| invalid("missing prefix length"))?;
        let addr: IpAddr = addr.parse().map_err(|_| invalid("invalid address"))?;
        let prefix_len: u8 = len.parse().map_err(|_| invalid("invalid prefix length"))?;

        let max_len = match addr {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        if prefix_len > max_len {
            return Err(invalid("prefix length exceeds address width"));
        }

        Ok(Self {
            network: mask(addr, prefix_len),
            prefix_len,
        })
    }
}

impl fmt::Display for IpNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

fn mask(addr: IpAddr, prefix_len: u8) -> IpAddr {
    match addr {
        IpAddr::V4(v4) => {
            let bits = u32::from(v4);
            let mask = match prefix_len {
                0 => 0,
                len => u32::MAX << (32 - u32::from(len)),
            };
            IpAddr::V4(Ipv4Addr::from(bits & mask))
        }
        IpAddr::V6(v6) => {
            let bits = u128::from(v6);
            let mask = match prefix_len {
                0 => 0,
                len => u128::MAX << (128 - u32::from(len)),
            };
            IpAddr::V6(Ipv6Addr::from(bits & mask))
        }
    }
}

/// One access-control entry: network, ports and polarity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpRule {
    network: IpNetwork,
    ports: Vec<u16>,
    allow: bool,
}

impl IpRule {
    /// Build a rule from a CIDR prefix, a port list and a polarity.
    ///
    /// Ports are sorted and de-duplicated.
    pub fn new(prefix: &str, ports: &[u16], allow: bool) -> Result<Self, RuleError> {
        let network: IpNetwork = prefix.parse()?;

        if let Some(&port) = ports.iter().find(|&&p| p == 0) {
            return Err(RuleError::InvalidPort { port });
        }

        let mut ports = ports.to_vec();
        ports.sort_unstable();
        ports.dedup();

        Ok(Self {
            network,
            ports,
            allow,
        })
    }

    pub fn network(&self) -> &IpNetwork {
        &self.network
    }

    pub fn ports(&self) -> &[u16] {
        &self.ports
    }

    pub fn allow(&self) -> bool {
        self.allow
    }

    pub fn contains(&self, ip: IpAddr) -> bool {
        self.network.contains(ip)
    }

    /// Returns true if the rule applies to a connection to `ip:port`.
    pub fn matches(&self, ip: IpAddr, port: u16) -> bool {
        self.contains(ip) && (self.ports.is_empty() || self.ports.binary_search(&port).is_ok())
    }
}

impl TryFrom<&RawIpRule> for IpRule {
    type Error = RuleError;

    fn try_from(raw: &RawIpRule) -> Result<Self, Self::Error> {
        IpRule::new(&raw.prefix, &raw.ports, raw.allow)
    }
}

impl fmt::Display for IpRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.allow { "allow" } else { "deny" };
        if self.ports.is_empty() {
            write!(f, "{} {} (all ports)", verdict, self.network)
        } else {
            write!(f, "{} {} ports {:?}", verdict, self.network, self.ports)
        }
    }
}

/// A raw entry that could not be turned into a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRule {
    pub prefix: String,
    pub error: RuleError,
}

/// Result of translating a list of raw entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslatedRules {
    /// Valid rules, in input order.
    pub rules: Vec<IpRule>,
    /// Entries dropped because they failed to parse.
    pub skipped: Vec<SkippedRule>,
}

/// Translate raw entries, keeping the valid ones and reporting the rest.
pub fn translate_rules(raw: &[RawIpRule]) -> TranslatedRules {
    let mut out = TranslatedRules::default();

    for entry in raw {
        match IpRule::try_from(entry) {
            Ok(rule) => out.rules.push(rule),
            Err(error) => out.skipped.push(SkippedRule {
                prefix: entry.prefix.clone(),
                error,
            }),
        }
    }

    out
}
