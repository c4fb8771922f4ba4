// gait-broker/src/net.rs
// ============================================================================
// Module: HTTP Broker Host Policy
// Description: Allow/deny host matching and private-network rejection for
// outbound credential-broker HTTP calls.
// Purpose: Stop a misconfigured or compromised broker reference from
// reaching internal infrastructure.
// Dependencies: url
// ============================================================================

//! ## Overview
//! Adapted from the teacher's `decision-gate-broker::source::http::HttpSourcePolicy`:
//! an allowlist of exact or `*.`-wildcard host patterns, an optional
//! denylist checked first, and DNS-resolved private/link-local rejection
//! unless explicitly allowed.

use std::net::IpAddr;
use std::net::ToSocketAddrs;

use url::Host;
use url::Url;

/// Errors raised while enforcing [`HttpSourcePolicy`].
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// The URL has no host component.
    #[error("url has no host")]
    MissingHost,
    /// The host did not match the configured allowlist.
    #[error("host not in allowlist: {0}")]
    NotAllowlisted(String),
    /// The host matched the configured denylist.
    #[error("host denied: {0}")]
    Denied(String),
    /// The host resolved to a private or link-local address.
    #[error("host resolves to a private or link-local address: {0}")]
    PrivateNetwork(String),
    /// DNS resolution failed.
    #[error("dns lookup failed: {0}")]
    DnsFailed(String),
}

#[derive(Debug, Clone)]
enum HostPattern {
    Exact(String),
    WildcardSuffix(String),
}

impl HostPattern {
    fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().trim_end_matches('.').to_ascii_lowercase();
        if normalized.is_empty() {
            return None;
        }
        if let Some(suffix) = normalized.strip_prefix("*.") {
            return (!suffix.is_empty()).then(|| Self::WildcardSuffix(suffix.to_string()));
        }
        Some(Self::Exact(normalized))
    }

    fn matches(&self, host: &str) -> bool {
        match self {
            Self::Exact(value) => host == value,
            Self::WildcardSuffix(suffix) => {
                host.len() > suffix.len() + 1 && host.ends_with(suffix.as_str()) && host.as_bytes()[host.len() - suffix.len() - 1] == b'.'
            }
        }
    }
}

/// Host allow/deny policy for outbound broker HTTP requests.
#[derive(Debug, Clone, Default)]
pub struct HttpSourcePolicy {
    allowlist: Vec<HostPattern>,
    denylist: Vec<HostPattern>,
    allow_private_networks: bool,
}

impl HttpSourcePolicy {
    /// Builds a policy allowing only the given hosts.
    #[must_use]
    pub fn allow_hosts<I: IntoIterator<Item = S>, S: AsRef<str>>(hosts: I) -> Self {
        Self {
            allowlist: hosts.into_iter().filter_map(|host| HostPattern::parse(host.as_ref())).collect(),
            denylist: Vec::new(),
            allow_private_networks: false,
        }
    }

    /// Permits requests resolving to private/link-local addresses.
    #[must_use]
    pub const fn allow_private_networks(mut self) -> Self {
        self.allow_private_networks = true;
        self
    }

    /// Validates `url` against this policy.
    ///
    /// # Errors
    ///
    /// Returns a [`PolicyError`] if the host is missing, denied, not
    /// allowlisted, or resolves to a private/link-local address.
    pub fn enforce(&self, url: &Url) -> Result<(), PolicyError> {
        let host = url.host().ok_or(PolicyError::MissingHost)?;
        let label = normalize_host(&host);
        if self.denylist.iter().any(|pattern| pattern.matches(&label)) {
            return Err(PolicyError::Denied(label));
        }
        if !self.allowlist.is_empty() && !self.allowlist.iter().any(|pattern| pattern.matches(&label)) {
            return Err(PolicyError::NotAllowlisted(label));
        }
        if !self.allow_private_networks {
            for ip in resolve_ips(&host, url)? {
                if is_private_or_link_local(&ip) {
                    return Err(PolicyError::PrivateNetwork(label));
                }
            }
        }
        Ok(())
    }
}

fn normalize_host(host: &Host<&str>) -> String {
    match host {
        Host::Domain(domain) => domain.trim_end_matches('.').to_ascii_lowercase(),
        Host::Ipv4(ip) => ip.to_string(),
        Host::Ipv6(ip) => ip.to_string(),
    }
}

fn resolve_ips(host: &Host<&str>, url: &Url) -> Result<Vec<IpAddr>, PolicyError> {
    match host {
        Host::Ipv4(ip) => Ok(vec![IpAddr::V4(*ip)]),
        Host::Ipv6(ip) => Ok(vec![IpAddr::V6(*ip)]),
        Host::Domain(domain) => {
            let port = url.port_or_known_default().ok_or(PolicyError::MissingHost)?;
            (*domain, port)
                .to_socket_addrs()
                .map(|iter| iter.map(|addr| addr.ip()).collect())
                .map_err(|err| PolicyError::DnsFailed(err.to_string()))
        }
    }
}

const fn is_private_or_link_local(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(addr) => addr.is_private() || addr.is_loopback() || addr.is_link_local() || addr.is_unspecified(),
        IpAddr::V6(addr) => addr.is_loopback() || addr.is_unique_local() || addr.is_unicast_link_local() || addr.is_unspecified(),
    }
}
