// gait-registry/src/net.rs
// ============================================================================
// Module: Registry Host Policy
// Description: Host allow/deny matching and private-network rejection for
// remote manifest fetches.
// Purpose: Implement `spec.md` §4.9's `allow_hosts` enforcement.
// Dependencies: std::net, url
// ============================================================================

//! ## Overview
//! A second adaptation of the teacher's `decision-gate-broker::source::http::HttpSourcePolicy`
//! (the first is `gait_broker::net::HttpSourcePolicy`), narrowed to what a
//! registry fetch needs: an exact-or-wildcard host allowlist and a
//! private/link-local IP block, with no denylist, since `spec.md` §4.9 names
//! only `allow_hosts`.

use std::net::IpAddr;
use std::net::ToSocketAddrs;

use url::Url;

/// Errors raised while enforcing a registry host policy.
#[derive(Debug, thiserror::Error)]
pub enum HostPolicyError {
    /// The URL carried no host component.
    #[error("url has no host")]
    MissingHost,

    /// The host did not match any entry in `allow_hosts`.
    #[error("host {0} is not in the registry allow_hosts list")]
    NotAllowlisted(String),

    /// The host resolved to a private or link-local address.
    #[error("host {0} resolved to a private or link-local address")]
    PrivateNetwork(String),

    /// The URL used a scheme other than `https`, and insecure HTTP was not
    /// explicitly permitted.
    #[error("url scheme {0} requires allow_insecure_http")]
    InsecureScheme(String),

    /// DNS resolution failed.
    #[error("dns resolution failed for {0}: {1}")]
    DnsFailed(String, String),
}

enum HostPattern {
    Exact(String),
    WildcardSuffix(String),
}

impl HostPattern {
    fn parse(raw: &str) -> Self {
        raw.strip_prefix("*.").map_or_else(|| Self::Exact(raw.to_ascii_lowercase()), |suffix| Self::WildcardSuffix(suffix.to_ascii_lowercase()))
    }

    fn matches(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        match self {
            Self::Exact(pattern) => *pattern == host,
            Self::WildcardSuffix(suffix) => host == *suffix || host.ends_with(&format!(".{suffix}")),
        }
    }
}

/// Host allow-list and scheme/private-network enforcement for registry fetches.
pub struct RegistryHostPolicy {
    allowlist: Vec<HostPattern>,
    allow_insecure_http: bool,
}

impl RegistryHostPolicy {
    /// Builds a policy from configured allowed hosts.
    #[must_use]
    pub fn new<I, S>(allow_hosts: I, allow_insecure_http: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self { allowlist: allow_hosts.into_iter().map(|host| HostPattern::parse(host.as_ref())).collect(), allow_insecure_http }
    }

    /// Enforces scheme, allowlist, and private-network checks against `url`.
    ///
    /// # Errors
    ///
    /// Returns the first [`HostPolicyError`] violated.
    pub fn enforce(&self, url: &Url) -> Result<(), HostPolicyError> {
        if url.scheme() != "https" && !self.allow_insecure_http {
            return Err(HostPolicyError::InsecureScheme(url.scheme().to_string()));
        }
        let host = url.host_str().ok_or(HostPolicyError::MissingHost)?;
        if !self.allowlist.iter().any(|pattern| pattern.matches(host)) {
            return Err(HostPolicyError::NotAllowlisted(host.to_string()));
        }
        for ip in resolve_ips(host, url.port_or_known_default().unwrap_or(443))? {
            if is_private_or_link_local(ip) {
                return Err(HostPolicyError::PrivateNetwork(host.to_string()));
            }
        }
        Ok(())
    }
}

fn resolve_ips(host: &str, port: u16) -> Result<Vec<IpAddr>, HostPolicyError> {
    (host, port).to_socket_addrs().map(|addrs| addrs.map(|addr| addr.ip()).collect()).map_err(|err| HostPolicyError::DnsFailed(host.to_string(), err.to_string()))
}

fn is_private_or_link_local(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback() || v4.is_link_local() || v4.is_unspecified(),
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified() || (v6.segments()[0] & 0xfe00) == 0xfc00,
    }
}

#[cfg(test)]
mod tests {
    use super::RegistryHostPolicy;
    use url::Url;

    #[test]
    fn rejects_non_allowlisted_host() {
        let policy = RegistryHostPolicy::new(["registry.example.com"], false);
        let url = Url::parse("https://evil.example.com/pack.json").unwrap();
        assert!(policy.enforce(&url).is_err());
    }

    #[test]
    fn rejects_plain_http_without_opt_in() {
        let policy = RegistryHostPolicy::new(["registry.example.com"], false);
        let url = Url::parse("http://registry.example.com/pack.json").unwrap();
        assert!(policy.enforce(&url).is_err());
    }

    #[test]
    fn wildcard_suffix_matches_subdomain() {
        let policy = RegistryHostPolicy::new(["*.example.com"], false);
        assert!(super::HostPattern::parse("*.example.com").matches("registry.example.com"));
        let _ = policy;
    }
}
