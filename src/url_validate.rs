//! # URL Validator (C1)
//!
//! Gates every outbound URL this crate issues a request to, against SSRF and
//! scheme/host policy, before C5's discovery ladder or C11's executor touch
//! the network.

use crate::error::{CoreError, CoreResult};
use std::net::IpAddr;
use url::{Host, Url};

/// Policy controlling which hosts [`validate`] accepts.
///
/// The default policy rejects loopback, link-local, and private ranges —
/// appropriate for talking to third-party SaaS APIs. Local/integration
/// testing against `http://localhost:PORT` needs the allowlist.
#[derive(Debug, Clone, Default)]
pub struct UrlPolicy {
    /// Hostnames or IPs allowed even though they would otherwise be rejected
    /// (e.g. `localhost`, `127.0.0.1`) — for local test fixtures only.
    pub allow_local: Vec<String>,
}

impl UrlPolicy {
    #[must_use]
    pub fn allowing(hosts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        UrlPolicy {
            allow_local: hosts.into_iter().map(Into::into).collect(),
        }
    }

    fn allows_host(&self, host: &str) -> bool {
        self.allow_local.iter().any(|h| h.eq_ignore_ascii_case(host))
    }
}

/// Validate a candidate URL against scheme and host policy.
///
/// Fails with [`CoreError::InvalidUrl`] unless: the scheme is `http` or
/// `https`; the host is non-empty; and the host does not resolve (by literal
/// IP, since DNS resolution happens at request time and is out of scope
/// here) to a loopback, link-local, or private range — unless explicitly
/// allowlisted by `policy`.
pub fn validate(url: &str, policy: &UrlPolicy) -> CoreResult<Url> {
    let parsed = Url::parse(url).map_err(|e| CoreError::InvalidUrl(format!("{url}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(CoreError::InvalidUrl(format!("unsupported scheme {other:?}"))),
    }

    let host = parsed
        .host()
        .ok_or_else(|| CoreError::InvalidUrl("missing host".into()))?;

    let host_str = parsed.host_str().unwrap_or_default();
    if policy.allows_host(host_str) {
        return Ok(parsed);
    }

    if let Host::Ipv4(v4) = host {
        if is_disallowed_ipv4(&v4) {
            return Err(CoreError::InvalidUrl(format!(
                "{host_str} is a loopback/private/link-local address"
            )));
        }
    }
    if let Host::Ipv6(v6) = host {
        if is_disallowed_ipv6(&v6) {
            return Err(CoreError::InvalidUrl(format!(
                "{host_str} is a loopback/private/link-local address"
            )));
        }
    }
    if matches!(host, Host::Domain(d) if d.eq_ignore_ascii_case("localhost")) {
        return Err(CoreError::InvalidUrl("localhost is not allowed".into()));
    }

    Ok(parsed)
}

fn is_disallowed_ipv4(ip: &std::net::Ipv4Addr) -> bool {
    ip.is_loopback() || ip.is_link_local() || ip.is_private() || ip.is_unspecified()
}

fn is_disallowed_ipv6(ip: &std::net::Ipv6Addr) -> bool {
    if ip.is_loopback() || ip.is_unspecified() {
        return true;
    }
    // Unique local addresses (fc00::/7) — the IPv6 analogue of RFC 1918.
    (ip.segments()[0] & 0xfe00) == 0xfc00
}

/// Validate one hop in a redirect chain against the same policy; callers
/// re-invoke this for every `Location` header they follow.
pub fn validate_redirect_hop(url: &str, policy: &UrlPolicy) -> CoreResult<Url> {
    validate(url, policy)
}

/// Re-check whether a resolved socket address for `host` would violate
/// policy — used when a caller wants to validate the address a DNS lookup
/// actually produced, not just the literal URL text.
#[must_use]
pub fn validate_resolved_addr(addr: &IpAddr, policy: &UrlPolicy, host_str: &str) -> bool {
    if policy.allows_host(host_str) {
        return true;
    }
    match addr {
        IpAddr::V4(v4) => !is_disallowed_ipv4(v4),
        IpAddr::V6(v6) => !is_disallowed_ipv6(v6),
    }
}
