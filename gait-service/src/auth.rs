// gait-service/src/auth.rs
// ============================================================================
// Module: Request Authentication
// Description: Transport-aware authentication for the decision service.
// Purpose: Implement spec.md §4.12's bind-time hardening: loopback-only by
// default, bearer-token auth compared in constant time when non-loopback.
// Dependencies: gait-core, subtle
// ============================================================================

//! ## Overview
//! Adapted from the teacher's `decision-gate-mcp::auth` (`RequestContext`,
//! `AuthContext`, `authorize_local_only`/`authorize_bearer`). The teacher's
//! bearer check is a `BTreeSet::contains` lookup, which short-circuits on
//! the first byte mismatch; `spec.md` §4.12 requires the comparison itself
//! be constant-time, so [`authorize`] compares every configured token with
//! [`subtle::ConstantTimeEq`] and never returns early on a partial match.

use std::net::IpAddr;

use gait_schema::config::ServiceAuthMode;
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Maximum accepted length of the `Authorization` header, bytes.
const MAX_AUTH_HEADER_BYTES: usize = 8 * 1024;

/// The peer and header context a request was received under.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Peer address, when the request arrived over HTTP.
    pub peer_ip: Option<IpAddr>,
    /// Raw `Authorization` header value, if present.
    pub auth_header: Option<String>,
}

impl RequestContext {
    /// Builds a context from a peer address and an optional auth header.
    #[must_use]
    pub const fn new(peer_ip: Option<IpAddr>, auth_header: Option<String>) -> Self {
        Self { peer_ip, auth_header }
    }

    /// Returns whether the peer address is loopback, or `true` when no
    /// peer address was recorded (e.g. an in-process call).
    #[must_use]
    pub fn peer_is_loopback(&self) -> bool {
        self.peer_ip.is_none_or(|ip| ip.is_loopback())
    }
}

/// How a request was authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// Authenticated by loopback bind with no token mode configured.
    Loopback,
    /// Authenticated by a matching bearer token.
    BearerToken,
}

/// The result of a successful authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    /// How this request was authenticated.
    pub method: AuthMethod,
}

/// Errors raised rejecting an unauthenticated request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// Loopback-only mode rejected a non-loopback peer.
    #[error("loopback-only mode requires a loopback peer")]
    NonLoopbackPeer,
    /// Token mode rejected a missing, malformed, or non-matching bearer token.
    #[error("missing or invalid bearer token")]
    InvalidToken,
}

/// Authorizes one request under `mode` against the configured token set.
///
/// # Errors
///
/// Returns [`AuthError::NonLoopbackPeer`] if `mode` is
/// [`ServiceAuthMode::LoopbackOnly`] and the peer is not loopback, or
/// [`AuthError::InvalidToken`] if `mode` is [`ServiceAuthMode::Token`] and
/// no configured token matches the request's bearer token.
pub fn authorize(ctx: &RequestContext, mode: ServiceAuthMode, tokens: &[String]) -> Result<AuthContext, AuthError> {
    match mode {
        ServiceAuthMode::LoopbackOnly => {
            if ctx.peer_is_loopback() {
                Ok(AuthContext { method: AuthMethod::Loopback })
            } else {
                Err(AuthError::NonLoopbackPeer)
            }
        }
        ServiceAuthMode::Token => {
            let token = parse_bearer_token(ctx.auth_header.as_deref())?;
            if tokens_match(&token, tokens) {
                Ok(AuthContext { method: AuthMethod::BearerToken })
            } else {
                Err(AuthError::InvalidToken)
            }
        }
    }
}

/// Compares `candidate` against every entry in `tokens` in constant time,
/// never short-circuiting on the first mismatch.
fn tokens_match(candidate: &str, tokens: &[String]) -> bool {
    let candidate_bytes = candidate.as_bytes();
    let mut matched = subtle::Choice::from(0_u8);
    for token in tokens {
        let token_bytes = token.as_bytes();
        if token_bytes.len() != candidate_bytes.len() {
            continue;
        }
        matched |= candidate_bytes.ct_eq(token_bytes);
    }
    matched.into()
}

fn parse_bearer_token(auth_header: Option<&str>) -> Result<String, AuthError> {
    let header = auth_header.ok_or(AuthError::InvalidToken)?;
    if header.len() > MAX_AUTH_HEADER_BYTES {
        return Err(AuthError::InvalidToken);
    }
    let mut parts = header.trim().splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default().trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::InvalidToken);
    }
    Ok(token.to_string())
}

#[cfg(test)]
mod tests {
    use std::net::IpAddr;
    use std::net::Ipv4Addr;

    use super::AuthError;
    use super::AuthMethod;
    use super::RequestContext;
    use super::authorize;
    use gait_schema::config::ServiceAuthMode;

    #[test]
    fn loopback_peer_is_authorized_under_loopback_only() {
        let ctx = RequestContext::new(Some(IpAddr::V4(Ipv4Addr::LOCALHOST)), None);
        let auth = authorize(&ctx, ServiceAuthMode::LoopbackOnly, &[]).expect("authorized");
        assert_eq!(auth.method, AuthMethod::Loopback);
    }

    #[test]
    fn remote_peer_is_rejected_under_loopback_only() {
        let ctx = RequestContext::new(Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))), None);
        assert_eq!(authorize(&ctx, ServiceAuthMode::LoopbackOnly, &[]), Err(AuthError::NonLoopbackPeer));
    }

    #[test]
    fn matching_bearer_token_is_authorized() {
        let ctx = RequestContext::new(None, Some("Bearer s3cret".to_string()));
        let auth = authorize(&ctx, ServiceAuthMode::Token, &["s3cret".to_string()]).expect("authorized");
        assert_eq!(auth.method, AuthMethod::BearerToken);
    }

    #[test]
    fn non_matching_bearer_token_is_rejected() {
        let ctx = RequestContext::new(None, Some("Bearer wrong".to_string()));
        assert_eq!(authorize(&ctx, ServiceAuthMode::Token, &["s3cret".to_string()]), Err(AuthError::InvalidToken));
    }

    #[test]
    fn missing_authorization_header_is_rejected_under_token_mode() {
        let ctx = RequestContext::new(None, None);
        assert_eq!(authorize(&ctx, ServiceAuthMode::Token, &["s3cret".to_string()]), Err(AuthError::InvalidToken));
    }

    #[test]
    fn malformed_scheme_is_rejected() {
        let ctx = RequestContext::new(None, Some("Basic s3cret".to_string()));
        assert_eq!(authorize(&ctx, ServiceAuthMode::Token, &["s3cret".to_string()]), Err(AuthError::InvalidToken));
    }
}
