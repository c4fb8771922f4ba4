// gait-broker/src/source/mod.rs
// ============================================================================
// Module: Credential Sources
// Description: Scheme-routed credential resolution backends.
// Purpose: Resolve a broker reference URI into a credential grant.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! A [`CredentialSource`] resolves one URI scheme. [`crate::CompositeCredentialBroker`]
//! routes a broker reference to the registered source for its scheme, the
//! same dispatch shape as the teacher's `decision-gate-broker::CompositeBroker`
//! routing `ContentRef` URIs to `Source` implementations.

use thiserror::Error;

/// Resolves `env:<VAR_NAME>` references from process environment.
pub mod env;
/// Resolves `https://...` broker references by POSTing a scope request.
pub mod http;
/// Resolves `inline:<name>` references from an in-memory map.
pub mod inline;

pub use env::EnvCredentialSource;
pub use http::HttpCredentialSource;
pub use inline::InlineCredentialSource;

/// Errors raised while resolving a credential from a source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The reference URI could not be parsed.
    #[error("invalid broker reference: {0}")]
    InvalidReference(String),
    /// No source is registered for the reference's scheme.
    #[error("no credential source for scheme: {0}")]
    UnsupportedScheme(String),
    /// The named environment variable was not set.
    #[error("credential environment variable not set: {0}")]
    MissingEnvVar(String),
    /// The HTTP call to the broker failed.
    #[error("broker http call failed: {0}")]
    Http(String),
    /// The host policy rejected the broker endpoint.
    #[error("broker host rejected: {0}")]
    Policy(String),
    /// The broker's JSON response was malformed.
    #[error("broker response malformed: {0}")]
    MalformedResponse(String),
}

/// Resolves a single URI scheme into a credential reference string.
pub trait CredentialSource: Send + Sync {
    /// Resolves `reference` (with the caller having already stripped the
    /// matched scheme) and `scopes` into an opaque credential reference.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the reference cannot be resolved.
    fn resolve(&self, reference: &str, scopes: &[String]) -> Result<String, SourceError>;
}
