// gait-registry/src/lib.rs
// ============================================================================
// Module: Registry Client
// Description: Install, list, and verify signed registry manifests.
// Purpose: Implement `spec.md` §4.9's pack-registry trust chain: publisher
// allowlisting, digest pinning, signature verification, and bounded retry
// with cached fallback.
// Dependencies: gait-core, gait-schema, reqwest (blocking), url
// ============================================================================

//! ## Overview
//! Grounded on the teacher's `decision-gate-broker::source::http` fetch path,
//! generalized from "fetch bytes matching a policy" to "fetch, trust-verify,
//! and cache a signed manifest". [`install::install`] is the only operation
//! that writes to the cache; [`list::list`] and [`verify::verify`] are
//! read-only.

pub mod install;
pub mod list;
pub mod net;
pub mod retry;
pub mod verify;

pub use install::InstallReport;
pub use install::InstallRequest;
pub use install::Source;
pub use install::install;
pub use list::CachedEntry;
pub use list::list;
pub use net::HostPolicyError;
pub use net::RegistryHostPolicy;
pub use verify::VerifyReport;
pub use verify::verify;

use thiserror::Error;

/// Errors raised by the registry client.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The manifest could not be fetched from its source.
    #[error("failed to fetch registry manifest: {0}")]
    Fetch(String),

    /// The fetched bytes failed strict schema validation.
    #[error("invalid registry manifest: {0}")]
    Manifest(String),

    /// The remote host failed policy enforcement.
    #[error("registry host policy violation: {0}")]
    HostPolicy(String),

    /// The manifest's publisher is not in the configured allowlist.
    #[error("publisher {0} is not allowlisted")]
    PublisherNotAllowlisted(String),

    /// The manifest's digest did not match a configured pin.
    #[error("digest pin mismatch: expected {expected}, found {found}")]
    PinMismatch {
        /// Digest the pin required.
        expected: String,
        /// Digest actually present in the manifest.
        found: String,
    },

    /// No signature in the manifest verified against the trusted key.
    #[error("no valid signature found for the configured trust key")]
    SignatureInvalid,

    /// Reading or writing the local cache failed.
    #[error("registry cache error: {0}")]
    Cache(String),
}

impl gait_core::GaitError for RegistryError {
    fn category(&self) -> gait_core::ErrorCategory {
        match self {
            Self::Manifest(_) => gait_core::ErrorCategory::Input,
            Self::PublisherNotAllowlisted(_) | Self::PinMismatch { .. } | Self::SignatureInvalid => gait_core::ErrorCategory::Trust,
            Self::HostPolicy(_) | Self::Cache(_) => gait_core::ErrorCategory::Environment,
            Self::Fetch(_) => gait_core::ErrorCategory::TransientNetwork,
        }
    }
}
