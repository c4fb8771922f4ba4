// gait-pack/src/lib.rs
// ============================================================================
// Module: Artifact Pipeline
// Description: Build, verify, inspect, and diff deterministic packs.
// Purpose: Give every run/job/call/incident/evidence artifact one shared
// manifest-first pipeline instead of a bespoke format per pack type.
// Dependencies: gait-core, gait-schema
// ============================================================================

//! ## Overview
//! Adapted from the teacher's `decision-gate-core::runtime::runpack` builder/
//! verifier pair, generalized from a single hard-coded artifact set (scenario
//! spec, trigger/decision/packet logs) to an arbitrary caller-supplied record
//! set carrying a [`gait_schema::pack::PackManifest`]. [`build`] composes
//! `gait_core::zip`, `gait_core::hashing`, and `gait_core::signing`; [`verify`]
//! replays the same digest checks offline; [`inspect`] and [`diff`] parse
//! manifests and payloads without ever touching a signing key.

pub mod build;
pub mod diff;
pub mod inspect;
pub mod refs;
pub mod verify;

pub use build::PackFile;
pub use build::build_call_pack;
pub use build::build_evidence_pack;
pub use build::build_incident_pack;
pub use build::build_job_pack;
pub use build::build_pack;
pub use build::build_run_pack;
pub use diff::ManifestChange;
pub use diff::PackDiff;
pub use diff::diff_pack;
pub use inspect::CallSummary;
pub use inspect::InspectSummary;
pub use inspect::JobSummary;
pub use inspect::RunSummary;
pub use inspect::inspect_pack;
pub use refs::RunpackRef;
pub use refs::summarize_refs;
pub use verify::SignatureStatus;
pub use verify::VerifyOptions;
pub use verify::VerifyReport;
pub use verify::verify_pack;

/// Name of the manifest entry written into every pack archive.
pub const MANIFEST_PATH: &str = "manifest.json";
/// Name of the detached signature entry, present only on signed packs.
pub const SIGNATURE_PATH: &str = "manifest.sig.json";
/// Maximum size of any single decompressed pack entry (8 MiB), per
/// `spec.md` §4.3's stated default.
pub const MAX_ENTRY_BYTES: u64 = 8 * 1024 * 1024;
/// Maximum summed decompressed size across every entry in one archive
/// (256 MiB), enforced in addition to the per-entry cap.
pub const MAX_AGGREGATE_BYTES: u64 = 256 * 1024 * 1024;

/// Checks the summed decompressed size of `entries` against
/// [`MAX_AGGREGATE_BYTES`], failing closed before any entry is parsed
/// further.
///
/// # Errors
///
/// Returns [`PackError::AggregateSizeExceeded`] once the running total
/// crosses the limit.
pub(crate) fn enforce_aggregate_limit(entries: &[gait_core::ZipEntry]) -> Result<(), PackError> {
    let mut total: u64 = 0;
    for entry in entries {
        total = total.saturating_add(entry.contents.len() as u64);
        if total > MAX_AGGREGATE_BYTES {
            return Err(PackError::AggregateSizeExceeded { total, limit: MAX_AGGREGATE_BYTES });
        }
    }
    Ok(())
}

/// Errors raised while building, verifying, inspecting, or diffing a pack.
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    /// The underlying ZIP container could not be written or parsed.
    #[error("zip error: {0}")]
    Zip(String),

    /// A manifest or typed payload failed strict schema validation.
    #[error("schema error: {0}")]
    Schema(String),

    /// Canonicalization or hashing of a record failed.
    #[error("digest error: {0}")]
    Digest(String),

    /// Signing or signature verification failed.
    #[error("signature error: {0}")]
    Sign(String),

    /// A pack required a signature but carried none.
    #[error("pack requires a signature but none is present")]
    SignatureRequired,

    /// The archive was missing its manifest entry.
    #[error("archive has no {MANIFEST_PATH} entry")]
    MissingManifest,

    /// The archive's summed decompressed entry size exceeded the aggregate
    /// budget.
    #[error("archive's total decompressed size {total} bytes exceeds the maximum allowed {limit} bytes")]
    AggregateSizeExceeded {
        /// Running total at the point the limit was crossed.
        total: u64,
        /// The aggregate byte budget that was exceeded.
        limit: u64,
    },

    /// The two packs compared by [`diff_pack`] are of different types.
    #[error("cannot diff packs of different types: {expected:?} vs {found:?}")]
    TypeMismatch {
        /// The first pack's type.
        expected: gait_schema::pack::PackType,
        /// The second pack's type.
        found: gait_schema::pack::PackType,
    },
}

impl From<gait_core::ZipError> for PackError {
    fn from(err: gait_core::ZipError) -> Self {
        Self::Zip(err.to_string())
    }
}

impl From<gait_schema::SchemaError> for PackError {
    fn from(err: gait_schema::SchemaError) -> Self {
        Self::Schema(err.to_string())
    }
}

impl From<gait_core::CanonicalError> for PackError {
    fn from(err: gait_core::CanonicalError) -> Self {
        Self::Digest(err.to_string())
    }
}

impl From<gait_core::SigningError> for PackError {
    fn from(err: gait_core::SigningError) -> Self {
        Self::Sign(err.to_string())
    }
}

impl gait_core::GaitError for PackError {
    fn category(&self) -> gait_core::ErrorCategory {
        match self {
            Self::Zip(_)
            | Self::Schema(_)
            | Self::Digest(_)
            | Self::MissingManifest
            | Self::AggregateSizeExceeded { .. }
            | Self::TypeMismatch { .. } => gait_core::ErrorCategory::ArtifactIntegrity,
            Self::Sign(_) | Self::SignatureRequired => gait_core::ErrorCategory::Trust,
        }
    }
}
