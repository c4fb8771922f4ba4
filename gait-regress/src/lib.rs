// gait-regress/src/lib.rs
// ============================================================================
// Module: Regression Harness
// Description: Capture runpack fixtures, then replay them to detect
// deterministic drift.
// Purpose: Implement `spec.md` §4.11: `Init`, `Run`, and `Bootstrap`, with
// stable exit codes for CI consumption.
// Dependencies: gait-core, gait-pack, gait-schema
// ============================================================================

//! ## Overview
//! Grounded on the teacher's golden-runpack and AssetCore determinism
//! system tests: both compare a freshly produced artifact against a
//! captured baseline rather than re-deriving a verdict from scratch, since
//! the gate evaluator's full input set (policy document, tokens, broker)
//! is not itself part of a runpack. [`fixture::Fixture`] is the captured
//! baseline; [`init::init`]/[`init::bootstrap`] produce one, [`run::run`]
//! replays the declared set and reports pass/fail per fixture.

pub mod config;
pub mod context_conformance;
pub mod fixture;
pub mod init;
pub mod junit;
pub mod run;

pub use config::RegressConfig;
pub use context_conformance::ContextDrift;
pub use context_conformance::classify_drift;
pub use fixture::CaptureMode;
pub use fixture::Fixture;
pub use init::bootstrap;
pub use init::init;
pub use junit::render;
pub use run::FixtureOutcome;
pub use run::RegressReport;
pub use run::run;

use thiserror::Error;

/// Exit code returned when every declared fixture replayed cleanly.
pub const EXIT_PASS: i32 = 0;
/// Exit code returned when at least one fixture's replay diverged.
pub const EXIT_REGRESSION: i32 = 5;
/// Exit code returned when the regression config or a fixture is invalid.
pub const EXIT_INVALID_INPUT: i32 = 6;

/// Errors raised while capturing or replaying regression fixtures.
#[derive(Debug, Error)]
pub enum RegressError {
    /// A pack build, verify, or parse operation failed.
    #[error("pack error: {0}")]
    Pack(#[from] gait_pack::PackError),

    /// A deterministic ZIP codec operation failed.
    #[error("zip error: {0}")]
    Zip(#[from] gait_core::ZipError),

    /// A filesystem primitive failed.
    #[error("fs error: {0}")]
    Fs(#[from] gait_core::fsutil::FsError),

    /// Reading, writing, or parsing a fixture or config file failed.
    #[error("io error: {0}")]
    Io(String),

    /// A `gait.yaml` regression config named a fixture that does not exist.
    #[error("unknown fixture: {0}")]
    UnknownFixture(String),

    /// A fixture's captured baseline disagreed with its replay.
    #[error("fixture {run_id} diverged: {detail}")]
    Diverged {
        /// The fixture's run ID.
        run_id: String,
        /// Human-readable description of what diverged.
        detail: String,
    },
}

impl gait_core::GaitError for RegressError {
    fn category(&self) -> gait_core::ErrorCategory {
        match self {
            Self::Pack(_) | Self::Zip(_) => gait_core::ErrorCategory::ArtifactIntegrity,
            Self::Fs(_) | Self::Io(_) => gait_core::ErrorCategory::Environment,
            Self::UnknownFixture(_) => gait_core::ErrorCategory::Input,
            Self::Diverged { .. } => gait_core::ErrorCategory::Regression,
        }
    }
}
