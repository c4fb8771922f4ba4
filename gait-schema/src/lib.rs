// gait-schema/src/lib.rs
// ============================================================================
// Module: Gait Schema Registry
// Description: Strict validators and typed records for every schema in the
// Gait data model.
// Purpose: Give every other crate one pure, side-effect-free place to parse
// and validate intents, policies, tokens, traces, job state, and config.
// Dependencies: gait-core
// ============================================================================

//! ## Overview
//! Every record type here derives `Serialize`/`Deserialize` with
//! `#[serde(deny_unknown_fields)]` so an unrecognized top-level field fails
//! strict parse, per `spec.md` §4.5. Validators are pure functions: they
//! read a parsed value and return `Ok(())` or a [`SchemaError`], never
//! mutating their input.

pub mod config;
pub mod event;
pub mod intent;
pub mod job;
pub mod pack;
pub mod policy;
pub mod registry;
pub mod tokens;
pub mod trace;

pub use config::GaitConfig;
pub use event::Event;
pub use event::EventType;
pub use intent::IntentRequest;
pub use intent::Target;
pub use job::Checkpoint;
pub use job::CheckpointType;
pub use job::JobState;
pub use job::JobStatus;
pub use pack::ManifestEntry;
pub use pack::PackManifest;
pub use pack::PackType;
pub use policy::Policy;
pub use policy::PolicyEffect;
pub use policy::PolicyRule;
pub use policy::Verdict;
pub use registry::ManifestSignature;
pub use registry::RegistryManifest;
pub use tokens::ApprovalToken;
pub use tokens::DelegationToken;
pub use trace::TraceRecord;

use thiserror::Error;

/// Errors raised by strict schema validation.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The record failed structural or semantic validation.
    #[error("schema_invalid: {0}")]
    Invalid(String),

    /// JSON parsing failed outright (malformed syntax, unknown field, wrong type).
    #[error("schema_invalid: failed to parse json: {0}")]
    Json(String),

    /// YAML parsing failed outright.
    #[error("schema_invalid: failed to parse yaml: {0}")]
    Yaml(String),
}

impl From<serde_json::Error> for SchemaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<serde_yaml::Error> for SchemaError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Yaml(err.to_string())
    }
}

impl gait_core::GaitError for SchemaError {
    fn category(&self) -> gait_core::ErrorCategory {
        gait_core::ErrorCategory::Input
    }
}

/// Common envelope fields carried by every Gait record, per `spec.md` §3.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RecordEnvelope {
    /// Stable schema identifier, e.g. `"gait.intent_request"`.
    pub schema_id: String,
    /// Schema version, e.g. `"1"`.
    pub schema_version: String,
    /// RFC 3339 nanosecond timestamp at which the record was produced.
    pub created_at: gait_core::Timestamp,
    /// Version string of the component that produced this record.
    pub producer_version: String,
}
