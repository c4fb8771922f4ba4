// gait-service/src/state.rs
// ============================================================================
// Module: Service State
// Description: The shared, immutable-after-construction state one service
// process holds across every request.
// Purpose: Load the policy document, signing key, and job/pack roots once at
// startup rather than per request.
// Dependencies: gait-core, gait-jobs, gait-schema
// ============================================================================

//! ## Overview
//! Adapted from the teacher's `ServerState`/`build_server_state` (a single
//! struct built once and wrapped in an `Arc` for every handler). Unlike the
//! teacher, which holds a run-state store and schema registry, this state
//! holds exactly what `spec.md` §4.12 needs to evaluate and, optionally,
//! pack a decision: the policy document, an optional signing key, and the
//! roots for job lookups and pack emission.

use std::path::PathBuf;
use std::sync::Arc;

use gait_core::PrivateKey;
use gait_jobs::JobRuntime;
use gait_schema::Policy;
use gait_schema::config::ServiceConfig;
use gait_schema::tokens::ApprovalToken;
use gait_schema::tokens::DelegationToken;

/// Immutable service state shared across every handler.
pub struct ServiceState {
    /// The decision-service HTTP settings.
    pub config: ServiceConfig,
    /// The policy document evaluated for every request.
    pub policy: Policy,
    /// Key used to sign trace records and packs, if configured.
    pub signing_key: Option<PrivateKey>,
    /// Job runtime rooted at the deployment's jobs directory, used for stop
    /// preemption.
    pub jobs: JobRuntime,
    /// Directory auto-emitted packs are written under.
    pub pack_dir: PathBuf,
}

impl ServiceState {
    /// Builds service state from an already-loaded policy and config.
    #[must_use]
    pub fn new(config: ServiceConfig, policy: Policy, signing_key: Option<PrivateKey>, jobs_root: PathBuf) -> Self {
        let pack_dir = config.pack_dir.clone().unwrap_or_else(|| jobs_root.join("packs"));
        Self { config, policy, signing_key, jobs: JobRuntime::new(jobs_root), pack_dir }
    }

    /// Wraps this state for sharing across handler tasks.
    #[must_use]
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

/// Approval and delegation tokens supplied alongside one evaluate request.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct SuppliedTokens {
    /// Approval tokens presented with the request.
    #[serde(default)]
    pub approval_tokens: Vec<ApprovalToken>,
    /// Delegation tokens presented with the request.
    #[serde(default)]
    pub delegation_tokens: Vec<DelegationToken>,
}
