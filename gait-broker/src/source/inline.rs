// gait-broker/src/source/inline.rs
// ============================================================================
// Module: Inline Credential Source
// Description: Resolves `inline:<name>` references from an in-memory map.
// Purpose: Support dev/test fixtures and statically-provisioned credentials
// without any external call.
// Dependencies: std::collections::BTreeMap
// ============================================================================

//! ## Overview
//! Adapted from the teacher's `decision-gate-broker::source::inline::InlineSource`,
//! generalized from a base64-payload decoder to a named-entry lookup, since a
//! credential reference is an opaque string rather than an encoded payload.

use std::collections::BTreeMap;

use crate::source::CredentialSource;
use crate::source::SourceError;

/// Resolves credential references from a fixed, in-memory name-to-value map.
#[derive(Debug, Clone, Default)]
pub struct InlineCredentialSource {
    entries: BTreeMap<String, String>,
}

impl InlineCredentialSource {
    /// Builds an inline source from `entries`.
    #[must_use]
    pub fn new(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }
}

impl CredentialSource for InlineCredentialSource {
    fn resolve(&self, reference: &str, _scopes: &[String]) -> Result<String, SourceError> {
        self.entries.get(reference).cloned().ok_or_else(|| SourceError::InvalidReference(format!("no inline entry named {reference}")))
    }
}
