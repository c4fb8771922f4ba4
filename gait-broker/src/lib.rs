// gait-broker/src/lib.rs
// ============================================================================
// Module: Credential Broker
// Description: Scheme-routed credential resolution implementing
// `gait_policy::CredentialBroker`.
// Purpose: Satisfy `require_broker_credential` constraints in the policy
// gate without the evaluator depending on a concrete transport.
// Dependencies: gait-core, gait-policy
// ============================================================================

//! ## Overview
//! [`CompositeCredentialBroker`] routes a `broker_reference` string by its
//! URI scheme (`inline:`, `env:`, `https:`) to a registered
//! [`source::CredentialSource`], exactly as the teacher's
//! `decision-gate-broker::CompositeBroker` routes `ContentRef` URIs to a
//! `Source` by scheme. Fail-closed: an unresolved scheme or a source error
//! always surfaces as [`gait_policy::BrokerError`], never a default grant.

pub mod net;
pub mod sink;
pub mod source;

use std::collections::BTreeMap;
use std::sync::Arc;

use gait_policy::BrokerError;
use gait_policy::CredentialBroker;
use gait_policy::CredentialGrant;

use crate::sink::CredentialAuditSink;
use crate::sink::CredentialGrantRecord;
use crate::source::CredentialSource;

/// Builder for [`CompositeCredentialBroker`].
#[derive(Default)]
pub struct CompositeCredentialBrokerBuilder {
    sources: BTreeMap<String, Arc<dyn CredentialSource>>,
}

impl CompositeCredentialBrokerBuilder {
    /// Registers `source` to handle references whose scheme is `scheme`.
    #[must_use]
    pub fn source(mut self, scheme: impl Into<String>, source: impl CredentialSource + 'static) -> Self {
        self.sources.insert(scheme.into(), Arc::new(source));
        self
    }

    /// Finishes the builder.
    #[must_use]
    pub fn build(self) -> CompositeCredentialBroker {
        CompositeCredentialBroker { sources: self.sources, audit: None }
    }
}

/// Routes broker references to registered sources by scheme.
pub struct CompositeCredentialBroker {
    sources: BTreeMap<String, Arc<dyn CredentialSource>>,
    audit: Option<Arc<CredentialAuditSink<std::fs::File>>>,
}

impl CompositeCredentialBroker {
    /// Returns a builder for a composite broker.
    #[must_use]
    pub fn builder() -> CompositeCredentialBrokerBuilder {
        CompositeCredentialBrokerBuilder::default()
    }

    /// Attaches a file-backed audit sink that records every successful grant.
    #[must_use]
    pub fn with_audit_sink(mut self, sink: CredentialAuditSink<std::fs::File>) -> Self {
        self.audit = Some(Arc::new(sink));
        self
    }

    fn split_scheme(reference: &str) -> Option<(&str, &str)> {
        reference.split_once(':')
    }
}

impl CredentialBroker for CompositeCredentialBroker {
    fn grant(&self, reference: &str, scopes: &[String]) -> Result<CredentialGrant, BrokerError> {
        let (scheme, _) = Self::split_scheme(reference).ok_or_else(|| BrokerError::NotFound(reference.to_string()))?;
        let source = self.sources.get(scheme).ok_or_else(|| BrokerError::NotFound(format!("no source registered for scheme {scheme}")))?;
        let credential_ref = if scheme == "https" {
            source.resolve(reference, scopes)
        } else {
            let (_, rest) = Self::split_scheme(reference).unwrap_or((scheme, ""));
            source.resolve(rest, scopes)
        }
        .map_err(|err| BrokerError::CallFailed(err.to_string()))?;

        if let Some(audit) = &self.audit {
            let record = CredentialGrantRecord { broker_reference: reference.to_string(), scopes: scopes.to_vec(), credential_ref: credential_ref.clone() };
            audit.record(&record).map_err(|err| BrokerError::CallFailed(err.to_string()))?;
        }

        Ok(CredentialGrant { credential_ref })
    }
}
