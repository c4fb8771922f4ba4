// gait-broker/src/sink.rs
// ============================================================================
// Module: Credential Grant Audit Sink
// Description: Records one JSON line per successful credential grant.
// Purpose: Give operators a local audit trail of broker activity,
// independent of the trace/approval ledger `gait-ledger` owns.
// Dependencies: gait-core, serde_json
// ============================================================================

//! ## Overview
//! Adapted from the teacher's `decision-gate-broker::sink::log::LogSink`:
//! a `Write`-backed sink that serializes one record per delivery. Here the
//! "delivery" is a granted credential rather than a dispatched payload.

use std::io::Write;
use std::sync::Mutex;

use serde::Serialize;

/// Errors raised while writing a sink record.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The underlying writer failed, or its guarding mutex was poisoned.
    #[error("credential sink write failed: {0}")]
    WriteFailed(String),
}

/// One audit record for a granted credential.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialGrantRecord {
    /// The broker reference that was resolved.
    pub broker_reference: String,
    /// Scopes requested.
    pub scopes: Vec<String>,
    /// Opaque credential reference returned by the source.
    pub credential_ref: String,
}

/// Writes one JSON line per granted credential to an arbitrary writer.
pub struct CredentialAuditSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> CredentialAuditSink<W> {
    /// Wraps `writer` as a credential audit sink.
    pub fn new(writer: W) -> Self {
        Self { writer: Mutex::new(writer) }
    }

    /// Records a granted-credential audit line.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::WriteFailed`] if serialization or the
    /// underlying write fails, or the writer's mutex was poisoned.
    pub fn record(&self, record: &CredentialGrantRecord) -> Result<(), SinkError> {
        let mut guard = self.writer.lock().map_err(|_err| SinkError::WriteFailed("sink writer mutex poisoned".to_string()))?;
        serde_json::to_writer(&mut *guard, record).map_err(|err| SinkError::WriteFailed(err.to_string()))?;
        guard.write_all(b"\n").map_err(|err| SinkError::WriteFailed(err.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::CredentialAuditSink;
    use super::CredentialGrantRecord;

    #[test]
    fn records_one_line_per_grant() {
        let sink = CredentialAuditSink::new(Vec::new());
        sink.record(&CredentialGrantRecord {
            broker_reference: "inline:demo".to_string(),
            scopes: vec!["read".to_string()],
            credential_ref: "cred-1".to_string(),
        })
        .expect("record");
    }
}
