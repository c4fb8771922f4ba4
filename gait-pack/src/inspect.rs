// gait-pack/src/inspect.rs
// ============================================================================
// Module: Pack Inspector
// Description: Parses a pack's manifest and typed payloads into a
// language-neutral summary, with no side effects.
// Purpose: Implement `spec.md` §4.8 Inspect.
// Dependencies: gait-core::zip, gait-schema
// ============================================================================

//! ## Overview
//! Inspect never writes, signs, or mutates anything; it only reads archive
//! bytes already in memory. Each pack type gets its own summary shape,
//! following the teacher's verifier's approach of reading typed artifacts
//! back out by their known path rather than treating the archive as opaque
//! bytes.

use gait_schema::Event;
use gait_schema::IntentRequest;
use gait_schema::JobState;
use gait_schema::TraceRecord;
use gait_schema::pack::PackManifest;
use gait_schema::pack::PackType;

use crate::MANIFEST_PATH;
use crate::MAX_ENTRY_BYTES;
use crate::PackError;
use crate::refs::RunpackRef;

/// Summary of a run pack's intent/result lineage.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RunSummary {
    /// The run this pack was captured from.
    pub run_id: Option<String>,
    /// Tool names of every recorded intent, in recorded order.
    pub intent_tool_names: Vec<String>,
    /// Verdicts of every recorded trace, in recorded order.
    pub trace_verdicts: Vec<String>,
}

/// Summary of a job pack's event counts and final status.
#[derive(Debug, Clone, serde::Serialize)]
pub struct JobSummary {
    /// The job's identifier.
    pub job_id: String,
    /// The job's final recorded status.
    pub final_status: String,
    /// Number of events recorded, grouped by event type.
    pub event_counts: std::collections::BTreeMap<String, usize>,
}

/// Summary of a call pack's embedded runpack and speak-receipt chain.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CallSummary {
    /// Tool name of the evaluated intent.
    pub tool_name: String,
    /// Verdict reached for the evaluated intent.
    pub verdict: String,
    /// Whether an embedded runpack is present.
    pub has_embedded_runpack: bool,
    /// Number of receipts in the speak-receipt chain.
    pub receipt_chain_len: usize,
}

/// A language-neutral pack summary, shaped by the pack's type.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "pack_type", rename_all = "snake_case")]
#[allow(clippy::large_enum_variant, reason = "summaries are inspect-only output, never hot-path allocated in bulk")]
pub enum InspectSummary {
    /// A run pack's summary.
    Run(RunSummary),
    /// A job pack's summary.
    Job(JobSummary),
    /// A call pack's summary.
    Call(CallSummary),
    /// An incident or evidence pack's referenced-runpack summary.
    References(Vec<RunpackRef>),
}

/// Parses a pack archive into a language-neutral summary. Performs no side
/// effects: no signature check, no filesystem write.
///
/// # Errors
///
/// Returns [`PackError::Zip`] if the archive cannot be parsed,
/// [`PackError::MissingManifest`] if it has no manifest entry, and
/// [`PackError::Schema`] if the manifest or a typed payload fails strict
/// validation.
pub fn inspect_pack(archive: &[u8]) -> Result<InspectSummary, PackError> {
    let entries = gait_core::read_entries(archive, MAX_ENTRY_BYTES)?;
    crate::enforce_aggregate_limit(&entries)?;
    let manifest_entry = entries.iter().find(|entry| entry.name == MANIFEST_PATH).ok_or(PackError::MissingManifest)?;
    let manifest = PackManifest::parse(&manifest_entry.contents)?;

    let find = |path: &str| entries.iter().find(|entry| entry.name == path).map(|entry| entry.contents.as_slice());

    match manifest.pack_type {
        PackType::Run => {
            let mut intent_tool_names = Vec::new();
            let mut trace_verdicts = Vec::new();
            for manifest_item in &manifest.entries {
                if let Some(bytes) = find(&manifest_item.path) {
                    if manifest_item.path.starts_with("intents/") {
                        let intent = IntentRequest::parse(bytes)?;
                        intent_tool_names.push(intent.tool_name);
                    } else if manifest_item.path.starts_with("traces/") {
                        let trace: TraceRecord = serde_json::from_slice(bytes).map_err(|err| PackError::Schema(err.to_string()))?;
                        trace_verdicts.push(format!("{:?}", trace.verdict));
                    }
                }
            }
            Ok(InspectSummary::Run(RunSummary { run_id: manifest.run_id, intent_tool_names, trace_verdicts }))
        }
        PackType::Job => {
            let state_bytes = find("state.json").ok_or_else(|| PackError::Schema("job pack missing state.json".to_string()))?;
            let state = JobState::parse(state_bytes)?;
            let mut event_counts = std::collections::BTreeMap::new();
            if let Some(bytes) = find("events.jsonl") {
                let text = std::str::from_utf8(bytes).map_err(|err| PackError::Schema(err.to_string()))?;
                for line in text.lines().filter(|line| !line.is_empty()) {
                    let event = Event::parse_line(line)?;
                    *event_counts.entry(format!("{:?}", event.event_type)).or_insert(0) += 1;
                }
            }
            Ok(InspectSummary::Job(JobSummary { job_id: state.job_id, final_status: format!("{:?}", state.status), event_counts }))
        }
        PackType::Call => {
            let intent_bytes = find("intent.json").ok_or_else(|| PackError::Schema("call pack missing intent.json".to_string()))?;
            let intent = IntentRequest::parse(intent_bytes)?;
            let trace_bytes = find("trace.json").ok_or_else(|| PackError::Schema("call pack missing trace.json".to_string()))?;
            let trace: TraceRecord = serde_json::from_slice(trace_bytes).map_err(|err| PackError::Schema(err.to_string()))?;
            let receipt_chain_len = manifest.entries.iter().filter(|entry| entry.path.starts_with("receipts/")).count();
            Ok(InspectSummary::Call(CallSummary {
                tool_name: intent.tool_name,
                verdict: format!("{:?}", trace.verdict),
                has_embedded_runpack: find("runpack.zip").is_some(),
                receipt_chain_len,
            }))
        }
        PackType::Incident | PackType::Evidence => {
            let refs_bytes = find("refs.json").ok_or_else(|| PackError::Schema("referencing pack missing refs.json".to_string()))?;
            let refs: Vec<RunpackRef> = serde_json::from_slice(refs_bytes).map_err(|err| PackError::Schema(err.to_string()))?;
            Ok(InspectSummary::References(refs))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::InspectSummary;
    use super::inspect_pack;
    use crate::build::build_run_pack;
    use gait_core::Timestamp;
    use gait_schema::IntentRequest;
    use gait_schema::Target;

    fn sample_intent() -> IntentRequest {
        IntentRequest {
            tool_name: "file.write".to_string(),
            args: serde_json::json!({}),
            targets: vec![Target { kind: "file".to_string(), value: "/tmp/x".to_string(), operation: None, endpoint_class: None, destructive: None }],
            arg_provenance: vec![],
            context: serde_json::json!({}),
            delegation: None,
            skill_provenance: None,
        }
    }

    #[test]
    fn summarizes_a_run_pack_intent_lineage() {
        let built = build_run_pack("run_1", &[sample_intent()], &[], None).expect("build");
        let summary = inspect_pack(&built.archive).expect("inspect");
        match summary {
            InspectSummary::Run(run) => {
                assert_eq!(run.run_id.as_deref(), Some("run_1"));
                assert_eq!(run.intent_tool_names, vec!["file.write".to_string()]);
            }
            other => panic!("expected a run summary, got {other:?}"),
        }
    }

    #[test]
    fn inspect_never_panics_on_an_empty_run_pack() {
        let built = build_run_pack("run_1", &[], &[], None).expect("build");
        let summary = inspect_pack(&built.archive).expect("inspect");
        assert!(matches!(summary, InspectSummary::Run(_)));
        let _ = Timestamp::from_unix_millis(0).unwrap();
    }
}
