// gait-pack/src/refs.rs
// ============================================================================
// Module: Referenced-Runpack Summary
// Description: Stable, deduplicated projection of runpacks referenced by an
// incident or evidence pack.
// Purpose: Implement `spec.md` §4.8's referenced-runpack summary.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Incident and evidence packs never embed a referenced runpack's raw
//! payload; they carry only this redacted projection, per the Open Question
//! resolution recorded in `DESIGN.md`: `{ref_id, content_digest, kind}`,
//! sorted by `ref_id` and deduplicated by `content_digest`.

use serde::Deserialize;
use serde::Serialize;

/// One reference to a prior runpack or pack, redacted to its identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunpackRef {
    /// Stable identifier of the referenced artifact.
    pub ref_id: String,
    /// Content digest of the referenced artifact (lowercase hex SHA-256).
    pub content_digest: String,
    /// Kind of the referenced artifact, e.g. `"runpack"`, `"pack"`.
    pub kind: String,
}

/// Produces the stable, deduplicated summary of `refs`: sorted by `ref_id`,
/// keeping the first occurrence of each distinct `content_digest`.
#[must_use]
pub fn summarize_refs(refs: &[RunpackRef]) -> Vec<RunpackRef> {
    let mut sorted: Vec<RunpackRef> = refs.to_vec();
    sorted.sort_by(|a, b| a.ref_id.cmp(&b.ref_id));

    let mut seen_digests = std::collections::BTreeSet::new();
    sorted.retain(|reference| seen_digests.insert(reference.content_digest.clone()));
    sorted
}

#[cfg(test)]
mod tests {
    use super::RunpackRef;
    use super::summarize_refs;

    fn reference(ref_id: &str, digest: &str) -> RunpackRef {
        RunpackRef { ref_id: ref_id.to_string(), content_digest: digest.to_string(), kind: "runpack".to_string() }
    }

    #[test]
    fn sorts_by_ref_id() {
        let refs = vec![reference("b", "d1"), reference("a", "d2")];
        let summary = summarize_refs(&refs);
        assert_eq!(summary[0].ref_id, "a");
        assert_eq!(summary[1].ref_id, "b");
    }

    #[test]
    fn deduplicates_by_content_digest_keeping_first_by_ref_id() {
        let refs = vec![reference("b", "same"), reference("a", "same")];
        let summary = summarize_refs(&refs);
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].ref_id, "a");
    }
}
