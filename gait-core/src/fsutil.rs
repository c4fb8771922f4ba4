// gait-core/src/fsutil.rs
// ============================================================================
// Module: Filesystem Utilities
// Description: Atomic writes, locked appends, and path-traversal guards.
// Purpose: Give every other crate one place to write files the way `spec.md`
// §5 requires: atomic rename for whole-file writes, a sidecar lock for
// append-only journals, and capability-rooted access for anything under a
// configured root.
// Dependencies: cap-std, cap-primitives, std
// ============================================================================

//! ## Overview
//! Two write patterns recur across Gait: a record written once and never
//! mutated (manifests, traces, approval audits) and a journal appended to
//! under contention (`jobs/<job_id>/events.jsonl`). [`write_file_atomic`]
//! covers the first by writing to a sibling temp file and renaming;
//! [`append_line_locked`] covers the second with an `O_CREAT|O_EXCL` sidecar
//! lock file and a stale-lock reclaim window. [`RootedDir`] wraps a
//! `cap_std::fs::Dir` so callers opening paths supplied by a tool call or API
//! request cannot escape the configured root even via `..` or a symlink.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::ErrorKind;
use std::io::Write as _;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use cap_primitives::fs::FollowSymlinks;
use cap_std::ambient_authority;
use cap_std::fs::Dir;
use cap_std::fs::OpenOptions;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by the filesystem utilities in this module.
#[derive(Debug, Error)]
pub enum FsError {
    /// An underlying IO operation failed.
    #[error("io error: {0}")]
    Io(String),

    /// A relative path escaped its configured root via `..` or an absolute component.
    #[error("path escapes configured root: {0}")]
    PathEscapesRoot(String),

    /// A lock could not be acquired within the retry budget.
    #[error("failed to acquire lock at {path} after {attempts} attempts")]
    LockContended {
        /// Path to the lock sidecar file.
        path: String,
        /// Number of acquisition attempts made.
        attempts: u32,
    },
}

impl From<std::io::Error> for FsError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// ============================================================================
// SECTION: Atomic Write
// ============================================================================

/// Writes `contents` to `path` atomically: writes to a sibling `.tmp-*` file
/// then renames over the destination, so readers never observe a partial
/// write.
///
/// # Errors
///
/// Returns [`FsError::Io`] if the temp file cannot be created, written, or
/// renamed into place.
pub fn write_file_atomic(path: &Path, contents: &[u8]) -> Result<(), FsError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    let temp_path = parent.join(format!(".tmp-{file_name}-{}", std::process::id()));
    {
        let mut temp_file = std::fs::File::create(&temp_path)?;
        temp_file.write_all(contents)?;
        temp_file.sync_all()?;
    }
    std::fs::rename(&temp_path, path)?;
    Ok(())
}

// ============================================================================
// SECTION: Locked Append
// ============================================================================

/// Default number of attempts before giving up on lock acquisition.
const DEFAULT_LOCK_ATTEMPTS: u32 = 50;

/// Delay between lock acquisition attempts.
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(20);

/// A stale lock file older than this is reclaimed by the next writer.
const STALE_LOCK_AGE: Duration = Duration::from_secs(30);

/// Appends `line` (without a trailing newline) to `path`, creating it if
/// needed, guarded by an `O_CREAT|O_EXCL` sidecar lock file at
/// `<path>.lock`. A lock older than [`STALE_LOCK_AGE`] is reclaimed.
///
/// # Errors
///
/// Returns [`FsError::LockContended`] if the lock cannot be acquired within
/// [`DEFAULT_LOCK_ATTEMPTS`] retries, or [`FsError::Io`] for any other
/// filesystem failure.
pub fn append_line_locked(path: &Path, line: &str) -> Result<(), FsError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;
    let lock_path = lock_path_for(path);
    let _guard = acquire_lock(&lock_path)?;
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")?;
    file.sync_all()?;
    Ok(())
}

/// Returns the sidecar lock path for a given target file path.
fn lock_path_for(path: &Path) -> PathBuf {
    let mut lock = path.as_os_str().to_owned();
    lock.push(".lock");
    PathBuf::from(lock)
}

/// RAII guard that removes the lock file on drop.
struct LockGuard {
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Acquires an exclusive-create lock file, retrying on contention and
/// reclaiming a stale lock if its age exceeds [`STALE_LOCK_AGE`].
fn acquire_lock(lock_path: &Path) -> Result<LockGuard, FsError> {
    for _attempt in 0..DEFAULT_LOCK_ATTEMPTS {
        match std::fs::OpenOptions::new().create_new(true).write(true).open(lock_path) {
            Ok(_) => return Ok(LockGuard { path: lock_path.to_path_buf() }),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                reclaim_if_stale(lock_path);
                thread::sleep(LOCK_RETRY_DELAY);
            }
            Err(err) => return Err(FsError::Io(err.to_string())),
        }
    }
    Err(FsError::LockContended {
        path: lock_path.to_string_lossy().into_owned(),
        attempts: DEFAULT_LOCK_ATTEMPTS,
    })
}

/// Removes `lock_path` if its modification time is older than [`STALE_LOCK_AGE`].
fn reclaim_if_stale(lock_path: &Path) {
    let Ok(metadata) = std::fs::metadata(lock_path) else {
        return;
    };
    let Ok(modified) = metadata.modified() else {
        return;
    };
    if let Ok(elapsed) = modified.elapsed() {
        if elapsed >= STALE_LOCK_AGE {
            let _ = std::fs::remove_file(lock_path);
        }
    }
}

// ============================================================================
// SECTION: Rooted Directory
// ============================================================================

/// A directory opened via capability-based APIs, rejecting any relative path
/// that escapes the root through `..`, an absolute component, or a symlink.
pub struct RootedDir {
    dir: Dir,
}

impl RootedDir {
    /// Opens `root` as a capability-rooted directory.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::Io`] if `root` cannot be opened.
    pub fn open(root: &Path) -> Result<Self, FsError> {
        std::fs::create_dir_all(root)?;
        let dir = Dir::open_ambient_dir(root, ambient_authority())?;
        Ok(Self { dir })
    }

    /// Validates that `relative` stays within the root: no `..`, no
    /// absolute component, not empty.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::PathEscapesRoot`] if `relative` contains a
    /// traversal component.
    pub fn validate_relative(relative: &Path) -> Result<(), FsError> {
        if relative.as_os_str().is_empty() {
            return Err(FsError::PathEscapesRoot("empty path".to_string()));
        }
        for component in relative.components() {
            match component {
                Component::Normal(_) => {}
                other => {
                    return Err(FsError::PathEscapesRoot(format!("{other:?}")));
                }
            }
        }
        Ok(())
    }

    /// Reads the full contents of `relative`, refusing to follow symlinks
    /// and refusing any path that escapes the root.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::PathEscapesRoot`] or [`FsError::Io`].
    pub fn read(&self, relative: &Path) -> Result<Vec<u8>, FsError> {
        Self::validate_relative(relative)?;
        let mut options = OpenOptions::new();
        options.read(true);
        options._cap_fs_ext_follow(FollowSymlinks::No);
        let mut file = self.dir.open_with(relative, &options)?;
        let mut bytes = Vec::new();
        std::io::Read::read_to_end(&mut file, &mut bytes)?;
        Ok(bytes)
    }

    /// Writes `contents` to `relative` within the root, creating parent
    /// directories as needed, refusing any path that escapes the root.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::PathEscapesRoot`] or [`FsError::Io`].
    pub fn write(&self, relative: &Path, contents: &[u8]) -> Result<(), FsError> {
        Self::validate_relative(relative)?;
        if let Some(parent) = relative.parent() {
            if !parent.as_os_str().is_empty() {
                self.dir.create_dir_all(parent)?;
            }
        }
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        let mut file = self.dir.open_with(relative, &options)?;
        file.write_all(contents)?;
        file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::RootedDir;
    use super::append_line_locked;
    use super::write_file_atomic;
    use std::path::Path;
    use std::path::PathBuf;

    #[test]
    fn atomic_write_produces_full_contents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("record.json");
        write_file_atomic(&path, b"{\"a\":1}").expect("write");
        let read = std::fs::read(&path).expect("read");
        assert_eq!(read, b"{\"a\":1}");
    }

    #[test]
    fn locked_append_preserves_line_order_under_sequential_calls() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("events.jsonl");
        append_line_locked(&path, "{\"n\":1}").expect("append 1");
        append_line_locked(&path, "{\"n\":2}").expect("append 2");
        let contents = std::fs::read_to_string(&path).expect("read");
        assert_eq!(contents, "{\"n\":1}\n{\"n\":2}\n");
    }

    #[test]
    fn locked_append_removes_lock_sidecar_after_success() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("events.jsonl");
        append_line_locked(&path, "{}").expect("append");
        let lock_path: PathBuf = {
            let mut os = path.as_os_str().to_owned();
            os.push(".lock");
            PathBuf::from(os)
        };
        assert!(!lock_path.exists());
    }

    #[test]
    fn rooted_dir_rejects_parent_traversal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let rooted = RootedDir::open(dir.path()).expect("open");
        let escaping = Path::new("../escape.txt");
        assert!(rooted.write(escaping, b"x").is_err());
    }

    #[test]
    fn rooted_dir_roundtrips_within_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let rooted = RootedDir::open(dir.path()).expect("open");
        let relative = Path::new("nested/file.txt");
        rooted.write(relative, b"hello").expect("write");
        let read = rooted.read(relative).expect("read");
        assert_eq!(read, b"hello");
    }
}
