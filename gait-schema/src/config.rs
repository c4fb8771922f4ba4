// gait-schema/src/config.rs
// ============================================================================
// Module: Gait Configuration
// Description: Strict, fail-closed configuration loading for the `gait` CLI
// and service.
// Purpose: Provide one validated config shape shared by every surface,
// generalized from the teacher's `decision-gate-config::config` loader.
// Dependencies: serde, serde_yaml, std
// ============================================================================

//! ## Overview
//! Missing configuration is an [`gait_core::ErrorCategory::Environment`]
//! error (exit 7), not a silently-applied default, per `spec.md` §6/§7: a
//! caller must pass `--config` or set [`CONFIG_ENV_VAR`] explicitly. Once a
//! path is resolved, parsing is strict (`deny_unknown_fields`) and the file
//! is size-capped before it is even opened, mirroring the teacher's
//! `decision-gate-config::config::MAX_CONFIG_FILE_SIZE` guard.

use std::env;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// Environment variable used to locate the config file when `--config` is
/// not passed explicitly.
pub const CONFIG_ENV_VAR: &str = "GAIT_CONFIG";

/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Default per-job lock acquisition timeout in milliseconds.
const DEFAULT_JOB_LOCK_TIMEOUT_MS: u64 = 5_000;

/// Default registry fetch timeout in seconds.
const DEFAULT_REGISTRY_TIMEOUT_SECS: u64 = 20;

/// Default registry retry attempts.
const DEFAULT_REGISTRY_RETRY_ATTEMPTS: u32 = 3;

/// Default deterministic ZIP per-entry byte limit.
const DEFAULT_MAX_ENTRY_BYTES: u64 = 8 * 1024 * 1024;

/// Errors raised loading or validating a [`GaitConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No `--config` path was given and [`CONFIG_ENV_VAR`] is unset.
    #[error("no configuration path supplied; pass --config or set {CONFIG_ENV_VAR}")]
    MissingPath,

    /// The resolved path does not exist or cannot be read.
    #[error("failed to read config at {path}: {source_detail}")]
    Read {
        /// The path that could not be read.
        path: String,
        /// Underlying IO error text.
        source_detail: String,
    },

    /// The config file exceeds [`MAX_CONFIG_FILE_SIZE`].
    #[error("config file at {path} exceeds the maximum size of {MAX_CONFIG_FILE_SIZE} bytes")]
    TooLarge {
        /// The oversized path.
        path: String,
    },

    /// The config file failed strict YAML parsing.
    #[error("config_invalid: {0}")]
    Parse(String),
}

impl gait_core::GaitError for ConfigError {
    fn category(&self) -> gait_core::ErrorCategory {
        gait_core::ErrorCategory::Environment
    }
}

/// Deterministic ZIP settings shared by every pack-building surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackConfig {
    /// Maximum allowed decompressed size of a single ZIP entry.
    #[serde(default = "default_max_entry_bytes")]
    pub max_entry_bytes: u64,
    /// Whether packs must carry a valid signature to pass verification.
    #[serde(default)]
    pub require_signature: bool,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self { max_entry_bytes: default_max_entry_bytes(), require_signature: false }
    }
}

const fn default_max_entry_bytes() -> u64 {
    DEFAULT_MAX_ENTRY_BYTES
}

/// Registry client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    /// Hosts a remote registry fetch may target.
    #[serde(default)]
    pub allow_hosts: Vec<String>,
    /// Publisher names allowed to sign installable manifests.
    #[serde(default)]
    pub publisher_allowlist: Vec<String>,
    /// Whether plain HTTP is permitted for remote fetches.
    #[serde(default)]
    pub allow_insecure_http: bool,
    /// Whether a cached copy may be served when a fetch fails transiently.
    #[serde(default)]
    pub cached_fallback: bool,
    /// Request timeout in seconds.
    #[serde(default = "default_registry_timeout_secs")]
    pub timeout_secs: u64,
    /// Maximum retry attempts for transient failures.
    #[serde(default = "default_registry_retry_attempts")]
    pub retry_attempts: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            allow_hosts: Vec::new(),
            publisher_allowlist: Vec::new(),
            allow_insecure_http: false,
            cached_fallback: false,
            timeout_secs: default_registry_timeout_secs(),
            retry_attempts: default_registry_retry_attempts(),
        }
    }
}

const fn default_registry_timeout_secs() -> u64 {
    DEFAULT_REGISTRY_TIMEOUT_SECS
}

const fn default_registry_retry_attempts() -> u32 {
    DEFAULT_REGISTRY_RETRY_ATTEMPTS
}

/// The service's bind-time authentication requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceAuthMode {
    /// No bearer token is required; only a loopback bind is accepted.
    LoopbackOnly,
    /// A bearer token, read from `auth_token_env`, is required on every request.
    Token,
}

/// How the service maps a verdict onto an HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HttpVerdictStatus {
    /// Always return 200, with the verdict carried in the response body.
    Lenient,
    /// Map `block`→403, `require_approval`→402, `allow`/`dry_run`→200.
    Strict,
}

/// When the service builds a pack for an evaluated intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmitPackMode {
    /// Never build a pack from a request.
    None,
    /// Build a call pack when the verdict is `allow` on a state-changing (destructive) endpoint class.
    StateChanging,
}

/// Per-artifact-kind retention override.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetentionPolicy {
    /// Maximum age in seconds before an artifact of this kind is swept.
    #[serde(default = "default_retention_secs")]
    pub max_age_secs: u64,
    /// Maximum number of artifacts of this kind to retain, oldest swept first.
    #[serde(default)]
    pub max_count: Option<u64>,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self { max_age_secs: default_retention_secs(), max_count: None }
    }
}

/// Hard ceiling on `max_request_bytes`, regardless of configured value.
pub const MAX_REQUEST_BYTES_CEILING: u64 = 4 * 1024 * 1024;

/// Decision-service (C12) HTTP settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Bind address; defaults to loopback-only.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Authentication requirement for this bind.
    #[serde(default = "default_auth_mode")]
    pub auth_mode: ServiceAuthMode,
    /// Environment variable holding the accepted bearer token, read when `auth_mode` is `token`.
    #[serde(default)]
    pub auth_token_env: Option<String>,
    /// Bearer tokens accepted for authenticated requests, in addition to `auth_token_env`.
    #[serde(default)]
    pub bearer_tokens: Vec<String>,
    /// Maximum accepted request body size in bytes; capped at [`MAX_REQUEST_BYTES_CEILING`].
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: u64,
    /// How a verdict maps onto the response's HTTP status code.
    #[serde(default)]
    pub http_verdict_status: HttpVerdictStatus,
    /// When the service builds a pack from an evaluated request.
    #[serde(default)]
    pub emit_pack: EmitPackMode,
    /// Directory packs are written under when `emit_pack` is not `none`.
    #[serde(default)]
    pub pack_dir: Option<PathBuf>,
    /// Default retention window in seconds, used for any kind with no entry in `retention_by_kind`.
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
    /// Per-kind retention overrides, keyed by `"traces"`, `"runpacks"`, `"sessions"`, or `"packs"`.
    #[serde(default)]
    pub retention_by_kind: std::collections::BTreeMap<String, RetentionPolicy>,
}

impl Default for HttpVerdictStatus {
    fn default() -> Self {
        Self::Lenient
    }
}

impl Default for EmitPackMode {
    fn default() -> Self {
        Self::None
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            auth_mode: default_auth_mode(),
            auth_token_env: None,
            bearer_tokens: Vec::new(),
            max_request_bytes: default_max_request_bytes(),
            http_verdict_status: HttpVerdictStatus::default(),
            emit_pack: EmitPackMode::default(),
            pack_dir: None,
            retention_secs: default_retention_secs(),
            retention_by_kind: std::collections::BTreeMap::new(),
        }
    }
}

impl ServiceConfig {
    /// Returns the retention policy in force for `kind`, falling back to
    /// `retention_secs` with no count cap when `kind` has no override.
    #[must_use]
    pub fn retention_for(&self, kind: &str) -> RetentionPolicy {
        self.retention_by_kind.get(kind).cloned().unwrap_or(RetentionPolicy { max_age_secs: self.retention_secs, max_count: None })
    }

    /// Returns `max_request_bytes` clamped to [`MAX_REQUEST_BYTES_CEILING`].
    #[must_use]
    pub fn effective_max_request_bytes(&self) -> u64 {
        self.max_request_bytes.min(MAX_REQUEST_BYTES_CEILING)
    }
}

fn default_bind_addr() -> String {
    "127.0.0.1:8085".to_string()
}

fn default_auth_mode() -> ServiceAuthMode {
    ServiceAuthMode::LoopbackOnly
}

const fn default_max_request_bytes() -> u64 {
    1024 * 1024
}

const fn default_retention_secs() -> u64 {
    24 * 60 * 60
}

/// The top-level Gait configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GaitConfig {
    /// Root directory under which jobs, packs, and caches are written.
    pub root_dir: PathBuf,
    /// Per-job lock acquisition timeout in milliseconds.
    #[serde(default = "default_job_lock_timeout_ms")]
    pub job_lock_timeout_ms: u64,
    /// Pack-building and verification settings.
    #[serde(default)]
    pub pack: PackConfig,
    /// Registry client settings.
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Decision-service settings.
    #[serde(default)]
    pub service: ServiceConfig,
}

const fn default_job_lock_timeout_ms() -> u64 {
    DEFAULT_JOB_LOCK_TIMEOUT_MS
}

impl GaitConfig {
    /// Resolves the config path from an explicit `--config` value or
    /// [`CONFIG_ENV_VAR`], preferring the explicit value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingPath`] if neither is supplied.
    pub fn resolve_path(explicit: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
        if let Some(path) = explicit {
            return Ok(path);
        }
        env::var(CONFIG_ENV_VAR).map(PathBuf::from).map_err(|_err| ConfigError::MissingPath)
    }

    /// Loads and strict-parses a config document from `path`, enforcing
    /// [`MAX_CONFIG_FILE_SIZE`] before reading the file's contents.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`], [`ConfigError::TooLarge`], or
    /// [`ConfigError::Parse`] as appropriate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|err| ConfigError::Read {
            path: path.to_string_lossy().into_owned(),
            source_detail: err.to_string(),
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::TooLarge { path: path.to_string_lossy().into_owned() });
        }
        let contents = std::fs::read(path).map_err(|err| ConfigError::Read {
            path: path.to_string_lossy().into_owned(),
            source_detail: err.to_string(),
        })?;
        serde_yaml::from_slice(&contents).map_err(|err| ConfigError::Parse(err.to_string()))
    }
}
