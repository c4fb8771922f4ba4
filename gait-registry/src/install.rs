// gait-registry/src/install.rs
// ============================================================================
// Module: Registry Install
// Description: Fetches, validates, and caches a signed registry manifest.
// Purpose: Implement `spec.md` §4.9's `Install` operation: publisher
// allowlisting, digest pinning, signature verification, and cached fallback.
// Dependencies: gait-core, gait-schema, reqwest (blocking), crate::net, crate::retry
// ============================================================================

//! ## Overview
//! Adapted from the teacher's `decision-gate-broker::source::http::HttpSource`
//! fetch-then-validate shape, generalized to the registry's stricter
//! trust chain: every installed manifest must come from an allowlisted
//! publisher, match any caller-supplied pin, and carry at least one
//! signature over its `signable_digest` from the caller's trusted key.
//! Only after all three checks pass is the manifest persisted to the local
//! cache and pinned for future installs.

use std::io::Read;
use std::path::Path;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as Base64;
use gait_core::fsutil;
use gait_core::hashing::DEFAULT_HASH_ALGORITHM;
use gait_core::hashing::digest_hex;
use gait_core::hashing::hash_canonical_json;
use gait_core::signing::PublicKey;
use gait_core::signing::Signature;
use gait_schema::RegistryManifest;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use url::Url;

use crate::RegistryError;
use crate::net::RegistryHostPolicy;
use crate::retry::FailureKind;
use crate::retry::backoff_delay;
use crate::retry::is_transient_status;

/// Maximum manifest body size accepted from a remote source.
const MAX_MANIFEST_BYTES: u64 = 1024 * 1024;

/// Default number of fetch attempts before giving up.
const DEFAULT_ATTEMPTS: u32 = 3;

/// Where a manifest was read from.
#[derive(Debug, Clone)]
pub enum Source {
    /// Read the manifest bytes from a local file path.
    LocalFile(PathBuf),
    /// Fetch the manifest over HTTPS.
    Remote(Url),
}

/// Inputs to [`install`].
pub struct InstallRequest<'a> {
    /// Where to read the manifest from.
    pub source: Source,
    /// Root directory under which installed packs and pins are cached.
    pub cache_dir: PathBuf,
    /// Hosts a remote source is allowed to resolve to.
    pub allow_hosts: Vec<String>,
    /// Publishers accepted for this install, matched case-insensitively.
    pub publisher_allowlist: Vec<String>,
    /// Digest the installed manifest must match, if pinning.
    pub pin_digest: Option<String>,
    /// Key trusted to have signed the manifest.
    pub public_key: &'a PublicKey,
    /// Permit `http://` remote sources. Defaults to `false`.
    pub allow_insecure_http: bool,
    /// Fall back to a previously cached, pinned copy if the remote fetch fails.
    pub cached_fallback: bool,
}

/// Outcome of a successful install.
#[derive(Debug, Clone)]
pub struct InstallReport {
    /// The validated manifest.
    pub manifest: RegistryManifest,
    /// Digest the manifest's signatures were verified against.
    pub signable_digest: String,
    /// Path the manifest was persisted to in the cache.
    pub cached_path: PathBuf,
    /// Whether this install served a cached copy after a failed remote fetch.
    pub fallback_used: bool,
}

/// Installs a registry manifest per `request`.
///
/// # Errors
///
/// Returns [`RegistryError`] if the source cannot be read, the manifest
/// fails strict parse, the publisher is not allowlisted, the digest does
/// not match a configured pin, or no signature verifies against
/// `request.public_key`.
pub fn install(request: &InstallRequest<'_>) -> Result<InstallReport, RegistryError> {
    let (bytes, fallback_used) = match fetch(request) {
        Ok(bytes) => (bytes, false),
        Err(err) if request.cached_fallback => fetch_cached_fallback(request, err)?,
        Err(err) => return Err(err),
    };

    let manifest = RegistryManifest::parse(&bytes).map_err(|err| RegistryError::Manifest(err.to_string()))?;
    validate_manifest(request, &manifest)?;
    let signable_digest = signable_digest(&manifest)?;
    verify_signatures(request.public_key, &manifest, &signable_digest)?;

    let cached_path = cache_path(&request.cache_dir, &manifest);
    fsutil::write_file_atomic(&cached_path, &bytes).map_err(|err| RegistryError::Cache(err.to_string()))?;
    set_owner_only(&cached_path)?;
    write_pin(&request.cache_dir, &manifest.pack_name, &signable_digest)?;

    Ok(InstallReport { manifest, signable_digest, cached_path, fallback_used })
}

fn validate_manifest(request: &InstallRequest<'_>, manifest: &RegistryManifest) -> Result<(), RegistryError> {
    let allowed = request.publisher_allowlist.iter().any(|publisher| publisher.eq_ignore_ascii_case(&manifest.publisher));
    if !request.publisher_allowlist.is_empty() && !allowed {
        return Err(RegistryError::PublisherNotAllowlisted(manifest.publisher.clone()));
    }
    if let Some(pin) = &request.pin_digest {
        let expected = pin.strip_prefix("sha256:").unwrap_or(pin);
        if expected != manifest.digest {
            return Err(RegistryError::PinMismatch { expected: expected.to_string(), found: manifest.digest.clone() });
        }
    }
    Ok(())
}

fn signable_digest(manifest: &RegistryManifest) -> Result<String, RegistryError> {
    let digest = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &manifest.unsigned()).map_err(|err| RegistryError::Manifest(err.to_string()))?;
    Ok(digest.as_str().to_string())
}

fn verify_signatures(public_key: &PublicKey, manifest: &RegistryManifest, signable_digest: &str) -> Result<(), RegistryError> {
    let expected_key_id = key_id_for(public_key);
    let digest = gait_core::hashing::HashDigest::from_hex(signable_digest.to_string());
    let verified = manifest.signatures.iter().any(|candidate| {
        candidate.key_id == expected_key_id
            && candidate.signed_digest == signable_digest
            && Signature::from_base64(&candidate.sig).is_ok_and(|sig| public_key.verify_digest(&digest, &sig).is_ok())
    });
    if verified { Ok(()) } else { Err(RegistryError::SignatureInvalid) }
}

/// Derives the `key_id` a [`PublicKey`] signs manifests under: the first 16
/// hex characters of the SHA-256 digest of the key's raw 32 bytes.
#[must_use]
pub(crate) fn key_id_for(public_key: &PublicKey) -> String {
    let raw = Base64.decode(public_key.to_base64()).unwrap_or_default();
    let digest = digest_hex(DEFAULT_HASH_ALGORITHM, &raw);
    digest.as_str().chars().take(16).collect()
}

fn fetch(request: &InstallRequest<'_>) -> Result<Vec<u8>, RegistryError> {
    match &request.source {
        Source::LocalFile(path) => std::fs::read(path).map_err(|err| RegistryError::Fetch(err.to_string())),
        Source::Remote(url) => fetch_remote(request, url),
    }
}

fn fetch_remote(request: &InstallRequest<'_>, url: &Url) -> Result<Vec<u8>, RegistryError> {
    let policy = RegistryHostPolicy::new(request.allow_hosts.iter(), request.allow_insecure_http);
    policy.enforce(url).map_err(|err| RegistryError::HostPolicy(err.to_string()))?;

    let client = Client::builder()
        .redirect(Policy::none())
        .timeout(Duration::from_secs(20))
        .build()
        .map_err(|err| RegistryError::Fetch(err.to_string()))?;

    let mut last_err = RegistryError::Fetch("no attempt made".to_string());
    for attempt in 0..DEFAULT_ATTEMPTS {
        if attempt > 0 {
            thread::sleep(backoff_delay(attempt));
        }
        match client.get(url.as_str()).send() {
            Ok(response) if response.status().is_success() => return read_body(response),
            Ok(response) => {
                let status = response.status().as_u16();
                last_err = RegistryError::Fetch(format!("registry returned status {status}"));
                if !is_transient_status(status) {
                    return Err(last_err);
                }
            }
            Err(err) => {
                let kind = classify_transport_error(&err);
                last_err = RegistryError::Fetch(err.to_string());
                if !kind.is_retryable() {
                    return Err(last_err);
                }
            }
        }
    }
    Err(last_err)
}

fn classify_transport_error(err: &reqwest::Error) -> FailureKind {
    if err.is_timeout() {
        FailureKind::Timeout
    } else if err.is_connect() {
        FailureKind::ConnectionReset
    } else {
        FailureKind::Other
    }
}

fn read_body(response: reqwest::blocking::Response) -> Result<Vec<u8>, RegistryError> {
    let mut limited = response.take(MAX_MANIFEST_BYTES + 1);
    let mut bytes = Vec::new();
    limited.read_to_end(&mut bytes).map_err(|err| RegistryError::Fetch(err.to_string()))?;
    if bytes.len() as u64 > MAX_MANIFEST_BYTES {
        return Err(RegistryError::Fetch("manifest exceeds size limit".to_string()));
    }
    Ok(bytes)
}

fn fetch_cached_fallback(request: &InstallRequest<'_>, remote_err: RegistryError) -> Result<(Vec<u8>, bool), RegistryError> {
    let Some(pin) = &request.pin_digest else {
        return Err(remote_err);
    };
    let digest = pin.strip_prefix("sha256:").unwrap_or(pin);
    let pack_root = request.cache_dir.join(sanitize_component(&pin_pack_name(request)?));
    let candidates = glob_digest_dirs(&pack_root, digest);
    for candidate in candidates {
        let manifest_path = candidate.join("registry_pack.json");
        if let Ok(bytes) = std::fs::read(&manifest_path) {
            return Ok((bytes, true));
        }
    }
    Err(remote_err)
}

fn pin_pack_name(request: &InstallRequest<'_>) -> Result<String, RegistryError> {
    match &request.source {
        Source::LocalFile(path) => path.file_stem().map(|name| name.to_string_lossy().into_owned()).ok_or_else(|| RegistryError::Cache("local source has no file name".to_string())),
        Source::Remote(url) => url.path_segments().and_then(std::iter::Iterator::last).map(str::to_string).filter(|name| !name.is_empty()).ok_or_else(|| RegistryError::Cache("remote source has no path segment".to_string())),
    }
}

fn glob_digest_dirs(pack_root: &Path, digest: &str) -> Vec<PathBuf> {
    let Ok(versions) = std::fs::read_dir(pack_root) else {
        return Vec::new();
    };
    let mut matches = Vec::new();
    for version_entry in versions.filter_map(Result::ok) {
        let digest_dir = version_entry.path().join(digest);
        if digest_dir.is_dir() {
            matches.push(digest_dir);
        }
    }
    matches.sort();
    matches
}

fn cache_path(cache_dir: &Path, manifest: &RegistryManifest) -> PathBuf {
    cache_dir.join(sanitize_component(&manifest.pack_name)).join(sanitize_component(&manifest.pack_version)).join(sanitize_component(&manifest.digest)).join("registry_pack.json")
}

fn sanitize_component(raw: &str) -> String {
    raw.chars().map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '.' || ch == '_' { ch } else { '_' }).collect()
}

fn write_pin(cache_dir: &Path, pack_name: &str, digest: &str) -> Result<(), RegistryError> {
    let pin_path = cache_dir.join("pins").join(format!("{}.pin", sanitize_component(pack_name)));
    let contents = format!("sha256:{digest}\n");
    fsutil::write_file_atomic(&pin_path, contents.as_bytes()).map_err(|err| RegistryError::Cache(err.to_string()))?;
    set_owner_only(&pin_path)
}

#[cfg(unix)]
fn set_owner_only(path: &Path) -> Result<(), RegistryError> {
    use std::os::unix::fs::PermissionsExt as _;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).map_err(|err| RegistryError::Cache(err.to_string()))
}

#[cfg(not(unix))]
fn set_owner_only(_path: &Path) -> Result<(), RegistryError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::InstallRequest;
    use super::Source;
    use super::install;
    use gait_core::signing::PrivateKey;
    use gait_schema::ManifestSignature;
    use gait_schema::RegistryManifest;

    fn write_manifest(dir: &std::path::Path, key: &PrivateKey) -> std::path::PathBuf {
        let unsigned = RegistryManifest { pack_name: "demo-pack".to_string(), pack_version: "1.0.0".to_string(), publisher: "Acme Corp".to_string(), digest: "d".repeat(64), signatures: Vec::new() };
        let digest = gait_core::hashing::hash_canonical_json(gait_core::hashing::DEFAULT_HASH_ALGORITHM, &unsigned).unwrap();
        let signature = key.sign_digest(&digest).unwrap();
        let key_id = super::key_id_for(&key.public_key());
        let manifest = RegistryManifest {
            signatures: vec![ManifestSignature { alg: "ed25519".to_string(), key_id, sig: signature.to_base64(), signed_digest: digest.as_str().to_string() }],
            ..unsigned
        };
        let path = dir.join("manifest.json");
        std::fs::write(&path, serde_json::to_vec(&manifest).unwrap()).unwrap();
        path
    }

    #[test]
    fn installs_a_locally_signed_manifest() {
        let source_dir = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        let key = PrivateKey::generate();
        let manifest_path = write_manifest(source_dir.path(), &key);

        let request = InstallRequest {
            source: Source::LocalFile(manifest_path),
            cache_dir: cache_dir.path().to_path_buf(),
            allow_hosts: Vec::new(),
            publisher_allowlist: vec!["acme corp".to_string()],
            pin_digest: None,
            public_key: &key.public_key(),
            allow_insecure_http: false,
            cached_fallback: false,
        };
        let report = install(&request).unwrap();
        assert_eq!(report.manifest.pack_name, "demo-pack");
        assert!(report.cached_path.exists());
        assert!(!report.fallback_used);
    }

    #[test]
    fn rejects_publisher_not_in_allowlist() {
        let source_dir = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        let key = PrivateKey::generate();
        let manifest_path = write_manifest(source_dir.path(), &key);

        let request = InstallRequest {
            source: Source::LocalFile(manifest_path),
            cache_dir: cache_dir.path().to_path_buf(),
            allow_hosts: Vec::new(),
            publisher_allowlist: vec!["someone-else".to_string()],
            pin_digest: None,
            public_key: &key.public_key(),
            allow_insecure_http: false,
            cached_fallback: false,
        };
        assert!(install(&request).is_err());
    }

    #[test]
    fn rejects_pin_mismatch() {
        let source_dir = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        let key = PrivateKey::generate();
        let manifest_path = write_manifest(source_dir.path(), &key);

        let request = InstallRequest {
            source: Source::LocalFile(manifest_path),
            cache_dir: cache_dir.path().to_path_buf(),
            allow_hosts: Vec::new(),
            publisher_allowlist: Vec::new(),
            pin_digest: Some(format!("sha256:{}", "0".repeat(64))),
            public_key: &key.public_key(),
            allow_insecure_http: false,
            cached_fallback: false,
        };
        assert!(install(&request).is_err());
    }

    #[test]
    fn rejects_signature_from_wrong_key() {
        let source_dir = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        let key = PrivateKey::generate();
        let other_key = PrivateKey::generate();
        let manifest_path = write_manifest(source_dir.path(), &key);

        let request = InstallRequest {
            source: Source::LocalFile(manifest_path),
            cache_dir: cache_dir.path().to_path_buf(),
            allow_hosts: Vec::new(),
            publisher_allowlist: Vec::new(),
            pin_digest: None,
            public_key: &other_key.public_key(),
            allow_insecure_http: false,
            cached_fallback: false,
        };
        assert!(install(&request).is_err());
    }
}
