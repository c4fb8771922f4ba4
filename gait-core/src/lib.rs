// gait-core/src/lib.rs
// ============================================================================
// Module: Gait Core Library
// Description: Public API surface for the Gait core primitives.
// Purpose: Expose canonical JSON, digesting, signing, deterministic ZIP,
// filesystem utilities, identifiers, time, and the shared error taxonomy.
// Dependencies: crate::{canonical, error, fsutil, hashing, identifiers,
// signing, time, zip}
// ============================================================================

//! ## Overview
//! Gait core provides the leaf primitives every other Gait crate builds on:
//! RFC 8785 JSON canonicalization, SHA-256/Ed25519 digesting and signing, a
//! deterministic ZIP codec, and filesystem utilities with atomic writes,
//! locked appends, and path-traversal guards. Nothing in this crate reads
//! wall-clock time, touches the network, or makes a policy decision; it is
//! pure with respect to its inputs.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod canonical;
pub mod error;
pub mod fsutil;
pub mod hashing;
pub mod identifiers;
pub mod signing;
pub mod time;
pub mod zip;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use canonical::CanonicalError;
pub use canonical::canonical_json_bytes;
pub use error::ErrorCategory;
pub use error::GaitError;
pub use fsutil::FsError;
pub use fsutil::RootedDir;
pub use fsutil::append_line_locked;
pub use fsutil::write_file_atomic;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::digest_hex;
pub use hashing::hash_canonical_json;
pub use identifiers::CheckpointId;
pub use identifiers::EventId;
pub use identifiers::Identity;
pub use identifiers::JobId;
pub use identifiers::PackId;
pub use identifiers::ReasonCode;
pub use identifiers::RunId;
pub use identifiers::TokenId;
pub use identifiers::ToolName;
pub use identifiers::TraceId;
pub use signing::KeyMode;
pub use signing::PrivateKey;
pub use signing::PublicKey;
pub use signing::Signature;
pub use signing::SigningError;
pub use signing::resolve_key_mode;
pub use time::Timestamp;
pub use time::TimestampError;
pub use zip::ZipEntry;
pub use zip::ZipError;
pub use zip::ZipWriter;
pub use zip::read_entries;
