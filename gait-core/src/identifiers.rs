// gait-core/src/identifiers.rs
// ============================================================================
// Module: Opaque Identifiers
// Description: Newtype wrappers around the string identifiers threaded
// through intents, traces, jobs, and packs.
// Purpose: Prevent accidentally passing a trace ID where a job ID is
// expected by giving each identifier kind its own type.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! `spec.md` identifiers are opaque strings (`job_stop_e2e`, `pack_<hex>`,
//! `aaaa…64`) rather than numeric keys, so each newtype here wraps a
//! `String` rather than an integer. Construction is infallible; callers that
//! need format validation (hex digest shape, non-empty) do so at the schema
//! boundary in `gait-schema`, not here.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Macro
// ============================================================================

macro_rules! string_identifier {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a string as this identifier kind.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the identifier, returning the inner string.
            #[must_use]
            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

// ============================================================================
// SECTION: Identifiers
// ============================================================================

string_identifier!(TraceId, "Identifies a single gate-evaluation trace record.");
string_identifier!(RunId, "Identifies a run captured into a runpack.");
string_identifier!(JobId, "Identifies a durable job under `<root>/jobs/<job_id>`.");
string_identifier!(TokenId, "Identifies an approval token.");
string_identifier!(CheckpointId, "Identifies a single checkpoint in a job's timeline.");
string_identifier!(EventId, "Identifies a single append-only job event.");
string_identifier!(PackId, "Identifies a built pack, of the form `pack_<hex>`.");
string_identifier!(ToolName, "The normalized name of a tool call, e.g. `tool.write`.");
string_identifier!(Identity, "An opaque identity string for a requester, approver, or delegate.");
string_identifier!(ReasonCode, "A stable, lowercase snake_case reason code emitted in traces and events.");
