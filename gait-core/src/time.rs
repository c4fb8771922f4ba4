// gait-core/src/time.rs
// ============================================================================
// Module: Timestamps
// Description: RFC 3339 nanosecond-precision timestamps used in every
// persisted record.
// Purpose: Give every `created_at`/`updated_at`/`expires_at` field a single
// parse/format implementation so records remain byte-stable once digested.
// Dependencies: time, serde
// ============================================================================

//! ## Overview
//! `spec.md` records use RFC 3339 timestamp strings wherever wall-clock time
//! is observable. This module is the sole place that calls `OffsetDateTime::now_utc`,
//! so tests can construct fixed [`Timestamp`] values instead of needing to
//! freeze the clock.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while parsing or formatting a [`Timestamp`].
#[derive(Debug, Error)]
pub enum TimestampError {
    /// The input string was not a valid RFC 3339 timestamp.
    #[error("invalid rfc3339 timestamp: {0}")]
    Parse(String),

    /// Formatting the timestamp back to a string failed.
    #[error("failed to format timestamp: {0}")]
    Format(String),
}

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// A UTC instant, serialized as an RFC 3339 string with nanosecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(OffsetDateTime);

impl Timestamp {
    /// Returns the current wall-clock instant in UTC.
    #[must_use]
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    /// Builds a timestamp from Unix milliseconds since the epoch.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError::Parse`] if `millis` is out of the range
    /// representable by `OffsetDateTime`.
    pub fn from_unix_millis(millis: i64) -> Result<Self, TimestampError> {
        let nanos = i128::from(millis) * 1_000_000;
        OffsetDateTime::from_unix_timestamp_nanos(nanos)
            .map(Self)
            .map_err(|err| TimestampError::Parse(err.to_string()))
    }

    /// Returns the instant as milliseconds since the Unix epoch.
    #[must_use]
    pub fn as_unix_millis(self) -> i64 {
        (self.0.unix_timestamp_nanos() / 1_000_000) as i64
    }

    /// Parses an RFC 3339 timestamp string.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError::Parse`] if `value` is not well-formed RFC 3339.
    pub fn parse(value: &str) -> Result<Self, TimestampError> {
        OffsetDateTime::parse(value, &Rfc3339)
            .map(Self)
            .map_err(|err| TimestampError::Parse(err.to_string()))
    }

    /// Formats the timestamp as an RFC 3339 string.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError::Format`] if the underlying formatter fails,
    /// which does not happen for any instant reachable through this type.
    pub fn to_rfc3339(self) -> Result<String, TimestampError> {
        self.0.format(&Rfc3339).map_err(|err| TimestampError::Format(err.to_string()))
    }

    /// Returns whether this instant is strictly before `other`.
    #[must_use]
    pub fn is_before(self, other: Self) -> bool {
        self.0 < other.0
    }

    /// Returns the whole number of seconds elapsed from `self` to `other`,
    /// saturating at zero when `other` is not after `self`.
    #[must_use]
    pub fn seconds_until(self, other: Self) -> u64 {
        let delta = other.0 - self.0;
        let whole = delta.whole_seconds();
        u64::try_from(whole).unwrap_or(0)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let text = self.to_rfc3339().map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}
