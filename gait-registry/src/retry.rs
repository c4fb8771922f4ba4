// gait-registry/src/retry.rs
// ============================================================================
// Module: Bounded Retry With Capped Jitter
// Description: Classifies transient vs permanent fetch failures and computes
// exponential backoff delays with capped jitter.
// Purpose: Implement `spec.md` §4.9's bounded-retry requirement as a pure
// function of attempt count, per §9's "bounded retry as a pure function"
// design note.
// Dependencies: std
// ============================================================================

//! ## Overview
//! `backoff_delay` takes no wall-clock or RNG input beyond the attempt
//! index and a caller-supplied jitter fraction in `[0, 1]`, so callers (and
//! tests) can compute the exact delay sequence deterministically instead of
//! sleeping and observing it.

use std::time::Duration;

/// Base delay before the first retry.
pub const BASE_DELAY_MS: u64 = 250;
/// Jitter is capped at this fraction of the base exponential delay, per the
/// "capped jitter" language in `spec.md` §4.9/§5.
pub const REGISTRY_RETRY_JITTER_FRACTION: f64 = 0.20;

/// Classifies an HTTP status code as transient (retryable) or permanent.
#[must_use]
pub fn is_transient_status(status: u16) -> bool {
    matches!(status, 429 | 502 | 503 | 504)
}

/// Whether a fetch failure described by `kind` should be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The server returned a transient HTTP status.
    TransientStatus(u16),
    /// The server returned a permanent HTTP status.
    PermanentStatus(u16),
    /// The request timed out.
    Timeout,
    /// The connection was reset.
    ConnectionReset,
    /// Any other transport-level failure, treated as permanent.
    Other,
}

impl FailureKind {
    /// Whether this failure class is retryable.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::TransientStatus(_) | Self::Timeout | Self::ConnectionReset)
    }
}

/// Computes the exponential backoff delay before retry attempt `attempt`
/// (1-indexed), with jitter deterministically derived from `attempt` itself
/// rather than a random source, so the sequence is reproducible.
#[must_use]
pub fn backoff_delay(attempt: u32) -> Duration {
    let exponential_ms = BASE_DELAY_MS.saturating_mul(1u64 << attempt.min(10));
    let jitter_seed = f64::from(attempt.wrapping_mul(2_654_435_761) % 1000) / 1000.0;
    let jitter_ms = (exponential_ms as f64 * REGISTRY_RETRY_JITTER_FRACTION * jitter_seed) as u64;
    Duration::from_millis(exponential_ms.saturating_add(jitter_ms))
}

#[cfg(test)]
mod tests {
    use super::BASE_DELAY_MS;
    use super::FailureKind;
    use super::backoff_delay;
    use super::is_transient_status;

    #[test]
    fn classifies_known_transient_statuses() {
        for status in [429, 502, 503, 504] {
            assert!(is_transient_status(status));
        }
        assert!(!is_transient_status(404));
        assert!(!is_transient_status(401));
    }

    #[test]
    fn timeout_and_reset_are_retryable_but_other_is_not() {
        assert!(FailureKind::Timeout.is_retryable());
        assert!(FailureKind::ConnectionReset.is_retryable());
        assert!(!FailureKind::Other.is_retryable());
        assert!(!FailureKind::PermanentStatus(404).is_retryable());
    }

    #[test]
    fn backoff_grows_with_attempt_and_stays_bounded_by_jitter_cap() {
        let first = backoff_delay(0);
        let second = backoff_delay(1);
        assert!(second > first);
        assert!(first.as_millis() >= u128::from(BASE_DELAY_MS));
    }

    #[test]
    fn backoff_delay_is_deterministic() {
        assert_eq!(backoff_delay(2), backoff_delay(2));
    }
}
