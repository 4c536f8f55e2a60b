//! Suspicious activity detection
//!
//! A failed attempt is suspicious when the next successful attempt that
//! resolves it comes later than the resolution window (2 minutes by
//! default).
//!
//! The scan walks the time-ordered history once, keeping a queue of pending
//! failures:
//!
//! - a failure is queued
//! - a success resolves every queued failure; each one whose elapsed time
//!   exceeds the window is reported, and the queue is emptied either way
//!
//! Successes on any door resolve failures on any door. Failures still
//! pending when the history ends are not reported: without a later success
//! there is nothing to measure the delay against.

use crate::audit::check_range;
use crate::error::{Result, ValidationError};
use crate::model::AuthorizationAttempt;
use crate::storage::SharedStore;
use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;
use tracing::{debug, info};

/// Default time a failure has to be followed by a success
pub const DEFAULT_RESOLUTION_WINDOW_SECS: u64 = 120;

/// Flag failures in an already time-ordered attempt history
pub fn scan_for_suspicious(
    attempts: &[AuthorizationAttempt],
    window: Duration,
) -> Vec<AuthorizationAttempt> {
    let mut pending: VecDeque<&AuthorizationAttempt> = VecDeque::new();
    let mut suspicious = Vec::new();

    for attempt in attempts {
        if attempt.failed() {
            pending.push_back(attempt);
            continue;
        }

        while let Some(failure) = pending.pop_front() {
            let elapsed = attempt.timestamp - failure.timestamp;
            if elapsed > window {
                suspicious.push(failure.clone());
            }
        }
    }

    if !pending.is_empty() {
        debug!(
            unresolved = pending.len(),
            "Failures without a later success are not reported"
        );
    }
    suspicious
}

/// Queries the attempt history for suspicious failures
#[derive(Clone)]
pub struct SuspiciousActivityDetector {
    store: SharedStore,
    window: Duration,
}

impl SuspiciousActivityDetector {
    /// Detector with the default 2 minute window
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            window: Duration::seconds(DEFAULT_RESOLUTION_WINDOW_SECS as i64),
        }
    }

    /// Detector with a custom resolution window, which must be positive
    pub fn with_window(store: SharedStore, window: Duration) -> Result<Self> {
        if window <= Duration::zero() {
            return Err(ValidationError::new("window", "must be greater than zero").into());
        }
        Ok(Self { store, window })
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Suspicious attempts with `from < timestamp < to`, in timestamp order
    pub fn find_suspicious(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AuthorizationAttempt>> {
        check_range(from, to)?;
        let attempts = self.store.attempts_between(from, to, None)?;
        let suspicious = scan_for_suspicious(&attempts, self.window);

        info!(
            %from,
            %to,
            scanned = attempts.len(),
            suspicious = suspicious.len(),
            window_secs = self.window.num_seconds(),
            "Scanned for suspicious activity"
        );
        Ok(suspicious)
    }
}
