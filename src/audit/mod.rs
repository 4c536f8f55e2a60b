//! Attempt logger
//!
//! Appends authorization attempts to the audit trail and answers range
//! queries over it. The logger records whatever outcome the caller asserts;
//! it does not re-evaluate policy, so out-of-band events can be logged too.
//!
//! Range queries use exclusive bounds (`from < timestamp < to`) and return
//! attempts in timestamp order.

use crate::error::{NotFoundError, Result, ValidationError};
use crate::model::{AttemptId, AuthorizationAttempt, CredentialId, DoorId, NewAttempt};
use crate::storage::SharedStore;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

/// Append-only access to the authorization attempt history
#[derive(Clone)]
pub struct AttemptLogger {
    store: SharedStore,
}

impl AttemptLogger {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Record an attempt and return its id
    pub fn log_attempt(
        &self,
        door: DoorId,
        credentials: &[CredentialId],
        succeeded: bool,
        timestamp: DateTime<Utc>,
    ) -> Result<AttemptId> {
        if self.store.door(door)?.is_none() {
            return Err(NotFoundError::door(door).into());
        }

        let attempt = self.store.append_attempt(NewAttempt {
            door,
            credentials: credentials.to_vec(),
            succeeded,
            timestamp,
        })?;

        info!(
            attempt = %attempt.id,
            door = %door,
            credentials = credentials.len(),
            succeeded,
            timestamp = %timestamp,
            "Logged authorization attempt"
        );
        Ok(attempt.id)
    }

    /// All attempts in the window, on every door
    pub fn activity(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AuthorizationAttempt>> {
        check_range(from, to)?;
        let attempts = self.store.attempts_between(from, to, None)?;
        debug!(%from, %to, count = attempts.len(), "Queried activity");
        Ok(attempts)
    }

    /// Attempts in the window on a single door
    pub fn door_activity(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        door: DoorId,
    ) -> Result<Vec<AuthorizationAttempt>> {
        check_range(from, to)?;
        if self.store.door(door)?.is_none() {
            return Err(NotFoundError::door(door).into());
        }
        let attempts = self.store.attempts_between(from, to, Some(door))?;
        debug!(%from, %to, door = %door, count = attempts.len(), "Queried door activity");
        Ok(attempts)
    }
}

/// Reject windows whose start lies after their end
pub(crate) fn check_range(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<()> {
    if from > to {
        return Err(ValidationError::inverted_range().into());
    }
    Ok(())
}
