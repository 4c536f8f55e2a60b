//! Authorization evaluator
//!
//! Decides whether a presented credential set opens a door. Two conditions
//! must both hold:
//!
//! 1. every credential type the door requires is covered by at least one
//!    presented credential
//! 2. every presented credential is individually authorized for the door
//!
//! Presenting more credentials than required is fine as long as each of
//! them is authorized; a single unauthorized credential fails the attempt.
//!
//! An empty presentation passes only when the door requires no credential
//! types at all.
//!
//! The evaluator never logs attempts. Callers record the outcome through
//! [`AttemptLogger`](crate::audit::AttemptLogger).

use crate::error::{NotFoundError, Result};
use crate::model::{Credential, CredentialId, CredentialTypeId, DoorId};
use crate::storage::SharedStore;
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Why an attempt was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DenialReason {
    /// No presented credential has this required type
    MissingCredentialType { credential_type: CredentialTypeId },
    /// This presented credential is not authorized for the door
    UnauthorizedCredential { credential: CredentialId },
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenialReason::MissingCredentialType { credential_type } => {
                write!(f, "required credential type {credential_type} not presented")
            }
            DenialReason::UnauthorizedCredential { credential } => {
                write!(f, "credential {credential} is not authorized for this door")
            }
        }
    }
}

/// Result of evaluating a presentation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AuthorizationDecision {
    Granted,
    Denied(DenialReason),
}

impl AuthorizationDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, AuthorizationDecision::Granted)
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, AuthorizationDecision::Denied(_))
    }
}

/// Evaluates presentations against the door policies in the store
#[derive(Clone)]
pub struct AuthorizationEvaluator {
    store: SharedStore,
}

impl AuthorizationEvaluator {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Whether the presented credentials open the door
    pub fn is_authorized(&self, door: DoorId, presented: &[CredentialId]) -> Result<bool> {
        Ok(self.evaluate(door, presented)?.is_granted())
    }

    /// Evaluate a presentation, reporting the first rule it breaks
    ///
    /// Credentials are looked up by id, so their types come from the store.
    /// Required types are checked before individual credentials.
    pub fn evaluate(
        &self,
        door: DoorId,
        presented: &[CredentialId],
    ) -> Result<AuthorizationDecision> {
        if self.store.door(door)?.is_none() {
            return Err(NotFoundError::door(door).into());
        }

        let presented = presented
            .iter()
            .map(|id| -> Result<Credential> {
                Ok(self
                    .store
                    .credential(*id)?
                    .ok_or_else(|| NotFoundError::credential(*id))?)
            })
            .collect::<Result<Vec<_>>>()?;

        let required = self.store.required_types(door)?;
        let authorized = self.store.authorized_credentials(door)?;

        let decision = if let Some(missing) = required
            .iter()
            .find(|t| !presented.iter().any(|c| c.credential_type == **t))
        {
            AuthorizationDecision::Denied(DenialReason::MissingCredentialType {
                credential_type: *missing,
            })
        } else if let Some(unauthorized) = presented.iter().find(|c| !authorized.contains(&c.id)) {
            AuthorizationDecision::Denied(DenialReason::UnauthorizedCredential {
                credential: unauthorized.id,
            })
        } else {
            AuthorizationDecision::Granted
        };

        debug!(
            door = %door,
            presented = presented.len(),
            required = required.len(),
            decision = ?decision,
            "Evaluated authorization"
        );
        Ok(decision)
    }
}
