//! Security service
//!
//! Wires the policy store, evaluator, logger and detector around one shared
//! store, and provides the administrative registry operations.
//!
//! [`SecurityService::attempt_access`] is the evaluate-then-log flow. It is
//! not atomic with respect to concurrent grants or revocations: the logged
//! outcome reflects the policy as it was read during evaluation.

use crate::audit::AttemptLogger;
use crate::authorization::{AuthorizationDecision, AuthorizationEvaluator};
use crate::config::AppConfig;
use crate::detection::SuspiciousActivityDetector;
use crate::error::{NotFoundError, Result, ValidationError};
use crate::model::{
    AttemptId, AuthorizationAttempt, Credential, CredentialId, CredentialType, Door, DoorId,
    Employee, NewCredential, NewCredentialType, NewDoor,
};
use crate::policy::AccessPolicy;
use crate::storage::SharedStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

/// Outcome of presenting credentials at a door
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessOutcome {
    pub attempt: AttemptId,
    pub door: DoorId,
    pub granted: bool,
    #[serde(flatten)]
    pub decision: AuthorizationDecision,
}

/// Facade over the authorization and audit engine
#[derive(Clone)]
pub struct SecurityService {
    store: SharedStore,
    policy: AccessPolicy,
    evaluator: AuthorizationEvaluator,
    logger: AttemptLogger,
    detector: SuspiciousActivityDetector,
}

impl SecurityService {
    /// Service with the default detection window
    pub fn new(store: SharedStore) -> Self {
        Self {
            policy: AccessPolicy::new(store.clone()),
            evaluator: AuthorizationEvaluator::new(store.clone()),
            logger: AttemptLogger::new(store.clone()),
            detector: SuspiciousActivityDetector::new(store.clone()),
            store,
        }
    }

    /// Service configured from the application config
    pub fn from_config(store: SharedStore, config: &AppConfig) -> Result<Self> {
        let window = config.detection.resolution_window().ok_or_else(|| {
            ValidationError::new(
                "detection.resolution_window_secs",
                "is too large for a duration",
            )
        })?;
        let detector = SuspiciousActivityDetector::with_window(store.clone(), window)?;
        Ok(Self {
            detector,
            ..Self::new(store)
        })
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    pub fn evaluator(&self) -> &AuthorizationEvaluator {
        &self.evaluator
    }

    pub fn logger(&self) -> &AttemptLogger {
        &self.logger
    }

    pub fn detector(&self) -> &SuspiciousActivityDetector {
        &self.detector
    }

    // Registry

    pub fn add_door(&self, name: &str, location: &str) -> Result<Door> {
        let name = required("door.name", name)?;
        let door = self
            .store
            .insert_door(NewDoor::new(name, location.trim()))?;
        info!(door = %door.id, name = %door.name, "Added door");
        Ok(door)
    }

    pub fn add_credential_type(
        &self,
        name: &str,
        employee_specific: bool,
        door_specific: bool,
    ) -> Result<CredentialType> {
        let name = required("credential_type.name", name)?;
        let credential_type = self.store.insert_credential_type(NewCredentialType::new(
            name,
            employee_specific,
            door_specific,
        ))?;
        info!(
            credential_type = %credential_type.id,
            name = %credential_type.name,
            employee_specific,
            door_specific,
            "Added credential type"
        );
        Ok(credential_type)
    }

    pub fn add_employee(&self, name: &str) -> Result<Employee> {
        let name = required("employee.name", name)?;
        let employee = self.store.insert_employee(name.to_string())?;
        info!(employee = %employee.id, "Added employee");
        Ok(employee)
    }

    /// Register a credential. This proves identity only; use
    /// [`AccessPolicy::grant_access`] to let it open doors.
    pub fn add_credential(&self, credential: NewCredential) -> Result<Credential> {
        let code = required("credential.code", &credential.code)?.to_string();

        let credential_type = self
            .store
            .credential_type(credential.credential_type)?
            .ok_or_else(|| NotFoundError::credential_type(credential.credential_type))?;
        match credential.employee {
            Some(employee) => {
                if self.store.employee(employee)?.is_none() {
                    return Err(NotFoundError::employee(employee).into());
                }
            }
            None if credential_type.employee_specific => {
                return Err(ValidationError::owner_required(&credential_type.name).into());
            }
            None => {}
        }

        let credential = self.store.insert_credential(NewCredential {
            code,
            ..credential
        })?;
        info!(
            credential = %credential.id,
            credential_type = %credential.credential_type,
            employee = ?credential.employee,
            "Added credential"
        );
        Ok(credential)
    }

    pub fn door(&self, id: DoorId) -> Result<Door> {
        Ok(self.store.door(id)?.ok_or_else(|| NotFoundError::door(id))?)
    }

    pub fn doors(&self) -> Result<Vec<Door>> {
        Ok(self.store.doors()?)
    }

    pub fn credential(&self, id: CredentialId) -> Result<Credential> {
        Ok(self
            .store
            .credential(id)?
            .ok_or_else(|| NotFoundError::credential(id))?)
    }

    // Authorization flow

    /// Evaluate a presentation and log the outcome
    pub fn attempt_access(
        &self,
        door: DoorId,
        credentials: &[CredentialId],
        timestamp: DateTime<Utc>,
    ) -> Result<AccessOutcome> {
        let decision = self.evaluator.evaluate(door, credentials)?;
        let granted = decision.is_granted();
        let attempt = self
            .logger
            .log_attempt(door, credentials, granted, timestamp)?;

        Ok(AccessOutcome {
            attempt,
            door,
            granted,
            decision,
        })
    }

    pub fn find_suspicious(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AuthorizationAttempt>> {
        self.detector.find_suspicious(from, to)
    }
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::empty(field).into());
    }
    Ok(trimmed)
}
