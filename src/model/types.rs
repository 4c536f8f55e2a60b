//! Entity types
//!
//! Plain data records. Relations between doors, credentials and credential
//! types are not navigable from these structs; they live as association sets
//! in the store and are resolved through explicit queries.

use crate::model::ids::{AttemptId, CredentialId, CredentialTypeId, DoorId, EmployeeId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A physical door guarded by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Door {
    pub id: DoorId,
    pub name: String,
    pub location: String,
}

/// Category of credential, e.g. security badge, fingerprint or key code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialType {
    pub id: CredentialTypeId,
    pub name: String,
    /// Instances belong to a single employee (badge, fingerprint)
    pub employee_specific: bool,
    /// Instances open a single door (key code)
    pub door_specific: bool,
}

/// Person credentials can be issued to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
}

/// Proof of identity
///
/// A credential only says who is presenting it. Whether it opens a door is
/// decided by the door's policy, see [`crate::policy::AccessPolicy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub id: CredentialId,
    pub credential_type: CredentialTypeId,
    /// Opaque code such as a badge number
    pub code: String,
    /// Owner, if the credential is issued to a person
    pub employee: Option<EmployeeId>,
}

/// A logged attempt to open a door. Immutable once logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationAttempt {
    pub id: AttemptId,
    pub door: DoorId,
    pub credentials: Vec<CredentialId>,
    pub succeeded: bool,
    pub timestamp: DateTime<Utc>,
}

impl AuthorizationAttempt {
    pub fn failed(&self) -> bool {
        !self.succeeded
    }
}

/// Input for creating a door
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDoor {
    pub name: String,
    pub location: String,
}

impl NewDoor {
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
        }
    }
}

/// Input for creating a credential type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCredentialType {
    pub name: String,
    pub employee_specific: bool,
    pub door_specific: bool,
}

impl NewCredentialType {
    pub fn new(name: impl Into<String>, employee_specific: bool, door_specific: bool) -> Self {
        Self {
            name: name.into(),
            employee_specific,
            door_specific,
        }
    }
}

/// Input for creating a credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCredential {
    pub credential_type: CredentialTypeId,
    pub code: String,
    pub employee: Option<EmployeeId>,
}

impl NewCredential {
    pub fn new(credential_type: CredentialTypeId, code: impl Into<String>) -> Self {
        Self {
            credential_type,
            code: code.into(),
            employee: None,
        }
    }

    /// Issue the credential to an employee
    pub fn owned_by(mut self, employee: EmployeeId) -> Self {
        self.employee = Some(employee);
        self
    }
}

/// Input for appending an attempt to the audit trail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttempt {
    pub door: DoorId,
    pub credentials: Vec<CredentialId>,
    pub succeeded: bool,
    pub timestamp: DateTime<Utc>,
}
