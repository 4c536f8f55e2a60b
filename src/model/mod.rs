//! Entity model
//!
//! Doors, credentials, credential types, employees and logged authorization
//! attempts, plus the identifier newtypes that link them.

pub mod ids;
pub mod types;

pub use ids::{AttemptId, CredentialId, CredentialTypeId, DoorId, EmployeeId};
pub use types::{
    AuthorizationAttempt, Credential, CredentialType, Door, Employee, NewAttempt, NewCredential,
    NewCredentialType, NewDoor,
};
