//! Storage collaborator
//!
//! The engine never holds entities itself. Every operation goes through a
//! [`SecurityStore`], which owns the entity records, the per-door association
//! sets and the append-only attempt log.
//!
//! Each trait method is one transaction: implementations must serialize
//! mutations of a door's association sets so concurrent grant/revoke calls
//! cannot lose updates. The engine adds no locking of its own.
//!
//! Two implementations are provided:
//! - [`MemoryStore`] keeps everything in memory
//! - [`FileStore`] persists a JSON snapshot after every mutation

mod file;
mod memory;
mod state;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::StorageResult;
use crate::model::{
    AuthorizationAttempt, Credential, CredentialId, CredentialType, CredentialTypeId, Door,
    DoorId, Employee, EmployeeId, NewAttempt, NewCredential, NewCredentialType, NewDoor,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Read/write access to doors, credentials and the attempt log
///
/// Lookups of a single entity return `Ok(None)` when it does not exist.
/// Association and append operations on a missing door (or referencing a
/// missing credential) fail with [`StorageError::MissingRecord`](crate::error::StorageError::MissingRecord).
pub trait SecurityStore: Send + Sync {
    fn insert_door(&self, door: NewDoor) -> StorageResult<Door>;

    fn door(&self, id: DoorId) -> StorageResult<Option<Door>>;

    fn doors(&self) -> StorageResult<Vec<Door>>;

    fn insert_credential_type(
        &self,
        credential_type: NewCredentialType,
    ) -> StorageResult<CredentialType>;

    fn credential_type(&self, id: CredentialTypeId) -> StorageResult<Option<CredentialType>>;

    fn insert_employee(&self, name: String) -> StorageResult<Employee>;

    fn employee(&self, id: EmployeeId) -> StorageResult<Option<Employee>>;

    fn insert_credential(&self, credential: NewCredential) -> StorageResult<Credential>;

    fn credential(&self, id: CredentialId) -> StorageResult<Option<Credential>>;

    /// All credentials issued to an employee
    fn credentials_of_employee(&self, employee: EmployeeId) -> StorageResult<Vec<Credential>>;

    /// Add a credential type to the door's requirements.
    /// Returns false if it was already required.
    fn add_required_type(
        &self,
        door: DoorId,
        credential_type: CredentialTypeId,
    ) -> StorageResult<bool>;

    fn required_types(&self, door: DoorId) -> StorageResult<BTreeSet<CredentialTypeId>>;

    fn authorized_credentials(&self, door: DoorId) -> StorageResult<BTreeSet<CredentialId>>;

    /// Doors whose authorized set contains the credential
    fn doors_authorizing(&self, credential: CredentialId) -> StorageResult<Vec<DoorId>>;

    /// Add credentials to the door's authorized set in one transaction.
    /// Returns the number of credentials that were not already present.
    fn grant_credentials(&self, door: DoorId, credentials: &[CredentialId])
    -> StorageResult<usize>;

    /// Remove credentials from the door's authorized set in one transaction.
    /// Returns the number of credentials that were actually present.
    fn revoke_credentials(
        &self,
        door: DoorId,
        credentials: &[CredentialId],
    ) -> StorageResult<usize>;

    fn append_attempt(&self, attempt: NewAttempt) -> StorageResult<AuthorizationAttempt>;

    /// Attempts with `from < timestamp < to`, optionally limited to one door,
    /// ordered by timestamp (ties by attempt id)
    fn attempts_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        door: Option<DoorId>,
    ) -> StorageResult<Vec<AuthorizationAttempt>>;
}

/// Shared store handle
pub type SharedStore = Arc<dyn SecurityStore>;
