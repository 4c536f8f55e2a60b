//! In-memory store

use super::SecurityStore;
use super::state::StoreState;
use crate::error::StorageResult;
use crate::model::{
    AuthorizationAttempt, Credential, CredentialId, CredentialType, CredentialTypeId, Door,
    DoorId, Employee, EmployeeId, NewAttempt, NewCredential, NewCredentialType, NewDoor,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Store that keeps all records in memory for the lifetime of the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Recover from poisoned locks: every mutation of the state completes
    // before anything that could panic, so the data is still consistent.

    fn write_state(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(|poisoned| {
            tracing::warn!("memory store lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn read_state(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(|poisoned| {
            tracing::warn!("memory store lock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

impl SecurityStore for MemoryStore {
    fn insert_door(&self, door: NewDoor) -> StorageResult<Door> {
        Ok(self.write_state().insert_door(door))
    }

    fn door(&self, id: DoorId) -> StorageResult<Option<Door>> {
        Ok(self.read_state().door(id))
    }

    fn doors(&self) -> StorageResult<Vec<Door>> {
        Ok(self.read_state().doors())
    }

    fn insert_credential_type(
        &self,
        credential_type: NewCredentialType,
    ) -> StorageResult<CredentialType> {
        Ok(self.write_state().insert_credential_type(credential_type))
    }

    fn credential_type(&self, id: CredentialTypeId) -> StorageResult<Option<CredentialType>> {
        Ok(self.read_state().credential_type(id))
    }

    fn insert_employee(&self, name: String) -> StorageResult<Employee> {
        Ok(self.write_state().insert_employee(name))
    }

    fn employee(&self, id: EmployeeId) -> StorageResult<Option<Employee>> {
        Ok(self.read_state().employee(id))
    }

    fn insert_credential(&self, credential: NewCredential) -> StorageResult<Credential> {
        self.write_state().insert_credential(credential)
    }

    fn credential(&self, id: CredentialId) -> StorageResult<Option<Credential>> {
        Ok(self.read_state().credential(id))
    }

    fn credentials_of_employee(&self, employee: EmployeeId) -> StorageResult<Vec<Credential>> {
        Ok(self.read_state().credentials_of_employee(employee))
    }

    fn add_required_type(
        &self,
        door: DoorId,
        credential_type: CredentialTypeId,
    ) -> StorageResult<bool> {
        self.write_state().add_required_type(door, credential_type)
    }

    fn required_types(&self, door: DoorId) -> StorageResult<BTreeSet<CredentialTypeId>> {
        self.read_state().required_types(door)
    }

    fn authorized_credentials(&self, door: DoorId) -> StorageResult<BTreeSet<CredentialId>> {
        self.read_state().authorized_credentials(door)
    }

    fn doors_authorizing(&self, credential: CredentialId) -> StorageResult<Vec<DoorId>> {
        Ok(self.read_state().doors_authorizing(credential))
    }

    fn grant_credentials(
        &self,
        door: DoorId,
        credentials: &[CredentialId],
    ) -> StorageResult<usize> {
        self.write_state().grant(door, credentials)
    }

    fn revoke_credentials(
        &self,
        door: DoorId,
        credentials: &[CredentialId],
    ) -> StorageResult<usize> {
        self.write_state().revoke(door, credentials)
    }

    fn append_attempt(&self, attempt: NewAttempt) -> StorageResult<AuthorizationAttempt> {
        self.write_state().append_attempt(attempt)
    }

    fn attempts_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        door: Option<DoorId>,
    ) -> StorageResult<Vec<AuthorizationAttempt>> {
        Ok(self.read_state().attempts_between(from, to, door))
    }
}
