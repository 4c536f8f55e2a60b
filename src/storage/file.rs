//! JSON snapshot file store
//!
//! The whole store is kept in memory and written to disk after every
//! mutation. A mutation is applied to a copy of the state and only becomes
//! visible once the snapshot has been persisted, so a failed write leaves
//! both the file and the in-memory state untouched.

use super::SecurityStore;
use super::state::{Snapshot, StoreState};
use crate::error::StorageResult;
use crate::model::{
    AuthorizationAttempt, Credential, CredentialId, CredentialType, CredentialTypeId, Door,
    DoorId, Employee, EmployeeId, NewAttempt, NewCredential, NewCredentialType, NewDoor,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

/// Store persisted as a JSON snapshot file
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    state: RwLock<StoreState>,
}

impl FileStore {
    /// Open the store at `path`. A missing file starts an empty store; the
    /// file is created on the first mutation.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let state = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            let snapshot: Snapshot = serde_json::from_str(&raw)?;
            let state = StoreState::from_snapshot(snapshot)?;
            info!(path = %path.display(), "Loaded store snapshot");
            state
        } else {
            info!(path = %path.display(), "Snapshot not found, starting empty store");
            StoreState::default()
        };

        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(|poisoned| {
            tracing::warn!("file store lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn read_state(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(|poisoned| {
            tracing::warn!("file store lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Apply `f` to a copy of the state, persist it, then publish it
    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut StoreState) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let mut guard = self.write_state();
        let mut next = guard.clone();
        let value = f(&mut next)?;
        self.persist(&next)?;
        *guard = next;
        Ok(value)
    }

    /// Write to a sibling temp file and rename it over the snapshot
    fn persist(&self, state: &StoreState) -> StorageResult<()> {
        let json = serde_json::to_vec_pretty(&state.to_snapshot())?;

        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir)?;
        }

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(&json)?;
        file.sync_all()?;
        fs::rename(&tmp_path, &self.path)?;

        debug!(path = %self.path.display(), bytes = json.len(), "Persisted store snapshot");
        Ok(())
    }
}

impl SecurityStore for FileStore {
    fn insert_door(&self, door: NewDoor) -> StorageResult<Door> {
        self.mutate(|state| Ok(state.insert_door(door)))
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
        self.mutate(|state| Ok(state.insert_credential_type(credential_type)))
    }

    fn credential_type(&self, id: CredentialTypeId) -> StorageResult<Option<CredentialType>> {
        Ok(self.read_state().credential_type(id))
    }

    fn insert_employee(&self, name: String) -> StorageResult<Employee> {
        self.mutate(|state| Ok(state.insert_employee(name)))
    }

    fn employee(&self, id: EmployeeId) -> StorageResult<Option<Employee>> {
        Ok(self.read_state().employee(id))
    }

    fn insert_credential(&self, credential: NewCredential) -> StorageResult<Credential> {
        self.mutate(|state| state.insert_credential(credential))
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
        self.mutate(|state| state.add_required_type(door, credential_type))
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
        self.mutate(|state| state.grant(door, credentials))
    }

    fn revoke_credentials(
        &self,
        door: DoorId,
        credentials: &[CredentialId],
    ) -> StorageResult<usize> {
        self.mutate(|state| state.revoke(door, credentials))
    }

    fn append_attempt(&self, attempt: NewAttempt) -> StorageResult<AuthorizationAttempt> {
        self.mutate(|state| state.append_attempt(attempt))
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path().join("store.json")).unwrap();
        assert!(store.doors().unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_reopen_sees_persisted_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let (door, cred) = {
            let store = FileStore::open(&path).unwrap();
            let door = store.insert_door(NewDoor::new("Lobby", "Ground")).unwrap();
            let code = store
                .insert_credential_type(NewCredentialType::new("key code", false, true))
                .unwrap();
            let cred = store
                .insert_credential(NewCredential::new(code.id, "4321"))
                .unwrap();
            store.add_required_type(door.id, code.id).unwrap();
            store.grant_credentials(door.id, &[cred.id]).unwrap();
            (door, cred)
        };

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.door(door.id).unwrap(), Some(door.clone()));
        assert!(
            reopened
                .authorized_credentials(door.id)
                .unwrap()
                .contains(&cred.id)
        );

        // Sequences survive the round trip
        let next = reopened.insert_door(NewDoor::new("Lab", "Floor 2")).unwrap();
        assert_eq!(next.id, DoorId::new(2));
    }

    #[test]
    fn test_failed_mutation_is_not_persisted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = FileStore::open(&path).unwrap();
        store.insert_door(NewDoor::new("Lobby", "Ground")).unwrap();

        let result = store.grant_credentials(DoorId::new(1), &[CredentialId::new(99)]);
        assert!(matches!(result, Err(StorageError::MissingRecord(_))));

        let reopened = FileStore::open(&path).unwrap();
        assert!(
            reopened
                .authorized_credentials(DoorId::new(1))
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_corrupt_snapshot_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{ not json").unwrap();

        let result = FileStore::open(&path);
        assert!(matches!(result, Err(StorageError::Serialization(_))));
    }
}
