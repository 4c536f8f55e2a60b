//! Shared in-memory state for the provided stores
//!
//! Both [`MemoryStore`](super::MemoryStore) and [`FileStore`](super::FileStore)
//! keep their data in a [`StoreState`] behind a lock. The file store
//! additionally converts it to and from a [`Snapshot`] on disk.

use crate::error::{NotFoundError, StorageError, StorageResult, ValidationError};
use crate::model::{
    AttemptId, AuthorizationAttempt, Credential, CredentialId, CredentialType, CredentialTypeId,
    Door, DoorId, Employee, EmployeeId, NewAttempt, NewCredential, NewCredentialType, NewDoor,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Last issued id per entity kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Sequences {
    pub door: u64,
    pub credential_type: u64,
    pub employee: u64,
    pub credential: u64,
    pub attempt: u64,
}

/// Association sets of a single door
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct DoorPolicy {
    pub door: DoorId,
    #[serde(default)]
    pub required_types: Vec<CredentialTypeId>,
    #[serde(default)]
    pub credentials: Vec<CredentialId>,
}

/// On-disk representation of the whole store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Snapshot {
    #[serde(default)]
    pub sequences: Sequences,
    #[serde(default)]
    pub doors: Vec<Door>,
    #[serde(default)]
    pub credential_types: Vec<CredentialType>,
    #[serde(default)]
    pub employees: Vec<Employee>,
    #[serde(default)]
    pub credentials: Vec<Credential>,
    #[serde(default)]
    pub policies: Vec<DoorPolicy>,
    #[serde(default)]
    pub attempts: Vec<AuthorizationAttempt>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct StoreState {
    sequences: Sequences,
    doors: BTreeMap<DoorId, Door>,
    credential_types: BTreeMap<CredentialTypeId, CredentialType>,
    employees: BTreeMap<EmployeeId, Employee>,
    credentials: BTreeMap<CredentialId, Credential>,
    required_types: BTreeMap<DoorId, BTreeSet<CredentialTypeId>>,
    authorized: BTreeMap<DoorId, BTreeSet<CredentialId>>,
    /// Append-only, in logging order
    attempts: Vec<AuthorizationAttempt>,
}

impl StoreState {
    pub fn insert_door(&mut self, door: NewDoor) -> Door {
        self.sequences.door += 1;
        let door = Door {
            id: DoorId::new(self.sequences.door),
            name: door.name,
            location: door.location,
        };
        self.doors.insert(door.id, door.clone());
        door
    }

    pub fn door(&self, id: DoorId) -> Option<Door> {
        self.doors.get(&id).cloned()
    }

    pub fn doors(&self) -> Vec<Door> {
        self.doors.values().cloned().collect()
    }

    pub fn insert_credential_type(&mut self, new: NewCredentialType) -> CredentialType {
        self.sequences.credential_type += 1;
        let credential_type = CredentialType {
            id: CredentialTypeId::new(self.sequences.credential_type),
            name: new.name,
            employee_specific: new.employee_specific,
            door_specific: new.door_specific,
        };
        self.credential_types
            .insert(credential_type.id, credential_type.clone());
        credential_type
    }

    pub fn credential_type(&self, id: CredentialTypeId) -> Option<CredentialType> {
        self.credential_types.get(&id).cloned()
    }

    pub fn insert_employee(&mut self, name: String) -> Employee {
        self.sequences.employee += 1;
        let employee = Employee {
            id: EmployeeId::new(self.sequences.employee),
            name,
        };
        self.employees.insert(employee.id, employee.clone());
        employee
    }

    pub fn employee(&self, id: EmployeeId) -> Option<Employee> {
        self.employees.get(&id).cloned()
    }

    pub fn insert_credential(&mut self, new: NewCredential) -> StorageResult<Credential> {
        if !self.credential_types.contains_key(&new.credential_type) {
            return Err(StorageError::MissingRecord(NotFoundError::credential_type(
                new.credential_type,
            )));
        }
        if let Some(employee) = new.employee
            && !self.employees.contains_key(&employee)
        {
            return Err(StorageError::MissingRecord(NotFoundError::employee(
                employee,
            )));
        }

        self.sequences.credential += 1;
        let credential = Credential {
            id: CredentialId::new(self.sequences.credential),
            credential_type: new.credential_type,
            code: new.code,
            employee: new.employee,
        };
        self.credentials.insert(credential.id, credential.clone());
        Ok(credential)
    }

    pub fn credential(&self, id: CredentialId) -> Option<Credential> {
        self.credentials.get(&id).cloned()
    }

    pub fn credentials_of_employee(&self, employee: EmployeeId) -> Vec<Credential> {
        self.credentials
            .values()
            .filter(|c| c.employee == Some(employee))
            .cloned()
            .collect()
    }

    pub fn add_required_type(
        &mut self,
        door: DoorId,
        credential_type: CredentialTypeId,
    ) -> StorageResult<bool> {
        self.ensure_door(door)?;
        if !self.credential_types.contains_key(&credential_type) {
            return Err(StorageError::MissingRecord(NotFoundError::credential_type(
                credential_type,
            )));
        }
        Ok(self
            .required_types
            .entry(door)
            .or_default()
            .insert(credential_type))
    }

    pub fn required_types(&self, door: DoorId) -> StorageResult<BTreeSet<CredentialTypeId>> {
        self.ensure_door(door)?;
        Ok(self.required_types.get(&door).cloned().unwrap_or_default())
    }

    pub fn authorized_credentials(&self, door: DoorId) -> StorageResult<BTreeSet<CredentialId>> {
        self.ensure_door(door)?;
        Ok(self.authorized.get(&door).cloned().unwrap_or_default())
    }

    pub fn doors_authorizing(&self, credential: CredentialId) -> Vec<DoorId> {
        self.authorized
            .iter()
            .filter(|(_, granted)| granted.contains(&credential))
            .map(|(door, _)| *door)
            .collect()
    }

    /// Returns how many credentials were newly added
    ///
    /// A door-specific credential already authorized for another door is
    /// rejected, and nothing is granted.
    pub fn grant(&mut self, door: DoorId, credentials: &[CredentialId]) -> StorageResult<usize> {
        self.ensure_door(door)?;
        for id in credentials {
            let credential = self
                .credentials
                .get(id)
                .ok_or_else(|| StorageError::MissingRecord(NotFoundError::credential(*id)))?;
            let door_specific = self
                .credential_types
                .get(&credential.credential_type)
                .is_some_and(|t| t.door_specific);
            if !door_specific {
                continue;
            }
            if let Some(other) = self
                .doors_authorizing(*id)
                .into_iter()
                .find(|d| *d != door)
            {
                return Err(StorageError::Rejected(
                    ValidationError::door_specific_conflict(id.get(), other.get()),
                ));
            }
        }

        let granted = self.authorized.entry(door).or_default();
        Ok(credentials.iter().filter(|id| granted.insert(**id)).count())
    }

    /// Returns how many credentials were actually removed
    pub fn revoke(&mut self, door: DoorId, credentials: &[CredentialId]) -> StorageResult<usize> {
        self.ensure_door(door)?;
        let Some(granted) = self.authorized.get_mut(&door) else {
            return Ok(0);
        };
        Ok(credentials.iter().filter(|id| granted.remove(*id)).count())
    }

    pub fn append_attempt(&mut self, attempt: NewAttempt) -> StorageResult<AuthorizationAttempt> {
        self.ensure_door(attempt.door)?;
        self.sequences.attempt += 1;
        let attempt = AuthorizationAttempt {
            id: AttemptId::new(self.sequences.attempt),
            door: attempt.door,
            credentials: attempt.credentials,
            succeeded: attempt.succeeded,
            timestamp: attempt.timestamp,
        };
        self.attempts.push(attempt.clone());
        Ok(attempt)
    }

    /// Attempts with `from < timestamp < to`, ordered by timestamp then id
    pub fn attempts_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        door: Option<DoorId>,
    ) -> Vec<AuthorizationAttempt> {
        let mut attempts: Vec<_> = self
            .attempts
            .iter()
            .filter(|a| a.timestamp > from && a.timestamp < to)
            .filter(|a| door.is_none_or(|d| a.door == d))
            .cloned()
            .collect();
        attempts.sort_by_key(|a| (a.timestamp, a.id));
        attempts
    }

    fn ensure_door(&self, door: DoorId) -> StorageResult<()> {
        if self.doors.contains_key(&door) {
            Ok(())
        } else {
            Err(StorageError::MissingRecord(NotFoundError::door(door)))
        }
    }

    pub fn to_snapshot(&self) -> Snapshot {
        let policies = self
            .doors
            .keys()
            .filter_map(|door| {
                let required_types: Vec<_> = self
                    .required_types
                    .get(door)
                    .map(|set| set.iter().copied().collect())
                    .unwrap_or_default();
                let credentials: Vec<_> = self
                    .authorized
                    .get(door)
                    .map(|set| set.iter().copied().collect())
                    .unwrap_or_default();
                if required_types.is_empty() && credentials.is_empty() {
                    None
                } else {
                    Some(DoorPolicy {
                        door: *door,
                        required_types,
                        credentials,
                    })
                }
            })
            .collect();

        Snapshot {
            sequences: self.sequences,
            doors: self.doors.values().cloned().collect(),
            credential_types: self.credential_types.values().cloned().collect(),
            employees: self.employees.values().cloned().collect(),
            credentials: self.credentials.values().cloned().collect(),
            policies,
            attempts: self.attempts.clone(),
        }
    }

    /// Rebuild state from a snapshot, rejecting dangling references
    pub fn from_snapshot(snapshot: Snapshot) -> StorageResult<Self> {
        let mut state = StoreState {
            sequences: snapshot.sequences,
            ..Default::default()
        };

        for door in snapshot.doors {
            state.doors.insert(door.id, door);
        }
        for credential_type in snapshot.credential_types {
            state
                .credential_types
                .insert(credential_type.id, credential_type);
        }
        for employee in snapshot.employees {
            state.employees.insert(employee.id, employee);
        }
        for credential in snapshot.credentials {
            if !state.credential_types.contains_key(&credential.credential_type) {
                return Err(StorageError::Inconsistent(format!(
                    "credential {} references unknown credential type {}",
                    credential.id, credential.credential_type
                )));
            }
            if let Some(employee) = credential.employee
                && !state.employees.contains_key(&employee)
            {
                return Err(StorageError::Inconsistent(format!(
                    "credential {} references unknown employee {}",
                    credential.id, employee
                )));
            }
            state.credentials.insert(credential.id, credential);
        }

        for policy in snapshot.policies {
            if !state.doors.contains_key(&policy.door) {
                return Err(StorageError::Inconsistent(format!(
                    "policy references unknown door {}",
                    policy.door
                )));
            }
            if let Some(unknown) = policy
                .required_types
                .iter()
                .find(|t| !state.credential_types.contains_key(*t))
            {
                return Err(StorageError::Inconsistent(format!(
                    "door {} requires unknown credential type {}",
                    policy.door, unknown
                )));
            }
            if let Some(unknown) = policy
                .credentials
                .iter()
                .find(|c| !state.credentials.contains_key(*c))
            {
                return Err(StorageError::Inconsistent(format!(
                    "door {} authorizes unknown credential {}",
                    policy.door, unknown
                )));
            }
            state
                .required_types
                .insert(policy.door, policy.required_types.into_iter().collect());
            state
                .authorized
                .insert(policy.door, policy.credentials.into_iter().collect());
        }

        if let Some(attempt) = snapshot
            .attempts
            .iter()
            .find(|a| !state.doors.contains_key(&a.door))
        {
            return Err(StorageError::Inconsistent(format!(
                "attempt {} references unknown door {}",
                attempt.id, attempt.door
            )));
        }
        state.attempts = snapshot.attempts;

        state.check_sequences()?;
        Ok(state)
    }

    /// Every stored id must be covered by its sequence, otherwise new
    /// inserts would collide with existing records.
    fn check_sequences(&self) -> StorageResult<()> {
        let checks = [
            ("door", max_id(self.doors.keys().map(|id| id.get())), self.sequences.door),
            (
                "credential type",
                max_id(self.credential_types.keys().map(|id| id.get())),
                self.sequences.credential_type,
            ),
            (
                "employee",
                max_id(self.employees.keys().map(|id| id.get())),
                self.sequences.employee,
            ),
            (
                "credential",
                max_id(self.credentials.keys().map(|id| id.get())),
                self.sequences.credential,
            ),
            (
                "attempt",
                max_id(self.attempts.iter().map(|a| a.id.get())),
                self.sequences.attempt,
            ),
        ];

        for (kind, max_id, sequence) in checks {
            if max_id > sequence {
                return Err(StorageError::Inconsistent(format!(
                    "{kind} id {max_id} is ahead of its sequence ({sequence})"
                )));
            }
        }
        Ok(())
    }
}

fn max_id(ids: impl Iterator<Item = u64>) -> u64 {
    ids.max().unwrap_or(0)
}
