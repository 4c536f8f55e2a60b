//! Access policy store
//!
//! Each door carries two independent association sets:
//! - the credential types it requires
//! - the specific credentials authorized to open it
//!
//! Grants add credentials to the authorized set. Revocation of a credential
//! issued to an employee removes *every* credential of that employee from
//! the door, so revoking one badge also revokes the same person's
//! fingerprint. Credentials without an owner (shared key codes) are revoked
//! individually. Revocation never deletes the credential itself.

use crate::error::{NotFoundError, Result};
use crate::model::{CredentialId, CredentialTypeId, DoorId};
use crate::storage::SharedStore;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Grant/revoke operations over the per-door association sets
#[derive(Clone)]
pub struct AccessPolicy {
    store: SharedStore,
}

impl AccessPolicy {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Authorize credentials for a door
    ///
    /// Already granted credentials are skipped. Returns how many credentials
    /// were newly added.
    pub fn grant_access(&self, door: DoorId, credentials: &[CredentialId]) -> Result<usize> {
        self.ensure_door(door)?;

        // Unknown credentials and door-specific conflicts are rejected by
        // the store inside the same transaction as the grant.
        let added = self.store.grant_credentials(door, credentials)?;
        info!(
            door = %door,
            requested = credentials.len(),
            added,
            "Granted access"
        );
        Ok(added)
    }

    /// Revoke a credential from a door
    ///
    /// If the credential belongs to an employee, all of that employee's
    /// credentials are removed from the door. Revoking something that was
    /// never granted is a no-op. Returns how many credentials were removed.
    pub fn revoke_access(&self, door: DoorId, credential: CredentialId) -> Result<usize> {
        self.ensure_door(door)?;
        let credential = self
            .store
            .credential(credential)?
            .ok_or_else(|| NotFoundError::credential(credential))?;

        let targets: Vec<CredentialId> = match credential.employee {
            Some(employee) => {
                let owned: Vec<_> = self
                    .store
                    .credentials_of_employee(employee)?
                    .into_iter()
                    .map(|c| c.id)
                    .collect();
                debug!(
                    door = %door,
                    employee = %employee,
                    count = owned.len(),
                    "Revoking all credentials of employee"
                );
                owned
            }
            None => vec![credential.id],
        };

        let removed = self.store.revoke_credentials(door, &targets)?;
        info!(
            door = %door,
            credential = %credential.id,
            removed,
            "Revoked access"
        );
        Ok(removed)
    }

    /// Add a credential type to the door's requirements
    ///
    /// Returns false if the type was already required.
    pub fn require_credential_type(
        &self,
        door: DoorId,
        credential_type: CredentialTypeId,
    ) -> Result<bool> {
        self.ensure_door(door)?;
        if self.store.credential_type(credential_type)?.is_none() {
            return Err(NotFoundError::credential_type(credential_type).into());
        }

        let added = self.store.add_required_type(door, credential_type)?;
        info!(door = %door, credential_type = %credential_type, added, "Required credential type");
        Ok(added)
    }

    pub fn required_types(&self, door: DoorId) -> Result<BTreeSet<CredentialTypeId>> {
        self.ensure_door(door)?;
        Ok(self.store.required_types(door)?)
    }

    pub fn authorized_credentials(&self, door: DoorId) -> Result<BTreeSet<CredentialId>> {
        self.ensure_door(door)?;
        Ok(self.store.authorized_credentials(door)?)
    }

    pub fn doors_authorizing(&self, credential: CredentialId) -> Result<Vec<DoorId>> {
        if self.store.credential(credential)?.is_none() {
            return Err(NotFoundError::credential(credential).into());
        }
        Ok(self.store.doors_authorizing(credential)?)
    }

    fn ensure_door(&self, door: DoorId) -> Result<()> {
        match self.store.door(door)? {
            Some(_) => Ok(()),
            None => Err(NotFoundError::door(door).into()),
        }
    }
}
