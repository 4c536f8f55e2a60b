//! Shared fixtures for integration tests

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use doorkeeper::model::{Credential, CredentialType, Door, Employee, NewCredential};
use doorkeeper::{MemoryStore, SecurityService};
use std::sync::Arc;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

/// A building with one door, three credential types and two employees
pub struct Building {
    pub service: SecurityService,
    pub door: Door,
    pub badge: CredentialType,
    pub fingerprint: CredentialType,
    pub key_code: CredentialType,
    pub alice: Employee,
    pub bob: Employee,
}

impl Building {
    pub fn new() -> Self {
        let service = SecurityService::new(Arc::new(MemoryStore::new()));
        let door = service.add_door("Server room", "Floor 3").unwrap();
        let badge = service.add_credential_type("badge", true, false).unwrap();
        let fingerprint = service
            .add_credential_type("fingerprint", true, false)
            .unwrap();
        let key_code = service.add_credential_type("key code", false, true).unwrap();
        let alice = service.add_employee("Alice").unwrap();
        let bob = service.add_employee("Bob").unwrap();

        Self {
            service,
            door,
            badge,
            fingerprint,
            key_code,
            alice,
            bob,
        }
    }

    pub fn issue(&self, credential_type: &CredentialType, code: &str, owner: &Employee) -> Credential {
        self.service
            .add_credential(NewCredential::new(credential_type.id, code).owned_by(owner.id))
            .unwrap()
    }

    pub fn shared_code(&self, code: &str) -> Credential {
        self.service
            .add_credential(NewCredential::new(self.key_code.id, code))
            .unwrap()
    }
}
