//! Error types for doorkeeper
//!
//! This module defines the error hierarchy used throughout the engine.
//! Library errors use `thiserror`; the binary wraps them in `anyhow` at the
//! top level.

use std::fmt;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Not found: {0}")]
    NotFound(#[from] NotFoundError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(StorageError),
}

impl AppError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {field}")]
    Missing { field: String },
}

/// Kind of entity a lookup failed for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Door,
    Credential,
    CredentialType,
    Employee,
}

impl EntityKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Door => "door",
            EntityKind::Credential => "credential",
            EntityKind::CredentialType => "credential type",
            EntityKind::Employee => "employee",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A referenced entity does not exist
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{entity} {id} does not exist")]
pub struct NotFoundError {
    pub entity: EntityKind,
    pub id: u64,
}

impl NotFoundError {
    pub fn new(entity: EntityKind, id: impl Into<u64>) -> Self {
        Self {
            entity,
            id: id.into(),
        }
    }

    pub fn door(id: impl Into<u64>) -> Self {
        Self::new(EntityKind::Door, id)
    }

    pub fn credential(id: impl Into<u64>) -> Self {
        Self::new(EntityKind::Credential, id)
    }

    pub fn credential_type(id: impl Into<u64>) -> Self {
        Self::new(EntityKind::CredentialType, id)
    }

    pub fn employee(id: impl Into<u64>) -> Self {
        Self::new(EntityKind::Employee, id)
    }
}

/// Malformed input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn empty(field: impl Into<String>) -> Self {
        Self::new(field, "must not be empty")
    }

    /// A door-specific credential can only be authorized for a single door
    pub fn door_specific_conflict(credential: u64, existing_door: u64) -> Self {
        Self::new(
            "credential",
            format!(
                "credential {credential} is door-specific and already authorized for door {existing_door}"
            ),
        )
    }

    /// An employee-specific credential type needs an owning employee
    pub fn owner_required(type_name: &str) -> Self {
        Self::new(
            "employee",
            format!("credential type '{type_name}' is employee-specific and requires an owner"),
        )
    }

    pub fn inverted_range() -> Self {
        Self::new("range", "'from' must not be later than 'to'")
    }
}

/// Storage collaborator failures
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Record missing from store: {0}")]
    MissingRecord(NotFoundError),

    #[error("Rejected by store: {0}")]
    Rejected(ValidationError),

    #[error("Inconsistent store state: {0}")]
    Inconsistent(String),
}

impl From<StorageError> for AppError {
    /// Missing records and rejected mutations surface as regular
    /// not-found and validation errors.
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::MissingRecord(missing) => AppError::NotFound(missing),
            StorageError::Rejected(invalid) => AppError::Validation(invalid),
            other => AppError::Storage(other),
        }
    }
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Result type alias for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;
