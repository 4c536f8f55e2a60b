//! Door Access Authorization & Audit Engine
//!
//! Decides whether a set of presented credentials opens a door, records
//! every attempt in an append-only audit trail, and flags suspicious failed
//! attempts in the recorded history.
//!
//! ## Components
//!
//! ```text
//! model → storage → policy → authorization → audit → detection
//!                      └────────── service ──────────┘
//! ```
//!
//! - [`model`]: doors, credentials, credential types, employees, attempts
//! - [`storage`]: the [`SecurityStore`](storage::SecurityStore) collaborator
//!   and its memory and file implementations
//! - [`policy`]: per-door required types and authorized credentials,
//!   grant/revoke
//! - [`authorization`]: evaluates a presentation against a door's policy
//! - [`audit`]: logs attempts and answers activity queries
//! - [`detection`]: finds failures not resolved by a timely success
//! - [`service`]: facade tying the components together
//!
//! ## Authorization rule
//!
//! A presentation opens a door when every credential type the door requires
//! is covered by some presented credential, and every presented credential
//! is individually authorized for the door.
//!
//! ## Example Configuration
//!
//! ```toml
//! [storage]
//! backend = "file"
//! path = "/var/lib/doorkeeper/store.json"
//!
//! [detection]
//! resolution_window_secs = 120    # failures resolved later than this are suspicious
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```

pub mod audit;
pub mod authorization;
pub mod config;
pub mod detection;
pub mod error;
pub mod model;
pub mod policy;
pub mod service;
pub mod storage;

// Re-export main types
pub use config::{AppConfig, load_config};
pub use error::{AppError, Result};
pub use service::{AccessOutcome, SecurityService};
pub use storage::{FileStore, MemoryStore, SecurityStore, SharedStore};

use crate::config::{StorageBackend, StorageConfig};
use std::sync::Arc;

/// Open the store selected by the storage configuration
pub fn open_store(config: &StorageConfig) -> Result<SharedStore> {
    let store: SharedStore = match config.backend {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::File => Arc::new(FileStore::open(&config.path)?),
    };
    Ok(store)
}
