//! Collaborative record model for DealPort.
//!
//! This crate describes the data that flows between the page controllers and
//! the collaborative document service: record identifiers, record snapshots,
//! field-level operations and the store/context contract the service offers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐     ┌─────────────────────┐
//! │   PageController    │     │  ChangeFlusher      │
//! │   (acquire/release) │     │  (operation lists)  │
//! └──────────┬──────────┘     └──────────┬──────────┘
//!            │                           │
//!            ▼                           ▼
//! ┌──────────────────────────────────────────────────┐
//! │          Document store contract (this crate)    │
//! │  ┌────────────────┐  ┌────────────────────────┐  │
//! │  │ DocumentStore  │  │  DocumentContext       │  │
//! │  │ open/create    │  │  snapshot/submit/close │  │
//! │  └────────────────┘  └────────────────────────┘  │
//! └──────────────────────────────────────────────────┘
//!            │                           │
//!            ▼                           ▼
//! ┌──────────────────────────────────────────────────┐
//! │   Transport (opaque; `memory` for tests/demo)    │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! Operations follow the json0 shape (`p`, `od`, `oi`) so that an operation
//! list can be handed to a real OT service unchanged.

pub mod memory;
pub mod op;
pub mod snapshot;
pub mod store;

pub use memory::{MemoryBackend, MemoryStore};
pub use op::{placeholder_old_value, OpError, Operation};
pub use snapshot::RecordSnapshot;
pub use store::{DocumentContext, DocumentStore, RemoteChange, SessionId, StoreError};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a collaboratively edited record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}
