//! The collaborative document service contract.
//!
//! A [`DocumentStore`] is one client session's connection to the service. It
//! opens [`DocumentContext`]s (live editing sessions for one record) and
//! broadcasts every accepted change as a [`RemoteChange`].

use crate::op::{OpError, Operation};
use crate::snapshot::RecordSnapshot;
use crate::RecordId;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

/// Identifies the client session a change originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Errors reported by the document service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("document store unreachable: {0}")]
    Unreachable(String),

    #[error("record not found: {0}")]
    NotFound(RecordId),

    #[error("context for {0} is closed")]
    Closed(RecordId),

    #[error("operations on {id} rejected: {reason}")]
    Rejected { id: RecordId, reason: String },

    #[error("invalid operation: {0}")]
    InvalidOperation(#[from] OpError),
}

impl StoreError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unreachable(_) => "unreachable",
            Self::NotFound(_) => "not_found",
            Self::Closed(_) => "closed",
            Self::Rejected { .. } => "rejected",
            Self::InvalidOperation(_) => "invalid_operation",
        }
    }
}

/// A change accepted by the service, as seen by every connected session.
#[derive(Debug, Clone)]
pub struct RemoteChange {
    pub id: RecordId,
    /// Session that submitted the change.
    pub origin: SessionId,
    /// Snapshot after the change was applied.
    pub snapshot: RecordSnapshot,
    pub ops: Vec<Operation>,
    /// Top-level keys touched by `ops`, in order.
    pub keys: Vec<String>,
}

/// A live editing session for one record.
#[async_trait]
pub trait DocumentContext: Send + Sync {
    fn id(&self) -> &RecordId;

    /// Current local view of the record.
    fn snapshot(&self) -> RecordSnapshot;

    /// Submit an operation list; applied atomically.
    async fn submit_operations(&self, ops: Vec<Operation>) -> Result<(), StoreError>;

    /// Drop the session. Idempotent.
    fn close(&self);

    fn is_closed(&self) -> bool;
}

/// One client session's connection to the document service.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    fn session(&self) -> SessionId;

    /// Ids of every record in the collection, in ascending order.
    async fn list_ids(&self) -> Result<Vec<RecordId>, StoreError>;

    async fn open(&self, id: &RecordId) -> Result<Arc<dyn DocumentContext>, StoreError>;

    /// Create a record with the given fields and open a context for it.
    async fn create(&self, fields: Map<String, Value>) -> Result<Arc<dyn DocumentContext>, StoreError>;

    /// Receive every change accepted by the service from now on.
    fn subscribe(&self) -> broadcast::Receiver<RemoteChange>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(StoreError::Unreachable("x".into()).error_code(), "unreachable");
        assert_eq!(StoreError::NotFound(RecordId::from("a")).error_code(), "not_found");
        assert_eq!(
            StoreError::Rejected {
                id: RecordId::from("a"),
                reason: "nope".into()
            }
            .error_code(),
            "rejected"
        );
    }

    #[test]
    fn session_display() {
        assert_eq!(SessionId(7).to_string(), "session-7");
    }
}
