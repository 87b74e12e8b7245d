//! In-memory document service.
//!
//! One [`MemoryBackend`] plays the server; every [`MemoryStore`] obtained from
//! [`MemoryBackend::connect`] is a separate client session. Used by the test
//! suites and the demo binary.

use crate::op::Operation;
use crate::snapshot::RecordSnapshot;
use crate::store::{DocumentContext, DocumentStore, RemoteChange, SessionId, StoreError};
use crate::RecordId;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Capacity of the change fan-out channel.
const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Shared state of the in-memory service.
pub struct MemoryBackend {
    records: DashMap<RecordId, RecordSnapshot>,
    changes: broadcast::Sender<RemoteChange>,
    next_session: AtomicU64,
    /// Contexts opened and not yet closed, across all sessions.
    open_contexts: AtomicUsize,
    /// Total operations accepted.
    accepted_ops: AtomicUsize,
    reachable: AtomicBool,
    reject_submissions: AtomicBool,
    /// Simulated round trip of a submission, in milliseconds.
    submit_latency_ms: AtomicU64,
    submissions_in_flight: AtomicUsize,
    peak_submissions_in_flight: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Arc<Self> {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Arc::new(Self {
            records: DashMap::new(),
            changes,
            next_session: AtomicU64::new(1),
            open_contexts: AtomicUsize::new(0),
            accepted_ops: AtomicUsize::new(0),
            reachable: AtomicBool::new(true),
            reject_submissions: AtomicBool::new(false),
            submit_latency_ms: AtomicU64::new(0),
            submissions_in_flight: AtomicUsize::new(0),
            peak_submissions_in_flight: AtomicUsize::new(0),
        })
    }

    /// Open a new client session.
    pub fn connect(self: &Arc<Self>) -> MemoryStore {
        MemoryStore {
            backend: Arc::clone(self),
            session: SessionId(self.next_session.fetch_add(1, Ordering::Relaxed)),
        }
    }

    /// Insert or replace a record without notifying anyone.
    pub fn insert(&self, snapshot: RecordSnapshot) {
        self.records.insert(snapshot.id.clone(), snapshot);
    }

    pub fn remove(&self, id: &RecordId) -> Option<RecordSnapshot> {
        self.records.remove(id).map(|(_, snapshot)| snapshot)
    }

    pub fn record(&self, id: &RecordId) -> Option<RecordSnapshot> {
        self.records.get(id).map(|r| r.value().clone())
    }

    /// All records, ordered by id.
    pub fn records(&self) -> Vec<RecordSnapshot> {
        let mut all: Vec<RecordSnapshot> = self.records.iter().map(|r| r.value().clone()).collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    pub fn open_contexts(&self) -> usize {
        self.open_contexts.load(Ordering::SeqCst)
    }

    pub fn accepted_operations(&self) -> usize {
        self.accepted_ops.load(Ordering::SeqCst)
    }

    /// Simulate the service going away (or coming back).
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Make every subsequent submission fail.
    pub fn set_reject_submissions(&self, reject: bool) {
        self.reject_submissions.store(reject, Ordering::SeqCst);
    }

    /// Delay every subsequent submission by `latency`.
    pub fn set_submit_latency(&self, latency: Duration) {
        let ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.submit_latency_ms.store(ms, Ordering::SeqCst);
    }

    /// Most submissions ever in flight at the same time.
    pub fn peak_submissions_in_flight(&self) -> usize {
        self.peak_submissions_in_flight.load(Ordering::SeqCst)
    }

    fn begin_submission(self: &Arc<Self>) -> InFlight {
        let now = self.submissions_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_submissions_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlight {
            backend: Arc::clone(self),
        }
    }

    fn ensure_reachable(&self) -> Result<(), StoreError> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unreachable("memory backend offline".to_string()))
        }
    }

    fn apply(&self, origin: SessionId, id: &RecordId, ops: Vec<Operation>) -> Result<(), StoreError> {
        self.ensure_reachable()?;
        if self.reject_submissions.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected {
                id: id.clone(),
                reason: "submissions disabled".to_string(),
            });
        }

        let (snapshot, keys) = {
            let mut record = self
                .records
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound(id.clone()))?;
            let keys = record.apply(&ops)?;
            (record.value().clone(), keys)
        };

        self.accepted_ops.fetch_add(ops.len(), Ordering::SeqCst);

        // No subscribers is not an error.
        let _ = self.changes.send(RemoteChange {
            id: id.clone(),
            origin,
            snapshot,
            ops,
            keys,
        });
        Ok(())
    }
}

struct InFlight {
    backend: Arc<MemoryBackend>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.backend.submissions_in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A client session on a [`MemoryBackend`].
#[derive(Clone)]
pub struct MemoryStore {
    backend: Arc<MemoryBackend>,
    session: SessionId,
}

impl MemoryStore {
    pub fn backend(&self) -> &Arc<MemoryBackend> {
        &self.backend
    }

    fn open_context(&self, id: RecordId) -> Arc<dyn DocumentContext> {
        self.backend.open_contexts.fetch_add(1, Ordering::SeqCst);
        Arc::new(MemoryContext {
            id,
            backend: Arc::clone(&self.backend),
            session: self.session,
            closed: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn session(&self) -> SessionId {
        self.session
    }

    async fn list_ids(&self) -> Result<Vec<RecordId>, StoreError> {
        self.backend.ensure_reachable()?;
        let mut ids: Vec<RecordId> = self.backend.records.iter().map(|r| r.key().clone()).collect();
        ids.sort();
        Ok(ids)
    }

    async fn open(&self, id: &RecordId) -> Result<Arc<dyn DocumentContext>, StoreError> {
        self.backend.ensure_reachable()?;
        if !self.backend.records.contains_key(id) {
            return Err(StoreError::NotFound(id.clone()));
        }
        Ok(self.open_context(id.clone()))
    }

    async fn create(&self, fields: Map<String, Value>) -> Result<Arc<dyn DocumentContext>, StoreError> {
        self.backend.ensure_reachable()?;
        let id = RecordId::generate();
        self.backend.insert(RecordSnapshot::new(id.clone(), fields));
        Ok(self.open_context(id))
    }

    fn subscribe(&self) -> broadcast::Receiver<RemoteChange> {
        self.backend.changes.subscribe()
    }
}

struct MemoryContext {
    id: RecordId,
    backend: Arc<MemoryBackend>,
    session: SessionId,
    closed: AtomicBool,
}

#[async_trait]
impl DocumentContext for MemoryContext {
    fn id(&self) -> &RecordId {
        &self.id
    }

    fn snapshot(&self) -> RecordSnapshot {
        self.backend
            .record(&self.id)
            .unwrap_or_else(|| RecordSnapshot::new(self.id.clone(), Map::new()))
    }

    async fn submit_operations(&self, ops: Vec<Operation>) -> Result<(), StoreError> {
        if self.is_closed() {
            return Err(StoreError::Closed(self.id.clone()));
        }
        let _in_flight = self.backend.begin_submission();
        let latency = self.backend.submit_latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
            if self.is_closed() {
                return Err(StoreError::Closed(self.id.clone()));
            }
        }
        self.backend.apply(self.session, &self.id, ops)
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.backend.open_contexts.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for MemoryContext {
    fn drop(&mut self) {
        self.close();
    }
}
