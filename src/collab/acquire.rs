//! Context acquisition for a set of records.
//!
//! An [`AcquisitionManager`] hands out [`Acquisition`]s: a checked-out context
//! per record plus listeners for remote changes to those records. Only the
//! most recent acquisition is current. Every `acquire` bumps a generation
//! counter; a result that settles after a newer `acquire` (or a `release`)
//! is released on the spot and reported as superseded, never installed.

use super::registry::ContextRegistry;
use crate::error::AcquisitionError;
use crate::metrics;
use crate::telemetry::spans;
use dealport_collab::{DocumentContext, Operation, RecordId, RecordSnapshot};
use futures_util::future::join_all;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn, Instrument};

/// A remote change to an acquired record.
#[derive(Debug, Clone)]
pub struct RemoteUpdate {
    pub id: RecordId,
    /// Record state after the change.
    pub snapshot: RecordSnapshot,
    pub ops: Vec<Operation>,
    /// Top-level fields touched by the change.
    pub keys: Vec<String>,
}

#[derive(Default)]
struct AcquiredSet {
    order: Vec<RecordId>,
    contexts: HashMap<RecordId, Arc<dyn DocumentContext>>,
}

/// Contexts checked out together. Released on drop.
pub struct Acquisition {
    generation: u64,
    registry: Arc<ContextRegistry>,
    acquired: Mutex<AcquiredSet>,
    listeners: Mutex<Vec<JoinHandle<()>>>,
    released: AtomicBool,
}

impl Acquisition {
    fn new(generation: u64, registry: Arc<ContextRegistry>) -> Self {
        Self {
            generation,
            registry,
            acquired: Mutex::new(AcquiredSet::default()),
            listeners: Mutex::new(Vec::new()),
            released: AtomicBool::new(false),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn registry(&self) -> &Arc<ContextRegistry> {
        &self.registry
    }

    pub fn get(&self, id: &RecordId) -> Option<Arc<dyn DocumentContext>> {
        self.acquired.lock().contexts.get(id).cloned()
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.acquired.lock().contexts.contains_key(id)
    }

    /// Acquired ids in acquisition order.
    pub fn ids(&self) -> Vec<RecordId> {
        self.acquired.lock().order.clone()
    }

    pub fn len(&self) -> usize {
        self.acquired.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current snapshots of every acquired record, in acquisition order.
    pub fn all_snapshots(&self) -> Vec<RecordSnapshot> {
        let acquired = self.acquired.lock();
        acquired
            .order
            .iter()
            .filter_map(|id| acquired.contexts.get(id))
            .map(|context| context.snapshot())
            .collect()
    }

    /// Insert a checked-out context. A duplicate gives its reference back.
    fn insert(&self, id: RecordId, context: Arc<dyn DocumentContext>) {
        let mut acquired = self.acquired.lock();
        if acquired.contexts.contains_key(&id) {
            drop(acquired);
            self.registry.checkin(&id);
            return;
        }
        acquired.order.push(id.clone());
        acquired.contexts.insert(id, context);
    }

    /// Add a context opened after acquisition (a newly created record).
    pub fn adopt(&self, context: Arc<dyn DocumentContext>) -> Result<(), AcquisitionError> {
        if self.is_released() {
            context.close();
            return Err(AcquisitionError::Released);
        }
        let id = context.id().clone();
        let context = self.registry.adopt(context);
        self.insert(id, context);
        Ok(())
    }

    /// Call `listener` for every change to an acquired record made by another
    /// session, until this acquisition is released.
    pub fn add_listener<F>(self: &Arc<Self>, listener: F) -> Result<(), AcquisitionError>
    where
        F: Fn(RemoteUpdate) + Send + Sync + 'static,
    {
        if self.is_released() {
            return Err(AcquisitionError::Released);
        }

        let store = self.registry.store();
        let session = store.session();
        let mut changes = store.subscribe();
        let this: Weak<Acquisition> = Arc::downgrade(self);
        let generation = self.generation;

        let handle = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => {
                        if change.origin == session {
                            continue;
                        }
                        let Some(acquisition) = this.upgrade() else {
                            break;
                        };
                        if acquisition.is_released() {
                            break;
                        }
                        if !acquisition.contains(&change.id) {
                            continue;
                        }
                        drop(acquisition);
                        listener(RemoteUpdate {
                            id: change.id,
                            snapshot: change.snapshot,
                            ops: change.ops,
                            keys: change.keys,
                        });
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(generation, skipped, "remote change listener lagged; updates dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        self.listeners.lock().push(handle);
        Ok(())
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// Stop listeners and give every context back. Idempotent.
    pub fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        for handle in self.listeners.lock().drain(..) {
            handle.abort();
        }
        let acquired = std::mem::take(&mut *self.acquired.lock());
        for id in &acquired.order {
            self.registry.checkin(id);
        }
        debug!(generation = self.generation, records = acquired.order.len(), "released acquisition");
    }
}

impl Drop for Acquisition {
    fn drop(&mut self) {
        self.release();
    }
}

/// Hands out acquisitions; tracks the current one.
pub struct AcquisitionManager {
    registry: Arc<ContextRegistry>,
    generation: AtomicU64,
    current: Mutex<Option<Arc<Acquisition>>>,
}

impl AcquisitionManager {
    pub fn new(registry: Arc<ContextRegistry>) -> Self {
        Self {
            registry,
            generation: AtomicU64::new(0),
            current: Mutex::new(None),
        }
    }

    pub fn registry(&self) -> &Arc<ContextRegistry> {
        &self.registry
    }

    /// Acquire contexts for `ids`, or for every record when `None`.
    ///
    /// The generation is taken when this is called, not when the future is
    /// first polled. On success the result becomes current and the previous
    /// acquisition is released. Fails with [`AcquisitionError::Superseded`] if
    /// another `acquire` or a `release` was issued while this one was in flight.
    pub fn acquire(
        &self,
        ids: Option<Vec<RecordId>>,
    ) -> impl Future<Output = Result<Arc<Acquisition>, AcquisitionError>> + Send + '_ {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let scope = if ids.is_some() { "ids" } else { "all" };

        async move {
            let result = self
                .acquire_generation(generation, ids)
                .instrument(spans::acquire(generation, scope))
                .await;

            match &result {
                Ok(acquisition) => {
                    metrics::record_acquisition("ok");
                    info!(generation, records = acquisition.len(), "acquired contexts");
                }
                Err(e) => {
                    metrics::record_acquisition(e.error_code());
                    warn!(generation, error = %e, "context acquisition failed");
                }
            }
            result
        }
    }

    async fn acquire_generation(
        &self,
        generation: u64,
        ids: Option<Vec<RecordId>>,
    ) -> Result<Arc<Acquisition>, AcquisitionError> {
        let mut ids = match ids {
            Some(ids) => ids,
            None => self.registry.store().list_ids().await?,
        };
        let mut seen = HashSet::new();
        ids.retain(|id| seen.insert(id.clone()));

        let acquisition = Arc::new(Acquisition::new(generation, Arc::clone(&self.registry)));
        let results = join_all(ids.iter().map(|id| self.registry.checkout(id))).await;

        let mut first_error = None;
        for (id, result) in ids.into_iter().zip(results) {
            match result {
                Ok(context) => acquisition.insert(id, context),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_error {
            acquisition.release();
            return Err(e.into());
        }

        let previous = {
            let mut current = self.current.lock();
            if self.generation.load(Ordering::SeqCst) != generation {
                None
            } else {
                Some(current.replace(Arc::clone(&acquisition)))
            }
        };

        match previous {
            None => {
                acquisition.release();
                Err(AcquisitionError::Superseded { generation })
            }
            Some(previous) => {
                if let Some(previous) = previous {
                    previous.release();
                }
                Ok(acquisition)
            }
        }
    }

    /// The most recently installed acquisition, unless released.
    pub fn current(&self) -> Option<Arc<Acquisition>> {
        self.current.lock().clone()
    }

    /// Release the current acquisition and invalidate any in flight.
    pub fn release(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let current = self.current.lock().take();
        if let Some(acquisition) = current {
            acquisition.release();
        }
    }
}
