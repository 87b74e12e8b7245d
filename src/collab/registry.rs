//! Reference-counted checkout of document contexts.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use dealport_collab::{DocumentContext, DocumentStore, RecordId, StoreError};
use std::sync::Arc;
use tracing::debug;

struct Checkout {
    refs: usize,
    context: Arc<dyn DocumentContext>,
}

/// One live context per record for a client session, shared by every
/// acquisition that needs it. The context is closed when the last holder
/// checks it back in.
pub struct ContextRegistry {
    store: Arc<dyn DocumentStore>,
    entries: DashMap<RecordId, Checkout>,
}

impl ContextRegistry {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            entries: DashMap::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Take a reference to the context for `id`, opening it if needed.
    pub async fn checkout(&self, id: &RecordId) -> Result<Arc<dyn DocumentContext>, StoreError> {
        let existing = self.entries.get_mut(id).map(|mut entry| {
            entry.refs += 1;
            Arc::clone(&entry.context)
        });
        if let Some(context) = existing {
            return Ok(context);
        }

        let opened = self.store.open(id).await?;

        // Another checkout may have opened the same record while we awaited.
        match self.entries.entry(id.clone()) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().refs += 1;
                let context = Arc::clone(&entry.get().context);
                drop(entry);
                opened.close();
                Ok(context)
            }
            Entry::Vacant(entry) => {
                debug!(id = %id, "opened document context");
                entry.insert(Checkout {
                    refs: 1,
                    context: Arc::clone(&opened),
                });
                Ok(opened)
            }
        }
    }

    /// Take over a context opened elsewhere (e.g. by record creation).
    ///
    /// If the record is already checked out the new context is closed and the
    /// existing one is returned.
    pub fn adopt(&self, context: Arc<dyn DocumentContext>) -> Arc<dyn DocumentContext> {
        match self.entries.entry(context.id().clone()) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().refs += 1;
                let existing = Arc::clone(&entry.get().context);
                drop(entry);
                if !Arc::ptr_eq(&existing, &context) {
                    context.close();
                }
                existing
            }
            Entry::Vacant(entry) => {
                entry.insert(Checkout {
                    refs: 1,
                    context: Arc::clone(&context),
                });
                context
            }
        }
    }

    /// Give back one reference. Returns the references left.
    pub fn checkin(&self, id: &RecordId) -> usize {
        match self.entries.entry(id.clone()) {
            Entry::Occupied(mut entry) => {
                let checkout = entry.get_mut();
                checkout.refs = checkout.refs.saturating_sub(1);
                if checkout.refs == 0 {
                    let removed = entry.remove();
                    removed.context.close();
                    debug!(id = %id, "closed document context");
                    0
                } else {
                    checkout.refs
                }
            }
            Entry::Vacant(_) => 0,
        }
    }

    /// Take an extra reference to a context that is already checked out.
    ///
    /// The context stays open until the returned hold is dropped, even if
    /// every acquisition that shares it is released first.
    pub fn hold(self: &Arc<Self>, id: &RecordId) -> Option<ContextHold> {
        let context = self.entries.get_mut(id).map(|mut entry| {
            entry.refs += 1;
            Arc::clone(&entry.context)
        })?;
        Some(ContextHold {
            registry: Arc::clone(self),
            context,
        })
    }

    pub fn ref_count(&self, id: &RecordId) -> usize {
        self.entries.get(id).map(|entry| entry.refs).unwrap_or(0)
    }

    /// Number of records with an open context.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A reference on a checked-out context, given back on drop.
pub struct ContextHold {
    registry: Arc<ContextRegistry>,
    context: Arc<dyn DocumentContext>,
}

impl ContextHold {
    pub fn context(&self) -> &Arc<dyn DocumentContext> {
        &self.context
    }
}

impl Drop for ContextHold {
    fn drop(&mut self) {
        self.registry.checkin(self.context.id());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealport_collab::{MemoryBackend, RecordSnapshot};
    use serde_json::Map;

    fn backend_with(ids: &[&str]) -> Arc<MemoryBackend> {
        let backend = MemoryBackend::new();
        for id in ids {
            backend.insert(RecordSnapshot::new(RecordId::from(*id), Map::new()));
        }
        backend
    }

    #[tokio::test]
    async fn overlapping_checkouts_share_one_context() {
        let backend = backend_with(&["a"]);
        let registry = ContextRegistry::new(Arc::new(backend.connect()));
        let id = RecordId::from("a");

        let first = registry.checkout(&id).await.unwrap();
        let second = registry.checkout(&id).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.ref_count(&id), 2);
        assert_eq!(backend.open_contexts(), 1);

        assert_eq!(registry.checkin(&id), 1);
        assert!(!first.is_closed());
        assert_eq!(registry.checkin(&id), 0);
        assert!(first.is_closed());
        assert_eq!(backend.open_contexts(), 0);
        assert!(registry.is_empty());

        // Extra checkins are harmless.
        assert_eq!(registry.checkin(&id), 0);
    }

    #[tokio::test]
    async fn hold_keeps_context_open_past_the_last_checkin() {
        let backend = backend_with(&["a"]);
        let registry = Arc::new(ContextRegistry::new(Arc::new(backend.connect())));
        let id = RecordId::from("a");

        assert!(registry.hold(&id).is_none());
        let context = registry.checkout(&id).await.unwrap();
        let hold = registry.hold(&id).unwrap();
        assert_eq!(registry.ref_count(&id), 2);

        assert_eq!(registry.checkin(&id), 1);
        assert!(!hold.context().is_closed());
        drop(hold);
        assert!(context.is_closed());
        assert_eq!(backend.open_contexts(), 0);
    }

    #[tokio::test]
    async fn failed_open_leaves_no_entry() {
        let backend = backend_with(&[]);
        let registry = ContextRegistry::new(Arc::new(backend.connect()));
        let err = registry.checkout(&RecordId::from("x")).await.err().unwrap();
        assert_eq!(err, StoreError::NotFound(RecordId::from("x")));
        assert_eq!(registry.len(), 0);
    }

    #[tokio::test]
    async fn adopt_registers_created_context() {
        let backend = backend_with(&[]);
        let store = backend.connect();
        let registry = ContextRegistry::new(Arc::new(store.clone()));
        let created = store.create(Map::new()).await.unwrap();
        let id = created.id().clone();

        let adopted = registry.adopt(created);
        assert_eq!(registry.ref_count(&id), 1);
        registry.checkin(&id);
        assert!(adopted.is_closed());
    }
}
