//! Typed UI event channels.
//!
//! Each event kind declares whether it can be cancelled and whether it
//! propagates to enclosing components. Listeners registered on an
//! [`EventChannel`] get a mutable [`Event`] and may call
//! [`Event::prevent_default`] (ignored for non-cancelable kinds) or
//! [`Event::stop_propagation`] (halts delivery to outer channels).
//!
//! Listeners run synchronously during [`dispatch`]. They must not block and
//! must not re-enter the component that emitted the event; anything more than
//! bookkeeping is handed off through a queue or the debouncer.

use crate::router::RouterState;
use dealport_collab::RecordId;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Static description of an event kind.
pub trait EventKind: Send + 'static {
    const NAME: &'static str;
    const CANCELABLE: bool;
    const BUBBLES: bool;
}

/// An editable field changed because of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditableChange {
    pub item: RecordId,
    pub field: &'static str,
}

impl EventKind for EditableChange {
    const NAME: &'static str = "editable-change";
    const CANCELABLE: bool = false;
    const BUBBLES: bool = true;
}

/// The user picked an in-page navigation target (anchor click).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSelect {
    pub state: RouterState,
}

impl EventKind for StateSelect {
    const NAME: &'static str = "state-select";
    const CANCELABLE: bool = true;
    const BUBBLES: bool = true;
}

/// A form is about to be submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormSubmit;

impl EventKind for FormSubmit {
    const NAME: &'static str = "submit";
    const CANCELABLE: bool = true;
    const BUBBLES: bool = true;
}

/// A dispatched event.
#[derive(Debug, Clone)]
pub struct Event<K: EventKind> {
    pub detail: K,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl<K: EventKind> Event<K> {
    pub fn new(detail: K) -> Self {
        Self {
            detail,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    /// Mark the default action as cancelled. No-op for non-cancelable kinds.
    pub fn prevent_default(&mut self) {
        if K::CANCELABLE {
            self.default_prevented = true;
        }
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

/// Handle returned by [`EventChannel::on`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

impl ListenerId {
    fn next() -> Self {
        Self(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

type Listener<K> = Arc<dyn Fn(&mut Event<K>) + Send + Sync>;

/// Listeners for one event kind on one component.
pub struct EventChannel<K: EventKind> {
    listeners: Vec<(ListenerId, Listener<K>)>,
}

impl<K: EventKind> Default for EventChannel<K> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }
}

impl<K: EventKind> fmt::Debug for EventChannel<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventChannel")
            .field("kind", &K::NAME)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<K: EventKind> EventChannel<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&mut self, listener: F) -> ListenerId
    where
        F: Fn(&mut Event<K>) + Send + Sync + 'static,
    {
        let id = ListenerId::next();
        self.listeners.push((id, Arc::new(listener)));
        id
    }

    /// Unregister a listener. Returns false if it was not registered here.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(l, _)| *l != id);
        before != self.listeners.len()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Deliver `event` to every listener of this channel, in registration order.
    pub fn emit(&self, event: &mut Event<K>) {
        for (_, listener) in &self.listeners {
            listener(event);
        }
    }
}

/// Deliver `event` to `path`, innermost channel first.
///
/// Bubbling kinds continue outward until a listener stops propagation;
/// non-bubbling kinds only reach the first channel.
pub fn dispatch<K: EventKind>(event: &mut Event<K>, path: &[&EventChannel<K>]) {
    for channel in path {
        channel.emit(event);
        if !K::BUBBLES || event.propagation_stopped() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::state_list;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn prevent_default_respects_cancelable() {
        let mut change = Event::new(EditableChange {
            item: RecordId::from("c1"),
            field: "name",
        });
        change.prevent_default();
        assert!(!change.default_prevented());

        let mut select = Event::new(StateSelect {
            state: state_list(&["page", "home", "submit"]),
        });
        select.prevent_default();
        assert!(select.default_prevented());
    }

    #[test]
    fn stop_propagation_halts_bubbling() {
        let outer_hits = Arc::new(AtomicUsize::new(0));
        let mut inner = EventChannel::<StateSelect>::new();
        let mut outer = EventChannel::<StateSelect>::new();
        inner.on(|e| e.stop_propagation());
        let hits = Arc::clone(&outer_hits);
        outer.on(move |_| {
            hits.fetch_add(1, Ordering::SeqCst);
        });

        let mut event = Event::new(StateSelect { state: vec![] });
        dispatch(&mut event, &[&inner, &outer]);
        assert_eq!(outer_hits.load(Ordering::SeqCst), 0);

        let mut event = Event::new(StateSelect { state: vec![] });
        dispatch(&mut event, &[&outer, &outer]);
        assert_eq!(outer_hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn remove_unregisters() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut channel = EventChannel::<FormSubmit>::new();
        let h = Arc::clone(&hits);
        let id = channel.on(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(channel.len(), 1);
        assert!(channel.remove(id));
        assert!(!channel.remove(id));
        channel.emit(&mut Event::new(FormSubmit));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(channel.is_empty());
    }
}
