//! Listener registry and event dispatch.
//!
//! The registry owns one ordered subscription list per [`EventKind`].
//! Several listeners may subscribe to the same kind; there is no silent
//! overwrite of an earlier subscription by a later one.
//!
//! # Dispatch Semantics
//!
//! - Listeners for one event run synchronously on the dispatching task,
//!   in registration order.
//! - A panicking listener is isolated; the remaining listeners of the same
//!   dispatch still run.
//! - The subscription table may be mutated from a different thread than the
//!   one dispatching. Dispatch snapshots the listener list before invoking,
//!   so a listener may subscribe or unsubscribe re-entrantly without
//!   deadlocking.

// ============================================================================
// Imports
// ============================================================================

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{trace, warn};

use crate::event::{Event, EventKind};

// ============================================================================
// Types
// ============================================================================

/// Listener callback invoked with the dispatched event.
pub type EventCallback = Arc<dyn Fn(&Event) + Send + Sync>;

/// Map of event kinds to ordered subscription lists.
type SubscriptionTable = FxHashMap<EventKind, Vec<Entry>>;

// ============================================================================
// SubscriptionHandle
// ============================================================================

/// Token identifying one subscription, used for targeted removal.
///
/// Handles are unique across the lifetime of a registry. Removing the same
/// handle twice is a no-op, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    kind: EventKind,
    id: u64,
}

impl SubscriptionHandle {
    /// Returns the event kind this subscription was registered for.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

// ============================================================================
// Entry
// ============================================================================

/// One registered subscription.
struct Entry {
    id: u64,
    callback: EventCallback,
}

// ============================================================================
// ListenerRegistry
// ============================================================================

/// Owns per-event-kind subscriptions and dispatches inbound events.
///
/// # Thread Safety
///
/// `ListenerRegistry` is `Send + Sync`; subscription and dispatch may happen
/// from different threads (transport task vs application).
pub struct ListenerRegistry {
    inner: Mutex<RegistryInner>,
}

struct RegistryInner {
    next_id: u64,
    table: SubscriptionTable,
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ListenerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                next_id: 0,
                table: SubscriptionTable::default(),
            }),
        }
    }

    /// Registers a callback for an event kind.
    ///
    /// Registration never fails. Returns a handle usable for later removal
    /// with [`unsubscribe`](Self::unsubscribe).
    pub fn subscribe(
        &self,
        kind: EventKind,
        callback: impl Fn(&Event) + Send + Sync + 'static,
    ) -> SubscriptionHandle {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;

        inner.table.entry(kind).or_default().push(Entry {
            id,
            callback: Arc::new(callback),
        });

        trace!(%kind, id, "listener subscribed");
        SubscriptionHandle { kind, id }
    }

    /// Removes one subscription by handle.
    ///
    /// Idempotent: removing an already-removed handle is a no-op.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) {
        let mut inner = self.inner.lock();
        if let Some(entries) = inner.table.get_mut(&handle.kind)
            && let Some(pos) = entries.iter().position(|e| e.id == handle.id)
        {
            entries.remove(pos);
            trace!(kind = %handle.kind, id = handle.id, "listener unsubscribed");
        }
    }

    /// Removes subscriptions in bulk.
    ///
    /// With a kind, removes every subscription for that kind; with `None`,
    /// removes every subscription for every kind. Safe to call when no
    /// subscriptions exist.
    pub fn unsubscribe_all(&self, kind: Option<EventKind>) {
        let mut inner = self.inner.lock();
        match kind {
            Some(kind) => {
                inner.table.remove(&kind);
            }
            None => inner.table.clear(),
        }
    }

    /// Returns the number of active subscriptions across all kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().table.values().map(Vec::len).sum()
    }

    /// Returns `true` if no subscriptions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invokes every active subscription for the event's kind, in
    /// registration order.
    ///
    /// Runs synchronously on the calling task. A panicking listener does not
    /// prevent the remaining listeners of this dispatch from running.
    pub fn dispatch(&self, event: &Event) {
        // Snapshot under the lock, invoke outside it, so listeners can
        // mutate the registry re-entrantly.
        let snapshot: Vec<EventCallback> = {
            let inner = self.inner.lock();
            match inner.table.get(&event.kind()) {
                Some(entries) => entries.iter().map(|e| Arc::clone(&e.callback)).collect(),
                None => return,
            }
        };

        trace!(kind = %event.kind(), listeners = snapshot.len(), "dispatching event");

        for callback in snapshot {
            if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                warn!(kind = %event.kind(), "listener panicked during dispatch");
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
