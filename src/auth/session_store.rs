//! Holder of the current `SessionState` with ordered change notification.
//!
//! Listeners run synchronously inside `set`, in registration order, after the
//! state lock has been released. Async consumers can use `watch` instead.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use tokio::sync::watch;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::auth::identity::SessionState;

/// Identifier of a registered listener
pub type SubscriptionId = Uuid;

type Listener = Arc<dyn Fn(&SessionState) + Send + Sync>;

struct StoreInner {
    state: RwLock<SessionState>,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    watch_tx: watch::Sender<SessionState>,
}

impl StoreInner {
    fn remove_listener(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        before != listeners.len()
    }
}

/// Shared session state container. Cloning yields another handle to the same
/// state.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

impl SessionStore {
    /// Create a store in the initial `Restoring` state
    pub fn new() -> Self {
        Self::with_state(SessionState::Restoring)
    }

    pub(crate) fn with_state(state: SessionState) -> Self {
        let (watch_tx, _) = watch::channel(state.clone());
        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(state),
                listeners: Mutex::new(Vec::new()),
                watch_tx,
            }),
        }
    }

    /// Snapshot of the current state
    pub fn get(&self) -> SessionState {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Register a listener called on every state transition.
    ///
    /// The listener stays registered until the returned `Subscription` is
    /// dropped or `unsubscribe`d.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&SessionState) + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));

        debug!(subscription_id = %id, "Registered session listener");

        Subscription {
            id,
            store: Arc::downgrade(&self.inner),
        }
    }

    /// Receiver that always holds the latest state
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.inner.watch_tx.subscribe()
    }

    /// Number of currently registered listeners
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Replace the state and notify every listener in registration order
    pub(crate) fn set(&self, new_state: SessionState) {
        {
            let mut state = self.inner.state.write().unwrap_or_else(PoisonError::into_inner);
            *state = new_state.clone();
        }

        // Snapshot so listeners may subscribe or unsubscribe while being notified
        let listeners: Vec<(SubscriptionId, Listener)> = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        trace!(listeners = listeners.len(), loading = new_state.is_loading(), "Session state changed");

        for (id, listener) in &listeners {
            trace!(subscription_id = %id, "Notifying session listener");
            listener(&new_state);
        }

        self.inner.watch_tx.send_replace(new_state);
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &self.get())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Handle to a registered listener; deregisters on drop
#[must_use = "dropping a Subscription immediately unregisters the listener"]
pub struct Subscription {
    id: SubscriptionId,
    store: Weak<StoreInner>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Remove the listener now. Returns false if it was already gone.
    pub fn unsubscribe(self) -> bool {
        self.remove()
    }

    fn remove(&self) -> bool {
        match self.store.upgrade() {
            Some(inner) => {
                let removed = inner.remove_listener(self.id);
                if removed {
                    debug!(subscription_id = %self.id, "Unregistered session listener");
                }
                removed
            }
            None => false,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.remove();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
