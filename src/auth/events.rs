//! Session-change notifications
//!
//! Observers register a callback with [`ListenerRegistry::subscribe`] and get
//! back a [`Subscription`]. Dropping the subscription removes the callback,
//! so teardown is deterministic and tied to the owner's lifetime.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::mpsc;

use crate::session::Session;

/// A change in authentication state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// Bootstrap finished; carries the restored session, if any.
    InitialSession(Option<Session>),
    /// A user signed in (or sign-up issued a session immediately).
    SignedIn(Session),
    /// The session ended, explicitly or because the backend invalidated it.
    SignedOut,
    /// The access token was exchanged for a fresh one.
    TokenRefreshed(Session),
}

impl AuthEvent {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::InitialSession(_) => "INITIAL_SESSION",
            Self::SignedIn(_) => "SIGNED_IN",
            Self::SignedOut => "SIGNED_OUT",
            Self::TokenRefreshed(_) => "TOKEN_REFRESHED",
        }
    }
}

type Listener = Arc<dyn Fn(&AuthEvent) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: BTreeMap<u64, Listener>,
}

/// Registry of auth-event observers.
#[derive(Default, Clone)]
pub struct ListenerRegistry {
    inner: Arc<Mutex<Listeners>>,
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

impl ListenerRegistry {
    /// Registers `listener` and returns the handle that keeps it alive.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&AuthEvent) + Send + Sync + 'static,
    {
        let id = match self.inner.lock() {
            Ok(mut listeners) => {
                let id = listeners.next_id;
                listeners.next_id += 1;
                listeners.entries.insert(id, Arc::new(listener));
                id
            }
            Err(_) => {
                tracing::error!("Listener registry lock poisoned; subscription is inert");
                u64::MAX
            }
        };
        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Registers a listener that forwards every event into a channel.
    ///
    /// Useful for async consumers that process events in their own loop.
    pub fn subscribe_channel(&self) -> (Subscription, mpsc::UnboundedReceiver<AuthEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.subscribe(move |event| {
            // The receiver going away just means nobody is listening anymore.
            let _ = tx.send(event.clone());
        });
        (subscription, rx)
    }

    /// Calls every registered listener with `event`.
    ///
    /// Listeners are invoked outside the registry lock, so a listener may
    /// drop its own subscription while being notified.
    pub fn notify(&self, event: &AuthEvent) {
        let listeners: Vec<Listener> = match self.inner.lock() {
            Ok(listeners) => listeners.entries.values().cloned().collect(),
            Err(_) => {
                tracing::error!("Listener registry lock poisoned; dropping {}", event.name());
                return;
            }
        };
        tracing::debug!(event = event.name(), listeners = listeners.len(), "Auth state changed");
        for listener in listeners {
            listener(event);
        }
    }

    /// Number of live listeners.
    pub fn len(&self) -> usize {
        self.inner.lock().map(|l| l.entries.len()).unwrap_or(0)
    }

    /// Returns `true` when no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle to a registered listener; dropping it unsubscribes.
#[must_use = "dropping a Subscription immediately unsubscribes the listener"]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Listeners>>,
}

impl Subscription {
    /// Explicitly removes the listener.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.registry.upgrade() {
            if let Ok(mut listeners) = inner.lock() {
                listeners.entries.remove(&self.id);
            }
        }
    }
}
