//! Listener registries and scoped subscriptions.
//!
//! A [`Subscription`] is the only handle that can detach a listener. It
//! detaches exactly once, either through [`Subscription::unsubscribe`] or
//! when it is dropped, so a consumer cannot leak a registration past its
//! own lifetime.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, Weak};

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Registry<T> {
    next_id: u64,
    listeners: BTreeMap<u64, Listener<T>>,
}

/// Ordered set of callbacks notified with every emitted value
pub struct ListenerSet<T> {
    registry: Arc<Mutex<Registry<T>>>,
}

impl<T: 'static> ListenerSet<T> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                listeners: BTreeMap::new(),
            })),
        }
    }

    /// Register a listener. It stays registered until the returned
    /// subscription is dropped or unsubscribed.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = match self.registry.lock() {
            Ok(mut registry) => {
                let id = registry.next_id;
                registry.next_id += 1;
                registry.listeners.insert(id, Arc::new(listener));
                id
            }
            Err(_) => return Subscription::detached(),
        };

        let weak: Weak<Mutex<Registry<T>>> = Arc::downgrade(&self.registry);
        Subscription::new(move || {
            if let Some(registry) = weak.upgrade() {
                if let Ok(mut registry) = registry.lock() {
                    registry.listeners.remove(&id);
                }
            }
        })
    }

    /// Notify every listener in registration order.
    ///
    /// Listeners are snapshotted first, so a listener may drop its own (or
    /// another) subscription while being notified.
    pub fn emit(&self, value: &T) {
        let snapshot: Vec<Listener<T>> = match self.registry.lock() {
            Ok(registry) => registry.listeners.values().cloned().collect(),
            Err(_) => return,
        };
        for listener in snapshot {
            listener(value);
        }
    }

    pub fn len(&self) -> usize {
        self.registry
            .lock()
            .map(|registry| registry.listeners.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: 'static> Default for ListenerSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped registration returned by every `subscribe` in the crate
#[must_use = "dropping a Subscription immediately unsubscribes"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    fn new<F: FnOnce() + Send + 'static>(cancel: F) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    fn detached() -> Self {
        Self { cancel: None }
    }

    /// Stop receiving updates
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Single-writer value shared with readers such as the render loop
#[derive(Debug)]
pub struct SharedValue<T> {
    inner: Arc<Mutex<T>>,
}

impl<T: Clone> SharedValue<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(value)),
        }
    }

    pub fn get(&self) -> Option<T> {
        self.inner.lock().ok().map(|value| value.clone())
    }

    pub fn set(&self, value: T) {
        if let Ok(mut guard) = self.inner.lock() {
            *guard = value;
        }
    }
}

impl<T> Clone for SharedValue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
