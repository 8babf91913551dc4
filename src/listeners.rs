//! Broadcast listener registry backing every notification in the crate.
//!
//! `Listeners` stores callbacks keyed by a [`ListenerId`]. Registration hands
//! back a [`Subscription`] guard; dropping the guard removes the callback, so
//! a listener can never outlive the scope that registered it. Cancellation is
//! idempotent and safe to perform from inside a callback.

use std::{
    fmt,
    sync::{
        Arc,
        Weak,
        atomic::{AtomicU64, Ordering},
    },
};

use dashmap::DashMap;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Identifier assigned to a registered listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Return the inner `u64` representation.
    #[must_use]
    pub fn as_u64(&self) -> u64 { self.0 }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ListenerId({})", self.0)
    }
}

struct Registry<T> {
    next_id: AtomicU64,
    callbacks: DashMap<ListenerId, Callback<T>>,
}

/// Concurrent broadcast list of callbacks receiving `&T`.
///
/// # Examples
///
/// ```
/// use std::sync::{
///     Arc,
///     atomic::{AtomicUsize, Ordering},
/// };
///
/// use bytesio::listeners::Listeners;
///
/// let listeners = Listeners::<u32>::new();
/// let seen = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&seen);
/// let subscription = listeners.subscribe(move |value| {
///     counter.fetch_add(*value as usize, Ordering::SeqCst);
/// });
///
/// listeners.emit(&2);
/// drop(subscription);
/// listeners.emit(&5);
/// assert_eq!(seen.load(Ordering::SeqCst), 2);
/// ```
pub struct Listeners<T> {
    inner: Arc<Registry<T>>,
}

impl<T> Default for Listeners<T> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Registry {
                next_id: AtomicU64::new(1),
                callbacks: DashMap::new(),
            }),
        }
    }
}

impl<T: 'static> fmt::Debug for Listeners<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl<T: 'static> Listeners<T> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Register `callback` and return the guard that keeps it registered.
    #[must_use = "dropping the subscription immediately removes the listener"]
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.callbacks.insert(id, Arc::new(callback));
        let registry: Weak<Registry<T>> = Arc::downgrade(&self.inner);
        Subscription {
            id,
            remove: Some(Box::new(move |id| {
                if let Some(registry) = registry.upgrade() {
                    registry.callbacks.remove(&id);
                }
            })),
        }
    }

    /// Deliver `event` to every listener registered at the time of the call,
    /// in registration order.
    ///
    /// Callbacks are snapshotted before invocation so listeners may cancel
    /// subscriptions, including their own, while being notified. A listener
    /// removed during this emission may still observe the current event.
    pub fn emit(&self, event: &T) {
        let mut snapshot: Vec<(ListenerId, Callback<T>)> = self
            .inner
            .callbacks
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();
        snapshot.sort_unstable_by_key(|(id, _)| *id);
        for (_, callback) in snapshot {
            callback(event);
        }
    }

    /// Number of live registrations.
    #[must_use]
    pub fn len(&self) -> usize { self.inner.callbacks.len() }

    /// Whether no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.inner.callbacks.is_empty() }

    /// Whether the listener identified by `id` is still registered.
    #[must_use]
    pub fn contains(&self, id: ListenerId) -> bool { self.inner.callbacks.contains_key(&id) }
}

/// Guard keeping a listener registered until dropped or cancelled.
#[must_use = "dropping the subscription immediately removes the listener"]
pub struct Subscription {
    id: ListenerId,
    remove: Option<Box<dyn FnOnce(ListenerId) + Send + Sync>>,
}

impl Subscription {
    /// Identifier of the registered listener.
    #[must_use]
    pub fn id(&self) -> ListenerId { self.id }

    /// Remove the listener now. Subsequent calls are no-ops.
    pub fn cancel(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove(self.id);
        }
    }

    /// Whether [`cancel`](Self::cancel) has already run.
    #[must_use]
    pub fn is_cancelled(&self) -> bool { self.remove.is_none() }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) { self.cancel(); }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    #[allow(
        unused_braces,
        reason = "Clippy is wrong here; this is not a redundant block"
    )]
    fn listeners() -> Listeners<u8> { Listeners::new() }

    #[rstest]
    fn emit_reaches_every_subscriber(listeners: Listeners<u8>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let a = Arc::clone(&hits);
        let b = Arc::clone(&hits);
        let _first = listeners.subscribe(move |_| {
            a.fetch_add(1, Ordering::SeqCst);
        });
        let _second = listeners.subscribe(move |_| {
            b.fetch_add(1, Ordering::SeqCst);
        });

        listeners.emit(&1);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(listeners.len(), 2);
    }

    #[rstest]
    fn dropping_subscription_deregisters(listeners: Listeners<u8>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let subscription = listeners.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        drop(subscription);

        listeners.emit(&1);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(listeners.is_empty());
    }

    #[rstest]
    fn cancel_is_idempotent(listeners: Listeners<u8>) {
        let mut subscription = listeners.subscribe(|_| {});
        let id = subscription.id();
        assert!(listeners.contains(id));

        subscription.cancel();
        subscription.cancel();
        assert!(subscription.is_cancelled());
        assert!(!listeners.contains(id));
        drop(subscription);
        assert!(listeners.is_empty());
    }

    #[rstest]
    fn listener_can_cancel_itself_during_emit(listeners: Listeners<u8>) {
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let hits = Arc::new(AtomicUsize::new(0));
        let own = Arc::clone(&slot);
        let counter = Arc::clone(&hits);
        let subscription = listeners.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            if let Some(mut sub) = own.lock().expect("lock").take() {
                sub.cancel();
            }
        });
        *slot.lock().expect("lock") = Some(subscription);

        listeners.emit(&1);
        listeners.emit(&2);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(listeners.is_empty());
    }

    #[test]
    fn subscription_outliving_registry_drops_cleanly() {
        let listeners = Listeners::<u8>::new();
        let subscription = listeners.subscribe(|_| {});
        drop(listeners);
        drop(subscription);
    }

    #[rstest]
    fn emit_follows_registration_order(listeners: Listeners<u8>) {
        let order = Arc::new(Mutex::new(Vec::new()));
        let subscriptions: Vec<Subscription> = (0..8_u8)
            .map(|n| {
                let order = Arc::clone(&order);
                listeners.subscribe(move |_| order.lock().expect("lock").push(n))
            })
            .collect();

        listeners.emit(&0);
        assert_eq!(*order.lock().expect("lock"), (0..8).collect::<Vec<u8>>());
        drop(subscriptions);
    }

    #[test]
    fn debug_reports_live_registrations() {
        let listeners = Listeners::<String>::new();
        let _subscription = listeners.subscribe(|_| {});
        assert_eq!(format!("{listeners:?}"), "Listeners { len: 1, .. }");
    }

    #[rstest]
    fn identifiers_are_unique(listeners: Listeners<u8>) {
        let first = listeners.subscribe(|_| {});
        let second = listeners.subscribe(|_| {});
        assert_ne!(first.id(), second.id());
    }
}
