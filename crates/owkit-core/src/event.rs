//! Single-topic listener registry
//!
//! [`SingleEvent`] keeps listeners keyed by a [`ListenerRef`] so an owner can
//! unregister without holding on to the closure it registered. The same
//! per-topic registry backs every topic of [`crate::EventEmitter`].
//!
//! Delivery semantics shared by both types:
//! - listeners run synchronously, in registration order
//! - re-registering an existing reference replaces its listener in place
//! - the listener list is snapshotted before delivery, so listeners may add or
//!   remove listeners (including themselves) without deadlocking
//! - a panicking listener is logged and skipped; the rest still run

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

static NEXT_LISTENER_REF: AtomicU64 = AtomicU64::new(1);

/// Opaque identity used to register and later remove listeners.
///
/// One reference can be shared by many registrations (for example every
/// listener an object installs), enabling bulk removal by owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerRef(u64);

impl ListenerRef {
    /// Allocate a new process-unique reference.
    pub fn new() -> Self {
        Self(NEXT_LISTENER_REF.fetch_add(1, Ordering::Relaxed))
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl Default for ListenerRef {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ListenerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// Closure type for event listeners.
pub type Listener<T> = dyn Fn(&T) + Send + Sync;

struct Entry<T> {
    reference: ListenerRef,
    listener: Arc<Listener<T>>,
    once: bool,
}

/// Listener list for one topic. Not synchronized; owners wrap it in a lock.
pub(crate) struct Channel<T> {
    entries: Vec<Entry<T>>,
}

impl<T> Channel<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub(crate) fn insert(&mut self, reference: ListenerRef, listener: Arc<Listener<T>>, once: bool) {
        match self.entries.iter_mut().find(|e| e.reference == reference) {
            Some(entry) => {
                entry.listener = listener;
                entry.once = once;
            }
            None => self.entries.push(Entry {
                reference,
                listener,
                once,
            }),
        }
    }

    pub(crate) fn remove(&mut self, reference: ListenerRef) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.reference != reference);
        self.entries.len() != before
    }

    pub(crate) fn contains(&self, reference: ListenerRef) -> bool {
        self.entries.iter().any(|e| e.reference == reference)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot the listeners for one delivery round.
    ///
    /// One-shot entries are unregistered as part of the snapshot.
    pub(crate) fn take_round(&mut self) -> Vec<Arc<Listener<T>>> {
        let round = self
            .entries
            .iter()
            .map(|e| Arc::clone(&e.listener))
            .collect();
        self.entries.retain(|e| !e.once);
        round
    }
}

/// Invoke every listener of a round, isolating panics.
pub(crate) fn deliver<T>(round: Vec<Arc<Listener<T>>>, value: &T, topic: &dyn fmt::Debug) {
    for listener in round {
        if catch_unwind(AssertUnwindSafe(|| listener(value))).is_err() {
            tracing::error!(
                "listener for {:?} panicked; delivering to the remaining listeners",
                topic
            );
        }
    }
}

/// Lock a registry mutex, recovering from poisoning.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Single-topic event with identity-keyed listeners.
pub struct SingleEvent<T> {
    channel: Mutex<Channel<T>>,
}

impl<T> SingleEvent<T> {
    pub fn new() -> Self {
        Self {
            channel: Mutex::new(Channel::new()),
        }
    }

    /// Register a listener under a fresh reference and return it.
    pub fn add_listener(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> ListenerRef {
        let reference = ListenerRef::new();
        self.add_listener_with_ref(listener, reference);
        reference
    }

    /// Register a listener under `reference`, replacing any listener it already owns.
    pub fn add_listener_with_ref(
        &self,
        listener: impl Fn(&T) + Send + Sync + 'static,
        reference: ListenerRef,
    ) {
        lock(&self.channel).insert(reference, Arc::new(listener), false);
    }

    /// Remove the listener owned by `reference`. Unknown references are ignored.
    pub fn remove_listener(&self, reference: ListenerRef) {
        lock(&self.channel).remove(reference);
    }

    pub fn has_listener(&self, reference: ListenerRef) -> bool {
        lock(&self.channel).contains(reference)
    }

    /// Deliver `value` to every registered listener.
    pub fn fire(&self, value: &T) {
        let round = {
            let mut channel = lock(&self.channel);
            if channel.is_empty() {
                return;
            }
            channel.take_round()
        };
        deliver(round, value, &"single event");
    }

    pub fn len(&self) -> usize {
        lock(&self.channel).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.channel).is_empty()
    }
}

impl<T> Default for SingleEvent<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SingleEvent<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleEvent")
            .field("listeners", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn recorder() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[test]
    fn test_listener_refs_are_unique() {
        let a = ListenerRef::new();
        let b = ListenerRef::new();
        assert_ne!(a, b);
        assert!(b.id() > a.id());
    }

    #[test]
    fn test_fire_delivers_in_registration_order() {
        let event = SingleEvent::<u32>::new();
        let log = recorder();
        let sink = log.clone();

        let first = sink.clone();
        event.add_listener(move |v| first.lock().unwrap().push(format!("first:{v}")));
        let second = sink.clone();
        event.add_listener(move |v| second.lock().unwrap().push(format!("second:{v}")));

        event.fire(&7);
        assert_eq!(*log.lock().unwrap(), vec!["first:7", "second:7"]);
    }

    #[test]
    fn test_same_ref_replaces_listener_in_place() {
        let event = SingleEvent::<()>::new();
        let log = recorder();
        let sink = log.clone();
        let owner = ListenerRef::new();

        let a = sink.clone();
        event.add_listener_with_ref(move |_| a.lock().unwrap().push("a".into()), owner);
        let b = sink.clone();
        event.add_listener(move |_| b.lock().unwrap().push("b".into()));
        let c = sink.clone();
        event.add_listener_with_ref(move |_| c.lock().unwrap().push("c".into()), owner);

        event.fire(&());
        assert_eq!(event.len(), 2);
        assert_eq!(*log.lock().unwrap(), vec!["c", "b"]);
    }

    #[test]
    fn test_remove_unknown_ref_is_noop() {
        let event = SingleEvent::<u8>::new();
        event.add_listener(|_| {});
        event.remove_listener(ListenerRef::new());
        assert_eq!(event.len(), 1);
    }

    #[test]
    fn test_remove_listener_stops_delivery() {
        let event = SingleEvent::<u8>::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let reference = event.add_listener(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        event.fire(&1);
        event.remove_listener(reference);
        event.fire(&2);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(event.is_empty());
        assert!(!event.has_listener(reference));
    }

    #[test]
    fn test_fire_without_listeners_is_noop() {
        let event = SingleEvent::<String>::new();
        event.fire(&"nobody".to_string());
        assert!(event.is_empty());
    }

    #[test]
    fn test_panicking_listener_does_not_block_others() {
        let event = SingleEvent::<u8>::new();
        let count = Arc::new(AtomicUsize::new(0));

        event.add_listener(|_| panic!("listener bug"));
        let c = count.clone();
        event.add_listener(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        event.fire(&1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_can_remove_itself_during_fire() {
        let event = Arc::new(SingleEvent::<u8>::new());
        let count = Arc::new(AtomicUsize::new(0));
        let reference = ListenerRef::new();

        let weak = Arc::downgrade(&event);
        let c = count.clone();
        event.add_listener_with_ref(
            move |_| {
                c.fetch_add(1, Ordering::SeqCst);
                if let Some(event) = weak.upgrade() {
                    event.remove_listener(reference);
                }
            },
            reference,
        );

        event.fire(&1);
        event.fire(&2);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
