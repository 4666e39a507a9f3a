//! Typed multi-topic event emitter
//!
//! Each topic owns its own listener list, so `has_listener` and `emit` only
//! touch the listeners of the topic involved. Telemetry adapters emit on a
//! path topic, a category topic and a wildcard topic for every changed field,
//! which makes that separation matter.
//!
//! The topic key type `K` is generic: string topics for state stores, enums
//! for trackers whose topic set is fixed. The payload type `T` is checked at
//! compile time for every listener.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use crate::event::{deliver, lock, Channel, Listener, ListenerRef};

/// A set of topic listeners registered together under one reference.
pub struct ListenerBundle<T, K = String> {
    entries: Vec<(K, Arc<Listener<T>>)>,
}

impl<T, K> ListenerBundle<T, K> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add a listener for `topic` to the bundle.
    pub fn with(mut self, topic: K, listener: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.entries.push((topic, Arc::new(listener)));
        self
    }

    pub fn topics(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(topic, _)| topic)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T, K> Default for ListenerBundle<T, K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry of named topics, each with identity-keyed listeners.
///
/// Every topic of one emitter carries the same payload type `T`. Owners whose
/// topics need different shapes pick an enum payload with one variant per
/// topic, or emit `serde_json::Value` and let the subscriber decode it into
/// the type it expects. Either way a mismatch shows up when a listener
/// inspects the payload, not when it subscribes.
pub struct EventEmitter<T, K = String> {
    topics: Mutex<HashMap<K, Channel<T>>>,
}

impl<T, K> EventEmitter<T, K>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    pub fn new() -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
        }
    }

    /// True iff at least one listener is registered for `topic`.
    pub fn has_listener<Q>(&self, topic: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        lock(&self.topics)
            .get(topic)
            .is_some_and(|channel| !channel.is_empty())
    }

    /// Deliver `value` to every listener of `topic`.
    pub fn emit<Q>(&self, topic: &Q, value: &T)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + fmt::Debug + ?Sized,
    {
        let round = {
            let mut topics = lock(&self.topics);
            let Some(channel) = topics.get_mut(topic) else {
                return;
            };
            let round = channel.take_round();
            if channel.is_empty() {
                topics.remove(topic);
            }
            round
        };
        deliver(round, value, &topic);
    }

    /// Register a listener for `topic` under a fresh reference.
    pub fn add_listener(
        &self,
        topic: K,
        listener: impl Fn(&T) + Send + Sync + 'static,
    ) -> ListenerRef {
        let reference = ListenerRef::new();
        self.add_listener_with_ref(topic, listener, reference);
        reference
    }

    /// Register a listener for `topic` under `reference`, replacing any
    /// listener that reference already owns on that topic.
    pub fn add_listener_with_ref(
        &self,
        topic: K,
        listener: impl Fn(&T) + Send + Sync + 'static,
        reference: ListenerRef,
    ) {
        self.insert(topic, Arc::new(listener), reference, false);
    }

    /// Register a listener that is removed right before its first delivery.
    pub fn once(
        &self,
        topic: K,
        listener: impl Fn(&T) + Send + Sync + 'static,
        reference: ListenerRef,
    ) {
        self.insert(topic, Arc::new(listener), reference, true);
    }

    /// Remove `reference`'s listener from `topic`. Unknown pairs are ignored.
    pub fn remove_listener<Q>(&self, topic: &Q, reference: ListenerRef)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut topics = lock(&self.topics);
        Self::remove_from(&mut topics, topic, reference);
    }

    /// Register every listener of `bundle` under one shared reference.
    pub fn on(&self, bundle: ListenerBundle<T, K>, reference: ListenerRef) {
        let mut topics = lock(&self.topics);
        for (topic, listener) in bundle.entries {
            topics
                .entry(topic)
                .or_insert_with(Channel::new)
                .insert(reference, listener, false);
        }
    }

    /// Remove `reference`'s listener from each named topic.
    pub fn off<'a, Q, I>(&self, topics: I, reference: ListenerRef)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized + 'a,
        I: IntoIterator<Item = &'a Q>,
    {
        let mut registry = lock(&self.topics);
        for topic in topics {
            Self::remove_from(&mut registry, topic, reference);
        }
    }

    /// Remove `reference`'s listeners from every topic.
    pub fn off_all(&self, reference: ListenerRef) {
        let mut topics = lock(&self.topics);
        topics.retain(|_, channel| {
            channel.remove(reference);
            !channel.is_empty()
        });
    }

    /// Number of topics with at least one listener.
    pub fn topic_count(&self) -> usize {
        lock(&self.topics).len()
    }

    pub fn listener_count<Q>(&self, topic: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        lock(&self.topics).get(topic).map_or(0, |channel| channel.len())
    }

    /// Drop every listener of every topic.
    pub fn clear(&self) {
        lock(&self.topics).clear();
    }

    fn insert(&self, topic: K, listener: Arc<Listener<T>>, reference: ListenerRef, once: bool) {
        lock(&self.topics)
            .entry(topic)
            .or_insert_with(Channel::new)
            .insert(reference, listener, once);
    }

    fn remove_from<Q>(topics: &mut HashMap<K, Channel<T>>, topic: &Q, reference: ListenerRef)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let emptied = match topics.get_mut(topic) {
            Some(channel) => {
                channel.remove(reference);
                channel.is_empty()
            }
            None => false,
        };
        if emptied {
            topics.remove(topic);
        }
    }
}

impl<T, K> Default for EventEmitter<T, K>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, K> fmt::Debug for EventEmitter<T, K>
where
    K: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let topics = lock(&self.topics);
        f.debug_struct("EventEmitter")
            .field("topics", &topics.keys().collect::<Vec<_>>())
            .finish()
    }
}
