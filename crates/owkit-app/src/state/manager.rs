//! Named key/value store with optional persistence

use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use owkit_core::prelude::*;
use owkit_core::{EventEmitter, ListenerBundle, ListenerRef};
use owkit_host::{FileStorage, Storage};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::proxy::StateProxy;
use super::StateKey;
use crate::config::StateSettings;
use crate::tunnel::WindowTunnel;

const TUNNEL_NAMESPACE: &str = "StateManager/";

type Values = Map<String, Value>;

/// The writer side of a shared state table.
///
/// Values are stored as owned JSON, so nothing handed in or out aliases the
/// store. Every `set` is persisted (when a storage is attached) and then
/// emitted on the topic named after the key.
///
/// Cheap to clone; clones share the same table.
#[derive(Clone)]
pub struct StateManager {
    inner: Arc<StateInner>,
}

struct StateInner {
    name: String,
    prefix: String,
    values: RwLock<Values>,
    storage: Option<Arc<dyn Storage>>,
    emitter: EventEmitter<Value, String>,
}

impl StateManager {
    /// In-memory store seeded from `initial`, which must serialize to an object.
    pub fn new<T: Serialize>(name: &str, initial: &T) -> Result<Self> {
        Self::build(name, initial, None)
    }

    /// Store that writes every change to `storage` under `<name>/<key>`.
    ///
    /// Entries already persisted under that prefix override `initial`.
    pub fn persistent<T: Serialize>(
        name: &str,
        initial: &T,
        storage: Arc<dyn Storage>,
    ) -> Result<Self> {
        Self::build(name, initial, Some(storage))
    }

    /// Persistent store in the configured storage directory.
    ///
    /// Falls back to an in-memory store when no directory can be resolved.
    pub fn from_settings<T: Serialize>(
        name: &str,
        initial: &T,
        settings: &StateSettings,
    ) -> Result<Self> {
        let Some(dir) = settings.resolved_storage_dir() else {
            warn!("State {}: no storage directory, keeping values in memory", name);
            return Self::new(name, initial);
        };

        let storage = FileStorage::open(&dir)
            .with_context(|| format!("State {}: open storage in {}", name, dir.display()))?;
        Self::persistent(name, initial, Arc::new(storage))
    }

    fn build<T: Serialize>(
        name: &str,
        initial: &T,
        storage: Option<Arc<dyn Storage>>,
    ) -> Result<Self> {
        let mut values = into_object(name, serde_json::to_value(initial)?)?;
        let prefix = format!("{}/", name);

        if let Some(storage) = &storage {
            let restored = hydrate(&mut values, storage.as_ref(), &prefix);
            debug!("State {}: restored {} persisted key(s)", name, restored);
        }

        Ok(Self {
            inner: Arc::new(StateInner {
                name: name.to_string(),
                prefix,
                values: RwLock::new(values),
                storage,
                emitter: EventEmitter::new(),
            }),
        })
    }

    /// Tunnel key a store named `name` is published under
    pub fn tunnel_key(name: &str) -> String {
        format!("{}{}", TUNNEL_NAMESPACE, name)
    }

    /// Register this store so other windows can connect a [`StateClient`](super::StateClient).
    pub fn publish(&self, tunnel: &WindowTunnel) {
        tunnel.set(&Self::tunnel_key(&self.inner.name), self.clone());
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn is_persistent(&self) -> bool {
        self.inner.storage.is_some()
    }

    fn read(&self) -> RwLockReadGuard<'_, Values> {
        self.inner.values.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Values> {
        self.inner.values.write().unwrap_or_else(|e| e.into_inner())
    }

    // ─────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────

    pub fn has(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    /// Independent copy of the value under `key`
    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.read().get(key).cloned()
    }

    /// Typed read. `Ok(None)` when the key holds no value.
    pub fn get<T: DeserializeOwned>(&self, key: &StateKey<T>) -> Result<Option<T>> {
        match self.get_value(key.name()) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Copy of the whole table as a JSON object
    pub fn snapshot(&self) -> Value {
        Value::Object(self.read().clone())
    }

    /// The whole table decoded as `T`
    pub fn to_state<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.snapshot())?)
    }

    // ─────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────

    /// Store `value` under `key`, persist it and notify the key's listeners.
    ///
    /// When persisting fails the table is left unchanged.
    pub fn set_value(&self, key: &str, value: Value) -> Result<()> {
        if let Some(storage) = &self.inner.storage {
            let encoded = serde_json::to_string(&value)?;
            storage.set_item(&format!("{}{}", self.inner.prefix, key), &encoded)?;
        }

        self.write().insert(key.to_string(), value.clone());
        trace!("State {}: set {}", self.inner.name, key);
        self.inner.emitter.emit(key, &value);
        Ok(())
    }

    /// Typed write through the value's serialized form.
    pub fn set<T: Serialize>(&self, key: &StateKey<T>, value: &T) -> Result<()> {
        self.set_value(key.name(), serde_json::to_value(value)?)
    }

    /// Swap the whole table. Nothing is persisted or emitted.
    pub fn replace_state<T: Serialize>(&self, state: &T) -> Result<()> {
        let values = into_object(&self.inner.name, serde_json::to_value(state)?)?;
        *self.write() = values;
        debug!("State {}: replaced", self.inner.name);
        Ok(())
    }

    /// Remove every persisted entry of this store. In-memory values are kept.
    pub fn clear_persistent_state(&self) -> Result<()> {
        let Some(storage) = &self.inner.storage else {
            return Ok(());
        };

        for key in storage.keys() {
            if key.starts_with(&self.inner.prefix) {
                storage.remove_item(&key)?;
            }
        }
        debug!("State {}: cleared persisted entries", self.inner.name);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────
    // Subscriptions
    // ─────────────────────────────────────────────────────────

    pub fn emitter(&self) -> &EventEmitter<Value, String> {
        &self.inner.emitter
    }

    pub fn add_listener(
        &self,
        key: &str,
        listener: impl Fn(&Value) + Send + Sync + 'static,
    ) -> ListenerRef {
        self.inner.emitter.add_listener(key.to_string(), listener)
    }

    pub fn add_listener_with_ref(
        &self,
        key: &str,
        listener: impl Fn(&Value) + Send + Sync + 'static,
        reference: ListenerRef,
    ) {
        self.inner
            .emitter
            .add_listener_with_ref(key.to_string(), listener, reference);
    }

    pub fn remove_listener(&self, key: &str, reference: ListenerRef) {
        self.inner.emitter.remove_listener(key, reference);
    }

    /// Typed subscription. Values that do not decode as `T` are logged and skipped.
    pub fn subscribe<T>(
        &self,
        key: &StateKey<T>,
        listener: impl Fn(T) + Send + Sync + 'static,
    ) -> ListenerRef
    where
        T: DeserializeOwned + 'static,
    {
        let name = key.name();
        self.add_listener(name, move |value| {
            match serde_json::from_value::<T>(value.clone()) {
                Ok(decoded) => listener(decoded),
                Err(e) => warn!("State key {} did not decode: {}", name, e),
            }
        })
    }

    pub fn on(&self, bundle: ListenerBundle<Value>, reference: ListenerRef) {
        self.inner.emitter.on(bundle, reference);
    }

    pub fn off<'a>(&self, keys: impl IntoIterator<Item = &'a str>, reference: ListenerRef) {
        self.inner.emitter.off(keys, reference);
    }

    /// Property-style view that can write
    pub fn proxy(&self) -> StateProxy {
        StateProxy::new(self.clone(), true)
    }
}

impl fmt::Debug for StateManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateManager")
            .field("name", &self.inner.name)
            .field("persistent", &self.is_persistent())
            .field("keys", &self.keys())
            .finish()
    }
}

fn into_object(name: &str, value: Value) -> Result<Values> {
    match value {
        Value::Object(values) => Ok(values),
        _ => Err(Error::StateNotObject {
            name: name.to_string(),
        }),
    }
}

/// Overlay persisted entries under `prefix` onto `values`.
fn hydrate(values: &mut Values, storage: &dyn Storage, prefix: &str) -> usize {
    let mut restored = 0;
    for stored_key in storage.keys() {
        let Some(key) = stored_key.strip_prefix(prefix) else {
            continue;
        };
        if key.is_empty() {
            continue;
        }
        let Some(raw) = storage.get_item(&stored_key) else {
            continue;
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => {
                values.insert(key.to_string(), value);
                restored += 1;
            }
            Err(e) => warn!("Skipping unreadable persisted entry {}: {}", stored_key, e),
        }
    }
    restored
}
