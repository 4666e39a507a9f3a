//! Cross-window object registry
//!
//! The main window owns a [`WindowTunnel`] and registers shared objects in it
//! during startup. Secondary windows hold a clone of the same tunnel and
//! resolve those objects by key. Resolving a key that was never registered is
//! a startup-ordering bug and fails immediately.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use owkit_core::prelude::*;

const KEY_PREFIX: &str = "WindowTunnel/";

type Entry = Arc<dyn Any + Send + Sync>;

/// Registry of objects shared between windows. Clones share the registry.
#[derive(Clone, Default)]
pub struct WindowTunnel {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl WindowTunnel {
    pub fn new() -> Self {
        Self::default()
    }

    fn global_key(key: &str) -> String {
        format!("{}{}", KEY_PREFIX, key)
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Entry>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Entry>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Register `value` under `key`, replacing any earlier registration.
    pub fn set<T: Any + Send + Sync>(&self, key: &str, value: T) {
        let replaced = self
            .write()
            .insert(Self::global_key(key), Arc::new(value))
            .is_some();
        if replaced {
            debug!("Window tunnel: replaced {}", key);
        } else {
            debug!("Window tunnel: registered {}", key);
        }
    }

    /// Resolve the object registered under `key`.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Result<Arc<T>> {
        let entry = self
            .read()
            .get(&Self::global_key(key))
            .cloned()
            .ok_or_else(|| Error::tunnel_not_registered(key))?;
        entry
            .downcast::<T>()
            .map_err(|_| Error::tunnel_type_mismatch(key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.read().contains_key(&Self::global_key(key))
    }

    /// Unregister `key`. Returns whether anything was registered.
    pub fn remove(&self, key: &str) -> bool {
        self.write().remove(&Self::global_key(key)).is_some()
    }

    /// Registered keys, without the tunnel namespace
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .read()
            .keys()
            .filter_map(|key| key.strip_prefix(KEY_PREFIX).map(str::to_string))
            .collect();
        keys.sort();
        keys
    }
}

impl std::fmt::Debug for WindowTunnel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowTunnel")
            .field("keys", &self.keys())
            .finish()
    }
}
