//! Read/subscribe handle to a store owned by the main window

use owkit_core::prelude::*;
use owkit_core::{ListenerBundle, ListenerRef};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::proxy::StateProxy;
use super::{StateKey, StateManager};
use crate::tunnel::WindowTunnel;

/// Reads and subscribes to a [`StateManager`] published by another window.
///
/// There is no write path: the owning window is the only writer.
#[derive(Debug, Clone)]
pub struct StateClient {
    manager: StateManager,
}

impl StateClient {
    /// Resolve the store published as `name`.
    ///
    /// Fails immediately with [`Error::TunnelNotRegistered`] when the main
    /// window has not published it yet.
    pub fn connect(tunnel: &WindowTunnel, name: &str) -> Result<Self> {
        let manager = tunnel.get::<StateManager>(&StateManager::tunnel_key(name))?;
        debug!("State client connected to {}", name);
        Ok(Self {
            manager: StateManager::clone(&manager),
        })
    }

    pub fn name(&self) -> &str {
        self.manager.name()
    }

    pub fn has(&self, key: &str) -> bool {
        self.manager.has(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.manager.keys()
    }

    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.manager.get_value(key)
    }

    pub fn get<T: DeserializeOwned>(&self, key: &StateKey<T>) -> Result<Option<T>> {
        self.manager.get(key)
    }

    pub fn snapshot(&self) -> Value {
        self.manager.snapshot()
    }

    pub fn add_listener(
        &self,
        key: &str,
        listener: impl Fn(&Value) + Send + Sync + 'static,
    ) -> ListenerRef {
        self.manager.add_listener(key, listener)
    }

    pub fn add_listener_with_ref(
        &self,
        key: &str,
        listener: impl Fn(&Value) + Send + Sync + 'static,
        reference: ListenerRef,
    ) {
        self.manager.add_listener_with_ref(key, listener, reference);
    }

    pub fn remove_listener(&self, key: &str, reference: ListenerRef) {
        self.manager.remove_listener(key, reference);
    }

    pub fn subscribe<T>(
        &self,
        key: &StateKey<T>,
        listener: impl Fn(T) + Send + Sync + 'static,
    ) -> ListenerRef
    where
        T: DeserializeOwned + 'static,
    {
        self.manager.subscribe(key, listener)
    }

    pub fn on(&self, bundle: ListenerBundle<Value>, reference: ListenerRef) {
        self.manager.on(bundle, reference);
    }

    pub fn off<'a>(&self, keys: impl IntoIterator<Item = &'a str>, reference: ListenerRef) {
        self.manager.off(keys, reference);
    }

    /// Property-style view that refuses writes
    pub fn proxy(&self) -> StateProxy {
        StateProxy::new(self.manager.clone(), false)
    }
}
