//! Property-style access to a state table

use owkit_core::prelude::*;
use owkit_core::{ListenerBundle, ListenerRef};
use serde_json::Value;

use super::StateManager;

/// Names reserved for subscription methods on a [`StateProxy`]
pub const RESERVED_PROPERTIES: [&str; 4] = ["on", "off", "addListener", "removeListener"];

fn check_property(property: &str) -> Result<()> {
    if RESERVED_PROPERTIES.contains(&property) {
        return Err(Error::reserved_property(property));
    }
    Ok(())
}

/// Treats the keys of a state table as properties.
///
/// Reading or writing a reserved name and deleting any property are
/// rejected. A proxy obtained from a [`StateClient`](super::StateClient)
/// also rejects writes.
#[derive(Debug, Clone)]
pub struct StateProxy {
    manager: StateManager,
    writable: bool,
}

impl StateProxy {
    pub(crate) fn new(manager: StateManager, writable: bool) -> Self {
        Self { manager, writable }
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn has(&self, property: &str) -> bool {
        self.manager.has(property)
    }

    pub fn get(&self, property: &str) -> Result<Option<Value>> {
        check_property(property)?;
        Ok(self.manager.get_value(property))
    }

    pub fn set(&self, property: &str, value: Value) -> Result<()> {
        check_property(property)?;
        if !self.writable {
            return Err(Error::read_only_state(property));
        }
        self.manager.set_value(property, value)
    }

    pub fn delete(&self, _property: &str) -> Result<()> {
        Err(Error::DeleteNotAllowed)
    }

    pub fn on(&self, bundle: ListenerBundle<Value>, reference: ListenerRef) {
        self.manager.on(bundle, reference);
    }

    pub fn off<'a>(&self, keys: impl IntoIterator<Item = &'a str>, reference: ListenerRef) {
        self.manager.off(keys, reference);
    }

    pub fn add_listener(
        &self,
        key: &str,
        listener: impl Fn(&Value) + Send + Sync + 'static,
    ) -> ListenerRef {
        self.manager.add_listener(key, listener)
    }

    pub fn remove_listener(&self, key: &str, reference: ListenerRef) {
        self.manager.remove_listener(key, reference);
    }
}
