//! Shared state store
//!
//! - [`StateManager`] - The single writer of a named key/value table, with
//!   optional persistence and per-key change topics
//! - [`StateClient`] - Read/subscribe handle resolved through a
//!   [`WindowTunnel`](crate::WindowTunnel)
//! - [`StateProxy`] - Property-style view over either of them
//! - [`StateKey`] - Typed key handle

pub mod client;
pub mod manager;
pub mod proxy;

use std::fmt;
use std::marker::PhantomData;

pub use client::StateClient;
pub use manager::StateManager;
pub use proxy::{StateProxy, RESERVED_PROPERTIES};

/// Typed handle for one state key.
///
/// ```
/// use owkit_app::state::StateKey;
///
/// const VOLUME: StateKey<u8> = StateKey::new("volume");
/// assert_eq!(VOLUME.name(), "volume");
/// ```
pub struct StateKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> StateKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for StateKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for StateKey<T> {}

impl<T> fmt::Debug for StateKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateKey({})", self.name)
    }
}
