//! # owkit-core - Event Primitives and Shared Infrastructure
//!
//! Foundation crate for owkit. Provides the publish/subscribe primitives every
//! tracker and store is built on, plus error handling and logging setup.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde_json, thiserror and the tracing stack).
//!
//! ## Public API
//!
//! ### Events (`event`, `emitter`)
//! - [`SingleEvent`] - Single-topic listener registry keyed by [`ListenerRef`]
//! - [`EventEmitter`] - Registry of topics, each with its own listeners
//! - [`ListenerBundle`] - Several topic listeners registered under one reference
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ### JSON (`json`)
//! - [`parse_lenient()`] - Decode JSON-in-a-string host values, keeping raw text on failure
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use owkit_core::prelude::*;
//! ```

pub mod emitter;
pub mod error;
pub mod event;
pub mod json;
pub mod logging;

/// Prelude for common imports used throughout all owkit crates
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

// Re-export commonly used types at crate root for convenience
pub use emitter::{EventEmitter, ListenerBundle};
pub use error::{Error, Result, ResultExt};
pub use event::{Listener, ListenerRef, SingleEvent};
pub use json::parse_lenient;
