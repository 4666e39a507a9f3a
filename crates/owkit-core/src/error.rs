//! Error types shared by every owkit crate

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Host Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Host error: {message}")]
    Host { message: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    // ─────────────────────────────────────────────────────────────
    // Durable Storage Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Storage error: {message}")]
    Storage { message: String },

    // ─────────────────────────────────────────────────────────────
    // Cross-Window Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Window tunnel key \"{key}\" is not registered in the main window")]
    TunnelNotRegistered { key: String },

    #[error("Window tunnel key \"{key}\" holds a different type")]
    TunnelTypeMismatch { key: String },

    // ─────────────────────────────────────────────────────────────
    // Shared State Errors
    // ─────────────────────────────────────────────────────────────
    #[error("\"{name}\" is a reserved property for State")]
    ReservedProperty { name: String },

    #[error("Setting \"{name}\" is not allowed on a read-only state client")]
    ReadOnlyState { name: String },

    #[error("Deleting properties is not allowed for State")]
    DeleteNotAllowed,

    #[error("State \"{name}\" must be a JSON object")]
    StateNotObject { name: String },
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn host(message: impl Into<String>) -> Self {
        Self::Host {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn tunnel_not_registered(key: impl Into<String>) -> Self {
        Self::TunnelNotRegistered { key: key.into() }
    }

    pub fn tunnel_type_mismatch(key: impl Into<String>) -> Self {
        Self::TunnelTypeMismatch { key: key.into() }
    }

    pub fn reserved_property(name: impl Into<String>) -> Self {
        Self::ReservedProperty { name: name.into() }
    }

    pub fn read_only_state(name: impl Into<String>) -> Self {
        Self::ReadOnlyState { name: name.into() }
    }

    /// Check if this is a recoverable error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::Json(_) | Error::Host { .. } | Error::Storage { .. }
        )
    }

    /// Check if this error is a startup-ordering or API misuse bug
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::TunnelNotRegistered { .. }
                | Error::TunnelTypeMismatch { .. }
                | Error::ReservedProperty { .. }
                | Error::ReadOnlyState { .. }
                | Error::DeleteNotAllowed
                | Error::StateNotObject { .. }
        )
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}
