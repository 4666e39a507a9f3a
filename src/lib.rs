//! owkit - Overlay toolkit
//!
//! Event, status and shared-state utilities for game overlay apps. This crate
//! re-exports the workspace crates and hosts the `owkit` replay binary.

// Module declarations
pub mod replay;

// Re-export workspace crates
pub use owkit_app as app;
pub use owkit_core as core;
pub use owkit_host as host;

// Re-export primary types
pub use owkit_app::{
    GameStatus, LauncherStatus, Profile, Settings, StateClient, StateKey, StateManager,
    StateProxy, TelemetryAdapter, TelemetryEvent, TelemetryPath, TelemetryTopic, WindowTunnel,
};
pub use owkit_core::{Error, EventEmitter, ListenerBundle, ListenerRef, Result, SingleEvent};
pub use replay::run_replay;
