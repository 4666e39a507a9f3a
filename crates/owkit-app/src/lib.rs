//! # owkit-app - Trackers, Telemetry and Shared State
//!
//! Builds the overlay-facing behavior on top of the host boundary in
//! [`owkit_host`]:
//!
//! - [`GameStatus`] / [`LauncherStatus`] - single-record change detectors
//! - [`TelemetryAdapter`] - feature negotiation plus deduplicated telemetry
//!   republished per path, per category and on a wildcard topic
//! - [`StateManager`] / [`StateClient`] - named key/value store shared between
//!   windows through a [`WindowTunnel`]
//! - [`Profile`] - login and subscription pushes
//! - [`config`] - `.owkit/config.toml` settings
//!
//! Trackers and adapters are started explicitly. Concurrent `start()` calls
//! share one in-flight startup, and `stop()`/`destroy()` wait for it before
//! tearing down.

pub mod config;
pub(crate) mod lifecycle;
pub mod profile;
pub mod state;
pub mod status;
pub mod telemetry;
pub mod tunnel;

// Re-export primary types
pub use config::Settings;
pub use profile::{Profile, ProfileEvent, ProfileTopic};
pub use state::{StateClient, StateKey, StateManager, StateProxy};
pub use status::{GameStatus, LauncherStatus, StatusEvent, StatusTopic};
pub use telemetry::{
    NegotiationOptions, TelemetryAdapter, TelemetryEvent, TelemetryPath, TelemetryTopic,
};
pub use tunnel::WindowTunnel;
