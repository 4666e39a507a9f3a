//! # owkit-host - Host Platform Boundary
//!
//! Describes what owkit consumes from the host overlay platform: payload
//! types, the request/push surfaces as traits, and durable key-value storage.
//!
//! Depends on [`owkit_core`] for [`SingleEvent`](owkit_core::SingleEvent) and
//! error handling.
//!
//! ## Public API
//!
//! ### Sources (`source`)
//! - [`TelemetrySource`] - Feature negotiation, snapshot pull, snapshot and event pushes
//! - [`GameStatusSource`] - Running game query and status pushes
//! - [`LauncherStatusSource`] - Running launchers query and launch/terminate/update pushes
//! - [`ProfileSource`] - Current user, active plans and their change pushes
//!
//! ### Payloads (`types`)
//! - [`RunningGameInfo`], [`GameInfoUpdatedEvent`] - Game status
//! - [`LauncherInfo`], [`LauncherUpdatedEvent`] - Launcher status
//! - [`InfoUpdate`], [`NewEvents`] - Telemetry pushes
//!
//! ### Storage (`storage`)
//! - [`Storage`] - String key-value persistence
//! - [`MemoryStorage`], [`FileStorage`] - In-process and on-disk implementations

pub mod source;
pub mod storage;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;
pub mod types;

// Public API re-exports
pub use source::{
    GameStatusSource, LauncherStatusSource, LocalGameStatusSource, LocalLauncherStatusSource,
    LocalProfileSource, LocalTelemetrySource, ProfileSource, TelemetrySource,
};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use types::{
    ActivePlans, CurrentUser, GameEventRecord, GameInfoUpdatedEvent, GetInfoResult, InfoMap,
    InfoUpdate, LauncherInfo, LauncherUpdatedEvent, LoginStateChangedEvent, NewEvents,
    RunningGameInfo, RunningLaunchersInfo, SetRequiredFeaturesResult, SubscriptionChangedEvent,
    TelemetryError, FEATURES_CATEGORY,
};
