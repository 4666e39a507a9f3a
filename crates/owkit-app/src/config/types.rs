//! Configuration types for owkit
//!
//! Defines:
//! - `Settings` - Root of `.owkit/config.toml`
//! - `TelemetrySettings` - Feature negotiation tuning
//! - `StateSettings` - Durable state storage location

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Retry ceiling for game telemetry negotiation
pub const GAME_MAX_ATTEMPTS: u32 = 60;

/// Retry ceiling for launcher telemetry negotiation
pub const LAUNCHER_MAX_ATTEMPTS: u32 = 25;

/// Pause between negotiation attempts
pub const RETRY_DELAY_MS: u64 = 2000;

/// Root settings document
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub telemetry: TelemetrySettings,

    #[serde(default)]
    pub state: StateSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TelemetrySettings {
    /// Negotiation attempts for game telemetry before giving up
    #[serde(default = "default_game_max_attempts")]
    pub game_max_attempts: u32,

    /// Negotiation attempts for launcher telemetry before giving up
    #[serde(default = "default_launcher_max_attempts")]
    pub launcher_max_attempts: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Log every raw host push at debug level
    #[serde(default)]
    pub verbose: bool,
}

impl TelemetrySettings {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            game_max_attempts: default_game_max_attempts(),
            launcher_max_attempts: default_launcher_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            verbose: false,
        }
    }
}

fn default_game_max_attempts() -> u32 {
    GAME_MAX_ATTEMPTS
}

fn default_launcher_max_attempts() -> u32 {
    LAUNCHER_MAX_ATTEMPTS
}

fn default_retry_delay_ms() -> u64 {
    RETRY_DELAY_MS
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct StateSettings {
    /// Directory for persistent state (defaults to the user data dir)
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,
}

impl StateSettings {
    /// Configured storage directory, falling back to `<data_local_dir>/owkit/storage`.
    ///
    /// Returns `None` when no directory is configured and the platform has no
    /// local data directory.
    pub fn resolved_storage_dir(&self) -> Option<PathBuf> {
        self.storage_dir
            .clone()
            .or_else(|| dirs::data_local_dir().map(|dir| dir.join("owkit").join("storage")))
    }
}
