//! Configuration file parsing for owkit
//!
//! Supports `.owkit/config.toml` with `[telemetry]` and `[state]` sections.

pub mod settings;
pub mod types;

pub use settings::{init_config_dir, load_settings, load_settings_from};
pub use types::*;
