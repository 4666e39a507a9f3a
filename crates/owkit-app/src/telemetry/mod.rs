//! Change-tracking telemetry
//!
//! Flattens nested host snapshots into [`TelemetryPath`]s, drops repeats of
//! the last value seen for a path and republishes every real change on
//! [`TelemetryTopic`]s.

pub mod adapter;

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;

pub use adapter::{NegotiationOptions, TelemetryAdapter};

/// Category that discrete one-shot events are filed under
pub const EVENTS_CATEGORY: &str = "events";

/// One observable telemetry value: `category.key`
///
/// Equality is structural, so distinct (category, key) pairs never collide
/// even when a name contains the separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TelemetryPath {
    category: String,
    key: String,
}

impl TelemetryPath {
    pub fn new(category: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            key: key.into(),
        }
    }

    /// Path of a discrete event named `name`
    pub fn event(name: impl Into<String>) -> Self {
        Self::new(EVENTS_CATEGORY, name)
    }

    /// Split `category.key` at the first separator.
    pub fn parse(path: &str) -> Option<Self> {
        let (category, key) = path.split_once('.')?;
        if category.is_empty() || key.is_empty() {
            return None;
        }
        Some(Self::new(category, key))
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for TelemetryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.category, self.key)
    }
}

impl Serialize for TelemetryPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Subscription granularity for telemetry changes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TelemetryTopic {
    /// One exact path
    Path(TelemetryPath),
    /// Every path inside a category
    Category(String),
    /// Every change
    All,
}

impl TelemetryTopic {
    pub fn path(category: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Path(TelemetryPath::new(category, key))
    }

    pub fn category(category: impl Into<String>) -> Self {
        Self::Category(category.into())
    }
}

impl From<TelemetryPath> for TelemetryTopic {
    fn from(path: TelemetryPath) -> Self {
        Self::Path(path)
    }
}

/// A telemetry value that changed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryEvent {
    pub path: TelemetryPath,
    /// Value decoded from its JSON text when possible, else the raw value
    pub val: Value,
}

impl TelemetryEvent {
    pub fn category(&self) -> &str {
        self.path.category()
    }

    pub fn key(&self) -> &str {
        self.path.key()
    }
}
