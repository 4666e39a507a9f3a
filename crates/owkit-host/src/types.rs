//! Payloads exchanged with the host platform
//!
//! Field names follow the host's camelCase JSON so recorded payloads can be
//! deserialized directly.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Nested telemetry snapshot: category -> key -> raw value.
///
/// Iteration follows the order the host delivered the entries in.
pub type InfoMap = Map<String, Value>;

/// Category the host uses for capability metadata inside snapshots.
pub const FEATURES_CATEGORY: &str = "features";

// ─────────────────────────────────────────────────────────
// Telemetry (game and launcher events)
// ─────────────────────────────────────────────────────────

/// Reply to a feature negotiation request
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetRequiredFeaturesResult {
    pub success: bool,
    #[serde(default)]
    pub supported_features: Option<Vec<String>>,
    #[serde(default)]
    pub error: Option<String>,
}

impl SetRequiredFeaturesResult {
    pub fn granted<S: Into<String>>(features: impl IntoIterator<Item = S>) -> Self {
        Self {
            success: true,
            supported_features: Some(features.into_iter().map(Into::into).collect()),
            error: None,
        }
    }

    pub fn declined(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            supported_features: None,
            error: Some(reason.into()),
        }
    }

    /// True when the host accepted the request and granted at least one feature.
    pub fn has_grant(&self) -> bool {
        self.success
            && self
                .supported_features
                .as_ref()
                .is_some_and(|features| !features.is_empty())
    }
}

/// Reply to a full snapshot pull
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetInfoResult {
    pub success: bool,
    #[serde(default)]
    pub res: Option<InfoMap>,
    #[serde(default)]
    pub error: Option<String>,
}

impl GetInfoResult {
    pub fn ok(res: InfoMap) -> Self {
        Self {
            success: true,
            res: Some(res),
            error: None,
        }
    }
}

/// Snapshot push with changed categories
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoUpdate {
    #[serde(default)]
    pub info: InfoMap,
    #[serde(default)]
    pub feature: Option<String>,
}

/// One discrete event inside a [`NewEvents`] batch
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameEventRecord {
    pub name: String,
    #[serde(default)]
    pub data: Value,
}

/// Batch of discrete one-shot events
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvents {
    #[serde(default)]
    pub events: Vec<GameEventRecord>,
}

/// Out-of-band error reported by the telemetry source
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryError {
    #[serde(default)]
    pub reason: String,
}

// ─────────────────────────────────────────────────────────
// Game status
// ─────────────────────────────────────────────────────────

/// Running game record. `id` carries the game class id times ten plus a
/// sub-variant digit.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunningGameInfo {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub is_running: bool,
    #[serde(default)]
    pub is_in_focus: bool,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Game status push
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInfoUpdatedEvent {
    #[serde(default)]
    pub game_info: Option<RunningGameInfo>,
    #[serde(default)]
    pub resolution_changed: bool,
    #[serde(default)]
    pub focus_changed: bool,
    #[serde(default)]
    pub running_changed: bool,
    #[serde(default)]
    pub game_changed: bool,
}

// ─────────────────────────────────────────────────────────
// Launcher status
// ─────────────────────────────────────────────────────────

/// Running launcher record. Present means running.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LauncherInfo {
    pub id: i64,
    #[serde(default)]
    pub class_id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub is_in_focus: bool,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

/// Reply to a running-launchers query
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunningLaunchersInfo {
    pub success: bool,
    #[serde(default)]
    pub launchers: Vec<LauncherInfo>,
}

/// Launcher record update push
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LauncherUpdatedEvent {
    pub info: LauncherInfo,
    #[serde(default)]
    pub change_type: Vec<String>,
}

// ─────────────────────────────────────────────────────────
// Profile
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginStateChangedEvent {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub connection_state: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionChangedEvent {
    #[serde(default)]
    pub plans: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub success: bool,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivePlans {
    pub success: bool,
    #[serde(default)]
    pub plans: Vec<i64>,
}
