//! Test utilities for host-driven components
//!
//! [`FakeHost`] implements every source trait. Tests script request replies
//! up front and then push host events by hand.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use owkit_core::SingleEvent;
use serde_json::Value;

use crate::source::{GameStatusSource, LauncherStatusSource, ProfileSource, TelemetrySource};
use crate::types::*;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Scriptable in-memory host.
#[derive(Debug, Default)]
pub struct FakeHost {
    // Telemetry
    telemetry_errors: SingleEvent<TelemetryError>,
    info_updates: SingleEvent<InfoUpdate>,
    new_events: SingleEvent<NewEvents>,
    negotiation_script: Mutex<VecDeque<SetRequiredFeaturesResult>>,
    negotiation_fallback: Mutex<SetRequiredFeaturesResult>,
    negotiation_calls: AtomicUsize,
    requested_features: Mutex<Vec<String>>,
    info: Mutex<InfoMap>,
    info_calls: AtomicUsize,

    // Game status
    game_info_updates: SingleEvent<GameInfoUpdatedEvent>,
    running_game: Mutex<Option<RunningGameInfo>>,

    // Launcher status
    launched: SingleEvent<LauncherInfo>,
    terminated: SingleEvent<LauncherInfo>,
    launcher_updates: SingleEvent<LauncherUpdatedEvent>,
    running_launchers: Mutex<Vec<LauncherInfo>>,

    // Profile
    login_state: SingleEvent<LoginStateChangedEvent>,
    subscription: SingleEvent<SubscriptionChangedEvent>,
    current_user: Mutex<CurrentUser>,
    active_plans: Mutex<ActivePlans>,

    request_delay: Mutex<Option<Duration>>,
    requests: AtomicUsize,
}

impl FakeHost {
    /// Host that declines every negotiation until scripted otherwise.
    pub fn new() -> Self {
        Self::default()
    }

    /// Host that grants `features` on every negotiation attempt.
    pub fn granting(features: &[&str]) -> Self {
        let host = Self::new();
        host.set_negotiation_fallback(SetRequiredFeaturesResult::granted(features.iter().copied()));
        host
    }

    /// Queue replies consumed one per negotiation attempt before the fallback applies.
    pub fn script_negotiation(&self, replies: impl IntoIterator<Item = SetRequiredFeaturesResult>) {
        lock(&self.negotiation_script).extend(replies);
    }

    pub fn set_negotiation_fallback(&self, reply: SetRequiredFeaturesResult) {
        *lock(&self.negotiation_fallback) = reply;
    }

    pub fn negotiation_calls(&self) -> usize {
        self.negotiation_calls.load(Ordering::SeqCst)
    }

    /// Features passed to the most recent negotiation attempt
    pub fn requested_features(&self) -> Vec<String> {
        lock(&self.requested_features).clone()
    }

    /// Snapshot returned by the next `get_info` pulls
    pub fn set_info(&self, info: InfoMap) {
        *lock(&self.info) = info;
    }

    pub fn info_calls(&self) -> usize {
        self.info_calls.load(Ordering::SeqCst)
    }

    pub fn set_running_game(&self, game: Option<RunningGameInfo>) {
        *lock(&self.running_game) = game;
    }

    pub fn set_running_launchers(&self, launchers: Vec<LauncherInfo>) {
        *lock(&self.running_launchers) = launchers;
    }

    pub fn set_current_user(&self, user: CurrentUser) {
        *lock(&self.current_user) = user;
    }

    pub fn set_active_plans(&self, plans: ActivePlans) {
        *lock(&self.active_plans) = plans;
    }

    /// Delay every request reply, keeping it in flight for the given time.
    pub fn set_request_delay(&self, delay: Option<Duration>) {
        *lock(&self.request_delay) = delay;
    }

    /// Requests of any kind answered so far
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    async fn request_pause(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let delay = *lock(&self.request_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    // ─────────────────────────────────────────────────────────
    // Pushes
    // ─────────────────────────────────────────────────────────

    pub fn push_info(&self, info: InfoMap) {
        self.info_updates.fire(&InfoUpdate {
            info,
            feature: None,
        });
    }

    pub fn push_events(&self, events: Vec<(&str, Value)>) {
        let events = events
            .into_iter()
            .map(|(name, data)| GameEventRecord {
                name: name.to_string(),
                data,
            })
            .collect();
        self.new_events.fire(&NewEvents { events });
    }

    pub fn push_error(&self, reason: &str) {
        self.telemetry_errors.fire(&TelemetryError {
            reason: reason.to_string(),
        });
    }

    pub fn push_game_info(&self, event: GameInfoUpdatedEvent) {
        self.game_info_updates.fire(&event);
    }

    pub fn push_launched(&self, info: LauncherInfo) {
        self.launched.fire(&info);
    }

    pub fn push_terminated(&self, info: LauncherInfo) {
        self.terminated.fire(&info);
    }

    pub fn push_launcher_updated(&self, info: LauncherInfo, change_type: &[&str]) {
        self.launcher_updates.fire(&LauncherUpdatedEvent {
            info,
            change_type: change_type.iter().map(|s| s.to_string()).collect(),
        });
    }

    pub fn push_login_state(&self, event: LoginStateChangedEvent) {
        self.login_state.fire(&event);
    }

    pub fn push_subscription(&self, plans: Vec<i64>) {
        self.subscription.fire(&SubscriptionChangedEvent { plans });
    }

    /// Total listeners currently attached to any host push
    pub fn attached_listeners(&self) -> usize {
        self.telemetry_errors.len()
            + self.info_updates.len()
            + self.new_events.len()
            + self.game_info_updates.len()
            + self.launched.len()
            + self.terminated.len()
            + self.launcher_updates.len()
            + self.login_state.len()
            + self.subscription.len()
    }
}

impl TelemetrySource for FakeHost {
    async fn set_required_features(&self, features: &[String]) -> SetRequiredFeaturesResult {
        self.negotiation_calls.fetch_add(1, Ordering::SeqCst);
        *lock(&self.requested_features) = features.to_vec();
        self.request_pause().await;

        let scripted = lock(&self.negotiation_script).pop_front();
        match scripted {
            Some(reply) => reply,
            None => lock(&self.negotiation_fallback).clone(),
        }
    }

    async fn get_info(&self) -> GetInfoResult {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        self.request_pause().await;
        GetInfoResult::ok(lock(&self.info).clone())
    }

    fn on_error(&self) -> &SingleEvent<TelemetryError> {
        &self.telemetry_errors
    }

    fn on_info_update(&self) -> &SingleEvent<InfoUpdate> {
        &self.info_updates
    }

    fn on_new_events(&self) -> &SingleEvent<NewEvents> {
        &self.new_events
    }
}

impl GameStatusSource for FakeHost {
    async fn get_running_game_info(&self) -> Option<RunningGameInfo> {
        self.request_pause().await;
        lock(&self.running_game).clone()
    }

    fn on_game_info_updated(&self) -> &SingleEvent<GameInfoUpdatedEvent> {
        &self.game_info_updates
    }
}

impl LauncherStatusSource for FakeHost {
    async fn get_running_launchers_info(&self) -> RunningLaunchersInfo {
        self.request_pause().await;
        RunningLaunchersInfo {
            success: true,
            launchers: lock(&self.running_launchers).clone(),
        }
    }

    fn on_launched(&self) -> &SingleEvent<LauncherInfo> {
        &self.launched
    }

    fn on_terminated(&self) -> &SingleEvent<LauncherInfo> {
        &self.terminated
    }

    fn on_updated(&self) -> &SingleEvent<LauncherUpdatedEvent> {
        &self.launcher_updates
    }
}

impl ProfileSource for FakeHost {
    async fn get_current_user(&self) -> CurrentUser {
        self.request_pause().await;
        lock(&self.current_user).clone()
    }

    async fn get_active_plans(&self) -> ActivePlans {
        self.request_pause().await;
        lock(&self.active_plans).clone()
    }

    fn on_login_state_changed(&self) -> &SingleEvent<LoginStateChangedEvent> {
        &self.login_state
    }

    fn on_subscription_changed(&self) -> &SingleEvent<SubscriptionChangedEvent> {
        &self.subscription
    }
}

/// Creates a running game record.
///
/// # Arguments
/// * `id` - Raw host id (class id times ten plus a sub-variant digit)
/// * `in_focus` - Whether the game window has focus
pub fn test_game(id: i64, in_focus: bool) -> RunningGameInfo {
    RunningGameInfo {
        id,
        title: format!("Game {}", id / 10),
        is_running: true,
        is_in_focus: in_focus,
        width: 1920,
        height: 1080,
        session_id: None,
    }
}

/// Creates a game status push carrying `game`.
pub fn test_game_event(game: Option<RunningGameInfo>) -> GameInfoUpdatedEvent {
    GameInfoUpdatedEvent {
        game_info: game,
        ..Default::default()
    }
}

/// Creates a launcher record.
pub fn test_launcher(id: i64, in_focus: bool) -> LauncherInfo {
    LauncherInfo {
        id,
        class_id: id / 10,
        title: format!("Launcher {}", id / 10),
        is_in_focus: in_focus,
        width: 1280,
        height: 720,
    }
}

/// Converts a `json!` object literal into a snapshot map.
///
/// # Panics
/// Panics when `value` is not a JSON object.
pub fn info_map(value: Value) -> InfoMap {
    match value {
        Value::Object(map) => map,
        other => panic!("info_map expects a JSON object, got {}", other),
    }
}
