//! In-process host fed from a recording

use std::sync::{Mutex, MutexGuard};

use owkit_core::prelude::*;
use owkit_core::SingleEvent;
use owkit_host::{
    GameInfoUpdatedEvent, GameStatusSource, GetInfoResult, InfoMap, InfoUpdate, NewEvents,
    RunningGameInfo, SetRequiredFeaturesResult, TelemetryError, TelemetrySource,
};
use serde_json::Value;

use super::HostPush;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Host that grants every requested feature and answers queries from the
/// pushes delivered so far.
#[derive(Debug, Default)]
pub struct ReplayHost {
    game: Mutex<Option<RunningGameInfo>>,
    info: Mutex<InfoMap>,
    game_info_updates: SingleEvent<GameInfoUpdatedEvent>,
    errors: SingleEvent<TelemetryError>,
    info_updates: SingleEvent<InfoUpdate>,
    new_events: SingleEvent<NewEvents>,
}

impl ReplayHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `push` and fire it at attached listeners.
    pub fn deliver(&self, push: &HostPush) {
        match push {
            HostPush::GameInfo(event) => {
                *lock(&self.game) = event.game_info.clone().filter(|game| game.is_running);
                self.game_info_updates.fire(event);
            }
            HostPush::InfoUpdate(update) => {
                self.merge_info(&update.info);
                self.info_updates.fire(update);
            }
            HostPush::NewEvents(events) => self.new_events.fire(events),
            HostPush::Error(error) => self.errors.fire(error),
        }
    }

    /// Accumulated snapshot of every info update delivered so far
    pub fn info(&self) -> InfoMap {
        lock(&self.info).clone()
    }

    fn merge_info(&self, update: &InfoMap) {
        let mut info = lock(&self.info);
        for (category, values) in update {
            match (info.get_mut(category), values) {
                (Some(Value::Object(existing)), Value::Object(incoming)) => {
                    for (key, value) in incoming {
                        existing.insert(key.clone(), value.clone());
                    }
                }
                _ => {
                    info.insert(category.clone(), values.clone());
                }
            }
        }
    }
}

impl TelemetrySource for ReplayHost {
    async fn set_required_features(&self, features: &[String]) -> SetRequiredFeaturesResult {
        trace!("Replay host granting {:?}", features);
        SetRequiredFeaturesResult::granted(features.iter().cloned())
    }

    async fn get_info(&self) -> GetInfoResult {
        GetInfoResult::ok(self.info())
    }

    fn on_error(&self) -> &SingleEvent<TelemetryError> {
        &self.errors
    }

    fn on_info_update(&self) -> &SingleEvent<InfoUpdate> {
        &self.info_updates
    }

    fn on_new_events(&self) -> &SingleEvent<NewEvents> {
        &self.new_events
    }
}

impl GameStatusSource for ReplayHost {
    async fn get_running_game_info(&self) -> Option<RunningGameInfo> {
        lock(&self.game).clone()
    }

    fn on_game_info_updated(&self) -> &SingleEvent<GameInfoUpdatedEvent> {
        &self.game_info_updates
    }
}
