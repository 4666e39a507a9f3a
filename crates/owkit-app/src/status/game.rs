//! Running game status tracker

use std::sync::{Arc, Weak};

use owkit_core::prelude::*;
use owkit_core::{EventEmitter, ListenerRef};
use owkit_host::{GameInfoUpdatedEvent, GameStatusSource, RunningGameInfo};
use tokio::sync::watch;

use super::{PushFlags, StatusCore, StatusEvent, StatusTopic};
use crate::lifecycle::StartGate;

/// Tracks the running game and reports focus, running, resolution and game
/// changes on [`StatusTopic`]s.
///
/// Cheap to clone; clones share the same tracker.
pub struct GameStatus<S> {
    inner: Arc<GameStatusInner<S>>,
}

struct GameStatusInner<S> {
    source: Arc<S>,
    core: StatusCore<RunningGameInfo>,
    gate: StartGate,
    owner: ListenerRef,
}

impl<S> Clone for GameStatus<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> GameStatus<S>
where
    S: GameStatusSource + Sync + 'static,
{
    pub fn new(source: Arc<S>) -> Self {
        Self {
            inner: Arc::new(GameStatusInner {
                source,
                core: StatusCore::new(),
                gate: StartGate::new(),
                owner: ListenerRef::new(),
            }),
        }
    }

    /// Pull the current game once and start following host pushes.
    ///
    /// Concurrent calls share the same startup; later calls return immediately.
    pub async fn start(&self) -> bool {
        let weak = Arc::downgrade(&self.inner);
        self.inner
            .gate
            .start(move || async move {
                match weak.upgrade() {
                    Some(inner) => {
                        inner.seed_and_attach().await;
                        true
                    }
                    None => false,
                }
            })
            .await
    }

    /// Stop following host pushes. Flags and the last identity are kept.
    pub async fn destroy(&self) {
        self.inner.gate.stop().await;
        self.inner.detach();
    }

    pub fn is_started(&self) -> bool {
        self.inner.gate.is_running()
    }

    pub fn is_running(&self) -> bool {
        self.inner.core.state().is_running()
    }

    pub fn is_in_focus(&self) -> bool {
        self.inner.core.state().is_in_focus()
    }

    /// Copy of the running game record, `None` when no game is running
    pub fn game_info(&self) -> Option<RunningGameInfo> {
        self.inner.core.state().record().cloned()
    }

    /// Identity of the running game, else of the last game seen
    pub fn game_id(&self) -> Option<i64> {
        self.inner.core.state().identity()
    }

    /// True when a game is running and its identity is `id`
    pub fn game_is(&self, id: i64) -> bool {
        let state = self.inner.core.state();
        state.is_running() && state.identity() == Some(id)
    }

    pub fn emitter(&self) -> &EventEmitter<StatusEvent, StatusTopic> {
        self.inner.core.emitter()
    }

    /// Receiver that follows the running flag
    pub fn running_receiver(&self) -> watch::Receiver<bool> {
        self.inner.core.running_receiver()
    }
}

impl<S> GameStatusInner<S>
where
    S: GameStatusSource + Sync + 'static,
{
    async fn seed_and_attach(self: Arc<Self>) {
        let game = self.source.get_running_game_info().await;
        debug!(
            "Game status seeded: {:?}",
            game.as_ref().map(|g| (g.id, g.is_running))
        );
        self.core.seed(game);

        let weak: Weak<Self> = Arc::downgrade(&self);
        self.source.on_game_info_updated().add_listener_with_ref(
            move |event| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_game_info_updated(event);
                }
            },
            self.owner,
        );
    }

    fn on_game_info_updated(&self, event: &GameInfoUpdatedEvent) {
        let flags = PushFlags {
            resolution_changed: event.resolution_changed,
            identity_changed: event.game_changed,
        };
        let topics = self.core.push(event.game_info.clone(), flags);
        if !topics.is_empty() {
            debug!("Game status changed: {:?}", topics);
        }
    }

    fn detach(&self) {
        self.source.on_game_info_updated().remove_listener(self.owner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use owkit_host::test_utils::{test_game, test_game_event, FakeHost};
    use std::sync::Mutex;
    use std::time::Duration;

    fn record_topics(status: &GameStatus<FakeHost>) -> Arc<Mutex<Vec<StatusTopic>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        for topic in [
            StatusTopic::Focus,
            StatusTopic::Running,
            StatusTopic::Resolution,
            StatusTopic::GameChanged,
            StatusTopic::Changed,
        ] {
            let sink = seen.clone();
            status.emitter().add_listener(topic, move |_: &StatusEvent| {
                sink.lock().unwrap().push(topic);
            });
        }
        seen
    }

    #[tokio::test]
    async fn test_start_seeds_without_emitting() {
        let host = Arc::new(FakeHost::new());
        host.set_running_game(Some(test_game(54261, true)));
        let status = GameStatus::new(host.clone());
        let seen = record_topics(&status);

        assert!(status.start().await);

        assert!(status.is_running());
        assert!(status.is_in_focus());
        assert_eq!(status.game_id(), Some(5426));
        assert!(status.game_is(5426));
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(host.attached_listeners(), 1);
    }

    #[tokio::test]
    async fn test_pushes_emit_in_order() {
        let host = Arc::new(FakeHost::new());
        let status = GameStatus::new(host.clone());
        status.start().await;
        let seen = record_topics(&status);

        host.push_game_info(test_game_event(Some(test_game(1230, true))));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![StatusTopic::Focus, StatusTopic::Running, StatusTopic::Changed]
        );

        seen.lock().unwrap().clear();
        host.push_game_info(GameInfoUpdatedEvent {
            resolution_changed: true,
            ..test_game_event(Some(test_game(1230, true)))
        });
        assert_eq!(
            *seen.lock().unwrap(),
            vec![StatusTopic::Resolution, StatusTopic::Changed]
        );
    }

    #[tokio::test]
    async fn test_game_is_false_after_exit() {
        let host = Arc::new(FakeHost::new());
        let status = GameStatus::new(host.clone());
        status.start().await;

        host.push_game_info(test_game_event(Some(test_game(1230, false))));
        assert!(status.game_is(123));

        host.push_game_info(test_game_event(None));
        assert!(!status.game_is(123));
        assert!(status.game_info().is_none());
        assert_eq!(status.game_id(), Some(123));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_start_pulls_once() {
        let host = Arc::new(FakeHost::new());
        host.set_request_delay(Some(Duration::from_millis(100)));
        host.set_running_game(Some(test_game(1230, false)));
        let status = GameStatus::new(host.clone());

        let (a, b) = tokio::join!(status.start(), status.start());
        assert!(a && b);
        assert_eq!(host.request_count(), 1);
        assert_eq!(host.attached_listeners(), 1);
    }

    #[tokio::test]
    async fn test_destroy_detaches() {
        let host = Arc::new(FakeHost::new());
        let status = GameStatus::new(host.clone());
        status.start().await;
        status.destroy().await;

        assert_eq!(host.attached_listeners(), 0);
        assert!(!status.is_started());

        host.push_game_info(test_game_event(Some(test_game(1230, true))));
        assert!(!status.is_running());
    }

    #[tokio::test]
    async fn test_running_receiver_follows_pushes() {
        let host = Arc::new(FakeHost::new());
        let status = GameStatus::new(host.clone());
        status.start().await;
        let running = status.running_receiver();

        host.push_game_info(test_game_event(Some(test_game(1230, false))));
        assert!(*running.borrow());
        host.push_game_info(test_game_event(None));
        assert!(!*running.borrow());
    }
}
