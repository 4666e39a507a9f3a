//! Game and launcher status trackers
//!
//! Both trackers hold one optional record and fold every host push through
//! the same transition rule:
//!
//! 1. derive `is_running` / `is_in_focus` from the incoming record
//! 2. keep the record only while it is running, remembering its identity
//! 3. emit `Focus`, `Running`, `Resolution`, `GameChanged` for whatever
//!    changed, then `Changed` if any of them fired
//!
//! A push that changes nothing emits nothing.

pub mod game;
pub mod launcher;

use std::sync::{Mutex, MutexGuard};

use owkit_core::EventEmitter;
use owkit_host::{LauncherInfo, RunningGameInfo};
use serde::Serialize;
use tokio::sync::watch;

pub use game::GameStatus;
pub use launcher::LauncherStatus;

/// Host ids carry a sub-variant in the low decimal digit.
pub fn identity_of(raw_id: i64) -> i64 {
    raw_id.div_euclid(10)
}

/// A record a status tracker can hold
pub trait StatusRecord: Clone + Send + Sync + 'static {
    fn raw_id(&self) -> i64;
    fn is_running(&self) -> bool;
    fn is_in_focus(&self) -> bool;
}

impl StatusRecord for RunningGameInfo {
    fn raw_id(&self) -> i64 {
        self.id
    }

    fn is_running(&self) -> bool {
        self.is_running
    }

    fn is_in_focus(&self) -> bool {
        self.is_in_focus
    }
}

/// A reported launcher is a running launcher.
impl StatusRecord for LauncherInfo {
    fn raw_id(&self) -> i64 {
        self.id
    }

    fn is_running(&self) -> bool {
        true
    }

    fn is_in_focus(&self) -> bool {
        self.is_in_focus
    }
}

/// Status change topics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusTopic {
    Focus,
    Running,
    Resolution,
    GameChanged,
    /// Fires after any of the above
    Changed,
}

/// Tracker flags at the time of an emission
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusEvent {
    pub is_running: bool,
    pub is_in_focus: bool,
    pub id: Option<i64>,
}

/// Host-reported change flags carried alongside a record.
///
/// A switch between two running records with different identities raises
/// `GameChanged` even when the host does not flag it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushFlags {
    pub resolution_changed: bool,
    pub identity_changed: bool,
}

#[derive(Debug)]
pub(crate) struct StatusState<R> {
    record: Option<R>,
    is_running: bool,
    is_in_focus: bool,
    last_identity: Option<i64>,
}

impl<R: StatusRecord> StatusState<R> {
    pub(crate) fn new() -> Self {
        Self {
            record: None,
            is_running: false,
            is_in_focus: false,
            last_identity: None,
        }
    }

    fn store(&mut self, record: Option<R>) {
        match record {
            Some(record) if record.is_running() => {
                self.last_identity = Some(identity_of(record.raw_id()));
                self.record = Some(record);
            }
            _ => self.record = None,
        }
    }

    /// Install the initial record without reporting changes.
    pub(crate) fn seed(&mut self, record: Option<R>) {
        self.is_running = record.as_ref().is_some_and(|r| r.is_running());
        self.is_in_focus = record.as_ref().is_some_and(|r| r.is_running() && r.is_in_focus());
        self.store(record);
    }

    /// Fold one push and return the topics to emit, in emission order.
    pub(crate) fn apply(&mut self, incoming: Option<R>, flags: PushFlags) -> Vec<StatusTopic> {
        let is_running = incoming.as_ref().is_some_and(|r| r.is_running());
        let is_in_focus = incoming
            .as_ref()
            .is_some_and(|r| r.is_running() && r.is_in_focus());
        let previous = self.record.as_ref().map(|r| identity_of(r.raw_id()));
        let current = incoming
            .as_ref()
            .filter(|r| r.is_running())
            .map(|r| identity_of(r.raw_id()));
        let identity_changed = matches!(
            (previous, current),
            (Some(previous), Some(current)) if previous != current
        );

        self.store(incoming);

        let mut topics = Vec::new();
        if is_in_focus != self.is_in_focus {
            self.is_in_focus = is_in_focus;
            topics.push(StatusTopic::Focus);
        }
        if is_running != self.is_running {
            self.is_running = is_running;
            topics.push(StatusTopic::Running);
        }
        if flags.resolution_changed {
            topics.push(StatusTopic::Resolution);
        }
        if flags.identity_changed || identity_changed {
            topics.push(StatusTopic::GameChanged);
        }
        if !topics.is_empty() {
            topics.push(StatusTopic::Changed);
        }
        topics
    }

    pub(crate) fn record(&self) -> Option<&R> {
        self.record.as_ref()
    }

    pub(crate) fn is_running(&self) -> bool {
        self.is_running
    }

    pub(crate) fn is_in_focus(&self) -> bool {
        self.is_in_focus
    }

    /// Live identity while running, else the last one seen.
    pub(crate) fn identity(&self) -> Option<i64> {
        self.record
            .as_ref()
            .map(|r| identity_of(r.raw_id()))
            .or(self.last_identity)
    }

    pub(crate) fn event(&self) -> StatusEvent {
        StatusEvent {
            is_running: self.is_running,
            is_in_focus: self.is_in_focus,
            id: self.identity(),
        }
    }
}

/// State, emitter and running-flag broadcast shared by both trackers
pub(crate) struct StatusCore<R> {
    state: Mutex<StatusState<R>>,
    emitter: EventEmitter<StatusEvent, StatusTopic>,
    running_tx: watch::Sender<bool>,
}

impl<R: StatusRecord> StatusCore<R> {
    pub(crate) fn new() -> Self {
        let (running_tx, _) = watch::channel(false);
        Self {
            state: Mutex::new(StatusState::new()),
            emitter: EventEmitter::new(),
            running_tx,
        }
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, StatusState<R>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn seed(&self, record: Option<R>) {
        let is_running = {
            let mut state = self.state();
            state.seed(record);
            state.is_running()
        };
        self.running_tx.send_replace(is_running);
    }

    /// Fold a push and deliver the resulting topics.
    pub(crate) fn push(&self, incoming: Option<R>, flags: PushFlags) -> Vec<StatusTopic> {
        let (topics, event) = {
            let mut state = self.state();
            let topics = state.apply(incoming, flags);
            (topics, state.event())
        };

        if topics.contains(&StatusTopic::Running) {
            self.running_tx.send_replace(event.is_running);
        }
        for topic in &topics {
            self.emitter.emit(topic, &event);
        }
        topics
    }

    pub(crate) fn emitter(&self) -> &EventEmitter<StatusEvent, StatusTopic> {
        &self.emitter
    }

    pub(crate) fn running_receiver(&self) -> watch::Receiver<bool> {
        self.running_tx.subscribe()
    }
}
