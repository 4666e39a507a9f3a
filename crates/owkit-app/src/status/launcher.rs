//! Running launcher status tracker
//!
//! The host reports launchers through three pushes. Each one is folded into
//! the shared status transition rule:
//! - launched: the new record
//! - terminated: no record
//! - updated: the new record, with a resolution flag when the host lists a
//!   resolution change

use std::sync::{Arc, Weak};

use owkit_core::prelude::*;
use owkit_core::{EventEmitter, ListenerRef};
use owkit_host::{LauncherInfo, LauncherStatusSource, LauncherUpdatedEvent};
use tokio::sync::watch;

use super::{PushFlags, StatusCore, StatusEvent, StatusTopic};
use crate::lifecycle::StartGate;

const RESOLUTION_CHANGE: &str = "resolution";

/// Tracks the running launcher.
///
/// Cheap to clone; clones share the same tracker.
pub struct LauncherStatus<S> {
    inner: Arc<LauncherStatusInner<S>>,
}

struct LauncherStatusInner<S> {
    source: Arc<S>,
    core: StatusCore<LauncherInfo>,
    gate: StartGate,
    owner: ListenerRef,
}

impl<S> Clone for LauncherStatus<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> LauncherStatus<S>
where
    S: LauncherStatusSource + Sync + 'static,
{
    pub fn new(source: Arc<S>) -> Self {
        Self {
            inner: Arc::new(LauncherStatusInner {
                source,
                core: StatusCore::new(),
                gate: StartGate::new(),
                owner: ListenerRef::new(),
            }),
        }
    }

    /// Pull running launchers once and start following host pushes.
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

    pub fn launcher_info(&self) -> Option<LauncherInfo> {
        self.inner.core.state().record().cloned()
    }

    /// Identity of the running launcher, else of the last launcher seen
    pub fn launcher_id(&self) -> Option<i64> {
        self.inner.core.state().identity()
    }

    pub fn launcher_is(&self, id: i64) -> bool {
        let state = self.inner.core.state();
        state.is_running() && state.identity() == Some(id)
    }

    pub fn emitter(&self) -> &EventEmitter<StatusEvent, StatusTopic> {
        self.inner.core.emitter()
    }

    pub fn running_receiver(&self) -> watch::Receiver<bool> {
        self.inner.core.running_receiver()
    }
}

impl<S> LauncherStatusInner<S>
where
    S: LauncherStatusSource + Sync + 'static,
{
    async fn seed_and_attach(self: Arc<Self>) {
        let reply = self.source.get_running_launchers_info().await;
        let launcher = if reply.success {
            reply.launchers.into_iter().next()
        } else {
            warn!("Running launchers query failed; assuming none");
            None
        };
        debug!("Launcher status seeded: {:?}", launcher.as_ref().map(|l| l.id));
        self.core.seed(launcher);

        let weak: Weak<Self> = Arc::downgrade(&self);
        self.source.on_launched().add_listener_with_ref(
            move |info| {
                if let Some(inner) = weak.upgrade() {
                    inner.fold(Some(info.clone()), PushFlags::default());
                }
            },
            self.owner,
        );

        let weak: Weak<Self> = Arc::downgrade(&self);
        self.source.on_terminated().add_listener_with_ref(
            move |_| {
                if let Some(inner) = weak.upgrade() {
                    inner.fold(None, PushFlags::default());
                }
            },
            self.owner,
        );

        let weak: Weak<Self> = Arc::downgrade(&self);
        self.source.on_updated().add_listener_with_ref(
            move |event| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_updated(event);
                }
            },
            self.owner,
        );
    }

    fn on_updated(&self, event: &LauncherUpdatedEvent) {
        let flags = PushFlags {
            resolution_changed: event
                .change_type
                .iter()
                .any(|change| change == RESOLUTION_CHANGE),
            identity_changed: false,
        };
        self.fold(Some(event.info.clone()), flags);
    }

    fn fold(&self, incoming: Option<LauncherInfo>, flags: PushFlags) {
        let topics = self.core.push(incoming, flags);
        if !topics.is_empty() {
            debug!("Launcher status changed: {:?}", topics);
        }
    }

    fn detach(&self) {
        self.source.on_launched().remove_listener(self.owner);
        self.source.on_terminated().remove_listener(self.owner);
        self.source.on_updated().remove_listener(self.owner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use owkit_host::test_utils::{test_launcher, FakeHost};
    use std::sync::Mutex;

    async fn started(host: &Arc<FakeHost>) -> LauncherStatus<FakeHost> {
        let status = LauncherStatus::new(host.clone());
        assert!(status.start().await);
        status
    }

    fn record_topics(status: &LauncherStatus<FakeHost>) -> Arc<Mutex<Vec<StatusTopic>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        for topic in [
            StatusTopic::Focus,
            StatusTopic::Running,
            StatusTopic::Resolution,
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
    async fn test_seed_takes_first_running_launcher() {
        let host = Arc::new(FakeHost::new());
        host.set_running_launchers(vec![test_launcher(109021, true), test_launcher(7, false)]);
        let status = started(&host).await;

        assert!(status.is_running());
        assert!(status.is_in_focus());
        assert_eq!(status.launcher_id(), Some(10902));
        assert!(status.launcher_is(10902));
        assert_eq!(host.attached_listeners(), 3);
    }

    #[tokio::test]
    async fn test_launch_then_terminate() {
        let host = Arc::new(FakeHost::new());
        let status = started(&host).await;
        let seen = record_topics(&status);

        host.push_launched(test_launcher(109021, false));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![StatusTopic::Running, StatusTopic::Changed]
        );

        seen.lock().unwrap().clear();
        host.push_terminated(test_launcher(109021, false));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![StatusTopic::Running, StatusTopic::Changed]
        );
        assert!(status.launcher_info().is_none());
        assert_eq!(status.launcher_id(), Some(10902));
    }

    #[tokio::test]
    async fn test_update_reports_focus_and_resolution() {
        let host = Arc::new(FakeHost::new());
        host.set_running_launchers(vec![test_launcher(109021, false)]);
        let status = started(&host).await;
        let seen = record_topics(&status);

        host.push_launcher_updated(test_launcher(109021, true), &["focus"]);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![StatusTopic::Focus, StatusTopic::Changed]
        );

        seen.lock().unwrap().clear();
        host.push_launcher_updated(test_launcher(109021, true), &["resolution"]);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![StatusTopic::Resolution, StatusTopic::Changed]
        );
    }

    #[tokio::test]
    async fn test_second_launch_reports_identity_change() {
        let host = Arc::new(FakeHost::new());
        let status = started(&host).await;
        let seen = Arc::new(Mutex::new(Vec::new()));
        for topic in [StatusTopic::GameChanged, StatusTopic::Changed] {
            let sink = seen.clone();
            status.emitter().add_listener(topic, move |_: &StatusEvent| {
                sink.lock().unwrap().push(topic);
            });
        }

        host.push_launched(test_launcher(1000, false));
        seen.lock().unwrap().clear();
        host.push_launched(test_launcher(2000, false));

        assert_eq!(status.launcher_id(), Some(200));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![StatusTopic::GameChanged, StatusTopic::Changed]
        );
    }

    #[tokio::test]
    async fn test_redundant_update_is_silent() {
        let host = Arc::new(FakeHost::new());
        host.set_running_launchers(vec![test_launcher(109021, true)]);
        let status = started(&host).await;
        let seen = record_topics(&status);

        host.push_launcher_updated(test_launcher(109021, true), &[]);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_destroy_detaches_all_pushes() {
        let host = Arc::new(FakeHost::new());
        let status = started(&host).await;
        status.destroy().await;
        assert_eq!(host.attached_listeners(), 0);
    }
}
