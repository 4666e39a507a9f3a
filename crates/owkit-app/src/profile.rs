//! Signed-in user and subscription facade

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use owkit_core::prelude::*;
use owkit_core::{EventEmitter, ListenerRef};
use owkit_host::{
    ActivePlans, CurrentUser, LoginStateChangedEvent, ProfileSource, SubscriptionChangedEvent,
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileTopic {
    Login,
    Subscription,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProfileEvent {
    Login(LoginStateChangedEvent),
    Subscription(SubscriptionChangedEvent),
}

impl ProfileEvent {
    pub fn topic(&self) -> ProfileTopic {
        match self {
            Self::Login(_) => ProfileTopic::Login,
            Self::Subscription(_) => ProfileTopic::Subscription,
        }
    }
}

/// Republishes profile pushes from the host.
///
/// Cheap to clone; clones share the same facade.
pub struct Profile<S> {
    inner: Arc<ProfileInner<S>>,
}

struct ProfileInner<S> {
    source: Arc<S>,
    emitter: EventEmitter<ProfileEvent, ProfileTopic>,
    attached: AtomicBool,
    owner: ListenerRef,
}

impl<S> Clone for Profile<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> Profile<S>
where
    S: ProfileSource + Sync + 'static,
{
    pub fn new(source: Arc<S>) -> Self {
        Self {
            inner: Arc::new(ProfileInner {
                source,
                emitter: EventEmitter::new(),
                attached: AtomicBool::new(false),
                owner: ListenerRef::new(),
            }),
        }
    }

    /// Start following login and subscription pushes. Returns `false` when
    /// already started.
    pub fn start(&self) -> bool {
        if self.inner.attached.swap(true, Ordering::SeqCst) {
            return false;
        }

        let weak: Weak<ProfileInner<S>> = Arc::downgrade(&self.inner);
        self.inner.source.on_login_state_changed().add_listener_with_ref(
            move |event| {
                if let Some(inner) = weak.upgrade() {
                    debug!("Login state changed: {}", event.status);
                    inner.publish(ProfileEvent::Login(event.clone()));
                }
            },
            self.inner.owner,
        );

        let weak: Weak<ProfileInner<S>> = Arc::downgrade(&self.inner);
        self.inner.source.on_subscription_changed().add_listener_with_ref(
            move |event| {
                if let Some(inner) = weak.upgrade() {
                    debug!("Subscription changed: {:?}", event.plans);
                    inner.publish(ProfileEvent::Subscription(event.clone()));
                }
            },
            self.inner.owner,
        );
        true
    }

    pub fn destroy(&self) {
        if self.inner.attached.swap(false, Ordering::SeqCst) {
            self.inner
                .source
                .on_login_state_changed()
                .remove_listener(self.inner.owner);
            self.inner
                .source
                .on_subscription_changed()
                .remove_listener(self.inner.owner);
        }
    }

    pub fn is_started(&self) -> bool {
        self.inner.attached.load(Ordering::SeqCst)
    }

    pub async fn get_current_user(&self) -> CurrentUser {
        let user = self.inner.source.get_current_user().await;
        if !user.success {
            warn!("Current user query failed");
        }
        user
    }

    pub async fn get_active_plans(&self) -> ActivePlans {
        let plans = self.inner.source.get_active_plans().await;
        if !plans.success {
            warn!("Active plans query failed");
        }
        plans
    }

    pub fn emitter(&self) -> &EventEmitter<ProfileEvent, ProfileTopic> {
        &self.inner.emitter
    }
}

impl<S> ProfileInner<S> {
    fn publish(&self, event: ProfileEvent) {
        self.emitter.emit(&event.topic(), &event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use owkit_host::test_utils::FakeHost;
    use std::sync::Mutex;

    fn record(profile: &Profile<FakeHost>) -> Arc<Mutex<Vec<ProfileEvent>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        for topic in [ProfileTopic::Login, ProfileTopic::Subscription] {
            let sink = seen.clone();
            profile.emitter().add_listener(topic, move |event: &ProfileEvent| {
                sink.lock().unwrap().push(event.clone());
            });
        }
        seen
    }

    #[test]
    fn test_pushes_are_republished() {
        let host = Arc::new(FakeHost::new());
        let profile = Profile::new(host.clone());
        let seen = record(&profile);

        assert!(profile.start());
        assert!(!profile.start());
        assert_eq!(host.attached_listeners(), 2);

        let login = LoginStateChangedEvent {
            status: "online".to_string(),
            connection_state: Some("Online".to_string()),
            username: Some("player".to_string()),
        };
        host.push_login_state(login.clone());
        host.push_subscription(vec![7, 9]);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ProfileEvent::Login(login),
                ProfileEvent::Subscription(SubscriptionChangedEvent { plans: vec![7, 9] }),
            ]
        );
    }

    #[test]
    fn test_destroy_detaches() {
        let host = Arc::new(FakeHost::new());
        let profile = Profile::new(host.clone());
        let seen = record(&profile);
        profile.start();
        profile.destroy();

        host.push_subscription(vec![1]);
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(host.attached_listeners(), 0);
        assert!(!profile.is_started());
    }

    #[tokio::test]
    async fn test_requests_forward_to_host() {
        let host = Arc::new(FakeHost::new());
        host.set_current_user(CurrentUser {
            success: true,
            username: Some("player".to_string()),
            user_id: Some("u1".to_string()),
            channel: None,
        });
        host.set_active_plans(ActivePlans {
            success: true,
            plans: vec![3],
        });
        let profile = Profile::new(host);

        assert_eq!(
            profile.get_current_user().await.username.as_deref(),
            Some("player")
        );
        assert_eq!(profile.get_active_plans().await.plans, vec![3]);
    }
}
