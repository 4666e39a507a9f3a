//! Telemetry adapter: feature negotiation, snapshot diffing and fan-out

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use owkit_core::prelude::*;
use owkit_core::{parse_lenient, EventEmitter, ListenerRef};
use owkit_host::{
    GameStatusSource, InfoMap, InfoUpdate, LauncherStatusSource, NewEvents,
    SetRequiredFeaturesResult, TelemetryError, TelemetrySource, FEATURES_CATEGORY,
};
use serde_json::Value;
use tokio::sync::watch;

use super::{TelemetryEvent, TelemetryPath, TelemetryTopic};
use crate::config::{TelemetrySettings, GAME_MAX_ATTEMPTS, RETRY_DELAY_MS};
use crate::lifecycle::StartGate;
use crate::status::{GameStatus, LauncherStatus};

/// Negotiation tuning
#[derive(Debug, Clone, PartialEq)]
pub struct NegotiationOptions {
    pub max_attempts: u32,
    pub retry_delay: Duration,
    /// Log every raw host push at debug level
    pub verbose: bool,
}

impl NegotiationOptions {
    pub fn game(settings: &TelemetrySettings) -> Self {
        Self {
            max_attempts: settings.game_max_attempts,
            retry_delay: settings.retry_delay(),
            verbose: settings.verbose,
        }
    }

    pub fn launcher(settings: &TelemetrySettings) -> Self {
        Self {
            max_attempts: settings.launcher_max_attempts,
            retry_delay: settings.retry_delay(),
            verbose: settings.verbose,
        }
    }
}

impl Default for NegotiationOptions {
    fn default() -> Self {
        Self {
            max_attempts: GAME_MAX_ATTEMPTS,
            retry_delay: Duration::from_millis(RETRY_DELAY_MS),
            verbose: false,
        }
    }
}

/// Republishes host telemetry changes on [`TelemetryTopic`]s.
///
/// Every change is emitted on its exact path, its category and
/// [`TelemetryTopic::All`], in that order. Values equal to the last one seen
/// for a path are dropped; discrete events always fire.
pub struct TelemetryAdapter<S> {
    inner: Arc<AdapterInner<S>>,
}

struct AdapterInner<S> {
    label: &'static str,
    source: Arc<S>,
    features: Vec<String>,
    options: NegotiationOptions,
    running: watch::Receiver<bool>,
    snapshot: Mutex<BTreeMap<TelemetryPath, Value>>,
    emitter: EventEmitter<TelemetryEvent, TelemetryTopic>,
    gate: StartGate,
    owner: ListenerRef,
}

impl<S> Clone for TelemetryAdapter<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> TelemetryAdapter<S>
where
    S: TelemetrySource + Sync + 'static,
{
    /// Adapter gated on `running`: negotiation only proceeds while it reads true.
    pub fn new(
        source: Arc<S>,
        features: Vec<String>,
        running: watch::Receiver<bool>,
        options: NegotiationOptions,
    ) -> Self {
        Self::with_label("telemetry", source, features, running, options)
    }

    /// Game events adapter following `status`
    pub fn for_game<G>(
        source: Arc<S>,
        features: Vec<String>,
        status: &GameStatus<G>,
        settings: &TelemetrySettings,
    ) -> Self
    where
        G: GameStatusSource + Sync + 'static,
    {
        Self::with_label(
            "game events",
            source,
            features,
            status.running_receiver(),
            NegotiationOptions::game(settings),
        )
    }

    /// Launcher events adapter following `status`
    pub fn for_launcher<L>(
        source: Arc<S>,
        features: Vec<String>,
        status: &LauncherStatus<L>,
        settings: &TelemetrySettings,
    ) -> Self
    where
        L: LauncherStatusSource + Sync + 'static,
    {
        Self::with_label(
            "launcher events",
            source,
            features,
            status.running_receiver(),
            NegotiationOptions::launcher(settings),
        )
    }

    fn with_label(
        label: &'static str,
        source: Arc<S>,
        features: Vec<String>,
        running: watch::Receiver<bool>,
        options: NegotiationOptions,
    ) -> Self {
        Self {
            inner: Arc::new(AdapterInner {
                label,
                source,
                features,
                options,
                running,
                snapshot: Mutex::new(BTreeMap::new()),
                emitter: EventEmitter::new(),
                gate: StartGate::new(),
                owner: ListenerRef::new(),
            }),
        }
    }

    /// Negotiate features, attach to host pushes and seed from a full pull.
    ///
    /// Calling `start` on a running adapter restarts it from an empty
    /// snapshot. Concurrent calls share one negotiation. Returns `false` when
    /// negotiation fails; the adapter then stays stopped.
    pub async fn start(&self) -> bool {
        if self.inner.gate.reset_if_running() {
            debug!("{}: restarting", self.inner.label);
            self.inner.teardown();
        }

        let weak = Arc::downgrade(&self.inner);
        self.inner
            .gate
            .start(move || async move {
                match weak.upgrade() {
                    Some(inner) => inner.run_start().await,
                    None => false,
                }
            })
            .await
    }

    /// Detach from the host and clear the snapshot.
    ///
    /// Waits for an in-flight start first. Safe to call when never started.
    pub async fn stop(&self) {
        self.inner.gate.stop().await;
        self.inner.teardown();
    }

    /// Stop and drop every subscriber.
    pub async fn destroy(&self) {
        self.stop().await;
        self.inner.emitter.clear();
    }

    pub fn is_running(&self) -> bool {
        self.inner.gate.is_running()
    }

    pub fn features(&self) -> &[String] {
        &self.inner.features
    }

    pub fn emitter(&self) -> &EventEmitter<TelemetryEvent, TelemetryTopic> {
        &self.inner.emitter
    }

    /// Copy of every stored raw value
    pub fn state(&self) -> BTreeMap<TelemetryPath, Value> {
        self.inner.snapshot().clone()
    }

    /// Current decoded value of `path`
    pub fn value(&self, path: &TelemetryPath) -> Option<Value> {
        self.inner.snapshot().get(path).map(parse_lenient)
    }
}

impl<S> AdapterInner<S>
where
    S: TelemetrySource + Sync + 'static,
{
    fn snapshot(&self) -> MutexGuard<'_, BTreeMap<TelemetryPath, Value>> {
        self.snapshot.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn run_start(self: Arc<Self>) -> bool {
        self.teardown();

        if !self.negotiate().await {
            return false;
        }

        self.attach();

        let reply = self.source.get_info().await;
        match reply.res {
            Some(info) if reply.success => {
                self.log_push("info", &info);
                self.apply_snapshot(&info);
            }
            _ => warn!(
                "{}: initial info pull failed: {}",
                self.label,
                reply.error.as_deref().unwrap_or("no data")
            ),
        }
        true
    }

    /// Ask for the feature set until granted, out of attempts, or the target stops.
    async fn negotiate(&self) -> bool {
        let mut running = self.running.clone();
        let mut attempts = 0;
        let mut last: Option<SetRequiredFeaturesResult> = None;

        while attempts < self.options.max_attempts && target_running(&running) {
            let reply = self.source.set_required_features(&self.features).await;
            attempts += 1;

            if reply.success {
                if reply.has_grant() {
                    info!(
                        "{}: features granted after {} attempt(s): {:?}",
                        self.label, attempts, reply.supported_features
                    );
                    return true;
                }
                warn!("{}: host accepted but granted no features", self.label);
                return false;
            }

            trace!("{}: attempt {} declined: {:?}", self.label, attempts, reply.error);
            last = Some(reply);

            tokio::select! {
                _ = tokio::time::sleep(self.options.retry_delay) => {}
                _ = running.wait_for(|is_running| !*is_running) => {
                    debug!("{}: target stopped during negotiation", self.label);
                    break;
                }
            }
        }

        warn!(
            "{}: feature negotiation failed after {} attempt(s): {:?}",
            self.label,
            attempts,
            last.and_then(|reply| reply.error)
        );
        false
    }

    fn attach(self: &Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        self.source.on_error().add_listener_with_ref(
            move |error| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_error(error);
                }
            },
            self.owner,
        );

        let weak: Weak<Self> = Arc::downgrade(self);
        self.source.on_info_update().add_listener_with_ref(
            move |update| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_info_update(update);
                }
            },
            self.owner,
        );

        let weak: Weak<Self> = Arc::downgrade(self);
        self.source.on_new_events().add_listener_with_ref(
            move |events| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_new_events(events);
                }
            },
            self.owner,
        );
    }

    fn detach(&self) {
        self.source.on_error().remove_listener(self.owner);
        self.source.on_info_update().remove_listener(self.owner);
        self.source.on_new_events().remove_listener(self.owner);
    }

    fn teardown(&self) {
        self.detach();
        self.snapshot().clear();
    }

    fn on_error(&self, error: &TelemetryError) {
        warn!("{}: host error: {}", self.label, error.reason);
    }

    fn on_info_update(&self, update: &InfoUpdate) {
        self.log_push("info update", &update.info);
        self.apply_snapshot(&update.info);
    }

    fn on_new_events(&self, batch: &NewEvents) {
        if self.options.verbose {
            debug!("{}: new events: {:?}", self.label, batch.events);
        }

        for record in &batch.events {
            let path = TelemetryPath::event(&record.name);
            {
                let mut snapshot = self.snapshot();
                if snapshot.get(&path) != Some(&record.data) {
                    snapshot.insert(path.clone(), record.data.clone());
                }
            }
            self.publish(&TelemetryEvent {
                path,
                val: parse_lenient(&record.data),
            });
        }
    }

    /// Diff a nested snapshot against stored values and emit the changes.
    fn apply_snapshot(&self, info: &InfoMap) {
        let changes: Vec<TelemetryEvent> = {
            let mut snapshot = self.snapshot();
            let mut changes = Vec::new();

            for (category, entries) in info {
                if category == FEATURES_CATEGORY {
                    continue;
                }
                let Some(entries) = entries.as_object() else {
                    trace!("{}: skipping non-object category {}", self.label, category);
                    continue;
                };

                for (key, raw) in entries {
                    let path = TelemetryPath::new(category.as_str(), key.as_str());
                    if snapshot.get(&path) == Some(raw) {
                        continue;
                    }
                    snapshot.insert(path.clone(), raw.clone());
                    changes.push(TelemetryEvent {
                        path,
                        val: parse_lenient(raw),
                    });
                }
            }
            changes
        };

        for change in &changes {
            self.publish(change);
        }
    }

    fn publish(&self, event: &TelemetryEvent) {
        let emitter = &self.emitter;
        emitter.emit(&TelemetryTopic::Path(event.path.clone()), event);
        emitter.emit(&TelemetryTopic::Category(event.category().to_string()), event);
        emitter.emit(&TelemetryTopic::All, event);
    }

    fn log_push(&self, kind: &str, info: &InfoMap) {
        if self.options.verbose {
            let snapshot = serde_json::Value::Object(info.clone());
            debug!("{}: {}: {}", self.label, kind, snapshot);
        }
    }
}

fn target_running(running: &watch::Receiver<bool>) -> bool {
    *running.borrow()
}
