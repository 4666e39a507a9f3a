//! Single-flight start/stop gate
//!
//! Trackers and adapters share one startup sequence between concurrent
//! callers: the first `start` runs it, later callers await the same future.
//! `stop` waits for an in-flight start before reporting the gate stopped, so a
//! late startup can never finish after teardown.

use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use futures_util::future::{BoxFuture, FutureExt, Shared};

type StartFuture = Shared<BoxFuture<'static, bool>>;

enum Phase {
    Stopped,
    Starting(StartFuture),
    Running,
}

pub(crate) struct StartGate {
    phase: Mutex<Phase>,
}

impl StartGate {
    pub(crate) fn new() -> Self {
        Self {
            phase: Mutex::new(Phase::Stopped),
        }
    }

    fn phase(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start once. Returns `true` without running `begin` when already running.
    pub(crate) async fn start<F, Fut>(&self, begin: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let pending = {
            let mut phase = self.phase();
            match &*phase {
                Phase::Running => return true,
                Phase::Starting(pending) => pending.clone(),
                Phase::Stopped => {
                    let pending = begin().boxed().shared();
                    *phase = Phase::Starting(pending.clone());
                    pending
                }
            }
        };
        self.settle(pending).await
    }

    /// Await `pending` and record its outcome if it is still the current start.
    async fn settle(&self, pending: StartFuture) -> bool {
        let started = pending.clone().await;
        let mut phase = self.phase();
        if let Phase::Starting(current) = &*phase {
            if current.ptr_eq(&pending) {
                *phase = if started {
                    Phase::Running
                } else {
                    Phase::Stopped
                };
            }
        }
        started
    }

    /// Move a running gate back to stopped. Returns whether it was running.
    pub(crate) fn reset_if_running(&self) -> bool {
        let mut phase = self.phase();
        if matches!(*phase, Phase::Running) {
            *phase = Phase::Stopped;
            return true;
        }
        false
    }

    /// Wait for any in-flight start, then mark the gate stopped.
    ///
    /// Returns whether the gate was running.
    pub(crate) async fn stop(&self) -> bool {
        let pending = match &*self.phase() {
            Phase::Starting(pending) => Some(pending.clone()),
            _ => None,
        };
        if let Some(pending) = pending {
            self.settle(pending).await;
        }

        let mut phase = self.phase();
        let was_running = matches!(*phase, Phase::Running);
        *phase = Phase::Stopped;
        was_running
    }

    pub(crate) fn is_running(&self) -> bool {
        matches!(*self.phase(), Phase::Running)
    }

    pub(crate) fn is_starting(&self) -> bool {
        matches!(*self.phase(), Phase::Starting(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_test::{assert_pending, assert_ready_eq, task};

    fn counted(runs: &Arc<AtomicUsize>, outcome: bool) -> impl Future<Output = bool> + Send {
        let runs = runs.clone();
        async move {
            runs.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            outcome
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_starts_share_one_run() {
        let gate = StartGate::new();
        let runs = Arc::new(AtomicUsize::new(0));

        let (a, b) = tokio::join!(
            gate.start(|| counted(&runs, true)),
            gate.start(|| counted(&runs, true)),
        );

        assert!(a && b);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(gate.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_when_running_is_noop() {
        let gate = StartGate::new();
        let runs = Arc::new(AtomicUsize::new(0));

        assert!(gate.start(|| counted(&runs, true)).await);
        assert!(gate.start(|| counted(&runs, true)).await);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_start_can_be_retried() {
        let gate = StartGate::new();
        let runs = Arc::new(AtomicUsize::new(0));

        assert!(!gate.start(|| counted(&runs, false)).await);
        assert!(!gate.is_running());
        assert!(gate.start(|| counted(&runs, true)).await);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_waits_for_in_flight_start() {
        let gate = StartGate::new();
        let runs = Arc::new(AtomicUsize::new(0));

        let (started, was_running) = tokio::join!(gate.start(|| counted(&runs, true)), async {
            tokio::task::yield_now().await;
            assert!(gate.is_starting());
            gate.stop().await
        });

        assert!(started);
        assert!(was_running);
        assert!(!gate.is_running());
        assert!(!gate.is_starting());
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_caller_joins_in_flight_start() {
        let gate = StartGate::new();
        let runs = Arc::new(AtomicUsize::new(0));

        let mut first = task::spawn(gate.start(|| counted(&runs, true)));
        assert_pending!(first.poll());
        assert!(gate.is_starting());

        let mut second = task::spawn(gate.start(|| counted(&runs, false)));
        assert_pending!(second.poll());

        tokio::time::advance(Duration::from_millis(50)).await;
        assert_ready_eq!(first.poll(), true);
        assert_ready_eq!(second.poll(), true);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(gate.is_running());
    }

    #[tokio::test]
    async fn test_stop_when_never_started() {
        let gate = StartGate::new();
        assert!(!gate.stop().await);
        assert!(!gate.reset_if_running());
    }
}
