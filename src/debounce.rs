//! Coalescing timer for bursty change notifications.
//!
//! A [`Debouncer`] turns any number of [`Debouncer::trigger`] calls inside a
//! quiet window into one callback run. The callback receives a [`Completion`]
//! and the debouncer never starts another run until that completion has been
//! signalled (or dropped), so slow saves cannot overlap.
//!
//! ```text
//!            trigger            trigger (absorbed)       trigger
//!   Idle ───────────► Scheduled ─────────────► Running ──────────► Running{again}
//!    ▲                    │ delay elapsed          │ done()              │ done()
//!    │                    └───────────────────────►│                     ▼
//!    └─────────────────────────────────────────────┘               Scheduled (delay)
//! ```
//!
//! [`Debouncer::cancel`] drops a scheduled run, or the follow-up remembered
//! by a running one. A run already in progress is never interrupted.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

type Callback = Box<dyn Fn(Completion) -> BoxFuture<'static, ()> + Send + Sync>;

/// Signal handed to the callback; call [`Completion::done`] when the work is finished.
///
/// Dropping it without calling `done` also counts as completion.
#[derive(Debug)]
pub struct Completion {
    tx: Option<oneshot::Sender<()>>,
}

impl Completion {
    pub fn done(mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Scheduled,
    Running { again: bool },
}

struct State {
    phase: Phase,
    last_finished: Option<Instant>,
    /// Bumped by `cancel`; a sleeping run with an older epoch gives up.
    epoch: u64,
}

struct Inner {
    delay: Duration,
    immediate: bool,
    callback: Callback,
    state: Mutex<State>,
    runs: AtomicUsize,
}

/// Debounced callback runner. Cheap to clone; clones share the same timer.
#[derive(Clone)]
pub struct Debouncer {
    inner: Arc<Inner>,
}

impl Debouncer {
    /// `immediate` lets the first trigger after a quiet period of at least
    /// `delay` run without waiting.
    pub fn new<F, Fut>(delay: Duration, immediate: bool, callback: F) -> Self
    where
        F: Fn(Completion) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                delay,
                immediate,
                callback: Box::new(move |completion| callback(completion).boxed()),
                state: Mutex::new(State {
                    phase: Phase::Idle,
                    last_finished: None,
                    epoch: 0,
                }),
                runs: AtomicUsize::new(0),
            }),
        }
    }

    /// Request a callback run. Must be called from within a Tokio runtime.
    pub fn trigger(&self) {
        let (wait, epoch) = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            match state.phase {
                Phase::Idle => {
                    let wait = if self.inner.immediate {
                        match state.last_finished {
                            None => Duration::ZERO,
                            Some(at) => self.inner.delay.saturating_sub(at.elapsed()),
                        }
                    } else {
                        self.inner.delay
                    };
                    state.phase = Phase::Scheduled;
                    (wait, state.epoch)
                }
                Phase::Scheduled => return,
                Phase::Running { ref mut again } => {
                    *again = true;
                    return;
                }
            }
        };

        tokio::spawn(run(Arc::clone(&self.inner), wait, epoch));
    }

    /// Drop the pending run, if any. Returns whether one was pending.
    ///
    /// A callback that is already running carries on; only the follow-up it
    /// would have scheduled is dropped.
    pub fn cancel(&self) -> bool {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        match state.phase {
            Phase::Idle | Phase::Running { again: false } => false,
            Phase::Scheduled => {
                state.phase = Phase::Idle;
                state.epoch += 1;
                true
            }
            Phase::Running { ref mut again } => {
                *again = false;
                true
            }
        }
    }

    /// True while a callback is executing.
    pub fn is_running(&self) -> bool {
        matches!(self.inner.state.lock().phase, Phase::Running { .. })
    }

    /// True when nothing is scheduled or running.
    pub fn is_idle(&self) -> bool {
        self.inner.state.lock().phase == Phase::Idle
    }

    /// Number of callback runs started so far.
    pub fn runs(&self) -> usize {
        self.inner.runs.load(Ordering::SeqCst)
    }

    pub fn delay(&self) -> Duration {
        self.inner.delay
    }
}

async fn run(inner: Arc<Inner>, mut wait: Duration, epoch: u64) {
    loop {
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }

        {
            let mut state = inner.state.lock();
            if state.epoch != epoch || state.phase != Phase::Scheduled {
                return;
            }
            state.phase = Phase::Running { again: false };
        }
        inner.runs.fetch_add(1, Ordering::SeqCst);

        let (tx, rx) = oneshot::channel();
        tokio::spawn((inner.callback)(Completion { tx: Some(tx) }));
        // A dropped sender means the callback gave up its completion.
        let _ = rx.await;

        let rerun = {
            let mut state = inner.state.lock();
            state.last_finished = Some(Instant::now());
            let rerun = state.phase == Phase::Running { again: true };
            state.phase = if rerun { Phase::Scheduled } else { Phase::Idle };
            rerun
        };
        if !rerun {
            return;
        }
        wait = inner.delay;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn counting(delay_ms: u64, immediate: bool) -> (Debouncer, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let debouncer = Debouncer::new(Duration::from_millis(delay_ms), immediate, move |done| {
            c.fetch_add(1, Ordering::SeqCst);
            async move { done.done() }
        });
        (debouncer, calls)
    }

    #[tokio::test(start_paused = true)]
    async fn burst_inside_window_runs_once() {
        let (debouncer, calls) = counting(500, false);
        for _ in 0..10 {
            debouncer.trigger();
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(debouncer.is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_fires_first_trigger_right_away() {
        let (debouncer, calls) = counting(500, true);
        debouncer.trigger();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Inside the quiet window the next trigger waits for the remainder.
        debouncer.trigger();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        tokio::time::sleep(Duration::from_millis(450)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn no_second_run_before_completion() {
        let (release_tx, release_rx) = mpsc::unbounded_channel::<()>();
        let release_rx = Arc::new(tokio::sync::Mutex::new(release_rx));
        let started = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&started);
        let debouncer = Debouncer::new(Duration::from_millis(100), true, move |done| {
            s.fetch_add(1, Ordering::SeqCst);
            let rx = Arc::clone(&release_rx);
            async move {
                rx.lock().await.recv().await;
                done.done();
            }
        });

        debouncer.trigger();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(started.load(Ordering::SeqCst), 1);

        // Triggers while running only queue one follow-up.
        debouncer.trigger();
        debouncer.trigger();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(started.load(Ordering::SeqCst), 1);

        release_tx.send(()).unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(started.load(Ordering::SeqCst), 2);

        release_tx.send(()).unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(started.load(Ordering::SeqCst), 2);
        assert!(debouncer.is_idle());
        assert_eq!(debouncer.runs(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_the_scheduled_run() {
        let (debouncer, calls) = counting(500, false);
        debouncer.trigger();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(debouncer.cancel());
        assert!(debouncer.is_idle());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!debouncer.cancel());

        // A fresh trigger after cancelling is scheduled normally, and the
        // cancelled sleeper does not run it early.
        debouncer.trigger();
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_while_running_keeps_the_run_and_drops_the_follow_up() {
        let (release_tx, release_rx) = mpsc::unbounded_channel::<()>();
        let (started_tx, mut started_rx) = mpsc::unbounded_channel::<()>();
        let release_rx = Arc::new(tokio::sync::Mutex::new(release_rx));
        let debouncer = Debouncer::new(Duration::from_millis(100), true, move |done| {
            let _ = started_tx.send(());
            let rx = Arc::clone(&release_rx);
            async move {
                rx.lock().await.recv().await;
                done.done();
            }
        });

        debouncer.trigger();
        started_rx.recv().await.unwrap();
        debouncer.trigger();
        assert!(debouncer.is_running());
        assert!(debouncer.cancel());

        release_tx.send(()).unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(debouncer.is_idle());
        assert_eq!(debouncer.runs(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_completion_counts_as_done() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let debouncer = Debouncer::new(Duration::from_millis(50), true, move |done| {
            c.fetch_add(1, Ordering::SeqCst);
            drop(done);
            async {}
        });
        debouncer.trigger();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(debouncer.is_idle());
        debouncer.trigger();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
