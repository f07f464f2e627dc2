//! Balance refresh scheduling.
//!
//! Exactly one refresh timer runs regardless of how many observers ask for
//! it: `start` calls are ref-counted, and only the count dropping to zero
//! stops the underlying task. The scheduler is owned and injected rather
//! than process-global, so its lifetime is explicit.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Default)]
struct Inner {
    refs: usize,
    task: Option<JoinHandle<()>>,
}

/// Ref-counted owner of the single balance-refresh timer.
pub struct RefreshScheduler {
    interval: Duration,
    inner: Mutex<Inner>,
}

impl RefreshScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Register an observer. Spawns the timer task on the first call; later
    /// calls only bump the ref count.
    ///
    /// The first interval elapses before the first invocation of `tick` —
    /// callers run their own immediate refresh when they need one.
    pub fn start<F, Fut>(&self, tick: F)
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut inner = self.lock();
        inner.refs += 1;
        if inner.task.is_some() {
            return;
        }
        let interval = self.interval;
        inner.task = Some(tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            timer.tick().await; // consume the immediate first tick
            loop {
                timer.tick().await;
                tick().await;
            }
        }));
        tracing::debug!(interval_ms = interval.as_millis() as u64, "balance refresh timer started");
    }

    /// Deregister an observer. Stops the timer when the last one leaves;
    /// surplus calls are no-ops.
    pub fn stop(&self) {
        let mut inner = self.lock();
        inner.refs = inner.refs.saturating_sub(1);
        if inner.refs == 0 {
            if let Some(task) = inner.task.take() {
                task.abort();
                tracing::debug!("balance refresh timer stopped");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock().task.is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        if let Some(task) = self.lock().task.take() {
            task.abort();
        }
    }
}
