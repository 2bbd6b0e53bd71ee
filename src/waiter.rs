//! Polling discovery of asynchronously rendered host elements.
//!
//! The host renders its view piecemeal after a route change and never says
//! when a nested element is ready, so [`Waiter::when`] polls a query on a
//! short fixed interval and hands the first present result to a callback.
//! Each wait is single shot and may carry a watchdog that gives up after a
//! bounded time.
//!
//! Polling runs on `tokio::task::spawn_local`, so waits must be started from
//! inside a `LocalSet`.

use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::scope::Disposable;
use crate::state::BackdropResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
    Pending,
    Fired,
    Canceled,
    TimedOut,
}

struct HandleInner {
    label: &'static str,
    state: Cell<WaitState>,
    token: CancellationToken,
}

/// Cancellation handle for one pending wait.
#[derive(Clone)]
pub struct WaitHandle {
    inner: Rc<HandleInner>,
}

impl WaitHandle {
    fn new(label: &'static str) -> Self {
        Self {
            inner: Rc::new(HandleInner {
                label,
                state: Cell::new(WaitState::Pending),
                token: CancellationToken::new(),
            }),
        }
    }

    /// Stops polling. Once this returns the callback can no longer run.
    /// Cancelling a wait that already fired or expired does nothing.
    pub fn cancel(&self) {
        if self.inner.state.get() == WaitState::Pending {
            trace!(wait = self.inner.label, "wait canceled");
            self.inner.state.set(WaitState::Canceled);
            self.inner.token.cancel();
        }
    }

    pub fn state(&self) -> WaitState {
        self.inner.state.get()
    }

    pub fn is_pending(&self) -> bool {
        self.state() == WaitState::Pending
    }

    fn expire(&self) {
        if self.inner.state.get() == WaitState::Pending {
            debug!(wait = self.inner.label, "watchdog expired before element appeared");
            self.inner.state.set(WaitState::TimedOut);
            self.inner.token.cancel();
        }
    }

    /// Claims the right to fire. Only one caller ever gets `true`.
    fn settle(&self) -> bool {
        if self.inner.state.get() == WaitState::Pending {
            self.inner.state.set(WaitState::Fired);
            true
        } else {
            false
        }
    }
}

impl Disposable for WaitHandle {
    fn dispose(&self) -> BackdropResult<()> {
        self.cancel();
        Ok(())
    }
}

/// Starts polling waits with a shared interval and optional watchdog.
#[derive(Debug, Clone, Copy)]
pub struct Waiter {
    interval: Duration,
    watchdog: Option<Duration>,
}

impl Waiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            watchdog: None,
        }
    }

    /// Gives up on any wait that has not succeeded within `limit`.
    pub fn with_watchdog(mut self, limit: Duration) -> Self {
        self.watchdog = Some(limit);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Polls `query` until it yields a value, then calls `on_found` once.
    ///
    /// The first poll happens on the first tick, immediately after the task is
    /// scheduled; even a synchronous hit is delivered from the polling task.
    pub fn when<T, Q, F>(&self, label: &'static str, mut query: Q, on_found: F) -> WaitHandle
    where
        T: 'static,
        Q: FnMut() -> Option<T> + 'static,
        F: FnOnce(T) + 'static,
    {
        let handle = WaitHandle::new(label);
        let task = handle.clone();
        let period = self.interval;
        let deadline = self.watchdog.map(|limit| Instant::now() + limit);

        tokio::task::spawn_local(async move {
            let token = task.inner.token.clone();
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let watchdog = watchdog_timer(deadline);
            tokio::pin!(watchdog);

            let found = loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break None,
                    _ = &mut watchdog => {
                        task.expire();
                        break None;
                    }
                    _ = ticker.tick() => {
                        if !task.is_pending() {
                            break None;
                        }
                        if let Some(value) = query() {
                            break Some(value);
                        }
                    }
                }
            };

            if let Some(value) = found {
                if task.settle() {
                    trace!(wait = task.inner.label, "wait satisfied");
                    on_found(value);
                }
            }
        });

        handle
    }
}

fn watchdog_timer(deadline: Option<Instant>) -> impl Future<Output = ()> {
    async move {
        match deadline {
            Some(at) => time::sleep_until(at).await,
            None => std::future::pending::<()>().await,
        }
    }
}
