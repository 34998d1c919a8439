use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::error::{LoadError, LoadResult};
use crate::task::cancel::CancellationToken;
use crate::task::panic_message;

/// Join barrier over the background steps of one load.
///
/// Tasks may be added from anywhere, including from inside other tracked tasks. `wait_all` resolves once
/// the pending count drops to zero and may only be awaited once.
#[derive(Clone)]
pub struct TaskTracker {
    inner: Arc<TrackerInner>,
}

struct TrackerInner {
    state: Mutex<TrackerState>,
    all_done: Notify,
    cancel: CancellationToken,
}

#[derive(Default)]
struct TrackerState {
    pending: usize,
    spawned: usize,
    first_error: Option<LoadError>,
    awaited: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerSummary {
    pub tasks: usize,
}

impl TaskTracker {
    /// `cancel` is cancelled when the first task fails.
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            inner: Arc::new(TrackerInner {
                state: Mutex::new(TrackerState::default()),
                all_done: Notify::new(),
                cancel,
            }),
        }
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.inner.cancel
    }

    /// Spawns `task` on the current tokio runtime and tracks it until it finishes.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = LoadResult<()>> + Send + 'static,
    {
        {
            let mut state = self.inner.state.lock();
            state.pending += 1;
            state.spawned += 1;
        }

        let inner = self.inner.clone();
        tokio::spawn(async move {
            let result = match AssertUnwindSafe(task).catch_unwind().await {
                Ok(result) => result,
                Err(panic) => Err(LoadError::TaskFailed(panic_message(panic.as_ref()))),
            };
            inner.complete(result);
        });
    }

    /// Tracks a task that was spawned elsewhere.
    pub fn add(&self, handle: JoinHandle<LoadResult<()>>) {
        self.spawn(async move {
            handle
                .await
                .map_err(|error| LoadError::TaskFailed(error.to_string()))?
        });
    }

    pub fn pending(&self) -> usize {
        self.inner.state.lock().pending
    }

    /// Waits for every tracked task, then reports the first failure if there was one.
    pub async fn wait_all(&self) -> LoadResult<TrackerSummary> {
        {
            let mut state = self.inner.state.lock();
            if state.awaited {
                return Err(LoadError::AlreadyAwaited);
            }
            state.awaited = true;
        }

        loop {
            if self.inner.state.lock().pending == 0 {
                break;
            }
            self.inner.all_done.notified().await;
        }

        let mut state = self.inner.state.lock();
        match state.first_error.take() {
            Some(error) => Err(error),
            None => Ok(TrackerSummary {
                tasks: state.spawned,
            }),
        }
    }
}

impl TrackerInner {
    fn complete(&self, result: LoadResult<()>) {
        let mut state = self.state.lock();
        state.pending -= 1;

        if let Err(error) = result {
            if !error.is_cancelled() {
                log::debug!("Tracked load task failed: {error}");
                self.cancel.cancel();
            }

            // Cancellations caused by a failure must not hide the failure itself.
            let replace = match &state.first_error {
                None => true,
                Some(first) => first.is_cancelled() && !error.is_cancelled(),
            };
            if replace {
                state.first_error = Some(error);
            }
        }

        let finished = state.pending == 0;
        drop(state);

        if finished {
            self.all_done.notify_one();
        }
    }
}
