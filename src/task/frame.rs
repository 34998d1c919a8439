use std::cell::Cell;
use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::channel::oneshot;
use parking_lot::Mutex;

use crate::error::{LoadError, LoadResult};
use crate::render::host::RenderHost;
use crate::task::panic_message;

type FrameJob = Box<dyn FnOnce(&mut dyn RenderHost) + Send>;

thread_local! {
    // Address of the queue whose frame is currently running on this thread, or 0.
    static CURRENT_FRAME: Cell<usize> = const { Cell::new(0) };
}

/// The frame checkpoint of a render thread.
///
/// Background tasks `schedule` work that needs the render host; the render thread calls `run_frame` once
/// per frame to run it. Work scheduled from inside a running frame of the same scheduler runs before that
/// frame ends.
#[derive(Clone, Default)]
pub struct FrameScheduler {
    inner: Arc<FrameQueue>,
}

#[derive(Default)]
struct FrameQueue {
    state: Mutex<QueueState>,
    frames: AtomicU64,
}

#[derive(Default)]
struct QueueState {
    next_frame: VecDeque<FrameJob>,
    this_frame: VecDeque<FrameJob>,
    closed: bool,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `job` for the frame checkpoint and returns a future of its result.
    ///
    /// The future fails with `FrameSchedulerClosed` if the scheduler is closed before the job runs.
    pub fn schedule<R, F>(&self, job: F) -> impl Future<Output = LoadResult<R>> + Send + 'static
    where
        F: FnOnce(&mut dyn RenderHost) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (sender, receiver) = oneshot::channel::<LoadResult<R>>();

        let frame_job: FrameJob = Box::new(move |host: &mut dyn RenderHost| {
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| job(host)))
                .map_err(|panic| LoadError::TaskFailed(panic_message(panic.as_ref())));
            let _ = sender.send(result);
        });

        {
            let mut state = self.inner.state.lock();
            if state.closed {
                log::debug!("Dropping a frame job scheduled after the scheduler was closed");
            } else if self.is_in_frame() {
                state.this_frame.push_back(frame_job);
            } else {
                state.next_frame.push_back(frame_job);
            }
        }

        async move {
            match receiver.await {
                Ok(result) => result,
                Err(oneshot::Canceled) => Err(LoadError::FrameSchedulerClosed),
            }
        }
    }

    /// Runs every job queued before this frame, plus any job those jobs schedule.
    ///
    /// Returns the number of jobs run.
    pub fn run_frame(&self, host: &mut dyn RenderHost) -> usize {
        let _frame = FrameGuard::enter(self.queue_address());
        self.inner.frames.fetch_add(1, Ordering::AcqRel);

        let mut jobs = std::mem::take(&mut self.inner.state.lock().next_frame);
        let mut ran = 0;

        loop {
            while let Some(job) = jobs.pop_front() {
                job(&mut *host);
                ran += 1;
            }

            jobs = std::mem::take(&mut self.inner.state.lock().this_frame);
            if jobs.is_empty() {
                break;
            }
        }

        ran
    }

    /// Whether the calling thread is inside `run_frame` of this scheduler.
    pub fn is_in_frame(&self) -> bool {
        CURRENT_FRAME.with(|current| current.get() == self.queue_address())
    }

    pub fn frame_count(&self) -> u64 {
        self.inner.frames.load(Ordering::Acquire)
    }

    pub fn pending_jobs(&self) -> usize {
        let state = self.inner.state.lock();
        state.next_frame.len() + state.this_frame.len()
    }

    /// Drops every queued job and refuses new ones.
    pub fn close(&self) {
        let dropped = {
            let mut state = self.inner.state.lock();
            state.closed = true;
            let mut dropped = std::mem::take(&mut state.next_frame);
            dropped.append(&mut state.this_frame);
            dropped
        };

        if !dropped.is_empty() {
            log::debug!("Dropping {} queued frame jobs", dropped.len());
        }
    }

    fn queue_address(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }
}

struct FrameGuard {
    previous: usize,
}

impl FrameGuard {
    fn enter(queue_address: usize) -> Self {
        let previous = CURRENT_FRAME.with(|current| current.replace(queue_address));
        Self { previous }
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        CURRENT_FRAME.with(|current| current.set(self.previous));
    }
}
