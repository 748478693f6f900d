//! Throttled build queue.
//!
//! One running slot and one pending slot. Enqueuing while a build runs is a
//! no-op; enqueuing while a task is pending replaces it. A pending task
//! starts once the throttle interval has passed since its slot was filled,
//! so a burst of events yields one build for the most recent event.

use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Unit of work run by the queue.
pub type QueueTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// What [`ThrottledQueue::enqueue`] did with a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Placed in the empty pending slot
    Scheduled,
    /// Replaced the task already pending
    Replaced,
    /// Discarded because a build is running
    Dropped,
    /// Discarded because the queue is closed
    Closed,
}

/// Snapshot of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueState {
    /// Tasks currently running (0 or 1)
    pub pending_count: usize,
    /// Tasks waiting in the slot (0 or 1)
    pub size_count: usize,
}

struct Pending {
    task: QueueTask,
    opened_at: Instant,
}

#[derive(Default)]
struct Slots {
    running: bool,
    next: Option<Pending>,
    closed: bool,
}

struct Inner {
    slots: Mutex<Slots>,
    wake: Notify,
    interval: Duration,
}

/// Single-concurrency, latest-wins scheduler.
pub struct ThrottledQueue {
    inner: Arc<Inner>,
    worker: JoinHandle<()>,
}

impl ThrottledQueue {
    /// Create a queue and start its worker. Must be called inside a tokio runtime.
    pub fn new(interval: Duration) -> Self {
        let inner = Arc::new(Inner {
            slots: Mutex::new(Slots::default()),
            wake: Notify::new(),
            interval,
        });
        let worker = tokio::spawn(worker_loop(Arc::clone(&inner)));
        Self { inner, worker }
    }

    /// Throttle interval.
    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    /// Offer a task to the queue.
    pub fn enqueue(&self, task: QueueTask) -> EnqueueOutcome {
        let outcome = {
            let mut slots = self.inner.slots.lock();
            if slots.closed {
                EnqueueOutcome::Closed
            } else if slots.running {
                EnqueueOutcome::Dropped
            } else if let Some(pending) = slots.next.as_mut() {
                pending.task = task;
                EnqueueOutcome::Replaced
            } else {
                slots.next = Some(Pending {
                    task,
                    opened_at: Instant::now(),
                });
                EnqueueOutcome::Scheduled
            }
        };

        match outcome {
            EnqueueOutcome::Scheduled => self.inner.wake.notify_one(),
            EnqueueOutcome::Dropped => tracing::debug!("Build in progress, change dropped"),
            EnqueueOutcome::Replaced => tracing::debug!("Replaced pending build"),
            EnqueueOutcome::Closed => tracing::debug!("Queue closed, change dropped"),
        }
        outcome
    }

    /// Run a task immediately, holding the running slot until it finishes.
    ///
    /// Used for the startup build. Returns `false` if another task is
    /// running or the queue is closed.
    pub async fn run_now(&self, task: QueueTask) -> bool {
        {
            let mut slots = self.inner.slots.lock();
            if slots.running || slots.closed {
                return false;
            }
            slots.running = true;
        }
        run_isolated(task).await;
        self.inner.slots.lock().running = false;
        self.inner.wake.notify_one();
        true
    }

    pub fn state(&self) -> QueueState {
        let slots = self.inner.slots.lock();
        QueueState {
            pending_count: usize::from(slots.running),
            size_count: usize::from(slots.next.is_some()),
        }
    }

    /// Stop accepting tasks and discard the pending one. A running task
    /// finishes.
    pub fn close(&self) {
        let mut slots = self.inner.slots.lock();
        slots.closed = true;
        slots.next = None;
        drop(slots);
        self.inner.wake.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.slots.lock().closed
    }
}

impl Drop for ThrottledQueue {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

async fn worker_loop(inner: Arc<Inner>) {
    loop {
        let due = {
            let slots = inner.slots.lock();
            if slots.closed {
                return;
            }
            match (&slots.next, slots.running) {
                (Some(pending), false) => Some(pending.opened_at + inner.interval),
                _ => None,
            }
        };

        let Some(due) = due else {
            inner.wake.notified().await;
            continue;
        };

        if Instant::now() < due {
            tokio::time::sleep_until(due).await;
            continue;
        }

        let task = {
            let mut slots = inner.slots.lock();
            if slots.closed || slots.running {
                continue;
            }
            match slots.next.take() {
                Some(pending) => {
                    slots.running = true;
                    pending.task
                }
                None => continue,
            }
        };

        run_isolated(task).await;
        inner.slots.lock().running = false;
    }
}

/// Run a task on its own tokio task so a panic can't take the queue down.
async fn run_isolated(task: QueueTask) {
    if let Err(e) = tokio::spawn(task).await {
        if e.is_panic() {
            tracing::error!("Build task panicked: {}", e);
        }
    }
}
