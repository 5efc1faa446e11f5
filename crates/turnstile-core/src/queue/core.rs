//! Request queue implementation

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::config::QueueConfig;
use super::options::SubmitOptions;
use super::permit::SlotPermit;
use super::wait_list::{WaitKey, WaitList, Waiter};
use crate::domain::{TaskId, TaskRecord, TaskState};
use crate::error::{ConfigError, QueueError};
use crate::observability::{QueueSnapshot, QueueStats, QueuedEntry};
use crate::ports::{Clock, IdGenerator};

/// Mutable scheduler state, guarded by `Shared::state`.
pub(crate) struct SchedulerState {
    /// Slots currently held.
    running: usize,

    /// Tasks waiting for a slot.
    waiting: WaitList,

    stats: QueueStats,
}

/// How a slot came back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotRelease {
    Finished(TaskState),
    Abandoned,
}

/// State shared between the queue handle and outstanding permits.
pub(crate) struct Shared {
    config: QueueConfig,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    state: Mutex<SchedulerState>,
}

impl Shared {
    /// Critical sections never await and never panic mid-update, so a
    /// poisoned lock still holds consistent state.
    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hand free slots to waiters in priority order.
    ///
    /// Expired waiters are dropped on the way without taking a slot; dropping
    /// the grant sender wakes them with a timeout.
    fn dispatch(self: &Arc<Self>, state: &mut SchedulerState) {
        let now = Instant::now();
        while state.running < self.config.max_concurrency {
            let Some(waiter) = state.waiting.pop_front() else {
                break;
            };

            if waiter.is_expired(now) {
                state.stats.total_timed_out += 1;
                debug!(
                    queue = %self.config.name,
                    task_id = %waiter.task_id,
                    "Shared::dispatch: evicting expired waiter"
                );
                continue;
            }

            state.running += 1;
            let permit = SlotPermit::new(Arc::clone(self), waiter.task_id);
            match waiter.grant.send(permit) {
                Ok(()) => {
                    let waited = now.saturating_duration_since(waiter.enqueued_at);
                    state.stats.total_started += 1;
                    state.stats.total_wait_time_ms += waited.as_millis() as u64;
                    state.stats.peak_running = state.stats.peak_running.max(state.running);
                    debug!(
                        queue = %self.config.name,
                        task_id = %waiter.task_id,
                        priority = waiter.priority,
                        waited_ms = waited.as_millis() as u64,
                        running = state.running,
                        "Shared::dispatch: granted slot"
                    );
                }
                Err(mut permit) => {
                    // receiver gone; we hold the lock, so undo by hand
                    permit.disarm();
                    state.running -= 1;
                    state.stats.total_abandoned += 1;
                }
            }
        }
    }

    pub(super) fn release(self: &Arc<Self>, task_id: TaskId, how: SlotRelease) {
        let mut state = self.lock();
        state.running = state.running.saturating_sub(1);
        match how {
            SlotRelease::Finished(TaskState::Completed) => state.stats.total_completed += 1,
            SlotRelease::Finished(_) => state.stats.total_failed += 1,
            SlotRelease::Abandoned => state.stats.total_abandoned += 1,
        }
        debug!(
            queue = %self.config.name,
            %task_id,
            ?how,
            running = state.running,
            queued = state.waiting.len(),
            "Shared::release: slot freed"
        );
        self.dispatch(&mut state);
    }
}

/// A queued task's claim on its future slot.
///
/// Owned by the `submit` future. If that future is dropped while waiting, the
/// task leaves the wait list, and a slot that was already granted goes back
/// to the queue.
struct PendingSlot {
    shared: Arc<Shared>,
    task_id: TaskId,
    enqueued_at: Instant,
    key: WaitKey,
    rx: oneshot::Receiver<SlotPermit>,
    settled: bool,
}

impl PendingSlot {
    async fn wait(mut self, deadline: Option<Instant>) -> Result<SlotPermit, QueueError> {
        let received = match deadline {
            Some(deadline) => {
                let outcome = tokio::time::timeout_at(deadline, &mut self.rx).await;
                match outcome {
                    Ok(received) => received,
                    Err(_elapsed) => return self.expire(),
                }
            }
            None => (&mut self.rx).await,
        };
        self.settled = true;

        // a closed channel means the dispatcher found us expired
        received.map_err(|_| self.timed_out())
    }

    /// Our own timer fired.
    fn expire(&mut self) -> Result<SlotPermit, QueueError> {
        self.settled = true;
        let removed = {
            let mut state = self.shared.lock();
            let removed = state.waiting.remove(&self.key).is_some();
            if removed {
                state.stats.total_timed_out += 1;
            }
            removed
        };
        if removed {
            return Err(self.timed_out());
        }

        // The dispatcher reached us first: either a slot granted before the
        // deadline, or an eviction.
        self.rx.try_recv().map_err(|_| self.timed_out())
    }

    fn timed_out(&self) -> QueueError {
        let waited = Instant::now().saturating_duration_since(self.enqueued_at);
        warn!(
            queue = %self.shared.config.name,
            task_id = %self.task_id,
            waited_ms = waited.as_millis() as u64,
            "Queue timeout: no slot within the wait limit"
        );
        QueueError::Timeout {
            task_id: self.task_id,
            waited,
        }
    }
}

impl Drop for PendingSlot {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        let removed = {
            let mut state = self.shared.lock();
            let removed = state.waiting.remove(&self.key).is_some();
            if removed {
                state.stats.total_abandoned += 1;
            }
            removed
        };

        if removed {
            debug!(task_id = %self.task_id, "PendingSlot::drop: left the queue before a slot was granted");
        } else if let Ok(permit) = self.rx.try_recv() {
            debug!(task_id = %permit.task_id(), "PendingSlot::drop: returning an unused slot");
            permit.abandon();
        }
    }
}

/// Bounded-concurrency request queue with priority ordering and wait timeouts.
///
/// Design:
/// - At most `max_concurrency` operations hold a slot at once.
/// - Waiters are ordered by priority (desc), then arrival (FIFO).
/// - A waiter whose timeout elapses is rejected with `QueueError::Timeout`
///   and its operation is never called.
/// - Running work is never preempted or cancelled by the queue.
/// - No fairness beyond strict priority: a steady stream of high-priority
///   work can starve lower priorities.
///
/// Cheap to clone; clones share the same slots.
#[derive(Clone)]
pub struct RequestQueue {
    shared: Arc<Shared>,
}

impl RequestQueue {
    /// Build a queue with the system clock and ULID task ids.
    pub fn new(config: QueueConfig) -> Result<Self, ConfigError> {
        crate::app::QueueBuilder::new(config).build()
    }

    /// Assemble from validated parts. Validation is the builder's job.
    pub(crate) fn from_parts(
        config: QueueConfig,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        debug!(?config, "RequestQueue::from_parts: called");
        Self {
            shared: Arc::new(Shared {
                config,
                clock,
                ids,
                state: Mutex::new(SchedulerState {
                    running: 0,
                    waiting: WaitList::default(),
                    stats: QueueStats::default(),
                }),
            }),
        }
    }

    /// Run `operation` once a slot is free.
    ///
    /// Resolves with whatever the operation returns; its error type passes
    /// through untouched. Queue-level failures (wait timeout, invalid options)
    /// are converted into `E` through `From<QueueError>`.
    ///
    /// If the returned future is dropped while waiting, the task leaves the
    /// queue without running.
    pub async fn submit<F, Fut, T, E>(&self, operation: F, options: SubmitOptions) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<QueueError>,
    {
        let timeout = options.resolve_timeout(self.shared.config.default_timeout())?;
        let mut task = TaskRecord::new(
            self.shared.ids.generate_task_id(),
            options.priority,
            timeout,
            self.shared.clock.now(),
        );

        let permit = match self.acquire(&task).await {
            Ok(permit) => permit,
            Err(err) => {
                if err.is_timeout() {
                    task.time_out();
                }
                return Err(err.into());
            }
        };

        task.start();
        debug!(
            queue = %self.shared.config.name,
            task_id = %task.id,
            priority = task.priority,
            waited_ms = task.waited().as_millis() as u64,
            "RequestQueue::submit: running"
        );

        let result = operation().await;
        if result.is_ok() {
            task.complete();
        } else {
            task.fail();
        }
        debug!(task_id = %task.id, state = ?task.state, "RequestQueue::submit: settled");

        permit.finish(task.state);
        result
    }

    async fn acquire(&self, task: &TaskRecord) -> Result<SlotPermit, QueueError> {
        let (grant, rx) = oneshot::channel();
        let key = {
            let mut state = self.shared.lock();
            state.stats.total_submitted += 1;
            let key = state.waiting.push(Waiter {
                task_id: task.id,
                priority: task.priority,
                enqueued_at: task.enqueued_at,
                enqueued_at_wall: task.enqueued_at_wall,
                timeout: task.timeout,
                grant,
            });
            self.shared.dispatch(&mut state);

            let depth = state.waiting.len();
            state.stats.peak_queue_depth = state.stats.peak_queue_depth.max(depth);
            debug!(
                queue = %self.shared.config.name,
                task_id = %task.id,
                priority = task.priority,
                running = state.running,
                queued = depth,
                "RequestQueue::acquire: enqueued"
            );
            key
        };

        PendingSlot {
            shared: Arc::clone(&self.shared),
            task_id: task.id,
            enqueued_at: task.enqueued_at,
            key,
            rx,
            settled: false,
        }
        .wait(task.deadline())
        .await
    }

    pub fn config(&self) -> &QueueConfig {
        &self.shared.config
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        let state = self.shared.lock();
        QueueSnapshot {
            name: self.shared.config.name.clone(),
            running: state.running,
            queued: state.waiting.len(),
            max_concurrency: self.shared.config.max_concurrency,
            stats: state.stats.clone(),
        }
    }

    /// Waiting tasks in the order they will be promoted.
    pub fn queued_entries(&self) -> Vec<QueuedEntry> {
        let state = self.shared.lock();
        let now = Instant::now();
        state
            .waiting
            .iter()
            .enumerate()
            .map(|(i, w)| QueuedEntry {
                task_id: w.task_id,
                priority: w.priority,
                position: i + 1,
                enqueued_at: w.enqueued_at_wall,
                waited: now.saturating_duration_since(w.enqueued_at),
                timeout: w.timeout,
            })
            .collect()
    }

    pub fn stats(&self) -> QueueStats {
        self.shared.lock().stats.clone()
    }

    pub fn running(&self) -> usize {
        self.shared.lock().running
    }

    pub fn queued(&self) -> usize {
        self.shared.lock().waiting.len()
    }
}
