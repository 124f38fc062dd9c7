//! Pending task registry: FIFO queue, single running slot, result cache.
//!
//! Submitted work is stored as a deferred future and only executed when a
//! caller [`poll`](PendingTaskRegistry::poll)s. Each poll drives at most one
//! task (always the head of the queue) to completion, so endpoint calls are
//! serialized no matter how many callers poll concurrently.
//!
//! # Polling protocol
//!
//! 1. A cached outcome for the requested handle is removed and returned.
//! 2. Unknown handles (never issued, or already claimed) are `NotReady` and
//!    never advance the queue.
//! 3. If no task is running, the head of the queue is driven to completion.
//!    Its outcome is returned when it belongs to the requested handle and
//!    cached under its own handle otherwise.
//!
//! # Failures
//!
//! A failing task never blocks the queue: the running slot is released
//! even when the task fails, panics, or the driving poll is dropped. What
//! happens to the failed handle depends on the [`FailurePolicy`].

use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::Instant;

use crate::error::ClientError;
use crate::types::{PollStatus, TaskHandle, TaskOutcome, TaskState};

/// Deferred work stored in the registry.
pub type TaskFuture = BoxFuture<'static, TaskOutcome>;

/// What the registry does with a task that completes with an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Resolve the handle to [`PollStatus::Failed`], claimable exactly once.
    #[default]
    ResolveFailed,
    /// Log the failure and leave the handle unresolved; polls for it keep
    /// returning [`PollStatus::NotReady`].
    Discard,
}

struct PendingTask {
    handle: TaskHandle,
    work: TaskFuture,
    submitted_at: Instant,
}

#[derive(Default)]
struct RegistryState {
    queue: VecDeque<PendingTask>,
    running: Option<TaskHandle>,
    results: HashMap<TaskHandle, TaskOutcome>,
}

impl RegistryState {
    fn is_queued(&self, handle: &TaskHandle) -> bool {
        self.queue.iter().any(|task| task.handle == *handle)
    }
}

/// Tracks submitted tasks until their outcome is claimed.
///
/// # Examples
///
/// ```
/// # tokio_test_block(async {
/// use serde_json::json;
/// use shard_query::{ClientError, PendingTaskRegistry, PollStatus};
///
/// let registry = PendingTaskRegistry::new();
/// let first = registry.enqueue(Box::pin(async { Ok::<_, ClientError>(json!("one")) }));
/// let second = registry.enqueue(Box::pin(async { Ok::<_, ClientError>(json!("two")) }));
///
/// // Polling `second` drains `first` and caches it.
/// assert!(registry.poll(&second).await.is_pending());
/// assert!(matches!(registry.poll(&first).await, PollStatus::Ready(v) if v == "one"));
/// assert!(matches!(registry.poll(&second).await, PollStatus::Ready(v) if v == "two"));
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
pub struct PendingTaskRegistry {
    state: Mutex<RegistryState>,
    policy: FailurePolicy,
}

impl PendingTaskRegistry {
    /// Creates an empty registry with [`FailurePolicy::ResolveFailed`].
    pub fn new() -> Self {
        Self::with_policy(FailurePolicy::default())
    }

    /// Creates an empty registry with the given failure policy.
    pub fn with_policy(policy: FailurePolicy) -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            policy,
        }
    }

    /// The configured failure policy.
    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Changes the failure policy, keeping queued tasks and cached results.
    pub(crate) fn set_policy(&mut self, policy: FailurePolicy) {
        self.policy = policy;
    }

    /// Queues `work` without running it and returns its handle.
    pub fn enqueue(&self, work: TaskFuture) -> TaskHandle {
        let handle = TaskHandle::new();
        let mut state = self.state.lock();
        state.queue.push_back(PendingTask {
            handle,
            work,
            submitted_at: Instant::now(),
        });
        tracing::debug!(handle = %handle, queued = state.queue.len(), "task queued");
        handle
    }

    /// Polls `handle`, driving at most one queued task.
    ///
    /// The returned future completes once the driven task (if any) has
    /// finished. Dropping it mid-drive releases the running slot and, under
    /// [`FailurePolicy::ResolveFailed`], resolves the driven task to
    /// [`ClientError::Abandoned`].
    pub async fn poll(&self, handle: &TaskHandle) -> PollStatus {
        let task = {
            let mut state = self.state.lock();
            if let Some(outcome) = state.results.remove(handle) {
                return outcome.into();
            }
            if state.running.is_some() || !state.is_queued(handle) {
                return PollStatus::NotReady;
            }
            let Some(task) = state.queue.pop_front() else {
                return PollStatus::NotReady;
            };
            state.running = Some(task.handle);
            tracing::debug!(
                handle = %task.handle,
                queued = state.queue.len(),
                waited_ms = u64::try_from(task.submitted_at.elapsed().as_millis()).unwrap_or(u64::MAX),
                "task started"
            );
            task
        };

        let guard = DriveGuard {
            registry: self,
            handle: task.handle,
            armed: true,
        };
        let outcome = task.work.await;
        guard.complete(outcome, handle)
    }

    /// Current state of `handle`, or `None` if it is unknown or claimed.
    pub fn state(&self, handle: &TaskHandle) -> Option<TaskState> {
        let state = self.state.lock();
        if state.running.as_ref() == Some(handle) {
            Some(TaskState::Running)
        } else if state.results.contains_key(handle) {
            Some(TaskState::Completed)
        } else if state.is_queued(handle) {
            Some(TaskState::Queued)
        } else {
            None
        }
    }

    /// Number of tasks waiting in the queue.
    pub fn queued_len(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Number of completed outcomes waiting to be claimed.
    pub fn cached_len(&self) -> usize {
        self.state.lock().results.len()
    }

    /// Returns `true` while a poll is driving a task.
    pub fn is_running(&self) -> bool {
        self.state.lock().running.is_some()
    }
}

impl Default for PendingTaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PendingTaskRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("PendingTaskRegistry")
            .field("policy", &self.policy)
            .field("queued", &state.queue.len())
            .field("running", &state.running)
            .field("cached", &state.results.len())
            .finish()
    }
}

/// Releases the running slot when a drive ends, however it ends.
struct DriveGuard<'a> {
    registry: &'a PendingTaskRegistry,
    handle: TaskHandle,
    armed: bool,
}

impl DriveGuard<'_> {
    fn complete(mut self, outcome: TaskOutcome, requested: &TaskHandle) -> PollStatus {
        self.armed = false;
        let registry = self.registry;
        let drained = self.handle;
        let mut state = registry.state.lock();
        state.running = None;

        let outcome = match outcome {
            Ok(value) => {
                tracing::debug!(handle = %drained, "task completed");
                Ok(value)
            },
            Err(err) => {
                tracing::warn!(handle = %drained, error = %err, "task failed");
                if registry.policy == FailurePolicy::Discard {
                    return PollStatus::NotReady;
                }
                Err(err)
            },
        };

        if drained == *requested {
            outcome.into()
        } else {
            state.results.insert(drained, outcome);
            PollStatus::NotReady
        }
    }
}

impl Drop for DriveGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.registry.state.lock();
        state.running = None;
        tracing::warn!(handle = %self.handle, "task abandoned before completion");
        if self.registry.policy == FailurePolicy::ResolveFailed {
            state.results.insert(
                self.handle,
                Err(ClientError::Abandoned {
                    handle: self.handle,
                }),
            );
        }
    }
}
