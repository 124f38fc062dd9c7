//! Task handles, states and poll results.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

use crate::error::ClientError;

/// Free-form call options forwarded to the pack function.
pub type QueryOptions = Map<String, Value>;

/// Terminal value of a task: the endpoint's result or the failure.
pub type TaskOutcome = Result<Value, ClientError>;

/// Opaque identifier for a submitted task.
///
/// Handles are random UUIDv4 values, generated at submission time and never
/// reused.
///
/// # Examples
///
/// ```
/// use shard_query::TaskHandle;
///
/// let a = TaskHandle::new();
/// let b = TaskHandle::new();
/// assert_ne!(a, b);
/// assert_eq!(a.to_string().len(), 36);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskHandle(Uuid);

impl TaskHandle {
    /// Generates a fresh handle.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TaskHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Lifecycle state of a submitted task.
///
/// ```text
/// Queued -> Running -> Completed
/// ```
///
/// A task leaves the registry once its completed outcome is claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Waiting in the FIFO queue.
    Queued,
    /// Currently being driven by a poll.
    Running,
    /// Finished; the outcome waits in the result cache.
    Completed,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Result of polling a task handle.
#[derive(Debug)]
pub enum PollStatus {
    /// The task completed and this is its result.
    Ready(Value),
    /// The task completed with a failure.
    Failed(ClientError),
    /// No result is available for this handle yet (or ever, for handles
    /// that are unknown or already claimed).
    NotReady,
}

impl PollStatus {
    /// Returns `true` for [`PollStatus::Ready`].
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Returns `true` for [`PollStatus::NotReady`].
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::NotReady)
    }

    /// Converts a terminal status into a `Result`; `None` while pending.
    ///
    /// # Examples
    ///
    /// ```
    /// use serde_json::json;
    /// use shard_query::PollStatus;
    ///
    /// let status = PollStatus::Ready(json!({"text": "hello"}));
    /// let value = status.into_outcome().unwrap().unwrap();
    /// assert_eq!(value["text"], "hello");
    ///
    /// assert!(PollStatus::NotReady.into_outcome().is_none());
    /// ```
    pub fn into_outcome(self) -> Option<TaskOutcome> {
        match self {
            Self::Ready(value) => Some(Ok(value)),
            Self::Failed(err) => Some(Err(err)),
            Self::NotReady => None,
        }
    }
}

impl From<TaskOutcome> for PollStatus {
    fn from(outcome: TaskOutcome) -> Self {
        match outcome {
            Ok(value) => Self::Ready(value),
            Err(err) => Self::Failed(err),
        }
    }
}
