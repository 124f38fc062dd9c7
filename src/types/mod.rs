//! Core value types: task kinds, handles, task states and poll results.

pub mod kind;
pub mod task;

pub use kind::TaskKind;
pub use task::{PollStatus, QueryOptions, TaskHandle, TaskOutcome, TaskState};
